/// Quizzes: ordered selections of questions
///
/// Membership lives in `quiz_questions` with a zero-based `position`. Every
/// operation that changes membership keeps positions dense (`0..n`), and
/// each one locks the quiz row first so concurrent edits to the same quiz
/// serialize.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE quizzes (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     title VARCHAR(255) NOT NULL,
///     description TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE quiz_questions (
///     quiz_id UUID NOT NULL REFERENCES quizzes(id) ON DELETE CASCADE,
///     question_id UUID NOT NULL REFERENCES questions(id) ON DELETE CASCADE,
///     position INTEGER NOT NULL CHECK (position >= 0),
///     PRIMARY KEY (quiz_id, question_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use super::question::Question;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Quiz {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A quiz together with its questions in position order
#[derive(Debug, Clone, Serialize)]
pub struct QuizDetail {
    #[serde(flatten)]
    pub quiz: Quiz,
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone)]
pub struct CreateQuiz {
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateQuiz {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddQuestionOutcome {
    Added { position: i32 },
    QuizNotFound,
    QuestionNotFound,
    AlreadyPresent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReorderOutcome {
    Reordered,
    QuizNotFound,
    /// The requested order is not a permutation of the current questions
    Mismatch(String),
}

/// One submitted answer
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Answer {
    pub question_id: Uuid,
    pub selected_option: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerResult {
    pub question_id: Uuid,
    pub selected_option: Option<i32>,
    pub correct_option: i32,
    pub correct: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuizResult {
    pub total: usize,
    pub correct: usize,
    pub score_percent: f64,
    pub results: Vec<AnswerResult>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GradeError {
    #[error("Question {0} is not part of this quiz")]
    UnknownQuestion(Uuid),

    #[error("Question {0} was answered more than once")]
    DuplicateAnswer(Uuid),
}

/// Checks that `requested` is exactly a reordering of `current`.
pub fn check_permutation(current: &[Uuid], requested: &[Uuid]) -> Result<(), String> {
    let mut seen = HashSet::with_capacity(requested.len());
    for id in requested {
        if !seen.insert(*id) {
            return Err(format!("Question {} listed more than once", id));
        }
    }

    let current_set: HashSet<Uuid> = current.iter().copied().collect();

    if let Some(extra) = requested.iter().find(|id| !current_set.contains(id)) {
        return Err(format!("Question {} is not part of this quiz", extra));
    }
    if let Some(missing) = current.iter().find(|id| !seen.contains(id)) {
        return Err(format!("Question {} is missing from the new order", missing));
    }

    Ok(())
}

/// Grades answers against the quiz's questions, in quiz order.
///
/// Unanswered questions count as wrong.
pub fn grade(questions: &[Question], answers: &[Answer]) -> Result<QuizResult, GradeError> {
    let known: HashSet<Uuid> = questions.iter().map(|q| q.id).collect();
    let mut selected: HashMap<Uuid, i32> = HashMap::with_capacity(answers.len());

    for answer in answers {
        if !known.contains(&answer.question_id) {
            return Err(GradeError::UnknownQuestion(answer.question_id));
        }
        if selected
            .insert(answer.question_id, answer.selected_option)
            .is_some()
        {
            return Err(GradeError::DuplicateAnswer(answer.question_id));
        }
    }

    let results: Vec<AnswerResult> = questions
        .iter()
        .map(|question| {
            let choice = selected.get(&question.id).copied();
            AnswerResult {
                question_id: question.id,
                selected_option: choice,
                correct_option: question.correct_option,
                correct: choice.is_some_and(|c| question.is_correct(c)),
            }
        })
        .collect();

    let correct = results.iter().filter(|r| r.correct).count();
    let total = results.len();
    let score_percent = if total == 0 {
        0.0
    } else {
        (correct as f64 * 10_000.0 / total as f64).round() / 100.0
    };

    Ok(QuizResult {
        total,
        correct,
        score_percent,
        results,
    })
}

const COLUMNS: &str = "id, title, description, created_at, updated_at";

/// Locks the quiz row; `false` if it does not exist.
async fn lock_quiz(conn: &mut PgConnection, quiz_id: Uuid) -> Result<bool, sqlx::Error> {
    let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM quizzes WHERE id = $1 FOR UPDATE")
        .bind(quiz_id)
        .fetch_optional(conn)
        .await?;

    Ok(row.is_some())
}

async fn question_ids(conn: &mut PgConnection, quiz_id: Uuid) -> Result<Vec<Uuid>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT question_id FROM quiz_questions WHERE quiz_id = $1 ORDER BY position",
    )
    .bind(quiz_id)
    .fetch_all(conn)
    .await
}

impl Quiz {
    pub async fn create(pool: &PgPool, data: CreateQuiz) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Quiz>(&format!(
            "INSERT INTO quizzes (title, description) VALUES ($1, $2) RETURNING {}",
            COLUMNS
        ))
        .bind(data.title)
        .bind(data.description)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Quiz>(&format!("SELECT {} FROM quizzes WHERE id = $1", COLUMNS))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Quiz>(&format!(
            "SELECT {} FROM quizzes ORDER BY created_at DESC, id LIMIT $1 OFFSET $2",
            COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateQuiz,
    ) -> Result<Option<Self>, sqlx::Error> {
        let clear_description = matches!(data.description, Some(None));
        let description = data.description.flatten();

        sqlx::query_as::<_, Quiz>(&format!(
            r#"
            UPDATE quizzes
            SET title = COALESCE($2, title),
                description = CASE WHEN $4 THEN NULL ELSE COALESCE($3, description) END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(id)
        .bind(data.title)
        .bind(description)
        .bind(clear_description)
        .fetch_optional(pool)
        .await
    }

    /// Deletes the quiz; its membership rows cascade, the questions stay.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM quizzes WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Questions of a quiz in position order
    pub async fn questions(pool: &PgPool, quiz_id: Uuid) -> Result<Vec<Question>, sqlx::Error> {
        sqlx::query_as::<_, Question>(
            r#"
            SELECT q.id, q.prompt, q.options, q.correct_option, q.category, q.difficulty,
                   q.created_at, q.updated_at
            FROM quiz_questions qq
            JOIN questions q ON q.id = qq.question_id
            WHERE qq.quiz_id = $1
            ORDER BY qq.position
            "#,
        )
        .bind(quiz_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_detail(pool: &PgPool, id: Uuid) -> Result<Option<QuizDetail>, sqlx::Error> {
        let Some(quiz) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };
        let questions = Self::questions(pool, id).await?;

        Ok(Some(QuizDetail { quiz, questions }))
    }

    /// Appends a question at the end of the quiz.
    pub async fn add_question(
        pool: &PgPool,
        quiz_id: Uuid,
        question_id: Uuid,
    ) -> Result<AddQuestionOutcome, sqlx::Error> {
        let mut tx = pool.begin().await?;

        if !lock_quiz(&mut tx, quiz_id).await? {
            return Ok(AddQuestionOutcome::QuizNotFound);
        }

        let question_exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM questions WHERE id = $1)")
                .bind(question_id)
                .fetch_one(&mut *tx)
                .await?;
        if !question_exists {
            return Ok(AddQuestionOutcome::QuestionNotFound);
        }

        let current = question_ids(&mut tx, quiz_id).await?;
        if current.contains(&question_id) {
            return Ok(AddQuestionOutcome::AlreadyPresent);
        }

        let position = current.len() as i32;
        sqlx::query("INSERT INTO quiz_questions (quiz_id, question_id, position) VALUES ($1, $2, $3)")
            .bind(quiz_id)
            .bind(question_id)
            .bind(position)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE quizzes SET updated_at = NOW() WHERE id = $1")
            .bind(quiz_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(AddQuestionOutcome::Added { position })
    }

    /// Removes a question and shifts the ones after it up by one.
    ///
    /// Returns `false` if the question was not in the quiz.
    pub async fn remove_question(
        pool: &PgPool,
        quiz_id: Uuid,
        question_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        if !lock_quiz(&mut tx, quiz_id).await? {
            return Ok(false);
        }

        let removed: Option<i32> = sqlx::query_scalar(
            "DELETE FROM quiz_questions WHERE quiz_id = $1 AND question_id = $2 RETURNING position",
        )
        .bind(quiz_id)
        .bind(question_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(position) = removed else {
            return Ok(false);
        };

        sqlx::query(
            "UPDATE quiz_questions SET position = position - 1 WHERE quiz_id = $1 AND position > $2",
        )
        .bind(quiz_id)
        .bind(position)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE quizzes SET updated_at = NOW() WHERE id = $1")
            .bind(quiz_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Rewrites positions so the quiz follows `ordered_ids`.
    pub async fn reorder(
        pool: &PgPool,
        quiz_id: Uuid,
        ordered_ids: &[Uuid],
    ) -> Result<ReorderOutcome, sqlx::Error> {
        let mut tx = pool.begin().await?;

        if !lock_quiz(&mut tx, quiz_id).await? {
            return Ok(ReorderOutcome::QuizNotFound);
        }

        let current = question_ids(&mut tx, quiz_id).await?;
        if let Err(reason) = check_permutation(&current, ordered_ids) {
            return Ok(ReorderOutcome::Mismatch(reason));
        }

        sqlx::query(
            r#"
            UPDATE quiz_questions qq
            SET position = (o.ord - 1)::INTEGER
            FROM unnest($2::UUID[]) WITH ORDINALITY AS o(question_id, ord)
            WHERE qq.quiz_id = $1 AND qq.question_id = o.question_id
            "#,
        )
        .bind(quiz_id)
        .bind(ordered_ids)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE quizzes SET updated_at = NOW() WHERE id = $1")
            .bind(quiz_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(ReorderOutcome::Reordered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::Difficulty;

    fn question(correct_option: i32) -> Question {
        Question {
            id: Uuid::new_v4(),
            prompt: "?".to_string(),
            options: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            correct_option,
            category: None,
            difficulty: Difficulty::Easy,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_permutation_accepted() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        assert!(check_permutation(&[a, b, c], &[c, a, b]).is_ok());
        assert!(check_permutation(&[], &[]).is_ok());
    }

    #[test]
    fn test_permutation_rejections() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        assert!(check_permutation(&[a, b], &[a, a]).unwrap_err().contains("more than once"));
        assert!(check_permutation(&[a, b], &[a]).unwrap_err().contains("missing"));
        assert!(check_permutation(&[a, b], &[a, b, c]).unwrap_err().contains("not part"));
    }

    #[test]
    fn test_grade_counts_unanswered_as_wrong() {
        let questions = vec![question(0), question(1), question(2), question(0)];
        let answers = vec![
            Answer { question_id: questions[0].id, selected_option: 0 },
            Answer { question_id: questions[1].id, selected_option: 2 },
            Answer { question_id: questions[2].id, selected_option: 2 },
        ];

        let result = grade(&questions, &answers).unwrap();
        assert_eq!(result.total, 4);
        assert_eq!(result.correct, 2);
        assert_eq!(result.score_percent, 50.0);
        assert_eq!(result.results[3].selected_option, None);
        assert!(!result.results[3].correct);
        assert_eq!(result.results[1].correct_option, 1);
    }

    #[test]
    fn test_grade_rounds_to_two_decimals() {
        let questions = vec![question(0), question(0), question(0)];
        let answers = vec![Answer { question_id: questions[0].id, selected_option: 0 }];

        assert_eq!(grade(&questions, &answers).unwrap().score_percent, 33.33);
    }

    #[test]
    fn test_grade_rejects_foreign_and_duplicate_answers() {
        let questions = vec![question(0)];
        let stranger = Uuid::new_v4();

        assert_eq!(
            grade(&questions, &[Answer { question_id: stranger, selected_option: 0 }]),
            Err(GradeError::UnknownQuestion(stranger))
        );

        let twice = [
            Answer { question_id: questions[0].id, selected_option: 0 },
            Answer { question_id: questions[0].id, selected_option: 1 },
        ];
        assert_eq!(
            grade(&questions, &twice),
            Err(GradeError::DuplicateAnswer(questions[0].id))
        );
    }

    #[test]
    fn test_empty_quiz_scores_zero() {
        let result = grade(&[], &[]).unwrap();
        assert_eq!(result.total, 0);
        assert_eq!(result.score_percent, 0.0);
    }
}
