/// Question bank and quiz endpoints
///
/// # Endpoints
///
/// - `POST   /v1/quiz/questions` - Create question
/// - `GET    /v1/quiz/questions` - List questions (`category`, `difficulty`, `limit`, `offset`)
/// - `GET    /v1/quiz/questions/:id` - Get question
/// - `PATCH  /v1/quiz/questions/:id` - Update question
/// - `DELETE /v1/quiz/questions/:id` - Delete question (also leaves every quiz)
/// - `POST   /v1/quiz/quizzes` - Create quiz
/// - `GET    /v1/quiz/quizzes` - List quizzes
/// - `GET    /v1/quiz/quizzes/:id` - Quiz with questions in order
/// - `PATCH  /v1/quiz/quizzes/:id` - Update title/description
/// - `DELETE /v1/quiz/quizzes/:id` - Delete quiz
/// - `POST   /v1/quiz/quizzes/:id/questions` - Append a question
/// - `DELETE /v1/quiz/quizzes/:id/questions/:question_id` - Remove a question
/// - `PUT    /v1/quiz/quizzes/:id/order` - Reorder questions
/// - `POST   /v1/quiz/quizzes/:id/submit` - Grade a set of answers

use super::{nullable, Pagination};
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use hearth_shared::models::{
    question::{
        validate_options, CreateQuestion, Difficulty, Question, QuestionFilter, UpdateQuestion,
    },
    quiz::{
        grade, AddQuestionOutcome, Answer, CreateQuiz, Quiz, QuizDetail, QuizResult,
        ReorderOutcome, UpdateQuiz,
    },
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, message = "Prompt is required"))]
    pub prompt: String,

    pub options: Vec<String>,

    /// Zero-based index into `options`
    pub correct_option: i32,

    #[validate(length(max = 100, message = "Category must be at most 100 characters"))]
    pub category: Option<String>,

    #[serde(default)]
    pub difficulty: Difficulty,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuestionRequest {
    #[validate(length(min = 1, message = "Prompt must not be empty"))]
    pub prompt: Option<String>,

    pub options: Option<Vec<String>>,

    pub correct_option: Option<i32>,

    #[serde(default, deserialize_with = "nullable")]
    pub category: Option<Option<String>>,

    pub difficulty: Option<Difficulty>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuestionsQuery {
    pub category: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuizRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,

    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuizRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
}

#[derive(Debug, Deserialize)]
pub struct AddQuestionRequest {
    pub question_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddQuestionResponse {
    pub quiz_id: Uuid,
    pub question_id: Uuid,
    pub position: i32,
}

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    /// Every question currently in the quiz, in the new order
    pub question_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub answers: Vec<Answer>,
}

fn question_not_found() -> ApiError {
    ApiError::NotFound("Question not found".to_string())
}

fn quiz_not_found() -> ApiError {
    ApiError::NotFound("Quiz not found".to_string())
}

pub async fn create_question(
    State(state): State<AppState>,
    Json(req): Json<CreateQuestionRequest>,
) -> ApiResult<(StatusCode, Json<Question>)> {
    req.validate()?;
    validate_options(&req.options, req.correct_option)
        .map_err(|e| ApiError::invalid_field("options", e))?;

    let question = Question::create(
        &state.db,
        CreateQuestion {
            prompt: req.prompt,
            options: req.options.iter().map(|o| o.trim().to_string()).collect(),
            correct_option: req.correct_option,
            category: req.category,
            difficulty: req.difficulty,
        },
    )
    .await?;

    info!(question_id = %question.id, "Question created");
    Ok((StatusCode::CREATED, Json(question)))
}

pub async fn list_questions(
    State(state): State<AppState>,
    Query(query): Query<ListQuestionsQuery>,
) -> ApiResult<Json<Vec<Question>>> {
    let page = Pagination {
        limit: query.limit,
        offset: query.offset,
    };
    page.validate()?;
    let (limit, offset) = page.resolve();

    let questions = Question::list(
        &state.db,
        &QuestionFilter {
            category: query.category,
            difficulty: query.difficulty,
            limit,
            offset,
        },
    )
    .await?;

    Ok(Json(questions))
}

pub async fn get_question(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Question>> {
    let question = Question::find_by_id(&state.db, id)
        .await?
        .ok_or_else(question_not_found)?;

    Ok(Json(question))
}

/// Updates a question. Options and the correct index are validated as a
/// pair against the merged result, so changing either alone is checked
/// against the stored value of the other.
pub async fn update_question(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateQuestionRequest>,
) -> ApiResult<Json<Question>> {
    req.validate()?;

    let options = req
        .options
        .map(|opts| opts.iter().map(|o| o.trim().to_string()).collect::<Vec<_>>());

    if options.is_some() || req.correct_option.is_some() {
        let existing = Question::find_by_id(&state.db, id)
            .await?
            .ok_or_else(question_not_found)?;

        let merged_options = options.as_deref().unwrap_or(&existing.options);
        let merged_correct = req.correct_option.unwrap_or(existing.correct_option);
        validate_options(merged_options, merged_correct)
            .map_err(|e| ApiError::invalid_field("options", e))?;
    }

    let question = Question::update(
        &state.db,
        id,
        UpdateQuestion {
            prompt: req.prompt,
            options,
            correct_option: req.correct_option,
            category: req.category,
            difficulty: req.difficulty,
        },
    )
    .await?
    .ok_or_else(question_not_found)?;

    Ok(Json(question))
}

pub async fn delete_question(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !Question::delete(&state.db, id).await? {
        return Err(question_not_found());
    }

    info!(question_id = %id, "Question deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_quiz(
    State(state): State<AppState>,
    Json(req): Json<CreateQuizRequest>,
) -> ApiResult<(StatusCode, Json<Quiz>)> {
    req.validate()?;

    let quiz = Quiz::create(
        &state.db,
        CreateQuiz {
            title: req.title,
            description: req.description,
        },
    )
    .await?;

    info!(quiz_id = %quiz.id, "Quiz created");
    Ok((StatusCode::CREATED, Json(quiz)))
}

pub async fn list_quizzes(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<Vec<Quiz>>> {
    page.validate()?;
    let (limit, offset) = page.resolve();

    Ok(Json(Quiz::list(&state.db, limit, offset).await?))
}

pub async fn get_quiz(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<QuizDetail>> {
    let detail = Quiz::find_detail(&state.db, id)
        .await?
        .ok_or_else(quiz_not_found)?;

    Ok(Json(detail))
}

pub async fn update_quiz(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateQuizRequest>,
) -> ApiResult<Json<Quiz>> {
    req.validate()?;

    let quiz = Quiz::update(
        &state.db,
        id,
        UpdateQuiz {
            title: req.title,
            description: req.description,
        },
    )
    .await?
    .ok_or_else(quiz_not_found)?;

    Ok(Json(quiz))
}

pub async fn delete_quiz(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !Quiz::delete(&state.db, id).await? {
        return Err(quiz_not_found());
    }

    info!(quiz_id = %id, "Quiz deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Appends a question to the end of the quiz
///
/// # Errors
///
/// - `404 Not Found`: Unknown quiz or question
/// - `409 Conflict`: Question already in the quiz
pub async fn add_question(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<AddQuestionRequest>,
) -> ApiResult<(StatusCode, Json<AddQuestionResponse>)> {
    match Quiz::add_question(&state.db, id, req.question_id).await? {
        AddQuestionOutcome::Added { position } => Ok((
            StatusCode::CREATED,
            Json(AddQuestionResponse {
                quiz_id: id,
                question_id: req.question_id,
                position,
            }),
        )),
        AddQuestionOutcome::QuizNotFound => Err(quiz_not_found()),
        AddQuestionOutcome::QuestionNotFound => Err(question_not_found()),
        AddQuestionOutcome::AlreadyPresent => Err(ApiError::Conflict(
            "Question is already in this quiz".to_string(),
        )),
    }
}

pub async fn remove_question(
    State(state): State<AppState>,
    Path((id, question_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    if !Quiz::remove_question(&state.db, id, question_id).await? {
        return Err(ApiError::NotFound(
            "Question is not part of this quiz".to_string(),
        ));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Reorders the quiz. The body must list every current question exactly
/// once.
pub async fn reorder(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ReorderRequest>,
) -> ApiResult<Json<QuizDetail>> {
    match Quiz::reorder(&state.db, id, &req.question_ids).await? {
        ReorderOutcome::Reordered => {}
        ReorderOutcome::QuizNotFound => return Err(quiz_not_found()),
        ReorderOutcome::Mismatch(reason) => return Err(ApiError::BadRequest(reason)),
    }

    let detail = Quiz::find_detail(&state.db, id)
        .await?
        .ok_or_else(quiz_not_found)?;

    Ok(Json(detail))
}

/// Grades answers. Unanswered questions count as wrong; answering a
/// question outside the quiz is a 400.
pub async fn submit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SubmitRequest>,
) -> ApiResult<Json<QuizResult>> {
    if Quiz::find_by_id(&state.db, id).await?.is_none() {
        return Err(quiz_not_found());
    }

    let questions = Quiz::questions(&state.db, id).await?;
    let result =
        grade(&questions, &req.answers).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    info!(
        quiz_id = %id,
        correct = result.correct,
        total = result.total,
        "Quiz submitted"
    );
    Ok(Json(result))
}
