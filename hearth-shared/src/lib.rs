//! # Hearth Shared Library
//!
//! Models, persistence and auth primitives for the Hearth applications.
//!
//! ## Module Organization
//!
//! - `db`: connection pool and embedded migrations
//! - `auth`: password hashing, JWT tokens, request auth context
//! - `models`: one module per entity, each with its CRUD operations

pub mod auth;
pub mod db;
pub mod models;

/// Current version of the Hearth shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
