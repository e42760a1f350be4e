//! # Hearth API Server Library
//!
//! HTTP surface for the Hearth applications: accounts, inventory, quizzes,
//! gym bookings, recipes and cat activity tracking.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Response security headers
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
