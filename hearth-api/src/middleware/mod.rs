/// Middleware modules for the API server
///
/// - `security`: OWASP security headers on every response
///
/// JWT authentication lives in `app` as an axum `from_fn` layer.

pub mod security;
