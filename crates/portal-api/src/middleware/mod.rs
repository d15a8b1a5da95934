//! API Middleware
//!
//! Session checks for protected API endpoints and page routes.

pub mod auth;

pub use auth::{extract_token, redirect_unauthenticated, require_auth, SessionState};
