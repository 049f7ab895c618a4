//! Middleware for the MarkChain API
//!
//! Request tracing, rate limiting, security headers and bearer authentication.

pub mod auth;
mod rate_limiter;
mod security;
mod trace;

pub use auth::{AdminUser, AuthenticatedUser};
pub use rate_limiter::{rate_limit, RateLimiter};
pub use security::security_headers;
pub use trace::request_tracing;
