//! Port Check Router

use crate::domain::repository::{AuditLog, PortProber};
use crate::presentation::handlers::{self, PortCheckState};
use axum::{Router, routing::get};
use platform::captcha::CaptchaVerifier;
use platform::rate_limit::RateLimitStore;

/// Create the port check router for any set of collaborators
pub fn portcheck_router<R, V, P, A>(state: PortCheckState<R, V, P, A>) -> Router
where
    R: RateLimitStore + Send + Sync + 'static,
    V: CaptchaVerifier + Send + Sync + 'static,
    P: PortProber + Send + Sync + 'static,
    A: AuditLog + Send + Sync + 'static,
{
    Router::new()
        .route(
            "/check",
            get(handlers::check_port::<R, V, P, A>).post(handlers::check_port::<R, V, P, A>),
        )
        .route("/health", get(handlers::health))
        .with_state(state)
}
