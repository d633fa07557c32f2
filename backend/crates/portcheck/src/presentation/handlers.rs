//! HTTP Handlers

use crate::application::check_port::{CheckPortInput, CheckPortUseCase};
use crate::domain::repository::{AuditLog, PortProber};
use crate::error::PortCheckResult;
use crate::presentation::dto::{CheckPortRequest, HealthResponse};
use crate::presentation::extract::PeerAddr;
use axum::extract::rejection::{FormRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::{Form, Json};
use platform::captcha::CaptchaVerifier;
use platform::client::extract_client_ip;
use platform::rate_limit::RateLimitStore;
use std::sync::Arc;

/// Shared state for port check handlers
pub struct PortCheckState<R, V, P, A>
where
    R: RateLimitStore,
    V: CaptchaVerifier,
    P: PortProber,
    A: AuditLog,
{
    pub use_case: Arc<CheckPortUseCase<R, V, P, A>>,
    /// Forwarded-address header to honor, if behind a trusted proxy
    pub trusted_header: Option<Arc<str>>,
}

impl<R, V, P, A> PortCheckState<R, V, P, A>
where
    R: RateLimitStore,
    V: CaptchaVerifier,
    P: PortProber,
    A: AuditLog,
{
    pub fn new(use_case: CheckPortUseCase<R, V, P, A>, trusted_header: Option<&str>) -> Self {
        Self {
            use_case: Arc::new(use_case),
            trusted_header: trusted_header.map(Arc::from),
        }
    }
}

impl<R, V, P, A> Clone for PortCheckState<R, V, P, A>
where
    R: RateLimitStore,
    V: CaptchaVerifier,
    P: PortProber,
    A: AuditLog,
{
    fn clone(&self) -> Self {
        Self {
            use_case: Arc::clone(&self.use_case),
            trusted_header: self.trusted_header.clone(),
        }
    }
}

/// GET|POST /check
///
/// An unreadable body never rejects the request: missing fields are taken
/// from the query string, and whatever is still empty fails validation after
/// the caller has been admitted.
pub async fn check_port<R, V, P, A>(
    State(state): State<PortCheckState<R, V, P, A>>,
    headers: HeaderMap,
    PeerAddr(peer): PeerAddr,
    query: Result<Query<CheckPortRequest>, QueryRejection>,
    form: Result<Form<CheckPortRequest>, FormRejection>,
) -> PortCheckResult<String>
where
    R: RateLimitStore + Send + Sync + 'static,
    V: CaptchaVerifier + Send + Sync + 'static,
    P: PortProber + Send + Sync + 'static,
    A: AuditLog + Send + Sync + 'static,
{
    let body = form.map(|Form(req)| req).unwrap_or_else(|rejection| {
        tracing::debug!(error = %rejection, "Unreadable check form");
        CheckPortRequest::default()
    });
    let req = body.or(query.map(|Query(req)| req).unwrap_or_default());

    let client_ip = extract_client_ip(
        &headers,
        peer.map(|addr| addr.ip()),
        state.trusted_header.as_deref(),
    );

    let input = CheckPortInput {
        client_ip,
        port: req.port,
        captcha_token: req.captcha_token,
    };

    let output = state.use_case.execute(input).await?;
    Ok(output.message())
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}
