//! Human verification (reCAPTCHA)
//!
//! Verifies a client-supplied reCAPTCHA token against Google's `siteverify`
//! endpoint. Verification is fail-closed: any transport or parse failure is
//! logged and treated as "not verified".

use std::net::IpAddr;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// reCAPTCHA verification endpoint
pub const RECAPTCHA_VERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

/// Upper bound for the verification round-trip
const VERIFY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum CaptchaError {
    /// Request could not be sent or no response arrived
    #[error("Verification request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Endpoint answered with a non-success status
    #[error("Verification endpoint returned status: {0}")]
    Status(reqwest::StatusCode),
}

/// Trait for human verification backends
#[trait_variant::make(CaptchaVerifier: Send)]
pub trait LocalCaptchaVerifier {
    /// Returns true only if the token was positively verified
    async fn verify(&self, token: &str, remote_ip: Option<IpAddr>) -> bool;
}

#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

/// reCAPTCHA `siteverify` client
#[derive(Clone)]
pub struct RecaptchaVerifier {
    client: reqwest::Client,
    secret: String,
    endpoint: String,
}

impl RecaptchaVerifier {
    pub fn new(secret: impl Into<String>) -> Result<Self, CaptchaError> {
        Self::with_endpoint(secret, RECAPTCHA_VERIFY_URL)
    }

    /// Point the verifier at a different `siteverify`-compatible endpoint
    pub fn with_endpoint(
        secret: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Result<Self, CaptchaError> {
        let client = reqwest::Client::builder().timeout(VERIFY_TIMEOUT).build()?;
        Ok(Self {
            client,
            secret: secret.into(),
            endpoint: endpoint.into(),
        })
    }

    async fn site_verify(
        &self,
        token: &str,
        remote_ip: Option<IpAddr>,
    ) -> Result<SiteVerifyResponse, CaptchaError> {
        let remote_ip = remote_ip.map(|ip| ip.to_string());
        let mut form = vec![("secret", self.secret.as_str()), ("response", token)];
        if let Some(ip) = remote_ip.as_deref() {
            form.push(("remoteip", ip));
        }

        let response = self.client.post(&self.endpoint).form(&form).send().await?;
        if !response.status().is_success() {
            return Err(CaptchaError::Status(response.status()));
        }
        Ok(response.json::<SiteVerifyResponse>().await?)
    }
}

impl std::fmt::Debug for RecaptchaVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecaptchaVerifier")
            .field("secret", &"[REDACTED]")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl CaptchaVerifier for RecaptchaVerifier {
    async fn verify(&self, token: &str, remote_ip: Option<IpAddr>) -> bool {
        if token.trim().is_empty() {
            return false;
        }

        match self.site_verify(token, remote_ip).await {
            Ok(body) => {
                if !body.success {
                    tracing::debug!(error_codes = ?body.error_codes, "reCAPTCHA token rejected");
                }
                body.success
            }
            Err(e) => {
                tracing::warn!(error = %e, "reCAPTCHA validation request failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::post;
    use axum::{Form, Json, Router};
    use std::collections::HashMap;

    /// Local stand-in for `siteverify` that accepts exactly one token
    async fn spawn_fake_siteverify(status: axum::http::StatusCode) -> String {
        let app = Router::new().route(
            "/siteverify",
            post(move |Form(form): Form<HashMap<String, String>>| async move {
                let ok = form.get("secret").map(String::as_str) == Some("s3cret")
                    && form.get("response").map(String::as_str) == Some("good-token");
                let body = if ok {
                    serde_json::json!({ "success": true })
                } else {
                    serde_json::json!({ "success": false, "error-codes": ["invalid-input-response"] })
                };
                (status, Json(body))
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/siteverify", addr)
    }

    #[tokio::test]
    async fn test_valid_token_verified() {
        let endpoint = spawn_fake_siteverify(axum::http::StatusCode::OK).await;
        let verifier = RecaptchaVerifier::with_endpoint("s3cret", endpoint).unwrap();

        let remote_ip = Some("127.0.0.1".parse().unwrap());
        assert!(CaptchaVerifier::verify(&verifier, "good-token", remote_ip).await);
        assert!(!CaptchaVerifier::verify(&verifier, "bad-token", None).await);
    }

    #[tokio::test]
    async fn test_error_status_fails_closed() {
        let endpoint = spawn_fake_siteverify(axum::http::StatusCode::BAD_GATEWAY).await;
        let verifier = RecaptchaVerifier::with_endpoint("s3cret", endpoint).unwrap();

        assert!(!CaptchaVerifier::verify(&verifier, "good-token", None).await);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_fails_closed() {
        // Bind then drop to get a port nobody listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let verifier =
            RecaptchaVerifier::with_endpoint("s3cret", format!("http://{}/siteverify", addr))
                .unwrap();
        assert!(!CaptchaVerifier::verify(&verifier, "good-token", None).await);
    }

    #[tokio::test]
    async fn test_empty_token_short_circuits() {
        let verifier =
            RecaptchaVerifier::with_endpoint("s3cret", "http://127.0.0.1:9/unused").unwrap();
        assert!(!CaptchaVerifier::verify(&verifier, "", None).await);
        assert!(!CaptchaVerifier::verify(&verifier, "  ", None).await);
    }

    #[test]
    fn test_debug_redacts_secret() {
        let verifier = RecaptchaVerifier::new("s3cret").unwrap();
        let debug = format!("{:?}", verifier);
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_response_parsing() {
        let body: SiteVerifyResponse =
            serde_json::from_str(r#"{"success":true,"challenge_ts":"2024-01-01T00:00:00Z"}"#)
                .unwrap();
        assert!(body.success);
        assert!(body.error_codes.is_empty());
    }
}
