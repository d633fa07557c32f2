//! API DTOs (Data Transfer Objects)

use serde::{Deserialize, Serialize};

/// Form (or query) fields for GET/POST /check
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckPortRequest {
    #[serde(default)]
    pub port: String,
    #[serde(default, rename = "g-recaptcha-response")]
    pub captcha_token: String,
}

impl CheckPortRequest {
    /// Fill empty fields from `fallback`; values already present win
    pub fn or(self, fallback: Self) -> Self {
        let pick = |own: String, other: String| if own.is_empty() { other } else { own };
        Self {
            port: pick(self.port, fallback.port),
            captcha_token: pick(self.captcha_token, fallback.captcha_token),
        }
    }
}

/// Response for GET /health
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
}
