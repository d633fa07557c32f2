//! Application Configuration
//!
//! Configuration for the port check application layer.

use std::path::PathBuf;
use std::time::Duration;

/// Re-export from platform
pub use platform::client::DEFAULT_PROXY_HEADER;
pub use platform::rate_limit::RateLimitConfig;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Port check application configuration
#[derive(Debug, Clone)]
pub struct PortCheckConfig {
    /// Per-client admission policy
    pub rate_limit: RateLimitConfig,
    /// Upper bound for one TCP connect attempt
    pub probe_timeout: Duration,
    /// Rotate the audit log once it grows beyond this many MiB
    pub max_log_size_mb: u64,
    /// Active audit log file; archives are written next to it
    pub log_file_path: PathBuf,
    /// Whether a reverse proxy in front of us sets `proxy_header`
    pub trust_proxy_header: bool,
    /// Forwarded-client-address header honored when trusted
    pub proxy_header: String,
}

impl Default for PortCheckConfig {
    fn default() -> Self {
        Self {
            rate_limit: RateLimitConfig::default(),
            probe_timeout: Duration::from_secs(5),
            max_log_size_mb: 10,
            log_file_path: PathBuf::from("portcheck.log"),
            trust_proxy_header: false,
            proxy_header: DEFAULT_PROXY_HEADER.to_string(),
        }
    }
}

impl PortCheckConfig {
    pub fn max_log_size_bytes(&self) -> u64 {
        self.max_log_size_mb.saturating_mul(BYTES_PER_MB)
    }

    /// Header to honor for the client address, if any
    pub fn trusted_header(&self) -> Option<&str> {
        self.trust_proxy_header.then_some(self.proxy_header.as_str())
    }
}
