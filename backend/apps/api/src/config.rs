//! Server configuration
//!
//! Read once at startup from the process environment (after `.env`).
//! Every variable is optional except `RECAPTCHA_SECRET`.

use anyhow::{Context, bail};
use platform::rate_limit::RateLimitConfig;
use portcheck::PortCheckConfig;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_LISTEN_ADDR: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 6355);
const DEFAULT_STATIC_DIR: &str = "www";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub portcheck: PortCheckConfig,
    pub recaptcha_secret: String,
    /// Directory holding the landing page `index.html`
    pub static_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let defaults = PortCheckConfig::default();

        let listen_addr = parse_or(&var, "LISTEN_ADDR", || DEFAULT_LISTEN_ADDR)?;

        let max_requests: u32 = parse_or(&var, "RATE_LIMIT_THRESHOLD", || {
            defaults.rate_limit.max_requests
        })?;
        let window_secs: u64 = parse_or(&var, "RATE_LIMIT_WINDOW_SECS", || {
            defaults.rate_limit.window.as_secs()
        })?;
        let probe_timeout_secs: u64 = parse_or(&var, "PROBE_TIMEOUT_SECS", || {
            defaults.probe_timeout.as_secs()
        })?;
        let max_log_size_mb: u64 =
            parse_or(&var, "MAX_LOG_SIZE_MB", || defaults.max_log_size_mb)?;

        require_positive("RATE_LIMIT_THRESHOLD", u64::from(max_requests))?;
        require_positive("RATE_LIMIT_WINDOW_SECS", window_secs)?;
        require_positive("PROBE_TIMEOUT_SECS", probe_timeout_secs)?;
        require_positive("MAX_LOG_SIZE_MB", max_log_size_mb)?;

        let trust_proxy_header = match var("TRUST_PROXY_HEADER") {
            Some(raw) => parse_bool(&raw)
                .with_context(|| format!("TRUST_PROXY_HEADER must be a boolean, got {:?}", raw))?,
            None => defaults.trust_proxy_header,
        };

        let proxy_header = var("PROXY_HEADER").unwrap_or(defaults.proxy_header);
        if axum::http::HeaderName::from_str(&proxy_header).is_err() {
            bail!("PROXY_HEADER is not a valid header name: {:?}", proxy_header);
        }

        let log_file_path = var("LOG_FILE_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.log_file_path);

        let recaptcha_secret =
            var("RECAPTCHA_SECRET").context("RECAPTCHA_SECRET must be set in environment")?;

        let static_dir = PathBuf::from(
            var("STATIC_DIR").unwrap_or_else(|| DEFAULT_STATIC_DIR.to_string()),
        );

        Ok(Self {
            listen_addr,
            portcheck: PortCheckConfig {
                rate_limit: RateLimitConfig::new(max_requests, window_secs),
                probe_timeout: Duration::from_secs(probe_timeout_secs),
                max_log_size_mb,
                log_file_path,
                trust_proxy_header,
                proxy_header,
            },
            recaptcha_secret,
            static_dir,
        })
    }
}

fn parse_or<T, V, D>(var: &V, name: &str, default: D) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    V: Fn(&str) -> Option<String>,
    D: FnOnce() -> T,
{
    match var(name) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("{} has an invalid value: {:?}", name, raw)),
        None => Ok(default()),
    }
}

fn require_positive(name: &str, value: u64) -> anyhow::Result<()> {
    if value == 0 {
        bail!("{} must be greater than zero", name);
    }
    Ok(())
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> anyhow::Result<AppConfig> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[("RECAPTCHA_SECRET", "s3cret")]).unwrap();

        assert_eq!(config.listen_addr, "0.0.0.0:6355".parse().unwrap());
        assert_eq!(config.portcheck.rate_limit.max_requests, 5);
        assert_eq!(config.portcheck.rate_limit.window, Duration::from_secs(300));
        assert_eq!(config.portcheck.probe_timeout, Duration::from_secs(5));
        assert_eq!(config.portcheck.max_log_size_bytes(), 10 * 1024 * 1024);
        assert_eq!(config.portcheck.log_file_path, PathBuf::from("portcheck.log"));
        assert!(config.portcheck.trusted_header().is_none());
        assert_eq!(config.recaptcha_secret, "s3cret");
        assert_eq!(config.static_dir, PathBuf::from("www"));
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("RECAPTCHA_SECRET", "s3cret"),
            ("LISTEN_ADDR", "127.0.0.1:8080"),
            ("RATE_LIMIT_THRESHOLD", "10"),
            ("RATE_LIMIT_WINDOW_SECS", "60"),
            ("PROBE_TIMEOUT_SECS", "2"),
            ("MAX_LOG_SIZE_MB", "1"),
            ("LOG_FILE_PATH", "/var/log/portcheck/audit.log"),
            ("TRUST_PROXY_HEADER", "TRUE"),
            ("PROXY_HEADER", "X-Real-IP"),
            ("STATIC_DIR", "/srv/www"),
        ])
        .unwrap();

        assert_eq!(config.listen_addr.port(), 8080);
        assert_eq!(config.portcheck.rate_limit.max_requests, 10);
        assert_eq!(config.portcheck.rate_limit.window, Duration::from_secs(60));
        assert_eq!(config.portcheck.probe_timeout, Duration::from_secs(2));
        assert_eq!(config.portcheck.max_log_size_bytes(), 1024 * 1024);
        assert_eq!(config.portcheck.trusted_header(), Some("X-Real-IP"));
        assert_eq!(config.static_dir, PathBuf::from("/srv/www"));
    }

    #[test]
    fn test_missing_secret() {
        let err = config_from(&[]).unwrap_err();
        assert!(err.to_string().contains("RECAPTCHA_SECRET"));

        let err = config_from(&[("RECAPTCHA_SECRET", "  ")]).unwrap_err();
        assert!(err.to_string().contains("RECAPTCHA_SECRET"));
    }

    #[test]
    fn test_invalid_values_name_the_variable() {
        let cases = [
            ("LISTEN_ADDR", "not-an-address"),
            ("RATE_LIMIT_THRESHOLD", "-3"),
            ("RATE_LIMIT_THRESHOLD", "0"),
            ("RATE_LIMIT_WINDOW_SECS", "five"),
            ("RATE_LIMIT_WINDOW_SECS", "0"),
            ("PROBE_TIMEOUT_SECS", "0"),
            ("MAX_LOG_SIZE_MB", "1.5"),
            ("TRUST_PROXY_HEADER", "maybe"),
            ("PROXY_HEADER", "bad header"),
        ];

        for (name, value) in cases {
            let err = config_from(&[("RECAPTCHA_SECRET", "s3cret"), (name, value)]).unwrap_err();
            assert!(
                err.to_string().contains(name),
                "error for {}={:?} should name the variable: {}",
                name,
                value,
                err
            );
        }
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("Yes"), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool(""), None);
    }
}
