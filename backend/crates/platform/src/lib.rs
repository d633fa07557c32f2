//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Client address resolution (trusted proxy header support)
//! - Rate limiting infrastructure (windowed counters and their sweeper)
//! - Human verification (reCAPTCHA) client

pub mod captcha;
pub mod client;
pub mod rate_limit;
