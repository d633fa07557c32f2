//! Port Check Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Ports, probe outcomes, audit records, restricted port table, traits
//! - `application/` - Configuration and the check-port use case
//! - `infra/` - TCP prober and the rotating, gzip-archiving audit log
//! - `presentation/` - HTTP handlers
//!
//! ## Abuse Model
//! - Every caller is throttled per address before anything else happens
//! - A probe only ever targets the caller's own address
//! - Probe failures collapse to "closed"; no diagnostic detail reaches the caller
//! - Restricted ports are still probed and logged, only the reported label changes

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

// Re-exports for convenience
pub use application::config::PortCheckConfig;
pub use error::{PortCheckError, PortCheckResult};
pub use infra::audit_log::RotatingFileLog;
pub use infra::tcp_prober::TcpPortProber;
pub use presentation::handlers::PortCheckState;
pub use presentation::router::portcheck_router;

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::AppError,
    kind::ErrorKind,
};
