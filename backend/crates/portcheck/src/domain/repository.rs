//! Collaborator Traits
//!
//! Interfaces for the side-effecting parts of a check. Implementations are in
//! the infrastructure layer. Rate limiting and human verification traits live
//! in `platform` (`RateLimitStore`, `CaptchaVerifier`).

use crate::domain::entities::{AuditRecord, ProbeRequest};

/// Port prober trait
#[trait_variant::make(PortProber: Send)]
pub trait LocalPortProber {
    /// Attempt one bounded-time TCP connection
    ///
    /// Every failure (refused, unreachable, timeout) is reported as `false`.
    async fn probe(&self, request: &ProbeRequest) -> bool;
}

/// Audit log trait
#[trait_variant::make(AuditLog: Send)]
pub trait LocalAuditLog {
    /// Append one record
    ///
    /// Never fails the caller; write and rotation errors go to diagnostics.
    async fn record(&self, record: AuditRecord);
}
