//! Domain Entities
//!
//! Request-scoped values produced and consumed by one port check.

use chrono::{DateTime, Utc};

use crate::domain::value_objects::{ClientId, Port};

/// Timestamp layout of audit lines
pub const AUDIT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// A validated probe target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    pub target: String,
    pub port: Port,
}

impl ProbeRequest {
    /// Probe the caller's own address
    pub fn for_client(client: ClientId, port: Port) -> Self {
        Self {
            target: client.to_string(),
            port,
        }
    }
}

/// Result of one port check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub port: Port,
    pub reachable: bool,
    /// Disclosure policy only; the probe ran regardless
    pub restricted: bool,
}

impl ProbeOutcome {
    /// Caller-facing result text
    pub fn message(&self) -> String {
        let verdict = if self.restricted {
            "restricted"
        } else if self.reachable {
            "open"
        } else {
            "closed"
        };
        format!("Port {} is {}", self.port, verdict)
    }
}

/// One line of the audit trail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub client: ClientId,
    pub port: Port,
    pub reachable: bool,
}

impl AuditRecord {
    pub fn new(client: ClientId, port: Port, reachable: bool) -> Self {
        Self {
            timestamp: Utc::now(),
            client,
            port,
            reachable,
        }
    }

    /// Render as `[<UTC timestamp>] IP: <addr>, PORT: <port>, SUCCESS: <bool>\n`
    pub fn to_line(&self) -> String {
        format!(
            "[{}] IP: {}, PORT: {}, SUCCESS: {}\n",
            self.timestamp.format(AUDIT_TIMESTAMP_FORMAT),
            self.client,
            self.port,
            self.reachable
        )
    }
}
