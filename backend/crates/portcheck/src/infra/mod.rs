//! Infrastructure Layer
//!
//! Network and filesystem implementations of the domain traits.

pub mod audit_log;
pub mod tcp_prober;
