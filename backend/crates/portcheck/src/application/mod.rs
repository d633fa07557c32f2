//! Application Layer - Use Cases
//!
//! This layer orchestrates domain logic and infrastructure.

pub mod check_port;
pub mod config;
