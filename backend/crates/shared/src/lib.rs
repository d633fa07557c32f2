//! Shared Kernel - Domain-crossing minimal core
//!
//! This crate holds the vocabulary every other crate agrees on:
//! - The error taxonomy ([`error::kind::ErrorKind`]) and its HTTP mapping
//! - The unified error type and result alias ([`error::app_error::AppError`])
//!
//! **Design Principle**: Only include things that are "hard to change"
//! and have consistent meaning across all domains.

pub mod error {
    pub mod app_error;
    pub mod conversions;
    pub mod kind;
}
