//! StreamSure Core Library
//!
//! This crate provides the domain models, error types, configuration, the
//! role-based access evaluator and the byte-range parser shared across all
//! StreamSure components. Nothing in here performs I/O.

pub mod access;
pub mod config;
pub mod error;
pub mod models;
pub mod range;

// Re-export commonly used types
pub use access::{AccessDenied, AccessPolicy, ListingScope, Operation};
pub use config::{Config, ModerationSettings};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use range::{ByteRange, RangeError};
