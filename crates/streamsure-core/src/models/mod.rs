//! Data models for the application
//!
//! Assets and their moderation state, the authenticated subject, and the
//! events emitted while an asset moves through the moderation pipeline.

mod asset;
mod event;
mod subject;

pub use asset::*;
pub use event::*;
pub use subject::*;
