//! StreamSure API Library
//!
//! HTTP handlers, authentication, services and application setup for the
//! StreamSure moderation and delivery service.

mod api_doc;
pub mod constants;
mod handlers;
mod middleware;
pub mod services;
pub mod setup;
mod telemetry;
mod utils;

pub mod auth;
pub mod error;
pub mod state;

pub use api_doc::ApiDoc;
pub use error::ErrorResponse;
