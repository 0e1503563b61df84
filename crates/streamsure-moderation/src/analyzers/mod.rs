//! Bundled analyzer implementations

mod context;
mod fixed;
mod metadata;
mod simulated;

pub use context::ContextAnalyzer;
pub use fixed::FixedScoreAnalyzer;
pub use metadata::SizeBasedMetadataExtractor;
pub use simulated::{SimulatedAnalyzer, SimulatedChannel};
