//! StreamSure moderation pipeline
//!
//! Runs every submitted asset through metadata extraction and three weighted
//! risk analyzers, commits a terminal classification under a generation guard
//! and publishes progress to live subscribers.

pub mod analyzer;
pub mod analyzers;
pub mod decision;
pub mod engine;
pub mod events;
pub mod registry;

pub use analyzer::{AnalysisError, AssetMetadata, MetadataExtractor, RiskAnalyzer, StageScore};
pub use analyzers::{
    ContextAnalyzer, FixedScoreAnalyzer, SimulatedAnalyzer, SimulatedChannel,
    SizeBasedMetadataExtractor,
};
pub use decision::decide;
pub use engine::{ModerationStages, PipelineEngine, RunOutcome};
pub use events::{EventBroadcaster, EventFilter};
pub use registry::RunRegistry;
