//! Pipeline engine
//!
//! One spawned task per asset generation. Stages run in order, each bounded by
//! the stage timeout and isolated from panics; any stage failure resolves to a
//! flagged classification. The terminal write goes through the repository's
//! generation guard so a superseded or overridden run can never commit.

use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use streamsure_core::config::ModerationSettings;
use streamsure_core::models::{Asset, ModerationDecision, PipelineEvent, Stage};
use streamsure_core::AppError;
use streamsure_db::{AssetRepository, CommitOutcome};
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use crate::analyzer::{AnalysisError, MetadataExtractor, RiskAnalyzer, StageScore};
use crate::analyzers::{ContextAnalyzer, SimulatedAnalyzer, SizeBasedMetadataExtractor};
use crate::decision::decide;
use crate::events::EventBroadcaster;
use crate::registry::RunRegistry;

/// The pluggable stages of a run.
#[derive(Debug, Clone)]
pub struct ModerationStages {
    pub metadata: Arc<dyn MetadataExtractor>,
    pub visual: Arc<dyn RiskAnalyzer>,
    pub audio: Arc<dyn RiskAnalyzer>,
    pub context: Arc<dyn RiskAnalyzer>,
}

impl ModerationStages {
    /// Size-based metadata, simulated visual/audio, denylist context.
    pub fn simulated(settings: &ModerationSettings) -> Self {
        let latency = settings.latency_range_ms();
        Self {
            metadata: Arc::new(SizeBasedMetadataExtractor),
            visual: Arc::new(SimulatedAnalyzer::visual(latency)),
            audio: Arc::new(SimulatedAnalyzer::audio(latency)),
            context: Arc::new(ContextAnalyzer::new(&settings.denylist)),
        }
    }
}

#[derive(Debug, Error)]
enum StageFailure {
    #[error("{stage} stage timed out after {timeout:?}")]
    TimedOut { stage: &'static str, timeout: Duration },

    #[error("{stage} stage panicked")]
    Panicked { stage: &'static str },

    #[error("{stage} stage failed: {source}")]
    Analysis {
        stage: &'static str,
        #[source]
        source: AnalysisError,
    },

    #[error("Failed to record metadata: {0}")]
    Repository(#[from] AppError),
}

/// How a run ended.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// The weighted decision was written.
    Committed(Asset),
    /// A stage failed and the asset was flagged.
    FailedClosed(Asset),
    /// The terminal write was refused by the guard.
    Discarded(CommitOutcome),
    /// A newer generation took over before the metadata write.
    Superseded,
}

#[derive(Debug, Clone)]
pub struct PipelineEngine {
    repository: Arc<dyn AssetRepository>,
    stages: ModerationStages,
    events: EventBroadcaster,
    runs: RunRegistry,
    stage_timeout: Duration,
}

impl PipelineEngine {
    pub fn new(
        repository: Arc<dyn AssetRepository>,
        stages: ModerationStages,
        events: EventBroadcaster,
        stage_timeout: Duration,
    ) -> Self {
        Self {
            repository,
            stages,
            events,
            runs: RunRegistry::new(),
            stage_timeout,
        }
    }

    pub fn events(&self) -> &EventBroadcaster {
        &self.events
    }

    pub fn runs(&self) -> &RunRegistry {
        &self.runs
    }

    /// Start a background run for the asset's current generation.
    ///
    /// Returns immediately. An older run for the same asset is aborted.
    pub fn schedule(&self, asset: &Asset) {
        let asset_id = asset.id;
        let generation = asset.generation;
        let engine = self.clone();
        let asset = asset.clone();
        let (start_tx, start_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            // Wait until the run is registered so `finish` cannot race `register`.
            if start_rx.await.is_err() {
                return;
            }
            match engine.run(asset).await {
                Ok(outcome) => tracing::debug!(
                    asset_id = %asset_id,
                    generation,
                    outcome = outcome_label(&outcome),
                    "Moderation run finished"
                ),
                Err(e) => tracing::error!(
                    asset_id = %asset_id,
                    generation,
                    error = %e,
                    "Moderation run could not write its result"
                ),
            }
            engine.runs.finish(asset_id, generation);
        });

        if self.runs.register(asset_id, generation, task.abort_handle()) {
            let _ = start_tx.send(());
            tracing::debug!(asset_id = %asset_id, generation, "Moderation run scheduled");
        }
    }

    /// Schedule a run for every `processing` asset that has no live run and
    /// was last touched at least `min_age` ago.
    ///
    /// Runs only live in this process, so a restart would otherwise strand
    /// whatever was mid-pipeline. Returns how many runs were started.
    pub async fn resume_processing(&self, min_age: Duration) -> Result<usize, AppError> {
        let cutoff = chrono::Utc::now()
            - chrono::Duration::from_std(min_age).unwrap_or(chrono::Duration::zero());
        let mut resumed = 0;
        for asset in self.repository.find_processing().await? {
            if asset.updated_at > cutoff || self.runs.is_running(asset.id) {
                continue;
            }
            tracing::info!(
                asset_id = %asset.id,
                generation = asset.generation,
                "Resuming moderation of unclassified asset"
            );
            self.schedule(&asset);
            resumed += 1;
        }
        Ok(resumed)
    }

    /// Periodically resume `processing` assets whose run was lost, e.g. after
    /// a failed terminal write. Assets updated within the last `every` are left
    /// alone so a freshly submitted asset is never picked up twice.
    pub fn spawn_reaper(&self, every: Duration) -> JoinHandle<()> {
        let engine = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick fires immediately; startup already resumed everything.
            interval.tick().await;
            loop {
                interval.tick().await;
                match engine.resume_processing(every).await {
                    Ok(0) => {}
                    Ok(count) => tracing::warn!(count, "Reaper resumed stranded moderation runs"),
                    Err(e) => tracing::error!(error = %e, "Moderation reaper failed"),
                }
            }
        })
    }

    /// Abort the in-flight run of an asset, if any.
    pub fn cancel(&self, asset_id: Uuid) -> bool {
        let cancelled = self.runs.cancel(asset_id);
        if cancelled {
            tracing::debug!(asset_id = %asset_id, "Moderation run cancelled");
        }
        cancelled
    }

    /// Run every stage for `asset` and commit the outcome.
    #[tracing::instrument(skip(self, asset), fields(asset_id = %asset.id, generation = asset.generation))]
    pub async fn run(&self, asset: Asset) -> Result<RunOutcome, AppError> {
        let decision = match self.analyze(&asset).await {
            Ok(Some(decision)) => decision,
            Ok(None) => {
                tracing::debug!("Run superseded before metadata was recorded");
                return Ok(RunOutcome::Superseded);
            }
            Err(failure) => {
                tracing::warn!(error = %failure, "Moderation stage failed, flagging asset");
                return self.commit_fail_closed(&asset).await;
            }
        };

        match self
            .repository
            .commit_decision(asset.id, asset.generation, &decision)
            .await?
        {
            CommitOutcome::Committed(updated) => {
                tracing::info!(
                    status = %decision.status,
                    risk_score = decision.risk_score,
                    "Moderation decision committed"
                );
                self.publish(&asset, PipelineEvent::progress(asset.id, Stage::Decision));
                self.publish(&asset, PipelineEvent::completion(asset.id, &decision));
                Ok(RunOutcome::Committed(updated))
            }
            other => {
                log_discarded(&other);
                Ok(RunOutcome::Discarded(other))
            }
        }
    }

    /// Returns `None` when the run was superseded before its first write.
    async fn analyze(&self, asset: &Asset) -> Result<Option<ModerationDecision>, StageFailure> {
        let metadata = self
            .guarded(Stage::Metadata, self.stages.metadata.extract(asset))
            .await?;
        let recorded = self
            .repository
            .record_metadata(asset.id, asset.generation, metadata.duration_secs)
            .await?;
        if !recorded {
            return Ok(None);
        }
        self.publish(asset, PipelineEvent::progress(asset.id, Stage::Metadata));

        let visual = self.score(Stage::Visual, &self.stages.visual, asset).await?;
        let audio = self.score(Stage::Audio, &self.stages.audio, asset).await?;
        let context = self
            .score(Stage::Context, &self.stages.context, asset)
            .await?;

        Ok(Some(decide(&visual, &audio, &context)))
    }

    async fn score(
        &self,
        stage: Stage,
        analyzer: &Arc<dyn RiskAnalyzer>,
        asset: &Asset,
    ) -> Result<StageScore, StageFailure> {
        let score = self
            .guarded(stage, async {
                analyzer.analyze(asset).await.and_then(StageScore::validated)
            })
            .await?;
        tracing::debug!(
            stage = stage.as_str(),
            analyzer = analyzer.name(),
            score = score.score,
            "Stage scored"
        );
        self.publish(asset, PipelineEvent::progress(asset.id, stage));
        Ok(score)
    }

    async fn guarded<T, F>(&self, stage: Stage, fut: F) -> Result<T, StageFailure>
    where
        F: Future<Output = Result<T, AnalysisError>>,
    {
        let stage = stage.as_str();
        match tokio::time::timeout(self.stage_timeout, AssertUnwindSafe(fut).catch_unwind()).await
        {
            Err(_) => Err(StageFailure::TimedOut {
                stage,
                timeout: self.stage_timeout,
            }),
            Ok(Err(_)) => Err(StageFailure::Panicked { stage }),
            Ok(Ok(Err(source))) => Err(StageFailure::Analysis { stage, source }),
            Ok(Ok(Ok(value))) => Ok(value),
        }
    }

    async fn commit_fail_closed(&self, asset: &Asset) -> Result<RunOutcome, AppError> {
        let decision = ModerationDecision::fail_closed();
        match self
            .repository
            .commit_decision(asset.id, asset.generation, &decision)
            .await?
        {
            CommitOutcome::Committed(updated) => {
                self.publish(asset, PipelineEvent::completion(asset.id, &decision));
                Ok(RunOutcome::FailedClosed(updated))
            }
            other => {
                log_discarded(&other);
                Ok(RunOutcome::Discarded(other))
            }
        }
    }

    fn publish(&self, asset: &Asset, event: PipelineEvent) {
        self.events.publish(asset.owner_id, event);
    }
}

fn log_discarded(outcome: &CommitOutcome) {
    match outcome {
        CommitOutcome::Overridden => {
            tracing::info!("Asset was reviewed during the run, decision discarded")
        }
        other => tracing::debug!(outcome = other.as_str(), "Decision discarded"),
    }
}

fn outcome_label(outcome: &RunOutcome) -> &'static str {
    match outcome {
        RunOutcome::Committed(_) => "committed",
        RunOutcome::FailedClosed(_) => "failed_closed",
        RunOutcome::Discarded(inner) => inner.as_str(),
        RunOutcome::Superseded => "superseded",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::FixedScoreAnalyzer;
    use crate::events::EventFilter;
    use async_trait::async_trait;
    use futures::StreamExt;
    use streamsure_core::models::{AssetStatus, BlobRef, NewAsset, ReviewAction, Visibility};
    use streamsure_db::InMemoryAssetRepository;
    use tokio::sync::Notify;

    #[derive(Debug)]
    struct FailingAnalyzer;

    #[async_trait]
    impl RiskAnalyzer for FailingAnalyzer {
        fn name(&self) -> &str {
            "failing"
        }

        async fn analyze(&self, _asset: &Asset) -> Result<StageScore, AnalysisError> {
            Err(AnalysisError::Failed("model offline".to_string()))
        }
    }

    #[derive(Debug)]
    struct PanickingAnalyzer;

    #[async_trait]
    impl RiskAnalyzer for PanickingAnalyzer {
        fn name(&self) -> &str {
            "panicking"
        }

        async fn analyze(&self, _asset: &Asset) -> Result<StageScore, AnalysisError> {
            panic!("model crashed");
        }
    }

    /// Signals when entered, then blocks until released.
    #[derive(Debug, Default)]
    struct GatedAnalyzer {
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl RiskAnalyzer for GatedAnalyzer {
        fn name(&self) -> &str {
            "gated"
        }

        async fn analyze(&self, _asset: &Asset) -> Result<StageScore, AnalysisError> {
            self.entered.notify_one();
            self.release.notified().await;
            StageScore::new(0.95, ["visual_explicit_content"])
        }
    }

    fn fixed(name: &str, score: f64) -> Arc<dyn RiskAnalyzer> {
        Arc::new(FixedScoreAnalyzer::new(name, score))
    }

    fn stages(visual: Arc<dyn RiskAnalyzer>) -> ModerationStages {
        ModerationStages {
            metadata: Arc::new(SizeBasedMetadataExtractor),
            visual,
            audio: fixed("audio", 0.2),
            context: Arc::new(ContextAnalyzer::new(["gore"])),
        }
    }

    fn engine_with(
        repository: &InMemoryAssetRepository,
        stages: ModerationStages,
        timeout: Duration,
    ) -> PipelineEngine {
        PipelineEngine::new(
            Arc::new(repository.clone()),
            stages,
            EventBroadcaster::new(64),
            timeout,
        )
    }

    async fn stored_asset(repository: &InMemoryAssetRepository, title: &str) -> Asset {
        repository
            .create(Asset::new(NewAsset {
                owner_id: Uuid::new_v4(),
                title: title.to_string(),
                description: String::new(),
                blob: BlobRef {
                    key: "media/a/b.mp4".to_string(),
                    size: 750_000,
                },
                content_type: "video/mp4".to_string(),
                visibility: Visibility::default(),
            }))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_happy_path_events_in_stage_order() {
        let repository = InMemoryAssetRepository::new();
        let engine = engine_with(
            &repository,
            stages(fixed("visual", 0.8)),
            Duration::from_secs(5),
        );
        let asset = stored_asset(&repository, "Gore compilation").await;
        let mut events = Box::pin(engine.events().subscribe_stream(EventFilter::All));

        let outcome = engine.run(asset.clone()).await.unwrap();

        // 0.5*0.8 + 0.3*0.2 + 0.2*0.9 = 0.64
        let updated = match outcome {
            RunOutcome::Committed(updated) => updated,
            other => panic!("expected commit, got {:?}", other),
        };
        assert_eq!(updated.status, AssetStatus::Flagged);
        assert!((updated.risk_score.unwrap() - 0.64).abs() < 1e-9);
        assert!(updated.reasons.contains("suspicious_keywords"));
        assert_eq!(updated.duration_secs, Some(3.0));

        let mut percents = Vec::new();
        for _ in 0..5 {
            match events.next().await.unwrap() {
                PipelineEvent::Progress {
                    percent_complete, ..
                } => percents.push(percent_complete),
                other => panic!("unexpected event {:?}", other),
            }
        }
        assert_eq!(percents, vec![10, 30, 60, 80, 100]);
        match events.next().await.unwrap() {
            PipelineEvent::Completion {
                asset_id, status, ..
            } => {
                assert_eq!(asset_id, asset.id);
                assert_eq!(status, AssetStatus::Flagged);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failing_stage_flags_asset() {
        let repository = InMemoryAssetRepository::new();
        let engine = engine_with(
            &repository,
            stages(Arc::new(FailingAnalyzer)),
            Duration::from_secs(5),
        );
        let asset = stored_asset(&repository, "Cats").await;
        let mut events = Box::pin(engine.events().subscribe_stream(EventFilter::All));

        let outcome = engine.run(asset.clone()).await.unwrap();
        assert!(matches!(outcome, RunOutcome::FailedClosed(_)));

        let stored = repository.get(asset.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AssetStatus::Flagged);
        assert_eq!(stored.risk_score, Some(1.0));
        assert!(stored.reasons.is_empty());

        // Metadata progress, then straight to completion.
        assert_eq!(events.next().await.unwrap().kind(), "progress");
        match events.next().await.unwrap() {
            PipelineEvent::Completion {
                status, risk_score, ..
            } => {
                assert_eq!(status, AssetStatus::Flagged);
                assert_eq!(risk_score, Some(1.0));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_panicking_stage_flags_asset() {
        let repository = InMemoryAssetRepository::new();
        let engine = engine_with(
            &repository,
            stages(Arc::new(PanickingAnalyzer)),
            Duration::from_secs(5),
        );
        let asset = stored_asset(&repository, "Cats").await;

        let outcome = engine.run(asset.clone()).await.unwrap();
        assert!(matches!(outcome, RunOutcome::FailedClosed(_)));
        let stored = repository.get(asset.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AssetStatus::Flagged);
    }

    #[tokio::test]
    async fn test_stage_timeout_flags_asset() {
        let repository = InMemoryAssetRepository::new();
        let slow = FixedScoreAnalyzer::new("visual", 0.0).with_delay(Duration::from_secs(30));
        let engine = engine_with(
            &repository,
            stages(Arc::new(slow)),
            Duration::from_millis(50),
        );
        let asset = stored_asset(&repository, "Cats").await;

        let outcome = engine.run(asset.clone()).await.unwrap();
        match outcome {
            RunOutcome::FailedClosed(updated) => {
                assert_eq!(updated.status, AssetStatus::Flagged);
                assert_eq!(updated.risk_score, Some(1.0));
            }
            other => panic!("expected fail-closed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_review_during_run_is_not_overwritten() {
        let repository = InMemoryAssetRepository::new();
        let gate = Arc::new(GatedAnalyzer::default());
        let engine = engine_with(&repository, stages(gate.clone()), Duration::from_secs(5));
        let asset = stored_asset(&repository, "Gore").await;

        let run = {
            let engine = engine.clone();
            let asset = asset.clone();
            tokio::spawn(async move { engine.run(asset).await })
        };
        gate.entered.notified().await;
        repository
            .apply_review(asset.id, ReviewAction::Approve, Some("checked".to_string()))
            .await
            .unwrap();
        gate.release.notify_one();

        let outcome = run.await.unwrap().unwrap();
        assert!(matches!(
            outcome,
            RunOutcome::Discarded(CommitOutcome::Overridden)
        ));
        let stored = repository.get(asset.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AssetStatus::Safe);
        assert_eq!(stored.admin_notes.as_deref(), Some("checked"));
    }

    #[tokio::test]
    async fn test_replaced_content_makes_run_stale() {
        let repository = InMemoryAssetRepository::new();
        let gate = Arc::new(GatedAnalyzer::default());
        let engine = engine_with(&repository, stages(gate.clone()), Duration::from_secs(5));
        let asset = stored_asset(&repository, "Cats").await;

        let run = {
            let engine = engine.clone();
            let asset = asset.clone();
            tokio::spawn(async move { engine.run(asset).await })
        };
        gate.entered.notified().await;
        repository
            .replace_content(
                asset.id,
                BlobRef {
                    key: "media/a/c.mp4".to_string(),
                    size: 10,
                },
                "video/mp4".to_string(),
            )
            .await
            .unwrap();
        gate.release.notify_one();

        let outcome = run.await.unwrap().unwrap();
        assert!(matches!(outcome, RunOutcome::Discarded(CommitOutcome::Stale)));
        let stored = repository.get(asset.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AssetStatus::Processing);
        assert_eq!(stored.generation, 2);
    }

    #[tokio::test]
    async fn test_scheduled_run_completes_and_unregisters() {
        let repository = InMemoryAssetRepository::new();
        let engine = engine_with(
            &repository,
            stages(fixed("visual", 0.1)),
            Duration::from_secs(5),
        );
        let asset = stored_asset(&repository, "Cats").await;
        let mut events = Box::pin(engine.events().subscribe_stream(EventFilter::Owner(
            asset.owner_id,
        )));

        engine.schedule(&asset);

        loop {
            if events.next().await.unwrap().kind() == "completion" {
                break;
            }
        }
        let stored = repository.get(asset.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AssetStatus::Safe);

        for _ in 0..50 {
            if !engine.runs().is_running(asset.id) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!engine.runs().is_running(asset.id));
    }

    #[tokio::test]
    async fn test_resume_processing_classifies_stranded_assets() {
        let repository = InMemoryAssetRepository::new();
        let engine = engine_with(
            &repository,
            stages(fixed("visual", 0.1)),
            Duration::from_secs(5),
        );
        let stranded = stored_asset(&repository, "Cats").await;
        let settled = stored_asset(&repository, "Dogs").await;
        engine.run(settled.clone()).await.unwrap();
        let mut events = Box::pin(engine.events().subscribe_stream(EventFilter::Owner(
            stranded.owner_id,
        )));

        assert_eq!(engine.resume_processing(Duration::ZERO).await.unwrap(), 1);

        loop {
            if events.next().await.unwrap().kind() == "completion" {
                break;
            }
        }
        let stored = repository.get(stranded.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AssetStatus::Safe);
    }

    #[tokio::test]
    async fn test_resume_processing_skips_live_and_recent_runs() {
        let repository = InMemoryAssetRepository::new();
        let gate = Arc::new(GatedAnalyzer::default());
        let engine = engine_with(&repository, stages(gate.clone()), Duration::from_secs(5));
        let running = stored_asset(&repository, "Cats").await;

        engine.schedule(&running);
        gate.entered.notified().await;
        assert_eq!(engine.resume_processing(Duration::ZERO).await.unwrap(), 0);

        stored_asset(&repository, "Dogs").await;
        assert_eq!(
            engine
                .resume_processing(Duration::from_secs(3600))
                .await
                .unwrap(),
            0
        );
        gate.release.notify_one();
    }

    #[tokio::test]
    async fn test_cancel_stops_scheduled_run() {
        let repository = InMemoryAssetRepository::new();
        let gate = Arc::new(GatedAnalyzer::default());
        let engine = engine_with(&repository, stages(gate.clone()), Duration::from_secs(5));
        let asset = stored_asset(&repository, "Cats").await;

        engine.schedule(&asset);
        gate.entered.notified().await;

        assert!(engine.cancel(asset.id));
        assert!(!engine.runs().is_running(asset.id));
        gate.release.notify_one();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let stored = repository.get(asset.id).await.unwrap().unwrap();
        assert_eq!(stored.status, AssetStatus::Processing);
    }
}
