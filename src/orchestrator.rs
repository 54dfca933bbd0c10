//! Analysis orchestration.
//!
//! Sequences one full run through an explicit state machine:
//!
//! ```text
//! Idle → VersionDetected → Decrypted → Extracted → ArtifactWritten → Serving → Done
//!   └────────────┴────────────┴────────────┴────────────┴──── Failed
//! ```
//!
//! Collaborators (version probe, decryptor, store factory) are trait
//! objects, so every transition, including the failure paths, can be
//! exercised without a real account. A failed stage moves the machine to
//! `Failed` and surfaces a [`StageError`] naming the activity that broke;
//! there is no automatic retry, the whole run is re-invoked by the
//! operator. Data-only runs skip `Serving` and jump straight to `Done`.

use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info};

use crate::assets;
use crate::decrypt::{Credentials, Decryptor};
use crate::error::{AnalysisError, Result};
use crate::export;
use crate::graph;
use crate::models::TimeWindow;
use crate::probe::{StoreVariant, VersionProbe};
use crate::progress::ExtractProgressReporter;
use crate::score;
use crate::server;
use crate::stats;
use crate::store::StoreFactory;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    VersionDetected,
    Decrypted,
    Extracted,
    ArtifactWritten,
    Serving,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::VersionDetected => "version-detected",
            Stage::Decrypted => "decrypted",
            Stage::Extracted => "extracted",
            Stage::ArtifactWritten => "artifact-written",
            Stage::Serving => "serving",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// The activity in flight while the machine sits in `stage`; used to name
/// the failing stage in error reports.
fn activity(stage: Stage) -> &'static str {
    match stage {
        Stage::Idle => "version detection",
        Stage::VersionDetected => "decryption",
        Stage::Decrypted => "extraction",
        Stage::Extracted => "artifact write",
        Stage::ArtifactWritten | Stage::Serving => "serving",
        Stage::Done | Stage::Failed => "analysis",
    }
}

/// A pipeline error tagged with the failing stage's name.
#[derive(Debug, Error)]
#[error("{stage} failed: {source}")]
pub struct StageError {
    pub stage: &'static str,
    #[source]
    pub source: AnalysisError,
}

/// Everything one run needs; owned by the caller, read-only here.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub source_dir: PathBuf,
    pub output_dir: PathBuf,
    pub window: TimeWindow,
    pub max_nodes: usize,
    pub credentials: Credentials,
    pub host: String,
    pub port: u16,
    pub open_browser: bool,
    pub serve: bool,
}

#[derive(Debug)]
pub struct RunSummary {
    pub contacts: usize,
    pub artifact_path: PathBuf,
}

pub struct Orchestrator<'a> {
    probe: &'a dyn VersionProbe,
    decryptor: &'a dyn Decryptor,
    store_factory: &'a dyn StoreFactory,
    progress: &'a dyn ExtractProgressReporter,
    stage: Stage,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        probe: &'a dyn VersionProbe,
        decryptor: &'a dyn Decryptor,
        store_factory: &'a dyn StoreFactory,
        progress: &'a dyn ExtractProgressReporter,
    ) -> Self {
        Self {
            probe,
            decryptor,
            store_factory,
            progress,
            stage: Stage::Idle,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Run the full pipeline. On error the machine lands in `Failed` and
    /// the returned [`StageError`] names the activity that broke.
    pub async fn run(&mut self, opts: &RunOptions) -> std::result::Result<RunSummary, StageError> {
        match self.advance(opts).await {
            Ok(summary) => Ok(summary),
            Err(source) => {
                let stage = activity(self.stage);
                self.stage = Stage::Failed;
                error!("analysis failed during {}: {}", stage, source);
                Err(StageError { stage, source })
            }
        }
    }

    async fn advance(&mut self, opts: &RunOptions) -> Result<RunSummary> {
        let run_start = Instant::now();

        info!("step 1: version detection");
        let detection = self.probe.probe()?;
        if detection.variant == StoreVariant::Unknown {
            return Err(AnalysisError::VersionUnknown);
        }
        info!(
            "detected version {} (variant {})",
            detection.version.as_deref().unwrap_or("unknown"),
            detection.variant
        );
        self.stage = Stage::VersionDetected;

        info!("step 2: decrypting chat store");
        if self.decryptor.requires_key() && opts.credentials.key.is_none() {
            return Err(AnalysisError::MissingCredentials);
        }
        let work_dir = opts.output_dir.join("store");
        let store_dir = self
            .decryptor
            .decrypt(&opts.credentials, &opts.source_dir, &work_dir)
            .await?;
        self.stage = Stage::Decrypted;

        info!("step 3: extracting chat statistics");
        let extract_start = Instant::now();
        let store = self.store_factory.open(&store_dir).await?;
        let contact_stats = stats::collect_stats(store.as_ref(), &opts.window, self.progress).await?;
        let mut scored = score::score_contacts(contact_stats);
        scored.sort_by(|a, b| {
            b.interaction_score
                .partial_cmp(&a.interaction_score)
                .unwrap_or(Ordering::Equal)
        });
        if scored.len() > opts.max_nodes {
            info!(
                "keeping the {} highest-scoring of {} contacts",
                opts.max_nodes,
                scored.len()
            );
            scored.truncate(opts.max_nodes);
        }
        info!(
            "extraction completed - duration={:.2}s, contacts={}",
            extract_start.elapsed().as_secs_f32(),
            scored.len()
        );
        self.stage = Stage::Extracted;

        info!("step 4: writing graph artifact");
        let artifact = graph::build_graph(&scored, &opts.window);
        let artifact_path = export::write_artifact(&artifact, &opts.output_dir)?;
        assets::install_viewer(&opts.output_dir)?;
        println!("Artifact written to {}", artifact_path.display());
        self.stage = Stage::ArtifactWritten;

        let summary = RunSummary {
            contacts: scored.len(),
            artifact_path,
        };

        if opts.serve {
            info!("step 5: serving visualization");
            self.stage = Stage::Serving;
            server::serve(&opts.output_dir, &opts.host, opts.port, opts.open_browser).await?;
        }

        self.stage = Stage::Done;
        info!(
            "analysis complete - total_duration={:.2}s, contacts={}",
            run_start.elapsed().as_secs_f32(),
            summary.contacts
        );
        Ok(summary)
    }
}
