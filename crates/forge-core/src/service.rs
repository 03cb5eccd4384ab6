//! Build service
//!
//! Ties the pipeline together behind the operations an owner can invoke:
//! - `request_build`: gate, generate, extract, validate, store a proposal
//! - `inspect`: read-only view of the pending proposal
//! - `accept`: take the proposal, rasterize it, execute it in batches
//! - `deny`: discard the proposal
//!
//! The proposal store and the generation gate are the only shared mutable
//! state; both are injected so several services (or tests) can share them.

use crate::backend::GenerationBackend;
use crate::config::ForgeConfig;
use crate::envelope;
use crate::error::{BuildRejection, ReviewError};
use crate::executor::{BatchExecutor, ExecutionReport, WorldSink};
use crate::gate::GenerationGate;
use crate::prompt;
use crate::proposal::{BuildProposal, ProposalStore, ProposalSummary};
use crate::types::OwnerId;
use dashmap::DashMap;
use forge_blueprint::{Rasterizer, Vec3};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Result of an accepted build
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildOutcome {
    /// Owner who accepted
    pub owner: OwnerId,
    /// Proposal description
    pub description: String,
    /// Build anchor
    pub anchor: Vec3,
    /// Commands produced by rasterization
    pub command_count: usize,
    /// Approximate blocks placed if every command succeeds
    pub estimated_blocks: u64,
    /// Execution tally
    pub report: ExecutionReport,
}

impl fmt::Display for BuildOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.report.aborted {
            "aborted"
        } else if self.report.is_clean() {
            "completed"
        } else {
            "partially completed"
        };
        write!(
            f,
            "'{}' {status}: {}/{} commands executed",
            self.description, self.report.executed, self.command_count
        )?;
        if self.report.failed > 0 {
            write!(f, ", {} failed", self.report.failed)?;
        }
        if self.report.skipped_definitions > 0 {
            write!(f, ", {} definitions skipped", self.report.skipped_definitions)?;
        }
        Ok(())
    }
}

/// Request handling for structure builds
pub struct BuildService {
    config: ForgeConfig,
    store: Arc<ProposalStore>,
    gate: Arc<GenerationGate>,
    backend: Arc<dyn GenerationBackend>,
    sink: Arc<dyn WorldSink>,
    executor: BatchExecutor,
    models: DashMap<OwnerId, String>,
    raster_seed: Option<u64>,
}

impl fmt::Debug for BuildService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildService")
            .field("pending", &self.store.len())
            .field("gate", &self.gate.stats())
            .field("executor", self.executor.config())
            .finish_non_exhaustive()
    }
}

impl BuildService {
    /// Create a service with its own store and gate
    #[must_use]
    pub fn new(
        config: ForgeConfig,
        backend: Arc<dyn GenerationBackend>,
        sink: Arc<dyn WorldSink>,
    ) -> Self {
        let gate = Arc::new(GenerationGate::new(config.generation.max_concurrent));
        Self {
            executor: BatchExecutor::new(config.executor_config()),
            store: Arc::new(ProposalStore::new()),
            gate,
            backend,
            sink,
            models: DashMap::new(),
            raster_seed: None,
            config,
        }
    }

    /// Share an existing proposal store
    #[inline]
    #[must_use]
    pub fn with_store(mut self, store: Arc<ProposalStore>) -> Self {
        self.store = store;
        self
    }

    /// Share an existing generation gate
    #[inline]
    #[must_use]
    pub fn with_gate(mut self, gate: Arc<GenerationGate>) -> Self {
        self.gate = gate;
        self
    }

    /// Make palette choices reproducible
    #[inline]
    #[must_use]
    pub fn with_raster_seed(mut self, seed: u64) -> Self {
        self.raster_seed = Some(seed);
        self
    }

    /// Proposal store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<ProposalStore> {
        &self.store
    }

    /// Generation gate
    #[inline]
    #[must_use]
    pub fn gate(&self) -> &Arc<GenerationGate> {
        &self.gate
    }

    /// Start the periodic expiry sweep for this service's store
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        ProposalStore::spawn_sweeper(
            Arc::clone(&self.store),
            self.config.sweep_interval(),
            self.config.proposal_ttl(),
        )
    }

    /// Pin `owner` to `model` for later requests; returns whether the
    /// override was recorded
    pub fn set_model(&self, owner: &OwnerId, model: impl Into<String>) -> bool {
        if !self.config.generation.allow_model_override {
            tracing::warn!(%owner, "model override disabled by configuration");
            return false;
        }
        let model = model.into();
        tracing::info!(%owner, %model, "model override set");
        self.models.insert(owner.clone(), model);
        true
    }

    /// Drop `owner`'s model override
    pub fn clear_model(&self, owner: &OwnerId) {
        self.models.remove(owner);
    }

    /// Model used for `owner`'s next request
    #[must_use]
    pub fn model_for(&self, owner: &OwnerId) -> String {
        self.models
            .get(owner)
            .map_or_else(|| self.config.generation.model.clone(), |m| m.value().clone())
    }

    /// Generate and store a proposal for `owner` anchored at `anchor`
    ///
    /// Holds the owner's generation slot for the whole attempt. A previous
    /// pending proposal is replaced only once the new one has validated.
    ///
    /// # Errors
    /// - [`BuildRejection::EmptyPrompt`] for a blank prompt
    /// - [`BuildRejection::Busy`] if the gate refuses the request
    /// - [`BuildRejection::Generation`] on backend or envelope failure
    /// - [`BuildRejection::Invalid`] if the blueprint fails validation
    pub async fn request_build(
        &self,
        owner: &OwnerId,
        anchor: Vec3,
        prompt_text: &str,
    ) -> Result<BuildProposal, BuildRejection> {
        if prompt_text.trim().is_empty() {
            return Err(BuildRejection::EmptyPrompt);
        }

        let _permit = self.gate.try_acquire(owner)?;
        let model = self.model_for(owner);
        tracing::info!(%owner, %anchor, %model, prompt = prompt_text.trim(), "build requested");

        let result = self.generate_proposal(owner, anchor, prompt_text, model).await;
        match &result {
            Ok(proposal) => {
                tracing::info!(
                    %owner,
                    description = %proposal.description,
                    definitions = proposal.blueprint.definition_count(),
                    "proposal created"
                );
                self.store.put(proposal.clone());
            }
            Err(error) => tracing::error!(%owner, %error, "build request failed"),
        }
        result
    }

    async fn generate_proposal(
        &self,
        owner: &OwnerId,
        anchor: Vec3,
        prompt_text: &str,
        model: String,
    ) -> Result<BuildProposal, BuildRejection> {
        let full_prompt = prompt::build_prompt(prompt_text, anchor);
        let text = self.backend.generate(&full_prompt, &model).await?;
        let envelope = envelope::extract(&text)?;
        let blueprint = forge_blueprint::validate(&envelope.document)?;

        Ok(BuildProposal::new(
            owner.clone(),
            anchor,
            envelope.description,
            blueprint,
            model,
        ))
    }

    /// Summary of `owner`'s pending proposal
    ///
    /// # Errors
    /// [`ReviewError::NoPendingProposal`] if nothing is pending.
    pub fn inspect(&self, owner: &OwnerId) -> Result<ProposalSummary, ReviewError> {
        self.store
            .get(owner)
            .map(|p| p.summary(self.config.proposal_ttl()))
            .ok_or_else(|| ReviewError::NoPendingProposal(owner.clone()))
    }

    /// Discard `owner`'s pending proposal
    ///
    /// # Errors
    /// [`ReviewError::NoPendingProposal`] if nothing is pending.
    pub fn deny(&self, owner: &OwnerId) -> Result<BuildProposal, ReviewError> {
        let proposal = self
            .store
            .remove(owner)
            .ok_or_else(|| ReviewError::NoPendingProposal(owner.clone()))?;
        tracing::info!(%owner, description = %proposal.description, "proposal denied");
        Ok(proposal)
    }

    /// Build `owner`'s pending proposal
    ///
    /// The proposal leaves the store before execution starts, so a second
    /// accept during a running build finds nothing.
    ///
    /// # Errors
    /// [`ReviewError::NoPendingProposal`] if nothing is pending.
    pub async fn accept(&self, owner: &OwnerId) -> Result<BuildOutcome, ReviewError> {
        let proposal = self
            .store
            .remove(owner)
            .ok_or_else(|| ReviewError::NoPendingProposal(owner.clone()))?;
        tracing::info!(
            %owner,
            description = %proposal.description,
            source = %proposal.source_label,
            "proposal accepted"
        );

        let rasterization = {
            let mut rasterizer = match self.raster_seed {
                Some(seed) => Rasterizer::seeded(seed),
                None => Rasterizer::from_entropy(),
            }
            .with_limits(self.config.raster_limits());
            rasterizer.rasterize_blueprint(&proposal.blueprint, proposal.anchor)
        };

        let report = if rasterization.is_empty() {
            tracing::warn!(%owner, description = %proposal.description, "nothing to build");
            ExecutionReport {
                skipped_definitions: rasterization.skipped_definitions,
                ..ExecutionReport::default()
            }
        } else {
            self.executor
                .execute(&rasterization.commands, self.sink.as_ref(), rasterization.skipped_definitions)
                .await
        };

        let outcome = BuildOutcome {
            owner: owner.clone(),
            description: proposal.description,
            anchor: proposal.anchor,
            command_count: rasterization.commands.len(),
            estimated_blocks: rasterization.estimated_blocks,
            report,
        };
        tracing::info!(%outcome, "build finished");
        Ok(outcome)
    }
}
