//! Pending build proposals
//!
//! One proposal per owner, kept until the owner accepts or denies it or
//! it outlives the TTL. The store is process-scoped and not persisted.

use crate::types::OwnerId;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use forge_blueprint::{Dimensions, StructureBlueprint, Vec3};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// A validated blueprint anchored in the world, awaiting review
#[derive(Debug, Clone)]
pub struct BuildProposal {
    /// Requesting owner
    pub owner: OwnerId,
    /// World coordinate of the blueprint origin
    pub anchor: Vec3,
    /// Short human-readable description
    pub description: String,
    /// Validated blueprint
    pub blueprint: StructureBlueprint,
    /// Monotonic creation time, used for expiry
    pub created_at: Instant,
    /// Wall-clock creation time, for display
    pub requested_at: DateTime<Utc>,
    /// Model or source that produced the blueprint
    pub source_label: String,
}

impl BuildProposal {
    /// Create a proposal stamped with the current time
    #[must_use]
    pub fn new(
        owner: OwnerId,
        anchor: Vec3,
        description: impl Into<String>,
        blueprint: StructureBlueprint,
        source_label: impl Into<String>,
    ) -> Self {
        Self {
            owner,
            anchor,
            description: description.into(),
            blueprint,
            created_at: Instant::now(),
            requested_at: Utc::now(),
            source_label: source_label.into(),
        }
    }

    /// Time since creation
    #[inline]
    #[must_use]
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Whether the proposal has outlived `ttl`
    #[inline]
    #[must_use]
    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.age() > ttl
    }

    /// TTL left, zero once expired
    #[inline]
    #[must_use]
    pub fn remaining(&self, ttl: Duration) -> Duration {
        ttl.saturating_sub(self.age())
    }

    /// Read-only summary for review
    #[must_use]
    pub fn summary(&self, ttl: Duration) -> ProposalSummary {
        ProposalSummary {
            owner: self.owner.clone(),
            anchor: self.anchor,
            description: self.description.clone(),
            definition_count: self.blueprint.definition_count(),
            dimensions_hint: self.blueprint.dimensions_hint,
            source_label: self.source_label.clone(),
            requested_at: self.requested_at,
            remaining: self.remaining(ttl),
        }
    }
}

/// What `inspect` shows an owner
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProposalSummary {
    /// Owner
    pub owner: OwnerId,
    /// Build anchor
    pub anchor: Vec3,
    /// Description
    pub description: String,
    /// Number of placement definitions
    pub definition_count: usize,
    /// Overall size hint, if the blueprint gave one
    pub dimensions_hint: Option<Dimensions>,
    /// Model or source label
    pub source_label: String,
    /// Wall-clock creation time
    pub requested_at: DateTime<Utc>,
    /// TTL left
    pub remaining: Duration,
}

impl fmt::Display for ProposalSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' at ({}) by {}: {} definitions",
            self.description, self.anchor, self.source_label, self.definition_count
        )?;
        if let Some(dims) = self.dimensions_hint {
            write!(f, ", about {dims}")?;
        }
        write!(f, ", expires in {}s", self.remaining.as_secs())
    }
}

/// Owner-keyed proposal registry
#[derive(Debug, Default)]
pub struct ProposalStore {
    proposals: DashMap<OwnerId, BuildProposal>,
}

impl ProposalStore {
    /// Create an empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `proposal` under its owner, returning any proposal it replaced
    pub fn put(&self, proposal: BuildProposal) -> Option<BuildProposal> {
        let owner = proposal.owner.clone();
        let replaced = self.proposals.insert(owner.clone(), proposal);
        if let Some(old) = &replaced {
            tracing::info!(%owner, description = %old.description, "replaced pending proposal");
        }
        replaced
    }

    /// Copy of the owner's pending proposal
    #[must_use]
    pub fn get(&self, owner: &OwnerId) -> Option<BuildProposal> {
        self.proposals.get(owner).map(|entry| entry.value().clone())
    }

    /// Take the owner's pending proposal out of the store
    pub fn remove(&self, owner: &OwnerId) -> Option<BuildProposal> {
        self.proposals.remove(owner).map(|(_, proposal)| proposal)
    }

    /// Drop every proposal older than `ttl`, returning how many were dropped
    pub fn sweep_expired(&self, ttl: Duration) -> usize {
        let mut evicted = 0;
        self.proposals.retain(|owner, proposal| {
            if proposal.is_expired(ttl) {
                tracing::info!(%owner, description = %proposal.description, "expired proposal removed");
                evicted += 1;
                false
            } else {
                true
            }
        });
        evicted
    }

    /// Number of pending proposals
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.proposals.len()
    }

    /// Whether nothing is pending
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.proposals.is_empty()
    }

    /// Run [`sweep_expired`](Self::sweep_expired) every `interval` on a
    /// background task
    ///
    /// Abort the returned handle to stop sweeping.
    pub fn spawn_sweeper(store: Arc<Self>, interval: Duration, ttl: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let evicted = store.sweep_expired(ttl);
                if evicted > 0 {
                    tracing::debug!(evicted, remaining = store.len(), "proposal sweep");
                }
            }
        })
    }
}
