//! Generation concurrency gate
//!
//! Single-flight per owner plus a global in-flight cap. A successful
//! [`GenerationGate::try_acquire`] hands out a [`GenerationPermit`] whose
//! drop releases the slot, so an early return, an error or a panic inside
//! the generation path can never leak it.

use crate::error::GateRejection;
use crate::types::OwnerId;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// Gate statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GateStats {
    /// Generations currently in flight
    pub in_flight: usize,
    /// Configured global cap
    pub max_concurrent: usize,
    /// Permits granted since creation
    pub total_granted: u64,
    /// Requests refused since creation
    pub total_rejected: u64,
}

#[derive(Debug, Default)]
struct GateState {
    owners: HashSet<OwnerId>,
    total_granted: u64,
    total_rejected: u64,
}

/// Tracks which owners have a generation in flight
#[derive(Debug)]
pub struct GenerationGate {
    max_concurrent: usize,
    state: Mutex<GateState>,
}

impl GenerationGate {
    /// Create a gate allowing `max_concurrent` generations at once
    #[inline]
    #[must_use]
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent,
            state: Mutex::new(GateState::default()),
        }
    }

    /// Claim a slot for `owner`
    ///
    /// # Errors
    /// - [`GateRejection::OwnerBusy`] if the owner already holds a slot
    /// - [`GateRejection::AtCapacity`] if the global cap is reached
    pub fn try_acquire(self: &Arc<Self>, owner: &OwnerId) -> Result<GenerationPermit, GateRejection> {
        let mut state = self.state.lock();

        if state.owners.contains(owner) {
            state.total_rejected += 1;
            return Err(GateRejection::OwnerBusy(owner.clone()));
        }
        if state.owners.len() >= self.max_concurrent {
            state.total_rejected += 1;
            return Err(GateRejection::AtCapacity(state.owners.len()));
        }

        state.owners.insert(owner.clone());
        state.total_granted += 1;
        tracing::debug!(%owner, in_flight = state.owners.len(), "generation slot acquired");

        Ok(GenerationPermit {
            gate: Arc::clone(self),
            owner: owner.clone(),
        })
    }

    /// Free `owner`'s slot; returns whether one was held
    ///
    /// Called by [`GenerationPermit`] on drop.
    pub fn release(&self, owner: &OwnerId) -> bool {
        let mut state = self.state.lock();
        let released = state.owners.remove(owner);
        tracing::debug!(%owner, in_flight = state.owners.len(), "generation slot released");
        released
    }

    /// Whether `owner` currently holds a slot
    #[must_use]
    pub fn is_in_flight(&self, owner: &OwnerId) -> bool {
        self.state.lock().owners.contains(owner)
    }

    /// Generations in flight
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.state.lock().owners.len()
    }

    /// Snapshot of counters
    #[must_use]
    pub fn stats(&self) -> GateStats {
        let state = self.state.lock();
        GateStats {
            in_flight: state.owners.len(),
            max_concurrent: self.max_concurrent,
            total_granted: state.total_granted,
            total_rejected: state.total_rejected,
        }
    }
}

/// Scoped hold on a generation slot
#[derive(Debug)]
#[must_use = "dropping the permit releases the slot immediately"]
pub struct GenerationPermit {
    gate: Arc<GenerationGate>,
    owner: OwnerId,
}

impl GenerationPermit {
    /// Owner holding the slot
    #[inline]
    #[must_use]
    pub fn owner(&self) -> &OwnerId {
        &self.owner
    }
}

impl Drop for GenerationPermit {
    fn drop(&mut self) {
        self.gate.release(&self.owner);
    }
}
