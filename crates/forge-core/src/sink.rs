//! Built-in world sinks

use crate::error::SinkError;
use crate::executor::WorldSink;
use forge_blueprint::CommandRecord;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Sink that accepts or rejects commands at random
///
/// Stands in for a live world when dry-running a blueprint.
#[derive(Debug)]
pub struct SimulatedSink {
    failure_rate: f64,
    latency: Duration,
    rng: Mutex<StdRng>,
    submitted: AtomicUsize,
}

impl SimulatedSink {
    /// Sink failing each command with probability `failure_rate` (clamped to 0..=1)
    #[must_use]
    pub fn new(failure_rate: f64, seed: u64) -> Self {
        let failure_rate = if failure_rate.is_finite() {
            failure_rate.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            failure_rate,
            latency: Duration::ZERO,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            submitted: AtomicUsize::new(0),
        }
    }

    /// With per-command latency
    #[inline]
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Commands seen so far
    #[must_use]
    pub fn submitted(&self) -> usize {
        self.submitted.load(Ordering::Relaxed)
    }
}

#[async_trait::async_trait]
impl WorldSink for SimulatedSink {
    async fn submit(&self, command: &CommandRecord) -> Result<(), SinkError> {
        self.submitted.fetch_add(1, Ordering::Relaxed);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let fail = self.rng.lock().gen_bool(self.failure_rate);
        if fail {
            return Err(SinkError::Rejected(format!("simulated failure for {command}")));
        }
        tracing::trace!(%command, "simulated command applied");
        Ok(())
    }
}
