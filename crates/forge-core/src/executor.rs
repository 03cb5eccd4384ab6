//! Paced batch execution against the world-mutation service
//!
//! Commands are split into consecutive batches. Every command of a batch
//! is submitted concurrently and all results are awaited before the
//! failure ratio is checked; one failure never cancels its siblings.
//! Batches run strictly in sequence with a fixed pause between them.
//!
//! # Abort rule
//!
//! After each batch, with `processed = executed + failed`, execution stops
//! when `processed >= min_commands_for_abort` and
//! `failed / processed * 100 > max_failure_percent`. Small builds below the
//! minimum never abort.

use crate::error::SinkError;
use forge_blueprint::CommandRecord;
use futures::future::join_all;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// World-mutation service
///
/// Each call is independent; a rejected command does not affect others.
#[async_trait::async_trait]
pub trait WorldSink: Send + Sync {
    /// Apply one command
    async fn submit(&self, command: &CommandRecord) -> Result<(), SinkError>;
}

#[async_trait::async_trait]
impl<T: WorldSink + ?Sized> WorldSink for Arc<T> {
    async fn submit(&self, command: &CommandRecord) -> Result<(), SinkError> {
        (**self).submit(command).await
    }
}

/// Batch pacing and abort policy
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutorConfig {
    /// Commands per batch
    pub batch_size: usize,
    /// Pause between batches
    pub inter_batch_delay: Duration,
    /// Failure percentage that triggers an abort
    pub max_failure_percent: f64,
    /// Processed commands required before aborting is considered
    pub min_commands_for_abort: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            inter_batch_delay: Duration::from_millis(50),
            max_failure_percent: 50.0,
            min_commands_for_abort: 20,
        }
    }
}

impl ExecutorConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With batch size (at least 1)
    #[inline]
    #[must_use]
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// With inter-batch delay
    #[inline]
    #[must_use]
    pub fn with_inter_batch_delay(mut self, delay: Duration) -> Self {
        self.inter_batch_delay = delay;
        self
    }

    /// With abort threshold
    #[inline]
    #[must_use]
    pub fn with_max_failure_percent(mut self, percent: f64) -> Self {
        self.max_failure_percent = percent;
        self
    }

    /// With minimum build size for aborting
    #[inline]
    #[must_use]
    pub fn with_min_commands_for_abort(mut self, min: usize) -> Self {
        self.min_commands_for_abort = min;
        self
    }

    fn should_abort(&self, executed: usize, failed: usize) -> bool {
        let processed = executed + failed;
        #[allow(clippy::cast_precision_loss)]
        let over_threshold = failed as f64 * 100.0 > self.max_failure_percent * processed as f64;
        processed >= self.min_commands_for_abort && processed > 0 && over_threshold
    }
}

/// Final tally of one build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionReport {
    /// Commands the sink accepted
    pub executed: usize,
    /// Commands the sink rejected
    pub failed: usize,
    /// Definitions the rasterizer skipped
    pub skipped_definitions: usize,
    /// Whether the failure threshold stopped execution early
    pub aborted: bool,
    /// Batches dispatched
    pub batches: usize,
}

impl ExecutionReport {
    /// Commands dispatched
    #[inline]
    #[must_use]
    pub fn processed(&self) -> usize {
        self.executed + self.failed
    }

    /// Whether every command succeeded and nothing was skipped
    #[inline]
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.skipped_definitions == 0 && !self.aborted
    }
}

impl fmt::Display for ExecutionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} executed, {} failed, {} definitions skipped",
            self.executed, self.failed, self.skipped_definitions
        )?;
        if self.aborted {
            f.write_str(" (aborted)")?;
        }
        Ok(())
    }
}

/// Drains a command stream into a [`WorldSink`]
#[derive(Debug, Clone, Default)]
pub struct BatchExecutor {
    config: ExecutorConfig,
}

impl BatchExecutor {
    /// Create an executor
    #[inline]
    #[must_use]
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    /// Configuration in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Execute `commands` in order; `skipped_definitions` is carried into
    /// the report unchanged
    pub async fn execute<S>(
        &self,
        commands: &[CommandRecord],
        sink: &S,
        skipped_definitions: usize,
    ) -> ExecutionReport
    where
        S: WorldSink + ?Sized,
    {
        let mut report = ExecutionReport {
            skipped_definitions,
            ..ExecutionReport::default()
        };
        let batch_size = self.config.batch_size.max(1);
        let total_batches = commands.len().div_ceil(batch_size);

        for (index, batch) in commands.chunks(batch_size).enumerate() {
            let results = join_all(batch.iter().map(|cmd| sink.submit(cmd))).await;

            for (cmd, result) in batch.iter().zip(results) {
                match result {
                    Ok(()) => report.executed += 1,
                    Err(error) => {
                        tracing::warn!(command = %cmd, %error, "command failed");
                        report.failed += 1;
                    }
                }
            }
            report.batches += 1;

            tracing::debug!(
                batch = index + 1,
                of = total_batches,
                executed = report.executed,
                failed = report.failed,
                "batch complete"
            );

            if self.config.should_abort(report.executed, report.failed) {
                tracing::error!(
                    executed = report.executed,
                    failed = report.failed,
                    threshold = self.config.max_failure_percent,
                    "failure rate over threshold, aborting build"
                );
                report.aborted = true;
                break;
            }

            if index + 1 < total_batches && !self.config.inter_batch_delay.is_zero() {
                tokio::time::sleep(self.config.inter_batch_delay).await;
            }
        }

        tracing::info!(%report, "execution finished");
        report
    }
}
