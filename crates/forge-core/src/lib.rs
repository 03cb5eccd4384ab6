//! Forge Core - build request orchestration
//!
//! The asynchronous half of the structure build pipeline:
//! - Gates generation requests (single-flight per owner, global cap)
//! - Talks to the generation backend and extracts the blueprint envelope
//! - Keeps one reviewable proposal per owner with a TTL sweep
//! - Executes accepted builds in paced, all-settled batches with an
//!   abort-on-failure threshold
//!
//! # Example
//!
//! ```rust,ignore
//! use forge_core::{BuildService, ForgeConfig, HttpGenerationBackend, OwnerId, SimulatedSink};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ForgeConfig::new();
//! let backend = Arc::new(HttpGenerationBackend::new(&config.generation)?);
//! let service = BuildService::new(config, backend, Arc::new(SimulatedSink::new(0.0, 1)));
//! let _sweeper = service.spawn_sweeper();
//!
//! let owner = OwnerId::new("alex");
//! service.request_build(&owner, forge_blueprint::Vec3::new(0, 64, 0), "a small tower").await?;
//! let outcome = service.accept(&owner).await?;
//! println!("{outcome}");
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod backend;
pub mod config;
pub mod envelope;
pub mod error;
pub mod executor;
pub mod gate;
pub mod logging;
pub mod prompt;
pub mod proposal;
pub mod service;
pub mod sink;
pub mod types;

// Re-exports for convenience
pub use backend::{GenerationBackend, HttpGenerationBackend};
pub use config::ForgeConfig;
pub use envelope::Envelope;
pub use error::{BuildRejection, ConfigError, GateRejection, GenerationError, ReviewError, SinkError};
pub use executor::{BatchExecutor, ExecutionReport, ExecutorConfig, WorldSink};
pub use gate::{GateStats, GenerationGate, GenerationPermit};
pub use proposal::{BuildProposal, ProposalStore, ProposalSummary};
pub use service::{BuildOutcome, BuildService};
pub use sink::SimulatedSink;
pub use types::OwnerId;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with Forge Core
    pub use crate::{
        BatchExecutor, BuildOutcome, BuildService, ExecutionReport, ExecutorConfig, ForgeConfig,
        GenerationBackend, OwnerId, ProposalStore, WorldSink,
    };
    pub use forge_blueprint::{CommandRecord, Vec3};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
