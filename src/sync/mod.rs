//! Sync orchestrator and its per-cycle machinery.
//!
//! One cycle fetches the application batch from the origin system, reconciles
//! every record against the destination, and reports results back to the
//! origin. Per-record failures during the creation/update/checklist steps are
//! contained and attributed to the offending record; only a batch-level fetch
//! or auth failure aborts the cycle.

pub mod actions;
pub mod diff;
mod orchestrator;
mod outcome;

#[cfg(test)]
pub(crate) mod testing;

pub use orchestrator::SyncOrchestrator;
pub use outcome::{BatchOutcome, RecordOutcome, SyncStage};

use crate::config::ConfigError;
use crate::mapping::MappingError;
use crate::powercampus::CampusError;
use crate::slate::SlateError;

/// Error types for a sync cycle
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
	#[error("origin system error: {0}")]
	Slate(#[from] SlateError),

	#[error("destination system error: {0}")]
	Campus(#[from] CampusError),

	#[error("mapping error: {0}")]
	Mapping(#[from] MappingError),

	#[error("configuration error: {0}")]
	Config(#[from] ConfigError),

	/// Empty batch in interactive single-id mode; unattended runs treat an
	/// empty batch as success instead.
	#[error("{0}")]
	NoRecordsFound(String),
}
