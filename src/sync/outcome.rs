use crate::record::ComputedState;
use std::fmt;

/// Per-cycle step a record failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStage {
	Creation,
	Update,
	Actions,
	FinancialAid,
}

impl fmt::Display for SyncStage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SyncStage::Creation => write!(f, "creation"),
			SyncStage::Update => write!(f, "update"),
			SyncStage::Actions => write!(f, "actions"),
			SyncStage::FinancialAid => write!(f, "financial aid"),
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordFailure {
	pub stage: SyncStage,
	pub reason: String,
}

/// Outcome of one application record across the cycle. Failures accumulate
/// here instead of being suppressed; a record with any failure is excluded
/// from subsequent destination writes.
#[derive(Debug, Clone, Default)]
pub struct RecordOutcome {
	pub application_id: String,
	pub state: Option<ComputedState>,
	pub created: bool,
	pub updated: bool,
	pub failures: Vec<RecordFailure>,
}

/// Collected outcomes for the whole batch, in feed order.
#[derive(Debug, Default)]
pub struct BatchOutcome {
	outcomes: Vec<RecordOutcome>,
}

impl BatchOutcome {
	pub fn new() -> Self {
		Self::default()
	}

	fn entry(&mut self, application_id: &str) -> &mut RecordOutcome {
		if let Some(idx) = self
			.outcomes
			.iter()
			.position(|o| o.application_id == application_id)
		{
			&mut self.outcomes[idx]
		} else {
			self.outcomes.push(RecordOutcome {
				application_id: application_id.to_string(),
				..RecordOutcome::default()
			});
			self.outcomes.last_mut().expect("just pushed")
		}
	}

	pub fn set_state(&mut self, application_id: &str, state: Option<ComputedState>) {
		self.entry(application_id).state = state;
	}

	pub fn mark_created(&mut self, application_id: &str) {
		self.entry(application_id).created = true;
	}

	pub fn mark_updated(&mut self, application_id: &str) {
		self.entry(application_id).updated = true;
	}

	pub fn record_failure(&mut self, application_id: &str, stage: SyncStage, reason: String) {
		self.entry(application_id)
			.failures
			.push(RecordFailure { stage, reason });
	}

	/// Whether the record has failed and must be excluded from further
	/// destination writes this cycle.
	pub fn is_excluded(&self, application_id: &str) -> bool {
		self.outcomes
			.iter()
			.any(|o| o.application_id == application_id && !o.failures.is_empty())
	}

	pub fn outcomes(&self) -> &[RecordOutcome] {
		&self.outcomes
	}

	pub fn created_count(&self) -> usize {
		self.outcomes.iter().filter(|o| o.created).count()
	}

	pub fn updated_count(&self) -> usize {
		self.outcomes.iter().filter(|o| o.updated).count()
	}

	pub fn failed_count(&self) -> usize {
		self.outcomes.iter().filter(|o| !o.failures.is_empty()).count()
	}

	/// Render the operator-facing cycle summary.
	pub fn summary(&self, total: usize, done_message: &str) -> String {
		let mut text = format!(
			"Processed {} applications: {} created, {} updated, {} failed.",
			total,
			self.created_count(),
			self.updated_count(),
			self.failed_count()
		);
		for outcome in &self.outcomes {
			for failure in &outcome.failures {
				text.push_str(&format!(
					"\n  {} failed during {}: {}",
					outcome.application_id, failure.stage, failure.reason
				));
			}
		}
		text.push('\n');
		text.push_str(done_message);
		text
	}
}
