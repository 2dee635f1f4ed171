//! Scheduled-action fetch pagination and the auto-learn step.

use crate::config::LearnedActions;
use crate::powercampus::{CampusError, CampusStore};
use crate::record::ScheduledAction;
use crate::slate::{MAX_ACTION_IDS_PER_FETCH, OriginFeed, SlateError};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Fetch scheduled actions for every id, paginating so no single request
/// carries more than [`MAX_ACTION_IDS_PER_FETCH`] ids.
pub async fn fetch_all_actions(
	feed: &dyn OriginFeed,
	application_ids: &[String],
) -> Result<Vec<ScheduledAction>, SlateError> {
	let mut all = Vec::new();
	for chunk in application_ids.chunks(MAX_ACTION_IDS_PER_FETCH) {
		let batch = feed.fetch_actions(chunk).await?;
		all.extend(batch);
	}
	debug!(
		"Fetched {} scheduled actions across {} applications",
		all.len(),
		application_ids.len()
	);
	Ok(all)
}

/// Find action codes the allow-list does not know yet, de-duplicated and
/// validated against the destination's action catalog. Codes the destination
/// does not recognize are dropped with a warning.
pub async fn learn_action_codes(
	actions: &[ScheduledAction],
	seed_codes: &[String],
	learned: &LearnedActions,
	store: &dyn CampusStore,
) -> Result<Vec<String>, CampusError> {
	let candidates: BTreeSet<&str> = actions
		.iter()
		.filter_map(|a| a.action_id.as_deref())
		.filter(|code| !seed_codes.iter().any(|s| s == code) && !learned.contains(code))
		.collect();

	let mut validated = Vec::new();
	for code in candidates {
		if store.select_action_definition(code).await?.is_some() {
			debug!("Learned new action code {}", code);
			validated.push(code.to_string());
		} else {
			warn!(
				"Action code {} observed in feed but unknown to destination; ignoring",
				code
			);
		}
	}
	Ok(validated)
}
