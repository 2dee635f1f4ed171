//! Startup configuration and the learned action-code store.
//!
//! The startup config is read-only for the life of a cycle. Action codes
//! discovered by the auto-learn step live in a separate mutable store with its
//! own load/append/persist contract, so learning never rewrites the main
//! config file.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("JSON parse error: {0}")]
	Json(#[from] serde_json::Error),
}

/// URL plus basic-auth credentials for one HTTP endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Endpoint {
	pub url: String,
	pub username: String,
	pub password: String,
}

/// An origin write-back target together with the field names it carries.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadTarget {
	#[serde(flatten)]
	pub endpoint: Endpoint,
	#[serde(default)]
	pub fields: Vec<String>,
}

/// Default values supplied where the feed leaves a required sub-field unset.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Defaults {
	pub address_country: Option<String>,
	pub phone_country: Option<String>,
	/// Type assigned to phones the feed leaves untyped; falls back to the
	/// phone's output position when unset.
	pub phone_type: Option<i64>,
}

///// Mapping auto-configuration: grow the mapping document from program/degree
/// pairs seen in the feed, optionally validated against the destination's
/// degree-requirement records.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AutoconfigureMappings {
	#[serde(default)]
	pub enabled: bool,
	#[serde(default)]
	pub validate_degreq: bool,
	#[serde(default)]
	pub minimum_degreq_year: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduledActionsConfig {
	pub enabled: bool,
	#[serde(default)]
	pub autolearn_action_codes: bool,
	pub slate_get: Option<Endpoint>,
	/// Seed allow-list of admissions action codes.
	#[serde(default)]
	pub action_codes: Vec<String>,
	/// Path of the mutable learned-codes store.
	#[serde(default)]
	pub learned_codes_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FaChecklistConfig {
	pub enabled: bool,
	pub slate_post: Option<Endpoint>,
}

/// Note or user-defined-field update driven by config: copy one origin field
/// into the destination when present.
#[derive(Debug, Clone, Deserialize)]
pub struct NoteField {
	pub slate_field: String,
	pub office: String,
	pub note_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserDefinedField {
	pub slate_field: String,
	pub pc_field: String,
}

fn default_sync_done() -> String {
	"Done. Check the sync report for per-application detail.".to_string()
}

fn default_no_apps() -> String {
	"No applications found for that id.".to_string()
}

/// Operator-facing message strings.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageStrings {
	#[serde(default = "default_sync_done")]
	pub sync_done: String,
	#[serde(default = "default_no_apps")]
	pub error_no_apps: String,
}

impl Default for MessageStrings {
	fn default() -> Self {
		Self {
			sync_done: default_sync_done(),
			error_no_apps: default_no_apps(),
		}
	}
}

/// The persisted JSON configuration document.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub slate_query_apps: Endpoint,
	pub slate_upload_passive: UploadTarget,
	pub slate_upload_active: UploadTarget,
	pub slate_upload_schools: Option<Endpoint>,

	pub pc_api: Endpoint,
	pub pc_database_url: String,
	pub mapping_file_location: String,
	pub status_log_table: String,

	#[serde(default)]
	pub defaults: Defaults,
	#[serde(default)]
	pub autoconfigure_mappings: AutoconfigureMappings,
	pub scheduled_actions: ScheduledActionsConfig,
	pub fa_checklist: FaChecklistConfig,

	/// Site-specific stored procedure maintaining a custom academic-key table.
	#[serde(default)]
	pub pc_update_custom_academic_key: bool,

	#[serde(default)]
	pub pc_notes: Vec<NoteField>,
	#[serde(default)]
	pub pc_user_defined: Vec<UserDefinedField>,

	#[serde(default)]
	pub msg_strings: MessageStrings,
}

impl Config {
	/// Read and parse the configuration file.
	pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let text = std::fs::read_to_string(path.as_ref())?;
		let config: Config = serde_json::from_str(&text)?;
		debug!("Loaded configuration from {}", path.as_ref().display());
		Ok(config)
	}
}

/// Self-extending allow-list of scheduled-action codes.
///
/// Codes observed in the feed but missing from the seed allow-list are
/// validated against the destination catalog and appended here, then persisted
/// for the next cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LearnedActions {
	#[serde(skip)]
	path: Option<PathBuf>,
	codes: BTreeSet<String>,
}

impl LearnedActions {
	/// Load the store, starting empty when the file does not exist yet.
	pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
		let path = path.into();
		let mut store = if path.exists() {
			let text = std::fs::read_to_string(&path)?;
			serde_json::from_str::<LearnedActions>(&text)?
		} else {
			LearnedActions::default()
		};
		store.path = Some(path);
		Ok(store)
	}

	/// An in-memory store that never persists; used when no path is configured.
	pub fn ephemeral() -> Self {
		LearnedActions::default()
	}

	pub fn contains(&self, code: &str) -> bool {
		self.codes.contains(code)
	}

	pub fn codes(&self) -> impl Iterator<Item = &str> {
		self.codes.iter().map(String::as_str)
	}

	/// Append codes, returning how many were new.
	pub fn extend<I: IntoIterator<Item = String>>(&mut self, new_codes: I) -> usize {
		let before = self.codes.len();
		self.codes.extend(new_codes);
		self.codes.len() - before
	}

	/// Write the store back to disk, if it has a backing file.
	pub fn persist(&self) -> Result<(), ConfigError> {
		if let Some(path) = &self.path {
			let text = serde_json::to_string_pretty(self)?;
			std::fs::write(path, text)?;
			info!("Persisted {} learned action codes", self.codes.len());
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn learned_actions_dedupe_on_extend() {
		let mut store = LearnedActions::ephemeral();
		assert_eq!(store.extend(["A".to_string(), "B".to_string()]), 2);
		assert_eq!(store.extend(["B".to_string(), "C".to_string()]), 1);
		assert!(store.contains("A"));
		assert_eq!(store.codes().count(), 3);
	}

	#[test]
	fn message_strings_have_defaults() {
		let strings: MessageStrings = serde_json::from_str("{}").unwrap();
		assert!(!strings.sync_done.is_empty());
		assert!(!strings.error_no_apps.is_empty());
	}
}
