use serde_json::{Map, Value};
use std::fmt;

/// One row of the origin feed, exactly as it arrived. Field names use the
/// origin system's vocabulary and values are loosely typed (empty strings may
/// stand in for absence).
pub type RawRecord = Map<String, Value>;

/// An application record coerced into its canonical shape: types fixed,
/// absence explicit, a known set of fields guaranteed present.
///
/// Flat `Address<N>*` / `Phone<N>*` keys, `compare_*` baseline values, and any
/// other pass-through fields stay in `extras` untouched; the projectors pick
/// them up from there.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalRecord {
	/// Application id assigned by the origin system; immutable.
	pub application_id: String,
	pub prospect_id: Option<String>,

	// Fields passed through verbatim to the creation payload.
	pub first_name: Option<String>,
	pub last_name: Option<String>,
	pub email: Option<String>,
	pub campus: Option<String>,
	pub birth_date: Option<String>,
	pub create_datetime: Option<String>,

	// Nullable strings guaranteed present after normalization.
	pub prefix: Option<String>,
	pub middle_name: Option<String>,
	pub last_name_prefix: Option<String>,
	pub suffix: Option<String>,
	pub nickname: Option<String>,
	pub government_id: Option<String>,
	pub legal_name: Option<String>,
	pub visa: Option<String>,
	pub citizenship_status: Option<String>,
	pub primary_citizenship: Option<String>,
	pub secondary_citizenship: Option<String>,
	pub marital_status: Option<String>,
	pub proposed_decision: Option<String>,
	pub religion: Option<String>,
	pub former_last_name: Option<String>,
	pub former_first_name: Option<String>,
	pub primary_language: Option<String>,
	pub country_of_birth: Option<String>,
	pub disabilities: Option<String>,
	pub college_attend_status: Option<String>,
	pub commitment: Option<String>,
	pub status: Option<String>,

	// Race/ethnicity and interest flags, parsed from truthy/falsy tokens.
	pub race_american_indian: Option<bool>,
	pub race_asian: Option<bool>,
	pub race_african_american: Option<bool>,
	pub race_native_hawaiian: Option<bool>,
	pub race_white: Option<bool>,
	pub interested_in_campus_housing: Option<bool>,
	pub interested_in_financial_aid: Option<bool>,

	// Integer-coerced fields.
	pub ethnicity: Option<i64>,
	pub gender: Option<i64>,

	/// Raw veteran code; dual-output logic is applied at projection time.
	pub veteran: Option<String>,

	// Academic selectors; together they key the destination academic record.
	pub year_term: Option<String>,
	pub program: Option<String>,
	pub degree: Option<String>,

	/// Stubbed by the destination API when the feed does not supply one.
	pub government_date_of_entry: String,

	/// Everything else, passed through unchanged.
	pub extras: Map<String, Value>,
}

/// Reconciliation state derived from the destination system's two status
/// signals plus person-identifier presence. Never set independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputedState {
	Active,
	Declined,
	Pending,
	MissingRequiredField,
	MissingFieldMapping,
	Unrecognized(i32),
}

impl fmt::Display for ComputedState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ComputedState::Active => write!(f, "Active"),
			ComputedState::Declined => write!(f, "Declined"),
			ComputedState::Pending => write!(f, "Pending"),
			ComputedState::MissingRequiredField => write!(f, "Required field missing."),
			ComputedState::MissingFieldMapping => write!(f, "Required field mapping is missing."),
			ComputedState::Unrecognized(code) => write!(f, "Unrecognized status: {}", code),
		}
	}
}

/// Destination-system status signals for one application, as returned by one
/// status scan. All fields absent means the destination has no record at all
/// (the "new application" case).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusSnapshot {
	/// Whether the destination reports a record for this application at all.
	pub found: bool,
	/// Whether the destination has acknowledged/accepted the relationship.
	pub origin_status: Option<i32>,
	/// Intake completeness reported by the destination.
	pub application_status: Option<i32>,
	pub state: Option<ComputedState>,
	/// Destination person identifier, absent until the person is created.
	pub person_code: Option<String>,
	/// Error text the destination attached to the status row, if any.
	pub error_message: Option<String>,
}

/// Derived profile facts pulled from the destination for active records and
/// reported back to the origin system.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileFacts {
	pub found: bool,
	pub registered: bool,
	pub registration_date: Option<String>,
	pub readmitted: bool,
	pub withdrawn: bool,
	pub credit_count: String,
	pub institutional_email: Option<String>,
	pub advisor: Option<String>,
	pub orientation_complete: bool,
}

/// A checklist/task item tracked by the origin system and mirrored into the
/// destination system.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ScheduledAction {
	/// Application id the action belongs to.
	pub aid: String,
	#[serde(default)]
	pub action_id: Option<String>,
	/// Human-readable description of the item.
	#[serde(default)]
	pub item: Option<String>,
	/// 'Y'/'N' completion flag as reported by the origin system.
	#[serde(default)]
	pub completed: Option<String>,
	#[serde(default)]
	pub create_datetime: Option<String>,
}
