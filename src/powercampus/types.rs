use crate::record::ProfileFacts;

/// Error types for destination-system calls
#[derive(Debug, thiserror::Error)]
pub enum CampusError {
	/// The intake API accepted the request but reported a server-side
	/// misconfiguration (202-class response). Never retried silently.
	#[error("destination configuration incomplete: {0}")]
	ConfigurationIncomplete(String),

	#[error("HTTP error: {0}")]
	Http(#[from] reqwest::Error),

	#[error("SQL error: {0}")]
	Sql(#[from] sqlx::Error),

	#[error("unexpected destination response: {0}")]
	UnexpectedResponse(String),
}

/// Raw status row for one application, as returned by the status lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusRow {
	pub person_code: Option<String>,
	pub origin_status: Option<i32>,
	pub application_status: Option<i32>,
	pub error_message: Option<String>,
}

/// One audit entry written for every status resolution.
#[derive(Debug, Clone)]
pub struct StatusLogEntry {
	pub reference: Option<String>,
	pub application_id: String,
	pub prospect_id: Option<String>,
	pub first_name: Option<String>,
	pub last_name: Option<String>,
	pub computed_status: String,
	pub notes: Option<String>,
	pub origin_status: Option<i32>,
	pub application_status: Option<i32>,
	pub person_code: Option<String>,
	pub logged_at: String,
}

/// Academic year/term/session key for one application's destination records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcademicKey {
	pub year: String,
	pub term: String,
	pub session: String,
}

/// A scheduled-action code known to the destination catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionDefinition {
	pub code: String,
	pub description: Option<String>,
}

/// Raw profile row from the destination's academic-record lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileRow {
	pub registered: Option<String>,
	pub registration_date: Option<String>,
	pub credits: Option<String>,
	pub campus_email: Option<String>,
	pub college_attend: Option<String>,
	pub withdrawn: Option<String>,
	pub advisor: Option<String>,
	pub orientation_complete: Option<String>,
}

impl ProfileFacts {
	/// Interpret the destination's flag columns. A missing row means the
	/// academic record does not exist yet.
	pub fn from_row(row: Option<ProfileRow>) -> Self {
		let Some(row) = row else {
			return ProfileFacts::default();
		};

		let registered = row.registered.as_deref() == Some("Y");
		ProfileFacts {
			found: true,
			registered,
			registration_date: if registered { row.registration_date } else { None },
			readmitted: row.college_attend.as_deref() == Some("READ"),
			withdrawn: row.withdrawn.as_deref() == Some("Y"),
			credit_count: if registered {
				row.credits.unwrap_or_else(|| "0".to_string())
			} else {
				"0".to_string()
			},
			institutional_email: if registered { row.campus_email } else { None },
			advisor: row.advisor,
			orientation_complete: row.orientation_complete.as_deref() == Some("Y"),
		}
	}
}
