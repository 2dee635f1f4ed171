use crate::powercampus::types::{
	AcademicKey, ActionDefinition, CampusError, ProfileRow, StatusLogEntry, StatusRow,
};
use crate::projection::UpdatePayload;
use crate::record::ScheduledAction;
use crate::slate::FaChecklistRow;
use sqlx::postgres::PgPool;
use sqlx::Row;
use tracing::debug;

/// Source tag the destination attributes our writes to.
const UPDATE_SOURCE: &str = "SLATE";

/// Stored-procedure surface of the destination's relational store.
///
/// Each call is its own transaction; the store never batches writes across
/// records.
#[async_trait::async_trait]
pub trait CampusStore: Send + Sync {
	async fn select_status(&self, application_id: &str) -> Result<Option<StatusRow>, CampusError>;

	/// Append one audit row for a status resolution. Callers treat this as
	/// best-effort.
	async fn log_status(&self, entry: &StatusLogEntry) -> Result<(), CampusError>;

	/// Whether a degree-requirement record exists for the program/degree pair
	/// at or after the minimum catalog year. Used to validate mapping
	/// auto-configuration candidates.
	async fn select_degree_requirement(
		&self,
		program: &str,
		degree: &str,
		minimum_year: Option<&str>,
	) -> Result<bool, CampusError>;

	async fn update_demographics(&self, payload: &UpdatePayload) -> Result<(), CampusError>;
	async fn update_academic(&self, payload: &UpdatePayload) -> Result<(), CampusError>;
	/// Site-specific custom academic-key table; only called when configured.
	async fn update_academic_key(&self, payload: &UpdatePayload) -> Result<(), CampusError>;
	async fn update_sms_opt_in(&self, person_code: &str, opt_in: &str) -> Result<(), CampusError>;
	async fn update_note(
		&self,
		person_code: &str,
		office: &str,
		note_type: &str,
		text: &str,
	) -> Result<(), CampusError>;
	async fn update_user_defined(
		&self,
		person_code: &str,
		field: &str,
		value: &str,
	) -> Result<(), CampusError>;

	async fn upsert_action(
		&self,
		action: &ScheduledAction,
		person_code: &str,
		key: &AcademicKey,
	) -> Result<(), CampusError>;

	/// Remove destination actions within the allow-list that are no longer
	/// present in the origin's current action set for this application.
	async fn cleanup_actions(
		&self,
		person_code: &str,
		key: &AcademicKey,
		allowlist: &[String],
		present_codes: &[String],
	) -> Result<(), CampusError>;

	async fn select_action_definition(
		&self,
		code: &str,
	) -> Result<Option<ActionDefinition>, CampusError>;

	async fn select_profile(
		&self,
		person_code: &str,
		key: &AcademicKey,
		program: &str,
		degree: &str,
		curriculum: &str,
	) -> Result<Option<ProfileRow>, CampusError>;

	async fn select_fa_checklist(
		&self,
		person_code: &str,
		government_id: &str,
		application_id: &str,
		key: &AcademicKey,
	) -> Result<Vec<FaChecklistRow>, CampusError>;
}

/// SQL-backed store adapter.
pub struct SqlCampusStore {
	pool: PgPool,
	status_log_table: String,
}

impl SqlCampusStore {
	pub async fn connect(database_url: &str, status_log_table: &str) -> Result<Self, CampusError> {
		let pool = PgPool::connect(database_url).await?;
		debug!("Connected to destination database");
		Ok(Self {
			pool,
			status_log_table: status_log_table.to_string(),
		})
	}
}

/// Only the date portion of an action timestamp is stored.
fn date_portion(datetime: Option<&str>) -> Option<&str> {
	datetime.map(|s| s.get(..10).unwrap_or(s))
}

#[async_trait::async_trait]
impl CampusStore for SqlCampusStore {
	async fn select_status(&self, application_id: &str) -> Result<Option<StatusRow>, CampusError> {
		let row = sqlx::query("SELECT * FROM custom.ps_sel_ra_status($1)")
			.bind(application_id)
			.fetch_optional(&self.pool)
			.await?;

		match row {
			Some(row) => Ok(Some(StatusRow {
				person_code: row.try_get("people_code_id")?,
				origin_status: row.try_get("ra_status")?,
				application_status: row.try_get("apl_status")?,
				error_message: row.try_get("ra_errormessage")?,
			})),
			None => Ok(None),
		}
	}

	async fn log_status(&self, entry: &StatusLogEntry) -> Result<(), CampusError> {
		// Table name is operator-configured (dev vs production reporting).
		let sql = format!(
			"INSERT INTO {} (ref, application_number, prospect_id, first_name, last_name, \
			 computed_status, notes, ra_status, apl_status, people_code_id, logged_at) \
			 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
			self.status_log_table
		);
		sqlx::query(&sql)
			.bind(&entry.reference)
			.bind(&entry.application_id)
			.bind(&entry.prospect_id)
			.bind(&entry.first_name)
			.bind(&entry.last_name)
			.bind(&entry.computed_status)
			.bind(&entry.notes)
			.bind(entry.origin_status)
			.bind(entry.application_status)
			.bind(&entry.person_code)
			.bind(&entry.logged_at)
			.execute(&self.pool)
			.await?;
		Ok(())
	}

	async fn select_degree_requirement(
		&self,
		program: &str,
		degree: &str,
		minimum_year: Option<&str>,
	) -> Result<bool, CampusError> {
		let row = sqlx::query("SELECT custom.ps_sel_degreq($1, $2, $3) AS valid")
			.bind(program)
			.bind(degree)
			.bind(minimum_year)
			.fetch_one(&self.pool)
			.await?;
		Ok(row.try_get("valid")?)
	}

	async fn update_demographics(&self, payload: &UpdatePayload) -> Result<(), CampusError> {
		sqlx::query("CALL custom.ps_upd_demographics($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)")
			.bind(&payload.person_code)
			.bind(UPDATE_SOURCE)
			.bind(payload.gender)
			.bind(payload.ethnicity)
			.bind(&payload.marital_status)
			.bind(&payload.veteran)
			.bind(&payload.primary_citizenship)
			.bind(&payload.secondary_citizenship)
			.bind(&payload.visa)
			.bind(payload.race_african_american)
			.bind(payload.race_american_indian)
			.bind(payload.race_asian)
			.bind(payload.race_native_hawaiian)
			.bind(payload.race_white)
			.execute(&self.pool)
			.await?;
		Ok(())
	}

	async fn update_academic(&self, payload: &UpdatePayload) -> Result<(), CampusError> {
		sqlx::query("CALL custom.ps_upd_academic_app_info($1, $2, $3, $4, $5, $6, $7, $8, $9)")
			.bind(&payload.person_code)
			.bind(&payload.academic_year)
			.bind(&payload.academic_term)
			.bind(&payload.academic_session)
			.bind(&payload.program)
			.bind(&payload.degree)
			.bind(&payload.curriculum)
			.bind(&payload.proposed_decision)
			.bind(&payload.create_datetime)
			.execute(&self.pool)
			.await?;
		Ok(())
	}

	async fn update_academic_key(&self, payload: &UpdatePayload) -> Result<(), CampusError> {
		sqlx::query("CALL custom.ps_upd_academic_key($1, $2, $3, $4, $5, $6, $7, $8)")
			.bind(&payload.person_code)
			.bind(UPDATE_SOURCE)
			.bind(&payload.academic_year)
			.bind(&payload.academic_term)
			.bind(&payload.academic_session)
			.bind(&payload.program)
			.bind(&payload.degree)
			.bind(&payload.curriculum)
			.execute(&self.pool)
			.await?;
		Ok(())
	}

	async fn update_sms_opt_in(&self, person_code: &str, opt_in: &str) -> Result<(), CampusError> {
		sqlx::query("CALL custom.ps_upd_sms_opt_in($1, $2, $3)")
			.bind(person_code)
			.bind(UPDATE_SOURCE)
			.bind(opt_in)
			.execute(&self.pool)
			.await?;
		Ok(())
	}

	async fn update_note(
		&self,
		person_code: &str,
		office: &str,
		note_type: &str,
		text: &str,
	) -> Result<(), CampusError> {
		sqlx::query("CALL custom.ps_upd_note($1, $2, $3, $4, $5)")
			.bind(person_code)
			.bind(UPDATE_SOURCE)
			.bind(office)
			.bind(note_type)
			.bind(text)
			.execute(&self.pool)
			.await?;
		Ok(())
	}

	async fn update_user_defined(
		&self,
		person_code: &str,
		field: &str,
		value: &str,
	) -> Result<(), CampusError> {
		sqlx::query("CALL custom.ps_upd_user_defined($1, $2, $3, $4)")
			.bind(person_code)
			.bind(UPDATE_SOURCE)
			.bind(field)
			.bind(value)
			.execute(&self.pool)
			.await?;
		Ok(())
	}

	async fn upsert_action(
		&self,
		action: &ScheduledAction,
		person_code: &str,
		key: &AcademicKey,
	) -> Result<(), CampusError> {
		sqlx::query("CALL custom.ps_upd_action($1, $2, $3, $4, $5, $6, $7, $8, $9)")
			.bind(person_code)
			.bind(UPDATE_SOURCE)
			.bind(&action.action_id)
			.bind(&action.item)
			.bind(&action.completed)
			.bind(date_portion(action.create_datetime.as_deref()))
			.bind(&key.year)
			.bind(&key.term)
			.bind(&key.session)
			.execute(&self.pool)
			.await?;
		Ok(())
	}

	async fn cleanup_actions(
		&self,
		person_code: &str,
		key: &AcademicKey,
		allowlist: &[String],
		present_codes: &[String],
	) -> Result<(), CampusError> {
		sqlx::query("CALL custom.ps_del_stale_actions($1, $2, $3, $4, $5, $6)")
			.bind(person_code)
			.bind(&key.year)
			.bind(&key.term)
			.bind(&key.session)
			.bind(allowlist.to_vec())
			.bind(present_codes.to_vec())
			.execute(&self.pool)
			.await?;
		Ok(())
	}

	async fn select_action_definition(
		&self,
		code: &str,
	) -> Result<Option<ActionDefinition>, CampusError> {
		let row = sqlx::query("SELECT * FROM custom.ps_sel_action_definition($1)")
			.bind(code)
			.fetch_optional(&self.pool)
			.await?;

		match row {
			Some(row) => Ok(Some(ActionDefinition {
				code: row.try_get("action_id")?,
				description: row.try_get("action_name")?,
			})),
			None => Ok(None),
		}
	}

	async fn select_profile(
		&self,
		person_code: &str,
		key: &AcademicKey,
		program: &str,
		degree: &str,
		curriculum: &str,
	) -> Result<Option<ProfileRow>, CampusError> {
		let row = sqlx::query("SELECT * FROM custom.ps_sel_profile($1, $2, $3, $4, $5, $6, $7)")
			.bind(person_code)
			.bind(&key.year)
			.bind(&key.term)
			.bind(&key.session)
			.bind(program)
			.bind(degree)
			.bind(curriculum)
			.fetch_optional(&self.pool)
			.await?;

		match row {
			Some(row) => Ok(Some(ProfileRow {
				registered: row.try_get("registered")?,
				registration_date: row.try_get("reg_val_date")?,
				credits: row.try_get("credits")?,
				campus_email: row.try_get("campus_email")?,
				college_attend: row.try_get("college_attend")?,
				withdrawn: row.try_get("withdrawn")?,
				advisor: row.try_get("advisor")?,
				orientation_complete: row.try_get("orientation_complete")?,
			})),
			None => Ok(None),
		}
	}

	async fn select_fa_checklist(
		&self,
		person_code: &str,
		government_id: &str,
		application_id: &str,
		key: &AcademicKey,
	) -> Result<Vec<FaChecklistRow>, CampusError> {
		let rows = sqlx::query("SELECT * FROM custom.ps_sel_fa_checklist($1, $2, $3, $4, $5)")
			.bind(person_code)
			.bind(government_id)
			.bind(&key.year)
			.bind(&key.term)
			.bind(&key.session)
			.fetch_all(&self.pool)
			.await?;

		rows.into_iter()
			.map(|row| {
				Ok(FaChecklistRow {
					app_id: application_id.to_string(),
					code: row.try_get("code")?,
					status: row.try_get("status")?,
					date: row.try_get("date")?,
				})
			})
			.collect()
	}
}
