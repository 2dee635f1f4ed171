//! In-memory fakes for the origin feed and both destination surfaces.
//!
//! Each fake records every call into a `Mutex`-guarded state struct so tests
//! can seed inputs and inspect what the cycle did afterwards.

use crate::config::Config;
use crate::mapping::CodeMappingTable;
use crate::powercampus::{
	AcademicKey, ActionDefinition, CampusApi, CampusError, CampusStore, ProfileRow,
	StatusLogEntry, StatusRow,
};
use crate::projection::{CreationPayload, UpdatePayload};
use crate::record::{RawRecord, ScheduledAction};
use crate::slate::{FaChecklistRow, OriginFeed, SlateError, UploadKind};
use serde_json::{Value, json};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Mutex;

#[derive(Default)]
pub struct FeedState {
	pub apps: Vec<RawRecord>,
	pub actions: Vec<ScheduledAction>,
	/// Size of each scheduled-action fetch batch, in call order.
	pub action_batches: Vec<usize>,
	pub posted: Vec<(UploadKind, Vec<Value>)>,
	pub fa_bodies: Vec<String>,
}

#[derive(Default)]
pub struct FakeFeed {
	pub state: Mutex<FeedState>,
}

#[async_trait::async_trait]
impl OriginFeed for FakeFeed {
	async fn fetch_applications(&self, pid: Option<&str>) -> Result<Vec<RawRecord>, SlateError> {
		let state = self.state.lock().unwrap();
		let apps = state
			.apps
			.iter()
			.filter(|app| match pid {
				Some(pid) => app.get("pid").and_then(Value::as_str) == Some(pid),
				None => true,
			})
			.cloned()
			.collect();
		Ok(apps)
	}

	async fn fetch_actions(
		&self,
		application_ids: &[String],
	) -> Result<Vec<ScheduledAction>, SlateError> {
		let mut state = self.state.lock().unwrap();
		state.action_batches.push(application_ids.len());
		Ok(state
			.actions
			.iter()
			.filter(|a| application_ids.contains(&a.aid))
			.cloned()
			.collect())
	}

	async fn post_rows(&self, kind: UploadKind, rows: &[Value]) -> Result<(), SlateError> {
		self.state.lock().unwrap().posted.push((kind, rows.to_vec()));
		Ok(())
	}

	async fn post_fa_checklist(&self, body: String) -> Result<(), SlateError> {
		self.state.lock().unwrap().fa_bodies.push(body);
		Ok(())
	}
}

#[derive(Default)]
pub struct ApiState {
	/// Application ids the destination already has a record for.
	pub existing: HashSet<String>,
	pub created: Vec<CreationPayload>,
	/// Person code the intake API reports back on auto-accepted creations.
	pub person_code: Option<String>,
	pub fail_create_for: HashSet<String>,
}

#[derive(Default)]
pub struct FakeApi {
	pub state: Mutex<ApiState>,
}

#[async_trait::async_trait]
impl CampusApi for FakeApi {
	async fn create_application(
		&self,
		payload: &CreationPayload,
	) -> Result<Option<String>, CampusError> {
		let mut state = self.state.lock().unwrap();
		if state.fail_create_for.contains(&payload.application_number) {
			return Err(CampusError::UnexpectedResponse(
				"creation rejected".to_string(),
			));
		}
		state.existing.insert(payload.application_number.clone());
		state.created.push(payload.clone());
		Ok(state.person_code.clone())
	}

	async fn application_exists(&self, application_id: &str) -> Result<bool, CampusError> {
		Ok(self.state.lock().unwrap().existing.contains(application_id))
	}
}

#[derive(Default)]
pub struct StoreState {
	pub statuses: HashMap<String, StatusRow>,
	pub log_entries: Vec<StatusLogEntry>,
	/// Action codes the destination catalog recognizes.
	pub action_catalog: BTreeSet<String>,
	/// Program/degree pairs the destination has degree-requirement records for.
	pub degree_requirements: HashSet<(String, String)>,
	pub degree_requirement_checks: Vec<(String, String)>,
	pub demographic_updates: Vec<UpdatePayload>,
	pub academic_updates: Vec<UpdatePayload>,
	pub academic_key_updates: Vec<UpdatePayload>,
	pub sms_updates: Vec<(String, String)>,
	pub notes: Vec<(String, String, String, String)>,
	pub user_defined: Vec<(String, String, String)>,
	/// (person code, action code) for every upsert.
	pub upserted_actions: Vec<(String, String)>,
	/// Person codes a stale-action cleanup ran for.
	pub cleanups: Vec<String>,
	/// Profile rows keyed by person code.
	pub profiles: HashMap<String, ProfileRow>,
	/// Checklist rows keyed by person code.
	pub fa_rows: HashMap<String, Vec<FaChecklistRow>>,
	/// Person codes whose demographic update should fail.
	pub fail_demographics_for: HashSet<String>,
}

#[derive(Default)]
pub struct FakeStore {
	pub state: Mutex<StoreState>,
}

#[async_trait::async_trait]
impl CampusStore for FakeStore {
	async fn select_status(&self, application_id: &str) -> Result<Option<StatusRow>, CampusError> {
		Ok(self.state.lock().unwrap().statuses.get(application_id).cloned())
	}

	async fn log_status(&self, entry: &StatusLogEntry) -> Result<(), CampusError> {
		self.state.lock().unwrap().log_entries.push(entry.clone());
		Ok(())
	}

	async fn select_degree_requirement(
		&self,
		program: &str,
		degree: &str,
		_minimum_year: Option<&str>,
	) -> Result<bool, CampusError> {
		let mut state = self.state.lock().unwrap();
		let pair = (program.to_string(), degree.to_string());
		state.degree_requirement_checks.push(pair.clone());
		Ok(state.degree_requirements.contains(&pair))
	}

	async fn update_demographics(&self, payload: &UpdatePayload) -> Result<(), CampusError> {
		let mut state = self.state.lock().unwrap();
		if state.fail_demographics_for.contains(&payload.person_code) {
			return Err(CampusError::UnexpectedResponse(
				"demographic update rejected".to_string(),
			));
		}
		state.demographic_updates.push(payload.clone());
		Ok(())
	}

	async fn update_academic(&self, payload: &UpdatePayload) -> Result<(), CampusError> {
		self.state.lock().unwrap().academic_updates.push(payload.clone());
		Ok(())
	}

	async fn update_academic_key(&self, payload: &UpdatePayload) -> Result<(), CampusError> {
		self.state.lock().unwrap().academic_key_updates.push(payload.clone());
		Ok(())
	}

	async fn update_sms_opt_in(&self, person_code: &str, opt_in: &str) -> Result<(), CampusError> {
		self.state
			.lock()
			.unwrap()
			.sms_updates
			.push((person_code.to_string(), opt_in.to_string()));
		Ok(())
	}

	async fn update_note(
		&self,
		person_code: &str,
		office: &str,
		note_type: &str,
		text: &str,
	) -> Result<(), CampusError> {
		self.state.lock().unwrap().notes.push((
			person_code.to_string(),
			office.to_string(),
			note_type.to_string(),
			text.to_string(),
		));
		Ok(())
	}

	async fn update_user_defined(
		&self,
		person_code: &str,
		field: &str,
		value: &str,
	) -> Result<(), CampusError> {
		self.state.lock().unwrap().user_defined.push((
			person_code.to_string(),
			field.to_string(),
			value.to_string(),
		));
		Ok(())
	}

	async fn upsert_action(
		&self,
		action: &ScheduledAction,
		person_code: &str,
		_key: &AcademicKey,
	) -> Result<(), CampusError> {
		self.state.lock().unwrap().upserted_actions.push((
			person_code.to_string(),
			action.action_id.clone().unwrap_or_default(),
		));
		Ok(())
	}

	async fn cleanup_actions(
		&self,
		person_code: &str,
		_key: &AcademicKey,
		_allowlist: &[String],
		_present_codes: &[String],
	) -> Result<(), CampusError> {
		self.state.lock().unwrap().cleanups.push(person_code.to_string());
		Ok(())
	}

	async fn select_action_definition(
		&self,
		code: &str,
	) -> Result<Option<ActionDefinition>, CampusError> {
		let state = self.state.lock().unwrap();
		Ok(state.action_catalog.get(code).map(|code| ActionDefinition {
			code: code.clone(),
			description: None,
		}))
	}

	async fn select_profile(
		&self,
		person_code: &str,
		_key: &AcademicKey,
		_program: &str,
		_degree: &str,
		_curriculum: &str,
	) -> Result<Option<ProfileRow>, CampusError> {
		Ok(self.state.lock().unwrap().profiles.get(person_code).cloned())
	}

	async fn select_fa_checklist(
		&self,
		person_code: &str,
		_government_id: &str,
		_application_id: &str,
		_key: &AcademicKey,
	) -> Result<Vec<FaChecklistRow>, CampusError> {
		Ok(self
			.state
			.lock()
			.unwrap()
			.fa_rows
			.get(person_code)
			.cloned()
			.unwrap_or_default())
	}
}

/// A minimal but complete configuration for orchestrator tests.
pub fn test_config() -> Config {
	serde_json::from_value(json!({
		"slate_query_apps": endpoint("https://crm.test/query"),
		"slate_upload_passive": {
			"url": "https://crm.test/passive",
			"username": "u",
			"password": "p",
			"fields": ["credits", "registered", "PEOPLE_CODE_ID"]
		},
		"slate_upload_active": {
			"url": "https://crm.test/active",
			"username": "u",
			"password": "p",
			"fields": ["campus_email", "registered"]
		},
		"pc_api": endpoint("https://sis.test/api"),
		"pc_database_url": "postgres://sis.test/campus",
		"mapping_file_location": "mapping.xml",
		"status_log_table": "custom.sync_status_log",
		"scheduled_actions": {
			"enabled": false,
			"slate_get": endpoint("https://crm.test/actions"),
			"action_codes": []
		},
		"fa_checklist": {
			"enabled": false,
			"slate_post": endpoint("https://crm.test/fa")
		}
	}))
	.expect("test config is valid")
}

fn endpoint(url: &str) -> Value {
	json!({"url": url, "username": "u", "password": "p"})
}

pub const TEST_MAPPING: &str = r#"
	<Mappings>
		<AcademicTerm NumberOfPowerCampusFieldsMapped="2" PCFirstField="Year" PCSecondField="Term">
			<Row RCCodeValue="Fall 2024" PCYearCodeValue="2024" PCTermCodeValue="FALL"/>
		</AcademicTerm>
		<AcademicLevel NumberOfPowerCampusFieldsMapped="1">
			<Row RCCodeValue="Undergraduate" PCCodeValue="UNDERG"/>
		</AcademicLevel>
		<AcademicProgram NumberOfPowerCampusFieldsMapped="2" PCFirstField="Degree" PCSecondField="Curriculum">
			<Row RCCodeValue="Bachelor of Science" PCDegreeCodeValue="BS" PCCurriculumCodeValue="GEN"/>
		</AcademicProgram>
	</Mappings>
"#;

pub fn test_mapping() -> CodeMappingTable {
	CodeMappingTable::from_xml_str(TEST_MAPPING).expect("test mapping is valid")
}
