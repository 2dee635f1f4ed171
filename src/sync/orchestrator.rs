//! The sync cycle driver.
//!
//! All cycle state lives in the orchestrator and its per-record bookkeeping;
//! adapters are passed in explicitly so the whole cycle is testable against
//! in-memory fakes.

use crate::config::{Config, LearnedActions};
use crate::mapping::{CodeMappingTable, autoconfigure_document};
use crate::powercampus::{AcademicKey, CampusApi, CampusStore, StatusLogEntry};
use crate::projection::{UpdatePayload, project_creation, project_update};
use crate::record::normalize::{flatten, normalize};
use crate::record::status::resolve_state;
use crate::record::{CanonicalRecord, ComputedState, ProfileFacts, ScheduledAction, StatusSnapshot};
use crate::slate::{OriginFeed, UploadKind, fa_checklist_body};
use crate::sync::actions::{fetch_all_actions, learn_action_codes};
use crate::sync::diff::{changed_row, passive_row};
use crate::sync::{BatchOutcome, SyncError, SyncStage};
use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// One application record's working state across the cycle.
struct SyncRecord {
	canonical: CanonicalRecord,
	status: StatusSnapshot,
	update: Option<UpdatePayload>,
	profile: Option<ProfileFacts>,
}

/// Drives one full sync cycle against the injected adapters.
///
/// Owns the mapping table because auto-configuration can refresh it
/// mid-cycle.
pub struct SyncOrchestrator<'a> {
	config: &'a Config,
	mapping: CodeMappingTable,
	feed: &'a dyn OriginFeed,
	api: &'a dyn CampusApi,
	store: &'a dyn CampusStore,
	learned: LearnedActions,
}

impl<'a> SyncOrchestrator<'a> {
	pub fn new(
		config: &'a Config,
		mapping: CodeMappingTable,
		feed: &'a dyn OriginFeed,
		api: &'a dyn CampusApi,
		store: &'a dyn CampusStore,
		learned: LearnedActions,
	) -> Self {
		Self {
			config,
			mapping,
			feed,
			api,
			store,
			learned,
		}
	}

	/// Run one cycle, optionally restricted to a single prospect id, and
	/// return the operator-facing summary.
	///
	/// An empty batch is an error in single-prospect mode and a silent
	/// success in unattended mode. A fetch or status-scan failure aborts the
	/// whole cycle; failures in the creation/update/checklist steps are
	/// contained to the offending record.
	pub async fn run_cycle(&mut self, pid: Option<&str>) -> Result<String, SyncError> {
		let raw = self.feed.fetch_applications(pid).await?;
		if raw.is_empty() {
			if pid.is_some() {
				return Err(SyncError::NoRecordsFound(
					self.config.msg_strings.error_no_apps.clone(),
				));
			}
			info!("Empty application batch; nothing to do");
			return Ok(BatchOutcome::new().summary(0, &self.config.msg_strings.sync_done));
		}

		// Normalize the batch, dropping rows without an id and duplicate ids
		// (first occurrence wins).
		let mut records: Vec<SyncRecord> = Vec::new();
		for row in raw {
			let canonical = normalize(row);
			if canonical.application_id.is_empty() {
				warn!("Dropping feed row without an application id");
				continue;
			}
			if records
				.iter()
				.any(|r| r.canonical.application_id == canonical.application_id)
			{
				warn!(
					"Dropping duplicate feed row for application {}",
					canonical.application_id
				);
				continue;
			}
			records.push(SyncRecord {
				canonical,
				status: StatusSnapshot::default(),
				update: None,
				profile: None,
			});
		}
		let total = records.len();
		let mut outcome = BatchOutcome::new();

		self.autoconfigure_mappings(&records).await?;

		for rec in &mut records {
			rec.status = self.scan_status(&rec.canonical).await?;
			outcome.set_state(&rec.canonical.application_id, rec.status.state);
		}

		for rec in &mut records {
			if !needs_creation(&rec.status) {
				continue;
			}
			let aid = rec.canonical.application_id.clone();
			match self.create_record(&rec.canonical).await {
				Ok(()) => {
					outcome.mark_created(&aid);
					// The destination assigns status and person code during
					// intake; re-scan so the update step sees them.
					rec.status = self.scan_status(&rec.canonical).await?;
					outcome.set_state(&aid, rec.status.state);
				}
				Err(reason) => {
					warn!("Creation failed for application {}: {}", aid, reason);
					outcome.record_failure(&aid, SyncStage::Creation, reason);
				}
			}
		}

		let mut allowlist = self.config.scheduled_actions.action_codes.clone();
		let mut actions_by_aid: HashMap<String, Vec<ScheduledAction>> = HashMap::new();
		if self.config.scheduled_actions.enabled {
			let active_ids: Vec<String> = records
				.iter()
				.filter(|r| {
					r.status.state == Some(ComputedState::Active)
						&& !outcome.is_excluded(&r.canonical.application_id)
				})
				.map(|r| r.canonical.application_id.clone())
				.collect();

			let fetched = if active_ids.is_empty() {
				Vec::new()
			} else {
				fetch_all_actions(self.feed, &active_ids).await?
			};

			if self.config.scheduled_actions.autolearn_action_codes && !fetched.is_empty() {
				let new_codes = learn_action_codes(
					&fetched,
					&self.config.scheduled_actions.action_codes,
					&self.learned,
					self.store,
				)
				.await?;
				if self.learned.extend(new_codes) > 0 {
					self.learned.persist()?;
				}
			}
			allowlist.extend(self.learned.codes().map(String::from));

			// Every fetched action with a code is mirrored; the allow-list
			// only scopes which destination actions stale cleanup may remove.
			for action in fetched {
				if action.action_id.is_some() {
					actions_by_aid.entry(action.aid.clone()).or_default().push(action);
				}
			}
		}

		for rec in &mut records {
			let aid = rec.canonical.application_id.clone();
			if rec.status.state != Some(ComputedState::Active) || outcome.is_excluded(&aid) {
				continue;
			}
			let Some(person_code) = rec.status.person_code.clone() else {
				outcome.record_failure(
					&aid,
					SyncStage::Update,
					"active record without a person code".to_string(),
				);
				continue;
			};
			match self
				.update_record(rec, &person_code, &actions_by_aid, &allowlist)
				.await
			{
				Ok(()) => outcome.mark_updated(&aid),
				Err((stage, reason)) => {
					warn!("{} step failed for application {}: {}", stage, aid, reason);
					outcome.record_failure(&aid, stage, reason);
				}
			}
		}

		self.upload_results(&records, &mut outcome).await?;

		let summary = outcome.summary(total, &self.config.msg_strings.sync_done);
		info!(
			"Cycle complete: {} applications, {} created, {} updated, {} failed",
			total,
			outcome.created_count(),
			outcome.updated_count(),
			outcome.failed_count()
		);
		Ok(summary)
	}

	/// Grow the mapping document from the batch's program/degree pairs,
	/// optionally validating each candidate against the destination's
	/// degree-requirement records, and reload the table when it changed.
	async fn autoconfigure_mappings(&mut self, records: &[SyncRecord]) -> Result<(), SyncError> {
		let settings = &self.config.autoconfigure_mappings;
		if !settings.enabled {
			return Ok(());
		}

		let mut candidates: Vec<(String, String)> = Vec::new();
		for rec in records {
			let (Some(program), Some(degree)) = (&rec.canonical.program, &rec.canonical.degree)
			else {
				continue;
			};
			let known = self.mapping.contains("AcademicLevel", program)
				&& self.mapping.contains("AcademicProgram", degree);
			if known || candidates.iter().any(|(p, d)| p == program && d == degree) {
				continue;
			}
			if settings.validate_degreq {
				let valid = self
					.store
					.select_degree_requirement(
						program,
						degree,
						settings.minimum_degreq_year.as_deref(),
					)
					.await?;
				if !valid {
					warn!(
						"Skipping mapping auto-configuration for {}/{}: no degree requirement",
						program, degree
					);
					continue;
				}
			}
			candidates.push((program.clone(), degree.clone()));
		}

		if !candidates.is_empty()
			&& autoconfigure_document(&self.config.mapping_file_location, &candidates)?
		{
			self.mapping = CodeMappingTable::load(&self.config.mapping_file_location)?;
			info!("Reloaded code-mapping table after auto-configuration");
		}
		Ok(())
	}

	/// Resolve one application's destination state, logging the resolution to
	/// the audit table as a best-effort side write.
	async fn scan_status(&self, rec: &CanonicalRecord) -> Result<StatusSnapshot, SyncError> {
		let aid = &rec.application_id;
		if !self.api.application_exists(aid).await? {
			debug!("Application {} not found in destination", aid);
			return Ok(StatusSnapshot::default());
		}

		let row = self.store.select_status(aid).await?.unwrap_or_default();
		let state = resolve_state(
			row.origin_status,
			row.application_status,
			row.person_code.as_deref(),
		);
		let snapshot = StatusSnapshot {
			found: true,
			origin_status: row.origin_status,
			application_status: row.application_status,
			state: Some(state),
			person_code: row.person_code,
			error_message: row.error_message,
		};

		let entry = StatusLogEntry {
			reference: rec
				.extras
				.get("Ref")
				.and_then(Value::as_str)
				.map(str::to_string),
			application_id: aid.clone(),
			prospect_id: rec.prospect_id.clone(),
			first_name: rec.first_name.clone(),
			last_name: rec.last_name.clone(),
			computed_status: state.to_string(),
			notes: snapshot.error_message.clone(),
			origin_status: snapshot.origin_status,
			application_status: snapshot.application_status,
			person_code: snapshot.person_code.clone(),
			logged_at: Utc::now().to_rfc3339(),
		};
		if let Err(err) = self.store.log_status(&entry).await {
			warn!("Status audit write failed for application {}: {}", aid, err);
		}

		Ok(snapshot)
	}

	async fn create_record(&self, rec: &CanonicalRecord) -> Result<(), String> {
		let payload = project_creation(rec, &self.mapping, &self.config.defaults)
			.map_err(|e| e.to_string())?;
		let person_code = self
			.api
			.create_application(&payload)
			.await
			.map_err(|e| e.to_string())?;
		info!(
			"Created application {} in destination; person code: {:?}",
			rec.application_id, person_code
		);
		Ok(())
	}

	async fn update_record(
		&self,
		rec: &mut SyncRecord,
		person_code: &str,
		actions_by_aid: &HashMap<String, Vec<ScheduledAction>>,
		allowlist: &[String],
	) -> Result<(), (SyncStage, String)> {
		let update_err = |e: &dyn std::fmt::Display| (SyncStage::Update, e.to_string());

		let payload = project_update(&rec.canonical, person_code, &self.mapping)
			.map_err(|e| update_err(&e))?;
		let key = AcademicKey {
			year: payload.academic_year.clone(),
			term: payload.academic_term.clone(),
			session: payload.academic_session.clone(),
		};

		self.store
			.update_demographics(&payload)
			.await
			.map_err(|e| update_err(&e))?;
		self.store
			.update_academic(&payload)
			.await
			.map_err(|e| update_err(&e))?;
		if self.config.pc_update_custom_academic_key {
			self.store
				.update_academic_key(&payload)
				.await
				.map_err(|e| update_err(&e))?;
		}
		if let Some(opt_in) = &payload.sms_opt_in {
			self.store
				.update_sms_opt_in(person_code, opt_in)
				.await
				.map_err(|e| update_err(&e))?;
		}

		let flat = flatten(&rec.canonical);
		for note in &self.config.pc_notes {
			if let Some(text) = flat.get(&note.slate_field).and_then(Value::as_str) {
				self.store
					.update_note(person_code, &note.office, &note.note_type, text)
					.await
					.map_err(|e| update_err(&e))?;
			}
		}
		for field in &self.config.pc_user_defined {
			if let Some(value) = flat.get(&field.slate_field).and_then(Value::as_str) {
				self.store
					.update_user_defined(person_code, &field.pc_field, value)
					.await
					.map_err(|e| update_err(&e))?;
			}
		}

		if self.config.scheduled_actions.enabled {
			let actions = actions_by_aid
				.get(&rec.canonical.application_id)
				.map(Vec::as_slice)
				.unwrap_or_default();
			let mut present_codes = Vec::new();
			for action in actions {
				self.store
					.upsert_action(action, person_code, &key)
					.await
					.map_err(|e| (SyncStage::Actions, e.to_string()))?;
				if let Some(code) = &action.action_id {
					present_codes.push(code.clone());
				}
			}
			self.store
				.cleanup_actions(person_code, &key, allowlist, &present_codes)
				.await
				.map_err(|e| (SyncStage::Actions, e.to_string()))?;
		}

		let profile = self
			.store
			.select_profile(
				person_code,
				&key,
				&payload.program,
				&payload.degree,
				&payload.curriculum,
			)
			.await
			.map_err(|e| update_err(&e))?;
		rec.profile = Some(ProfileFacts::from_row(profile));
		rec.update = Some(payload);
		Ok(())
	}

	/// Report the cycle's results back to the origin: the unconditional
	/// passive snapshot, the changed-fields diff, and the optional
	/// financial-aid checklist.
	async fn upload_results(
		&self,
		records: &[SyncRecord],
		outcome: &mut BatchOutcome,
	) -> Result<(), SyncError> {
		let mut passive_rows = Vec::new();
		let mut changed_rows = Vec::new();
		for rec in records {
			let flat = upload_view(rec);
			passive_rows.push(passive_row(&flat, &self.config.slate_upload_passive.fields));
			if !outcome.is_excluded(&rec.canonical.application_id) {
				if let Some(row) = changed_row(&flat, &self.config.slate_upload_active.fields) {
					changed_rows.push(row);
				}
			}
		}
		self.feed.post_rows(UploadKind::Passive, &passive_rows).await?;
		if !changed_rows.is_empty() {
			self.feed.post_rows(UploadKind::Changed, &changed_rows).await?;
		}

		// Education rows ship empty in the creation payload, so the
		// unmatched-schools target only receives rows once school matching
		// produces some.
		let school_rows: Vec<Value> = Vec::new();
		if !school_rows.is_empty() {
			self.feed.post_rows(UploadKind::Schools, &school_rows).await?;
		}

		if self.config.fa_checklist.enabled {
			let mut rows = Vec::new();
			for rec in records {
				let aid = &rec.canonical.application_id;
				if rec.status.state != Some(ComputedState::Active) || outcome.is_excluded(aid) {
					continue;
				}
				let (Some(person_code), Some(update)) = (&rec.status.person_code, &rec.update)
				else {
					continue;
				};
				let government_id = rec.canonical.government_id.as_deref().unwrap_or("");
				let key = AcademicKey {
					year: update.academic_year.clone(),
					term: update.academic_term.clone(),
					session: update.academic_session.clone(),
				};
				match self
					.store
					.select_fa_checklist(person_code, government_id, aid, &key)
					.await
				{
					Ok(batch) => rows.extend(batch),
					Err(err) => {
						warn!("Checklist pull failed for application {}: {}", aid, err);
						outcome.record_failure(aid, SyncStage::FinancialAid, err.to_string());
					}
				}
			}
			if !rows.is_empty() {
				self.feed.post_fa_checklist(fa_checklist_body(&rows)).await?;
			}
		}

		Ok(())
	}
}

/// A record is created when the destination has no trace of it, or when an
/// earlier attempt stalled before intake assigned a status and person.
fn needs_creation(snap: &StatusSnapshot) -> bool {
	!snap.found
		|| (matches!(snap.origin_status, Some(1) | Some(2))
			&& snap.application_status.is_none()
			&& snap.person_code.is_none())
}

fn yn(flag: bool) -> Value {
	Value::String(if flag { "Y" } else { "N" }.to_string())
}

/// The flat field view write-back uploads select from: the flattened record
/// plus the destination-derived fields.
fn upload_view(rec: &SyncRecord) -> Map<String, Value> {
	fn opt(value: &Option<String>) -> Value {
		value.clone().map_or(Value::Null, Value::String)
	}

	let mut flat = flatten(&rec.canonical);
	let facts = rec.profile.clone().unwrap_or_default();
	flat.insert("PEOPLE_CODE_ID".into(), opt(&rec.status.person_code));
	flat.insert("found".into(), yn(rec.status.found));
	flat.insert("registered".into(), yn(facts.registered));
	flat.insert("reg_date".into(), opt(&facts.registration_date));
	flat.insert("readmit".into(), yn(facts.readmitted));
	flat.insert("withdrawn".into(), yn(facts.withdrawn));
	flat.insert("credits".into(), Value::String(facts.credit_count));
	flat.insert("campus_email".into(), opt(&facts.institutional_email));
	flat.insert("advisor".into(), opt(&facts.advisor));
	flat.insert(
		"orientation_complete".into(),
		yn(facts.orientation_complete),
	);
	flat
}
