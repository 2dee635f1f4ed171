use crate::config::{Config, Endpoint};
use crate::record::{RawRecord, ScheduledAction};
use crate::slate::types::{RowEnvelope, SlateError, UploadKind};
use itertools::Itertools;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

/// Ceiling on application ids per scheduled-action fetch; keeps the
/// comma-joined `aids` parameter under the origin's GET size limit.
pub const MAX_ACTION_IDS_PER_FETCH: usize = 48;

/// Read/write surface of the origin system.
#[async_trait::async_trait]
pub trait OriginFeed: Send + Sync {
	/// Fetch the application batch, optionally filtered to one prospect id.
	async fn fetch_applications(&self, pid: Option<&str>) -> Result<Vec<RawRecord>, SlateError>;

	/// Fetch scheduled actions for one batch of application ids. Callers must
	/// keep each batch at or under [`MAX_ACTION_IDS_PER_FETCH`] ids and
	/// paginate client-side.
	async fn fetch_actions(
		&self,
		application_ids: &[String],
	) -> Result<Vec<ScheduledAction>, SlateError>;

	/// Upload rows to one of the origin write-back targets.
	async fn post_rows(&self, kind: UploadKind, rows: &[Value]) -> Result<(), SlateError>;

	/// Upload the financial-aid checklist as a tab-separated body.
	async fn post_fa_checklist(&self, body: String) -> Result<(), SlateError>;
}

/// Origin CRM client over HTTP with basic auth.
#[derive(Clone)]
pub struct SlateClient {
	http: Client,
	query: Endpoint,
	actions: Option<Endpoint>,
	upload_passive: Endpoint,
	upload_active: Endpoint,
	upload_schools: Option<Endpoint>,
	fa_post: Option<Endpoint>,
}

impl SlateClient {
	pub fn new(config: &Config) -> Self {
		let http = Client::builder()
			.timeout(Duration::from_secs(120))
			.build()
			.expect("Failed to create HTTP client");

		Self {
			http,
			query: config.slate_query_apps.clone(),
			actions: config.scheduled_actions.slate_get.clone(),
			upload_passive: config.slate_upload_passive.endpoint.clone(),
			upload_active: config.slate_upload_active.endpoint.clone(),
			upload_schools: config.slate_upload_schools.clone(),
			fa_post: config.fa_checklist.slate_post.clone(),
		}
	}

	async fn get_rows<T: serde::de::DeserializeOwned>(
		&self,
		endpoint: &Endpoint,
		params: &[(&str, &str)],
	) -> Result<Vec<T>, SlateError> {
		let response = self
			.http
			.get(&endpoint.url)
			.basic_auth(&endpoint.username, Some(&endpoint.password))
			.query(params)
			.send()
			.await?
			.error_for_status()?;

		let envelope: RowEnvelope<T> = response.json().await?;
		Ok(envelope.row)
	}

	async fn post_envelope(&self, endpoint: &Endpoint, rows: &[Value]) -> Result<(), SlateError> {
		let envelope = RowEnvelope { row: rows.to_vec() };
		self.http
			.post(&endpoint.url)
			.basic_auth(&endpoint.username, Some(&endpoint.password))
			.json(&envelope)
			.send()
			.await?
			.error_for_status()?;
		Ok(())
	}
}

#[async_trait::async_trait]
impl OriginFeed for SlateClient {
	async fn fetch_applications(&self, pid: Option<&str>) -> Result<Vec<RawRecord>, SlateError> {
		let rows = match pid {
			Some(pid) => self.get_rows(&self.query, &[("pid", pid)]).await?,
			None => self.get_rows(&self.query, &[]).await?,
		};
		info!("Fetched {} applications from origin", rows.len());
		Ok(rows)
	}

	async fn fetch_actions(
		&self,
		application_ids: &[String],
	) -> Result<Vec<ScheduledAction>, SlateError> {
		let endpoint = self
			.actions
			.as_ref()
			.ok_or(SlateError::TargetNotConfigured("scheduled_actions"))?;

		let aids = application_ids.iter().join(",");
		let rows: Vec<ScheduledAction> = self.get_rows(endpoint, &[("aids", &aids)]).await?;
		debug!(
			"Fetched {} actions for {} applications",
			rows.len(),
			application_ids.len()
		);
		Ok(rows)
	}

	async fn post_rows(&self, kind: UploadKind, rows: &[Value]) -> Result<(), SlateError> {
		let endpoint = match kind {
			UploadKind::Passive => &self.upload_passive,
			UploadKind::Changed => &self.upload_active,
			UploadKind::Schools => self
				.upload_schools
				.as_ref()
				.ok_or(SlateError::TargetNotConfigured("slate_upload_schools"))?,
		};
		debug!("Uploading {} rows to {:?} target", rows.len(), kind);
		self.post_envelope(endpoint, rows).await
	}

	async fn post_fa_checklist(&self, body: String) -> Result<(), SlateError> {
		let endpoint = self
			.fa_post
			.as_ref()
			.ok_or(SlateError::TargetNotConfigured("fa_checklist"))?;

		self.http
			.post(&endpoint.url)
			.basic_auth(&endpoint.username, Some(&endpoint.password))
			.body(body)
			.send()
			.await?
			.error_for_status()?;
		Ok(())
	}
}
