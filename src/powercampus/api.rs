use crate::config::Endpoint;
use crate::powercampus::types::CampusError;
use crate::projection::CreationPayload;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, info};

/// REST intake surface of the destination system.
#[async_trait::async_trait]
pub trait CampusApi: Send + Sync {
	/// Submit a creation payload. Returns the new person code when the
	/// destination auto-accepts the application, absent for every other
	/// accepted outcome.
	async fn create_application(
		&self,
		payload: &CreationPayload,
	) -> Result<Option<String>, CampusError>;

	/// Whether the destination has any record of the application.
	async fn application_exists(&self, application_id: &str) -> Result<bool, CampusError>;
}

/// Destination intake-API client with basic auth.
#[derive(Clone)]
pub struct PowerCampusApiClient {
	http: Client,
	base_url: String,
	username: String,
	password: String,
}

impl PowerCampusApiClient {
	pub fn new(endpoint: &Endpoint) -> Self {
		let http = Client::builder()
			.timeout(Duration::from_secs(120))
			.build()
			.expect("Failed to create HTTP client");

		Self {
			http,
			base_url: endpoint.url.trim_end_matches('/').to_string(),
			username: endpoint.username.clone(),
			password: endpoint.password.clone(),
		}
	}

	/// Probe the API version endpoint; used as a connectivity check at startup.
	pub async fn check_version(&self) -> Result<String, CampusError> {
		let response = self
			.http
			.get(format!("{}/api/version", self.base_url))
			.basic_auth(&self.username, Some(&self.password))
			.send()
			.await?
			.error_for_status()?;
		Ok(response.text().await?)
	}
}

/// Pull the person code out of the intake API's acceptance trailer.
///
/// An auto-accepted application ends its response body with a
/// `New People Id` marker followed by the zero-padded numeric people code;
/// the code is kept as text to preserve leading zeros and prefixed with `P`.
/// Any other body shape yields absent.
pub fn parse_people_code(body: &str) -> Option<String> {
	let idx = body.rfind("New People Id")?;
	let tail = &body[idx + "New People Id".len()..];
	let digits: String = tail
		.chars()
		.skip_while(|c| !c.is_ascii_digit())
		.take_while(|c| c.is_ascii_digit())
		.collect();
	if digits.is_empty() {
		None
	} else {
		Some(format!("P{}", digits))
	}
}

#[async_trait::async_trait]
impl CampusApi for PowerCampusApiClient {
	async fn create_application(
		&self,
		payload: &CreationPayload,
	) -> Result<Option<String>, CampusError> {
		let response = self
			.http
			.post(format!("{}/api/applications", self.base_url))
			.basic_auth(&self.username, Some(&self.password))
			.json(payload)
			.send()
			.await?;

		// A 202 means the server side is misconfigured (e.g. application
		// settings not deployed); surface it instead of retrying.
		if response.status() == StatusCode::ACCEPTED {
			let body = response.text().await?;
			return Err(CampusError::ConfigurationIncomplete(body));
		}

		let response = response.error_for_status()?;
		let body = response.text().await?;
		let person_code = parse_people_code(&body);
		info!(
			"Submitted application {}; person code: {:?}",
			payload.application_number, person_code
		);
		Ok(person_code)
	}

	async fn application_exists(&self, application_id: &str) -> Result<bool, CampusError> {
		let response = self
			.http
			.get(format!("{}/api/applications", self.base_url))
			.basic_auth(&self.username, Some(&self.password))
			.query(&[("applicationNumber", application_id)])
			.send()
			.await?
			.error_for_status()?;

		let body: serde_json::Value = response.json().await?;
		let exists = body.get("applicationNumber").is_some();
		debug!("Application {} exists in destination: {}", application_id, exists);
		Ok(exists)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn acceptance_trailer_yields_prefixed_code() {
		let body = "Application saved. New People Id: 000164949.";
		assert_eq!(parse_people_code(body), Some("P000164949".to_string()));
	}

	#[test]
	fn leading_zeros_are_preserved() {
		assert_eq!(
			parse_people_code("New People Id 000000007"),
			Some("P000000007".to_string())
		);
	}

	#[test]
	fn other_bodies_yield_absent() {
		assert_eq!(parse_people_code("Application queued for review."), None);
		assert_eq!(parse_people_code("New People Id pending"), None);
		assert_eq!(parse_people_code(""), None);
	}
}
