mod config;
mod mapping;
mod powercampus;
mod projection;
mod record;
mod slate;
mod sync;

use crate::config::{Config, LearnedActions};
use crate::mapping::CodeMappingTable;
use crate::powercampus::{PowerCampusApiClient, SqlCampusStore};
use crate::slate::SlateClient;
use crate::sync::{SyncError, SyncOrchestrator};
use std::process::ExitCode;
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::from_default_env()
				.add_directive(tracing::Level::INFO.into()),
		)
		.with_target(false)
		.with_thread_ids(false)
		.with_thread_names(false)
		.with_file(false)
		.with_line_number(false)
		.with_timer(tracing_subscriber::fmt::time::time())
		.init();

	// Usage: admissions-state-sync [config-path] [prospect-id]
	let mut args = std::env::args().skip(1);
	let config_path = args.next().unwrap_or_else(|| "config.json".to_string());
	let pid = args.next();

	info!("Starting admissions sync cycle");
	match run(&config_path, pid.as_deref()).await {
		Ok(summary) => {
			info!("{}", summary);
			ExitCode::SUCCESS
		}
		Err(err) => {
			error!("Sync cycle failed: {}", err);
			ExitCode::FAILURE
		}
	}
}

async fn run(config_path: &str, pid: Option<&str>) -> Result<String, SyncError> {
	let config = Config::load(config_path)?;
	let mapping = CodeMappingTable::load(&config.mapping_file_location)?;
	info!("Loaded configuration and code-mapping table");

	let feed = SlateClient::new(&config);
	let api = PowerCampusApiClient::new(&config.pc_api);
	// Connectivity probe; a misconfigured destination fails here instead of
	// midway through the batch.
	let version = api.check_version().await?;
	info!("Destination API reachable, version {}", version.trim());

	let store = SqlCampusStore::connect(&config.pc_database_url, &config.status_log_table).await?;

	let learned = match &config.scheduled_actions.learned_codes_file {
		Some(path) => LearnedActions::load(path)?,
		None => LearnedActions::ephemeral(),
	};

	let mut orchestrator = SyncOrchestrator::new(&config, mapping, &feed, &api, &store, learned);
	orchestrator.run_cycle(pid).await
}
