use anyhow::{Context, Result};
use chrono::Utc;
use garmin_libra_sync::common::garmin_client::GarminClient;
use garmin_libra_sync::common::libra_client::LibraClient;
use garmin_libra_sync::common::token_store::TokenStore;
use std::env;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::filter::EnvFilter;

mod config;
mod convert;
mod session;
mod sync;

use crate::config::Config;
use crate::sync::{SyncSummary, WeightSync};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

    match run().await {
        Ok(summary) => {
            info!(
                "Sync complete: {} uploaded, {} failed, {} skipped",
                summary.uploaded, summary.failed, summary.skipped
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(1)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    if env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json")) {
        builder.json().with_current_span(false).init();
    } else {
        builder.init();
    }
}

async fn run() -> Result<SyncSummary> {
    let config = Config::from_env()?;

    let store = TokenStore::new(&config.token_store);
    let mut garmin =
        GarminClient::new(&config.garmin_domain).context("Failed to create Garmin client")?;
    session::bootstrap(&mut garmin, &store, &config.email, &config.password).await?;

    let libra = LibraClient::new(&config.libra_endpoint, &config.libra_token)?;

    let summary = WeightSync::new(garmin, libra)
        .sync_weights(Utc::now())
        .await?;

    Ok(summary)
}
