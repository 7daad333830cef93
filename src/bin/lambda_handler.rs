//! AWS Lambda handler serving the CRM HTTP routes
//!
//! Supports Lambda Function URLs for direct HTTP access. The data snapshot and
//! the session table are loaded once per cold start; see `AppConfig` for the
//! environment variables involved.

use std::sync::Arc;

use anyhow::Context;
use lambda_http::{run, service_fn, Error, Request};
use log::info;

use rcd_crm::{App, AppConfig, CrmStore, MemoryStore, SystemClock, TokenSessions};

fn build_app(config: &AppConfig) -> anyhow::Result<App> {
    let store = if config.persist {
        MemoryStore::open(&config.data_file)
    } else {
        MemoryStore::open_read_only(&config.data_file)
    }
    .with_context(|| format!("loading data file {}", config.data_file.display()))?;

    let sessions = TokenSessions::load(&config.sessions_file)
        .with_context(|| format!("loading sessions file {}", config.sessions_file.display()))?;

    info!(
        "cold start: {} bordereaux on record, {} sessions, persist={}",
        store.count_bordereaux()?,
        sessions.len(),
        config.persist
    );
    Ok(App::new(
        Arc::new(store),
        Arc::new(sessions),
        Arc::new(SystemClock),
        config.csv_delimiter,
    ))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::init();

    let config = AppConfig::from_env()?;
    let app = build_app(&config)?;
    let app = &app;

    run(service_fn(move |event: Request| async move {
        Ok::<_, Error>(app.handle(event).await)
    }))
    .await
}
