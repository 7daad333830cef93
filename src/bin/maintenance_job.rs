//! Scheduled maintenance Lambda
//!
//! Triggered by an EventBridge schedule. Swaps inverted installment amounts,
//! then flips past-due installments to OVERDUE. Both steps commit row by row
//! and are safe to re-run.

use anyhow::Context;
use aws_lambda_events::event::cloudwatch_events::CloudWatchEvent;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use log::info;
use serde::Serialize;

use rcd_crm::payments::service::{rectify_amounts, refresh_overdue};
use rcd_crm::payments::RectifyReport;
use rcd_crm::{AppConfig, MemoryStore, SystemClock};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MaintenanceReport {
    rectified: RectifyReport,
    now_overdue: usize,
}

fn maintain(config: &AppConfig) -> anyhow::Result<MaintenanceReport> {
    let store = MemoryStore::open(&config.data_file)
        .with_context(|| format!("loading data file {}", config.data_file.display()))?;

    let rectified = rectify_amounts(&store)?;
    let now_overdue = refresh_overdue(&store, &SystemClock)?;
    Ok(MaintenanceReport {
        rectified,
        now_overdue,
    })
}

async fn handler(event: LambdaEvent<CloudWatchEvent>) -> Result<MaintenanceReport, Error> {
    info!(
        "maintenance run triggered by {} ({})",
        event.payload.source.as_deref().unwrap_or("manual"),
        event.context.request_id
    );

    let config = AppConfig::from_env()?;
    let report = maintain(&config)?;
    info!(
        "maintenance done: {} of {} inverted rows swapped, {} installments now overdue",
        report.rectified.swapped, report.rectified.found, report.now_overdue
    );
    Ok(report)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::init();
    run(service_fn(handler)).await
}
