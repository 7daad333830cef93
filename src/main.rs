//! RCD CRM operator CLI
//!
//! Runs the library operations against a JSON data snapshot, for back-office
//! tasks and checks outside the HTTP surface.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use clap::{Parser, Subcommand};
use log::info;

use rcd_crm::bordereau::{build_v2, render_download, v2_record, DateRange, InclusionOptions, V2Request};
use rcd_crm::config::{parse_delimiter, AppConfig};
use rcd_crm::payments::service::{list_overdue, rectify_amounts};
use rcd_crm::{calculate_premium, Clock, CrmStore, MemoryStore, SystemClock, TariffInput};

#[derive(Parser)]
#[command(name = "rcd_crm")]
#[command(about = "RCD CRM back-office tools", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Price a tariff input file and print the breakdown
    Tariff(TariffArgs),
    /// Write the v2 bordereau ZIP for a period
    Bordereau(BordereauArgs),
    /// Swap inverted HT/TTC amounts and save the snapshot
    Rectify(DataArgs),
    /// Print unpaid installments past their due date
    Overdue(DataArgs),
}

#[derive(Parser)]
struct TariffArgs {
    #[arg(long)]
    input: PathBuf,
}

#[derive(Parser)]
struct DataArgs {
    /// Defaults to RCD_CRM_DATA_FILE
    #[arg(long)]
    data: Option<PathBuf>,
}

#[derive(Parser)]
struct BordereauArgs {
    #[arg(long)]
    data: Option<PathBuf>,
    #[arg(long)]
    from: NaiveDate,
    #[arg(long)]
    to: NaiveDate,
    #[arg(long, default_value = ".")]
    out: PathBuf,
    #[arg(long)]
    delimiter: Option<String>,
    #[arg(long, default_value_t = false)]
    include_terminated: bool,
    #[arg(long, default_value_t = false)]
    paid_only: bool,
    #[arg(long, default_value_t = false)]
    no_broker_details: bool,
    #[arg(long, default_value_t = false)]
    no_tax_breakdown: bool,
}

fn data_path(config: &AppConfig, data: Option<PathBuf>) -> PathBuf {
    data.unwrap_or_else(|| config.data_file.clone())
}

fn run_tariff(args: TariffArgs) -> Result<()> {
    let text = fs::read_to_string(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let input: TariffInput = serde_json::from_str(&text)?;
    input.validate()?;

    let result = calculate_premium(&input);
    println!("{:<24} {:>12} {:>14}", "Factor", "Value", "Running total");
    println!("{}", "-".repeat(52));
    for factor in &result.factors {
        println!("{:<24} {:>12.4} {:>14.2}", factor.code, factor.value, factor.running_total);
    }
    println!("{}", "-".repeat(52));
    println!("Premium HT:  {:>12.2}", result.premium_ht);
    println!("Tax ({:.0}%):   {:>12.2}", result.tax_rate * 100.0, result.tax_amount);
    println!("Premium TTC: {:>12.2}", result.premium_ttc);
    Ok(())
}

fn run_bordereau(config: &AppConfig, args: BordereauArgs) -> Result<()> {
    let delimiter = match &args.delimiter {
        Some(d) => parse_delimiter(d)?,
        None => config.csv_delimiter,
    };
    let path = data_path(config, args.data);
    let store = MemoryStore::open(&path).with_context(|| format!("loading {}", path.display()))?;

    let request = V2Request {
        date_range: DateRange {
            start_date: args.from,
            end_date: args.to,
        },
        inclusion_options: InclusionOptions {
            include_terminated: args.include_terminated,
            include_unpaid_receipts: !args.paid_only,
            include_broker_details: !args.no_broker_details,
            include_tax_breakdown: !args.no_tax_breakdown,
        },
    };
    let result = build_v2(&store, &request, SystemClock.now())?;
    info!(
        "{} polices, {} quittances for {}..{}",
        result.metadata.total_polices, result.metadata.total_quittances, args.from, args.to
    );

    let record = v2_record(result, "cli");
    let download = render_download(&record, delimiter)?;
    fs::create_dir_all(&args.out)?;
    let target = args.out.join(&download.file_name);
    fs::write(&target, &download.bytes)?;
    store.insert_bordereau(&record)?;

    println!(
        "Wrote {} ({} bytes) for {}/{}",
        target.display(),
        download.bytes.len(),
        args.from.month(),
        args.from.year()
    );
    Ok(())
}

fn run_rectify(config: &AppConfig, args: DataArgs) -> Result<()> {
    let path = data_path(config, args.data);
    let store = MemoryStore::open(&path).with_context(|| format!("loading {}", path.display()))?;
    let report = rectify_amounts(&store)?;
    println!("Inverted rows found: {}", report.found);
    println!("Rows swapped:        {}", report.swapped);
    Ok(())
}

fn run_overdue(config: &AppConfig, args: DataArgs) -> Result<()> {
    let path = data_path(config, args.data);
    let store = MemoryStore::open_read_only(&path)
        .with_context(|| format!("loading {}", path.display()))?;
    let overdue = list_overdue(&store, &SystemClock)?;

    println!("{:<38} {:>3} {:>12} {:>12} {:>6}", "Installment", "#", "Due", "TTC", "Days");
    for row in &overdue {
        println!(
            "{:<38} {:>3} {:>12} {:>12.2} {:>6}",
            row.installment.id,
            row.installment.number,
            row.installment.due_date,
            row.installment.amount_ttc,
            row.days_overdue
        );
    }
    println!("{} overdue installment(s)", overdue.len());
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;

    match cli.command {
        Command::Tariff(args) => run_tariff(args),
        Command::Bordereau(args) => run_bordereau(&config, args),
        Command::Rectify(args) => run_rectify(&config, args),
        Command::Overdue(args) => run_overdue(&config, args),
    }
}
