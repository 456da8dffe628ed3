//! Parser CLI - loads a site-visit CSV export and prints the dashboard
//! figures for a filter.
//!
//! The same file and filter always produce the same output.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;

use parser::{load_file, DashboardView, FilterState, InputEncoding, OperationalPolicy, PipelineConfig};

#[derive(Parser, Debug)]
#[command(name = "parser", about = "Summarizes camera site-visit reports from a CSV export")]
struct Args {
    /// CSV export to load
    #[arg(long)]
    file: PathBuf,

    /// Input encoding: auto, utf-8 or latin1 (overrides CSV_ENCODING)
    #[arg(long)]
    encoding: Option<InputEncoding>,

    /// Operational count policy: real or estimated (overrides OPERATIONAL_POLICY)
    #[arg(long)]
    policy: Option<OperationalPolicy>,

    /// Location filter, repeatable
    #[arg(long)]
    location: Vec<String>,

    #[arg(long)]
    supervisor: Option<String>,

    /// Time-of-check category (e.g. "Mañana")
    #[arg(long)]
    time_of_check: Option<String>,

    /// Operational answer category (e.g. "Todas", "No")
    #[arg(long)]
    operational: Option<String>,

    /// First report date, inclusive (YYYY-MM-DD)
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Last report date, inclusive (YYYY-MM-DD)
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Print the full dashboard view as JSON
    #[arg(long, default_value = "false")]
    json: bool,

    /// Log level when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_logging(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stderr keeps stdout clean for --json
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn print_view(view: &DashboardView) {
    println!("Period: {}", view.summary.period);
    println!("Reports: {}", view.records);
    println!("Total cameras: {}", view.metrics.total_cameras);
    println!("Operational: {}", view.metrics.operational_count);
    println!("Faulty: {}", view.metrics.faulty_camera_count);

    if !view.summary.highlights.is_empty() {
        println!("\nHighlights:");
        for line in &view.summary.highlights {
            println!("  {}", line);
        }
    }

    for chart in &view.charts {
        println!("\n{}:", chart.title);
        if let Some(message) = &chart.empty_message {
            println!("  {}", message);
            continue;
        }
        for (label, value) in chart.labels.iter().zip(&chart.values) {
            println!("  {:<30} {}", label, value);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_logging(&args.log_level);

    let mut config = PipelineConfig::from_env()?;
    if let Some(policy) = args.policy {
        config.policy = policy;
    }
    if let Some(encoding) = args.encoding {
        config.encoding = encoding;
    }

    let dataset = load_file(&args.file, &config.load_options())
        .await
        .with_context(|| format!("Failed to load {}", args.file.display()))?;

    let filters = FilterState {
        locations: args.location,
        supervisor: args.supervisor,
        time_of_check: args.time_of_check,
        operational: args.operational,
        date_from: args.from,
        date_to: args.to,
    };
    let view = DashboardView::build(&dataset.records, &filters);

    if args.json {
        let out = serde_json::to_string_pretty(&view).context("Failed to serialize view")?;
        println!("{}", out);
        return Ok(());
    }

    println!("=== Camera Site-Visit Reports ===");
    println!("File: {}", dataset.file_name);
    println!("Encoding: {}", dataset.encoding);
    println!("Policy: {:?}", dataset.policy);
    println!(
        "Records: {} accepted, {} skipped",
        dataset.records.len(),
        dataset.rejected_rows
    );
    println!();
    print_view(&view);

    Ok(())
}
