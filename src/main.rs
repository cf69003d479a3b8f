//! BrandPulse - watch an AI-visibility brand analysis until it completes
//!
//! A CLI tool that polls the analytics API for a product, keeps the last
//! completed report on screen while a new analysis runs in the background,
//! and writes the report once it is available.
//!
//! Exit codes:
//!   0 - Report written
//!   1 - Runtime error (configuration, HTTP client, file write, etc.)
//!   2 - No report available (interrupted or gave up before anything completed)

mod analysis;
mod api;
mod cache;
mod cli;
mod config;
mod error;
mod models;
mod poller;
mod report;

use anyhow::{Context, Result};
use api::client::ClientConfig;
use api::AnalyticsClient;
use cache::ReportCache;
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE_NAME};
use indicatif::{ProgressBar, ProgressStyle};
use poller::{NewAnalysisRequest, Phase, PollEvent, PollSession, ReportView, ViewSnapshot};
use report::{ReportInput, ReportOptions};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("BrandPulse v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .brandpulse.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to customize the API URL, poll interval, cache, and report output.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {:#}", e);
            Ok(Config::default())
        }
    }
}

/// Watch the product's analysis and write the report. Returns exit code (0 or 2).
async fn run(args: Args) -> Result<i32> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let product_id = args.product_id().to_string();

    let cache = if config.cache.enabled {
        let path = config
            .cache
            .path
            .clone()
            .unwrap_or_else(ReportCache::default_path);
        debug!("Using report cache at {}", path.display());
        Some(ReportCache::new(path))
    } else {
        None
    };

    if args.new_analysis {
        return handle_new_analysis(&product_id, cache.as_ref());
    }

    let client = AnalyticsClient::new(ClientConfig {
        base_url: config.api.base_url.clone(),
        token: args.token.clone().unwrap_or_default(),
        timeout_seconds: config.api.timeout_seconds,
    })
    .context("Failed to create HTTP client")?;

    if !args.quiet {
        println!("📡 Watching analysis for product {}", product_id);
        println!("   API: {}", config.api.base_url);
        println!("   Interval: {}s", config.poller.interval_seconds);
        if let Some(secs) = args.max_wait {
            println!("   Max wait: {}s", secs);
        }
        println!();
    }

    let (mut session, mut events) = PollSession::new(client, cache, config.poller_config());
    session.start(&product_id)?;

    let spinner = (!args.quiet).then(create_spinner);

    let max_wait = async {
        match args.max_wait {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(max_wait);

    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(PollEvent::Notification(notification)) => {
                    announce(
                        spinner.as_ref(),
                        args.quiet,
                        &format!("🔔 {}: {}", notification.title(), notification.description()),
                    );
                }
                Some(PollEvent::Updated(snapshot)) => {
                    if let Some(ref pb) = spinner {
                        pb.set_message(progress_message(&snapshot));
                    }
                    if snapshot.is_final() {
                        break;
                    }
                    if args.once {
                        info!("Single fetch requested, not waiting for completion");
                        break;
                    }
                }
                None => break,
            },
            _ = &mut interrupt => {
                announce(spinner.as_ref(), args.quiet, "⏹️  Interrupted, stopping poller");
                break;
            }
            _ = &mut max_wait => {
                warn!("Analysis did not complete within the max wait time");
                break;
            }
        }
    }

    session.stop();
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    let Some(snapshot) = session.snapshot() else {
        eprintln!("\n⚠️  No analysis state available.");
        return Ok(2);
    };

    if let Some(ref message) = snapshot.error {
        eprintln!("⚠️  {}", message);
    }

    let exit_code = write_output(&config, &snapshot)?;

    if exit_code == 0 && !args.quiet {
        if let Some(request) = session.new_analysis_request() {
            println!(
                "   Run `brandpulse --product {} --new-analysis` to request a fresh analysis{}",
                request.product_id,
                request
                    .prefill_website
                    .map(|site| format!(" of {}", site))
                    .unwrap_or_default()
            );
        }
    }

    Ok(exit_code)
}

/// Render the displayed record and write it. Returns 2 when there is nothing to show.
fn write_output(config: &Config, snapshot: &ViewSnapshot) -> Result<i32> {
    let (record, running) = match snapshot.view() {
        ReportView::Fresh(record) => (record, None),
        ReportView::Stale { report, running } => (report, Some(running)),
        ReportView::Loading => match snapshot.previous.as_ref() {
            Some(previous) => (previous, None),
            None => {
                eprintln!("\n⚠️  No completed analysis is available yet for this product.");
                return Ok(2);
            }
        },
    };

    let input = ReportInput {
        product_id: &snapshot.product_id,
        record,
        running,
    };

    let output = match config.report.format {
        OutputFormat::Json => report::generate_json_report(&input)?,
        OutputFormat::Markdown => {
            let options: ReportOptions = config.report_options();
            report::generate_markdown_report(&input, &options)
        }
    };

    let path = config.output_path();
    report::write_report(&output, &path)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;

    println!("\n📊 Report Summary:");
    println!("   Product: {}", snapshot.product_id);
    println!("   Status: {}", record.status());
    if let Some(date) = record.raw_date() {
        println!("   Analysis date: {}", date);
    }
    if let Some(running) = running {
        println!(
            "   ⏳ A newer analysis is still {}; this is the last completed report.",
            running.status()
        );
    }
    println!("\n✅ Report saved to: {}", path.display());

    Ok(0)
}

/// Handle --new-analysis: print the request that starts a fresh analysis.
fn handle_new_analysis(product_id: &str, cache: Option<&ReportCache>) -> Result<i32> {
    let shown = cache.and_then(|cache| cache.last_completed(product_id));
    let request = NewAnalysisRequest::for_product(product_id, shown.as_ref());

    let json = serde_json::to_string_pretty(&request)
        .context("Failed to serialize new analysis request")?;
    println!("{}", json);
    Ok(0)
}

fn create_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) =
        ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")
    {
        pb.set_style(style);
    }
    pb.set_message("Fetching analytics...");
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// Print a line without tearing the spinner.
fn announce(spinner: Option<&ProgressBar>, quiet: bool, message: &str) {
    match spinner {
        Some(pb) => pb.println(message),
        None if !quiet => println!("{}", message),
        None => {}
    }
}

fn progress_message(snapshot: &ViewSnapshot) -> String {
    let status = snapshot
        .current
        .as_ref()
        .map(|record| record.status().to_string())
        .unwrap_or_else(|| "no analysis yet".to_string());

    let mut message = match snapshot.phase {
        Phase::ShowingStaleWithBackgroundRun => {
            format!("Last report ready, new analysis {}", status)
        }
        Phase::ShowingFreshCompleted => "Analysis completed".to_string(),
        _ => format!("Waiting for analysis ({})", status),
    };
    if let Some(ref error) = snapshot.error {
        message.push_str(&format!(" ⚠️ {}", error));
    }
    message
}
