use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use trendscout::classify::{PersonClassifier, RecognitionEngines};
use trendscout::scheduling::Interrupt;
use trendscout::traits::WebDriverLauncher;
use trendscout::workflows::{ScoutDeps, TrendScout};
use trendscout_common::{AppConfig, TrendScoutError};
use webdriver_client::ChromeOptions;

const TRENDS_WINDOW: (u32, u32) = (900, 300);
const SEARCH_WINDOW: (u32, u32) = (1000, 400);

#[derive(Parser)]
#[command(name = "trendscout", about = "Collect trending TV names and look up their search volume")]
struct Cli {
    /// Log as JSON lines
    #[arg(long)]
    json: bool,

    /// Directory for run files (overrides OUTPUT_DIR)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Stop collecting after this many names (overrides MAX_NAMES)
    #[arg(long)]
    max_names: Option<usize>,

    /// Collection time budget in seconds (overrides COLLECT_TIMEOUT_SECS)
    #[arg(long)]
    collect_timeout: Option<u64>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Collect, pause, then enrich the new run file (default)
    Run,
    /// Stage 1 only: write a new run file
    Collect,
    /// Stage 2 only: resume enrichment of an existing run file
    Enrich { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json);

    let started = Instant::now();
    info!("TrendScout starting...");

    let mut config = AppConfig::from_env()?;
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }
    if let Some(max) = cli.max_names {
        config.max_names = max;
    }
    if let Some(secs) = cli.collect_timeout {
        config.collect_timeout = Duration::from_secs(secs);
    }

    let (handle, interrupt) = Interrupt::new();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping");
            handle.trigger();
        }
    });

    let scout = build_scout(config, interrupt)?;
    let outcome = match cli.command.unwrap_or(Command::Run) {
        Command::Run => scout.run().await.map(|_| ()),
        Command::Collect => scout.stage_one().await.map(|path| match path {
            Some(path) => println!("{}", path.display()),
            None => info!("Nothing collected, no run file written"),
        }),
        Command::Enrich { file } => scout.stage_two(&file).await.map(|_| ()),
    };

    match outcome {
        Ok(()) => info!("Run complete"),
        Err(e) if TrendScoutError::is_interrupted(&e) => warn!("Process interrupted by user"),
        Err(e) => error!(error = %format!("{e:#}"), "Critical failure"),
    }
    info!(
        "Total runtime: {:.2} seconds",
        started.elapsed().as_secs_f64()
    );
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("trendscout=info,webdriver_client=info"));
    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn build_scout(config: AppConfig, interrupt: Interrupt) -> Result<TrendScout> {
    let trends_browser = Arc::new(WebDriverLauncher::new(
        &config.webdriver_url,
        ChromeOptions::stealth(TRENDS_WINDOW, config.headless),
    )?);
    let search_browser = Arc::new(WebDriverLauncher::new(
        &config.webdriver_url,
        ChromeOptions::stealth(SEARCH_WINDOW, config.headless),
    )?);
    let classifier = Arc::new(PersonClassifier::new(RecognitionEngines::from_config(&config)?));

    let deps = ScoutDeps::builder()
        .config(config)
        .launcher(trends_browser)
        .search_launcher(search_browser)
        .classifier(classifier)
        .interrupt(interrupt)
        .build();
    Ok(TrendScout::new(deps))
}
