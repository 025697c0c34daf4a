use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use url::Url;

use pagecheck_client::{HttpBrowser, wait_until_ready};
use pagecheck_core::config::{base_url_from_env, join_base_url, parse_base_url};
use pagecheck_core::runner::TracingRunReporter;
use pagecheck_core::scenarios::{builtin_scenarios, load_scenarios};
use pagecheck_core::traits::Browser;
use pagecheck_core::{RunConfig, RunReport, Scenario, SmokeRunner};

#[derive(Parser)]
#[command(name = "pagecheck", version, about = "Browser smoke tests for web frontends")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run scenarios against a running site and report pass/fail
    Run {
        /// Base URL of the site under test [env: PAGECHECK_BASE_URL, default: http://localhost:3000]
        #[arg(short, long, env = "PAGECHECK_BASE_URL")]
        base_url: Option<String>,

        /// JSON file with scenario definitions (built-in frontend checks if omitted)
        #[arg(short, long)]
        scenarios: Option<PathBuf>,

        /// Browsing driver
        #[arg(short, long, value_enum)]
        driver: Option<Driver>,

        /// Per-assertion wait timeout in seconds [env: PAGECHECK_TIMEOUT_SECS]
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Navigation timeout in seconds [env: PAGECHECK_NAV_TIMEOUT_SECS]
        #[arg(long)]
        nav_timeout: Option<u64>,

        /// Scenarios to run at once [env: PAGECHECK_CONCURRENCY]
        #[arg(short, long)]
        concurrency: Option<usize>,

        /// Path polled until it answers 2xx before scenarios start (e.g. "/api/health")
        #[arg(long)]
        wait_for: Option<String>,

        /// How long to wait for --wait-for, in seconds
        #[arg(long, default_value_t = 60)]
        ready_timeout: u64,

        /// Report format written to stdout
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Print the scenarios that would run
    List {
        /// JSON file with scenario definitions (built-in frontend checks if omitted)
        #[arg(short, long)]
        scenarios: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Driver {
    /// Plain HTTP requests and a DOM parser; no JavaScript
    Http,
    /// Headless Chromium
    Chromium,
}

impl Default for Driver {
    fn default() -> Self {
        if cfg!(feature = "browser") {
            Driver::Chromium
        } else {
            Driver::Http
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Csv,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Setup tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("pagecheck=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            base_url,
            scenarios,
            driver,
            timeout,
            nav_timeout,
            concurrency,
            wait_for,
            ready_timeout,
            format,
        } => {
            let base_url = match base_url {
                Some(raw) => parse_base_url(&raw)?,
                None => base_url_from_env()?,
            };
            let scenarios = resolve_scenarios(scenarios.as_deref())?;
            let config = resolve_config(timeout, nav_timeout, concurrency)?;

            if let Some(path) = wait_for {
                let url = join_base_url(&base_url, &path)
                    .with_context(|| format!("Invalid --wait-for path: {path}"))?;
                tracing::info!("Waiting for {} to become ready", url);
                wait_until_ready(
                    url.as_str(),
                    Duration::from_secs(ready_timeout),
                    Duration::from_millis(500),
                )
                .await
                .with_context(|| format!("{url} did not become ready"))?;
            }

            let report = match driver.unwrap_or_default() {
                Driver::Http => {
                    let browser = HttpBrowser::with_timeout(config.navigation_timeout)
                        .context("Failed to create HTTP client")?;
                    cmd_run(browser, config, &base_url, &scenarios).await
                }
                Driver::Chromium => launch_chromium_and_run(config, &base_url, &scenarios).await?,
            };

            print_report(&report, format)?;
            Ok(ExitCode::from(report.exit_code() as u8))
        }
        Commands::List { scenarios } => {
            let scenarios = resolve_scenarios(scenarios.as_deref())?;
            cmd_list(&scenarios);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn resolve_scenarios(path: Option<&Path>) -> Result<Vec<Scenario>> {
    match path {
        Some(path) => load_scenarios(path)
            .with_context(|| format!("Failed to load scenarios from {}", path.display())),
        None => Ok(builtin_scenarios()),
    }
}

/// Environment defaults, overridden by explicit flags.
fn resolve_config(
    timeout: Option<u64>,
    nav_timeout: Option<u64>,
    concurrency: Option<usize>,
) -> Result<RunConfig> {
    let mut config = RunConfig::from_env().context("Invalid run configuration")?;
    if let Some(secs) = timeout {
        config = config.with_assertion_timeout(Duration::from_secs(secs));
    }
    if let Some(secs) = nav_timeout {
        config = config.with_navigation_timeout(Duration::from_secs(secs));
    }
    if let Some(n) = concurrency {
        config = config.with_max_concurrency(n);
    }
    Ok(config)
}

#[cfg(feature = "browser")]
async fn launch_chromium_and_run(
    config: RunConfig,
    base_url: &Url,
    scenarios: &[Scenario],
) -> Result<RunReport> {
    tracing::info!("Launching headless browser");
    let browser = pagecheck_client::ChromiumBrowser::launch()
        .await
        .context("Failed to launch headless Chromium (set CHROME_BIN or use --driver http)")?;
    Ok(cmd_run(browser, config, base_url, scenarios).await)
}

#[cfg(not(feature = "browser"))]
async fn launch_chromium_and_run(
    _config: RunConfig,
    _base_url: &Url,
    _scenarios: &[Scenario],
) -> Result<RunReport> {
    anyhow::bail!("pagecheck was built without the `browser` feature; use --driver http")
}

async fn cmd_run<B: Browser>(
    browser: B,
    config: RunConfig,
    base_url: &Url,
    scenarios: &[Scenario],
) -> RunReport {
    let cancel_token = CancellationToken::new();
    let signal_token = cancel_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted: finishing in-flight scenarios, skipping the rest");
            signal_token.cancel();
        }
    });

    let runner = SmokeRunner::new(browser, config);
    let started_at = chrono::Utc::now();
    let outcome = runner
        .run_with(base_url, scenarios, &cancel_token, &TracingRunReporter)
        .await;
    let finished_at = chrono::Utc::now();

    RunReport::new(base_url.as_str(), started_at, finished_at, outcome)
}

fn print_report(report: &RunReport, format: OutputFormat) -> Result<()> {
    let rendered = match format {
        OutputFormat::Text => report.to_text(),
        OutputFormat::Json => report.to_json().context("Failed to render JSON report")?,
        OutputFormat::Csv => report.to_csv().context("Failed to render CSV report")?,
    };
    print!("{rendered}");
    if !rendered.ends_with('\n') {
        println!();
    }
    Ok(())
}

fn cmd_list(scenarios: &[Scenario]) {
    if scenarios.is_empty() {
        println!("No scenarios configured");
        return;
    }

    for scenario in scenarios {
        let path = if scenario.path.is_empty() { "/" } else { scenario.path.as_str() };
        println!("{} ({})", scenario.name, path);
        for assertion in &scenario.assertions {
            println!("  - {assertion}");
        }
    }

    println!("\nTotal: {} scenarios", scenarios.len());
}
