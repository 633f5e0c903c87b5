//! ARRIS Exporter binary
//!
//! Polls the cable modem status page and serves the readings as Prometheus metrics.

use anyhow::Context;
use arris_exporter::{
    start_web_server, web::AppState, ChannelMetrics, HttpFetcher, ModemConfig, Page, PageFetcher,
    Poller, Status, WebConfig, DEFAULT_INTERVAL_MS, DEFAULT_TIMEOUT_MS, DEFAULT_WEB_PORT,
};
use arris_exporter::scrape::page::DEFAULT_HOST;
use arris_exporter::scrape::status::DEFAULT_PAGE;
use clap::{Args, Parser, Subcommand};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "arris_exporter")]
#[command(about = "Prometheus exporter for ARRIS SURFboard cable modems")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = "Polls the modem's connection status page and exposes per-channel readings")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Modem address, including scheme
    #[arg(long, default_value = DEFAULT_HOST, global = true)]
    modem: String,

    /// Status page path on the modem
    #[arg(long, default_value = DEFAULT_PAGE, global = true)]
    page: String,

    /// Modem request timeout in milliseconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_MS, global = true)]
    timeout: u64,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the modem and serve metrics (default)
    Serve(ServeArgs),

    /// Scrape the status page once, print it and exit
    Snapshot(SnapshotArgs),
}

#[derive(Args)]
struct ServeArgs {
    /// Web server bind address
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Web server port
    #[arg(short, long, default_value_t = DEFAULT_WEB_PORT)]
    port: u16,

    /// Modem polling interval in milliseconds
    #[arg(short, long, default_value_t = DEFAULT_INTERVAL_MS)]
    interval: u64,

    /// Do not serve the JSON status endpoint
    #[arg(long)]
    no_status_api: bool,
}

impl Default for ServeArgs {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_WEB_PORT,
            interval: DEFAULT_INTERVAL_MS,
            no_status_api: false,
        }
    }
}

#[derive(Args)]
struct SnapshotArgs {
    /// Output format: json or pretty
    #[arg(short, long, default_value = "pretty")]
    format: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(&cli)?;

    match &cli.command {
        Some(Commands::Serve(args)) => serve_command(&cli, args).await,
        Some(Commands::Snapshot(args)) => snapshot_command(&cli, args).await,
        None => serve_command(&cli, &ServeArgs::default()).await,
    }
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_log_filter(cli));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

/// Filter used when `RUST_LOG` is unset or invalid.
fn default_log_filter(cli: &Cli) -> EnvFilter {
    let level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    };
    EnvFilter::new(level.to_string().to_lowercase())
}

fn modem_config(cli: &Cli, interval: u64) -> anyhow::Result<ModemConfig> {
    let config = ModemConfig::new(&cli.modem, &cli.page)
        .with_interval_ms(interval)
        .with_timeout_ms(cli.timeout);
    config.validate()?;
    Ok(config)
}

fn build_status(config: &ModemConfig, metrics: Arc<ChannelMetrics>) -> Status {
    Status::with_page(Page::with_location(&config.host, &config.page), metrics)
}

async fn serve_command(cli: &Cli, args: &ServeArgs) -> anyhow::Result<()> {
    info!("Starting ARRIS exporter...");

    let config = modem_config(cli, args.interval)?;
    let metrics = Arc::new(ChannelMetrics::default());
    let status = Arc::new(RwLock::new(build_status(&config, metrics.clone())));

    let fetcher: Arc<dyn PageFetcher> = Arc::new(HttpFetcher::new(config.timeout())?);
    let poller = Poller::new(status.clone(), fetcher, config.interval()).spawn();
    info!(
        "Polling {}/{} every {}ms",
        config.host, config.page, config.interval_ms
    );

    let web_config = WebConfig::new(&args.host, args.port).with_status_api(!args.no_status_api);
    info!("  - Bind address: {}", web_config.bind_address());
    info!("  - Status API enabled: {}", web_config.enable_status_api);

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
        }
        info!("Shutdown requested");
        signal.cancel();
    });

    let served = start_web_server(web_config, AppState::new(status, metrics), shutdown.clone()).await;
    shutdown.cancel();

    let stats = poller.shutdown().await;
    info!(
        "Poller stopped after {} cycles ({} skipped)",
        stats.cycles, stats.failures
    );

    served.context("web server failed")?;
    Ok(())
}

async fn snapshot_command(cli: &Cli, args: &SnapshotArgs) -> anyhow::Result<()> {
    let config = modem_config(cli, DEFAULT_INTERVAL_MS)?;
    let mut status = build_status(&config, Arc::new(ChannelMetrics::default()));

    let fetcher = HttpFetcher::new(config.timeout())?;
    let body = fetcher
        .fetch(&status.url())
        .await
        .with_context(|| format!("unable to get {}", status.url()))?;
    let report = status
        .scrape_body(&body)
        .context("unable to parse status page")?;
    if !report.success() {
        error!("Some extraction steps failed: {:?}", report.failed());
    }

    match args.format.as_str() {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&status.snapshot())?);
        }
        "pretty" => print_pretty_status(&status),
        other => anyhow::bail!("Unsupported format: {}. Use 'json' or 'pretty'", other),
    }

    Ok(())
}

fn print_pretty_status(status: &Status) {
    let snapshot = status.snapshot();

    println!("{} ({})", snapshot.model, status.url());
    println!("==========================================");
    println!();

    println!("Startup:");
    println!(
        "  Downstream: {} Hz ({})",
        snapshot.acquired_downstream_channel, snapshot.downstream_channel_status
    );
    println!(
        "  Connectivity: {} ({})",
        snapshot.connectivity, snapshot.connectivity_comment
    );
    println!();

    println!("Downstream ({} channels):", snapshot.downstream.len());
    for channel in snapshot.downstream.values() {
        println!(
            "  {:>3}: {} {} {} Hz, {:.1} dBmV, SNR {:.1} dB, corrected {}, uncorrectable {}",
            channel.id,
            channel.locked,
            channel.modulation,
            channel.frequency,
            channel.power,
            channel.snr,
            channel.corrected,
            channel.uncorrectables
        );
    }
    println!();

    println!("Upstream ({} channels):", snapshot.upstream.len());
    for channel in snapshot.upstream.values() {
        println!(
            "  {:>3}: {} {} {} Hz, width {} Hz, {:.1} dBmV",
            channel.id,
            channel.locked,
            channel.channel_type,
            channel.frequency,
            channel.width,
            channel.power
        );
    }
}
