//! diskpull CLI
//!
//! Launches a real browser against the Yandex Disk photo timeline and walks
//! it date group by date group, starting a download for each group exactly
//! once. Sign-in happens manually in the opened window; the tool waits.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use tokio::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use diskpull::auth::{self, LOGIN_POLL_INTERVAL, LOGIN_WAIT_TIMEOUT};
use diskpull::{
    detect, DateRange, DiskSurface, EngineConfig, Outcome, ReportBuilder, SessionConfig, Surface,
    TraversalEngine,
};

#[derive(Parser, Debug)]
#[command(name = "diskpull")]
#[command(about = "Bulk-download date groups from the Yandex Disk photo timeline")]
struct Cli {
    /// Browser executable; auto-detected when omitted.
    #[arg(long)]
    exec: Option<PathBuf>,

    /// Browser profile directory (keeps the signed-in session between runs).
    #[arg(long)]
    profile: Option<PathBuf>,

    /// Directory the downloads are saved into.
    #[arg(long)]
    download: Option<PathBuf>,

    /// Progress is logged after every batch of this many groups.
    #[arg(long, default_value_t = 10)]
    batch: usize,

    /// Only process groups on or after this date (YYYY-MM-DD).
    #[arg(long, default_value = "")]
    from: String,

    /// Only process groups on or before this date (YYYY-MM-DD).
    #[arg(long, default_value = "")]
    to: String,

    /// Hard ceiling on the whole session, in minutes.
    #[arg(long, default_value_t = 120)]
    timeout_minutes: u64,

    /// Leave the browser open after the run and wait for Ctrl-C.
    #[arg(long)]
    keep_open: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    run(cli).await
}

async fn run(cli: Cli) -> Result<()> {
    // Reject bad bounds before any browser is launched.
    let range = DateRange::new(&cli.from, &cli.to).context("invalid date range")?;

    let exec_path = match cli.exec {
        Some(path) => path,
        None => detect::detect_browser()
            .ok_or_else(|| anyhow!("no supported browser found; pass one with --exec"))?,
    };
    let profile_dir = cli.profile.unwrap_or_else(detect::default_profile_dir);
    let download_dir = cli.download.unwrap_or_else(detect::default_download_dir);
    std::fs::create_dir_all(&download_dir)
        .with_context(|| format!("creating download directory {}", download_dir.display()))?;

    let session_timeout = Duration::from_secs(cli.timeout_minutes * 60);

    info!("=== diskpull ===");
    info!(exec = %exec_path.display(), "browser");
    info!(profile = %profile_dir.display(), "profile");
    info!(download = %download_dir.display(), "downloads");
    info!(%range, batch = cli.batch, "plan");

    let session_config = SessionConfig {
        exec_path,
        profile_dir,
        download_dir: download_dir.clone(),
        session_timeout,
        ..SessionConfig::default()
    };

    let surface = DiskSurface::open(&session_config).await?;
    let outcome = drive(&surface, &session_config, range, cli.batch).await;

    if cli.keep_open {
        info!("browser remains open; press Ctrl-C to exit");
        tokio::signal::ctrl_c().await.ok();
    }
    surface.close().await;

    match outcome? {
        Outcome::FatalAbort { reason } => bail!("traversal aborted: {reason}"),
        _ => Ok(()),
    }
}

/// Bootstrap the page, then hand over to the engine. Split out so teardown
/// in `run` happens on every path, early failures included.
async fn drive(
    surface: &DiskSurface,
    session_config: &SessionConfig,
    range: DateRange,
    batch: usize,
) -> Result<Outcome> {
    surface.navigate_to_photos().await?;

    if let Err(e) = surface
        .configure_downloads(&session_config.download_dir)
        .await
    {
        warn!("could not configure the download directory: {e}");
    }

    let signed_in = auth::check_signed_in(surface).await.unwrap_or(false);
    if !signed_in {
        warn!("not signed in; please sign in inside the browser window");
        auth::await_sign_in(surface, LOGIN_POLL_INTERVAL, LOGIN_WAIT_TIMEOUT)
            .await
            .context("sign-in did not happen")?;
        // Back to the timeline; the sign-in flow may have navigated away.
        if let Err(e) = surface.navigate_to_photos().await {
            warn!("could not re-open the timeline after sign-in: {e}");
        }
    }
    info!("signed in");

    if let Err(e) = surface.apply_unlimited_storage_filter().await {
        warn!("storage filter not applied, walking the full timeline: {e}");
    }

    let engine_config = EngineConfig {
        range,
        batch_size: batch,
        deadline: Some(Instant::now() + session_config.session_timeout),
        ..EngineConfig::default()
    };
    let report_builder = ReportBuilder::new().with_download_dir(session_config.download_dir.clone());

    let engine = TraversalEngine::new(
        Arc::new(surface.clone()) as Arc<dyn Surface>,
        engine_config,
    )
    .with_report(report_builder);

    let report = engine.run().await;
    println!("{}", report.render());
    Ok(report.outcome)
}
