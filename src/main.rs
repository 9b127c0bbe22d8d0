//! Binary entrypoint for the slideshow.
//!
//! Delegates all logic to the library crate; no local modules here.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser};
use rust_slideshow::config::Configuration;
use rust_slideshow::render::viewer;
use rust_slideshow::tasks::files::LocalCatalog;
use tokio_util::sync::CancellationToken;
use tracing::{Level, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Debug, Parser)]
#[command(name = "slideshow", version, about = "Fullscreen photo slideshow with blurred backdrops")]
struct Cli {
    /// Path to YAML config file
    #[arg(value_name = "CONFIG", default_value = "config.yaml")]
    config: PathBuf,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,

    /// Exit after this many seconds
    #[arg(long = "run-time-seconds", value_name = "SECONDS")]
    run_time_seconds: Option<u64>,

    /// Scan the library, print N random picks and exit without opening a window
    #[arg(long = "catalog-dry-run", value_name = "PICKS")]
    catalog_dry_run: Option<usize>,

    /// Deterministic RNG seed (overrides the config file)
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new(format!("rust_slideshow={level},slideshow={level}"))
            .add_directive("wgpu=warn".parse()?)
            .add_directive("winit=warn".parse()?)
            .add_directive("naga=warn".parse()?),
    };
    fmt().with_env_filter(filter).with_target(true).init();
    Ok(())
}

fn run_catalog_dry_run(catalog: &mut LocalCatalog, picks: usize) {
    println!(
        "# catalog dry run\n# root: {}\n# files: {}\n",
        catalog.root().display(),
        catalog.len()
    );
    for i in 0..picks {
        match catalog.next_path() {
            Some(path) => println!("{:>4} {}", i + 1, path.display()),
            None => break,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let mut cfg = Configuration::from_yaml_file(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?
        .validated()
        .context("invalid configuration values")?;
    if cli.seed.is_some() {
        cfg.seed = cli.seed;
    }
    info!("loaded configuration from {}:\n{:#?}", cli.config.display(), cfg);

    let mut catalog = LocalCatalog::from_config(&cfg);
    if !catalog.rescan() {
        bail!(
            "photo library {} does not exist",
            cfg.photo_library_path.display()
        );
    }

    if let Some(picks) = cli.catalog_dry_run {
        run_catalog_dry_run(&mut catalog, picks);
        return Ok(());
    }

    if catalog.is_empty() {
        bail!(
            "no images matching {:?} under {}",
            cfg.extensions,
            cfg.photo_library_path.display()
        );
    }
    info!(count = catalog.len(), "scanned images");

    let cancel = CancellationToken::new();

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!("ctrl-c handler failed: {err}");
                return;
            }
            info!("ctrl-c received; initiating shutdown");
            cancel.cancel();
        });
    }

    if let Some(secs) = cli.run_time_seconds {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(Duration::from_secs(secs)) => {
                    info!(secs, "run time elapsed; initiating shutdown");
                    cancel.cancel();
                }
            }
        });
    }

    // The window must live on the main thread; this blocks until it closes.
    let result = viewer::run_windowed(cfg, catalog, cancel.clone()).context("viewer failed");
    cancel.cancel();
    result
}
