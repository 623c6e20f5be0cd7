//! Headless stack viewer driver.
//!
//! Loads a stack's assets, runs the viewer loop without a GPU surface
//! and logs every state transition. Useful for smoke-testing a stack's
//! assets and configuration before putting them behind a real renderer.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use viewer::{HeadlessRenderer, StackViewer, ViewerConfig, ViewerState};

#[derive(Parser)]
#[command(name = "stackview")]
#[command(about = "Headless driver for the 3D stack viewer", long_about = None)]
struct Cli {
    /// Stack identifier; assets resolve to `{root}/{id}.exr` and `{root}/{id}.glb`
    #[arg(default_value = "stack")]
    id: String,

    /// Directory or HTTP(S) base URL to fetch assets from
    #[arg(long, default_value = ".")]
    asset_root: String,

    /// Load configuration from a TOML file instead of the flags above
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seconds to keep orbiting after the load settles
    #[arg(long, default_value_t = 3.0)]
    duration: f32,

    /// Attach grid/axes debug helpers to the scene
    #[arg(long)]
    dev: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => ViewerConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ViewerConfig::new(&cli.id, &cli.asset_root),
    };
    if cli.dev {
        config.dev_mode = true;
    }

    let id = config.id.clone();
    let mut stack = StackViewer::new(config, Box::new(HeadlessRenderer::new()));
    stack.register_state_change_handler(|state| info!(state = %state, "state change"));
    stack.resize(1280, 720);
    stack.initialize(Instant::now())?;

    // Settle the load cycle.
    loop {
        stack.frame(Instant::now());
        match stack.state() {
            ViewerState::Loading => {
                tokio::time::sleep(Duration::from_millis(16)).await;
            }
            ViewerState::Failed(failure) => {
                bail!("stack '{id}' failed to load: {failure}");
            }
            _ => break,
        }
    }
    info!(
        id = %id,
        progress = stack.load_progress(),
        "stack loaded, orbiting"
    );

    // Let the camera orbit for a while, then exit.
    let until = Instant::now() + Duration::from_secs_f32(cli.duration.max(0.0));
    while Instant::now() < until {
        stack.frame(Instant::now());
        tokio::time::sleep(Duration::from_millis(16)).await;
    }
    info!(final_state = %stack.state(), "done");
    Ok(())
}
