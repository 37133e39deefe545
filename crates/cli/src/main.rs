use anyhow::{bail, Context, Result};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use autostrm_core::{load_config, validate_config, ConfigPaths, Runner};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

const LOG_FORMAT_ENV: &str = "AUTOSTRM_LOG_FORMAT";

#[tokio::main]
async fn main() {
    init_logging();

    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);

    let json = std::env::var(LOG_FORMAT_ENV).is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn run() -> Result<()> {
    info!("autostrm {} starting", VERSION);

    let paths = ConfigPaths::from_env();
    info!("Loading configuration from {:?}", paths.config);
    let config = load_config(&paths)
        .with_context(|| format!("Failed to load config from {:?}", paths.config))?;

    validate_config(&config).context("Configuration validation failed")?;

    if !paths.base_output_dir.is_dir() {
        bail!(
            "Base output directory {:?} does not exist",
            paths.base_output_dir
        );
    }

    let summary = Runner::new(&config, &paths.base_output_dir).run().await;
    for task in &summary.tasks {
        info!(
            task = %task.task,
            listed = task.listed,
            eligible = task.eligible,
            processed = task.processed,
            skipped = task.skipped,
            failed = task.failed,
            "Task summary"
        );
    }

    Ok(())
}
