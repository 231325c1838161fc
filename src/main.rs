//! softfork-monitor - Entry point
//!
//! Loads the configuration, connects to the node and steps forward block by
//! block until the target version is enforced.

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use softfork_monitor::cli::Args;
use softfork_monitor::types::rule_label;
use softfork_monitor::{ActivationMonitor, MonitorConfig, RpcClient, WindowEvaluator};

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging; --verbose only raises the per-block progress line to info
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .init();

    info!("🔭 softfork-monitor v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = if args.config.exists() {
        MonitorConfig::load(&args.config)
            .with_context(|| format!("Failed to load {}", args.config.display()))?
    } else {
        warn!("Config file {} not found, using defaults", args.config.display());
        MonitorConfig::default()
    };

    // Override config with CLI args
    let config = args.apply(config);

    config.validate().map_err(|e| {
        error!("Configuration error: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    let endpoint = config.endpoint();
    info!("RPC URL: {}", endpoint.redacted_url());
    info!(
        "Checking for block version {} ({}) activation height with start height {}.",
        config.version,
        rule_label(config.version),
        config.start_height
    );
    info!("⚙️  Window:");
    info!("   Size: {} blocks", config.window);
    info!("   Activation threshold: {}", config.activation_threshold);
    info!("   Enforcement threshold: {}", config.enforcement_threshold);
    info!("   Counting mode: {}", config.count_mode);

    let client = RpcClient::new(&endpoint).context("Failed to build RPC client")?;

    let best = client
        .get_block_count()
        .context("Failed to query best block height")?;
    info!("📦 Node best block: {}", best);
    if config.start_height > best {
        warn!(
            "Start height {} is above the node's best block {}",
            config.start_height, best
        );
    }

    let evaluator = WindowEvaluator::new(client, config.count_mode);
    let mut monitor = ActivationMonitor::new(evaluator, config.monitor_params());

    match monitor.run(config.start_height) {
        Ok(outcome) => {
            info!(
                "🏁 Version {} ({}) activated at block {} and enforced at block {}",
                outcome.target,
                rule_label(outcome.target),
                outcome.activation_height,
                outcome.enforcement_height
            );
            info!("   {} block versions held in cache", monitor.evaluator().cache().len());
            Ok(())
        }
        Err(e) => {
            error!("Monitoring stopped in state {:?}: {}", monitor.state(), e);
            Err(anyhow::anyhow!("Monitoring failed: {}", e))
        }
    }
}
