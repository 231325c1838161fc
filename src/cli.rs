// CLI - Command line flags for the monitor
// Every flag is optional so the config file keeps its values unless overridden

use clap::Parser;
use std::path::PathBuf;

use crate::config::MonitorConfig;
use crate::types::{BlockHeight, BlockVersion};

/// softfork-monitor - Watch a node until a block version is activated and enforced
#[derive(Parser, Debug)]
#[command(name = "softfork-monitor")]
#[command(author = "softfork-monitor Contributors")]
#[command(about = "Reports the heights at which a block version locks in and becomes enforced")]
#[command(long_about = r#"
Scans the chain of a full node one block at a time. For every block the
most recent window of blocks (1000 by default) is examined:

  - activation:  750 blocks carry the target version (or newer)
  - enforcement: 950 blocks carry the target version (or newer)

Watch BIP66 (version 3) from block 363000 on a local node:
  softfork-monitor --rpcport 8332 --version 3 --block 363000 --verbose
"#)]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "softfork-monitor.toml")]
    pub config: PathBuf,

    /// The RPC host to connect to
    #[arg(long = "rpchost")]
    pub rpc_host: Option<String>,

    /// The RPC port to connect to
    #[arg(long = "rpcport")]
    pub rpc_port: Option<u16>,

    /// The RPC username
    #[arg(long = "rpcuser")]
    pub rpc_user: Option<String>,

    /// The RPC password
    #[arg(long = "rpcpass", env = "SOFTFORK_RPC_PASS", hide_env_values = true)]
    pub rpc_pass: Option<String>,

    /// RPC request timeout in seconds
    #[arg(long = "rpc-timeout")]
    pub rpc_timeout: Option<u64>,

    /// The block version to check
    #[arg(long = "version", id = "target_version")]
    pub target_version: Option<BlockVersion>,

    /// Block height to start checking from
    #[arg(long = "block")]
    pub start_height: Option<BlockHeight>,

    /// Number of recent blocks examined per decision
    #[arg(long)]
    pub window: Option<u64>,

    /// Matching blocks needed for activation
    #[arg(long)]
    pub activation_threshold: Option<u64>,

    /// Matching blocks needed for enforcement
    #[arg(long)]
    pub enforcement_threshold: Option<u64>,

    /// Count only blocks with exactly the target version
    #[arg(long)]
    pub exact: bool,

    /// Fail if the version has no known soft fork rule
    #[arg(long)]
    pub strict_rule: bool,

    /// Evict cached heights once they leave the window
    #[arg(long)]
    pub prune_cache: bool,

    /// Toggle verbose per-block reporting
    #[arg(short, long)]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "SOFTFORK_LOG")]
    pub log_level: String,
}

impl Args {
    /// Apply CLI overrides on top of a loaded config
    pub fn apply(&self, config: MonitorConfig) -> MonitorConfig {
        config
            .with_rpc_host(self.rpc_host.clone())
            .with_rpc_port(self.rpc_port)
            .with_rpc_credentials(self.rpc_user.clone(), self.rpc_pass.clone())
            .with_rpc_timeout(self.rpc_timeout)
            .with_version(self.target_version)
            .with_start_height(self.start_height)
            .with_window(self.window)
            .with_thresholds(self.activation_threshold, self.enforcement_threshold)
            .with_flags(self.exact, self.strict_rule, self.prune_cache, self.verbose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CountMode;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_flags_override_config() {
        let args = Args::try_parse_from([
            "softfork-monitor",
            "--rpchost",
            "192.168.1.20",
            "--rpcport",
            "8332",
            "--rpcuser",
            "bob",
            "--version",
            "4",
            "--block",
            "387000",
            "--exact",
            "--verbose",
        ])
        .unwrap();

        let config = args.apply(MonitorConfig::default());
        assert_eq!(config.rpc_host, "192.168.1.20");
        assert_eq!(config.rpc_port, 8332);
        assert_eq!(config.rpc_user, "bob");
        assert_eq!(config.version, 4);
        assert_eq!(config.start_height, 387_000);
        assert_eq!(config.count_mode, CountMode::Exact);
        assert!(config.verbose);
    }

    #[test]
    fn test_no_flags_keeps_config() {
        let args = Args::try_parse_from(["softfork-monitor"]).unwrap();

        let mut file_config = MonitorConfig::default();
        file_config.rpc_port = 18332;
        file_config.verbose = true;

        let config = args.apply(file_config);
        assert_eq!(config.rpc_port, 18332);
        assert!(config.verbose);
        assert_eq!(config.version, 3);
        assert_eq!(args.config, PathBuf::from("softfork-monitor.toml"));
    }
}
