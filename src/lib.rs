//! softfork-monitor
//!
//! Watches a full node over JSON-RPC and reports the heights at which a block
//! version reaches activation (lock-in) and enforcement, using a sliding window
//! of the most recent blocks.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  ActivationMonitor   Pending → Activated → Enforced      │
//! │        │ step(tip)                                       │
//! │        ▼                                                 │
//! │  WindowEvaluator     counts matches in [end - W, end)    │
//! │        │ miss                                            │
//! │        ▼                                                 │
//! │  BlockVersionCache ─▶ VersionSource (RpcClient)          │
//! │                        getblockhash + getblock           │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod evaluator;
pub mod monitor;
pub mod rpc;
pub mod source;
pub mod types;

#[cfg(test)]
mod tests;

pub use cache::BlockVersionCache;
pub use config::{ConfigError, MonitorConfig};
pub use evaluator::{MonitorError, WindowAssessment, WindowEvaluator};
pub use monitor::{ActivationMonitor, ActivationState, MonitorOutcome, MonitorParams, StepReport};
pub use rpc::{RpcClient, RpcEndpoint, RpcError};
pub use source::VersionSource;
pub use types::{BlockHeight, BlockVersion, CountMode};
