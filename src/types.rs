//! Core types shared by the evaluator, the state machine and the RPC client

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// PRIMITIVE TYPES
// =============================================================================

/// Block height
pub type BlockHeight = u64;

/// Block version field, compared as a whole integer (no BIP9 bit decoding)
pub type BlockVersion = i32;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Blocks in the window that must signal before the rule locks in
pub const ACTIVATION_PERIOD: u64 = 750;

/// Blocks in the window that must signal before the rule is enforced
pub const ENFORCEMENT_PERIOD: u64 = 950;

/// Number of most recent blocks examined for every decision
pub const TARGET_WINDOW: u64 = 1000;

// =============================================================================
// COUNTING MODE
// =============================================================================

/// How a block's version is compared against the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CountMode {
    /// `version >= target` counts as support (cumulative soft-fork semantics)
    #[default]
    AtLeast,
    /// Only `version == target` counts; later versions are ignored
    Exact,
}

impl CountMode {
    /// Whether `version` counts as a vote for `target`
    pub fn matches(self, version: BlockVersion, target: BlockVersion) -> bool {
        match self {
            CountMode::AtLeast => version >= target,
            CountMode::Exact => version == target,
        }
    }
}

impl fmt::Display for CountMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CountMode::AtLeast => write!(f, "at-least"),
            CountMode::Exact => write!(f, "exact"),
        }
    }
}

// =============================================================================
// RULE NAMES
// =============================================================================

/// Colloquial name of the soft fork introduced by a block version
pub fn rule_name(version: BlockVersion) -> Option<&'static str> {
    match version {
        2 => Some("BIP34"),
        3 => Some("BIP66"),
        4 => Some("BIP65"),
        _ => None,
    }
}

/// Rule name for display, `NA` when the version is not in the table
pub fn rule_label(version: BlockVersion) -> &'static str {
    rule_name(version).unwrap_or("NA")
}
