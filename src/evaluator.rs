//! Window Evaluator
//!
//! Counts how many of the `window` blocks in `[end - window, end)` support a
//! target version and compares the count against a threshold.
//!
//! Every call examines exactly `window` heights in ascending order. There is
//! no early exit once the threshold is met, so the returned count and the
//! last old-version height always describe the whole window.

use tracing::{debug, trace};

use crate::cache::BlockVersionCache;
use crate::rpc::RpcError;
use crate::source::VersionSource;
use crate::types::{BlockHeight, BlockVersion, CountMode};

/// Errors raised while evaluating a window
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("Failed to obtain version of block {height}: {source}")]
    Source {
        height: BlockHeight,
        #[source]
        source: RpcError,
    },

    #[error("Window of {window} blocks ending at {end} reaches below genesis")]
    WindowUnderflow { end: BlockHeight, window: u64 },
}

/// Outcome of one window evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowAssessment {
    /// Exclusive upper bound of the window
    pub end: BlockHeight,
    /// Blocks in the window that count as support
    pub matches: u64,
    pub threshold: u64,
    pub window: u64,
    pub success: bool,
    /// Highest height in the window whose version is exactly `target - 1`
    pub last_old_height: Option<BlockHeight>,
}

impl WindowAssessment {
    /// Share of the window supporting the target, in percent
    pub fn percentage(&self) -> f64 {
        if self.window == 0 {
            return 0.0;
        }
        self.matches as f64 / self.window as f64 * 100.0
    }

    /// First height of the window
    pub fn start(&self) -> BlockHeight {
        self.end - self.window
    }
}

/// Slides a window over recent heights, backed by a version cache
pub struct WindowEvaluator<S> {
    source: S,
    cache: BlockVersionCache,
    mode: CountMode,
}

impl<S: VersionSource> WindowEvaluator<S> {
    pub fn new(source: S, mode: CountMode) -> Self {
        Self {
            source,
            cache: BlockVersionCache::new(),
            mode,
        }
    }

    pub fn mode(&self) -> CountMode {
        self.mode
    }

    pub fn cache(&self) -> &BlockVersionCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut BlockVersionCache {
        &mut self.cache
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Version at `height`, from the cache or fetched and cached on a miss
    pub fn version_at(&mut self, height: BlockHeight) -> Result<BlockVersion, MonitorError> {
        if let Some(version) = self.cache.get(height) {
            return Ok(version);
        }

        trace!("Cache miss for block {}", height);
        let version = self
            .source
            .block_version(height)
            .map_err(|source| MonitorError::Source { height, source })?;
        self.cache.put(height, version);
        Ok(version)
    }

    /// Assess the window `[end - window, end)` against `threshold`
    pub fn evaluate(
        &mut self,
        target: BlockVersion,
        end: BlockHeight,
        window: u64,
        threshold: u64,
    ) -> Result<WindowAssessment, MonitorError> {
        let start = end
            .checked_sub(window)
            .ok_or(MonitorError::WindowUnderflow { end, window })?;
        let old_version = target.checked_sub(1);

        let mut matches = 0u64;
        let mut last_old_height = None;

        for height in start..end {
            let version = self.version_at(height)?;

            if self.mode.matches(version, target) {
                matches += 1;
            }
            if Some(version) == old_version {
                // Ascending scan, so the latest hit is the highest
                last_old_height = Some(height);
            }
        }

        let assessment = WindowAssessment {
            end,
            matches,
            threshold,
            window,
            success: matches >= threshold,
            last_old_height,
        };

        debug!(
            "Window [{}, {}): {}/{} blocks match version {} ({}), threshold {} -> {}",
            start,
            end,
            matches,
            window,
            target,
            self.mode,
            threshold,
            if assessment.success { "met" } else { "not met" }
        );

        Ok(assessment)
    }
}
