//! Activation State Machine
//!
//! Drives the window evaluator one block at a time:
//!
//! ```text
//! Pending ──(activation threshold met)──▶ Activated ──(enforcement threshold met)──▶ Enforced
//! ```
//!
//! `step(tip)` assesses the `window` blocks ending at `tip` inclusive. A rule
//! that is satisfied by that window applies from block `tip + 1`, which is the
//! height reported for the transition. The machine never moves backwards and
//! `Enforced` is terminal.

use tracing::{debug, info};

use crate::evaluator::{MonitorError, WindowAssessment, WindowEvaluator};
use crate::source::VersionSource;
use crate::types::{rule_label, BlockHeight, BlockVersion};

/// Where the monitored version stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationState {
    Pending,
    /// Lock-in threshold met; the rule applies from `height`
    Activated { height: BlockHeight },
    /// Enforcement threshold met; terminal
    Enforced {
        activated_at: BlockHeight,
        height: BlockHeight,
        /// Last block with version `target - 1` before enforcement
        last_old_height: Option<BlockHeight>,
    },
}

impl ActivationState {
    pub fn is_activated(&self) -> bool {
        !matches!(self, ActivationState::Pending)
    }

    pub fn is_enforced(&self) -> bool {
        matches!(self, ActivationState::Enforced { .. })
    }
}

/// Thresholds and switches for one monitoring run
#[derive(Debug, Clone)]
pub struct MonitorParams {
    pub target: BlockVersion,
    pub window: u64,
    pub activation_threshold: u64,
    pub enforcement_threshold: u64,
    /// Evict cached heights once they leave the window
    pub prune_cache: bool,
    /// Log per-height progress at info level instead of debug
    pub verbose: bool,
}

/// Result of a single `step`
#[derive(Debug, Clone)]
pub struct StepReport {
    pub tip: BlockHeight,
    pub state: ActivationState,
    /// `None` once the machine is already enforced
    pub assessment: Option<WindowAssessment>,
    /// Version of the tip block itself
    pub tip_version: Option<BlockVersion>,
    /// Whether this step changed the state
    pub transition: bool,
}

impl StepReport {
    pub fn matches(&self) -> u64 {
        self.assessment.as_ref().map(|a| a.matches).unwrap_or(0)
    }

    pub fn percentage(&self) -> f64 {
        self.assessment.as_ref().map(|a| a.percentage()).unwrap_or(0.0)
    }

    pub fn last_old_height(&self) -> Option<BlockHeight> {
        self.assessment.as_ref().and_then(|a| a.last_old_height)
    }
}

/// Final answer of a completed run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorOutcome {
    pub target: BlockVersion,
    pub activation_height: BlockHeight,
    pub enforcement_height: BlockHeight,
    pub last_old_height: Option<BlockHeight>,
}

/// Activation/enforcement tracker for one target version
pub struct ActivationMonitor<S> {
    evaluator: WindowEvaluator<S>,
    params: MonitorParams,
    state: ActivationState,
}

impl<S: VersionSource> ActivationMonitor<S> {
    pub fn new(evaluator: WindowEvaluator<S>, params: MonitorParams) -> Self {
        Self {
            evaluator,
            params,
            state: ActivationState::Pending,
        }
    }

    pub fn state(&self) -> ActivationState {
        self.state
    }

    pub fn params(&self) -> &MonitorParams {
        &self.params
    }

    pub fn evaluator(&self) -> &WindowEvaluator<S> {
        &self.evaluator
    }

    /// Lock-in check for the window ending at `tip`
    pub fn assess_activation(&mut self, tip: BlockHeight) -> Result<WindowAssessment, MonitorError> {
        self.evaluator.evaluate(
            self.params.target,
            tip + 1,
            self.params.window,
            self.params.activation_threshold,
        )
    }

    /// Enforcement check for the window ending at `tip`
    pub fn assess_enforcement(&mut self, tip: BlockHeight) -> Result<WindowAssessment, MonitorError> {
        self.evaluator.evaluate(
            self.params.target,
            tip + 1,
            self.params.window,
            self.params.enforcement_threshold,
        )
    }

    /// Advance the machine by assessing the window ending at `tip`
    pub fn step(&mut self, tip: BlockHeight) -> Result<StepReport, MonitorError> {
        let target = self.params.target;
        let previous = self.state;

        let assessment = match previous {
            ActivationState::Enforced { .. } => {
                return Ok(StepReport {
                    tip,
                    state: previous,
                    assessment: None,
                    tip_version: self.evaluator.cache().get(tip),
                    transition: false,
                });
            }
            ActivationState::Pending => {
                let assessment = self.assess_activation(tip)?;
                if assessment.success {
                    info!(
                        "🔒 Block {} reached version {} ({}) activation.",
                        tip + 1,
                        target,
                        rule_label(target)
                    );
                    self.state = ActivationState::Activated { height: tip + 1 };
                }
                assessment
            }
            ActivationState::Activated { height: activated_at } => {
                let assessment = self.assess_enforcement(tip)?;
                if assessment.success {
                    info!(
                        "✅ Block {} reached version {} ({}) enforcement.",
                        tip + 1,
                        target,
                        rule_label(target)
                    );
                    match assessment.last_old_height {
                        Some(last) => info!("Last version {} block: {}.", target.saturating_sub(1), last),
                        None => info!("No version {} block left in the window.", target.saturating_sub(1)),
                    }
                    self.state = ActivationState::Enforced {
                        activated_at,
                        height: tip + 1,
                        last_old_height: assessment.last_old_height,
                    };
                }
                assessment
            }
        };

        let tip_version = self.evaluator.cache().get(tip);
        self.log_progress(tip, tip_version, &assessment);

        if self.params.prune_cache {
            self.evaluator.cache_mut().prune_below(assessment.start());
        }

        Ok(StepReport {
            tip,
            state: self.state,
            assessment: Some(assessment),
            tip_version,
            transition: self.state != previous,
        })
    }

    /// Step forward from `start` until the version is enforced
    ///
    /// The only other way out is an error, typically the node refusing a
    /// height above its best block.
    pub fn run(&mut self, start: BlockHeight) -> Result<MonitorOutcome, MonitorError> {
        let mut tip = start;

        loop {
            let report = self.step(tip)?;

            if let ActivationState::Enforced {
                activated_at,
                height,
                last_old_height,
            } = report.state
            {
                return Ok(MonitorOutcome {
                    target: self.params.target,
                    activation_height: activated_at,
                    enforcement_height: height,
                    last_old_height,
                });
            }

            tip += 1;
        }
    }

    fn log_progress(
        &self,
        tip: BlockHeight,
        tip_version: Option<BlockVersion>,
        assessment: &WindowAssessment,
    ) {
        let version = tip_version.unwrap_or_default();
        if self.params.verbose {
            info!(
                "Block height: {} Version: {} Percentage: {:.2}%",
                tip,
                version,
                assessment.percentage()
            );
        } else {
            debug!(
                "Block height: {} Version: {} Percentage: {:.2}%",
                tip,
                version,
                assessment.percentage()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::RpcError;
    use crate::types::CountMode;

    /// Version 3 from `switch`, version 2 below
    struct Switch(BlockHeight);

    impl VersionSource for Switch {
        fn block_version(&self, height: BlockHeight) -> Result<BlockVersion, RpcError> {
            Ok(if height >= self.0 { 3 } else { 2 })
        }
    }

    fn small_params() -> MonitorParams {
        MonitorParams {
            target: 3,
            window: 10,
            activation_threshold: 7,
            enforcement_threshold: 9,
            prune_cache: false,
            verbose: false,
        }
    }

    fn monitor(switch: BlockHeight, params: MonitorParams) -> ActivationMonitor<Switch> {
        ActivationMonitor::new(WindowEvaluator::new(Switch(switch), CountMode::AtLeast), params)
    }

    #[test]
    fn test_starts_pending() {
        let m = monitor(100, small_params());
        assert_eq!(m.state(), ActivationState::Pending);
        assert!(!m.state().is_activated());
        assert!(!m.state().is_enforced());
    }

    #[test]
    fn test_activation_then_enforcement() {
        let mut m = monitor(100, small_params());

        // Window ending at tip 105 holds 100..=105: 6 matches
        let report = m.step(105).unwrap();
        assert_eq!(report.state, ActivationState::Pending);
        assert_eq!(report.matches(), 6);
        assert!(!report.transition);

        // Tip 106: 7 matches, rule applies from 107
        let report = m.step(106).unwrap();
        assert!(report.transition);
        assert_eq!(report.state, ActivationState::Activated { height: 107 });
        assert_eq!(report.tip_version, Some(3));

        let report = m.step(107).unwrap();
        assert_eq!(report.state, ActivationState::Activated { height: 107 });
        assert_eq!(report.matches(), 8);

        let report = m.step(108).unwrap();
        assert!(report.transition);
        assert_eq!(
            report.state,
            ActivationState::Enforced {
                activated_at: 107,
                height: 109,
                last_old_height: Some(99),
            }
        );
    }

    #[test]
    fn test_enforced_is_terminal() {
        let mut m = monitor(100, small_params());
        let outcome = m.run(100).unwrap();
        assert_eq!(outcome.enforcement_height, 109);

        let report = m.step(500).unwrap();
        assert!(report.state.is_enforced());
        assert!(!report.transition);
        assert!(report.assessment.is_none());
    }

    #[test]
    fn test_run_reports_outcome() {
        let mut m = monitor(100, small_params());
        let outcome = m.run(95).unwrap();

        assert_eq!(
            outcome,
            MonitorOutcome {
                target: 3,
                activation_height: 107,
                enforcement_height: 109,
                last_old_height: Some(99),
            }
        );
    }

    #[test]
    fn test_enforcement_strictly_after_activation_even_when_window_is_full() {
        // Every block already signals; activation and enforcement still take one step each
        let mut m = monitor(0, small_params());
        let outcome = m.run(50).unwrap();

        assert_eq!(outcome.activation_height, 51);
        assert_eq!(outcome.enforcement_height, 52);
        assert_eq!(outcome.last_old_height, None);
    }

    #[test]
    fn test_prune_keeps_cache_bounded() {
        let mut params = small_params();
        params.prune_cache = true;
        let mut m = monitor(1000, params);

        for tip in 20..200 {
            m.step(tip).unwrap();
        }
        assert!(m.evaluator().cache().len() <= 10);
    }

    #[test]
    fn test_underflow_surfaces_from_step() {
        let mut m = monitor(100, small_params());
        let err = m.step(3).unwrap_err();
        assert!(matches!(err, MonitorError::WindowUnderflow { end: 4, window: 10 }));
        assert_eq!(m.state(), ActivationState::Pending);
    }
}
