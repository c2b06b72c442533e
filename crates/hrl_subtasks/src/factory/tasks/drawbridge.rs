//! Drawbridge: a ship must pass a bridge that opens periodically.

use crate::error::Result;
use crate::factory::{DictTaskLayout, EnvGoalSource};
use crate::params::SubtaskSpecParams;
use std::collections::{BTreeMap, BTreeSet};

/// Keys: `ship_pos`, `ship_vel`, `sails_unfurled`, `bridge_phase`.
/// Thresholds are given per goal key in the level parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct DrawbridgeLayout;

impl DictTaskLayout for DrawbridgeLayout {
    fn name(&self) -> &'static str {
        "DrawbridgeSubtaskSpecFactory"
    }

    fn partial_obs_keys(&self, _level: usize) -> BTreeSet<String> {
        ["ship_pos", "ship_vel", "sails_unfurled", "bridge_phase"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn goal_keys(&self, _level: usize) -> BTreeSet<String> {
        ["ship_pos", "ship_vel", "sails_unfurled"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn thresholds(&self, params: &SubtaskSpecParams, level: usize) -> Result<BTreeMap<String, f64>> {
        Ok(params.require_threshold(level)?.per_key()?.clone())
    }

    fn env_goal(&self) -> EnvGoalSource {
        EnvGoalSource::Key("ship_pos")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ThresholdParam;

    #[test]
    fn test_bridge_phase_is_not_a_goal() {
        assert!(DrawbridgeLayout.partial_obs_keys(0).contains("bridge_phase"));
        assert!(!DrawbridgeLayout.goal_keys(0).contains("bridge_phase"));
    }

    #[test]
    fn test_thresholds_must_be_per_key() {
        let scalar = SubtaskSpecParams::default().with_threshold(ThresholdParam::Scalar(0.1));
        assert!(DrawbridgeLayout.thresholds(&scalar, 0).is_err());
    }
}
