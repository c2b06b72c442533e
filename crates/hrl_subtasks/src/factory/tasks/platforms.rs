//! Platforms: a ball pushed between moving platforms.
//!
//! The timed variant adds the episode time to observations and goals. It only
//! works with fixed action budgets, so HiTS is rejected.

use crate::aux_rewards::AuxReward;
use crate::error::{Error, Result};
use crate::factory::{DictTaskLayout, EnvGoalSource};
use crate::params::{SubtaskSpecParams, Topology};
use std::collections::{BTreeMap, BTreeSet};

const VELOCITY_THRESHOLD: f64 = 0.2;
const TIME_THRESHOLD: f64 = 2.0 / 500.0;

/// Keys: `position`, `velocity`, `ang_vel`, `platform0`, `platform1`
/// (and `time` when timed). Goals are position and velocity.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformsLayout {
    timed: bool,
}

impl PlatformsLayout {
    pub fn new() -> Self {
        Self { timed: false }
    }

    /// The variant with time in observations and goals.
    pub fn timed() -> Self {
        Self { timed: true }
    }

    pub fn is_timed(&self) -> bool {
        self.timed
    }
}

fn keys(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

impl DictTaskLayout for PlatformsLayout {
    fn name(&self) -> &'static str {
        if self.timed {
            "PlatformsTimeSubtaskSpecFactory"
        } else {
            "PlatformsSubtaskSpecFactory"
        }
    }

    fn partial_obs_keys(&self, _level: usize) -> BTreeSet<String> {
        let mut k = keys(&["position", "velocity", "ang_vel", "platform0", "platform1"]);
        if self.timed {
            k.insert("time".into());
        }
        k
    }

    fn goal_keys(&self, _level: usize) -> BTreeSet<String> {
        let mut k = keys(&["position", "velocity"]);
        if self.timed {
            k.insert("time".into());
        }
        k
    }

    fn thresholds(&self, params: &SubtaskSpecParams, level: usize) -> Result<BTreeMap<String, f64>> {
        let mut thresholds = BTreeMap::new();
        thresholds.insert(
            "position".to_string(),
            params.require_threshold(level)?.scalar()?,
        );
        thresholds.insert("velocity".to_string(), VELOCITY_THRESHOLD);
        if self.timed {
            thresholds.insert("time".to_string(), TIME_THRESHOLD);
        }
        Ok(thresholds)
    }

    fn env_goal(&self) -> EnvGoalSource {
        EnvGoalSource::Key("position")
    }

    fn supports(&self, topology: Topology) -> bool {
        !(self.timed && topology == Topology::HiTS)
    }

    fn extra_aux_rewards(&self, params: &SubtaskSpecParams) -> Result<Vec<AuxReward>> {
        if !params.power_aux_reward {
            return Ok(Vec::new());
        }
        let factor = params.power_aux_reward_factor.ok_or_else(|| {
            Error::Config("power_aux_reward needs power_aux_reward_factor".into())
        })?;
        Ok(vec![AuxReward::Power {
            factor,
            velocity_key: "velocity".into(),
            n_components: 1,
        }])
    }
}
