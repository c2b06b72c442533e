//! Tennis2D: a three-joint arm hitting a ball towards a target.

use crate::error::{Error, Result};
use crate::factory::{DictTaskLayout, EnvGoalSource};
use crate::params::SubtaskSpecParams;
use std::collections::{BTreeMap, BTreeSet};

const N_JOINTS: usize = 3;

/// Threshold entry applied to every joint angle.
pub const ANGLE_THRESHOLD_KEY: &str = "angle_threshold";
/// Threshold entry applied to every joint angular velocity.
pub const ANGULAR_VEL_THRESHOLD_KEY: &str = "angular_vel_threshold";

/// Keys: `joint_{i}_angle` and `joint_{i}_angular_vel` for the three joints,
/// plus the ball's keys, which stay hidden from the lower levels.
/// The environment goal is the environment's own achieved goal.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tennis2DLayout;

fn angle_key(joint: usize) -> String {
    format!("joint_{}_angle", joint)
}

fn angular_vel_key(joint: usize) -> String {
    format!("joint_{}_angular_vel", joint)
}

fn arm_keys() -> BTreeSet<String> {
    (0..N_JOINTS)
        .flat_map(|i| [angle_key(i), angular_vel_key(i)])
        .collect()
}

impl DictTaskLayout for Tennis2DLayout {
    fn name(&self) -> &'static str {
        "Tennis2DSubtaskSpecFactory"
    }

    fn partial_obs_keys(&self, _level: usize) -> BTreeSet<String> {
        arm_keys()
    }

    fn goal_keys(&self, _level: usize) -> BTreeSet<String> {
        arm_keys()
    }

    fn thresholds(&self, params: &SubtaskSpecParams, level: usize) -> Result<BTreeMap<String, f64>> {
        let given = params.require_threshold(level)?.per_key()?;
        let lookup = |name: &str| -> Result<f64> {
            given.get(name).copied().ok_or_else(|| {
                Error::Config(format!("level {} has no '{}' threshold", level, name))
            })
        };
        let angle = lookup(ANGLE_THRESHOLD_KEY)?;
        let angular_vel = lookup(ANGULAR_VEL_THRESHOLD_KEY)?;

        let mut thresholds = BTreeMap::new();
        for i in 0..N_JOINTS {
            thresholds.insert(angle_key(i), angle);
            thresholds.insert(angular_vel_key(i), angular_vel);
        }
        Ok(thresholds)
    }

    fn env_goal(&self) -> EnvGoalSource {
        EnvGoalSource::AchievedGoal
    }
}
