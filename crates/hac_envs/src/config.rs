//! Configuration of the simulated environments.
//!
//! An [`EnvironmentConfig`] carries everything needed to build an
//! [`Environment`](crate::Environment) around a model: goal and initial-state
//! ranges, achievement thresholds, the episode budget and the frame skip.
//! Presets reproduce the four bundled tasks.

use crate::error::{Error, Result};
use crate::sampling::{RejectionSampler, DEFAULT_MAX_ATTEMPTS};
use crate::space::BoxSpace;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Initial joint configuration of the quadruped: torso at height 0.55 with an
/// identity orientation, legs spread.
const ANT_INITIAL_QPOS: [f64; 15] = [
    0.0, 0.0, 0.55, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, -1.0, 0.0, -1.0, 0.0, 1.0,
];
const ANT_NV: usize = 14;

/// Rest configuration of the first three UR5 joints.
const UR5_INITIAL_QPOS: [f64; 3] = [5.96625837e-03, 3.22757851e-03, -1.27944547e-01];

fn default_max_sampling_attempts() -> Option<usize> {
    Some(DEFAULT_MAX_ATTEMPTS)
}

/// Defines a simulated goal-conditioned task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Model file loaded by the stepping oracle (must end in `.xml`).
    pub model_name: String,
    /// End goals drawn during training. Falls back to the test space when absent.
    #[serde(default)]
    pub goal_space_train: Option<BoxSpace>,
    /// End goals drawn during testing.
    pub goal_space_test: Option<BoxSpace>,
    /// Per-dimension tolerance for reaching the end goal.
    pub end_goal_thresholds: Vec<f64>,
    /// Per-coordinate range of the initial positions followed by velocities.
    pub initial_state_space: BoxSpace,
    /// Range of the subgoals proposed to the lowest level.
    pub subgoal_bounds: BoxSpace,
    /// Per-dimension tolerance for reaching a subgoal.
    pub subgoal_thresholds: Vec<f64>,
    /// Number of low-level actions per episode.
    pub max_actions: usize,
    /// Oracle steps per low-level action.
    pub num_frames_skip: usize,
    /// Render every frame.
    #[serde(default)]
    pub show: bool,
    /// Rejection-sampling cap for goal and initial-state placement; `None` retries forever.
    #[serde(default = "default_max_sampling_attempts")]
    pub max_sampling_attempts: Option<usize>,
    /// Seed of the environment's random number generator.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl EnvironmentConfig {
    /// Inverted pendulum swing-up.
    pub fn pendulum() -> Self {
        let goal = preset_box(&[[-16f64.to_radians(), 16f64.to_radians()], [-0.6, 0.6]]);
        Self {
            model_name: "pendulum.xml".into(),
            goal_space_train: Some(goal.clone()),
            goal_space_test: Some(goal),
            end_goal_thresholds: vec![9.5f64.to_radians(), 0.6],
            initial_state_space: preset_box(&[[PI / 4.0, 7.0 * PI / 4.0], [-0.05, 0.05]]),
            subgoal_bounds: preset_box(&[[-PI, PI], [-15.0, 15.0]]),
            subgoal_thresholds: vec![9.5f64.to_radians(), 0.6],
            max_actions: 1000,
            num_frames_skip: 10,
            show: false,
            max_sampling_attempts: default_max_sampling_attempts(),
            seed: None,
        }
    }

    /// UR5 arm reaching joint-angle goals.
    pub fn ur5_reacher() -> Self {
        let goal = preset_box(&[[-PI, PI], [-PI / 4.0, 0.0], [-PI / 4.0, PI / 4.0]]);
        let angle_threshold = 10f64.to_radians();
        let mut initial: Vec<[f64; 2]> = UR5_INITIAL_QPOS.iter().map(|q| [*q, *q]).collect();
        initial[0] = [-PI / 8.0, PI / 8.0];
        initial.extend([[0.0, 0.0]; 3]);
        Self {
            model_name: "ur5.xml".into(),
            goal_space_train: Some(goal.clone()),
            goal_space_test: Some(goal),
            end_goal_thresholds: vec![angle_threshold; 3],
            initial_state_space: preset_box(&initial),
            subgoal_bounds: preset_box(&[
                [-2.0 * PI, 2.0 * PI],
                [-2.0 * PI, 2.0 * PI],
                [-2.0 * PI, 2.0 * PI],
                [-4.0, 4.0],
                [-4.0, 4.0],
                [-4.0, 4.0],
            ]),
            subgoal_thresholds: vec![
                angle_threshold,
                angle_threshold,
                angle_threshold,
                2.0,
                2.0,
                2.0,
            ],
            max_actions: 600,
            num_frames_skip: 15,
            show: false,
            max_sampling_attempts: default_max_sampling_attempts(),
            seed: None,
        }
    }

    /// Quadruped reaching a point on an open plane.
    pub fn ant_reacher() -> Self {
        Self {
            model_name: "ant_reacher.xml".into(),
            max_actions: 500,
            ..Self::ant(9.5, 19.0)
        }
    }

    /// Quadruped navigating between four rooms.
    pub fn ant_four_rooms() -> Self {
        Self {
            model_name: "ant_four_rooms.xml".into(),
            max_actions: 700,
            ..Self::ant(6.0, 11.0)
        }
    }

    fn ant(max_range: f64, subgoal_range: f64) -> Self {
        let goal = preset_box(&[[-max_range, max_range], [-max_range, max_range], [0.45, 0.55]]);
        let mut initial: Vec<[f64; 2]> = ANT_INITIAL_QPOS.iter().map(|q| [*q, *q]).collect();
        initial[0] = [-max_range, max_range];
        initial[1] = [-max_range, max_range];
        initial.extend(std::iter::repeat([0.0, 0.0]).take(ANT_NV));
        Self {
            model_name: "ant.xml".into(),
            goal_space_train: Some(goal.clone()),
            goal_space_test: Some(goal),
            end_goal_thresholds: vec![0.5, 0.5, 0.2],
            initial_state_space: preset_box(&initial),
            subgoal_bounds: preset_box(&[
                [-subgoal_range, subgoal_range],
                [-subgoal_range, subgoal_range],
                [0.0, 1.0],
                [-3.0, 3.0],
                [-3.0, 3.0],
            ]),
            subgoal_thresholds: vec![0.5, 0.5, 0.2, 0.8, 0.8],
            max_actions: 700,
            num_frames_skip: 15,
            show: false,
            max_sampling_attempts: default_max_sampling_attempts(),
            seed: None,
        }
    }

    /// Enables or disables per-frame rendering.
    pub fn with_show(mut self, show: bool) -> Self {
        self.show = show;
        self
    }

    /// Fixes the seed of the environment's random number generator.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the rejection-sampling cap; `None` retries forever.
    pub fn with_max_sampling_attempts(mut self, attempts: Option<usize>) -> Self {
        self.max_sampling_attempts = attempts;
        self
    }

    /// Sets the episode budget.
    pub fn with_max_actions(mut self, max_actions: usize) -> Self {
        self.max_actions = max_actions;
        self
    }

    /// The rejection sampler configured by `max_sampling_attempts`.
    pub fn sampler(&self) -> RejectionSampler {
        RejectionSampler::new(self.max_sampling_attempts)
    }

    /// The test goal space; required for every task.
    pub fn test_goal_space(&self) -> Result<&BoxSpace> {
        self.goal_space_test.as_ref().ok_or_else(|| {
            Error::Config("a goal space for testing (goal_space_test) is required".into())
        })
    }

    /// The goal space used for training, falling back to the test goal space.
    pub fn train_goal_space(&self) -> Result<&BoxSpace> {
        match &self.goal_space_train {
            Some(space) => Ok(space),
            None => self.test_goal_space(),
        }
    }

    /// Checks the configuration for internal consistency.
    ///
    /// Bounds themselves are validated when each [`BoxSpace`] is built.
    pub fn validate(&self) -> Result<()> {
        if !self.model_name.ends_with(".xml") {
            return Err(Error::Config(format!(
                "model '{}' must be an \".xml\" file",
                self.model_name
            )));
        }
        let test = self.test_goal_space()?;
        if let Some(train) = &self.goal_space_train {
            if train.dim() != test.dim() {
                return Err(Error::dimension("training goal space", test.dim(), train.dim()));
            }
        }
        if self.end_goal_thresholds.len() != test.dim() {
            return Err(Error::dimension(
                "end goal thresholds",
                test.dim(),
                self.end_goal_thresholds.len(),
            ));
        }
        if self.subgoal_thresholds.len() != self.subgoal_bounds.dim() {
            return Err(Error::dimension(
                "subgoal thresholds",
                self.subgoal_bounds.dim(),
                self.subgoal_thresholds.len(),
            ));
        }
        if self
            .end_goal_thresholds
            .iter()
            .chain(self.subgoal_thresholds.iter())
            .any(|t| !(*t >= 0.0))
        {
            return Err(Error::Config("thresholds must be non-negative".into()));
        }
        if self.max_actions == 0 {
            return Err(Error::Config("max_actions must be a positive integer".into()));
        }
        if self.num_frames_skip == 0 {
            return Err(Error::Config(
                "num_frames_skip must be a positive integer".into(),
            ));
        }
        if !self.initial_state_space.is_bounded() {
            return Err(Error::Config("the initial state space must be bounded".into()));
        }
        Ok(())
    }
}

/// Builds a preset box from literal ranges that are known to be ordered.
fn preset_box(ranges: &[[f64; 2]]) -> BoxSpace {
    BoxSpace::from_ranges(ranges).unwrap_or_else(|_| BoxSpace::unbounded(ranges.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Preset Tests ====================

    #[test]
    fn test_presets_are_valid() {
        for config in [
            EnvironmentConfig::pendulum(),
            EnvironmentConfig::ur5_reacher(),
            EnvironmentConfig::ant_reacher(),
            EnvironmentConfig::ant_four_rooms(),
        ] {
            config.validate().unwrap();
            assert!(config.goal_space_test.as_ref().unwrap().is_bounded());
        }
    }

    #[test]
    fn test_ant_presets() {
        let four_rooms = EnvironmentConfig::ant_four_rooms();
        assert_eq!(four_rooms.model_name, "ant_four_rooms.xml");
        assert_eq!(four_rooms.max_actions, 700);
        assert_eq!(four_rooms.initial_state_space.dim(), 29);
        assert_eq!(four_rooms.subgoal_bounds.high()[0], 11.0);

        let reacher = EnvironmentConfig::ant_reacher();
        assert_eq!(reacher.model_name, "ant_reacher.xml");
        assert_eq!(reacher.max_actions, 500);
        assert_eq!(reacher.goal_space_test.unwrap().high()[0], 9.5);
    }

    #[test]
    fn test_builders() {
        let config = EnvironmentConfig::pendulum()
            .with_seed(3)
            .with_show(true)
            .with_max_sampling_attempts(None)
            .with_max_actions(50);
        assert_eq!(config.seed, Some(3));
        assert!(config.show);
        assert_eq!(config.sampler().max_attempts(), None);
        assert_eq!(config.max_actions, 50);
    }

    // ==================== Validation Tests ====================

    #[test]
    fn test_rejects_non_xml_model() {
        let config = EnvironmentConfig {
            model_name: "pendulum.urdf".into(),
            ..EnvironmentConfig::pendulum()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_requires_test_goal_space() {
        let config = EnvironmentConfig {
            goal_space_test: None,
            ..EnvironmentConfig::pendulum()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_train_goal_space_falls_back_to_test() {
        let config = EnvironmentConfig {
            goal_space_train: None,
            ..EnvironmentConfig::ur5_reacher()
        };
        config.validate().unwrap();
        assert_eq!(config.train_goal_space().unwrap().dim(), 3);
    }

    #[test]
    fn test_rejects_threshold_mismatch() {
        let config = EnvironmentConfig {
            subgoal_thresholds: vec![0.1],
            ..EnvironmentConfig::pendulum()
        };
        assert!(matches!(
            config.validate(),
            Err(Error::DimensionMismatch { .. })
        ));

        let config = EnvironmentConfig {
            end_goal_thresholds: vec![0.1, 0.1, 0.1],
            ..EnvironmentConfig::pendulum()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_budgets() {
        let config = EnvironmentConfig::pendulum().with_max_actions(0);
        assert!(config.validate().is_err());

        let config = EnvironmentConfig {
            num_frames_skip: 0,
            ..EnvironmentConfig::pendulum()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_fills_defaults() {
        let mut value = serde_json::to_value(EnvironmentConfig::ant_four_rooms()).unwrap();
        let object = value.as_object_mut().unwrap();
        object.remove("show");
        object.remove("seed");
        object.remove("max_sampling_attempts");
        object.remove("goal_space_train");
        let parsed: EnvironmentConfig = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.model_name, "ant_four_rooms.xml");
        assert!(!parsed.show);
        assert_eq!(parsed.seed, None);
        assert_eq!(parsed.max_sampling_attempts, Some(DEFAULT_MAX_ATTEMPTS));
        assert!(parsed.goal_space_train.is_none());
        parsed.validate().unwrap();
    }

    #[test]
    fn test_json_rejects_inverted_bounds() {
        let mut value = serde_json::to_value(EnvironmentConfig::pendulum()).unwrap();
        value["subgoal_bounds"] = serde_json::json!({"low": [1.0, 0.0], "high": [0.0, 1.0]});
        let parsed: std::result::Result<EnvironmentConfig, _> = serde_json::from_value(value);
        assert!(parsed.is_err());
    }
}
