//! What a factory needs to know about the environment.

use crate::error::Result;
use crate::observation::{Observation, ObservationLayout};
use crate::spec::GoalMap;
use hac_envs::{BoxSpace, GoalEnv, TimedSubgoal};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Read-only environment facts consumed by factories and the graph builder.
pub trait EnvInfo {
    /// Episode budget in primitive actions.
    fn max_episode_length(&self) -> usize;

    /// Shape of the observation space.
    fn observation_layout(&self) -> ObservationLayout;

    /// Space of the environment's end goals.
    fn goal_space(&self) -> BoxSpace;

    /// End-goal achievement thresholds, one per goal coordinate.
    fn goal_thresholds(&self) -> Vec<f64>;

    /// Whether the environment can visualize subgoals.
    fn supports_subgoal_display(&self) -> bool {
        false
    }

    /// The environment's own projection from an observation to its achieved goal.
    fn map_to_achieved_goal(&self) -> Option<GoalMap> {
        None
    }
}

impl EnvInfo for GoalEnv {
    fn max_episode_length(&self) -> usize {
        GoalEnv::max_episode_length(self)
    }

    fn observation_layout(&self) -> ObservationLayout {
        ObservationLayout::Vector(self.observation_space().clone())
    }

    fn goal_space(&self) -> BoxSpace {
        GoalEnv::goal_space(self).clone()
    }

    fn goal_thresholds(&self) -> Vec<f64> {
        GoalEnv::goal_thresholds(self).to_vec()
    }

    fn supports_subgoal_display(&self) -> bool {
        true
    }
}

/// Receives the subgoals currently pursued by a hierarchy for display.
pub trait SubgoalSink {
    /// Shows untimed subgoals, lowest level first.
    fn show_subgoals(&mut self, subgoals: &[Vec<f64>]) -> hac_envs::Result<()>;

    /// Shows timed subgoals, lowest level first; `None` leaves a slot empty.
    fn show_timed_subgoals(&mut self, subgoals: &[Option<TimedSubgoal>]) -> hac_envs::Result<()>;
}

impl SubgoalSink for GoalEnv {
    fn show_subgoals(&mut self, subgoals: &[Vec<f64>]) -> hac_envs::Result<()> {
        self.update_subgoals(subgoals)
    }

    fn show_timed_subgoals(&mut self, subgoals: &[Option<TimedSubgoal>]) -> hac_envs::Result<()> {
        self.update_timed_subgoals(subgoals)
    }
}

/// Description of an environment that lives outside this workspace,
/// typically one with dict observations.
///
/// ```json
/// {
///   "max_episode_length": 500,
///   "observation_space": {"dict": {"position": {"low": [-1.0], "high": [1.0]}}},
///   "goal_space": {"low": [-1.0], "high": [1.0]},
///   "goal_thresholds": [0.05]
/// }
/// ```
///
/// `achieved_goal_keys`, when given, are concatenated in order to form the
/// environment's achieved goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DictEnvDescription {
    pub max_episode_length: usize,
    pub observation_space: ObservationLayout,
    pub goal_space: BoxSpace,
    pub goal_thresholds: Vec<f64>,
    #[serde(default)]
    pub supports_subgoal_display: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub achieved_goal_keys: Option<Vec<String>>,
}

impl DictEnvDescription {
    /// A dict environment from per-key observation boxes.
    pub fn new(
        max_episode_length: usize,
        observation_space: BTreeMap<String, BoxSpace>,
        goal_space: BoxSpace,
        goal_thresholds: Vec<f64>,
    ) -> Self {
        Self {
            max_episode_length,
            observation_space: ObservationLayout::Dict(observation_space),
            goal_space,
            goal_thresholds,
            supports_subgoal_display: false,
            achieved_goal_keys: None,
        }
    }

    /// Declares which keys make up the achieved goal.
    pub fn with_achieved_goal_keys(mut self, keys: Vec<String>) -> Self {
        self.achieved_goal_keys = Some(keys);
        self
    }
}

impl EnvInfo for DictEnvDescription {
    fn max_episode_length(&self) -> usize {
        self.max_episode_length
    }

    fn observation_layout(&self) -> ObservationLayout {
        self.observation_space.clone()
    }

    fn goal_space(&self) -> BoxSpace {
        self.goal_space.clone()
    }

    fn goal_thresholds(&self) -> Vec<f64> {
        self.goal_thresholds.clone()
    }

    fn supports_subgoal_display(&self) -> bool {
        self.supports_subgoal_display
    }

    fn map_to_achieved_goal(&self) -> Option<GoalMap> {
        let keys = self.achieved_goal_keys.clone()?;
        Some(Arc::new(move |obs: &Observation| -> Result<Vec<f64>> {
            obs.concat(&keys)
        }))
    }
}
