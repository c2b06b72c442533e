//! Goal-conditioned adapter around an [`Environment`].
//!
//! Every observation carries the raw state, the episode's desired goal and
//! the goal currently achieved (the state projected onto the end-goal space).
//! The reward is sparse: `0.0` when every goal dimension lies within its
//! threshold, `-1.0` otherwise.

use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::space::BoxSpace;
use serde::{Deserialize, Serialize};

/// Reward of a step that did not reach the desired goal.
pub const FAILURE_REWARD: f64 = -1.0;
/// Reward of a step that reached the desired goal.
pub const SUCCESS_REWARD: f64 = 0.0;

/// Observation of a goal-conditioned environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalObservation {
    /// The raw environment state.
    pub observation: Vec<f64>,
    /// The goal of the current episode.
    pub desired_goal: Vec<f64>,
    /// The current state projected onto the goal space.
    pub achieved_goal: Vec<f64>,
}

/// Extra information returned with every step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepInfo {
    /// Whether the desired goal was reached.
    pub is_success: bool,
}

/// Result of one [`GoalEnv::step`].
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// Observation after the action.
    pub observation: GoalObservation,
    /// Sparse reward, `0.0` or `-1.0`.
    pub reward: f64,
    /// The episode ended, by success or by exhausting the step budget.
    pub done: bool,
    /// Step details.
    pub info: StepInfo,
}

/// A subgoal with a time budget, as produced by time-budgeted levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedSubgoal {
    /// The subgoal vector.
    pub goal: Vec<f64>,
    /// Time remaining to reach it.
    pub delta_t: f64,
}

/// How [`GoalEnv::render`] presents a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    /// Draw in the viewer.
    #[default]
    Human,
    /// Produce an off-screen frame.
    RgbArray,
}

/// Exposes an [`Environment`] through the observation / desired goal /
/// achieved goal contract.
#[derive(Debug)]
pub struct GoalEnv {
    env: Environment,
    max_episode_length: usize,
    action_space: BoxSpace,
    observation_space: BoxSpace,
    goal_space: BoxSpace,
    desired_goal: Vec<f64>,
    n_steps: usize,
    frames_rendered: usize,
}

impl GoalEnv {
    /// Wraps `env` with an unbounded observation space and resets it.
    pub fn new(env: Environment) -> Result<Self> {
        let observation_space = BoxSpace::unbounded(env.state_dim());
        Self::with_observation_space(env, observation_space)
    }

    /// Wraps `env` with explicit observation bounds and resets it.
    pub fn with_observation_space(env: Environment, observation_space: BoxSpace) -> Result<Self> {
        if observation_space.dim() != env.state_dim() {
            return Err(Error::dimension(
                "observation space",
                env.state_dim(),
                observation_space.dim(),
            ));
        }
        let low = env
            .action_offset()
            .iter()
            .zip(env.action_bounds())
            .map(|(o, b)| o - b)
            .collect();
        let high = env
            .action_offset()
            .iter()
            .zip(env.action_bounds())
            .map(|(o, b)| o + b)
            .collect();
        let action_space = BoxSpace::new(low, high)?;
        let goal_space = env.goal_space_train()?.clone();

        let mut goal_env = Self {
            max_episode_length: env.max_actions(),
            env,
            action_space,
            observation_space,
            goal_space,
            desired_goal: Vec::new(),
            n_steps: 0,
            frames_rendered: 0,
        };
        goal_env.reset()?;
        Ok(goal_env)
    }

    /// Starts a new episode with a freshly sampled desired goal.
    pub fn reset(&mut self) -> Result<GoalObservation> {
        self.desired_goal = self.env.next_goal(false)?;
        let state = if self.env.goal_aware_reset() {
            self.env.reset_sim(Some(self.desired_goal.as_slice()))?
        } else {
            self.env.reset_sim(None)?
        };
        self.n_steps = 0;
        Ok(self.observe(state))
    }

    /// Executes one low-level action.
    pub fn step(&mut self, action: &[f64]) -> Result<Step> {
        let state = self.env.execute_action(action)?;
        self.n_steps += 1;
        let observation = self.observe(state);
        let reward = self.compute_reward(&observation.achieved_goal, &observation.desired_goal)?;
        let is_success = reward == SUCCESS_REWARD;
        let done = is_success || self.n_steps >= self.max_episode_length;
        log::trace!(
            "step {}: reward {}, done {}",
            self.n_steps,
            reward,
            done
        );
        Ok(Step {
            observation,
            reward,
            done,
            info: StepInfo { is_success },
        })
    }

    /// Sparse reward: `-1.0` if any dimension differs by more than its threshold, else `0.0`.
    ///
    /// Both goals must have one coordinate per threshold. A NaN coordinate is
    /// never within its threshold.
    pub fn compute_reward(&self, achieved_goal: &[f64], desired_goal: &[f64]) -> Result<f64> {
        let thresholds = self.env.end_goal_thresholds();
        if achieved_goal.len() != thresholds.len() {
            return Err(Error::dimension(
                "achieved goal",
                thresholds.len(),
                achieved_goal.len(),
            ));
        }
        if desired_goal.len() != thresholds.len() {
            return Err(Error::dimension(
                "desired goal",
                thresholds.len(),
                desired_goal.len(),
            ));
        }
        let missed = achieved_goal
            .iter()
            .zip(desired_goal)
            .zip(thresholds)
            .any(|((a, d), tol)| !((a - d).abs() <= *tol));
        Ok(if missed { FAILURE_REWARD } else { SUCCESS_REWARD })
    }

    /// Shows the given subgoals (most recent last).
    pub fn update_subgoals(&mut self, subgoals: &[Vec<f64>]) -> Result<()> {
        self.env.display_subgoals(subgoals)
    }

    /// Shows timed subgoals. The time component is not visualized.
    pub fn update_timed_subgoals(&mut self, timed_subgoals: &[Option<TimedSubgoal>]) -> Result<()> {
        let subgoals: Vec<Vec<f64>> = timed_subgoals
            .iter()
            .flatten()
            .map(|tg| tg.goal.clone())
            .collect();
        self.update_subgoals(&subgoals)
    }

    /// Renders the current frame.
    pub fn render(&mut self, mode: RenderMode) {
        if mode == RenderMode::RgbArray {
            log::debug!("off-screen rendering is delegated to the stepping oracle's viewer");
        }
        self.env.render();
        self.frames_rendered += 1;
    }

    fn observe(&self, state: Vec<f64>) -> GoalObservation {
        let achieved_goal = self.env.project_state_to_end_goal(&state);
        GoalObservation {
            observation: state,
            desired_goal: self.desired_goal.clone(),
            achieved_goal,
        }
    }

    /// The wrapped environment.
    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Mutable access to the wrapped environment.
    pub fn env_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    /// Step budget of an episode.
    pub fn max_episode_length(&self) -> usize {
        self.max_episode_length
    }

    /// Steps taken in the current episode.
    pub fn n_steps(&self) -> usize {
        self.n_steps
    }

    /// The desired goal of the current episode.
    pub fn desired_goal(&self) -> &[f64] {
        &self.desired_goal
    }

    /// Range of valid actions, `offset ± bound` per actuator.
    pub fn action_space(&self) -> &BoxSpace {
        &self.action_space
    }

    /// Range of raw observations.
    pub fn observation_space(&self) -> &BoxSpace {
        &self.observation_space
    }

    /// Range of desired and achieved goals.
    pub fn goal_space(&self) -> &BoxSpace {
        &self.goal_space
    }

    /// Per-dimension goal tolerances.
    pub fn goal_thresholds(&self) -> &[f64] {
        self.env.end_goal_thresholds()
    }

    /// Number of frames rendered through [`render`](Self::render).
    pub fn frames_rendered(&self) -> usize {
        self.frames_rendered
    }
}
