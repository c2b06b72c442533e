//! The simulated environment: one stepping oracle plus one task variant.

use crate::config::EnvironmentConfig;
use crate::error::{Error, Result};
use crate::oracle::{ModelLoader, SteppingOracle};
use crate::sampling::RejectionSampler;
use crate::space::BoxSpace;
use crate::tasks::{self, GoalContext, ResetContext, Task};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Maximum number of subgoals shown at once; older ones are dropped.
pub const MAX_DISPLAYED_SUBGOALS: usize = 10;

/// A physics-simulated control task with goal sampling and separation-aware resets.
///
/// The environment exclusively owns its stepping oracle. All operations are
/// synchronous and mutate the simulation in place.
pub struct Environment {
    config: EnvironmentConfig,
    task: Box<dyn Task>,
    sim: Box<dyn SteppingOracle>,
    rng: StdRng,
    sampler: RejectionSampler,
    state_dim: usize,
    action_bounds: Vec<f64>,
    action_offset: Vec<f64>,
    subgoal_bounds_symmetric: Vec<f64>,
    subgoal_bounds_offset: Vec<f64>,
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("name", &self.config.model_name)
            .field("state_dim", &self.state_dim)
            .field("action_dim", &self.action_bounds.len())
            .finish_non_exhaustive()
    }
}

impl Environment {
    /// Loads the configured model and builds the environment for its task.
    pub fn new(config: EnvironmentConfig, loader: &dyn ModelLoader) -> Result<Self> {
        config.validate()?;
        let task = tasks::for_model(&config.model_name)?;
        let sim = loader.load(&config.model_name)?;
        Self::with_task(config, task, sim)
    }

    /// Builds an environment from an explicit task variant and oracle instance.
    pub fn with_task(
        config: EnvironmentConfig,
        task: Box<dyn Task>,
        sim: Box<dyn SteppingOracle>,
    ) -> Result<Self> {
        config.validate()?;

        let nq = sim.qpos().len();
        let nv = sim.qvel().len();
        if config.initial_state_space.dim() != nq + nv {
            return Err(Error::dimension(
                "initial state space",
                nq + nv,
                config.initial_state_space.dim(),
            ));
        }
        let goal_dim = config.test_goal_space()?.dim();
        if goal_dim != task.end_goal_dim() {
            return Err(Error::dimension("end goal space", task.end_goal_dim(), goal_dim));
        }
        if config.subgoal_bounds.dim() != task.subgoal_dim() {
            return Err(Error::dimension(
                "subgoal bounds",
                task.subgoal_dim(),
                config.subgoal_bounds.dim(),
            ));
        }
        if sim.ctrl().len() != sim.actuator_ctrl_range().len() {
            return Err(Error::Simulation(
                "control signal and actuator ranges disagree".into(),
            ));
        }

        // Assumes symmetric actuator ranges.
        let action_bounds: Vec<f64> = sim.actuator_ctrl_range().iter().map(|r| r[1]).collect();
        let action_offset = vec![0.0; action_bounds.len()];
        let subgoal_bounds_symmetric = config.subgoal_bounds.half_range();
        let subgoal_bounds_offset = config.subgoal_bounds.offset();

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };

        log::info!(
            "Environment '{}': state dim {}, action dim {}, end goal dim {}, subgoal dim {}",
            config.model_name,
            task.state_dim(nq, nv),
            action_bounds.len(),
            goal_dim,
            config.subgoal_bounds.dim()
        );

        Ok(Self {
            sampler: config.sampler(),
            state_dim: task.state_dim(nq, nv),
            config,
            task,
            sim,
            rng,
            action_bounds,
            action_offset,
            subgoal_bounds_symmetric,
            subgoal_bounds_offset,
        })
    }

    /// Reseeds the random number generator.
    pub fn seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// The model file name.
    pub fn name(&self) -> &str {
        &self.config.model_name
    }

    /// The configuration the environment was built from.
    pub fn config(&self) -> &EnvironmentConfig {
        &self.config
    }

    /// The task variant.
    pub fn task(&self) -> &dyn Task {
        self.task.as_ref()
    }

    /// The stepping oracle.
    pub fn sim(&self) -> &dyn SteppingOracle {
        self.sim.as_ref()
    }

    /// Mutable access to the stepping oracle.
    pub fn sim_mut(&mut self) -> &mut dyn SteppingOracle {
        self.sim.as_mut()
    }

    /// Dimension of the observed state.
    pub fn state_dim(&self) -> usize {
        self.state_dim
    }

    /// Dimension of the low-level action.
    pub fn action_dim(&self) -> usize {
        self.action_bounds.len()
    }

    /// Upper control bound of each actuator.
    pub fn action_bounds(&self) -> &[f64] {
        &self.action_bounds
    }

    /// Center of each actuator's control range.
    pub fn action_offset(&self) -> &[f64] {
        &self.action_offset
    }

    /// Dimension of the end goal.
    pub fn end_goal_dim(&self) -> usize {
        self.task.end_goal_dim()
    }

    /// Dimension of the subgoals.
    pub fn subgoal_dim(&self) -> usize {
        self.config.subgoal_bounds.dim()
    }

    /// Half-widths of the subgoal bounds.
    pub fn subgoal_bounds_symmetric(&self) -> &[f64] {
        &self.subgoal_bounds_symmetric
    }

    /// Centers of the subgoal bounds.
    pub fn subgoal_bounds_offset(&self) -> &[f64] {
        &self.subgoal_bounds_offset
    }

    /// Tolerance per end goal dimension.
    pub fn end_goal_thresholds(&self) -> &[f64] {
        &self.config.end_goal_thresholds
    }

    /// Tolerance per subgoal dimension.
    pub fn subgoal_thresholds(&self) -> &[f64] {
        &self.config.subgoal_thresholds
    }

    /// Episode budget in low-level actions.
    pub fn max_actions(&self) -> usize {
        self.config.max_actions
    }

    /// Goal space used for training (falls back to the test goal space).
    pub fn goal_space_train(&self) -> Result<&BoxSpace> {
        self.config.train_goal_space()
    }

    /// Whether resets need the episode's goal.
    pub fn goal_aware_reset(&self) -> bool {
        self.task.goal_aware_reset()
    }

    /// The observed state: positions and velocities, with bare angles
    /// encoded as `(cos, sin)` where the task requires it.
    pub fn state(&self) -> Vec<f64> {
        self.task.observe(self.sim.as_ref())
    }

    /// Projects a state of this environment onto the end-goal space.
    pub fn project_state_to_end_goal(&self, state: &[f64]) -> Vec<f64> {
        self.task.project_state_to_end_goal(self.sim.as_ref(), state)
    }

    /// Projects a state of this environment onto the subgoal space.
    pub fn project_state_to_subgoal(&self, state: &[f64]) -> Vec<f64> {
        self.task.project_state_to_subgoal(self.sim.as_ref(), state)
    }

    /// Resets the simulation to a fresh initial state.
    ///
    /// Tasks whose placement depends on the goal fail with
    /// [`Error::GoalRequired`] when `next_goal` is `None`.
    pub fn reset_sim(&mut self, next_goal: Option<&[f64]>) -> Result<Vec<f64>> {
        self.sim.ctrl_mut().iter_mut().for_each(|u| *u = 0.0);
        {
            let mut ctx = ResetContext {
                sim: self.sim.as_mut(),
                initial_state_space: &self.config.initial_state_space,
                rng: &mut self.rng,
                sampler: self.sampler,
            };
            self.task.place_initial_state(&mut ctx, next_goal)?;
        }
        self.sim.step()?;
        Ok(self.state())
    }

    /// Applies `action` as the control signal for `num_frames_skip` oracle steps.
    pub fn execute_action(&mut self, action: &[f64]) -> Result<Vec<f64>> {
        if action.len() != self.action_dim() {
            return Err(Error::dimension("action", self.action_dim(), action.len()));
        }
        self.sim.ctrl_mut().copy_from_slice(action);
        for _ in 0..self.config.num_frames_skip {
            self.sim.step()?;
            if self.config.show {
                self.sim.render();
            }
        }
        Ok(self.state())
    }

    /// Draws the next end goal and displays it.
    pub fn next_goal(&mut self, test: bool) -> Result<Vec<f64>> {
        let goal = {
            let mut ctx = GoalContext {
                goal_space_train: self.config.goal_space_train.as_ref(),
                goal_space_test: self.config.test_goal_space()?,
                rng: &mut self.rng,
                sampler: self.sampler,
            };
            self.task.sample_goal(&mut ctx, test)?
        };
        self.display_end_goal(&goal)?;
        log::debug!("{}: next end goal {:?}", self.config.model_name, goal);
        Ok(goal)
    }

    /// Moves the end-goal markers to `end_goal`.
    pub fn display_end_goal(&mut self, end_goal: &[f64]) -> Result<()> {
        for (index, pos) in self.task.end_goal_markers(end_goal)? {
            self.sim.set_mocap_pos(index, pos)?;
        }
        Ok(())
    }

    /// Shows the most recent [`MAX_DISPLAYED_SUBGOALS`] subgoals.
    ///
    /// Subgoal `k` of the window is drawn in marker slot `k + 1` and made opaque.
    pub fn display_subgoals(&mut self, subgoals: &[Vec<f64>]) -> Result<()> {
        let start = subgoals.len().saturating_sub(MAX_DISPLAYED_SUBGOALS);
        for (k, subgoal) in subgoals[start..].iter().enumerate() {
            for (index, pos) in self.task.subgoal_markers(k + 1, subgoal)? {
                self.sim.set_mocap_pos(index, pos)?;
                self.sim.set_site_alpha(index, 1.0)?;
            }
        }
        Ok(())
    }

    /// Renders the current frame.
    pub fn render(&mut self) {
        self.sim.render();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::KinematicModels;

    fn pendulum() -> Environment {
        Environment::new(EnvironmentConfig::pendulum().with_seed(1), &KinematicModels).unwrap()
    }

    // ==================== Construction Tests ====================

    #[test]
    fn test_dimensions() {
        let env = pendulum();
        assert_eq!(env.state_dim(), 3);
        assert_eq!(env.action_dim(), 1);
        assert_eq!(env.end_goal_dim(), 2);
        assert_eq!(env.subgoal_dim(), 2);
        assert_eq!(env.action_bounds(), &[2.0]);
        assert_eq!(env.action_offset(), &[0.0]);

        let ant = Environment::new(EnvironmentConfig::ant_four_rooms(), &KinematicModels).unwrap();
        assert_eq!(ant.state_dim(), 29);
        assert_eq!(ant.action_dim(), 8);
        assert_eq!(ant.subgoal_bounds_symmetric(), &[11.0, 11.0, 0.5, 3.0, 3.0]);
        assert_eq!(ant.subgoal_bounds_offset(), &[0.0, 0.0, 0.5, 0.0, 0.0]);
    }

    #[test]
    fn test_rejects_initial_state_mismatch() {
        let config = EnvironmentConfig {
            model_name: "ur5.xml".into(),
            ..EnvironmentConfig::pendulum()
        };
        let err = Environment::new(config, &KinematicModels).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { .. }));
    }

    #[test]
    fn test_unknown_task_is_not_implemented() {
        let config = EnvironmentConfig {
            model_name: "hopper.xml".into(),
            ..EnvironmentConfig::pendulum()
        };
        let err = Environment::new(config, &KinematicModels).unwrap_err();
        assert!(matches!(err, Error::NotImplemented { .. }));
    }

    // ==================== Stepping Tests ====================

    #[test]
    fn test_reset_draws_from_initial_state_space() {
        let mut env = pendulum();
        for _ in 0..20 {
            env.reset_sim(None).unwrap();
            let angle = env.sim().qpos()[0];
            // one settle step can move the angle by at most |qvel| * dt
            assert!(angle > std::f64::consts::FRAC_PI_4 - 0.01);
            assert!(angle < 7.0 * std::f64::consts::FRAC_PI_4 + 0.01);
            assert_eq!(env.sim().ctrl(), &[0.0]);
        }
    }

    #[test]
    fn test_execute_action_advances_frames() {
        let mut env = pendulum();
        env.reset_sim(None).unwrap();
        let before = env.sim().qvel()[0];
        let state = env.execute_action(&[1.0]).unwrap();
        assert_eq!(state.len(), 3);
        let after = env.sim().qvel()[0];
        assert!((after - before - 10.0 * 0.02).abs() < 1e-9);
    }

    #[test]
    fn test_execute_action_checks_dimension() {
        let mut env = pendulum();
        let err = env.execute_action(&[1.0, 2.0]).unwrap_err();
        assert_eq!(err, Error::dimension("action", 1, 2));
    }

    // ==================== Goal Tests ====================

    #[test]
    fn test_next_goal_is_displayed() {
        let mut env = Environment::new(
            EnvironmentConfig::ant_four_rooms().with_seed(4),
            &KinematicModels,
        )
        .unwrap();
        let goal = env.next_goal(false).unwrap();
        assert_eq!(env.sim().mocap_pos(0), Some([goal[0], goal[1], goal[2]]));
    }

    #[test]
    fn test_generic_goal_in_training_box() {
        let mut env = pendulum();
        let space = env.goal_space_train().unwrap().clone();
        for _ in 0..100 {
            assert!(space.contains(&env.next_goal(false).unwrap()));
            assert!(space.contains(&env.next_goal(true).unwrap()));
        }
    }

    #[test]
    fn test_display_keeps_last_ten_subgoals() {
        let mut env = Environment::new(EnvironmentConfig::ant_reacher(), &KinematicModels).unwrap();
        let subgoals: Vec<Vec<f64>> = (0..14).map(|i| vec![i as f64, 0.0, 0.5, 0.0, 0.0]).collect();
        env.display_subgoals(&subgoals).unwrap();
        assert_eq!(env.sim().mocap_pos(1), Some([4.0, 0.0, 0.5]));
        assert_eq!(env.sim().mocap_pos(10), Some([13.0, 0.0, 0.5]));
        assert_eq!(env.sim().site_alpha(10), Some(1.0));
        assert_eq!(env.sim().site_alpha(0), Some(0.0));
    }

    #[test]
    fn test_display_few_subgoals() {
        let mut env = Environment::new(EnvironmentConfig::ur5_reacher(), &KinematicModels).unwrap();
        env.display_subgoals(&[vec![1.0; 6], vec![2.0; 6]]).unwrap();
        assert_eq!(env.sim().site_alpha(8), Some(1.0));
        assert_eq!(env.sim().site_alpha(9), Some(0.0));
    }
}
