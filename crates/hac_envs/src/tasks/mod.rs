//! Task variants.
//!
//! A [`Task`] holds everything that differs between the bundled models: how
//! the raw physics state is observed, how initial states and end goals are
//! placed, how states project onto goals and where goal markers are drawn.
//! [`for_model`] maps a model file name to its variant.

mod ant;
mod pendulum;
mod ur5;

pub use ant::{AntFourRoomsTask, AntReacherTask, Room, ANT_REACHER_MIN_DISTANCE};
pub use pendulum::PendulumTask;
pub use ur5::Ur5ReacherTask;

use crate::error::{Error, Result};
use crate::oracle::SteppingOracle;
use crate::sampling::RejectionSampler;
use crate::space::BoxSpace;
use rand::rngs::StdRng;

/// A marker placement: mocap index and world position.
pub type Marker = (usize, [f64; 3]);

/// Mutable access to the simulation while an initial state is placed.
pub struct ResetContext<'a> {
    /// The simulation being reset.
    pub sim: &'a mut dyn SteppingOracle,
    /// Per-coordinate range of positions followed by velocities.
    pub initial_state_space: &'a BoxSpace,
    /// The environment's random number generator.
    pub rng: &'a mut StdRng,
    /// Cap for rejection-sampling loops.
    pub sampler: RejectionSampler,
}

impl ResetContext<'_> {
    /// Draws positions and velocities uniformly from the initial state space
    /// and writes them into the simulation.
    pub fn draw_initial_state(&mut self) -> Result<()> {
        let nq = self.sim.qpos().len();
        let nv = self.sim.qvel().len();
        if self.initial_state_space.dim() != nq + nv {
            return Err(Error::dimension(
                "initial state space",
                nq + nv,
                self.initial_state_space.dim(),
            ));
        }
        let sample = self.initial_state_space.sample(&mut *self.rng)?;
        self.sim.qpos_mut().copy_from_slice(&sample[..nq]);
        self.sim.qvel_mut().copy_from_slice(&sample[nq..]);
        Ok(())
    }
}

/// Read access to the goal configuration while an end goal is drawn.
pub struct GoalContext<'a> {
    /// Goals drawn during training, if configured.
    pub goal_space_train: Option<&'a BoxSpace>,
    /// Goals drawn during testing.
    pub goal_space_test: &'a BoxSpace,
    /// The environment's random number generator.
    pub rng: &'a mut StdRng,
    /// Cap for rejection-sampling loops.
    pub sampler: RejectionSampler,
}

impl GoalContext<'_> {
    /// Draws uniformly from the training box in train mode (when configured),
    /// otherwise from the test box.
    pub fn sample_uniform(&mut self, test: bool) -> Result<Vec<f64>> {
        let space = match self.goal_space_train {
            Some(train) if !test => train,
            _ => self.goal_space_test,
        };
        space.sample(&mut *self.rng)
    }
}

/// Behavior specific to one simulated model.
pub trait Task: Send + Sync {
    /// The model file this task runs on.
    fn model_name(&self) -> &str;

    /// Dimension of the observed state for a model with `nq` positions and `nv` velocities.
    fn state_dim(&self, nq: usize, nv: usize) -> usize {
        nq + nv
    }

    /// Dimension of the end goal.
    fn end_goal_dim(&self) -> usize;

    /// Dimension of the subgoals proposed to the lowest level.
    fn subgoal_dim(&self) -> usize;

    /// Projects the physics state onto the observed state.
    fn observe(&self, sim: &dyn SteppingOracle) -> Vec<f64> {
        sim.qpos().iter().chain(sim.qvel()).copied().collect()
    }

    /// Whether the initial state placement depends on the episode's goal.
    fn goal_aware_reset(&self) -> bool {
        false
    }

    /// Places the initial state in the simulation.
    fn place_initial_state(&self, ctx: &mut ResetContext<'_>, goal: Option<&[f64]>) -> Result<()> {
        let _ = goal;
        ctx.draw_initial_state()
    }

    /// Draws an end goal.
    fn sample_goal(&self, ctx: &mut GoalContext<'_>, test: bool) -> Result<Vec<f64>> {
        ctx.sample_uniform(test)
    }

    /// Projects the current state onto the end-goal space.
    fn project_state_to_end_goal(&self, sim: &dyn SteppingOracle, state: &[f64]) -> Vec<f64>;

    /// Projects the current state onto the subgoal space.
    fn project_state_to_subgoal(&self, sim: &dyn SteppingOracle, state: &[f64]) -> Vec<f64>;

    /// Marker placements that visualize an end goal.
    fn end_goal_markers(&self, goal: &[f64]) -> Result<Vec<Marker>>;

    /// Marker placements that visualize the subgoal shown in `slot` (1-based).
    fn subgoal_markers(&self, slot: usize, subgoal: &[f64]) -> Result<Vec<Marker>>;
}

/// Returns the task variant for a model file.
pub fn for_model(model_name: &str) -> Result<Box<dyn Task>> {
    match model_name {
        "pendulum.xml" => Ok(Box::new(PendulumTask)),
        "ur5.xml" => Ok(Box::new(Ur5ReacherTask)),
        "ant_reacher.xml" => Ok(Box::new(AntReacherTask::default())),
        "ant_four_rooms.xml" => Ok(Box::new(AntFourRoomsTask)),
        other => Err(Error::NotImplemented {
            task: other.to_string(),
            operation: "goal-conditioned control".into(),
        }),
    }
}

/// Checks that a goal vector has at least `needed` coordinates.
pub(crate) fn require_len(what: &str, goal: &[f64], needed: usize) -> Result<()> {
    if goal.len() < needed {
        return Err(Error::dimension(what, needed, goal.len()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_model_dispatch() {
        assert_eq!(for_model("pendulum.xml").unwrap().model_name(), "pendulum.xml");
        assert_eq!(for_model("ur5.xml").unwrap().model_name(), "ur5.xml");
        assert_eq!(
            for_model("ant_reacher.xml").unwrap().model_name(),
            "ant_reacher.xml"
        );
        assert!(for_model("ant_four_rooms.xml").unwrap().goal_aware_reset());
    }

    #[test]
    fn test_unknown_model_is_not_implemented() {
        let err = for_model("cartpole.xml").err().unwrap();
        assert_eq!(
            err.to_string(),
            "goal-conditioned control is not implemented for task 'cartpole.xml'"
        );
    }
}
