use super::{require_len, Marker, Task};
use crate::angles::bound_angle;
use crate::error::Result;
use crate::oracle::SteppingOracle;

/// Maximum angular velocity represented in goals.
const MAX_VELOCITY: f64 = 15.0;

/// Inverted pendulum swing-up. The hinge angle is observed as `(cos, sin)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PendulumTask;

impl PendulumTask {
    fn marker(angle: f64) -> [f64; 3] {
        [0.5 * angle.sin(), 0.0, 0.5 * angle.cos() + 0.6]
    }

    fn project(sim: &dyn SteppingOracle) -> Vec<f64> {
        let angle = sim.qpos().first().copied().unwrap_or_default();
        let velocity = sim.qvel().first().copied().unwrap_or_default();
        vec![
            bound_angle(angle),
            velocity.clamp(-MAX_VELOCITY, MAX_VELOCITY),
        ]
    }
}

impl Task for PendulumTask {
    fn model_name(&self) -> &str {
        "pendulum.xml"
    }

    fn state_dim(&self, nq: usize, nv: usize) -> usize {
        2 * nq + nv
    }

    fn end_goal_dim(&self) -> usize {
        2
    }

    fn subgoal_dim(&self) -> usize {
        2
    }

    fn observe(&self, sim: &dyn SteppingOracle) -> Vec<f64> {
        let qpos = sim.qpos();
        qpos.iter()
            .map(|q| q.cos())
            .chain(qpos.iter().map(|q| q.sin()))
            .chain(sim.qvel().iter().copied())
            .collect()
    }

    fn project_state_to_end_goal(&self, sim: &dyn SteppingOracle, _state: &[f64]) -> Vec<f64> {
        Self::project(sim)
    }

    fn project_state_to_subgoal(&self, sim: &dyn SteppingOracle, _state: &[f64]) -> Vec<f64> {
        Self::project(sim)
    }

    fn end_goal_markers(&self, goal: &[f64]) -> Result<Vec<Marker>> {
        require_len("pendulum end goal", goal, 1)?;
        Ok(vec![(0, Self::marker(goal[0]))])
    }

    fn subgoal_markers(&self, slot: usize, subgoal: &[f64]) -> Result<Vec<Marker>> {
        require_len("pendulum subgoal", subgoal, 1)?;
        Ok(vec![(slot, Self::marker(subgoal[0]))])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{KinematicModel, KinematicSim};
    use std::f64::consts::PI;

    #[test]
    fn test_observation_encodes_angle() {
        let mut sim = KinematicSim::new(KinematicModel::pendulum()).unwrap();
        sim.qpos_mut()[0] = PI / 2.0;
        sim.qvel_mut()[0] = 0.3;
        let state = PendulumTask.observe(&sim);
        assert_eq!(state.len(), PendulumTask.state_dim(1, 1));
        assert!(state[0].abs() < 1e-12);
        assert!((state[1] - 1.0).abs() < 1e-12);
        assert_eq!(state[2], 0.3);
    }

    #[test]
    fn test_projection_bounds_angle_and_clips_velocity() {
        let mut sim = KinematicSim::new(KinematicModel::pendulum()).unwrap();
        sim.qpos_mut()[0] = 3.0 * PI / 2.0;
        sim.qvel_mut()[0] = 40.0;
        let goal = PendulumTask.project_state_to_end_goal(&sim, &[]);
        assert!((goal[0] + PI / 2.0).abs() < 1e-12);
        assert_eq!(goal[1], MAX_VELOCITY);
    }

    #[test]
    fn test_upright_marker() {
        let markers = PendulumTask.end_goal_markers(&[0.0, 0.0]).unwrap();
        assert_eq!(markers.len(), 1);
        let (index, pos) = markers[0];
        assert_eq!(index, 0);
        assert!(pos[0].abs() < 1e-12 && pos[1] == 0.0);
        assert!((pos[2] - 1.1).abs() < 1e-12);
    }
}
