//! UR5 reacher: goals are joint angles, subgoals add joint velocities.

use super::{require_len, require_obs_dim};
use crate::error::Result;
use crate::factorization::Factorization;
use crate::factory::BoxTaskLayout;
use crate::observation::Observation;
use crate::params::SubtaskSpecParams;
use crate::spec::{GoalMap, ObservationSelector, SubgoalProjection};
use hac_envs::angles::wrap_angle_magnitude;
use hac_envs::BoxSpace;
use std::f64::consts::PI;
use std::sync::Arc;

const N_JOINTS: usize = 3;
const MAX_JOINT_VELOCITY: f64 = 4.0;

/// Observations are `[q_1..q_3, q̇_1..q̇_3]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ur5ReacherLayout;

fn joint_angles(obs: &Observation) -> Result<Vec<f64>> {
    let v = obs.as_vector()?;
    require_len(v, N_JOINTS)?;
    Ok(v[..N_JOINTS].iter().map(|a| wrap_angle_magnitude(*a)).collect())
}

fn joint_angles_and_velocities(obs: &Observation) -> Result<Vec<f64>> {
    let v = obs.as_vector()?;
    require_len(v, 2 * N_JOINTS)?;
    let mut goal = joint_angles(obs)?;
    goal.extend(
        v[N_JOINTS..2 * N_JOINTS]
            .iter()
            .map(|w| w.clamp(-MAX_JOINT_VELOCITY, MAX_JOINT_VELOCITY)),
    );
    Ok(goal)
}

impl BoxTaskLayout for Ur5ReacherLayout {
    fn name(&self) -> &'static str {
        "UR5ReacherSubtaskSpecFactory"
    }

    fn indices_and_factorization(
        &self,
        obs_dim: usize,
        _params: &SubtaskSpecParams,
        _level: usize,
    ) -> Result<(ObservationSelector, Vec<usize>, Factorization)> {
        require_obs_dim(self.name(), obs_dim, 2 * N_JOINTS)?;
        Ok((
            ObservationSelector::All,
            (0..2 * N_JOINTS).collect(),
            Factorization::singletons(2 * N_JOINTS),
        ))
    }

    fn subgoal_projection(&self, _obs_dim: usize) -> Result<Option<SubgoalProjection>> {
        let mut high = vec![2.0 * PI; N_JOINTS];
        high.extend([MAX_JOINT_VELOCITY; N_JOINTS]);
        let space = BoxSpace::symmetric(high)?;
        Ok(Some(SubgoalProjection::new(space, joint_angles_and_velocities)))
    }

    fn map_to_env_goal(&self, obs_dim: usize) -> Result<GoalMap> {
        require_obs_dim(self.name(), obs_dim, N_JOINTS)?;
        Ok(Arc::new(joint_angles))
    }
}
