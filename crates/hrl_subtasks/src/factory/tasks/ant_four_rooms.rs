//! Ant navigation: subgoals are torso position plus planar velocity.

use super::{require_len, require_obs_dim};
use crate::error::Result;
use crate::factorization::Factorization;
use crate::factory::BoxTaskLayout;
use crate::observation::Observation;
use crate::params::SubtaskSpecParams;
use crate::spec::{GoalMap, ObservationSelector, SubgoalProjection};
use hac_envs::BoxSpace;
use std::sync::Arc;

/// Number of generalized positions; velocities start at this index.
///
/// Assumes observations are `qpos ++ qvel` with a free torso joint (7 qpos:
/// `x, y, z` and a quaternion; 6 qvel) and 8 hinge legs, so `qpos` has 15
/// entries, `qvel` 14, and the planar torso velocity sits at indices 15 and 16.
pub const ANT_QPOS_DIM: usize = 15;

const MAX_POSITION: f64 = 9.5;
const MAX_HEIGHT: f64 = 1.0;
const MAX_VELOCITY: f64 = 3.0;

/// Observations are `[qpos (15), qvel (14)]`; torso `x, y, z` come first.
#[derive(Debug, Clone, Copy, Default)]
pub struct AntFourRoomsLayout;

fn torso_position_and_velocity(obs: &Observation) -> Result<Vec<f64>> {
    let v = obs.as_vector()?;
    require_len(v, ANT_QPOS_DIM + 2)?;
    Ok(vec![
        v[0],
        v[1],
        v[2].min(MAX_HEIGHT),
        v[ANT_QPOS_DIM].clamp(-MAX_VELOCITY, MAX_VELOCITY),
        v[ANT_QPOS_DIM + 1].clamp(-MAX_VELOCITY, MAX_VELOCITY),
    ])
}

fn torso_position(obs: &Observation) -> Result<Vec<f64>> {
    let v = obs.as_vector()?;
    require_len(v, 3)?;
    Ok(v[..3].to_vec())
}

impl BoxTaskLayout for AntFourRoomsLayout {
    fn name(&self) -> &'static str {
        "AntFourRoomsSubtaskSpecFactory"
    }

    fn indices_and_factorization(
        &self,
        obs_dim: usize,
        _params: &SubtaskSpecParams,
        _level: usize,
    ) -> Result<(ObservationSelector, Vec<usize>, Factorization)> {
        require_obs_dim(self.name(), obs_dim, ANT_QPOS_DIM + 2)?;
        Ok((
            ObservationSelector::All,
            vec![0, 1, 2, ANT_QPOS_DIM, ANT_QPOS_DIM + 1],
            Factorization::singletons(5),
        ))
    }

    fn subgoal_projection(&self, _obs_dim: usize) -> Result<Option<SubgoalProjection>> {
        let space = BoxSpace::symmetric(vec![
            MAX_POSITION,
            MAX_POSITION,
            MAX_HEIGHT,
            MAX_VELOCITY,
            MAX_VELOCITY,
        ])?;
        Ok(Some(SubgoalProjection::new(space, torso_position_and_velocity)))
    }

    fn map_to_env_goal(&self, obs_dim: usize) -> Result<GoalMap> {
        require_obs_dim(self.name(), obs_dim, 3)?;
        Ok(Arc::new(torso_position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subgoal_projection() {
        let mut obs = vec![0.0; 29];
        obs[0] = 4.0;
        obs[1] = -2.0;
        obs[2] = 1.7;
        obs[ANT_QPOS_DIM] = 5.0;
        obs[ANT_QPOS_DIM + 1] = -0.5;
        let goal = torso_position_and_velocity(&Observation::Vector(obs)).unwrap();
        assert_eq!(goal, vec![4.0, -2.0, 1.0, 3.0, -0.5]);
    }

    #[test]
    fn test_velocity_index_matches_bundled_ant() {
        let mut env = hac_envs::make("AntFourRooms-v1", &hac_envs::KinematicModels, Some(4)).unwrap();
        env.reset().unwrap();
        let step = env.step(&[0.5; 8]).unwrap();
        let obs = &step.observation.observation;
        let sim = env.env().sim();
        assert_eq!(sim.qpos().len(), ANT_QPOS_DIM);
        assert_eq!(obs.len(), ANT_QPOS_DIM + sim.qvel().len());
        assert_eq!(obs[ANT_QPOS_DIM], sim.qvel()[0]);
        assert_eq!(obs[ANT_QPOS_DIM + 1], sim.qvel()[1]);
    }

    #[test]
    fn test_too_short_observation_rejected() {
        let params = SubtaskSpecParams::default();
        assert!(AntFourRoomsLayout.indices_and_factorization(10, &params, 0).is_err());
    }
}
