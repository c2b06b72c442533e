//! Inverted pendulum: goals are `(angle, angular velocity)`.

use super::{require_len, require_obs_dim};
use crate::error::Result;
use crate::factorization::Factorization;
use crate::factory::BoxTaskLayout;
use crate::observation::Observation;
use crate::params::SubtaskSpecParams;
use crate::spec::{GoalMap, ObservationSelector, SubgoalProjection};
use hac_envs::angles::decode_angle;
use hac_envs::BoxSpace;
use std::f64::consts::PI;
use std::sync::Arc;

const MAX_ANGULAR_VELOCITY: f64 = 15.0;

/// Observations are `[cos θ, sin θ, θ̇]`; subgoals recover the bounded angle.
#[derive(Debug, Clone, Copy, Default)]
pub struct PendulumLayout;

fn angle_and_velocity(obs: &Observation) -> Result<Vec<f64>> {
    let v = obs.as_vector()?;
    require_len(v, 3)?;
    Ok(vec![
        decode_angle(v[0], v[1]),
        v[2].clamp(-MAX_ANGULAR_VELOCITY, MAX_ANGULAR_VELOCITY),
    ])
}

impl BoxTaskLayout for PendulumLayout {
    fn name(&self) -> &'static str {
        "PendulumHACSubtaskSpecFactory"
    }

    fn indices_and_factorization(
        &self,
        obs_dim: usize,
        _params: &SubtaskSpecParams,
        _level: usize,
    ) -> Result<(ObservationSelector, Vec<usize>, Factorization)> {
        require_obs_dim(self.name(), obs_dim, 3)?;
        Ok((ObservationSelector::All, vec![0, 1], Factorization::singletons(2)))
    }

    fn subgoal_projection(&self, _obs_dim: usize) -> Result<Option<SubgoalProjection>> {
        let space = BoxSpace::symmetric(vec![PI, MAX_ANGULAR_VELOCITY])?;
        Ok(Some(SubgoalProjection::new(space, angle_and_velocity)))
    }

    fn map_to_env_goal(&self, obs_dim: usize) -> Result<GoalMap> {
        require_obs_dim(self.name(), obs_dim, 3)?;
        Ok(Arc::new(angle_and_velocity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_angle_recovered_from_encoding() {
        let theta: f64 = 2.0;
        let obs = Observation::Vector(vec![theta.cos(), theta.sin(), 40.0]);
        let goal = angle_and_velocity(&obs).unwrap();
        assert!((goal[0] - theta).abs() < 1e-9);
        assert_eq!(goal[1], MAX_ANGULAR_VELOCITY);

        let obs = Observation::Vector(vec![(-theta).cos(), (-theta).sin(), -1.0]);
        let goal = angle_and_velocity(&obs).unwrap();
        assert!((goal[0] + theta).abs() < 1e-9);
    }

    #[test]
    fn test_projection_space() {
        let projection = PendulumLayout.subgoal_projection(3).unwrap().unwrap();
        assert_eq!(projection.goal_space().high(), &[PI, MAX_ANGULAR_VELOCITY]);
        assert!(projection.project(&Observation::Vector(vec![1.0])).is_err());
    }
}
