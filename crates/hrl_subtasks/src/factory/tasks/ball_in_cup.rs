//! Ball in cup: swing a tethered ball into a cup.
//!
//! The task is rewarded by the environment itself, so there is no goal for
//! the top level to pursue and it must use `EnvRMSubtaskSpec`.

use super::{require_len, require_obs_dim};
use crate::error::{Error, Result};
use crate::factorization::Factorization;
use crate::factory::BoxTaskLayout;
use crate::observation::Observation;
use crate::params::SubtaskSpecParams;
use crate::spec::{GoalMap, ObservationSelector, SubgoalProjection};
use hac_envs::BoxSpace;

const CUP_POSITION: [usize; 2] = [0, 1];
const CUP_VELOCITY: [usize; 2] = [4, 5];
const GOAL_DIM: usize = 4;

const SUBGOAL_LOW: [f64; GOAL_DIM] = [-0.25, -0.28, -3.0, -3.0];
const SUBGOAL_HIGH: [f64; GOAL_DIM] = [0.25, 0.189, 3.0, 3.0];

/// Observations are `[cup x, cup z, ball x, ball z, cup ẋ, cup ż, ...]`.
/// Lower levels see only the cup; subgoals are its clipped position and velocity.
#[derive(Debug, Clone, Copy, Default)]
pub struct BallInCupLayout;

impl BoxTaskLayout for BallInCupLayout {
    fn name(&self) -> &'static str {
        "BallInCupSubtaskSpecFactory"
    }

    fn indices_and_factorization(
        &self,
        obs_dim: usize,
        _params: &SubtaskSpecParams,
        _level: usize,
    ) -> Result<(ObservationSelector, Vec<usize>, Factorization)> {
        require_obs_dim(self.name(), obs_dim, CUP_VELOCITY[1] + 1)?;
        let visible = CUP_POSITION.iter().chain(&CUP_VELOCITY).copied().collect();
        Ok((
            ObservationSelector::Indices(visible),
            (0..GOAL_DIM).collect(),
            Factorization::singletons(GOAL_DIM),
        ))
    }

    /// Clips the visible cup state into the subgoal box.
    fn subgoal_projection(&self, _obs_dim: usize) -> Result<Option<SubgoalProjection>> {
        let space = BoxSpace::new(SUBGOAL_LOW.to_vec(), SUBGOAL_HIGH.to_vec())?;
        let bounds = space.clone();
        Ok(Some(SubgoalProjection::new(
            space,
            move |partial_obs: &Observation| -> Result<Vec<f64>> {
                let v = partial_obs.as_vector()?;
                require_len(v, GOAL_DIM)?;
                Ok(bounds.clip(&v[..GOAL_DIM]))
            },
        )))
    }

    fn map_to_env_goal(&self, _obs_dim: usize) -> Result<GoalMap> {
        Err(Error::Config(format!(
            "{} has no environment goal; the top level must be an EnvRMSubtaskSpec",
            self.name()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lower_levels_see_only_the_cup() {
        let params = SubtaskSpecParams::default();
        let (visible, goal, factorization) =
            BallInCupLayout.indices_and_factorization(8, &params, 0).unwrap();
        assert_eq!(visible, ObservationSelector::Indices(vec![0, 1, 4, 5]));
        assert_eq!(goal, vec![0, 1, 2, 3]);
        assert_eq!(factorization.len(), GOAL_DIM);
        assert!(BallInCupLayout.indices_and_factorization(5, &params, 0).is_err());
    }

    #[test]
    fn test_subgoals_are_clipped() {
        let projection = BallInCupLayout.subgoal_projection(8).unwrap().unwrap();
        let goal = projection
            .project(&Observation::Vector(vec![0.1, 0.5, -7.0, 2.0]))
            .unwrap();
        assert_eq!(goal, vec![0.1, 0.189, -3.0, 2.0]);
        assert!(projection.goal_space().contains(&goal));
        assert!(projection.project(&Observation::Vector(vec![0.0; 3])).is_err());
    }

    #[test]
    fn test_no_environment_goal() {
        assert!(matches!(BallInCupLayout.map_to_env_goal(8), Err(Error::Config(_))));
    }
}
