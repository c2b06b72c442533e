//! Auxiliary reward terms added on top of a level's sparse reward.

use crate::error::{Error, Result};
use crate::observation::Observation;
use serde::{Deserialize, Serialize};

/// What a level knows about one of its transitions when scoring auxiliary terms.
#[derive(Debug, Clone, Copy)]
pub struct AuxRewardContext<'a> {
    /// Partial observation after the action.
    pub observation: &'a Observation,
    /// The action taken (a subgoal for upper levels).
    pub action: &'a [f64],
    /// Goal tolerances chosen by the parent, when thresholds are learned.
    pub goal_tolerances: Option<&'a [f64]>,
    /// Time needed to achieve the subgoal, if it was achieved.
    pub delta_t_achieved: Option<f64>,
}

/// A single auxiliary reward term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuxReward {
    /// Penalizes wide learned tolerances: `-weight * mean(tolerances)`.
    GoalTolerance { weight: f64 },
    /// Penalizes slow achievement: `-weight * delta_t_achieved`.
    DeltaTAchieved { weight: f64 },
    /// A constant added to every transition.
    Constant { value: f64 },
    /// Penalizes mechanical power: `-factor * |v · a|` over the first
    /// `n_components` velocity components.
    Power {
        factor: f64,
        velocity_key: String,
        n_components: usize,
    },
}

impl AuxReward {
    /// Scores one transition.
    pub fn evaluate(&self, ctx: &AuxRewardContext<'_>) -> Result<f64> {
        match self {
            AuxReward::GoalTolerance { weight } => {
                let tolerances = ctx.goal_tolerances.ok_or_else(|| {
                    Error::Config("goal tolerance reward requires learned tolerances".into())
                })?;
                if tolerances.is_empty() {
                    return Ok(0.0);
                }
                let mean = tolerances.iter().sum::<f64>() / tolerances.len() as f64;
                Ok(-weight * mean)
            }
            AuxReward::DeltaTAchieved { weight } => {
                Ok(ctx.delta_t_achieved.map_or(0.0, |dt| -weight * dt))
            }
            AuxReward::Constant { value } => Ok(*value),
            AuxReward::Power {
                factor,
                velocity_key,
                n_components,
            } => {
                let velocity = ctx.observation.get(velocity_key)?;
                let n = (*n_components).min(velocity.len()).min(ctx.action.len());
                let power: f64 = velocity[..n]
                    .iter()
                    .zip(&ctx.action[..n])
                    .map(|(v, a)| v * a)
                    .sum();
                Ok(-factor * power.abs())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn ctx<'a>(obs: &'a Observation, action: &'a [f64]) -> AuxRewardContext<'a> {
        AuxRewardContext {
            observation: obs,
            action,
            goal_tolerances: None,
            delta_t_achieved: None,
        }
    }

    #[test]
    fn test_goal_tolerance() {
        let obs = Observation::Vector(vec![]);
        let tolerances = [0.2, 0.4];
        let c = AuxRewardContext {
            goal_tolerances: Some(&tolerances),
            ..ctx(&obs, &[])
        };
        let r = AuxReward::GoalTolerance { weight: 2.0 }.evaluate(&c).unwrap();
        assert!((r + 0.6).abs() < 1e-12);
        assert!(AuxReward::GoalTolerance { weight: 2.0 }
            .evaluate(&ctx(&obs, &[]))
            .is_err());
    }

    #[test]
    fn test_delta_t_achieved() {
        let obs = Observation::Vector(vec![]);
        let reward = AuxReward::DeltaTAchieved { weight: 0.5 };
        assert_eq!(reward.evaluate(&ctx(&obs, &[])).unwrap(), 0.0);
        let c = AuxRewardContext {
            delta_t_achieved: Some(4.0),
            ..ctx(&obs, &[])
        };
        assert_eq!(reward.evaluate(&c).unwrap(), -2.0);
    }

    #[test]
    fn test_constant() {
        let obs = Observation::Vector(vec![]);
        let r = AuxReward::Constant { value: -0.1 }.evaluate(&ctx(&obs, &[])).unwrap();
        assert_eq!(r, -0.1);
    }

    #[test]
    fn test_power_uses_first_velocity_component() {
        let mut map = BTreeMap::new();
        map.insert("velocity".to_string(), vec![2.0, 100.0]);
        let obs = Observation::Dict(map);
        let reward = AuxReward::Power {
            factor: 0.5,
            velocity_key: "velocity".into(),
            n_components: 1,
        };
        assert_eq!(reward.evaluate(&ctx(&obs, &[-3.0])).unwrap(), -3.0);
    }
}
