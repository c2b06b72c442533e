//! Factories for environments with dict observations.
//!
//! Goals are the concatenation of the goal keys in sorted order, and every
//! key forms one factorization group with its own threshold.

use super::{add_shared_aux_rewards, assemble_specs, env_goal_map, SubtaskSpecFactory};
use crate::aux_rewards::AuxReward;
use crate::env_info::EnvInfo;
use crate::error::{Error, Result};
use crate::factorization::Factorization;
use crate::observation::Observation;
use crate::params::{SubtaskSpecParams, Topology};
use crate::spec::{Budget, GoalMap, GoalSource, ObservationSelector, SubtaskSpec, Thresholds};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// The task-specific part of a dict factory.
pub trait DictTaskLayout: Send + Sync {
    /// Registered name of the factory built on this layout.
    fn name(&self) -> &'static str;

    /// Keys visible to `level`.
    fn partial_obs_keys(&self, level: usize) -> BTreeSet<String>;

    /// Keys forming the goals of `level`.
    fn goal_keys(&self, level: usize) -> BTreeSet<String>;

    /// Per-key achievement thresholds of `level`.
    fn thresholds(&self, params: &SubtaskSpecParams, level: usize) -> Result<BTreeMap<String, f64>>;

    /// Where the top level reads the environment goal.
    fn env_goal(&self) -> EnvGoalSource;

    fn supports(&self, _topology: Topology) -> bool {
        true
    }

    /// Task-specific auxiliary rewards for one level.
    fn extra_aux_rewards(&self, _params: &SubtaskSpecParams) -> Result<Vec<AuxReward>> {
        Ok(Vec::new())
    }
}

/// Where a dict task's environment goal comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvGoalSource {
    /// The component stored under this key.
    Key(&'static str),
    /// The environment's own achieved-goal projection.
    AchievedGoal,
}

/// A factory for dict observations, parameterized by its task layout.
#[derive(Debug, Clone, Default)]
pub struct DictSubtaskSpecFactory<L> {
    layout: L,
}

impl<L: DictTaskLayout> DictSubtaskSpecFactory<L> {
    pub fn new(layout: L) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &L {
        &self.layout
    }

    fn level_spec(
        &self,
        env: &dyn EnvInfo,
        params: &SubtaskSpecParams,
        level: usize,
        budget: Budget,
        learned: bool,
    ) -> Result<SubtaskSpec> {
        let observation = env.observation_layout();
        let spaces = observation.dict()?;
        let goal_keys = self.layout.goal_keys(level);

        let mut sizes = Vec::with_capacity(goal_keys.len());
        for key in &goal_keys {
            let space = spaces.get(key).ok_or_else(|| {
                Error::Config(format!("observation space has no key '{}'", key))
            })?;
            sizes.push(space.dim());
        }
        let factorization = Factorization::contiguous(&sizes)?;

        let thresholds = if learned {
            Thresholds::Learned
        } else {
            let by_key = self.layout.thresholds(params, level)?;
            if let Some(extra) = by_key.keys().find(|k| !goal_keys.contains(*k)) {
                return Err(Error::Config(format!(
                    "threshold given for '{}', which is not a goal key",
                    extra
                )));
            }
            let ordered = goal_keys
                .iter()
                .map(|key| {
                    by_key.get(key).copied().ok_or_else(|| {
                        Error::Config(format!("level {} has no threshold for '{}'", level, key))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Thresholds::Fixed(ordered)
        };

        SubtaskSpec::subtask(
            &observation,
            ObservationSelector::Keys(self.layout.partial_obs_keys(level)),
            GoalSource::Keys(goal_keys),
            factorization,
            thresholds,
            budget,
        )
    }

    fn specs(
        &self,
        env: &dyn EnvInfo,
        params: &[&SubtaskSpecParams],
        topology: Topology,
    ) -> Result<Vec<SubtaskSpec>> {
        if !self.layout.supports(topology) {
            return Err(Error::UnsupportedTopology {
                factory: self.layout.name().to_string(),
                topology: topology.to_string(),
            });
        }
        let map = env_goal_map(self, env, params)?;
        assemble_specs(env, params, topology, map, |level, p, budget, learned| {
            self.level_spec(env, p, level, budget, learned)
        })
    }
}

impl<L: DictTaskLayout> SubtaskSpecFactory for DictSubtaskSpecFactory<L> {
    fn name(&self) -> &'static str {
        self.layout.name()
    }

    fn hac_subtask_specs(
        &self,
        env: &dyn EnvInfo,
        params: &[&SubtaskSpecParams],
    ) -> Result<Vec<SubtaskSpec>> {
        self.specs(env, params, Topology::HAC)
    }

    fn hits_subtask_specs(
        &self,
        env: &dyn EnvInfo,
        params: &[&SubtaskSpecParams],
    ) -> Result<Vec<SubtaskSpec>> {
        self.specs(env, params, Topology::HiTS)
    }

    fn map_to_env_goal(&self, env: &dyn EnvInfo) -> Result<GoalMap> {
        let key = match self.layout.env_goal() {
            EnvGoalSource::Key(key) => key,
            EnvGoalSource::AchievedGoal => {
                return env.map_to_achieved_goal().ok_or_else(|| {
                    Error::Config(format!(
                        "{} needs the environment's achieved-goal projection",
                        self.layout.name()
                    ))
                })
            }
        };
        if !env.observation_layout().dict()?.contains_key(key) {
            return Err(Error::Config(format!(
                "observation space has no environment goal key '{}'",
                key
            )));
        }
        Ok(Arc::new(move |obs: &Observation| -> Result<Vec<f64>> {
            Ok(obs.get(key)?.to_vec())
        }))
    }

    fn add_auxiliary_rewards(
        &self,
        specs: &mut [SubtaskSpec],
        params: &[&SubtaskSpecParams],
    ) -> Result<()> {
        add_shared_aux_rewards(specs, params)?;
        for (spec, level_params) in specs.iter_mut().zip(params) {
            for reward in self.layout.extra_aux_rewards(level_params)? {
                spec.add_aux_reward(reward);
            }
        }
        Ok(())
    }
}
