//! Factories for environments with flat vector observations.

use super::{assemble_specs, env_goal_map, SubtaskSpecFactory};
use crate::env_info::EnvInfo;
use crate::error::Result;
use crate::factorization::Factorization;
use crate::params::{SubtaskSpecParams, Topology};
use crate::spec::{
    Budget, GoalMap, GoalSource, ObservationSelector, SubgoalProjection, SubtaskSpec, Thresholds,
};

/// The task-specific part of a box factory.
pub trait BoxTaskLayout: Send + Sync {
    /// Registered name of the factory built on this layout.
    fn name(&self) -> &'static str;

    /// Visible coordinates, goal coordinates and goal factorization of `level`.
    ///
    /// Goal indices refer to the full observation.
    fn indices_and_factorization(
        &self,
        obs_dim: usize,
        params: &SubtaskSpecParams,
        level: usize,
    ) -> Result<(ObservationSelector, Vec<usize>, Factorization)>;

    /// A custom goal projection replacing the plain coordinate copy.
    fn subgoal_projection(&self, _obs_dim: usize) -> Result<Option<SubgoalProjection>> {
        Ok(None)
    }

    /// Projection from the observation to the environment goal.
    fn map_to_env_goal(&self, obs_dim: usize) -> Result<GoalMap>;
}

/// A factory for box observations, parameterized by its task layout.
#[derive(Debug, Clone, Default)]
pub struct BoxSubtaskSpecFactory<L> {
    layout: L,
}

impl<L: BoxTaskLayout> BoxSubtaskSpecFactory<L> {
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
        let obs_dim = observation.vector()?.dim();
        let (partial_obs, goal_indices, factorization) =
            self.layout.indices_and_factorization(obs_dim, params, level)?;

        let goal = match self.layout.subgoal_projection(obs_dim)? {
            Some(projection) => GoalSource::Projection(projection),
            None => GoalSource::Indices(goal_indices),
        };
        let thresholds = if learned {
            Thresholds::Learned
        } else {
            Thresholds::Fixed(params.require_threshold(level)?.per_group(factorization.len())?)
        };

        SubtaskSpec::subtask(&observation, partial_obs, goal, factorization, thresholds, budget)
    }

    fn specs(
        &self,
        env: &dyn EnvInfo,
        params: &[&SubtaskSpecParams],
        topology: Topology,
    ) -> Result<Vec<SubtaskSpec>> {
        let map = env_goal_map(self, env, params)?;
        assemble_specs(env, params, topology, map, |level, p, budget, learned| {
            self.level_spec(env, p, level, budget, learned)
        })
    }
}

impl<L: BoxTaskLayout> SubtaskSpecFactory for BoxSubtaskSpecFactory<L> {
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
        let obs_dim = env.observation_layout().vector()?.dim();
        self.layout.map_to_env_goal(obs_dim)
    }
}
