//! Factories turning level parameters into subtask specs.
//!
//! Every factory produces specs for both topologies. The lower levels are
//! task specific; the top level always derives from the environment goal via
//! [`SubtaskSpecFactory::map_to_env_goal`].
//!
//! # Budgets
//!
//! - **HAC**: every level has `max_n_actions`. A `-1` on the lowest level is
//!   derived as the episode budget divided by the product of the budgets of
//!   all other levels.
//! - **HiTS**: levels below the top have `delta_t_max` (and optionally
//!   `delta_t_min`, default 0). A `-1` on the second-highest level is derived
//!   as the episode budget divided by the top level's action budget.
//! - **Top level**: `-1` means the episode budget, `"None"` no limit.

mod box_factory;
mod dict_factory;
mod registry;
pub mod tasks;

pub use box_factory::{BoxSubtaskSpecFactory, BoxTaskLayout};
pub use dict_factory::{DictSubtaskSpecFactory, DictTaskLayout, EnvGoalSource};
pub use registry::{FactoryConstructor, FactoryRegistry};

use crate::aux_rewards::AuxReward;
use crate::env_info::EnvInfo;
use crate::error::{Error, Result};
use crate::params::{BudgetParam, GraphParams, SubtaskSpecParams, TimeBudgetParam, Topology};
use crate::spec::{Budget, GoalMap, SubtaskSpec};
use std::sync::Arc;

/// Produces the ordered subtask specs (lowest level first) of a hierarchy.
pub trait SubtaskSpecFactory: Send + Sync {
    /// Name under which the factory is registered.
    fn name(&self) -> &'static str;

    /// Specs for a HAC hierarchy.
    fn hac_subtask_specs(
        &self,
        env: &dyn EnvInfo,
        params: &[&SubtaskSpecParams],
    ) -> Result<Vec<SubtaskSpec>>;

    /// Specs for a HiTS hierarchy.
    fn hits_subtask_specs(
        &self,
        env: &dyn EnvInfo,
        params: &[&SubtaskSpecParams],
    ) -> Result<Vec<SubtaskSpec>>;

    /// Projection from a full observation to the environment's end goal.
    fn map_to_env_goal(&self, env: &dyn EnvInfo) -> Result<GoalMap>;

    /// Attaches auxiliary rewards configured in the level parameters.
    fn add_auxiliary_rewards(
        &self,
        specs: &mut [SubtaskSpec],
        params: &[&SubtaskSpecParams],
    ) -> Result<()> {
        add_shared_aux_rewards(specs, params)
    }

    /// Builds and finalizes the specs of every level.
    fn produce(
        &self,
        env: &dyn EnvInfo,
        graph_params: &GraphParams,
    ) -> Result<Vec<Arc<SubtaskSpec>>> {
        graph_params.validate()?;
        let params = graph_params.subtask_spec_params();
        let mut specs = match graph_params.algorithm {
            Topology::HAC => self.hac_subtask_specs(env, &params)?,
            Topology::HiTS => self.hits_subtask_specs(env, &params)?,
        };
        if specs.len() != graph_params.n_layers {
            return Err(Error::Config(format!(
                "{} produced {} specs for {} layers",
                self.name(),
                specs.len(),
                graph_params.n_layers
            )));
        }
        self.add_auxiliary_rewards(&mut specs, &params)?;

        log::info!(
            "{} produced {} {} subtask specs",
            self.name(),
            specs.len(),
            graph_params.algorithm
        );
        Ok(specs.into_iter().map(Arc::new).collect())
    }
}

/// The environment goal projection of `factory`, unless the top level is
/// rewarded by the environment and never needs one.
pub fn env_goal_map<F: SubtaskSpecFactory + ?Sized>(
    factory: &F,
    env: &dyn EnvInfo,
    params: &[&SubtaskSpecParams],
) -> Result<Option<GoalMap>> {
    match params.last() {
        Some(top) if top.uses_env_reward() => Ok(None),
        _ => factory.map_to_env_goal(env).map(Some),
    }
}

/// Builds the specs of a hierarchy from a per-level constructor.
///
/// `level_spec` receives the level index, its parameters, its resolved budget
/// and whether its thresholds are learned by the parent.
pub fn assemble_specs<F>(
    env: &dyn EnvInfo,
    params: &[&SubtaskSpecParams],
    topology: Topology,
    map_to_env_goal: Option<GoalMap>,
    mut level_spec: F,
) -> Result<Vec<SubtaskSpec>>
where
    F: FnMut(usize, &SubtaskSpecParams, Budget, bool) -> Result<SubtaskSpec>,
{
    let (top_params, lower_params) = params
        .split_last()
        .ok_or_else(|| Error::Config("a hierarchy needs at least one level".into()))?;
    let max_episode_length = env.max_episode_length();

    let budgets = match topology {
        Topology::HAC => hac_budgets(max_episode_length, params)?,
        Topology::HiTS => hits_budgets(max_episode_length, params)?,
    };

    let mut specs = Vec::with_capacity(params.len());
    for (level, (level_params, budget)) in lower_params.iter().copied().zip(budgets).enumerate() {
        let learned = child_thresholds_learned(params, level);
        specs.push(level_spec(level, level_params, budget, learned)?);
    }
    specs.push(top_level_spec(env, top_params, map_to_env_goal)?);
    Ok(specs)
}

/// The top level's action budget.
pub fn top_budget(max_episode_length: usize, params: &SubtaskSpecParams) -> Result<Option<usize>> {
    match params.max_n_actions {
        Some(BudgetParam::Derive) => Ok(Some(max_episode_length)),
        Some(BudgetParam::Fixed(n)) => Ok(Some(n)),
        Some(BudgetParam::Unbounded) => Ok(None),
        None => Err(Error::Config("the top level needs max_n_actions".into())),
    }
}

/// Action budgets of the levels below the top for a HAC hierarchy.
pub fn hac_budgets(max_episode_length: usize, params: &[&SubtaskSpecParams]) -> Result<Vec<Budget>> {
    let n = params.len();
    let top = params
        .last()
        .ok_or_else(|| Error::Config("a hierarchy needs at least one level".into()))?;
    let mut budgets: Vec<Option<usize>> = Vec::with_capacity(n);
    let mut derive_lowest = false;

    for (level, level_params) in params[..n - 1].iter().enumerate() {
        match level_params.max_n_actions {
            Some(BudgetParam::Fixed(k)) => budgets.push(Some(k)),
            Some(BudgetParam::Derive) if level == 0 => {
                derive_lowest = true;
                budgets.push(None);
            }
            Some(BudgetParam::Derive) => {
                return Err(Error::Config(format!(
                    "max_n_actions = -1 is only allowed on the lowest level, found on level {}",
                    level
                )))
            }
            Some(BudgetParam::Unbounded) => {
                return Err(Error::Config(format!(
                    "only the top level may have an unbounded budget, level {} has \"None\"",
                    level
                )))
            }
            None => {
                return Err(Error::Config(format!("level {} needs max_n_actions", level)))
            }
        }
    }

    if derive_lowest {
        let top = top_budget(max_episode_length, top)?.ok_or_else(|| {
            Error::Config(
                "cannot derive the lowest level's budget under an unbounded top level".into(),
            )
        })?;
        let product = budgets[1..]
            .iter()
            .flatten()
            .try_fold(top, |acc: usize, b: &usize| acc.checked_mul(*b))
            .ok_or_else(|| {
                Error::Config("the budgets above the lowest level overflow when multiplied".into())
            })?;
        if product == 0 {
            return Err(Error::Config(
                "cannot derive the lowest level's budget from a zero budget above it".into(),
            ));
        }
        let derived = max_episode_length / product;
        if max_episode_length % product != 0 {
            log::warn!(
                "Episode budget {} is not divisible by {}; lowest level gets {} actions",
                max_episode_length,
                product,
                derived
            );
        }
        if derived == 0 {
            return Err(Error::Config(format!(
                "derived lowest-level budget is zero (episode budget {} < {})",
                max_episode_length, product
            )));
        }
        log::debug!("Derived lowest-level max_n_actions = {}", derived);
        budgets[0] = Some(derived);
    }

    Ok(budgets.into_iter().map(Budget::Actions).collect())
}

/// Time budgets of the levels below the top for a HiTS hierarchy.
pub fn hits_budgets(max_episode_length: usize, params: &[&SubtaskSpecParams]) -> Result<Vec<Budget>> {
    let n = params.len();
    let top = params
        .last()
        .ok_or_else(|| Error::Config("a hierarchy needs at least one level".into()))?;

    params[..n - 1]
        .iter()
        .enumerate()
        .map(|(level, level_params)| -> Result<Budget> {
            let delta_t_max = match level_params.delta_t_max {
                Some(TimeBudgetParam::Fixed(t)) => t,
                Some(TimeBudgetParam::Derive) if level + 2 == n => {
                    let top = top_budget(max_episode_length, top)?.ok_or_else(|| {
                        Error::Config(
                            "cannot derive delta_t_max under an unbounded top level".into(),
                        )
                    })?;
                    let derived = max_episode_length as f64 / top as f64;
                    log::debug!("Derived delta_t_max = {} on level {}", derived, level);
                    derived
                }
                Some(TimeBudgetParam::Derive) => {
                    return Err(Error::Config(format!(
                        "delta_t_max = -1 is only allowed on the second-highest level, found on level {}",
                        level
                    )))
                }
                None => {
                    return Err(Error::Config(format!("level {} needs delta_t_max", level)))
                }
            };
            Ok(Budget::Time {
                delta_t_min: level_params.delta_t_min.unwrap_or(0.0),
                delta_t_max,
            })
        })
        .collect()
}

/// Whether the parent of `level` chooses its goal tolerances.
pub fn child_thresholds_learned(params: &[&SubtaskSpecParams], level: usize) -> bool {
    params
        .get(level + 1)
        .is_some_and(|parent| parent.learn_goal_ach_thresholds)
}

/// The top level's spec, derived from the environment goal.
pub fn top_level_spec(
    env: &dyn EnvInfo,
    params: &SubtaskSpecParams,
    map_to_env_goal: Option<GoalMap>,
) -> Result<SubtaskSpec> {
    let budget = top_budget(env.max_episode_length(), params)?;
    if params.uses_env_reward() {
        SubtaskSpec::env_reward(env.goal_space(), env.goal_thresholds(), budget)
    } else {
        let map_to_env_goal = map_to_env_goal.ok_or_else(|| {
            Error::Config(
                "the top level pursues the environment goal but no goal projection exists".into(),
            )
        })?;
        SubtaskSpec::env_goal(
            map_to_env_goal,
            env.goal_space(),
            env.goal_thresholds(),
            budget,
            params.constant_failure_return,
        )
    }
}

/// Attaches the goal tolerance, delta-t and constant rewards.
pub fn add_shared_aux_rewards(
    specs: &mut [SubtaskSpec],
    params: &[&SubtaskSpecParams],
) -> Result<()> {
    for (level, (spec, level_params)) in specs.iter_mut().zip(params).enumerate() {
        if level_params.learn_goal_ach_thresholds {
            let weight = level_params.goal_tol_rew.ok_or_else(|| {
                Error::Config(format!(
                    "level {} learns goal tolerances but has no goal_tol_rew",
                    level
                ))
            })?;
            spec.add_aux_reward(AuxReward::GoalTolerance { weight });
        }
        if let Some(weight) = level_params.weight_delta_t_ach_aux {
            spec.add_aux_reward(AuxReward::DeltaTAchieved { weight });
        }
        if let Some(value) = level_params.constant_reward {
            spec.add_aux_reward(AuxReward::Constant { value });
        }
    }
    Ok(())
}
