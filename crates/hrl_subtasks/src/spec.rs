//! Subtask specifications.
//!
//! A [`SubtaskSpec`] tells one level of a hierarchy what it sees (a partial
//! observation), what its goals are (a projection of that observation into a
//! goal space), when a goal counts as achieved, and how long it may pursue
//! one. Specs are immutable once a factory has attached auxiliary rewards and
//! are shared read-only through `Arc` by the graph nodes.

use crate::aux_rewards::{AuxReward, AuxRewardContext};
use crate::error::{Error, Result};
use crate::factorization::Factorization;
use crate::observation::{Observation, ObservationLayout};
use hac_envs::BoxSpace;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Maps a (partial) observation to a goal vector.
pub type GoalMap = Arc<dyn Fn(&Observation) -> Result<Vec<f64>> + Send + Sync>;

/// A custom projection from partial observations into a bespoke goal space.
///
/// Used where goals are not a plain subset of the observation, e.g. an angle
/// recovered from its `(cos, sin)` encoding.
#[derive(Clone)]
pub struct SubgoalProjection {
    map: GoalMap,
    goal_space: BoxSpace,
}

impl SubgoalProjection {
    pub fn new<F>(goal_space: BoxSpace, map: F) -> Self
    where
        F: Fn(&Observation) -> Result<Vec<f64>> + Send + Sync + 'static,
    {
        Self {
            map: Arc::new(map),
            goal_space,
        }
    }

    pub fn goal_space(&self) -> &BoxSpace {
        &self.goal_space
    }

    /// Applies the projection and checks the goal's length.
    pub fn project(&self, partial_obs: &Observation) -> Result<Vec<f64>> {
        let goal = (self.map)(partial_obs)?;
        if goal.len() != self.goal_space.dim() {
            return Err(Error::dimension("projected goal", self.goal_space.dim(), goal.len()));
        }
        Ok(goal)
    }
}

impl fmt::Debug for SubgoalProjection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubgoalProjection")
            .field("goal_space", &self.goal_space)
            .finish_non_exhaustive()
    }
}

/// Which parts of the observation a level sees.
#[derive(Debug, Clone, PartialEq)]
pub enum ObservationSelector {
    All,
    Indices(Vec<usize>),
    Keys(BTreeSet<String>),
}

/// How a level's goals are derived from its partial observation.
#[derive(Debug, Clone)]
pub enum GoalSource {
    /// Coordinates of the full observation, which must be visible to the level.
    Indices(Vec<usize>),
    /// Dict components, flattened in sorted key order.
    Keys(BTreeSet<String>),
    Projection(SubgoalProjection),
}

/// Goal achievement thresholds, one per factorization group.
#[derive(Debug, Clone, PartialEq)]
pub enum Thresholds {
    Fixed(Vec<f64>),
    /// Chosen by the parent level together with each subgoal.
    Learned,
}

/// How long a level may pursue one goal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Budget {
    /// At most this many actions; `None` is unbounded.
    Actions(Option<usize>),
    /// A goal must be reached in `[delta_t_min, delta_t_max]` primitive steps.
    Time { delta_t_min: f64, delta_t_max: f64 },
}

/// The kind of level a spec describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecRole {
    /// A level pursuing subgoals from its parent.
    Subtask,
    /// The top level, pursuing the environment's end goal along a shortest path.
    EnvShortestPath { constant_failure_return: bool },
    /// The top level, maximizing the environment's own reward.
    EnvRewardMachine,
}

/// The specification of one level's subtask.
#[derive(Debug, Clone)]
pub struct SubtaskSpec {
    role: SpecRole,
    partial_obs: ObservationSelector,
    goal: Option<GoalSource>,
    goal_positions: Vec<usize>,
    goal_space: BoxSpace,
    factorization: Factorization,
    thresholds: Thresholds,
    budget: Budget,
    aux_rewards: Vec<AuxReward>,
}

impl SubtaskSpec {
    /// A level pursuing subgoals set by its parent.
    pub fn subtask(
        layout: &ObservationLayout,
        partial_obs: ObservationSelector,
        goal: GoalSource,
        factorization: Factorization,
        thresholds: Thresholds,
        budget: Budget,
    ) -> Result<Self> {
        let goal_positions;
        let goal_space = match &goal {
            GoalSource::Indices(indices) => {
                let space = layout.vector()?;
                goal_positions = goal_positions_in(&partial_obs, indices, space.dim())?;
                space.select(indices)?
            }
            GoalSource::Keys(keys) => {
                let spaces = layout.dict()?;
                if let ObservationSelector::Keys(visible) = &partial_obs {
                    if let Some(hidden) = keys.iter().find(|k| !visible.contains(*k)) {
                        return Err(Error::Config(format!(
                            "goal key '{}' is not part of the partial observation",
                            hidden
                        )));
                    }
                }
                if let Some(missing) = keys.iter().find(|k| !spaces.contains_key(*k)) {
                    return Err(Error::Config(format!(
                        "observation space has no key '{}'",
                        missing
                    )));
                }
                goal_positions = Vec::new();
                layout.concat(&keys.iter().cloned().collect::<Vec<_>>())?
            }
            GoalSource::Projection(projection) => {
                goal_positions = Vec::new();
                projection.goal_space().clone()
            }
        };
        check_selector(layout, &partial_obs)?;

        let spec = Self {
            role: SpecRole::Subtask,
            partial_obs,
            goal: Some(goal),
            goal_positions,
            goal_space,
            factorization,
            thresholds,
            budget,
            aux_rewards: Vec::new(),
        };
        spec.validate()?;
        Ok(spec)
    }

    /// The top level, pursuing the environment's end goal.
    ///
    /// Achievement uses one group per goal coordinate, matching the
    /// environment's own sparse reward.
    pub fn env_goal(
        map_to_env_goal: GoalMap,
        goal_space: BoxSpace,
        thresholds: Vec<f64>,
        max_n_actions: Option<usize>,
        constant_failure_return: bool,
    ) -> Result<Self> {
        let factorization = Factorization::singletons(goal_space.dim());
        let spec = Self {
            role: SpecRole::EnvShortestPath {
                constant_failure_return,
            },
            partial_obs: ObservationSelector::All,
            goal: Some(GoalSource::Projection(SubgoalProjection {
                map: map_to_env_goal,
                goal_space: goal_space.clone(),
            })),
            goal_positions: Vec::new(),
            goal_space,
            factorization,
            thresholds: Thresholds::Fixed(thresholds),
            budget: Budget::Actions(max_n_actions),
            aux_rewards: Vec::new(),
        };
        spec.validate()?;
        Ok(spec)
    }

    /// The top level, rewarded directly by the environment.
    pub fn env_reward(
        goal_space: BoxSpace,
        thresholds: Vec<f64>,
        max_n_actions: Option<usize>,
    ) -> Result<Self> {
        let factorization = Factorization::singletons(goal_space.dim());
        let spec = Self {
            role: SpecRole::EnvRewardMachine,
            partial_obs: ObservationSelector::All,
            goal: None,
            goal_positions: Vec::new(),
            goal_space,
            factorization,
            thresholds: Thresholds::Fixed(thresholds),
            budget: Budget::Actions(max_n_actions),
            aux_rewards: Vec::new(),
        };
        spec.validate()?;
        Ok(spec)
    }

    fn validate(&self) -> Result<()> {
        if self.factorization.dim() != self.goal_space.dim() {
            return Err(Error::InvalidFactorization(format!(
                "factorization covers {} dimensions, goal space has {}",
                self.factorization.dim(),
                self.goal_space.dim()
            )));
        }
        if let Thresholds::Fixed(thresholds) = &self.thresholds {
            if thresholds.len() != self.factorization.len() {
                return Err(Error::dimension(
                    "goal achievement thresholds",
                    self.factorization.len(),
                    thresholds.len(),
                ));
            }
            if thresholds.iter().any(|t| t.is_nan() || *t < 0.0) {
                return Err(Error::Config(
                    "goal achievement thresholds must be non-negative".into(),
                ));
            }
        }
        match self.budget {
            Budget::Actions(Some(0)) => {
                Err(Error::Config("max_n_actions must be positive".into()))
            }
            Budget::Time {
                delta_t_min,
                delta_t_max,
            } if !(delta_t_min >= 0.0 && delta_t_min <= delta_t_max && delta_t_max > 0.0) => {
                Err(Error::Config(format!(
                    "time budget requires 0 <= delta_t_min <= delta_t_max and delta_t_max > 0, got [{}, {}]",
                    delta_t_min, delta_t_max
                )))
            }
            _ => Ok(()),
        }
    }

    /// Attaches an auxiliary reward term.
    pub fn add_aux_reward(&mut self, reward: AuxReward) {
        self.aux_rewards.push(reward);
    }

    // ==================== Observation and goals ====================

    /// The part of `obs` visible to this level.
    pub fn partial_observation(&self, obs: &Observation) -> Result<Observation> {
        match &self.partial_obs {
            ObservationSelector::All => Ok(obs.clone()),
            ObservationSelector::Indices(indices) => {
                let v = obs.as_vector()?;
                indices
                    .iter()
                    .map(|&i| {
                        v.get(i).copied().ok_or_else(|| {
                            Error::Observation(format!(
                                "index {} out of range for a {}-dimensional observation",
                                i,
                                v.len()
                            ))
                        })
                    })
                    .collect::<Result<Vec<_>>>()
                    .map(Observation::Vector)
            }
            ObservationSelector::Keys(keys) => {
                let mut map = std::collections::BTreeMap::new();
                for key in keys {
                    map.insert(key.clone(), obs.get(key)?.to_vec());
                }
                Ok(Observation::Dict(map))
            }
        }
    }

    /// Projects a partial observation into this level's goal space.
    pub fn map_to_goal(&self, partial_obs: &Observation) -> Result<Vec<f64>> {
        match &self.goal {
            Some(GoalSource::Indices(_)) => {
                let v = partial_obs.as_vector()?;
                self.goal_positions
                    .iter()
                    .map(|&p| {
                        v.get(p).copied().ok_or_else(|| {
                            Error::dimension("partial observation", p + 1, v.len())
                        })
                    })
                    .collect()
            }
            Some(GoalSource::Keys(keys)) => {
                let mut goal = Vec::with_capacity(self.goal_space.dim());
                for key in keys {
                    goal.extend_from_slice(partial_obs.get(key)?);
                }
                Ok(goal)
            }
            Some(GoalSource::Projection(projection)) => projection.project(partial_obs),
            None => Err(Error::Config(
                "a level rewarded by the environment has no goal projection".into(),
            )),
        }
    }

    /// Per-group distances between achieved and desired goal.
    pub fn goal_distances(&self, achieved: &[f64], desired: &[f64]) -> Result<Vec<f64>> {
        self.factorization.distances(achieved, desired)
    }

    /// Whether `achieved` is within the fixed thresholds of `desired`.
    pub fn goal_achieved(&self, achieved: &[f64], desired: &[f64]) -> Result<bool> {
        match &self.thresholds {
            Thresholds::Fixed(thresholds) => {
                self.factorization.achieved(achieved, desired, thresholds)
            }
            Thresholds::Learned => Err(Error::Config(
                "thresholds are learned; use goal_achieved_within with the parent's tolerances"
                    .into(),
            )),
        }
    }

    /// Whether `achieved` is within the given per-group tolerances of `desired`.
    pub fn goal_achieved_within(
        &self,
        achieved: &[f64],
        desired: &[f64],
        tolerances: &[f64],
    ) -> Result<bool> {
        self.factorization.achieved(achieved, desired, tolerances)
    }

    /// Sum of all auxiliary reward terms for one transition.
    pub fn auxiliary_reward(&self, ctx: &AuxRewardContext<'_>) -> Result<f64> {
        let mut total = 0.0;
        for reward in &self.aux_rewards {
            total += reward.evaluate(ctx)?;
        }
        Ok(total)
    }

    // ==================== Accessors ====================

    pub fn role(&self) -> SpecRole {
        self.role
    }

    /// Whether this spec is derived from the environment (the top level).
    pub fn is_env_level(&self) -> bool {
        !matches!(self.role, SpecRole::Subtask)
    }

    pub fn constant_failure_return(&self) -> bool {
        matches!(
            self.role,
            SpecRole::EnvShortestPath {
                constant_failure_return: true
            }
        )
    }

    pub fn partial_obs_selector(&self) -> &ObservationSelector {
        &self.partial_obs
    }

    pub fn goal_source(&self) -> Option<&GoalSource> {
        self.goal.as_ref()
    }

    pub fn goal_space(&self) -> &BoxSpace {
        &self.goal_space
    }

    /// The action space of the parent level, i.e. this level's goal space.
    pub fn parent_action_space(&self) -> &BoxSpace {
        &self.goal_space
    }

    pub fn factorization(&self) -> &Factorization {
        &self.factorization
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn budget(&self) -> Budget {
        self.budget
    }

    /// The action budget, `None` if unbounded or time-budgeted.
    pub fn max_n_actions(&self) -> Option<usize> {
        match self.budget {
            Budget::Actions(n) => n,
            Budget::Time { .. } => None,
        }
    }

    pub fn delta_t_max(&self) -> Option<f64> {
        match self.budget {
            Budget::Time { delta_t_max, .. } => Some(delta_t_max),
            Budget::Actions(_) => None,
        }
    }

    pub fn delta_t_min(&self) -> Option<f64> {
        match self.budget {
            Budget::Time { delta_t_min, .. } => Some(delta_t_min),
            Budget::Actions(_) => None,
        }
    }

    pub fn aux_rewards(&self) -> &[AuxReward] {
        &self.aux_rewards
    }
}

/// Positions of the goal indices within the partial observation vector.
fn goal_positions_in(
    partial_obs: &ObservationSelector,
    goal_indices: &[usize],
    obs_dim: usize,
) -> Result<Vec<usize>> {
    goal_indices
        .iter()
        .map(|&g| {
            if g >= obs_dim {
                return Err(Error::Config(format!(
                    "goal index {} out of range for a {}-dimensional observation",
                    g, obs_dim
                )));
            }
            match partial_obs {
                ObservationSelector::All => Ok(g),
                ObservationSelector::Indices(visible) => {
                    visible.iter().position(|&v| v == g).ok_or_else(|| {
                        Error::Config(format!(
                            "goal index {} is not part of the partial observation",
                            g
                        ))
                    })
                }
                ObservationSelector::Keys(_) => Err(Error::Config(
                    "goal indices require an index-based partial observation".into(),
                )),
            }
        })
        .collect()
}

fn check_selector(layout: &ObservationLayout, selector: &ObservationSelector) -> Result<()> {
    match selector {
        ObservationSelector::All => Ok(()),
        ObservationSelector::Indices(indices) => {
            let dim = layout.vector()?.dim();
            match indices.iter().find(|&&i| i >= dim) {
                Some(i) => Err(Error::Config(format!(
                    "partial observation index {} out of range for a {}-dimensional observation",
                    i, dim
                ))),
                None => Ok(()),
            }
        }
        ObservationSelector::Keys(keys) => {
            let spaces = layout.dict()?;
            match keys.iter().find(|k| !spaces.contains_key(*k)) {
                Some(k) => Err(Error::Config(format!("observation space has no key '{}'", k))),
                None => Ok(()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn vector_layout(dim: usize) -> ObservationLayout {
        ObservationLayout::Vector(BoxSpace::symmetric(vec![10.0; dim]).unwrap())
    }

    fn keys(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    // ==================== Construction Tests ====================

    #[test]
    fn test_goal_indices_must_be_visible() {
        let err = SubtaskSpec::subtask(
            &vector_layout(4),
            ObservationSelector::Indices(vec![0, 1]),
            GoalSource::Indices(vec![2]),
            Factorization::singletons(1),
            Thresholds::Fixed(vec![0.1]),
            Budget::Actions(Some(10)),
        )
        .unwrap_err();
        assert!(err.to_string().contains("goal index 2"));
    }

    #[test]
    fn test_threshold_cardinality() {
        let err = SubtaskSpec::subtask(
            &vector_layout(3),
            ObservationSelector::All,
            GoalSource::Indices(vec![0, 1]),
            Factorization::singletons(2),
            Thresholds::Fixed(vec![0.1]),
            Budget::Actions(Some(10)),
        )
        .unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 2, found: 1, .. }));
    }

    #[test]
    fn test_factorization_must_match_goal_space() {
        let err = SubtaskSpec::subtask(
            &vector_layout(3),
            ObservationSelector::All,
            GoalSource::Indices(vec![0, 1]),
            Factorization::singletons(3),
            Thresholds::Learned,
            Budget::Actions(Some(10)),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidFactorization(_)));
    }

    #[test]
    fn test_time_budget_checked() {
        let result = SubtaskSpec::subtask(
            &vector_layout(2),
            ObservationSelector::All,
            GoalSource::Indices(vec![0]),
            Factorization::singletons(1),
            Thresholds::Fixed(vec![0.1]),
            Budget::Time {
                delta_t_min: 5.0,
                delta_t_max: 2.0,
            },
        );
        assert!(result.is_err());
    }

    // ==================== Goal Mapping Tests ====================

    #[test]
    fn test_index_goal_mapping() {
        let spec = SubtaskSpec::subtask(
            &vector_layout(5),
            ObservationSelector::Indices(vec![4, 2, 0]),
            GoalSource::Indices(vec![0, 4]),
            Factorization::singletons(2),
            Thresholds::Fixed(vec![0.1, 0.1]),
            Budget::Actions(Some(10)),
        )
        .unwrap();
        let obs = Observation::Vector(vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        let partial = spec.partial_observation(&obs).unwrap();
        assert_eq!(partial, Observation::Vector(vec![4.0, 2.0, 0.0]));
        assert_eq!(spec.map_to_goal(&partial).unwrap(), vec![0.0, 4.0]);
        assert_eq!(spec.goal_space().dim(), 2);
    }

    #[test]
    fn test_key_goal_mapping() {
        let mut spaces = BTreeMap::new();
        spaces.insert("position".to_string(), BoxSpace::symmetric(vec![1.0]).unwrap());
        spaces.insert("velocity".to_string(), BoxSpace::symmetric(vec![2.0]).unwrap());
        spaces.insert("platform".to_string(), BoxSpace::symmetric(vec![3.0, 3.0]).unwrap());
        let layout = ObservationLayout::Dict(spaces);
        let spec = SubtaskSpec::subtask(
            &layout,
            ObservationSelector::Keys(keys(&["position", "velocity"])),
            GoalSource::Keys(keys(&["velocity", "position"])),
            Factorization::contiguous(&[1, 1]).unwrap(),
            Thresholds::Fixed(vec![0.1, 0.2]),
            Budget::Actions(Some(5)),
        )
        .unwrap();

        let mut obs = BTreeMap::new();
        obs.insert("position".to_string(), vec![0.3]);
        obs.insert("velocity".to_string(), vec![-0.5]);
        obs.insert("platform".to_string(), vec![1.0, 1.0]);
        let partial = spec.partial_observation(&Observation::Dict(obs)).unwrap();
        assert!(partial.get("platform").is_err());
        // sorted key order: position before velocity
        assert_eq!(spec.map_to_goal(&partial).unwrap(), vec![0.3, -0.5]);
        assert_eq!(spec.goal_space().high(), &[1.0, 2.0]);
    }

    #[test]
    fn test_projection_goal_mapping() {
        let projection = SubgoalProjection::new(BoxSpace::symmetric(vec![1.0]).unwrap(), |obs| {
            Ok(vec![obs.as_vector()?.iter().sum()])
        });
        let spec = SubtaskSpec::subtask(
            &vector_layout(3),
            ObservationSelector::All,
            GoalSource::Projection(projection),
            Factorization::singletons(1),
            Thresholds::Fixed(vec![0.1]),
            Budget::Actions(Some(10)),
        )
        .unwrap();
        let goal = spec.map_to_goal(&Observation::Vector(vec![0.1, 0.2, 0.3])).unwrap();
        assert!((goal[0] - 0.6).abs() < 1e-12);
    }

    // ==================== Achievement Tests ====================

    #[test]
    fn test_learned_thresholds_need_tolerances() {
        let spec = SubtaskSpec::subtask(
            &vector_layout(2),
            ObservationSelector::All,
            GoalSource::Indices(vec![0, 1]),
            Factorization::singletons(2),
            Thresholds::Learned,
            Budget::Time {
                delta_t_min: 0.0,
                delta_t_max: 10.0,
            },
        )
        .unwrap();
        assert!(spec.goal_achieved(&[0.0, 0.0], &[0.0, 0.0]).is_err());
        assert!(spec
            .goal_achieved_within(&[0.0, 0.05], &[0.0, 0.0], &[0.1, 0.1])
            .unwrap());
        assert_eq!(spec.delta_t_max(), Some(10.0));
        assert_eq!(spec.max_n_actions(), None);
    }

    #[test]
    fn test_env_goal_spec() {
        let map: GoalMap = Arc::new(|obs: &Observation| -> Result<Vec<f64>> {
            Ok(obs.as_vector()?[..2].to_vec())
        });
        let spec = SubtaskSpec::env_goal(
            map,
            BoxSpace::symmetric(vec![5.0, 5.0]).unwrap(),
            vec![0.5, 0.5],
            None,
            true,
        )
        .unwrap();
        assert!(spec.is_env_level());
        assert!(spec.constant_failure_return());
        assert_eq!(spec.max_n_actions(), None);
        let goal = spec.map_to_goal(&Observation::Vector(vec![1.0, 2.0, 3.0])).unwrap();
        assert!(spec.goal_achieved(&goal, &[1.2, 1.7]).unwrap());
        assert!(!spec.goal_achieved(&goal, &[1.2, 2.7]).unwrap());
    }

    #[test]
    fn test_env_reward_spec_has_no_goal() {
        let spec =
            SubtaskSpec::env_reward(BoxSpace::symmetric(vec![1.0]).unwrap(), vec![0.1], Some(50))
                .unwrap();
        assert_eq!(spec.role(), SpecRole::EnvRewardMachine);
        assert!(spec.map_to_goal(&Observation::Vector(vec![0.0])).is_err());
    }

    #[test]
    fn test_auxiliary_rewards_sum() {
        let mut spec = SubtaskSpec::env_reward(
            BoxSpace::symmetric(vec![1.0]).unwrap(),
            vec![0.1],
            Some(50),
        )
        .unwrap();
        spec.add_aux_reward(AuxReward::Constant { value: -0.25 });
        spec.add_aux_reward(AuxReward::DeltaTAchieved { weight: 0.5 });
        let obs = Observation::Vector(vec![0.0]);
        let ctx = AuxRewardContext {
            observation: &obs,
            action: &[],
            goal_tolerances: None,
            delta_t_achieved: Some(1.0),
        };
        assert_eq!(spec.auxiliary_reward(&ctx).unwrap(), -0.75);
    }
}
