//! Run and graph parameters as stored in a run directory.
//!
//! A run directory holds `run_params.json` (environment, step budget, seed,
//! scheduler options), `graph_params.json` (topology, layer count, factory
//! name and one entry per level) and optionally `varied_hp.json` (the
//! hyperparameters a sweep varied, kept for bookkeeping).
//!
//! Budgets use sentinels: `-1` asks for a derived value and `"None"` for an
//! unbounded one.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

/// Hierarchy topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Topology {
    /// Hierarchical Actor-Critic: every level has an action budget.
    HAC,
    /// Hierarchical reinforcement learning with Timed Subgoals: levels below
    /// the top have a time budget.
    HiTS,
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topology::HAC => write!(f, "HAC"),
            Topology::HiTS => write!(f, "HiTS"),
        }
    }
}

/// An action budget as configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawBudget", into = "RawBudget")]
pub enum BudgetParam {
    /// `-1`: derive from the episode budget.
    Derive,
    Fixed(usize),
    /// `"None"`: no limit.
    Unbounded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawBudget {
    Int(i64),
    Text(String),
}

impl TryFrom<RawBudget> for BudgetParam {
    type Error = Error;

    fn try_from(raw: RawBudget) -> Result<Self> {
        match raw {
            RawBudget::Int(-1) => Ok(BudgetParam::Derive),
            RawBudget::Int(n) if n > 0 => Ok(BudgetParam::Fixed(n as usize)),
            RawBudget::Text(s) if s == "None" => Ok(BudgetParam::Unbounded),
            RawBudget::Int(n) => Err(Error::Config(format!(
                "max_n_actions must be positive, -1 or \"None\", got {}",
                n
            ))),
            RawBudget::Text(s) => Err(Error::Config(format!(
                "max_n_actions must be positive, -1 or \"None\", got \"{}\"",
                s
            ))),
        }
    }
}

impl From<BudgetParam> for RawBudget {
    fn from(budget: BudgetParam) -> Self {
        match budget {
            BudgetParam::Derive => RawBudget::Int(-1),
            BudgetParam::Fixed(n) => RawBudget::Int(n as i64),
            BudgetParam::Unbounded => RawBudget::Text("None".into()),
        }
    }
}

/// A time budget (`delta_t_max`) as configured.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub enum TimeBudgetParam {
    /// `-1`: derive from the episode budget and the top level's action budget.
    Derive,
    Fixed(f64),
}

impl TryFrom<f64> for TimeBudgetParam {
    type Error = Error;

    fn try_from(value: f64) -> Result<Self> {
        if value == -1.0 {
            Ok(TimeBudgetParam::Derive)
        } else if value > 0.0 {
            Ok(TimeBudgetParam::Fixed(value))
        } else {
            Err(Error::Config(format!(
                "delta_t_max must be positive or -1, got {}",
                value
            )))
        }
    }
}

impl From<TimeBudgetParam> for f64 {
    fn from(budget: TimeBudgetParam) -> Self {
        match budget {
            TimeBudgetParam::Derive => -1.0,
            TimeBudgetParam::Fixed(v) => v,
        }
    }
}

/// Goal achievement thresholds as configured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ThresholdParam {
    /// One value for every factorization group.
    Scalar(f64),
    PerGroup(Vec<f64>),
    PerKey(BTreeMap<String, f64>),
}

impl ThresholdParam {
    /// Thresholds for `n_groups` factorization groups.
    pub fn per_group(&self, n_groups: usize) -> Result<Vec<f64>> {
        match self {
            ThresholdParam::Scalar(t) => Ok(vec![*t; n_groups]),
            ThresholdParam::PerGroup(ts) if ts.len() == n_groups => Ok(ts.clone()),
            ThresholdParam::PerGroup(ts) => Err(Error::dimension(
                "goal_achievement_threshold",
                n_groups,
                ts.len(),
            )),
            ThresholdParam::PerKey(_) => Err(Error::Config(
                "per-key thresholds need a dict observation space".into(),
            )),
        }
    }

    /// The single value of a scalar threshold.
    pub fn scalar(&self) -> Result<f64> {
        match self {
            ThresholdParam::Scalar(t) => Ok(*t),
            _ => Err(Error::Config(
                "goal_achievement_threshold must be a single number here".into(),
            )),
        }
    }

    /// Per-key thresholds.
    pub fn per_key(&self) -> Result<&BTreeMap<String, f64>> {
        match self {
            ThresholdParam::PerKey(map) => Ok(map),
            _ => Err(Error::Config(
                "goal_achievement_threshold must map goal keys to thresholds".into(),
            )),
        }
    }
}

/// Parameters of one level's subtask spec (`subtask_spec_params`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubtaskSpecParams {
    /// Action budget; required on HAC levels and the top level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_n_actions: Option<BudgetParam>,

    /// Time budget of a HiTS level below the top.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta_t_max: Option<TimeBudgetParam>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta_t_min: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal_achievement_threshold: Option<ThresholdParam>,

    /// If set, this level chooses the goal tolerances of its child.
    #[serde(default)]
    pub learn_goal_ach_thresholds: bool,

    /// Weight of the tolerance penalty when tolerances are learned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal_tol_rew: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_delta_t_ach_aux: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constant_reward: Option<f64>,

    /// Top level only.
    #[serde(default)]
    pub constant_failure_return: bool,

    /// Top level only: `"EnvRMSubtaskSpec"` selects an environment-reward spec.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub spec_type: Option<String>,

    #[serde(default)]
    pub power_aux_reward: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_aux_reward_factor: Option<f64>,

    /// Anything else, kept for downstream consumers.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl SubtaskSpecParams {
    /// A level with an action budget and a scalar threshold.
    pub fn hac(max_n_actions: BudgetParam, threshold: f64) -> Self {
        Self {
            max_n_actions: Some(max_n_actions),
            goal_achievement_threshold: Some(ThresholdParam::Scalar(threshold)),
            ..Default::default()
        }
    }

    /// A level with a time budget and a scalar threshold.
    pub fn hits(delta_t_max: TimeBudgetParam, threshold: f64) -> Self {
        Self {
            delta_t_max: Some(delta_t_max),
            goal_achievement_threshold: Some(ThresholdParam::Scalar(threshold)),
            ..Default::default()
        }
    }

    /// The top level with the given action budget.
    pub fn top(max_n_actions: BudgetParam) -> Self {
        Self {
            max_n_actions: Some(max_n_actions),
            ..Default::default()
        }
    }

    pub fn with_threshold(mut self, threshold: ThresholdParam) -> Self {
        self.goal_achievement_threshold = Some(threshold);
        self
    }

    pub fn with_learned_child_thresholds(mut self, goal_tol_rew: f64) -> Self {
        self.learn_goal_ach_thresholds = true;
        self.goal_tol_rew = Some(goal_tol_rew);
        self
    }

    /// Whether the top level uses the environment's reward directly.
    pub fn uses_env_reward(&self) -> bool {
        self.spec_type.as_deref() == Some("EnvRMSubtaskSpec")
    }

    pub(crate) fn require_threshold(&self, level: usize) -> Result<&ThresholdParam> {
        self.goal_achievement_threshold.as_ref().ok_or_else(|| {
            Error::Config(format!(
                "level {} needs goal_achievement_threshold",
                level
            ))
        })
    }
}

/// Algorithm parameters of one level (`algo_kwargs`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlgoParams {
    #[serde(default)]
    pub n_hindsight_goals: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buffer_size: Option<usize>,

    /// Scales the derived buffer size; consumed when the size is derived.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buffer_size_factor: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_failure_penalty: Option<f64>,

    /// Other options (learning rates, goal sampling strategy, ...), passed through.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl AlgoParams {
    pub fn with_hindsight_goals(mut self, n: usize) -> Self {
        self.n_hindsight_goals = n;
        self
    }

    pub fn with_buffer_size_factor(mut self, factor: f64) -> Self {
        self.buffer_size_factor = Some(factor);
        self
    }

    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = Some(size);
        self
    }
}

/// Everything configured for one level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelParams {
    pub subtask_spec_params: SubtaskSpecParams,

    #[serde(default)]
    pub algo_kwargs: AlgoParams,

    /// Actor and critic options, passed through.
    #[serde(default)]
    pub model_kwargs: Value,

    /// Name of the level's interruption policy; `"None"` disables it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interruption_policy: Option<String>,
}

impl LevelParams {
    pub fn new(subtask_spec_params: SubtaskSpecParams, algo_kwargs: AlgoParams) -> Self {
        Self {
            subtask_spec_params,
            algo_kwargs,
            ..Default::default()
        }
    }

    /// The configured interruption policy, treating `"None"` as absent.
    pub fn interruption_policy(&self) -> Option<&str> {
        self.interruption_policy
            .as_deref()
            .filter(|name| *name != "None")
    }
}

/// Parameters of the hierarchy (`graph_params.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphParams {
    pub algorithm: Topology,
    pub n_layers: usize,
    pub subtask_spec_factory: String,
    pub level_params_list: Vec<LevelParams>,
}

impl GraphParams {
    /// Checks the layer count against the per-level parameters.
    pub fn validate(&self) -> Result<()> {
        if self.n_layers == 0 {
            return Err(Error::Config("n_layers must be positive".into()));
        }
        if self.level_params_list.len() != self.n_layers {
            return Err(Error::Config(format!(
                "n_layers is {} but level_params_list has {} entries",
                self.n_layers,
                self.level_params_list.len()
            )));
        }
        Ok(())
    }

    /// The subtask spec parameters, lowest level first.
    pub fn subtask_spec_params(&self) -> Vec<&SubtaskSpecParams> {
        self.level_params_list
            .iter()
            .map(|l| &l.subtask_spec_params)
            .collect()
    }
}

/// Parameters of a run (`run_params.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunParams {
    /// Registered environment id.
    pub env: String,
    /// Total number of primitive environment steps.
    pub n_steps: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_frequency: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_test_episodes: Option<u64>,
    /// Wall-clock limit of the session in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_runtime: Option<f64>,
    /// Scheduler and session options, passed through.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl RunParams {
    pub fn new(env: impl Into<String>, n_steps: u64) -> Self {
        Self {
            env: env.into(),
            n_steps,
            seed: None,
            test_frequency: None,
            n_test_episodes: None,
            max_runtime: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// The parameters of a run directory.
#[derive(Debug, Clone, PartialEq)]
pub struct RunDirectory {
    pub run_params: RunParams,
    pub graph_params: GraphParams,
    /// Contents of `varied_hp.json`, if present.
    pub varied_hps: Option<Value>,
}

/// Loads `run_params.json`, `graph_params.json` and, if present,
/// `varied_hp.json` from `dir`.
pub fn load_params(dir: impl AsRef<Path>) -> Result<RunDirectory> {
    let dir = dir.as_ref();
    let run_params: RunParams = read_json(&dir.join("run_params.json"))?;
    let graph_params: GraphParams = read_json(&dir.join("graph_params.json"))?;
    graph_params.validate()?;

    let varied_path = dir.join("varied_hp.json");
    let varied_hps = if varied_path.exists() {
        Some(read_json(&varied_path)?)
    } else {
        None
    };

    log::debug!(
        "Loaded {} graph with {} layers for {} from {}",
        graph_params.algorithm,
        graph_params.n_layers,
        run_params.env,
        dir.display()
    );
    Ok(RunDirectory {
        run_params,
        graph_params,
        varied_hps,
    })
}

/// Writes the parameters of `run` back into `dir`.
pub fn save_params(dir: impl AsRef<Path>, run: &RunDirectory) -> Result<()> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    fs::write(
        dir.join("run_params.json"),
        serde_json::to_string_pretty(&run.run_params)?,
    )?;
    fs::write(
        dir.join("graph_params.json"),
        serde_json::to_string_pretty(&run.graph_params)?,
    )?;
    if let Some(varied) = &run.varied_hps {
        fs::write(dir.join("varied_hp.json"), serde_json::to_string_pretty(varied)?)?;
    }
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}
