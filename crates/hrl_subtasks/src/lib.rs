#![doc = include_str!("../README.md")]
//! ## Modules
//!
//! - [`spec`]: the per-level [`SubtaskSpec`]
//! - [`factorization`]: goal space partitions used for achievement checks
//! - [`factory`]: HAC/HiTS spec factories and the [`FactoryRegistry`]
//! - [`params`]: JSON run and graph parameters
//! - [`buffer`]: replay buffer sizing
//! - [`graph`]: the assembled [`HierarchyGraph`]
//!
//! ## Quick Start
//!
//! ```rust
//! use hac_envs::KinematicModels;
//! use hrl_subtasks::params::{AlgoParams, BudgetParam, LevelParams, ThresholdParam};
//! use hrl_subtasks::*;
//!
//! let thresholds = ThresholdParam::PerGroup(vec![0.4, 0.4, 0.2, 0.8, 0.8]);
//! let lower = |budget| {
//!     LevelParams::new(
//!         SubtaskSpecParams::hac(budget, 0.0).with_threshold(thresholds.clone()),
//!         AlgoParams::default().with_hindsight_goals(3),
//!     )
//! };
//! let graph_params = GraphParams {
//!     algorithm: Topology::HAC,
//!     n_layers: 3,
//!     subtask_spec_factory: "AntFourRoomsSubtaskSpecFactory".into(),
//!     level_params_list: vec![
//!         lower(BudgetParam::Fixed(10)),
//!         lower(BudgetParam::Fixed(10)),
//!         LevelParams::new(SubtaskSpecParams::top(BudgetParam::Derive), AlgoParams::default()),
//!     ],
//! };
//! let run_params = RunParams::new("AntFourRooms-v1", 1_000_000).with_seed(1);
//!
//! let registry = FactoryRegistry::with_defaults();
//! let (env, graph) =
//!     setup_hierarchy(&run_params, &graph_params, &registry, &KinematicModels).unwrap();
//! assert_eq!(graph.top().spec.max_n_actions(), Some(env.max_episode_length()));
//! ```

pub mod aux_rewards;
pub mod buffer;
pub mod env_info;
pub mod error;
pub mod factorization;
pub mod factory;
pub mod graph;
pub mod observation;
pub mod params;
pub mod setup;
pub mod spec;

pub use aux_rewards::{AuxReward, AuxRewardContext};
pub use buffer::derive_buffer_sizes;
pub use env_info::{DictEnvDescription, EnvInfo, SubgoalSink};
pub use error::{Error, Result};
pub use factorization::Factorization;
pub use factory::{FactoryRegistry, SubtaskSpecFactory};
pub use graph::{HierarchyGraph, LevelNode, SubgoalDisplay};
pub use observation::{Observation, ObservationLayout};
pub use params::{load_params, GraphParams, RunParams, SubtaskSpecParams, Topology};
pub use setup::{build_hierarchy, setup_from_dir, setup_hierarchy};
pub use spec::{Budget, SubtaskSpec, Thresholds};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
