#![doc = include_str!("../README.md")]
//! ## Modules
//!
//! - [`space`]: bounded boxes for actions, observations and goals
//! - [`oracle`]: the physics stepping contract and a kinematic reference oracle
//! - [`tasks`]: per-model behavior (observation, placement, projections, markers)
//! - [`environment`]: the simulated environment
//! - [`goal_env`]: the goal-conditioned adapter with sparse rewards
//! - [`registry`]: named presets (`PendulumHAC-v1`, `UR5Reacher-v1`, ...)
//!
//! ## Quick Start
//!
//! ```rust
//! use hac_envs::{make, KinematicModels};
//!
//! let mut env = make("AntFourRooms-v1", &KinematicModels, Some(7)).unwrap();
//! let obs = env.reset().unwrap();
//! let action = vec![0.0; env.action_space().dim()];
//! let step = env.step(&action).unwrap();
//! assert_eq!(step.observation.desired_goal, obs.desired_goal);
//! ```

pub mod angles;
pub mod config;
pub mod environment;
pub mod error;
pub mod goal_env;
pub mod kinematics;
pub mod oracle;
pub mod registry;
pub mod sampling;
pub mod space;
pub mod tasks;

pub use config::EnvironmentConfig;
pub use environment::{Environment, MAX_DISPLAYED_SUBGOALS};
pub use error::{Error, Result};
pub use goal_env::{
    GoalEnv, GoalObservation, RenderMode, Step, StepInfo, TimedSubgoal, FAILURE_REWARD,
    SUCCESS_REWARD,
};
pub use oracle::{KinematicModel, KinematicModels, KinematicSim, ModelLoader, SteppingOracle};
pub use registry::{config_for, make, ENVIRONMENT_IDS};
pub use sampling::{RejectionSampler, DEFAULT_MAX_ATTEMPTS};
pub use space::{BoxSpace, GoalSpace};
pub use tasks::{Room, Task};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
