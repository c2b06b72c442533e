//! Registry of the bundled goal-conditioned environments.

use crate::config::EnvironmentConfig;
use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::goal_env::GoalEnv;
use crate::oracle::ModelLoader;

/// Ids of the registered environments.
pub const ENVIRONMENT_IDS: [&str; 4] = [
    "PendulumHAC-v1",
    "UR5Reacher-v1",
    "AntReacher-v1",
    "AntFourRooms-v1",
];

/// The preset configuration registered under `id`.
pub fn config_for(id: &str) -> Result<EnvironmentConfig> {
    match id {
        "PendulumHAC-v1" => Ok(EnvironmentConfig::pendulum()),
        "UR5Reacher-v1" => Ok(EnvironmentConfig::ur5_reacher()),
        "AntReacher-v1" => Ok(EnvironmentConfig::ant_reacher()),
        "AntFourRooms-v1" => Ok(EnvironmentConfig::ant_four_rooms()),
        other => Err(Error::UnknownEnvironment(other.to_string())),
    }
}

/// Builds the registered environment `id`.
///
/// `seed` overrides the preset's seed when given.
pub fn make(id: &str, loader: &dyn ModelLoader, seed: Option<u64>) -> Result<GoalEnv> {
    let mut config = config_for(id)?;
    if seed.is_some() {
        config.seed = seed;
    }
    log::info!("Creating environment {}", id);
    GoalEnv::new(Environment::new(config, loader)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::KinematicModels;

    #[test]
    fn test_all_ids_build() {
        for id in ENVIRONMENT_IDS {
            let env = make(id, &KinematicModels, Some(0)).unwrap();
            assert!(env.max_episode_length() > 0, "{}", id);
        }
    }

    #[test]
    fn test_unknown_id() {
        let err = make("Humanoid-v2", &KinematicModels, None).unwrap_err();
        assert_eq!(err, Error::UnknownEnvironment("Humanoid-v2".into()));
    }

    #[test]
    fn test_seed_makes_goals_reproducible() {
        let a = make("AntFourRooms-v1", &KinematicModels, Some(17)).unwrap();
        let b = make("AntFourRooms-v1", &KinematicModels, Some(17)).unwrap();
        assert_eq!(a.desired_goal(), b.desired_goal());
    }
}
