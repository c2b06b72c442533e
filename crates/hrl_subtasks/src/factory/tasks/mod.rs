//! Task layouts of the bundled factories.

mod ant_four_rooms;
mod ball_in_cup;
mod drawbridge;
mod pendulum;
mod platforms;
mod tennis2d;
mod ur5_reacher;

pub use ant_four_rooms::{AntFourRoomsLayout, ANT_QPOS_DIM};
pub use ball_in_cup::BallInCupLayout;
pub use drawbridge::DrawbridgeLayout;
pub use pendulum::PendulumLayout;
pub use platforms::PlatformsLayout;
pub use tennis2d::{Tennis2DLayout, ANGLE_THRESHOLD_KEY, ANGULAR_VEL_THRESHOLD_KEY};
pub use ur5_reacher::Ur5ReacherLayout;

use crate::error::{Error, Result};

pub(crate) fn require_obs_dim(task: &str, obs_dim: usize, at_least: usize) -> Result<()> {
    if obs_dim < at_least {
        return Err(Error::Config(format!(
            "{} needs at least {} observation dimensions, environment has {}",
            task, at_least, obs_dim
        )));
    }
    Ok(())
}

pub(crate) fn require_len(v: &[f64], at_least: usize) -> Result<()> {
    if v.len() < at_least {
        return Err(Error::dimension("observation", at_least, v.len()));
    }
    Ok(())
}
