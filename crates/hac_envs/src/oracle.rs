//! The physics stepping oracle consumed by the environments.
//!
//! The environments never integrate dynamics themselves. They read and write
//! generalized positions, velocities and the actuator control signal, ask the
//! oracle to advance one integration step, and place visual markers (mocap
//! bodies) for goals and subgoals. Any engine that can honor this contract can
//! back an [`Environment`](crate::Environment).
//!
//! [`KinematicSim`] is a small built-in oracle (velocity-level integration of
//! the actuated joints, no contacts) used for tests, benches and demos.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// The contract of a physics engine instance driven by an environment.
pub trait SteppingOracle: Send {
    /// Generalized positions.
    fn qpos(&self) -> &[f64];
    /// Mutable generalized positions.
    fn qpos_mut(&mut self) -> &mut [f64];
    /// Generalized velocities.
    fn qvel(&self) -> &[f64];
    /// Mutable generalized velocities.
    fn qvel_mut(&mut self) -> &mut [f64];
    /// Actuator control signal.
    fn ctrl(&self) -> &[f64];
    /// Mutable actuator control signal.
    fn ctrl_mut(&mut self) -> &mut [f64];
    /// Control range `[low, high]` of each actuator.
    fn actuator_ctrl_range(&self) -> &[[f64; 2]];

    /// Advances the simulation by one integration step.
    fn step(&mut self) -> Result<()>;

    /// Renders the current frame. Engines without a viewer may ignore this.
    fn render(&mut self) {}

    /// Number of mocap marker bodies available for visualization.
    fn n_mocap(&self) -> usize;
    /// Moves mocap marker `index` to `pos`.
    fn set_mocap_pos(&mut self, index: usize, pos: [f64; 3]) -> Result<()>;
    /// Position of mocap marker `index`.
    fn mocap_pos(&self, index: usize) -> Option<[f64; 3]>;
    /// Sets the opacity of visual site `index`.
    fn set_site_alpha(&mut self, index: usize, alpha: f64) -> Result<()>;
    /// Opacity of visual site `index`.
    fn site_alpha(&self, index: usize) -> Option<f64>;
}

/// Creates oracle instances from model descriptions.
pub trait ModelLoader {
    /// Loads the model with the given file name (e.g. `"ur5.xml"`).
    fn load(&self, model_name: &str) -> Result<Box<dyn SteppingOracle>>;
}

/// Structural description of a model for the [`KinematicSim`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KinematicModel {
    /// Number of generalized positions.
    pub nq: usize,
    /// Number of generalized velocities.
    pub nv: usize,
    /// Control range of each actuator. Actuators drive the last `nu` degrees of freedom.
    pub ctrl_range: Vec<[f64; 2]>,
    /// Number of mocap marker bodies.
    pub n_mocap: usize,
    /// Whether the first body is attached through a free joint
    /// (3 translational positions, a 4-component quaternion, 6 velocities).
    pub free_joint: bool,
    /// Integration time step in seconds.
    pub timestep: f64,
}

impl KinematicModel {
    /// Single hinge pendulum.
    pub fn pendulum() -> Self {
        Self {
            nq: 1,
            nv: 1,
            ctrl_range: vec![[-2.0, 2.0]],
            n_mocap: 11,
            free_joint: false,
            timestep: 0.02,
        }
    }

    /// Three controlled joints of the UR5 arm; goal markers use three mocap
    /// bodies per goal (one end goal plus ten subgoals).
    pub fn ur5() -> Self {
        Self {
            nq: 3,
            nv: 3,
            ctrl_range: vec![[-3.15, 3.15], [-5.0, 5.0], [-3.15, 3.15]],
            n_mocap: 33,
            free_joint: false,
            timestep: 0.002,
        }
    }

    /// Quadruped on a free joint with eight actuated leg joints.
    pub fn ant() -> Self {
        Self {
            nq: 15,
            nv: 14,
            ctrl_range: vec![[-16.0, 16.0]; 8],
            n_mocap: 11,
            free_joint: true,
            timestep: 0.02,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.ctrl_range.len() > self.nv {
            return Err(Error::Config(format!(
                "{} actuators exceed {} degrees of freedom",
                self.ctrl_range.len(),
                self.nv
            )));
        }
        if self.free_joint && (self.nq < 7 || self.nv < 6 || self.nq - 7 != self.nv - 6) {
            return Err(Error::Config(
                "a free joint needs 7 positions and 6 velocities ahead of the hinge joints".into(),
            ));
        }
        if !self.free_joint && self.nq != self.nv {
            return Err(Error::Config(
                "hinge-only models need as many positions as velocities".into(),
            ));
        }
        if !(self.timestep > 0.0) {
            return Err(Error::Config("timestep must be positive".into()));
        }
        Ok(())
    }

    /// Maps each velocity degree of freedom to the position it integrates into.
    /// Rotational free-joint velocities have no scalar position (quaternion) and map to `None`.
    fn dof_to_qpos(&self) -> Vec<Option<usize>> {
        (0..self.nv)
            .map(|dof| {
                if !self.free_joint {
                    Some(dof)
                } else if dof < 3 {
                    Some(dof)
                } else if dof < 6 {
                    None
                } else {
                    Some(dof + 1)
                }
            })
            .collect()
    }
}

/// A minimal kinematic integrator honoring the [`SteppingOracle`] contract.
///
/// Each step adds `ctrl * dt` to the velocity of the actuated degrees of
/// freedom and integrates positions with semi-implicit Euler.
#[derive(Debug, Clone)]
pub struct KinematicSim {
    model: KinematicModel,
    dof_to_qpos: Vec<Option<usize>>,
    qpos: Vec<f64>,
    qvel: Vec<f64>,
    ctrl: Vec<f64>,
    mocap_pos: Vec<[f64; 3]>,
    site_alpha: Vec<f64>,
    steps: u64,
    frames_rendered: u64,
}

impl KinematicSim {
    /// Creates a simulation at rest at the origin.
    pub fn new(model: KinematicModel) -> Result<Self> {
        model.validate()?;
        let mut qpos = vec![0.0; model.nq];
        if model.free_joint {
            // identity quaternion
            qpos[3] = 1.0;
        }
        Ok(Self {
            dof_to_qpos: model.dof_to_qpos(),
            qvel: vec![0.0; model.nv],
            ctrl: vec![0.0; model.ctrl_range.len()],
            mocap_pos: vec![[0.0; 3]; model.n_mocap],
            site_alpha: vec![0.0; model.n_mocap],
            qpos,
            model,
            steps: 0,
            frames_rendered: 0,
        })
    }

    /// Number of integration steps taken so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Number of frames rendered so far.
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// The model this simulation was built from.
    pub fn model(&self) -> &KinematicModel {
        &self.model
    }
}

impl SteppingOracle for KinematicSim {
    fn qpos(&self) -> &[f64] {
        &self.qpos
    }

    fn qpos_mut(&mut self) -> &mut [f64] {
        &mut self.qpos
    }

    fn qvel(&self) -> &[f64] {
        &self.qvel
    }

    fn qvel_mut(&mut self) -> &mut [f64] {
        &mut self.qvel
    }

    fn ctrl(&self) -> &[f64] {
        &self.ctrl
    }

    fn ctrl_mut(&mut self) -> &mut [f64] {
        &mut self.ctrl
    }

    fn actuator_ctrl_range(&self) -> &[[f64; 2]] {
        &self.model.ctrl_range
    }

    fn step(&mut self) -> Result<()> {
        let dt = self.model.timestep;
        let first_actuated = self.model.nv - self.ctrl.len();
        for (k, (u, range)) in self.ctrl.iter().zip(&self.model.ctrl_range).enumerate() {
            self.qvel[first_actuated + k] += u.clamp(range[0], range[1]) * dt;
        }
        for (dof, target) in self.dof_to_qpos.iter().enumerate() {
            if let Some(q) = target {
                self.qpos[*q] += self.qvel[dof] * dt;
            }
        }
        if self.qpos.iter().chain(self.qvel.iter()).any(|x| !x.is_finite()) {
            return Err(Error::Simulation("state diverged to a non-finite value".into()));
        }
        self.steps += 1;
        Ok(())
    }

    fn render(&mut self) {
        self.frames_rendered += 1;
    }

    fn n_mocap(&self) -> usize {
        self.mocap_pos.len()
    }

    fn set_mocap_pos(&mut self, index: usize, pos: [f64; 3]) -> Result<()> {
        let n = self.mocap_pos.len();
        let slot = self
            .mocap_pos
            .get_mut(index)
            .ok_or_else(|| Error::Simulation(format!("mocap index {} out of {}", index, n)))?;
        *slot = pos;
        Ok(())
    }

    fn mocap_pos(&self, index: usize) -> Option<[f64; 3]> {
        self.mocap_pos.get(index).copied()
    }

    fn set_site_alpha(&mut self, index: usize, alpha: f64) -> Result<()> {
        let n = self.site_alpha.len();
        let slot = self
            .site_alpha
            .get_mut(index)
            .ok_or_else(|| Error::Simulation(format!("site index {} out of {}", index, n)))?;
        *slot = alpha;
        Ok(())
    }

    fn site_alpha(&self, index: usize) -> Option<f64> {
        self.site_alpha.get(index).copied()
    }
}

/// Loads [`KinematicSim`] instances for the bundled model names.
#[derive(Debug, Clone, Copy, Default)]
pub struct KinematicModels;

impl ModelLoader for KinematicModels {
    fn load(&self, model_name: &str) -> Result<Box<dyn SteppingOracle>> {
        let model = match model_name {
            "pendulum.xml" => KinematicModel::pendulum(),
            "ur5.xml" => KinematicModel::ur5(),
            "ant_reacher.xml" | "ant_four_rooms.xml" => KinematicModel::ant(),
            other => {
                return Err(Error::NotImplemented {
                    task: other.to_string(),
                    operation: "loading a kinematic model".into(),
                })
            }
        };
        Ok(Box::new(KinematicSim::new(model)?))
    }
}
