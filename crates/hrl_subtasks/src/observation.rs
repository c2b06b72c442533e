//! Observations as seen by the levels of a hierarchy.
//!
//! Box environments emit a flat vector; dict environments emit named
//! components. Dict goals are flattened by concatenating the goal keys in
//! sorted order.

use crate::error::{Error, Result};
use hac_envs::BoxSpace;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An environment observation, or a level's partial view of one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Observation {
    Vector(Vec<f64>),
    Dict(BTreeMap<String, Vec<f64>>),
}

impl Observation {
    /// The flat vector, or an error for dict observations.
    pub fn as_vector(&self) -> Result<&[f64]> {
        match self {
            Observation::Vector(v) => Ok(v),
            Observation::Dict(_) => Err(Error::Observation(
                "expected a vector observation, got a dict".into(),
            )),
        }
    }

    /// The component stored under `key`.
    pub fn get(&self, key: &str) -> Result<&[f64]> {
        match self {
            Observation::Dict(map) => map
                .get(key)
                .map(Vec::as_slice)
                .ok_or_else(|| Error::Observation(format!("missing key '{}'", key))),
            Observation::Vector(_) => Err(Error::Observation(format!(
                "expected a dict observation with key '{}', got a vector",
                key
            ))),
        }
    }

    /// Concatenates the components under `keys`, in the given order.
    pub fn concat(&self, keys: &[String]) -> Result<Vec<f64>> {
        let mut out = Vec::new();
        for key in keys {
            out.extend_from_slice(self.get(key)?);
        }
        Ok(out)
    }
}

impl From<Vec<f64>> for Observation {
    fn from(v: Vec<f64>) -> Self {
        Observation::Vector(v)
    }
}

/// The shape of an environment's observation space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationLayout {
    /// A single box.
    Vector(BoxSpace),
    /// One box per named component.
    Dict(BTreeMap<String, BoxSpace>),
}

impl ObservationLayout {
    /// Total number of observed coordinates.
    pub fn dim(&self) -> usize {
        match self {
            ObservationLayout::Vector(space) => space.dim(),
            ObservationLayout::Dict(spaces) => spaces.values().map(BoxSpace::dim).sum(),
        }
    }

    /// The box of a vector layout.
    pub fn vector(&self) -> Result<&BoxSpace> {
        match self {
            ObservationLayout::Vector(space) => Ok(space),
            ObservationLayout::Dict(_) => Err(Error::Config(
                "factory expects a vector observation space, environment has a dict".into(),
            )),
        }
    }

    /// The per-key boxes of a dict layout.
    pub fn dict(&self) -> Result<&BTreeMap<String, BoxSpace>> {
        match self {
            ObservationLayout::Dict(spaces) => Ok(spaces),
            ObservationLayout::Vector(_) => Err(Error::Config(
                "factory expects a dict observation space, environment has a vector".into(),
            )),
        }
    }

    /// The box obtained by concatenating the spaces of `keys`, in order.
    pub fn concat(&self, keys: &[String]) -> Result<BoxSpace> {
        let spaces = self.dict()?;
        let mut low = Vec::new();
        let mut high = Vec::new();
        for key in keys {
            let space = spaces.get(key).ok_or_else(|| {
                Error::Config(format!("observation space has no key '{}'", key))
            })?;
            low.extend_from_slice(space.low());
            high.extend_from_slice(space.high());
        }
        Ok(BoxSpace::new(low, high)?)
    }
}
