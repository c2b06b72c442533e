//! Bounded numeric spaces for observations, actions and goals.

use crate::error::{Error, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// An axis-aligned box `[low, high]` in `R^d`.
///
/// Construction guarantees `low.len() == high.len()` and `high[i] >= low[i]`
/// for every dimension. Bounds may be infinite (e.g. an unbounded observation
/// space) but never NaN. The space is immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBox")]
pub struct BoxSpace {
    low: Vec<f64>,
    high: Vec<f64>,
}

#[derive(Deserialize)]
struct RawBox {
    low: Vec<f64>,
    high: Vec<f64>,
}

impl TryFrom<RawBox> for BoxSpace {
    type Error = Error;

    fn try_from(raw: RawBox) -> Result<Self> {
        BoxSpace::new(raw.low, raw.high)
    }
}

/// Alias used where a box describes the goals of a level.
pub type GoalSpace = BoxSpace;

impl BoxSpace {
    /// Creates a box from lower and upper bound vectors.
    pub fn new(low: Vec<f64>, high: Vec<f64>) -> Result<Self> {
        if low.len() != high.len() {
            return Err(Error::dimension("upper bounds", low.len(), high.len()));
        }
        for (i, (lo, hi)) in low.iter().zip(high.iter()).enumerate() {
            if lo.is_nan() || hi.is_nan() {
                return Err(Error::Config(format!("bound {} is NaN", i)));
            }
            if hi < lo {
                return Err(Error::Config(format!(
                    "upper bound must be >= lower bound in dimension {} ({} < {})",
                    i, hi, lo
                )));
            }
        }
        Ok(Self { low, high })
    }

    /// Creates a box from `[low, high]` pairs, one per dimension.
    pub fn from_ranges(ranges: &[[f64; 2]]) -> Result<Self> {
        let (low, high) = ranges.iter().map(|r| (r[0], r[1])).unzip();
        Self::new(low, high)
    }

    /// Creates a box that is symmetric around zero: `[-high, high]`.
    pub fn symmetric(high: Vec<f64>) -> Result<Self> {
        let low = high.iter().map(|h| -h).collect();
        Self::new(low, high)
    }

    /// Creates an unbounded box of the given dimension.
    pub fn unbounded(dim: usize) -> Self {
        Self {
            low: vec![f64::NEG_INFINITY; dim],
            high: vec![f64::INFINITY; dim],
        }
    }

    /// The number of dimensions.
    pub fn dim(&self) -> usize {
        self.low.len()
    }

    /// Lower bounds.
    pub fn low(&self) -> &[f64] {
        &self.low
    }

    /// Upper bounds.
    pub fn high(&self) -> &[f64] {
        &self.high
    }

    /// Returns `true` if every bound is finite, i.e. the box can be sampled uniformly.
    pub fn is_bounded(&self) -> bool {
        self.low.iter().chain(self.high.iter()).all(|b| b.is_finite())
    }

    /// Returns `true` if `x` has the right dimension and lies inside the box.
    pub fn contains(&self, x: &[f64]) -> bool {
        x.len() == self.dim()
            && x
                .iter()
                .zip(self.low.iter().zip(self.high.iter()))
                .all(|(v, (lo, hi))| *v >= *lo && *v <= *hi)
    }

    /// Clamps `x` into the box.
    pub fn clip(&self, x: &[f64]) -> Vec<f64> {
        x.iter()
            .zip(self.low.iter().zip(self.high.iter()))
            .map(|(v, (lo, hi))| v.clamp(*lo, *hi))
            .collect()
    }

    /// Restricts the box to the given dimensions, in the given order.
    pub fn select(&self, indices: &[usize]) -> Result<Self> {
        let mut low = Vec::with_capacity(indices.len());
        let mut high = Vec::with_capacity(indices.len());
        for &i in indices {
            if i >= self.dim() {
                return Err(Error::Config(format!(
                    "index {} out of range for a {}-dimensional space",
                    i,
                    self.dim()
                )));
            }
            low.push(self.low[i]);
            high.push(self.high[i]);
        }
        Ok(Self { low, high })
    }

    /// Half-widths of the box, `(high - low) / 2`.
    pub fn half_range(&self) -> Vec<f64> {
        self.low
            .iter()
            .zip(self.high.iter())
            .map(|(lo, hi)| (hi - lo) / 2.0)
            .collect()
    }

    /// Centers of the box, `high - (high - low) / 2`.
    pub fn offset(&self) -> Vec<f64> {
        self.high
            .iter()
            .zip(self.half_range())
            .map(|(hi, half)| hi - half)
            .collect()
    }

    /// Draws a point uniformly from the box.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Vec<f64>> {
        if !self.is_bounded() {
            return Err(Error::Config(
                "cannot sample uniformly from an unbounded space".into(),
            ));
        }
        Ok(self
            .low
            .iter()
            .zip(self.high.iter())
            .map(|(lo, hi)| rng.random_range(*lo..=*hi))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_rejects_inverted_bounds() {
        let err = BoxSpace::new(vec![0.0, 1.0], vec![1.0, 0.5]).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_rejects_length_mismatch() {
        let err = BoxSpace::new(vec![0.0], vec![1.0, 2.0]).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { .. }));
    }

    #[test]
    fn test_rejects_nan() {
        assert!(BoxSpace::new(vec![f64::NAN], vec![1.0]).is_err());
    }

    #[test]
    fn test_degenerate_box_is_valid() {
        let space = BoxSpace::new(vec![0.5], vec![0.5]).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(space.sample(&mut rng).unwrap(), vec![0.5]);
    }

    #[test]
    fn test_valid_spaces_keep_order() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let low: Vec<f64> = (0..4).map(|_| rng.random_range(-10.0..10.0)).collect();
            let high: Vec<f64> = low.iter().map(|l| l + rng.random_range(0.0..5.0)).collect();
            let space = BoxSpace::new(low, high).unwrap();
            for i in 0..space.dim() {
                assert!(space.high()[i] >= space.low()[i]);
            }
            let x = space.sample(&mut rng).unwrap();
            assert!(space.contains(&x));
        }
    }

    #[test]
    fn test_unbounded_space() {
        let space = BoxSpace::unbounded(3);
        assert!(!space.is_bounded());
        assert!(space.contains(&[1e9, -1e9, 0.0]));
        let mut rng = StdRng::seed_from_u64(0);
        assert!(space.sample(&mut rng).is_err());
    }

    #[test]
    fn test_half_range_and_offset() {
        let space = BoxSpace::from_ranges(&[[-2.0, 4.0], [0.0, 1.0]]).unwrap();
        assert_eq!(space.half_range(), vec![3.0, 0.5]);
        assert_eq!(space.offset(), vec![1.0, 0.5]);
    }

    #[test]
    fn test_select_and_clip() {
        let space = BoxSpace::symmetric(vec![1.0, 2.0, 3.0]).unwrap();
        let sub = space.select(&[2, 0]).unwrap();
        assert_eq!(sub.high(), &[3.0, 1.0]);
        assert_eq!(sub.clip(&[5.0, -5.0]), vec![3.0, -1.0]);
        assert!(space.select(&[3]).is_err());
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: BoxSpace = serde_json::from_str(r#"{"low": [0.0], "high": [1.0]}"#).unwrap();
        assert_eq!(ok.dim(), 1);
        let bad: std::result::Result<BoxSpace, _> =
            serde_json::from_str(r#"{"low": [1.0], "high": [0.0]}"#);
        assert!(bad.is_err());
    }
}
