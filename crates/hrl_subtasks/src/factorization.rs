//! Goal space factorizations.
//!
//! A goal counts as achieved only if, in every group of coordinates, the
//! Euclidean distance between achieved and desired goal stays within that
//! group's threshold.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// An ordered partition of the goal coordinates `0..dim` into groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawFactorization")]
pub struct Factorization {
    groups: Vec<Vec<usize>>,
    dim: usize,
}

#[derive(Deserialize)]
struct RawFactorization {
    groups: Vec<Vec<usize>>,
    dim: usize,
}

impl TryFrom<RawFactorization> for Factorization {
    type Error = Error;

    fn try_from(raw: RawFactorization) -> Result<Self> {
        Factorization::new(raw.groups, raw.dim)
    }
}

impl Factorization {
    /// Validates that `groups` partition `0..dim` with no empty group.
    pub fn new(groups: Vec<Vec<usize>>, dim: usize) -> Result<Self> {
        let mut seen = vec![false; dim];
        for (g, group) in groups.iter().enumerate() {
            if group.is_empty() {
                return Err(Error::InvalidFactorization(format!("group {} is empty", g)));
            }
            for &i in group {
                if i >= dim {
                    return Err(Error::InvalidFactorization(format!(
                        "index {} in group {} exceeds goal dimension {}",
                        i, g, dim
                    )));
                }
                if seen[i] {
                    return Err(Error::InvalidFactorization(format!(
                        "index {} appears more than once",
                        i
                    )));
                }
                seen[i] = true;
            }
        }
        if let Some(missing) = seen.iter().position(|s| !s) {
            return Err(Error::InvalidFactorization(format!(
                "index {} is not covered by any group",
                missing
            )));
        }
        Ok(Self { groups, dim })
    }

    /// One group per coordinate.
    pub fn singletons(dim: usize) -> Self {
        Self {
            groups: (0..dim).map(|i| vec![i]).collect(),
            dim,
        }
    }

    /// Contiguous groups of the given sizes, e.g. one group per dict key.
    pub fn contiguous(sizes: &[usize]) -> Result<Self> {
        let mut groups = Vec::with_capacity(sizes.len());
        let mut start = 0;
        for &size in sizes {
            groups.push((start..start + size).collect());
            start += size;
        }
        Self::new(groups, start)
    }

    pub fn groups(&self) -> &[Vec<usize>] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Dimension of the goal space being partitioned.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Per-group Euclidean distances between two goals.
    pub fn distances(&self, a: &[f64], b: &[f64]) -> Result<Vec<f64>> {
        if a.len() != self.dim {
            return Err(Error::dimension("achieved goal", self.dim, a.len()));
        }
        if b.len() != self.dim {
            return Err(Error::dimension("desired goal", self.dim, b.len()));
        }
        Ok(self
            .groups
            .iter()
            .map(|group| {
                group
                    .iter()
                    .map(|&i| (a[i] - b[i]).powi(2))
                    .sum::<f64>()
                    .sqrt()
            })
            .collect())
    }

    /// Whether every group's distance is within its threshold.
    pub fn achieved(&self, a: &[f64], b: &[f64], thresholds: &[f64]) -> Result<bool> {
        if thresholds.len() != self.groups.len() {
            return Err(Error::dimension(
                "goal achievement thresholds",
                self.groups.len(),
                thresholds.len(),
            ));
        }
        Ok(self
            .distances(a, b)?
            .iter()
            .zip(thresholds)
            .all(|(d, t)| d <= t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Construction Tests ====================

    #[test]
    fn test_partition_accepted() {
        let f = Factorization::new(vec![vec![0, 2], vec![1]], 3).unwrap();
        assert_eq!(f.len(), 2);
        assert_eq!(f.dim(), 3);
    }

    #[test]
    fn test_overlap_rejected() {
        let err = Factorization::new(vec![vec![0, 1], vec![1, 2]], 3).unwrap_err();
        assert!(matches!(err, Error::InvalidFactorization(_)));
    }

    #[test]
    fn test_gap_rejected() {
        let err = Factorization::new(vec![vec![0], vec![2]], 3).unwrap_err();
        assert!(err.to_string().contains("index 1"));
    }

    #[test]
    fn test_empty_group_rejected() {
        assert!(Factorization::new(vec![vec![0], vec![]], 1).is_err());
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert!(Factorization::new(vec![vec![0, 3]], 2).is_err());
    }

    #[test]
    fn test_contiguous_groups() {
        let f = Factorization::contiguous(&[2, 1, 3]).unwrap();
        assert_eq!(f.groups(), &[vec![0, 1], vec![2], vec![3, 4, 5]]);
        assert_eq!(f.dim(), 6);
    }

    #[test]
    fn test_deserialize_validates_partition() {
        let f: Factorization = serde_json::from_str(r#"{"groups":[[0,2],[1]],"dim":3}"#).unwrap();
        assert_eq!(f, Factorization::new(vec![vec![0, 2], vec![1]], 3).unwrap());

        for bad in [
            r#"{"groups":[[0,5],[0]],"dim":2}"#,
            r#"{"groups":[[0],[0,1]],"dim":2}"#,
            r#"{"groups":[[0]],"dim":2}"#,
            r#"{"groups":[[],[0]],"dim":1}"#,
        ] {
            let err = serde_json::from_str::<Factorization>(bad).unwrap_err();
            assert!(err.to_string().contains("factorization"), "{}", err);
        }
    }

    // ==================== Distance Tests ====================

    #[test]
    fn test_group_distances() {
        let f = Factorization::new(vec![vec![0, 1], vec![2]], 3).unwrap();
        let d = f.distances(&[3.0, 4.0, 1.0], &[0.0, 0.0, -1.0]).unwrap();
        assert_eq!(d, vec![5.0, 2.0]);
    }

    #[test]
    fn test_achieved_needs_every_group() {
        let f = Factorization::singletons(2);
        assert!(f.achieved(&[0.1, 0.1], &[0.0, 0.0], &[0.2, 0.2]).unwrap());
        assert!(!f.achieved(&[0.1, 0.3], &[0.0, 0.0], &[0.2, 0.2]).unwrap());
    }

    #[test]
    fn test_threshold_count_checked() {
        let f = Factorization::singletons(2);
        assert!(f.achieved(&[0.0, 0.0], &[0.0, 0.0], &[0.1]).is_err());
    }
}
