//! Replay buffer sizing.
//!
//! When a level's `buffer_size` is not configured, it is chosen so that every
//! transition of the run fits, assuming every episode lasts the full episode
//! budget:
//!
//! ```text
//! floor(scale * n_steps / max_episode_length * budget_product) * (n_hindsight_goals + 1)
//! ```
//!
//! For HAC, `budget_product` multiplies the level's action budget with the
//! budgets of all levels above it. For HiTS, the top level uses its own
//! budget and time-budgeted levels may see a transition on every primitive
//! step, giving `floor(scale * n_steps) * (n_hindsight_goals + 1)`.
//!
//! Shorter episodes still use up subgoals, so the estimate over-provisions.

use crate::error::{Error, Result};
use crate::params::{AlgoParams, Topology};
use crate::spec::SubtaskSpec;
use std::sync::Arc;

/// Buffer size for a level that sees `budget_product` transitions per episode.
pub fn scaled_buffer_size(
    scale: f64,
    n_steps: u64,
    max_episode_length: usize,
    budget_product: usize,
    n_hindsight_goals: usize,
) -> usize {
    let transitions =
        scale * n_steps as f64 / max_episode_length as f64 * budget_product as f64;
    transitions.floor() as usize * (n_hindsight_goals + 1)
}

/// Buffer size for a time-budgeted level.
pub fn per_step_buffer_size(scale: f64, n_steps: u64, n_hindsight_goals: usize) -> usize {
    (scale * n_steps as f64).floor() as usize * (n_hindsight_goals + 1)
}

/// Fills in missing `buffer_size` entries and drops the consumed scale factors.
pub fn derive_buffer_sizes(
    topology: Topology,
    max_episode_length: usize,
    n_steps: u64,
    specs: &[Arc<SubtaskSpec>],
    algo_params: &mut [AlgoParams],
) -> Result<()> {
    if specs.len() != algo_params.len() {
        return Err(Error::dimension(
            "algorithm parameters",
            specs.len(),
            algo_params.len(),
        ));
    }
    let n_layers = specs.len();

    for level in 0..n_layers {
        let algo = &mut algo_params[level];
        if algo.buffer_size.is_some() {
            continue;
        }
        let scale = algo.buffer_size_factor.take().unwrap_or(1.0);

        let size = match topology {
            Topology::HiTS if level + 1 < n_layers => {
                per_step_buffer_size(scale, n_steps, algo.n_hindsight_goals)
            }
            Topology::HiTS => {
                let budget = action_budget(&specs[level], level)?;
                scaled_buffer_size(
                    scale,
                    n_steps,
                    max_episode_length,
                    budget,
                    algo.n_hindsight_goals,
                )
            }
            Topology::HAC => {
                let product = specs[level..]
                    .iter()
                    .enumerate()
                    .map(|(offset, spec)| action_budget(spec, level + offset))
                    .product::<Result<usize>>()?;
                scaled_buffer_size(
                    scale,
                    n_steps,
                    max_episode_length,
                    product,
                    algo.n_hindsight_goals,
                )
            }
        };
        log::info!("Buffer size level {}: {}", level, size);
        algo.buffer_size = Some(size);
    }
    Ok(())
}

fn action_budget(spec: &SubtaskSpec, level: usize) -> Result<usize> {
    spec.max_n_actions().ok_or_else(|| {
        Error::Config(format!(
            "cannot derive a buffer size for level {} from an unbounded budget; set buffer_size",
            level
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::ObservationLayout;
    use crate::factorization::Factorization;
    use crate::spec::{Budget, GoalSource, ObservationSelector, Thresholds};
    use hac_envs::BoxSpace;

    fn spec(budget: Budget) -> Arc<SubtaskSpec> {
        let layout = ObservationLayout::Vector(BoxSpace::symmetric(vec![1.0]).unwrap());
        Arc::new(
            SubtaskSpec::subtask(
                &layout,
                ObservationSelector::All,
                GoalSource::Indices(vec![0]),
                Factorization::singletons(1),
                Thresholds::Fixed(vec![0.1]),
                budget,
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_hac_product_covers_levels_above() {
        let specs = vec![
            spec(Budget::Actions(Some(10))),
            spec(Budget::Actions(Some(5))),
            spec(Budget::Actions(Some(4))),
        ];
        let mut algo = vec![AlgoParams::default().with_hindsight_goals(1); 3];
        derive_buffer_sizes(Topology::HAC, 200, 10_000, &specs, &mut algo).unwrap();
        // 10000 / 200 = 50 episodes
        assert_eq!(algo[0].buffer_size, Some(50 * 200 * 2));
        assert_eq!(algo[1].buffer_size, Some(50 * 20 * 2));
        assert_eq!(algo[2].buffer_size, Some(50 * 4 * 2));
    }

    #[test]
    fn test_configured_size_kept() {
        let specs = vec![spec(Budget::Actions(Some(10))), spec(Budget::Actions(Some(5)))];
        let mut algo = vec![
            AlgoParams::default().with_buffer_size(123).with_buffer_size_factor(2.0),
            AlgoParams::default().with_buffer_size_factor(2.0),
        ];
        derive_buffer_sizes(Topology::HAC, 50, 1000, &specs, &mut algo).unwrap();
        assert_eq!(algo[0].buffer_size, Some(123));
        assert_eq!(algo[0].buffer_size_factor, Some(2.0));
        assert_eq!(algo[1].buffer_size, Some(2 * 20 * 5));
        assert_eq!(algo[1].buffer_size_factor, None);
    }

    #[test]
    fn test_hits_levels() {
        let specs = vec![
            spec(Budget::Time {
                delta_t_min: 0.0,
                delta_t_max: 20.0,
            }),
            spec(Budget::Actions(Some(25))),
        ];
        let mut algo = vec![AlgoParams::default().with_hindsight_goals(3); 2];
        derive_buffer_sizes(Topology::HiTS, 500, 100_000, &specs, &mut algo).unwrap();
        assert_eq!(algo[0].buffer_size, Some(100_000 * 4));
        assert_eq!(algo[1].buffer_size, Some(200 * 25 * 4));
    }

    #[test]
    fn test_unbounded_budget_needs_explicit_size() {
        let specs = vec![spec(Budget::Actions(Some(10))), spec(Budget::Actions(None))];
        let mut algo = vec![AlgoParams::default(); 2];
        assert!(derive_buffer_sizes(Topology::HAC, 50, 1000, &specs, &mut algo).is_err());

        let mut algo = vec![AlgoParams::default().with_buffer_size(10); 2];
        assert!(derive_buffer_sizes(Topology::HAC, 50, 1000, &specs, &mut algo).is_ok());
    }

    #[test]
    fn test_scale_is_floored_before_goal_multiplier() {
        assert_eq!(scaled_buffer_size(1.0, 1000, 300, 1, 4), 3 * 5);
        assert_eq!(per_step_buffer_size(0.25, 10, 0), 2);
    }
}
