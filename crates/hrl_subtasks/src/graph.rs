//! Hierarchy graphs: one node per level, lowest first.

use crate::buffer::derive_buffer_sizes;
use crate::env_info::{EnvInfo, SubgoalSink};
use crate::error::{Error, Result};
use crate::params::{AlgoParams, GraphParams, RunParams, Topology};
use crate::spec::SubtaskSpec;
use hac_envs::TimedSubgoal;
use serde_json::Value;
use std::sync::Arc;

/// How the environment displays the subgoals of a hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubgoalDisplay {
    /// Untimed subgoals (HAC).
    Subgoals,
    /// Timed subgoals (HiTS).
    TimedSubgoals,
}

/// One level of the hierarchy.
#[derive(Debug, Clone)]
pub struct LevelNode {
    pub level: usize,
    pub spec: Arc<SubtaskSpec>,
    /// Algorithm options with the derived buffer size filled in.
    pub algo: AlgoParams,
    pub model: Value,
    pub interruption_policy: Option<String>,
}

/// An assembled hierarchy, ready for a training loop.
#[derive(Debug, Clone)]
pub struct HierarchyGraph {
    name: String,
    topology: Topology,
    levels: Vec<LevelNode>,
    subgoal_display: Option<SubgoalDisplay>,
}

impl HierarchyGraph {
    /// Assembles the graph from produced specs.
    ///
    /// Missing buffer sizes are derived, a HiTS top level without
    /// `child_failure_penalty` gets `-max_n_actions`, and the top node is
    /// wired to the environment's subgoal display when it has one.
    pub fn build(
        env: &dyn EnvInfo,
        graph_params: &GraphParams,
        run_params: &RunParams,
        specs: Vec<Arc<SubtaskSpec>>,
    ) -> Result<Self> {
        graph_params.validate()?;
        if specs.len() != graph_params.n_layers {
            return Err(Error::dimension(
                "subtask specs",
                graph_params.n_layers,
                specs.len(),
            ));
        }
        let topology = graph_params.algorithm;
        let mut algo: Vec<AlgoParams> = graph_params
            .level_params_list
            .iter()
            .map(|l| l.algo_kwargs.clone())
            .collect();

        if topology == Topology::HiTS {
            set_child_failure_penalty(&specs, &mut algo)?;
        }
        derive_buffer_sizes(
            topology,
            env.max_episode_length(),
            run_params.n_steps,
            &specs,
            &mut algo,
        )?;

        let levels = specs
            .into_iter()
            .zip(algo)
            .zip(&graph_params.level_params_list)
            .enumerate()
            .map(|(level, ((spec, algo), params))| LevelNode {
                level,
                spec,
                algo,
                model: params.model_kwargs.clone(),
                interruption_policy: params.interruption_policy().map(str::to_string),
            })
            .collect();

        let subgoal_display = env.supports_subgoal_display().then_some(match topology {
            Topology::HAC => SubgoalDisplay::Subgoals,
            Topology::HiTS => SubgoalDisplay::TimedSubgoals,
        });
        let name = match topology {
            Topology::HAC => "hac_graph",
            Topology::HiTS => "hits_graph",
        };
        log::info!(
            "Built {} with {} levels (subgoal display: {:?})",
            name,
            graph_params.n_layers,
            subgoal_display
        );

        Ok(Self {
            name: name.to_string(),
            topology,
            levels,
            subgoal_display,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    pub fn n_layers(&self) -> usize {
        self.levels.len()
    }

    /// All levels, lowest first.
    pub fn levels(&self) -> &[LevelNode] {
        &self.levels
    }

    pub fn level(&self, level: usize) -> Option<&LevelNode> {
        self.levels.get(level)
    }

    /// The top level's node.
    pub fn top(&self) -> &LevelNode {
        // `build` rejects empty hierarchies
        &self.levels[self.levels.len() - 1]
    }

    pub fn subgoal_display(&self) -> Option<SubgoalDisplay> {
        self.subgoal_display
    }

    /// Shows untimed subgoals if the graph is wired for them.
    ///
    /// Returns whether anything was shown.
    pub fn show_subgoals(&self, sink: &mut dyn SubgoalSink, subgoals: &[Vec<f64>]) -> Result<bool> {
        if self.subgoal_display != Some(SubgoalDisplay::Subgoals) {
            return Ok(false);
        }
        sink.show_subgoals(subgoals)?;
        Ok(true)
    }

    /// Shows timed subgoals if the graph is wired for them.
    pub fn show_timed_subgoals(
        &self,
        sink: &mut dyn SubgoalSink,
        subgoals: &[Option<TimedSubgoal>],
    ) -> Result<bool> {
        if self.subgoal_display != Some(SubgoalDisplay::TimedSubgoals) {
            return Ok(false);
        }
        sink.show_timed_subgoals(subgoals)?;
        Ok(true)
    }
}

fn set_child_failure_penalty(specs: &[Arc<SubtaskSpec>], algo: &mut [AlgoParams]) -> Result<()> {
    let (Some(top_spec), Some(top_algo)) = (specs.last(), algo.last_mut()) else {
        return Ok(());
    };
    if top_algo.child_failure_penalty.is_some() {
        return Ok(());
    }
    let budget = top_spec.max_n_actions().ok_or_else(|| {
        Error::Config(
            "a HiTS top level with an unbounded budget needs child_failure_penalty".into(),
        )
    })?;
    top_algo.child_failure_penalty = Some(-(budget as f64));
    Ok(())
}
