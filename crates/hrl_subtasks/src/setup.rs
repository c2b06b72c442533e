//! One-call construction of an environment and its hierarchy.

use crate::env_info::EnvInfo;
use crate::error::Result;
use crate::factory::FactoryRegistry;
use crate::graph::HierarchyGraph;
use crate::params::{load_params, GraphParams, RunDirectory, RunParams};
use hac_envs::{GoalEnv, ModelLoader};
use std::path::Path;

/// Produces the specs with the configured factory and assembles the graph.
///
/// Works with any environment description, including dict environments
/// living outside this workspace.
pub fn build_hierarchy(
    env: &dyn EnvInfo,
    run_params: &RunParams,
    graph_params: &GraphParams,
    registry: &FactoryRegistry,
) -> Result<HierarchyGraph> {
    let factory = registry.get(&graph_params.subtask_spec_factory)?;
    let specs = factory.produce(env, graph_params)?;
    HierarchyGraph::build(env, graph_params, run_params, specs)
}

/// Creates the registered environment named in `run_params` and its hierarchy.
pub fn setup_hierarchy(
    run_params: &RunParams,
    graph_params: &GraphParams,
    registry: &FactoryRegistry,
    loader: &dyn ModelLoader,
) -> Result<(GoalEnv, HierarchyGraph)> {
    graph_params.validate()?;
    let env = hac_envs::make(&run_params.env, loader, run_params.seed)?;
    let graph = build_hierarchy(&env, run_params, graph_params, registry)?;
    Ok((env, graph))
}

/// Loads a run directory and sets up its environment and hierarchy.
pub fn setup_from_dir(
    dir: impl AsRef<Path>,
    registry: &FactoryRegistry,
    loader: &dyn ModelLoader,
) -> Result<(RunDirectory, GoalEnv, HierarchyGraph)> {
    let run = load_params(dir)?;
    let (env, graph) = setup_hierarchy(&run.run_params, &run.graph_params, registry, loader)?;
    Ok((run, env, graph))
}
