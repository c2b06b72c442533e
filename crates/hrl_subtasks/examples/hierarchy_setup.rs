//! Example assembling HAC and HiTS hierarchies
//!
//! This example shows how to:
//! - Describe a hierarchy in code or load it from a run directory
//! - Produce subtask specs with a registered factory
//! - Inspect derived budgets and replay buffer sizes
//!
//! Run with: cargo run -p hrl_subtasks --example hierarchy_setup [RUN_DIR]

use hac_envs::KinematicModels;
use hrl_subtasks::params::{AlgoParams, BudgetParam, LevelParams, TimeBudgetParam, ThresholdParam};
use hrl_subtasks::*;

fn print_graph(graph: &HierarchyGraph) {
    println!("   {} ({} levels)", graph.name(), graph.n_layers());
    for node in graph.levels().iter().rev() {
        let budget = match node.spec.budget() {
            Budget::Actions(Some(n)) => format!("{} actions", n),
            Budget::Actions(None) => "unbounded".to_string(),
            Budget::Time {
                delta_t_min,
                delta_t_max,
            } => format!("delta_t in [{}, {}]", delta_t_min, delta_t_max),
        };
        let thresholds = match node.spec.thresholds() {
            Thresholds::Fixed(t) => format!("{:?}", t),
            Thresholds::Learned => "learned".to_string(),
        };
        println!(
            "      level {}: goal dim {}, {}, thresholds {}, buffer {:?}",
            node.level,
            node.spec.goal_space().dim(),
            budget,
            thresholds,
            node.algo.buffer_size
        );
    }
    if let Some(display) = graph.subgoal_display() {
        println!("      subgoal display: {:?}", display);
    }
    println!();
}

fn ant_hac() -> (RunParams, GraphParams) {
    let thresholds = ThresholdParam::PerGroup(vec![0.4, 0.4, 0.2, 0.8, 0.8]);
    let lower = |budget| {
        LevelParams::new(
            SubtaskSpecParams::hac(budget, 0.0).with_threshold(thresholds.clone()),
            AlgoParams::default().with_hindsight_goals(3),
        )
    };
    let graph_params = GraphParams {
        algorithm: Topology::HAC,
        n_layers: 3,
        subtask_spec_factory: "AntFourRoomsSubtaskSpecFactory".into(),
        level_params_list: vec![
            lower(BudgetParam::Fixed(10)),
            lower(BudgetParam::Fixed(10)),
            LevelParams::new(
                SubtaskSpecParams::top(BudgetParam::Derive),
                AlgoParams::default().with_hindsight_goals(3),
            ),
        ],
    };
    (RunParams::new("AntFourRooms-v1", 2_000_000).with_seed(0), graph_params)
}

fn pendulum_hits() -> (RunParams, GraphParams) {
    let graph_params = GraphParams {
        algorithm: Topology::HiTS,
        n_layers: 2,
        subtask_spec_factory: "PendulumHACSubtaskSpecFactory".into(),
        level_params_list: vec![
            LevelParams::new(
                SubtaskSpecParams::hits(TimeBudgetParam::Derive, 0.1),
                AlgoParams::default()
                    .with_hindsight_goals(3)
                    .with_buffer_size_factor(0.5),
            ),
            LevelParams::new(
                SubtaskSpecParams::top(BudgetParam::Fixed(20)),
                AlgoParams::default().with_hindsight_goals(3),
            ),
        ],
    };
    (RunParams::new("PendulumHAC-v1", 200_000).with_seed(0), graph_params)
}

fn main() {
    print_banner();
    let registry = FactoryRegistry::with_defaults();

    println!("1. Registered factories:");
    for name in registry.names() {
        println!("   - {}", name);
    }
    println!();

    if let Some(dir) = std::env::args().nth(1) {
        println!("2. Loading hierarchy from {}", dir);
        match setup_from_dir(&dir, &registry, &KinematicModels) {
            Ok((run, env, graph)) => {
                println!(
                    "   ✓ {} with episodes of {} steps",
                    run.run_params.env,
                    env.max_episode_length()
                );
                print_graph(&graph);
            }
            Err(e) => println!("   ✗ Error: {}\n", e),
        }
        return;
    }

    let configs = [
        ("2. Three-level HAC over four rooms", ant_hac()),
        ("3. Two-level HiTS over the pendulum", pendulum_hits()),
    ];
    for (title, (run_params, graph_params)) in configs {
        println!("{}", title);
        match setup_hierarchy(&run_params, &graph_params, &registry, &KinematicModels) {
            Ok((_, graph)) => print_graph(&graph),
            Err(e) => println!("   ✗ Error: {}\n", e),
        }
    }
}

fn print_banner() {
    println!("=== Hierarchy Setup Example (hrl_subtasks {}) ===\n", VERSION);
}
