use super::{require_len, GoalContext, Marker, Task};
use crate::angles::bound_angle;
use crate::error::Result;
use crate::kinematics::{forward_kinematics, is_reachable};
use crate::oracle::SteppingOracle;

/// Maximum joint velocity represented in subgoals.
const MAX_VELOCITY: f64 = 4.0;
/// Mocap index of the first subgoal marker; each goal uses three markers.
const FIRST_SUBGOAL_MARKER: usize = 3;

/// UR5 arm reaching a joint-angle goal that is kinematically above the table.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ur5ReacherTask;

impl Ur5ReacherTask {
    fn angles(sim: &dyn SteppingOracle) -> impl Iterator<Item = f64> + '_ {
        sim.qpos().iter().map(|q| bound_angle(*q))
    }

    fn joint_markers(first_index: usize, goal: &[f64]) -> Result<Vec<Marker>> {
        require_len("UR5 goal", goal, 3)?;
        let pose = forward_kinematics([goal[0], goal[1], goal[2]]);
        Ok(pose
            .joints()
            .iter()
            .enumerate()
            .map(|(j, pos)| (first_index + j, *pos))
            .collect())
    }
}

impl Task for Ur5ReacherTask {
    fn model_name(&self) -> &str {
        "ur5.xml"
    }

    fn end_goal_dim(&self) -> usize {
        3
    }

    fn subgoal_dim(&self) -> usize {
        6
    }

    fn sample_goal(&self, ctx: &mut GoalContext<'_>, _test: bool) -> Result<Vec<f64>> {
        let space = ctx.goal_space_test;
        let rng = &mut *ctx.rng;
        ctx.sampler.sample("reachable UR5 goal", || {
            let goal = space.sample(&mut *rng)?;
            Ok(is_reachable([goal[0], goal[1], goal[2]]).then_some(goal))
        })
    }

    fn project_state_to_end_goal(&self, sim: &dyn SteppingOracle, _state: &[f64]) -> Vec<f64> {
        Self::angles(sim).collect()
    }

    fn project_state_to_subgoal(&self, sim: &dyn SteppingOracle, _state: &[f64]) -> Vec<f64> {
        Self::angles(sim)
            .chain(
                sim.qvel()
                    .iter()
                    .map(|v| v.clamp(-MAX_VELOCITY, MAX_VELOCITY)),
            )
            .collect()
    }

    fn end_goal_markers(&self, goal: &[f64]) -> Result<Vec<Marker>> {
        Self::joint_markers(0, goal)
    }

    fn subgoal_markers(&self, slot: usize, subgoal: &[f64]) -> Result<Vec<Marker>> {
        Self::joint_markers(FIRST_SUBGOAL_MARKER + 3 * slot.saturating_sub(1), subgoal)
    }
}
