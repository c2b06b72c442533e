use super::{require_len, GoalContext, Marker, ResetContext, Task};
use crate::error::{Error, Result};
use crate::oracle::SteppingOracle;
use rand::Rng;

/// Minimum planar distance between the start and the goal of the reacher task.
pub const ANT_REACHER_MIN_DISTANCE: f64 = 8.0;

/// Quadrant-local range of room placements along each planar axis.
const ROOM_RANGE: (f64, f64) = (3.0, 6.5);
/// Range of the torso height in four-rooms goals.
const GOAL_HEIGHT_RANGE: (f64, f64) = (0.45, 0.55);
/// Cap of the torso height in subgoals.
const MAX_HEIGHT: f64 = 1.0;
/// Maximum planar velocity represented in subgoals.
const MAX_VELOCITY: f64 = 3.0;
/// Number of generalized positions (free joint plus eight hinges).
const NQ: usize = 15;

/// One of the four quadrant rooms of the four-rooms maze.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Room {
    /// `x > 0, y > 0`, and every point on an axis.
    NorthEast,
    /// `x < 0, y > 0`.
    NorthWest,
    /// `x < 0, y < 0`.
    SouthWest,
    /// `x > 0, y < 0`.
    SouthEast,
}

impl Room {
    /// All rooms in index order.
    pub const ALL: [Room; 4] = [
        Room::NorthEast,
        Room::NorthWest,
        Room::SouthWest,
        Room::SouthEast,
    ];

    /// The room containing the planar point `(x, y)`.
    ///
    /// Points on an axis belong to [`Room::NorthEast`].
    pub fn containing(x: f64, y: f64) -> Room {
        if x < 0.0 && y > 0.0 {
            Room::NorthWest
        } else if x < 0.0 && y < 0.0 {
            Room::SouthWest
        } else if x > 0.0 && y < 0.0 {
            Room::SouthEast
        } else {
            Room::NorthEast
        }
    }

    /// The room with the given index (0 to 3).
    pub fn from_index(index: usize) -> Option<Room> {
        Self::ALL.get(index).copied()
    }

    /// Index of the room (0 to 3).
    pub fn index(self) -> usize {
        self as usize
    }

    /// Reflects a point of the north-east quadrant into this room.
    pub fn reflect(self, x: f64, y: f64) -> (f64, f64) {
        match self {
            Room::NorthEast => (x, y),
            Room::NorthWest => (-x, y),
            Room::SouthWest => (-x, -y),
            Room::SouthEast => (x, -y),
        }
    }

    /// Draws a room uniformly.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Room {
        Self::ALL[rng.random_range(0..Self::ALL.len())]
    }

    /// Draws a planar point uniformly from the room's placement area.
    pub fn sample_position<R: Rng + ?Sized>(self, rng: &mut R) -> (f64, f64) {
        let x = rng.random_range(ROOM_RANGE.0..=ROOM_RANGE.1);
        let y = rng.random_range(ROOM_RANGE.0..=ROOM_RANGE.1);
        self.reflect(x, y)
    }
}

fn project_end_goal(state: &[f64]) -> Vec<f64> {
    state.iter().take(3).copied().collect()
}

fn project_subgoal(state: &[f64]) -> Vec<f64> {
    let at = |i: usize| state.get(i).copied().unwrap_or_default();
    vec![
        at(0),
        at(1),
        at(2).min(MAX_HEIGHT),
        at(NQ).clamp(-MAX_VELOCITY, MAX_VELOCITY),
        at(NQ + 1).clamp(-MAX_VELOCITY, MAX_VELOCITY),
    ]
}

fn torso_marker(slot: usize, goal: &[f64]) -> Result<Vec<Marker>> {
    require_len("ant goal", goal, 3)?;
    Ok(vec![(slot, [goal[0], goal[1], goal[2]])])
}

/// Quadruped reaching a point at least [`ANT_REACHER_MIN_DISTANCE`] away.
#[derive(Debug, Clone, Copy)]
pub struct AntReacherTask {
    min_distance: f64,
}

impl Default for AntReacherTask {
    fn default() -> Self {
        Self {
            min_distance: ANT_REACHER_MIN_DISTANCE,
        }
    }
}

impl AntReacherTask {
    /// Creates the task with a custom minimum start-to-goal distance.
    pub fn with_min_distance(min_distance: f64) -> Self {
        Self { min_distance }
    }

    /// The minimum start-to-goal distance.
    pub fn min_distance(&self) -> f64 {
        self.min_distance
    }
}

impl Task for AntReacherTask {
    fn model_name(&self) -> &str {
        "ant_reacher.xml"
    }

    fn end_goal_dim(&self) -> usize {
        3
    }

    fn subgoal_dim(&self) -> usize {
        5
    }

    fn goal_aware_reset(&self) -> bool {
        true
    }

    fn place_initial_state(&self, ctx: &mut ResetContext<'_>, goal: Option<&[f64]>) -> Result<()> {
        let goal = goal.ok_or_else(|| Error::GoalRequired(self.model_name().to_string()))?;
        require_len("ant reacher goal", goal, 2)?;
        let sampler = ctx.sampler;
        sampler.sample("ant start far enough from the goal", || {
            ctx.draw_initial_state()?;
            let qpos = ctx.sim.qpos();
            let distance = (goal[0] - qpos[0]).hypot(goal[1] - qpos[1]);
            Ok((distance > self.min_distance).then_some(()))
        })
    }

    fn project_state_to_end_goal(&self, _sim: &dyn SteppingOracle, state: &[f64]) -> Vec<f64> {
        project_end_goal(state)
    }

    fn project_state_to_subgoal(&self, _sim: &dyn SteppingOracle, state: &[f64]) -> Vec<f64> {
        project_subgoal(state)
    }

    fn end_goal_markers(&self, goal: &[f64]) -> Result<Vec<Marker>> {
        torso_marker(0, goal)
    }

    fn subgoal_markers(&self, slot: usize, subgoal: &[f64]) -> Result<Vec<Marker>> {
        torso_marker(slot, subgoal)
    }
}

/// Quadruped navigating from one quadrant room into another.
#[derive(Debug, Clone, Copy, Default)]
pub struct AntFourRoomsTask;

impl Task for AntFourRoomsTask {
    fn model_name(&self) -> &str {
        "ant_four_rooms.xml"
    }

    fn end_goal_dim(&self) -> usize {
        3
    }

    fn subgoal_dim(&self) -> usize {
        5
    }

    fn goal_aware_reset(&self) -> bool {
        true
    }

    fn place_initial_state(&self, ctx: &mut ResetContext<'_>, goal: Option<&[f64]>) -> Result<()> {
        let goal = goal.ok_or_else(|| Error::GoalRequired(self.model_name().to_string()))?;
        require_len("four rooms goal", goal, 2)?;
        let goal_room = Room::containing(goal[0], goal[1]);

        let sampler = ctx.sampler;
        let start_room = sampler.sample("start room different from the goal room", || {
            let room = Room::random(&mut *ctx.rng);
            Ok((room != goal_room).then_some(room))
        })?;

        ctx.draw_initial_state()?;
        let (x, y) = start_room.sample_position(&mut *ctx.rng);
        let qpos = ctx.sim.qpos_mut();
        qpos[0] = x;
        qpos[1] = y;
        log::debug!(
            "four rooms reset: goal room {:?}, start room {:?}",
            goal_room,
            start_room
        );
        Ok(())
    }

    fn sample_goal(&self, ctx: &mut GoalContext<'_>, _test: bool) -> Result<Vec<f64>> {
        let room = Room::random(&mut *ctx.rng);
        let (x, y) = room.sample_position(&mut *ctx.rng);
        let z = ctx.rng.random_range(GOAL_HEIGHT_RANGE.0..=GOAL_HEIGHT_RANGE.1);
        Ok(vec![x, y, z])
    }

    fn project_state_to_end_goal(&self, _sim: &dyn SteppingOracle, state: &[f64]) -> Vec<f64> {
        project_end_goal(state)
    }

    fn project_state_to_subgoal(&self, _sim: &dyn SteppingOracle, state: &[f64]) -> Vec<f64> {
        project_subgoal(state)
    }

    fn end_goal_markers(&self, goal: &[f64]) -> Result<Vec<Marker>> {
        torso_marker(0, goal)
    }

    fn subgoal_markers(&self, slot: usize, subgoal: &[f64]) -> Result<Vec<Marker>> {
        torso_marker(slot, subgoal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnvironmentConfig;
    use crate::oracle::{KinematicModel, KinematicSim};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    // ==================== Room Tests ====================

    #[test]
    fn test_room_of_point() {
        assert_eq!(Room::containing(1.0, 1.0), Room::NorthEast);
        assert_eq!(Room::containing(-1.0, 1.0), Room::NorthWest);
        assert_eq!(Room::containing(-1.0, -1.0), Room::SouthWest);
        assert_eq!(Room::containing(1.0, -1.0), Room::SouthEast);
        assert_eq!(Room::containing(0.0, -1.0), Room::NorthEast);
    }

    #[test]
    fn test_reflection_lands_in_room() {
        let mut rng = StdRng::seed_from_u64(5);
        for room in Room::ALL {
            for _ in 0..50 {
                let (x, y) = room.sample_position(&mut rng);
                assert_eq!(Room::containing(x, y), room);
            }
            assert_eq!(Room::from_index(room.index()), Some(room));
        }
        assert_eq!(Room::from_index(4), None);
    }

    // ==================== Reset Tests ====================

    #[test]
    fn test_four_rooms_reset_requires_goal() {
        let config = EnvironmentConfig::ant_four_rooms();
        let mut sim = KinematicSim::new(KinematicModel::ant()).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let mut ctx = ResetContext {
            sim: &mut sim,
            initial_state_space: &config.initial_state_space,
            rng: &mut rng,
            sampler: config.sampler(),
        };
        let err = AntFourRoomsTask.place_initial_state(&mut ctx, None).unwrap_err();
        assert_eq!(err, Error::GoalRequired("ant_four_rooms.xml".into()));
    }

    #[test]
    fn test_reacher_reset_keeps_distance() {
        let config = EnvironmentConfig::ant_reacher();
        let mut sim = KinematicSim::new(KinematicModel::ant()).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let goal = [4.0, -3.0, 0.5];
        for _ in 0..100 {
            let mut ctx = ResetContext {
                sim: &mut sim,
                initial_state_space: &config.initial_state_space,
                rng: &mut rng,
                sampler: config.sampler(),
            };
            AntReacherTask::default()
                .place_initial_state(&mut ctx, Some(&goal[..]))
                .unwrap();
            let qpos = sim.qpos();
            assert!((goal[0] - qpos[0]).hypot(goal[1] - qpos[1]) > ANT_REACHER_MIN_DISTANCE);
        }
    }

    #[test]
    fn test_reacher_infeasible_distance() {
        let config = EnvironmentConfig::ant_reacher().with_max_sampling_attempts(Some(20));
        let mut sim = KinematicSim::new(KinematicModel::ant()).unwrap();
        let mut rng = StdRng::seed_from_u64(2);
        let mut ctx = ResetContext {
            sim: &mut sim,
            initial_state_space: &config.initial_state_space,
            rng: &mut rng,
            sampler: config.sampler(),
        };
        let err = AntReacherTask::with_min_distance(100.0)
            .place_initial_state(&mut ctx, Some(&[0.0, 0.0, 0.5][..]))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::InfeasibleConfiguration { attempts: 20, .. }
        ));
    }

    // ==================== Projection Tests ====================

    #[test]
    fn test_subgoal_projection() {
        let mut state = vec![0.0; 29];
        state[0] = 1.0;
        state[1] = 2.0;
        state[2] = 1.7;
        state[15] = 5.0;
        state[16] = -0.5;
        assert_eq!(project_subgoal(&state), vec![1.0, 2.0, 1.0, 3.0, -0.5]);
        assert_eq!(project_end_goal(&state), vec![1.0, 2.0, 1.7]);
    }
}
