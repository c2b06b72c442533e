//! Closed-form forward kinematics of the UR5 arm.
//!
//! The arm's first three joints are chained as homogeneous 4x4 transforms
//! (base → shoulder → upper arm → forearm → wrist 1). The resulting joint
//! positions are used both to reject unreachable goals and to place the goal
//! and subgoal markers.

use ndarray::{arr1, arr2, Array1, Array2};

const SHOULDER_HEIGHT: f64 = 0.089159;
const UPPER_ARM_OFFSET: f64 = 0.13585;
const UPPER_ARM_LENGTH: f64 = 0.425;
const FOREARM_LENGTH: f64 = 0.39225;
const WRIST_1_OFFSET: f64 = -0.1197;

/// Minimum |θ₁| for a goal to count as reachable.
pub const MIN_SHOULDER_PAN: f64 = std::f64::consts::FRAC_PI_4;
/// Minimum height of the forearm joint above the floor.
pub const MIN_FOREARM_HEIGHT: f64 = 0.05;
/// Minimum height of the first wrist joint above the floor.
pub const MIN_WRIST_HEIGHT: f64 = 0.15;

/// World positions of the three joints that follow the controlled angles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArmPose {
    /// Upper arm joint position.
    pub upper_arm: [f64; 3],
    /// Forearm joint position.
    pub forearm: [f64; 3],
    /// First wrist joint position.
    pub wrist_1: [f64; 3],
}

impl ArmPose {
    /// The three joint positions in chain order.
    pub fn joints(&self) -> [[f64; 3]; 3] {
        [self.upper_arm, self.forearm, self.wrist_1]
    }
}

fn shoulder_to_base() -> Array2<f64> {
    arr2(&[
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, SHOULDER_HEIGHT],
        [0.0, 0.0, 0.0, 1.0],
    ])
}

fn upper_arm_to_shoulder(theta: f64) -> Array2<f64> {
    let (s, c) = theta.sin_cos();
    arr2(&[
        [c, -s, 0.0, 0.0],
        [s, c, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ])
}

fn forearm_to_upper_arm(theta: f64) -> Array2<f64> {
    let (s, c) = theta.sin_cos();
    arr2(&[
        [c, 0.0, s, 0.0],
        [0.0, 1.0, 0.0, UPPER_ARM_OFFSET],
        [-s, 0.0, c, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ])
}

fn wrist_to_forearm(theta: f64) -> Array2<f64> {
    let (s, c) = theta.sin_cos();
    arr2(&[
        [c, 0.0, s, UPPER_ARM_LENGTH],
        [0.0, 1.0, 0.0, 0.0],
        [-s, 0.0, c, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ])
}

fn xyz(p: Array1<f64>) -> [f64; 3] {
    [p[0], p[1], p[2]]
}

/// Computes the joint positions for the first three joint angles.
pub fn forward_kinematics(theta: [f64; 3]) -> ArmPose {
    let t_1_0 = shoulder_to_base();
    let t_2_0 = t_1_0.dot(&upper_arm_to_shoulder(theta[0]));
    let t_3_0 = t_2_0.dot(&forearm_to_upper_arm(theta[1]));
    let t_4_0 = t_3_0.dot(&wrist_to_forearm(theta[2]));

    let upper_arm_local = arr1(&[0.0, UPPER_ARM_OFFSET, 0.0, 1.0]);
    let forearm_local = arr1(&[UPPER_ARM_LENGTH, 0.0, 0.0, 1.0]);
    let wrist_1_local = arr1(&[FOREARM_LENGTH, WRIST_1_OFFSET, 0.0, 1.0]);

    ArmPose {
        upper_arm: xyz(t_2_0.dot(&upper_arm_local)),
        forearm: xyz(t_3_0.dot(&forearm_local)),
        wrist_1: xyz(t_4_0.dot(&wrist_1_local)),
    }
}

/// Returns `true` if the joint-angle goal is reachable: the shoulder is
/// panned away from the table edge and both the forearm and first wrist
/// joint stay above the floor.
pub fn is_reachable(theta: [f64; 3]) -> bool {
    let pose = forward_kinematics(theta);
    theta[0].abs() > MIN_SHOULDER_PAN
        && pose.forearm[2] > MIN_FOREARM_HEIGHT
        && pose.wrist_1[2] > MIN_WRIST_HEIGHT
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn close(a: [f64; 3], b: [f64; 3]) -> bool {
        a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < 1e-9)
    }

    #[test]
    fn test_zero_configuration() {
        let pose = forward_kinematics([0.0, 0.0, 0.0]);
        assert!(close(pose.upper_arm, [0.0, UPPER_ARM_OFFSET, SHOULDER_HEIGHT]));
        assert!(close(
            pose.forearm,
            [UPPER_ARM_LENGTH, UPPER_ARM_OFFSET, SHOULDER_HEIGHT]
        ));
        assert!(close(
            pose.wrist_1,
            [
                UPPER_ARM_LENGTH + FOREARM_LENGTH,
                UPPER_ARM_OFFSET + WRIST_1_OFFSET,
                SHOULDER_HEIGHT
            ]
        ));
    }

    #[test]
    fn test_shoulder_pan_rotates_about_z() {
        let pose = forward_kinematics([FRAC_PI_2, 0.0, 0.0]);
        // a quarter turn maps +y onto -x
        assert!(close(pose.upper_arm, [-UPPER_ARM_OFFSET, 0.0, SHOULDER_HEIGHT]));
    }

    #[test]
    fn test_lifted_arm_is_reachable() {
        // pitching the upper arm by -π/4 raises the forearm joint
        let theta = [FRAC_PI_2, -std::f64::consts::FRAC_PI_4, 0.0];
        let pose = forward_kinematics(theta);
        assert!(pose.forearm[2] > MIN_FOREARM_HEIGHT);
        assert!(is_reachable(theta));
    }

    #[test]
    fn test_small_pan_is_unreachable() {
        assert!(!is_reachable([0.1, -std::f64::consts::FRAC_PI_4, 0.0]));
    }

    #[test]
    fn test_arm_below_floor_is_unreachable() {
        assert!(!is_reachable([FRAC_PI_2, std::f64::consts::FRAC_PI_4, 0.0]));
    }
}
