//! Angle representations shared by the rotational tasks.
//!
//! Bare joint angles are discontinuous at the wrap boundary, so observations
//! encode them as `(cos θ, sin θ)`. Goals, however, are expressed as bounded
//! angles; the helpers here convert between the two.

use std::f64::consts::PI;

/// Sign with `sign(0) == 0`, unlike [`f64::signum`].
pub fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Wraps an angle into `(-π, π]`.
///
/// The angle is first reduced modulo `2π` into `[0, 2π)`; values above `π`
/// are then shifted down by `2π`.
pub fn bound_angle(angle: f64) -> f64 {
    let bounded = angle.rem_euclid(2.0 * PI);
    if bounded.abs() > PI {
        -(PI - bounded.rem_euclid(PI))
    } else {
        bounded
    }
}

/// Reduces the magnitude of an angle modulo `2π`, keeping its sign.
///
/// Used for the arm joints whose goal space spans `[-2π, 2π]`.
pub fn wrap_angle_magnitude(angle: f64) -> f64 {
    let bounded = angle.abs().rem_euclid(2.0 * PI);
    if angle < 0.0 {
        -bounded
    } else {
        bounded
    }
}

/// Encodes an angle as `(cos θ, sin θ)`.
pub fn encode_angle(angle: f64) -> (f64, f64) {
    (angle.cos(), angle.sin())
}

/// Recovers a bounded angle from its `(cos θ, sin θ)` encoding.
///
/// Computes `sign(sin) · arccos(cos)` and wraps the result into `(-π, π]`.
///
/// The boundary `θ = π` is a known edge case: if the encoded sine is exactly
/// zero (e.g. the pair `(-1.0, 0.0)`), `sign(0) == 0` and the decoded angle is
/// `0.0` rather than `π`. The floating-point encoding of `π` itself has a tiny
/// positive sine and therefore decodes correctly.
pub fn decode_angle(cos: f64, sin: f64) -> f64 {
    let angle = sign(sin) * cos.clamp(-1.0, 1.0).acos();
    bound_angle(angle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_bound_angle_range() {
        for k in -40..40 {
            let a = k as f64 * 0.37;
            let b = bound_angle(a);
            assert!(b > -PI - 1e-12 && b <= PI + 1e-12, "{} -> {}", a, b);
            let turns = (a - b) / (2.0 * PI);
            assert!((turns - turns.round()).abs() < 1e-9);
        }
    }

    #[test]
    fn test_bound_angle_examples() {
        assert!((bound_angle(3.0 * PI / 2.0) + PI / 2.0).abs() < 1e-12);
        assert!((bound_angle(-PI / 2.0) + PI / 2.0).abs() < 1e-12);
        assert!((bound_angle(PI) - PI).abs() < 1e-12);
        assert!((bound_angle(-PI) - PI).abs() < 1e-12);
    }

    #[test]
    fn test_round_trip() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..10_000 {
            let theta: f64 = rng.random_range(-PI..PI);
            if theta == -PI {
                continue;
            }
            let (c, s) = encode_angle(theta);
            let decoded = decode_angle(c, s);
            assert!((decoded - theta).abs() < 1e-9, "{} -> {}", theta, decoded);
        }
    }

    #[test]
    fn test_round_trip_at_pi() {
        let (c, s) = encode_angle(PI);
        assert!(s > 0.0);
        assert!((decode_angle(c, s) - PI).abs() < 1e-12);
    }

    #[test]
    fn test_zero_sine_boundary_decodes_to_zero() {
        assert_eq!(decode_angle(-1.0, 0.0), 0.0);
    }

    #[test]
    fn test_wrap_angle_magnitude() {
        assert!((wrap_angle_magnitude(5.0 * PI) - PI).abs() < 1e-12);
        assert!((wrap_angle_magnitude(-5.0 * PI) + PI).abs() < 1e-12);
        assert_eq!(wrap_angle_magnitude(1.0), 1.0);
    }

    #[test]
    fn test_sign() {
        assert_eq!(sign(0.0), 0.0);
        assert_eq!(sign(-0.0), 0.0);
        assert_eq!(sign(2.0), 1.0);
        assert_eq!(sign(-2.0), -1.0);
    }
}
