//! Aiming and flight geometry.
//!
//! Provides the iterative intercept solver, accuracy-scaled angular aim error,
//! turn-rate-limited heading steering, and swept segment-vs-circle hit tests.

use std::f32::consts::{PI, TAU};

use glam::Vec2;
use rand::Rng;
use starfray_core::catalog::Tuning;

/// Result of [`solve_intercept`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intercept {
    /// Where to aim.
    pub point: Vec2,
    /// Projectile flight time to `point` (seconds).
    pub time_secs: f32,
    /// False when the solver gave up and fell back to `distance / speed`.
    pub converged: bool,
}

/// Lead a moving target.
///
/// Starts from `t0 = distance / speed`, then re-projects the target and
/// re-derives `t` until successive values differ by less than the tolerance
/// or the iteration cap is hit. Non-convergent, negative or NaN solutions
/// fall back to `t0`. Targets slower than the stationary threshold are aimed
/// at directly.
pub fn solve_intercept(
    shooter: Vec2,
    target: Vec2,
    target_velocity: Vec2,
    projectile_speed: f32,
    tuning: &Tuning,
) -> Intercept {
    let distance = shooter.distance(target);
    if projectile_speed <= 0.0 {
        return Intercept {
            point: target,
            time_secs: 0.0,
            converged: false,
        };
    }
    let fallback = distance / projectile_speed;

    if target_velocity.length() < tuning.stationary_speed {
        return Intercept {
            point: target,
            time_secs: fallback,
            converged: true,
        };
    }

    let mut t = fallback;
    let mut converged = false;
    for _ in 0..tuning.intercept_max_iterations {
        let predicted = target + target_velocity * t;
        let next = shooter.distance(predicted) / projectile_speed;
        if !next.is_finite() || next < 0.0 {
            break;
        }
        let delta = (next - t).abs();
        t = next;
        if delta < tuning.intercept_tolerance_secs {
            converged = true;
            break;
        }
    }

    if !converged {
        t = fallback;
    }
    Intercept {
        point: target + target_velocity * t,
        time_secs: t,
        converged,
    }
}

/// Random angular aim error in radians, bounded by `(1 - accuracy) * max_error_deg`.
pub fn aim_error(rng: &mut impl Rng, accuracy: f32, max_error_deg: f32) -> f32 {
    let spread = (1.0 - accuracy.clamp(0.0, 1.0)) * max_error_deg.max(0.0).to_radians();
    if spread <= 0.0 {
        return 0.0;
    }
    rng.gen_range(-spread..=spread)
}

/// Rotate the line `shooter -> point` by `error` radians around the shooter.
pub fn perturb(shooter: Vec2, point: Vec2, error: f32) -> Vec2 {
    shooter + Vec2::from_angle(error).rotate(point - shooter)
}

/// Heading from `from` to `to` (radians from +x toward +y).
pub fn heading_to(from: Vec2, to: Vec2) -> f32 {
    let d = to - from;
    d.y.atan2(d.x)
}

/// Wrap an angle into (-PI, PI].
pub fn wrap_angle(angle: f32) -> f32 {
    let a = (angle + PI).rem_euclid(TAU) - PI;
    if a <= -PI {
        a + TAU
    } else {
        a
    }
}

/// Turn `current` toward `desired` by at most `max_turn` radians.
pub fn steer_heading(current: f32, desired: f32, max_turn: f32) -> f32 {
    let diff = wrap_angle(desired - current);
    wrap_angle(current + diff.clamp(-max_turn, max_turn))
}

/// Does the swept segment `p0 -> p1` pass within `radius` of `center`?
pub fn segment_hits_circle(p0: Vec2, p1: Vec2, center: Vec2, radius: f32) -> bool {
    let d = p1 - p0;
    let len2 = d.length_squared();
    if len2 <= 1e-12 {
        return p0.distance_squared(center) <= radius * radius;
    }
    let t = ((center - p0).dot(d) / len2).clamp(0.0, 1.0);
    let closest = p0 + d * t;
    closest.distance_squared(center) <= radius * radius
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_stationary_target_aimed_directly() {
        let tuning = Tuning::default();
        let sol = solve_intercept(Vec2::ZERO, Vec2::new(300.0, 0.0), Vec2::new(0.1, 0.0), 100.0, &tuning);
        assert_eq!(sol.point, Vec2::new(300.0, 0.0));
        assert!((sol.time_secs - 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_crossing_target_led() {
        let tuning = Tuning::default();
        let target = Vec2::new(1_000.0, 0.0);
        let vel = Vec2::new(0.0, 100.0);
        let sol = solve_intercept(Vec2::ZERO, target, vel, 500.0, &tuning);
        assert!(sol.converged);
        // Projectile and target arrive together.
        let flight = sol.point.length() / 500.0;
        assert!((flight - sol.time_secs).abs() < 1e-2);
        assert!(sol.point.y > 0.0);
    }

    #[test]
    fn test_runaway_target_falls_back() {
        let tuning = Tuning::default();
        // Target outruns the projectile; iteration diverges.
        let sol = solve_intercept(Vec2::ZERO, Vec2::new(100.0, 0.0), Vec2::new(1_000.0, 0.0), 50.0, &tuning);
        assert!(!sol.converged);
        assert!((sol.time_secs - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_perfect_accuracy_has_no_error() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(aim_error(&mut rng, 1.0, 10.0), 0.0);
        for _ in 0..100 {
            let e = aim_error(&mut rng, 0.5, 10.0);
            assert!(e.abs() <= 5f32.to_radians() + 1e-6);
        }
    }

    #[test]
    fn test_steer_respects_turn_cap() {
        let h = steer_heading(0.0, PI / 2.0, 0.1);
        assert!((h - 0.1).abs() < 1e-6);
        // Shortest way round across the wrap.
        let h = steer_heading(3.0, -3.0, 0.5);
        assert!((h + 3.0).abs() < 1e-4, "h = {h}");
        let h = steer_heading(3.0, -2.0, 0.5);
        assert!((h - wrap_angle(3.5)).abs() < 1e-4, "h = {h}");
    }

    #[test]
    fn test_segment_hits_circle() {
        let c = Vec2::new(5.0, 0.0);
        // Tunnels through the circle within one step.
        assert!(segment_hits_circle(Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0), c, 1.0));
        assert!(!segment_hits_circle(Vec2::new(0.0, 2.0), Vec2::new(10.0, 2.0), c, 1.0));
        // Ends before reaching the circle.
        assert!(!segment_hits_circle(Vec2::new(0.0, 0.0), Vec2::new(3.0, 0.0), c, 1.0));
        // Degenerate segment.
        assert!(segment_hits_circle(Vec2::new(5.5, 0.0), Vec2::new(5.5, 0.0), c, 1.0));
    }

    #[test]
    fn test_perturb_preserves_range() {
        let aim = perturb(Vec2::ZERO, Vec2::new(100.0, 0.0), 0.2);
        assert!((aim.length() - 100.0).abs() < 1e-3);
        assert!(aim.y > 0.0);
    }
}
