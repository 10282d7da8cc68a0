// Dead reckoning from achieved body velocity
//
// First-order Euler integration of the achieved body velocity into a
// world-frame pose. No absolute correction is applied; drift is bounded only
// by encoder quality.

use serde::{Deserialize, Serialize};

use crate::motor::BodyVelocity;

/// World-frame pose. `theta` is kept in (-pi, pi] after every step.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose2D {
    pub x: f64,
    pub y: f64,
    pub theta: f64,
}

/// Planar orientation quaternion: rotation about z only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanarQuaternion {
    pub w: f64,
    pub z: f64,
}

impl Pose2D {
    pub fn quaternion(&self) -> PlanarQuaternion {
        PlanarQuaternion {
            w: (self.theta / 2.0).cos(),
            z: (self.theta / 2.0).sin(),
        }
    }
}

#[derive(Default)]
pub struct OdometryIntegrator {
    pose: Pose2D,
}

impl OdometryIntegrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Integrate one cycle of achieved body velocity over measured `dt`
    /// seconds. A non-positive `dt` leaves the pose untouched, so a stalled
    /// or wrapped timer can never push NaN into the estimate.
    pub fn integrate(&mut self, velocity: BodyVelocity, dt: f64) {
        if dt <= 0.0 {
            return;
        }

        let (sin_t, cos_t) = self.pose.theta.sin_cos();
        self.pose.x += (velocity.vx * cos_t - velocity.vy * sin_t) * dt;
        self.pose.y += (velocity.vx * sin_t + velocity.vy * cos_t) * dt;
        self.pose.theta += velocity.wz * dt;
        // Renormalize into (-pi, pi].
        self.pose.theta = self.pose.theta.sin().atan2(self.pose.theta.cos());
    }

    pub fn pose(&self) -> Pose2D {
        self.pose
    }

    pub fn reset(&mut self, pose: Pose2D) {
        self.pose = pose;
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::{FRAC_PI_2, PI};

    use super::*;

    #[test]
    fn straight_line_integration() {
        let mut odom = OdometryIntegrator::new();
        for _ in 0..200 {
            odom.integrate(BodyVelocity::new(0.5, 0.0, 0.0), 0.01);
        }
        let pose = odom.pose();
        assert!((pose.x - 1.0).abs() < 1e-9);
        assert!(pose.y.abs() < 1e-9);
        assert!(pose.theta.abs() < 1e-9);
    }

    #[test]
    fn heading_rotates_the_translation_into_the_world_frame() {
        let mut odom = OdometryIntegrator::new();
        odom.reset(Pose2D {
            x: 0.0,
            y: 0.0,
            theta: FRAC_PI_2,
        });
        odom.integrate(BodyVelocity::new(1.0, 0.0, 0.0), 1.0);

        let pose = odom.pose();
        assert!(pose.x.abs() < 1e-9);
        assert!((pose.y - 1.0).abs() < 1e-9);
    }

    #[test]
    fn theta_stays_wrapped_for_any_spin_sequence() {
        let mut odom = OdometryIntegrator::new();
        let spins = [3.0, -7.5, 12.0, 0.4, -0.9, 25.0, -25.0];
        for (i, wz) in spins.iter().cycle().take(500).enumerate() {
            let dt = 0.005 + (i % 7) as f64 * 0.003;
            odom.integrate(BodyVelocity::new(0.1, -0.2, *wz), dt);
            let theta = odom.pose().theta;
            assert!(
                theta > -PI && theta <= PI,
                "theta {theta} escaped (-pi, pi] at step {i}"
            );
        }
    }

    #[test]
    fn zero_dt_is_a_no_op() {
        let mut odom = OdometryIntegrator::new();
        odom.integrate(BodyVelocity::new(1.0, 1.0, 1.0), 0.01);
        let before = odom.pose();

        odom.integrate(BodyVelocity::new(5.0, 5.0, 5.0), 0.0);
        odom.integrate(BodyVelocity::new(5.0, 5.0, 5.0), -0.01);
        assert_eq!(odom.pose(), before);
    }

    #[test]
    fn quaternion_matches_heading() {
        let mut odom = OdometryIntegrator::new();
        odom.integrate(BodyVelocity::new(0.0, 0.0, FRAC_PI_2), 1.0);

        let q = odom.pose().quaternion();
        assert!((q.w - (FRAC_PI_2 / 2.0).cos()).abs() < 1e-9);
        assert!((q.z - (FRAC_PI_2 / 2.0).sin()).abs() < 1e-9);
    }
}
