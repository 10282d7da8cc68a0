// Mecanum kinematics for a four-wheel base
//
// Converts body-frame velocities (vx, vy, wz) to individual wheel angular
// velocities and back. Both transforms are built from the same three
// geometric constants, so forward(inverse(v)) reproduces v exactly for an
// ideal rigid, no-slip platform even though four wheels over-determine the
// three body degrees of freedom.

use nalgebra::{Matrix3x4, Matrix4x3, Vector3, Vector4};
use serde::{Deserialize, Serialize};

/// Canonical wheel ordering.
///
/// This single enumeration fixes the ordering of kinematics matrix rows,
/// manager vector indices and joint-state names. Nothing else in the crate
/// may define its own wheel order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum WheelIndex {
    FrontLeft = 0,
    FrontRight = 1,
    BackLeft = 2,
    BackRight = 3,
}

impl WheelIndex {
    pub const COUNT: usize = 4;

    /// All wheels in canonical order.
    pub const ALL: [WheelIndex; Self::COUNT] = [
        WheelIndex::FrontLeft,
        WheelIndex::FrontRight,
        WheelIndex::BackLeft,
        WheelIndex::BackRight,
    ];

    /// Joint name as published in joint-state telemetry.
    pub fn joint_name(self) -> &'static str {
        match self {
            WheelIndex::FrontLeft => "wheel_front_left_joint",
            WheelIndex::FrontRight => "wheel_front_right_joint",
            WheelIndex::BackLeft => "wheel_back_left_joint",
            WheelIndex::BackRight => "wheel_back_right_joint",
        }
    }
}

/// Body-frame velocity: linear x/y in m/s, angular z in rad/s.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BodyVelocity {
    pub vx: f64,
    pub vy: f64,
    pub wz: f64,
}

impl BodyVelocity {
    pub fn new(vx: f64, vy: f64, wz: f64) -> Self {
        Self { vx, vy, wz }
    }

    pub fn is_finite(&self) -> bool {
        self.vx.is_finite() && self.vy.is_finite() && self.wz.is_finite()
    }

    fn to_vector(self) -> Vector3<f64> {
        Vector3::new(self.vx, self.vy, self.wz)
    }

    fn from_vector(v: Vector3<f64>) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

/// Per-wheel angular velocities (rad/s) in canonical [`WheelIndex`] order.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WheelVelocities(pub [f64; WheelIndex::COUNT]);

impl WheelVelocities {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn get(&self, wheel: WheelIndex) -> f64 {
        self.0[wheel as usize]
    }

    pub fn as_array(&self) -> [f64; WheelIndex::COUNT] {
        self.0
    }

    fn to_vector(self) -> Vector4<f64> {
        Vector4::from(self.0)
    }

    fn from_vector(v: Vector4<f64>) -> Self {
        Self([v[0], v[1], v[2], v[3]])
    }
}

/// Body-velocity <-> wheel-velocity transform, selected at startup.
pub trait Kinematics: Send {
    /// Body velocity to per-wheel angular velocities.
    fn inverse(&self, body: BodyVelocity) -> WheelVelocities;

    /// Measured per-wheel angular velocities to achieved body velocity.
    fn forward(&self, wheels: WheelVelocities) -> BodyVelocity;
}

/// Four-wheel mecanum kinematics.
pub struct MecanumKinematics {
    wheel_radius: f64,
    // w = (1/r) * inverse_model * v
    inverse_model: Matrix4x3<f64>,
    // v = (r/4) * forward_model * w
    forward_model: Matrix3x4<f64>,
}

impl MecanumKinematics {
    /// `wheel_radius` in meters, `half_span_x`/`half_span_y` the longitudinal
    /// and lateral half-distances from the base center to the wheel contact
    /// points.
    pub fn new(wheel_radius: f64, half_span_x: f64, half_span_y: f64) -> Self {
        let span = half_span_x + half_span_y;

        // Rows in canonical order: FL, FR, BL, BR.
        #[rustfmt::skip]
        let inverse_model = Matrix4x3::new(
            1.0, -1.0, -span,
            1.0,  1.0,  span,
            1.0,  1.0, -span,
            1.0, -1.0,  span,
        );

        // Pseudo-inverse pair of the matrix above for this geometry.
        #[rustfmt::skip]
        let forward_model = Matrix3x4::new(
            1.0,          1.0,         1.0,         1.0,
            -1.0,         1.0,         1.0,        -1.0,
            -1.0 / span,  1.0 / span, -1.0 / span,  1.0 / span,
        );

        Self {
            wheel_radius,
            inverse_model,
            forward_model,
        }
    }
}

impl Kinematics for MecanumKinematics {
    fn inverse(&self, body: BodyVelocity) -> WheelVelocities {
        let wheels = (self.inverse_model * body.to_vector()) / self.wheel_radius;
        WheelVelocities::from_vector(wheels)
    }

    fn forward(&self, wheels: WheelVelocities) -> BodyVelocity {
        let body = (self.forward_model * wheels.to_vector()) * (self.wheel_radius / 4.0);
        BodyVelocity::from_vector(body)
    }
}
