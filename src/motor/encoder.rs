// Single-channel wheel encoder
//
// Pulses arrive from an interrupt-style context through the PulseSource
// handle; the control loop samples the shared counter once per cycle. The
// encoder has no second quadrature channel, so rotation direction is taken
// from the last commanded motor direction. That is a known precision
// compromise: a wheel coasting against the last command is integrated with
// the wrong sign.

use std::f64::consts::TAU;
use std::sync::Arc;
use std::sync::atomic::{AtomicU16, Ordering};

use super::driver::MotorDirection;

/// Below this sample interval the velocity estimate reads zero instead of
/// dividing by a near-zero dt.
pub const MIN_SAMPLE_DT: f64 = 1e-4;

/// Producer half of the tick counter, cloned into the pulse interrupt
/// context (or the simulator). The raw counter is never exposed.
#[derive(Clone)]
pub struct PulseSource {
    ticks: Arc<AtomicU16>,
}

impl PulseSource {
    /// One pulse edge. Safe to call concurrently with sampling.
    pub fn pulse(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    /// A burst of pulses accumulated since the last wakeup.
    pub fn pulse_n(&self, count: u16) {
        self.ticks.fetch_add(count, Ordering::Relaxed);
    }
}

/// Consumer half: angle and velocity estimation.
pub struct Encoder {
    ticks: Arc<AtomicU16>,
    last_count: u16,
    radians_per_tick: f64,
    // Sign of the last commanded direction; retained across Coast so a
    // freewheeling wheel keeps its previous sign.
    direction_sign: f64,
    angle: f64,
    velocity: f64,
}

impl Encoder {
    /// `resolution` is the number of pulses per full wheel revolution.
    pub fn new(resolution: u32) -> (Self, PulseSource) {
        let ticks = Arc::new(AtomicU16::new(0));
        let source = PulseSource {
            ticks: Arc::clone(&ticks),
        };
        let encoder = Self {
            ticks,
            last_count: 0,
            radians_per_tick: TAU / resolution as f64,
            direction_sign: 1.0,
            angle: 0.0,
            velocity: 0.0,
        };
        (encoder, source)
    }

    /// Record the direction last commanded to the motor driver.
    pub fn set_direction(&mut self, direction: MotorDirection) {
        let sign = direction.sign();
        if sign != 0.0 {
            self.direction_sign = sign;
        }
    }

    /// Sample the shared counter and refresh the angle and velocity
    /// estimates. `dt` is the measured time since the previous sample.
    pub fn sample(&mut self, dt: f64) {
        let count = self.ticks.load(Ordering::Acquire);
        // Modular delta: correct across u16 wraparound, never a naive
        // subtraction.
        let delta_ticks = count.wrapping_sub(self.last_count);
        self.last_count = count;

        let advance = delta_ticks as f64 * self.radians_per_tick * self.direction_sign;
        self.angle += advance;

        self.velocity = if dt >= MIN_SAMPLE_DT {
            advance / dt
        } else {
            0.0
        };
    }

    /// Unwrapped accumulated wheel angle in radians.
    pub fn angle(&self) -> f64 {
        self.angle
    }

    /// Angular velocity in rad/s from the most recent sample.
    pub fn velocity(&self) -> f64 {
        self.velocity
    }
}
