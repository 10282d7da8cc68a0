// Per-motor closed-loop control and the fixed-order aggregate
//
// A PidMotorController owns one driver/encoder pair; the manager steps all
// of them once per cycle in canonical WheelIndex order. The ordering is
// carried by construction: controllers are registered through the same
// WheelIndex-ordered array that the kinematics matrices use.

use thiserror::Error;
use tracing::debug;

use super::driver::MotorDriver;
use super::encoder::Encoder;
use super::kinematics::{WheelIndex, WheelVelocities};
use super::pid::{Pid, PidTerms};

/// Wiring-time failures. These are programming or configuration errors and
/// never occur mid-loop under correct wiring.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("setpoint vector length {got} does not match controller count {expected}")]
    SetpointLength { expected: usize, got: usize },
}

/// Closed-loop velocity control of one motor.
pub struct PidMotorController {
    driver: Box<dyn MotorDriver>,
    encoder: Encoder,
    pid: Pid,
    setpoint: f64,
    max_setpoint: f64,
    rejected_setpoints: u64,
}

impl PidMotorController {
    /// `max_setpoint` bounds the accepted target velocity magnitude (rad/s).
    pub fn new(driver: Box<dyn MotorDriver>, encoder: Encoder, pid: Pid, max_setpoint: f64) -> Self {
        Self {
            driver,
            encoder,
            pid,
            setpoint: 0.0,
            max_setpoint,
            rejected_setpoints: 0,
        }
    }

    /// Accept a new target velocity. Non-finite or out-of-range targets keep
    /// the last valid setpoint instead of being forwarded to the loop.
    pub fn set_setpoint(&mut self, setpoint: f64) {
        if !setpoint.is_finite() || setpoint.abs() > self.max_setpoint {
            self.rejected_setpoints += 1;
            debug!(setpoint, kept = self.setpoint, "rejected setpoint");
            return;
        }
        self.setpoint = setpoint;
    }

    /// One control cycle: sample feedback, step the regulator, dispatch to
    /// the driver and record the commanded direction on the encoder.
    pub fn update(&mut self, dt: f64) {
        self.encoder.sample(dt);
        let error = self.setpoint - self.encoder.velocity();
        let control = self.pid.update(error, dt);
        self.driver.set_motor_control(control);
        self.encoder.set_direction(self.driver.direction());
    }

    pub fn velocity(&self) -> f64 {
        self.encoder.velocity()
    }

    pub fn angle(&self) -> f64 {
        self.encoder.angle()
    }

    pub fn setpoint(&self) -> f64 {
        self.setpoint
    }

    pub fn pid_terms(&self) -> PidTerms {
        self.pid.terms()
    }

    pub fn saturation_count(&self) -> u64 {
        self.pid.saturation_count()
    }

    pub fn rejected_setpoints(&self) -> u64 {
        self.rejected_setpoints
    }
}

/// All wheel controllers under one fixed-order interface.
pub struct MotorControllerManager {
    controllers: Vec<PidMotorController>,
}

impl MotorControllerManager {
    /// Registration through a WheelIndex-ordered array keeps the manager
    /// ordering and the kinematics matrix ordering the same by construction.
    pub fn new(controllers: [PidMotorController; WheelIndex::COUNT]) -> Self {
        Self {
            controllers: controllers.into(),
        }
    }

    pub fn controller_count(&self) -> usize {
        self.controllers.len()
    }

    /// Route element i of `setpoints` to WheelIndex i. A length mismatch is
    /// a wiring bug and fails fast.
    pub fn set_setpoints(&mut self, setpoints: &[f64]) -> Result<(), ConfigError> {
        if setpoints.len() != self.controllers.len() {
            return Err(ConfigError::SetpointLength {
                expected: self.controllers.len(),
                got: setpoints.len(),
            });
        }
        for (controller, &setpoint) in self.controllers.iter_mut().zip(setpoints) {
            controller.set_setpoint(setpoint);
        }
        Ok(())
    }

    /// Step every controller once, in canonical order.
    pub fn update(&mut self, dt: f64) {
        for controller in &mut self.controllers {
            controller.update(dt);
        }
    }

    /// Measured wheel velocities in canonical order.
    pub fn velocities(&self) -> WheelVelocities {
        let mut out = [0.0; WheelIndex::COUNT];
        for (slot, controller) in out.iter_mut().zip(&self.controllers) {
            *slot = controller.velocity();
        }
        WheelVelocities(out)
    }

    /// Accumulated wheel angles in canonical order.
    pub fn angles(&self) -> [f64; WheelIndex::COUNT] {
        let mut out = [0.0; WheelIndex::COUNT];
        for (slot, controller) in out.iter_mut().zip(&self.controllers) {
            *slot = controller.angle();
        }
        out
    }

    pub fn controller(&self, wheel: WheelIndex) -> &PidMotorController {
        &self.controllers[wheel as usize]
    }
}
