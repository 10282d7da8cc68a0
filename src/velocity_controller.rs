// Top-level closed-loop velocity controller
//
// One update() call per control cycle: latest body command -> inverse
// kinematics -> per-wheel setpoints -> controller step -> measured wheel
// velocities -> forward kinematics -> achieved body velocity. The achieved
// velocity comes from the same cycle's encoder feedback, not from the raw
// command, which is what keeps the odometry honest.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::motor::{BodyVelocity, ConfigError, Kinematics, MotorControllerManager};

struct CommandSlot {
    command: BodyVelocity,
    received_at: Option<Instant>,
}

pub struct VelocityController {
    manager: MotorControllerManager,
    kinematics: Box<dyn Kinematics>,
    // Written by the transport delivery context, read by the control loop.
    // Last write wins; there is no queue.
    latest_command: Mutex<CommandSlot>,
    achieved: BodyVelocity,
}

impl VelocityController {
    pub fn new(manager: MotorControllerManager, kinematics: Box<dyn Kinematics>) -> Self {
        Self {
            manager,
            kinematics,
            latest_command: Mutex::new(CommandSlot {
                command: BodyVelocity::default(),
                received_at: None,
            }),
            achieved: BodyVelocity::default(),
        }
    }

    /// Store the newest command. Safe to call concurrently with `update`.
    /// Non-finite commands are dropped; the previous command stays active.
    pub fn set_latest_command(&self, command: BodyVelocity) {
        if !command.is_finite() {
            return;
        }
        let mut slot = self.latest_command.lock().unwrap();
        slot.command = command;
        slot.received_at = Some(Instant::now());
    }

    /// One control cycle with measured elapsed time `dt` in seconds.
    pub fn update(&mut self, dt: f64) -> Result<(), ConfigError> {
        let command = self.latest_command.lock().unwrap().command;

        let setpoints = self.kinematics.inverse(command);
        self.manager.set_setpoints(&setpoints.as_array())?;
        self.manager.update(dt);

        let measured = self.manager.velocities();
        self.achieved = self.kinematics.forward(measured);
        Ok(())
    }

    /// Achieved body velocity reconstructed from this cycle's feedback.
    pub fn robot_velocity(&self) -> BodyVelocity {
        self.achieved
    }

    /// Age of the active command, if one was ever received. Staleness is
    /// reported through health telemetry, never acted on here.
    pub fn command_age(&self) -> Option<Duration> {
        self.latest_command
            .lock()
            .unwrap()
            .received_at
            .map(|at| at.elapsed())
    }

    pub fn manager(&self) -> &MotorControllerManager {
        &self.manager
    }
}
