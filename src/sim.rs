// First-order plant simulation
//
// Stands in for the physical motor/encoder pair: consumes the same drive
// output the H-bridge would and produces pulses through the same handle the
// pulse interrupt would. Used by the closed-loop tests and the binary's
// --simulate mode.

use std::f64::consts::TAU;
use std::sync::{Arc, Mutex};

use crate::config::RobotConfig;
use crate::motor::{
    DriveOutput, Encoder, HBridgeMotorDriver, MotorControllerManager, MotorDirection, Pid,
    PidMotorController, PulseSource, WheelIndex,
};
use crate::velocity_controller::VelocityController;

/// First-order motor model: `dv/dt = (duty * max_speed - load - v) / tau`
/// with the load always opposing the commanded direction.
#[derive(Debug, Clone, Copy)]
pub struct MotorModel {
    /// Steady-state speed at full duty with no load, rad/s.
    pub max_speed: f64,
    /// Mechanical time constant, seconds.
    pub time_constant: f64,
    /// Constant speed deficit under load, rad/s.
    pub load: f64,
}

impl Default for MotorModel {
    fn default() -> Self {
        Self {
            max_speed: 30.0,
            time_constant: 0.1,
            load: 0.0,
        }
    }
}

/// Drive output sink feeding the simulated plant instead of an H-bridge.
#[derive(Clone)]
pub struct SimDriveOutput {
    command: Arc<Mutex<f64>>,
}

impl DriveOutput for SimDriveOutput {
    fn apply(&mut self, direction: MotorDirection, duty: f64) {
        *self.command.lock().unwrap() = direction.sign() * duty;
    }
}

/// Converts a continuous angular velocity into discrete encoder pulses,
/// carrying the fractional remainder so no motion is lost to quantization.
pub struct PulseTrain {
    radians_per_tick: f64,
    carry: f64,
}

impl PulseTrain {
    pub fn new(resolution: u32) -> Self {
        Self {
            radians_per_tick: TAU / resolution as f64,
            carry: 0.0,
        }
    }

    /// Pulses produced by `velocity` rad/s over `dt` seconds. The single
    /// encoder channel sees only pulse edges, so the count is unsigned.
    /// A burst beyond the counter width saturates rather than wrapping.
    pub fn advance(&mut self, velocity: f64, dt: f64) -> u16 {
        self.carry += velocity.abs() * dt / self.radians_per_tick;
        let pulses = self.carry.floor();
        self.carry -= pulses;
        pulses.min(f64::from(u16::MAX)) as u16
    }
}

/// One simulated motor/encoder pair.
pub struct SimulatedMotor {
    model: MotorModel,
    command: Arc<Mutex<f64>>,
    pulses: PulseSource,
    train: PulseTrain,
    velocity: f64,
}

impl SimulatedMotor {
    /// Wire a plant to the pulse source of an existing encoder. Returns the
    /// drive output to hand to the motor driver.
    pub fn new(model: MotorModel, resolution: u32, pulses: PulseSource) -> (Self, SimDriveOutput) {
        let command = Arc::new(Mutex::new(0.0));
        let output = SimDriveOutput {
            command: Arc::clone(&command),
        };
        let motor = Self {
            model,
            command,
            pulses,
            train: PulseTrain::new(resolution),
            velocity: 0.0,
        };
        (motor, output)
    }

    /// Advance the plant by `dt` seconds and emit the resulting pulses.
    pub fn step(&mut self, dt: f64) {
        let duty = *self.command.lock().unwrap();
        let mut target = duty * self.model.max_speed;
        if target != 0.0 {
            target -= self.model.load * target.signum();
        }
        self.velocity += (target - self.velocity) * dt / self.model.time_constant;

        let pulses = self.train.advance(self.velocity, dt);
        self.pulses.pulse_n(pulses);
    }

    /// True plant velocity, for assertions against the encoder estimate.
    pub fn velocity(&self) -> f64 {
        self.velocity
    }
}

/// All four plants of a simulated base, stepped together.
pub struct SimulatedDrive {
    motors: Vec<SimulatedMotor>,
}

impl SimulatedDrive {
    pub fn new(motors: Vec<SimulatedMotor>) -> Self {
        Self { motors }
    }

    pub fn step_all(&mut self, dt: f64) {
        for motor in &mut self.motors {
            motor.step(dt);
        }
    }

    /// Startup probe, in place of pinging real motor hardware.
    pub fn probe(&self) -> Result<(), String> {
        if self.motors.len() == WheelIndex::COUNT {
            Ok(())
        } else {
            Err(format!("expected {} motors, found {}", WheelIndex::COUNT, self.motors.len()))
        }
    }
}

/// Build the full control stack against four simulated plants.
pub fn simulated_stack(config: &RobotConfig, model: MotorModel) -> (VelocityController, SimulatedDrive) {
    let mut motors = Vec::with_capacity(WheelIndex::COUNT);
    let controllers = WheelIndex::ALL.map(|_| {
        let (encoder, source) = Encoder::new(config.encoder_resolution);
        let (motor, output) = SimulatedMotor::new(model, config.encoder_resolution, source);
        motors.push(motor);
        PidMotorController::new(
            Box::new(HBridgeMotorDriver::new(output)),
            encoder,
            Pid::new(config.pid, 1.0),
            config.max_wheel_speed,
        )
    });
    let manager = MotorControllerManager::new(controllers);
    let controller = VelocityController::new(manager, config.build_kinematics());
    (controller, SimulatedDrive::new(motors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motor::Encoder;

    #[test]
    fn pulse_train_carries_fractional_pulses() {
        let mut train = PulseTrain::new(100);
        // 1 rad/s over 10 ms = 0.01 rad = ~0.159 pulses per step.
        let mut total: u32 = 0;
        for _ in 0..1000 {
            total += train.advance(1.0, 0.01) as u32;
        }
        // 10 rad total = 10 / (tau/100) = ~159 pulses.
        let expected = (10.0 / (TAU / 100.0)) as u32;
        assert!(total.abs_diff(expected) <= 1, "{total} vs {expected}");
    }

    #[test]
    fn oversized_pulse_burst_saturates_instead_of_wrapping() {
        let mut train = PulseTrain::new(100);
        // One million pulses in a single step, well past the counter width.
        let pulses = train.advance(TAU * 10_000.0, 1.0);
        assert_eq!(pulses, u16::MAX);

        // Normal operation afterwards is unaffected: one revolution gives
        // ~100 pulses, modulo the fractional carry.
        let pulses = train.advance(TAU, 1.0);
        assert!((99..=101).contains(&pulses), "{pulses}");
    }

    #[test]
    fn plant_settles_at_duty_times_max_speed() {
        let (encoder, source) = Encoder::new(2048);
        drop(encoder);
        let (mut motor, mut output) = SimulatedMotor::new(MotorModel::default(), 2048, source);

        output.apply(MotorDirection::Forward, 0.5);
        for _ in 0..1000 {
            motor.step(0.01);
        }
        assert!((motor.velocity() - 15.0).abs() < 1e-6);
    }

    #[test]
    fn load_reduces_steady_state_speed() {
        let model = MotorModel {
            max_speed: 30.0,
            time_constant: 0.05,
            load: 3.0,
        };
        let (encoder, source) = Encoder::new(2048);
        drop(encoder);
        let (mut motor, mut output) = SimulatedMotor::new(model, 2048, source);

        output.apply(MotorDirection::Forward, 1.0);
        for _ in 0..1000 {
            motor.step(0.01);
        }
        assert!((motor.velocity() - 27.0).abs() < 1e-6);
    }

    #[test]
    fn encoder_tracks_the_simulated_plant() {
        let (mut encoder, source) = Encoder::new(2048);
        let (mut motor, mut output) = SimulatedMotor::new(MotorModel::default(), 2048, source);

        output.apply(MotorDirection::Forward, 1.0);
        for _ in 0..500 {
            motor.step(0.01);
            encoder.sample(0.01);
        }
        // Settled plant at 30 rad/s; encoder quantizes to one tick per
        // sample at worst.
        assert!((encoder.velocity() - 30.0).abs() < 0.5);
    }
}
