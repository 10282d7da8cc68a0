// Motor control for a four-wheel mecanum base
//
// Provides:
// - Mecanum kinematics (body velocity <-> wheel velocities)
// - Single-channel encoder sampling with interrupt-shared pulse counting
// - Per-motor PID control and the fixed-order controller manager

pub mod controller;
pub mod driver;
pub mod encoder;
pub mod kinematics;
pub mod pid;

pub use controller::{ConfigError, MotorControllerManager, PidMotorController};
pub use driver::{DriveOutput, HBridgeMotorDriver, MotorDirection, MotorDriver};
pub use encoder::{Encoder, PulseSource};
pub use kinematics::{BodyVelocity, Kinematics, MecanumKinematics, WheelIndex, WheelVelocities};
pub use pid::{Pid, PidGains, PidTerms};
