// Mecanum base control runtime
//
// Closed-loop pipeline: body-velocity command -> inverse kinematics ->
// per-wheel PID control -> encoder feedback -> forward kinematics ->
// achieved body velocity -> dead-reckoned pose. Transport, pin
// configuration and time synchronization live outside this crate behind
// the CommandSource/TelemetrySink and DriveOutput/PulseSource boundaries.

pub mod config;
pub mod messages;
pub mod motor;
pub mod odometry;
pub mod runtime;
pub mod sim;
pub mod velocity_controller;
