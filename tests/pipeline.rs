// Closed-loop scenarios over the whole control pipeline

use mecanum_runtime::config::RobotConfig;
use mecanum_runtime::motor::{
    BodyVelocity, DriveOutput, Encoder, HBridgeMotorDriver, MecanumKinematics, MotorDirection,
    MotorControllerManager, Pid, PidGains, PidMotorController, WheelIndex,
};
use mecanum_runtime::odometry::OdometryIntegrator;
use mecanum_runtime::sim::{MotorModel, PulseTrain, SimulatedMotor};
use mecanum_runtime::velocity_controller::VelocityController;

const DT: f64 = 0.01;
const RESOLUTION: u32 = 2048;

/// Drive output with no plant behind it.
struct NullOutput;

impl DriveOutput for NullOutput {
    fn apply(&mut self, _direction: MotorDirection, _duty: f64) {}
}

/// Sustained (0.5, 0, 0) command over 2 s of 10 ms cycles with ideal wheel
/// tracking: the dead-reckoned pose comes out at (1.0, 0.0, 0.0) and every
/// wheel turns at 0.5 / r rad/s.
#[test]
fn sustained_forward_command_dead_reckons_one_meter() {
    let config = RobotConfig::default();
    let wheel_speed = 0.5 / config.wheel_radius; // ~6.67 rad/s

    let mut trains = Vec::new();
    let mut sources = Vec::new();
    let controllers = WheelIndex::ALL.map(|_| {
        let (encoder, source) = Encoder::new(RESOLUTION);
        sources.push(source);
        trains.push(PulseTrain::new(RESOLUTION));
        // The drive output goes nowhere; the wheels track their setpoints
        // perfectly via the pulse trains below.
        PidMotorController::new(
            Box::new(HBridgeMotorDriver::new(NullOutput)),
            encoder,
            Pid::new(config.pid, 1.0),
            config.max_wheel_speed,
        )
    });

    let manager = MotorControllerManager::new(controllers);
    let kinematics = Box::new(MecanumKinematics::new(
        config.wheel_radius,
        config.half_span_x,
        config.half_span_y,
    ));
    let mut vc = VelocityController::new(manager, kinematics);
    let mut odometry = OdometryIntegrator::new();

    vc.set_latest_command(BodyVelocity::new(0.5, 0.0, 0.0));
    for _ in 0..200 {
        // Ideal tracking: each wheel advances exactly at its setpoint.
        for (train, source) in trains.iter_mut().zip(&sources) {
            source.pulse_n(train.advance(wheel_speed, DT));
        }
        vc.update(DT).unwrap();
        odometry.integrate(vc.robot_velocity(), DT);
    }

    let pose = odometry.pose();
    assert!((pose.x - 1.0).abs() < 0.01, "x = {}", pose.x);
    assert!(pose.y.abs() < 1e-6, "y = {}", pose.y);
    assert!(pose.theta.abs() < 1e-6, "theta = {}", pose.theta);

    let measured = vc.manager().velocities();
    for wheel in WheelIndex::ALL {
        let v = measured.get(wheel);
        assert!(
            (v - wheel_speed).abs() < 0.5,
            "{wheel:?}: {v} rad/s, expected ~{wheel_speed}"
        );
    }
}

fn loaded_loop(gains: PidGains) -> (PidMotorController, SimulatedMotor) {
    let model = MotorModel {
        max_speed: 30.0,
        time_constant: 0.05,
        load: 3.0,
    };
    let (encoder, source) = Encoder::new(RESOLUTION);
    let (plant, output) = SimulatedMotor::new(model, RESOLUTION, source);
    let controller = PidMotorController::new(
        Box::new(HBridgeMotorDriver::new(output)),
        encoder,
        Pid::new(gains, 1.0),
        50.0,
    );
    (controller, plant)
}

/// With an integral term, steady-state error under constant load vanishes.
#[test]
fn pi_control_eliminates_steady_state_error_under_load() {
    let (mut controller, mut plant) = loaded_loop(PidGains {
        kp: 0.05,
        ki: 0.5,
        kd: 0.0,
        integral_limit: 1.0,
    });
    let setpoint = 10.0;
    controller.set_setpoint(setpoint);

    let mut tail_sum = 0.0;
    let mut tail_count = 0;
    for cycle in 0..3000 {
        controller.update(DT);
        plant.step(DT);
        if cycle >= 2500 {
            tail_sum += plant.velocity();
            tail_count += 1;
        }
    }

    let error = setpoint - tail_sum / tail_count as f64;
    assert!(
        error.abs() < 0.5,
        "steady-state error {error} should vanish with ki > 0"
    );
}

/// Proportional-only control against the same load leaves a bounded but
/// distinctly non-zero steady-state error.
#[test]
fn p_only_control_leaves_bounded_steady_state_error_under_load() {
    let (mut controller, mut plant) = loaded_loop(PidGains {
        kp: 0.05,
        ki: 0.0,
        kd: 0.0,
        integral_limit: 0.0,
    });
    let setpoint = 10.0;
    controller.set_setpoint(setpoint);

    for _ in 0..3000 {
        controller.update(DT);
        plant.step(DT);
    }

    let error = setpoint - plant.velocity();
    assert!(
        error > 1.0,
        "P-only loop should not reach the setpoint under load, error = {error}"
    );
    assert!(
        error < setpoint,
        "P-only loop should still make progress, error = {error}"
    );
}
