// Motor actuation capability
//
// A MotorDriver turns a signed normalized control value into direction and
// duty output. The physical side (H-bridge direction pins plus a PWM duty
// channel) sits behind the DriveOutput sink so hardware register access
// never leaks into the control code.

use tracing::debug;

/// Spin direction derived from the sign of the control value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MotorDirection {
    Forward,
    Backward,
    /// Zero duty, both direction pins released.
    #[default]
    Coast,
}

impl MotorDirection {
    pub fn from_control(value: f64) -> Self {
        if value > 0.0 {
            MotorDirection::Forward
        } else if value < 0.0 {
            MotorDirection::Backward
        } else {
            MotorDirection::Coast
        }
    }

    /// Sign multiplier used when inferring encoder direction.
    pub fn sign(self) -> f64 {
        match self {
            MotorDirection::Forward => 1.0,
            MotorDirection::Backward => -1.0,
            MotorDirection::Coast => 0.0,
        }
    }
}

/// Capability interface over one motor's actuation path.
pub trait MotorDriver: Send {
    /// Apply a normalized control value in [-1, 1]. Values outside the range
    /// are clamped; the sign selects direction, the magnitude the duty.
    fn set_motor_control(&mut self, value: f64);

    /// The value actually applied by the last call (after clamping).
    fn last_control(&self) -> f64;

    /// Direction commanded by the last call.
    fn direction(&self) -> MotorDirection {
        MotorDirection::from_control(self.last_control())
    }
}

/// Raw output stage behind an [`HBridgeMotorDriver`].
///
/// Implementations write the direction pins and duty register of one motor
/// channel. The simulator implements this too, which is how the plant model
/// receives its drive input.
pub trait DriveOutput: Send {
    fn apply(&mut self, direction: MotorDirection, duty: f64);
}

/// H-bridge style driver: sign to direction pins, magnitude to PWM duty.
pub struct HBridgeMotorDriver<O: DriveOutput> {
    output: O,
    last_control: f64,
}

impl<O: DriveOutput> HBridgeMotorDriver<O> {
    pub fn new(output: O) -> Self {
        Self {
            output,
            last_control: 0.0,
        }
    }
}

impl<O: DriveOutput> MotorDriver for HBridgeMotorDriver<O> {
    fn set_motor_control(&mut self, value: f64) {
        // Non-finite input would latch garbage into the duty register.
        let value = if value.is_finite() { value } else { 0.0 };
        let clamped = value.clamp(-1.0, 1.0);

        let direction = MotorDirection::from_control(clamped);
        let duty = clamped.abs();
        debug!(?direction, duty, "motor control");
        self.output.apply(direction, duty);
        self.last_control = clamped;
    }

    fn last_control(&self) -> f64 {
        self.last_control
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingOutput {
        applied: Vec<(MotorDirection, f64)>,
    }

    impl DriveOutput for &mut RecordingOutput {
        fn apply(&mut self, direction: MotorDirection, duty: f64) {
            self.applied.push((direction, duty));
        }
    }

    #[test]
    fn sign_selects_direction_and_magnitude_selects_duty() {
        let mut out = RecordingOutput::default();
        {
            let mut driver = HBridgeMotorDriver::new(&mut out);
            driver.set_motor_control(0.25);
            driver.set_motor_control(-0.5);
            driver.set_motor_control(0.0);
        }
        assert_eq!(
            out.applied,
            vec![
                (MotorDirection::Forward, 0.25),
                (MotorDirection::Backward, 0.5),
                (MotorDirection::Coast, 0.0),
            ]
        );
    }

    #[test]
    fn out_of_range_control_is_clamped() {
        let mut out = RecordingOutput::default();
        let mut driver = HBridgeMotorDriver::new(&mut out);
        driver.set_motor_control(3.7);
        assert_eq!(driver.last_control(), 1.0);
        driver.set_motor_control(-100.0);
        assert_eq!(driver.last_control(), -1.0);
    }

    #[test]
    fn non_finite_control_coasts() {
        let mut out = RecordingOutput::default();
        let mut driver = HBridgeMotorDriver::new(&mut out);
        driver.set_motor_control(f64::NAN);
        assert_eq!(driver.last_control(), 0.0);
        assert_eq!(driver.direction(), MotorDirection::Coast);
    }
}
