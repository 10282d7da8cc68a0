// PID regulator for one motor velocity loop

use serde::{Deserialize, Serialize};

/// Proportional, integral and derivative gains plus the anti-windup bound on
/// the integral accumulator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    pub integral_limit: f64,
}

/// Last computed terms, kept for telemetry introspection.
#[derive(Debug, Clone, Copy, Default)]
pub struct PidTerms {
    pub proportional: f64,
    pub integral: f64,
    pub derivative: f64,
    pub output: f64,
    pub saturated: bool,
}

pub struct Pid {
    gains: PidGains,
    integral: f64,
    prev_error: Option<f64>,
    output_limit: f64,
    terms: PidTerms,
    saturation_count: u64,
}

impl Pid {
    /// `output_limit` is the symmetric saturation bound on the output,
    /// matching the driver's valid control range.
    pub fn new(gains: PidGains, output_limit: f64) -> Self {
        Self {
            gains,
            integral: 0.0,
            prev_error: None,
            output_limit,
            terms: PidTerms::default(),
            saturation_count: 0,
        }
    }

    /// One regulator step. A non-positive `dt` (timer wrap or loop reentry)
    /// skips integral accumulation and the derivative term for this cycle
    /// only; it never flips signs or divides by zero.
    pub fn update(&mut self, error: f64, dt: f64) -> f64 {
        let derivative = if dt > 0.0 {
            self.integral += error * dt;
            if self.gains.integral_limit > 0.0 {
                self.integral = self
                    .integral
                    .clamp(-self.gains.integral_limit, self.gains.integral_limit);
            }
            match self.prev_error {
                Some(prev) => (error - prev) / dt,
                None => 0.0,
            }
        } else {
            0.0
        };
        self.prev_error = Some(error);

        let p = self.gains.kp * error;
        let i = self.gains.ki * self.integral;
        let d = self.gains.kd * derivative;
        let raw = p + i + d;
        let output = raw.clamp(-self.output_limit, self.output_limit);
        let saturated = output != raw;
        if saturated {
            self.saturation_count += 1;
        }

        self.terms = PidTerms {
            proportional: p,
            integral: i,
            derivative: d,
            output,
            saturated,
        };
        output
    }

    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.prev_error = None;
        self.terms = PidTerms::default();
    }

    pub fn terms(&self) -> PidTerms {
        self.terms
    }

    /// Number of cycles whose output hit the saturation bound.
    pub fn saturation_count(&self) -> u64 {
        self.saturation_count
    }
}
