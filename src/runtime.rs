// Fixed-rate control loop
//
// Per tick: drain pending commands (latest wins), run one closed-loop
// control cycle with measured dt, integrate odometry and publish telemetry.
// The loop is best-effort periodic; nothing assumes the nominal period.

use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::time::interval;
use tracing::{info, warn};

use crate::config::RobotConfig;
use crate::messages::{JointStateRecord, OdometryRecord, RuntimeHealth, Timestamp, VelocityCommand};
use crate::motor::ConfigError;
use crate::odometry::OdometryIntegrator;
use crate::velocity_controller::VelocityController;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("drive initialization failed after {attempts} attempts: {last}")]
    InitFailed { attempts: u32, last: String },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Non-blocking source of velocity commands; the transport collaborator
/// sits behind this.
pub trait CommandSource: Send {
    fn try_recv(&mut self) -> Option<VelocityCommand>;
}

/// Outbound telemetry boundary.
pub trait TelemetrySink: Send {
    fn publish_odometry(&mut self, record: &OdometryRecord);
    fn publish_joint_states(&mut self, record: &JointStateRecord);
    fn publish_health(&mut self, health: RuntimeHealth);
}

/// Command source backed by a tokio channel.
pub struct MpscCommandSource {
    receiver: tokio::sync::mpsc::Receiver<VelocityCommand>,
}

impl MpscCommandSource {
    pub fn new(receiver: tokio::sync::mpsc::Receiver<VelocityCommand>) -> Self {
        Self { receiver }
    }
}

impl CommandSource for MpscCommandSource {
    fn try_recv(&mut self) -> Option<VelocityCommand> {
        self.receiver.try_recv().ok()
    }
}

/// Telemetry sink that serializes each record to JSON on the log stream.
#[derive(Default)]
pub struct JsonLogSink;

impl TelemetrySink for JsonLogSink {
    fn publish_odometry(&mut self, record: &OdometryRecord) {
        if let Ok(json) = serde_json::to_string(record) {
            info!(target: "telemetry::odom", "{json}");
        }
    }

    fn publish_joint_states(&mut self, record: &JointStateRecord) {
        if let Ok(json) = serde_json::to_string(record) {
            info!(target: "telemetry::joint_states", "{json}");
        }
    }

    fn publish_health(&mut self, health: RuntimeHealth) {
        if let Ok(json) = serde_json::to_string(&health) {
            info!(target: "telemetry::health", "{json}");
        }
    }
}

/// Bounded-retry-with-backoff initialization. Each attempt probes the drive
/// hardware; exhaustion returns an explicit error instead of blocking
/// forever.
pub async fn initialize_drive<F>(config: &RobotConfig, mut attempt: F) -> Result<(), RuntimeError>
where
    F: FnMut() -> Result<(), String>,
{
    let mut last = String::new();
    for tries in 1..=config.init_retries {
        match attempt() {
            Ok(()) => {
                info!(tries, "drive initialized");
                return Ok(());
            }
            Err(reason) => {
                warn!(tries, %reason, "drive initialization failed, retrying");
                last = reason;
                // No point backing off once the budget is spent.
                if tries < config.init_retries {
                    tokio::time::sleep(config.init_backoff() * tries).await;
                }
            }
        }
    }
    Err(RuntimeError::InitFailed {
        attempts: config.init_retries,
        last,
    })
}

pub struct Runtime {
    config: RobotConfig,
    velocity_controller: VelocityController,
    odometry: OdometryIntegrator,
    started: Instant,
    health: RuntimeHealth,
}

impl Runtime {
    pub fn new(config: RobotConfig, velocity_controller: VelocityController) -> Self {
        Self {
            config,
            velocity_controller,
            odometry: OdometryIntegrator::new(),
            started: Instant::now(),
            health: RuntimeHealth::CmdStale, // stale until the first command
        }
    }

    fn stamp(&self) -> Timestamp {
        Timestamp::from(self.started.elapsed())
    }

    /// Staleness is report-only: a stale command keeps actuating until
    /// overwritten, but the health stream makes the condition visible.
    fn assess_health(&mut self) -> RuntimeHealth {
        let stale = match self.velocity_controller.command_age() {
            Some(age) => age > self.config.cmd_stale_after(),
            None => true,
        };
        let health = if stale {
            RuntimeHealth::CmdStale
        } else {
            RuntimeHealth::Ok
        };
        if health != self.health {
            match health {
                RuntimeHealth::CmdStale => warn!("command stale"),
                RuntimeHealth::Ok => info!("command stream healthy"),
            }
            self.health = health;
        }
        health
    }

    /// One control cycle over measured `dt` seconds.
    fn cycle(
        &mut self,
        dt: f64,
    ) -> Result<(OdometryRecord, JointStateRecord, RuntimeHealth), ConfigError> {
        self.velocity_controller.update(dt)?;
        let velocity = self.velocity_controller.robot_velocity();
        self.odometry.integrate(velocity, dt);

        let stamp = self.stamp();
        let pose = self.odometry.pose();
        let odom = OdometryRecord {
            stamp,
            pose,
            orientation: pose.quaternion(),
            velocity,
        };
        let manager = self.velocity_controller.manager();
        let joints = JointStateRecord::new(stamp, manager.angles(), manager.velocities().as_array());
        let health = self.assess_health();
        Ok((odom, joints, health))
    }

    /// Run the loop until `duration` elapses, or forever when `None`.
    pub async fn run<S, T>(
        mut self,
        mut source: S,
        mut sink: T,
        duration: Option<Duration>,
    ) -> Result<(), RuntimeError>
    where
        S: CommandSource,
        T: TelemetrySink,
    {
        let period = self.config.loop_period();
        let mut tick = interval(period);
        let deadline = duration.map(|d| Instant::now() + d);

        info!(
            period_ms = period.as_millis() as u64,
            stale_after_ms = self.config.cmd_stale_after_ms,
            "runtime started"
        );

        let mut last = Instant::now();
        loop {
            tick.tick().await;
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    info!("runtime duration elapsed");
                    return Ok(());
                }
            }

            // Drain pending commands without blocking; absence of input is
            // "no update this cycle", not an error.
            while let Some(cmd) = source.try_recv() {
                self.velocity_controller.set_latest_command(cmd.into());
            }

            let now = Instant::now();
            let dt = now.duration_since(last).as_secs_f64();
            last = now;

            let (odom, joints, health) = self.cycle(dt)?;
            sink.publish_odometry(&odom);
            sink.publish_joint_states(&joints);
            sink.publish_health(health);
        }
    }
}
