// Message types crossing the transport boundary
//
// The transport itself is an external collaborator; the runtime only
// produces and consumes these owned, serializable records.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::motor::{BodyVelocity, WheelIndex};
use crate::odometry::{PlanarQuaternion, Pose2D};

/// Command from teleop/planner -> runtime.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VelocityCommand {
    pub linear_x: f64,
    pub linear_y: f64,
    pub angular_z: f64,
}

impl From<VelocityCommand> for BodyVelocity {
    fn from(cmd: VelocityCommand) -> Self {
        BodyVelocity::new(cmd.linear_x, cmd.linear_y, cmd.angular_z)
    }
}

/// Locally monotonic timestamp, split ROS-style into seconds and
/// nanoseconds. Conversion to absolute time is the job of an external
/// synchronization collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp {
    pub sec: u64,
    pub nanosec: u32,
}

impl From<Duration> for Timestamp {
    fn from(elapsed: Duration) -> Self {
        Self {
            sec: elapsed.as_secs(),
            nanosec: elapsed.subsec_nanos(),
        }
    }
}

/// Odometry output: pose plus the achieved body velocity it was integrated
/// from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OdometryRecord {
    pub stamp: Timestamp,
    pub pose: Pose2D,
    pub orientation: PlanarQuaternion,
    pub velocity: BodyVelocity,
}

/// Per-wheel angle and velocity in canonical [`WheelIndex`] order.
/// Outbound only, hence no Deserialize: the names are static.
#[derive(Debug, Clone, Serialize)]
pub struct JointStateRecord {
    pub stamp: Timestamp,
    pub names: [&'static str; WheelIndex::COUNT],
    pub positions: [f64; WheelIndex::COUNT],
    pub velocities: [f64; WheelIndex::COUNT],
}

impl JointStateRecord {
    pub fn new(
        stamp: Timestamp,
        positions: [f64; WheelIndex::COUNT],
        velocities: [f64; WheelIndex::COUNT],
    ) -> Self {
        Self {
            stamp,
            names: WheelIndex::ALL.map(WheelIndex::joint_name),
            positions,
            velocities,
        }
    }
}

/// Health status published by the runtime each cycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeHealth {
    Ok,
    CmdStale,
}
