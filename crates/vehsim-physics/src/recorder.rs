//! Per-step vehicle state recording.

use std::io::Write;

use serde::Serialize;

use crate::error::Result;
use crate::types::{Pose2, Twist2D};

/// Per-wheel quantities of one step.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct WheelLogRecord {
    /// Motor torque (N·m).
    pub torque: f64,
    /// Weight carried (N).
    pub weight: f64,
    /// Wheel center velocity, vehicle frame (m/s).
    pub velocity: [f64; 2],
    /// Ground force, vehicle frame (N).
    pub friction: [f64; 2],
    /// Spin rate after the step (rad/s).
    pub w: f64,
}

/// Vehicle state after one step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleLogRecord {
    /// Simulation time (s).
    pub timestamp: f64,
    /// Ground-truth pose.
    pub pose: Pose2,
    /// Ground-truth velocity, world frame.
    pub velocity: Twist2D,
    /// Wheel odometry estimate, vehicle frame.
    pub odometry: Twist2D,
    /// One entry per wheel.
    pub wheels: Vec<WheelLogRecord>,
}

/// In-memory log of a vehicle's steps.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct VehicleLog {
    records: Vec<VehicleLogRecord>,
}

impl VehicleLog {
    /// Append a record.
    pub fn push(&mut self, record: VehicleLogRecord) {
        self.records.push(record);
    }

    /// All records, oldest first.
    pub fn records(&self) -> &[VehicleLogRecord] {
        &self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop every record.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Write the log as a JSON array.
    pub fn write_json<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, &self.records)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_dump() {
        let mut log = VehicleLog::default();
        log.push(VehicleLogRecord {
            timestamp: 0.01,
            pose: Pose2::new(1.0, 2.0, 0.0),
            velocity: Twist2D::default(),
            odometry: Twist2D::default(),
            wheels: vec![WheelLogRecord::default(); 2],
        });

        let mut out = Vec::new();
        log.write_json(&mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value[0]["pose"]["y"], 2.0);
        assert_eq!(value[0]["wheels"].as_array().unwrap().len(), 2);
    }
}
