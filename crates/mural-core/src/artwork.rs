//! Persisted artwork record.
//!
//! Pure data glue between a finished painting session and whatever store
//! the host app uses. No I/O here; with the `serde` feature the record
//! (de)serializes directly.

use crate::geometry::Pose;

/// One placed artwork: where it lives in the world and which stored image
/// renders it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArtworkRecord {
    /// Store-assigned identifier.
    pub id: String,
    /// Owning user.
    pub owner: String,
    /// World position `[x, y, z]`.
    pub position: [f64; 3],
    /// World rotation quaternion `[x, y, z, w]`.
    pub rotation: [f64; 4],
    /// Reference to the captured image in the host's storage.
    pub image_ref: String,
    /// Creation time, Unix milliseconds.
    pub created_unix_ms: i64,
    /// Edge length of the rendered quad in meters.
    pub scale: f64,
}

impl ArtworkRecord {
    /// Assemble a record from a session's strokes frame and a stored
    /// capture.
    #[must_use]
    pub fn from_capture(
        id: impl Into<String>,
        owner: impl Into<String>,
        frame: &Pose,
        image_ref: impl Into<String>,
        created_unix_ms: i64,
        scale: f64,
    ) -> Self {
        let q = frame.rotation.coords;
        Self {
            id: id.into(),
            owner: owner.into(),
            position: [frame.position.x, frame.position.y, frame.position.z],
            rotation: [q.x, q.y, q.z, q.w],
            image_ref: image_ref.into(),
            created_unix_ms,
            scale,
        }
    }

    /// Reconstruct the world pose for re-placement.
    #[must_use]
    pub fn pose(&self) -> Pose {
        let [x, y, z, w] = self.rotation;
        Pose::new(
            nalgebra::Vector3::new(self.position[0], self.position[1], self.position[2]),
            nalgebra::UnitQuaternion::from_quaternion(nalgebra::Quaternion::new(w, x, y, z)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{UnitQuaternion, Vector3};

    #[test]
    fn test_from_capture_round_trips_pose() {
        let frame = Pose::new(
            Vector3::new(1.0, 2.0, 3.0),
            UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 0.7),
        );
        let record =
            ArtworkRecord::from_capture("a1", "amos", &frame, "img/a1.png", 1_700_000_000_000, 1.5);
        assert_eq!(record.position, [1.0, 2.0, 3.0]);

        let restored = record.pose();
        assert!((restored.position - frame.position).norm() < 1e-12);
        assert!(restored.rotation.angle_to(&frame.rotation) < 1e-9);
    }
}
