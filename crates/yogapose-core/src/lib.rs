//! Core domain types and error definitions for yogapose.
//!
//! This crate provides the types shared across the yogapose workspace:
//!
//! - [`PoseError`] — Error type for decoding, inference and formatting
//! - [`KeypointName`] and [`KEYPOINT_NAMES`] — The 17 MoveNet landmarks in output order
//! - [`Keypoint`] and [`DetectionResult`] — Client-facing detection payload
//!
//! # Example
//!
//! ```rust
//! use yogapose_core::{DetectionResult, KeypointName, KEYPOINT_COUNT};
//!
//! // One [y, x, score] triplet per keypoint, as the model emits them.
//! let raw: Vec<f32> = (0..KEYPOINT_COUNT)
//!     .flat_map(|_| [0.5, 0.25, 0.8])
//!     .collect();
//!
//! let result = DetectionResult::from_raw(&raw).unwrap();
//! assert_eq!(result.keypoints.len(), 17);
//! assert_eq!(result.keypoints[0].name, KeypointName::Nose);
//! assert!((result.avg_score - 0.8).abs() < 1e-6);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of keypoints emitted by a single-pose MoveNet model.
pub const KEYPOINT_COUNT: usize = 17;

/// Values per keypoint in the raw output: `[y, x, score]`.
pub const KEYPOINT_CHANNELS: usize = 3;

/// Side length of the square RGB frame the model consumes.
pub const MODEL_INPUT_SIZE: usize = 256;

/// Model input shape: batch, height, width, RGB.
pub const INPUT_SHAPE: [usize; 4] = [1, MODEL_INPUT_SIZE, MODEL_INPUT_SIZE, 3];

/// Model output shape: batch, instance, keypoint, `[y, x, score]`.
pub const OUTPUT_SHAPE: [usize; 4] = [1, 1, KEYPOINT_COUNT, KEYPOINT_CHANNELS];

/// Errors that can occur between receiving image bytes and emitting keypoints.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PoseError {
    /// Base64 text could not be decoded.
    #[error("{0}")]
    Base64(String),

    /// Bytes are not a recognizable image encoding.
    #[error("{0}")]
    Decode(String),

    /// A tensor did not have the shape a stage requires.
    #[error("Invalid {stage} tensor shape: expected {expected:?}, got {actual:?}")]
    Shape {
        stage: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// The inference runtime reported a failure.
    #[error("{0}")]
    Engine(String),

    /// Anything else, e.g. a worker task that panicked.
    #[error("{0}")]
    Internal(String),
}

impl PoseError {
    /// Creates a shape error for the given pipeline stage.
    pub fn shape(stage: &'static str, expected: &[usize], actual: &[usize]) -> Self {
        Self::Shape {
            stage,
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }

    /// Short kind label for logging. Never sent to clients.
    pub fn kind(&self) -> &'static str {
        match self {
            PoseError::Base64(_) => "base64",
            PoseError::Decode(_) => "decode",
            PoseError::Shape { .. } => "shape",
            PoseError::Engine(_) => "engine",
            PoseError::Internal(_) => "internal",
        }
    }
}

// ============================================================================
// Keypoints
// ============================================================================

/// Anatomical landmark labels, in the order the model emits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeypointName {
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

/// Canonical output order. Index `i` labels row `i` of the model output.
pub const KEYPOINT_NAMES: [KeypointName; KEYPOINT_COUNT] = [
    KeypointName::Nose,
    KeypointName::LeftEye,
    KeypointName::RightEye,
    KeypointName::LeftEar,
    KeypointName::RightEar,
    KeypointName::LeftShoulder,
    KeypointName::RightShoulder,
    KeypointName::LeftElbow,
    KeypointName::RightElbow,
    KeypointName::LeftWrist,
    KeypointName::RightWrist,
    KeypointName::LeftHip,
    KeypointName::RightHip,
    KeypointName::LeftKnee,
    KeypointName::RightKnee,
    KeypointName::LeftAnkle,
    KeypointName::RightAnkle,
];

impl KeypointName {
    /// Wire name, e.g. `"left_shoulder"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            KeypointName::Nose => "nose",
            KeypointName::LeftEye => "left_eye",
            KeypointName::RightEye => "right_eye",
            KeypointName::LeftEar => "left_ear",
            KeypointName::RightEar => "right_ear",
            KeypointName::LeftShoulder => "left_shoulder",
            KeypointName::RightShoulder => "right_shoulder",
            KeypointName::LeftElbow => "left_elbow",
            KeypointName::RightElbow => "right_elbow",
            KeypointName::LeftWrist => "left_wrist",
            KeypointName::RightWrist => "right_wrist",
            KeypointName::LeftHip => "left_hip",
            KeypointName::RightHip => "right_hip",
            KeypointName::LeftKnee => "left_knee",
            KeypointName::RightKnee => "right_knee",
            KeypointName::LeftAnkle => "left_ankle",
            KeypointName::RightAnkle => "right_ankle",
        }
    }
}

impl fmt::Display for KeypointName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One landmark's estimated location and confidence.
///
/// `y` and `x` are fractions of the 256×256 model input frame, not pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub name: KeypointName,
    pub y: f32,
    pub x: f32,
    pub score: f32,
}

/// Detection payload returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Exactly [`KEYPOINT_COUNT`] entries in [`KEYPOINT_NAMES`] order.
    pub keypoints: Vec<Keypoint>,
    /// Arithmetic mean of the keypoint scores.
    pub avg_score: f32,
}

impl DetectionResult {
    /// Formats the raw model output.
    ///
    /// `raw` is the row-major contents of the `[1, 1, 17, 3]` output tensor,
    /// i.e. 17 consecutive `[y, x, score]` triplets.
    pub fn from_raw(raw: &[f32]) -> Result<Self, PoseError> {
        let expected = KEYPOINT_COUNT * KEYPOINT_CHANNELS;
        if raw.len() != expected {
            return Err(PoseError::shape("output", &[expected], &[raw.len()]));
        }

        let keypoints: Vec<Keypoint> = raw
            .chunks_exact(KEYPOINT_CHANNELS)
            .zip(KEYPOINT_NAMES)
            .map(|(row, name)| Keypoint {
                name,
                y: row[0],
                x: row[1],
                score: row[2],
            })
            .collect();

        let total: f64 = keypoints.iter().map(|k| f64::from(k.score)).sum();
        let avg_score = (total / KEYPOINT_COUNT as f64) as f32;

        Ok(Self { keypoints, avg_score })
    }
}
