// THEORY:
// `CameraInfo` is the resolution snapshot from the camera provider. Only the latest
// value matters; the normalizer divides by its larger dimension.

use serde::{Deserialize, Serialize};

/// Resolution of the camera frame the blobs were detected in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CameraInfo {
    pub width: u32,
    pub height: u32,
}

impl CameraInfo {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// The larger frame dimension, used as the normalization unit.
    pub fn max_pixels(&self) -> u32 {
        self.width.max(self.height)
    }

    pub fn center(&self) -> (f64, f64) {
        (self.width as f64 / 2.0, self.height as f64 / 2.0)
    }
}
