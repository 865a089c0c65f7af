// THEORY:
// The `geometry` module holds the owned value types that flow out of a decision
// cycle. They are plain owned data returned by the fitter and the normalizer; no
// cycle shares or mutates geometry after it is built.

use serde::{Deserialize, Serialize};

/// Pixel-space ellipse: center, full axis lengths and rotation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ellipse {
    /// Center x, in image pixels.
    pub cx: f64,
    /// Center y, in image pixels.
    pub cy: f64,
    /// Full extent along the rotated x axis.
    pub width: f64,
    /// Full extent along the rotated y axis.
    pub height: f64,
    /// Rotation of the width axis from +x, in degrees.
    pub angle: f64,
}

impl Ellipse {
    pub fn new(cx: f64, cy: f64, width: f64, height: f64, angle: f64) -> Self {
        Self {
            cx,
            cy,
            width,
            height,
            angle,
        }
    }

    /// The larger of the two axis lengths.
    pub fn major_axis(&self) -> f64 {
        self.width.max(self.height)
    }

    /// Usable geometry: finite everywhere and non-negative axes.
    pub fn is_valid(&self) -> bool {
        [self.cx, self.cy, self.width, self.height, self.angle]
            .iter()
            .all(|v| v.is_finite())
            && self.width >= 0.0
            && self.height >= 0.0
    }
}

/// Normalized, camera-independent position of the ball in the frame.
///
/// `elements` is `[x, y, size_ratio, shape_ratio]`, where `x`/`y` are measured
/// from the frame center in units of the larger frame dimension.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ImagePosition {
    pub elements: [f64; 4],
}

impl ImagePosition {
    pub fn new(x: f64, y: f64, size_ratio: f64, shape_ratio: f64) -> Self {
        Self {
            elements: [x, y, size_ratio, shape_ratio],
        }
    }

    pub fn x(&self) -> f64 {
        self.elements[0]
    }

    pub fn y(&self) -> f64 {
        self.elements[1]
    }

    pub fn size_ratio(&self) -> f64 {
        self.elements[2]
    }

    pub fn shape_ratio(&self) -> f64 {
        self.elements[3]
    }
}

/// The overlay published every completed cycle: one ellipse on found, empty otherwise.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Overlay {
    pub ellipses: Vec<Ellipse>,
}

impl Overlay {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn single(ellipse: Ellipse) -> Self {
        Self {
            ellipses: vec![ellipse],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ellipses.is_empty()
    }
}
