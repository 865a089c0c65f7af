// THEORY:
// The `error` module names every way a decision cycle can fail. Each error is
// scoped to one cycle: the stage logs it, drops that cycle, and keeps running.

use thiserror::Error;

/// Errors raised while deriving shape from region moments.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FitError {
    #[error("region is empty (area {area}, m00 {m00})")]
    EmptyRegion { area: f64, m00: f64 },

    #[error("region moments are not finite")]
    NonFiniteMoments,

    #[error("moments describe no measurable ellipse (axes {major} x {minor})")]
    DegenerateAxes { major: f64, minor: f64 },
}

/// Errors raised while normalizing pixel geometry against the frame size.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NormalizeError {
    #[error("frame has zero size ({width}x{height})")]
    ZeroSizeFrame { width: u32, height: u32 },

    #[error("ellipse geometry is not usable: {0:?}")]
    InvalidEllipse(crate::core_modules::geometry::Ellipse),
}

/// Failure of one decision cycle. Never fatal to the stage.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecideError {
    #[error("fit failed: {0}")]
    Fit(#[from] FitError),

    #[error("normalization failed: {0}")]
    Normalize(#[from] NormalizeError),

    #[error("no {0} snapshot has arrived yet")]
    MissingSnapshot(&'static str),
}
