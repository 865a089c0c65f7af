// THEORY:
// The `pipeline` module is the top-level API of the crate: the readiness-gated
// decision stage. It sits downstream of a blob detector and a camera-info provider
// and decides, once per cycle, whether the ball is in the frame.
//
// Key architectural principles:
// 1.  **Latest Wins**: Each input feed has a single snapshot slot. A new arrival
//     overwrites the previous value; nothing is queued, and no particular blob set is
//     paired with any particular camera info.
// 2.  **Readiness Flags**: The stage remembers which feeds have delivered since the
//     last decision. The `TriggerPolicy` decides whether any arrival or only a full set
//     of fresh inputs starts a decision attempt. Flags reset whenever an attempt runs.
// 3.  **Pure Core, Thin Shell**: The numeric work is done by the stateless
//     `ellipse_fitter` and `normalizer`. The stage only selects the candidate, calls
//     them, and publishes the outcome.
// 4.  **All or Nothing**: Every output of a cycle is computed before anything is
//     published. A failure anywhere aborts the cycle with no overlay, no position and
//     no signal, and leaves the stage ready for the next notification.
// 5.  **Host-Driven**: The stage never schedules itself. A host calls the handlers in
//     `DecisionHandlers` one at a time; `runner::StageRunner` is one such host.

use crate::bus::{DecisionSink, Signal};
use crate::core_modules::blob::BlobSet;
use crate::core_modules::camera_info::CameraInfo;
use crate::core_modules::ellipse_fitter::ellipse_fitter;
use crate::core_modules::normalizer::normalizer;
use image::GrayImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, trace};

// Re-export key data structures for the public API.
pub use crate::core_modules::error::{DecideError, FitError, NormalizeError};
pub use crate::core_modules::geometry::{Ellipse, ImagePosition, Overlay};

/// When an arrival is allowed to start a decision attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerPolicy {
    /// Blob-set and camera-info arrivals each attempt a decision from the latest
    /// snapshots. Raw frames are retained but never trigger.
    #[default]
    AnyArrival,
    /// Attempt only once a fresh blob set is paired with either fresh camera info or
    /// a fresh raw frame. Camera info published once still serves every later cycle.
    AllReady,
}

/// Configuration for the decision stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecideConfig {
    pub trigger: TriggerPolicy,
    /// Regions smaller than this are ignored during selection. `0.0` disables the filter.
    pub min_area: f64,
}

impl Default for DecideConfig {
    fn default() -> Self {
        Self {
            trigger: TriggerPolicy::AnyArrival,
            min_area: 0.0,
        }
    }
}

impl DecideConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// The outcome of one completed decision cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum DecisionResult {
    Found {
        ellipse: Ellipse,
        position: ImagePosition,
    },
    NotFound,
}

impl DecisionResult {
    pub fn is_found(&self) -> bool {
        matches!(self, DecisionResult::Found { .. })
    }
}

/// What a handler call did.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// No attempt ran: the trigger condition did not hold or a snapshot is missing.
    Skipped,
    /// An attempt ran and its results were published.
    Completed(DecisionResult),
    /// An attempt ran and aborted. Nothing was published.
    Failed(DecideError),
}

/// A single upstream notification, as delivered by a host dispatcher.
#[derive(Debug, Clone)]
pub enum Notification {
    Blobs(BlobSet),
    CameraInfo(CameraInfo),
    Image(GrayImage),
}

/// Per-cycle readiness of each input feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Readiness {
    pub blobs: bool,
    pub meta: bool,
    pub frame: bool,
}

impl Readiness {
    fn reset(&mut self) {
        *self = Self::default();
    }

    fn any(&self) -> bool {
        self.blobs || self.meta || self.frame
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    /// Nothing has arrived since the last decision.
    Idle,
    /// At least one feed delivered and the stage is waiting for its trigger.
    AwaitingTrigger,
}

/// Running totals over the stage's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StageStats {
    pub found: u64,
    pub not_found: u64,
    pub failed: u64,
}

impl StageStats {
    /// Attempts that ran, successful or not.
    pub fn attempts(&self) -> u64 {
        self.found + self.not_found + self.failed
    }
}

/// The capability set a host dispatcher drives. Calls must not overlap.
pub trait DecisionHandlers {
    fn on_new_blobs(&mut self, blobs: BlobSet) -> StepOutcome;
    fn on_new_camera_info(&mut self, camera: CameraInfo) -> StepOutcome;
    fn on_new_image(&mut self, image: GrayImage) -> StepOutcome;

    fn handle(&mut self, notification: Notification) -> StepOutcome {
        match notification {
            Notification::Blobs(blobs) => self.on_new_blobs(blobs),
            Notification::CameraInfo(camera) => self.on_new_camera_info(camera),
            Notification::Image(image) => self.on_new_image(image),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Arrival {
    Blobs,
    Meta,
    Frame,
}

/// The readiness-gated ball decision stage.
pub struct BallDecider<S: DecisionSink> {
    config: DecideConfig,
    sink: S,
    latest_blobs: Option<BlobSet>,
    latest_camera: Option<CameraInfo>,
    latest_frame: Option<GrayImage>,
    readiness: Readiness,
    stats: StageStats,
}

impl<S: DecisionSink> BallDecider<S> {
    pub fn new(config: DecideConfig, sink: S) -> Self {
        trace!(?config, "creating ball decider");
        Self {
            config,
            sink,
            latest_blobs: None,
            latest_camera: None,
            latest_frame: None,
            readiness: Readiness::default(),
            stats: StageStats::default(),
        }
    }

    pub fn config(&self) -> &DecideConfig {
        &self.config
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn readiness(&self) -> Readiness {
        self.readiness
    }

    pub fn state(&self) -> StageState {
        if self.readiness.any() {
            StageState::AwaitingTrigger
        } else {
            StageState::Idle
        }
    }

    pub fn stats(&self) -> StageStats {
        self.stats
    }

    pub fn latest_blobs(&self) -> Option<&BlobSet> {
        self.latest_blobs.as_ref()
    }

    pub fn latest_camera(&self) -> Option<&CameraInfo> {
        self.latest_camera.as_ref()
    }

    pub fn latest_frame(&self) -> Option<&GrayImage> {
        self.latest_frame.as_ref()
    }

    /// Runs one decision attempt from the current snapshots, ignoring the trigger
    /// policy. Readiness flags are reset first.
    pub fn step(&mut self) -> StepOutcome {
        self.readiness.reset();

        let decision = match (&self.latest_blobs, &self.latest_camera) {
            (Some(blobs), Some(camera)) => decide(blobs, camera, &self.config),
            (None, _) => Err(DecideError::MissingSnapshot("blob set")),
            (_, None) => Err(DecideError::MissingSnapshot("camera info")),
        };

        match decision {
            Ok(result) => {
                self.publish(&result);
                StepOutcome::Completed(result)
            }
            Err(err) => {
                error!(%err, "ball decision cycle failed");
                self.stats.failed += 1;
                StepOutcome::Failed(err)
            }
        }
    }

    fn publish(&mut self, result: &DecisionResult) {
        match result {
            DecisionResult::Found { ellipse, position } => {
                info!(
                    x = position.x(),
                    y = position.y(),
                    size = position.size_ratio(),
                    shape = position.shape_ratio(),
                    "ball found"
                );
                self.sink.write_overlay(Overlay::single(*ellipse));
                self.sink.write_position(*position);
                self.sink.raise(Signal::Found);
                self.stats.found += 1;
            }
            DecisionResult::NotFound => {
                info!("ball not found");
                self.sink.write_overlay(Overlay::empty());
                self.sink.raise(Signal::NotFound);
                self.stats.not_found += 1;
            }
        }
        self.sink.raise(Signal::CycleComplete);
    }

    fn should_attempt(&self, arrival: Arrival) -> bool {
        match self.config.trigger {
            TriggerPolicy::AnyArrival => !matches!(arrival, Arrival::Frame),
            TriggerPolicy::AllReady => {
                self.readiness.blobs && (self.readiness.meta || self.readiness.frame)
            }
        }
    }

    fn try_step(&mut self, arrival: Arrival) -> StepOutcome {
        if !self.should_attempt(arrival) {
            trace!(?arrival, readiness = ?self.readiness, "trigger condition not met");
            return StepOutcome::Skipped;
        }
        if self.latest_blobs.is_none() || self.latest_camera.is_none() {
            trace!(?arrival, "waiting for the first blob set and camera info");
            return StepOutcome::Skipped;
        }
        self.step()
    }
}

impl<S: DecisionSink> DecisionHandlers for BallDecider<S> {
    fn on_new_blobs(&mut self, blobs: BlobSet) -> StepOutcome {
        trace!(regions = blobs.len(), "on_new_blobs");
        self.latest_blobs = Some(blobs);
        self.readiness.blobs = true;
        self.try_step(Arrival::Blobs)
    }

    fn on_new_camera_info(&mut self, camera: CameraInfo) -> StepOutcome {
        trace!(width = camera.width, height = camera.height, "on_new_camera_info");
        self.latest_camera = Some(camera);
        self.readiness.meta = true;
        self.try_step(Arrival::Meta)
    }

    fn on_new_image(&mut self, image: GrayImage) -> StepOutcome {
        trace!(width = image.width(), height = image.height(), "on_new_image");
        self.latest_frame = Some(image);
        self.readiness.frame = true;
        self.try_step(Arrival::Frame)
    }
}

/// Selects the largest region and turns it into a decision. Pure; publishes nothing.
pub fn decide(
    blobs: &BlobSet,
    camera: &CameraInfo,
    config: &DecideConfig,
) -> Result<DecisionResult, DecideError> {
    let Some((index, region)) = blobs.largest(config.min_area) else {
        debug!(regions = blobs.len(), min_area = config.min_area, "no candidate region");
        return Ok(DecisionResult::NotFound);
    };

    let (ellipse, shape) = ellipse_fitter::fit_region(region)?;
    debug!(
        index,
        area = region.area,
        roundness = shape.roundness,
        major = shape.major,
        minor = shape.minor,
        ratio = shape.shape_ratio,
        "fitted candidate region"
    );

    let position = normalizer::normalize(&ellipse, camera, shape.shape_ratio)?;
    Ok(DecisionResult::Found { ellipse, position })
}
