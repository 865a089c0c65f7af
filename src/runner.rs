// THEORY:
// The `runner` is a minimal host for the decision stage. The stage itself is
// synchronous and must never see two notifications at once, so the runner gives it a
// single owning task and a queue in front of it:
//
// 1.  **One Task, One Stage**: `StageRunner::spawn` moves the stage into a tokio task
//     that drains an unbounded mpsc channel. Notifications are handled strictly in
//     arrival order, each to completion before the next.
// 2.  **Cloneable Senders**: Any number of producers (blob detector, camera driver,
//     frame grabber) can hold a sender. The task ends when every sender is dropped.
// 3.  **Ownership Comes Back**: `shutdown` returns the stage, so a caller can inspect
//     its sink or statistics after the stream is done.

use crate::bus::DecisionSink;
use crate::pipeline::{BallDecider, DecisionHandlers, Notification, StepOutcome};
use futures::{Stream, StreamExt};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("stage task has stopped accepting notifications")]
    Closed,

    #[error("stage task panicked or was cancelled: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Owns a decision stage on its own task and feeds it notifications in order.
pub struct StageRunner<S: DecisionSink + Send + 'static> {
    sender: mpsc::UnboundedSender<Notification>,
    worker: JoinHandle<BallDecider<S>>,
}

impl<S: DecisionSink + Send + 'static> StageRunner<S> {
    pub fn spawn(mut stage: BallDecider<S>) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Notification>();

        let worker = tokio::spawn(async move {
            while let Some(notification) = receiver.recv().await {
                log_outcome(&stage.handle(notification));
            }
            debug!(stats = ?stage.stats(), "stage runner drained");
            stage
        });

        Self { sender, worker }
    }

    pub fn notify(&self, notification: Notification) -> Result<(), RunnerError> {
        self.sender
            .send(notification)
            .map_err(|_| RunnerError::Closed)
    }

    /// A new producer handle for this stage.
    pub fn sender(&self) -> mpsc::UnboundedSender<Notification> {
        self.sender.clone()
    }

    /// Stops accepting notifications, waits for queued ones, and returns the stage.
    /// Outstanding clones of `sender()` keep the task alive until they drop.
    pub async fn shutdown(self) -> Result<BallDecider<S>, RunnerError> {
        drop(self.sender);
        Ok(self.worker.await?)
    }
}

/// Drives `stage` with every notification from `stream`, in order.
/// Returns the number of notifications that completed a decision cycle.
pub async fn run_stream<S, St>(stage: &mut BallDecider<S>, stream: St) -> usize
where
    S: DecisionSink,
    St: Stream<Item = Notification>,
{
    let mut stream = std::pin::pin!(stream);
    let mut completed = 0;
    while let Some(notification) = stream.next().await {
        let outcome = stage.handle(notification);
        if matches!(outcome, StepOutcome::Completed(_)) {
            completed += 1;
        }
        log_outcome(&outcome);
    }
    completed
}

fn log_outcome(outcome: &StepOutcome) {
    match outcome {
        StepOutcome::Skipped => {}
        StepOutcome::Completed(result) => debug!(found = result.is_found(), "cycle completed"),
        StepOutcome::Failed(err) => debug!(%err, "cycle dropped"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{RecordingSink, Signal};
    use crate::core_modules::blob::{BlobSet, Region, RegionMoments};
    use crate::core_modules::camera_info::CameraInfo;
    use crate::pipeline::DecideConfig;

    #[tokio::test]
    async fn runner_handles_notifications_in_order() {
        let runner = StageRunner::spawn(BallDecider::new(
            DecideConfig::default(),
            RecordingSink::new(),
        ));
        runner
            .notify(Notification::CameraInfo(CameraInfo::new(640, 480)))
            .unwrap();
        runner.notify(Notification::Blobs(BlobSet::default())).unwrap();
        runner.notify(Notification::Blobs(BlobSet::default())).unwrap();

        let stage = runner.shutdown().await.unwrap();
        assert_eq!(stage.stats().not_found, 2);
        assert_eq!(
            stage.sink().signals,
            vec![
                Signal::NotFound,
                Signal::CycleComplete,
                Signal::NotFound,
                Signal::CycleComplete
            ]
        );
    }

    #[tokio::test]
    async fn run_stream_counts_completed_cycles() {
        let mut stage = BallDecider::new(DecideConfig::default(), RecordingSink::new());
        let notifications = futures::stream::iter(vec![
            Notification::Blobs(BlobSet::default()),
            Notification::CameraInfo(CameraInfo::new(320, 240)),
            Notification::CameraInfo(CameraInfo::new(0, 0)),
        ]);

        let completed = run_stream(&mut stage, notifications).await;
        // An empty blob set never reaches the normalizer, so the zero-size
        // frame still completes as not-found.
        assert_eq!(completed, 2);
        assert_eq!(stage.stats().not_found, 2);
    }

    #[tokio::test]
    async fn run_stream_survives_a_failed_cycle() {
        let mut stage = BallDecider::new(DecideConfig::default(), RecordingSink::new());
        let empty = Region::new(0.0, RegionMoments::default(), None);
        let notifications = futures::stream::iter(vec![
            Notification::CameraInfo(CameraInfo::new(320, 240)),
            Notification::Blobs(BlobSet::new(vec![empty])),
            Notification::Blobs(BlobSet::new(vec![Region::disk(160, 120, 6)])),
        ]);

        let completed = run_stream(&mut stage, notifications).await;
        assert_eq!(completed, 1);
        assert_eq!(stage.stats().failed, 1);
        assert_eq!(stage.stats().found, 1);
        assert_eq!(stage.sink().signals, vec![Signal::Found, Signal::CycleComplete]);
    }
}
