// Example runner for the `ball_decide` library.
//
// Feeds a synthetic frame through the decision stage: a filled disk, then an empty
// blob set, and prints what the stage published.
//
// Usage: ball_decide [config.json]

use anyhow::Context;
use ball_decide::bus::DecisionBus;
use ball_decide::core_modules::blob::{BlobSet, Region};
use ball_decide::core_modules::camera_info::CameraInfo;
use ball_decide::pipeline::{BallDecider, DecideConfig, Notification};
use ball_decide::runner::StageRunner;
use std::env;
use tracing_subscriber::EnvFilter;

const FRAME_WIDTH: u32 = 320;
const FRAME_HEIGHT: u32 = 240;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let config = match env::args().nth(1) {
        Some(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config {path}"))?;
            DecideConfig::from_json(&json).with_context(|| format!("parsing config {path}"))?
        }
        None => DecideConfig::default(),
    };

    let bus = DecisionBus::new(16);
    let mut positions = bus.subscribe_positions();
    let mut signals = bus.subscribe_signals();

    let runner = StageRunner::spawn(BallDecider::new(config, bus.clone()));
    runner.notify(Notification::CameraInfo(CameraInfo::new(FRAME_WIDTH, FRAME_HEIGHT)))?;
    runner.notify(Notification::Blobs(BlobSet::new(vec![
        Region::disk(40, 40, 4),
        Region::disk(200, 90, 12),
    ])))?;
    runner.notify(Notification::Blobs(BlobSet::default()))?;

    let stage = runner.shutdown().await?;

    while let Ok(position) = positions.try_recv() {
        println!(
            "position: x={:.4} y={:.4} size={:.4} shape={:.4}",
            position.x(),
            position.y(),
            position.size_ratio(),
            position.shape_ratio()
        );
    }
    while let Ok(signal) = signals.try_recv() {
        println!("signal: {signal:?}");
    }
    println!("stats: {:?}", stage.stats());

    Ok(())
}
