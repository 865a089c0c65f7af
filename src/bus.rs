// THEORY:
// The `bus` module is the outbound side of the decision stage. The stage never knows
// who is listening; it writes to a `DecisionSink`. Two sinks ship with the crate:
//
// 1.  **RecordingSink**: keeps every overlay, position and signal in memory. Useful for
//     embedding the stage in a synchronous host and for tests.
// 2.  **DecisionBus**: fans everything out over tokio broadcast channels so any number
//     of async consumers (a renderer, a controller, a logger) can subscribe. A send with
//     no subscribers is not an error; the value is dropped.

use crate::core_modules::geometry::{ImagePosition, Overlay};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Discrete events raised at the end of a decision cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Signal {
    /// A ball candidate was located in the frame.
    Found,
    /// No candidate region was present.
    NotFound,
    /// The cycle finished. Raised after `Found` or `NotFound`, never on failure.
    CycleComplete,
}

/// Receives everything a completed decision cycle produces.
pub trait DecisionSink {
    fn write_overlay(&mut self, overlay: Overlay);
    fn write_position(&mut self, position: ImagePosition);
    fn raise(&mut self, signal: Signal);
}

/// An in-memory sink that records every output in order.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    pub overlays: Vec<Overlay>,
    pub positions: Vec<ImagePosition>,
    pub signals: Vec<Signal>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.overlays.clear();
        self.positions.clear();
        self.signals.clear();
    }
}

impl DecisionSink for RecordingSink {
    fn write_overlay(&mut self, overlay: Overlay) {
        self.overlays.push(overlay);
    }

    fn write_position(&mut self, position: ImagePosition) {
        self.positions.push(position);
    }

    fn raise(&mut self, signal: Signal) {
        self.signals.push(signal);
    }
}

/// Broadcast channels carrying the stage outputs to async subscribers.
#[derive(Clone)]
pub struct DecisionBus {
    pub overlay_tx: broadcast::Sender<Overlay>,
    pub position_tx: broadcast::Sender<ImagePosition>,
    pub signal_tx: broadcast::Sender<Signal>,
}

impl DecisionBus {
    pub fn new(capacity: usize) -> Self {
        let (overlay_tx, _) = broadcast::channel::<Overlay>(capacity.max(1));
        let (position_tx, _) = broadcast::channel::<ImagePosition>(capacity.max(1));
        let (signal_tx, _) = broadcast::channel::<Signal>(capacity.max(1));
        Self {
            overlay_tx,
            position_tx,
            signal_tx,
        }
    }

    pub fn subscribe_overlays(&self) -> broadcast::Receiver<Overlay> {
        self.overlay_tx.subscribe()
    }

    pub fn subscribe_positions(&self) -> broadcast::Receiver<ImagePosition> {
        self.position_tx.subscribe()
    }

    pub fn subscribe_signals(&self) -> broadcast::Receiver<Signal> {
        self.signal_tx.subscribe()
    }
}

impl DecisionSink for DecisionBus {
    fn write_overlay(&mut self, overlay: Overlay) {
        let _ = self.overlay_tx.send(overlay);
    }

    fn write_position(&mut self, position: ImagePosition) {
        let _ = self.position_tx.send(position);
    }

    fn raise(&mut self, signal: Signal) {
        let _ = self.signal_tx.send(signal);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bus_delivers_to_every_subscriber() {
        let mut bus = DecisionBus::new(8);
        let mut first = bus.subscribe_signals();
        let mut second = bus.subscribe_signals();

        bus.raise(Signal::Found);
        bus.raise(Signal::CycleComplete);

        for rx in [&mut first, &mut second] {
            assert_eq!(rx.try_recv().unwrap(), Signal::Found);
            assert_eq!(rx.try_recv().unwrap(), Signal::CycleComplete);
            assert!(rx.try_recv().is_err());
        }
    }

    #[test]
    fn bus_without_subscribers_drops_silently() {
        let mut bus = DecisionBus::new(0);
        bus.write_overlay(Overlay::empty());
        bus.write_position(ImagePosition::default());
        bus.raise(Signal::NotFound);
    }

    #[test]
    fn recording_sink_keeps_order() {
        let mut sink = RecordingSink::new();
        sink.raise(Signal::NotFound);
        sink.raise(Signal::CycleComplete);
        assert_eq!(sink.signals, vec![Signal::NotFound, Signal::CycleComplete]);
        sink.clear();
        assert!(sink.signals.is_empty());
    }
}
