pub mod engine;
pub mod event;
pub mod sinks;

use event::BoxedEvent;
use tokio::sync::mpsc;

pub type EventSender = mpsc::Sender<BoxedEvent>;
pub type EventReceiver = mpsc::Receiver<BoxedEvent>;

/// Capacity 1 keeps the handoff rendezvous-style: a sender parks until a
/// consumer is ready, so backpressure reaches all the way back to the
/// generators. There is no other buffering layer in the pipeline.
pub fn create_event_channel() -> (EventSender, EventReceiver) {
    mpsc::channel(1)
}
