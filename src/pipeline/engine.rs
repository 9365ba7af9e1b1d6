use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::pipeline::event::{Generator, Publisher};
use crate::pipeline::{create_event_channel, EventReceiver};

/// Called with the serialization error each time the publication stage
/// drops an event. Dropping is the default policy; the hook exists for
/// callers that want a counter or a log line on top of it.
pub type SerializeErrorHook = Arc<dyn Fn(&AppError) + Send + Sync>;

/// Runs data generation and publishes the results.
///
/// The engine fans generation out across a configurable number of
/// workers, merges their output into one stream, and fans that stream
/// out again across a configurable number of publisher workers. Both
/// the [`Generator`] and the [`Publisher`] are shared by all of their
/// workers and must tolerate concurrent calls.
pub struct Engine {
    generator: Arc<dyn Generator>,
    publisher: Arc<dyn Publisher>,
    num_generators: usize,
    num_publishers: usize,
    on_serialize_error: Option<SerializeErrorHook>,
}

impl Engine {
    /// Returns a new engine with one generator worker and one publisher
    /// worker.
    pub fn new(generator: Arc<dyn Generator>, publisher: Arc<dyn Publisher>) -> Self {
        Self {
            generator,
            publisher,
            num_generators: 1,
            num_publishers: 1,
            on_serialize_error: None,
        }
    }

    /// Sets the number of parallel generator workers. Values below 1 are
    /// treated as 1.
    pub fn with_generators(mut self, n: usize) -> Self {
        self.num_generators = n.max(1);
        self
    }

    /// Sets the number of parallel publisher workers. Values below 1 are
    /// treated as 1.
    pub fn with_publishers(mut self, n: usize) -> Self {
        self.num_publishers = n.max(1);
        self
    }

    /// Installs an observer for events dropped on serialization failure.
    pub fn on_serialize_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&AppError) + Send + Sync + 'static,
    {
        self.on_serialize_error = Some(Arc::new(hook));
        self
    }

    /// Starts the pipeline and returns immediately. Consuming `self`
    /// makes a second `run` on the same engine impossible.
    ///
    /// Trigger the returned handle to stop generation; events already
    /// merged are still drained to the publisher before the workers
    /// exit.
    pub fn run(self) -> EngineHandle {
        let token = CancellationToken::new();
        let mut workers = Vec::with_capacity(2 * self.num_generators + self.num_publishers);

        let mut streams = Vec::with_capacity(self.num_generators);
        for _ in 0..self.num_generators {
            let (worker, stream) = spawn_generator(self.generator.clone(), token.clone());
            workers.push(worker);
            streams.push(stream);
        }

        let events = Arc::new(Mutex::new(merge(streams, &mut workers)));

        for id in 0..self.num_publishers {
            workers.push(spawn_publisher(
                id,
                self.publisher.clone(),
                events.clone(),
                self.on_serialize_error.clone(),
            ));
        }

        info!(
            generators = self.num_generators,
            publishers = self.num_publishers,
            "pipeline started"
        );
        EngineHandle { token, workers }
    }
}

/// Handle to a running pipeline. Dropping it without calling
/// [`EngineHandle::shutdown`] leaves the workers running detached.
pub struct EngineHandle {
    token: CancellationToken,
    workers: Vec<JoinHandle<()>>,
}

impl EngineHandle {
    /// Requests a graceful stop without waiting for it. Idempotent.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancels the pipeline and waits for every worker to exit.
    /// Cancellation is cooperative: an in-flight `generate` or `publish`
    /// call runs to completion first.
    pub async fn shutdown(self) {
        self.token.cancel();
        for worker in self.workers {
            let _ = worker.await;
        }
        info!("pipeline stopped");
    }
}

/// Spawns one generator worker and returns its private event stream.
/// The stream closes when the worker exits and drops the sender.
fn spawn_generator(
    generator: Arc<dyn Generator>,
    token: CancellationToken,
) -> (JoinHandle<()>, EventReceiver) {
    let (tx, rx) = create_event_channel();
    let worker = tokio::spawn(async move {
        loop {
            if token.is_cancelled() {
                break;
            }
            let event = generator.generate().await;
            // The worker may be parked here waiting for a consumer, so
            // the handoff races against cancellation; losing the event
            // at that boundary is fine, blocking shutdown is not.
            tokio::select! {
                _ = token.cancelled() => break,
                sent = tx.send(event) => {
                    if sent.is_err() {
                        break;
                    }
                }
            }
        }
        debug!("generator worker stopped");
    });
    (worker, rx)
}

/// Fans the generator streams into a single stream. One forwarder task
/// per input, each holding a clone of the shared sender; the merged
/// stream closes exactly once, when the last forwarder exits, so it
/// cannot close while a send is still in flight.
fn merge(streams: Vec<EventReceiver>, workers: &mut Vec<JoinHandle<()>>) -> EventReceiver {
    let (tx, rx) = create_event_channel();
    for mut stream in streams {
        let tx = tx.clone();
        workers.push(tokio::spawn(async move {
            while let Some(event) = stream.recv().await {
                if tx.send(event).await.is_err() {
                    break;
                }
            }
        }));
    }
    rx
}

/// Spawns one publisher worker draining the shared merged stream. The
/// worker exits when the stream closes; it never watches the
/// cancellation token itself, so already-merged events are always
/// drained.
fn spawn_publisher(
    id: usize,
    publisher: Arc<dyn Publisher>,
    events: Arc<Mutex<EventReceiver>>,
    on_serialize_error: Option<SerializeErrorHook>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            // The guard is released before publishing so the other
            // workers can keep receiving during a slow publish call.
            let event = events.lock().await.recv().await;
            let Some(event) = event else {
                break;
            };
            match event.serialize() {
                Ok(payload) => publisher.publish(payload).await,
                Err(err) => {
                    warn!(worker = id, error = %err, "dropping unserializable event");
                    if let Some(hook) = &on_serialize_error {
                        hook(&err);
                    }
                }
            }
        }
        debug!(worker = id, "publisher worker stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::event::BoxedEvent;

    #[tokio::test]
    async fn merge_closes_after_all_inputs_close() {
        let (tx_a, rx_a) = create_event_channel();
        let (tx_b, rx_b) = create_event_channel();
        let mut workers = Vec::new();
        let mut merged = merge(vec![rx_a, rx_b], &mut workers);

        tx_a.send(Box::new("a".to_string()) as BoxedEvent)
            .await
            .unwrap();
        drop(tx_a);
        let first = merged.recv().await.unwrap();
        assert_eq!(first.serialize().unwrap(), b"a");

        // still open: one input remains
        tx_b.send(Box::new("b".to_string()) as BoxedEvent)
            .await
            .unwrap();
        let second = merged.recv().await.unwrap();
        assert_eq!(second.serialize().unwrap(), b"b");

        drop(tx_b);
        assert!(merged.recv().await.is_none());
        for worker in workers {
            worker.await.unwrap();
        }
    }

    #[test]
    fn worker_counts_clamp_to_one() {
        let generator = Arc::new(crate::pipeline::event::GeneratorFn(|| {
            Box::new("x".to_string()) as BoxedEvent
        }));
        let publisher = Arc::new(crate::pipeline::event::PublisherFn(|_: Vec<u8>| {}));
        let engine = Engine::new(generator, publisher)
            .with_generators(0)
            .with_publishers(0);
        assert_eq!(engine.num_generators, 1);
        assert_eq!(engine.num_publishers, 1);
    }

    #[tokio::test]
    async fn cancel_is_idempotent() {
        let generator = Arc::new(crate::pipeline::event::GeneratorFn(|| {
            Box::new("x".to_string()) as BoxedEvent
        }));
        let publisher = Arc::new(crate::pipeline::event::PublisherFn(|_: Vec<u8>| {}));
        let handle = Engine::new(generator, publisher).run();
        handle.cancel();
        handle.cancel();
        assert!(handle.is_cancelled());
        handle.shutdown().await;
    }
}
