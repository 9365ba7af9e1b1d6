use crate::error::Result;

/// A single unit of generated data. `serialize` returns the wire payload
/// handed to a [`Publisher`]; events that fail to serialize are dropped by
/// the publication stage.
pub trait Event: Send {
    fn serialize(&self) -> Result<Vec<u8>>;
}

pub type BoxedEvent = Box<dyn Event>;

impl Event for serde_json::Value {
    fn serialize(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

impl Event for String {
    fn serialize(&self) -> Result<Vec<u8>> {
        Ok(self.clone().into_bytes())
    }
}

impl Event for Vec<u8> {
    fn serialize(&self) -> Result<Vec<u8>> {
        Ok(self.clone())
    }
}

/// Produces one event per call. A single instance is shared by every
/// generator worker, so implementations must be safe for concurrent
/// invocation — any internal mutable state (counters, random sources)
/// needs its own synchronization. The engine cannot enforce this.
#[async_trait::async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self) -> BoxedEvent;
}

/// Accepts a serialized payload for delivery to a sink. Fire-and-forget
/// from the engine's point of view: retries, acks, and batching live
/// inside the implementation. Shared by every publisher worker, so the
/// same concurrent-invocation contract as [`Generator`] applies.
#[async_trait::async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, payload: Vec<u8>);
}

/// Adapter lifting a plain closure into a [`Generator`].
pub struct GeneratorFn<F>(pub F);

#[async_trait::async_trait]
impl<F> Generator for GeneratorFn<F>
where
    F: Fn() -> BoxedEvent + Send + Sync,
{
    async fn generate(&self) -> BoxedEvent {
        (self.0)()
    }
}

/// Adapter lifting a plain closure into a [`Publisher`].
pub struct PublisherFn<F>(pub F);

#[async_trait::async_trait]
impl<F> Publisher for PublisherFn<F>
where
    F: Fn(Vec<u8>) + Send + Sync,
{
    async fn publish(&self, payload: Vec<u8>) {
        (self.0)(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn generator_fn_calls_closure() {
        let g = GeneratorFn(|| Box::new("ping".to_string()) as BoxedEvent);
        let event = g.generate().await;
        assert_eq!(event.serialize().unwrap(), b"ping");
    }

    #[tokio::test]
    async fn publisher_fn_receives_payload() {
        let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = seen.clone();
        let p = PublisherFn(move |b: Vec<u8>| sink.lock().unwrap().push(b));
        p.publish(b"pong".to_vec()).await;
        assert_eq!(seen.lock().unwrap().as_slice(), &[b"pong".to_vec()]);
    }

    #[test]
    fn json_event_serializes() {
        let event = serde_json::json!({"roll": 7});
        assert_eq!(event.serialize().unwrap(), br#"{"roll":7}"#);
    }
}
