use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::pipeline::event::{BoxedEvent, Generator};

/// Generator emitting JSON records with a monotonically increasing
/// sequence number and a millisecond timestamp. The counter is atomic,
/// so one instance can be shared by any number of generator workers.
#[derive(Debug, Default)]
pub struct SequenceSource {
    next: AtomicU64,
}

impl SequenceSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl Generator for SequenceSource {
    async fn generate(&self) -> BoxedEvent {
        let seq = self.next.fetch_add(1, Ordering::Relaxed);
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Box::new(serde_json::json!({ "seq": seq, "ts": ts }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sequence_numbers_are_unique() {
        let source = SequenceSource::new();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..100 {
            let event = source.generate().await;
            let value: serde_json::Value =
                serde_json::from_slice(&event.serialize().unwrap()).unwrap();
            assert!(seen.insert(value["seq"].as_u64().unwrap()));
        }
    }
}
