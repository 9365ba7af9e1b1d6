use tracing::info;

use crate::pipeline::event::Publisher;

/// Publisher that writes each payload to the application log. Payloads
/// that are valid UTF-8 are logged as-is; anything else is logged as a
/// JSON byte array.
#[derive(Debug, Default)]
pub struct LogSink;

impl LogSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl Publisher for LogSink {
    async fn publish(&self, payload: Vec<u8>) {
        match std::str::from_utf8(&payload) {
            Ok(text) => info!(event = text, "published"),
            Err(_) => info!(event = ?payload, "published"),
        }
    }
}
