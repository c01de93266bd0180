use serde_json::Value;
use tracing::info;

use crate::ports::events::{Error, EventPublisher};

/// Publisher that writes events to the log
///
/// Useful when no message broker is wired in.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingPublisher;

#[async_trait::async_trait]
impl EventPublisher for TracingPublisher {
    async fn publish(&self, topic: String, payload: Value) -> Result<(), Error> {
        info!(topic = %topic, payload = %payload, "domain event");
        Ok(())
    }
}
