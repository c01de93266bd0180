use serde_json::Value;

/// Best-effort publication of domain events
///
/// Callers log failures and carry on, nothing is rolled back when publishing fails.
#[mockall::automock]
#[async_trait::async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, topic: String, payload: Value) -> Result<(), Error>;
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("adapter error: {0:?}")]
    Adapter(Box<dyn std::error::Error + Send + Sync>),
}
