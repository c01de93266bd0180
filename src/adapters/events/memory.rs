use serde_json::Value;
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, PoisonError,
    },
    time::Duration,
};
use tokio::sync::Notify;

use crate::ports::events::{Error, EventPublisher};

/// Publisher that keeps every event in memory
///
/// It can be switched into a failing mode to exercise callers that must ignore publishing errors.
#[derive(Clone, Debug, Default)]
pub struct MemoryPublisher {
    events: Arc<Mutex<Vec<(String, Value)>>>,
    failing: Arc<AtomicBool>,
    published: Arc<Notify>,
}

#[derive(Debug, thiserror::Error)]
#[error("publisher unavailable")]
pub struct Unavailable;

impl MemoryPublisher {
    /// Every event published so far, oldest first
    pub fn events(&self) -> Vec<(String, Value)> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Events published under `topic`
    pub fn events_for(&self, topic: &str) -> Vec<Value> {
        self.events()
            .into_iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, payload)| payload)
            .collect()
    }

    /// Events published under `topic`, once there are at least `count` of them
    ///
    /// Returns whatever was published if `timeout` elapses first.
    pub async fn wait_for(&self, topic: &str, count: usize, timeout: Duration) -> Vec<Value> {
        let enough = async {
            loop {
                let published = self.published.notified();
                if self.events_for(topic).len() >= count {
                    return;
                }
                published.await;
            }
        };
        let _ = tokio::time::timeout(timeout, enough).await;
        self.events_for(topic)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl EventPublisher for MemoryPublisher {
    async fn publish(&self, topic: String, payload: Value) -> Result<(), Error> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Adapter(Box::new(Unavailable)));
        }
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((topic, payload));
        self.published.notify_waiters();
        Ok(())
    }
}
