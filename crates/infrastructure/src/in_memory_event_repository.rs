use async_trait::async_trait;
use confidant_application::{EventRecord, EventRepository};
use confidant_core::AppResult;
use tokio::sync::Mutex;

/// In-memory append-only event sink.
#[derive(Debug, Default)]
pub struct InMemoryEventRepository {
    events: Mutex<Vec<EventRecord>>,
}

impl InMemoryEventRepository {
    /// Creates an empty event sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of every recorded event in append order.
    pub async fn recorded_events(&self) -> Vec<EventRecord> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl EventRepository for InMemoryEventRepository {
    async fn append_event(&self, event: EventRecord) -> AppResult<()> {
        self.events.lock().await.push(event);
        Ok(())
    }
}
