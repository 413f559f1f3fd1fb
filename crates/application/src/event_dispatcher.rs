use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::environment_ports::{EventRecord, EventRepository};

/// Default bound for the audit event queue.
pub const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 256;

/// Fire-and-forget audit event emitter.
///
/// Events are handed to a bounded queue consumed by a background writer
/// task. Dispatch never blocks and never fails the caller: a full or closed
/// queue drops the event and logs a warning, and sink failures inside the
/// writer are logged without retry.
#[derive(Clone)]
pub struct EventDispatcher {
    sender: mpsc::Sender<EventRecord>,
}

/// Handle to the background writer task.
pub struct EventWriterHandle {
    handle: JoinHandle<()>,
}

impl EventDispatcher {
    /// Spawns the background writer with the default queue capacity.
    #[must_use]
    pub fn spawn(repository: Arc<dyn EventRepository>) -> (Self, EventWriterHandle) {
        Self::spawn_with_capacity(repository, DEFAULT_EVENT_QUEUE_CAPACITY)
    }

    /// Spawns the background writer with an explicit queue capacity and
    /// returns the dispatcher plus its writer handle.
    #[must_use]
    pub fn spawn_with_capacity(
        repository: Arc<dyn EventRepository>,
        capacity: usize,
    ) -> (Self, EventWriterHandle) {
        let (sender, mut receiver) = mpsc::channel::<EventRecord>(capacity.max(1));

        let handle = tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                let kind = event.kind;
                if let Err(error) = repository.append_event(event).await {
                    warn!(
                        kind = kind.as_str(),
                        error = %error,
                        "failed to append audit event"
                    );
                }
            }
        });

        (Self { sender }, EventWriterHandle { handle })
    }

    /// Enqueues an audit event without blocking.
    pub fn dispatch(&self, event: EventRecord) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(dropped)) => {
                warn!(
                    kind = dropped.kind.as_str(),
                    workspace_id = %dropped.workspace_id,
                    "audit event dropped: queue full"
                );
            }
            Err(TrySendError::Closed(dropped)) => {
                warn!(
                    kind = dropped.kind.as_str(),
                    workspace_id = %dropped.workspace_id,
                    "audit event dropped: writer stopped"
                );
            }
        }
    }
}

impl EventWriterHandle {
    /// Waits for the writer to drain and exit.
    ///
    /// The writer stops once every dispatcher clone has been dropped and the
    /// queue is empty.
    pub async fn shutdown(self) {
        if let Err(error) = self.handle.await {
            warn!(error = %error, "audit event writer exited abnormally");
        }
    }
}
