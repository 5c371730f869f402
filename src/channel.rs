use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Channel on which the backend pushes install progress.
pub const INSTALL_PROGRESS: &str = "install-progress";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Receives the raw JSON payload of one pushed event.
pub type Handler = Box<dyn Fn(&str) + Send + Sync + 'static>;

/// Named, backend-to-client notification channel.
pub trait PushChannel: Send + Sync {
    fn listen(&self, event: &str, handler: Handler) -> ListenerId;
    fn unlisten(&self, id: ListenerId);
}

struct Listener {
    id: ListenerId,
    event: String,
    handler: Arc<dyn Fn(&str) + Send + Sync>,
}

/// In-process push channel. Handlers run synchronously on the emitting
/// task, in registration order.
#[derive(Default)]
pub struct EventBus {
    listeners: Mutex<Vec<Listener>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit<T: Serialize>(&self, event: &str, payload: &T) -> crate::Result<()> {
        let json = serde_json::to_string(payload)?;
        self.emit_raw(event, &json);
        Ok(())
    }

    pub fn emit_raw(&self, event: &str, payload: &str) {
        let handlers: Vec<_> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|l| l.event == event)
            .map(|l| l.handler.clone())
            .collect();

        for handler in handlers {
            handler(payload);
        }
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|l| l.event == event)
            .count()
    }
}

impl PushChannel for EventBus {
    fn listen(&self, event: &str, handler: Handler) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Listener {
                id,
                event: event.to_string(),
                handler: Arc::from(handler),
            });
        id
    }

    fn unlisten(&self, id: ListenerId) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|l| l.id != id);
    }
}
