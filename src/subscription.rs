use crate::channel::{ListenerId, PushChannel, INSTALL_PROGRESS};
use crate::registry::{ProgressEvent, ProgressRegistry};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Live subscription routing `install-progress` events into a registry.
///
/// The listener is released when the handle is dropped, so a torn-down view
/// can never keep writing into state nobody reads.
pub struct ProgressSubscription {
    channel: Arc<dyn PushChannel>,
    listener: Option<ListenerId>,
    active: Arc<AtomicBool>,
}

impl ProgressSubscription {
    pub fn activate(channel: Arc<dyn PushChannel>, registry: ProgressRegistry) -> Self {
        let active = Arc::new(AtomicBool::new(true));

        let flag = active.clone();
        let listener = channel.listen(
            INSTALL_PROGRESS,
            Box::new(move |payload: &str| {
                if !flag.load(Ordering::Acquire) {
                    return;
                }
                match serde_json::from_str::<ProgressEvent>(payload) {
                    Ok(event) => {
                        tracing::debug!(
                            "{} {:?} {}%: {}",
                            event.model_id,
                            event.status,
                            event.progress,
                            event.message
                        );
                        registry.apply_progress(event);
                    }
                    Err(e) => tracing::warn!("skipping malformed install-progress payload: {}", e),
                }
            }),
        );

        Self {
            channel,
            listener: Some(listener),
            active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.listener.is_some()
    }

    pub fn deactivate(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(id) = self.listener.take() {
            self.active.store(false, Ordering::Release);
            self.channel.unlisten(id);
            tracing::debug!("install-progress listener released");
        }
    }
}

impl Drop for ProgressSubscription {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::EventBus;
    use crate::registry::InstallStatus;
    use serde_json::json;

    fn setup() -> (Arc<EventBus>, ProgressRegistry, ProgressSubscription) {
        let bus = Arc::new(EventBus::new());
        let registry = ProgressRegistry::new();
        let sub = ProgressSubscription::activate(bus.clone(), registry.clone());
        (bus, registry, sub)
    }

    fn push(bus: &EventBus, model_id: &str, status: &str, progress: u64) {
        bus.emit(
            INSTALL_PROGRESS,
            &json!({
                "model_id": model_id,
                "status": status,
                "progress": progress,
                "message": format!("{}%", progress),
            }),
        )
        .unwrap();
    }

    #[test]
    fn test_events_flow_into_registry() {
        let (bus, registry, _sub) = setup();
        assert_eq!(bus.listener_count(INSTALL_PROGRESS), 1);

        push(&bus, "qwen", "downloading", 10);
        push(&bus, "qwen", "downloading", 55);
        push(&bus, "qwen", "completed", 100);

        let entry = registry.get("qwen").unwrap();
        assert_eq!(entry.status, InstallStatus::Completed);
        assert_eq!(entry.progress, 100);
        assert_eq!(entry.message, "100%");
        assert_eq!(registry.all().len(), 1);
    }

    #[test]
    fn test_malformed_payload_is_skipped() {
        let (bus, registry, _sub) = setup();

        bus.emit_raw(INSTALL_PROGRESS, "not json");
        bus.emit_raw(INSTALL_PROGRESS, r#"{"model_id":"qwen","status":"paused","progress":1,"message":""}"#);
        push(&bus, "qwen", "downloading", 20);

        assert_eq!(registry.get("qwen").unwrap().progress, 20);
    }

    #[test]
    fn test_drop_releases_listener() {
        let (bus, registry, sub) = setup();
        drop(sub);

        assert_eq!(bus.listener_count(INSTALL_PROGRESS), 0);
        push(&bus, "qwen", "downloading", 10);
        assert!(registry.get("qwen").is_none());
    }

    #[test]
    fn test_deactivate_releases_listener() {
        let (bus, registry, sub) = setup();
        assert!(sub.is_active());
        sub.deactivate();

        push(&bus, "qwen", "downloading", 10);
        assert_eq!(bus.listener_count(INSTALL_PROGRESS), 0);
        assert!(registry.all().is_empty());
    }

    #[test]
    fn test_release_on_panic_unwind() {
        let (bus, registry, sub) = setup();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _owned = sub;
            panic!("view torn down");
        }));
        assert!(result.is_err());

        push(&bus, "qwen", "downloading", 10);
        assert_eq!(bus.listener_count(INSTALL_PROGRESS), 0);
        assert!(registry.get("qwen").is_none());
    }
}
