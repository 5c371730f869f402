use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::watch;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InstallStatus {
    Downloading,
    InstallingDeps,
    Completed,
    Error,
}

impl InstallStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, InstallStatus::Downloading | InstallStatus::InstallingDeps)
    }
}

/// Payload of the `install-progress` push channel.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ProgressEvent {
    pub model_id: String,
    pub status: InstallStatus,
    pub progress: u64,
    pub message: String,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct LifecycleEntry {
    pub status: InstallStatus,
    pub progress: u8,
    pub message: String,
    /// Address of the running model server, set after a successful launch.
    pub endpoint: Option<String>,
}

impl LifecycleEntry {
    pub fn new(status: InstallStatus, progress: u64, message: impl Into<String>) -> Self {
        Self {
            status,
            progress: progress.min(100) as u8,
            message: message.into(),
            endpoint: None,
        }
    }

    fn placeholder() -> Self {
        Self::new(InstallStatus::Downloading, 0, "Starting...")
    }
}

/// Per-model install/launch state shared by the push-event sink and the
/// lifecycle controller. Every mutation of a key happens under one write
/// lock, so concurrent writers never leave a half-updated entry.
#[derive(Clone)]
pub struct ProgressRegistry {
    entries: Arc<RwLock<HashMap<String, LifecycleEntry>>>,
    revision: Arc<watch::Sender<u64>>,
}

impl Default for ProgressRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressRegistry {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            revision: Arc::new(revision),
        }
    }

    pub fn get(&self, model_id: &str) -> Option<LifecycleEntry> {
        self.read().get(model_id).cloned()
    }

    pub fn set(&self, model_id: &str, entry: LifecycleEntry) {
        self.write().insert(model_id.to_string(), entry);
        self.bump();
    }

    pub fn remove(&self, model_id: &str) -> Option<LifecycleEntry> {
        let removed = self.write().remove(model_id);
        if removed.is_some() {
            self.bump();
        }
        removed
    }

    pub fn all(&self) -> HashMap<String, LifecycleEntry> {
        self.read().clone()
    }

    /// Revision counter bumped after every mutation.
    pub fn observe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Optimistic first phase of an install: drop whatever the last attempt
    /// left behind and show a placeholder until the backend reports in.
    pub fn begin_install(&self, model_id: &str) {
        {
            let mut entries = self.write();
            entries.remove(model_id);
            entries.insert(model_id.to_string(), LifecycleEntry::placeholder());
        }
        tracing::debug!("install placeholder for {}", model_id);
        self.bump();
    }

    /// Applies a pushed progress event. Returns `false` when the event was
    /// dropped because the model already completed this install attempt.
    pub fn apply_progress(&self, event: ProgressEvent) -> bool {
        {
            let mut entries = self.write();
            let endpoint = match entries.get(&event.model_id) {
                Some(existing) if existing.status == InstallStatus::Completed => {
                    tracing::debug!(
                        "ignoring {:?} for completed model {}",
                        event.status,
                        event.model_id
                    );
                    return false;
                }
                Some(existing) => existing.endpoint.clone(),
                None => None,
            };

            let mut entry = LifecycleEntry::new(event.status, event.progress, event.message);
            entry.endpoint = endpoint;
            entries.insert(event.model_id, entry);
        }
        self.bump();
        true
    }

    pub fn bind_endpoint(&self, model_id: &str, endpoint: &str) -> bool {
        let bound = match self.write().get_mut(model_id) {
            Some(entry) => {
                entry.endpoint = Some(endpoint.to_string());
                true
            }
            None => false,
        };
        if bound {
            self.bump();
        }
        bound
    }

    fn bump(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, LifecycleEntry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, LifecycleEntry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}
