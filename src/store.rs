use crate::backend::Backend;
use crate::channel::PushChannel;
use crate::chat::{ChatController, Endpoint};
use crate::compat::{check_compatibility, Verdict};
use crate::config::ClientConfig;
use crate::lifecycle::LifecycleController;
use crate::models::{ModelCatalog, ModelDescriptor};
use crate::registry::ProgressRegistry;
use crate::specs::HardwareCapability;
use crate::subscription::ProgressSubscription;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    Dashboard,
    Models,
    Chat,
}

#[derive(Default)]
struct UiState {
    view: View,
    notice: Option<String>,
}

/// Application state handed to presentation code.
///
/// Everything the views read lives here: the startup queries, the progress
/// registry and the chat session. The store is `Sync`, so one instance can
/// be shared behind an `Arc` by every view.
pub struct AppStore {
    specs: Option<HardwareCapability>,
    catalog: Arc<ModelCatalog>,
    registry: ProgressRegistry,
    chat: ChatController,
    lifecycle: LifecycleController,
    ui: Mutex<UiState>,
}

impl AppStore {
    /// Runs the startup queries. Neither failing is fatal: the store comes
    /// up without specs or with an empty catalog and a notice explaining why.
    pub async fn load(backend: Arc<dyn Backend>, config: ClientConfig) -> crate::Result<Self> {
        let mut notices = Vec::new();

        let specs = match backend.get_system_specs().await {
            Ok(specs) => Some(specs),
            Err(e) => {
                tracing::warn!("system specs unavailable: {}", e);
                notices.push("Failed to load system specs");
                None
            }
        };

        let catalog = match backend.get_models().await.and_then(ModelCatalog::new) {
            Ok(catalog) => catalog,
            Err(e) => {
                tracing::warn!("model catalog unavailable: {}", e);
                notices.push("Failed to load models");
                ModelCatalog::default()
            }
        };
        let catalog = Arc::new(catalog);

        let registry = ProgressRegistry::new();
        let chat = ChatController::new(&config)?;
        let lifecycle = LifecycleController::new(
            backend,
            catalog.clone(),
            registry.clone(),
            chat.clone(),
            config,
        );

        let notice = (!notices.is_empty()).then(|| notices.join(". "));

        Ok(Self {
            specs,
            catalog,
            registry,
            chat,
            lifecycle,
            ui: Mutex::new(UiState { notice, ..Default::default() }),
        })
    }

    pub fn specs(&self) -> Option<&HardwareCapability> {
        self.specs.as_ref()
    }

    pub fn models(&self) -> &[ModelDescriptor] {
        self.catalog.list()
    }

    pub fn registry(&self) -> &ProgressRegistry {
        &self.registry
    }

    pub fn chat(&self) -> &ChatController {
        &self.chat
    }

    pub fn view(&self) -> View {
        self.ui().view
    }

    pub fn set_view(&self, view: View) {
        self.ui().view = view;
    }

    /// Last user-facing message (failed fetch, install or launch).
    pub fn take_notice(&self) -> Option<String> {
        self.ui().notice.take()
    }

    pub fn compatibility(&self, model_id: &str) -> crate::Result<Verdict> {
        let model = self.catalog.get(model_id)?;
        Ok(check_compatibility(self.specs.as_ref(), &model.requirements))
    }

    /// Binds the registry to a push channel for as long as the returned
    /// handle is alive.
    pub fn subscribe_progress(&self, channel: Arc<dyn PushChannel>) -> ProgressSubscription {
        ProgressSubscription::activate(channel, self.registry.clone())
    }

    pub async fn install(&self, model_id: &str) -> crate::Result<()> {
        self.lifecycle
            .request_install(model_id)
            .await
            .map_err(|e| self.alert(e))
    }

    /// Launches the model and switches to the chat view.
    pub async fn launch(&self, model_id: &str) -> crate::Result<Endpoint> {
        let model = self.catalog.get(model_id).map_err(|e| self.alert(e))?;
        let endpoint = self
            .lifecycle
            .request_launch(model)
            .await
            .map_err(|e| self.alert(e))?;

        self.set_view(View::Chat);
        Ok(endpoint)
    }

    pub async fn send(&self, text: &str) -> crate::Result<()> {
        self.chat.send(text).await.map_err(|e| {
            if matches!(e, crate::Error::NoSession) {
                self.ui().notice = Some(e.to_string());
            }
            e
        })
    }

    fn alert(&self, e: crate::Error) -> crate::Error {
        self.ui().notice = Some(e.to_string());
        e
    }

    fn ui(&self) -> MutexGuard<'_, UiState> {
        self.ui.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
