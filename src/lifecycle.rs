use crate::backend::Backend;
use crate::chat::{ChatController, Endpoint};
use crate::config::ClientConfig;
use crate::models::{ModelCatalog, ModelDescriptor};
use crate::registry::{InstallStatus, ProgressRegistry};
use std::sync::Arc;

/// User-initiated install and launch transitions.
///
/// Installs are two-phase: a placeholder entry is written immediately and
/// then overwritten by whatever the backend pushes on `install-progress`.
pub struct LifecycleController {
    backend: Arc<dyn Backend>,
    catalog: Arc<ModelCatalog>,
    registry: ProgressRegistry,
    chat: ChatController,
    config: ClientConfig,
}

impl LifecycleController {
    pub fn new(
        backend: Arc<dyn Backend>,
        catalog: Arc<ModelCatalog>,
        registry: ProgressRegistry,
        chat: ChatController,
        config: ClientConfig,
    ) -> Self {
        Self {
            backend,
            catalog,
            registry,
            chat,
            config,
        }
    }

    pub async fn request_install(&self, model_id: &str) -> crate::Result<()> {
        self.catalog.get(model_id)?;

        self.registry.begin_install(model_id);
        tracing::info!("installing {}", model_id);

        if let Err(e) = self.backend.install_model(model_id).await {
            tracing::error!("install of {} failed: {}", model_id, e);
            self.registry.remove(model_id);
            return Err(e);
        }
        Ok(())
    }

    /// Launches an installed model and opens a new chat session on it.
    pub async fn request_launch(&self, model: &ModelDescriptor) -> crate::Result<Endpoint> {
        match self.registry.get(&model.id) {
            Some(entry) if entry.status == InstallStatus::Completed => {}
            _ => return Err(crate::Error::NotInstalled(model.id.clone())),
        }

        let raw = self.backend.launch_model(&model.id).await.map_err(|e| {
            tracing::error!("launch of {} failed: {}", model.id, e);
            e
        })?;
        let endpoint = Endpoint::resolve(&raw, &self.config.default_host)?;

        self.registry.bind_endpoint(&model.id, endpoint.as_str());
        self.chat
            .open(&model.id, endpoint.clone(), self.config.greeting_for(&model.name));

        tracing::info!("{} running at {}", model.id, endpoint);
        Ok(endpoint)
    }
}
