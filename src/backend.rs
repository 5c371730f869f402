use crate::models::ModelDescriptor;
use crate::specs::HardwareCapability;
use async_trait::async_trait;

/// Calls into the install/launch backend.
///
/// `install_model` only triggers the work; its progress arrives on the
/// `install-progress` push channel. `launch_model` resolves once the model
/// server is reachable and returns its address.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn get_system_specs(&self) -> crate::Result<HardwareCapability>;
    async fn get_models(&self) -> crate::Result<Vec<ModelDescriptor>>;
    async fn install_model(&self, model_id: &str) -> crate::Result<()>;
    async fn launch_model(&self, model_id: &str) -> crate::Result<String>;
}
