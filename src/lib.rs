mod backend;
mod channel;
mod chat;
mod compat;
mod config;
mod error;
mod lifecycle;
mod models;
mod registry;
mod specs;
mod store;
mod subscription;

pub mod logging;

#[cfg(feature = "tauri")]
mod tauri_bridge;

pub use backend::Backend;
pub use channel::{EventBus, Handler, ListenerId, PushChannel, INSTALL_PROGRESS};
pub use chat::{ChatController, ChatSession, Endpoint, Message, Role, SseDecoder};
pub use compat::{check_compatibility, format_bytes, Verdict};
pub use config::{ClientConfig, ConfigManager};
pub use error::{Error, Result};
pub use lifecycle::LifecycleController;
pub use models::{catalog, ModelCatalog, ModelDescriptor, ModelRequirements, ModelSource};
pub use registry::{InstallStatus, LifecycleEntry, ProgressEvent, ProgressRegistry};
pub use specs::{get_specs, GpuInfo, HardwareCapability};
pub use store::{AppStore, View};
pub use subscription::ProgressSubscription;
