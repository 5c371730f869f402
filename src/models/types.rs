use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ModelRequirements {
    pub min_ram: u64,    // bytes
    pub min_vram: u64,   // bytes, 0 when the model runs on CPU
    pub disk_space: u64, // bytes
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ModelSource {
    pub url: String,
    pub filename: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ModelDescriptor {
    pub id: String,
    pub name: String,
    pub description: String,
    pub version: String,
    pub task_type: String, // e.g. "text-generation", "speech-to-text"
    pub requirements: ModelRequirements,
    pub source: ModelSource,
    #[serde(default)]
    pub python_packages: Vec<String>,
}
