use super::types::{ModelDescriptor, ModelRequirements, ModelSource};
use std::collections::HashSet;

const GB: u64 = 1024 * 1024 * 1024;
const MB: u64 = 1024 * 1024;

/// Read-only, ordered model list keyed by id.
#[derive(Clone, Debug, Default)]
pub struct ModelCatalog {
    models: Vec<ModelDescriptor>,
}

impl ModelCatalog {
    pub fn new(models: Vec<ModelDescriptor>) -> crate::Result<Self> {
        let mut seen = HashSet::new();
        for model in &models {
            if !seen.insert(model.id.as_str()) {
                return Err(crate::Error::DuplicateModel(model.id.clone()));
            }
        }
        Ok(Self { models })
    }

    pub fn list(&self) -> &[ModelDescriptor] {
        &self.models
    }

    pub fn get(&self, id: &str) -> crate::Result<&ModelDescriptor> {
        self.models
            .iter()
            .find(|m| m.id == id)
            .ok_or_else(|| crate::Error::ModelNotFound(id.to_string()))
    }
}

fn llama_server_packages() -> Vec<String> {
    vec![
        "llama-cpp-python".to_string(),
        "uvicorn".to_string(),
        "fastapi".to_string(),
    ]
}

/// Models the desktop backend knows how to install.
pub fn catalog() -> Vec<ModelDescriptor> {
    vec![
        ModelDescriptor {
            id: "qwen2.5-1.5b-instruct-v2".to_string(),
            name: "Qwen2.5 1.5B Instruct".to_string(),
            description: "Best-in-class lightweight model. Excellent Korean support and reasoning. Runs smoothly on 4GB+ RAM laptops.".to_string(),
            version: "Q4_K_M".to_string(),
            task_type: "text-generation".to_string(),
            requirements: ModelRequirements {
                min_ram: 4 * GB,
                min_vram: 2 * GB,
                disk_space: GB,
            },
            source: ModelSource {
                url: "https://huggingface.co/Qwen/Qwen2.5-1.5B-Instruct-GGUF/resolve/main/qwen2.5-1.5b-instruct-q4_k_m.gguf".to_string(),
                filename: "qwen2.5-1.5b-instruct-q4_k_m.gguf".to_string(),
            },
            python_packages: llama_server_packages(),
        },
        ModelDescriptor {
            id: "gemma-2-2b-it-gguf".to_string(),
            name: "Google Gemma 2 2B".to_string(),
            description: "Google's latest lightweight open model. Strong logical reasoning and summarization. Good for office tasks.".to_string(),
            version: "Q4_K_M".to_string(),
            task_type: "text-generation".to_string(),
            requirements: ModelRequirements {
                min_ram: 4 * GB,
                min_vram: 2 * GB,
                disk_space: 2 * GB,
            },
            source: ModelSource {
                url: "https://huggingface.co/bartowski/gemma-2-2b-it-GGUF/resolve/main/gemma-2-2b-it-Q4_K_M.gguf".to_string(),
                filename: "gemma-2-2b-it-Q4_K_M.gguf".to_string(),
            },
            python_packages: llama_server_packages(),
        },
        ModelDescriptor {
            id: "whisper-tiny".to_string(),
            name: "Whisper Tiny".to_string(),
            description: "OpenAI's lightweight speech recognition model. Converts voice to text very quickly.".to_string(),
            version: "tiny".to_string(),
            task_type: "speech-to-text".to_string(),
            requirements: ModelRequirements {
                min_ram: GB,
                min_vram: 0,
                disk_space: 100 * MB,
            },
            source: ModelSource {
                url: "https://huggingface.co/ggerganov/whisper.cpp/resolve/master/ggml-tiny.bin".to_string(),
                filename: "ggml-tiny.bin".to_string(),
            },
            python_packages: vec!["openai-whisper".to_string(), "soundfile".to_string()],
        },
    ]
}
