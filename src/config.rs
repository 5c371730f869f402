use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ClientConfig {
    /// Host used when the launch call only hands back a port.
    #[serde(default = "default_host")]
    pub default_host: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// `{name}` is replaced with the launched model's display name.
    #[serde(default = "default_greeting")]
    pub greeting: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_greeting() -> String {
    "Hello! I'm {name}. How can I help you today?".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            default_host: default_host(),
            connect_timeout_secs: default_connect_timeout(),
            greeting: default_greeting(),
        }
    }
}

impl ClientConfig {
    pub fn greeting_for(&self, model_name: &str) -> String {
        self.greeting.replace("{name}", model_name)
    }
}

pub struct ConfigManager {
    config: ClientConfig,
    config_path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> anyhow::Result<Self> {
        let project_dirs = directories::ProjectDirs::from("com", "magic-container", "MagicContainer")
            .ok_or_else(|| anyhow::anyhow!("Failed to get project directories"))?;

        let config_dir = project_dirs.config_dir();
        std::fs::create_dir_all(config_dir)?;

        Ok(Self::at(config_dir.join("config.json")))
    }

    pub fn at(config_path: impl Into<PathBuf>) -> Self {
        let config_path = config_path.into();
        let config = load(&config_path);
        Self {
            config,
            config_path,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    pub async fn update(&mut self, f: impl FnOnce(&mut ClientConfig)) -> crate::Result<()> {
        let mut next = self.config.clone();
        f(&mut next);
        if next.default_host.trim().is_empty() {
            return Err(crate::Error::Config("default_host must not be empty".into()));
        }
        self.config = next;
        self.save().await
    }

    async fn save(&self) -> crate::Result<()> {
        if let Some(parent) = self.config_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(&self.config)?;
        tokio::fs::write(&self.config_path, json).await?;
        Ok(())
    }
}

fn load(path: &Path) -> ClientConfig {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(_) => return ClientConfig::default(),
    };

    match serde_json::from_str(&content) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("ignoring unreadable config at {}: {}", path.display(), e);
            ClientConfig::default()
        }
    }
}
