use serde::{ser::Serializer, Serialize};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("System specs unavailable: {0}")]
    SpecsUnavailable(String),
    #[error("Model not found: {0}")]
    ModelNotFound(String),
    #[error("Duplicate model id in catalog: {0}")]
    DuplicateModel(String),
    #[error("Model is not installed: {0}")]
    NotInstalled(String),
    #[error("{0}")]
    Backend(String),
    #[error("No model is running. Launch a model first.")]
    NoSession,
    #[error("A response is still streaming")]
    RequestInFlight,
    #[error("Message is empty")]
    EmptyMessage,
    #[error("Chat server returned HTTP {0}")]
    ChatStatus(u16),
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Serialize for Error {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.to_string().as_ref())
    }
}
