use reqwest::Url;
use serde::Serialize;
use std::fmt;

/// Base address of a launched model server.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Endpoint(String);

impl Endpoint {
    /// Normalises whatever the launch call returned: a bare port, a
    /// `host:port` pair or a full URL. Anything that does not parse as an
    /// http(s) URL with a host is rejected.
    pub fn resolve(raw: &str, default_host: &str) -> crate::Result<Self> {
        let raw = raw.trim().trim_end_matches('/');
        if raw.is_empty() {
            return Err(crate::Error::Backend("launch returned no endpoint".into()));
        }

        let candidate = if raw.chars().all(|c| c.is_ascii_digit()) {
            format!("http://{}:{}", default_host, raw)
        } else if raw.starts_with("http://") || raw.starts_with("https://") {
            raw.to_string()
        } else {
            format!("http://{}", raw)
        };

        let url = Url::parse(&candidate)
            .map_err(|e| crate::Error::Backend(format!("launch returned {:?}: {}", raw, e)))?;
        if url.host_str().map_or(true, str::is_empty) {
            return Err(crate::Error::Backend(format!(
                "launch returned {:?}, which has no host",
                raw
            )));
        }

        Ok(Self(url.as_str().trim_end_matches('/').to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn chat_url(&self) -> String {
        format!("{}/chat", self.0)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
