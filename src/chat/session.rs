use super::endpoint::Endpoint;
use serde::{Deserialize, Serialize};

pub(crate) const CONNECTION_FAILED: &str = " Error: Connection failed.";

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub text: String,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

/// Conversation with one launched model.
///
/// Finished messages are append-only. While a reply streams in, its text
/// lives in `pending` and is moved into `messages` once the stream ends.
#[derive(Clone, Debug)]
pub struct ChatSession {
    id: u64,
    model_id: String,
    endpoint: Endpoint,
    messages: Vec<Message>,
    pending: Option<String>,
    draft: String,
}

impl ChatSession {
    pub(crate) fn new(id: u64, model_id: &str, endpoint: Endpoint, greeting: String) -> Self {
        Self {
            id,
            model_id: model_id.to_string(),
            endpoint,
            messages: vec![Message::assistant(greeting)],
            pending: None,
            draft: String::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn in_flight(&self) -> bool {
        self.pending.is_some()
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, draft: impl Into<String>) {
        self.draft = draft.into();
    }

    pub fn len(&self) -> usize {
        self.messages.len() + usize::from(self.pending.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn transcript(&self) -> Vec<Message> {
        let mut transcript = self.messages.clone();
        if let Some(text) = &self.pending {
            transcript.push(Message::assistant(text.clone()));
        }
        transcript
    }

    pub fn last(&self) -> Option<Message> {
        match &self.pending {
            Some(text) => Some(Message::assistant(text.clone())),
            None => self.messages.last().cloned(),
        }
    }

    pub(crate) fn begin_turn(&mut self, text: &str) {
        self.messages.push(Message::user(text));
        self.draft.clear();
        self.pending = Some(String::new());
    }

    /// Returns `false` when no reply is open, in which case the fragment is
    /// dropped.
    pub(crate) fn push_fragment(&mut self, fragment: &str) -> bool {
        match &mut self.pending {
            Some(text) => {
                text.push_str(fragment);
                true
            }
            None => false,
        }
    }

    pub(crate) fn complete(&mut self) {
        if let Some(text) = self.pending.take() {
            self.messages.push(Message::assistant(text));
        }
    }

    pub(crate) fn fail(&mut self) {
        self.complete();
        self.messages.push(Message::assistant(CONNECTION_FAILED));
    }
}
