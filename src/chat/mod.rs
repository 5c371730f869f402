mod controller;
mod endpoint;
mod session;
mod sse;

pub use controller::ChatController;
pub use endpoint::Endpoint;
pub use session::{ChatSession, Message, Role};
pub use sse::SseDecoder;
