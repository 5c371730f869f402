use super::endpoint::Endpoint;
use super::session::{ChatSession, Message};
use super::sse::SseDecoder;
use crate::config::ClientConfig;
use futures_util::StreamExt;
use reqwest::{header, Client};
use serde::Deserialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

const DONE: &str = "[DONE]";

#[derive(Deserialize)]
struct TokenPayload {
    token: Option<String>,
}

#[derive(Default)]
struct ChatState {
    session: Option<ChatSession>,
    next_id: u64,
}

/// Owns the single active chat session and drives its streaming requests.
#[derive(Clone)]
pub struct ChatController {
    client: Client,
    state: Arc<Mutex<ChatState>>,
}

impl ChatController {
    pub fn new(config: &ClientConfig) -> crate::Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            state: Arc::new(Mutex::new(ChatState::default())),
        })
    }

    /// Starts a fresh session, discarding the previous one together with
    /// any reply it still had streaming.
    pub fn open(&self, model_id: &str, endpoint: Endpoint, greeting: String) -> u64 {
        let mut state = self.lock();
        state.next_id += 1;
        let id = state.next_id;
        if let Some(previous) = state.session.replace(ChatSession::new(id, model_id, endpoint, greeting)) {
            tracing::debug!("discarding chat session {} ({})", previous.id(), previous.model_id());
        }
        tracing::info!("chat session {} bound to {}", id, model_id);
        id
    }

    pub fn session(&self) -> Option<ChatSession> {
        self.lock().session.clone()
    }

    pub fn transcript(&self) -> Vec<Message> {
        self.lock()
            .session
            .as_ref()
            .map(ChatSession::transcript)
            .unwrap_or_default()
    }

    pub fn in_flight(&self) -> bool {
        self.lock().session.as_ref().is_some_and(ChatSession::in_flight)
    }

    pub fn set_draft(&self, draft: &str) -> crate::Result<()> {
        let mut state = self.lock();
        let session = state.session.as_mut().ok_or(crate::Error::NoSession)?;
        session.set_draft(draft);
        Ok(())
    }

    /// Sends one user message and streams the reply into the transcript.
    ///
    /// Resolves when the stream ends. A second call while a reply is still
    /// streaming is rejected without touching the transcript.
    pub async fn send(&self, text: &str) -> crate::Result<()> {
        let (session_id, url) = {
            let mut state = self.lock();
            let session = match state.session.as_mut() {
                Some(session) => session,
                None => {
                    tracing::warn!("send without a launched model");
                    return Err(crate::Error::NoSession);
                }
            };
            if session.in_flight() {
                return Err(crate::Error::RequestInFlight);
            }
            if text.trim().is_empty() {
                return Err(crate::Error::EmptyMessage);
            }

            session.begin_turn(text);
            (session.id(), session.endpoint().chat_url())
        };

        match self.stream_reply(session_id, &url, text).await {
            Ok(()) => {
                self.with_session(session_id, ChatSession::complete);
                Ok(())
            }
            Err(e) => {
                tracing::error!("chat stream to {} failed: {}", url, e);
                self.with_session(session_id, ChatSession::fail);
                Err(e)
            }
        }
    }

    async fn stream_reply(&self, session_id: u64, url: &str, text: &str) -> crate::Result<()> {
        let response = self
            .client
            .post(url)
            .header(header::ACCEPT, "text/event-stream")
            .json(&serde_json::json!({ "message": text }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(crate::Error::ChatStatus(status.as_u16()));
        }

        let mut decoder = SseDecoder::new();
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            for data in decoder.feed(&chunk) {
                if self.dispatch(session_id, &data) {
                    return Ok(());
                }
            }
        }

        if let Some(data) = decoder.finish() {
            self.dispatch(session_id, &data);
        }
        Ok(())
    }

    /// Returns `true` on the end-of-stream sentinel.
    fn dispatch(&self, session_id: u64, data: &str) -> bool {
        if data == DONE {
            return true;
        }

        match serde_json::from_str::<TokenPayload>(data) {
            Ok(TokenPayload { token: Some(token) }) => {
                self.with_session(session_id, |session| {
                    if !session.push_fragment(&token) {
                        tracing::debug!("dropping token with no open reply");
                    }
                });
            }
            Ok(TokenPayload { token: None }) => {}
            Err(e) => tracing::warn!("skipping malformed chat event {:?}: {}", data, e),
        }
        false
    }

    fn with_session(&self, session_id: u64, f: impl FnOnce(&mut ChatSession)) {
        let mut state = self.lock();
        match state.session.as_mut() {
            Some(session) if session.id() == session_id => f(session),
            _ => tracing::debug!("chat session {} is gone, dropping update", session_id),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ChatState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::session::Role;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sse(events: &[&str]) -> String {
        events.iter().map(|e| format!("data: {}\n\n", e)).collect()
    }

    async fn mount(server: &MockServer, template: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(template)
            .mount(server)
            .await;
    }

    fn stream_response(body: String) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_raw(body, "text/event-stream")
    }

    fn controller_for(server: &MockServer) -> ChatController {
        let controller = ChatController::new(&ClientConfig::default()).unwrap();
        let endpoint = Endpoint::resolve(&server.uri(), "127.0.0.1").unwrap();
        controller.open("qwen", endpoint, "Hello! How can I help?".into());
        controller
    }

    #[tokio::test]
    async fn test_tokens_accumulate_until_done() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .and(body_json(serde_json::json!({ "message": "hi" })))
            .respond_with(stream_response(sse(&[
                r#"{"token":"He"}"#,
                r#"{"token":"llo"}"#,
                "[DONE]",
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let controller = controller_for(&server);
        controller.set_draft("hi").unwrap();
        controller.send("hi").await.unwrap();

        let transcript = controller.transcript();
        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript[1], Message::user("hi"));
        assert_eq!(transcript.last(), Some(&Message::assistant("Hello")));
        assert!(!controller.in_flight());
        assert_eq!(controller.session().unwrap().draft(), "");
    }

    #[tokio::test]
    async fn test_events_after_done_are_ignored() {
        let server = MockServer::start().await;
        mount(
            &server,
            stream_response(sse(&[r#"{"token":"a"}"#, "[DONE]", r#"{"token":"b"}"#])),
        )
        .await;

        let controller = controller_for(&server);
        controller.send("hi").await.unwrap();
        assert_eq!(controller.transcript().last(), Some(&Message::assistant("a")));
    }

    #[tokio::test]
    async fn test_malformed_and_tokenless_events_are_skipped() {
        let server = MockServer::start().await;
        mount(
            &server,
            stream_response(sse(&[
                "oops",
                r#"{"token":"x"}"#,
                r#"{"other":1}"#,
                r#"{"token":"y"}"#,
            ])),
        )
        .await;

        let controller = controller_for(&server);
        controller.send("hi").await.unwrap();

        assert_eq!(controller.transcript().last(), Some(&Message::assistant("xy")));
        assert!(!controller.in_flight());
    }

    #[tokio::test]
    async fn test_server_error_appends_failure_entry() {
        let server = MockServer::start().await;
        mount(&server, ResponseTemplate::new(500)).await;

        let controller = controller_for(&server);
        let result = controller.send("hi").await;
        assert!(matches!(result, Err(crate::Error::ChatStatus(500))));

        let transcript = controller.transcript();
        assert_eq!(transcript.len(), 4);
        assert_eq!(transcript[2], Message::assistant(""));
        assert_eq!(transcript[3], Message::assistant(" Error: Connection failed."));
        assert!(!controller.in_flight());
    }

    #[tokio::test]
    async fn test_connection_refused_appends_failure_entry() {
        let controller = ChatController::new(&ClientConfig::default()).unwrap();
        // Port 9 (discard) is not expected to be listening.
        controller.open("qwen", Endpoint::resolve("9", "127.0.0.1").unwrap(), "hi".into());

        assert!(controller.send("hello").await.is_err());
        let last = controller.transcript().pop().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.text, " Error: Connection failed.");
        assert!(!controller.in_flight());
    }

    #[tokio::test]
    async fn test_stream_broken_mid_reply_appends_failure_entry() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();

            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.ends_with(b"}") {
                let n = socket.read(&mut buf).await.unwrap();
                assert!(n > 0, "client closed before sending its body");
                request.extend_from_slice(&buf[..n]);
            }

            let frame = "data: {\"token\":\"He\"}\n\n";
            let response = format!(
                "HTTP/1.1 200 OK\r\n\
                 Content-Type: text/event-stream\r\n\
                 Transfer-Encoding: chunked\r\n\r\n\
                 {:x}\r\n{}\r\n",
                frame.len(),
                frame
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.flush().await.unwrap();

            tokio::time::sleep(Duration::from_millis(100)).await;
            drop(socket);
        });

        let controller = ChatController::new(&ClientConfig::default()).unwrap();
        controller.open(
            "qwen",
            Endpoint::resolve(&port.to_string(), "127.0.0.1").unwrap(),
            "hi".into(),
        );

        assert!(controller.send("hello").await.is_err());
        server.await.unwrap();

        let transcript = controller.transcript();
        assert_eq!(
            transcript[transcript.len() - 2..],
            [
                Message::assistant("He"),
                Message::assistant(" Error: Connection failed."),
            ]
        );
        assert!(!controller.in_flight());
    }

    #[tokio::test]
    async fn test_send_while_in_flight_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(
                stream_response(sse(&[r#"{"token":"slow"}"#, "[DONE]"]))
                    .set_delay(Duration::from_millis(500)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let controller = controller_for(&server);
        let first = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.send("first").await })
        };

        while !controller.in_flight() {
            tokio::task::yield_now().await;
        }
        let before = controller.transcript().len();

        let second = controller.send("second").await;
        assert!(matches!(second, Err(crate::Error::RequestInFlight)));
        assert_eq!(controller.transcript().len(), before);

        first.await.unwrap().unwrap();
        assert_eq!(controller.transcript().last(), Some(&Message::assistant("slow")));
    }

    #[tokio::test]
    async fn test_rejections_leave_transcript_alone() {
        let controller = ChatController::new(&ClientConfig::default()).unwrap();
        assert!(matches!(controller.send("hi").await, Err(crate::Error::NoSession)));
        assert!(controller.transcript().is_empty());

        controller.open("qwen", Endpoint::resolve("8000", "127.0.0.1").unwrap(), "hi".into());
        assert!(matches!(controller.send("   ").await, Err(crate::Error::EmptyMessage)));
        assert_eq!(controller.transcript(), vec![Message::assistant("hi")]);
    }

    #[tokio::test]
    async fn test_relaunch_discards_streaming_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(
                stream_response(sse(&[r#"{"token":"old"}"#, "[DONE]"]))
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(&server)
            .await;

        let controller = controller_for(&server);
        let first = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.send("first").await })
        };
        while !controller.in_flight() {
            tokio::task::yield_now().await;
        }

        let endpoint = Endpoint::resolve(&server.uri(), "127.0.0.1").unwrap();
        controller.open("gemma", endpoint, "Fresh start".into());
        first.await.unwrap().unwrap();

        let session = controller.session().unwrap();
        assert_eq!(session.model_id(), "gemma");
        assert_eq!(session.transcript(), vec![Message::assistant("Fresh start")]);
        assert!(!session.in_flight());
    }

    #[tokio::test]
    async fn test_stream_without_done_completes_on_close() {
        let server = MockServer::start().await;
        let body = format!("{}data: {}", sse(&[r#"{"token":"ok"}"#]), r#"{"token":"!"}"#);
        mount(&server, stream_response(body)).await;

        let controller = controller_for(&server);
        controller.send("hi").await.unwrap();
        assert_eq!(controller.transcript().last(), Some(&Message::assistant("ok!")));
        assert!(!controller.in_flight());
    }
}
