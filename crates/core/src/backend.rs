use crate::bloom::BloomLevel;
use crate::error::BackendError;
use crate::session_state::Message;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const CHAT: &str = "chat";
const ANALYZE: &str = "analyze";
const HEALTH: &str = "health";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
    pub sentiment: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeReply {
    pub confidence: f64,
    pub empathy: f64,
    pub question_quality: f64,
    #[serde(default)]
    pub feedback: String,
}

impl AnalyzeReply {
    pub fn score(&self) -> crate::assessment::AssessmentScore {
        crate::assessment::AssessmentScore {
            confidence: self.confidence,
            empathy: self.empathy,
            question_quality: self.question_quality,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    text: &'a str,
    bloom_level: &'a str,
}

#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    therapist_msg: &'a str,
    /// The message window, itself JSON-encoded.
    history: String,
}

#[derive(Debug, Deserialize)]
struct HealthReply {
    status: String,
}

/// The remote service that plays the patient and grades the therapist.
///
/// `SessionController` only talks to this trait. `HttpBackend` is the real
/// transport; tests use the `mockall`-generated `MockPatientBackend`, which
/// only exists under `cfg(test)`.
///
/// Every method returns a `BackendError` rather than panicking or retrying.
/// The controller decides what a failure means for the turn: a failed `chat`
/// ends it before any patient message exists, a failed `analyze` keeps the
/// reply and leaves the previous scores in place.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PatientBackend: Send + Sync {
    /// Generates the patient's reply to `text`, framed for `level`.
    async fn chat(&self, text: &str, level: BloomLevel) -> Result<ChatReply, BackendError>;

    /// Scores the therapist's latest message against recent history.
    async fn analyze(
        &self,
        therapist_msg: &str,
        history: &[Message],
    ) -> Result<AnalyzeReply, BackendError>;

    async fn health(&self) -> Result<(), BackendError>;
}

/// JSON-over-HTTP client for the patient backend.
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    async fn read<T: DeserializeOwned>(
        endpoint: &'static str,
        response: reqwest::Response,
    ) -> Result<T, BackendError> {
        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status {
                endpoint,
                status: status.as_u16(),
            });
        }
        let body = response
            .bytes()
            .await
            .map_err(|source| BackendError::Transport { endpoint, source })?;
        serde_json::from_slice(&body).map_err(|e| BackendError::Malformed {
            endpoint,
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl PatientBackend for HttpBackend {
    async fn chat(&self, text: &str, level: BloomLevel) -> Result<ChatReply, BackendError> {
        let body = ChatRequest {
            text,
            bloom_level: level.wire_name(),
        };
        tracing::debug!(?body, "sending chat request");

        let response = self
            .client
            .post(self.url(CHAT))
            .json(&body)
            .send()
            .await
            .map_err(|source| BackendError::Transport {
                endpoint: CHAT,
                source,
            })?;
        let reply: ChatReply = Self::read(CHAT, response).await?;

        if !reply.sentiment.is_finite() {
            return Err(BackendError::Malformed {
                endpoint: CHAT,
                reason: "sentiment is not a number".to_string(),
            });
        }
        Ok(reply)
    }

    async fn analyze(
        &self,
        therapist_msg: &str,
        history: &[Message],
    ) -> Result<AnalyzeReply, BackendError> {
        let history = serde_json::to_string(history).map_err(|e| BackendError::Malformed {
            endpoint: ANALYZE,
            reason: format!("could not encode history: {e}"),
        })?;
        let body = AnalyzeRequest {
            therapist_msg,
            history,
        };
        tracing::debug!(?body, "sending analyze request");

        let response = self
            .client
            .post(self.url(ANALYZE))
            .json(&body)
            .send()
            .await
            .map_err(|source| BackendError::Transport {
                endpoint: ANALYZE,
                source,
            })?;
        Self::read(ANALYZE, response).await
    }

    async fn health(&self) -> Result<(), BackendError> {
        let response = self
            .client
            .get(self.url(HEALTH))
            .send()
            .await
            .map_err(|source| BackendError::Transport {
                endpoint: HEALTH,
                source,
            })?;
        let reply: HealthReply = Self::read(HEALTH, response).await?;
        if reply.status != "healthy" {
            return Err(BackendError::Malformed {
                endpoint: HEALTH,
                reason: format!("status is {:?}", reply.status),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::serve_once;
    use std::env;
    use tokio::net::TcpListener;

    fn backend(base_url: &str) -> HttpBackend {
        HttpBackend::new(base_url, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_chat_sends_lowercase_level_and_parses_reply() {
        // --- 1. Arrange ---
        let (url, server) =
            serve_once("HTTP/1.1 200 OK", r#"{"reply":"I'm anxious","sentiment":-0.5}"#).await;

        // --- 2. Act ---
        let reply = backend(&url)
            .chat("How are you feeling today?", BloomLevel::Apply)
            .await
            .unwrap();

        // --- 3. Assert ---
        assert_eq!(reply.reply, "I'm anxious");
        assert_eq!(reply.sentiment, -0.5);

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /chat"));
        assert!(request.contains(r#""bloom_level":"apply""#));
        assert!(request.contains(r#""text":"How are you feeling today?""#));
    }

    #[tokio::test]
    async fn test_analyze_sends_history_as_json_string() {
        // --- 1. Arrange ---
        let (url, server) = serve_once(
            "HTTP/1.1 200 OK",
            r#"{"confidence":70,"empathy":60,"questionQuality":65,"feedback":"Ask more open questions"}"#,
        )
        .await;

        let history = vec![Message::therapist("Hi"), Message::patient("Hello", 0.2)];

        // --- 2. Act ---
        let reply = backend(&url).analyze("Hi", &history).await.unwrap();

        // --- 3. Assert ---
        assert_eq!(reply.question_quality, 65.0);
        assert_eq!(reply.feedback, "Ask more open questions");

        let request = server.await.unwrap();
        let body = &request[request.find("\r\n\r\n").unwrap() + 4..];
        let json: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(json["therapist_msg"], "Hi");
        let history: Vec<Message> =
            serde_json::from_str(json["history"].as_str().expect("history is a string")).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].sentiment, Some(0.2));
    }

    #[tokio::test]
    async fn test_non_success_status_is_reported() {
        let (url, _server) =
            serve_once("HTTP/1.1 500 Internal Server Error", r#"{"error":"boom"}"#).await;

        let err = backend(&url)
            .chat("hello", BloomLevel::Remember)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BackendError::Status {
                endpoint: "chat",
                status: 500
            }
        ));
    }

    #[tokio::test]
    async fn test_wrong_shape_is_malformed() {
        let (url, _server) = serve_once("HTTP/1.1 200 OK", r#"{"answer":"??"}"#).await;

        let err = backend(&url)
            .chat("hello", BloomLevel::Remember)
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Malformed { endpoint: "chat", .. }));
    }

    #[tokio::test]
    async fn test_unreachable_is_transport() {
        // --- 1. Arrange ---
        // Bind then release a port so nothing is listening on it.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        // --- 2. Act ---
        let err = backend(&format!("http://{addr}/"))
            .health()
            .await
            .unwrap_err();

        // --- 3. Assert ---
        assert!(matches!(err, BackendError::Transport { endpoint: "health", .. }));
    }

    #[tokio::test]
    async fn test_health_requires_healthy_status() {
        let (url, _server) = serve_once("HTTP/1.1 200 OK", r#"{"status":"healthy"}"#).await;
        backend(&url).health().await.unwrap();

        let (url, _server) = serve_once("HTTP/1.1 200 OK", r#"{"status":"degraded"}"#).await;
        let err = backend(&url).health().await.unwrap_err();
        assert!(matches!(err, BackendError::Malformed { endpoint: "health", .. }));
    }

    // Talks to a running backend. Run with `cargo test -- --ignored`.
    #[tokio::test]
    #[ignore]
    async fn test_live_backend_round_trip() {
        dotenvy::dotenv_override().ok();
        let url = env::var("MINDLINK_BACKEND_URL").unwrap_or_else(|_| "http://localhost:5001".into());
        let backend = backend(&url);

        backend.health().await.expect("backend should be healthy");
        let reply = backend
            .chat("How are you feeling today?", BloomLevel::Apply)
            .await
            .expect("chat failed");
        assert!(!reply.reply.is_empty());
        assert!((-1.0..=1.0).contains(&reply.sentiment));
    }
}
