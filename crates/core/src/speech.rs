use crate::error::BackendError;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::time::Duration;

const SPEECH: &str = "speech";

pub const ELEVENLABS_BASE_URL: &str = "https://api.elevenlabs.io/v1";
pub const DEFAULT_VOICE_ID: &str = "21m00Tcm4TlvDq8ikWAM";
pub const DEFAULT_MODEL_ID: &str = "eleven_monolingual_v1";

/// Turns patient replies into playable audio. Playback is up to the caller.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, BackendError>;
}

#[derive(Debug, Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

/// ElevenLabs text-to-speech client returning MPEG audio.
pub struct ElevenLabsClient {
    client: Client,
    api_key: SecretString,
    base_url: String,
    voice_id: String,
    model_id: String,
}

impl ElevenLabsClient {
    /// Speech runs on detached tasks that hold the session's event sender, so
    /// every request must be bounded by `timeout`.
    pub fn new(api_key: SecretString, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key,
            base_url: ELEVENLABS_BASE_URL.to_string(),
            voice_id: DEFAULT_VOICE_ID.to_string(),
            model_id: DEFAULT_MODEL_ID.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsClient {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, BackendError> {
        let body = SpeechRequest {
            text,
            model_id: &self.model_id,
            voice_settings: VoiceSettings {
                stability: 0.5,
                similarity_boost: 0.5,
            },
        };

        let response = self
            .client
            .post(format!("{}/text-to-speech/{}", self.base_url, self.voice_id))
            .header("Accept", "audio/mpeg")
            .header("xi-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|source| BackendError::Transport {
                endpoint: SPEECH,
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status {
                endpoint: SPEECH,
                status: status.as_u16(),
            });
        }

        let audio = response
            .bytes()
            .await
            .map_err(|source| BackendError::Transport {
                endpoint: SPEECH,
                source,
            })?;
        if audio.is_empty() {
            return Err(BackendError::Malformed {
                endpoint: SPEECH,
                reason: "empty audio body".to_string(),
            });
        }
        Ok(audio.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::serve_once;
    use std::env;

    fn client(base_url: &str, timeout: Duration) -> ElevenLabsClient {
        ElevenLabsClient::new(SecretString::from("test-key"), timeout)
            .unwrap()
            .with_base_url(base_url)
    }

    #[tokio::test]
    async fn test_synthesize_posts_to_voice_and_returns_audio() {
        // --- 1. Arrange ---
        let (url, server) = serve_once("HTTP/1.1 200 OK", "ID3-fake-mpeg").await;

        // --- 2. Act ---
        let audio = client(&url, Duration::from_secs(5))
            .synthesize("I'm anxious")
            .await
            .unwrap();

        // --- 3. Assert ---
        assert_eq!(audio, b"ID3-fake-mpeg");
        let request = server.await.unwrap();
        assert!(request.starts_with(&format!("POST /text-to-speech/{DEFAULT_VOICE_ID}")));
        assert!(request.to_ascii_lowercase().contains("xi-api-key: test-key"));
        assert!(request.contains(r#""text":"I'm anxious""#));
        assert!(request.contains(r#""model_id":"eleven_monolingual_v1""#));
        assert!(request.contains(r#""similarity_boost":0.5"#));
    }

    #[tokio::test]
    async fn test_rejected_key_is_a_status_error() {
        let (url, _server) = serve_once("HTTP/1.1 401 Unauthorized", "{}").await;

        let err = client(&url, Duration::from_secs(5))
            .synthesize("hello")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            BackendError::Status {
                endpoint: "speech",
                status: 401
            }
        ));
    }

    #[tokio::test]
    async fn test_empty_audio_is_malformed() {
        let (url, _server) = serve_once("HTTP/1.1 200 OK", "").await;

        let err = client(&url, Duration::from_secs(5))
            .synthesize("hello")
            .await
            .unwrap_err();

        assert!(matches!(err, BackendError::Malformed { endpoint: "speech", .. }));
    }

    #[tokio::test]
    async fn test_stalled_server_times_out() {
        // --- 1. Arrange ---
        // Accepts the connection but never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(socket);
        });

        // --- 2. Act ---
        let result = tokio::time::timeout(
            Duration::from_secs(5),
            client(&format!("http://{addr}"), Duration::from_millis(200)).synthesize("hello"),
        )
        .await;

        // --- 3. Assert ---
        let err = result.expect("client timeout should fire first").unwrap_err();
        assert!(matches!(err, BackendError::Transport { endpoint: "speech", .. }));
    }

    // Makes a live call to ElevenLabs. Run with `cargo test -- --ignored`.
    #[tokio::test]
    #[ignore]
    async fn test_live_synthesis() {
        dotenvy::dotenv_override().ok();
        let key = env::var("ELEVENLABS_API_KEY").expect("ELEVENLABS_API_KEY not set");
        let client = ElevenLabsClient::new(SecretString::from(key), Duration::from_secs(30))
            .expect("client should build");
        let audio = client.synthesize("Hello there.").await.expect("synthesis failed");
        assert!(audio.len() > 100);
    }
}
