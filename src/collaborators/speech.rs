//! Text-to-speech service
//!
//! POSTs `{"text", "severity"}` to `TTS_URL`; the response body is the audio.

use super::http_client;
use crate::pipeline::alerts::Severity;
use async_trait::async_trait;
use serde::Serialize;

const SPEECH_TIMEOUT_SECS: u64 = 30;

#[async_trait]
pub trait SpeechService: Send + Sync {
    /// Audio bytes for `text`, `None` when unavailable
    async fn synthesize(&self, text: &str, severity: Severity) -> Option<Vec<u8>>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableSpeech;

#[async_trait]
impl SpeechService for UnavailableSpeech {
    async fn synthesize(&self, _text: &str, _severity: Severity) -> Option<Vec<u8>> {
        None
    }
}

#[derive(Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    severity: Severity,
}

pub struct HttpSpeechService {
    client: reqwest::Client,
    url: String,
}

impl HttpSpeechService {
    pub fn new(url: &str) -> Self {
        Self {
            client: http_client(SPEECH_TIMEOUT_SECS),
            url: url.to_string(),
        }
    }

    async fn request(&self, text: &str, severity: Severity) -> Result<Vec<u8>, reqwest::Error> {
        let response = self
            .client
            .post(&self.url)
            .json(&SpeechRequest { text, severity })
            .send()
            .await?
            .error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl SpeechService for HttpSpeechService {
    async fn synthesize(&self, text: &str, severity: Severity) -> Option<Vec<u8>> {
        match self.request(text, severity).await {
            Ok(audio) if !audio.is_empty() => Some(audio),
            Ok(_) => {
                log::warn!("⚠️  Speech service returned an empty body");
                None
            }
            Err(e) => {
                log::warn!("⚠️  Speech unavailable: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn test_http_speech_returns_audio() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/tts")
            .match_body(Matcher::Json(serde_json::json!({
                "text": "Low altitude",
                "severity": "danger"
            })))
            .with_status(200)
            .with_header("content-type", "audio/mpeg")
            .with_body(vec![0x49u8, 0x44, 0x33])
            .create_async()
            .await;

        let service = HttpSpeechService::new(&format!("{}/tts", server.url()));
        let audio = service.synthesize("Low altitude", Severity::Danger).await;

        assert_eq!(audio, Some(vec![0x49, 0x44, 0x33]));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_speech_error_is_unavailable() {
        let mut server = mockito::Server::new_async().await;
        server.mock("POST", "/tts").with_status(503).create_async().await;

        let service = HttpSpeechService::new(&format!("{}/tts", server.url()));
        assert_eq!(service.synthesize("hello", Severity::Info).await, None);
    }

    #[tokio::test]
    async fn test_http_speech_empty_body_is_unavailable() {
        let mut server = mockito::Server::new_async().await;
        server.mock("POST", "/tts").with_status(200).create_async().await;

        let service = HttpSpeechService::new(&format!("{}/tts", server.url()));
        assert_eq!(service.synthesize("hello", Severity::Info).await, None);
    }
}
