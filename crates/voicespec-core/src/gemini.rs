//! Minimal Gemini REST client: resumable file upload and `generateContent`.

use crate::audio::AudioFile;
use crate::config::GeminiConfig;
use crate::error::{Result, VoicespecError};
use crate::prompt;
use crate::spec;
use crate::stages::SpecModel;
use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const API_KEY_HEADER: &str = "x-goog-api-key";
const UPLOAD_URL_HEADER: &str = "x-goog-upload-url";

/// Audio uploads and long transcripts outlast reqwest's 30 s default.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub uri: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Deserialize)]
struct UploadResponse {
    file: UploadedFile,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate.
    fn text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

// ─── Client ──────────────────────────────────────────────────────────────────

pub struct GeminiClient {
    http: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, config: &GeminiConfig) -> Result<Self> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Upload audio through the Files API resumable protocol.
    pub fn upload(&self, audio: &AudioFile) -> Result<UploadedFile> {
        let bytes = audio.read()?;
        let display_name = audio.display_name();

        let start = self
            .http
            .post(format!("{}/upload/v1beta/files", self.base_url))
            .header(API_KEY_HEADER, &self.api_key)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", bytes.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", audio.mime_type)
            .json(&json!({ "file": { "display_name": display_name } }))
            .send()?;
        let start = check(start)?;

        let upload_url = start
            .headers()
            .get(UPLOAD_URL_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| VoicespecError::MissingResponseHeader("X-Goog-Upload-URL".into()))?;

        tracing::debug!(file = %display_name, size = bytes.len(), "uploading audio");
        let resp = self
            .http
            .post(upload_url)
            .header(API_KEY_HEADER, &self.api_key)
            .header("X-Goog-Upload-Command", "upload, finalize")
            .header("X-Goog-Upload-Offset", "0")
            .header(reqwest::header::CONTENT_TYPE, audio.mime_type)
            .body(bytes)
            .send()?;
        let uploaded: UploadResponse = check(resp)?.json()?;
        tracing::debug!(uri = %uploaded.file.uri, "audio uploaded");
        Ok(uploaded.file)
    }

    /// POST `models/{model}:generateContent` and return the answer text.
    pub fn generate(&self, body: &serde_json::Value) -> Result<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let resp = self
            .http
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()?;
        let parsed: GenerateResponse = check(resp)?.json()?;
        parsed.text().ok_or(VoicespecError::EmptyModelResponse)
    }
}

impl SpecModel for GeminiClient {
    fn transcribe(&self, audio: &AudioFile) -> Result<String> {
        let file = self.upload(audio)?;
        let mime_type = file
            .mime_type
            .clone()
            .unwrap_or_else(|| audio.mime_type.to_string());
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "text": prompt::TRANSCRIPTION_PROMPT },
                    { "fileData": { "mimeType": mime_type, "fileUri": file.uri } }
                ]
            }]
        });
        self.generate(&body)
    }

    fn structure(&self, transcript: &str) -> Result<String> {
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt::structuring_prompt(transcript) }]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": spec::response_schema()
            }
        });
        self.generate(&body)
    }
}

/// Map a non-success status to `VoicespecError::Gemini`, reading the API's
/// `error.message` when present.
fn check(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or(body);
    Err(VoicespecError::Gemini {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use tempfile::TempDir;

    fn client(server: &mockito::Server) -> GeminiClient {
        let config = GeminiConfig {
            model: "gemini-test".into(),
            base_url: server.url(),
        };
        GeminiClient::new("test-key", &config).unwrap()
    }

    fn answer(text: &str) -> String {
        json!({
            "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }]
        })
        .to_string()
    }

    #[test]
    fn transcribe_uploads_then_generates() {
        let mut server = mockito::Server::new();
        let upload_url = format!("{}/upload-session/abc", server.url());

        let start = server
            .mock("POST", "/upload/v1beta/files")
            .match_header("x-goog-api-key", "test-key")
            .match_header("x-goog-upload-protocol", "resumable")
            .match_header("x-goog-upload-command", "start")
            .match_header("x-goog-upload-header-content-length", "5")
            .match_header("x-goog-upload-header-content-type", "audio/mpeg")
            .with_status(200)
            .with_header("x-goog-upload-url", &upload_url)
            .create();
        let finalize = server
            .mock("POST", "/upload-session/abc")
            .match_header("x-goog-upload-command", "upload, finalize")
            .match_header("x-goog-upload-offset", "0")
            .match_body("hello")
            .with_status(200)
            .with_body(
                json!({ "file": { "name": "files/abc", "uri": "https://files/abc", "mimeType": "audio/mpeg" } })
                    .to_string(),
            )
            .create();
        let generate = server
            .mock("POST", "/v1beta/models/gemini-test:generateContent")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#""fileUri":"https://files/abc""#.into()),
                Matcher::Regex("Please transcribe this audio recording".into()),
            ]))
            .with_status(200)
            .with_body(answer("build me a todo app"))
            .create();

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("memo.mp3");
        std::fs::write(&path, b"hello").unwrap();
        let audio = AudioFile::open(&path).unwrap();

        let transcript = client(&server).transcribe(&audio).unwrap();
        assert_eq!(transcript, "build me a todo app");
        start.assert();
        finalize.assert();
        generate.assert();
    }

    #[test]
    fn structure_requests_schema_constrained_json() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/v1beta/models/gemini-test:generateContent")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#""responseMimeType":"application/json""#.into()),
                Matcher::Regex(r#""responseSchema""#.into()),
            ]))
            .with_status(200)
            .with_body(answer(r#"{"project_name":"x"}"#))
            .create();

        let text = client(&server).structure("a todo app").unwrap();
        assert_eq!(text, r#"{"project_name":"x"}"#);
        mock.assert();
    }

    #[test]
    fn api_error_message_is_surfaced() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/v1beta/models/gemini-test:generateContent")
            .with_status(403)
            .with_body(r#"{"error":{"code":403,"message":"API key not valid"}}"#)
            .create();

        let err = client(&server).structure("x").unwrap_err();
        match err {
            VoicespecError::Gemini { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "API key not valid");
            }
            other => panic!("unexpected: {other}"),
        }
    }

    #[test]
    fn empty_candidates_is_an_error() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/v1beta/models/gemini-test:generateContent")
            .with_status(200)
            .with_body(r#"{"candidates":[]}"#)
            .create();

        let err = client(&server).structure("x").unwrap_err();
        assert!(matches!(err, VoicespecError::EmptyModelResponse));
    }

    #[test]
    fn missing_upload_url_header() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/upload/v1beta/files")
            .with_status(200)
            .create();

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("memo.wav");
        std::fs::write(&path, b"RIFF").unwrap();
        let audio = AudioFile::open(&path).unwrap();

        let err = client(&server).upload(&audio).unwrap_err();
        assert!(matches!(err, VoicespecError::MissingResponseHeader(_)));
    }
}
