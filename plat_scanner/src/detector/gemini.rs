//! Gemini vision client
//!
//! Sends one screenshot per `generateContent` call and parses the text answer.

use super::parse::parse_detections;
use super::{Detection, ItemDetector};
use crate::error::Result;
use crate::image::ImageSource;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use plat_common::DetectionError;
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

const PROMPT: &str = "Analyze this Warframe inventory screenshot and list every Prime part and \
Void Relic you can identify.
Only include the exact item names, one per line.
For relics write the era, the code and the word Relic, followed by the refinement in brackets \
when it is shown, for example: Lith A1 Relic [Radiant].
Skip relics that are drawn semi-transparent; they are not owned.
Do not include any additional text or explanations.
Example format:
Mirage Prime Blueprint
Kronen Prime Blade
Burston Prime Receiver
Axi S3 Relic [Intact]";

/// Credentials and endpoint for the Gemini client
#[derive(Clone)]
pub struct DetectorConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl fmt::Debug for DetectorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetectorConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl DetectorConfig {
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Self::default()
        }
    }

    /// A non-blank API key is present
    pub fn is_ready(&self) -> bool {
        self.api_key().is_some()
    }

    fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|key| !key.trim().is_empty())
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate, if there is one
    fn text(&self) -> Option<String> {
        let candidate = self.candidates.first()?;
        let text = candidate
            .content
            .as_ref()
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default();
        Some(text)
    }
}

/// Item detector backed by the Gemini `generateContent` endpoint
pub struct GeminiDetector {
    config: DetectorConfig,
    client: reqwest::Client,
}

impl GeminiDetector {
    pub fn new(config: DetectorConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("PlatScanner/", env!("CARGO_PKG_VERSION")))
            .build()?;

        if !config.is_ready() {
            log::warn!("Gemini API key not configured; uploads will be refused");
        }

        Ok(Self { config, client })
    }
}

#[async_trait]
impl ItemDetector for GeminiDetector {
    fn is_ready(&self) -> bool {
        self.config.is_ready()
    }

    async fn detect(&self, image: &ImageSource) -> std::result::Result<Vec<Detection>, DetectionError> {
        let api_key = self
            .config
            .api_key()
            .ok_or_else(|| DetectionError::NotConfigured("Gemini API key not configured".into()))?;

        let body = json!({
            "contents": [{
                "parts": [
                    { "text": PROMPT },
                    {
                        "inline_data": {
                            "mime_type": image.mime_type,
                            "data": STANDARD.encode(&image.bytes),
                        }
                    }
                ]
            }]
        });

        log::debug!(
            "Analyzing {} ({} bytes) with {}",
            image.name,
            image.size(),
            self.config.model
        );

        let response = self
            .client
            .post(self.config.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| DetectionError::Failed(format!("Gemini request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ApiErrorBody>()
                .await
                .map(|body| body.error.message)
                .unwrap_or_else(|_| status.to_string());
            log::warn!("Gemini returned {} for {}: {}", status, image.name, message);
            return Err(DetectionError::Failed(format!(
                "Gemini returned {status}: {message}"
            )));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| DetectionError::Failed(format!("Unreadable Gemini response: {e}")))?;

        let text = parsed
            .text()
            .ok_or_else(|| DetectionError::Failed("Gemini returned no candidates".into()))?;

        let detections = parse_detections(&text);
        log::info!("Detected {} item(s) in {}", detections.len(), image.name);
        Ok(detections)
    }
}

#[cfg(test)]
#[path = "gemini_tests.rs"]
mod tests;
