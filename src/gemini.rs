//! Client for the Gemini `generateContent` REST endpoint.
//!
//! Docs: <https://ai.google.dev/api/generate-content>

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::UpstreamError;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Output modalities a model may be asked for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Modality {
    /// Plain text
    Text,
    /// Inline images
    Image,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: [RequestContent<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig<'a>>,
}

#[derive(Serialize, Debug)]
struct RequestContent<'a> {
    role: &'static str,
    parts: [RequestPart<'a>; 1],
}

#[derive(Serialize, Debug)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_modalities: &'a [Modality],
}

/// Body of a successful `generateContent` call.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    /// Candidate completions; only the first one is used.
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

/// One candidate completion.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Missing when the candidate was blocked.
    #[serde(default)]
    pub content: Option<Content>,
    /// Why generation stopped, eg `STOP` or `SAFETY`.
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// The parts making up a candidate.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Content {
    /// Content parts in model order.
    #[serde(default)]
    pub parts: Vec<ContentPart>,
}

/// A single content part. Gemini distinguishes parts by which field is
/// present rather than by a tag, so this is matched on shape.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ContentPart {
    /// Inline binary data, base64 encoded.
    InlineImage {
        /// The image payload
        #[serde(rename = "inlineData", alias = "inline_data")]
        inline_data: InlineData,
    },
    /// Generated text.
    Text {
        /// The text
        text: String,
    },
    /// Anything else (function calls, thoughts, ...).
    Other(serde_json::Value),
}

/// Base64 payload of an inline part.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    /// MIME type reported by the model, if any.
    #[serde(default, alias = "mime_type")]
    pub mime_type: Option<String>,
    /// Base64 encoded bytes.
    pub data: String,
}

impl GenerateContentResponse {
    /// Parts of the first candidate.
    pub fn parts(&self) -> &[ContentPart] {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| content.parts.as_slice())
            .unwrap_or_default()
    }

    /// All text parts of the first candidate joined together, if there are any.
    pub fn text(&self) -> Option<String> {
        let text: String = self
            .parts()
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text { text } => Some(text.as_str()),
                ContentPart::InlineImage { .. } | ContentPart::Other(_) => None,
            })
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

#[derive(Deserialize, Debug)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize, Debug)]
struct ErrorBody {
    message: String,
}

/// HTTP client for the Gemini API, built once at startup and shared.
#[derive(Clone, Debug)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_base: String,
}

impl GeminiClient {
    /// Builds a client against `api_base`, eg `https://generativelanguage.googleapis.com/v1beta`.
    pub fn new(api_base: &Url, request_timeout: Duration) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            http,
            api_base: api_base.as_str().trim_end_matches('/').to_string(),
        })
    }

    /// URL of the `generateContent` method for a model.
    pub fn endpoint_for_model(&self, model: &str) -> String {
        let trimmed = model.trim();
        let model_path = if trimmed.starts_with("models/") {
            trimmed.to_string()
        } else {
            format!("models/{trimmed}")
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }

    /// Sends a single-turn prompt and returns the parsed response.
    pub async fn generate_content(
        &self,
        api_key: &str,
        model: &str,
        prompt: &str,
        modalities: Option<&[Modality]>,
    ) -> Result<GenerateContentResponse, UpstreamError> {
        let endpoint = self.endpoint_for_model(model);
        let body = GenerateContentRequest {
            contents: [RequestContent {
                role: "user",
                parts: [RequestPart { text: prompt }],
            }],
            generation_config: modalities.map(|response_modalities| GenerationConfig {
                response_modalities,
            }),
        };

        debug!("POST {endpoint}");
        let resp = self
            .http
            .post(&endpoint)
            .header(API_KEY_HEADER, api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let bytes = resp.bytes().await?;
        if !status.is_success() {
            let message = match serde_json::from_slice::<ErrorEnvelope>(&bytes) {
                Ok(envelope) => envelope.error.message,
                Err(_) => String::from_utf8_lossy(&bytes).into_owned(),
            };
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_slice(&bytes).map_err(UpstreamError::Decode)
    }
}

/// Shortens text for log lines without splitting a character.
pub(crate) fn log_preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parts_are_matched_by_shape() {
        let response: GenerateContentResponse = serde_json::from_str(
            r#"{
                "candidates": [{
                    "content": {"parts": [
                        {"text": "Here you go"},
                        {"inlineData": {"mimeType": "image/png", "data": "aGVsbG8="}},
                        {"functionCall": {"name": "noop"}}
                    ]},
                    "finishReason": "STOP"
                }]
            }"#,
        )
        .expect("parse response");

        let parts = response.parts();
        assert_eq!(parts.len(), 3);
        assert!(matches!(&parts[0], ContentPart::Text { text } if text == "Here you go"));
        assert!(matches!(
            &parts[1],
            ContentPart::InlineImage { inline_data } if inline_data.mime_type.as_deref() == Some("image/png")
        ));
        assert!(matches!(&parts[2], ContentPart::Other(_)));
        assert_eq!(response.text().as_deref(), Some("Here you go"));
    }

    #[test]
    fn snake_case_inline_data_is_accepted() {
        let part: ContentPart =
            serde_json::from_str(r#"{"inline_data": {"mime_type": "image/jpeg", "data": "AA=="}}"#)
                .expect("parse part");
        assert!(matches!(part, ContentPart::InlineImage { .. }));
    }

    #[test]
    fn blocked_candidate_has_no_parts() {
        let response: GenerateContentResponse =
            serde_json::from_str(r#"{"candidates": [{"finishReason": "SAFETY"}]}"#)
                .expect("parse response");
        assert!(response.parts().is_empty());
        assert_eq!(response.text(), None);
    }

    #[test]
    fn endpoint_accepts_prefixed_models() {
        let base = Url::parse("https://example.org/v1beta/").expect("url");
        let client = GeminiClient::new(&base, Duration::from_secs(5)).expect("client");
        assert_eq!(
            client.endpoint_for_model("gemini-2.0-flash"),
            "https://example.org/v1beta/models/gemini-2.0-flash:generateContent"
        );
        assert_eq!(
            client.endpoint_for_model("models/gemini-2.0-flash"),
            "https://example.org/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn request_body_uses_camel_case_modalities() {
        let body = GenerateContentRequest {
            contents: [RequestContent {
                role: "user",
                parts: [RequestPart { text: "draw" }],
            }],
            generation_config: Some(GenerationConfig {
                response_modalities: &[Modality::Image, Modality::Text],
            }),
        };
        let value = serde_json::to_value(&body).expect("serialize");
        assert_eq!(
            value["generationConfig"]["responseModalities"],
            serde_json::json!(["IMAGE", "TEXT"])
        );
        assert_eq!(value["contents"][0]["parts"][0]["text"], "draw");
    }

    #[test]
    fn log_preview_respects_char_boundaries() {
        assert_eq!(log_preview("漫画漫画", 2), "漫画...");
        assert_eq!(log_preview("short", 100), "short");
    }
}
