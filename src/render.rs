//! Panel illustration rendering.
//!
//! Rendering never fails hard: every problem ends up as
//! [`RenderOutcome::Absent`] with the reason attached, so one bad panel can't
//! take the rest of the comic down with it.

use std::fmt;
use std::future::Future;

use base64::Engine;
use base64::engine::general_purpose;
use tracing::{debug, error, info};

use crate::error::RenderError;
use crate::gemini::{ContentPart, GeminiClient, GenerateContentResponse, InlineData, Modality, log_preview};

const FALLBACK_MIME_TYPE: &str = "image/png";

/// Wraps a panel prompt with the house illustration style.
pub fn style_prompt(prompt: &str) -> String {
    format!(
        "Create a manga panel illustration:

{prompt}

Art style: Japanese manga, clean black ink lines, halftone screentones, expressive anime characters, dynamic poses.
Format: Single panel, square aspect ratio, no text or speech bubbles."
    )
}

/// Why a panel ended up without an image.
#[derive(Debug)]
pub enum AbsentReason {
    /// No image credential is configured, nothing was requested.
    MissingCredential,
    /// The model answered without an image part.
    NoImageReturned,
    /// The call or decoding failed.
    Failed(RenderError),
}

impl fmt::Display for AbsentReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCredential => write!(f, "image API key is not configured"),
            Self::NoImageReturned => write!(f, "model returned no image"),
            Self::Failed(err) => write!(f, "{err}"),
        }
    }
}

/// Result of rendering one panel.
#[derive(Debug)]
pub enum RenderOutcome {
    /// A `data:<mime>;base64,...` URI.
    Rendered(String),
    /// No image was produced.
    Absent(AbsentReason),
}

impl RenderOutcome {
    /// The data URI, if an image was produced.
    pub fn into_image(self) -> Option<String> {
        match self {
            Self::Rendered(uri) => Some(uri),
            Self::Absent(_) => None,
        }
    }
}

/// Something that turns a panel prompt into an illustration.
pub trait PanelRenderer {
    /// Renders one panel. Implementations report failure as
    /// [`RenderOutcome::Absent`] instead of erroring.
    fn render(&self, prompt: &str) -> impl Future<Output = RenderOutcome> + Send;
}

/// Renders panels with a Gemini image model.
#[derive(Clone, Debug)]
pub struct GeminiRenderer {
    client: GeminiClient,
    api_key: Option<String>,
    model: String,
}

impl GeminiRenderer {
    /// A renderer without an API key answers every call with
    /// [`AbsentReason::MissingCredential`].
    pub fn new(client: GeminiClient, api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            client,
            api_key,
            model: model.into(),
        }
    }

    /// Whether an image model credential is available.
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn request_image(&self, api_key: &str, prompt: &str) -> Result<RenderOutcome, RenderError> {
        let response = self
            .client
            .generate_content(
                api_key,
                &self.model,
                prompt,
                Some(&[Modality::Image, Modality::Text]),
            )
            .await?;
        first_inline_image(&response)
    }
}

impl PanelRenderer for GeminiRenderer {
    async fn render(&self, prompt: &str) -> RenderOutcome {
        let Some(api_key) = self.api_key.as_deref() else {
            error!("Image API key is not configured, skipping panel render");
            return RenderOutcome::Absent(AbsentReason::MissingCredential);
        };

        let styled = style_prompt(prompt);
        debug!(
            "Calling {} with prompt: {}",
            self.model,
            log_preview(&styled, 100)
        );
        match self.request_image(api_key, &styled).await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!("Error generating panel image: {err}");
                RenderOutcome::Absent(AbsentReason::Failed(err))
            }
        }
    }
}

/// Picks the first inline image out of a response. Extra images are ignored.
pub fn first_inline_image(response: &GenerateContentResponse) -> Result<RenderOutcome, RenderError> {
    for part in response.parts() {
        match part {
            ContentPart::InlineImage { inline_data } => {
                let uri = data_uri(inline_data)?;
                debug!("Image found in response");
                return Ok(RenderOutcome::Rendered(uri));
            }
            ContentPart::Text { .. } | ContentPart::Other(_) => {}
        }
    }

    match response.text() {
        Some(text) => info!("No image found. Text response: {}", log_preview(&text, 200)),
        None => info!("No image found and no text response either"),
    }
    Ok(RenderOutcome::Absent(AbsentReason::NoImageReturned))
}

/// Builds a data URI, sniffing the MIME type from the bytes when the model
/// didn't report one.
fn data_uri(inline_data: &InlineData) -> Result<String, RenderError> {
    let bytes = general_purpose::STANDARD.decode(inline_data.data.trim())?;
    let mime_type = match inline_data.mime_type.as_deref().map(str::trim) {
        Some(mime_type) if !mime_type.is_empty() => mime_type,
        _ => image::guess_format(&bytes)
            .map(|format| format.to_mime_type())
            .unwrap_or(FALLBACK_MIME_TYPE),
    };
    Ok(format!(
        "data:{mime_type};base64,{}",
        general_purpose::STANDARD.encode(&bytes)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
    const JPEG_SIGNATURE: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10, b'J', b'F', b'I', b'F'];

    fn response_with(parts: serde_json::Value) -> GenerateContentResponse {
        serde_json::from_value(serde_json::json!({
            "candidates": [{"content": {"parts": parts}}]
        }))
        .expect("parse response")
    }

    #[test]
    fn style_prompt_wraps_panel_prompt() {
        let styled = style_prompt("4koma manga style, panel 2, a tired clerk");
        assert!(styled.starts_with("Create a manga panel illustration:"));
        assert!(styled.contains("panel 2, a tired clerk"));
        assert!(styled.contains("no text or speech bubbles"));
    }

    #[test]
    fn first_image_wins() {
        let response = response_with(serde_json::json!([
            {"text": "Here is your panel"},
            {"inlineData": {"mimeType": "image/webp", "data": "Zmlyc3Q="}},
            {"inlineData": {"mimeType": "image/png", "data": "c2Vjb25k"}}
        ]));
        let outcome = first_inline_image(&response).expect("render outcome");
        assert_eq!(
            outcome.into_image().as_deref(),
            Some("data:image/webp;base64,Zmlyc3Q=")
        );
    }

    #[test]
    fn text_only_response_is_absent() {
        let response = response_with(serde_json::json!([{"text": "I can't draw that"}]));
        let outcome = first_inline_image(&response).expect("render outcome");
        assert!(matches!(
            outcome,
            RenderOutcome::Absent(AbsentReason::NoImageReturned)
        ));
    }

    #[test]
    fn empty_response_is_absent() {
        let outcome =
            first_inline_image(&GenerateContentResponse::default()).expect("render outcome");
        assert!(outcome.into_image().is_none());
    }

    #[test]
    fn missing_mime_type_is_sniffed() {
        let png = general_purpose::STANDARD.encode(PNG_SIGNATURE);
        let jpeg = general_purpose::STANDARD.encode(JPEG_SIGNATURE);
        let unknown = general_purpose::STANDARD.encode(b"not an image");
        let cases = [
            (png, "data:image/png;base64,"),
            (jpeg, "data:image/jpeg;base64,"),
            (unknown, "data:image/png;base64,"),
        ];
        for (data, prefix) in cases {
            let uri = data_uri(&InlineData {
                mime_type: None,
                data,
            })
            .expect("data uri");
            assert!(uri.starts_with(prefix), "{uri} should start with {prefix}");
        }
    }

    #[test]
    fn bad_base64_is_a_render_error() {
        let response = response_with(serde_json::json!([
            {"inlineData": {"mimeType": "image/png", "data": "%%%not base64%%%"}}
        ]));
        assert!(matches!(
            first_inline_image(&response),
            Err(RenderError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn missing_credential_is_absent_without_a_call() {
        let base = url::Url::parse("http://127.0.0.1:9/").expect("url");
        let client =
            GeminiClient::new(&base, std::time::Duration::from_secs(1)).expect("client");
        let renderer = GeminiRenderer::new(client, None, "gemini-2.0-flash-exp-image-generation");
        assert!(!renderer.is_configured());
        assert!(matches!(
            renderer.render("panel").await,
            RenderOutcome::Absent(AbsentReason::MissingCredential)
        ));
    }
}
