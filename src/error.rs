//! Error handling

use axum::Json;
use axum::extract::rejection::{FormRejection, JsonRejection};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::{error, info};

/// Errors returned by the generation pipeline and the web handlers.
#[derive(Debug)]
pub enum MangaError {
    /// A required upstream credential is missing.
    Configuration(String),
    /// The script response could not be turned into a comic.
    Generation(GenerationError),
    /// Calling the text model failed.
    Upstream(UpstreamError),
    /// Targeted regeneration referenced a panel that isn't in the sequence.
    PanelNotFound(u32),
    /// When you didn't do the right thing
    BadRequest(String),
    /// Missing or invalid session
    Unauthorized,
    /// When an internal server error occurs
    InternalServerError(String),
}

impl std::fmt::Display for MangaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration(message) => write!(f, "{message}"),
            Self::Generation(err) => write!(f, "{err}"),
            Self::Upstream(err) => write!(f, "{err}"),
            Self::PanelNotFound(_) => write!(f, "Panel not found"),
            Self::BadRequest(message) => write!(f, "{message}"),
            Self::Unauthorized => write!(f, "Unauthorized: invalid or missing session."),
            Self::InternalServerError(message) => write!(f, "Internal server error: {message}"),
        }
    }
}

impl std::error::Error for MangaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Generation(err) => Some(err),
            Self::Upstream(err) => Some(err),
            _ => None,
        }
    }
}

impl MangaError {
    /// HTTP status reported for this error on the JSON API.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Configuration(_) | Self::Upstream(_) | Self::InternalServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Generation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::PanelNotFound(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }
}

impl From<GenerationError> for MangaError {
    fn from(err: GenerationError) -> Self {
        MangaError::Generation(err)
    }
}

impl From<UpstreamError> for MangaError {
    fn from(err: UpstreamError) -> Self {
        MangaError::Upstream(err)
    }
}

impl From<std::io::Error> for MangaError {
    fn from(err: std::io::Error) -> Self {
        MangaError::InternalServerError(err.to_string())
    }
}

impl From<axum::http::Error> for MangaError {
    fn from(err: axum::http::Error) -> Self {
        MangaError::InternalServerError(err.to_string())
    }
}

impl From<askama::Error> for MangaError {
    fn from(err: askama::Error) -> Self {
        MangaError::InternalServerError(err.to_string())
    }
}

impl From<tower_sessions::session::Error> for MangaError {
    fn from(err: tower_sessions::session::Error) -> Self {
        MangaError::InternalServerError(err.to_string())
    }
}

impl From<JsonRejection> for MangaError {
    fn from(err: JsonRejection) -> Self {
        MangaError::BadRequest(err.body_text())
    }
}

impl From<FormRejection> for MangaError {
    fn from(err: FormRejection) -> Self {
        MangaError::BadRequest(err.body_text())
    }
}

impl IntoResponse for MangaError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        match &self {
            MangaError::BadRequest(message) => info!("Bad request received: {message}"),
            MangaError::Unauthorized => info!("Unauthorized request received"),
            MangaError::PanelNotFound(number) => info!("Panel {number} not found"),
            MangaError::Configuration(_)
            | MangaError::Generation(_)
            | MangaError::Upstream(_)
            | MangaError::InternalServerError(_) => error!("Request failed: {self}"),
        }
        let body = Json(json!({
            "success": false,
            "error": self.to_string(),
        }));
        (status, body).into_response()
    }
}

/// Failures turning the text model's output into a comic.
#[derive(Debug)]
pub enum GenerationError {
    /// The payload wasn't valid JSON or didn't match the script structure.
    Parse(serde_json::Error),
    /// The script didn't contain exactly four panels.
    PanelCount(usize),
    /// The code fence pattern failed to compile.
    Pattern(regex::Error),
}

impl std::fmt::Display for GenerationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "Failed to parse manga script: {err}"),
            Self::PanelCount(count) => {
                write!(f, "Manga script must contain exactly 4 panels, got {count}")
            }
            Self::Pattern(err) => write!(f, "Invalid code fence pattern: {err}"),
        }
    }
}

impl std::error::Error for GenerationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::Pattern(err) => Some(err),
            Self::PanelCount(_) => None,
        }
    }
}

impl From<serde_json::Error> for GenerationError {
    fn from(err: serde_json::Error) -> Self {
        GenerationError::Parse(err)
    }
}

/// Failures talking to the generative model API.
#[derive(Debug)]
pub enum UpstreamError {
    /// The request never produced a response.
    Transport(reqwest::Error),
    /// The API answered with a non-success status.
    Status {
        /// HTTP status code
        status: u16,
        /// Message reported by the API, or the raw body
        message: String,
    },
    /// The response body wasn't the expected JSON.
    Decode(serde_json::Error),
    /// The response carried no text to work with.
    EmptyResponse,
}

impl std::fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(err) => write!(f, "Request to Gemini API failed: {err}"),
            Self::Status { status, message } => {
                write!(f, "Gemini API error {status}: {message}")
            }
            Self::Decode(err) => write!(f, "Failed to parse Gemini API response: {err}"),
            Self::EmptyResponse => write!(f, "Gemini API response contained no text"),
        }
    }
}

impl std::error::Error for UpstreamError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(err) => Some(err),
            Self::Decode(err) => Some(err),
            Self::Status { .. } | Self::EmptyResponse => None,
        }
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        UpstreamError::Transport(err)
    }
}

/// Failures rendering a single panel. These never leave the renderer: they
/// are logged and reported as an absent image.
#[derive(Debug)]
pub enum RenderError {
    /// Calling the image model failed.
    Upstream(UpstreamError),
    /// The inline image data wasn't valid base64.
    Decode(base64::DecodeError),
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Upstream(err) => write!(f, "{err}"),
            Self::Decode(err) => write!(f, "Failed to base64-decode panel image: {err}"),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Upstream(err) => Some(err),
            Self::Decode(err) => Some(err),
        }
    }
}

impl From<UpstreamError> for RenderError {
    fn from(err: UpstreamError) -> Self {
        RenderError::Upstream(err)
    }
}

impl From<base64::DecodeError> for RenderError {
    fn from(err: base64::DecodeError) -> Self {
        RenderError::Decode(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_error_kind() {
        assert_eq!(
            MangaError::Configuration("missing".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            MangaError::PanelNotFound(7).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            MangaError::Generation(GenerationError::PanelCount(3)).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            MangaError::Upstream(UpstreamError::EmptyResponse).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn messages_pass_through() {
        let err = MangaError::Configuration("Gemini API key is not configured".to_string());
        assert_eq!(err.to_string(), "Gemini API key is not configured");
        assert_eq!(MangaError::PanelNotFound(7).to_string(), "Panel not found");
        let err = MangaError::from(GenerationError::PanelCount(3));
        assert_eq!(
            err.to_string(),
            "Manga script must contain exactly 4 panels, got 3"
        );
    }
}
