//! CLI parser
use clap::{Args, Parser};
use std::num::{NonZeroU16, NonZeroUsize};

use crate::constants::{DEFAULT_API_BASE, DEFAULT_IMAGE_MODEL, DEFAULT_TEXT_MODEL};

#[derive(Parser, Debug)]
/// CLI Options
pub struct CliOptions {
    #[clap(long, help = "Enable debug logging", env = "MANGALP_DEBUG")]
    /// Enable debug logging. Env: MANGALP_DEBUG
    pub debug: bool,
    #[clap(long, short, default_value = "9000", env = "MANGALP_PORT")]
    /// http listener, defaults to `9000`.
    /// Env: MANGALP_PORT
    pub port: NonZeroU16,
    #[clap(
        long,
        short,
        default_value = "127.0.0.1",
        env = "MANGALP_LISTEN_ADDRESS"
    )]
    /// Listen address, defaults to `127.0.0.1`.
    /// Env: MANGALP_LISTEN_ADDRESS
    pub listen_address: String,

    #[clap(long, default_value = "30", env = "MANGALP_SESSION_IDLE_MINUTES")]
    /// Minutes without a request before a session and its comic are dropped.
    /// Env: MANGALP_SESSION_IDLE_MINUTES
    pub session_idle_minutes: NonZeroU16,

    #[clap(long, default_value = "256", env = "MANGALP_MAX_SESSIONS")]
    /// Live sessions kept in memory before the oldest is evicted.
    /// Env: MANGALP_MAX_SESSIONS
    pub max_sessions: NonZeroUsize,

    #[command(flatten)]
    /// Model and credential settings
    pub generator: GeneratorOptions,
}

/// Settings shared by the server and the command-line generator.
#[derive(Args, Debug, Clone)]
pub struct GeneratorOptions {
    #[clap(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    /// Gemini API key used for the script, and for images unless
    /// `--image-api-key` is set. Env: GEMINI_API_KEY
    pub gemini_api_key: Option<String>,

    #[clap(long, env = "NANO_BANANA_API_KEY", hide_env_values = true)]
    /// Separate API key for image generation. Env: NANO_BANANA_API_KEY
    pub image_api_key: Option<String>,

    #[clap(long, default_value = DEFAULT_API_BASE, env = "MANGALP_API_BASE")]
    /// Gemini API base URL. Env: MANGALP_API_BASE
    pub api_base: String,

    #[clap(long, default_value = DEFAULT_TEXT_MODEL, env = "MANGALP_TEXT_MODEL")]
    /// Model that writes the script. Env: MANGALP_TEXT_MODEL
    pub text_model: String,

    #[clap(long, default_value = DEFAULT_IMAGE_MODEL, env = "MANGALP_IMAGE_MODEL")]
    /// Model that draws the panels. Env: MANGALP_IMAGE_MODEL
    pub image_model: String,

    #[clap(long, default_value = "2000", env = "MANGALP_PANEL_DELAY_MS")]
    /// Pause between panel image requests in milliseconds. Env: MANGALP_PANEL_DELAY_MS
    pub panel_delay_ms: u64,

    #[clap(long, default_value = "120", env = "MANGALP_REQUEST_TIMEOUT_SECS")]
    /// Timeout for each Gemini request in seconds. Env: MANGALP_REQUEST_TIMEOUT_SECS
    pub request_timeout_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_applied() {
        let options = CliOptions::try_parse_from(["mangalp", "--gemini-api-key", "abc"])
            .expect("parse options");
        assert_eq!(options.port.get(), 9000);
        assert_eq!(options.generator.text_model, DEFAULT_TEXT_MODEL);
        assert_eq!(options.generator.panel_delay_ms, 2000);
        assert_eq!(options.generator.gemini_api_key.as_deref(), Some("abc"));
        assert_eq!(options.session_idle_minutes.get(), 30);
        assert_eq!(options.max_sessions.get(), 256);
    }
}
