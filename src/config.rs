//! Config handling

use std::time::Duration;

use tracing::log::LevelFilter;
use tracing::{info, warn};
use url::Url;

use crate::cli::GeneratorOptions;
use crate::error::MangaError;
use crate::gemini::GeminiClient;
use crate::orchestrator::{PanelOrchestrator, PanelPacing};
use crate::render::GeminiRenderer;
use crate::script::ScriptGenerator;

/// Sets up logging based on the debug flag
pub fn setup_logging(debug: bool) -> Result<(), Box<std::io::Error>> {
    let level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut logger = simple_logger::SimpleLogger::new().with_level(level);
    if !debug {
        logger = logger
            .with_module_level("tracing", LevelFilter::Warn)
            .with_module_level("rustls", LevelFilter::Info)
            .with_module_level("hyper_util", LevelFilter::Info)
            .with_module_level("reqwest", LevelFilter::Info)
            .with_module_level("h2", LevelFilter::Info);
    }
    logger.init().map_err(|err| {
        eprintln!("Failed to initialize logger: {}", err);
        Box::new(std::io::Error::other(err))
    })
}

/// Resolved settings for the generation pipeline.
#[derive(Clone, Debug)]
pub struct GeneratorConfig {
    /// Gemini API base URL
    pub api_base: Url,
    /// Key for the text model
    pub text_api_key: Option<String>,
    /// Key for the image model
    pub image_api_key: Option<String>,
    /// Script model name
    pub text_model: String,
    /// Image model name
    pub image_model: String,
    /// Spacing between panel image requests
    pub pacing: PanelPacing,
    /// Per-request timeout
    pub request_timeout: Duration,
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

impl GeneratorConfig {
    /// Resolves command-line options. The image key falls back to the Gemini key.
    pub fn from_options(options: &GeneratorOptions) -> Result<Self, MangaError> {
        let api_base = Url::parse(&options.api_base).map_err(|err| {
            MangaError::Configuration(format!("Invalid API base URL {}: {err}", options.api_base))
        })?;
        let text_api_key = non_empty(options.gemini_api_key.as_ref());
        let image_api_key =
            non_empty(options.image_api_key.as_ref()).or_else(|| text_api_key.clone());

        if text_api_key.is_none() {
            warn!("GEMINI_API_KEY is not set, script generation will fail");
        }
        if image_api_key.is_none() {
            warn!("No image API key set, panels will be returned without images");
        }

        Ok(Self {
            api_base,
            text_api_key,
            image_api_key,
            text_model: options.text_model.clone(),
            image_model: options.image_model.clone(),
            pacing: PanelPacing::new(Duration::from_millis(options.panel_delay_ms)),
            request_timeout: Duration::from_secs(options.request_timeout_secs),
        })
    }

    /// Builds the script generator and panel orchestrator around one shared client.
    pub fn build(
        &self,
    ) -> Result<(ScriptGenerator, PanelOrchestrator<GeminiRenderer>), MangaError> {
        let client = GeminiClient::new(&self.api_base, self.request_timeout)?;
        info!(
            "Using {} for scripts and {} for panels via {}",
            self.text_model, self.image_model, self.api_base
        );
        let scripts =
            ScriptGenerator::new(client.clone(), self.text_api_key.clone(), &self.text_model);
        let renderer = GeminiRenderer::new(client, self.image_api_key.clone(), &self.image_model);
        Ok((scripts, PanelOrchestrator::new(renderer, self.pacing)))
    }
}
