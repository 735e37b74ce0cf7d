//! Script generation: marketing brief in, four-panel comic script out.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{GenerationError, MangaError, UpstreamError};
use crate::gemini::{GeminiClient, log_preview};
use crate::model::{Comic, MangaInput, PANEL_COUNT, Panel, PanelNumber};

/// Matches a markdown code fence, optionally tagged `json`.
static CODE_FENCE: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"```(?:json)?\s*([\s\S]*?)```"));

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScriptPayload {
    title: String,
    panels: Vec<PanelPayload>,
    cta_text: String,
}

// panelNumber is ignored, positions are reassigned on parse.
#[derive(Debug, Deserialize)]
struct PanelPayload {
    description: String,
    #[serde(default)]
    dialogue: String,
    prompt: String,
}

/// Builds the instruction sent to the text model.
pub fn build_script_prompt(input: &MangaInput) -> String {
    let character_line = input
        .character_style()
        .map(|style| format!("- Character style: {style}\n"))
        .unwrap_or_default();

    format!(
        r#"You are a scenario writer for four-panel (4koma) manga. Using the product information below, write the script for a 4koma manga to be used on a landing page.

## Product information
- Product name: {product_name}
- Description: {product_description}
- Target customers: {target_audience}
- Customer problem: {problem}
- Solution / benefit: {solution}
- Tone: {mood}
{character_line}
## Structure
Follow the classic four-beat flow:
1. Setup: show the customer's problem or frustrating situation
2. Escalation: the problem gets worse, or the customer learns about a solution
3. Turn: the situation changes thanks to the product
4. Resolution: a happy ending where the benefit is felt

## Output format
Output JSON in exactly this shape (output nothing but JSON):

{{
  "title": "Title of the manga",
  "panels": [
    {{
      "panelNumber": 1,
      "description": "What happens in this panel (detailed enough to draw from)",
      "dialogue": "The character's line",
      "prompt": "English image prompt (4koma manga style, panel 1, characters, background, action and facial expression in detail)"
    }},
    {{"panelNumber": 2, "description": "...", "dialogue": "...", "prompt": "..."}},
    {{"panelNumber": 3, "description": "...", "dialogue": "...", "prompt": "..."}},
    {{"panelNumber": 4, "description": "...", "dialogue": "...", "prompt": "..."}}
  ],
  "ctaText": "A catchphrase that prompts action (eg: Solve it today with ...!)"
}}

## Prompt tips
- Write every prompt in English
- Always include "4koma manga style"
- Keep the characters consistent by repeating the same features in every panel
- State facial expressions clearly (happy, sad, surprised, frustrated, ...)
- Describe the background and situation concretely

Output only the JSON."#,
        product_name = input.product_name,
        product_description = input.product_description,
        target_audience = input.target_audience,
        problem = input.problem,
        solution = input.solution,
        mood = input.tone.mood(),
    )
}

/// Returns the contents of the first code fence, or the whole trimmed text
/// when there isn't one.
pub fn strip_code_fence(text: &str) -> Result<&str, GenerationError> {
    let fence = CODE_FENCE
        .as_ref()
        .map_err(|err| GenerationError::Pattern(err.clone()))?;
    let inner = fence
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map(|found| found.as_str())
        .unwrap_or(text);
    Ok(inner.trim())
}

/// Parses the model's reply into a comic, renumbering panels by position.
pub fn parse_script(text: &str) -> Result<Comic, GenerationError> {
    let payload: ScriptPayload = serde_json::from_str(strip_code_fence(text)?)?;
    if payload.panels.len() != PANEL_COUNT {
        return Err(GenerationError::PanelCount(payload.panels.len()));
    }

    let panels = payload
        .panels
        .into_iter()
        .zip(PanelNumber::ALL)
        .map(|(panel, panel_number)| Panel {
            panel_number,
            description: panel.description,
            dialogue: panel.dialogue,
            prompt: panel.prompt,
            image_url: None,
        })
        .collect();

    Ok(Comic {
        title: payload.title,
        panels,
        cta_text: payload.cta_text,
        cta_url: None,
    })
}

/// Writes comic scripts with a text model.
#[derive(Clone, Debug)]
pub struct ScriptGenerator {
    client: GeminiClient,
    api_key: Option<String>,
    model: String,
}

impl ScriptGenerator {
    /// A generator without an API key fails every call with a configuration error.
    pub fn new(client: GeminiClient, api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            client,
            api_key,
            model: model.into(),
        }
    }

    /// Whether a text model credential is available.
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generates the comic script for a brief. Images are left empty.
    pub async fn generate(&self, input: &MangaInput) -> Result<Comic, MangaError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(MangaError::Configuration(
                "Gemini API key is not configured".to_string(),
            ));
        };

        let prompt = build_script_prompt(input);
        debug!(
            "Requesting script from {}: {}",
            self.model,
            log_preview(&prompt, 100)
        );
        let response = self
            .client
            .generate_content(api_key, &self.model, &prompt, None)
            .await?;
        let text = response.text().ok_or(UpstreamError::EmptyResponse)?;

        let comic = parse_script(&text)?;
        info!(
            "Generated script \"{}\" for {}",
            comic.title, input.product_name
        );
        Ok(comic)
    }
}
