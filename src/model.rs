//! Comic data model shared by the generators, the orchestrator and the web layer.
//!
//! Field names on the wire are camelCase so browser clients can post the
//! same records they receive.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::MangaError;

/// Number of panels in every comic.
pub const PANEL_COUNT: usize = 4;

/// Mood of the generated comic.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    /// Light-hearted, with gags.
    #[default]
    Comedy,
    /// Raises the problem earnestly.
    Serious,
    /// Gentle and warm.
    Heartwarming,
    /// Passionate and high-energy.
    Exciting,
}

impl Tone {
    /// Every tone, in form order.
    pub const ALL: [Tone; 4] = [
        Tone::Comedy,
        Tone::Serious,
        Tone::Heartwarming,
        Tone::Exciting,
    ];

    /// Wire/form value.
    pub fn as_str(self) -> &'static str {
        match self {
            Tone::Comedy => "comedy",
            Tone::Serious => "serious",
            Tone::Heartwarming => "heartwarming",
            Tone::Exciting => "exciting",
        }
    }

    /// Mood description handed to the script model.
    pub fn mood(self) -> &'static str {
        match self {
            Tone::Comedy => "a comedic, fun atmosphere with plenty of laughs",
            Tone::Serious => "a serious atmosphere that raises the problem earnestly",
            Tone::Heartwarming => "a gentle, heartwarming atmosphere",
            Tone::Exciting => "a fiery, passionate atmosphere",
        }
    }

    /// Label shown on the input form.
    pub fn label(self) -> &'static str {
        match self {
            Tone::Comedy => "Comedy",
            Tone::Serious => "Serious",
            Tone::Heartwarming => "Heartwarming",
            Tone::Exciting => "Exciting",
        }
    }

    /// One-line explanation shown under the label.
    pub fn hint(self) -> &'static str {
        match self {
            Tone::Comedy => "Keep it fun with a few laughs",
            Tone::Serious => "Make the problem hit home",
            Tone::Heartwarming => "Warm and friendly",
            Tone::Exciting => "Pitch it with passion",
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Marketing brief submitted by the user.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MangaInput {
    /// Product or service name
    pub product_name: String,
    /// What the product does
    pub product_description: String,
    /// Who the landing page is for
    pub target_audience: String,
    /// The customer's problem
    pub problem: String,
    /// How the product solves it
    pub solution: String,
    /// Mood of the comic
    #[serde(default)]
    pub tone: Tone,
    /// Free-text hint for the characters, blank when not given
    #[serde(default)]
    pub character_style: String,
}

impl MangaInput {
    /// The character style hint, if one was given.
    pub fn character_style(&self) -> Option<&str> {
        let style = self.character_style.trim();
        (!style.is_empty()).then_some(style)
    }

    /// Checks that every required field was filled in.
    pub fn validate(&self) -> Result<(), MangaError> {
        let required = [
            ("Product name", &self.product_name),
            ("Product description", &self.product_description),
            ("Target audience", &self.target_audience),
            ("Problem", &self.problem),
            ("Solution", &self.solution),
        ];
        for (label, value) in required {
            if value.trim().is_empty() {
                return Err(MangaError::BadRequest(format!("{label} is required")));
            }
        }
        Ok(())
    }
}

/// Returned when a panel number outside 1..=4 is constructed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InvalidPanelNumber(pub u8);

impl fmt::Display for InvalidPanelNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "panel number must be between 1 and 4, got {}", self.0)
    }
}

impl std::error::Error for InvalidPanelNumber {}

/// Position of a panel in the comic, always 1 to 4.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct PanelNumber(u8);

impl PanelNumber {
    /// The four panels in reading order.
    pub const ALL: [PanelNumber; PANEL_COUNT] =
        [PanelNumber(1), PanelNumber(2), PanelNumber(3), PanelNumber(4)];

    /// Returns the panel number, or `None` outside 1..=4.
    pub fn new(number: u8) -> Option<Self> {
        (1..=PANEL_COUNT as u8)
            .contains(&number)
            .then_some(Self(number))
    }

    /// The raw number.
    pub fn get(self) -> u8 {
        self.0
    }

    /// Zero-based position in the panel sequence.
    pub fn index(self) -> usize {
        usize::from(self.0 - 1)
    }

    /// Kanji naming the beat of the four-panel structure.
    pub fn beat_kanji(self) -> &'static str {
        ["起", "承", "転", "結"][self.index()]
    }

    /// English name of the beat.
    pub fn beat_name(self) -> &'static str {
        ["Setup", "Escalation", "Turn", "Resolution"][self.index()]
    }

    /// Section heading used on the landing page.
    pub fn beat_heading(self) -> &'static str {
        [
            "Sound familiar?",
            "It keeps getting worse...",
            "And then!",
            "Solved!",
        ][self.index()]
    }
}

impl TryFrom<u8> for PanelNumber {
    type Error = InvalidPanelNumber;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(InvalidPanelNumber(value))
    }
}

impl From<PanelNumber> for u8 {
    fn from(value: PanelNumber) -> Self {
        value.0
    }
}

impl fmt::Display for PanelNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One panel of the comic.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Panel {
    /// Position in the comic
    pub panel_number: PanelNumber,
    /// What happens in the scene
    pub description: String,
    /// The character's line
    pub dialogue: String,
    /// Image-generation prompt, reused verbatim on every regeneration
    pub prompt: String,
    /// `data:` URI of the rendered illustration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// A generated four-panel comic.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Comic {
    /// Title of the comic
    pub title: String,
    /// The panels, numbered 1 to 4 in order
    pub panels: Vec<Panel>,
    /// Call-to-action line
    pub cta_text: String,
    /// Where the call-to-action links to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cta_url: Option<String>,
}

impl Comic {
    /// Replaces the panel sequence with one handed back by the orchestrator.
    #[must_use]
    pub fn with_panels(mut self, panels: Vec<Panel>) -> Self {
        self.panels = panels;
        self
    }

    /// Link target for the call-to-action buttons. Only absolute `http` and
    /// `https` URLs are linked, anything else becomes `#`.
    pub fn cta_href(&self) -> &str {
        self.cta_url
            .as_deref()
            .map(str::trim)
            .filter(|url| {
                Url::parse(url).is_ok_and(|parsed| matches!(parsed.scheme(), "http" | "https"))
            })
            .unwrap_or("#")
    }
}

/// Checks that `panels` is exactly panels 1 to 4, each once, in order.
pub fn validate_panels(panels: &[Panel]) -> Result<(), MangaError> {
    let in_order = panels.len() == PANEL_COUNT
        && panels
            .iter()
            .zip(PanelNumber::ALL)
            .all(|(panel, expected)| panel.panel_number == expected);
    if in_order {
        return Ok(());
    }
    let numbers: Vec<String> = panels
        .iter()
        .map(|panel| panel.panel_number.to_string())
        .collect();
    Err(MangaError::BadRequest(format!(
        "Expected panels 1 to {PANEL_COUNT} in order, got [{}]",
        numbers.join(", ")
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panel_numbers_reject_out_of_range() {
        assert!(PanelNumber::new(0).is_none());
        assert!(PanelNumber::new(5).is_none());
        assert_eq!(PanelNumber::new(3).map(PanelNumber::get), Some(3));
        assert!(serde_json::from_str::<PanelNumber>("7").is_err());
        assert_eq!(
            serde_json::from_str::<PanelNumber>("4").ok(),
            PanelNumber::new(4)
        );
    }

    #[test]
    fn panel_uses_camel_case_and_skips_missing_image() {
        let panel = Panel {
            panel_number: PanelNumber::ALL[0],
            description: "An office".to_string(),
            dialogue: "Help!".to_string(),
            prompt: "4koma manga style, panel 1".to_string(),
            image_url: None,
        };
        let value = serde_json::to_value(&panel).expect("serialize panel");
        assert_eq!(value["panelNumber"], 1);
        assert!(value.get("imageUrl").is_none());
    }

    #[test]
    fn input_accepts_wire_names_and_defaults() {
        let input: MangaInput = serde_json::from_str(
            r#"{
                "productName": "SupportBot",
                "productDescription": "A 24/7 chatbot",
                "targetAudience": "Small businesses",
                "problem": "Too many tickets",
                "solution": "Automated answers",
                "tone": "heartwarming"
            }"#,
        )
        .expect("parse input");
        assert_eq!(input.tone, Tone::Heartwarming);
        assert_eq!(input.character_style(), None);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn validate_names_the_missing_field() {
        let input = MangaInput {
            product_name: "SupportBot".to_string(),
            ..Default::default()
        };
        let err = input.validate().expect_err("should fail");
        assert_eq!(err.to_string(), "Product description is required");
    }

    #[test]
    fn cta_href_defaults_to_anchor() {
        let comic = Comic {
            title: "t".to_string(),
            panels: Vec::new(),
            cta_text: "Try it".to_string(),
            cta_url: Some("  ".to_string()),
        };
        assert_eq!(comic.cta_href(), "#");
    }

    #[test]
    fn cta_href_only_links_web_urls() {
        let with_url = |url: &str| Comic {
            title: "t".to_string(),
            panels: Vec::new(),
            cta_text: "Try it".to_string(),
            cta_url: Some(url.to_string()),
        };
        assert_eq!(
            with_url(" https://example.com/signup ").cta_href(),
            "https://example.com/signup"
        );
        assert_eq!(with_url("http://example.com").cta_href(), "http://example.com");
        assert_eq!(with_url("javascript:alert(1)").cta_href(), "#");
        assert_eq!(with_url("JavaScript:alert(1)").cta_href(), "#");
        assert_eq!(with_url("data:text/html,hi").cta_href(), "#");
        assert_eq!(with_url("/signup").cta_href(), "#");
    }

    fn numbered(numbers: &[u8]) -> Vec<Panel> {
        numbers
            .iter()
            .map(|&number| Panel {
                panel_number: PanelNumber::new(number).expect("valid panel number"),
                description: String::new(),
                dialogue: String::new(),
                prompt: format!("prompt {number}"),
                image_url: None,
            })
            .collect()
    }

    #[test]
    fn panels_must_be_one_to_four_in_order() {
        assert!(validate_panels(&numbered(&[1, 2, 3, 4])).is_ok());
        for bad in [&[][..], &[1, 1, 1, 1][..], &[1, 2, 3][..], &[2, 1, 3, 4][..], &[1, 2, 3, 4, 4][..]] {
            let err = validate_panels(&numbered(bad)).expect_err("invalid sequence");
            assert!(matches!(err, MangaError::BadRequest(_)));
        }
        let err = validate_panels(&numbered(&[1, 1])).expect_err("duplicates");
        assert_eq!(err.to_string(), "Expected panels 1 to 4 in order, got [1, 1]");
    }
}
