//! Sequences panel rendering across a comic.

use std::time::Duration;

use tracing::{info, warn};

use crate::constants::DEFAULT_PANEL_SPACING;
use crate::error::MangaError;
use crate::model::Panel;
use crate::render::{PanelRenderer, RenderOutcome};

/// Minimum spacing between consecutive renderer calls in a full pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PanelPacing {
    min_spacing: Duration,
}

impl PanelPacing {
    /// Waits `min_spacing` after each call before starting the next one.
    pub const fn new(min_spacing: Duration) -> Self {
        Self { min_spacing }
    }

    /// Back-to-back calls, for tests and local fakes.
    pub const fn none() -> Self {
        Self::new(Duration::ZERO)
    }

    /// The configured spacing.
    pub fn min_spacing(&self) -> Duration {
        self.min_spacing
    }

    async fn wait(&self) {
        if !self.min_spacing.is_zero() {
            tokio::time::sleep(self.min_spacing).await;
        }
    }
}

impl Default for PanelPacing {
    fn default() -> Self {
        Self::new(DEFAULT_PANEL_SPACING)
    }
}

/// Drives a [`PanelRenderer`] over a panel sequence, one call at a time.
#[derive(Clone, Debug)]
pub struct PanelOrchestrator<R> {
    renderer: R,
    pacing: PanelPacing,
}

impl<R: PanelRenderer + Sync> PanelOrchestrator<R> {
    /// Creates an orchestrator around `renderer`.
    pub fn new(renderer: R, pacing: PanelPacing) -> Self {
        Self { renderer, pacing }
    }

    /// The wrapped renderer.
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Regenerates panel `target` when given, otherwise renders every panel.
    pub async fn generate(
        &self,
        panels: Vec<Panel>,
        target: Option<u32>,
    ) -> Result<Vec<Panel>, MangaError> {
        match target {
            Some(number) => self.regenerate(panels, number).await,
            None => Ok(self.render_all(panels).await),
        }
    }

    /// Re-renders one panel from its stored prompt. A failed render keeps the
    /// previous image.
    pub async fn regenerate(
        &self,
        mut panels: Vec<Panel>,
        target: u32,
    ) -> Result<Vec<Panel>, MangaError> {
        let Some(panel) = panels
            .iter_mut()
            .find(|panel| u32::from(panel.panel_number.get()) == target)
        else {
            return Err(MangaError::PanelNotFound(target));
        };

        info!("Regenerating image for panel {target}");
        match self.renderer.render(&panel.prompt).await {
            RenderOutcome::Rendered(uri) => {
                info!("Panel {target}: image regenerated");
                panel.image_url = Some(uri);
            }
            RenderOutcome::Absent(reason) => {
                warn!("Panel {target}: no image generated ({reason}), keeping the previous one");
            }
        }
        Ok(panels)
    }

    /// Renders every panel in ascending panel order, one after another. Each
    /// panel's image is replaced by the outcome, absent when rendering failed.
    pub async fn render_all(&self, mut panels: Vec<Panel>) -> Vec<Panel> {
        let mut order: Vec<usize> = (0..panels.len()).collect();
        order.sort_by_key(|&position| panels[position].panel_number);

        for (step, position) in order.into_iter().enumerate() {
            if step > 0 {
                self.pacing.wait().await;
            }
            let panel = &mut panels[position];
            info!(
                "Generating image for panel {}: {}",
                panel.panel_number,
                crate::gemini::log_preview(&panel.prompt, 100)
            );
            panel.image_url = match self.renderer.render(&panel.prompt).await {
                RenderOutcome::Rendered(uri) => {
                    info!("Panel {}: image generated successfully", panel.panel_number);
                    Some(uri)
                }
                RenderOutcome::Absent(reason) => {
                    warn!("Panel {}: no image generated ({reason})", panel.panel_number);
                    None
                }
            };
        }
        panels
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use tokio::time::Instant;

    use super::*;
    use crate::model::PanelNumber;
    use crate::render::AbsentReason;

    #[derive(Debug)]
    struct Call {
        prompt: String,
        started: Instant,
        finished: Instant,
    }

    /// Hands out queued outcomes and records every call.
    #[derive(Debug, Default)]
    struct ScriptedRenderer {
        outcomes: Mutex<VecDeque<Option<&'static str>>>,
        calls: Mutex<Vec<Call>>,
        latency: Duration,
    }

    impl ScriptedRenderer {
        fn new(outcomes: &[Option<&'static str>], latency: Duration) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.iter().copied().collect()),
                calls: Mutex::new(Vec::new()),
                latency,
            }
        }

        fn prompts(&self) -> Vec<String> {
            self.calls
                .lock()
                .expect("calls lock")
                .iter()
                .map(|call| call.prompt.clone())
                .collect()
        }
    }

    impl PanelRenderer for ScriptedRenderer {
        async fn render(&self, prompt: &str) -> RenderOutcome {
            let started = Instant::now();
            tokio::time::sleep(self.latency).await;
            let next = self
                .outcomes
                .lock()
                .expect("outcomes lock")
                .pop_front()
                .flatten();
            self.calls.lock().expect("calls lock").push(Call {
                prompt: prompt.to_string(),
                started,
                finished: Instant::now(),
            });
            match next {
                Some(image) => RenderOutcome::Rendered(image.to_string()),
                None => RenderOutcome::Absent(AbsentReason::NoImageReturned),
            }
        }
    }

    fn panel(number: u8, image: Option<&str>) -> Panel {
        Panel {
            panel_number: PanelNumber::new(number).expect("valid panel number"),
            description: format!("scene {number}"),
            dialogue: format!("line {number}"),
            prompt: format!("prompt {number}"),
            image_url: image.map(str::to_string),
        }
    }

    fn images(panels: &[Panel]) -> Vec<Option<&str>> {
        panels.iter().map(|panel| panel.image_url.as_deref()).collect()
    }

    fn sample_panels() -> Vec<Panel> {
        vec![
            panel(1, Some("A")),
            panel(2, Some("B")),
            panel(3, None),
            panel(4, Some("D")),
        ]
    }

    #[tokio::test(start_paused = true)]
    async fn full_pass_is_sequential_and_paced() {
        let spacing = Duration::from_secs(2);
        let renderer = ScriptedRenderer::new(
            &[Some("one"), None, Some("three"), Some("four")],
            Duration::from_millis(500),
        );
        let orchestrator = PanelOrchestrator::new(renderer, PanelPacing::new(spacing));
        let panels = vec![panel(1, None), panel(2, Some("old")), panel(3, None), panel(4, None)];

        let result = orchestrator.render_all(panels).await;

        assert_eq!(
            images(&result),
            vec![Some("one"), None, Some("three"), Some("four")]
        );
        let calls = orchestrator.renderer().calls.lock().expect("calls lock");
        assert_eq!(calls.len(), 4);
        for pair in calls.windows(2) {
            assert!(pair[1].started >= pair[0].finished + spacing);
        }
    }

    #[tokio::test]
    async fn full_pass_follows_panel_order() {
        let renderer = ScriptedRenderer::new(&[Some("x"), Some("y")], Duration::ZERO);
        let orchestrator = PanelOrchestrator::new(renderer, PanelPacing::none());

        let result = orchestrator
            .render_all(vec![panel(2, None), panel(1, None)])
            .await;

        assert_eq!(orchestrator.renderer().prompts(), vec!["prompt 1", "prompt 2"]);
        assert_eq!(result[0].panel_number.get(), 2);
        assert_eq!(result[0].image_url.as_deref(), Some("y"));
        assert_eq!(result[1].image_url.as_deref(), Some("x"));
    }

    #[tokio::test]
    async fn regenerate_replaces_only_the_target() {
        let renderer = ScriptedRenderer::new(&[Some("new")], Duration::ZERO);
        let orchestrator = PanelOrchestrator::new(renderer, PanelPacing::none());
        let before = sample_panels();

        let result = orchestrator
            .generate(before.clone(), Some(3))
            .await
            .expect("regenerate panel 3");

        assert_eq!(images(&result), vec![Some("A"), Some("B"), Some("new"), Some("D")]);
        for index in [0, 1, 3] {
            assert_eq!(result[index], before[index]);
        }
        assert_eq!(orchestrator.renderer().prompts(), vec!["prompt 3"]);
    }

    #[tokio::test]
    async fn failed_regeneration_keeps_previous_image() {
        let renderer = ScriptedRenderer::new(&[None, None], Duration::ZERO);
        let orchestrator = PanelOrchestrator::new(renderer, PanelPacing::none());

        let result = orchestrator
            .regenerate(sample_panels(), 3)
            .await
            .expect("regenerate panel 3");
        assert_eq!(images(&result), vec![Some("A"), Some("B"), None, Some("D")]);

        let result = orchestrator
            .regenerate(sample_panels(), 2)
            .await
            .expect("regenerate panel 2");
        assert_eq!(result, sample_panels());
    }

    #[tokio::test]
    async fn unknown_target_is_not_found_without_rendering() {
        let renderer = ScriptedRenderer::new(&[Some("never")], Duration::ZERO);
        let orchestrator = PanelOrchestrator::new(renderer, PanelPacing::none());

        let err = orchestrator
            .generate(sample_panels(), Some(7))
            .await
            .expect_err("panel 7 doesn't exist");

        assert!(matches!(err, MangaError::PanelNotFound(7)));
        assert!(orchestrator.renderer().prompts().is_empty());
    }

    #[tokio::test]
    async fn missing_image_key_blanks_every_panel() {
        let base = url::Url::parse("http://127.0.0.1:9/").expect("url");
        let client = crate::gemini::GeminiClient::new(&base, Duration::from_secs(1))
            .expect("client");
        let renderer = crate::render::GeminiRenderer::new(client, None, "image-model");
        let orchestrator = PanelOrchestrator::new(renderer, PanelPacing::none());

        let result = orchestrator
            .generate(sample_panels(), None)
            .await
            .expect("full pass never fails");

        assert_eq!(result.len(), 4);
        assert!(result.iter().all(|panel| panel.image_url.is_none()));
    }
}
