//! JSON endpoints used by scripted clients.

use axum::Json;
use axum::extract::rejection::JsonRejection;

use super::prelude::*;
use crate::constants::IMAGE_KEY_WARNING;
use crate::export::LandingPage;
use crate::model::{Panel, validate_panels};

#[derive(Debug, Serialize)]
pub(crate) struct GeneratePromptsResponse {
    success: bool,
    manga: Comic,
}

/// handles POST /api/generate-prompts
pub(crate) async fn generate_prompts_handler(
    State(state): State<AppState>,
    payload: Result<Json<MangaInput>, JsonRejection>,
) -> Result<Json<GeneratePromptsResponse>, MangaError> {
    let Json(input) = payload?;
    input.validate()?;
    info!("Generating manga script for {}", input.product_name);
    let manga = state.scripts.generate(&input).await?;
    Ok(Json(GeneratePromptsResponse {
        success: true,
        manga,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateMangaRequest {
    panels: Vec<Panel>,
    #[serde(default)]
    regenerate_panel_number: Option<u32>,
}

#[derive(Debug, Serialize)]
pub(crate) struct GenerateMangaResponse {
    success: bool,
    panels: Vec<Panel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<&'static str>,
}

/// handles POST /api/generate-manga
pub(crate) async fn generate_manga_handler(
    State(state): State<AppState>,
    payload: Result<Json<GenerateMangaRequest>, JsonRejection>,
) -> Result<Json<GenerateMangaResponse>, MangaError> {
    let Json(request) = payload?;
    validate_panels(&request.panels)?;

    if !state.images_enabled() {
        warn!("Image API key not set, returning panels without images");
        return Ok(Json(GenerateMangaResponse {
            success: true,
            panels: request.panels,
            warning: Some(IMAGE_KEY_WARNING),
        }));
    }

    let panels = state
        .panels
        .generate(request.panels, request.regenerate_panel_number)
        .await?;
    Ok(Json(GenerateMangaResponse {
        success: true,
        panels,
        warning: None,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ExportRequest {
    manga: Comic,
    product_name: String,
    #[serde(default)]
    product_description: String,
}

/// handles POST /api/export
pub(crate) async fn export_handler(
    payload: Result<Json<ExportRequest>, JsonRejection>,
) -> Result<Response, MangaError> {
    let Json(request) = payload?;
    validate_panels(&request.manga.panels)?;
    let page = LandingPage::new(
        &request.manga,
        &request.product_name,
        &request.product_description,
    );
    super::download(&page)
}
