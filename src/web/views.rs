//! Browser flow: brief form, comic preview, regeneration and downloads.

use axum::extract::rejection::FormRejection;
use axum::response::Html;

use super::csrf::{csrf_token, validate_csrf};
use super::prelude::*;
use super::session::{SessionComic, last_input, load_comic, store_comic, store_input};
use crate::constants::IMAGE_KEY_WARNING;
use crate::export::LandingPage;
use crate::model::Tone;

pub(crate) struct ToneOption {
    pub(crate) value: &'static str,
    pub(crate) label: &'static str,
    pub(crate) hint: &'static str,
    pub(crate) checked: bool,
}

fn tone_options(selected: Tone) -> Vec<ToneOption> {
    Tone::ALL
        .iter()
        .map(|&tone| ToneOption {
            value: tone.as_str(),
            label: tone.label(),
            hint: tone.hint(),
            checked: tone == selected,
        })
        .collect()
}

#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
pub(crate) struct IndexTemplate {
    pub(crate) input: MangaInput,
    pub(crate) tones: Vec<ToneOption>,
    pub(crate) csrf_token: String,
    pub(crate) flash: Option<FlashMessage>,
    pub(crate) scripts_enabled: bool,
    pub(crate) images_enabled: bool,
}

#[derive(Template, WebTemplate)]
#[template(path = "comic.html")]
pub(crate) struct ComicTemplate {
    pub(crate) comic: Comic,
    pub(crate) product_name: String,
    pub(crate) csrf_token: String,
    pub(crate) flash: Option<FlashMessage>,
    pub(crate) images_enabled: bool,
}

/// handles the / GET
pub(crate) async fn index_handler(
    State(state): State<AppState>,
    session: Session,
) -> Result<IndexTemplate, MangaError> {
    let input = last_input(&session).await?;
    Ok(IndexTemplate {
        tones: tone_options(input.tone),
        input,
        csrf_token: csrf_token(&session).await?,
        flash: take_flash_message(&session).await?,
        scripts_enabled: state.scripts.is_configured(),
        images_enabled: state.images_enabled(),
    })
}

#[derive(Debug, Deserialize)]
pub(crate) struct GenerateForm {
    csrf_token: String,
    product_name: String,
    product_description: String,
    target_audience: String,
    problem: String,
    solution: String,
    #[serde(default)]
    tone: Tone,
    #[serde(default)]
    character_style: String,
}

impl GenerateForm {
    fn into_input(self) -> MangaInput {
        MangaInput {
            product_name: self.product_name,
            product_description: self.product_description,
            target_audience: self.target_audience,
            problem: self.problem,
            solution: self.solution,
            tone: self.tone,
            character_style: self.character_style,
        }
    }
}

/// handles the /generate POST: writes the script, draws every panel, then shows the comic
pub(crate) async fn generate_handler(
    State(state): State<AppState>,
    session: Session,
    form: Result<Form<GenerateForm>, FormRejection>,
) -> Result<Redirect, MangaError> {
    let Form(form) = form?;
    validate_csrf(&session, &form.csrf_token).await?;
    let input = form.into_input();
    store_input(&session, &input).await?;

    if let Err(err) = input.validate() {
        set_flash(&session, FlashMessage::warning(err.to_string())).await?;
        return Ok(Redirect::to("/"));
    }

    let mut comic = match state.scripts.generate(&input).await {
        Ok(comic) => comic,
        Err(err) => {
            error!("Error generating prompts: {err}");
            set_flash(&session, FlashMessage::error(err.to_string())).await?;
            return Ok(Redirect::to("/"));
        }
    };

    if state.images_enabled() {
        let panels = std::mem::take(&mut comic.panels);
        comic = comic.with_panels(state.panels.render_all(panels).await);
        let missing = comic
            .panels
            .iter()
            .filter(|panel| panel.image_url.is_none())
            .count();
        if missing > 0 {
            set_flash(
                &session,
                FlashMessage::warning(format!(
                    "{missing} panel(s) came back without an image. Try regenerating them."
                )),
            )
            .await?;
        } else {
            set_flash(&session, FlashMessage::success("Your manga is ready!")).await?;
        }
    } else {
        warn!("Image API key not set, showing panels without images");
        set_flash(&session, FlashMessage::warning(IMAGE_KEY_WARNING)).await?;
    }

    store_comic(
        &session,
        &SessionComic {
            comic,
            product_name: input.product_name,
            product_description: input.product_description,
        },
    )
    .await?;
    Ok(Redirect::to("/comic"))
}

/// handles the /comic GET
pub(crate) async fn comic_handler(
    State(state): State<AppState>,
    session: Session,
) -> Result<Response, MangaError> {
    let Some(saved) = load_comic(&session).await? else {
        return Ok(Redirect::to("/").into_response());
    };
    Ok(ComicTemplate {
        comic: saved.comic,
        product_name: saved.product_name,
        csrf_token: csrf_token(&session).await?,
        flash: take_flash_message(&session).await?,
        images_enabled: state.images_enabled(),
    }
    .into_response())
}

#[derive(Debug, Deserialize)]
pub(crate) struct CsrfForm {
    csrf_token: String,
}

/// handles the /comic/panels/{number}/regenerate POST
pub(crate) async fn regenerate_handler(
    State(state): State<AppState>,
    session: Session,
    Path(number): Path<u32>,
    form: Result<Form<CsrfForm>, FormRejection>,
) -> Result<Redirect, MangaError> {
    let Form(form) = form?;
    validate_csrf(&session, &form.csrf_token).await?;
    let Some(mut saved) = load_comic(&session).await? else {
        return Ok(Redirect::to("/"));
    };

    if !state.images_enabled() {
        set_flash(&session, FlashMessage::warning(IMAGE_KEY_WARNING)).await?;
        return Ok(Redirect::to("/comic"));
    }

    let previous = saved
        .comic
        .panels
        .iter()
        .find(|panel| u32::from(panel.panel_number.get()) == number)
        .and_then(|panel| panel.image_url.clone());

    match state
        .panels
        .regenerate(saved.comic.panels.clone(), number)
        .await
    {
        Ok(panels) => {
            let unchanged = panels
                .iter()
                .find(|panel| u32::from(panel.panel_number.get()) == number)
                .is_some_and(|panel| panel.image_url == previous);
            saved.comic.panels = panels;
            store_comic(&session, &saved).await?;
            let message = if unchanged {
                FlashMessage::warning(format!(
                    "Panel {number} could not be redrawn, the previous image was kept."
                ))
            } else {
                FlashMessage::success(format!("Panel {number} redrawn."))
            };
            set_flash(&session, message).await?;
        }
        Err(err) => {
            warn!("Regenerating panel {number} failed: {err}");
            set_flash(&session, FlashMessage::error(err.to_string())).await?;
        }
    }
    Ok(Redirect::to("/comic"))
}

/// handles the /comic/export GET
pub(crate) async fn export_download_handler(session: Session) -> Result<Response, MangaError> {
    let Some(saved) = load_comic(&session).await? else {
        return Ok(Redirect::to("/").into_response());
    };
    let page = LandingPage::new(
        &saved.comic,
        &saved.product_name,
        &saved.product_description,
    );
    super::download(&page)
}

/// handles the /comic/landing-page GET
pub(crate) async fn landing_page_handler(session: Session) -> Result<Response, MangaError> {
    let Some(saved) = load_comic(&session).await? else {
        return Ok(Redirect::to("/").into_response());
    };
    let html = LandingPage::new(
        &saved.comic,
        &saved.product_name,
        &saved.product_description,
    )
    .render()?;
    Ok(Html(html).into_response())
}
