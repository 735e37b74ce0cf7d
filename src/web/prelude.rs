pub(crate) use crate::error::MangaError;
pub(crate) use crate::model::{Comic, MangaInput};
pub(crate) use crate::web::AppState;
pub(crate) use crate::web::flash::{FlashMessage, set_flash, take_flash_message};
pub(crate) use askama::Template;
pub(crate) use askama_web::WebTemplate;
pub(crate) use axum::extract::{Form, Path, State};
pub(crate) use axum::response::{IntoResponse, Redirect, Response};
pub(crate) use serde::{Deserialize, Serialize};
pub(crate) use tower_sessions::Session;
pub(crate) use tracing::{error, info, warn};
