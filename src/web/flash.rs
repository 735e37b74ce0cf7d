use std::fmt;

use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::error::MangaError;

const FLASH_KEY: &str = "flash";

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub(crate) enum FlashClass {
    Success,
    Warning,
    Error,
}

impl fmt::Display for FlashClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FlashClass::Success => "success",
            FlashClass::Warning => "warning",
            FlashClass::Error => "error",
        })
    }
}

/// One-shot message shown on the next page render.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub(crate) struct FlashMessage {
    pub(crate) text: String,
    pub(crate) class: FlashClass,
}

impl FlashMessage {
    pub(crate) fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            class: FlashClass::Success,
        }
    }

    pub(crate) fn warning(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            class: FlashClass::Warning,
        }
    }

    pub(crate) fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            class: FlashClass::Error,
        }
    }
}

pub(crate) async fn set_flash(session: &Session, message: FlashMessage) -> Result<(), MangaError> {
    session.insert(FLASH_KEY, message).await?;
    Ok(())
}

pub(crate) async fn take_flash_message(
    session: &Session,
) -> Result<Option<FlashMessage>, MangaError> {
    Ok(session.remove::<FlashMessage>(FLASH_KEY).await?)
}
