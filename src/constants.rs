//! Shared constants/setters for things
//!

use std::time::Duration;

/// Default Gemini API base URL.
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model used to write the script.
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.0-flash";

/// Default model used to draw the panels.
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.0-flash-exp-image-generation";

/// Spacing between image requests when rendering a whole comic.
pub const DEFAULT_PANEL_SPACING: Duration = Duration::from_secs(2);

/// Warning returned when panels come back without images because no key is set.
pub const IMAGE_KEY_WARNING: &str = "API key not configured. Images not generated.";

/// File name used for exports when the product name gives us nothing to work with.
pub const DEFAULT_EXPORT_NAME: &str = "manga-lp";

/// Length of CSRF session tokens
pub const CSRF_TOKEN_LENGTH: usize = 32;

/// How often expired sessions are swept out of the session store.
pub const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(60);
