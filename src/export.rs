//! Static landing page export.

use std::path::Path;

use askama::Template;
use chrono::{Datelike, Utc};

use crate::constants::DEFAULT_EXPORT_NAME;
use crate::error::MangaError;
use crate::model::Comic;

/// A self-contained landing page for a finished comic.
#[derive(Template)]
#[template(path = "landing_page.html")]
pub struct LandingPage<'a> {
    comic: &'a Comic,
    product_name: &'a str,
    product_description: &'a str,
    year: i32,
}

impl<'a> LandingPage<'a> {
    /// Prepares the page, stamped with the current year.
    pub fn new(comic: &'a Comic, product_name: &'a str, product_description: &'a str) -> Self {
        Self {
            comic,
            product_name,
            product_description,
            year: Utc::now().year(),
        }
    }

    /// Hero copy: the product description, or the call-to-action when there is none.
    fn hero_description(&self) -> &str {
        let description = self.product_description.trim();
        if description.is_empty() {
            &self.comic.cta_text
        } else {
            description
        }
    }

    /// Name used for the downloaded file.
    pub fn file_name(&self) -> String {
        format!("{}.html", export_stem(self.product_name))
    }

    /// `Content-Disposition` value for downloading the page.
    pub fn content_disposition(&self) -> String {
        let stem = ascii_stem(self.product_name);
        let fallback = if stem.is_empty() {
            DEFAULT_EXPORT_NAME.to_string()
        } else {
            stem
        };
        let encoded: String = url::form_urlencoded::byte_serialize(self.file_name().as_bytes())
            .collect::<String>()
            .replace('+', "%20")
            .replace('*', "%2A");
        format!("attachment; filename=\"{fallback}.html\"; filename*=UTF-8''{encoded}")
    }

    /// Writes the rendered page to `path`.
    pub fn write_to(&self, path: &Path) -> Result<(), MangaError> {
        let html = self.render()?;
        std::fs::write(path, html)?;
        Ok(())
    }
}

/// Product name with path-hostile characters removed.
fn export_stem(product_name: &str) -> String {
    let stem: String = product_name
        .trim()
        .chars()
        .filter(|c| !c.is_control() && !matches!(c, '/' | '\\' | '"' | ':' | '*' | '?' | '<' | '>' | '|'))
        .collect();
    let stem = stem.trim().trim_matches('.').to_string();
    if stem.is_empty() {
        DEFAULT_EXPORT_NAME.to_string()
    } else {
        stem
    }
}

/// ASCII-only stem for clients that ignore `filename*`.
fn ascii_stem(product_name: &str) -> String {
    let mut stem = String::new();
    for c in product_name.trim().chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
            stem.push(c);
        } else if !stem.ends_with('-') {
            stem.push('-');
        }
    }
    stem.trim_matches(|c| c == '-' || c == '.').to_string()
}
