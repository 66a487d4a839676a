#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Template rendering for `.docx` report documents.
//!
//! Templates carry keywords such as `{{comp1_sale_price}}` anywhere in the
//! body, headers or footers. [`Renderer`] replaces them with values from a
//! [`ReplacementMap`] while keeping the formatting of the run each keyword
//! was typed in, and swaps image keywords for inline pictures. Everything the
//! renderer does not touch is written back unchanged.

pub mod media;
pub mod package;
pub mod part;
pub mod replacements;
pub mod substitute;

use std::sync::LazyLock;

use comp_report_comp_models::ComparableRecord;
use regex::Regex;

pub use replacements::ReplacementMap;

use crate::media::MediaWriter;
use crate::package::Package;
use crate::part::Part;

/// The main document part; its absence means the input is not a docx.
pub const DOCUMENT_PART: &str = "word/document.xml";

/// Display width of inserted pictures unless configured otherwise.
pub const DEFAULT_IMAGE_WIDTH_INCHES: f64 = 4.0;

static HEADER_FOOTER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^word/(?:header|footer)\d*\.xml$").expect("valid regex"));

/// Errors that abort rendering.
#[derive(Debug, thiserror::Error)]
pub enum DocxError {
    /// The template is not a readable zip archive.
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// A part could not be parsed or written.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A required part is missing from the package.
    #[error("Missing part: {0}")]
    MissingPart(String),
}

/// Whether keywords in the package entry `name` are substituted.
#[must_use]
pub fn is_content_part(name: &str) -> bool {
    name == DOCUMENT_PART || HEADER_FOOTER_RE.is_match(name)
}

/// Substitutes keywords in docx templates.
#[derive(Debug, Clone)]
pub struct Renderer {
    image_width_inches: f64,
}

impl Default for Renderer {
    fn default() -> Self {
        Self {
            image_width_inches: DEFAULT_IMAGE_WIDTH_INCHES,
        }
    }
}

impl Renderer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the display width of inserted pictures.
    #[must_use]
    pub const fn with_image_width_inches(mut self, inches: f64) -> Self {
        self.image_width_inches = inches;
        self
    }

    /// Renders `template` with the comp keywords of `records`.
    ///
    /// # Errors
    ///
    /// Returns a [`DocxError`] if the template is not a readable docx.
    pub fn render(
        &self,
        template: &[u8],
        records: &[ComparableRecord],
    ) -> Result<Vec<u8>, DocxError> {
        self.render_map(template, &ReplacementMap::from_records(records))
    }

    /// Renders `template` with an arbitrary keyword map.
    ///
    /// A header, footer or document part that is not well-formed XML is
    /// logged and left as it is.
    ///
    /// # Errors
    ///
    /// Returns [`DocxError::Zip`] if the template is not a zip archive and
    /// [`DocxError::MissingPart`] if it has no main document part.
    pub fn render_map(&self, template: &[u8], map: &ReplacementMap) -> Result<Vec<u8>, DocxError> {
        let mut package = Package::read(template)?;
        if !package.contains(DOCUMENT_PART) {
            return Err(DocxError::MissingPart(DOCUMENT_PART.to_owned()));
        }

        let parts: Vec<String> = package
            .names()
            .filter(|name| is_content_part(name))
            .map(str::to_owned)
            .collect();
        let mut media = MediaWriter::new(self.image_width_inches);
        let mut replaced = 0;
        let mut pictures = 0;

        for name in parts {
            let Some(source) = package
                .get(&name)
                .map(|b| String::from_utf8_lossy(b).into_owned())
            else {
                continue;
            };
            let mut part = match Part::parse(source) {
                Ok(part) => part,
                Err(e) => {
                    log::error!("Leaving {name} untouched, failed to parse: {e}");
                    continue;
                }
            };

            let count = substitute::substitute_text(&mut part, map.text());
            let inserted =
                substitute::insert_images(&mut part, &name, map.images(), &mut package, &mut media);

            if part.is_modified() {
                package.set(&name, part.to_xml()?);
            }

            log::debug!("{name}: {count} keyword(s) replaced, {inserted} picture(s) inserted");
            replaced += count;
            pictures += inserted;
        }

        log::info!("Replaced {replaced} keyword occurrence(s) and inserted {pictures} picture(s)");

        package.write()
    }
}

/// Renders `template` with the comp keywords of `records` using the default
/// [`Renderer`].
///
/// # Errors
///
/// Returns a [`DocxError`] if the template is not a readable docx.
pub fn render(template: &[u8], records: &[ComparableRecord]) -> Result<Vec<u8>, DocxError> {
    Renderer::default().render(template, records)
}
