#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Comparable-property extraction from land sale summary reports.
//!
//! Summary reports list each sold comp as a numbered section
//! (`3. Sold Land Property (Vacant)`) followed by labeled fields, a parties
//! table and usually a photo. There is no grammar to speak of, so extraction
//! is heuristic:
//!
//! 1. text is pulled page by page with [`pdf_extract`] and page furniture is
//!    stripped ([`normalize`]),
//! 2. the text is cut into one span per section heading ([`segment`]),
//! 3. every span runs through independent label-anchored field rules
//!    ([`fields`], [`parties`]),
//! 4. page images found with [`lopdf`] are attached to the record owning
//!    their page ([`images`]).
//!
//! A record that fails to parse is dropped and logged; it never aborts the
//! batch. The primary entry point is [`Extractor`], with [`extract`] as a
//! shortcut using the defaults.

pub mod fields;
pub mod images;
pub mod labels;
pub mod listener;
pub mod normalize;
pub mod parties;
pub mod segment;

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use comp_report_comp_models::ComparableRecord;

use crate::images::{ImageSource as _, ImageStore, PdfImageSource};
use crate::listener::{ExtractListener, null_listener};
use crate::normalize::Normalizer;

/// Directory images are written to unless configured otherwise.
pub const DEFAULT_IMAGES_DIR: &str = "output/comp_images";

/// Errors that abort an extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// The input is not a PDF that can be parsed.
    #[error("Unreadable PDF: {0}")]
    Unreadable(String),
}

/// Reasons a single record is dropped.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// No field rule matched anything in the record's span.
    #[error("comp {ordinal} has no recognizable fields")]
    NoFields { ordinal: u32 },

    /// Another record with the same ordinal was already kept.
    #[error("comp {ordinal} appears more than once")]
    DuplicateOrdinal { ordinal: u32 },
}

/// Reasons a single page image is skipped.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    /// The PDF object could not be read.
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// The stream uses a filter chain that is not extracted.
    #[error("Unsupported image filter: {0}")]
    UnsupportedFilter(String),

    /// Raw samples in a color space that cannot be re-encoded.
    #[error("Unsupported color space: {0}")]
    UnsupportedColorSpace(String),

    /// The image dictionary or sample data is inconsistent.
    #[error("Malformed image: {0}")]
    Malformed(String),

    /// PNG encoding failed.
    #[error("Image encoding error: {0}")]
    Encode(#[from] image::ImageError),

    /// Writing the image file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Records plus the normalized text they were parsed from.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Kept records, in source order.
    pub records: Vec<ComparableRecord>,
    /// Normalized report text.
    pub text: String,
}

/// Extracts [`ComparableRecord`]s from report PDFs.
#[derive(Clone)]
pub struct Extractor {
    images_dir: Option<PathBuf>,
    normalizer: Normalizer,
    listener: Arc<dyn ExtractListener>,
}

impl Default for Extractor {
    fn default() -> Self {
        Self {
            images_dir: Some(PathBuf::from(DEFAULT_IMAGES_DIR)),
            normalizer: Normalizer::default(),
            listener: null_listener(),
        }
    }
}

impl std::fmt::Debug for Extractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extractor")
            .field("images_dir", &self.images_dir)
            .field("normalizer", &self.normalizer)
            .finish_non_exhaustive()
    }
}

impl Extractor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Saves extracted images into `dir`.
    #[must_use]
    pub fn with_images_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.images_dir = Some(dir.into());
        self
    }

    /// Skips image extraction entirely.
    #[must_use]
    pub fn without_images(mut self) -> Self {
        self.images_dir = None;
        self
    }

    /// Strips `banner` lines from the text in addition to the defaults.
    #[must_use]
    pub fn with_banner(mut self, banner: &str) -> Self {
        self.normalizer = self.normalizer.with_banner(banner);
        self
    }

    /// Reports per-record and per-image events to `listener`.
    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn ExtractListener>) -> Self {
        self.listener = listener;
        self
    }

    /// Extracts the records of `pdf`, in source order.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::Unreadable`] if the bytes are not a readable
    /// PDF. A PDF without any comp headings yields an empty list.
    pub fn extract(&self, pdf: &[u8]) -> Result<Vec<ComparableRecord>, ExtractError> {
        Ok(self.extract_detailed(pdf)?.records)
    }

    /// Like [`Extractor::extract`], also returning the normalized text.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::Unreadable`] if the bytes are not a readable
    /// PDF.
    pub fn extract_detailed(&self, pdf: &[u8]) -> Result<Extraction, ExtractError> {
        let doc = lopdf::Document::load_mem(pdf)
            .map_err(|e| ExtractError::Unreadable(e.to_string()))?;
        let pages = pdf_extract::extract_text_from_mem_by_pages(pdf)
            .map_err(|e| ExtractError::Unreadable(format!("failed to extract text: {e}")))?;

        log::debug!("Extracted text from {} page(s)", pages.len());

        let mut extraction = self.extract_text(&pages);

        if let Some(dir) = &self.images_dir
            && !extraction.records.is_empty()
        {
            let source = PdfImageSource::new(&doc);
            let owners = images::page_owners(&pages, source.page_count());
            let store = ImageStore::new(dir);
            let attached = images::associate(
                &source,
                &owners,
                &mut extraction.records,
                &store,
                self.listener.as_ref(),
            );
            log::info!("Attached {attached} image(s) from {}", store.dir().display());
        }

        Ok(extraction)
    }

    /// Parses records from already-extracted page texts. Images are not
    /// touched.
    #[must_use]
    pub fn extract_text(&self, pages: &[String]) -> Extraction {
        let text = self.normalizer.normalize(&pages.join("\n"));
        let spans = segment::segment(&text);

        if spans.is_empty() {
            log::warn!(
                "No comp headings found; text starts with {:?}",
                text.chars().take(200).collect::<String>()
            );
        }

        let mut seen = BTreeSet::new();
        let mut records = Vec::with_capacity(spans.len());
        for span in &spans {
            let result = if seen.contains(&span.ordinal) {
                Err(RecordError::DuplicateOrdinal {
                    ordinal: span.ordinal,
                })
            } else {
                fields::parse_record(span)
            };

            match result {
                Ok(record) => {
                    log::info!("Extracted comp {}: {}", record.ordinal, record.property_name);
                    seen.insert(record.ordinal);
                    self.listener.record_parsed(record.ordinal);
                    records.push(record);
                }
                Err(e) => {
                    log::warn!("Dropping record: {e}");
                    self.listener.record_dropped(&e);
                }
            }
        }

        log::info!("Extracted {} comp(s)", records.len());

        Extraction { records, text }
    }
}

/// Extracts records from `pdf` with the default [`Extractor`], saving images
/// under [`DEFAULT_IMAGES_DIR`].
///
/// # Errors
///
/// Returns [`ExtractError::Unreadable`] if the bytes are not a readable PDF.
pub fn extract(pdf: &[u8]) -> Result<Vec<ComparableRecord>, ExtractError> {
    Extractor::default().extract(pdf)
}
