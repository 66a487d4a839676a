//! Extraction event reporting.
//!
//! Defines an [`ExtractListener`] trait that lets callers observe what
//! happened to each record and image without scraping log output. Every
//! event is also logged, so a listener is optional.

use std::path::Path;
use std::sync::Arc;

use crate::{ImageError, RecordError};

/// Receives per-record and per-image events during one extraction.
///
/// Implementations must be `Send + Sync` so they can be shared behind an
/// `Arc` between extractor instances.
pub trait ExtractListener: Send + Sync {
    /// A record was parsed and kept.
    fn record_parsed(&self, ordinal: u32);

    /// A record was dropped because it failed to parse.
    fn record_dropped(&self, error: &RecordError);

    /// An image was saved and attached to the record with `ordinal`.
    fn image_attached(&self, ordinal: u32, path: &Path);

    /// An image was found for a record that already has one.
    fn image_discarded(&self, ordinal: u32, page: u32);

    /// An image on `page` could not be extracted or saved.
    fn image_skipped(&self, page: u32, error: &ImageError);
}

/// A no-op implementation of [`ExtractListener`].
pub struct NullListener;

impl ExtractListener for NullListener {
    fn record_parsed(&self, _ordinal: u32) {}
    fn record_dropped(&self, _error: &RecordError) {}
    fn image_attached(&self, _ordinal: u32, _path: &Path) {}
    fn image_discarded(&self, _ordinal: u32, _page: u32) {}
    fn image_skipped(&self, _page: u32, _error: &ImageError) {}
}

/// Returns a shared [`NullListener`] instance for convenient use.
#[must_use]
pub fn null_listener() -> Arc<dyn ExtractListener> {
    Arc::new(NullListener)
}
