//! Embedded page images and their association with records.
//!
//! Photos in a summary report sit on the same page as (or on the pages
//! following) the heading of the comp they belong to. Each page is owned by
//! the last heading printed on it, or by the owner of the previous page when
//! it has none. A record keeps the first image that could be extracted from
//! its pages; later ones are discarded without being written to disk.

use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use chrono::Local;
use comp_report_comp_models::ComparableRecord;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use crate::ImageError;
use crate::listener::ExtractListener;
use crate::segment::heading_ordinals;

/// Limit on `Parent` hops when looking for inherited page resources.
const MAX_INHERIT_DEPTH: usize = 32;

/// Container format of an extracted image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// `DCTDecode` stream, stored as-is.
    Jpeg,
    /// `JPXDecode` stream, stored as-is.
    Jpeg2000,
    /// Raw samples re-encoded as PNG.
    Png,
}

impl ImageFormat {
    /// File extension used when saving.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Jpeg2000 => "jp2",
            Self::Png => "png",
        }
    }
}

/// Encoded image bytes ready to be written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
}

/// Something that holds images per page, numbered from 1.
pub trait ImageSource {
    /// Number of pages.
    fn page_count(&self) -> u32;

    /// Number of images on `page`.
    fn image_count(&self, page: u32) -> usize;

    /// Extracts the `index`th image on `page`.
    ///
    /// # Errors
    ///
    /// Returns an [`ImageError`] if the image cannot be decoded.
    fn load_image(&self, page: u32, index: usize) -> Result<RawImage, ImageError>;
}

/// Image XObjects of a parsed PDF.
pub struct PdfImageSource<'a> {
    doc: &'a Document,
    pages: BTreeMap<u32, ObjectId>,
}

impl<'a> PdfImageSource<'a> {
    #[must_use]
    pub fn new(doc: &'a Document) -> Self {
        Self {
            doc,
            pages: doc.get_pages(),
        }
    }

    fn image_streams(&self, page: u32) -> Vec<&'a Stream> {
        let Some(&page_id) = self.pages.get(&page) else {
            return Vec::new();
        };
        let Some(xobjects) = page_resources(self.doc, page_id)
            .and_then(|res| res.get(b"XObject").ok())
            .and_then(|o| resolve(self.doc, o))
            .and_then(|o| o.as_dict().ok())
        else {
            return Vec::new();
        };

        xobjects
            .iter()
            .filter_map(|(_, obj)| resolve(self.doc, obj)?.as_stream().ok())
            .filter(|s| {
                s.dict
                    .get(b"Subtype")
                    .and_then(Object::as_name)
                    .is_ok_and(|n| n == b"Image")
            })
            .collect()
    }
}

impl ImageSource for PdfImageSource<'_> {
    fn page_count(&self) -> u32 {
        self.pages.keys().next_back().copied().unwrap_or(0)
    }

    fn image_count(&self, page: u32) -> usize {
        self.image_streams(page).len()
    }

    fn load_image(&self, page: u32, index: usize) -> Result<RawImage, ImageError> {
        let streams = self.image_streams(page);
        let stream = streams.get(index).ok_or_else(|| {
            ImageError::Malformed(format!("page {page} has no image #{index}"))
        })?;
        decode(self.doc, stream)
    }
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    doc.dereference(obj).ok().map(|(_, o)| o)
}

/// The page's `Resources`, inherited from the page tree when absent.
fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_INHERIT_DEPTH {
        if let Some(resources) = node
            .get(b"Resources")
            .ok()
            .and_then(|o| resolve(doc, o))
            .and_then(|o| o.as_dict().ok())
        {
            return Some(resources);
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn lossy(name: &[u8]) -> String {
    String::from_utf8_lossy(name).into_owned()
}

fn filter_names(doc: &Document, dict: &Dictionary) -> Vec<String> {
    match dict.get(b"Filter").ok().and_then(|o| resolve(doc, o)) {
        Some(Object::Name(name)) => vec![lossy(name)],
        Some(Object::Array(items)) => items
            .iter()
            .filter_map(|o| o.as_name().ok())
            .map(lossy)
            .collect(),
        _ => Vec::new(),
    }
}

fn dimension(doc: &Document, dict: &Dictionary, key: &[u8]) -> Result<u32, ImageError> {
    dict.get(key)
        .ok()
        .and_then(|o| resolve(doc, o))
        .and_then(|o| o.as_i64().ok())
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| ImageError::Malformed(format!("missing or invalid /{}", lossy(key))))
}

/// Number of 8-bit samples per pixel for the supported color spaces.
fn channels(doc: &Document, dict: &Dictionary) -> Result<u8, ImageError> {
    match dict.get(b"ColorSpace").ok().and_then(|o| resolve(doc, o)) {
        Some(Object::Name(name)) => match name.as_slice() {
            b"DeviceRGB" => Ok(3),
            b"DeviceGray" => Ok(1),
            other => Err(ImageError::UnsupportedColorSpace(lossy(other))),
        },
        Some(Object::Array(items)) => match items.as_slice() {
            [Object::Name(kind), profile] if kind == b"ICCBased" => {
                let n = resolve(doc, profile)
                    .and_then(|o| o.as_stream().ok())
                    .and_then(|s| s.dict.get(b"N").ok())
                    .and_then(|o| o.as_i64().ok());
                match n {
                    Some(3) => Ok(3),
                    Some(1) => Ok(1),
                    _ => Err(ImageError::UnsupportedColorSpace(format!(
                        "ICCBased with {n:?} components"
                    ))),
                }
            }
            [Object::Name(kind), ..] => Err(ImageError::UnsupportedColorSpace(lossy(kind))),
            _ => Err(ImageError::UnsupportedColorSpace("empty array".to_owned())),
        },
        _ => Err(ImageError::UnsupportedColorSpace("none".to_owned())),
    }
}

fn decode(doc: &Document, stream: &Stream) -> Result<RawImage, ImageError> {
    let filters = filter_names(doc, &stream.dict);
    match filters.as_slice() {
        [only] if only == "DCTDecode" => Ok(RawImage {
            format: ImageFormat::Jpeg,
            bytes: stream.content.clone(),
        }),
        [only] if only == "JPXDecode" => Ok(RawImage {
            format: ImageFormat::Jpeg2000,
            bytes: stream.content.clone(),
        }),
        [] => encode_png(doc, &stream.dict, stream.content.clone()),
        [only] if only == "FlateDecode" => {
            encode_png(doc, &stream.dict, stream.decompressed_content()?)
        }
        other => Err(ImageError::UnsupportedFilter(other.join(","))),
    }
}

fn encode_png(
    doc: &Document,
    dict: &Dictionary,
    mut samples: Vec<u8>,
) -> Result<RawImage, ImageError> {
    let width = dimension(doc, dict, b"Width")?;
    let height = dimension(doc, dict, b"Height")?;
    let bits = dimension(doc, dict, b"BitsPerComponent")?;
    let channels = channels(doc, dict)?;
    if bits != 8 {
        return Err(ImageError::UnsupportedColorSpace(format!(
            "{bits} bits per component"
        )));
    }

    let expected = usize::try_from(width)
        .ok()
        .zip(usize::try_from(height).ok())
        .and_then(|(w, h)| w.checked_mul(h)?.checked_mul(usize::from(channels)))
        .ok_or_else(|| ImageError::Malformed(format!("{width}x{height} image is too large")))?;
    if samples.len() < expected {
        return Err(ImageError::Malformed(format!(
            "expected {expected} sample bytes, found {}",
            samples.len()
        )));
    }
    samples.truncate(expected);

    let mut bytes = Vec::new();
    let mut cursor = Cursor::new(&mut bytes);
    if channels == 3 {
        image::RgbImage::from_raw(width, height, samples)
            .ok_or_else(|| ImageError::Malformed("sample buffer too small".to_owned()))?
            .write_to(&mut cursor, image::ImageFormat::Png)?;
    } else {
        image::GrayImage::from_raw(width, height, samples)
            .ok_or_else(|| ImageError::Malformed("sample buffer too small".to_owned()))?
            .write_to(&mut cursor, image::ImageFormat::Png)?;
    }

    Ok(RawImage {
        format: ImageFormat::Png,
        bytes,
    })
}

/// Writes extracted images to a directory, one file per record.
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
    timestamp: String,
}

impl ImageStore {
    /// Creates a store writing into `dir`, which is created on first save.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            timestamp: Local::now().format("%Y%m%d_%H%M%S").to_string(),
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Saves `image` as `comp_<ordinal>_<timestamp>.<ext>`.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::Io`] if the directory or file cannot be written.
    pub fn save(&self, ordinal: u32, image: &RawImage) -> Result<PathBuf, ImageError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!(
            "comp_{ordinal}_{}.{}",
            self.timestamp,
            image.format.extension()
        ));
        std::fs::write(&path, &image.bytes)?;
        log::debug!("Saved {} byte image to {}", image.bytes.len(), path.display());
        Ok(path)
    }
}

/// Maps each page (index 0 = page 1) to the ordinal of the record owning it.
///
/// `page_texts` are the per-page texts; pages past its end have no headings
/// of their own.
#[must_use]
pub fn page_owners(page_texts: &[String], page_count: u32) -> Vec<Option<u32>> {
    let mut current = None;
    (0..page_count as usize)
        .map(|idx| {
            if let Some(last) = page_texts
                .get(idx)
                .and_then(|text| heading_ordinals(text).last().copied())
            {
                current = Some(last);
            }
            current
        })
        .collect()
}

/// Attaches page images to the records owning their pages.
///
/// Returns the number of images attached.
pub fn associate(
    source: &dyn ImageSource,
    owners: &[Option<u32>],
    records: &mut [ComparableRecord],
    store: &ImageStore,
    listener: &dyn ExtractListener,
) -> usize {
    let mut attached = 0;
    for (page, owner) in (1_u32..).zip(owners) {
        let count = source.image_count(page);
        if count == 0 {
            continue;
        }
        let Some(ordinal) = *owner else {
            log::debug!("Page {page}: {count} image(s) before the first record, ignored");
            continue;
        };
        let Some(record) = records.iter_mut().find(|r| r.ordinal == ordinal) else {
            log::debug!("Page {page}: owner comp {ordinal} was not kept, ignoring {count} image(s)");
            continue;
        };

        log::debug!("Page {page}: {count} image(s) for comp {ordinal}");

        for index in 0..count {
            if record.image.is_some() {
                log::warn!("Page {page}: comp {ordinal} already has an image, discarding image #{index}");
                listener.image_discarded(ordinal, page);
                continue;
            }
            match source
                .load_image(page, index)
                .and_then(|image| store.save(ordinal, &image))
            {
                Ok(path) => {
                    log::info!("Attached image {} to comp {ordinal}", path.display());
                    listener.image_attached(ordinal, &path);
                    record.image = Some(path);
                    attached += 1;
                }
                Err(e) => {
                    log::warn!("Page {page}: skipping image #{index}: {e}");
                    listener.image_skipped(page, &e);
                }
            }
        }
    }
    attached
}
