//! Inline picture insertion.
//!
//! Adding a picture to a part takes three package edits: the image file under
//! `word/media/`, an image relationship in the part's `_rels` file, and a
//! `Default` content type for the file extension. The picture itself is an
//! inline `w:drawing` run referencing the relationship id.

use std::io::Cursor;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::DocxError;
use crate::package::Package;

/// English Metric Units per inch.
pub const EMU_PER_INCH: f64 = 914_400.0;

const CONTENT_TYPES: &str = "[Content_Types].xml";

const IMAGE_REL_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

/// Height-to-width ratio used when the image dimensions cannot be read.
const FALLBACK_ASPECT: f64 = 0.75;

/// First `wp:docPr` id handed out, well above what Word assigns itself.
const FIRST_DOC_PR_ID: u32 = 5000;

static REL_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"Id="rId(\d+)""#).expect("valid regex"));

/// Inserts pictures into one package, numbering media files and drawing ids.
#[derive(Debug)]
pub struct MediaWriter {
    width_emu: u64,
    next_media: u32,
    next_doc_pr: u32,
}

impl MediaWriter {
    #[must_use]
    pub fn new(width_inches: f64) -> Self {
        Self {
            width_emu: inches_to_emu(width_inches),
            next_media: 1,
            next_doc_pr: FIRST_DOC_PR_ID,
        }
    }

    /// Adds the image at `path` to `package` for use by `part`, returning the
    /// run XML that displays it.
    ///
    /// # Errors
    ///
    /// Returns [`DocxError::Io`] if the image file cannot be read.
    pub fn add_picture(
        &mut self,
        package: &mut Package,
        part: &str,
        path: &Path,
    ) -> Result<String, DocxError> {
        let bytes = std::fs::read(path)?;
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_else(|| "png".to_owned());

        let (cx, cy) = self.extent(&bytes);

        let media_name = loop {
            let candidate = format!("comp_image{}.{ext}", self.next_media);
            self.next_media += 1;
            if !package.contains(&format!("word/media/{candidate}")) {
                break candidate;
            }
        };
        package.set(&format!("word/media/{media_name}"), bytes);

        let rel_id = add_relationship(package, part, &format!("media/{media_name}"));
        ensure_content_type(package, &ext);

        let doc_pr = self.next_doc_pr;
        self.next_doc_pr += 1;

        log::debug!("Added {media_name} to {part} as {rel_id} ({cx}x{cy} EMU)");

        Ok(drawing_xml(&rel_id, doc_pr, &media_name, cx, cy))
    }

    /// Fixed width, height from the image's aspect ratio.
    fn extent(&self, bytes: &[u8]) -> (u64, u64) {
        let aspect = image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .ok()
            .and_then(|reader| reader.into_dimensions().ok())
            .filter(|&(w, h)| w > 0 && h > 0)
            .map_or(FALLBACK_ASPECT, |(w, h)| f64::from(h) / f64::from(w));
        (self.width_emu, scale(self.width_emu, aspect))
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn inches_to_emu(inches: f64) -> u64 {
    (inches.max(0.0) * EMU_PER_INCH).round() as u64
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn scale(emu: u64, factor: f64) -> u64 {
    (emu as f64 * factor).round() as u64
}

/// Relationship part of `part`, e.g. `word/_rels/document.xml.rels`.
fn rels_name(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

/// Adds an image relationship to `part`'s rels (creating it if needed) and
/// returns its id.
fn add_relationship(package: &mut Package, part: &str, target: &str) -> String {
    let name = rels_name(part);
    let xml = package
        .get(&name)
        .map(|b| String::from_utf8_lossy(b).into_owned())
        .unwrap_or_else(|| {
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"></Relationships>"#
                .to_owned()
        });

    let next = REL_ID_RE
        .captures_iter(&xml)
        .filter_map(|caps| caps[1].parse::<u32>().ok())
        .max()
        .unwrap_or(0)
        + 1;
    let id = format!("rId{next}");
    let relationship =
        format!(r#"<Relationship Id="{id}" Type="{IMAGE_REL_TYPE}" Target="{target}"/>"#);

    let xml = if let Some(pos) = xml.rfind("</Relationships>") {
        format!("{}{relationship}{}", &xml[..pos], &xml[pos..])
    } else if let Some(head) = xml.trim_end().strip_suffix("/>") {
        format!("{head}>{relationship}</Relationships>")
    } else {
        log::warn!("Malformed {name}, appending relationship anyway");
        format!("{xml}{relationship}")
    };
    package.set(&name, xml.into_bytes());
    id
}

fn content_type(ext: &str) -> String {
    match ext {
        "jpg" | "jpeg" => "image/jpeg".to_owned(),
        "tif" | "tiff" => "image/tiff".to_owned(),
        "jp2" => "image/jp2".to_owned(),
        "emf" => "image/x-emf".to_owned(),
        other => format!("image/{other}"),
    }
}

/// Registers a `Default` content type for `ext` unless one exists.
fn ensure_content_type(package: &mut Package, ext: &str) {
    let Some(xml) = package
        .get(CONTENT_TYPES)
        .map(|b| String::from_utf8_lossy(b).into_owned())
    else {
        log::warn!("Package has no {CONTENT_TYPES}, not registering .{ext}");
        return;
    };

    let needle = format!(r#"Extension="{ext}""#).to_ascii_lowercase();
    if xml.to_ascii_lowercase().contains(&needle) {
        return;
    }
    let Some(pos) = xml.rfind("</Types>") else {
        log::warn!("Malformed {CONTENT_TYPES}, not registering .{ext}");
        return;
    };

    let entry = format!(
        r#"<Default Extension="{ext}" ContentType="{}"/>"#,
        content_type(ext)
    );
    let xml = format!("{}{entry}{}", &xml[..pos], &xml[pos..]);
    package.set(CONTENT_TYPES, xml.into_bytes());
}

fn drawing_xml(rel_id: &str, doc_pr: u32, name: &str, cx: u64, cy: u64) -> String {
    format!(
        concat!(
            r#"<w:r><w:drawing>"#,
            r#"<wp:inline distT="0" distB="0" distL="0" distR="0" xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing">"#,
            r#"<wp:extent cx="{cx}" cy="{cy}"/>"#,
            r#"<wp:docPr id="{doc_pr}" name="Picture {doc_pr}"/>"#,
            r#"<wp:cNvGraphicFramePr><a:graphicFrameLocks xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" noChangeAspect="1"/></wp:cNvGraphicFramePr>"#,
            r#"<a:graphic xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main">"#,
            r#"<a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/picture">"#,
            r#"<pic:pic xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture">"#,
            r#"<pic:nvPicPr><pic:cNvPr id="0" name="{name}"/><pic:cNvPicPr/></pic:nvPicPr>"#,
            r#"<pic:blipFill><a:blip xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" r:embed="{rel_id}"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill>"#,
            r#"<pic:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></pic:spPr>"#,
            r#"</pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing></w:r>"#,
        ),
        cx = cx,
        cy = cy,
        doc_pr = doc_pr,
        name = name,
        rel_id = rel_id,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        image::RgbImage::new(width, height)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn package() -> Package {
        let mut package = Package::default();
        package.set(
            CONTENT_TYPES,
            br#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/></Types>"#.to_vec(),
        );
        package.set(
            "word/_rels/document.xml.rels",
            br#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="x" Target="styles.xml"/><Relationship Id="rId7" Type="y" Target="theme/theme1.xml"/></Relationships>"#.to_vec(),
        );
        package
    }

    #[test]
    fn rels_names() {
        assert_eq!(rels_name("word/document.xml"), "word/_rels/document.xml.rels");
        assert_eq!(rels_name("word/header1.xml"), "word/_rels/header1.xml.rels");
    }

    #[test]
    fn picture_is_added_with_a_fresh_relationship() {
        let dir = std::env::temp_dir().join(format!("comp_report_media_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("photo.PNG");
        std::fs::write(&path, png(200, 100)).unwrap();

        let mut package = package();
        let mut media = MediaWriter::new(4.0);
        let xml = media
            .add_picture(&mut package, "word/document.xml", &path)
            .unwrap();

        assert!(xml.contains(r#"r:embed="rId8""#));
        assert!(xml.contains(r#"<wp:extent cx="3657600" cy="1828800"/>"#));
        assert!(package.contains("word/media/comp_image1.png"));

        let rels = String::from_utf8(package.get("word/_rels/document.xml.rels").unwrap().to_vec())
            .unwrap();
        assert!(rels.contains(r#"<Relationship Id="rId8" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="media/comp_image1.png"/></Relationships>"#));

        let types = String::from_utf8(package.get(CONTENT_TYPES).unwrap().to_vec()).unwrap();
        assert!(types.contains(r#"<Default Extension="png" ContentType="image/png"/>"#));

        // A second picture reuses the content type and gets the next ids.
        let xml = media
            .add_picture(&mut package, "word/header1.xml", &path)
            .unwrap();
        assert!(xml.contains(r#"r:embed="rId1""#));
        assert!(package.contains("word/media/comp_image2.png"));
        assert!(package.contains("word/_rels/header1.xml.rels"));
        let types = String::from_utf8(package.get(CONTENT_TYPES).unwrap().to_vec()).unwrap();
        assert_eq!(types.matches(r#"Extension="png""#).count(), 1);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn unreadable_dimensions_fall_back_to_a_fixed_aspect() {
        let media = MediaWriter::new(4.0);
        assert_eq!(media.extent(b"not an image"), (3_657_600, 2_743_200));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let mut package = package();
        let result = MediaWriter::new(4.0).add_picture(
            &mut package,
            "word/document.xml",
            Path::new("/nonexistent/comp_1.png"),
        );
        assert!(matches!(result, Err(DocxError::Io(_))));
        assert!(!package.contains("word/media/comp_image1.png"));
    }
}
