//! The zip container of a `.docx` file.
//!
//! Entries are kept as an ordered list of `(name, bytes)` so that a package
//! is written back with its entries in the original order, which Word
//! relies on for `[Content_Types].xml` coming first.

use std::io::{Cursor, Read as _, Write as _};

use crate::DocxError;

/// An in-memory docx package.
#[derive(Debug, Clone, Default)]
pub struct Package {
    entries: Vec<(String, Vec<u8>)>,
}

impl Package {
    /// Reads every file entry of the zip archive in `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`DocxError::Zip`] if `bytes` is not a readable zip archive.
    pub fn read(bytes: &[u8]) -> Result<Self, DocxError> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
        let mut entries = Vec::with_capacity(archive.len());

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_owned();
            let mut data = Vec::new();
            entry.read_to_end(&mut data)?;
            entries.push((name, data));
        }

        log::debug!("Read docx package with {} entries", entries.len());

        Ok(Self { entries })
    }

    /// Returns the contents of the entry called `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, data)| data.as_slice())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Replaces the entry called `name`, or appends it if it does not exist.
    pub fn set(&mut self, name: &str, data: Vec<u8>) {
        if let Some(entry) = self.entries.iter_mut().find(|(n, _)| n == name) {
            entry.1 = data;
        } else {
            self.entries.push((name.to_owned(), data));
        }
    }

    /// Entry names, in archive order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// Writes the package to a new zip archive. Media files are stored,
    /// everything else is deflated.
    ///
    /// # Errors
    ///
    /// Returns [`DocxError::Zip`] or [`DocxError::Io`] if writing fails.
    pub fn write(&self) -> Result<Vec<u8>, DocxError> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let deflated = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);
        let stored = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);

        for (name, data) in &self.entries {
            let options = if name.starts_with("word/media/") {
                stored
            } else {
                deflated
            };
            zip.start_file(name.as_str(), options)?;
            zip.write_all(data)?;
        }

        Ok(zip.finish()?.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default();
        for (name, data) in [
            ("[Content_Types].xml", "<Types/>"),
            ("word/document.xml", "<w:document/>"),
            ("word/media/image1.png", "png"),
        ] {
            zip.start_file(name, options).unwrap();
            zip.write_all(data.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn entries_keep_their_order() {
        let mut package = Package::read(&sample()).unwrap();
        package.set("word/document.xml", b"<w:document>x</w:document>".to_vec());
        package.set("word/media/comp_image1.png", b"new".to_vec());

        let reread = Package::read(&package.write().unwrap()).unwrap();
        assert_eq!(
            reread.names().collect::<Vec<_>>(),
            vec![
                "[Content_Types].xml",
                "word/document.xml",
                "word/media/image1.png",
                "word/media/comp_image1.png",
            ]
        );
        assert_eq!(
            reread.get("word/document.xml").unwrap(),
            b"<w:document>x</w:document>"
        );
        assert_eq!(reread.get("word/media/comp_image1.png").unwrap(), b"new");
    }

    #[test]
    fn media_is_stored_uncompressed() {
        let package = Package::read(&sample()).unwrap();
        let bytes = package.write().unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(
            archive.by_name("word/media/image1.png").unwrap().compression(),
            zip::CompressionMethod::Stored
        );
        assert_eq!(
            archive.by_name("word/document.xml").unwrap().compression(),
            zip::CompressionMethod::Deflated
        );
    }

    #[test]
    fn garbage_is_a_zip_error() {
        assert!(matches!(
            Package::read(b"definitely not a zip"),
            Err(DocxError::Zip(_))
        ));
    }
}
