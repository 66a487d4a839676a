#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! End-to-end comp report generation.
//!
//! [`CompReport`] extracts comparable records from a land sale summary
//! report PDF, substitutes them into a docx template and saves the result,
//! optionally with a JSON summary of the comps used.

pub mod config;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use comp_report_comp_models::{ComparableRecord, SLOT_COUNT};
use comp_report_docx::{DocxError, Renderer, ReplacementMap};
use comp_report_pdf::listener::ExtractListener;
use comp_report_pdf::{ExtractError, Extraction, Extractor};
use serde::Serialize;

pub use config::{ConfigError, ReportConfig};

/// Number of characters of report text included in [`ReportError::NoRecordsFound`].
const PREVIEW_CHARS: usize = 500;

/// Errors that abort report generation.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// The PDF could not be read.
    #[error(transparent)]
    Extract(#[from] ExtractError),

    /// The template could not be rendered.
    #[error(transparent)]
    Render(#[from] DocxError),

    /// The PDF has no recognizable comp sections.
    #[error("No comps found in the report; text starts with {preview:?}")]
    NoRecordsFound {
        /// The start of the normalized report text.
        preview: String,
    },

    /// The output could not be written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The summary could not be serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One comp as listed in the summary file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompSummary {
    pub comp_number: u32,
    pub property_name: String,
    pub address: String,
    pub sale_price: String,
    pub sale_price_sf: String,
    pub market: String,
    pub sub_market: String,
}

impl From<&ComparableRecord> for CompSummary {
    fn from(record: &ComparableRecord) -> Self {
        Self {
            comp_number: record.ordinal,
            property_name: record.property_name.clone(),
            address: record.address.clone(),
            sale_price: record.sale_price.clone(),
            sale_price_sf: record.sale_price_sf.clone(),
            market: record.market.clone(),
            sub_market: record.sub_market.clone(),
        }
    }
}

/// What [`CompReport::generate`] produced.
#[derive(Debug, Clone)]
pub struct ReportOutput {
    /// The rendered document.
    pub document: PathBuf,
    /// The JSON summary, if one was written.
    pub summary: Option<PathBuf>,
    /// Every extracted record, in source order.
    pub records: Vec<ComparableRecord>,
    /// Number of keywords bound to a non-empty value.
    pub replacements: usize,
}

/// Summary of the comps placed in slots, lowest ordinals first.
#[must_use]
pub fn summarize(records: &[ComparableRecord]) -> Vec<CompSummary> {
    let mut sorted: Vec<&ComparableRecord> = records.iter().collect();
    sorted.sort_by_key(|r| r.ordinal);
    sorted
        .into_iter()
        .take(SLOT_COUNT)
        .map(CompSummary::from)
        .collect()
}

/// Extracts, renders and saves comp reports.
#[derive(Debug, Clone)]
pub struct CompReport {
    config: ReportConfig,
    extractor: Extractor,
    renderer: Renderer,
}

impl Default for CompReport {
    fn default() -> Self {
        Self::new(ReportConfig::default())
    }
}

impl CompReport {
    #[must_use]
    pub fn new(config: ReportConfig) -> Self {
        let extractor = config
            .banners
            .iter()
            .fold(Extractor::new().with_images_dir(config.images_dir()), |e, b| {
                e.with_banner(b)
            });
        let renderer = Renderer::new().with_image_width_inches(config.image_width_inches);
        Self {
            config,
            extractor,
            renderer,
        }
    }

    /// Reports extraction events to `listener`.
    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn ExtractListener>) -> Self {
        self.extractor = self.extractor.with_listener(listener);
        self
    }

    #[must_use]
    pub const fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Extracts records and the normalized text from `pdf`.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Extract`] if the PDF is unreadable.
    pub fn extract(&self, pdf: &[u8]) -> Result<Extraction, ReportError> {
        Ok(self.extractor.extract_detailed(pdf)?)
    }

    /// Renders `template` with `records`.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Render`] if the template is not a readable docx.
    pub fn render(
        &self,
        template: &[u8],
        records: &[ComparableRecord],
    ) -> Result<Vec<u8>, ReportError> {
        Ok(self.renderer.render(template, records)?)
    }

    /// Path a generated document is saved to when none is given.
    #[must_use]
    pub fn default_output_path(&self) -> PathBuf {
        self.config.output_dir.join(format!(
            "Report_with_Comps_{}.docx",
            chrono::Local::now().format("%Y%m%d_%H%M%S")
        ))
    }

    /// Extracts the comps of `pdf`, renders them into `template` and writes
    /// the document to `output` (or [`CompReport::default_output_path`]).
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Extract`] for an unreadable PDF,
    /// [`ReportError::NoRecordsFound`] when the PDF has no comps and
    /// [`ReportError::Render`] for an unreadable template. Writing failures
    /// are [`ReportError::Io`].
    pub fn generate(
        &self,
        pdf: &[u8],
        template: &[u8],
        output: Option<&Path>,
    ) -> Result<ReportOutput, ReportError> {
        let extraction = self.extract(pdf)?;
        self.finish(extraction, template, output)
    }

    fn finish(
        &self,
        extraction: Extraction,
        template: &[u8],
        output: Option<&Path>,
    ) -> Result<ReportOutput, ReportError> {
        let Extraction { records, text } = extraction;
        if records.is_empty() {
            return Err(ReportError::NoRecordsFound {
                preview: text.chars().take(PREVIEW_CHARS).collect(),
            });
        }

        let map = ReplacementMap::from_records(&records);
        let replacements = map.non_empty_count();
        log::info!(
            "Rendering {} comp(s) with {replacements} non-empty replacement(s)",
            records.len().min(SLOT_COUNT)
        );
        let bytes = self.renderer.render_map(template, &map)?;

        let document = output.map_or_else(|| self.default_output_path(), Path::to_path_buf);
        if let Some(parent) = document.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&document, bytes)?;
        log::info!("Saved report to {}", document.display());

        let summary = if self.config.write_summary {
            let path = document.with_extension("json");
            std::fs::write(&path, serde_json::to_vec_pretty(&summarize(&records))?)?;
            log::debug!("Saved comp summary to {}", path.display());
            Some(path)
        } else {
            None
        };

        Ok(ReportOutput {
            document,
            summary,
            records,
            replacements,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write as _};

    use super::*;

    const REPORT: &str = "Land Comp Summary Report
1. Sold Land Property (Vacant)
System ID: 4821)
Office Building
Primary Use: Office
123 Main St
Provo, UT 84601
Market: Provo/Orem / Sub-Market: Central
Comp SF: 12,000 SF
Sale Price: $1,200,000
Sale Price/SF: $100.00
2. Sold Land Property
System ID: 4822)
Corner Lot
Sale Price: $450,000
";

    fn template() -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("[Content_Types].xml", options).unwrap();
        zip.write_all(br#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"></Types>"#)
            .unwrap();
        zip.start_file("word/document.xml", options).unwrap();
        zip.write_all(br#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:p><w:r><w:t xml:space="preserve">Comp: {{comp1_sale_price}} {{comp2_property_name}}{{comp3_property_name}}</w:t></w:r></w:p></w:body></w:document>"#)
            .unwrap();
        zip.finish().unwrap().into_inner()
    }

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("comp_report_{name}_{}", std::process::id()))
    }

    fn extraction(text: &str) -> Extraction {
        Extractor::new().extract_text(&[text.to_owned()])
    }

    #[test]
    fn report_is_written_with_a_summary() {
        let dir = scratch("generate");
        let output = dir.join("nested").join("report.docx");
        let report = CompReport::default();

        let result = report
            .finish(extraction(REPORT), &template(), Some(&output))
            .unwrap();

        assert_eq!(result.document, output);
        assert_eq!(result.records.len(), 2);
        assert!(result.replacements > 0);

        let package = comp_report_docx::package::Package::read(&std::fs::read(&output).unwrap())
            .unwrap();
        let xml = String::from_utf8(package.get("word/document.xml").unwrap().to_vec()).unwrap();
        assert!(xml.contains("Comp: $1,200,000 Corner Lot<"));

        let summary: serde_json::Value =
            serde_json::from_slice(&std::fs::read(dir.join("nested/report.json")).unwrap()).unwrap();
        assert_eq!(summary[0]["comp_number"], 1);
        assert_eq!(summary[0]["sale_price_sf"], "$100.00");
        assert_eq!(summary[1]["property_name"], "Corner Lot");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn summary_can_be_disabled() {
        let dir = scratch("no_summary");
        let output = dir.join("report.docx");
        let report = CompReport::new(ReportConfig {
            write_summary: false,
            ..ReportConfig::default()
        });

        let result = report
            .finish(extraction(REPORT), &template(), Some(&output))
            .unwrap();
        assert!(result.summary.is_none());
        assert!(output.is_file());
        assert!(!dir.join("report.json").exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn no_comps_is_reported_with_a_preview() {
        let text = "Quarterly Market Overview\n".repeat(40);
        let result = CompReport::default().finish(extraction(&text), &template(), None);
        let Err(ReportError::NoRecordsFound { preview }) = result else {
            panic!("expected NoRecordsFound");
        };
        assert!(preview.starts_with("Quarterly Market Overview"));
        assert_eq!(preview.chars().count(), PREVIEW_CHARS);
    }

    #[test]
    fn unreadable_pdf_is_an_extract_error() {
        assert!(matches!(
            CompReport::default().generate(b"%PDF-nope", &template(), None),
            Err(ReportError::Extract(ExtractError::Unreadable(_)))
        ));
    }

    #[test]
    fn unreadable_template_is_a_render_error() {
        let dir = scratch("bad_template");
        let result = CompReport::default().finish(
            extraction(REPORT),
            b"not a docx",
            Some(&dir.join("report.docx")),
        );
        assert!(matches!(result, Err(ReportError::Render(DocxError::Zip(_)))));
        assert!(!dir.exists());
    }

    #[test]
    fn default_output_path_is_timestamped() {
        let report = CompReport::new(ReportConfig {
            output_dir: PathBuf::from("/tmp/out"),
            ..ReportConfig::default()
        });
        let path = report.default_output_path();
        assert_eq!(path.parent(), Some(Path::new("/tmp/out")));
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("Report_with_Comps_"));
        assert!(name.ends_with(".docx"));
        assert_eq!(name.len(), "Report_with_Comps_20240101_120000.docx".len());
    }

    #[test]
    fn summary_uses_the_six_lowest_ordinals() {
        let records: Vec<ComparableRecord> = (1..=8).rev().map(ComparableRecord::new).collect();
        let numbers: Vec<u32> = summarize(&records).iter().map(|s| s.comp_number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5, 6]);
    }
}
