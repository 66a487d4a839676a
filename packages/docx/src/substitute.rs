//! Keyword substitution over the paragraphs of a parsed part.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::media::MediaWriter;
use crate::package::Package;
use crate::part::Part;

/// Prepares a value for display: double hyphens become an en dash.
#[must_use]
pub fn display_value(value: &str) -> String {
    value.replace("--", "\u{2013}")
}

/// Replaces every text keyword in `part`, returning the number of
/// occurrences replaced. Keywords are matched literally, whatever their
/// delimiters.
pub fn substitute_text(part: &mut Part, text: &BTreeMap<String, String>) -> usize {
    let mut replaced = 0;
    for paragraph in part.paragraphs_mut() {
        let content = paragraph.text();
        if content.is_empty() {
            continue;
        }
        for (keyword, value) in text {
            if content.contains(keyword.as_str()) {
                replaced += paragraph.replace(keyword, &display_value(value));
            }
        }
    }
    replaced
}

/// Replaces image keywords in `part` with inline pictures, returning the
/// number inserted.
///
/// The keyword is removed from its paragraph and the picture appended to
/// it. When the image file is missing or unreadable the keyword is left in
/// place.
pub fn insert_images(
    part: &mut Part,
    part_name: &str,
    images: &BTreeMap<String, PathBuf>,
    package: &mut Package,
    media: &mut MediaWriter,
) -> usize {
    if images.is_empty() {
        return 0;
    }

    let mut inserted = 0;
    for paragraph in part.paragraphs_mut() {
        let content = paragraph.text();
        if content.is_empty() {
            continue;
        }
        for (keyword, path) in images {
            if !content.contains(keyword.as_str()) {
                continue;
            }
            if !path.is_file() {
                log::warn!("Image for {keyword} not found at {}", path.display());
                continue;
            }
            match media.add_picture(package, part_name, path) {
                Ok(xml) => {
                    paragraph.replace(keyword, "");
                    paragraph.push_raw(xml);
                    inserted += 1;
                    log::info!("Replaced {keyword} with {}", path.display());
                }
                Err(e) => log::error!("Failed to insert image for {keyword}: {e}"),
            }
        }
    }
    inserted
}
