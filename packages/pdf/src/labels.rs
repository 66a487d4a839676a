//! Field labels of the summary report layout and label-anchored value lookup.
//!
//! Extracted PDF text frequently puts two labeled fields on one line
//! (`Zoning: A-1 Off-Market: 07/12/2024`). A value therefore runs from the end
//! of its label to the start of the next recognized label on the same line,
//! or to the end of the line.

use std::sync::LazyLock;

use regex::Regex;

/// Every label the report layout uses, longest-first where one label is a
/// suffix or prefix of another so that the alternation picks the longer one.
const LABELS: &[&str] = &[
    "System ID:",
    "Primary Use:",
    "Months on Market:",
    "Sub-Market:",
    "Market:",
    "Comp SF:",
    "Sale Price/Acres:",
    "Sale Price/SF:",
    "Sale Price:",
    "Acres:",
    "Zoning:",
    "Off-Market:",
    "Parcel #:",
    "Lot Dimensions:",
    "Legal Description:",
    "Topography:",
    "Land Conditions:",
    "Gas:",
    "Water:",
    "Sewer:",
    "Power:",
    "Rail Status:",
];

/// Matches any label that starts a line or follows a character that cannot
/// be part of a longer label (so `Market:` never matches inside
/// `Sub-Market:`).
static LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    let alternation = LABELS
        .iter()
        .map(|l| regex::escape(l))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?:^|[^\w/\-])({alternation})")).expect("valid regex")
});

static MULTI_SPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]{2,}").expect("valid regex"));

static REPEATED_COLON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"::+").expect("valid regex"));

/// A label occurrence within a single line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelHit<'a> {
    /// The label text, e.g. `"Sale Price:"`.
    pub label: &'a str,
    /// Byte offset of the label's first character in the line.
    pub start: usize,
    /// Byte offset just past the label's colon.
    pub end: usize,
}

/// Returns the label occurrences in `line`, in order.
#[must_use]
pub fn hits(line: &str) -> Vec<LabelHit<'_>> {
    LABEL_RE
        .captures_iter(line)
        .filter_map(|caps| caps.get(1))
        .map(|m| LabelHit {
            label: m.as_str(),
            start: m.start(),
            end: m.end(),
        })
        .collect()
}

/// Whether `line` contains any recognized label.
#[must_use]
pub fn has_label(line: &str) -> bool {
    LABEL_RE.is_match(line)
}

/// Whether `line` begins (after indentation) with a recognized label.
#[must_use]
pub fn starts_with_label(line: &str) -> bool {
    let trimmed = line.trim_start();
    hits(trimmed).first().is_some_and(|h| h.start == 0)
}

/// Finds the raw value following `label` in `text`.
///
/// Returns the text between the label and the next label on the same line.
/// When that is empty, the next non-empty line is taken instead, provided it
/// does not itself start with a label.
#[must_use]
pub fn raw_value<'a>(text: &'a str, label: &str) -> Option<&'a str> {
    let lines: Vec<&str> = text.lines().collect();
    for (idx, line) in lines.iter().enumerate() {
        let line_hits = hits(line);
        let Some(pos) = line_hits.iter().position(|h| h.label == label) else {
            continue;
        };
        let hit = line_hits[pos];
        let end = line_hits.get(pos + 1).map_or(line.len(), |next| next.start);
        let value = line[hit.end..end].trim();
        if !value.is_empty() {
            return Some(value);
        }

        // Label alone at the end of its line: the value wrapped.
        if pos + 1 == line_hits.len() {
            return lines[idx + 1..]
                .iter()
                .map(|l| l.trim())
                .find(|l| !l.is_empty())
                .filter(|l| !starts_with_label(l));
        }
        return None;
    }
    None
}

/// Cleans a raw value: drops stray braces and repeated colons, collapses
/// whitespace runs and trims separators left over at either end.
#[must_use]
pub fn clean(value: &str) -> String {
    let value = value.replace(['{', '}'], "");
    let value = REPEATED_COLON_RE.replace_all(&value, "");
    let value = MULTI_SPACE_RE.replace_all(&value, " ");
    value
        .trim_matches(|c: char| c.is_whitespace() || c == ':' || c == '/')
        .to_owned()
}

/// Removes a trailing unit word (`"SF"`, `"Acres"`) from a cleaned value.
#[must_use]
pub fn strip_unit(value: &str, unit: &str) -> String {
    let trimmed = value.trim_end();
    let Some(split) = trimmed.len().checked_sub(unit.len()) else {
        return trimmed.to_owned();
    };
    if trimmed.is_char_boundary(split) && trimmed[split..].eq_ignore_ascii_case(unit) {
        let head = &trimmed[..split];
        if head.is_empty() || head.ends_with(|c: char| c.is_whitespace() || c.is_ascii_digit())
        {
            return head.trim_end().to_owned();
        }
    }
    trimmed.to_owned()
}

/// Looks up `label` and returns its cleaned value, if non-empty.
#[must_use]
pub fn value(text: &str, label: &str) -> Option<String> {
    raw_value(text, label)
        .map(clean)
        .filter(|v| !v.is_empty())
}
