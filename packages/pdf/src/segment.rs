//! Splits report text into per-record spans.
//!
//! Each comp starts with a numbered section heading such as
//! `3. Sold Land Property (Vacant)` or `12. Sold Land Space`. A record's span
//! runs from its heading to the next heading, or to the end of the text.

use std::sync::LazyLock;

use regex::Regex;

/// A record section heading. Group 1 is the printed ordinal, group 2 the
/// rest of the heading line after the optional parenthetical qualifier.
pub static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*(\d+)\.[ \t]+Sold Land (?:Property|Space)(?:[ \t]*\([^)\n]*\))?([^\n]*)")
        .expect("valid regex")
});

/// The text belonging to one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordSpan<'a> {
    /// The number printed in the heading.
    pub ordinal: u32,
    /// Whatever followed the heading on its line, trimmed.
    pub heading_rest: &'a str,
    /// The heading line and everything up to the next heading.
    pub text: &'a str,
}

/// Returns the ordinals of every heading in `text`, in order of appearance.
///
/// Headings whose number does not fit a `u32` are ignored.
#[must_use]
pub fn heading_ordinals(text: &str) -> Vec<u32> {
    HEADING_RE
        .captures_iter(text)
        .filter_map(|caps| caps[1].parse().ok())
        .collect()
}

/// Splits `text` into record spans. Text without any heading yields no spans.
#[must_use]
pub fn segment(text: &str) -> Vec<RecordSpan<'_>> {
    let mut starts = Vec::new();
    for caps in HEADING_RE.captures_iter(text) {
        let Ok(ordinal) = caps[1].parse::<u32>() else {
            log::warn!("Ignoring section heading with out-of-range number {}", &caps[1]);
            continue;
        };
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let heading_rest = caps.get(2).map_or("", |m| m.as_str().trim());
        starts.push((whole.start(), ordinal, heading_rest));
    }

    let spans: Vec<RecordSpan<'_>> = starts
        .iter()
        .enumerate()
        .map(|(i, &(start, ordinal, heading_rest))| {
            let end = starts.get(i + 1).map_or(text.len(), |next| next.0);
            RecordSpan {
                ordinal,
                heading_rest,
                text: &text[start..end],
            }
        })
        .collect();

    log::debug!("Found {} record heading(s)", spans.len());

    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_headings_means_no_spans() {
        assert!(segment("").is_empty());
        assert!(segment("Comp SF: 100\nSale Price: $5").is_empty());
        assert!(segment("Sold Land Property without a number").is_empty());
    }

    #[test]
    fn spans_run_to_the_next_heading() {
        let text = "intro\n1. Sold Land Property\nA: 1\n2. Sold Land Space (Pad)\nB: 2\n";
        let spans = segment(text);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].ordinal, 1);
        assert_eq!(spans[0].text, "1. Sold Land Property\nA: 1\n");
        assert_eq!(spans[1].ordinal, 2);
        assert_eq!(spans[1].text, "2. Sold Land Space (Pad)\nB: 2\n");
    }

    #[test]
    fn ordinal_is_the_printed_number() {
        let text = "7. Sold Land Property\nx\n3. Sold Land Property\ny\n11. Sold Land Space\nz";
        let ordinals: Vec<u32> = segment(text).iter().map(|s| s.ordinal).collect();
        assert_eq!(ordinals, vec![7, 3, 11]);
        assert_eq!(heading_ordinals(text), vec![7, 3, 11]);
    }

    #[test]
    fn heading_rest_skips_qualifier() {
        let spans = segment("4. Sold Land Property (Vacant) Riverside Parcel\nZoning: A");
        assert_eq!(spans[0].heading_rest, "Riverside Parcel");
    }

    #[test]
    fn heading_must_start_a_line() {
        let spans = segment("See comp 1. Sold Land Property above\n2. Sold Land Space\n");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].ordinal, 2);
    }

    #[test]
    fn oversized_numbers_are_skipped() {
        let spans = segment("99999999999. Sold Land Property\n5. Sold Land Property\n");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].ordinal, 5);
    }
}
