//! Boilerplate removal for concatenated report text.
//!
//! Summary reports repeat the same page furniture on every page: a legal
//! disclaimer ending in the page counter, the report title, a date stamp and
//! the vendor's name. Left in place these lines end up inside whichever
//! record happens to straddle the page break, so they are stripped before
//! segmentation.
//!
//! Removal only ever deletes text and is repeated until nothing changes, so
//! normalizing already-normalized text is a no-op.

use std::sync::LazyLock;

use regex::Regex;

/// The disclaimer block printed at the foot of every page, up to and
/// including its page counter.
static DISCLAIMER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)All information contained herein.*?Page \d+ of \d+").expect("valid regex")
});

/// A line that is nothing but a page counter.
static PAGE_COUNTER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Page \d+ of \d+$").expect("valid regex"));

/// A line that is nothing but a long-form date stamp ("July 15, 2024").
static DATE_STAMP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:January|February|March|April|May|June|July|August|September|October|November|December)\s+\d{1,2},\s*\d{4}$",
    )
    .expect("valid regex")
});

/// Title phrases removed wherever they appear.
const DEFAULT_TITLES: &[&str] = &["Land Comp Summary Report"];

/// Lines removed when they consist of nothing else (vendor banners).
const DEFAULT_BANNERS: &[&str] = &["Colliers"];

/// Strips recurring non-content text from report text.
#[derive(Debug, Clone)]
pub struct Normalizer {
    titles: Vec<String>,
    banners: Vec<String>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            titles: DEFAULT_TITLES.iter().map(|&s| s.to_owned()).collect(),
            banners: DEFAULT_BANNERS.iter().map(|&s| s.to_owned()).collect(),
        }
    }
}

impl Normalizer {
    /// Adds a stand-alone banner line (e.g. another vendor's name) to strip.
    #[must_use]
    pub fn with_banner(mut self, banner: &str) -> Self {
        let banner = banner.trim();
        if !banner.is_empty() {
            self.banners.push(banner.to_owned());
        }
        self
    }

    /// Removes boilerplate from `text`.
    #[must_use]
    pub fn normalize(&self, text: &str) -> String {
        let mut current = text.to_owned();
        loop {
            let next = self.pass(&current);
            if next == current {
                return current;
            }
            current = next;
        }
    }

    /// One removal pass. Never adds text, so repeated passes converge.
    fn pass(&self, text: &str) -> String {
        let mut text = DISCLAIMER_RE.replace_all(text, "").into_owned();
        for title in &self.titles {
            if text.contains(title.as_str()) {
                text = text.replace(title.as_str(), "");
            }
        }

        let mut out = String::with_capacity(text.len());
        for line in text.split_inclusive('\n') {
            if !self.is_furniture(line) {
                out.push_str(line);
            }
        }
        out
    }

    fn is_furniture(&self, line: &str) -> bool {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return false;
        }
        PAGE_COUNTER_RE.is_match(trimmed)
            || DATE_STAMP_RE.is_match(trimmed)
            || self.banners.iter().any(|b| b == trimmed)
    }
}
