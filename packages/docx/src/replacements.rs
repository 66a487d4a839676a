//! The keyword-to-value map applied to a template.

use std::collections::BTreeMap;
use std::path::PathBuf;

use comp_report_comp_models::{CompField, ComparableRecord, SLOT_COUNT, keyword};

/// Text and image substitutions keyed by their literal template keyword.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplacementMap {
    text: BTreeMap<String, String>,
    images: BTreeMap<String, PathBuf>,
}

impl ReplacementMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the comp map for `records`.
    ///
    /// Records are ordered by ordinal and the first [`SLOT_COUNT`] fill slots
    /// `comp1` onwards. Every text keyword of every slot is present, bound to
    /// the empty string when the slot or value is missing. A filled slot gets
    /// its image keyword only when its record has an image; an empty slot
    /// binds it to the empty string like every other keyword.
    #[must_use]
    pub fn from_records(records: &[ComparableRecord]) -> Self {
        let mut sorted: Vec<&ComparableRecord> = records.iter().collect();
        sorted.sort_by_key(|r| r.ordinal);
        if sorted.len() > SLOT_COUNT {
            log::warn!(
                "{} comps found, only the first {SLOT_COUNT} are used",
                sorted.len()
            );
        }

        let mut map = Self::new();
        for slot in 1..=SLOT_COUNT {
            let record = sorted.get(slot - 1).copied();
            for field in CompField::text_fields() {
                let value = record.map(|r| r.text(field)).unwrap_or_default();
                map.insert_text(keyword(slot, field), value);
            }
            match record {
                Some(r) => {
                    if let Some(path) = r.image.clone() {
                        map.insert_image(keyword(slot, CompField::Image), path);
                    }
                }
                None => map.insert_text(keyword(slot, CompField::Image), ""),
            }
        }
        map
    }

    pub fn insert_text(&mut self, keyword: impl Into<String>, value: impl Into<String>) {
        self.text.insert(keyword.into(), value.into());
    }

    pub fn insert_image(&mut self, keyword: impl Into<String>, path: impl Into<PathBuf>) {
        self.images.insert(keyword.into(), path.into());
    }

    #[must_use]
    pub const fn text(&self) -> &BTreeMap<String, String> {
        &self.text
    }

    #[must_use]
    pub const fn images(&self) -> &BTreeMap<String, PathBuf> {
        &self.images
    }

    #[must_use]
    pub fn get(&self, keyword: &str) -> Option<&str> {
        self.text.get(keyword).map(String::as_str)
    }

    /// Number of text keywords bound to a non-empty value.
    #[must_use]
    pub fn non_empty_count(&self) -> usize {
        self.text.values().filter(|v| !v.is_empty()).count()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.text.len() + self.images.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.images.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(ordinal: u32, name: &str) -> ComparableRecord {
        let mut record = ComparableRecord::new(ordinal);
        record.property_name = name.to_owned();
        record
    }

    #[test]
    fn map_is_total_even_without_records() {
        let map = ReplacementMap::from_records(&[]);
        assert_eq!(map.text().len(), SLOT_COUNT * CompField::all().len());
        assert_eq!(map.len(), SLOT_COUNT * 23);
        assert!(map.images().is_empty());
        assert_eq!(map.get("{{comp1_sale_price}}"), Some(""));
        assert_eq!(map.get("{{comp6_listing_broker_email}}"), Some(""));
        assert_eq!(map.get("{{comp3_image}}"), Some(""));
        assert_eq!(map.non_empty_count(), 0);
    }

    #[test]
    fn slots_follow_ordinal_order() {
        let records = [record(3, "C"), record(1, "A"), record(5, "E"), record(2, "B")];
        let map = ReplacementMap::from_records(&records);

        assert_eq!(map.text().len(), 4 * 22 + 2 * 23);
        assert_eq!(map.get("{{comp4_image}}"), None);
        assert_eq!(map.get("{{comp5_image}}"), Some(""));
        let names: Vec<&str> = (1..=4)
            .map(|slot| map.get(&keyword(slot, CompField::PropertyName)).unwrap())
            .collect();
        assert_eq!(names, vec!["A", "B", "C", "E"]);
        let numbers: Vec<&str> = (1..=5)
            .map(|slot| map.get(&keyword(slot, CompField::Number)).unwrap())
            .collect();
        assert_eq!(numbers, vec!["1", "2", "3", "5", ""]);
    }

    #[test]
    fn only_the_six_lowest_ordinals_are_used() {
        let records: Vec<ComparableRecord> =
            (1..=8).rev().map(|n| record(n, &format!("P{n}"))).collect();
        let map = ReplacementMap::from_records(&records);
        assert_eq!(map.get("{{comp6_property_name}}"), Some("P6"));
        assert!(map.text().values().all(|v| v != "P7" && v != "P8"));
    }

    #[test]
    fn image_keyword_only_when_an_image_exists() {
        let mut with_image = record(1, "A");
        with_image.image = Some(PathBuf::from("/tmp/comp_1.jpg"));
        let map = ReplacementMap::from_records(&[with_image, record(2, "B")]);
        assert_eq!(
            map.images().get("{{comp1_image}}"),
            Some(&PathBuf::from("/tmp/comp_1.jpg"))
        );
        assert!(!map.images().contains_key("{{comp2_image}}"));
        assert_eq!(map.get("{{comp2_image}}"), None);
        assert_eq!(map.len(), 2 * 22 + 4 * 23 + 1);
    }
}
