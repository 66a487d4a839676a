//! Per-record field rules.
//!
//! Every field is produced by an independent rule `fn(&RecordSpan) ->
//! Option<String>`; a rule that finds nothing leaves the field empty and has
//! no effect on the others. Values are kept as printed: currency symbols and
//! thousands separators survive, only stray braces, duplicate colons and
//! redundant unit suffixes are removed.

use std::sync::LazyLock;

use comp_report_comp_models::{CompField, ComparableRecord};
use regex::Regex;

use crate::RecordError;
use crate::labels;
use crate::parties;
use crate::segment::RecordSpan;

/// A field rule: inspects one record span and maybe yields a value.
pub type FieldRule = fn(&RecordSpan<'_>) -> Option<String>;

/// The rules applied to every record span, one per extracted field.
pub const RULES: &[(CompField, FieldRule)] = &[
    (CompField::PropertyName, property_name),
    (CompField::PrimaryUse, primary_use),
    (CompField::Address, address),
    (CompField::Market, market),
    (CompField::SubMarket, sub_market),
    (CompField::CompSf, comp_sf),
    (CompField::Acres, acres),
    (CompField::SalePrice, sale_price),
    (CompField::SalePriceSf, sale_price_sf),
    (CompField::SalePriceAcres, sale_price_acres),
    (CompField::Zoning, zoning),
    (CompField::ParcelNumber, parcel_number),
    (CompField::OffMarketDate, off_market_date),
    (CompField::MonthsOnMarket, months_on_market),
    (CompField::Topography, topography),
    (CompField::SellerLandlord, seller_landlord),
    (CompField::BuyerTenant, buyer_tenant),
    (CompField::ListingBroker, listing_broker_name),
    (CompField::ListingBrokerCompany, listing_broker_company),
    (CompField::ListingBrokerPhone, listing_broker_phone),
    (CompField::ListingBrokerEmail, listing_broker_email),
];

/// Maximum number of lines kept when the address is rebuilt line by line.
const MAX_ADDRESS_LINES: usize = 3;

/// The property name follows the closing parenthesis of the system id.
static PROPERTY_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"System ID:\s*\d+\)\s*([^\n]+)").expect("valid regex")
});

/// A complete one-line address: `number street, city, ST 12345`.
static FULL_ADDRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d+[^,\n]+,\s*[^,\n]+,\s*[A-Z]{2}\s+\d{5}(?:-\d{4})?").expect("valid regex")
});

static STREET_TYPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:street|st|avenue|ave|road|rd|drive|dr|lane|ln|way|blvd|boulevard|highway|hwy|parkway|pkwy|circle|cir|court|ct|place|pl)\b",
    )
    .expect("valid regex")
});

static CITY_STATE_ZIP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*[A-Z]{2}\s+\d{5}").expect("valid regex"));

/// Builds a record from its span by running every rule.
///
/// # Errors
///
/// Returns [`RecordError::NoFields`] when no rule matched anything, which is
/// what a stray heading (e.g. a table of contents entry) looks like.
pub fn parse_record(span: &RecordSpan<'_>) -> Result<ComparableRecord, RecordError> {
    let mut record = ComparableRecord::new(span.ordinal);
    let mut found = 0_usize;

    for &(field, rule) in RULES {
        if let Some(value) = rule(span) {
            log::trace!("comp {} {field}: {value:?}", span.ordinal);
            record.set_text(field, value);
            found += 1;
        }
    }

    if found == 0 {
        return Err(RecordError::NoFields {
            ordinal: span.ordinal,
        });
    }

    log::debug!("Parsed comp {} with {found} field(s)", span.ordinal);

    Ok(record)
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

/// Name after `System ID: NNNN)`, else whatever trailed the heading.
#[must_use]
pub fn property_name(span: &RecordSpan<'_>) -> Option<String> {
    PROPERTY_NAME_RE
        .captures(span.text)
        .and_then(|caps| caps.get(1))
        .map(|m| before_label(m.as_str()))
        .map(labels::clean)
        .and_then(non_empty)
        .or_else(|| {
            Some(labels::clean(span.heading_rest))
                .filter(|v| v.chars().any(char::is_alphanumeric))
        })
}

/// The part of `line` ahead of its first field label.
fn before_label(line: &str) -> &str {
    labels::hits(line).first().map_or(line, |hit| &line[..hit.start])
}

#[must_use]
pub fn primary_use(span: &RecordSpan<'_>) -> Option<String> {
    labels::value(span.text, "Primary Use:")
}

/// Tries a complete one-line address first, then rebuilds the address from
/// the lines between `Primary Use:` and `Market:`.
#[must_use]
pub fn address(span: &RecordSpan<'_>) -> Option<String> {
    if let Some(m) = FULL_ADDRESS_RE.find(span.text) {
        return non_empty(m.as_str().trim().to_owned());
    }

    let mut in_section = false;
    let mut parts = Vec::new();
    for line in span.text.lines() {
        let line = line.trim();
        let hits = labels::hits(line);
        if hits.iter().any(|h| h.label == "Primary Use:") {
            in_section = true;
            continue;
        }
        if hits.iter().any(|h| h.label == "Market:") {
            break;
        }
        if !in_section || line.is_empty() || !hits.is_empty() {
            continue;
        }
        if looks_like_address(line) {
            parts.push(line);
            if parts.len() == MAX_ADDRESS_LINES {
                break;
            }
        }
    }

    non_empty(parts.join("\n"))
}

fn looks_like_address(line: &str) -> bool {
    line.chars().any(|c| c.is_ascii_digit())
        || STREET_TYPE_RE.is_match(line)
        || CITY_STATE_ZIP_RE.is_match(line)
}

#[must_use]
pub fn market(span: &RecordSpan<'_>) -> Option<String> {
    labels::value(span.text, "Market:")
}

#[must_use]
pub fn sub_market(span: &RecordSpan<'_>) -> Option<String> {
    labels::value(span.text, "Sub-Market:")
}

#[must_use]
pub fn comp_sf(span: &RecordSpan<'_>) -> Option<String> {
    labels::value(span.text, "Comp SF:")
        .map(|v| labels::strip_unit(&v, "SF"))
        .and_then(non_empty)
}

#[must_use]
pub fn acres(span: &RecordSpan<'_>) -> Option<String> {
    labels::value(span.text, "Acres:")
        .map(|v| labels::strip_unit(&v, "Acres"))
        .and_then(non_empty)
}

#[must_use]
pub fn sale_price(span: &RecordSpan<'_>) -> Option<String> {
    labels::value(span.text, "Sale Price:")
}

#[must_use]
pub fn sale_price_sf(span: &RecordSpan<'_>) -> Option<String> {
    labels::value(span.text, "Sale Price/SF:")
}

#[must_use]
pub fn sale_price_acres(span: &RecordSpan<'_>) -> Option<String> {
    labels::value(span.text, "Sale Price/Acres:")
}

#[must_use]
pub fn zoning(span: &RecordSpan<'_>) -> Option<String> {
    labels::value(span.text, "Zoning:")
}

#[must_use]
pub fn parcel_number(span: &RecordSpan<'_>) -> Option<String> {
    labels::value(span.text, "Parcel #:")
}

#[must_use]
pub fn off_market_date(span: &RecordSpan<'_>) -> Option<String> {
    labels::value(span.text, "Off-Market:")
}

#[must_use]
pub fn months_on_market(span: &RecordSpan<'_>) -> Option<String> {
    labels::value(span.text, "Months on Market:")
}

#[must_use]
pub fn topography(span: &RecordSpan<'_>) -> Option<String> {
    labels::value(span.text, "Topography:")
}

#[must_use]
pub fn seller_landlord(span: &RecordSpan<'_>) -> Option<String> {
    parties::party(span.text, parties::SELLER_LANDLORD)
}

#[must_use]
pub fn buyer_tenant(span: &RecordSpan<'_>) -> Option<String> {
    parties::party(span.text, parties::BUYER_TENANT)
}

/// The listing broker's second name-like line; the first is the company.
#[must_use]
pub fn listing_broker_name(span: &RecordSpan<'_>) -> Option<String> {
    parties::scan(span.text, parties::LISTING_BROKER).and_then(|c| c.names.into_iter().nth(1))
}

#[must_use]
pub fn listing_broker_company(span: &RecordSpan<'_>) -> Option<String> {
    parties::scan(span.text, parties::LISTING_BROKER).and_then(|c| c.names.into_iter().next())
}

#[must_use]
pub fn listing_broker_phone(span: &RecordSpan<'_>) -> Option<String> {
    parties::scan(span.text, parties::LISTING_BROKER).and_then(|c| c.phone)
}

#[must_use]
pub fn listing_broker_email(span: &RecordSpan<'_>) -> Option<String> {
    parties::scan(span.text, parties::LISTING_BROKER).and_then(|c| c.email)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::segment;

    const REPORT: &str = "1. Sold Land Property (Vacant)\n\
        System ID: 4821)\n\
        Office Building\n\
        Primary Use: Office\n\
        123 Main St\n\
        Provo, UT 84601\n\
        Market: Provo/Orem / Sub-Market: Central\n\
        Comp SF: 12,000 SF\n\
        Sale Price: $1,200,000\n\
        2. Sold Land Space ...";

    fn first_record(text: &str) -> ComparableRecord {
        let spans = segment(text);
        parse_record(&spans[0]).unwrap()
    }

    #[test]
    fn parses_the_reference_record() {
        let record = first_record(REPORT);
        assert_eq!(record.ordinal, 1);
        assert_eq!(record.property_name, "Office Building");
        assert_eq!(record.primary_use, "Office");
        assert!(record.address.contains("123 Main St"));
        assert!(record.address.contains("Provo, UT 84601"));
        assert_eq!(record.market, "Provo/Orem");
        assert_eq!(record.sub_market, "Central");
        assert_eq!(record.comp_sf, "12,000");
        assert_eq!(record.sale_price, "$1,200,000");
        assert_eq!(record.zoning, "");
    }

    #[test]
    fn heading_only_span_has_no_fields() {
        let spans = segment(REPORT);
        assert_eq!(spans[1].ordinal, 2);
        assert!(matches!(
            parse_record(&spans[1]),
            Err(RecordError::NoFields { ordinal: 2 })
        ));
    }

    #[test]
    fn one_line_address_wins() {
        let text = "3. Sold Land Property\n\
            Primary Use: Land\n\
            Parcel ref 12\n\
            Market: Salt Lake\n\
            Located at 455 W 200 S, Salt Lake City, UT 84101 near downtown\n";
        let record = first_record(text);
        assert_eq!(record.address, "455 W 200 S, Salt Lake City, UT 84101");
    }

    #[test]
    fn address_lines_skip_labels_and_non_addresses() {
        let text = "5. Sold Land Property\n\
            Primary Use: Industrial\n\
            Gas: Yes\n\
            North Lot\n\
            900 Industrial Way\n\
            Suite B\n\
            Ogden, UT 84401\n\
            Lindon\n\
            Market: Ogden\n";
        let record = first_record(text);
        assert_eq!(record.address, "900 Industrial Way\nOgden, UT 84401");
    }

    #[test]
    fn address_keeps_at_most_three_lines() {
        let text = "6. Sold Land Property\n\
            Primary Use: Retail\n\
            1 A St\n2 B St\n3 C St\n4 D St\n\
            Market: Provo\n";
        assert_eq!(first_record(text).address, "1 A St\n2 B St\n3 C St");
    }

    #[test]
    fn combined_lines_are_split_at_labels() {
        let text = "8. Sold Land Property\n\
            Acres: 2.75 Acres Sale Price/Acres: $436,364\n\
            Sale Price/SF: $10.02\n\
            Zoning: C-2 Off-Market: 07/12/2024\n\
            Parcel #: 14:062:0011 Lot Dimensions: 200x600\n\
            Months on Market: 14\n\
            Topography: Level Land Conditions: Graded\n";
        let record = first_record(text);
        assert_eq!(record.acres, "2.75");
        assert_eq!(record.sale_price_acres, "$436,364");
        assert_eq!(record.sale_price_sf, "$10.02");
        assert_eq!(record.zoning, "C-2");
        assert_eq!(record.off_market_date, "07/12/2024");
        assert_eq!(record.parcel_number, "14:062:0011");
        assert_eq!(record.months_on_market, "14");
        assert_eq!(record.topography, "Level");
    }

    #[test]
    fn property_name_falls_back_to_heading() {
        let record = first_record("9. Sold Land Property (Vacant) Riverside Parcel\nZoning: A-1\n");
        assert_eq!(record.property_name, "Riverside Parcel");
    }

    #[test]
    fn property_name_never_takes_a_labeled_line() {
        let record =
            first_record("1. Sold Land Property\nSystem ID: 4821)\nPrimary Use: Land\nZoning: A-1\n");
        assert_eq!(record.property_name, "");
        assert_eq!(record.primary_use, "Land");

        let record = first_record(
            "2. Sold Land Property (Vacant) North Lot\nSystem ID: 77)\nZoning: A-1\n",
        );
        assert_eq!(record.property_name, "North Lot");

        let record = first_record("3. Sold Land Property\nSystem ID: 78) Mill Site Zoning: M-1\n");
        assert_eq!(record.property_name, "Mill Site");
    }

    #[test]
    fn parties_and_broker() {
        let text = "4. Sold Land Property\n\
            Zoning: R-1\n\
            Role Company Name Phone Email\n\
            Seller/Landlord Canyon Holdings LLC\n\
            Buyer/Tenant Summit Development\n\
            Listing Broker Wasatch Land Partners\n\
            Jane Doe\n\
            801-555-1234\n\
            jane@wasatchland.com\n";
        let record = first_record(text);
        assert_eq!(record.seller_landlord, "Canyon Holdings LLC");
        assert_eq!(record.buyer_tenant, "Summit Development");
        assert_eq!(record.listing_broker.company, "Wasatch Land Partners");
        assert_eq!(record.listing_broker.name, "Jane Doe");
        assert_eq!(record.listing_broker.phone, "801-555-1234");
        assert_eq!(record.listing_broker.email, "jane@wasatchland.com");
    }
}
