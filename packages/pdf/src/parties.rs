//! Party and broker contact scanning.
//!
//! The transaction parties are printed as a small table below the labeled
//! fields, one role per row:
//!
//! ```text
//! Role Company Name Phone Email
//! Seller/Landlord Canyon Holdings LLC
//! Buyer/Tenant Summit Development
//! Listing Broker
//! Wasatch Land Partners
//! Jane Doe
//! 801-555-1234 jane@wasatchland.com
//! ```
//!
//! Text extraction scatters each row over one or more lines, so a role is
//! located by its heading and the next few lines are scanned for an email
//! address, a phone number and name-like lines. The first match of each kind
//! wins.

use std::sync::LazyLock;

use regex::Regex;

use crate::labels;
use crate::segment::HEADING_RE;

/// Role headings of the parties table.
pub const SELLER_LANDLORD: &str = "Seller/Landlord";
pub const BUYER_TENANT: &str = "Buyer/Tenant";
pub const LISTING_BROKER: &str = "Listing Broker";
pub const PROCURING_BROKER: &str = "Procuring Broker";

const ROLES: &[&str] = &[SELLER_LANDLORD, BUYER_TENANT, LISTING_BROKER, PROCURING_BROKER];

/// Lines scanned after a role heading.
const SCAN_WINDOW: usize = 5;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\w.+\-]+@[\w\-]+(?:\.[\w\-]+)+").expect("valid regex"));

/// Three-three-four digit groupings with optional separators.
static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(?\b\d{3}\)?[\s.\-]?\d{3}[\s.\-]?\d{4}\b").expect("valid regex")
});

/// Table header words that never form part of a name.
static HEADER_WORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:role|company|name|phone|email|listing|procuring)\b")
        .expect("valid regex")
});

static NUMERIC_ONLY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\d\s.()+/\-]*$").expect("valid regex"));

/// What the lines following a role heading yielded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Contact {
    /// Name-like lines, in order of appearance.
    pub names: Vec<String>,
    /// First phone number found.
    pub phone: Option<String>,
    /// First email address found.
    pub email: Option<String>,
}

/// Scans the lines after the first `role` heading in `text`.
///
/// Returns `None` when the role heading does not occur at all.
#[must_use]
pub fn scan(text: &str, role: &str) -> Option<Contact> {
    let lines: Vec<&str> = text.lines().collect();
    let (idx, rest) = lines.iter().enumerate().find_map(|(i, line)| {
        role_position(line, role).map(|pos| (i, line[pos + role.len()..].trim()))
    })?;

    let mut contact = Contact::default();
    let candidates = std::iter::once(rest).chain(
        lines[idx + 1..]
            .iter()
            .take(SCAN_WINDOW)
            .take_while(|l| !is_stop_line(l))
            .map(|l| l.trim()),
    );

    for line in candidates {
        if line.is_empty() {
            continue;
        }
        let mut remainder = line.to_owned();
        if let Some(m) = EMAIL_RE.find(line) {
            if contact.email.is_none() {
                contact.email = Some(m.as_str().to_owned());
            }
            remainder = remainder.replace(m.as_str(), " ");
        }
        if let Some(m) = PHONE_RE.find(line) {
            if contact.phone.is_none() {
                contact.phone = Some(m.as_str().to_owned());
            }
            remainder = remainder.replace(m.as_str(), " ");
        }
        let remainder = remainder.split_whitespace().collect::<Vec<_>>().join(" ");
        if is_name_like(&remainder) {
            contact.names.push(remainder);
        }
    }

    log::debug!("{role}: {contact:?}");

    Some(contact)
}

/// Returns the first name-like value following `role`.
#[must_use]
pub fn party(text: &str, role: &str) -> Option<String> {
    scan(text, role).and_then(|c| c.names.into_iter().next())
}

/// Byte offset of `role` in `line`, if the line is a role row rather than the
/// table's header row.
fn role_position(line: &str, role: &str) -> Option<usize> {
    let pos = line.find(role)?;
    let before = line[..pos].trim();
    before.is_empty().then_some(pos)
}

fn is_stop_line(line: &str) -> bool {
    let trimmed = line.trim_start();
    ROLES.iter().any(|r| trimmed.starts_with(r))
        || labels::has_label(line)
        || HEADING_RE.is_match(line)
}

/// Contains a space or starts with a capital, and is not a header word, a
/// bare number, or part of an email address.
fn is_name_like(line: &str) -> bool {
    if line.is_empty()
        || line.contains('@')
        || NUMERIC_ONLY_RE.is_match(line)
        || HEADER_WORD_RE.is_match(line)
        || labels::has_label(line)
    {
        return false;
    }
    line.contains(' ')
        || (line.chars().next().is_some_and(char::is_uppercase) && line.chars().count() > 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "Role Company Name Phone Email\n\
        Seller/Landlord Canyon Holdings LLC\n\
        Buyer/Tenant\n\
        Summit Development\n\
        Listing Broker\n\
        Wasatch Land Partners\n\
        Jane Doe\n\
        801-555-1234 jane@wasatchland.com\n\
        Procuring Broker\n\
        Other Brokerage\n\
        Bob Smith 801.555.9999 bob@other.com\n";

    #[test]
    fn party_on_heading_line() {
        assert_eq!(
            party(TABLE, SELLER_LANDLORD).as_deref(),
            Some("Canyon Holdings LLC")
        );
    }

    #[test]
    fn party_on_following_line() {
        assert_eq!(
            party(TABLE, BUYER_TENANT).as_deref(),
            Some("Summit Development")
        );
    }

    #[test]
    fn broker_contact_stops_at_next_role() {
        let contact = scan(TABLE, LISTING_BROKER).unwrap();
        assert_eq!(contact.names, vec!["Wasatch Land Partners", "Jane Doe"]);
        assert_eq!(contact.phone.as_deref(), Some("801-555-1234"));
        assert_eq!(contact.email.as_deref(), Some("jane@wasatchland.com"));
    }

    #[test]
    fn contact_details_on_one_line() {
        let contact = scan(TABLE, PROCURING_BROKER).unwrap();
        assert_eq!(contact.names, vec!["Other Brokerage", "Bob Smith"]);
        assert_eq!(contact.phone.as_deref(), Some("801.555.9999"));
        assert_eq!(contact.email.as_deref(), Some("bob@other.com"));
    }

    #[test]
    fn missing_role_is_none() {
        assert!(scan("Zoning: A-1\n", LISTING_BROKER).is_none());
    }

    #[test]
    fn header_row_is_not_a_role_row() {
        let text = "Role Seller/Landlord Buyer/Tenant\nSeller/Landlord Acme Corp\n";
        assert_eq!(party(text, SELLER_LANDLORD).as_deref(), Some("Acme Corp"));
    }

    #[test]
    fn name_like_rules() {
        assert!(is_name_like("Jane Doe"));
        assert!(is_name_like("Acme"));
        assert!(!is_name_like("acme"));
        assert!(!is_name_like("Phone Email"));
        assert!(!is_name_like("801 555"));
        assert!(!is_name_like("Zoning: A-1"));
    }

    #[test]
    fn phone_with_parenthesized_area_code() {
        let contact = scan("Listing Broker\nAcme Realty\n(801) 555-1234\n", LISTING_BROKER).unwrap();
        assert_eq!(contact.phone.as_deref(), Some("(801) 555-1234"));
        assert_eq!(contact.names, vec!["Acme Realty"]);
    }
}
