#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Comparable-property record types and template keyword definitions.
//!
//! A [`ComparableRecord`] is one "comp" pulled out of a land sale summary
//! report. Every text field defaults to the empty string so that template
//! substitution never has to deal with a missing value. [`CompField`] names
//! the per-comp fields exactly as they appear in template keywords such as
//! `{{comp1_sale_price}}`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Number of comp slots a report template exposes (`comp1` .. `comp6`).
pub const SLOT_COUNT: usize = 6;

/// A field of a comparable record, named as it appears in template keywords.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CompField {
    /// The comp's ordinal in the source report
    Number,
    /// Property or building name
    PropertyName,
    /// Street address, possibly several lines
    Address,
    /// Primary use (e.g. "Land", "Office")
    PrimaryUse,
    /// Market name
    Market,
    /// Sub-market name
    SubMarket,
    /// Comparable square footage
    CompSf,
    /// Lot size in acres
    Acres,
    /// Sale price, verbatim (e.g. "$1,200,000")
    SalePrice,
    /// Sale price per square foot
    SalePriceSf,
    /// Sale price per acre
    SalePriceAcres,
    /// Zoning designation
    Zoning,
    /// Parcel number(s)
    ParcelNumber,
    /// Off-market date
    OffMarketDate,
    /// Months on market
    MonthsOnMarket,
    /// Topography description
    Topography,
    /// Seller or landlord party
    SellerLandlord,
    /// Buyer or tenant party
    BuyerTenant,
    /// Listing broker's name
    ListingBroker,
    /// Listing broker's company
    ListingBrokerCompany,
    /// Listing broker's phone number
    ListingBrokerPhone,
    /// Listing broker's email address
    ListingBrokerEmail,
    /// Photo of the property
    Image,
}

impl CompField {
    /// Returns all variants of this enum, in template order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Number,
            Self::PropertyName,
            Self::Address,
            Self::PrimaryUse,
            Self::Market,
            Self::SubMarket,
            Self::CompSf,
            Self::Acres,
            Self::SalePrice,
            Self::SalePriceSf,
            Self::SalePriceAcres,
            Self::Zoning,
            Self::ParcelNumber,
            Self::OffMarketDate,
            Self::MonthsOnMarket,
            Self::Topography,
            Self::SellerLandlord,
            Self::BuyerTenant,
            Self::ListingBroker,
            Self::ListingBrokerCompany,
            Self::ListingBrokerPhone,
            Self::ListingBrokerEmail,
            Self::Image,
        ]
    }

    /// Returns every field that is substituted as text (all but
    /// [`CompField::Image`]).
    pub fn text_fields() -> impl Iterator<Item = Self> {
        Self::all().iter().copied().filter(|f| !f.is_image())
    }

    /// Whether this field is rendered as a picture rather than text.
    #[must_use]
    pub const fn is_image(self) -> bool {
        matches!(self, Self::Image)
    }
}

/// Builds the template keyword for `field` in comp slot `slot` (1-based).
///
/// ```
/// use comp_report_comp_models::{CompField, keyword};
///
/// assert_eq!(keyword(1, CompField::SalePrice), "{{comp1_sale_price}}");
/// ```
#[must_use]
pub fn keyword(slot: usize, field: CompField) -> String {
    format!("{{{{comp{slot}_{field}}}}}")
}

/// Contact details of the listing broker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingBroker {
    /// Broker's name.
    pub name: String,
    /// Brokerage company.
    pub company: String,
    /// Phone number as printed.
    pub phone: String,
    /// Email address.
    pub email: String,
}

/// One comparable property extracted from a report.
///
/// Values are kept verbatim as printed in the report; nothing is parsed to a
/// number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparableRecord {
    /// Number printed in the record's section heading. Unique within one
    /// extraction but not necessarily consecutive.
    pub ordinal: u32,
    pub property_name: String,
    pub primary_use: String,
    /// Reconstructed address, one line per `\n`.
    pub address: String,
    pub market: String,
    pub sub_market: String,
    pub comp_sf: String,
    pub acres: String,
    pub sale_price: String,
    pub sale_price_sf: String,
    pub sale_price_acres: String,
    pub zoning: String,
    pub parcel_number: String,
    pub off_market_date: String,
    pub months_on_market: String,
    pub topography: String,
    pub seller_landlord: String,
    pub buyer_tenant: String,
    pub listing_broker: ListingBroker,
    /// Saved photo of the property, if the report had one.
    pub image: Option<PathBuf>,
}

impl ComparableRecord {
    /// Creates an empty record for the given ordinal.
    #[must_use]
    pub fn new(ordinal: u32) -> Self {
        Self {
            ordinal,
            ..Self::default()
        }
    }

    /// Returns the text value of `field`.
    ///
    /// [`CompField::Number`] is the ordinal and [`CompField::Image`] is the
    /// image path, or empty when there is none.
    #[must_use]
    pub fn text(&self, field: CompField) -> String {
        match field {
            CompField::Number => self.ordinal.to_string(),
            CompField::Image => self
                .image
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            _ => self.text_ref(field).map(str::to_owned).unwrap_or_default(),
        }
    }

    /// Sets the text value of `field`.
    ///
    /// Setting [`CompField::Number`] or [`CompField::Image`] is a no-op; the
    /// ordinal is fixed at construction and images are attached by path.
    pub fn set_text(&mut self, field: CompField, value: String) {
        let slot = match field {
            CompField::Number | CompField::Image => return,
            CompField::PropertyName => &mut self.property_name,
            CompField::Address => &mut self.address,
            CompField::PrimaryUse => &mut self.primary_use,
            CompField::Market => &mut self.market,
            CompField::SubMarket => &mut self.sub_market,
            CompField::CompSf => &mut self.comp_sf,
            CompField::Acres => &mut self.acres,
            CompField::SalePrice => &mut self.sale_price,
            CompField::SalePriceSf => &mut self.sale_price_sf,
            CompField::SalePriceAcres => &mut self.sale_price_acres,
            CompField::Zoning => &mut self.zoning,
            CompField::ParcelNumber => &mut self.parcel_number,
            CompField::OffMarketDate => &mut self.off_market_date,
            CompField::MonthsOnMarket => &mut self.months_on_market,
            CompField::Topography => &mut self.topography,
            CompField::SellerLandlord => &mut self.seller_landlord,
            CompField::BuyerTenant => &mut self.buyer_tenant,
            CompField::ListingBroker => &mut self.listing_broker.name,
            CompField::ListingBrokerCompany => &mut self.listing_broker.company,
            CompField::ListingBrokerPhone => &mut self.listing_broker.phone,
            CompField::ListingBrokerEmail => &mut self.listing_broker.email,
        };
        *slot = value;
    }

    fn text_ref(&self, field: CompField) -> Option<&str> {
        let value = match field {
            CompField::Number | CompField::Image => return None,
            CompField::PropertyName => &self.property_name,
            CompField::Address => &self.address,
            CompField::PrimaryUse => &self.primary_use,
            CompField::Market => &self.market,
            CompField::SubMarket => &self.sub_market,
            CompField::CompSf => &self.comp_sf,
            CompField::Acres => &self.acres,
            CompField::SalePrice => &self.sale_price,
            CompField::SalePriceSf => &self.sale_price_sf,
            CompField::SalePriceAcres => &self.sale_price_acres,
            CompField::Zoning => &self.zoning,
            CompField::ParcelNumber => &self.parcel_number,
            CompField::OffMarketDate => &self.off_market_date,
            CompField::MonthsOnMarket => &self.months_on_market,
            CompField::Topography => &self.topography,
            CompField::SellerLandlord => &self.seller_landlord,
            CompField::BuyerTenant => &self.buyer_tenant,
            CompField::ListingBroker => &self.listing_broker.name,
            CompField::ListingBrokerCompany => &self.listing_broker.company,
            CompField::ListingBrokerPhone => &self.listing_broker.phone,
            CompField::ListingBrokerEmail => &self.listing_broker.email,
        };
        Some(value.as_str())
    }
}
