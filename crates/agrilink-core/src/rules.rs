//! The versioned validation rule table.
//!
//! Enumerations and numeric bounds used by the request validator live here
//! as data so they can be audited and tested without running the validator.
//! Bump [`RULES_VERSION`] whenever a bound or an enumeration changes.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::listing::{ListingStatus, ProductCategory, UnitOfMeasurement};

pub const RULES_VERSION: u32 = 1;

/// Named rule table variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationProfile {
    #[default]
    Standard,
    /// Tighter bounds plus text sanitizing and content screening.
    Strict,
}

impl ValidationProfile {
    #[must_use]
    pub fn rules(self) -> &'static RuleTable {
        match self {
            ValidationProfile::Standard => &STANDARD_RULES,
            ValidationProfile::Strict => &STRICT_RULES,
        }
    }
}

impl std::fmt::Display for ValidationProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationProfile::Standard => write!(f, "standard"),
            ValidationProfile::Strict => write!(f, "strict"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FarmAddressFormat {
    /// Any non-empty identifier.
    Opaque,
    /// 24 hexadecimal digits.
    ObjectId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleTable {
    pub version: u32,
    pub profile: ValidationProfile,
    pub categories: &'static [ProductCategory],
    pub units: &'static [UnitOfMeasurement],
    pub statuses: &'static [ListingStatus],

    pub name_min_chars: usize,
    pub name_max_chars: usize,
    pub description_min_chars: usize,
    pub description_max_chars: usize,

    /// Inclusive lower bound on top of the always-on `> 0` rule.
    pub min_unit_price: Option<Decimal>,
    pub max_unit_price: Decimal,
    pub max_price_decimal_places: u32,

    pub max_quantity_available: Option<i64>,
    pub max_minimum_order_quantity: Option<i64>,

    pub farm_address_format: FarmAddressFormat,

    pub max_images: Option<usize>,
    pub require_secure_image_urls: bool,
    pub require_image_filename: bool,
    pub require_primary_image: bool,

    /// How far after today a harvest date may lie.
    pub max_harvest_lead_months: u32,

    pub max_tags: usize,
    /// Inclusive per-tag character bounds.
    pub tag_chars: Option<(usize, usize)>,

    /// Trim, collapse whitespace and strip angle brackets before text checks.
    pub sanitize_text: bool,
    /// Reject contact details, payment instructions and profanity in text.
    pub screen_content: bool,
}

pub static STANDARD_RULES: RuleTable = RuleTable {
    version: RULES_VERSION,
    profile: ValidationProfile::Standard,
    categories: &ProductCategory::ALL,
    units: &UnitOfMeasurement::ALL,
    statuses: &ListingStatus::ALL,
    name_min_chars: 1,
    name_max_chars: 200,
    description_min_chars: 1,
    description_max_chars: 2000,
    min_unit_price: None,
    max_unit_price: Decimal::from_parts(10_000_000, 0, 0, false, 0),
    max_price_decimal_places: 2,
    max_quantity_available: None,
    max_minimum_order_quantity: None,
    farm_address_format: FarmAddressFormat::Opaque,
    max_images: None,
    require_secure_image_urls: false,
    require_image_filename: false,
    require_primary_image: false,
    max_harvest_lead_months: 12,
    max_tags: 10,
    tag_chars: None,
    sanitize_text: false,
    screen_content: false,
};

pub static STRICT_RULES: RuleTable = RuleTable {
    version: RULES_VERSION,
    profile: ValidationProfile::Strict,
    categories: &ProductCategory::ALL,
    units: &UnitOfMeasurement::ALL,
    statuses: &ListingStatus::ALL,
    name_min_chars: 3,
    name_max_chars: 100,
    description_min_chars: 20,
    description_max_chars: 2000,
    min_unit_price: Some(Decimal::ONE),
    max_unit_price: Decimal::from_parts(100_000_000, 0, 0, false, 0),
    max_price_decimal_places: 2,
    max_quantity_available: Some(1_000_000),
    max_minimum_order_quantity: Some(10_000),
    farm_address_format: FarmAddressFormat::ObjectId,
    max_images: Some(10),
    require_secure_image_urls: true,
    require_image_filename: true,
    require_primary_image: true,
    max_harvest_lead_months: 12,
    max_tags: 10,
    tag_chars: Some((2, 30)),
    sanitize_text: true,
    screen_content: true,
};
