//! Pre-flight validation of listing payloads.
//!
//! Every rule is evaluated; nothing short-circuits, so a single call reports
//! every problem in the payload at once. Validation never fails: it always
//! returns a [`ValidationResult`].
//!
//! The standalone sub-validators ([`validate_pricing`], [`validate_images`],
//! [`validate_dates`], [`validate_category`]) are the same functions the
//! full-object validator composes, so validating a single field while the
//! user types gives exactly the verdict the full submit would.

mod content;
mod fields;
mod form;
mod update;

use std::collections::BTreeMap;

use agrilink_core::{ListingDraft, ProductImage, ValidationProfile};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub use fields::parse_calendar_date;
pub use form::{coerce_listing_form, validate_listing_form, validate_listing_form_at};
pub use update::{validate_listing_update, validate_listing_update_at};

/// Field keys used in [`ValidationResult::field_errors`]; they match the
/// backend's payload field names.
pub mod field {
    pub const NAME: &str = "produceName";
    pub const DESCRIPTION: &str = "produceDescription";
    pub const CATEGORY: &str = "category";
    pub const UNIT_PRICE: &str = "unitPrice";
    pub const UNIT_OF_MEASUREMENT: &str = "unitOfMeasurement";
    pub const QUANTITY_AVAILABLE: &str = "quantityAvailable";
    pub const MINIMUM_ORDER_QUANTITY: &str = "minimumOrderQuantity";
    pub const FARM_ADDRESS: &str = "farmAddress";
    pub const IMAGES: &str = "images";
    pub const HARVEST_DATE: &str = "harvestDate";
    pub const EXPIRY_DATE: &str = "expiryDate";
    pub const TAGS: &str = "tags";
    pub const ORGANIC_CERTIFIED: &str = "organicCertified";
    pub const STATUS: &str = "status";
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_errors: Option<BTreeMap<String, Vec<String>>>,
}

impl ValidationResult {
    #[must_use]
    pub fn errors_for(&self, field: &str) -> &[String] {
        self.field_errors
            .as_ref()
            .and_then(|map| map.get(field))
            .map_or(&[], Vec::as_slice)
    }
}

/// Ordered, field-attributed problems collected while validating.
#[derive(Debug, Default)]
pub(crate) struct Issues {
    entries: Vec<(&'static str, String)>,
}

impl Issues {
    pub(crate) fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.entries.push((field, message.into()));
    }

    pub(crate) fn extend(&mut self, other: Issues) {
        self.entries.extend(other.entries);
    }

    pub(crate) fn has_field(&self, field: &str) -> bool {
        self.entries.iter().any(|(f, _)| *f == field)
    }

    /// Drops every issue attributed to one of `fields`.
    pub(crate) fn without_fields(mut self, fields: &[&str]) -> Self {
        self.entries.retain(|(f, _)| !fields.contains(f));
        self
    }

    pub(crate) fn into_result(self) -> ValidationResult {
        let mut field_errors: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut errors = Vec::with_capacity(self.entries.len());
        for (field, message) in self.entries {
            field_errors
                .entry(field.to_owned())
                .or_default()
                .push(message.clone());
            errors.push(message);
        }
        ValidationResult {
            is_valid: errors.is_empty(),
            errors,
            field_errors: (!field_errors.is_empty()).then_some(field_errors),
        }
    }
}

/// Validates a listing create payload against the profile's rule table,
/// using today's UTC date for the date rules.
#[must_use]
pub fn validate_listing(draft: &ListingDraft, profile: ValidationProfile) -> ValidationResult {
    validate_listing_at(draft, profile, Utc::now().date_naive())
}

/// Like [`validate_listing`] with an explicit reference date.
#[must_use]
pub fn validate_listing_at(
    draft: &ListingDraft,
    profile: ValidationProfile,
    today: NaiveDate,
) -> ValidationResult {
    check_draft(draft, profile, today).into_result()
}

pub(crate) fn check_draft(
    draft: &ListingDraft,
    profile: ValidationProfile,
    today: NaiveDate,
) -> Issues {
    let rules = profile.rules();
    let mut issues = Issues::default();

    issues.extend(fields::check_name(&draft.name, rules));
    issues.extend(fields::check_category(&draft.category, rules));
    issues.extend(fields::check_description(&draft.description, rules));
    issues.extend(fields::check_pricing(draft.unit_price, rules));
    issues.extend(fields::check_unit(&draft.unit_of_measurement, rules));
    issues.extend(fields::check_quantities(
        draft.quantity_available,
        draft.minimum_order_quantity,
        true,
        rules,
    ));
    issues.extend(fields::check_farm_address(&draft.farm_address, rules));
    issues.extend(fields::check_images(&draft.images, rules));
    issues.extend(fields::check_dates(
        draft.harvest_date.as_deref(),
        draft.expiry_date.as_deref(),
        today,
        rules,
    ));
    issues.extend(fields::check_tags(&draft.tags, rules));

    issues
}

#[must_use]
pub fn validate_pricing(
    unit_price: Option<Decimal>,
    profile: ValidationProfile,
) -> ValidationResult {
    fields::check_pricing(unit_price, profile.rules()).into_result()
}

#[must_use]
pub fn validate_images(images: &[ProductImage], profile: ValidationProfile) -> ValidationResult {
    fields::check_images(images, profile.rules()).into_result()
}

#[must_use]
pub fn validate_category(category: &str, profile: ValidationProfile) -> ValidationResult {
    fields::check_category(category, profile.rules()).into_result()
}

#[must_use]
pub fn validate_dates(
    harvest_date: Option<&str>,
    expiry_date: Option<&str>,
    profile: ValidationProfile,
) -> ValidationResult {
    validate_dates_at(harvest_date, expiry_date, profile, Utc::now().date_naive())
}

#[must_use]
pub fn validate_dates_at(
    harvest_date: Option<&str>,
    expiry_date: Option<&str>,
    profile: ValidationProfile,
    today: NaiveDate,
) -> ValidationResult {
    fields::check_dates(harvest_date, expiry_date, today, profile.rules()).into_result()
}

/// Repairs an image list so exactly one image is primary: the first image
/// already flagged keeps the flag, later flags are cleared, and with no
/// flag at all the first image becomes primary.
pub fn ensure_single_primary(images: &mut [ProductImage]) {
    let primary = images.iter().position(|img| img.is_primary).unwrap_or(0);
    for (idx, image) in images.iter_mut().enumerate() {
        image.is_primary = idx == primary;
    }
}

#[cfg(test)]
#[path = "validate_test.rs"]
mod tests;
