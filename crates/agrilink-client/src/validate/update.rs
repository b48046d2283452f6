//! Partial update validation: the draft rules, applied only to fields the
//! update actually sets.

use agrilink_core::{ListingUpdate, ValidationProfile};
use chrono::{NaiveDate, Utc};

use super::{fields, Issues, ValidationResult};

#[must_use]
pub fn validate_listing_update(
    update: &ListingUpdate,
    profile: ValidationProfile,
) -> ValidationResult {
    validate_listing_update_at(update, profile, Utc::now().date_naive())
}

#[must_use]
pub fn validate_listing_update_at(
    update: &ListingUpdate,
    profile: ValidationProfile,
    today: NaiveDate,
) -> ValidationResult {
    let rules = profile.rules();
    let mut issues = Issues::default();

    if let Some(name) = &update.name {
        issues.extend(fields::check_name(name, rules));
    }
    if let Some(category) = &update.category {
        issues.extend(fields::check_category(category, rules));
    }
    if let Some(description) = &update.description {
        issues.extend(fields::check_description(description, rules));
    }
    if update.unit_price.is_some() {
        issues.extend(fields::check_pricing(update.unit_price, rules));
    }
    if let Some(unit) = &update.unit_of_measurement {
        issues.extend(fields::check_unit(unit, rules));
    }
    issues.extend(fields::check_quantities(
        update.quantity_available,
        update.minimum_order_quantity,
        false,
        rules,
    ));
    if let Some(farm_address) = &update.farm_address {
        issues.extend(fields::check_farm_address(farm_address, rules));
    }
    if let Some(images) = &update.images {
        issues.extend(fields::check_images(images, rules));
    }
    issues.extend(fields::check_dates(
        update.harvest_date.as_deref(),
        update.expiry_date.as_deref(),
        today,
        rules,
    ));
    if let Some(tags) = &update.tags {
        issues.extend(fields::check_tags(tags, rules));
    }
    if let Some(status) = &update.status {
        issues.extend(fields::check_status(status, rules));
    }

    issues.into_result()
}
