//! Per-field rules. Each check returns the issues for its own field(s) only.

use std::borrow::Cow;

use agrilink_core::{
    FarmAddressFormat, ListingStatus, ProductCategory, ProductImage, RuleTable, UnitOfMeasurement,
};
use chrono::{DateTime, Months, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;

use super::content;
use super::field;
use super::Issues;

fn prepare_text<'a>(raw: &'a str, rules: &RuleTable) -> Cow<'a, str> {
    if rules.sanitize_text {
        Cow::Owned(content::sanitize_text(raw))
    } else {
        Cow::Borrowed(raw)
    }
}

pub(crate) fn check_name(raw: &str, rules: &RuleTable) -> Issues {
    let mut issues = Issues::default();
    let text = prepare_text(raw, rules);

    if text.trim().is_empty() {
        issues.push(field::NAME, "Product name is required");
        return issues;
    }

    let len = text.chars().count();
    if len < rules.name_min_chars {
        issues.push(
            field::NAME,
            format!(
                "Product name must be at least {} characters",
                rules.name_min_chars
            ),
        );
    } else if len > rules.name_max_chars {
        issues.push(
            field::NAME,
            format!(
                "Product name must not exceed {} characters",
                rules.name_max_chars
            ),
        );
    }

    if rules.screen_content {
        if text.chars().all(|c| c.is_ascii_digit()) {
            issues.push(field::NAME, "Product name cannot be just numbers");
        }
        if content::has_inappropriate_language(&text) {
            issues.push(field::NAME, "Product name contains inappropriate content");
        }
    }

    issues
}

pub(crate) fn check_description(raw: &str, rules: &RuleTable) -> Issues {
    let mut issues = Issues::default();
    let text = prepare_text(raw, rules);

    if text.trim().is_empty() {
        issues.push(field::DESCRIPTION, "Description is required");
        return issues;
    }

    let len = text.chars().count();
    if len < rules.description_min_chars {
        issues.push(
            field::DESCRIPTION,
            format!(
                "Description must be at least {} characters",
                rules.description_min_chars
            ),
        );
    } else if len > rules.description_max_chars {
        issues.push(
            field::DESCRIPTION,
            format!(
                "Description must not exceed {} characters",
                rules.description_max_chars
            ),
        );
    }

    if rules.screen_content {
        if content::looks_like_spam(&text) {
            issues.push(
                field::DESCRIPTION,
                "Description contains suspicious content. Please remove phone numbers, URLs, or payment instructions.",
            );
        }
        if content::has_inappropriate_language(&text) {
            issues.push(field::DESCRIPTION, "Description contains inappropriate content");
        }
    }

    issues
}

pub(crate) fn check_category(raw: &str, rules: &RuleTable) -> Issues {
    let mut issues = Issues::default();
    let raw = raw.trim();
    if raw.is_empty() {
        issues.push(field::CATEGORY, "Category is required");
    } else if !ProductCategory::from_wire(raw).is_some_and(|c| rules.categories.contains(&c)) {
        issues.push(field::CATEGORY, "Invalid category selected");
    }
    issues
}

pub(crate) fn check_unit(raw: &str, rules: &RuleTable) -> Issues {
    let mut issues = Issues::default();
    if !UnitOfMeasurement::from_wire(raw.trim()).is_some_and(|u| rules.units.contains(&u)) {
        issues.push(field::UNIT_OF_MEASUREMENT, "Invalid unit of measurement");
    }
    issues
}

pub(crate) fn check_status(raw: &str, rules: &RuleTable) -> Issues {
    let mut issues = Issues::default();
    if !ListingStatus::from_wire(raw.trim()).is_some_and(|s| rules.statuses.contains(&s)) {
        issues.push(field::STATUS, "Invalid listing status");
    }
    issues
}

pub(crate) fn check_pricing(unit_price: Option<Decimal>, rules: &RuleTable) -> Issues {
    let mut issues = Issues::default();

    let Some(price) = unit_price else {
        issues.push(field::UNIT_PRICE, "Unit price is required");
        return issues;
    };

    if price.is_sign_negative() && !price.is_zero() {
        issues.push(field::UNIT_PRICE, "Unit price cannot be negative");
    } else if price.is_zero() {
        issues.push(field::UNIT_PRICE, "Unit price must be greater than zero");
    } else if rules.min_unit_price.is_some_and(|min| price < min) {
        issues.push(
            field::UNIT_PRICE,
            format!(
                "Unit price must be at least {}",
                rules.min_unit_price.unwrap_or_default()
            ),
        );
    } else if price > rules.max_unit_price {
        issues.push(
            field::UNIT_PRICE,
            format!(
                "Unit price seems unreasonably high (max: {})",
                group_thousands(rules.max_unit_price)
            ),
        );
    }

    if !price.is_zero() && decimal_places(price) > rules.max_price_decimal_places {
        issues.push(field::UNIT_PRICE, decimal_places_message(rules));
    }

    issues
}

pub(crate) fn decimal_places_message(rules: &RuleTable) -> String {
    format!(
        "Unit price should have at most {} decimal places",
        rules.max_price_decimal_places
    )
}

/// Significant fractional digits of `value`: trailing zeros do not count,
/// e.g. `0.001` → 3, `12.50` → 1, `100.00` → 0.
pub(crate) fn decimal_places(value: Decimal) -> u32 {
    value.normalize().scale()
}

fn group_thousands(value: Decimal) -> String {
    let digits = value.trunc().abs().normalize().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Quantity rules. With `required`, a missing value is an error; otherwise
/// missing values are skipped. The cross-field rule only runs when both
/// quantities are present and individually valid.
pub(crate) fn check_quantities(
    quantity_available: Option<i64>,
    minimum_order_quantity: Option<i64>,
    required: bool,
    rules: &RuleTable,
) -> Issues {
    let mut issues = Issues::default();

    match quantity_available {
        None if required => {
            issues.push(field::QUANTITY_AVAILABLE, "Quantity available is required");
        }
        Some(qty) if qty < 0 => {
            issues.push(
                field::QUANTITY_AVAILABLE,
                "Quantity available cannot be negative",
            );
        }
        Some(qty) if rules.max_quantity_available.is_some_and(|max| qty > max) => {
            issues.push(
                field::QUANTITY_AVAILABLE,
                format!(
                    "Quantity available cannot exceed {}",
                    rules.max_quantity_available.unwrap_or_default()
                ),
            );
        }
        _ => {}
    }

    match minimum_order_quantity {
        None if required => {
            issues.push(
                field::MINIMUM_ORDER_QUANTITY,
                "Minimum order quantity is required",
            );
        }
        Some(min) if min < 1 => {
            issues.push(
                field::MINIMUM_ORDER_QUANTITY,
                "Minimum order quantity must be at least 1",
            );
        }
        Some(min) if rules.max_minimum_order_quantity.is_some_and(|max| min > max) => {
            issues.push(
                field::MINIMUM_ORDER_QUANTITY,
                format!(
                    "Minimum order quantity cannot exceed {}",
                    rules.max_minimum_order_quantity.unwrap_or_default()
                ),
            );
        }
        _ => {}
    }

    if let (Some(qty), Some(min)) = (quantity_available, minimum_order_quantity) {
        let both_valid = !issues.has_field(field::QUANTITY_AVAILABLE)
            && !issues.has_field(field::MINIMUM_ORDER_QUANTITY);
        if both_valid && min > qty {
            issues.push(
                field::MINIMUM_ORDER_QUANTITY,
                "Minimum order quantity cannot exceed available quantity",
            );
        }
    }

    issues
}

pub(crate) fn check_farm_address(raw: &str, rules: &RuleTable) -> Issues {
    let mut issues = Issues::default();
    let raw = raw.trim();
    if raw.is_empty() {
        issues.push(field::FARM_ADDRESS, "Farm address is required");
    } else if rules.farm_address_format == FarmAddressFormat::ObjectId
        && !(raw.len() == 24 && raw.chars().all(|c| c.is_ascii_hexdigit()))
    {
        issues.push(field::FARM_ADDRESS, "Invalid farm address selection");
    }
    issues
}

pub(crate) fn check_images(images: &[ProductImage], rules: &RuleTable) -> Issues {
    let mut issues = Issues::default();

    if images.is_empty() {
        issues.push(field::IMAGES, "At least one product image is required");
        return issues;
    }

    if let Some(max) = rules.max_images {
        if images.len() > max {
            issues.push(field::IMAGES, format!("Maximum {max} images allowed"));
        }
    }

    if rules.require_primary_image && !images.iter().any(|img| img.is_primary) {
        issues.push(field::IMAGES, "One image must be marked as primary");
    }

    for (idx, image) in images.iter().enumerate() {
        let n = idx + 1;
        let url = image.url.trim();
        if url.is_empty() {
            issues.push(field::IMAGES, format!("Image {n} is missing a URL"));
        } else if !is_parseable_image_url(url) {
            issues.push(field::IMAGES, format!("Image {n} has an invalid URL"));
        } else if rules.require_secure_image_urls && !is_secure_image_url(url) {
            issues.push(field::IMAGES, format!("Image {n} must use a secure URL"));
        }

        if rules.require_image_filename && image.filename.trim().is_empty() {
            issues.push(field::IMAGES, format!("Image {n} is missing a filename"));
        }
    }

    issues
}

/// Accepts an absolute URL or a root-relative path (`/uploads/a.jpg`).
fn is_parseable_image_url(url: &str) -> bool {
    if is_root_relative(url) {
        return reqwest::Url::parse("https://root.invalid")
            .and_then(|base| base.join(url))
            .is_ok();
    }
    reqwest::Url::parse(url).is_ok()
}

fn is_root_relative(url: &str) -> bool {
    url.starts_with('/') && !url.starts_with("//")
}

fn is_secure_image_url(url: &str) -> bool {
    is_root_relative(url) || url.starts_with("https://")
}

/// Parses a calendar date from `YYYY-MM-DD` or a full timestamp (RFC 3339,
/// or a naive `YYYY-MM-DDTHH:MM:SS` read as UTC).
#[must_use]
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc).date_naive());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|ts| ts.date())
}

/// Blank strings count as absent, the same as a missing field.
fn present(raw: Option<&str>) -> Option<&str> {
    raw.filter(|s| !s.trim().is_empty())
}

pub(crate) fn check_dates(
    harvest_date: Option<&str>,
    expiry_date: Option<&str>,
    today: NaiveDate,
    rules: &RuleTable,
) -> Issues {
    let mut issues = Issues::default();

    let harvest = present(harvest_date).map(parse_calendar_date);
    let expiry = present(expiry_date).map(parse_calendar_date);

    match harvest {
        Some(None) => issues.push(field::HARVEST_DATE, "Invalid harvest date format"),
        Some(Some(date)) => {
            let latest = today.checked_add_months(Months::new(rules.max_harvest_lead_months));
            if latest.is_some_and(|latest| date > latest) {
                let window = if rules.max_harvest_lead_months == 12 {
                    "1 year".to_owned()
                } else {
                    format!("{} months", rules.max_harvest_lead_months)
                };
                issues.push(
                    field::HARVEST_DATE,
                    format!("Harvest date cannot be more than {window} in the future"),
                );
            }
        }
        None => {}
    }

    match expiry {
        Some(None) => issues.push(field::EXPIRY_DATE, "Invalid expiry date format"),
        Some(Some(date)) if date < today => {
            issues.push(field::EXPIRY_DATE, "Expiry date cannot be in the past");
        }
        _ => {}
    }

    if let (Some(Some(harvest)), Some(Some(expiry))) = (harvest, expiry) {
        if expiry <= harvest {
            issues.push(field::EXPIRY_DATE, "Expiry date must be after harvest date");
        }
    }

    issues
}

pub(crate) fn check_tags(tags: &[String], rules: &RuleTable) -> Issues {
    let mut issues = Issues::default();

    if tags.len() > rules.max_tags {
        issues.push(
            field::TAGS,
            format!("Maximum {} tags allowed", rules.max_tags),
        );
    }

    if let Some((min, max)) = rules.tag_chars {
        for tag in tags {
            let len = tag.trim().chars().count();
            if len < min || len > max {
                issues.push(
                    field::TAGS,
                    format!("Tag \"{tag}\" must be between {min} and {max} characters"),
                );
            }
        }
    }

    issues
}
