//! Coercion of raw, string-typed form state into a [`ListingDraft`].
//!
//! A value that is present but cannot be coerced is reported as a field
//! error and replaces the ordinary rules for that field, so the user sees
//! one coherent message per field instead of "invalid" plus "required".

use std::str::FromStr;

use agrilink_core::{ListingDraft, ListingForm, RuleTable, ValidationProfile};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;

use super::{check_draft, field, fields, Issues, ValidationResult};

/// Coerces `form` into a draft. The returned [`ValidationResult`] holds only
/// coercion failures; it is valid when every field could be coerced.
#[must_use]
pub fn coerce_listing_form(
    form: &ListingForm,
    profile: ValidationProfile,
) -> (ListingDraft, ValidationResult) {
    let (draft, issues) = coerce(form, profile.rules());
    (draft, issues.into_result())
}

#[must_use]
pub fn validate_listing_form(form: &ListingForm, profile: ValidationProfile) -> ValidationResult {
    validate_listing_form_at(form, profile, Utc::now().date_naive())
}

#[must_use]
pub fn validate_listing_form_at(
    form: &ListingForm,
    profile: ValidationProfile,
    today: NaiveDate,
) -> ValidationResult {
    let (draft, mut issues) = coerce(form, profile.rules());

    let coerced_fields: Vec<&str> = [
        field::UNIT_PRICE,
        field::QUANTITY_AVAILABLE,
        field::MINIMUM_ORDER_QUANTITY,
        field::ORGANIC_CERTIFIED,
    ]
    .into_iter()
    .filter(|f| issues.has_field(f))
    .collect();

    issues.extend(check_draft(&draft, profile, today).without_fields(&coerced_fields));
    issues.into_result()
}

fn coerce(form: &ListingForm, rules: &RuleTable) -> (ListingDraft, Issues) {
    let mut issues = Issues::default();

    let unit_price = match parse_price(&form.unit_price) {
        Ok(price) => price,
        Err(PriceError::Invalid) => {
            issues.push(field::UNIT_PRICE, "Unit price must be a valid number");
            None
        }
        Err(PriceError::TooPrecise) => {
            issues.push(field::UNIT_PRICE, fields::decimal_places_message(rules));
            None
        }
    };

    let quantity_available = match parse_whole_number(&form.quantity_available) {
        Ok(qty) => qty,
        Err(()) => {
            issues.push(
                field::QUANTITY_AVAILABLE,
                "Quantity available must be a whole number",
            );
            None
        }
    };

    let minimum_order_quantity = match parse_whole_number(&form.minimum_order_quantity) {
        Ok(min) => min,
        Err(()) => {
            issues.push(
                field::MINIMUM_ORDER_QUANTITY,
                "Minimum order quantity must be a whole number",
            );
            None
        }
    };

    let organic_certified = parse_flag(&form.organic_certified).unwrap_or_else(|()| {
        issues.push(
            field::ORGANIC_CERTIFIED,
            "Organic certification must be yes or no",
        );
        false
    });

    let draft = ListingDraft {
        name: form.name.clone(),
        description: form.description.clone(),
        category: form.category.clone(),
        unit_price,
        unit_of_measurement: form.unit_of_measurement.clone(),
        quantity_available,
        minimum_order_quantity,
        farm_address: form.farm_address.clone(),
        images: form.images.clone(),
        harvest_date: form.harvest_date.clone(),
        expiry_date: form.expiry_date.clone(),
        organic_certified,
        tags: split_tags(&form.tags),
    };

    (draft, issues)
}

#[derive(Debug, PartialEq, Eq)]
enum PriceError {
    Invalid,
    /// A well-formed number with more fractional digits than `Decimal` holds.
    TooPrecise,
}

/// `Ok(None)` for blank input. Currency symbols, thousands separators and
/// inner spaces are ignored: `"₦1,500.50"` → `1500.50`. Every typed digit is
/// kept so the decimal-places rule sees what the user entered.
fn parse_price(raw: &str) -> Result<Option<Decimal>, PriceError> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '₦' | '$' | ',') && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return Ok(None);
    }
    match Decimal::from_str_exact(&cleaned) {
        Ok(price) => Ok(Some(price)),
        Err(_) if Decimal::from_str(&cleaned).is_ok() => Err(PriceError::TooPrecise),
        Err(_) => Err(PriceError::Invalid),
    }
}

fn parse_whole_number(raw: &str) -> Result<Option<i64>, ()> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<i64>().map(Some).map_err(|_| ())
}

fn parse_flag(raw: &str) -> Result<bool, ()> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "false" | "no" | "off" | "0" => Ok(false),
        "true" | "yes" | "on" | "1" => Ok(true),
        _ => Err(()),
    }
}

fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_price_strips_currency_and_separators() {
        assert_eq!(parse_price("₦1,500.50"), Ok(Decimal::from_str_exact("1500.50").ok()));
        assert_eq!(parse_price("$ 20"), Ok(Some(Decimal::from(20))));
        assert_eq!(parse_price("   "), Ok(None));
        assert_eq!(parse_price("twelve"), Err(PriceError::Invalid));
        assert_eq!(parse_price("inf"), Err(PriceError::Invalid));
        assert_eq!(parse_price("NaN"), Err(PriceError::Invalid));
    }

    #[test]
    fn parse_price_keeps_digits_a_float_would_drop() {
        let price = parse_price("10.0000000000000001").unwrap().unwrap();
        assert_eq!(price.scale(), 16);
        assert_eq!(
            parse_price("0.000000000000000000000000000001"),
            Err(PriceError::TooPrecise)
        );
    }

    #[test]
    fn parse_whole_number_rejects_fractions() {
        assert_eq!(parse_whole_number("12"), Ok(Some(12)));
        assert_eq!(parse_whole_number(" -3 "), Ok(Some(-3)));
        assert_eq!(parse_whole_number(""), Ok(None));
        assert_eq!(parse_whole_number("2.5"), Err(()));
    }

    #[test]
    fn parse_flag_accepts_common_spellings() {
        assert_eq!(parse_flag("Yes"), Ok(true));
        assert_eq!(parse_flag("on"), Ok(true));
        assert_eq!(parse_flag(""), Ok(false));
        assert_eq!(parse_flag("0"), Ok(false));
        assert_eq!(parse_flag("maybe"), Err(()));
    }

    #[test]
    fn split_tags_trims_and_drops_empty_entries() {
        assert_eq!(
            split_tags(" fresh, local ,, organic ,"),
            vec!["fresh", "local", "organic"]
        );
        assert!(split_tags("").is_empty());
    }
}
