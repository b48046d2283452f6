//! Handlers that work on local JSON files and never touch the network.

use std::path::Path;

use agrilink_client::{
    normalize_error, normalize_listing, normalize_listings_page, validate_listing,
    validate_listing_form, ValidationResult,
};
use agrilink_core::{ListingDraft, ListingForm, ValidationProfile};
use anyhow::Context;
use serde_json::Value;

use crate::NormalizeMode;

pub(crate) fn read_json(path: &Path) -> anyhow::Result<Value> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("{} is not valid JSON", path.display()))
}

/// Validates `payload` as a typed draft or, with `form`, as raw form input.
///
/// # Errors
///
/// Returns an error if the payload does not have the draft (or form) shape
/// at all; rule violations are reported in the result, not as errors.
pub(crate) fn validate_document(
    payload: Value,
    form: bool,
    profile: ValidationProfile,
) -> anyhow::Result<ValidationResult> {
    if form {
        let form: ListingForm =
            serde_json::from_value(payload).context("payload is not a listing form")?;
        Ok(validate_listing_form(&form, profile))
    } else {
        let draft: ListingDraft =
            serde_json::from_value(payload).context("payload is not a listing draft")?;
        Ok(validate_listing(&draft, profile))
    }
}

/// Normalizes a captured response body into canonical JSON.
///
/// # Errors
///
/// Returns an error if a single-listing body holds no listing.
pub(crate) fn normalize_document(body: &Value, mode: NormalizeMode) -> anyhow::Result<Value> {
    let normalized = match mode {
        NormalizeMode::Listing => serde_json::to_value(normalize_listing(body)?)?,
        NormalizeMode::Collection => serde_json::to_value(normalize_listings_page(body))?,
        NormalizeMode::Error => serde_json::to_value(normalize_error(body))?,
    };
    Ok(normalized)
}

/// Prints the validation verdict for the payload in `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if the payload
/// is invalid, so the process exits non-zero.
pub(crate) fn run_validate(path: &Path, form: bool, profile: ValidationProfile) -> anyhow::Result<()> {
    let result = validate_document(read_json(path)?, form, profile)?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    if result.is_valid {
        tracing::info!(file = %path.display(), %profile, "payload is valid");
        Ok(())
    } else {
        anyhow::bail!("validation failed with {} error(s)", result.errors.len())
    }
}

/// Prints the normalized form of the response body in `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or the body cannot
/// be normalized.
pub(crate) fn run_normalize(path: &Path, mode: NormalizeMode) -> anyhow::Result<()> {
    let normalized = normalize_document(&read_json(path)?, mode)
        .with_context(|| format!("failed to normalize {}", path.display()))?;
    println!("{}", serde_json::to_string_pretty(&normalized)?);
    Ok(())
}
