//! Mapping of heterogeneous backend response shapes onto the canonical
//! [`Listing`] / [`NormalizedError`](crate::error::NormalizedError) model.
//!
//! The backend has shipped several envelope styles (`{data: {data: ..}}`,
//! `{data: ..}`, bare objects) and both camelCase and snake_case field names.
//! Everything downstream of this module sees only the canonical types.

mod error_body;
mod fields;
mod images;

use agrilink_core::{
    FarmAddress, FarmAddressRef, Listing, ListingAnalytics, ListingStatus, ListingsPage,
    Pagination, ProductCategory, UnitOfMeasurement,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::error::ApiError;
use fields::Record;

pub use error_body::{normalize_error, normalize_http_error};

/// Where a single listing may sit, in lookup order. The empty pointer is the
/// response root.
const LISTING_LOCATIONS: [&str; 5] = ["/data/data", "/data/listing", "/data", "/listing", ""];

const PAGINATION_LOCATIONS: [&str; 3] = ["/meta/pagination", "/pagination", "/data/pagination"];

const ANALYTICS_LOCATIONS: [&str; 4] = ["/data/analytics", "/analytics", "/data", ""];

const ID: &[&str] = &["_id", "id"];

/// Normalizes a single-listing response, stamping missing timestamps with
/// the current time.
///
/// # Errors
///
/// Returns [`ApiError::MalformedResponse`] when no candidate location holds
/// an object with an `_id` or `id`.
pub fn normalize_listing(response: &Value) -> Result<Listing, ApiError> {
    normalize_listing_at(response, Utc::now())
}

/// Like [`normalize_listing`] with an explicit fallback timestamp.
///
/// # Errors
///
/// See [`normalize_listing`].
pub fn normalize_listing_at(response: &Value, now: DateTime<Utc>) -> Result<Listing, ApiError> {
    let record = locate_listing(response).ok_or_else(|| ApiError::MalformedResponse {
        reason: "no listing object with an `_id` or `id` field".to_owned(),
    })?;
    listing_from_record(record, now)
}

/// `true` when [`normalize_listing`] would find a listing payload.
#[must_use]
pub fn has_listing_shape(response: &Value) -> bool {
    locate_listing(response).is_some()
}

/// `true` when [`normalize_listings`] would find a collection.
#[must_use]
pub fn has_listings_shape(response: &Value) -> bool {
    locate_collection(response).is_some()
}

/// Normalizes a collection response. An unrecognized shape yields an empty
/// list; entries without an identifier are dropped. Both are logged.
#[must_use]
pub fn normalize_listings(response: &Value) -> Vec<Listing> {
    normalize_listings_at(response, Utc::now())
}

#[must_use]
pub fn normalize_listings_at(response: &Value, now: DateTime<Utc>) -> Vec<Listing> {
    let Some(items) = locate_collection(response) else {
        tracing::warn!(
            top_level_keys = %top_level_keys(response),
            "unexpected listings response shape; treating as empty"
        );
        return Vec::new();
    };

    items
        .iter()
        .enumerate()
        .filter_map(|(idx, item)| {
            match item.as_object().filter(|r| has_id(r)) {
                Some(record) => match listing_from_record(record, now) {
                    Ok(listing) => Some(listing),
                    Err(e) => {
                        tracing::warn!(index = idx, error = %e, "dropping listing entry");
                        None
                    }
                },
                None => {
                    tracing::warn!(index = idx, "dropping listing entry without an identifier");
                    None
                }
            }
        })
        .collect()
}

/// Normalizes a collection response together with its pagination block.
#[must_use]
pub fn normalize_listings_page(response: &Value) -> ListingsPage {
    ListingsPage {
        listings: normalize_listings(response),
        pagination: normalize_pagination(response),
    }
}

/// Reads `meta.pagination`, `pagination` or `data.pagination`, whichever is
/// found first. `None` when the response carries no pagination block.
#[must_use]
pub fn normalize_pagination(response: &Value) -> Option<Pagination> {
    let record = PAGINATION_LOCATIONS
        .iter()
        .find_map(|ptr| response.pointer(ptr).and_then(Value::as_object))?;

    let small = |names: &[&'static str], default: u32| {
        fields::count(record, names)
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(default)
    };

    Some(Pagination {
        page: small(&["current_page", "currentPage", "page"], 1),
        limit: small(&["per_page", "perPage", "limit"], 10),
        total: fields::count(record, &["total"]).unwrap_or(0),
        total_pages: small(&["last_page", "lastPage", "totalPages"], 1),
    })
}

/// Normalizes a listing analytics response. Missing counters read as zero.
///
/// # Errors
///
/// Returns [`ApiError::MalformedResponse`] when no candidate location holds
/// an object with at least one analytics field.
pub fn normalize_analytics(response: &Value) -> Result<ListingAnalytics, ApiError> {
    const VIEWS: &[&str] = &["viewCount", "view_count", "views"];
    const INQUIRIES: &[&str] = &["inquiryCount", "inquiry_count", "inquiries"];
    const DAYS: &[&str] = &["daysActive", "days_active"];

    let record = ANALYTICS_LOCATIONS
        .iter()
        .filter_map(|ptr| response.pointer(ptr).and_then(Value::as_object))
        .find(|record| {
            [VIEWS, INQUIRIES, DAYS]
                .iter()
                .any(|names| fields::first(record, names).is_some())
        })
        .ok_or_else(|| ApiError::MalformedResponse {
            reason: "no listing analytics object in response".to_owned(),
        })?;

    let status = fields::text(record, &["status"])
        .and_then(|raw| ListingStatus::from_wire(&raw.trim().to_ascii_lowercase()))
        .unwrap_or_default();

    Ok(ListingAnalytics {
        view_count: fields::count(record, VIEWS).unwrap_or(0),
        inquiry_count: fields::count(record, INQUIRIES).unwrap_or(0),
        created_at: fields::text(record, &["createdAt", "created_at"]),
        status,
        days_active: fields::count(record, DAYS).unwrap_or(0),
    })
}

fn has_id(record: &Record) -> bool {
    fields::first(record, ID).is_some_and(|(_, v)| v.is_string() || v.is_number())
}

fn locate_listing(response: &Value) -> Option<&Record> {
    LISTING_LOCATIONS
        .iter()
        .filter_map(|ptr| response.pointer(ptr).and_then(Value::as_object))
        .find(|record| has_id(record))
}

fn locate_collection(response: &Value) -> Option<&Vec<Value>> {
    if let Value::Array(items) = response {
        return Some(items);
    }
    ["/data/listings", "/listings", "/data"]
        .iter()
        .find_map(|ptr| response.pointer(ptr).and_then(Value::as_array))
}

fn top_level_keys(response: &Value) -> String {
    match response {
        Value::Object(map) => map.keys().cloned().collect::<Vec<_>>().join(","),
        other => format!("<{}>", json_type(other)),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn listing_from_record(record: &Record, now: DateTime<Utc>) -> Result<Listing, ApiError> {
    let id = fields::text(record, ID)
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::MalformedResponse {
            reason: "listing payload has an empty identifier".to_owned(),
        })?;

    let category = fields::text(record, &["category"]).and_then(|raw| {
        let parsed = ProductCategory::from_wire(&raw.trim().to_ascii_lowercase());
        if parsed.is_none() {
            tracing::warn!(listing_id = %id, category = %raw, "unknown listing category");
        }
        parsed
    });

    let unit_of_measurement = fields::text(
        record,
        &["unitOfMeasurement", "unit_of_measurement", "unit"],
    )
    .and_then(|raw| {
        let parsed = UnitOfMeasurement::from_wire(&raw.trim().to_ascii_lowercase());
        if parsed.is_none() {
            tracing::warn!(listing_id = %id, unit = %raw, "unknown unit of measurement");
        }
        parsed
    });

    let status = match fields::text(record, &["status"]) {
        Some(raw) => ListingStatus::from_wire(&raw.trim().to_ascii_lowercase()).unwrap_or_else(|| {
            tracing::warn!(listing_id = %id, status = %raw, "unknown listing status; using active");
            ListingStatus::default()
        }),
        None => ListingStatus::default(),
    };

    Ok(Listing {
        farmer_id: fields::text(record, &["farmerId", "farmer_id", "userId"]).unwrap_or_default(),
        name: fields::text(record, &["produceName", "produce_name", "name"]).unwrap_or_default(),
        description: fields::text(
            record,
            &["produceDescription", "produce_description", "description"],
        )
        .unwrap_or_default(),
        category,
        unit_price: fields::decimal(record, &["unitPrice", "unit_price", "price"])
            .unwrap_or(Decimal::ZERO),
        unit_of_measurement,
        quantity_available: fields::count(
            record,
            &["quantityAvailable", "quantity_available", "quantity"],
        )
        .unwrap_or(0),
        minimum_order_quantity: fields::count(
            record,
            &["minimumOrderQuantity", "minimum_order_quantity", "minOrder"],
        )
        .unwrap_or(1),
        farm_address: farm_address(record),
        images: images::normalize_images(record.get("images")),
        status,
        view_count: fields::count(record, &["viewCount", "view_count"]).unwrap_or(0),
        inquiry_count: fields::count(record, &["inquiryCount", "inquiry_count"]).unwrap_or(0),
        harvest_date: fields::text(record, &["harvestDate", "harvest_date"]),
        expiry_date: fields::text(record, &["expiryDate", "expiry_date"]),
        organic_certified: fields::flag(record, &["organicCertified", "organic_certified"])
            .unwrap_or(false),
        tags: fields::string_list(record, &["tags"]),
        created_at: fields::timestamp(record, &["createdAt", "created_at"]).unwrap_or(now),
        updated_at: fields::timestamp(record, &["updatedAt", "updated_at"]).unwrap_or(now),
        id,
    })
}

/// A bare id, or the populated address record when the backend embedded it.
fn farm_address(record: &Record) -> FarmAddressRef {
    match fields::first(record, &["farmAddress", "farm_address", "address"]) {
        Some((_, Value::String(id))) => FarmAddressRef::Id(id.clone()),
        Some((_, Value::Number(n))) => FarmAddressRef::Id(n.to_string()),
        Some((_, Value::Object(embedded))) => {
            match serde_json::from_value::<FarmAddress>(Value::Object(embedded.clone())) {
                Ok(address) => FarmAddressRef::Record(Box::new(address)),
                Err(e) => {
                    tracing::warn!(error = %e, "unreadable embedded farm address; keeping its id");
                    FarmAddressRef::Id(fields::text(embedded, ID).unwrap_or_default())
                }
            }
        }
        Some((name, other)) => {
            tracing::warn!(field = name, value = %other, "ignoring mistyped farm address");
            FarmAddressRef::default()
        }
        None => FarmAddressRef::default(),
    }
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
