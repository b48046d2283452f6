//! Listing domain types shared by the validator, the normalizer and the
//! HTTP client.
//!
//! Outbound payloads ([`ListingDraft`], [`ListingForm`], [`ListingUpdate`])
//! keep `category` and `unitOfMeasurement` as raw strings: they come straight
//! from user-controlled form state and must be able to carry invalid values
//! so the validator can report them. The canonical [`Listing`] produced by
//! the normalizer uses the typed enums.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductCategory {
    Fruits,
    Vegetables,
    Grains,
    Legumes,
    Herbs,
    Spices,
    Dairy,
    Poultry,
    Livestock,
    Others,
}

impl ProductCategory {
    pub const ALL: [ProductCategory; 10] = [
        ProductCategory::Fruits,
        ProductCategory::Vegetables,
        ProductCategory::Grains,
        ProductCategory::Legumes,
        ProductCategory::Herbs,
        ProductCategory::Spices,
        ProductCategory::Dairy,
        ProductCategory::Poultry,
        ProductCategory::Livestock,
        ProductCategory::Others,
    ];

    /// Wire value as the backend sends and expects it.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ProductCategory::Fruits => "fruits",
            ProductCategory::Vegetables => "vegetables",
            ProductCategory::Grains => "grains",
            ProductCategory::Legumes => "legumes",
            ProductCategory::Herbs => "herbs",
            ProductCategory::Spices => "spices",
            ProductCategory::Dairy => "dairy",
            ProductCategory::Poultry => "poultry",
            ProductCategory::Livestock => "livestock",
            ProductCategory::Others => "others",
        }
    }

    #[must_use]
    pub fn from_wire(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }

    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            ProductCategory::Fruits => "Fruits",
            ProductCategory::Vegetables => "Vegetables",
            ProductCategory::Grains => "Grains",
            ProductCategory::Legumes => "Legumes",
            ProductCategory::Herbs => "Herbs",
            ProductCategory::Spices => "Spices",
            ProductCategory::Dairy => "Dairy",
            ProductCategory::Poultry => "Poultry",
            ProductCategory::Livestock => "Livestock",
            ProductCategory::Others => "Others",
        }
    }
}

impl std::fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitOfMeasurement {
    Kg,
    Gram,
    Pound,
    Litre,
    Piece,
    Dozen,
    Bag,
    Crate,
}

impl UnitOfMeasurement {
    pub const ALL: [UnitOfMeasurement; 8] = [
        UnitOfMeasurement::Kg,
        UnitOfMeasurement::Gram,
        UnitOfMeasurement::Pound,
        UnitOfMeasurement::Litre,
        UnitOfMeasurement::Piece,
        UnitOfMeasurement::Dozen,
        UnitOfMeasurement::Bag,
        UnitOfMeasurement::Crate,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            UnitOfMeasurement::Kg => "kg",
            UnitOfMeasurement::Gram => "gram",
            UnitOfMeasurement::Pound => "pound",
            UnitOfMeasurement::Litre => "litre",
            UnitOfMeasurement::Piece => "piece",
            UnitOfMeasurement::Dozen => "dozen",
            UnitOfMeasurement::Bag => "bag",
            UnitOfMeasurement::Crate => "crate",
        }
    }

    #[must_use]
    pub fn from_wire(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|u| u.as_str() == s)
    }
}

impl std::fmt::Display for UnitOfMeasurement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    #[default]
    Active,
    Inactive,
    OutOfStock,
    Archived,
}

impl ListingStatus {
    pub const ALL: [ListingStatus; 4] = [
        ListingStatus::Active,
        ListingStatus::Inactive,
        ListingStatus::OutOfStock,
        ListingStatus::Archived,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ListingStatus::Active => "active",
            ListingStatus::Inactive => "inactive",
            ListingStatus::OutOfStock => "out_of_stock",
            ListingStatus::Archived => "archived",
        }
    }

    #[must_use]
    pub fn from_wire(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|st| st.as_str() == s)
    }
}

impl std::fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An image attached to a listing. Images never exist on their own; the
/// `filename` is the key the backend uses to delete the stored object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductImage {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
}

/// A listing create payload as assembled by the caller, before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingDraft {
    #[serde(rename = "produceName", default)]
    pub name: String,
    #[serde(rename = "produceDescription", default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "exact_price")]
    pub unit_price: Option<Decimal>,
    #[serde(default)]
    pub unit_of_measurement: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity_available: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_order_quantity: Option<i64>,
    /// Farm address id; the backend resolves it to a stored address.
    #[serde(default)]
    pub farm_address: String,
    #[serde(default)]
    pub images: Vec<ProductImage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub harvest_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<String>,
    #[serde(default)]
    pub organic_certified: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Raw form state: every scalar is still text and must be coerced before the
/// draft rules apply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListingForm {
    #[serde(rename = "produceName")]
    pub name: String,
    #[serde(rename = "produceDescription")]
    pub description: String,
    pub category: String,
    pub unit_price: String,
    pub unit_of_measurement: String,
    pub quantity_available: String,
    pub minimum_order_quantity: String,
    pub farm_address: String,
    pub images: Vec<ProductImage>,
    pub harvest_date: Option<String>,
    pub expiry_date: Option<String>,
    pub organic_certified: String,
    /// Comma-separated, e.g. `"fresh, local"`.
    pub tags: String,
}

/// A partial update. Absent fields are left untouched by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingUpdate {
    #[serde(rename = "produceName", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        rename = "produceDescription",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "exact_price")]
    pub unit_price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_of_measurement: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity_available: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_order_quantity: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub farm_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<ProductImage>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub harvest_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organic_certified: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Outbound prices go on the wire as JSON numbers and are read back from a
/// number or a numeric string without rounding. A value with more fractional
/// digits than `Decimal` can hold is a deserialization error.
mod exact_price {
    use std::fmt;

    use rust_decimal::prelude::ToPrimitive;
    use rust_decimal::Decimal;
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};

    #[allow(clippy::ref_option)]
    pub(super) fn serialize<S: Serializer>(
        value: &Option<Decimal>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value.as_ref().and_then(ToPrimitive::to_f64) {
            Some(price) => serializer.serialize_f64(price),
            None => serializer.serialize_none(),
        }
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Decimal>, D::Error> {
        deserializer.deserialize_option(OptionalPrice)
    }

    struct OptionalPrice;

    impl<'de> Visitor<'de> for OptionalPrice {
        type Value = Option<Decimal>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a price as a number or a numeric string")
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
            deserializer.deserialize_any(Price).map(Some)
        }
    }

    struct Price;

    impl Visitor<'_> for Price {
        type Value = Decimal;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a price as a number or a numeric string")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Decimal, E> {
            Ok(Decimal::from(v))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Decimal, E> {
            Ok(Decimal::from(v))
        }

        // `f64` display is the shortest round-tripping form and never uses
        // an exponent, so `0.1 + 0.2` arrives as `0.30000000000000004`.
        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Decimal, E> {
            exact(&v.to_string())
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Decimal, E> {
            exact(v.trim())
        }
    }

    fn exact<E: de::Error>(raw: &str) -> Result<Decimal, E> {
        Decimal::from_str_exact(raw)
            .map_err(|err| E::custom(format!("invalid price \"{raw}\": {err}")))
    }
}

/// A stored farm address, embedded in listing responses when the backend
/// populates the reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FarmAddress {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(alias = "farmer_id")]
    pub farmer_id: String,
    #[serde(alias = "address_name")]
    pub address_name: String,
    #[serde(alias = "street_address")]
    pub street_address: String,
    pub city: String,
    pub state: String,
    #[serde(alias = "postal_code")]
    pub postal_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub landmark: Option<String>,
    #[serde(alias = "is_active")]
    pub is_active: bool,
}

/// A listing's farm address: either the bare id or the populated record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FarmAddressRef {
    Id(String),
    Record(Box<FarmAddress>),
}

impl FarmAddressRef {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            FarmAddressRef::Id(id) => id,
            FarmAddressRef::Record(record) => &record.id,
        }
    }
}

impl Default for FarmAddressRef {
    fn default() -> Self {
        FarmAddressRef::Id(String::new())
    }
}

/// The canonical listing. Every backend response variant is mapped onto this
/// shape by the normalizer; nothing downstream inspects raw responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    #[serde(rename = "_id")]
    pub id: String,
    pub farmer_id: String,
    #[serde(rename = "produceName")]
    pub name: String,
    #[serde(rename = "produceDescription")]
    pub description: String,
    /// `None` when the backend omitted the category or sent an unknown one.
    pub category: Option<ProductCategory>,
    pub unit_price: Decimal,
    pub unit_of_measurement: Option<UnitOfMeasurement>,
    pub quantity_available: u64,
    pub minimum_order_quantity: u64,
    pub farm_address: FarmAddressRef,
    pub images: Vec<ProductImage>,
    pub status: ListingStatus,
    pub view_count: u64,
    pub inquiry_count: u64,
    pub harvest_date: Option<String>,
    pub expiry_date: Option<String>,
    pub organic_certified: bool,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Listing {
    #[must_use]
    pub fn primary_image(&self) -> Option<&ProductImage> {
        self.images.iter().find(|img| img.is_primary)
    }

    /// `true` when the listing can currently take an order of its minimum size.
    #[must_use]
    pub fn can_fulfil_minimum_order(&self) -> bool {
        self.status == ListingStatus::Active
            && self.quantity_available >= self.minimum_order_quantity
    }
}

/// Engagement figures for one of the caller's own listings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListingAnalytics {
    #[serde(alias = "view_count")]
    pub view_count: u64,
    #[serde(alias = "inquiry_count")]
    pub inquiry_count: u64,
    #[serde(alias = "created_at", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    pub status: ListingStatus,
    #[serde(alias = "days_active")]
    pub days_active: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingsPage {
    pub listings: Vec<Listing>,
    pub pagination: Option<Pagination>,
}
