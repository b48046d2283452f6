//! Filters for the listings collection endpoints.

use agrilink_core::{ListingStatus, ProductCategory};
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Query parameters for `GET /listings` and its variants. Unset fields are
/// omitted from the URL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingsQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub category: Option<ProductCategory>,
    pub status: Option<ListingStatus>,
    pub search: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
    pub farmer_id: Option<String>,
    pub state: Option<String>,
    pub organic_certified: Option<bool>,
}

impl ListingsQuery {
    #[must_use]
    pub fn page(mut self, page: u32, limit: u32) -> Self {
        self.page = Some(page);
        self.limit = Some(limit);
        self
    }

    /// Key/value pairs in a stable order, with the backend's camelCase keys.
    #[must_use]
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        let mut push = |key: &str, value: Option<String>| {
            if let Some(value) = value {
                pairs.push((key.to_owned(), value));
            }
        };

        push("page", self.page.map(|p| p.to_string()));
        push("limit", self.limit.map(|l| l.to_string()));
        push("category", self.category.map(|c| c.as_str().to_owned()));
        push("status", self.status.map(|s| s.as_str().to_owned()));
        push(
            "search",
            self.search
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned),
        );
        push("minPrice", self.min_price.map(|p| p.normalize().to_string()));
        push("maxPrice", self.max_price.map(|p| p.normalize().to_string()));
        push("sortBy", self.sort_by.clone());
        push("sortOrder", self.sort_order.map(|o| o.as_str().to_owned()));
        push("farmerId", self.farmer_id.clone());
        push("state", self.state.clone());
        push(
            "organicCertified",
            self.organic_certified.map(|b| b.to_string()),
        );
        pairs
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn empty_query_has_no_pairs() {
        assert!(ListingsQuery::default().to_query_pairs().is_empty());
    }

    #[test]
    fn pairs_use_camel_case_keys() {
        let query = ListingsQuery {
            category: Some(ProductCategory::Vegetables),
            min_price: Some(Decimal::from_str("150.50").unwrap()),
            sort_by: Some("createdAt".to_owned()),
            sort_order: Some(SortOrder::Desc),
            organic_certified: Some(true),
            ..ListingsQuery::default()
        }
        .page(2, 20);

        let pairs = query.to_query_pairs();
        let get = |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("page"), Some("2"));
        assert_eq!(get("limit"), Some("20"));
        assert_eq!(get("category"), Some("vegetables"));
        assert_eq!(get("minPrice"), Some("150.5"));
        assert_eq!(get("sortBy"), Some("createdAt"));
        assert_eq!(get("sortOrder"), Some("desc"));
        assert_eq!(get("organicCertified"), Some("true"));
        assert_eq!(get("maxPrice"), None);
    }

    #[test]
    fn blank_search_is_omitted() {
        let query = ListingsQuery {
            search: Some("   ".to_owned()),
            ..ListingsQuery::default()
        };
        assert!(query.to_query_pairs().is_empty());
    }
}
