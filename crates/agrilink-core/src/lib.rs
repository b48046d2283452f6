pub mod app_config;
pub mod config;
pub mod error;
pub mod listing;
pub mod rules;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use error::ConfigError;
pub use listing::{
    FarmAddress, FarmAddressRef, Listing, ListingAnalytics, ListingDraft, ListingForm,
    ListingStatus, ListingUpdate, ListingsPage, Pagination, ProductCategory, ProductImage,
    UnitOfMeasurement,
};
pub use rules::{FarmAddressFormat, RuleTable, ValidationProfile, RULES_VERSION};
