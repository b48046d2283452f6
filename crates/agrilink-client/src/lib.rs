pub mod api_log;
pub mod client;
pub mod error;
pub mod normalize;
pub mod retry;
pub mod transport;
pub mod validate;

pub use api_log::{ApiLog, ErrorContext, LogEntry, LogEntryKind};
pub use client::{ListingsClient, ListingsQuery, SortOrder};
pub use error::{ApiError, ErrorKind, NormalizedError};
pub use normalize::{
    has_listing_shape, has_listings_shape, normalize_analytics, normalize_error,
    normalize_http_error, normalize_listing, normalize_listings, normalize_listings_page,
    normalize_pagination,
};
pub use retry::{
    retry_status_message, run_with_retry, run_with_retry_observed, CancellationToken, ErrorClass,
    RetryContext, RetryPolicy, Retryable,
};
pub use transport::{Method, RawRequest, RawResponse, ReqwestTransport, Transport};
pub use validate::{
    coerce_listing_form, ensure_single_primary, validate_category, validate_dates,
    validate_images, validate_listing, validate_listing_form, validate_listing_update,
    validate_pricing, ValidationResult,
};
