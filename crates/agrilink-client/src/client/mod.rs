//! [`ListingsClient`]: the listings API with validation, retry, logging and
//! normalization composed around a [`Transport`].
//!
//! Every call follows the same path: pre-flight validation (for writes),
//! [`run_with_retry_observed`] around the transport, an [`ApiLog`] entry per
//! request, response and error, and finally normalization of the body into
//! canonical types.

mod query;

use std::collections::BTreeMap;
use std::sync::Arc;

use agrilink_core::{
    AppConfig, Listing, ListingAnalytics, ListingDraft, ListingForm, ListingStatus,
    ListingUpdate, ListingsPage, ProductCategory, ValidationProfile,
};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::time::Instant;

use crate::api_log::{ApiLog, ErrorContext};
use crate::error::ApiError;
use crate::normalize::{
    normalize_analytics, normalize_http_error, normalize_listing, normalize_listings,
    normalize_listings_page,
};
use crate::retry::{run_with_retry_observed, CancellationToken, RetryContext, RetryPolicy};
use crate::transport::{Method, RawRequest, RawResponse, ReqwestTransport, Transport};
use crate::validate::{
    coerce_listing_form, ensure_single_primary, validate_listing, validate_listing_form,
    validate_listing_update, ValidationResult,
};

pub use query::{ListingsQuery, SortOrder};

const LISTINGS: &str = "listings";

/// Field key reported when a bulk status update names no listings.
pub const LISTING_IDS_FIELD: &str = "listingIds";

/// Client for the Agrilink listings API.
///
/// Cheap to share behind an `Arc`; it holds no per-call state, so concurrent
/// calls retry independently. The [`ApiLog`] is shared with whoever else
/// holds the same `Arc<ApiLog>`.
#[derive(Debug)]
pub struct ListingsClient<T: Transport = ReqwestTransport> {
    transport: T,
    log: Arc<ApiLog>,
    retry: RetryPolicy,
    profile: ValidationProfile,
    cancel: Option<CancellationToken>,
}

impl ListingsClient<ReqwestTransport> {
    /// Builds a client from loaded configuration: base URL, token, timeout,
    /// user agent, log capacity and validation profile.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidBaseUrl`] or [`ApiError::Transport`] if the
    /// HTTP transport cannot be built.
    pub fn from_config(config: &AppConfig) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::from_config(config)?;
        Ok(Self::new(transport)
            .with_log(Arc::new(ApiLog::with_capacity(config.api_log_capacity)))
            .with_profile(config.validation_profile))
    }
}

impl<T: Transport> ListingsClient<T> {
    /// A client with the default retry policy, the standard validation
    /// profile and a fresh log.
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            log: Arc::new(ApiLog::new()),
            retry: RetryPolicy::default(),
            profile: ValidationProfile::default(),
            cancel: None,
        }
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_log(mut self, log: Arc<ApiLog>) -> Self {
        self.log = log;
        self
    }

    #[must_use]
    pub fn with_profile(mut self, profile: ValidationProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Once `token` is cancelled, calls stop retrying and new calls fail
    /// with [`ApiError::Cancelled`] before sending anything.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    #[must_use]
    pub fn log(&self) -> &Arc<ApiLog> {
        &self.log
    }

    #[must_use]
    pub fn profile(&self) -> ValidationProfile {
        self.profile
    }

    /// Validates and creates a listing.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Validation`] if the draft fails pre-flight validation;
    ///   nothing is sent.
    /// - [`ApiError::Status`] / [`ApiError::Transport`] once retries are
    ///   exhausted or the failure is not retryable.
    /// - [`ApiError::MalformedResponse`] if the success body holds no listing.
    pub async fn create_listing(&self, draft: &ListingDraft) -> Result<Listing, ApiError> {
        check(validate_listing(draft, self.profile), "create listing")?;

        let mut payload = draft.clone();
        ensure_single_primary(&mut payload.images);
        let body = encode("create listing", &payload)?;

        let response = self
            .execute(RawRequest::new(Method::Post, &[LISTINGS]).with_body(body), &self.retry)
            .await?;
        normalize_listing(&response)
    }

    /// Coerces raw form input, validates it and creates the listing.
    ///
    /// # Errors
    ///
    /// See [`create_listing`](Self::create_listing); coercion failures are
    /// reported as [`ApiError::Validation`].
    pub async fn create_listing_from_form(&self, form: &ListingForm) -> Result<Listing, ApiError> {
        check(validate_listing_form(form, self.profile), "create listing")?;
        let (draft, _) = coerce_listing_form(form, self.profile);
        self.create_listing(&draft).await
    }

    /// Validates the fields `update` sets and applies them to listing `id`.
    ///
    /// # Errors
    ///
    /// See [`create_listing`](Self::create_listing).
    pub async fn update_listing(
        &self,
        id: &str,
        update: &ListingUpdate,
    ) -> Result<Listing, ApiError> {
        check(validate_listing_update(update, self.profile), "update listing")?;

        let mut payload = update.clone();
        if let Some(images) = payload.images.as_mut() {
            ensure_single_primary(images);
        }
        let body = encode("update listing", &payload)?;

        let response = self
            .execute(
                RawRequest::new(Method::Put, &[LISTINGS, id]).with_body(body),
                &self.retry,
            )
            .await?;
        normalize_listing(&response)
    }

    /// # Errors
    ///
    /// [`ApiError::Status`] (e.g. 404), [`ApiError::Transport`] or
    /// [`ApiError::MalformedResponse`].
    pub async fn get_listing(&self, id: &str) -> Result<Listing, ApiError> {
        let response = self
            .execute(RawRequest::new(Method::Get, &[LISTINGS, id]), &self.retry)
            .await?;
        normalize_listing(&response)
    }

    /// One page of the public listings collection.
    ///
    /// # Errors
    ///
    /// [`ApiError::Status`] or [`ApiError::Transport`].
    pub async fn list_listings(&self, query: &ListingsQuery) -> Result<ListingsPage, ApiError> {
        let request =
            RawRequest::new(Method::Get, &[LISTINGS]).with_query(query.to_query_pairs());
        let response = self.execute(request, &self.retry).await?;
        Ok(normalize_listings_page(&response))
    }

    /// The authenticated farmer's own listings.
    ///
    /// # Errors
    ///
    /// [`ApiError::Status`] (401 without a token) or [`ApiError::Transport`].
    pub async fn my_listings(&self, query: &ListingsQuery) -> Result<ListingsPage, ApiError> {
        let request = RawRequest::new(Method::Get, &[LISTINGS, "my-listings"])
            .with_query(query.to_query_pairs());
        let response = self.execute(request, &self.retry).await?;
        Ok(normalize_listings_page(&response))
    }

    /// # Errors
    ///
    /// [`ApiError::Status`] or [`ApiError::Transport`].
    pub async fn listings_by_category(
        &self,
        category: ProductCategory,
        limit: Option<u32>,
    ) -> Result<Vec<Listing>, ApiError> {
        let request = RawRequest::new(Method::Get, &[LISTINGS, "category", category.as_str()])
            .with_query(limit_query(limit));
        let response = self.execute(request, &self.retry).await?;
        Ok(normalize_listings(&response))
    }

    /// # Errors
    ///
    /// [`ApiError::Status`] or [`ApiError::Transport`].
    pub async fn popular_listings(&self, limit: Option<u32>) -> Result<Vec<Listing>, ApiError> {
        self.featured("popular", limit).await
    }

    /// # Errors
    ///
    /// [`ApiError::Status`] or [`ApiError::Transport`].
    pub async fn recent_listings(&self, limit: Option<u32>) -> Result<Vec<Listing>, ApiError> {
        self.featured("recent", limit).await
    }

    async fn featured(&self, which: &str, limit: Option<u32>) -> Result<Vec<Listing>, ApiError> {
        let request = RawRequest::new(Method::Get, &[LISTINGS, "featured", which])
            .with_query(limit_query(limit));
        let response = self.execute(request, &self.retry).await?;
        Ok(normalize_listings(&response))
    }

    /// # Errors
    ///
    /// [`ApiError::Status`] or [`ApiError::Transport`].
    pub async fn delete_listing(&self, id: &str) -> Result<(), ApiError> {
        self.execute(RawRequest::new(Method::Delete, &[LISTINGS, id]), &self.retry)
            .await?;
        Ok(())
    }

    /// Sets `status` on every listing in `ids`.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Validation`] on field `listingIds` when `ids` holds no
    ///   non-blank id. Blank ids are dropped before the request is built.
    /// - [`ApiError::Status`] or [`ApiError::Transport`].
    pub async fn bulk_update_status(
        &self,
        ids: &[String],
        status: ListingStatus,
    ) -> Result<(), ApiError> {
        let ids: Vec<&str> = ids
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
            .collect();
        if ids.is_empty() {
            let message = "Select at least one listing".to_owned();
            return Err(ApiError::Validation(ValidationResult {
                is_valid: false,
                errors: vec![message.clone()],
                field_errors: Some(BTreeMap::from([(
                    LISTING_IDS_FIELD.to_owned(),
                    vec![message],
                )])),
            }));
        }

        let body = json!({ "listingIds": ids, "status": status.as_str() });
        self.execute(
            RawRequest::new(Method::Put, &[LISTINGS, "bulk-update-status"]).with_body(body),
            &self.retry,
        )
        .await?;
        Ok(())
    }

    /// View and inquiry figures for one of the caller's listings.
    ///
    /// # Errors
    ///
    /// [`ApiError::Status`], [`ApiError::Transport`] or
    /// [`ApiError::MalformedResponse`].
    pub async fn listing_analytics(&self, id: &str) -> Result<ListingAnalytics, ApiError> {
        let request = RawRequest::new(Method::Get, &[LISTINGS, "my-listings", id, "analytics"]);
        let response = self.execute(request, &self.retry).await?;
        normalize_analytics(&response)
    }

    /// Records a buyer inquiry against listing `id`.
    ///
    /// # Errors
    ///
    /// [`ApiError::Status`] or [`ApiError::Transport`].
    pub async fn record_inquiry(&self, id: &str) -> Result<(), ApiError> {
        self.execute(
            RawRequest::new(Method::Post, &[LISTINGS, id, "inquire"]),
            &self.retry,
        )
        .await?;
        Ok(())
    }

    /// `true` when the listings endpoint answers successfully. One attempt,
    /// no retry; failures are logged, never returned.
    pub async fn health_check(&self) -> bool {
        let request = RawRequest::new(Method::Get, &[LISTINGS]).with_query(limit_query(Some(1)));
        match self.execute(request, &RetryPolicy::no_retry()).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, "listings API health check failed");
                false
            }
        }
    }

    /// Sends `request` under `policy`, logging every attempt, and returns
    /// the success body.
    async fn execute(&self, request: RawRequest, policy: &RetryPolicy) -> Result<Value, ApiError> {
        if self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
            return Err(ApiError::Cancelled);
        }

        let endpoint = request.endpoint();
        let context = format!("{} {endpoint}", request.method);
        let request = &request;
        let endpoint = endpoint.as_str();

        let mut attempt = 0u32;
        run_with_retry_observed(
            policy,
            &context,
            self.cancel.as_ref(),
            |retry: &RetryContext<'_, ApiError>| {
                self.log
                    .log_retry_attempt(endpoint, retry.attempt + 1, retry.delay);
            },
            move || {
                let retry_attempt = (attempt > 0).then_some(attempt);
                attempt += 1;
                self.attempt(request, endpoint, retry_attempt)
            },
        )
        .await
    }

    async fn attempt(
        &self,
        request: &RawRequest,
        endpoint: &str,
        retry_attempt: Option<u32>,
    ) -> Result<Value, ApiError> {
        let method = request.method.as_str();
        let headers = request_headers(request);
        let request_id =
            self.log
                .log_request(endpoint, method, request.body.as_ref(), Some(&headers));
        let error_context = ErrorContext {
            request_id: Some(&request_id),
            method: Some(method),
            payload: request.body.as_ref(),
            retry_attempt,
        };

        let started = Instant::now();
        let response = match self.transport.send(request.clone()).await {
            Ok(response) => response,
            Err(e) => {
                self.log.log_error(endpoint, &e, error_context);
                return Err(e);
            }
        };
        self.log.log_response(
            endpoint,
            response.status,
            &response.body,
            started.elapsed(),
            Some(&request_id),
        );

        into_body(response).inspect_err(|e| self.log.log_error(endpoint, e, error_context))
    }
}

/// The success body, or the normalized error for a non-2xx status or a 2xx
/// body that declares `"success": false`.
fn into_body(response: RawResponse) -> Result<Value, ApiError> {
    let declared_failure = response.body.get("success").and_then(Value::as_bool) == Some(false);
    if response.is_success() && !declared_failure {
        return Ok(response.body);
    }
    Err(ApiError::Status(normalize_http_error(
        response.status,
        &response.body,
    )))
}

fn check(verdict: ValidationResult, action: &str) -> Result<(), ApiError> {
    if verdict.is_valid {
        return Ok(());
    }
    tracing::debug!(action, errors = verdict.errors.len(), "rejected before sending");
    Err(ApiError::Validation(verdict))
}

fn encode<P: Serialize>(context: &str, payload: &P) -> Result<Value, ApiError> {
    serde_json::to_value(payload).map_err(|source| ApiError::Encode {
        context: context.to_owned(),
        source,
    })
}

fn limit_query(limit: Option<u32>) -> Vec<(String, String)> {
    limit
        .map(|l| vec![("limit".to_owned(), l.to_string())])
        .unwrap_or_default()
}

fn request_headers(request: &RawRequest) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::from([("Accept".to_owned(), "application/json".to_owned())]);
    if request.body.is_some() {
        headers.insert("Content-Type".to_owned(), "application/json".to_owned());
    }
    headers
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
