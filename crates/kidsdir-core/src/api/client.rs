//! API client for the directory backend.
//!
//! `ApiClient` builds `{base}/v1/{mode}/{resource}[/{id}]` URLs, attaches
//! the bearer token, sends JSON bodies and turns error responses into
//! [`ApiError`]. Failures are surfaced once: there is no retry, backoff or
//! idempotency key.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, Stream, TryStreamExt};
use reqwest::header::{self, HeaderValue};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::auth::AuthManager;
use crate::models::{
    ActivitySearch, ActivitySearchResult, ImportSummary, MediaUpload, MediaUploadRequest, Ticket,
    TicketReview,
};

use super::pagination::{ListQuery, Page};
use super::resource::{Access, ApiMode, Resource};
use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// API version prefix
const API_VERSION: &str = "v1";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Where the bearer token comes from.
#[derive(Clone)]
pub enum TokenSource {
    /// No Authorization header; only public user-mode reads work.
    Anonymous,
    /// A fixed token, e.g. from an environment variable.
    Static(Arc<String>),
    /// Tokens owned by an [`AuthManager`], refreshed before they expire.
    Managed(Arc<AuthManager>),
}

/// API client for the directory backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    auth: TokenSource,
}

impl ApiClient {
    /// Create a new API client for the given base URL (scheme, host and
    /// optional path prefix; `/v1/...` is appended per request)
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ApiError::InvalidRequest(format!("invalid base URL {}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidRequest(format!(
                "base URL cannot carry a path: {}",
                base_url
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url,
            auth: TokenSource::Anonymous,
        })
    }

    /// Create a new ApiClient with the given token, sharing the connection pool.
    pub fn with_token(&self, token: Arc<String>) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            auth: TokenSource::Static(token),
        }
    }

    /// Create a new ApiClient whose tokens come from `auth`
    pub fn with_auth(&self, auth: Arc<AuthManager>) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            auth: TokenSource::Managed(auth),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn token_source(&self) -> &TokenSource {
        &self.auth
    }

    // ===== URL building =====

    /// URL for `{mode, resource, id?}` plus any trailing segments.
    ///
    /// Fails without touching the network when `mode` has no such endpoint.
    pub fn url(
        &self,
        mode: ApiMode,
        resource: Resource,
        id: Option<&str>,
        suffix: &[&str],
        access: Access,
    ) -> Result<Url, ApiError> {
        if !mode.supports(resource, access) {
            return Err(ApiError::UnsupportedMode {
                mode,
                resource,
                access,
            });
        }
        if let Some(id) = id {
            if id.trim().is_empty() {
                return Err(ApiError::InvalidRequest(format!(
                    "empty id for {}",
                    resource
                )));
            }
        }

        let mut segments = vec![mode.as_str(), resource.path()];
        segments.extend(id);
        segments.extend_from_slice(suffix);
        self.versioned_url(&segments)
    }

    /// `{base}/v1/{segments...}`, each segment percent-encoded
    fn versioned_url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| ApiError::InvalidRequest("base URL cannot carry a path".to_string()))?;
            path.pop_if_empty().push(API_VERSION);
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    // ===== Request plumbing =====

    async fn bearer(&self) -> Result<Option<String>, ApiError> {
        match self.auth {
            TokenSource::Anonymous => Ok(None),
            TokenSource::Static(ref token) => Ok(Some(token.as_str().to_string())),
            TokenSource::Managed(ref auth) => Ok(Some(auth.access_token().await?)),
        }
    }

    /// Attach auth, send, and map error statuses
    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let request = match self.bearer().await? {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let mut request = request.build()?;
        request
            .headers_mut()
            .entry(header::ACCEPT)
            .or_insert(HeaderValue::from_static("application/json"));
        let method = request.method().clone();
        let url = request.url().clone();
        debug!(%method, %url, "Sending request");

        let response = self.client.execute(request).await?;
        self.check_response(response).await
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(&self, response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let error = ApiError::from_status(status, &body);
        warn!(status = status.as_u16(), error = %error, "Request failed");

        if status == StatusCode::UNAUTHORIZED {
            if let TokenSource::Managed(ref auth) = self.auth {
                auth.invalidate().await;
            }
        }
        Err(error)
    }

    /// Decode a JSON body; `204 No Content` and empty bodies are `None`
    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<Option<T>, ApiError> {
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let url = response.url().clone();
        let bytes = response.bytes().await?;
        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(None);
        }
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| ApiError::InvalidResponse(format!("{}: {}", url, e)))
    }

    async fn expect_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let url = response.url().clone();
        Self::read_json(response)
            .await?
            .ok_or_else(|| ApiError::InvalidResponse(format!("{}: empty response body", url)))
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client.request(method, url)
    }

    // ===== Resource CRUD =====

    /// Fetch one page of a collection
    pub async fn list<T: DeserializeOwned>(
        &self,
        mode: ApiMode,
        resource: Resource,
        query: &ListQuery,
    ) -> Result<Page<T>, ApiError> {
        let url = self.url(mode, resource, None, &[], Access::Read)?;
        let response = self
            .send(self.request(Method::GET, url).query(&query.to_query()))
            .await?;
        Ok(Self::read_json(response).await?.unwrap_or_default())
    }

    /// Every item of a collection, following `next_cursor` page by page.
    ///
    /// Pages are fetched lazily as the stream is polled. A server that
    /// hands back the cursor it was just given ends the stream.
    pub fn list_all<'a, T: DeserializeOwned + 'a>(
        &'a self,
        mode: ApiMode,
        resource: Resource,
        query: ListQuery,
    ) -> impl Stream<Item = Result<T, ApiError>> + 'a {
        stream::try_unfold(Some(query), move |state| async move {
            let query = match state {
                Some(query) => query,
                None => return Ok::<_, ApiError>(None),
            };
            let page: Page<T> = self.list(mode, resource, &query).await?;

            let next = match page.next_cursor() {
                Some(cursor) if Some(cursor) == query.cursor.as_deref() => {
                    warn!(%resource, cursor, "Server repeated the cursor, stopping");
                    None
                }
                Some(cursor) => Some(query.clone().with_cursor(cursor)),
                None => None,
            };
            let items = stream::iter(page.items.into_iter().map(Ok::<T, ApiError>));
            Ok(Some((items, next)))
        })
        .try_flatten()
    }

    /// Collect every page into one vector
    pub async fn list_all_vec<T: DeserializeOwned>(
        &self,
        mode: ApiMode,
        resource: Resource,
        query: ListQuery,
    ) -> Result<Vec<T>, ApiError> {
        self.list_all(mode, resource, query).try_collect().await
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        mode: ApiMode,
        resource: Resource,
        id: &str,
    ) -> Result<T, ApiError> {
        let url = self.url(mode, resource, Some(id), &[], Access::Read)?;
        let response = self.send(self.request(Method::GET, url)).await?;
        Self::expect_json(response).await
    }

    /// POST a new record; returns the created record as the server stored it
    pub async fn create<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        mode: ApiMode,
        resource: Resource,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(mode, resource, None, &[], Access::Write)?;
        let response = self.send(self.request(Method::POST, url).json(body)).await?;
        Self::expect_json(response).await
    }

    /// PUT a full replacement of a record
    pub async fn update<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        mode: ApiMode,
        resource: Resource,
        id: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(mode, resource, Some(id), &[], Access::Write)?;
        let response = self.send(self.request(Method::PUT, url).json(body)).await?;
        Self::expect_json(response).await
    }

    /// PATCH selected fields of a record
    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        mode: ApiMode,
        resource: Resource,
        id: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(mode, resource, Some(id), &[], Access::Write)?;
        let response = self.send(self.request(Method::PATCH, url).json(body)).await?;
        Self::expect_json(response).await
    }

    pub async fn delete(&self, mode: ApiMode, resource: Resource, id: &str) -> Result<(), ApiError> {
        let url = self.url(mode, resource, Some(id), &[], Access::Write)?;
        self.send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }

    // ===== Auxiliary endpoints =====

    /// Public activity search
    pub async fn search_activities(
        &self,
        search: &ActivitySearch,
    ) -> Result<Page<ActivitySearchResult>, ApiError> {
        let url = self.versioned_url(&[ApiMode::User.as_str(), "search"])?;
        let response = self
            .send(self.request(Method::GET, url).query(&search.to_query()))
            .await?;
        Ok(Self::read_json(response).await?.unwrap_or_default())
    }

    /// Presigned upload slot for an organization's media
    pub async fn request_media_upload(
        &self,
        mode: ApiMode,
        org_id: &str,
        request: &MediaUploadRequest,
    ) -> Result<MediaUpload, ApiError> {
        let url = self.url(mode, Resource::Organizations, Some(org_id), &["media"], Access::Write)?;
        let response = self.send(self.request(Method::POST, url).json(request)).await?;
        Self::expect_json(response).await
    }

    /// Admin bulk export as CSV text
    pub async fn export_csv(&self, resource: Resource) -> Result<String, ApiError> {
        if !resource.supports_bulk() {
            return Err(ApiError::InvalidRequest(format!("{} cannot be exported", resource)));
        }
        let url = self.url(ApiMode::Admin, resource, None, &["export"], Access::Read)?;
        let response = self
            .send(self.request(Method::GET, url).header(header::ACCEPT, "text/csv"))
            .await?;
        Ok(response.text().await?)
    }

    /// Admin bulk import from CSV text
    pub async fn import_csv(&self, resource: Resource, csv: String) -> Result<ImportSummary, ApiError> {
        if !resource.supports_bulk() {
            return Err(ApiError::InvalidRequest(format!("{} cannot be imported", resource)));
        }
        let url = self.url(ApiMode::Admin, resource, None, &["import"], Access::Write)?;
        let response = self
            .send(
                self.request(Method::POST, url)
                    .header(header::CONTENT_TYPE, "text/csv")
                    .body(csv),
            )
            .await?;
        Ok(Self::read_json(response).await?.unwrap_or_default())
    }

    pub async fn add_user_to_group(&self, username: &str, group: &str) -> Result<(), ApiError> {
        let url = self.url(ApiMode::Admin, Resource::Users, Some(username), &["groups"], Access::Write)?;
        let body = serde_json::json!({ "group_name": group });
        self.send(self.request(Method::POST, url).json(&body)).await?;
        Ok(())
    }

    pub async fn remove_user_from_group(&self, username: &str, group: &str) -> Result<(), ApiError> {
        let url = self.url(
            ApiMode::Admin,
            Resource::Users,
            Some(username),
            &["groups", group],
            Access::Write,
        )?;
        self.send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }

    /// Approve or reject a ticket
    pub async fn review_ticket(&self, ticket_id: &str, review: &TicketReview) -> Result<Ticket, ApiError> {
        self.update(ApiMode::Admin, Resource::Tickets, ticket_id, review).await
    }

    /// Submit a ticket as the signed-in user. `ticket` must carry its
    /// `ticket_type` discriminator.
    pub async fn submit_ticket<B: Serialize + ?Sized>(&self, ticket: &B) -> Result<Ticket, ApiError> {
        self.create(ApiMode::User, Resource::Tickets, ticket).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApiClient {
        ApiClient::new(base).expect("client")
    }

    #[test]
    fn test_collection_and_item_urls() {
        let api = client("https://api.example.com");
        let url = api
            .url(ApiMode::Admin, Resource::Organizations, None, &[], Access::Read)
            .expect("url");
        assert_eq!(url.as_str(), "https://api.example.com/v1/admin/organizations");

        let url = api
            .url(ApiMode::Manager, Resource::Activities, Some("a-1"), &[], Access::Write)
            .expect("url");
        assert_eq!(url.as_str(), "https://api.example.com/v1/manager/activities/a-1");
    }

    #[test]
    fn test_base_path_prefix_kept() {
        let api = client("https://api.example.com/prod/");
        let url = api
            .url(ApiMode::Owner, Resource::Locations, Some("l1"), &[], Access::Read)
            .expect("url");
        assert_eq!(url.as_str(), "https://api.example.com/prod/v1/owner/locations/l1");
    }

    #[test]
    fn test_id_is_percent_encoded() {
        let api = client("https://api.example.com");
        let url = api
            .url(ApiMode::Admin, Resource::Users, Some("a b/c"), &["groups"], Access::Write)
            .expect("url");
        assert_eq!(url.as_str(), "https://api.example.com/v1/admin/users/a%20b%2Fc/groups");
    }

    #[test]
    fn test_unsupported_mode_never_builds_url() {
        let api = client("https://api.example.com");
        let err = api
            .url(ApiMode::Manager, Resource::Users, None, &[], Access::Read)
            .expect_err("unsupported");
        assert!(matches!(
            err,
            ApiError::UnsupportedMode {
                mode: ApiMode::Manager,
                resource: Resource::Users,
                access: Access::Read
            }
        ));
        assert_eq!(err.to_string(), "manager mode cannot read users");

        assert!(api
            .url(ApiMode::User, Resource::Activities, Some("a"), &[], Access::Write)
            .is_err());
    }

    #[test]
    fn test_empty_id_rejected() {
        let api = client("https://api.example.com");
        assert!(matches!(
            api.url(ApiMode::Admin, Resource::Activities, Some("  "), &[], Access::Read),
            Err(ApiError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(ApiClient::new("not a url").is_err());
        assert!(ApiClient::new("mailto:someone@example.com").is_err());
    }

    #[test]
    fn test_with_token_shares_base() {
        let api = client("https://api.example.com");
        let authed = api.with_token(Arc::new("t".to_string()));
        assert_eq!(authed.base_url(), api.base_url());
        assert!(matches!(authed.token_source(), TokenSource::Static(_)));
        assert!(matches!(api.token_source(), TokenSource::Anonymous));
    }
}
