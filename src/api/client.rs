use std::fmt;
use std::time::Duration;

use futures::StreamExt;
use reqwest::redirect::Policy;
use reqwest::{header, Method, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use super::ApiError;
use crate::sync::{
    Entry, EntryId, EntryPatch, EntryQuery, Feed, FeedId, FeedPatch, NewFeed, ScopeFilter,
};

/// Upper bound for any JSON response body.
const MAX_RESPONSE_SIZE: usize = 8 * 1024 * 1024;

/// Upper bound for an error body we try to interpret.
const MAX_ERROR_SIZE: usize = 16 * 1024;

/// Build the shared HTTP client: pooled connections, bounded redirects.
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client, ApiError> {
    let client = reqwest::Client::builder()
        .redirect(redirect_policy())
        .pool_max_idle_per_host(4)
        .pool_idle_timeout(Duration::from_secs(30))
        .tcp_keepalive(Duration::from_secs(60))
        .timeout(timeout)
        .build()?;
    Ok(client)
}

fn redirect_policy() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() >= 3 {
            return attempt.error("Too many redirects (max 3)");
        }
        let url = attempt.url();
        if attempt.previous().iter().any(|prev| prev.as_str() == url.as_str()) {
            return attempt.error("Redirect loop detected");
        }
        tracing::debug!(to = %url, hop = attempt.previous().len() + 1, "Following redirect");
        attempt.follow()
    })
}

/// Connection parameters for [`ApiClient::new`].
pub struct ApiOptions {
    pub api_url: String,
    pub settings_url: Option<String>,
    pub token: Option<SecretString>,
    /// Send PATCH/PUT/DELETE as POST with `X-HTTP-Method-Override`.
    pub emulate_http: bool,
    pub allow_insecure_http: bool,
    pub timeout: Duration,
}

impl Default for ApiOptions {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            settings_url: None,
            token: None,
            emulate_http: false,
            allow_insecure_http: false,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Client for the reader's REST API. Cheap to clone; clones share the
/// connection pool.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    api_url: Url,
    settings_url: Option<Url>,
    token: Option<SecretString>,
    emulate_http: bool,
    timeout: Duration,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("api_url", &self.api_url.as_str())
            .field("settings_url", &self.settings_url.as_ref().map(Url::as_str))
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("emulate_http", &self.emulate_http)
            .finish()
    }
}

/// Parse a base URL and refuse plain http unless it points at this machine
/// or the caller opted out.
fn parse_base_url(raw: &str, allow_insecure: bool) -> Result<Url, ApiError> {
    let url =
        Url::parse(raw.trim()).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", raw, e)))?;
    match url.scheme() {
        "https" => {}
        "http" => {
            let local = matches!(url.host_str(), Some("localhost" | "127.0.0.1" | "[::1]"));
            if !local && !allow_insecure {
                tracing::error!(url = %url, "Rejecting non-HTTPS API URL");
                return Err(ApiError::InsecureBaseUrl);
            }
            tracing::warn!(url = %url, "Using non-HTTPS API URL");
        }
        other => {
            return Err(ApiError::InvalidUrl(format!("unsupported scheme {:?}", other)));
        }
    }
    Ok(url)
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Body of the bulk mark-read request: the scope filter plus `read=1`.
#[derive(Serialize)]
struct MarkReadBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    feed_id: Option<FeedId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tag: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    favorite: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    q: Option<&'a str>,
    read: u8,
}

#[derive(Serialize)]
struct TagRename<'a> {
    name: &'a str,
}

impl ApiClient {
    pub fn new(http: reqwest::Client, options: ApiOptions) -> Result<Self, ApiError> {
        let api_url = parse_base_url(&options.api_url, options.allow_insecure_http)?;
        let settings_url = options
            .settings_url
            .as_deref()
            .map(|raw| parse_base_url(raw, options.allow_insecure_http))
            .transpose()?;
        Ok(Self {
            http,
            api_url,
            settings_url,
            token: options.token,
            emulate_http: options.emulate_http,
            timeout: options.timeout,
        })
    }

    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn api(&self, segments: &[&str]) -> Result<Url, ApiError> {
        Self::endpoint(&self.api_url, segments)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let emulated = self.emulate_http
            && (method == Method::PATCH || method == Method::PUT || method == Method::DELETE);
        let mut builder = if emulated {
            self.http
                .post(url)
                .header("X-HTTP-Method-Override", method.as_str())
        } else {
            self.http.request(method, url)
        };
        builder = builder.header(header::ACCEPT, "application/json");
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token.expose_secret());
        }
        builder
    }

    async fn execute(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let response = tokio::time::timeout(self.timeout, builder.send())
            .await
            .map_err(|_| ApiError::Timeout(self.timeout.as_secs()))??;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        // Prefer the server's own message when it sends one.
        let message = read_limited(response, MAX_ERROR_SIZE)
            .await
            .ok()
            .and_then(|body| serde_json::from_slice::<ErrorBody>(&body).ok())
            .map(|body| body.error)
            .filter(|msg| !msg.trim().is_empty());
        Err(match message {
            Some(msg) => ApiError::Rejected(msg),
            None => ApiError::HttpStatus(status.as_u16()),
        })
    }

    async fn fetch_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let response = self.execute(builder).await?;
        let body = read_limited(response, MAX_RESPONSE_SIZE).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    // ------------------------------------------------------------------------
    // Entries
    // ------------------------------------------------------------------------

    /// One page of entries. A page shorter than `query.limit` means end of data.
    pub async fn fetch_entries(&self, query: &EntryQuery) -> Result<Vec<Entry>, ApiError> {
        let mut url = self.api(&["entries"])?;
        url.query_pairs_mut().extend_pairs(query.pairs());
        tracing::debug!(url = %url, "Fetching entries");
        self.fetch_json(self.request(Method::GET, url)).await
    }

    /// A single entry including its content.
    pub async fn fetch_entry(&self, id: EntryId) -> Result<Entry, ApiError> {
        let url = self.api(&["entries", &id.to_string()])?;
        self.fetch_json(self.request(Method::GET, url)).await
    }

    pub async fn patch_entry(&self, id: EntryId, patch: &EntryPatch) -> Result<(), ApiError> {
        let url = self.api(&["entries", &id.to_string()])?;
        self.execute(self.request(Method::PATCH, url).json(patch))
            .await
            .map(drop)
    }

    /// Mark every entry matching `filter` read.
    pub async fn mark_read(&self, filter: &ScopeFilter) -> Result<(), ApiError> {
        let url = self.api(&["entries"])?;
        let body = MarkReadBody {
            feed_id: filter.feed_id,
            tag: filter.tag.as_deref(),
            favorite: filter.favorite.map(u8::from),
            q: filter.q.as_deref(),
            read: 1,
        };
        self.execute(self.request(Method::PUT, url).json(&body))
            .await
            .map(drop)
    }

    // ------------------------------------------------------------------------
    // Feeds and tags
    // ------------------------------------------------------------------------

    pub async fn fetch_feeds(&self) -> Result<Vec<Feed>, ApiError> {
        let url = self.api(&["feeds"])?;
        self.fetch_json(self.request(Method::GET, url)).await
    }

    pub async fn create_feed(&self, feed: &NewFeed) -> Result<(), ApiError> {
        let url = self.api(&["feeds"])?;
        self.execute(self.request(Method::POST, url).json(feed))
            .await
            .map(drop)
    }

    pub async fn patch_feed(&self, id: FeedId, patch: &FeedPatch) -> Result<(), ApiError> {
        let url = self.api(&["feeds", &id.to_string()])?;
        self.execute(self.request(Method::PATCH, url).json(patch))
            .await
            .map(drop)
    }

    pub async fn delete_feed(&self, id: FeedId) -> Result<(), ApiError> {
        let url = self.api(&["feeds", &id.to_string()])?;
        self.execute(self.request(Method::DELETE, url)).await.map(drop)
    }

    pub async fn rename_tag(&self, name: &str, new_name: &str) -> Result<(), ApiError> {
        let url = self.api(&["tags", name])?;
        let body = TagRename { name: new_name };
        self.execute(self.request(Method::PUT, url).json(&body))
            .await
            .map(drop)
    }

    pub async fn delete_tag(&self, name: &str) -> Result<(), ApiError> {
        let url = self.api(&["tags", name])?;
        self.execute(self.request(Method::DELETE, url)).await.map(drop)
    }

    // ------------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------------

    /// Persist a tag group's collapsed state as a form post.
    pub async fn save_collapsed(&self, tag: &str, collapsed: bool) -> Result<(), ApiError> {
        let base = self.settings_url.as_ref().ok_or(ApiError::NoSettingsUrl)?;
        let url = Self::endpoint(base, &["collapsed"])?;
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("name", tag)
            .append_pair("collapsed", if collapsed { "1" } else { "0" })
            .finish();
        let builder = self
            .request(Method::POST, url)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body);
        self.execute(builder).await.map(drop)
    }

    pub fn has_settings(&self) -> bool {
        self.settings_url.is_some()
    }
}

/// Read a response body, refusing anything over `limit` bytes.
async fn read_limited(response: Response, limit: usize) -> Result<Vec<u8>, ApiError> {
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(ApiError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(ApiError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(url: &str) -> ApiOptions {
        ApiOptions {
            api_url: url.to_string(),
            ..ApiOptions::default()
        }
    }

    #[test]
    fn test_rejects_remote_plain_http() {
        let http = reqwest::Client::new();
        let err = ApiClient::new(http, options("http://reader.example.com/api")).unwrap_err();
        assert!(matches!(err, ApiError::InsecureBaseUrl));
    }

    #[test]
    fn test_allows_localhost_and_opt_out() {
        let http = reqwest::Client::new();
        assert!(ApiClient::new(http.clone(), options("http://localhost:8080/api")).is_ok());
        let opts = ApiOptions {
            allow_insecure_http: true,
            ..options("http://reader.lan/api")
        };
        assert!(ApiClient::new(http, opts).is_ok());
    }

    #[test]
    fn test_rejects_other_schemes() {
        let http = reqwest::Client::new();
        let err = ApiClient::new(http, options("ftp://example.com/api")).unwrap_err();
        assert!(matches!(err, ApiError::InvalidUrl(_)));
    }

    #[test]
    fn test_endpoint_appends_segments_and_escapes() {
        let base = Url::parse("https://example.com/api/").unwrap();
        let url = ApiClient::endpoint(&base, &["tags", "a b/c"]).unwrap();
        assert_eq!(url.as_str(), "https://example.com/api/tags/a%20b%2Fc");
    }

    #[test]
    fn test_debug_masks_token() {
        let http = reqwest::Client::new();
        let opts = ApiOptions {
            token: Some(SecretString::from("hunter2")),
            ..options("https://example.com/api")
        };
        let client = ApiClient::new(http, opts).unwrap();
        let debug = format!("{:?}", client);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("REDACTED"));
    }
}
