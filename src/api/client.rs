//! Authenticated HTTP client for the booking backend's chat endpoints
//!
//! Wraps reqwest::Client with base URL handling and bearer token injection.

use anyhow::{bail, Context, Result};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::Config;

/// HTTP client for the REST side of the chat backend.
pub struct ChatClient {
    http: reqwest::Client,
    api_url: String,
    token: Option<String>,
}

impl ChatClient {
    /// Build a client from configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let api_url = config.api_url.trim_end_matches('/').to_string();
        url::Url::parse(&api_url).with_context(|| format!("Invalid api_url {:?}", api_url))?;

        Ok(Self {
            http: reqwest::Client::new(),
            api_url,
            token: config.token.clone(),
        })
    }

    /// Load config from disk and build a client.
    pub fn from_config_file() -> Result<Self> {
        Self::new(&Config::load()?)
    }

    /// Absolute URL for an API path such as `/auth/me`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    /// GET request against the REST API (bearer auth when a token is configured).
    pub async fn get(&self, path: &str) -> Result<reqwest::Response> {
        let url = self.url(path);
        tracing::debug!("GET {}", url);

        let mut req = self.http.get(&url);
        if let Some(ref token) = self.token {
            req = req.bearer_auth(token);
        }

        let resp = req
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?;

        check_response(resp, &url).await
    }

    /// GET and decode a JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let resp = self.get(path).await?;
        resp.json()
            .await
            .with_context(|| format!("Failed to parse response from {}", path))
    }
}

/// List endpoints answer either with a bare array or with the array wrapped
/// in an envelope object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Listing<T> {
    Bare(Vec<T>),
    Wrapped {
        #[serde(alias = "users", alias = "messages", alias = "data")]
        items: Vec<T>,
    },
}

impl<T> Listing<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            Listing::Bare(items) | Listing::Wrapped { items } => items,
        }
    }
}

/// Characters escaped inside one path segment: the URL path set plus `/`,
/// `%` and `+` so ids can never split or alter the path.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'?')
    .add(b'{')
    .add(b'}')
    .add(b'/')
    .add(b'%')
    .add(b'+');

/// Percent-encode a single path segment.
pub(crate) fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}

/// Check HTTP response status code and return a clear error on failure.
async fn check_response(resp: reqwest::Response, url: &str) -> Result<reqwest::Response> {
    let status = resp.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        bail!(
            "401 Unauthorized for {}. Token may be invalid -- run 'admin-chat login --token <TOKEN>'.",
            url
        );
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        bail!("HTTP {} for {}: {}", status.as_u16(), url, body);
    }
    Ok(resp)
}
