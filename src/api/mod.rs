//! Thin REST client for the manga backend.
//!
//! Every endpoint is a free function taking the [`RemoteClient`] and, where
//! the backend needs a session, the caller's auth headers.

use reqwest::{
    Method, RequestBuilder, Response,
    header::{HeaderMap, HeaderName, HeaderValue},
};
use serde::{Deserialize, Deserializer, de::DeserializeOwned};
use serde_json::Value;

use crate::{configuration::Api, error::Error};

pub mod achievements;
pub mod auth;
pub mod bookmarks;
pub mod catalog;
pub mod comments;
pub mod history;
pub mod ratings;

const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone, Debug)]
pub struct RemoteClient {
    http: reqwest::Client,
    base_url: String,
}

impl RemoteClient {
    pub fn new(config: &Api) -> Result<Self, Error> {
        let http = reqwest::Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Builds a request for a path relative to the base URL.
    pub fn request(&self, method: Method, path: &str, auth: &HeaderMap) -> RequestBuilder {
        self.request_url(method, &self.url(path), auth)
    }

    /// Builds a request for an absolute URL, e.g. a pagination `next` link.
    pub fn request_url(&self, method: Method, url: &str, auth: &HeaderMap) -> RequestBuilder {
        let request_id = uuid::Uuid::new_v4().to_string();

        let mut builder = self
            .http
            .request(method, url)
            .headers(auth.clone());
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            builder = builder.header(HeaderName::from_static(REQUEST_ID_HEADER), value);
        }
        builder
    }
}

/// Sends the request and decodes a `2xx` JSON body.
pub async fn send_json<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, Error> {
    let response = ensure_success(builder.send().await?).await?;
    let body = response.bytes().await?;

    Ok(serde_json::from_slice(&body)?)
}

/// Sends the request and ignores any `2xx` body.
pub async fn send_empty(builder: RequestBuilder) -> Result<(), Error> {
    ensure_success(builder.send().await?).await?;
    Ok(())
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    error: Option<String>,
    detail: Option<String>,
}

async fn ensure_success(response: Response) -> Result<Response, Error> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
    let message = body
        .error
        .or(body.detail)
        .unwrap_or_else(|| format!("API Error: {}", status.as_u16()));

    tracing::error!(status = status.as_u16(), body = %text, "Api error");

    Err(Error::Api { status, message })
}

/// A list endpoint body. The backend answers either with a bare array or
/// with a paginated `{count, next, results}` object. Any other shape is a
/// decode error. Rows are decoded one by one and a row that does not fit
/// `T` is skipped.
#[derive(Debug)]
pub struct ListBody<T> {
    pub count: Option<u64>,
    next: Option<String>,
    results: Vec<T>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawList {
    Plain(Vec<Value>),
    Paged {
        #[serde(default)]
        count: Option<u64>,
        #[serde(default)]
        next: Option<String>,
        results: Vec<Value>,
    },
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for ListBody<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (count, next, rows) = match RawList::deserialize(deserializer)? {
            RawList::Plain(rows) => (None, None, rows),
            RawList::Paged {
                count,
                next,
                results,
            } => (count, next, results),
        };

        let results = rows
            .into_iter()
            .filter_map(|row| match serde_json::from_value(row) {
                Ok(item) => Some(item),
                Err(error) => {
                    tracing::warn!(err.msg = %error, "Skipping malformed list row");
                    None
                }
            })
            .collect();

        Ok(ListBody {
            count,
            next,
            results,
        })
    }
}

impl<T> ListBody<T> {
    pub fn next(&self) -> Option<&str> {
        self.next.as_deref()
    }

    pub fn into_results(self) -> Vec<T> {
        self.results
    }
}
