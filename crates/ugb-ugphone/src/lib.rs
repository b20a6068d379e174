//! UgPhone HTTP adapter.
//!
//! Implements the `ugb-core` [`UgPhoneApi`] port with reqwest, sending the
//! browser-like header set the UgPhone web portal uses.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE};
use tracing::debug;

use ugb_core::{
    domain::Credentials,
    errors::Error,
    purchase::{ApiRequest, ApiResponse, HttpMethod, UgPhoneApi},
    Result,
};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/135.0.0.0 Safari/537.36";

/// Static headers sent with every request (credentials are added per call).
const STATIC_HEADERS: &[(&str, &str)] = &[
    ("lang", "en"),
    ("priority", "u=1, i"),
    ("sec-ch-ua", "\"Google Chrome\";v=\"135\", \"Not-A.Brand\";v=\"8\", \"Chromium\";v=\"135\""),
    ("sec-ch-ua-mobile", "?0"),
    ("sec-ch-ua-platform", "\"Windows\""),
    ("sec-fetch-dest", "empty"),
    ("sec-fetch-mode", "cors"),
    ("sec-fetch-site", "same-origin"),
    ("terminal", "web"),
];

#[derive(Clone, Debug)]
pub struct UgPhoneClient {
    base_url: String,
    http: reqwest::Client,
}

impl UgPhoneClient {
    /// `timeout` is the default per-request timeout; requests may override it.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::External(format!("http client build failed: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn headers(&self, creds: &Credentials) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/plain, */*"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/json;charset=UTF-8"),
        );
        for &(name, value) in STATIC_HEADERS {
            headers.insert(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            );
        }

        headers.insert(
            HeaderName::from_static("origin"),
            header_value(&format!("{}/", self.base_url))?,
        );
        headers.insert(
            HeaderName::from_static("referer"),
            header_value(&format!("{}/toc-portal/", self.base_url))?,
        );
        headers.insert(
            HeaderName::from_static("access-token"),
            header_value(&creds.access_token)?,
        );
        headers.insert(
            HeaderName::from_static("login-id"),
            header_value(&creds.login_id)?,
        );

        Ok(headers)
    }
}

#[async_trait]
impl UgPhoneApi for UgPhoneClient {
    async fn call(&self, creds: &Credentials, req: ApiRequest) -> Result<ApiResponse> {
        let url = self.url_for(req.endpoint.path());
        let mut builder = match req.endpoint.method() {
            HttpMethod::Get => self.http.get(&url),
            HttpMethod::Post => self.http.post(&url),
        }
        .headers(self.headers(creds)?);

        if let Some(body) = &req.body {
            builder = builder.json(body);
        }
        if let Some(t) = req.timeout {
            builder = builder.timeout(t);
        }

        let resp = builder.send().await.map_err(map_reqwest_err)?;
        let status = resp.status().as_u16();
        debug!(endpoint = ?req.endpoint, status, "ugphone response");

        if status != 200 {
            return Ok(ApiResponse {
                status,
                body: serde_json::Value::Null,
            });
        }

        let text = resp.text().await.map_err(map_reqwest_err)?;
        let body = serde_json::from_str(&text).map_err(|e| {
            Error::External(format!(
                "invalid JSON from {}: {e}: {}",
                req.endpoint.path(),
                text.chars().take(200).collect::<String>()
            ))
        })?;

        Ok(ApiResponse { status, body })
    }
}

fn header_value(v: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(v).map_err(|e| Error::External(format!("invalid header value: {e}")))
}

fn map_reqwest_err(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::External(format!("ugphone request error: {e}"))
    }
}
