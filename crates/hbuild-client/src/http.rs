use std::time::Duration;

use futures::StreamExt;
use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Url;
use serde::de::DeserializeOwned;

use hbuild_core::{BuildRequest, HistoryList, LogSnapshot, PackageGraph, PackageList, ReturnCode};

use crate::config::ClientConfig;
use crate::error::FetchError;
use crate::server::{BuildServer, LogStreamResponse, SubmitResponse};

const USER_AGENT: &str = concat!("hbctl/", env!("CARGO_PKG_VERSION"));
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const EVENT_STREAM: &str = "text/event-stream";

/// reqwest-backed [`BuildServer`].
#[derive(Clone)]
pub struct HttpBuildServer {
    http: reqwest::Client,
    base: Url,
    timeout: Duration,
}

impl HttpBuildServer {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let base = Url::parse(base_url)
            .map_err(|e| FetchError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(FetchError::InvalidUrl(base_url.to_string()));
        }
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| FetchError::from_reqwest(base_url, e))?;
        Ok(Self {
            http,
            base,
            timeout,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, FetchError> {
        Self::new(&config.server_url, config.request_timeout())
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Join path segments onto the base url, percent-encoding each one.
    fn url(&self, segments: &[&str]) -> Result<Url, FetchError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, FetchError> {
        let url = self.url(segments)?;
        let url_str = url.to_string();
        tracing::debug!(url = %url_str, "GET");
        let resp = self
            .http
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(&url_str, e))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(&url_str, e))?;
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url_str,
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(|source| FetchError::Decode {
            url: url_str,
            source,
        })
    }
}

#[async_trait::async_trait]
impl BuildServer for HttpBuildServer {
    async fn packages(&self) -> Result<PackageList, FetchError> {
        self.get_json(&["api", "packages"]).await
    }

    async fn return_code(&self, name: &str) -> Result<ReturnCode, FetchError> {
        self.get_json(&["api", "status", name]).await
    }

    async fn graph(&self) -> Result<PackageGraph, FetchError> {
        self.get_json(&["api", "graph"]).await
    }

    async fn history(&self) -> Result<HistoryList, FetchError> {
        self.get_json(&["api", "history"]).await
    }

    async fn logs(&self, name: &str) -> Result<LogSnapshot, FetchError> {
        self.get_json(&["api", "log", name]).await
    }

    async fn stream_logs(
        &self,
        name: &str,
        after: Option<u64>,
    ) -> Result<LogStreamResponse, FetchError> {
        let mut url = self.url(&["api", "log", name])?;
        if let Some(id) = after {
            url.query_pairs_mut().append_pair("after", &id.to_string());
        }
        let url_str = url.to_string();
        tracing::debug!(url = %url_str, ?after, "opening log stream");

        // No total timeout: the stream stays open for as long as the view does.
        let mut req = self
            .http
            .get(url)
            .header(ACCEPT, HeaderValue::from_static(EVENT_STREAM));
        if let Some(id) = after {
            req = req.header("Last-Event-ID", id.to_string());
        }
        let resp = req
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(&url_str, e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                url: url_str,
                status: status.as_u16(),
                body,
            });
        }

        let is_stream = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.starts_with(EVENT_STREAM))
            .unwrap_or(false);

        if !is_stream {
            let body = resp
                .text()
                .await
                .map_err(|e| FetchError::from_reqwest(&url_str, e))?;
            let snapshot = serde_json::from_str(&body).map_err(|source| FetchError::Decode {
                url: url_str,
                source,
            })?;
            return Ok(LogStreamResponse::Snapshot(snapshot));
        }

        let stream = resp.bytes_stream().map(move |chunk| {
            chunk.map_err(|e| FetchError::Stream {
                url: url_str.clone(),
                message: e.to_string(),
            })
        });
        Ok(LogStreamResponse::Stream(Box::pin(stream)))
    }

    async fn submit_build(&self, request: &BuildRequest) -> Result<SubmitResponse, FetchError> {
        let url = self.url(&["api", "build"])?;
        let url_str = url.to_string();
        tracing::info!(url = %url_str, target = request.build_to.as_str(), "submitting build");
        let resp = self
            .http
            .post(url)
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(&url_str, e))?;
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        Ok(SubmitResponse { status, body })
    }
}
