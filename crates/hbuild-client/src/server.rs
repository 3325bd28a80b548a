use bytes::Bytes;
use futures::stream::BoxStream;

use hbuild_core::{BuildRequest, HistoryList, LogSnapshot, PackageGraph, PackageList, ReturnCode};

use crate::error::FetchError;

/// Raw body chunks of an open event stream.
pub type ByteStream = BoxStream<'static, Result<Bytes, FetchError>>;

/// Answer to a log stream request.
pub enum LogStreamResponse {
    /// The server speaks `text/event-stream`.
    Stream(ByteStream),
    /// The server only serves full snapshots on this path.
    Snapshot(LogSnapshot),
}

impl std::fmt::Debug for LogStreamResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogStreamResponse::Stream(_) => f.write_str("Stream(..)"),
            LogStreamResponse::Snapshot(s) => f
                .debug_tuple("Snapshot")
                .field(&s.logs.len())
                .finish(),
        }
    }
}

/// Raw answer to a build submission. Interpreted by [`crate::BuildSubmitter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitResponse {
    pub status: u16,
    pub body: String,
}

/// Everything the client asks of the build server.
///
/// Pollers and log consumers only depend on this trait, so tests drive them
/// with in-memory fakes.
#[async_trait::async_trait]
pub trait BuildServer: Send + Sync {
    async fn packages(&self) -> Result<PackageList, FetchError>;

    async fn return_code(&self, name: &str) -> Result<ReturnCode, FetchError>;

    async fn graph(&self) -> Result<PackageGraph, FetchError>;

    async fn history(&self) -> Result<HistoryList, FetchError>;

    async fn logs(&self, name: &str) -> Result<LogSnapshot, FetchError>;

    /// Open the push channel for `name`, resuming after event id `after`.
    async fn stream_logs(
        &self,
        name: &str,
        after: Option<u64>,
    ) -> Result<LogStreamResponse, FetchError>;

    /// Post a build request once. Any HTTP status is returned as-is.
    async fn submit_build(&self, request: &BuildRequest) -> Result<SubmitResponse, FetchError>;
}
