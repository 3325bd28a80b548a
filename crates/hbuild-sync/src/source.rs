//! [`Source`] adapters over the build server's snapshot endpoints.

use std::sync::Arc;

use hbuild_client::{BuildServer, FetchError};
use hbuild_core::{HistoryList, LogSnapshot, PackageGraph, PackageList};

use crate::poller::Source;

macro_rules! endpoint_source {
    ($(#[$doc:meta])* $name:ident, $output:ty, $method:ident, $label:literal) => {
        $(#[$doc])*
        #[derive(Clone)]
        pub struct $name {
            server: Arc<dyn BuildServer>,
        }

        impl $name {
            pub fn new(server: Arc<dyn BuildServer>) -> Self {
                Self { server }
            }
        }

        #[async_trait::async_trait]
        impl Source for $name {
            type Output = $output;

            fn name(&self) -> &str {
                $label
            }

            async fn fetch(&self) -> Result<$output, FetchError> {
                self.server.$method().await
            }
        }
    };
}

endpoint_source!(
    /// `GET /api/packages`, the status poller's feed.
    PackagesSource,
    PackageList,
    packages,
    "packages"
);
endpoint_source!(
    /// `GET /api/graph`. The graph rarely changes; poll it slowly.
    GraphSource,
    PackageGraph,
    graph,
    "graph"
);
endpoint_source!(HistorySource, HistoryList, history, "history");

/// `GET /api/log/{name}`: full log snapshot of one package or stage.
#[derive(Clone)]
pub struct LogsSource {
    server: Arc<dyn BuildServer>,
    name: String,
}

impl LogsSource {
    pub fn new(server: Arc<dyn BuildServer>, name: impl Into<String>) -> Self {
        Self {
            server,
            name: name.into(),
        }
    }
}

#[async_trait::async_trait]
impl Source for LogsSource {
    type Output = LogSnapshot;

    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<LogSnapshot, FetchError> {
        self.server.logs(&self.name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hbuild_client::{LogStreamResponse, SubmitResponse};
    use hbuild_core::{BuildRequest, GraphEdge, LogEvent, ReturnCode};

    struct FixedServer;

    #[async_trait::async_trait]
    impl BuildServer for FixedServer {
        async fn packages(&self) -> Result<PackageList, FetchError> {
            Ok(PackageList::default())
        }
        async fn return_code(&self, _name: &str) -> Result<ReturnCode, FetchError> {
            unimplemented!()
        }
        async fn graph(&self) -> Result<PackageGraph, FetchError> {
            Ok(PackageGraph {
                nodes: vec!["a".into(), "b".into()],
                edges: vec![GraphEdge::new("a", "b")],
            })
        }
        async fn history(&self) -> Result<HistoryList, FetchError> {
            Err(FetchError::Status {
                url: "history".into(),
                status: 500,
                body: String::new(),
            })
        }
        async fn logs(&self, name: &str) -> Result<LogSnapshot, FetchError> {
            Ok(LogSnapshot {
                logs: vec![LogEvent {
                    id: 1,
                    package: name.to_string(),
                    stage: "build".into(),
                    log: "ok\n".into(),
                    created_at: String::new(),
                }],
            })
        }
        async fn stream_logs(
            &self,
            _name: &str,
            _after: Option<u64>,
        ) -> Result<LogStreamResponse, FetchError> {
            unimplemented!()
        }
        async fn submit_build(&self, _request: &BuildRequest) -> Result<SubmitResponse, FetchError> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn sources_delegate_to_server() {
        let server: Arc<dyn BuildServer> = Arc::new(FixedServer);
        assert!(PackagesSource::new(server.clone()).fetch().await.unwrap().is_empty());
        let graph = GraphSource::new(server.clone()).fetch().await.unwrap();
        assert_eq!(graph.edges.len(), 1);
        let err = HistorySource::new(server).fetch().await.unwrap_err();
        assert_eq!(err.status(), Some(500));

        let logs = LogsSource::new(Arc::new(FixedServer), "gcc[pass1]");
        assert_eq!(logs.name(), "gcc[pass1]");
        assert_eq!(logs.fetch().await.unwrap().logs[0].package, "gcc[pass1]");
    }
}
