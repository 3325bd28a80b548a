use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;

use hbuild_client::{BuildServer, ClientConfig, HttpBuildServer};
use hbuild_sync::Source;

/// Resolved configuration shared by every command.
pub struct Context {
    pub config: ClientConfig,
    pub config_path: PathBuf,
}

impl Context {
    /// File (or defaults), then `HBUILD_SERVER`, then `--server`.
    pub fn load(config_path: Option<PathBuf>, server: Option<String>) -> anyhow::Result<Self> {
        let config_path = match config_path {
            Some(p) => p,
            None => ClientConfig::default_path()?,
        };
        let config = ClientConfig::load(&config_path)?
            .with_env_override()
            .with_server_override(server);
        tracing::debug!(path = %config_path.display(), server = %config.server_url, "config loaded");
        Ok(Self {
            config,
            config_path,
        })
    }

    pub fn server(&self) -> anyhow::Result<Arc<dyn BuildServer>> {
        let server = HttpBuildServer::from_config(&self.config)
            .with_context(|| format!("cannot use server {}", self.config.server_url))?;
        Ok(Arc::new(server))
    }

    pub fn runtime(&self) -> anyhow::Result<tokio::runtime::Runtime> {
        tokio::runtime::Runtime::new().context("failed to start async runtime")
    }

    /// One blocking fetch of a snapshot endpoint.
    pub fn fetch<S: Source>(&self, source: S) -> anyhow::Result<S::Output> {
        self.runtime()?
            .block_on(source.fetch())
            .with_context(|| format!("failed to load {}", source.name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.json");
        std::fs::write(&path, r#"{"server_url": "http://from-file:8000"}"#).unwrap();

        let ctx = Context::load(Some(path.clone()), Some("http://flag:9000".into())).unwrap();
        assert_eq!(ctx.config.server_url, "http://flag:9000");
        assert_eq!(ctx.config_path, path);
    }

    struct Fixed(Result<u32, u16>);

    #[async_trait::async_trait]
    impl Source for Fixed {
        type Output = u32;

        fn name(&self) -> &str {
            "history"
        }

        async fn fetch(&self) -> Result<u32, hbuild_client::FetchError> {
            self.0.map_err(|status| hbuild_client::FetchError::Status {
                url: "history".into(),
                status,
                body: String::new(),
            })
        }
    }

    #[test]
    fn fetch_names_the_endpoint_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Context::load(Some(dir.path().join("none.json")), None).unwrap();
        assert_eq!(ctx.fetch(Fixed(Ok(7))).unwrap(), 7);
        let err = ctx.fetch(Fixed(Err(500))).unwrap_err();
        assert_eq!(err.to_string(), "failed to load history");
        assert!(format!("{err:#}").contains("HTTP 500"));
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Context::load(Some(dir.path().join("none.json")), Some("http://x:1".into())).unwrap();
        assert_eq!(ctx.config.status_interval_ms, 2_000);
        assert!(ctx.server().is_ok());
    }
}
