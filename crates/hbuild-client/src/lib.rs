pub mod config;
pub mod error;
pub mod http;
pub mod server;
pub mod submit;

pub use config::{BackoffStrategy, ClientConfig, LogTransportKind, ReconnectConfig};
pub use error::{ConfigError, FetchError, SubmitError};
pub use http::HttpBuildServer;
pub use server::{BuildServer, ByteStream, LogStreamResponse, SubmitResponse};
pub use submit::{BuildAccepted, BuildSubmitter};
