pub mod build;
pub mod diff;
pub mod graph;
pub mod history;
pub mod log;
pub mod types;

pub use build::{BuildItem, BuildRequest, BuildTarget, RequestError, StageSelector};
pub use diff::{StatusChange, StatusDiff};
pub use graph::{GraphEdge, PackageGraph};
pub use history::{HistoryEntry, HistoryList};
pub use log::{LogEvent, LogSnapshot};
pub use types::*;
