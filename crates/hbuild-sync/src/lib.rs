//! Client-side synchronization engine: keeps local views of the build
//! server's package status and build logs up to date.

pub mod backoff;
pub mod log;
pub mod poller;
mod publish;
pub mod source;

pub use log::{ChannelState, LogBuffer, LogOptions, LogStreamConsumer, LogTransport, LogView};
pub use poller::{PollOptions, PollPhase, PollState, Poller, Source, StatusPoller};
pub use source::{GraphSource, HistorySource, LogsSource, PackagesSource};
