use std::sync::Arc;

use hbuild_core::{BuildRequest, PackageInfo};

use crate::error::SubmitError;
use crate::server::BuildServer;

/// Status the server answers with once a build is queued.
pub const ACCEPTED: u16 = 202;

/// Acknowledgment of a queued build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildAccepted {
    pub request: BuildRequest,
    pub message: Option<String>,
}

/// Stateless build submission.
///
/// A submission is a deliberate user action: it is posted exactly once and
/// never retried, whatever the outcome.
#[derive(Clone)]
pub struct BuildSubmitter {
    server: Arc<dyn BuildServer>,
}

impl BuildSubmitter {
    pub fn new(server: Arc<dyn BuildServer>) -> Self {
        Self { server }
    }

    /// Build (source) or install (anything else) every stage of `package`.
    pub async fn submit_package(&self, package: &PackageInfo) -> Result<BuildAccepted, SubmitError> {
        self.submit(BuildRequest::for_package(package)).await
    }

    pub async fn submit(&self, request: BuildRequest) -> Result<BuildAccepted, SubmitError> {
        request.validate()?;
        let resp = self.server.submit_build(&request).await?;
        if resp.status != ACCEPTED {
            let message = server_message(&resp.body).unwrap_or_else(|| resp.body.clone());
            tracing::warn!(status = resp.status, %message, "build request rejected");
            return Err(SubmitError::Rejected {
                status: resp.status,
                message,
            });
        }
        Ok(BuildAccepted {
            request,
            message: server_message(&resp.body),
        })
    }
}

/// `detail` (error) or `message` (success) from a JSON body.
fn server_message(body: &str) -> Option<String> {
    let val: serde_json::Value = serde_json::from_str(body).ok()?;
    val.get("detail")
        .or_else(|| val.get("message"))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}
