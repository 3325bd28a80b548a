use serde::{Deserialize, Serialize};

/// One fragment of build output.
///
/// `log` is a raw fragment, not a line: fragments are concatenated as-is and
/// any line breaks come from the fragment content itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogEvent {
    /// Monotonic per package+stage; the ordering and dedup key.
    pub id: u64,
    #[serde(default)]
    pub package: String,
    #[serde(default)]
    pub stage: String,
    pub log: String,
    #[serde(default)]
    pub created_at: String,
}

/// Full log snapshot as returned by `GET /api/log/{name}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogSnapshot {
    pub logs: Vec<LogEvent>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_snapshot_with_sparse_fields() {
        let json = r#"{"logs": [
            {"id": 1, "package": "libfoo", "stage": "build", "log": "Configuring...\n", "created_at": "2024-01-01 10:00:00"},
            {"id": 2, "log": "Building...\n"}
        ]}"#;
        let snap: LogSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snap.logs.len(), 2);
        assert_eq!(snap.logs[1].package, "");
        assert_eq!(snap.logs[0].log, "Configuring...\n");
    }
}
