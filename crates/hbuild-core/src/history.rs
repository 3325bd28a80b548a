use serde::{Deserialize, Deserializer, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// A past build job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    pub id: u64,
    pub runner: String,
    #[serde(default)]
    pub packages: Vec<String>,
    /// Unix seconds. The server renders this with `strftime("%s")`, so a
    /// numeric string is accepted as well as a number.
    #[serde(deserialize_with = "unix_seconds")]
    pub created_at: i64,
}

impl HistoryEntry {
    /// `created_at` as RFC 3339, or the raw number if it is out of range.
    pub fn created_at_rfc3339(&self) -> String {
        OffsetDateTime::from_unix_timestamp(self.created_at)
            .ok()
            .and_then(|t| t.format(&Rfc3339).ok())
            .unwrap_or_else(|| self.created_at.to_string())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryList {
    pub past_jobs: Vec<HistoryEntry>,
}

fn unix_seconds<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Float(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Int(n) => Ok(n),
        Raw::Float(f) => Ok(f as i64),
        Raw::Text(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| serde::de::Error::custom(format!("invalid unix timestamp: {s:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_numeric_and_string_timestamps() {
        let json = r#"{"past_jobs": [
            {"id": 1, "runner": "local", "packages": ["a", "b"], "created_at": 1700000000},
            {"id": 2, "runner": "local", "packages": ["c"], "created_at": "1700000060"}
        ]}"#;
        let list: HistoryList = serde_json::from_str(json).unwrap();
        assert_eq!(list.past_jobs[0].created_at, 1_700_000_000);
        assert_eq!(list.past_jobs[1].created_at, 1_700_000_060);
        assert_eq!(list.past_jobs[0].packages, vec!["a", "b"]);
    }

    #[test]
    fn rejects_garbage_timestamp() {
        let json = r#"{"id": 1, "runner": "r", "created_at": "yesterday"}"#;
        assert!(serde_json::from_str::<HistoryEntry>(json).is_err());
    }

    #[test]
    fn formats_rfc3339() {
        let entry = HistoryEntry {
            id: 1,
            runner: "r".into(),
            packages: vec![],
            created_at: 0,
        };
        assert_eq!(entry.created_at_rfc3339(), "1970-01-01T00:00:00Z");
    }
}
