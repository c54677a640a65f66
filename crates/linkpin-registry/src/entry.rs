use serde::{Deserialize, Serialize};

/// One saved link. Field names on disk are `submitter`, `content`, `recordedAt`;
/// files written by the older bot used `user` and `time`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkEntry {
    #[serde(alias = "user", default)]
    pub submitter: String,
    pub content: String,
    #[serde(alias = "time", default)]
    pub recorded_at: String,
}

/// Whoever issued a command: numeric platform id plus the name entries are attributed to
/// (handle, falling back to display name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    pub user_id: i64,
    pub name: String,
}

impl Requester {
    pub fn new(user_id: i64, name: impl Into<String>) -> Self {
        Self {
            user_id,
            name: name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::LinkEntry;

    #[test]
    fn reads_legacy_field_names() {
        let raw = r#"[{"user":"alice","content":"https://x.com/a","time":"07:00:00 18/10/2026"}]"#;
        let entries: Vec<LinkEntry> = serde_json::from_str(raw).expect("parse");
        assert_eq!(entries[0].submitter, "alice");
        assert_eq!(entries[0].recorded_at, "07:00:00 18/10/2026");
    }

    #[test]
    fn writes_camel_case_timestamp_key() {
        let entry = LinkEntry {
            submitter: "bob".to_string(),
            content: "https://x.com/b".to_string(),
            recorded_at: "08:15:00 18/10/2026".to_string(),
        };
        let json = serde_json::to_value(&entry).expect("encode");
        assert_eq!(json["recordedAt"], "08:15:00 18/10/2026");
        assert!(json.get("recorded_at").is_none());
    }
}
