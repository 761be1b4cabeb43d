//! Domain types for rollout documents.
//!
//! Documents are plain JSON, matching the shape published to the
//! backing store by release tooling. Unknown fields are ignored on
//! deserialize (older documents carry a legacy `operator` field the
//! workflow never reads).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which side of a rollout a document describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateKind {
    /// What is true now.
    Current,
    /// What we want to become true.
    Desired,
}

impl StateKind {
    /// The attribute key this kind is stored under.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::Desired => "desired",
        }
    }
}

/// One release's rollout document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RolloutDoc {
    /// Release identifier; also the document's key in the store.
    pub id: String,
    /// Opaque payload representing the release state.
    pub data: Value,
    /// Named conditions gating the advance to this release.
    #[serde(default)]
    pub conditions: BTreeMap<String, ConditionSpec>,
    /// Retries after the first check attempt.
    #[serde(default)]
    pub retry_count: u32,
    /// Upper bound of the random backoff jitter, in seconds.
    #[serde(default = "default_random_wait")]
    pub random_wait: u64,
}

/// How to build one peer-group condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionSpec {
    /// Peer search query, opaque to the engine.
    pub query: String,
    /// Attribute path used to bucket peers into deploy groups.
    pub attribute: Vec<String>,
}

fn default_random_wait() -> u64 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_a_full_document() {
        let doc: RolloutDoc = serde_json::from_value(json!({
            "id": "2",
            "data": { "repo_name": "test-application-2" },
            "retry_count": 3,
            "random_wait": 10,
            "conditions": {
                "by fqdn": { "query": "fqdn:*", "attribute": ["fqdn"] }
            },
            "operator": "and"
        }))
        .unwrap();

        assert_eq!(doc.id, "2");
        assert_eq!(doc.retry_count, 3);
        assert_eq!(doc.random_wait, 10);
        assert_eq!(doc.conditions["by fqdn"].query, "fqdn:*");
        assert_eq!(doc.conditions["by fqdn"].attribute, vec!["fqdn"]);
    }

    #[test]
    fn missing_policy_fields_take_defaults() {
        let doc: RolloutDoc = serde_json::from_value(json!({
            "id": "1",
            "data": null
        }))
        .unwrap();

        assert!(doc.conditions.is_empty());
        assert_eq!(doc.retry_count, 0);
        assert_eq!(doc.random_wait, 60);
    }

    #[test]
    fn state_kind_keys() {
        assert_eq!(StateKind::Current.as_str(), "current");
        assert_eq!(StateKind::Desired.as_str(), "desired");
    }
}
