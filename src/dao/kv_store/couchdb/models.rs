use serde::{Deserialize, Serialize};

/// Prefix applied to every game record document id.
pub const GAME_PREFIX: &str = "game::";

/// Document wrapping one stored value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchValueDocument {
    /// Document id, see [`value_doc_id`].
    #[serde(rename = "_id")]
    pub id: String,
    /// Current revision, required to overwrite an existing document.
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    /// Stored value as UTF-8 text.
    pub value: String,
}

/// Minimal body used when only the revision of a document matters.
#[derive(Debug, Deserialize)]
pub struct CouchRevision {
    /// Current revision.
    #[serde(rename = "_rev")]
    pub rev: String,
}

/// Document id holding the value stored under `key`.
pub fn value_doc_id(key: &str) -> String {
    format!("{GAME_PREFIX}{key}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_documents_omit_revision() {
        let doc = CouchValueDocument {
            id: value_doc_id("abc"),
            rev: None,
            value: "{}".into(),
        };
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["_id"], "game::abc");
        assert!(json.get("_rev").is_none());
    }
}
