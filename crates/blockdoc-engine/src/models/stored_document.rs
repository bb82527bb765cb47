use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

use crate::editing::block::DocumentBlock;
use crate::editing::links::create_anchor_html;

/// Identifier of a document in its store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A document as held by the store: blocks plus metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredDocument {
    pub id: DocumentId,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub last_modified: u64,
    /// Number of committing saves so far.
    #[serde(default)]
    pub revision: u64,
    #[serde(default, deserialize_with = "deserialize_blocks")]
    pub content: Vec<DocumentBlock>,
}

impl StoredDocument {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: DocumentId::new(id),
            name: name.into(),
            category: None,
            last_modified: 0,
            revision: 0,
            content: Vec::new(),
        }
    }

    pub fn summary(&self) -> DocumentSummary {
        DocumentSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            category: self.category.clone(),
            last_modified: self.last_modified,
        }
    }
}

/// Metadata-only view used for listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSummary {
    pub id: DocumentId,
    pub name: String,
    pub category: Option<String>,
    pub last_modified: u64,
}

/// Body of a save: the full block sequence plus category metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    pub category: Option<String>,
    pub content: Vec<DocumentBlock>,
}

/// Lightweight draft write or durable committing write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveMode {
    Draft,
    Commit,
}

impl SaveMode {
    pub fn is_commit(self) -> bool {
        self == SaveMode::Commit
    }
}

const KNOWN_TYPES: [&str; 11] = [
    "paragraph",
    "heading1",
    "heading2",
    "heading3",
    "quote",
    "code",
    "bulleted-list",
    "numbered-list",
    "table",
    "image",
    "file",
];

fn deserialize_blocks<'de, D>(deserializer: D) -> Result<Vec<DocumentBlock>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    raw.into_iter()
        .map(|value| serde_json::from_value(migrate_block(value)).map_err(D::Error::custom))
        .collect()
}

/// Rewrite legacy block shapes into current ones.
///
/// Standalone `link` blocks (visible text in `content`, target in `url`)
/// become paragraphs holding an inline anchor. Unrecognized types fall back
/// to paragraphs so a document written by a newer editor still opens.
pub fn migrate_block(mut value: Value) -> Value {
    let Some(object) = value.as_object_mut() else {
        return value;
    };
    let block_type = object.get("type").and_then(Value::as_str).map(str::to_string);

    match block_type.as_deref() {
        Some("link") => {
            let text = object.get("content").and_then(Value::as_str).unwrap_or("");
            let url = object.get("url").and_then(Value::as_str).unwrap_or("");
            let content = if url.is_empty() {
                text.to_string()
            } else {
                create_anchor_html(url, Some(text))
            };
            object.insert("type".into(), Value::from("paragraph"));
            object.insert("content".into(), Value::from(content));
            object.remove("url");
        }
        Some(known) if KNOWN_TYPES.contains(&known) => {}
        other => {
            log::warn!("unknown block type {other:?}, loading as paragraph");
            object.insert("type".into(), Value::from("paragraph"));
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::block::{BlockKind, BlockType};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_legacy_link_block_becomes_paragraph_with_anchor() {
        let json = r#"{
            "id": "doc", "name": "Doc",
            "content": [{"id": "l", "type": "link", "content": "Site", "url": "https://s.example"}]
        }"#;
        let document: StoredDocument = serde_json::from_str(json).unwrap();
        assert_eq!(
            document.content,
            vec![DocumentBlock::paragraph(
                "l",
                create_anchor_html("https://s.example", Some("Site"))
            )]
        );
    }

    #[test]
    fn test_unknown_type_loads_as_paragraph() {
        let json = r#"{"id":"d","name":"D","content":[{"id":"x","type":"callout","content":"hi"}]}"#;
        let document: StoredDocument = serde_json::from_str(json).unwrap();
        assert_eq!(document.content[0].kind, BlockKind::Paragraph);
        assert_eq!(document.content[0].content, "hi");

        let untyped = migrate_block(serde_json::json!({"id": "y", "content": "t"}));
        assert_eq!(untyped["type"], "paragraph");
    }

    #[test]
    fn test_missing_and_null_content() {
        let document: StoredDocument = serde_json::from_str(r#"{"id":"d","name":"D"}"#).unwrap();
        assert!(document.content.is_empty());
        let document: StoredDocument =
            serde_json::from_str(r#"{"id":"d","name":"D","content":null}"#).unwrap();
        assert!(document.content.is_empty());
    }

    #[test]
    fn test_block_round_trip_through_document() {
        let mut document = StoredDocument::new("d", "D");
        document.category = Some("notes".into());
        document.content = vec![
            DocumentBlock::paragraph("a", "x"),
            DocumentBlock::new("b", BlockKind::Code, "let x = 1;"),
        ];
        let json = serde_json::to_string(&document).unwrap();
        let back: StoredDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(back, document);
        assert_eq!(back.content[1].block_type(), BlockType::Code);
    }

    #[test]
    fn test_save_request_shape() {
        let request = SaveRequest {
            category: None,
            content: vec![DocumentBlock::paragraph("a", "")],
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({
                "category": null,
                "content": [{"id": "a", "type": "paragraph", "content": ""}]
            })
        );
    }
}
