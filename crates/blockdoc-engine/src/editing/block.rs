use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

use crate::editing::table::TableData;

/// Stable identifier of a block, assigned at creation and never reused within a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

impl BlockId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for BlockId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for BlockId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for BlockId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Block type tag without its payload.
///
/// Used wherever a caller names a type (add, change type, command menu) and
/// as the persisted `type` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockType {
    Paragraph,
    Heading1,
    Heading2,
    Heading3,
    Quote,
    Code,
    BulletedList,
    NumberedList,
    Table,
    Image,
    File,
}

impl BlockType {
    pub const ALL: [BlockType; 11] = [
        BlockType::Paragraph,
        BlockType::Heading1,
        BlockType::Heading2,
        BlockType::Heading3,
        BlockType::Quote,
        BlockType::Code,
        BlockType::BulletedList,
        BlockType::NumberedList,
        BlockType::Table,
        BlockType::Image,
        BlockType::File,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BlockType::Paragraph => "paragraph",
            BlockType::Heading1 => "heading1",
            BlockType::Heading2 => "heading2",
            BlockType::Heading3 => "heading3",
            BlockType::Quote => "quote",
            BlockType::Code => "code",
            BlockType::BulletedList => "bulleted-list",
            BlockType::NumberedList => "numbered-list",
            BlockType::Table => "table",
            BlockType::Image => "image",
            BlockType::File => "file",
        }
    }

    /// Text-bearing types keep their `content` as the primary payload.
    /// These are also the types that may be merged into each other.
    pub fn is_text(self) -> bool {
        match self {
            BlockType::Paragraph
            | BlockType::Heading1
            | BlockType::Heading2
            | BlockType::Heading3
            | BlockType::Quote
            | BlockType::Code
            | BlockType::BulletedList
            | BlockType::NumberedList => true,
            BlockType::Table | BlockType::Image | BlockType::File => false,
        }
    }

    pub fn is_list(self) -> bool {
        matches!(self, BlockType::BulletedList | BlockType::NumberedList)
    }

    pub fn upload_kind(self) -> Option<UploadKind> {
        match self {
            BlockType::Image => Some(UploadKind::Image),
            BlockType::File => Some(UploadKind::File),
            _ => None,
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which upload endpoint a file goes to and which block type hosts the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadKind {
    Image,
    File,
}

impl UploadKind {
    /// `image/*` uploads as an image, everything else as a plain file.
    pub fn from_mime(mime_type: &str) -> Self {
        if mime_type.trim().to_ascii_lowercase().starts_with("image/") {
            UploadKind::Image
        } else {
            UploadKind::File
        }
    }

    pub fn block_type(self) -> BlockType {
        match self {
            UploadKind::Image => BlockType::Image,
            UploadKind::File => BlockType::File,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    #[default]
    Center,
    Right,
}

/// Type tag plus the payload only that type carries.
///
/// Serialized flattened into [`DocumentBlock`] so the persisted shape stays
/// `{ id, type, content, url?, fileName?, fileSize?, alignment?, table? }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum BlockKind {
    Paragraph,
    Heading1,
    Heading2,
    Heading3,
    Quote,
    Code,
    BulletedList,
    NumberedList,
    Table {
        #[serde(default)]
        table: TableData,
    },
    Image {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        #[serde(rename = "fileName", default, skip_serializing_if = "Option::is_none")]
        file_name: Option<String>,
        #[serde(rename = "fileSize", default, skip_serializing_if = "Option::is_none")]
        file_size: Option<String>,
        #[serde(default)]
        alignment: Alignment,
    },
    File {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        #[serde(rename = "fileName", default, skip_serializing_if = "Option::is_none")]
        file_name: Option<String>,
        #[serde(rename = "fileSize", default, skip_serializing_if = "Option::is_none")]
        file_size: Option<String>,
    },
}

impl BlockKind {
    pub fn block_type(&self) -> BlockType {
        match self {
            BlockKind::Paragraph => BlockType::Paragraph,
            BlockKind::Heading1 => BlockType::Heading1,
            BlockKind::Heading2 => BlockType::Heading2,
            BlockKind::Heading3 => BlockType::Heading3,
            BlockKind::Quote => BlockType::Quote,
            BlockKind::Code => BlockType::Code,
            BlockKind::BulletedList => BlockType::BulletedList,
            BlockKind::NumberedList => BlockType::NumberedList,
            BlockKind::Table { .. } => BlockType::Table,
            BlockKind::Image { .. } => BlockType::Image,
            BlockKind::File { .. } => BlockType::File,
        }
    }

    /// Payload-free kind for a text type. Table, image and file need their
    /// payload supplied by the caller and are built from [`BlockKind::table`]
    /// or [`BlockKind::empty_upload`].
    pub(crate) fn text(block_type: BlockType) -> Option<Self> {
        match block_type {
            BlockType::Paragraph => Some(BlockKind::Paragraph),
            BlockType::Heading1 => Some(BlockKind::Heading1),
            BlockType::Heading2 => Some(BlockKind::Heading2),
            BlockType::Heading3 => Some(BlockKind::Heading3),
            BlockType::Quote => Some(BlockKind::Quote),
            BlockType::Code => Some(BlockKind::Code),
            BlockType::BulletedList => Some(BlockKind::BulletedList),
            BlockType::NumberedList => Some(BlockKind::NumberedList),
            BlockType::Table | BlockType::Image | BlockType::File => None,
        }
    }

    pub fn table(table: TableData) -> Self {
        BlockKind::Table { table }
    }

    pub fn empty_upload(kind: UploadKind) -> Self {
        match kind {
            UploadKind::Image => BlockKind::Image {
                url: None,
                file_name: None,
                file_size: None,
                alignment: Alignment::default(),
            },
            UploadKind::File => BlockKind::File {
                url: None,
                file_name: None,
                file_size: None,
            },
        }
    }
}

/// One unit of document content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentBlock {
    pub id: BlockId,
    #[serde(flatten)]
    pub kind: BlockKind,
    /// Inline markup for text types, plain text for code, caption or alt
    /// text for uploads. Retained but unused for tables.
    #[serde(default)]
    pub content: String,
}

impl DocumentBlock {
    pub fn new(id: impl Into<BlockId>, kind: BlockKind, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            content: content.into(),
        }
    }

    pub fn paragraph(id: impl Into<BlockId>, content: impl Into<String>) -> Self {
        Self::new(id, BlockKind::Paragraph, content)
    }

    pub fn block_type(&self) -> BlockType {
        self.kind.block_type()
    }

    pub fn url(&self) -> Option<&str> {
        match &self.kind {
            BlockKind::Image { url, .. } | BlockKind::File { url, .. } => url.as_deref(),
            _ => None,
        }
    }

    pub fn file_name(&self) -> Option<&str> {
        match &self.kind {
            BlockKind::Image { file_name, .. } | BlockKind::File { file_name, .. } => {
                file_name.as_deref()
            }
            _ => None,
        }
    }

    pub fn table(&self) -> Option<&TableData> {
        match &self.kind {
            BlockKind::Table { table } => Some(table),
            _ => None,
        }
    }

    pub(crate) fn table_mut(&mut self) -> Option<&mut TableData> {
        match &mut self.kind {
            BlockKind::Table { table } => Some(table),
            _ => None,
        }
    }

    /// An upload block of the given kind that has not received a file yet.
    pub fn is_placeholder_for(&self, kind: UploadKind) -> bool {
        self.block_type() == kind.block_type() && self.url().is_none()
    }
}

/// Partial field update merged by `UpdateBlock`.
///
/// Fields that do not apply to the resulting block type are ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockPatch {
    pub block_type: Option<BlockType>,
    pub content: Option<String>,
    pub url: Option<String>,
    pub file_name: Option<String>,
    pub file_size: Option<String>,
    pub alignment: Option<Alignment>,
    pub table: Option<TableData>,
}

impl BlockPatch {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn with_type(mut self, block_type: BlockType) -> Self {
        self.block_type = Some(block_type);
        self
    }

    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = Some(alignment);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(BlockType::Paragraph, "\"paragraph\"")]
    #[case(BlockType::Heading2, "\"heading2\"")]
    #[case(BlockType::BulletedList, "\"bulleted-list\"")]
    #[case(BlockType::NumberedList, "\"numbered-list\"")]
    fn test_block_type_wire_names(#[case] block_type: BlockType, #[case] expected: &str) {
        assert_eq!(serde_json::to_string(&block_type).unwrap(), expected);
        assert_eq!(format!("\"{}\"", block_type.as_str()), expected);
    }

    #[test]
    fn test_paragraph_serializes_flat() {
        let block = DocumentBlock::paragraph("b1", "Hello");
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": "b1", "type": "paragraph", "content": "Hello"})
        );
    }

    #[test]
    fn test_image_without_upload_omits_asset_fields() {
        let block = DocumentBlock::new("img", BlockKind::empty_upload(UploadKind::Image), "");
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": "img", "type": "image", "alignment": "center", "content": ""})
        );
    }

    #[test]
    fn test_file_block_reads_camel_case_fields() {
        let json = r#"{"id":"f","type":"file","content":"report","url":"/u/r.pdf","fileName":"r.pdf","fileSize":"2 KB"}"#;
        let block: DocumentBlock = serde_json::from_str(json).unwrap();
        assert_eq!(block.block_type(), BlockType::File);
        assert_eq!(block.url(), Some("/u/r.pdf"));
        assert_eq!(block.file_name(), Some("r.pdf"));
        assert_eq!(block.content, "report");
    }

    #[test]
    fn test_unknown_fields_on_text_blocks_are_ignored() {
        let json = r#"{"id":"p","type":"heading1","content":"Title","alignment":"left"}"#;
        let block: DocumentBlock = serde_json::from_str(json).unwrap();
        assert_eq!(block.kind, BlockKind::Heading1);
    }

    #[test]
    fn test_missing_content_defaults_to_empty() {
        let block: DocumentBlock = serde_json::from_str(r#"{"id":"q","type":"quote"}"#).unwrap();
        assert_eq!(block.content, "");
    }

    #[rstest]
    #[case("image/png", UploadKind::Image)]
    #[case("IMAGE/JPEG", UploadKind::Image)]
    #[case("application/pdf", UploadKind::File)]
    #[case("", UploadKind::File)]
    fn test_upload_kind_from_mime(#[case] mime: &str, #[case] expected: UploadKind) {
        assert_eq!(UploadKind::from_mime(mime), expected);
    }

    #[test]
    fn test_placeholder_detection() {
        let empty = DocumentBlock::new("i", BlockKind::empty_upload(UploadKind::Image), "");
        assert!(empty.is_placeholder_for(UploadKind::Image));
        assert!(!empty.is_placeholder_for(UploadKind::File));

        let uploaded = DocumentBlock::new(
            "i",
            BlockKind::Image {
                url: Some("/a.png".into()),
                file_name: None,
                file_size: None,
                alignment: Alignment::Left,
            },
            "",
        );
        assert!(!uploaded.is_placeholder_for(UploadKind::Image));
    }
}
