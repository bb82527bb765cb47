use crate::editing::block::BlockType;

/// What choosing a menu entry does to the focused block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandTarget {
    Block(BlockType),
    Link,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOption {
    pub target: CommandTarget,
    pub label: &'static str,
    pub description: &'static str,
    pub keywords: &'static [&'static str],
}

const fn block(
    block_type: BlockType,
    label: &'static str,
    description: &'static str,
    keywords: &'static [&'static str],
) -> CommandOption {
    CommandOption {
        target: CommandTarget::Block(block_type),
        label,
        description,
        keywords,
    }
}

static OPTIONS: [CommandOption; 12] = [
    block(BlockType::Paragraph, "Text", "Plain text paragraph", &["text", "paragraph"]),
    block(
        BlockType::Heading1,
        "Heading 1",
        "Large heading",
        &["heading 1", "heading1", "h1", "title", "header"],
    ),
    block(
        BlockType::Heading2,
        "Heading 2",
        "Medium heading",
        &["heading 2", "heading2", "h2", "subtitle", "subheader"],
    ),
    block(
        BlockType::Heading3,
        "Heading 3",
        "Small heading",
        &["heading 3", "heading3", "h3", "subsubtitle"],
    ),
    block(
        BlockType::BulletedList,
        "Bulleted list",
        "Unordered list with bullets",
        &["bulleted list", "bulleted-list", "bullet", "ul", "unordered"],
    ),
    block(
        BlockType::NumberedList,
        "Numbered list",
        "Ordered list with numbers",
        &["numbered list", "numbered-list", "number", "ol", "ordered"],
    ),
    block(
        BlockType::Quote,
        "Quote",
        "Quote or citation block",
        &["quote", "citation", "blockquote"],
    ),
    block(
        BlockType::Code,
        "Code",
        "Code block",
        &["code", "codeblock", "snippet"],
    ),
    block(
        BlockType::Image,
        "Image",
        "Insert an image",
        &["image", "img", "picture", "photo"],
    ),
    block(
        BlockType::File,
        "File",
        "Insert a file attachment",
        &["file", "attachment", "document"],
    ),
    block(
        BlockType::Table,
        "Table",
        "Insert a table (use /table 3x4 for dimensions)",
        &["table", "grid", "spreadsheet"],
    ),
    CommandOption {
        target: CommandTarget::Link,
        label: "Link",
        description: "Insert a hyperlink",
        keywords: &["link", "url", "hyperlink", "anchor"],
    },
];

pub fn options() -> &'static [CommandOption] {
    &OPTIONS
}

impl CommandOption {
    /// Stable identifier: the block type tag, or `link`.
    pub fn id(&self) -> &'static str {
        match self.target {
            CommandTarget::Block(block_type) => block_type.as_str(),
            CommandTarget::Link => "link",
        }
    }

    fn matches(&self, query: &str) -> bool {
        self.label.to_lowercase().contains(query)
            || self.id().contains(query)
            || self.keywords.iter().any(|k| k.contains(query))
    }
}

/// Options whose label, id or keywords contain `query`, case-insensitively.
/// A blank query returns everything in catalogue order.
pub fn filter(query: &str) -> Vec<&'static CommandOption> {
    let query = query.trim().to_lowercase();
    OPTIONS
        .iter()
        .filter(|option| query.is_empty() || option.matches(&query))
        .collect()
}
