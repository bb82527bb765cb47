use crate::editing::block::{BlockId, BlockPatch, BlockType, DocumentBlock};
use crate::editing::table::TableSize;

/// Every sanctioned mutation of a block sequence.
///
/// Commands naming an id that is not present are accepted and do nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum Cmd {
    /// Insert a blank block after `after`, or at the end when `after` is unknown.
    AddBlock {
        after: BlockId,
        block_type: BlockType,
    },
    /// Merge fields into a block. Never changes the id.
    UpdateBlock { id: BlockId, patch: BlockPatch },
    /// Remove a block unless it is the last one left.
    DeleteBlock { id: BlockId },
    /// Retype a block. Converting to a table always builds a fresh empty grid.
    ChangeBlockType {
        id: BlockId,
        to: BlockType,
        table: Option<TableSize>,
    },
    /// Take `from` out of the sequence and reinsert it at `to`'s former index.
    MoveBlock { from: BlockId, to: BlockId },
    /// Split inline content at a plain-text offset into a new following block.
    SplitBlock { id: BlockId, at: usize },
    /// Append a block's content to its predecessor and remove it.
    MergeWithPrevious { id: BlockId },
    AddTableRow { id: BlockId },
    AddTableColumn { id: BlockId },
    RemoveTableRow { id: BlockId },
    RemoveTableColumn { id: BlockId },
    UpdateTableCell {
        id: BlockId,
        cell_id: String,
        content: String,
    },
    /// Reconcile to a canonical copy of the whole sequence.
    ReplaceAll { blocks: Vec<DocumentBlock> },
}
