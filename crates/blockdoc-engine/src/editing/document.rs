use std::collections::HashMap;
use std::fmt;

use crate::editing::block::{Alignment, BlockId, BlockKind, BlockPatch, BlockType, DocumentBlock};
use crate::editing::commands::Cmd;
use crate::editing::ids::{IdSource, fresh_id};
use crate::editing::markup;
use crate::editing::patch::{Focus, Patch};
use crate::editing::table::{TableData, TableSize};

pub const DEFAULT_MAX_TABLE_DIMENSION: usize = 100;

/// Ordered, never-empty sequence of blocks with O(1) lookup by id.
///
/// The sequence is stored as an arena: `order` holds the ids in document
/// order and `records` maps each id to its block. All mutation goes through
/// [`BlockList::apply`], which bumps `version` whenever a command changes
/// anything. The version doubles as the local revision used to decide whether
/// a save response may still be reconciled.
pub struct BlockList {
    order: Vec<BlockId>,
    records: HashMap<BlockId, DocumentBlock>,
    ids: Box<dyn IdSource>,
    default_table: TableSize,
    max_table_dimension: usize,
    version: u64,
}

impl fmt::Debug for BlockList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockList")
            .field("blocks", &self.to_vec())
            .field("version", &self.version)
            .finish()
    }
}

#[derive(Default)]
struct Outcome {
    changed: Vec<BlockId>,
    created: Option<BlockId>,
    removed: Option<BlockId>,
    focus: Option<Focus>,
}

impl Outcome {
    fn changed(id: &BlockId) -> Self {
        Self {
            changed: vec![id.clone()],
            ..Self::default()
        }
    }

    fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.created.is_none() && self.removed.is_none()
    }
}

impl BlockList {
    /// A document holding a single empty paragraph.
    pub fn new(ids: Box<dyn IdSource>) -> Self {
        Self::from_blocks(Vec::new(), ids)
    }

    /// Adopt stored blocks, repairing anything that would break an invariant:
    /// missing or duplicate ids are reassigned, table grids are normalized and
    /// an empty sequence gets one paragraph.
    pub fn from_blocks(blocks: Vec<DocumentBlock>, ids: Box<dyn IdSource>) -> Self {
        let mut list = Self {
            order: Vec::new(),
            records: HashMap::new(),
            ids,
            default_table: TableSize::default(),
            max_table_dimension: DEFAULT_MAX_TABLE_DIMENSION,
            version: 0,
        };
        list.load(blocks);
        list
    }

    pub fn with_table_limits(mut self, default_table: TableSize, max_dimension: usize) -> Self {
        self.max_table_dimension = max_dimension.max(1);
        self.default_table = default_table.capped(self.max_table_dimension);
        self
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn ids(&self) -> &[BlockId] {
        &self.order
    }

    pub fn get(&self, id: &BlockId) -> Option<&DocumentBlock> {
        self.records.get(id)
    }

    pub fn contains(&self, id: &BlockId) -> bool {
        self.records.contains_key(id)
    }

    pub fn index_of(&self, id: &BlockId) -> Option<usize> {
        if !self.records.contains_key(id) {
            return None;
        }
        self.order.iter().position(|candidate| candidate == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DocumentBlock> {
        self.order.iter().filter_map(|id| self.records.get(id))
    }

    pub fn to_vec(&self) -> Vec<DocumentBlock> {
        self.iter().cloned().collect()
    }

    /// Insert a blank block and return its id.
    pub fn add_block(&mut self, after: &BlockId, block_type: BlockType) -> BlockId {
        let (id, outcome) = self.add(after, block_type);
        self.finish(outcome);
        id
    }

    pub fn apply(&mut self, cmd: Cmd) -> Patch {
        let outcome = match cmd {
            Cmd::AddBlock { after, block_type } => self.add(&after, block_type).1,
            Cmd::UpdateBlock { id, patch } => self.update(&id, patch),
            Cmd::DeleteBlock { id } => self.delete(&id),
            Cmd::ChangeBlockType { id, to, table } => self.change_type(&id, to, table),
            Cmd::MoveBlock { from, to } => self.move_block(&from, &to),
            Cmd::SplitBlock { id, at } => self.split(&id, at),
            Cmd::MergeWithPrevious { id } => self.merge_with_previous(&id),
            Cmd::AddTableRow { id } => self.with_table(&id, |table, ids| {
                table.add_row(ids);
                true
            }),
            Cmd::AddTableColumn { id } => self.with_table(&id, |table, ids| {
                table.add_column(ids);
                true
            }),
            Cmd::RemoveTableRow { id } => self.with_table(&id, |table, _| table.remove_row()),
            Cmd::RemoveTableColumn { id } => {
                self.with_table(&id, |table, _| table.remove_column())
            }
            Cmd::UpdateTableCell {
                id,
                cell_id,
                content,
            } => self.with_table(&id, |table, _| table.update_cell(&cell_id, &content)),
            Cmd::ReplaceAll { blocks } => self.replace_all(blocks),
        };
        self.finish(outcome)
    }

    fn finish(&mut self, outcome: Outcome) -> Patch {
        if !outcome.is_empty() {
            self.version += 1;
        }
        Patch {
            changed: outcome.changed,
            created: outcome.created,
            removed: outcome.removed,
            focus: outcome.focus,
            version: self.version,
        }
    }

    fn load(&mut self, blocks: Vec<DocumentBlock>) {
        self.order.clear();
        self.records.clear();
        for mut block in blocks {
            if block.id.as_str().is_empty() || self.records.contains_key(&block.id) {
                let id = fresh_id(self.ids.as_mut(), |c| self.records.contains_key(c));
                log::debug!("reassigning block id {:?} to {id}", block.id.as_str());
                block.id = BlockId::from(id);
            }
            if let BlockKind::Table { table } = &mut block.kind {
                *table = std::mem::take(table).normalized(self.default_table, self.ids.as_mut());
            }
            self.order.push(block.id.clone());
            self.records.insert(block.id.clone(), block);
        }
        if self.order.is_empty() {
            let id = self.fresh_block_id();
            self.order.push(id.clone());
            self.records.insert(id.clone(), DocumentBlock::paragraph(id, ""));
        }
    }

    fn fresh_block_id(&mut self) -> BlockId {
        BlockId::from(fresh_id(self.ids.as_mut(), |c| self.records.contains_key(c)))
    }

    fn table_size(&self, requested: Option<TableSize>) -> TableSize {
        requested
            .unwrap_or(self.default_table)
            .capped(self.max_table_dimension)
    }

    fn blank_kind(&mut self, block_type: BlockType) -> BlockKind {
        if let Some(kind) = BlockKind::text(block_type) {
            return kind;
        }
        match block_type.upload_kind() {
            Some(kind) => BlockKind::empty_upload(kind),
            None => BlockKind::table(TableData::new(self.table_size(None), self.ids.as_mut())),
        }
    }

    fn add(&mut self, after: &BlockId, block_type: BlockType) -> (BlockId, Outcome) {
        let id = self.fresh_block_id();
        let kind = self.blank_kind(block_type);
        let index = match self.index_of(after) {
            Some(index) => index + 1,
            None => {
                log::debug!("add_block: anchor {after} not found, appending");
                self.order.len()
            }
        };
        self.order.insert(index, id.clone());
        self.records
            .insert(id.clone(), DocumentBlock::new(id.clone(), kind, ""));

        let outcome = Outcome {
            changed: vec![id.clone()],
            created: Some(id.clone()),
            removed: None,
            focus: Some(Focus {
                block: id.clone(),
                caret: Some(0),
            }),
        };
        (id, outcome)
    }

    fn update(&mut self, id: &BlockId, patch: BlockPatch) -> Outcome {
        let Some(before) = self.records.get(id).cloned() else {
            log::debug!("update_block: {id} not found");
            return Outcome::default();
        };

        let retype_to = patch.block_type.filter(|to| *to != before.block_type());
        let table = match (retype_to, patch.table) {
            (_, Some(table)) => Some(table.normalized(self.table_size(None), self.ids.as_mut())),
            (Some(BlockType::Table), None) => Some(TableData::new(
                self.table_size(None),
                self.ids.as_mut(),
            )),
            _ => None,
        };

        let Some(block) = self.records.get_mut(id) else {
            return Outcome::default();
        };
        if let Some(to) = retype_to {
            retype(block, to, table.clone());
        }
        if let Some(content) = patch.content {
            block.content = content;
        }
        match &mut block.kind {
            BlockKind::Image {
                url,
                file_name,
                file_size,
                alignment,
            } => {
                assign(url, patch.url);
                assign(file_name, patch.file_name);
                assign(file_size, patch.file_size);
                if let Some(value) = patch.alignment {
                    *alignment = value;
                }
            }
            BlockKind::File {
                url,
                file_name,
                file_size,
            } => {
                assign(url, patch.url);
                assign(file_name, patch.file_name);
                assign(file_size, patch.file_size);
            }
            BlockKind::Table { table: current } => {
                if let Some(table) = table {
                    *current = table;
                }
            }
            _ => {}
        }

        if *block == before {
            Outcome::default()
        } else {
            Outcome::changed(id)
        }
    }

    fn delete(&mut self, id: &BlockId) -> Outcome {
        if self.order.len() <= 1 {
            log::debug!("delete_block: refusing to remove the last block");
            return Outcome::default();
        }
        let Some(index) = self.index_of(id) else {
            return Outcome::default();
        };
        self.order.remove(index);
        self.records.remove(id);

        // previous sibling, or the block that slid into the removed slot
        let focus = self.order.get(index.saturating_sub(1)).cloned();
        Outcome {
            removed: Some(id.clone()),
            focus: focus.map(|block| Focus { block, caret: None }),
            ..Outcome::default()
        }
    }

    fn change_type(&mut self, id: &BlockId, to: BlockType, size: Option<TableSize>) -> Outcome {
        let Some(current) = self.records.get(id).map(DocumentBlock::block_type) else {
            return Outcome::default();
        };
        if current == to && to != BlockType::Table {
            return Outcome::default();
        }
        let table = (to == BlockType::Table)
            .then(|| TableData::new(self.table_size(size), self.ids.as_mut()));
        let Some(block) = self.records.get_mut(id) else {
            return Outcome::default();
        };
        retype(block, to, table);
        Outcome::changed(id)
    }

    fn move_block(&mut self, from: &BlockId, to: &BlockId) -> Outcome {
        if from == to {
            return Outcome::default();
        }
        let (Some(from_index), Some(to_index)) = (self.index_of(from), self.index_of(to)) else {
            log::debug!("move_block: {from} or {to} not found");
            return Outcome::default();
        };
        let moving = self.order.remove(from_index);
        let to_index = to_index.min(self.order.len());
        self.order.insert(to_index, moving);
        Outcome::changed(from)
    }

    fn split(&mut self, id: &BlockId, at: usize) -> Outcome {
        let Some(block) = self.records.get(id) else {
            return Outcome::default();
        };
        let block_type = block.block_type();
        if !block_type.is_text() {
            return self.add(id, BlockType::Paragraph).1;
        }

        let (left, right) = if block_type == BlockType::Code {
            split_plain(&block.content, at)
        } else {
            markup::split_at(&block.content, at)
        };
        let new_type = if block_type.is_list() {
            block_type
        } else {
            BlockType::Paragraph
        };

        let (new_id, mut outcome) = self.add(id, new_type);
        if let Some(block) = self.records.get_mut(id) {
            block.content = left;
        }
        if let Some(block) = self.records.get_mut(&new_id) {
            block.content = right;
        }
        outcome.changed.insert(0, id.clone());
        outcome
    }

    fn merge_with_previous(&mut self, id: &BlockId) -> Outcome {
        let Some(index) = self.index_of(id) else {
            return Outcome::default();
        };
        if index == 0 {
            return Outcome::default();
        }
        let previous_id = self.order[index - 1].clone();
        let (Some(previous), Some(current)) = (self.records.get(&previous_id), self.records.get(id))
        else {
            return Outcome::default();
        };
        if !previous.block_type().is_text() || !current.block_type().is_text() {
            return Outcome::default();
        }

        let caret = text_len(previous);
        let appended = current.content.clone();
        self.order.remove(index);
        self.records.remove(id);
        if let Some(previous) = self.records.get_mut(&previous_id) {
            previous.content.push_str(&appended);
        }
        Outcome {
            changed: vec![previous_id.clone()],
            created: None,
            removed: Some(id.clone()),
            focus: Some(Focus {
                block: previous_id,
                caret: Some(caret),
            }),
        }
    }

    fn with_table(
        &mut self,
        id: &BlockId,
        op: impl FnOnce(&mut TableData, &mut dyn IdSource) -> bool,
    ) -> Outcome {
        let Some(table) = self.records.get_mut(id).and_then(DocumentBlock::table_mut) else {
            log::debug!("table command on {id}: no such table block");
            return Outcome::default();
        };
        if op(table, self.ids.as_mut()) {
            Outcome::changed(id)
        } else {
            Outcome::default()
        }
    }

    fn replace_all(&mut self, blocks: Vec<DocumentBlock>) -> Outcome {
        let before = self.to_vec();
        self.load(blocks);
        if self.to_vec() == before {
            return Outcome::default();
        }
        Outcome {
            changed: self.order.clone(),
            ..Outcome::default()
        }
    }
}

/// Caret-space length of a block's content.
pub fn text_len(block: &DocumentBlock) -> usize {
    match block.block_type() {
        BlockType::Code => block.content.chars().count(),
        _ => markup::plain_len(&block.content),
    }
}

fn split_plain(content: &str, at: usize) -> (String, String) {
    let byte = content
        .char_indices()
        .nth(at)
        .map_or(content.len(), |(index, _)| index);
    (content[..byte].to_string(), content[byte..].to_string())
}

fn assign(slot: &mut Option<String>, value: Option<String>) {
    if let Some(value) = value {
        *slot = Some(value);
    }
}

/// Convert a block in place. Upload metadata survives image/file swaps,
/// leaving a table keeps its first cell as text, and entering a table
/// installs `fresh_table` and clears the inline content.
fn retype(block: &mut DocumentBlock, to: BlockType, fresh_table: Option<TableData>) {
    let previous = std::mem::replace(&mut block.kind, BlockKind::Paragraph);
    if let BlockKind::Table { table } = &previous
        && to != BlockType::Table
    {
        block.content = table.first_cell_content().unwrap_or_default().to_string();
    }

    block.kind = match (to, previous) {
        (BlockType::Table, _) => {
            block.content.clear();
            BlockKind::table(fresh_table.unwrap_or_default())
        }
        (
            BlockType::Image,
            BlockKind::File {
                url,
                file_name,
                file_size,
            },
        ) => BlockKind::Image {
            url,
            file_name,
            file_size,
            alignment: Alignment::default(),
        },
        (
            BlockType::File,
            BlockKind::Image {
                url,
                file_name,
                file_size,
                ..
            },
        ) => BlockKind::File {
            url,
            file_name,
            file_size,
        },
        (to, previous) if previous.block_type() == to => previous,
        (to, _) => match to.upload_kind() {
            Some(kind) => BlockKind::empty_upload(kind),
            None => BlockKind::text(to).unwrap_or(BlockKind::Paragraph),
        },
    };
}
