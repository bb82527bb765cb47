/*!
# Editor Session

One checked-out document: the block sequence plus everything that reacts to
it. Every mutation enters through the session, which

1. applies it to the [`BlockList`],
2. dispatches a draft save when the sequence changed, and
3. (re)arms the idle-commit timer once that draft succeeds.

Uploads, drag-and-drop, paste, slash commands and the link dialog all funnel
into the same mutators.

## Threading

The session is a cheap `Clone` handle over shared state behind a
`std::sync::Mutex`. Mutators are synchronous and never hold the lock across
an `.await`; background saves and uploads are spawned on the tokio runtime
captured by [`EditorSession::open`].
*/

mod interaction;
mod saving;
mod uploads;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;

use crate::autosave::{AutosaveState, SavedState};
use crate::drag::DragController;
use crate::editing::{
    BlockId, BlockList, BlockPatch, BlockType, Cmd, DocumentBlock, IdStrategy, LinkDialog, Patch,
    SelectionTracker, SlashCommand, TableSize, document::text_len, slash_command,
};
use crate::models::{DocumentId, StoredDocument};
use crate::notify::Notifier;
use crate::store::{DocumentStore, StoreError};
use crate::upload::{UploadTracker, UploadTransport};

pub use interaction::{DropOutcome, Paste, PasteOutcome};
pub use uploads::{PendingUploads, UploadOutcome};

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Quiet period after a successful draft save before committing.
    pub idle_commit: Duration,
    pub default_table: TableSize,
    pub max_table_dimension: usize,
    /// Size limit quoted in "file too large" messages.
    pub max_upload_mb: u64,
    pub ids: IdStrategy,
    pub read_only: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_commit: Duration::from_secs(10),
            default_table: TableSize::default(),
            max_table_dimension: crate::editing::document::DEFAULT_MAX_TABLE_DIMENSION,
            max_upload_mb: 50,
            ids: IdStrategy::default(),
            read_only: false,
        }
    }
}

/// Document metadata as last seen from the store, plus local category edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMeta {
    pub name: String,
    pub category: Option<String>,
    pub last_modified: u64,
    pub revision: u64,
}

impl DocumentMeta {
    fn from_document(document: &StoredDocument) -> Self {
        Self {
            name: document.name.clone(),
            category: document.category.clone(),
            last_modified: document.last_modified,
            revision: document.revision,
        }
    }

    fn refresh(&mut self, document: &StoredDocument) {
        self.name = document.name.clone();
        self.last_modified = document.last_modified;
        self.revision = document.revision;
    }
}

struct State {
    blocks: BlockList,
    meta: DocumentMeta,
    autosave: AutosaveState,
    uploads: UploadTracker,
    selection: SelectionTracker,
    link_dialog: Option<LinkDialog>,
    drag: DragController,
    read_only: bool,
    closed: bool,
}

impl State {
    fn editable(&self) -> bool {
        !self.read_only && !self.closed
    }

    fn saved_state(&self) -> SavedState {
        SavedState {
            blocks: self.blocks.to_vec(),
            category: self.meta.category.clone(),
        }
    }
}

struct Shared<S, U> {
    id: DocumentId,
    store: S,
    uploads: U,
    notifier: Arc<dyn Notifier>,
    config: SessionConfig,
    runtime: Handle,
    state: Mutex<State>,
}

impl<S, U> Shared<S, U> {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle to an open document. Clones share the same session.
pub struct EditorSession<S, U> {
    shared: Arc<Shared<S, U>>,
}

impl<S, U> Clone for EditorSession<S, U> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S: DocumentStore, U: UploadTransport> EditorSession<S, U> {
    /// Load `id` from the store and start editing it.
    ///
    /// Must be called from within a tokio runtime; background saves and
    /// uploads are spawned onto it.
    pub async fn open(
        store: S,
        uploads: U,
        notifier: Arc<dyn Notifier>,
        id: DocumentId,
        config: SessionConfig,
    ) -> Result<Self, StoreError> {
        let document = store.load_document(&id).await?;
        let meta = DocumentMeta::from_document(&document);
        let blocks = BlockList::from_blocks(document.content, config.ids.build())
            .with_table_limits(config.default_table, config.max_table_dimension);
        let autosave = AutosaveState::loaded(SavedState {
            blocks: blocks.to_vec(),
            category: meta.category.clone(),
        });
        log::info!("opened document {id} with {} blocks", blocks.len());

        let state = State {
            blocks,
            meta,
            autosave,
            uploads: UploadTracker::default(),
            selection: SelectionTracker::new(),
            link_dialog: None,
            drag: DragController::new(),
            read_only: config.read_only,
            closed: false,
        };
        Ok(Self {
            shared: Arc::new(Shared {
                id,
                store,
                uploads,
                notifier,
                config,
                runtime: Handle::current(),
                state: Mutex::new(state),
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.shared.lock()
    }

    pub fn id(&self) -> &DocumentId {
        &self.shared.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }

    pub fn blocks(&self) -> Vec<DocumentBlock> {
        self.lock().blocks.to_vec()
    }

    pub fn block(&self, id: &BlockId) -> Option<DocumentBlock> {
        self.lock().blocks.get(id).cloned()
    }

    /// Local revision; bumps on every effective mutation.
    pub fn version(&self) -> u64 {
        self.lock().blocks.version()
    }

    pub fn meta(&self) -> DocumentMeta {
        self.lock().meta.clone()
    }

    pub fn is_uploading(&self, id: &BlockId) -> bool {
        self.lock().uploads.is_uploading(id.as_str())
    }

    pub fn uploading(&self) -> Vec<BlockId> {
        self.lock().uploads.ids().cloned().collect()
    }

    pub fn is_read_only(&self) -> bool {
        let state = self.lock();
        !state.editable()
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn set_read_only(&self, read_only: bool) {
        self.lock().read_only = read_only;
    }

    /// Apply a command and schedule a draft save if it changed anything.
    /// Read-only and closed sessions ignore every command.
    pub fn apply(&self, cmd: Cmd) -> Patch {
        let mut state = self.lock();
        self.apply_locked(&mut state, cmd)
    }

    fn apply_locked(&self, state: &mut State, cmd: Cmd) -> Patch {
        if !state.editable() {
            log::debug!("ignoring {cmd:?} on read-only session");
            return Patch {
                version: state.blocks.version(),
                ..Patch::default()
            };
        }
        let patch = state.blocks.apply(cmd);
        if let Some(removed) = &patch.removed {
            state.selection.forget(removed);
        }
        if patch.applied() {
            self.schedule_draft(state, false);
        }
        patch
    }

    pub fn add_block(&self, after: &BlockId, block_type: Option<BlockType>) -> Option<BlockId> {
        self.apply(Cmd::AddBlock {
            after: after.clone(),
            block_type: block_type.unwrap_or(BlockType::Paragraph),
        })
        .created
    }

    pub fn update_block(&self, id: &BlockId, patch: BlockPatch) -> Patch {
        self.apply(Cmd::UpdateBlock {
            id: id.clone(),
            patch,
        })
    }

    pub fn delete_block(&self, id: &BlockId) -> Patch {
        self.apply(Cmd::DeleteBlock { id: id.clone() })
    }

    pub fn change_block_type(&self, id: &BlockId, to: BlockType, table: Option<TableSize>) -> Patch {
        self.apply(Cmd::ChangeBlockType {
            id: id.clone(),
            to,
            table,
        })
    }

    pub fn move_block(&self, from: &BlockId, to: &BlockId) -> Patch {
        self.apply(Cmd::MoveBlock {
            from: from.clone(),
            to: to.clone(),
        })
    }

    pub fn split_block(&self, id: &BlockId, at: usize) -> Patch {
        self.apply(Cmd::SplitBlock { id: id.clone(), at })
    }

    pub fn merge_with_previous(&self, id: &BlockId) -> Patch {
        self.apply(Cmd::MergeWithPrevious { id: id.clone() })
    }

    /// Backspace at the start of a block: an empty text block is deleted,
    /// anything else merges into its predecessor.
    pub fn backspace_at_start(&self, id: &BlockId) -> Patch {
        let empty = self.block(id).is_some_and(|block| {
            block.block_type().is_text() && text_len(&block) == 0
        });
        if empty {
            self.delete_block(id)
        } else {
            self.merge_with_previous(id)
        }
    }

    pub fn add_table_row(&self, id: &BlockId) -> Patch {
        self.apply(Cmd::AddTableRow { id: id.clone() })
    }

    pub fn add_table_column(&self, id: &BlockId) -> Patch {
        self.apply(Cmd::AddTableColumn { id: id.clone() })
    }

    pub fn remove_table_row(&self, id: &BlockId) -> Patch {
        self.apply(Cmd::RemoveTableRow { id: id.clone() })
    }

    pub fn remove_table_column(&self, id: &BlockId) -> Patch {
        self.apply(Cmd::RemoveTableColumn { id: id.clone() })
    }

    pub fn update_table_cell(&self, id: &BlockId, cell_id: &str, content: &str) -> Patch {
        self.apply(Cmd::UpdateTableCell {
            id: id.clone(),
            cell_id: cell_id.to_string(),
            content: content.to_string(),
        })
    }

    /// Store new content typed into a block, then run slash-command detection
    /// on text blocks. Image and file captions are never commands.
    ///
    /// `/link` clears the block and opens a blank link dialog for it;
    /// `/table WxH` turns the block into a fresh table.
    pub fn handle_input(&self, id: &BlockId, content: &str) -> (Patch, Option<SlashCommand>) {
        let mut state = self.lock();
        let mut patch = self.apply_locked(
            &mut state,
            Cmd::UpdateBlock {
                id: id.clone(),
                patch: BlockPatch::content(content),
            },
        );
        if !state.editable() {
            return (patch, None);
        }

        let command = state
            .blocks
            .get(id)
            .filter(|block| block.block_type().is_text())
            .and_then(|block| slash_command::detect(&block.content));
        match command {
            Some(SlashCommand::Link) => {
                let cleared = self.apply_locked(
                    &mut state,
                    Cmd::UpdateBlock {
                        id: id.clone(),
                        patch: BlockPatch::content(""),
                    },
                );
                patch.absorb(cleared);
                state.link_dialog = Some(LinkDialog::for_block(id.clone()));
            }
            Some(SlashCommand::Table(size)) => {
                let table = self.apply_locked(
                    &mut state,
                    Cmd::ChangeBlockType {
                        id: id.clone(),
                        to: BlockType::Table,
                        table: Some(size),
                    },
                );
                patch.absorb(table);
            }
            None => {}
        }
        if let Some(command) = &command {
            log::debug!("block {id}: slash command {command:?}");
        }
        (patch, command)
    }

    /// Update the document category. Issues a draft save even though the
    /// blocks did not change.
    pub fn set_category(&self, category: Option<String>) {
        let mut state = self.lock();
        if !state.editable() || state.meta.category == category {
            return;
        }
        state.meta.category = category;
        self.schedule_draft(&mut state, true);
    }

    /// Tear down the session: cancel the idle timer and, when the local state
    /// was never committed, send one final committing save.
    ///
    /// Afterwards the session behaves as read-only.
    pub async fn close(&self) {
        let pending = {
            let mut state = self.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            state.autosave.cancel_timer();
            state.link_dialog = None;
            state.drag.drag_end();
            let current = state.saved_state();
            let needed = state.autosave.commit_needed(&current);
            if needed {
                state.autosave.begin_commit(&current);
            }
            needed.then_some(current)
        };
        if let Some(current) = pending {
            log::info!("flushing {} on close", self.shared.id);
            self.commit(current).await;
        }
    }
}
