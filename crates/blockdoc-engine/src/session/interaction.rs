use crate::drag::{DragTransfer, DropAction, Point, Rect};
use crate::editing::links::{create_anchor_html, is_url, normalize_anchors, unlink as unlink_anchor};
use crate::editing::{
    BlockId, BlockPatch, BlockType, Cmd, CommandOption, CommandTarget, EditableSurface, LinkDialog,
    Patch, Resync, SelectionSnapshot, markup,
};
use crate::session::{EditorSession, PendingUploads, State};
use crate::store::DocumentStore;
use crate::upload::{LocalFile, UploadTransport};

/// Clipboard contents handed to [`EditorSession::handle_paste`].
#[derive(Debug, Clone, PartialEq)]
pub enum Paste {
    Files(Vec<LocalFile>),
    Text(String),
}

#[derive(Debug)]
pub enum PasteOutcome {
    Uploads(PendingUploads),
    /// A pasted URL became an inline anchor.
    Linked(Patch),
    /// Left to the editing surface's default handling.
    Unhandled,
}

#[derive(Debug)]
pub enum DropOutcome {
    Moved(Patch),
    Uploads(PendingUploads),
    Ignored,
}

impl<S: DocumentStore, U: UploadTransport> EditorSession<S, U> {
    /// Record the caret or range last reported for `block`.
    pub fn capture_selection(&self, block: &BlockId, snapshot: SelectionSnapshot) {
        self.lock().selection.capture(block.clone(), snapshot);
    }

    pub fn selection(&self, block: &BlockId) -> Option<SelectionSnapshot> {
        self.lock().selection.get(block).copied()
    }

    /// Push the model's markup for `block` into its rendered element and
    /// restore the caret. Returns `None` for unknown blocks.
    pub fn resync_block(&self, block: &BlockId, surface: &mut impl EditableSurface) -> Option<Resync> {
        let state = self.lock();
        let content = state.blocks.get(block)?.content.clone();
        Some(state.selection.resync(block, surface, &content))
    }

    pub fn link_dialog(&self) -> Option<LinkDialog> {
        self.lock().link_dialog.clone()
    }

    /// Open the link dialog for `block`, pre-filled from its last selection.
    pub fn open_link_dialog(&self, block: &BlockId) -> bool {
        let mut state = self.lock();
        if !state.editable() {
            return false;
        }
        let Some(content) = state.blocks.get(block).map(|b| b.content.clone()) else {
            return false;
        };
        let dialog = LinkDialog::from_selection(block.clone(), &content, state.selection.get(block));
        state.link_dialog = Some(dialog);
        true
    }

    /// Open the dialog on the `index`-th anchor of `block`.
    pub fn edit_link(&self, block: &BlockId, index: usize) -> bool {
        let mut state = self.lock();
        if !state.editable() {
            return false;
        }
        let dialog = state
            .blocks
            .get(block)
            .and_then(|b| LinkDialog::for_anchor(block.clone(), &b.content, index));
        let opened = dialog.is_some();
        state.link_dialog = dialog;
        opened
    }

    pub fn set_link_fields(&self, text: &str, url: &str) {
        if let Some(dialog) = self.lock().link_dialog.as_mut() {
            dialog.text = text.to_string();
            dialog.url = url.to_string();
        }
    }

    pub fn cancel_link_dialog(&self) {
        self.lock().link_dialog = None;
    }

    /// Insert or update the anchor and close the dialog. A blank URL just
    /// closes it.
    pub fn apply_link_dialog(&self) -> Patch {
        let mut state = self.lock();
        let Some(dialog) = state.link_dialog.take() else {
            return Patch::default();
        };
        let Some(content) = state.blocks.get(&dialog.target).map(|b| b.content.clone()) else {
            return Patch::default();
        };
        match dialog.apply(&content) {
            Some(html) => self.apply_locked(
                &mut state,
                Cmd::UpdateBlock {
                    id: dialog.target,
                    patch: BlockPatch::content(html),
                },
            ),
            None => Patch::default(),
        }
    }

    /// Replace the `index`-th anchor of `block` with its text.
    pub fn unlink(&self, block: &BlockId, index: usize) -> Patch {
        let mut state = self.lock();
        let Some(html) = state
            .blocks
            .get(block)
            .and_then(|b| unlink_anchor(&b.content, index))
        else {
            return Patch::default();
        };
        self.apply_locked(
            &mut state,
            Cmd::UpdateBlock {
                id: block.clone(),
                patch: BlockPatch::content(html),
            },
        )
    }

    /// Run a command-menu choice on `block`: drop the typed `/query`, then
    /// retype the block or open the link dialog.
    pub fn apply_command_option(&self, block: &BlockId, option: &CommandOption) -> Patch {
        let mut state = self.lock();
        if !state.editable() {
            return Patch::default();
        }
        let Some(existing) = state.blocks.get(block).cloned() else {
            return Patch::default();
        };

        let mut patch = Patch::default();
        if let Some(stripped) = strip_slash_query(&existing.content, existing.block_type()) {
            patch = self.apply_locked(
                &mut state,
                Cmd::UpdateBlock {
                    id: block.clone(),
                    patch: BlockPatch::content(stripped),
                },
            );
        }
        match option.target {
            CommandTarget::Block(to) => {
                let changed = self.apply_locked(
                    &mut state,
                    Cmd::ChangeBlockType {
                        id: block.clone(),
                        to,
                        table: None,
                    },
                );
                patch.absorb(changed);
            }
            CommandTarget::Link => {
                state.link_dialog = Some(LinkDialog::for_block(block.clone()));
            }
        }
        patch
    }

    /// Pasted files become uploads; a pasted URL becomes an anchor at the
    /// selection. Anything else is left alone.
    pub fn handle_paste(&self, block: &BlockId, paste: Paste) -> PasteOutcome {
        match paste {
            Paste::Files(files) if !files.is_empty() => {
                PasteOutcome::Uploads(self.insert_files_as_blocks(block, files))
            }
            Paste::Text(text) if is_url(&text) => {
                let mut state = self.lock();
                match self.paste_link(&mut state, block, text.trim()) {
                    Some(patch) => PasteOutcome::Linked(patch),
                    None => PasteOutcome::Unhandled,
                }
            }
            _ => PasteOutcome::Unhandled,
        }
    }

    fn paste_link(&self, state: &mut State, block: &BlockId, url: &str) -> Option<Patch> {
        if !state.editable() {
            return None;
        }
        let existing = state.blocks.get(block)?;
        if !existing.block_type().is_text() || existing.block_type() == BlockType::Code {
            return None;
        }
        let anchor = create_anchor_html(url, None);
        let html = match state.selection.get(block) {
            Some(selection) => {
                markup::replace_range(&existing.content, selection.start, selection.end, &anchor)
            }
            None => format!("{}{anchor}", existing.content),
        };
        Some(self.apply_locked(
            state,
            Cmd::UpdateBlock {
                id: block.clone(),
                patch: BlockPatch::content(normalize_anchors(&html)),
            },
        ))
    }

    pub fn drag_start(&self, block: &BlockId) -> DragTransfer {
        self.lock().drag.drag_start(block.clone())
    }

    pub fn drag_over(&self, target: &BlockId) {
        self.lock().drag.drag_over(target);
    }

    pub fn drag_leave(&self, target: &BlockId, bounds: Rect, pointer: Point) {
        self.lock().drag.drag_leave(target, bounds, pointer);
    }

    pub fn drag_end(&self) {
        self.lock().drag.drag_end();
    }

    /// Currently dragged block and hover target.
    pub fn drag_state(&self) -> (Option<BlockId>, Option<BlockId>) {
        let state = self.lock();
        (state.drag.dragged().cloned(), state.drag.over().cloned())
    }

    /// Resolve a drop on `target`: external files are uploaded from there,
    /// otherwise the dragged block moves to the target's position.
    pub fn handle_drop(&self, target: &BlockId, transfer: DragTransfer) -> DropOutcome {
        let mut state = self.lock();
        let read_only = !state.editable();
        match state.drag.drop(target, transfer, read_only) {
            DropAction::Move { from, to } => {
                DropOutcome::Moved(self.apply_locked(&mut state, Cmd::MoveBlock { from, to }))
            }
            DropAction::InsertFiles { anchor, files } => {
                drop(state);
                DropOutcome::Uploads(self.insert_files_as_blocks(&anchor, files))
            }
            DropAction::Ignore => DropOutcome::Ignored,
        }
    }
}

/// Content with the trailing `/query` removed, or `None` when there is no
/// slash to strip.
fn strip_slash_query(content: &str, block_type: BlockType) -> Option<String> {
    if block_type == BlockType::Code {
        let index = content.rfind('/')?;
        return Some(content[..index].to_string());
    }
    let plain = markup::to_plain_text(content);
    let index = plain.rfind('/')?;
    let start = plain[..index].chars().count();
    Some(markup::replace_range(content, start, markup::plain_len(content), ""))
}
