/*!
 * # Editing Core Module
 *
 * The in-memory model of a block document and every pure operation over it.
 * Nothing in this module performs I/O or spawns tasks; the session layer
 * (`crate::session`) drives it from user input and async collaborators.
 *
 * ## Architecture Overview
 *
 * ### 1. Single Source of Truth: `BlockList`
 * - Ordered ids plus an id → block map (arena + index) for O(1) lookup
 * - Never empty, ids unique, table grids rectangular
 * - A version counter bumps on every effective mutation
 *
 * ### 2. Command-Based Editing
 * - All edits are `Cmd` values applied through `BlockList::apply`
 * - Each application returns a `Patch` naming changed, created and removed
 *   blocks plus where focus should go
 * - Unknown ids are accepted and ignored, so commands racing a deletion are
 *   harmless
 *
 * ### 3. Closed Block Kinds
 * - `BlockKind` is a tagged enum carrying only the payload its type needs
 *   (table grid, upload metadata, image alignment)
 * - Serialized flat as `{ id, type, content, ... }`
 *
 * ### 4. Inline Markup
 * - Block content is a small HTML fragment; `markup` maps plain-text caret
 *   offsets onto it for splitting, insertion and selection restore
 * - `links` builds and normalizes inline anchors
 *
 * ## Module Structure
 *
 * - **`block`**: `DocumentBlock`, `BlockKind`, `BlockType`, `BlockPatch`
 * - **`document`**: `BlockList` and the mutators behind `Cmd`
 * - **`commands`** / **`patch`**: command vocabulary and results
 * - **`table`**: grid operations
 * - **`ids`**: id generation strategies
 * - **`markup`** / **`links`**: inline fragment utilities
 * - **`slash_command`**: `/link` and `/table WxH` detection
 * - **`command_menu`**: the slash menu catalogue
 * - **`link_dialog`**: link insertion and editing
 * - **`selection`**: caret capture and restore
 */

pub mod block;
pub mod command_menu;
pub mod commands;
pub mod document;
pub mod ids;
pub mod link_dialog;
pub mod links;
pub mod markup;
pub mod patch;
pub mod selection;
pub mod slash_command;
pub mod table;

pub use block::{Alignment, BlockId, BlockKind, BlockPatch, BlockType, DocumentBlock, UploadKind};
pub use command_menu::{CommandOption, CommandTarget};
pub use commands::Cmd;
pub use document::BlockList;
pub use ids::{IdSource, IdStrategy, SequentialIds, UuidIds};
pub use link_dialog::LinkDialog;
pub use patch::{Focus, Patch};
pub use selection::{
    EditableSurface, ElementHandle, Resync, SelectionDirection, SelectionSnapshot,
    SelectionTracker,
};
pub use slash_command::SlashCommand;
pub use table::{TableCell, TableData, TableRow, TableSize};
