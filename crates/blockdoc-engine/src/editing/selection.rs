//! Caret preservation across model-driven re-renders.
//!
//! Editable regions are rewritten from model state whenever a block changes,
//! which loses the native caret. The surface reports a [`SelectionSnapshot`]
//! on every focus, key-up, click or input inside a block. After the next
//! render writes markup back, [`SelectionTracker::resync`] restores it.

use std::collections::HashMap;

use crate::editing::block::BlockId;
use crate::editing::markup;

/// Opaque handle for the rendered element a snapshot was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionDirection {
    #[default]
    Forward,
    Backward,
}

/// Caret or range in plain-text offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionSnapshot {
    pub element: ElementHandle,
    pub start: usize,
    pub end: usize,
    pub direction: SelectionDirection,
}

impl SelectionSnapshot {
    pub fn caret(element: ElementHandle, offset: usize) -> Self {
        Self {
            element,
            start: offset,
            end: offset,
            direction: SelectionDirection::Forward,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    fn clamped(self, len: usize) -> Self {
        Self {
            start: self.start.min(len),
            end: self.end.min(len),
            ..self
        }
    }
}

/// The rendered, editable element for one block.
pub trait EditableSurface {
    fn element(&self) -> ElementHandle;
    fn has_focus(&self) -> bool;
    /// Markup currently held by the element.
    fn markup(&self) -> String;
    fn write_markup(&mut self, markup: &str);
    fn select(&mut self, selection: SelectionSnapshot);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resync {
    /// Focused and already showing the model markup; nothing written.
    Skipped,
    /// Markup written, no snapshot to restore.
    Written,
    /// Markup written and the last snapshot re-applied.
    Restored(SelectionSnapshot),
}

/// Last selection per block. A new snapshot replaces the previous one.
#[derive(Debug, Default)]
pub struct SelectionTracker {
    snapshots: HashMap<BlockId, SelectionSnapshot>,
    active: Option<BlockId>,
}

impl SelectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capture(&mut self, block: BlockId, snapshot: SelectionSnapshot) {
        self.active = Some(block.clone());
        self.snapshots.insert(block, snapshot);
    }

    pub fn get(&self, block: &BlockId) -> Option<&SelectionSnapshot> {
        self.snapshots.get(block)
    }

    /// Block that most recently reported a selection.
    pub fn active(&self) -> Option<&BlockId> {
        self.active.as_ref()
    }

    pub fn forget(&mut self, block: &BlockId) {
        self.snapshots.remove(block);
        if self.active.as_ref() == Some(block) {
            self.active = None;
        }
    }

    /// Write `markup` into the surface and put the caret back.
    ///
    /// A focused element whose content already equals `markup` is left
    /// untouched, since rewriting it would itself move the caret.
    pub fn resync(
        &self,
        block: &BlockId,
        surface: &mut impl EditableSurface,
        markup: &str,
    ) -> Resync {
        if surface.has_focus() && surface.markup() == markup {
            return Resync::Skipped;
        }
        surface.write_markup(markup);

        let Some(snapshot) = self.snapshots.get(block) else {
            return Resync::Written;
        };
        let restored = SelectionSnapshot {
            element: surface.element(),
            ..snapshot.clamped(markup::plain_len(markup))
        };
        surface.select(restored);
        Resync::Restored(restored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct FakeSurface {
        focused: bool,
        html: String,
        writes: usize,
        selection: Option<SelectionSnapshot>,
    }

    impl EditableSurface for FakeSurface {
        fn element(&self) -> ElementHandle {
            ElementHandle(7)
        }
        fn has_focus(&self) -> bool {
            self.focused
        }
        fn markup(&self) -> String {
            self.html.clone()
        }
        fn write_markup(&mut self, markup: &str) {
            self.writes += 1;
            self.html = markup.to_string();
        }
        fn select(&mut self, selection: SelectionSnapshot) {
            self.selection = Some(selection);
        }
    }

    fn block() -> BlockId {
        BlockId::from("b1")
    }

    #[test]
    fn test_last_snapshot_wins() {
        let mut tracker = SelectionTracker::new();
        tracker.capture(block(), SelectionSnapshot::caret(ElementHandle(1), 2));
        tracker.capture(block(), SelectionSnapshot::caret(ElementHandle(1), 4));
        assert_eq!(tracker.get(&block()).map(|s| s.start), Some(4));
        assert_eq!(tracker.active(), Some(&block()));
    }

    #[test]
    fn test_focused_unchanged_surface_is_skipped() {
        let tracker = SelectionTracker::new();
        let mut surface = FakeSurface {
            focused: true,
            html: "same".into(),
            ..FakeSurface::default()
        };
        assert_eq!(tracker.resync(&block(), &mut surface, "same"), Resync::Skipped);
        assert_eq!(surface.writes, 0);
    }

    #[test]
    fn test_focused_surface_with_new_markup_restores_caret() {
        let mut tracker = SelectionTracker::new();
        tracker.capture(block(), SelectionSnapshot::caret(ElementHandle(1), 3));
        let mut surface = FakeSurface {
            focused: true,
            html: "old".into(),
            ..FakeSurface::default()
        };
        let outcome = tracker.resync(&block(), &mut surface, "<b>new</b> text");
        let expected = SelectionSnapshot::caret(ElementHandle(7), 3);
        assert_eq!(outcome, Resync::Restored(expected));
        assert_eq!(surface.selection, Some(expected));
        assert_eq!(surface.html, "<b>new</b> text");
    }

    #[test]
    fn test_restore_clamps_to_new_length() {
        let mut tracker = SelectionTracker::new();
        tracker.capture(
            block(),
            SelectionSnapshot {
                element: ElementHandle(1),
                start: 2,
                end: 10,
                direction: SelectionDirection::Backward,
            },
        );
        let mut surface = FakeSurface::default();
        let Resync::Restored(restored) = tracker.resync(&block(), &mut surface, "abc") else {
            panic!("expected a restore");
        };
        assert_eq!((restored.start, restored.end), (2, 3));
        assert_eq!(restored.direction, SelectionDirection::Backward);
    }

    #[test]
    fn test_unfocused_without_snapshot_only_writes() {
        let tracker = SelectionTracker::new();
        let mut surface = FakeSurface::default();
        assert_eq!(tracker.resync(&block(), &mut surface, "x"), Resync::Written);
        assert_eq!(surface.writes, 1);
    }

    #[test]
    fn test_forget_clears_active() {
        let mut tracker = SelectionTracker::new();
        tracker.capture(block(), SelectionSnapshot::caret(ElementHandle(1), 0));
        tracker.forget(&block());
        assert!(tracker.get(&block()).is_none());
        assert!(tracker.active().is_none());
    }
}
