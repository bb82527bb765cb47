use crate::editing::BlockId;
use crate::upload::LocalFile;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Bounding box of a candidate drop target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Rect {
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left && point.x <= self.right && point.y >= self.top && point.y <= self.bottom
    }
}

/// Payload carried by a drag: the source block id set on drag start and any
/// external files.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DragTransfer {
    pub source: Option<BlockId>,
    pub files: Vec<LocalFile>,
}

impl DragTransfer {
    pub fn block(source: BlockId) -> Self {
        Self {
            source: Some(source),
            files: Vec::new(),
        }
    }

    pub fn files(files: Vec<LocalFile>) -> Self {
        Self {
            source: None,
            files,
        }
    }
}

/// What a drop resolved to.
#[derive(Debug, Clone, PartialEq)]
pub enum DropAction {
    InsertFiles { anchor: BlockId, files: Vec<LocalFile> },
    Move { from: BlockId, to: BlockId },
    Ignore,
}

/// Idle → Dragging → HoveringTarget, resolved on drop or drag end.
#[derive(Debug, Default)]
pub struct DragController {
    dragged: Option<BlockId>,
    over: Option<BlockId>,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dragged(&self) -> Option<&BlockId> {
        self.dragged.as_ref()
    }

    pub fn over(&self) -> Option<&BlockId> {
        self.over.as_ref()
    }

    pub fn is_idle(&self) -> bool {
        self.dragged.is_none() && self.over.is_none()
    }

    /// Start dragging `block`, returning the transfer payload to attach.
    pub fn drag_start(&mut self, block: BlockId) -> DragTransfer {
        self.over = None;
        self.dragged = Some(block.clone());
        DragTransfer::block(block)
    }

    pub fn drag_over(&mut self, target: &BlockId) {
        if self.dragged.as_ref() != Some(target) && self.over.as_ref() != Some(target) {
            self.over = Some(target.clone());
        }
    }

    /// Clear the hover target only once the pointer is outside its box, so
    /// passing over child elements does not flicker.
    pub fn drag_leave(&mut self, target: &BlockId, bounds: Rect, pointer: Point) {
        if self.over.as_ref() == Some(target) && !bounds.contains(pointer) {
            self.over = None;
        }
    }

    pub fn drag_end(&mut self) {
        self.dragged = None;
        self.over = None;
    }

    /// Resolve a drop on `target`. Always returns to idle.
    ///
    /// External files win over a block payload. A block dropped on itself,
    /// or anything dropped in read-only mode, is ignored.
    pub fn drop(&mut self, target: &BlockId, transfer: DragTransfer, read_only: bool) -> DropAction {
        let dragged = self.dragged.take();
        self.over = None;
        if read_only {
            return DropAction::Ignore;
        }

        if !transfer.files.is_empty() {
            return DropAction::InsertFiles {
                anchor: target.clone(),
                files: transfer.files,
            };
        }

        match transfer.source.or(dragged) {
            Some(source) if source != *target => DropAction::Move {
                from: source,
                to: target.clone(),
            },
            _ => DropAction::Ignore,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> BlockId {
        BlockId::new(s)
    }

    fn rect() -> Rect {
        Rect {
            left: 0.0,
            top: 0.0,
            right: 100.0,
            bottom: 20.0,
        }
    }

    #[test]
    fn test_reorder_drop() {
        let mut drag = DragController::new();
        let transfer = drag.drag_start(id("a"));
        drag.drag_over(&id("b"));
        assert_eq!(drag.over(), Some(&id("b")));

        let action = drag.drop(&id("b"), transfer, false);
        assert_eq!(action, DropAction::Move { from: id("a"), to: id("b") });
        assert!(drag.is_idle());
    }

    #[test]
    fn test_hover_ignores_source() {
        let mut drag = DragController::new();
        drag.drag_start(id("a"));
        drag.drag_over(&id("a"));
        assert_eq!(drag.over(), None);
    }

    #[test]
    fn test_files_win_over_block_payload() {
        let mut drag = DragController::new();
        let mut transfer = drag.drag_start(id("a"));
        transfer.files.push(LocalFile::new("x.png", "image/png", vec![1u8]));
        let action = drag.drop(&id("b"), transfer, false);
        assert!(matches!(action, DropAction::InsertFiles { ref anchor, ref files } if *anchor == id("b") && files.len() == 1));
    }

    #[test]
    fn test_drop_on_self_is_ignored() {
        let mut drag = DragController::new();
        let transfer = drag.drag_start(id("a"));
        assert_eq!(drag.drop(&id("a"), transfer, false), DropAction::Ignore);
    }

    #[test]
    fn test_read_only_clears_state_without_action() {
        let mut drag = DragController::new();
        let transfer = drag.drag_start(id("a"));
        drag.drag_over(&id("b"));
        assert_eq!(drag.drop(&id("b"), transfer, true), DropAction::Ignore);
        assert!(drag.is_idle());
    }

    #[test]
    fn test_leave_is_geometric() {
        let mut drag = DragController::new();
        drag.drag_start(id("a"));
        drag.drag_over(&id("b"));

        // Pointer still inside the box: moving over a child element
        drag.drag_leave(&id("b"), rect(), Point { x: 50.0, y: 10.0 });
        assert_eq!(drag.over(), Some(&id("b")));

        drag.drag_leave(&id("b"), rect(), Point { x: 150.0, y: 10.0 });
        assert_eq!(drag.over(), None);
        assert_eq!(drag.dragged(), Some(&id("a")));
    }
}
