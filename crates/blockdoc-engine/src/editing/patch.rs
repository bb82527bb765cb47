use crate::editing::block::BlockId;

/// Where the editing surface should put the caret after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Focus {
    pub block: BlockId,
    /// Plain-text caret offset, `None` to leave placement to the surface.
    pub caret: Option<usize>,
}

/// Result of applying a command
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Patch {
    pub changed: Vec<BlockId>,
    pub created: Option<BlockId>,
    pub removed: Option<BlockId>,
    pub focus: Option<Focus>,
    pub version: u64,
}

impl Patch {
    /// Whether the command mutated anything.
    pub fn applied(&self) -> bool {
        !self.changed.is_empty() || self.created.is_some() || self.removed.is_some()
    }

    /// Fold a later patch into this one, as if both commands were one edit.
    pub fn absorb(&mut self, later: Patch) {
        for id in later.changed {
            if !self.changed.contains(&id) {
                self.changed.push(id);
            }
        }
        self.created = later.created.or(self.created.take());
        self.removed = later.removed.or(self.removed.take());
        self.focus = later.focus.or(self.focus.take());
        self.version = later.version.max(self.version);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absorb_keeps_latest_focus() {
        let mut first = Patch {
            changed: vec![BlockId::new("a")],
            focus: Some(Focus {
                block: BlockId::new("a"),
                caret: Some(1),
            }),
            version: 1,
            ..Patch::default()
        };
        first.absorb(Patch {
            changed: vec![BlockId::new("a"), BlockId::new("b")],
            created: Some(BlockId::new("b")),
            version: 2,
            ..Patch::default()
        });
        assert_eq!(first.changed, vec![BlockId::new("a"), BlockId::new("b")]);
        assert_eq!(first.created, Some(BlockId::new("b")));
        assert_eq!(first.focus.map(|f| f.caret), Some(Some(1)));
        assert_eq!(first.version, 2);
        assert!(!Patch::default().applied());
    }
}
