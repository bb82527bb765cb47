use crate::editing::block::BlockId;
use crate::editing::links::{anchors, create_anchor_html, normalize_anchors, replace_anchor};
use crate::editing::markup;
use crate::editing::selection::SelectionSnapshot;

/// Fields and insertion point of an open link dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkDialog {
    pub target: BlockId,
    pub text: String,
    pub url: String,
    /// Plain-text range the anchor replaces. `None` appends.
    pub range: Option<(usize, usize)>,
    /// Index of an existing anchor being edited.
    pub editing: Option<usize>,
}

impl LinkDialog {
    /// Blank dialog, as opened by the `/link` command.
    pub fn for_block(target: BlockId) -> Self {
        Self {
            target,
            text: String::new(),
            url: String::new(),
            range: None,
            editing: None,
        }
    }

    /// Dialog that will wrap the current selection, pre-filled with its text.
    pub fn from_selection(
        target: BlockId,
        content: &str,
        selection: Option<&SelectionSnapshot>,
    ) -> Self {
        let mut dialog = Self::for_block(target);
        if let Some(selection) = selection {
            dialog.range = Some((selection.start, selection.end));
            if !selection.is_collapsed() {
                dialog.text = markup::plain_slice(content, selection.start, selection.end);
            }
        }
        dialog
    }

    /// Dialog editing the `index`-th anchor of `content`.
    pub fn for_anchor(target: BlockId, content: &str, index: usize) -> Option<Self> {
        let anchor = anchors(content).into_iter().nth(index)?;
        Some(Self {
            target,
            text: anchor.text,
            url: anchor.href,
            range: None,
            editing: Some(index),
        })
    }

    /// Block content with the link applied, or `None` when the URL is blank.
    pub fn apply(&self, content: &str) -> Option<String> {
        let href = self.url.trim();
        if href.is_empty() {
            return None;
        }
        let anchor = create_anchor_html(href, Some(self.text.trim()));

        let edited = self
            .editing
            .and_then(|index| replace_anchor(content, index, &anchor));
        let html = match (edited, self.range) {
            (Some(html), _) => html,
            (None, Some((start, end))) => markup::replace_range(content, start, end, &anchor),
            (None, None) => format!("{content}{anchor}"),
        };
        Some(normalize_anchors(&html))
    }
}
