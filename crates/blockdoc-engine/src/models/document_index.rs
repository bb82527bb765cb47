use std::collections::BTreeMap;

use crate::models::stored_document::{DocumentId, DocumentSummary};

/// In-memory listing of the documents in a store.
///
/// Keyed by (lowercased name, id) so iteration is alphabetical and stable for
/// documents sharing a name.
#[derive(Debug, Default)]
pub struct DocumentIndex {
    entries: BTreeMap<(String, DocumentId), DocumentSummary>,
}

impl DocumentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, summary: DocumentSummary) {
        self.remove(&summary.id);
        self.entries
            .insert((summary.name.to_lowercase(), summary.id.clone()), summary);
    }

    pub fn extend(&mut self, summaries: impl IntoIterator<Item = DocumentSummary>) {
        for summary in summaries {
            self.insert(summary);
        }
    }

    pub fn remove(&mut self, id: &DocumentId) -> Option<DocumentSummary> {
        let key = self.entries.keys().find(|(_, key_id)| key_id == id)?.clone();
        self.entries.remove(&key)
    }

    /// Documents sorted by name
    pub fn documents(&self) -> impl Iterator<Item = &DocumentSummary> {
        self.entries.values()
    }

    pub fn get(&self, index: usize) -> Option<&DocumentSummary> {
        self.entries.values().nth(index)
    }

    pub fn position(&self, id: &DocumentId) -> Option<usize> {
        self.entries.values().position(|summary| summary.id == *id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
