/*!
# Autosave Scheduling

Bookkeeping for the two save tiers of an editing session:

- **Draft saves** go out on every effective mutation, skipped when the
  sequence equals what was last sent.
- **Idle commit** runs once no draft save has succeeded for the idle window.
  A successful draft restarts the single idle timer.

The state here is synchronous; the session owns the tokio tasks and asks
[`AutosaveState`] what to do at each step.

## Reconciliation

A draft response may carry the store's canonical copy. It is applied only when
the response belongs to the latest dispatched draft **and** no local edit has
happened since that draft was dispatched. Responses to older drafts still mark
their content as persisted unless a newer draft was already acknowledged.
*/

use tokio::task::AbortHandle;

use crate::editing::DocumentBlock;
use crate::models::StoredDocument;

#[derive(Debug)]
struct IdleTimer {
    generation: u64,
    handle: AbortHandle,
}

/// Snapshot as sent to the store.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SavedState {
    pub blocks: Vec<DocumentBlock>,
    pub category: Option<String>,
}

/// What to do with a successful draft response.
#[derive(Debug, Clone, PartialEq)]
pub enum DraftAck {
    /// Response to a draft older than one already acknowledged.
    Stale,
    /// Recorded as persisted; local state stays as it is.
    Recorded,
    /// Replace local blocks with the store's canonical copy.
    Reconcile(Vec<DocumentBlock>),
}

#[derive(Debug, Default)]
pub struct AutosaveState {
    /// Last state the store confirmed.
    persisted: SavedState,
    /// Last state sent as a draft, confirmed or not.
    sent: SavedState,
    committed: SavedState,
    /// State carried by a commit whose response has not arrived yet.
    committing: Option<SavedState>,
    dispatched: Option<u64>,
    acknowledged: Option<u64>,
    timer: Option<IdleTimer>,
    generation: u64,
}

impl AutosaveState {
    /// Start from a freshly loaded document, which counts as both persisted
    /// and committed.
    pub fn loaded(state: SavedState) -> Self {
        Self {
            persisted: state.clone(),
            sent: state.clone(),
            committed: state,
            ..Self::default()
        }
    }

    pub fn persisted(&self) -> &SavedState {
        &self.persisted
    }

    pub fn committed(&self) -> &SavedState {
        &self.committed
    }

    /// Whether `current` needs a draft save. `force` covers metadata-only edits.
    pub fn draft_needed(&self, current: &SavedState, force: bool) -> bool {
        force || current.blocks != self.sent.blocks
    }

    /// Record a draft about to be sent for local `version`.
    pub fn dispatch(&mut self, version: u64, state: SavedState) {
        self.dispatched = Some(version);
        self.sent = state;
    }

    /// A draft for `version` failed; allow the next mutation to resend.
    pub fn draft_failed(&mut self, version: u64) {
        if self.dispatched == Some(version) {
            self.sent = self.persisted.clone();
        }
    }

    /// A draft for `version` succeeded. `local_version` is the session's
    /// version now.
    pub fn draft_saved(
        &mut self,
        version: u64,
        local_version: u64,
        sent: SavedState,
        response: Option<&StoredDocument>,
    ) -> DraftAck {
        if self.acknowledged.is_some_and(|acked| acked > version) {
            return DraftAck::Stale;
        }
        self.acknowledged = Some(version);
        self.persisted = sent;

        let latest = self.dispatched == Some(version) && local_version == version;
        match response {
            Some(document)
                if latest
                    && !document.content.is_empty()
                    && document.content != self.persisted.blocks =>
            {
                self.persisted.blocks = document.content.clone();
                self.sent.blocks = document.content.clone();
                DraftAck::Reconcile(document.content.clone())
            }
            _ => DraftAck::Recorded,
        }
    }

    /// Reconciliation may rewrite ids or repair tables on load; remember the
    /// resulting sequence so it is not sent back as a fresh edit.
    pub fn reconciled(&mut self, blocks: Vec<DocumentBlock>) {
        self.persisted.blocks = blocks.clone();
        self.sent.blocks = blocks;
    }

    /// Whether `current` still has to be committed. A commit already in
    /// flight for the same state counts as done.
    pub fn commit_needed(&self, current: &SavedState) -> bool {
        *current != self.committed && self.committing.as_ref() != Some(current)
    }

    pub fn begin_commit(&mut self, state: &SavedState) {
        self.committing = Some(state.clone());
    }

    pub fn commit_failed(&mut self, state: &SavedState) {
        if self.committing.as_ref() == Some(state) {
            self.committing = None;
        }
    }

    pub fn committed_state(&mut self, state: SavedState) {
        if self.committing.as_ref() == Some(&state) {
            self.committing = None;
        }
        self.committed = state.clone();
        if self.sent == state {
            self.persisted = state;
        }
    }

    /// Install a new idle timer, aborting any pending one. Returns the
    /// generation the timer task must present when it fires.
    pub fn next_generation(&mut self) -> u64 {
        self.cancel_timer();
        self.generation += 1;
        self.generation
    }

    pub fn arm(&mut self, generation: u64, handle: AbortHandle) {
        if generation == self.generation {
            self.timer = Some(IdleTimer { generation, handle });
        } else {
            handle.abort();
        }
    }

    /// Called by a timer task once its sleep elapsed. Returns false when the
    /// timer was replaced or cancelled in the meantime.
    pub fn fire(&mut self, generation: u64) -> bool {
        match &self.timer {
            Some(timer) if timer.generation == generation => {
                self.timer = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.handle.abort();
        }
    }

    pub fn timer_pending(&self) -> bool {
        self.timer.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn state(text: &str) -> SavedState {
        SavedState {
            blocks: vec![DocumentBlock::paragraph("a", text)],
            category: None,
        }
    }

    fn canonical(text: &str) -> StoredDocument {
        let mut document = StoredDocument::new("d", "D");
        document.content = vec![DocumentBlock::paragraph("a", text)];
        document
    }

    #[test]
    fn test_unchanged_sequence_needs_no_draft() {
        let autosave = AutosaveState::loaded(state("x"));
        assert!(!autosave.draft_needed(&state("x"), false));
        assert!(autosave.draft_needed(&state("x"), true));
        assert!(autosave.draft_needed(&state("y"), false));
    }

    #[test]
    fn test_reconciles_latest_draft() {
        // Given a draft dispatched at version 1 with no later edits
        let mut autosave = AutosaveState::loaded(state(""));
        autosave.dispatch(1, state("x"));

        // When the store answers with a normalized copy
        let ack = autosave.draft_saved(1, 1, state("x"), Some(&canonical("X")));

        // Then the canonical copy is applied
        assert_eq!(ack, DraftAck::Reconcile(canonical("X").content));
        assert_eq!(autosave.persisted().blocks, canonical("X").content);
    }

    #[test]
    fn test_newer_local_edits_are_not_clobbered() {
        // Given drafts for versions 1 and 2 in flight
        let mut autosave = AutosaveState::loaded(state(""));
        autosave.dispatch(1, state("a"));
        autosave.dispatch(2, state("ab"));

        // When the response for version 1 arrives
        let ack = autosave.draft_saved(1, 2, state("a"), Some(&canonical("a")));

        // Then it is recorded but not reconciled
        assert_eq!(ack, DraftAck::Recorded);

        // And once version 2 is acknowledged, a late version 1 is stale
        autosave.draft_saved(2, 2, state("ab"), None);
        assert_eq!(autosave.draft_saved(1, 2, state("a"), None), DraftAck::Stale);
        assert_eq!(autosave.persisted(), &state("ab"));
    }

    #[test]
    fn test_empty_canonical_copy_is_ignored() {
        let mut autosave = AutosaveState::loaded(state(""));
        autosave.dispatch(1, state("x"));
        let ack = autosave.draft_saved(1, 1, state("x"), Some(&StoredDocument::new("d", "D")));
        assert_eq!(ack, DraftAck::Recorded);
    }

    #[test]
    fn test_failed_draft_allows_resend() {
        let mut autosave = AutosaveState::loaded(state(""));
        autosave.dispatch(1, state("x"));
        assert!(!autosave.draft_needed(&state("x"), false));
        autosave.draft_failed(1);
        assert!(autosave.draft_needed(&state("x"), false));
    }

    #[test]
    fn test_commit_tracking() {
        let mut autosave = AutosaveState::loaded(state(""));
        assert!(!autosave.commit_needed(&state("")));
        assert!(autosave.commit_needed(&state("x")));
        autosave.committed_state(state("x"));
        assert!(!autosave.commit_needed(&state("x")));
    }

    #[test]
    fn test_in_flight_commit_is_not_repeated() {
        // Given a commit of "x" on its way to the store
        let mut autosave = AutosaveState::loaded(state(""));
        autosave.begin_commit(&state("x"));

        // Then the same state needs no second commit, a different one does
        assert!(!autosave.commit_needed(&state("x")));
        assert!(autosave.commit_needed(&state("xy")));

        // And a failed commit makes the state eligible again
        autosave.commit_failed(&state("x"));
        assert!(autosave.commit_needed(&state("x")));
    }

    #[tokio::test]
    async fn test_timer_generations() {
        let mut autosave = AutosaveState::default();
        let first = autosave.next_generation();
        let task = tokio::spawn(std::future::pending::<()>());
        autosave.arm(first, task.abort_handle());

        // Restarting aborts the pending timer and invalidates its generation
        let second = autosave.next_generation();
        assert!(task.await.unwrap_err().is_cancelled());
        assert!(!autosave.fire(first));

        let task = tokio::spawn(std::future::pending::<()>());
        autosave.arm(second, task.abort_handle());
        assert!(autosave.timer_pending());
        assert!(autosave.fire(second));
        assert!(!autosave.timer_pending());
        task.abort();
    }
}
