use crate::autosave::{DraftAck, SavedState};
use crate::editing::Cmd;
use crate::models::{SaveMode, SaveRequest, StoredDocument};
use crate::session::{EditorSession, State};
use crate::store::{DocumentStore, StoreError};
use crate::upload::UploadTransport;

fn request(state: &SavedState) -> SaveRequest {
    SaveRequest {
        category: state.category.clone(),
        content: state.blocks.clone(),
    }
}

impl<S: DocumentStore, U: UploadTransport> EditorSession<S, U> {
    /// Send a draft of the current state unless it equals the last one sent.
    pub(super) fn schedule_draft(&self, state: &mut State, force: bool) {
        let current = state.saved_state();
        if !state.autosave.draft_needed(&current, force) {
            return;
        }
        let version = state.blocks.version();
        state.autosave.dispatch(version, current.clone());

        let session = self.clone();
        self.shared.runtime.spawn(async move {
            let result = session
                .shared
                .store
                .save_document(&session.shared.id, request(&current), SaveMode::Draft)
                .await;
            session.draft_finished(version, current, result);
        });
    }

    fn draft_finished(
        &self,
        version: u64,
        sent: SavedState,
        result: Result<Option<StoredDocument>, StoreError>,
    ) {
        let mut state = self.lock();
        let response = match result {
            Ok(response) => response,
            Err(e) => {
                log::error!("draft save of {} failed: {e}", self.shared.id);
                state.autosave.draft_failed(version);
                return;
            }
        };

        let local = state.blocks.version();
        match state
            .autosave
            .draft_saved(version, local, sent, response.as_ref())
        {
            DraftAck::Stale => {
                log::debug!("ignoring stale draft response for version {version}");
            }
            DraftAck::Recorded => {
                if let Some(document) = &response {
                    state.meta.refresh(document);
                }
            }
            DraftAck::Reconcile(_) if state.closed => {
                log::debug!("not reconciling {} after close", self.shared.id);
            }
            DraftAck::Reconcile(blocks) => {
                state.blocks.apply(Cmd::ReplaceAll { blocks });
                let reconciled = state.blocks.to_vec();
                state.autosave.reconciled(reconciled);
                if let Some(document) = &response {
                    state.meta.refresh(document);
                }
                log::debug!("reconciled {} to the stored copy", self.shared.id);
            }
        }

        if !state.closed {
            self.restart_idle_timer(&mut state);
        }
    }

    /// Replace any pending idle timer with a fresh one.
    fn restart_idle_timer(&self, state: &mut State) {
        let generation = state.autosave.next_generation();
        let idle = self.shared.config.idle_commit;
        let session = self.clone();
        let task = self.shared.runtime.spawn(async move {
            tokio::time::sleep(idle).await;
            session.idle_elapsed(generation).await;
        });
        state.autosave.arm(generation, task.abort_handle());
    }

    async fn idle_elapsed(&self, generation: u64) {
        let current = {
            let mut state = self.lock();
            if !state.autosave.fire(generation) || state.closed {
                return;
            }
            let current = state.saved_state();
            if !state.autosave.commit_needed(&current) {
                return;
            }
            state.autosave.begin_commit(&current);
            current
        };
        self.commit(current).await;
    }

    /// Send a committing save registered with `begin_commit`; failures are
    /// logged and otherwise ignored.
    pub(super) async fn commit(&self, current: SavedState) {
        let result = self
            .shared
            .store
            .save_document(&self.shared.id, request(&current), SaveMode::Commit)
            .await;
        match result {
            Ok(response) => {
                let mut state = self.lock();
                state.autosave.committed_state(current);
                if let Some(document) = &response {
                    state.meta.refresh(document);
                }
                log::info!("committed {}", self.shared.id);
            }
            Err(e) => {
                self.lock().autosave.commit_failed(&current);
                log::error!("commit of {} failed: {e}", self.shared.id);
            }
        }
    }
}
