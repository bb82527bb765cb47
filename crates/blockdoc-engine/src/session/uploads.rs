use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::editing::{BlockId, BlockPatch, BlockType, Cmd, DocumentBlock, UploadKind};
use crate::notify::Notification;
use crate::session::{EditorSession, Shared, State};
use crate::store::DocumentStore;
use crate::upload::{self, LocalFile, UploadTransport, UploadedAsset};

/// How one upload ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Uploaded(UploadedAsset),
    /// Failed; carries the message shown to the user.
    Failed(String),
    /// Never started: read-only session, unknown block, or an upload
    /// already running for the block.
    Skipped,
}

/// Uploads spawned by a multi-file drop or paste.
#[derive(Debug, Default)]
pub struct PendingUploads {
    blocks: Vec<BlockId>,
    tasks: Vec<JoinHandle<UploadOutcome>>,
}

impl PendingUploads {
    /// Target blocks in document order.
    pub fn blocks(&self) -> &[BlockId] {
        &self.blocks
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Wait for every upload, returning outcomes in the order of `blocks()`.
    pub async fn join(self) -> Vec<UploadOutcome> {
        let mut outcomes = Vec::with_capacity(self.tasks.len());
        for task in self.tasks {
            let outcome = match task.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    log::error!("upload task ended abnormally: {e}");
                    UploadOutcome::Failed("Failed to upload file".to_string())
                }
            };
            outcomes.push(outcome);
        }
        outcomes
    }
}

/// Removes the block from the uploading set when an upload is abandoned
/// before it resolved, e.g. when its task is cancelled.
struct UploadGuard<S, U> {
    shared: Arc<Shared<S, U>>,
    block: BlockId,
    armed: bool,
}

impl<S, U> UploadGuard<S, U> {
    /// Clear the uploading flag under the caller's lock.
    fn release(&mut self, state: &mut State) {
        state.uploads.finish(&self.block);
        self.armed = false;
    }
}

impl<S, U> Drop for UploadGuard<S, U> {
    fn drop(&mut self) {
        if self.armed {
            self.shared.lock().uploads.finish(&self.block);
        }
    }
}

pub(super) struct UploadJob<S, U> {
    guard: UploadGuard<S, U>,
    kind: UploadKind,
    file: LocalFile,
    cleanup_on_failure: bool,
}

impl<S: DocumentStore, U: UploadTransport> EditorSession<S, U> {
    /// Upload `file` into `block`.
    ///
    /// The kind is `preferred` when that is image or file, else the block's
    /// current type, else the file's MIME type. On failure the user is
    /// notified; with `cleanup_on_failure` the block is removed, otherwise it
    /// is left as it was.
    pub async fn handle_file_upload(
        &self,
        block: &BlockId,
        file: LocalFile,
        preferred: Option<BlockType>,
        cleanup_on_failure: bool,
    ) -> UploadOutcome {
        let job = {
            let mut state = self.lock();
            self.begin_upload(&mut state, block, file, preferred, cleanup_on_failure)
        };
        match job {
            Some(job) => self.run_upload(job).await,
            None => UploadOutcome::Skipped,
        }
    }

    /// Expand dropped or pasted files into one upload each, starting at
    /// `anchor` and keeping drop order in document order.
    ///
    /// Empty files are skipped. The first file reuses `anchor` when it is an
    /// empty placeholder of the matching kind; every other file gets a new
    /// block after the previous one, removed again if its upload fails.
    pub fn insert_files_as_blocks(&self, anchor: &BlockId, files: Vec<LocalFile>) -> PendingUploads {
        let mut pending = PendingUploads::default();
        let mut jobs = Vec::new();
        {
            let mut state = self.lock();
            if !state.editable() {
                return pending;
            }

            let mut cursor = anchor.clone();
            for (index, file) in files.into_iter().filter(|f| !f.is_empty()).enumerate() {
                let kind = file.kind();
                let reuse = index == 0
                    && !state.uploads.is_uploading(anchor.as_str())
                    && state
                        .blocks
                        .get(anchor)
                        .is_some_and(|block| block.is_placeholder_for(kind));
                let (target, cleanup) = if reuse {
                    (anchor.clone(), false)
                } else {
                    let patch = self.apply_locked(
                        &mut state,
                        Cmd::AddBlock {
                            after: cursor.clone(),
                            block_type: kind.block_type(),
                        },
                    );
                    let Some(created) = patch.created else {
                        continue;
                    };
                    (created, true)
                };
                cursor = target.clone();

                if let Some(job) =
                    self.begin_upload(&mut state, &target, file, Some(kind.block_type()), cleanup)
                {
                    pending.blocks.push(target);
                    jobs.push(job);
                }
            }
        }

        for job in jobs {
            let session = self.clone();
            let task = self
                .shared
                .runtime
                .spawn(async move { session.run_upload(job).await });
            pending.tasks.push(task);
        }
        pending
    }

    fn begin_upload(
        &self,
        state: &mut State,
        block: &BlockId,
        file: LocalFile,
        preferred: Option<BlockType>,
        cleanup_on_failure: bool,
    ) -> Option<UploadJob<S, U>> {
        if !state.editable() {
            return None;
        }
        let existing = state.blocks.get(block).map(DocumentBlock::block_type)?;
        if !state.uploads.begin(block) {
            log::debug!("upload already running for {block}");
            return None;
        }
        Some(UploadJob {
            guard: UploadGuard {
                shared: Arc::clone(&self.shared),
                block: block.clone(),
                armed: true,
            },
            kind: upload::resolve_kind(preferred, Some(existing), &file),
            file,
            cleanup_on_failure,
        })
    }

    pub(super) async fn run_upload(&self, job: UploadJob<S, U>) -> UploadOutcome {
        let UploadJob {
            mut guard,
            kind,
            file,
            cleanup_on_failure,
        } = job;
        let result = match kind {
            UploadKind::Image => self.shared.uploads.upload_image(file.clone()).await,
            UploadKind::File => self.shared.uploads.upload_file(file.clone()).await,
        };

        let outcome = {
            let mut state = self.lock();
            guard.release(&mut state);
            match result {
                Ok(asset) => {
                    self.bind_asset(&mut state, &guard.block, kind, &file, &asset);
                    UploadOutcome::Uploaded(asset)
                }
                Err(e) => {
                    let message = e.user_message(self.shared.config.max_upload_mb);
                    log::warn!("upload of {} into {} failed: {e}", file.name, guard.block);
                    if cleanup_on_failure {
                        self.apply_locked(
                            &mut state,
                            Cmd::DeleteBlock {
                                id: guard.block.clone(),
                            },
                        );
                    }
                    UploadOutcome::Failed(message)
                }
            }
        };

        if let UploadOutcome::Failed(message) = &outcome {
            self.shared.notifier.notify(Notification::error(message.clone()));
        }
        outcome
    }

    fn bind_asset(
        &self,
        state: &mut State,
        block: &BlockId,
        kind: UploadKind,
        file: &LocalFile,
        asset: &UploadedAsset,
    ) {
        let Some(existing) = state.blocks.get(block) else {
            log::debug!("upload finished for removed block {block}");
            return;
        };
        let content = if !existing.content.trim().is_empty() {
            existing.content.clone()
        } else if kind == UploadKind::File {
            asset.file_name.clone()
        } else {
            file.name.clone()
        };
        let patch = BlockPatch {
            block_type: Some(kind.block_type()),
            content: Some(content),
            url: Some(asset.url.clone()),
            file_name: Some(asset.file_name.clone()),
            file_size: Some(asset.file_size.clone()),
            ..BlockPatch::default()
        };
        self.apply_locked(
            state,
            Cmd::UpdateBlock {
                id: block.clone(),
                patch,
            },
        );
    }
}
