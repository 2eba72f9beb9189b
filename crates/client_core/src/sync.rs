//! Drives the collection from user intents and keeps it in step with the
//! remote store.
//!
//! Local mutations are applied first and the remote call follows. Remote
//! failures never roll a local removal back: the list the user sees is
//! authoritative. State is locked only between awaits, so intents interleave
//! at I/O boundaries and a result arriving for an entry that is gone is
//! dropped.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use shared::domain::{EntryId, RemoteName};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    collection::{Collection, CollectionSnapshot},
    error::{CollectionError, DeleteError, GenerateError, UploadError, ValidationError},
    remote_store::{RemoteStore, UploadedImage},
    reorder::{DragState, RenderedItem},
    validation::{validate_selected_file, SelectedFile},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    pub completed: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadPhase {
    #[default]
    Idle,
    Uploading(UploadProgress),
}

/// Presentation side of the coordinator. Implementations must not block.
pub trait CollectionView: Send + Sync {
    /// Called after every mutation of the collection.
    fn render(&self, snapshot: &CollectionSnapshot);
    fn notify(&self, notification: Notification);
    fn upload_progress(&self, progress: UploadProgress);
    fn generation_changed(&self, _in_progress: bool) {}
}

/// Everything the view can ask of the core.
#[async_trait]
pub trait IntentHandler: Send + Sync {
    async fn on_files_selected(&self, files: Vec<SelectedFile>);
    async fn on_delete_requested(&self, id: EntryId);
    async fn on_clear_requested(&self);
    /// Returns the URL to download when a document was produced.
    async fn on_generate_requested(&self) -> Option<Url>;
    async fn on_description_changed(&self, id: EntryId, text: String);
    async fn on_drag_started(&self, id: EntryId);
    /// Returns the placeholder index for the view to show. Never mutates the collection.
    async fn on_drag_over(&self, items: &[RenderedItem], pointer_y: f32) -> Option<usize>;
    async fn on_drop(&self);
    async fn on_drag_cancelled(&self);
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub uploaded: Vec<EntryId>,
    pub failed: Vec<UploadError>,
    pub rejected: Vec<ValidationError>,
}

/// Outcome of the remote half of a delete. Callers may ignore it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteDelete {
    /// The entry never finished uploading, so there was nothing to delete.
    Skipped,
    Deleted,
    Failed(DeleteError),
}

#[derive(Debug, Default)]
pub struct ClearReport {
    pub requested: usize,
    pub failed: Vec<DeleteError>,
}

#[derive(Default)]
struct CoordinatorState {
    collection: Collection,
    phase: UploadPhase,
    drag: DragState,
    generating: bool,
}

enum BatchSlot {
    Rejected,
    Accepted {
        id: EntryId,
        file: SelectedFile,
    },
}

pub struct SyncCoordinator {
    store: Arc<dyn RemoteStore>,
    view: Arc<dyn CollectionView>,
    inner: Mutex<CoordinatorState>,
    upload_gate: Mutex<()>,
}

impl SyncCoordinator {
    pub fn new(store: Arc<dyn RemoteStore>, view: Arc<dyn CollectionView>) -> Arc<Self> {
        Arc::new(Self {
            store,
            view,
            inner: Mutex::new(CoordinatorState::default()),
            upload_gate: Mutex::new(()),
        })
    }

    pub async fn snapshot(&self) -> CollectionSnapshot {
        self.inner.lock().await.collection.snapshot()
    }

    pub async fn phase(&self) -> UploadPhase {
        self.inner.lock().await.phase
    }

    pub async fn is_generating(&self) -> bool {
        self.inner.lock().await.generating
    }

    /// Validates and uploads a batch, one file at a time.
    pub async fn upload_files(&self, files: Vec<SelectedFile>) -> BatchReport {
        let _gate = self.upload_gate.lock().await;
        let mut report = BatchReport::default();
        let total = files.len();

        let mut checked = Vec::with_capacity(total);
        for file in files {
            match validate_selected_file(&file) {
                Ok(()) => checked.push(Some(file)),
                Err(err) => {
                    warn!(filename = %err.filename, failure = %err.failure, "file rejected");
                    self.view
                        .notify(Notification::new(NotificationLevel::Error, err.user_message()));
                    report.rejected.push(err);
                    checked.push(None);
                }
            }
        }

        if checked.iter().all(Option::is_none) {
            self.view.notify(Notification::new(
                NotificationLevel::Warning,
                "No valid files found",
            ));
            return report;
        }

        // Accepted files enter the collection before their uploads start.
        let (plan, snapshot) = {
            let mut state = self.inner.lock().await;
            let plan: Vec<BatchSlot> = checked
                .into_iter()
                .map(|file| match file {
                    Some(file) => BatchSlot::Accepted {
                        id: state.collection.accept(
                            file.filename.clone(),
                            file.mime_type.clone(),
                            file.payload.clone(),
                        ),
                        file,
                    },
                    None => BatchSlot::Rejected,
                })
                .collect();
            state.phase = UploadPhase::Uploading(UploadProgress {
                completed: 0,
                total,
            });
            (plan, state.collection.snapshot())
        };
        self.view.render(&snapshot);
        info!(total, "upload batch started");

        for (completed, slot) in plan.into_iter().enumerate() {
            if let BatchSlot::Accepted { id, file } = slot {
                let still_listed = self.inner.lock().await.collection.get(id).is_some();
                if still_listed {
                    self.upload_one(id, file, &mut report).await;
                } else {
                    debug!(%id, filename = %file.filename, "entry removed before upload");
                }
            }
            self.report_progress(UploadProgress {
                completed: completed + 1,
                total,
            })
            .await;
        }

        self.inner.lock().await.phase = UploadPhase::Idle;
        info!(
            uploaded = report.uploaded.len(),
            failed = report.failed.len(),
            rejected = report.rejected.len(),
            "upload batch finished"
        );
        if !report.uploaded.is_empty() {
            self.view.notify(Notification::new(
                NotificationLevel::Success,
                format!("Uploaded {} file(s)", report.uploaded.len()),
            ));
        }
        report
    }

    /// Removes an entry right away, then deletes its remote copy.
    pub async fn delete_entry(&self, id: EntryId) -> Result<RemoteDelete, CollectionError> {
        let (removed, snapshot) = {
            let mut state = self.inner.lock().await;
            let removed = state.collection.remove_by_id(id)?;
            (removed, state.collection.snapshot())
        };
        self.view.render(&snapshot);
        self.view
            .notify(Notification::new(NotificationLevel::Success, "Image removed"));

        let Some(remote_name) = removed.remote_name() else {
            return Ok(RemoteDelete::Skipped);
        };
        Ok(match self.store.delete_remote(remote_name).await {
            Ok(()) => RemoteDelete::Deleted,
            Err(err) => {
                warn!(
                    %remote_name,
                    failure = %err.failure,
                    "remote delete failed; entry stays removed"
                );
                RemoteDelete::Failed(err)
            }
        })
    }

    /// Deletes every uploaded entry remotely, all requests in flight at once,
    /// and empties the collection once they have all settled.
    pub async fn clear_all(&self) -> ClearReport {
        let remote_names: Vec<RemoteName> = {
            let state = self.inner.lock().await;
            if state.collection.is_empty() {
                return ClearReport::default();
            }
            state
                .collection
                .snapshot()
                .iter()
                .filter_map(|entry| entry.remote_name().cloned())
                .collect()
        };

        let mut failed = self.delete_all(&remote_names).await;

        // Uploads that finished while the deletes were in flight are still
        // listed; they are cleared with the rest and deleted afterwards.
        let (late_names, snapshot) = {
            let mut state = self.inner.lock().await;
            let late_names: Vec<RemoteName> = state
                .collection
                .snapshot()
                .iter()
                .filter_map(|entry| entry.remote_name().cloned())
                .filter(|remote_name| !remote_names.contains(remote_name))
                .collect();
            state.collection.clear();
            (late_names, state.collection.snapshot())
        };
        self.view.render(&snapshot);
        self.view.notify(Notification::new(
            NotificationLevel::Success,
            "All images removed",
        ));

        if !late_names.is_empty() {
            debug!(count = late_names.len(), "deleting uploads that landed during clear");
            failed.extend(self.delete_all(&late_names).await);
        }
        ClearReport {
            requested: remote_names.len() + late_names.len(),
            failed,
        }
    }

    /// Compiles the current order and descriptions into a document.
    pub async fn generate_document(&self) -> Result<Url, GenerateError> {
        let items = {
            let mut state = self.inner.lock().await;
            if state.generating {
                return Err(GenerateError::AlreadyGenerating);
            }
            let snapshot = state.collection.snapshot();
            if snapshot.is_empty() {
                return Err(GenerateError::NoImages);
            }
            let items = snapshot.compile_items();
            if items.is_empty() {
                return Err(GenerateError::UploadsPending {
                    pending: snapshot.pending_uploads(),
                });
            }
            state.generating = true;
            items
        };
        self.view.generation_changed(true);

        let outcome = self.store.compile(&items).await;

        self.inner.lock().await.generating = false;
        self.view.generation_changed(false);
        let document = outcome?;
        Ok(document.download_url)
    }

    pub async fn update_description(
        &self,
        id: EntryId,
        text: impl Into<String>,
    ) -> Result<(), CollectionError> {
        let snapshot = {
            let mut state = self.inner.lock().await;
            state.collection.update_description(id, text)?;
            state.collection.snapshot()
        };
        self.view.render(&snapshot);
        Ok(())
    }

    /// Moves an entry; renders only when the order actually changed.
    pub async fn move_entry(&self, id: EntryId, index: usize) -> Result<bool, CollectionError> {
        let snapshot = {
            let mut state = self.inner.lock().await;
            if !state.collection.move_to(id, index)? {
                return Ok(false);
            }
            state.collection.snapshot()
        };
        self.view.render(&snapshot);
        Ok(true)
    }

    async fn delete_all(&self, remote_names: &[RemoteName]) -> Vec<DeleteError> {
        let outcomes = join_all(
            remote_names
                .iter()
                .map(|remote_name| self.store.delete_remote(remote_name)),
        )
        .await;
        let failed: Vec<DeleteError> = outcomes.into_iter().filter_map(Result::err).collect();
        for err in &failed {
            warn!(
                remote_name = %err.remote_name,
                failure = %err.failure,
                "remote delete failed during clear"
            );
        }
        failed
    }

    async fn upload_one(&self, id: EntryId, file: SelectedFile, report: &mut BatchReport) {
        match self
            .store
            .upload(file.payload.clone(), &file.filename, &file.mime_type)
            .await
        {
            Ok(uploaded) => {
                if self.apply_upload(id, uploaded).await {
                    report.uploaded.push(id);
                }
            }
            Err(err) => {
                warn!(filename = %err.filename, failure = %err.failure, "upload failed");
                self.discard_failed_upload(id).await;
                self.view
                    .notify(Notification::new(NotificationLevel::Error, err.user_message()));
                report.failed.push(err);
            }
        }
    }

    async fn apply_upload(&self, id: EntryId, uploaded: UploadedImage) -> bool {
        let applied = {
            let mut state = self.inner.lock().await;
            match state
                .collection
                .assign_remote_name(id, uploaded.remote_name.clone())
            {
                Ok(()) => Some(state.collection.snapshot()),
                Err(_) => None,
            }
        };

        let Some(snapshot) = applied else {
            debug!(
                %id,
                remote_name = %uploaded.remote_name,
                "entry gone before upload finished; removing orphan"
            );
            if let Err(err) = self.store.delete_remote(&uploaded.remote_name).await {
                warn!(
                    remote_name = %err.remote_name,
                    failure = %err.failure,
                    "orphan cleanup failed"
                );
            }
            return false;
        };
        self.view.render(&snapshot);
        self.view.notify(Notification::new(
            NotificationLevel::Success,
            format!("Uploaded: {}", uploaded.original_name),
        ));
        true
    }

    async fn discard_failed_upload(&self, id: EntryId) {
        let snapshot = {
            let mut state = self.inner.lock().await;
            if state.collection.remove_by_id(id).is_err() {
                return;
            }
            state.collection.snapshot()
        };
        self.view.render(&snapshot);
    }

    async fn report_progress(&self, progress: UploadProgress) {
        self.inner.lock().await.phase = UploadPhase::Uploading(progress);
        self.view.upload_progress(progress);
    }
}

#[async_trait]
impl IntentHandler for SyncCoordinator {
    async fn on_files_selected(&self, files: Vec<SelectedFile>) {
        self.upload_files(files).await;
    }

    async fn on_delete_requested(&self, id: EntryId) {
        if let Err(err) = self.delete_entry(id).await {
            debug!(%err, "delete ignored");
        }
    }

    async fn on_clear_requested(&self) {
        self.clear_all().await;
    }

    async fn on_generate_requested(&self) -> Option<Url> {
        match self.generate_document().await {
            Ok(url) => {
                self.view.notify(Notification::new(
                    NotificationLevel::Success,
                    "PDF generated, download started",
                ));
                Some(url)
            }
            Err(err) => {
                let level = match err {
                    GenerateError::Compile(_) => NotificationLevel::Error,
                    _ => NotificationLevel::Warning,
                };
                warn!(%err, "document generation failed");
                self.view.notify(Notification::new(level, err.user_message()));
                None
            }
        }
    }

    async fn on_description_changed(&self, id: EntryId, text: String) {
        if let Err(err) = self.update_description(id, text).await {
            debug!(%err, "description change ignored");
        }
    }

    async fn on_drag_started(&self, id: EntryId) {
        let mut state = self.inner.lock().await;
        if state.collection.get(id).is_none() {
            debug!(%id, "drag started on unknown entry");
            return;
        }
        state.drag.start(id);
    }

    async fn on_drag_over(&self, items: &[RenderedItem], pointer_y: f32) -> Option<usize> {
        self.inner.lock().await.drag.hover(items, pointer_y)
    }

    async fn on_drop(&self) {
        let Some((id, index)) = self.inner.lock().await.drag.finish() else {
            return;
        };
        if let Err(err) = self.move_entry(id, index).await {
            debug!(%err, "drop ignored");
        }
    }

    async fn on_drag_cancelled(&self) {
        self.inner.lock().await.drag.cancel();
    }
}

#[cfg(test)]
#[path = "tests/sync_tests.rs"]
mod tests;
