//! Terminal stand-in for the gallery view: every callback becomes a log line.

use client_core::{
    CollectionSnapshot, CollectionView, Notification, NotificationLevel, UploadProgress,
};
use tracing::{debug, error, info, warn};

pub struct ConsoleView;

impl CollectionView for ConsoleView {
    fn render(&self, snapshot: &CollectionSnapshot) {
        info!(
            images = snapshot.len(),
            pending = snapshot.pending_uploads(),
            "collection updated"
        );
        for (page, entry) in snapshot.iter().enumerate() {
            debug!(
                page = page + 1,
                id = %entry.id(),
                name = entry.display_name(),
                uploaded = entry.is_uploaded(),
                description = entry.description(),
                "entry"
            );
        }
    }

    fn notify(&self, notification: Notification) {
        let message = notification.message;
        match notification.level {
            NotificationLevel::Success | NotificationLevel::Info => info!("{message}"),
            NotificationLevel::Warning => warn!("{message}"),
            NotificationLevel::Error => error!("{message}"),
        }
    }

    fn upload_progress(&self, progress: UploadProgress) {
        info!("Uploading... ({}/{})", progress.completed, progress.total);
    }

    fn generation_changed(&self, in_progress: bool) {
        if in_progress {
            info!("Generating PDF...");
        }
    }
}
