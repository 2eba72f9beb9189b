pub mod collection;
pub mod error;
pub mod remote_store;
pub mod reorder;
pub mod sync;
pub mod validation;

pub use collection::{Collection, CollectionSnapshot, ImageEntry, LocalHandle};
pub use remote_store::{CompiledDocument, HttpRemoteStore, RemoteStore, UploadedImage};
pub use reorder::{insertion_index, DragState, RenderedItem};
pub use sync::{
    BatchReport, ClearReport, CollectionView, IntentHandler, Notification, NotificationLevel,
    RemoteDelete, SyncCoordinator, UploadPhase, UploadProgress,
};
pub use validation::{validate_selected_file, SelectedFile};
