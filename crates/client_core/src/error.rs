use shared::{
    domain::{EntryId, RemoteName},
    error::ApiError,
};
use thiserror::Error;

/// Misuse of the collection model. These indicate a broken caller contract,
/// not a condition a user can act on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollectionError {
    #[error("no entry with id {0}")]
    NotFound(EntryId),
    #[error("entry id {0} is already present")]
    DuplicateId(EntryId),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationFailure {
    #[error("unsupported file type {mime_type:?}")]
    UnsupportedType { mime_type: String },
    #[error("file is {size} bytes, limit is {limit}")]
    TooLarge { size: u64, limit: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{filename} rejected: {failure}")]
pub struct ValidationError {
    pub filename: String,
    pub failure: ValidationFailure,
}

impl ValidationError {
    pub fn user_message(&self) -> String {
        match &self.failure {
            ValidationFailure::UnsupportedType { .. } => {
                format!("Invalid file type: {}", self.filename)
            }
            ValidationFailure::TooLarge { limit, .. } => format!(
                "File is too large: {} (max {} MB)",
                self.filename,
                limit / (1024 * 1024)
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteFailure {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("rejected by server: {0}")]
    Rejected(ApiError),
    #[error("malformed server response: {0}")]
    Malformed(String),
}

impl RemoteFailure {
    /// Message supplied by the server, if it sent one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Rejected(api) => api.message.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("upload of {filename} failed: {failure}")]
pub struct UploadError {
    pub filename: String,
    pub failure: RemoteFailure,
}

impl UploadError {
    pub fn new(filename: impl Into<String>, failure: RemoteFailure) -> Self {
        Self {
            filename: filename.into(),
            failure,
        }
    }

    pub fn user_message(&self) -> String {
        match self.failure.server_message() {
            Some(message) => message.to_string(),
            None => format!("Upload failed: {}", self.filename),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("delete of {remote_name} failed: {failure}")]
pub struct DeleteError {
    pub remote_name: RemoteName,
    pub failure: RemoteFailure,
}

impl DeleteError {
    pub fn new(remote_name: RemoteName, failure: RemoteFailure) -> Self {
        Self {
            remote_name,
            failure,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("document compilation failed: {failure}")]
pub struct CompileError {
    pub failure: RemoteFailure,
}

impl CompileError {
    pub fn new(failure: RemoteFailure) -> Self {
        Self { failure }
    }

    pub fn user_message(&self) -> String {
        match self.failure.server_message() {
            Some(message) => message.to_string(),
            None => "PDF generation failed".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    #[error("there are no images to generate a document from")]
    NoImages,
    #[error("{pending} image(s) are still uploading")]
    UploadsPending { pending: usize },
    #[error("a document is already being generated")]
    AlreadyGenerating,
    #[error(transparent)]
    Compile(#[from] CompileError),
}

impl GenerateError {
    pub fn user_message(&self) -> String {
        match self {
            Self::NoImages => "No images to generate a PDF from".to_string(),
            Self::UploadsPending { .. } => {
                "Wait for the uploads to finish before generating the PDF".to_string()
            }
            Self::AlreadyGenerating => "A PDF is already being generated".to_string(),
            Self::Compile(err) => err.user_message(),
        }
    }
}
