use shared::domain::{IMAGE_MIME_PREFIX, MAX_UPLOAD_BYTES};

use crate::{
    collection::LocalHandle,
    error::{ValidationError, ValidationFailure},
};

/// A file picked or dropped by the user, not yet accepted into the collection.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub filename: String,
    pub mime_type: String,
    pub payload: LocalHandle,
}

impl SelectedFile {
    pub fn new(
        filename: impl Into<String>,
        mime_type: impl Into<String>,
        payload: impl Into<LocalHandle>,
    ) -> Self {
        Self {
            filename: filename.into(),
            mime_type: mime_type.into(),
            payload: payload.into(),
        }
    }

    pub fn size(&self) -> u64 {
        self.payload.len() as u64
    }
}

/// Checks the type and size gates that run before any network call.
pub fn validate_selected_file(file: &SelectedFile) -> Result<(), ValidationError> {
    let is_image = file
        .mime_type
        .get(..IMAGE_MIME_PREFIX.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(IMAGE_MIME_PREFIX));
    if !is_image {
        return Err(ValidationError {
            filename: file.filename.clone(),
            failure: ValidationFailure::UnsupportedType {
                mime_type: file.mime_type.clone(),
            },
        });
    }

    if file.size() > MAX_UPLOAD_BYTES {
        return Err(ValidationError {
            filename: file.filename.clone(),
            failure: ValidationFailure::TooLarge {
                size: file.size(),
                limit: MAX_UPLOAD_BYTES,
            },
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_images_up_to_the_ceiling() {
        let file = SelectedFile::new(
            "max.jpg",
            "image/jpeg",
            vec![0u8; MAX_UPLOAD_BYTES as usize],
        );
        assert_eq!(validate_selected_file(&file), Ok(()));
    }

    #[test]
    fn rejects_non_image_types() {
        for mime_type in ["application/pdf", "", "imagex/png", "text/image/png"] {
            let file = SelectedFile::new("doc", mime_type, vec![1, 2, 3]);
            let err = validate_selected_file(&file).expect_err("must reject");
            assert!(matches!(
                err.failure,
                ValidationFailure::UnsupportedType { .. }
            ));
            assert_eq!(err.filename, "doc");
        }
    }

    #[test]
    fn rejects_files_over_sixteen_mebibytes() {
        let file = SelectedFile::new(
            "huge.png",
            "image/png",
            vec![0u8; MAX_UPLOAD_BYTES as usize + 1],
        );
        let err = validate_selected_file(&file).expect_err("must reject");
        assert_eq!(
            err.failure,
            ValidationFailure::TooLarge {
                size: MAX_UPLOAD_BYTES + 1,
                limit: MAX_UPLOAD_BYTES,
            }
        );
        assert_eq!(err.user_message(), "File is too large: huge.png (max 16 MB)");
    }
}
