//! Request and response bodies of the remote store's HTTP contract.

use serde::{Deserialize, Serialize};

use crate::domain::RemoteName;

pub const UPLOAD_ROUTE: &str = "upload";
pub const DELETE_IMAGE_ROUTE: &str = "delete-image";
pub const GENERATE_PDF_ROUTE: &str = "generate-pdf";
/// Multipart field carrying the image in an upload request.
pub const UPLOAD_FILE_FIELD: &str = "file";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<RemoteName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteImageRequest {
    pub filename: RemoteName,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteImageResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfImage {
    pub filename: RemoteName,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratePdfRequest {
    pub images: Vec<PdfImage>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratePdfResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_only_upload_body_parses_as_failure() {
        let body: UploadResponse =
            serde_json::from_str(r#"{"error":"Ikke tilladt filtype"}"#).expect("json");
        assert!(!body.success);
        assert!(body.filename.is_none());
        assert_eq!(body.error.as_deref(), Some("Ikke tilladt filtype"));
    }

    #[test]
    fn generate_request_uses_wire_field_names() {
        let request = GeneratePdfRequest {
            images: vec![PdfImage {
                filename: RemoteName::new("abc_1.jpg"),
                description: "front door".into(),
            }],
        };
        let value = serde_json::to_value(&request).expect("json");
        assert_eq!(
            value,
            serde_json::json!({
                "images": [{ "filename": "abc_1.jpg", "description": "front door" }]
            })
        );
    }
}
