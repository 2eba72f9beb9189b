//! Client for the server that stores uploaded images and renders the PDF.
//!
//! Every call is a single request. Retrying is left to callers.

use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client, Response,
};
use serde::de::DeserializeOwned;
use shared::{
    domain::RemoteName,
    error::ApiError,
    protocol::{
        DeleteImageRequest, DeleteImageResponse, GeneratePdfRequest, GeneratePdfResponse,
        PdfImage, UploadResponse, DELETE_IMAGE_ROUTE, GENERATE_PDF_ROUTE, UPLOAD_FILE_FIELD,
        UPLOAD_ROUTE,
    },
};
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    collection::LocalHandle,
    error::{CompileError, DeleteError, RemoteFailure, UploadError},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    pub remote_name: RemoteName,
    pub original_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledDocument {
    pub download_url: Url,
}

#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn upload(
        &self,
        payload: LocalHandle,
        filename: &str,
        mime_type: &str,
    ) -> Result<UploadedImage, UploadError>;
    async fn delete_remote(&self, remote_name: &RemoteName) -> Result<(), DeleteError>;
    /// `entries` are in document order and all carry a remote name.
    async fn compile(&self, entries: &[PdfImage]) -> Result<CompiledDocument, CompileError>;
}

pub struct HttpRemoteStore {
    http: Client,
    base_url: Url,
}

impl HttpRemoteStore {
    pub fn new(base_url: Url) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, mut base_url: Url) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetches a compiled document from the URL returned by [`RemoteStore::compile`].
    pub async fn download(&self, url: &Url) -> Result<Vec<u8>, RemoteFailure> {
        let response = self.http.get(url.clone()).send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.ok();
            return Err(RemoteFailure::Rejected(ApiError::new(
                status.as_u16(),
                message,
            )));
        }
        let bytes = response.bytes().await.map_err(transport)?;
        info!(%url, size_bytes = bytes.len(), "downloaded compiled document");
        Ok(bytes.to_vec())
    }

    fn endpoint(&self, route: &str) -> Result<Url, RemoteFailure> {
        self.base_url
            .join(route)
            .map_err(|err| RemoteFailure::Malformed(format!("invalid endpoint {route}: {err}")))
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn upload(
        &self,
        payload: LocalHandle,
        filename: &str,
        mime_type: &str,
    ) -> Result<UploadedImage, UploadError> {
        let fail = |failure| UploadError::new(filename, failure);
        let url = self.endpoint(UPLOAD_ROUTE).map_err(fail)?;
        let size_bytes = payload.len();
        let part = Part::bytes(payload.bytes().to_vec())
            .file_name(filename.to_string())
            .mime_str(mime_type)
            .map_err(|err| fail(RemoteFailure::Malformed(err.to_string())))?;
        let form = Form::new().part(UPLOAD_FILE_FIELD, part);

        debug!(%url, filename, size_bytes, "uploading image");
        let response = self
            .http
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|err| fail(transport(err)))?;
        let (status, body) = decode::<UploadResponse>(response).await.map_err(fail)?;
        let body = body.unwrap_or_default();

        if !is_success(status) || !body.success {
            return Err(fail(RemoteFailure::Rejected(ApiError::new(
                status, body.error,
            ))));
        }
        let remote_name = body.filename.ok_or_else(|| {
            fail(RemoteFailure::Malformed(
                "upload response has no filename".to_string(),
            ))
        })?;

        Ok(UploadedImage {
            remote_name,
            original_name: body.original_name.unwrap_or_else(|| filename.to_string()),
        })
    }

    async fn delete_remote(&self, remote_name: &RemoteName) -> Result<(), DeleteError> {
        let fail = |failure| DeleteError::new(remote_name.clone(), failure);
        let url = self.endpoint(DELETE_IMAGE_ROUTE).map_err(fail)?;
        let response = self
            .http
            .post(url)
            .json(&DeleteImageRequest {
                filename: remote_name.clone(),
            })
            .send()
            .await
            .map_err(|err| fail(transport(err)))?;
        let (status, body) = decode::<DeleteImageResponse>(response)
            .await
            .map_err(fail)?;
        let body = body.unwrap_or_default();

        if !is_success(status) || !body.success {
            warn!(%remote_name, status, "remote delete rejected");
            return Err(fail(RemoteFailure::Rejected(ApiError::new(
                status, body.error,
            ))));
        }
        debug!(%remote_name, "remote image deleted");
        Ok(())
    }

    async fn compile(&self, entries: &[PdfImage]) -> Result<CompiledDocument, CompileError> {
        let url = self
            .endpoint(GENERATE_PDF_ROUTE)
            .map_err(CompileError::new)?;
        let response = self
            .http
            .post(url)
            .json(&GeneratePdfRequest {
                images: entries.to_vec(),
            })
            .send()
            .await
            .map_err(|err| CompileError::new(transport(err)))?;
        let (status, body) = decode::<GeneratePdfResponse>(response)
            .await
            .map_err(CompileError::new)?;
        let body = body.unwrap_or_default();

        if !is_success(status) || !body.success {
            return Err(CompileError::new(RemoteFailure::Rejected(ApiError::new(
                status, body.error,
            ))));
        }
        let raw_url = body.download_url.ok_or_else(|| {
            CompileError::new(RemoteFailure::Malformed(
                "generate response has no download_url".to_string(),
            ))
        })?;
        let download_url = self.base_url.join(&raw_url).map_err(|err| {
            CompileError::new(RemoteFailure::Malformed(format!(
                "invalid download_url {raw_url:?}: {err}"
            )))
        })?;

        info!(%download_url, pages = entries.len(), "document compiled");
        Ok(CompiledDocument { download_url })
    }
}

fn transport(err: reqwest::Error) -> RemoteFailure {
    RemoteFailure::Transport(err.to_string())
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Reads a JSON body. Error statuses may carry a non-JSON body, which is not
/// a protocol violation, so only 2xx bodies must parse.
async fn decode<T: DeserializeOwned>(
    response: Response,
) -> Result<(u16, Option<T>), RemoteFailure> {
    let status = response.status().as_u16();
    let bytes = response.bytes().await.map_err(transport)?;
    match serde_json::from_slice::<T>(&bytes) {
        Ok(body) => Ok((status, Some(body))),
        Err(err) if is_success(status) => Err(RemoteFailure::Malformed(err.to_string())),
        Err(_) => Ok((status, None)),
    }
}

#[cfg(test)]
#[path = "tests/remote_store_tests.rs"]
mod tests;
