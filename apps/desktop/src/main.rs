use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use client_core::{
    CollectionSnapshot, HttpRemoteStore, IntentHandler, SelectedFile, SyncCoordinator,
};
use shared::domain::EntryId;
use tracing::{debug, info, warn};

mod config;
mod view;

use config::{load_settings, parse_server_url, prepare_output_path};
use view::ConsoleView;

/// Uploads images, applies descriptions and ordering, and saves the compiled PDF report.
#[derive(Parser, Debug)]
#[command(name = "photo-report")]
struct Args {
    /// Images in initial page order.
    #[arg(required = true)]
    images: Vec<PathBuf>,
    #[arg(long)]
    server_url: Option<String>,
    /// Description for an image, as FILE_NAME=TEXT. Repeatable.
    #[arg(long = "describe", value_parser = parse_description)]
    descriptions: Vec<(String, String)>,
    /// Moves an image to a page position, as FILE_NAME=INDEX (0-based). Applied in order.
    #[arg(long = "move", value_parser = parse_move)]
    moves: Vec<(String, usize)>,
    #[arg(long)]
    output: Option<PathBuf>,
    /// Delete the uploaded images from the server once the report is saved.
    #[arg(long)]
    cleanup: bool,
}

fn parse_description(raw: &str) -> Result<(String, String), String> {
    let (name, text) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected FILE_NAME=TEXT, got '{raw}'"))?;
    Ok((name.trim().to_string(), text.to_string()))
}

fn parse_move(raw: &str) -> Result<(String, usize), String> {
    let (name, index) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected FILE_NAME=INDEX, got '{raw}'"))?;
    let index = index
        .trim()
        .parse()
        .map_err(|_| format!("invalid page index '{index}'"))?;
    Ok((name.trim().to_string(), index))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = load_settings();
    if let Some(server_url) = &args.server_url {
        settings.server_url = server_url.clone();
    }
    if let Some(output) = &args.output {
        settings.output_path = Some(output.to_string_lossy().into_owned());
    }
    tracing_subscriber::fmt()
        .with_env_filter(settings.log_filter.as_str())
        .init();

    let base_url = parse_server_url(&settings.server_url)?;
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.request_timeout_secs))
        .build()
        .context("failed to build HTTP client")?;
    let store = Arc::new(HttpRemoteStore::with_client(http, base_url));
    let coordinator = SyncCoordinator::new(store.clone(), Arc::new(ConsoleView));
    info!(server_url = %store.base_url(), images = args.images.len(), "starting photo report");

    let files = read_selected_files(&args.images).await?;
    coordinator.on_files_selected(files).await;

    let snapshot = coordinator.snapshot().await;
    for (name, text) in &args.descriptions {
        match entry_named(&snapshot, name) {
            Some(id) => coordinator.on_description_changed(id, text.clone()).await,
            None => warn!(name = %name, "no uploaded image with that name to describe"),
        }
    }
    for (name, index) in &args.moves {
        match entry_named(&snapshot, name) {
            Some(id) => {
                coordinator
                    .move_entry(id, *index)
                    .await
                    .with_context(|| format!("failed to move '{name}'"))?;
            }
            None => warn!(name = %name, "no uploaded image with that name to move"),
        }
    }

    let output_path = settings.output_path.as_deref();
    let output = finish_report(&coordinator, &store, output_path, args.cleanup).await?;
    info!(path = %output.display(), "report saved");
    Ok(())
}

/// Saves the report, then clears the uploads when asked to, even if saving failed.
async fn finish_report(
    coordinator: &SyncCoordinator,
    store: &HttpRemoteStore,
    output_path: Option<&str>,
    cleanup: bool,
) -> Result<PathBuf> {
    let saved = save_report(coordinator, store, output_path).await;
    if cleanup {
        coordinator.on_clear_requested().await;
    }
    saved
}

/// Looks an entry up by file name. With several matches the first one wins.
fn entry_named(snapshot: &CollectionSnapshot, name: &str) -> Option<EntryId> {
    let mut matches = snapshot.iter().filter(|entry| entry.display_name() == name);
    let first = matches.next()?;
    let others = matches.count();
    if others > 0 {
        warn!(
            name = %name,
            matches = others + 1,
            "several images share this name; using the first"
        );
    }
    Some(first.id())
}

async fn save_report(
    coordinator: &SyncCoordinator,
    store: &HttpRemoteStore,
    output_path: Option<&str>,
) -> Result<PathBuf> {
    let download_url = coordinator
        .on_generate_requested()
        .await
        .ok_or_else(|| anyhow!("no report was generated"))?;
    let document = store
        .download(&download_url)
        .await
        .with_context(|| format!("failed to download report from {download_url}"))?;

    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
    let output = prepare_output_path(output_path, &stamp)?;
    tokio::fs::write(&output, &document)
        .await
        .with_context(|| format!("failed to write report to '{}'", output.display()))?;
    debug!(path = %output.display(), size_bytes = document.len(), "report written");
    Ok(output)
}

async fn read_selected_files(paths: &[PathBuf]) -> Result<Vec<SelectedFile>> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let Some(filename) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            bail!("'{}' is not a file", path.display());
        };
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read '{}'", path.display()))?;
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        files.push(SelectedFile::new(filename, mime_type, bytes));
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use axum::{extract::Multipart, extract::State, routing::post, Json, Router};
    use client_core::{Collection, CollectionView, LocalHandle};
    use serde_json::{json, Value};
    use tokio::net::TcpListener;
    use url::Url;

    use super::*;

    struct SilentView;

    impl CollectionView for SilentView {
        fn render(&self, _snapshot: &CollectionSnapshot) {}
        fn notify(&self, _notification: client_core::Notification) {}
        fn upload_progress(&self, _progress: client_core::UploadProgress) {}
    }

    type Deleted = Arc<Mutex<Vec<String>>>;

    async fn accept_upload(mut multipart: Multipart) -> Json<Value> {
        let mut filename = String::new();
        while let Ok(Some(field)) = multipart.next_field().await {
            filename = field.file_name().unwrap_or_default().to_string();
            let _ = field.bytes().await;
        }
        Json(json!({
            "success": true,
            "filename": format!("stored_{filename}"),
            "original_name": filename,
        }))
    }

    async fn record_delete(State(deleted): State<Deleted>, Json(body): Json<Value>) -> Json<Value> {
        let filename = body["filename"].as_str().unwrap_or_default().to_string();
        deleted.lock().expect("deleted").push(filename);
        Json(json!({ "success": true }))
    }

    async fn refuse_generate() -> Json<Value> {
        Json(json!({ "success": false, "error": "PDF engine unavailable" }))
    }

    async fn spawn_refusing_server() -> (Url, Deleted) {
        std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let deleted = Deleted::default();
        let app = Router::new()
            .route("/upload", post(accept_upload))
            .route("/delete-image", post(record_delete))
            .route("/generate-pdf", post(refuse_generate))
            .with_state(deleted.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        (Url::parse(&format!("http://{addr}")).expect("url"), deleted)
    }

    #[tokio::test]
    async fn cleanup_runs_when_generation_fails() {
        let (base_url, deleted) = spawn_refusing_server().await;
        let store = Arc::new(HttpRemoteStore::new(base_url));
        let coordinator = SyncCoordinator::new(store.clone(), Arc::new(SilentView));
        coordinator
            .on_files_selected(vec![
                SelectedFile::new("a.jpg", "image/jpeg", vec![1u8]),
                SelectedFile::new("b.jpg", "image/jpeg", vec![2u8]),
            ])
            .await;
        assert_eq!(coordinator.snapshot().await.pending_uploads(), 0);

        let result = finish_report(&coordinator, &store, None, true).await;

        assert!(result.is_err());
        assert!(coordinator.snapshot().await.is_empty());
        let mut deleted = deleted.lock().expect("deleted").clone();
        deleted.sort();
        assert_eq!(deleted, ["stored_a.jpg", "stored_b.jpg"]);
    }

    #[test]
    fn description_keeps_equals_signs_in_text() {
        assert_eq!(
            parse_description("door.jpg=crack = 3 cm"),
            Ok(("door.jpg".into(), "crack = 3 cm".into()))
        );
        assert!(parse_description("door.jpg").is_err());
    }

    #[test]
    fn move_requires_numeric_index() {
        assert_eq!(parse_move("roof.png= 2"), Ok(("roof.png".into(), 2)));
        assert!(parse_move("roof.png=first").is_err());
    }

    #[test]
    fn cli_accepts_repeated_options() {
        let args = Args::try_parse_from([
            "photo-report",
            "a.jpg",
            "b.jpg",
            "--describe",
            "a.jpg=front",
            "--move",
            "b.jpg=0",
            "--move",
            "a.jpg=1",
            "--cleanup",
        ])
        .expect("args");
        assert_eq!(args.images.len(), 2);
        assert_eq!(args.descriptions, vec![("a.jpg".into(), "front".into())]);
        assert_eq!(args.moves.len(), 2);
        assert!(args.cleanup);
    }

    #[test]
    fn duplicate_names_resolve_to_the_first_entry() {
        let mut collection = Collection::new();
        let first = collection.accept("a.jpg", "image/jpeg", LocalHandle::from(vec![1]));
        collection.accept("b.jpg", "image/jpeg", LocalHandle::from(vec![2]));
        collection.accept("a.jpg", "image/jpeg", LocalHandle::from(vec![3]));
        let snapshot = collection.snapshot();

        assert_eq!(entry_named(&snapshot, "a.jpg"), Some(first));
        assert_eq!(entry_named(&snapshot, "missing.jpg"), None);
    }

    #[tokio::test]
    async fn reads_files_with_guessed_mime_type() {
        let dir = tempfile::tempdir().expect("tempdir");
        let image = dir.path().join("site.png");
        let notes = dir.path().join("notes.txt");
        std::fs::write(&image, [1u8, 2, 3]).expect("write");
        std::fs::write(&notes, b"hi").expect("write");

        let files = read_selected_files(&[image, notes]).await.expect("read");

        assert_eq!(files[0].filename, "site.png");
        assert_eq!(files[0].mime_type, "image/png");
        assert_eq!(files[0].size(), 3);
        assert_eq!(files[1].mime_type, "text/plain");
    }
}
