use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use url::Url;

pub const CONFIG_FILE: &str = "photo-report.toml";
const DEFAULT_REPORT_STEM: &str = "photo_documentation";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub request_timeout_secs: u64,
    pub output_path: Option<String>,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:5000".into(),
            request_timeout_secs: 120,
            output_path: None,
            log_filter: "info".into(),
        }
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(CONFIG_FILE) {
        apply_file_overrides(&mut settings, &raw);
    }
    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());

    settings
}

/// Applies a flat TOML table. A file that does not parse is ignored.
pub fn apply_file_overrides(settings: &mut Settings, raw: &str) {
    let Ok(table) = toml::from_str::<toml::Table>(raw) else {
        return;
    };

    if let Some(v) = table.get("server_url").and_then(|v| v.as_str()) {
        settings.server_url = v.to_string();
    }
    if let Some(v) = table.get("request_timeout_secs") {
        let parsed = v
            .as_integer()
            .and_then(|n| u64::try_from(n).ok())
            .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()));
        if let Some(secs) = parsed {
            settings.request_timeout_secs = secs;
        }
    }
    if let Some(v) = table.get("output_path").and_then(|v| v.as_str()) {
        settings.output_path = Some(v.to_string());
    }
    if let Some(v) = table.get("log_filter").and_then(|v| v.as_str()) {
        settings.log_filter = v.to_string();
    }
}

pub fn apply_env_overrides(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("PHOTO_REPORT_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = var("APP__SERVER_URL") {
        settings.server_url = v;
    }

    if let Some(v) = var("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.trim().parse::<u64>() {
            settings.request_timeout_secs = parsed;
        }
    }

    if let Some(v) = var("APP__OUTPUT_PATH") {
        settings.output_path = Some(v);
    }

    if let Some(v) = var("RUST_LOG") {
        settings.log_filter = v;
    }
    if let Some(v) = var("APP__LOG_FILTER") {
        settings.log_filter = v;
    }
}

pub fn parse_server_url(raw_server_url: &str) -> anyhow::Result<Url> {
    let server_url = normalize_server_url(raw_server_url);
    Url::parse(&server_url).with_context(|| format!("invalid server url '{raw_server_url}'"))
}

fn normalize_server_url(raw_server_url: &str) -> String {
    let default_url = Settings::default().server_url;
    let raw_server_url = match raw_server_url.trim() {
        "" => default_url.as_str(),
        trimmed => trimmed,
    };

    let with_scheme = if raw_server_url.contains("://") {
        raw_server_url.to_string()
    } else {
        format!("http://{raw_server_url}")
    };

    if with_scheme.ends_with('/') {
        with_scheme
    } else {
        format!("{with_scheme}/")
    }
}

/// Resolves where the report is written and makes sure its directory exists.
/// `stamp` names the file when no path, or only a directory, is given.
pub fn prepare_output_path(raw_output_path: Option<&str>, stamp: &str) -> anyhow::Result<PathBuf> {
    let default_name = format!("{DEFAULT_REPORT_STEM}_{stamp}.pdf");
    let path = match raw_output_path.map(str::trim).filter(|p| !p.is_empty()) {
        None => PathBuf::from(default_name),
        Some(raw) if raw.ends_with('/') || raw.ends_with('\\') || Path::new(raw).is_dir() => {
            Path::new(raw).join(default_name)
        }
        Some(raw) => PathBuf::from(raw),
    };

    ensure_parent_dir_exists(&path)?;
    Ok(path)
}

fn ensure_parent_dir_exists(path: &Path) -> anyhow::Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for report '{}'",
            parent.display(),
            path.display()
        )
    })?;

    Ok(())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
