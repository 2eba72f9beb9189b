use std::collections::HashMap;

use super::*;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn file_values_override_defaults() {
    let mut settings = Settings::default();
    apply_file_overrides(
        &mut settings,
        r#"
            server_url = "http://reports.local:8080"
            request_timeout_secs = 30
            output_path = "out/report.pdf"
        "#,
    );
    assert_eq!(settings.server_url, "http://reports.local:8080");
    assert_eq!(settings.request_timeout_secs, 30);
    assert_eq!(settings.output_path.as_deref(), Some("out/report.pdf"));
    assert_eq!(settings.log_filter, "info");
}

#[test]
fn timeout_may_be_written_as_string() {
    let mut settings = Settings::default();
    apply_file_overrides(&mut settings, r#"request_timeout_secs = "45""#);
    assert_eq!(settings.request_timeout_secs, 45);
}

#[test]
fn unparsable_file_is_ignored() {
    let mut settings = Settings::default();
    apply_file_overrides(&mut settings, "server_url = [unterminated");
    assert_eq!(settings, Settings::default());
}

#[test]
fn app_prefixed_env_wins_over_plain_env() {
    let mut settings = Settings::default();
    apply_env_overrides(
        &mut settings,
        env(&[
            ("PHOTO_REPORT_SERVER_URL", "http://plain:1"),
            ("APP__SERVER_URL", "http://prefixed:2"),
            ("APP__REQUEST_TIMEOUT_SECS", "not-a-number"),
            ("APP__LOG_FILTER", "client_core=debug"),
        ]),
    );
    assert_eq!(settings.server_url, "http://prefixed:2");
    assert_eq!(settings.request_timeout_secs, 120);
    assert_eq!(settings.log_filter, "client_core=debug");
}

#[test]
fn bare_host_gets_scheme_and_trailing_slash() {
    assert_eq!(normalize_server_url("127.0.0.1:5000"), "http://127.0.0.1:5000/");
    assert_eq!(
        normalize_server_url(" https://reports.example/app "),
        "https://reports.example/app/"
    );
    assert_eq!(normalize_server_url(""), "http://127.0.0.1:5000/");
}

#[test]
fn parse_server_url_rejects_garbage() {
    assert!(parse_server_url("http://[::1").is_err());
    assert_eq!(
        parse_server_url("localhost:5000").expect("url").as_str(),
        "http://localhost:5000/"
    );
}

#[test]
fn default_output_uses_stamp() {
    let path = prepare_output_path(None, "20240101_120000").expect("path");
    assert_eq!(path, PathBuf::from("photo_documentation_20240101_120000.pdf"));
}

#[test]
fn creates_parent_dir_for_nested_output() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let target = temp_root.path().join("reports").join("site.pdf");

    let path = prepare_output_path(Some(target.to_string_lossy().as_ref()), "x").expect("path");

    assert_eq!(path, target);
    assert!(temp_root.path().join("reports").is_dir());
}

#[test]
fn directory_output_gets_default_file_name() {
    let temp_root = tempfile::tempdir().expect("tempdir");

    let path = prepare_output_path(Some(temp_root.path().to_string_lossy().as_ref()), "stamp")
        .expect("path");

    assert_eq!(path, temp_root.path().join("photo_documentation_stamp.pdf"));
}
