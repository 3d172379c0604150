//! Malformed configuration files must stop startup with a descriptive error.

use std::ffi::OsString;
use std::fs;

use filterd_config::Config;
use tempfile::TempDir;

#[test]
fn malformed_config_file_is_reported() {
    let temp_dir = TempDir::new().expect("create temp dir");
    let path = temp_dir.path().join("filterd.toml");
    fs::write(
        &path,
        r#"management_socket = { transport = "tcp" host = "127.0.0.1" }"#,
    )
    .expect("write malformed config");

    let args = vec![
        OsString::from("filterd"),
        OsString::from("--config-path"),
        path.into_os_string(),
    ];

    let error = Config::load_from_iter(args).expect_err("loading must fail");
    assert!(
        !error.to_string().is_empty(),
        "expected a descriptive configuration error"
    );
}

#[test]
fn unknown_log_format_is_rejected() {
    let args = vec![
        OsString::from("filterd"),
        OsString::from("--log-format"),
        OsString::from("pretty"),
    ];

    assert!(Config::load_from_iter(args).is_err());
}
