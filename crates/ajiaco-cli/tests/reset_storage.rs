//! `reset-storage` against an on-disk storage.

use ajiaco_cli::commands::{execute, open_registry};
use ajiaco_cli::{AppConfig, Command};

#[test]
fn reset_then_stamp_on_disk() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = AppConfig::new(format!("sled://{}", dir.path().join("store").display()));

    let mut out = Vec::new();
    let err = execute(&config, Command::Stamp, &mut "".as_bytes(), &mut out).unwrap_err();
    assert!(err.to_string().contains("not available"), "{err}");

    execute(
        &config,
        Command::ResetStorage { noinput: true },
        &mut "".as_bytes(),
        &mut out,
    )
    .unwrap();
    assert!(String::from_utf8(out).unwrap().ends_with("DONE!\n"));

    let mut out = Vec::new();
    execute(&config, Command::Stamp, &mut "".as_bytes(), &mut out).unwrap();
    let stamp: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert!(stamp["utc_created_at"].is_string());

    let registry = open_registry(&config).unwrap();
    assert!(registry.exists());
}
