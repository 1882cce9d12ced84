//! Bootstrap Scenario Tests
//!
//! First-run identity capture and executable discovery, against a temporary
//! directory standing in for the store machine.

mod common;

use std::path::Path;
use std::time::Duration;

use common::{capture_logs, StubPrompt};
use storewatch::coordinator::{self, NOTICE_MESSAGE};
use storewatch::{
    ExecutableLocator, FilesystemScan, IdentityError, LocateError, StartupError, WatchdogConfig,
};

fn config_in(root: &Path) -> WatchdogConfig {
    let mut config = WatchdogConfig::default();
    config.target.process_name = "App.exe".to_string();
    config.target.default_path = root.join("install").join("App.exe");
    config.target.scan_root = root.join("volume");
    config.identity.path = root.join("config.json");
    config
}

fn locator_for(config: &WatchdogConfig) -> ExecutableLocator<FilesystemScan> {
    ExecutableLocator::from_config(&config.target)
}

fn install_at(path: &Path) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, b"").unwrap();
}

#[tokio::test]
async fn first_run_prompts_once_and_persists_store_id() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    install_at(&config.target.default_path);

    let prompt = StubPrompt::answering("StoreX");
    let boot = coordinator::bootstrap(&config, &prompt, locator_for(&config))
        .await
        .unwrap();

    assert_eq!(boot.identity.as_str(), "StoreX");
    assert_eq!(boot.executable, config.target.default_path);
    assert_eq!(prompt.ask_count(), 1);
    assert_eq!(*prompt.infos.lock().unwrap(), vec![NOTICE_MESSAGE.to_string()]);

    let stored = std::fs::read_to_string(&config.identity.path).unwrap();
    assert_eq!(stored, r#"{"loja_id":"StoreX"}"#);

    // Second start reads the file and never asks again.
    let second_prompt = StubPrompt::silent();
    let again = coordinator::bootstrap(&config, &second_prompt, locator_for(&config))
        .await
        .unwrap();
    assert_eq!(again.identity.as_str(), "StoreX");
    assert_eq!(second_prompt.ask_count(), 0);
}

#[tokio::test]
async fn answer_is_trimmed_before_persisting() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    install_at(&config.target.default_path);

    let prompt = StubPrompt::answering("  Loja 12  ");
    let boot = coordinator::bootstrap(&config, &prompt, locator_for(&config))
        .await
        .unwrap();

    assert_eq!(boot.identity.as_str(), "Loja 12");
    let stored = std::fs::read_to_string(&config.identity.path).unwrap();
    assert_eq!(stored, r#"{"loja_id":"Loja 12"}"#);
}

#[tokio::test]
async fn cancelled_prompt_exits_without_writing_identity() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    install_at(&config.target.default_path);

    let prompt = StubPrompt::silent();
    let err = coordinator::bootstrap(&config, &prompt, locator_for(&config))
        .await
        .unwrap_err();

    assert!(matches!(err, StartupError::Identity(IdentityError::Missing)));
    assert!(!config.identity.path.exists());
    assert_eq!(prompt.errors.lock().unwrap().len(), 1);
    assert!(prompt.infos.lock().unwrap().is_empty());
}

#[tokio::test]
async fn executable_found_by_scan_when_default_path_missing() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    let nested = config.target.scan_root.join("Programs").join("Vendor").join("App.exe");
    install_at(&nested);
    std::fs::create_dir_all(config.target.scan_root.join("Other")).unwrap();

    let prompt = StubPrompt::answering("StoreX");
    let boot = coordinator::bootstrap(&config, &prompt, locator_for(&config))
        .await
        .unwrap();

    assert_eq!(boot.executable, nested);
}

#[tokio::test]
async fn missing_executable_is_fatal_and_reported() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    std::fs::create_dir_all(config.target.scan_root.join("Programs")).unwrap();

    let prompt = StubPrompt::answering("StoreX");
    let err = coordinator::bootstrap(&config, &prompt, locator_for(&config))
        .await
        .unwrap_err();

    assert!(matches!(err, StartupError::Locate(LocateError::NotFound { .. })));
    let errors = prompt.errors.lock().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("App.exe"));
    assert!(prompt.infos.lock().unwrap().is_empty());
}

#[test]
fn scan_time_budget_reports_exhaustion() {
    let dir = tempfile::tempdir().unwrap();
    for i in 0..20 {
        std::fs::create_dir_all(dir.path().join(format!("d{i}")).join("inner")).unwrap();
    }

    let scan = FilesystemScan::new(dir.path()).with_time_budget(Some(Duration::ZERO));
    let locator = ExecutableLocator::new("App.exe", None, scan);

    let err = locator.locate().unwrap_err();
    let LocateError::NotFound { reason, .. } = err;
    assert_eq!(reason, "scan budget exhausted");
}

#[test]
fn locator_miss_logs_one_diagnostic() {
    let (logs, _guard) = capture_logs();
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    std::fs::create_dir_all(config.target.scan_root.join("Programs")).unwrap();

    let err = locator_for(&config).locate().unwrap_err();
    assert!(matches!(err, LocateError::NotFound { reason: "scan found no match", .. }));

    let diagnostics: Vec<String> = logs
        .lines()
        .into_iter()
        .filter(|l| l.contains("Could not locate the executable automatically"))
        .collect();
    assert_eq!(diagnostics.len(), 1);
    assert!(diagnostics[0].contains("App.exe"), "{}", diagnostics[0]);
}
