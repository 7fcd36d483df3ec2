//! Unit tests for `SecretsManager` with a stand-in `age`.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use fleet_common::Agent;
use fleetctl::application::services::SecretsManager;
use fleetctl::domain::error::SecurityError;
use fleetctl::infra::pipeline::TokioPipelineRunner;

use crate::helpers::{CLAUDE_KEY, Deployment, GROK_KEY, mode, read, set_mode};

fn security_error(err: &anyhow::Error) -> &SecurityError {
    err.downcast_ref::<SecurityError>()
        .unwrap_or_else(|| panic!("expected SecurityError, got: {err:#}"))
}

fn manager<'a>(runner: &'a TokioPipelineRunner, d: &Deployment) -> SecretsManager<'a, TokioPipelineRunner> {
    SecretsManager::new(runner, &d.config, d.paths.clone(), d.operator.clone()).unwrap()
}

// ── Key material ─────────────────────────────────────────────────────────────

#[test]
fn missing_key_is_rejected() {
    let d = Deployment::new();
    std::fs::remove_file(&d.paths.key_path).unwrap();
    let runner = TokioPipelineRunner::new();
    let err = SecretsManager::new(&runner, &d.config, d.paths.clone(), d.operator.clone())
        .err()
        .unwrap();
    assert!(matches!(security_error(&err), SecurityError::KeyNotFound(_)));
}

#[test]
fn group_readable_key_is_rejected() {
    let d = Deployment::new();
    d.write_key(0o640);
    let runner = TokioPipelineRunner::new();
    let err = SecretsManager::new(&runner, &d.config, d.paths.clone(), d.operator.clone())
        .err()
        .unwrap();
    assert!(matches!(
        security_error(&err),
        SecurityError::InsecureKeyPermissions { mode: 0o640, .. }
    ));
}

#[test]
fn key_without_public_line_is_rejected() {
    let d = Deployment::new();
    std::fs::write(&d.paths.key_path, "AGE-SECRET-KEY-1ONLY\n").unwrap();
    set_mode(&d.paths.key_path, 0o600);
    let runner = TokioPipelineRunner::new();
    let err = SecretsManager::new(&runner, &d.config, d.paths.clone(), d.operator.clone())
        .err()
        .unwrap();
    assert!(matches!(security_error(&err), SecurityError::PublicKeyMissing(_)));
}

// ── Encrypt ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn encrypt_stores_0600_ciphertext() {
    let d = Deployment::new();
    let runner = TokioPipelineRunner::new();
    let secrets = manager(&runner, &d);

    let path = secrets.encrypt_secret(Agent::Claude, CLAUDE_KEY).await.unwrap();
    assert_eq!(path, d.paths.secret_path(Agent::Claude));
    assert_eq!(mode(&path), 0o600);
    assert!(read(&path).starts_with("FAKE-AGE:"));
    assert!(secrets.verify_secret_exists(Agent::Claude));
    assert!(secrets.verify_secret_permissions(Agent::Claude));
    assert!(secrets.test_decryption(Agent::Claude).await);
}

#[tokio::test]
async fn encrypt_replaces_existing_secret() {
    let d = Deployment::new();
    let runner = TokioPipelineRunner::new();
    let secrets = manager(&runner, &d);

    secrets.encrypt_secret(Agent::Grok, GROK_KEY).await.unwrap();
    let second = format!("{GROK_KEY}-rotated");
    let path = secrets.encrypt_secret(Agent::Grok, &second).await.unwrap();
    assert!(read(&path).ends_with("-rotated"));
}

#[tokio::test]
async fn invalid_format_writes_nothing() {
    let d = Deployment::new();
    let runner = TokioPipelineRunner::new();
    let secrets = manager(&runner, &d);

    let err = secrets.encrypt_secret(Agent::Claude, "sk-ant-short").await.unwrap_err();
    assert!(matches!(security_error(&err), SecurityError::InvalidSecretFormat(Agent::Claude)));
    assert!(!d.paths.secret_path(Agent::Claude).exists());
    assert!(!err.to_string().contains("sk-ant-short"));
}

#[tokio::test]
async fn missing_age_fails_without_leftovers() {
    let d = Deployment::new().with_tool("age", "/nonexistent/age");
    let runner = TokioPipelineRunner::new();
    let secrets = manager(&runner, &d);

    let err = secrets.encrypt_secret(Agent::Claude, CLAUDE_KEY).await.unwrap_err();
    assert!(matches!(security_error(&err), SecurityError::EncryptionFailed(Agent::Claude)));

    let context_dir = d.paths.secret_path(Agent::Claude).parent().unwrap().to_path_buf();
    let leftovers: Vec<_> = std::fs::read_dir(&context_dir).unwrap().flatten().collect();
    assert!(leftovers.is_empty(), "temp files left: {leftovers:?}");
}

#[tokio::test]
async fn failing_age_is_encryption_failed() {
    let d = Deployment::new().with_tool("age", "false");
    let runner = TokioPipelineRunner::new();
    let secrets = manager(&runner, &d);

    let err = secrets.encrypt_secret(Agent::Grok, GROK_KEY).await.unwrap_err();
    assert!(matches!(security_error(&err), SecurityError::EncryptionFailed(Agent::Grok)));
    assert!(!d.paths.secret_path(Agent::Grok).exists());
}

// ── Verify ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn verify_all_reports_each_agent() {
    let d = Deployment::new();
    let runner = TokioPipelineRunner::new();
    let secrets = manager(&runner, &d);
    secrets.encrypt_secret(Agent::Claude, CLAUDE_KEY).await.unwrap();
    secrets.encrypt_secret(Agent::Grok, GROK_KEY).await.unwrap();
    set_mode(&d.paths.secret_path(Agent::Grok), 0o644);

    let checks = secrets.verify_all().await;
    assert_eq!(checks.len(), 3);

    let claude = checks.iter().find(|c| c.agent == Agent::Claude).unwrap();
    assert!(claude.ok());

    let grok = checks.iter().find(|c| c.agent == Agent::Grok).unwrap();
    assert!(grok.exists);
    assert!(!grok.permissions_ok);
    assert!(grok.decryptable);

    let gemini = checks.iter().find(|c| c.agent == Agent::Gemini).unwrap();
    assert!(!gemini.exists);
    assert!(!gemini.decryptable);
}

#[tokio::test]
async fn corrupted_secret_does_not_decrypt() {
    let d = Deployment::new();
    let runner = TokioPipelineRunner::new();
    let secrets = manager(&runner, &d);
    let path = secrets.encrypt_secret(Agent::Claude, CLAUDE_KEY).await.unwrap();
    std::fs::write(&path, "not ciphertext").unwrap();

    assert!(!secrets.test_decryption(Agent::Claude).await);
}
