//! Unit tests for `SecureBackupManager`: real `tar`, stand-in `age`.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::time::{Duration, SystemTime};

use fleetctl::application::SilentReporter;
use fleetctl::application::services::{
    BackupOptions, BackupStore, RestoreOptions, RestoreOutcome, SecureBackupManager,
};
use fleetctl::domain::error::{BackupError, SecurityError};
use fleetctl::infra::fs::tree_checksum;
use fleetctl::infra::pipeline::TokioPipelineRunner;

use crate::helpers::{Deployment, artifact_paths, mode};

fn manager<'a>(runner: &'a TokioPipelineRunner, d: &Deployment) -> SecureBackupManager<'a, TokioPipelineRunner> {
    SecureBackupManager::new(runner, &d.config, d.paths.clone(), d.operator.clone()).unwrap()
}

const NO_SAFETY: RestoreOptions = RestoreOptions {
    create_safety_backup: false,
    dry_run: false,
};

// ── Create ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn backup_is_private_validated_and_latest() {
    let d = Deployment::new();
    d.seed_tree();
    let runner = TokioPipelineRunner::new();
    let backups = manager(&runner, &d);

    let report = backups.create_backup(BackupOptions::default(), &SilentReporter).await.unwrap();
    assert!(report.path.is_file());
    assert_eq!(mode(&report.path), 0o600);
    assert_eq!(mode(&d.paths.backup_dir), 0o700);
    assert!(report.metadata.validated);
    assert!(report.metadata.include_secrets);
    assert!(report.metadata.file_count.unwrap() > 0);
    assert_eq!(report.metadata.format, "encrypted-v2");
    assert_eq!(backups.latest().as_deref(), Some(report.path.as_path()));
}

#[tokio::test]
async fn excluded_secrets_are_not_archived() {
    let d = Deployment::new();
    d.seed_tree();
    let secret = d.paths.ai_root.join("claude/context/.secrets.age");
    std::fs::write(&secret, "FAKE-AGE:key").unwrap();
    let runner = TokioPipelineRunner::new();
    let backups = manager(&runner, &d);

    let with = backups.create_backup(BackupOptions::default(), &SilentReporter).await.unwrap();
    let listed = backups.verify_backup(&with.path).await.unwrap();
    assert!(listed.iter().any(|f| f.ends_with(".secrets.age")));

    let options = BackupOptions {
        include_secrets: false,
        validate: true,
    };
    let without = backups.create_backup(options, &SilentReporter).await.unwrap();
    let listed = backups.verify_backup(&without.path).await.unwrap();
    assert!(!listed.iter().any(|f| f.ends_with(".secrets.age")));
    assert!(!without.metadata.include_secrets);
}

#[tokio::test]
async fn unvalidated_backup_does_not_move_latest() {
    let d = Deployment::new();
    d.seed_tree();
    let runner = TokioPipelineRunner::new();
    let backups = manager(&runner, &d);

    let good = backups.create_backup(BackupOptions::default(), &SilentReporter).await.unwrap();
    let options = BackupOptions {
        include_secrets: true,
        validate: false,
    };
    let unchecked = backups.create_backup(options, &SilentReporter).await.unwrap();
    assert!(!unchecked.metadata.validated);
    assert_eq!(unchecked.metadata.file_count, None);
    assert_eq!(backups.latest().as_deref(), Some(good.path.as_path()));
}

#[tokio::test]
async fn failed_archive_leaves_no_artifact() {
    let d = Deployment::new().with_tool("tar", "/nonexistent/tar");
    d.seed_tree();
    let runner = TokioPipelineRunner::new();
    let backups = manager(&runner, &d);

    let err = backups.create_backup(BackupOptions::default(), &SilentReporter).await.unwrap_err();
    match err.downcast_ref::<BackupError>() {
        Some(BackupError::CreateFailed { stage, .. }) => assert_eq!(stage, "archive"),
        other => panic!("unexpected: {other:?} / {err:#}"),
    }
    assert!(d.backup_files().is_empty(), "left behind: {:?}", d.backup_files());
    assert!(backups.latest().is_none());
}

#[tokio::test]
async fn failed_validation_removes_artifact() {
    let d = Deployment::new();
    d.seed_tree();
    // Ignores its flags and copies stdin, so decryption reads nothing back.
    let passthrough = d.script("age-passthrough", "exec cat");
    let d = d.with_tool("age", &passthrough);
    let runner = TokioPipelineRunner::new();
    let backups = manager(&runner, &d);

    let err = backups.create_backup(BackupOptions::default(), &SilentReporter).await.unwrap_err();
    assert!(
        matches!(err.downcast_ref::<SecurityError>(), Some(SecurityError::RoundTripFailed { .. })),
        "got: {err:#}"
    );
    assert!(artifact_paths(&d.paths.backup_dir).is_empty());
}

// ── Restore ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn restore_reproduces_the_tree() {
    let d = Deployment::new();
    d.seed_tree();
    let before = tree_checksum(&d.paths.ai_root).unwrap();
    let runner = TokioPipelineRunner::new();
    let backups = manager(&runner, &d);
    let report = backups.create_backup(BackupOptions::default(), &SilentReporter).await.unwrap();

    std::fs::write(d.paths.ai_root.join("grok/context/notes.md"), "changed\n").unwrap();
    assert_ne!(tree_checksum(&d.paths.ai_root).unwrap(), before);

    let outcome = backups.restore_backup(&report.path, NO_SAFETY, &SilentReporter).await.unwrap();
    assert!(matches!(outcome, RestoreOutcome::Restored { safety_backup: None, .. }));
    assert_eq!(tree_checksum(&d.paths.ai_root).unwrap(), before);
}

#[tokio::test]
async fn dry_run_leaves_tree_untouched() {
    let d = Deployment::new();
    d.seed_tree();
    let runner = TokioPipelineRunner::new();
    let backups = manager(&runner, &d);
    let report = backups.create_backup(BackupOptions::default(), &SilentReporter).await.unwrap();

    let notes = d.paths.ai_root.join("claude/context/notes.md");
    std::fs::write(&notes, "edited\n").unwrap();
    let options = RestoreOptions {
        create_safety_backup: true,
        dry_run: true,
    };
    match backups.restore_backup(&report.path, options, &SilentReporter).await.unwrap() {
        RestoreOutcome::DryRun { files } => {
            assert!(files.iter().any(|f| f.ends_with("claude/context/notes.md")));
        }
        other => panic!("unexpected: {other:?}"),
    }
    assert_eq!(std::fs::read_to_string(&notes).unwrap(), "edited\n");
    assert_eq!(artifact_paths(&d.paths.backup_dir).len(), 1);
}

#[tokio::test]
async fn safety_backup_is_made_and_becomes_latest() {
    let d = Deployment::new();
    d.seed_tree();
    let runner = TokioPipelineRunner::new();
    let backups = manager(&runner, &d);
    let report = backups.create_backup(BackupOptions::default(), &SilentReporter).await.unwrap();

    let outcome = backups
        .restore_backup(&report.path, RestoreOptions::default(), &SilentReporter)
        .await
        .unwrap();
    let RestoreOutcome::Restored { safety_backup: Some(safety), .. } = outcome else {
        panic!("expected a safety backup: {outcome:?}");
    };
    assert!(safety.is_file());
    assert_ne!(safety, report.path);
    assert_eq!(backups.latest().as_deref(), Some(safety.as_path()));
    let listed = backups.list_backups().unwrap();
    assert!(listed.iter().any(|b| b.path == safety && b.is_latest));
}

#[tokio::test]
async fn failed_extract_reports_surviving_safety_backup() {
    let d = Deployment::new();
    d.seed_tree();
    let tar = d.script(
        "tar-no-extract",
        r#"case "$1" in -x*) cat >/dev/null; echo "tar: cannot extract" >&2; exit 2;; esac
exec tar "$@""#,
    );
    let d = d.with_tool("tar", &tar);
    let runner = TokioPipelineRunner::new();
    let backups = manager(&runner, &d);
    let report = backups.create_backup(BackupOptions::default(), &SilentReporter).await.unwrap();

    let err = backups
        .restore_backup(&report.path, RestoreOptions::default(), &SilentReporter)
        .await
        .unwrap_err();
    let Some(BackupError::RestoreFailed { reason, safety_backup: Some(safety) }) =
        err.downcast_ref::<BackupError>()
    else {
        panic!("expected RestoreFailed with a safety backup, got: {err:#}");
    };
    assert!(reason.contains("extract"), "reason: {reason}");
    assert!(safety.is_file());
    assert_ne!(safety, &report.path);
    assert_eq!(artifact_paths(&d.paths.backup_dir).len(), 2);
}

#[tokio::test]
async fn corrupt_backup_is_refused_before_touching_tree() {
    let d = Deployment::new();
    d.seed_tree();
    let before = tree_checksum(&d.paths.ai_root).unwrap();
    let runner = TokioPipelineRunner::new();
    let backups = manager(&runner, &d);
    let report = backups.create_backup(BackupOptions::default(), &SilentReporter).await.unwrap();
    std::fs::write(&report.path, "FAKE-AGE:not a tarball").unwrap();

    let err = backups
        .restore_backup(&report.path, RestoreOptions::default(), &SilentReporter)
        .await
        .unwrap_err();
    assert!(
        matches!(err.downcast_ref::<SecurityError>(), Some(SecurityError::RoundTripFailed { .. })),
        "got: {err:#}"
    );
    assert_eq!(tree_checksum(&d.paths.ai_root).unwrap(), before);
    assert_eq!(artifact_paths(&d.paths.backup_dir).len(), 1, "no safety backup expected");
}

#[tokio::test]
async fn restore_of_missing_backup_is_not_found() {
    let d = Deployment::new();
    let runner = TokioPipelineRunner::new();
    let backups = manager(&runner, &d);

    let err = backups
        .restore_backup(&d.paths.backup_dir.join("nope.tar.gz.age"), NO_SAFETY, &SilentReporter)
        .await
        .unwrap_err();
    assert!(matches!(err.downcast_ref::<BackupError>(), Some(BackupError::NotFound(_))));
}

// ── Store ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn list_marks_latest_and_reads_metadata() {
    let d = Deployment::new();
    d.seed_tree();
    let runner = TokioPipelineRunner::new();
    let backups = manager(&runner, &d);
    let first = backups.create_backup(BackupOptions::default(), &SilentReporter).await.unwrap();
    let second = backups.create_backup(BackupOptions::default(), &SilentReporter).await.unwrap();

    let listed = backups.list_backups().unwrap();
    assert_eq!(listed.len(), 2);
    let latest: Vec<_> = listed.iter().filter(|b| b.is_latest).collect();
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0].path, second.path);
    assert!(listed.iter().all(|b| b.metadata.as_ref().is_some_and(|m| m.validated)));
    assert!(listed.iter().any(|b| b.path == first.path));
}

fn set_mtime(path: &std::path::Path, age: Duration) {
    let file = std::fs::File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() - age).unwrap();
}

#[tokio::test]
async fn list_orders_by_modification_time_not_name() {
    let d = Deployment::new();
    d.seed_tree();
    let runner = TokioPipelineRunner::new();
    let backups = manager(&runner, &d);
    let mut made = Vec::new();
    for _ in 0..3 {
        made.push(backups.create_backup(BackupOptions::default(), &SilentReporter).await.unwrap().path);
    }
    let mut by_name = made.clone();
    by_name.sort();
    // Oldest name gets the newest mtime, the newest name sits in the middle.
    set_mtime(&by_name[0], Duration::from_secs(60));
    set_mtime(&by_name[1], Duration::from_secs(3 * 3600));
    set_mtime(&by_name[2], Duration::from_secs(3600));

    let listed: Vec<_> = backups.list_backups().unwrap().into_iter().map(|b| b.path).collect();
    assert_eq!(listed, [by_name[0].clone(), by_name[2].clone(), by_name[1].clone()]);
}

#[test]
fn listing_a_missing_store_is_empty() {
    let d = Deployment::new();
    let store = BackupStore::new(d.paths.backup_dir.clone());
    assert!(store.list().unwrap().is_empty());
    assert!(store.latest().is_none());
}

#[tokio::test]
async fn deleting_latest_removes_pointer_and_sidecar() {
    let d = Deployment::new();
    d.seed_tree();
    let runner = TokioPipelineRunner::new();
    let backups = manager(&runner, &d);
    let report = backups.create_backup(BackupOptions::default(), &SilentReporter).await.unwrap();

    backups.delete_backup(&report.path).unwrap();
    assert!(d.backup_files().is_empty(), "left behind: {:?}", d.backup_files());
    assert!(backups.latest().is_none());

    let err = backups.delete_backup(&report.path).unwrap_err();
    assert!(matches!(err.downcast_ref::<BackupError>(), Some(BackupError::NotFound(_))));
}

#[tokio::test]
async fn deleting_older_backup_keeps_latest() {
    let d = Deployment::new();
    d.seed_tree();
    let runner = TokioPipelineRunner::new();
    let backups = manager(&runner, &d);
    let older = backups.create_backup(BackupOptions::default(), &SilentReporter).await.unwrap();
    let newer = backups.create_backup(BackupOptions::default(), &SilentReporter).await.unwrap();

    backups.store().delete(&older.path).unwrap();
    assert_eq!(backups.latest().as_deref(), Some(newer.path.as_path()));
}
