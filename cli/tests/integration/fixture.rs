//! A temp-dir deployment reachable through `FLEETCTL_CONFIG`.

#![allow(dead_code, clippy::expect_used, clippy::unwrap_used)]

use std::os::unix::fs::PermissionsExt as _;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;

const FAKE_AGE: &str = r#"#!/bin/sh
mode=enc
in=
while [ $# -gt 0 ]; do
  case "$1" in
    -d) mode=dec ;;
    -r|-i) shift ;;
    *) in="$1" ;;
  esac
  shift
done
if [ "$mode" = enc ]; then
  printf 'FAKE-AGE:'
  exec cat
fi
[ -n "$in" ] || in=/dev/stdin
if [ "$(head -c 9 "$in")" != "FAKE-AGE:" ]; then
  echo "age: failed to decrypt" >&2
  exit 1
fi
exec tail -c +10 "$in"
"#;

pub const CLAUDE_KEY: &str = "sk-ant-REDACTED";
pub const GROK_KEY: &str = "xai-bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
pub const GEMINI_KEY: &str = "AIzaSyCcccccccccccccccccccccccccccccc";

pub struct Fixture {
    pub dir: TempDir,
}

impl Fixture {
    /// Layout with key material and a fake `age`; the engine is absent.
    pub fn new() -> Self {
        let fixture = Self {
            dir: tempfile::tempdir().unwrap(),
        };
        let bin = fixture.path("bin");
        std::fs::create_dir_all(&bin).unwrap();
        let age = bin.join("age");
        std::fs::write(&age, FAKE_AGE).unwrap();
        set_mode(&age, 0o755);

        std::fs::write(
            fixture.key_path(),
            "# public key: age1qyqszqgpqyqszqgpqyqszqgpqyqszqgpqyqszqgpqyqszqgpqyqs3290gq\nAGE-SECRET-KEY-1TEST\n",
        )
        .unwrap();
        set_mode(&fixture.key_path(), 0o600);

        let config = format!(
            "ai_root: {ai}\nkey_path: {key}\nbackup_dir: {backups}\nage: {age}\nengine: {engine}\ntimeouts:\n  probe_secs: 2\n",
            ai = fixture.ai_root().display(),
            key = fixture.key_path().display(),
            backups = fixture.backup_dir().display(),
            age = age.display(),
            engine = fixture.path("bin/no-such-engine").display(),
        );
        std::fs::write(fixture.config_path(), config).unwrap();
        fixture
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    pub fn config_path(&self) -> PathBuf {
        self.path("config.yaml")
    }

    pub fn ai_root(&self) -> PathBuf {
        self.path("ai")
    }

    pub fn key_path(&self) -> PathBuf {
        self.path("age-key.txt")
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.path("backups")
    }

    pub fn seed_tree(&self) {
        for agent in ["claude", "grok", "gemini"] {
            let history = self.ai_root().join(agent).join("history");
            std::fs::create_dir_all(&history).unwrap();
            std::fs::write(history.join("session.log"), format!("{agent} says hi\n")).unwrap();
        }
    }

    /// `fleetctl` bound to this fixture, non-interactive and colorless.
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("fleetctl"));
        cmd.env("NO_COLOR", "1")
            .env("FLEETCTL_CONFIG", self.config_path())
            .env("FLEETCTL_YES", "1")
            .env_remove("RUST_LOG")
            .env_remove("SUDO_USER");
        cmd
    }
}

pub fn set_mode(path: &Path, mode: u32) {
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).unwrap();
}

pub fn json_stdout(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout)
        .unwrap_or_else(|e| panic!("invalid JSON ({e}): {}", String::from_utf8_lossy(&output.stdout)))
}
