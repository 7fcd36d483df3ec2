//! Shared test helpers: a scripted engine runner, output constructors, and a
//! temp-dir deployment with a stand-in `age` binary.

#![allow(dead_code, clippy::expect_used, clippy::unwrap_used)]

use std::os::unix::fs::PermissionsExt as _;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Output};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use fleetctl::application::ports::CommandRunner;
use fleetctl::domain::config::{DeploymentPaths, FleetConfig};
use fleetctl::domain::error::CommandError;
use fleetctl::domain::identity::OperatorIdentity;
use fleetctl::infra::identity;
use tempfile::TempDir;

// ── Output constructors ──────────────────────────────────────────────────────

/// The raw wait-status encodes the exit code in bits 8–15.
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    ExitStatus::from_raw(code << 8)
}

pub fn ok_output(stdout: &[u8]) -> Output {
    Output {
        status: exit_status(0),
        stdout: stdout.to_vec(),
        stderr: Vec::new(),
    }
}

pub fn err_output(code: i32, stderr: &[u8]) -> Output {
    Output {
        status: exit_status(code),
        stdout: Vec::new(),
        stderr: stderr.to_vec(),
    }
}

// ── Scripted engine ──────────────────────────────────────────────────────────

enum Reply {
    Output(Output),
    NotFound,
    TimedOut,
}

/// Answers engine calls by the longest matching argument prefix and records
/// every call as `"<args joined by space>"`. Unmatched calls exit 1.
#[derive(Default)]
pub struct ScriptedEngine {
    replies: Vec<(String, Reply)>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ok(mut self, prefix: &str, stdout: &str) -> Self {
        self.replies.push((prefix.to_string(), Reply::Output(ok_output(stdout.as_bytes()))));
        self
    }

    pub fn fail(mut self, prefix: &str, code: i32, stderr: &str) -> Self {
        self.replies
            .push((prefix.to_string(), Reply::Output(err_output(code, stderr.as_bytes()))));
        self
    }

    pub fn missing(mut self, prefix: &str) -> Self {
        self.replies.push((prefix.to_string(), Reply::NotFound));
        self
    }

    pub fn hang(mut self, prefix: &str) -> Self {
        self.replies.push((prefix.to_string(), Reply::TimedOut));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn called(&self, prefix: &str) -> bool {
        self.calls().iter().any(|c| c.starts_with(prefix))
    }
}

impl CommandRunner for ScriptedEngine {
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output> {
        self.run_with_timeout(program, args, Duration::from_secs(30)).await
    }

    async fn run_with_timeout(&self, program: &str, args: &[&str], timeout: Duration) -> Result<Output> {
        let line = args.join(" ");
        self.calls.lock().unwrap().push(line.clone());
        let reply = self
            .replies
            .iter()
            .filter(|(prefix, _)| line.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, r)| r);
        match reply {
            Some(Reply::Output(out)) => Ok(out.clone()),
            Some(Reply::NotFound) => Err(CommandError::ProgramNotFound(program.to_string()).into()),
            Some(Reply::TimedOut) => Err(CommandError::TimedOut {
                program: program.to_string(),
                secs: timeout.as_secs(),
            }
            .into()),
            None => Ok(err_output(1, b"")),
        }
    }
}

// ── Temp deployment ──────────────────────────────────────────────────────────

/// Stand-in for `age`: "encrypts" by prefixing a marker, "decrypts" by
/// checking and stripping it. Flags follow the real tool's shape.
const FAKE_AGE: &str = r#"#!/bin/sh
mode=enc
out=
in=
while [ $# -gt 0 ]; do
  case "$1" in
    -d) mode=dec ;;
    -r) shift ;;
    -i) shift; [ -f "$1" ] || { echo "age: identity $1 not found" >&2; exit 1; } ;;
    -o) shift; out="$1" ;;
    *) in="$1" ;;
  esac
  shift
done
if [ -n "$out" ]; then exec >"$out"; fi
if [ "$mode" = enc ]; then
  printf 'FAKE-AGE:'
  exec cat
fi
[ -n "$in" ] || in=/dev/stdin
if [ "$(head -c 9 "$in")" != "FAKE-AGE:" ]; then
  echo "age: failed to decrypt: no identity matched" >&2
  exit 1
fi
exec tail -c +10 "$in"
"#;

pub const PUBLIC_KEY: &str = "age1qyqszqgpqyqszqgpqyqszqgpqyqszqgpqyqszqgpqyqszqgpqyqs3290gq";

pub const CLAUDE_KEY: &str = "sk-ant-REDACTED";
pub const GROK_KEY: &str = "xai-bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

/// A complete layout under one temp dir: agent tree, operator home with a
/// 0600 key file, backup store, and a fake `age` on an absolute path.
pub struct Deployment {
    pub dir: TempDir,
    pub config: FleetConfig,
    pub paths: DeploymentPaths,
    pub operator: OperatorIdentity,
}

impl Deployment {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let home = dir.path().join("home");
        std::fs::create_dir_all(&home).unwrap();

        let bin = dir.path().join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        let age = bin.join("age");
        std::fs::write(&age, FAKE_AGE).unwrap();
        std::fs::set_permissions(&age, std::fs::Permissions::from_mode(0o755)).unwrap();

        let config = FleetConfig {
            ai_root: dir.path().join("ai"),
            age: age.display().to_string(),
            ..FleetConfig::default()
        };
        let mut operator = identity::current_process();
        operator.home = home;
        let paths = config.paths(&operator);

        let deployment = Self {
            dir,
            config,
            paths,
            operator,
        };
        deployment.write_key(0o600);
        deployment
    }

    pub fn write_key(&self, mode: u32) {
        let content = format!(
            "# created: 2026-10-01T10:00:00Z\n# public key: {PUBLIC_KEY}\nAGE-SECRET-KEY-1TESTTESTTEST\n"
        );
        std::fs::write(&self.paths.key_path, content).unwrap();
        set_mode(&self.paths.key_path, mode);
    }

    /// Populate the agent tree with history and a few files per agent.
    pub fn seed_tree(&self) {
        for agent in ["claude", "grok", "gemini"] {
            let history = self.paths.ai_root.join(agent).join("history");
            std::fs::create_dir_all(history.join("ctx-1")).unwrap();
            std::fs::write(
                history.join("ctx-1").join("metadata.json"),
                format!(r#"{{"name":"ctx-1","agent":"{agent}"}}"#),
            )
            .unwrap();
            let context = self.paths.ai_root.join(agent).join("context");
            std::fs::create_dir_all(&context).unwrap();
            std::fs::write(context.join("notes.md"), format!("# {agent}\n")).unwrap();
        }
    }

    /// Write an executable shell script into the fixture's `bin/`.
    pub fn script(&self, name: &str, body: &str) -> String {
        let path = self.dir.path().join("bin").join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.display().to_string()
    }

    pub fn with_tool(mut self, tool: &str, program: &str) -> Self {
        match tool {
            "age" => self.config.age = program.to_string(),
            "tar" => self.config.tar = program.to_string(),
            _ => panic!("unknown tool {tool}"),
        }
        self
    }

    pub fn backup_files(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.paths.backup_dir) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .flatten()
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

pub fn set_mode(path: &Path, mode: u32) {
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).unwrap();
}

pub fn mode(path: &Path) -> u32 {
    std::fs::metadata(path).unwrap().permissions().mode() & 0o777
}

pub fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

pub fn artifact_paths(dir: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .map(|e| e.flatten().map(|e| e.path()).collect())
        .unwrap_or_default();
    paths.retain(|p| p.to_string_lossy().ends_with(".tar.gz.age"));
    paths.sort();
    paths
}
