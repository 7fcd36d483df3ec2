//! Structural tests for architectural boundary enforcement.
//!
//! These scan source files to check that the layering holds: domain is pure,
//! services reach infrastructure only through ports, and infra never prints.

use std::path::{Path, PathBuf};

/// Collect all `.rs` files under a directory recursively.
fn collect_rs_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                files.extend(collect_rs_files(&path));
            } else if path.extension().and_then(|e| e.to_str()) == Some("rs") {
                files.push(path);
            }
        }
    }
    files
}

fn src(sub: &[&str]) -> PathBuf {
    sub.iter()
        .fold(Path::new(env!("CARGO_MANIFEST_DIR")).join("src"), |p, s| p.join(s))
}

fn rel(file: &Path) -> String {
    file.strip_prefix(env!("CARGO_MANIFEST_DIR"))
        .unwrap_or(file)
        .display()
        .to_string()
}

/// Track brace depth and report whether a line is inside a `#[cfg(test)]` block.
struct CfgTestTracker {
    in_test_block: bool,
    brace_depth: i32,
    test_block_start_depth: i32,
}

impl CfgTestTracker {
    fn new() -> Self {
        Self {
            in_test_block: false,
            brace_depth: 0,
            test_block_start_depth: 0,
        }
    }

    fn process_line(&mut self, line: &str) -> bool {
        if line.trim().contains("#[cfg(test)]") {
            self.in_test_block = true;
            self.test_block_start_depth = self.brace_depth;
        }
        for ch in line.chars() {
            match ch {
                '{' => self.brace_depth += 1,
                '}' => {
                    self.brace_depth -= 1;
                    if self.in_test_block && self.brace_depth <= self.test_block_start_depth {
                        self.in_test_block = false;
                    }
                }
                _ => {}
            }
        }
        self.in_test_block
    }
}

/// Non-test, non-comment lines of every file under `dir`, with locations.
fn production_lines(dir: &Path) -> Vec<(String, usize, String)> {
    let mut out = Vec::new();
    for file in collect_rs_files(dir) {
        let Ok(content) = std::fs::read_to_string(&file) else {
            continue;
        };
        let name = rel(&file);
        let mut tracker = CfgTestTracker::new();
        for (i, line) in content.lines().enumerate() {
            let in_test = tracker.process_line(line);
            let trimmed = line.trim();
            if in_test || trimmed.starts_with("//") {
                continue;
            }
            out.push((name.clone(), i + 1, line.to_string()));
        }
    }
    out
}

fn assert_no_matches(dir: &Path, forbidden: &[&str], what: &str) {
    let violations: Vec<String> = production_lines(dir)
        .into_iter()
        .filter(|(_, _, line)| forbidden.iter().any(|f| line.contains(f)))
        .map(|(file, n, line)| format!("{file}:{n}: {}", line.trim()))
        .collect();
    assert!(violations.is_empty(), "{what}:\n{}", violations.join("\n"));
}

#[test]
fn domain_is_free_of_io_and_outer_layers() {
    assert_no_matches(
        &src(&["domain"]),
        &[
            "crate::infra",
            "crate::application",
            "crate::commands",
            "crate::output",
            "tokio::",
            "std::fs",
            "std::process",
        ],
        "domain/ must stay pure",
    );
}

#[test]
fn application_does_not_import_infra_or_output() {
    assert_no_matches(
        &src(&["application"]),
        &["crate::infra", "crate::output", "crate::commands", "println!", "eprintln!"],
        "application/ must reach infra only through ports",
    );
}

#[test]
fn infra_has_no_imports_from_commands_or_output() {
    assert_no_matches(
        &src(&["infra"]),
        &["crate::commands", "crate::output"],
        "infra/ must not import from commands/ or output/",
    );
}

#[test]
fn infra_has_no_print_macros_outside_tests() {
    assert_no_matches(
        &src(&["infra"]),
        &["println!", "eprintln!"],
        "infra/ must not use println!/eprintln! outside #[cfg(test)]",
    );
}

#[test]
fn no_tokio_runner_construction_outside_infra_and_app() {
    let violations: Vec<String> = production_lines(&src(&[]))
        .into_iter()
        .filter(|(file, _, line)| {
            let f = file.replace('\\', "/");
            !f.contains("/infra/") && !f.ends_with("app.rs") && line.contains("Runner::new(")
                && line.contains("Tokio")
        })
        .map(|(file, n, line)| format!("{file}:{n}: {}", line.trim()))
        .collect();
    assert!(
        violations.is_empty(),
        "runners are built once in AppContext:\n{}",
        violations.join("\n")
    );
}

#[test]
fn services_use_trait_bounds_not_concrete_runners() {
    let violations: Vec<String> = production_lines(&src(&["application", "services"]))
        .into_iter()
        .filter(|(_, _, line)| line.contains("fn ") && line.contains("Tokio"))
        .map(|(file, n, line)| format!("{file}:{n}: {}", line.trim()))
        .collect();
    assert!(violations.is_empty(), "concrete runner in service signature:\n{}", violations.join("\n"));
}

/// Command handlers receive `&AppContext` rather than loose parameters.
#[test]
fn command_handlers_accept_app_context() {
    let mut violations = Vec::new();
    for file in collect_rs_files(&src(&["commands"])) {
        let Ok(content) = std::fs::read_to_string(&file) else {
            continue;
        };
        for (i, line) in content.lines().enumerate() {
            let t = line.trim_start();
            let is_handler = t.starts_with("pub async fn ") || t.starts_with("pub fn ");
            if is_handler && t.contains("Result<ExitCode>") && !t.contains("app: &AppContext") {
                violations.push(format!("{}:{}: {}", rel(&file), i + 1, t));
            }
        }
    }
    assert!(violations.is_empty(), "handlers must take app: &AppContext:\n{}", violations.join("\n"));
}
