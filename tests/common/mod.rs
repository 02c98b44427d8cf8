//! Common test utilities and helpers for orgmirror tests
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Run git with a fixed identity, panicking on failure
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args([
            "-c",
            "user.name=Test",
            "-c",
            "user.email=test@test.com",
            "-c",
            "commit.gpgsign=false",
            "-c",
            "init.defaultBranch=main",
        ])
        .args(args)
        .current_dir(dir)
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .expect("Failed to execute git");

    assert!(
        output.status.success(),
        "git {:?} failed in {}: {}",
        args,
        dir.display(),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Create an upstream repository on `main` with one commit
pub fn init_source(dir: &Path) {
    fs::create_dir_all(dir).expect("Failed to create source dir");
    git(dir, &["init", "-q", "-b", "main"]);
    commit_file(dir, "README.md", "# Test\n", "Initial commit");
}

/// Write `name` with `content` and commit it
pub fn commit_file(repo: &Path, name: &str, content: &str, message: &str) -> String {
    fs::write(repo.join(name), content).expect("Failed to write file");
    git(repo, &["add", name]);
    git(repo, &["commit", "-q", "-m", message]);
    head(repo)
}

pub fn head(repo: &Path) -> String {
    git(repo, &["rev-parse", "HEAD"])
}

pub fn file_url(path: &Path) -> String {
    format!("file://{}", path.display())
}

/// Relative path and content of every file outside `.git`, sorted
pub fn snapshot(root: &Path) -> Vec<(PathBuf, Vec<u8>)> {
    let mut files = Vec::new();
    collect(root, root, &mut files);
    files.sort();
    files
}

fn collect(root: &Path, dir: &Path, files: &mut Vec<(PathBuf, Vec<u8>)>) {
    for entry in fs::read_dir(dir).expect("Failed to read dir") {
        let path = entry.expect("Failed to read entry").path();
        if path.file_name().is_some_and(|name| name == ".git") {
            continue;
        }
        if path.is_dir() {
            collect(root, &path, files);
        } else {
            let relative = path.strip_prefix(root).expect("inside root").to_path_buf();
            files.push((relative, fs::read(&path).expect("Failed to read file")));
        }
    }
}

/// Scratch area holding upstream repositories, the mirror tree and the log
pub struct TestEnvironment {
    pub temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn upstream(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join("upstream").join(name)
    }

    pub fn mirror(&self) -> PathBuf {
        self.temp_dir.path().join("mirror")
    }

    pub fn log_file(&self) -> PathBuf {
        self.temp_dir.path().join("logs").join("backup.log")
    }

    /// Create an upstream repository and return its clone URL
    pub fn create_source(&self, name: &str) -> String {
        let dir = self.upstream(name);
        init_source(&dir);
        file_url(&dir)
    }

    pub fn config_yaml(&self, api_url: &str, organizations: &[&str]) -> String {
        format!(
            r#"
github:
  token: "ghp_test"
  api_url: "{}"
  organizations: [{}]
backup:
  destination_path: "{}"
  log_file: "{}"
  timeout_secs: 60
"#,
            api_url,
            organizations.join(", "),
            self.mirror().display(),
            self.log_file().display()
        )
    }

    pub fn write_config(&self, content: &str) -> PathBuf {
        let path = self.temp_dir.path().join("config.yaml");
        fs::write(&path, content).expect("Failed to write test config");
        path
    }

    pub fn read_log(&self) -> String {
        fs::read_to_string(self.log_file()).unwrap_or_default()
    }
}

/// Assertion helpers for test validation
pub fn assert_contains_all(text: &str, expected: &[&str]) {
    for item in expected {
        assert!(
            text.contains(item),
            "Expected text to contain '{}', but it didn't. Text: {}",
            item,
            text
        );
    }
}
