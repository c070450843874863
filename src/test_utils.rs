//! Throwaway repositories for tests.

use crate::{
    config::StkConfig,
    ctx::{StkContext, Upstream},
};
use git2::{Oid, Repository};
use std::{path::Path, process::Command};
use tempfile::TempDir;

/// A temporary repository with a single commit on `main`.
pub(crate) struct TestRepo {
    dir: TempDir,
    pub(crate) repository: Repository,
}

impl TestRepo {
    pub(crate) fn new() -> Self {
        let dir = TempDir::new().unwrap();
        run_git(dir.path(), &["init", "--quiet"]);
        run_git(dir.path(), &["symbolic-ref", "HEAD", "refs/heads/main"]);
        run_git(dir.path(), &["config", "user.name", "Test User"]);
        run_git(dir.path(), &["config", "user.email", "test@example.com"]);
        run_git(dir.path(), &["config", "commit.gpgsign", "false"]);
        run_git(dir.path(), &["config", "advice.detachedHead", "false"]);
        run_git(dir.path(), &["commit", "--quiet", "--allow-empty", "-m", "Initial commit"]);

        let repository = Repository::open(dir.path()).unwrap();
        Self { dir, repository }
    }

    pub(crate) fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Runs `git` in the repository, panicking on failure.
    pub(crate) fn git(&self, args: &[&str]) -> String {
        run_git(self.path(), args)
    }

    /// Creates and checks out `branch` at `start`.
    pub(crate) fn branch_from(&self, branch: &str, start: &str) {
        self.git(&["checkout", "--quiet", "-b", branch, start]);
    }

    /// Commits a new file named after `message` on the current branch.
    pub(crate) fn commit_file(&self, message: &str) -> Oid {
        let file = message.replace(' ', "_").to_lowercase();
        std::fs::write(self.path().join(&file), message).unwrap();
        self.git(&["add", &file]);
        self.git(&["commit", "--quiet", "-m", message]);
        self.oid("HEAD")
    }

    /// Commits nothing on the current branch.
    pub(crate) fn commit_empty(&self, message: &str) -> Oid {
        self.git(&["commit", "--quiet", "--allow-empty", "-m", message]);
        self.oid("HEAD")
    }

    pub(crate) fn oid(&self, rev: &str) -> Oid {
        Oid::from_str(&self.git(&["rev-parse", rev])).unwrap()
    }

    pub(crate) fn message(&self, rev: &str) -> String {
        self.git(&["log", "-1", "--format=%B", rev])
    }

    /// Subjects of the commits in `base..tip`, oldest first.
    pub(crate) fn subjects(&self, base: &str, tip: &str) -> Vec<String> {
        let range = format!("{base}..{tip}");
        self.git(&["log", "--reverse", "--format=%s", &range])
            .lines()
            .map(ToOwned::to_owned)
            .collect()
    }

    /// Adds a bare repository as `origin` and pushes `main` to it.
    ///
    /// The returned directory must outlive the test.
    pub(crate) fn add_bare_remote(&self) -> TempDir {
        let remote = TempDir::new().unwrap();
        run_git(remote.path(), &["init", "--quiet", "--bare"]);
        self.git(&["remote", "add", "origin", remote.path().to_str().unwrap()]);
        self.git(&["push", "--quiet", "-u", "origin", "main"]);
        remote
    }

    /// A context that treats the local `main` branch as upstream.
    pub(crate) fn ctx(&self) -> StkContext<'_> {
        StkContext::new(
            &self.repository,
            StkConfig::default(),
            Upstream::new("main", "main"),
        )
    }
}

fn run_git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {} failed: {}",
        args.join(" "),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}
