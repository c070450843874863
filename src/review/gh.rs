//! [ReviewService] backed by the GitHub CLI, `gh`.

use super::{NewPullRequest, PullRequest, RawPullRequest, ReviewService};
use crate::{
    constants::GH_PR_FIELDS,
    errors::{StkError, StkResult},
};
use async_trait::async_trait;
use std::{io::ErrorKind, path::PathBuf};
use tokio::process::Command;
use tracing::{debug, trace};

/// Talks to GitHub by shelling out to `gh` inside the repository's work tree.
#[derive(Debug, Clone)]
pub struct GhCli {
    workdir: PathBuf,
}

impl GhCli {
    /// Creates a [GhCli] that runs `gh` in `workdir`.
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    /// Runs `gh` with the given arguments and returns its trimmed stdout.
    async fn run(&self, args: &[&str]) -> StkResult<String> {
        debug!(args = ?args, "Running gh");
        let output = Command::new("gh")
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => StkError::RemoteService("missing `gh` executable".into()),
                _ => StkError::RemoteService(e.to_string()),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(StkError::RemoteService(format!(
                "`gh {}` failed: {}",
                args.join(" "),
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        trace!(%stdout, "gh output");
        Ok(stdout)
    }
}

#[async_trait]
impl ReviewService for GhCli {
    async fn auth_status(&self) -> StkResult<()> {
        self.run(&["auth", "status"]).await.map(|_| ())
    }

    async fn find_by_branch(&self, branch: &str) -> StkResult<Option<PullRequest>> {
        let json = self
            .run(&[
                "pr", "list", "--head", branch, "--state", "all", "--limit", "1", "--json",
                GH_PR_FIELDS,
            ])
            .await?;
        let prs = serde_json::from_str::<Vec<RawPullRequest>>(&json)
            .map_err(|e| StkError::MalformedPullRequest(e.to_string()))?;

        prs.into_iter().next().map(PullRequest::try_from).transpose()
    }

    async fn view(&self, number: u64) -> StkResult<PullRequest> {
        let json = self
            .run(&["pr", "view", &number.to_string(), "--json", GH_PR_FIELDS])
            .await?;
        PullRequest::from_json(&json)
    }

    async fn create(&self, pr: &NewPullRequest) -> StkResult<PullRequest> {
        let mut args = vec![
            "pr", "create", "--head", &pr.head, "--base", &pr.base, "--title", &pr.title,
            "--body", &pr.body,
        ];
        if pr.draft {
            args.push("--draft");
        }
        self.run(&args).await?;

        let json = self
            .run(&["pr", "view", &pr.head, "--json", GH_PR_FIELDS])
            .await?;
        PullRequest::from_json(&json)
    }

    async fn edit_title(&self, number: u64, title: &str) -> StkResult<()> {
        self.run(&["pr", "edit", &number.to_string(), "--title", title])
            .await
            .map(|_| ())
    }

    async fn edit_body(&self, number: u64, body: &str) -> StkResult<()> {
        self.run(&["pr", "edit", &number.to_string(), "--body", body])
            .await
            .map(|_| ())
    }

    async fn set_draft(&self, number: u64, is_draft: bool) -> StkResult<()> {
        let number = number.to_string();
        let mut args = vec!["pr", "ready", number.as_str()];
        if is_draft {
            args.push("--undo");
        }
        self.run(&args).await.map(|_| ())
    }
}
