//! Utilities for interacting with `git` repositories for the `stk` application.
//!
//! Reads and commit-message rewrites go through [git2]. Anything that touches the working tree
//! (checkout, rebase, reset) or the network (push, fetch) shells out to the `git` CLI, so that
//! conflicts leave the repository in git's native mid-rebase state.

use crate::{
    constants::FALLBACK_UPSTREAM,
    errors::{StkError, StkResult},
};
use git2::{
    BranchType, Commit, Oid, Repository, RepositoryState, Signature, Sort, StatusOptions,
};
use std::{env, process::Command};
use tracing::{debug, trace};

/// Returns the repository for the current working directory, and [None] if
/// the current working directory is not within a git repository or an error
/// occurs.
pub fn active_repository() -> Option<Repository> {
    Repository::discover(env::current_dir().ok()?).ok()
}

/// Returns the [Signature] for the committer, as configured for `repository`.
pub fn committer_signature(repository: &Repository) -> StkResult<Signature<'static>> {
    repository.signature().map_err(Into::into)
}

/// Extension trait for the [Repository] type to expose helper functions related to
/// stack management.
pub trait RepositoryExt {
    /// Runs the `git` CLI inside the work tree.
    ///
    /// ## Returns
    /// - `Ok(String)` - The trimmed stdout of the command.
    /// - `Err(StkError::GitCommand)` - The command failed; the error carries its output.
    fn git(&self, args: &[&str]) -> StkResult<String>;

    /// Returns the name of the current branch.
    fn current_branch_name(&self) -> StkResult<String>;

    /// Returns the names of all local branches.
    fn local_branch_names(&self) -> StkResult<Vec<String>>;

    /// Returns `true` if the local branch exists.
    fn branch_exists(&self, branch_name: &str) -> bool;

    /// Returns `true` if `refs/remotes/<remote>/<branch_name>` exists.
    fn remote_branch_exists(&self, remote: &str, branch_name: &str) -> bool;

    /// Resolves a revision to the [Oid] of the commit it points at.
    fn resolve_commit(&self, rev: &str) -> StkResult<Oid>;

    /// Returns `true` if `descendant` equals `ancestor` or has it in its history.
    fn is_descendant(&self, descendant: Oid, ancestor: Oid) -> StkResult<bool>;

    /// Returns the merge base of two revisions.
    fn merge_base_of(&self, a: &str, b: &str) -> StkResult<Oid>;

    /// Returns the commits reachable from `tip` but not from `base`, oldest first.
    fn commits_between(&self, base: Oid, tip: Oid) -> StkResult<Vec<Oid>>;

    /// Returns the summary line of the commit a revision points at.
    fn commit_summary(&self, rev: &str) -> StkResult<String>;

    /// Returns `true` if there are no staged, unstaged or untracked changes.
    fn is_working_tree_clean(&self) -> StkResult<bool>;

    /// Fails unless the repository is idle and the working tree is clean.
    fn ensure_ready_for_mutation(&self) -> StkResult<()>;

    /// Rewrites the messages of the commits in `base..tip`.
    ///
    /// `reword` is called with each commit's position and the commit itself, oldest first, and
    /// returns the new message or [None] to keep it. Commits after the first rewritten one are
    /// re-parented with unchanged trees, so only messages and hashes change.
    ///
    /// ## Returns
    /// The ids of the resulting commits, oldest first. No refs are moved.
    fn rewrite_messages<F>(&self, base: Oid, tip: Oid, reword: F) -> StkResult<Vec<Oid>>
    where
        F: FnMut(usize, &Commit<'_>) -> Option<String>;

    /// Points the local branch at `oid`, creating it if needed.
    fn set_branch_target(&self, branch_name: &str, oid: Oid) -> StkResult<()>;

    /// Checks out a branch with the given `branch_name`.
    fn checkout_branch(&self, branch_name: &str) -> StkResult<()>;

    /// Replays the commits of `branch_name` after `upstream` on top of `onto`.
    ///
    /// A conflict leaves the repository mid-rebase for the user to resolve.
    fn rebase_onto(&self, onto: &str, upstream: Oid, branch_name: &str) -> StkResult<()>;

    /// Deletes a local branch.
    fn delete_branch(&self, branch_name: &str) -> StkResult<()>;

    /// Returns the remote's default branch, read from `refs/remotes/<remote>/HEAD`.
    fn default_upstream(&self, remote: &str) -> String;
}

impl RepositoryExt for Repository {
    fn git(&self, args: &[&str]) -> StkResult<String> {
        let workdir = self
            .workdir()
            .ok_or_else(|| git2::Error::from_str("bare repositories are not supported"))?;

        debug!(args = ?args, "Running git");
        let output = Command::new("git")
            .args(args)
            .current_dir(workdir)
            .output()?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(StkError::GitCommand {
                command: args.join(" "),
                output: format!("{}\n{}", stdout.trim(), stderr.trim())
                    .trim()
                    .to_string(),
            });
        }

        trace!(stdout = %stdout.trim(), "git output");
        Ok(stdout.trim().to_string())
    }

    fn current_branch_name(&self) -> StkResult<String> {
        let head = self.head()?;
        if !head.is_branch() {
            return Err(StkError::DetachedHead);
        }
        head.shorthand()
            .map(ToOwned::to_owned)
            .ok_or(StkError::DetachedHead)
    }

    fn local_branch_names(&self) -> StkResult<Vec<String>> {
        self.branches(Some(BranchType::Local))?
            .map(|b| -> StkResult<String> {
                let (branch, _) = b?;
                branch
                    .name()?
                    .map(ToOwned::to_owned)
                    .ok_or_else(|| git2::Error::from_str("Branch name is not valid UTF-8").into())
            })
            .collect()
    }

    fn branch_exists(&self, branch_name: &str) -> bool {
        self.find_branch(branch_name, BranchType::Local).is_ok()
    }

    fn remote_branch_exists(&self, remote: &str, branch_name: &str) -> bool {
        self.find_reference(&format!("refs/remotes/{remote}/{branch_name}"))
            .is_ok()
    }

    fn resolve_commit(&self, rev: &str) -> StkResult<Oid> {
        Ok(self.revparse_single(rev)?.peel_to_commit()?.id())
    }

    fn is_descendant(&self, descendant: Oid, ancestor: Oid) -> StkResult<bool> {
        Ok(descendant == ancestor || self.graph_descendant_of(descendant, ancestor)?)
    }

    fn merge_base_of(&self, a: &str, b: &str) -> StkResult<Oid> {
        let a = self.resolve_commit(a)?;
        let b = self.resolve_commit(b)?;
        Ok(self.merge_base(a, b)?)
    }

    fn commits_between(&self, base: Oid, tip: Oid) -> StkResult<Vec<Oid>> {
        let mut walk = self.revwalk()?;
        walk.set_sorting(Sort::TOPOLOGICAL | Sort::REVERSE)?;
        walk.push(tip)?;
        walk.hide(base)?;
        walk.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    fn commit_summary(&self, rev: &str) -> StkResult<String> {
        let commit = self.find_commit(self.resolve_commit(rev)?)?;
        Ok(commit.summary().unwrap_or_default().to_string())
    }

    fn is_working_tree_clean(&self) -> StkResult<bool> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(true).include_ignored(false);
        Ok(self.statuses(Some(&mut opts))?.is_empty())
    }

    fn ensure_ready_for_mutation(&self) -> StkResult<()> {
        if self.state() != RepositoryState::Clean {
            return Err(StkError::RebaseInProgress);
        }
        if !self.is_working_tree_clean()? {
            return Err(StkError::WorkingTreeDirty);
        }
        Ok(())
    }

    fn rewrite_messages<F>(&self, base: Oid, tip: Oid, mut reword: F) -> StkResult<Vec<Oid>>
    where
        F: FnMut(usize, &Commit<'_>) -> Option<String>,
    {
        let committer = committer_signature(self)?;
        let mut parent = base;
        let mut rewritten = false;
        let mut result = Vec::new();

        for (i, oid) in self.commits_between(base, tip)?.into_iter().enumerate() {
            let commit = self.find_commit(oid)?;
            let message = reword(i, &commit);

            if message.is_none() && !rewritten {
                parent = oid;
                result.push(oid);
                continue;
            }
            if commit.parent_count() != 1 {
                return Err(git2::Error::from_str(&format!(
                    "Cannot rewrite merge commit {oid}; stacks must be linear."
                ))
                .into());
            }

            let message = message
                .unwrap_or_else(|| String::from_utf8_lossy(commit.message_bytes()).into_owned());
            let new_oid = self.commit(
                None,
                &commit.author(),
                &committer,
                &message,
                &commit.tree()?,
                &[&self.find_commit(parent)?],
            )?;
            trace!(old = %oid, new = %new_oid, "Rewrote commit");

            rewritten = true;
            parent = new_oid;
            result.push(new_oid);
        }

        Ok(result)
    }

    fn set_branch_target(&self, branch_name: &str, oid: Oid) -> StkResult<()> {
        debug!(branch = branch_name, target = %oid, "Moving branch");
        self.reference(
            &format!("refs/heads/{branch_name}"),
            oid,
            true,
            &format!("stk: move {branch_name}"),
        )?;
        Ok(())
    }

    fn checkout_branch(&self, branch_name: &str) -> StkResult<()> {
        self.git(&["checkout", "--quiet", branch_name]).map(|_| ())
    }

    fn rebase_onto(&self, onto: &str, upstream: Oid, branch_name: &str) -> StkResult<()> {
        debug!(branch = branch_name, onto, upstream = %upstream, "Rebasing");
        let upstream = upstream.to_string();
        self.git(&["rebase", "--onto", onto, &upstream, branch_name])
            .map(|_| ())
            .map_err(|e| match e {
                StkError::GitCommand { command, output } => StkError::GitCommand {
                    command,
                    output: format!(
                        "{output}\nRebase stopped. Resolve the conflicts with `git rebase --continue` \
                         or `git rebase --abort`, then run the command again."
                    ),
                },
                e => e,
            })
    }

    fn delete_branch(&self, branch_name: &str) -> StkResult<()> {
        debug!(branch = branch_name, "Deleting branch");
        self.find_branch(branch_name, BranchType::Local)?.delete()?;
        Ok(())
    }

    fn default_upstream(&self, remote: &str) -> String {
        let prefix = format!("refs/remotes/{remote}/");
        self.find_reference(&format!("{prefix}HEAD"))
            .ok()
            .and_then(|r| r.symbolic_target().map(ToOwned::to_owned))
            .and_then(|target| target.strip_prefix(&prefix).map(ToOwned::to_owned))
            .unwrap_or_else(|| FALLBACK_UPSTREAM.to_string())
    }
}
