//! Actions that can be dispatched by the user.

use super::{local_ref, StkContext};
use crate::{
    errors::{StkError, StkResult},
    git::RepositoryExt,
    stack::{self, Stack},
};
use nu_ansi_term::Color;
use tracing::{info, warn};

impl StkContext<'_> {
    /// Checks that the working tree is ready for mutation, and warns if the stack is not linear.
    pub fn check_cleanliness(&self, stack: &Stack) -> StkResult<()> {
        self.repository.ensure_ready_for_mutation()?;

        if self.needs_restack(stack)? {
            warn!(
                stack = %stack.name,
                "Stack needs a restack; run `stk stack restack` before pushing"
            );
        }
        Ok(())
    }

    /// Deletes every locally present child of `stack` that is merged into upstream.
    pub fn clean_merged(&self, stack: &Stack) -> StkResult<Vec<String>> {
        let merged = stack
            .children()
            .iter()
            .filter(|c| c.is_merged && c.local_exists)
            .map(|c| c.branch())
            .collect::<Vec<_>>();

        self.delete_branches(stack, &merged)?;
        Ok(merged)
    }

    /// Deletes every locally present child of `stack`, asking for confirmation unless `force`.
    ///
    /// ## Returns
    /// The deleted branches; empty if the user declined.
    pub fn delete_stack(&self, stack: &Stack, force: bool) -> StkResult<Vec<String>> {
        let children = stack
            .children()
            .iter()
            .filter(|c| c.local_exists)
            .map(|c| c.branch())
            .collect::<Vec<_>>();
        if children.is_empty() {
            return Ok(children);
        }

        if !force {
            let confirm = inquire::Confirm::new(
                format!(
                    "Delete {} child branches of stack `{}`?",
                    children.len(),
                    Color::Blue.paint(&stack.name)
                )
                .as_str(),
            )
            .with_default(false)
            .prompt()?;

            if !confirm {
                return Ok(Vec::new());
            }
        }

        self.delete_branches(stack, &children)?;
        Ok(children)
    }

    /// Deletes `branches`, first moving off of them if one is checked out.
    fn delete_branches(&self, stack: &Stack, branches: &[String]) -> StkResult<()> {
        let repo = self.repository;
        let current = repo.current_branch_name()?;
        if branches.contains(&current) {
            let refuge = if stack.has_tip {
                &stack.name
            } else {
                &self.upstream.branch
            };
            repo.checkout_branch(refuge)?;
        }

        for branch in branches {
            repo.delete_branch(branch)?;
            info!(branch, "Deleted branch");
        }
        Ok(())
    }

    /// Pushes a branch to the configured remote and sets it as the upstream of the local branch.
    pub fn push_branch(&self, branch: &str, force: bool) -> StkResult<()> {
        let mut args = vec!["push", "--quiet", "-u", self.config.remote.as_str(), branch];
        if force {
            args.insert(1, "--force-with-lease");
        }
        self.repository.git(&args)?;
        info!(branch, force, "Pushed branch");
        Ok(())
    }

    /// Pushes the unmerged children of `stack` up to and including `before`; without a cut-off,
    /// the tip is pushed as well.
    pub fn push_stack(
        &self,
        stack: &Stack,
        before: Option<u32>,
        force: bool,
    ) -> StkResult<Vec<String>> {
        let branches = stack
            .unmerged_children(before)
            .into_iter()
            .map(|c| c.branch())
            .chain((before.is_none() && stack.has_tip).then(|| stack.name.clone()))
            .collect::<Vec<_>>();

        for branch in branches.iter() {
            self.push_branch(branch, force)?;
        }
        Ok(branches)
    }

    /// Hard-resets every unmerged child to its remote counterpart, restoring the checkout after.
    pub fn reset_remote(&self, stack: &Stack) -> StkResult<Vec<String>> {
        let repo = self.repository;
        repo.ensure_ready_for_mutation()?;
        let original = repo.current_branch_name()?;

        let mut reset = Vec::new();
        for child in stack.unmerged_children(None) {
            let branch = child.branch();
            if !repo.remote_branch_exists(&self.config.remote, &branch) {
                warn!(branch, "No remote branch to reset to; skipping");
                continue;
            }

            repo.checkout_branch(&branch)?;
            let remote = format!("{}/{}", self.config.remote, branch);
            repo.git(&["reset", "--quiet", "--hard", &remote])?;
            info!(branch, remote, "Reset branch");
            reset.push(branch);
        }

        repo.checkout_branch(&original)?;
        Ok(reset)
    }

    /// Checks out the branch `count` positions away from the current one within its stack.
    ///
    /// ## Returns
    /// The name of the branch that is checked out afterwards.
    pub fn navigate_stack(&self, count: i64) -> StkResult<String> {
        let current = self.repository.current_branch_name()?;
        let stack = self.get_stack(stack::stack_name_of(&current))?;
        let branches = stack.unmerged_branches();
        let target = stack::navigate(&branches, &current, count)
            .ok_or(StkError::NotOnStack)?
            .to_string();

        if target != current {
            self.repository.checkout_branch(&target)?;
            info!(from = %current, to = %target, "Switched branch");
        }
        Ok(target)
    }

    /// Returns the commit graph of the stack, from its merge base with upstream to its top.
    pub fn stack_graph(&self, stack: &Stack) -> StkResult<String> {
        let top = if stack.has_tip {
            stack.name.clone()
        } else {
            stack
                .last_child()
                .filter(|c| c.local_exists)
                .map(|c| c.branch())
                .ok_or_else(|| StkError::StackNotFound(stack.name.clone()))?
        };

        let base = self
            .repository
            .merge_base_of(&local_ref(&top), &self.upstream.tracking)?;
        self.repository.git(&[
            "log",
            "--format=%h %d %s",
            &format!("{base}...{}", local_ref(&top)),
        ])
    }

    /// Fetches the remote, then rebases every local branch whose name starts with the upstream
    /// branch name onto its remote counterpart.
    ///
    /// ## Returns
    /// The rebased branches.
    pub fn sync_upstream(&self) -> StkResult<Vec<String>> {
        let repo = self.repository;
        repo.ensure_ready_for_mutation()?;
        repo.git(&["fetch", "--quiet", &self.config.remote])?;

        let mut rebased = Vec::new();
        for branch in repo.local_branch_names()? {
            if !branch.starts_with(&self.upstream.branch)
                || !repo.remote_branch_exists(&self.config.remote, &branch)
            {
                continue;
            }

            let remote = format!("{}/{}", self.config.remote, branch);
            repo.git(&["rebase", "--quiet", &remote, &branch])?;
            info!(branch, remote, "Rebased onto remote");
            rebased.push(branch);
        }
        Ok(rebased)
    }
}
