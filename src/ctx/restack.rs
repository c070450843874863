//! Splitting stacks into children and keeping the children linear.

use super::{local_ref, StkContext};
use crate::{
    errors::{StkError, StkResult},
    git::RepositoryExt,
    review::Change,
    stack::{Child, Stack},
    trailer::with_branch_trailer,
};
use git2::Oid;
use itertools::Itertools;
use std::collections::HashMap;
use tracing::{debug, info, warn};

impl StkContext<'_> {
    /// Returns the commit a local branch points at.
    pub fn branch_oid(&self, branch: &str) -> StkResult<Oid> {
        self.repository.resolve_commit(&local_ref(branch))
    }

    /// Finds the commit `branch` was started from, relative to `target`.
    ///
    /// Walks the commits between the merge base of `target` and `branch` and the tip of `branch`,
    /// oldest first, and stops at the first one tagged for `branch`.
    ///
    /// ## Returns
    /// - `Ok(oid)` - The parent of the first commit of `branch`.
    /// - `Err(StkError::BoundaryNotFound)` - No commit in range carries the branch's trailer.
    pub fn find_branch_parent(&mut self, target: &str, branch: &str) -> StkResult<Oid> {
        let repo = self.repository;
        let base = repo.merge_base_of(target, &local_ref(branch))?;
        let tip = self.branch_oid(branch)?;

        for oid in repo.commits_between(base, tip)? {
            let commit = repo.find_commit(oid)?;
            if self.trailers.trailer(&commit) == Some(branch) {
                let parent = commit.parent_id(0)?;
                debug!(branch, target, %parent, "Found branch boundary");
                return Ok(parent);
            }
        }

        Err(StkError::BoundaryNotFound(branch.to_string()))
    }

    /// Tags the first commit of `base..branch` with the trailer for `branch`.
    ///
    /// Nothing is rewritten if any commit in the range already carries the trailer, or if the
    /// range is empty. Otherwise every commit of the range gets a new id and the branch is moved.
    pub fn tag_branch(&mut self, base: Oid, branch: &str) -> StkResult<Change> {
        let repo = self.repository;
        let tip = self.branch_oid(branch)?;
        let commits = repo.commits_between(base, tip)?;

        for oid in commits.iter() {
            if self.trailers.trailer(&repo.find_commit(*oid)?) == Some(branch) {
                return Ok(Change::Unchanged);
            }
        }
        if commits.is_empty() {
            return Ok(Change::Unchanged);
        }

        let rewritten = repo.rewrite_messages(base, tip, |i, commit| {
            let message = String::from_utf8_lossy(commit.message_bytes());
            (i == 0)
                .then(|| with_branch_trailer(&message, branch))
                .flatten()
        })?;
        if let Some(new_tip) = rewritten.last() {
            self.move_branch(branch, *new_tip)?;
        }

        info!(branch, "Tagged first commit of branch");
        Ok(Change::Changed)
    }

    /// Returns `true` if some unmerged child (or the tip) does not build on its predecessor.
    pub fn needs_restack(&self, stack: &Stack) -> StkResult<bool> {
        let oids = stack
            .unmerged_branches()
            .iter()
            .map(|branch| self.branch_oid(branch))
            .collect::<StkResult<Vec<_>>>()?;

        for (prev, next) in oids.into_iter().tuple_windows() {
            if !self.repository.is_descendant(next, prev)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Returns `true` if the tip carries commits that no child holds yet.
    pub fn is_incomplete(&self, stack: &Stack) -> StkResult<bool> {
        if !stack.has_tip {
            return Ok(false);
        }
        let Some(last) = stack.unmerged_children(None).last().map(|c| c.branch()) else {
            return Ok(false);
        };

        Ok(self.branch_oid(&stack.name)? != self.branch_oid(&last)?)
    }

    /// Returns the commit that new children are split off from: the last unmerged child, or the
    /// merge base of the tip and upstream once every child is merged.
    pub fn get_next_base(&self, stack: &Stack) -> StkResult<Oid> {
        match stack.unmerged_children(None).last() {
            Some(child) => self.branch_oid(&child.branch()),
            None => self
                .repository
                .merge_base_of(&local_ref(&stack.name), &self.upstream.tracking),
        }
    }

    /// Turns every commit of the tip that no child holds yet into a new child.
    ///
    /// The stack is restacked first. Commit `k` of the range gets the trailer for child `k`, the
    /// children are created at the rewritten commits and the tip is moved to the last of them.
    ///
    /// ## Returns
    /// The names of the created branches, in stack order.
    pub fn create_children(&mut self, stack: &mut Stack) -> StkResult<Vec<String>> {
        let repo = self.repository;
        repo.ensure_ready_for_mutation()?;
        if !stack.has_tip {
            return Err(StkError::StackNotFound(stack.name.clone()));
        }

        if self.needs_restack(stack)? {
            self.restack(stack, None)?;
        }

        let base = self.get_next_base(stack)?;
        let tip = self.branch_oid(&stack.name)?;
        let first = stack.create_next_child().index;
        let names = (0..repo.commits_between(base, tip)?.len() as u32)
            .map(|i| Child::new(stack.name.as_str(), first + i, false).branch())
            .collect::<Vec<_>>();

        if names.is_empty() {
            info!(stack = %stack.name, "No unsplit commits");
            return Ok(names);
        }

        let rewritten = repo.rewrite_messages(base, tip, |i, commit| {
            let message = String::from_utf8_lossy(commit.message_bytes());
            names
                .get(i)
                .and_then(|name| with_branch_trailer(&message, name))
        })?;

        for (i, oid) in rewritten.iter().enumerate() {
            let child = Child::new(stack.name.as_str(), first + i as u32, false);
            repo.set_branch_target(&child.branch(), *oid)?;
            stack.add_child(child);
        }
        if let Some(last) = rewritten.last() {
            self.move_branch(&stack.name, *last)?;
        }

        info!(stack = %stack.name, created = ?names, "Created children");
        Ok(names)
    }

    /// Rebuilds the stack so that every unmerged child builds on the one before it.
    ///
    /// With a `target`, the first unmerged child is first moved onto it. Branch boundaries are
    /// located through commit trailers, so the command can be re-run after resolving a conflict.
    /// The originally checked out branch is restored afterwards.
    pub fn restack(&mut self, stack: &Stack, target: Option<&str>) -> StkResult<()> {
        let repo = self.repository;
        repo.ensure_ready_for_mutation()?;
        let original = repo.current_branch_name()?;

        let children = stack
            .unmerged_children(None)
            .into_iter()
            .map(Child::branch)
            .collect::<Vec<_>>();
        let mut old_tips = HashMap::new();
        for branch in children.iter().chain(stack.has_tip.then_some(&stack.name)) {
            old_tips.insert(branch.clone(), self.branch_oid(branch)?);
        }

        info!(stack = %stack.name, children = children.len(), target, "Restacking");
        self.tag_known_boundaries(stack, &children)?;

        if let Some(target) = target {
            self.rebase_root(stack, &children, target)?;
        }

        for (i, branch) in children.iter().enumerate() {
            let base = match i {
                0 => self.root_base(stack, branch, target)?,
                _ => self.branch_oid(&children[i - 1])?,
            };
            self.tag_branch(base, branch)?;

            let Some(next) = children.get(i + 1) else {
                continue;
            };
            if !repo.is_descendant(self.branch_oid(next)?, self.branch_oid(branch)?)? {
                let parent = self.find_branch_parent(branch, next)?;
                repo.rebase_onto(branch, parent, next)?;
            }
        }

        if let (true, Some(last)) = (stack.has_tip, children.last()) {
            self.restack_tip(stack, last, &old_tips)?;
        }

        if repo.current_branch_name().ok().as_deref() != Some(original.as_str())
            && repo.branch_exists(&original)
        {
            repo.checkout_branch(&original)?;
        }

        debug!(lookups = self.trailers.len(), "Restack complete");
        Ok(())
    }

    /// Tags every child whose boundary is still known from the graph, last child first, so
    /// that tagging one child never hides the boundary of the next.
    fn tag_known_boundaries(&mut self, stack: &Stack, children: &[String]) -> StkResult<()> {
        for (i, branch) in children.iter().enumerate().rev() {
            let base = if i == 0 {
                self.root_base(stack, branch, None)?
            } else {
                let prev = self.branch_oid(&children[i - 1])?;
                if !self.repository.is_descendant(self.branch_oid(branch)?, prev)? {
                    continue;
                }
                prev
            };
            self.tag_branch(base, branch)?;
        }
        Ok(())
    }

    /// Returns the commit the first unmerged child starts after.
    fn root_base(&self, stack: &Stack, first: &str, target: Option<&str>) -> StkResult<Oid> {
        let repo = self.repository;
        let first_oid = self.branch_oid(first)?;
        let mut base = repo.merge_base_of(target.unwrap_or(&self.upstream.tracking), first)?;

        for child in stack.children().iter().filter(|c| c.is_merged && c.local_exists) {
            let oid = self.branch_oid(&child.branch())?;
            if repo.is_descendant(first_oid, oid)? && repo.is_descendant(oid, base)? {
                base = oid;
            }
        }
        Ok(base)
    }

    /// Moves the bottom of the stack onto `target`.
    fn rebase_root(&mut self, stack: &Stack, children: &[String], target: &str) -> StkResult<()> {
        let repo = self.repository;
        let target_oid = repo.resolve_commit(target)?;
        let tracking = self.upstream.tracking.clone();

        match children.first() {
            Some(first) => {
                if !repo.is_descendant(self.branch_oid(first)?, target_oid)? {
                    let parent = self.find_branch_parent(&tracking, first)?;
                    repo.rebase_onto(target, parent, first)?;
                }
            }
            None if stack.has_tip && stack.name != self.upstream.branch => {
                if !repo.is_descendant(self.branch_oid(&stack.name)?, target_oid)? {
                    let base = repo.merge_base_of(&tracking, &local_ref(&stack.name))?;
                    repo.rebase_onto(target, base, &stack.name)?;
                }
            }
            None => {}
        }
        Ok(())
    }

    /// Puts the tip back on top of the last child.
    fn restack_tip(
        &mut self,
        stack: &Stack,
        last: &str,
        old_tips: &HashMap<String, Oid>,
    ) -> StkResult<()> {
        let repo = self.repository;
        let tip = self.branch_oid(&stack.name)?;
        let last_oid = self.branch_oid(last)?;
        let (Some(&old_tip), Some(&old_last)) = (old_tips.get(&stack.name), old_tips.get(last))
        else {
            return Ok(());
        };

        if old_tip == old_last {
            if tip != last_oid {
                self.move_branch(&stack.name, last_oid)?;
            }
        } else if !repo.is_descendant(tip, last_oid)? {
            if repo.is_descendant(tip, old_last)? {
                repo.rebase_onto(last, old_last, &stack.name)?;
            } else {
                warn!(
                    tip = %stack.name,
                    last,
                    "Tip does not build on the last child; replaying all of its commits"
                );
                repo.git(&["rebase", last, &stack.name])?;
            }
        }
        Ok(())
    }

    /// Points `branch` at `oid`, keeping the work tree in sync if it is checked out.
    fn move_branch(&self, branch: &str, oid: Oid) -> StkResult<()> {
        let repo = self.repository;
        if repo.current_branch_name().ok().as_deref() == Some(branch) {
            repo.git(&["checkout", "--quiet", "-B", branch, &oid.to_string()])?;
            Ok(())
        } else {
            repo.set_branch_target(branch, oid)
        }
    }
}

#[cfg(test)]
mod test {
    use crate::{errors::StkError, git::RepositoryExt, test_utils::TestRepo};

    /// `feat` with one commit per message, split into children.
    fn split_stack(repo: &TestRepo, messages: &[&str]) {
        repo.branch_from("feat", "main");
        for message in messages {
            repo.commit_file(message);
        }
        let mut ctx = repo.ctx();
        let mut stack = ctx.get_stack("feat").unwrap();
        ctx.create_children(&mut stack).unwrap();
    }

    #[test]
    fn create_splits_one_commit_per_child() {
        let repo = TestRepo::new();
        repo.branch_from("feat", "main");
        repo.commit_empty("a");
        repo.commit_empty("b");
        repo.commit_empty("c");

        let mut ctx = repo.ctx();
        let mut stack = ctx.get_stack("feat").unwrap();
        let created = ctx.create_children(&mut stack).unwrap();
        assert_eq!(created, ["feat-1", "feat-2", "feat-3"]);
        assert_eq!(stack.len(), 3);

        assert_eq!(repo.subjects("main", "feat-1"), ["a"]);
        assert_eq!(repo.subjects("feat-1", "feat-2"), ["b"]);
        assert_eq!(repo.subjects("feat-2", "feat-3"), ["c"]);
        assert_eq!(repo.oid("feat"), repo.oid("feat-3"));
        assert_eq!(repo.message("feat-2"), "b\n\nbranch: feat-2");
        assert_eq!(repo.repository.current_branch_name().unwrap(), "feat");

        let stack = ctx.get_stack("feat").unwrap();
        assert!(!ctx.needs_restack(&stack).unwrap());
        assert!(!ctx.is_incomplete(&stack).unwrap());
        assert_eq!(
            ctx.find_branch_parent("main", "feat-2").unwrap(),
            repo.oid("feat-1")
        );
    }

    #[test]
    fn create_without_new_commits_is_a_no_op() {
        let repo = TestRepo::new();
        split_stack(&repo, &["a"]);

        let mut ctx = repo.ctx();
        let mut stack = ctx.get_stack("feat").unwrap();
        assert!(ctx.create_children(&mut stack).unwrap().is_empty());
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn new_tip_commits_make_stack_incomplete() {
        let repo = TestRepo::new();
        split_stack(&repo, &["a"]);
        repo.commit_file("c");

        let mut ctx = repo.ctx();
        let mut stack = ctx.get_stack("feat").unwrap();
        assert!(ctx.is_incomplete(&stack).unwrap());
        assert!(!ctx.needs_restack(&stack).unwrap());

        assert_eq!(ctx.create_children(&mut stack).unwrap(), ["feat-2"]);
        assert_eq!(repo.subjects("feat-1", "feat-2"), ["c"]);

        let stack = ctx.get_stack("feat").unwrap();
        assert!(!ctx.is_incomplete(&stack).unwrap());
    }

    #[test]
    fn restack_onto_advanced_upstream() {
        let repo = TestRepo::new();
        split_stack(&repo, &["a", "b"]);
        repo.git(&["checkout", "--quiet", "main"]);
        repo.commit_file("upstream");
        repo.git(&["checkout", "--quiet", "feat"]);

        let mut ctx = repo.ctx();
        let stack = ctx.get_stack("feat").unwrap();
        ctx.restack(&stack, Some("main")).unwrap();

        assert_eq!(repo.git(&["merge-base", "feat-1", "main"]), repo.oid("main").to_string());
        assert_eq!(repo.subjects("main", "feat-1"), ["a"]);
        assert_eq!(repo.subjects("feat-1", "feat-2"), ["b"]);
        assert_eq!(repo.oid("feat"), repo.oid("feat-2"));
        assert_eq!(repo.repository.current_branch_name().unwrap(), "feat");

        let stack = ctx.get_stack("feat").unwrap();
        assert!(!ctx.needs_restack(&stack).unwrap());
    }

    #[test]
    fn restack_relinks_after_lower_child_changes() {
        let repo = TestRepo::new();
        split_stack(&repo, &["a", "b"]);
        repo.git(&["checkout", "--quiet", "feat-1"]);
        repo.commit_file("fixup");

        let mut ctx = repo.ctx();
        let stack = ctx.get_stack("feat").unwrap();
        assert!(ctx.needs_restack(&stack).unwrap());

        ctx.restack(&stack, None).unwrap();
        assert_eq!(repo.subjects("feat-1", "feat-2"), ["b"]);
        assert_eq!(repo.subjects("main", "feat"), ["a", "fixup", "b"]);
        assert_eq!(repo.repository.current_branch_name().unwrap(), "feat-1");

        let stack = ctx.get_stack("feat").unwrap();
        assert!(!ctx.needs_restack(&stack).unwrap());
    }

    #[test]
    fn restack_tags_hand_made_children() {
        let repo = TestRepo::new();
        repo.branch_from("feat", "main");
        repo.commit_file("a");
        repo.git(&["branch", "feat-1"]);
        repo.commit_file("b");
        repo.git(&["branch", "feat-2"]);

        let mut ctx = repo.ctx();
        let stack = ctx.get_stack("feat").unwrap();
        ctx.restack(&stack, None).unwrap();

        assert_eq!(repo.message("feat-1"), "a\n\nbranch: feat-1");
        assert_eq!(repo.message("feat-2"), "b\n\nbranch: feat-2");
        assert_eq!(repo.subjects("feat-1", "feat-2"), ["b"]);
        assert_eq!(repo.oid("feat"), repo.oid("feat-2"));
        assert_eq!(repo.repository.current_branch_name().unwrap(), "feat");
    }

    #[test]
    fn untagged_diverged_child_has_no_boundary() {
        let repo = TestRepo::new();
        repo.branch_from("feat", "main");
        repo.commit_file("a");
        repo.git(&["branch", "feat-1"]);
        repo.commit_file("b");
        repo.git(&["branch", "feat-2"]);
        repo.git(&["checkout", "--quiet", "feat-1"]);
        repo.commit_file("fixup");

        let mut ctx = repo.ctx();
        let stack = ctx.get_stack("feat").unwrap();
        let err = ctx.restack(&stack, None).unwrap_err();
        assert!(matches!(err, StkError::BoundaryNotFound(branch) if branch == "feat-2"));
    }

    #[test]
    fn merged_children_are_skipped() {
        let repo = TestRepo::new();
        split_stack(&repo, &["a", "b"]);
        repo.git(&["branch", "-f", "main", "feat-1"]);
        let before = repo.oid("feat-2");

        let mut ctx = repo.ctx();
        let stack = ctx.get_stack("feat").unwrap();
        assert!(stack.child("feat-1").unwrap().is_merged);
        assert!(!ctx.needs_restack(&stack).unwrap());
        assert!(!ctx.is_incomplete(&stack).unwrap());

        ctx.restack(&stack, Some("main")).unwrap();
        assert_eq!(repo.oid("feat-2"), before);
        assert_eq!(repo.oid("feat"), before);
    }

    #[test]
    fn create_after_merged_child_skips_upstream_commits() {
        let repo = TestRepo::new();
        split_stack(&repo, &["a"]);
        repo.git(&["checkout", "--quiet", "main"]);
        repo.git(&["merge", "--quiet", "--ff-only", "feat-1"]);
        repo.commit_file("upstream work");
        repo.git(&["checkout", "--quiet", "feat"]);
        repo.commit_file("b");

        let mut ctx = repo.ctx();
        let stack = ctx.get_stack("feat").unwrap();
        ctx.restack(&stack, Some("main")).unwrap();

        let mut stack = ctx.get_stack("feat").unwrap();
        assert_eq!(ctx.create_children(&mut stack).unwrap(), ["feat-2"]);
        assert_eq!(repo.subjects("main", "feat-2"), ["b"]);
        assert!(!repo.message("main").contains("branch: feat-2"));
        assert_eq!(repo.oid("feat"), repo.oid("feat-2"));
    }

    #[test]
    fn restack_moves_childless_tip() {
        let repo = TestRepo::new();
        repo.branch_from("feat", "main");
        repo.commit_file("a");
        repo.git(&["checkout", "--quiet", "main"]);
        repo.commit_file("upstream");
        repo.git(&["checkout", "--quiet", "feat"]);

        let mut ctx = repo.ctx();
        let stack = ctx.get_stack("feat").unwrap();
        ctx.restack(&stack, Some("main")).unwrap();
        assert_eq!(repo.subjects("main", "feat"), ["a"]);
        assert_eq!(repo.git(&["merge-base", "feat", "main"]), repo.oid("main").to_string());
    }

    #[test]
    fn refuses_dirty_work_tree() {
        let repo = TestRepo::new();
        split_stack(&repo, &["a"]);
        std::fs::write(repo.path().join("scratch"), "wip").unwrap();

        let mut ctx = repo.ctx();
        let stack = ctx.get_stack("feat").unwrap();
        let err = ctx.restack(&stack, None).unwrap_err();
        assert!(matches!(err, StkError::WorkingTreeDirty));
    }

    #[test]
    fn refuses_to_start_mid_rebase() {
        let repo = TestRepo::new();
        split_stack(&repo, &["a"]);
        std::fs::create_dir_all(repo.path().join(".git/rebase-merge")).unwrap();

        let mut ctx = repo.ctx();
        let stack = ctx.get_stack("feat").unwrap();
        let err = ctx.restack(&stack, None).unwrap_err();
        assert!(matches!(err, StkError::RebaseInProgress));
    }
}
