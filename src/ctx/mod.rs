//! The in-memory context of the `stk` application.
//!
//! A [StkContext] lives for exactly one command. It is rebuilt from the repository's refs every
//! time, so nothing it holds survives between invocations.

use crate::{
    config::StkConfig,
    errors::{StkError, StkResult},
    git::RepositoryExt,
    stack::{self, Stack},
    trailer::TrailerCache,
};
use git2::Repository;
use std::collections::HashSet;
use tracing::debug;

mod actions;
mod prs;
mod restack;

/// The branch that stacks are based on and merged into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upstream {
    /// The local name of the upstream branch, e.g. `main`. Used as the base of the first PR.
    pub branch: String,
    /// The ref that merges and merge bases are computed against, e.g. `origin/main`.
    pub tracking: String,
}

impl Upstream {
    /// Creates an [Upstream] from a branch name and the ref that tracks it.
    pub fn new(branch: impl Into<String>, tracking: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
            tracking: tracking.into(),
        }
    }

    /// Resolves the upstream for `repository`.
    ///
    /// The branch is the configured `upstream`, else the remote's default branch. The tracking
    /// ref is `<remote>/<branch>`, falling back to the local branch if it was never fetched.
    pub fn resolve(repository: &Repository, config: &StkConfig) -> StkResult<Self> {
        if repository.find_remote(&config.remote).is_err() {
            return Err(StkError::MissingRemote(config.remote.clone()));
        }

        let branch = config
            .upstream
            .clone()
            .unwrap_or_else(|| repository.default_upstream(&config.remote));
        let tracking = if repository.remote_branch_exists(&config.remote, &branch) {
            format!("{}/{}", config.remote, branch)
        } else {
            branch.clone()
        };

        debug!(%branch, %tracking, "Resolved upstream");
        Ok(Self::new(branch, tracking))
    }
}

/// The in-memory context of the `stk` application.
pub struct StkContext<'a> {
    /// The repository the command operates on.
    pub repository: &'a Repository,
    /// The user configuration.
    pub config: StkConfig,
    /// The upstream branch.
    pub upstream: Upstream,
    /// Trailer lookups made during this command.
    trailers: TrailerCache,
}

impl<'a> StkContext<'a> {
    /// Creates a [StkContext] with an explicit upstream.
    pub fn new(repository: &'a Repository, config: StkConfig, upstream: Upstream) -> Self {
        Self {
            repository,
            config,
            upstream,
            trailers: TrailerCache::default(),
        }
    }

    /// Creates a [StkContext], resolving the upstream from the repository and configuration.
    pub fn load(repository: &'a Repository, config: StkConfig) -> StkResult<Self> {
        let upstream = Upstream::resolve(repository, &config)?;
        Ok(Self::new(repository, config, upstream))
    }

    /// Discovers every stack from the local branches.
    ///
    /// A child is merged if its tip is reachable from the upstream tracking ref.
    pub fn list_stacks(&self) -> StkResult<Vec<Stack>> {
        let branches = self.repository.local_branch_names()?;
        let upstream = self.repository.resolve_commit(&self.upstream.tracking)?;

        let mut merged = HashSet::new();
        for branch in branches.iter() {
            let oid = self.repository.resolve_commit(&local_ref(branch))?;
            if self.repository.is_descendant(upstream, oid)? {
                merged.insert(branch.clone());
            }
        }

        Ok(stack::group_stacks(&branches, &merged))
    }

    /// Returns the name of the stack the checked out branch belongs to.
    pub fn current_stack_name(&self) -> StkResult<String> {
        let current = self.repository.current_branch_name()?;
        Ok(stack::stack_name_of(&current).to_string())
    }

    /// Looks up a stack by name, resolving `.` and `@` to the current stack.
    pub fn get_stack(&self, name: &str) -> StkResult<Stack> {
        let name = if stack::is_current_sentinel(name) {
            self.current_stack_name()?
        } else {
            name.to_string()
        };

        self.list_stacks()?
            .into_iter()
            .find(|s| s.name == name)
            .ok_or(StkError::StackNotFound(name))
    }

    /// Looks up the stack named by an optional CLI argument, defaulting to the current stack.
    pub fn get_stack_or_current(&self, name: Option<&str>) -> StkResult<Stack> {
        self.get_stack(name.unwrap_or("."))
    }

    /// Returns the index of the checked out branch if it is a child of `stack`.
    ///
    /// Commands that act on "the current and prior branches" use this as their cut-off.
    pub fn current_child_index(&self, stack: &Stack) -> StkResult<Option<u32>> {
        let current = self.repository.current_branch_name()?;
        Ok(stack.child(&current).map(|c| c.index))
    }
}

/// Returns the fully qualified name of a local branch.
pub(crate) fn local_ref(branch: &str) -> String {
    format!("refs/heads/{branch}")
}
