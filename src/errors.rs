//! Error types for the `stk` application.

use nu_ansi_term::Color;
use thiserror::Error;

/// The error type returned by every fallible `stk` operation.
#[derive(Error, Debug)]
pub enum StkError {
    /// The requested stack does not exist.
    #[error("Stack `{}` does not exist.", Color::Blue.paint(.0))]
    StackNotFound(String),
    /// The current branch is not part of a stack.
    #[error("Not on a stack branch.")]
    NotOnStack,
    /// `HEAD` does not point at a branch.
    #[error("Cannot operate on a detached HEAD.")]
    DetachedHead,
    /// The configured remote does not exist in the repository.
    #[error("Remote `{}` is not configured in this repository.", Color::Blue.paint(.0))]
    MissingRemote(String),
    /// The working tree has uncommitted changes.
    #[error("Working tree is dirty. Commit or stash your changes first.")]
    WorkingTreeDirty,
    /// A rebase or merge is already in progress.
    #[error("A rebase or merge is in progress. Finish or abort it with `git` first.")]
    RebaseInProgress,
    /// No commit in the searched range carries the branch trailer.
    #[error(
        "Could not find where branch `{}` starts: no commit carries a `branch: {}` trailer.",
        Color::Blue.paint(.0),
        .0
    )]
    BoundaryNotFound(String),
    /// The review service could not be reached or rejected the request.
    #[error("Review service error: {}", .0)]
    RemoteService(String),
    /// The review service returned a pull request that does not decode.
    #[error("Malformed pull request data: {}", .0)]
    MalformedPullRequest(String),
    /// A `git` command exited unsuccessfully.
    #[error("`git {}` failed.\n{}", .command, .output)]
    GitCommand {
        /// The arguments passed to `git`.
        command: String,
        /// Captured stdout and stderr of the command.
        output: String,
    },
    /// A [git2::Error] occurred.
    #[error("libgit2 error: {}", .0)]
    Git2Error(#[from] git2::Error),
    /// An [inquire::InquireError] occurred.
    #[error("inquire error: {}", .0)]
    InquireError(#[from] inquire::InquireError),
    /// An [std::io::Error] occurred.
    #[error("io error: {}", .0)]
    IoError(#[from] std::io::Error),
    /// A [serde_json::Error] occurred.
    #[error("json error: {}", .0)]
    JsonError(#[from] serde_json::Error),
    /// A [toml::de::Error] occurred.
    #[error("config error: {}", .0)]
    ConfigError(#[from] toml::de::Error),
}

impl StkError {
    /// Returns `true` if the error originates from the review service, in which case read-only
    /// commands fall back to showing no pull request data.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::RemoteService(_) | Self::MalformedPullRequest(_))
    }
}

/// A [Result] alias where the error type is [StkError].
pub type StkResult<T> = Result<T, StkError>;
