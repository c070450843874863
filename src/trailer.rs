//! Branch-identity trailers embedded in commit messages.
//!
//! Rebasing rewrites commit hashes, so the first commit of a child branch cannot be located by
//! [git2::Oid] once history moves. Instead, that commit carries a `branch: <name>` trailer line
//! which survives rebases, amends of later commits and cherry-picks.

use crate::constants::BRANCH_TRAILER_KEY;
use git2::{Commit, Oid};
use std::collections::HashMap;

/// Returns the branch named by the last `branch: <name>` trailer in `message`, if any.
pub fn branch_trailer(message: &str) -> Option<&str> {
    message.lines().rev().find_map(|line| {
        let (key, value) = line.trim_end().split_once(':')?;
        (key == BRANCH_TRAILER_KEY)
            .then(|| value.trim())
            .filter(|v| !v.is_empty())
    })
}

/// Returns `true` if `message` carries the trailer for `branch`.
pub fn has_branch_trailer(message: &str, branch: &str) -> bool {
    message.lines().any(|line| {
        line.trim_end()
            .split_once(':')
            .is_some_and(|(key, value)| key == BRANCH_TRAILER_KEY && value.trim() == branch)
    })
}

/// Appends the trailer for `branch` to `message`.
///
/// ## Returns
/// - `Some(message)` - The rewritten message.
/// - `None` - The message already carries the trailer and must be left as-is.
pub fn with_branch_trailer(message: &str, branch: &str) -> Option<String> {
    if has_branch_trailer(message, branch) {
        return None;
    }

    let body = message.trim_end();
    let last_paragraph = body.rsplit("\n\n").next().unwrap_or_default();
    let ends_with_trailers = body.contains("\n\n")
        && last_paragraph
            .lines()
            .all(|line| line.split_once(": ").is_some_and(|(k, _)| !k.contains(' ')));

    let separator = if ends_with_trailers { "\n" } else { "\n\n" };
    Some(format!("{body}{separator}{BRANCH_TRAILER_KEY}: {branch}\n"))
}

/// Memoizes trailer lookups by commit id for the duration of one command.
///
/// Commit messages are immutable per [Oid], so entries never go stale; rewritten commits simply
/// get new ids.
#[derive(Debug, Default)]
pub struct TrailerCache {
    trailers: HashMap<Oid, Option<String>>,
}

impl TrailerCache {
    /// Returns the branch trailer of `commit`, reading the message at most once.
    pub fn trailer(&mut self, commit: &Commit<'_>) -> Option<&str> {
        self.trailers
            .entry(commit.id())
            .or_insert_with(|| {
                let message = String::from_utf8_lossy(commit.message_bytes());
                branch_trailer(&message).map(ToOwned::to_owned)
            })
            .as_deref()
    }

    /// Returns the number of memoized commits.
    pub fn len(&self) -> usize {
        self.trailers.len()
    }
}
