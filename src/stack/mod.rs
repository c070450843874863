//! In-memory representation of a stack of branches.
//!
//! A stack named `feat` is the tip branch `feat` plus any number of child branches `feat-1`,
//! `feat-2`, ... each holding a contiguous slice of the tip's commits. Nothing here is persisted:
//! stacks are rebuilt from the live ref list on every invocation.

use crate::review::PullRequest;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};

mod fmt;
pub(crate) use fmt::{StackLine, StackStatus};

/// Matches `<stack>-<index>`, anchored on the last dash. Indices are positive without leading zeros.
static CHILD_BRANCH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+)-([1-9][0-9]*)$").expect("valid regex"));

/// Splits a child branch name into its stack name and index.
///
/// ## Returns
/// - `Some((stack, index))` - The branch follows the `<stack>-<index>` convention.
/// - `None` - The branch is a plain branch (and therefore a stack of its own).
pub fn parse_child_branch(branch: &str) -> Option<(&str, u32)> {
    let captures = CHILD_BRANCH_RE.captures(branch)?;
    let index = captures.get(2)?.as_str().parse().ok()?;
    Some((captures.get(1)?.as_str(), index))
}

/// Returns the name of the stack that `branch` belongs to.
pub fn stack_name_of(branch: &str) -> &str {
    parse_child_branch(branch).map_or(branch, |(stack, _)| stack)
}

/// Returns `true` if `name` refers to the stack of the checked out branch.
pub fn is_current_sentinel(name: &str) -> bool {
    matches!(name, "." | "@")
}

/// Groups local branches into stacks.
///
/// ## Takes
/// - `branches` - Every local branch name.
/// - `merged` - The branches already merged into upstream.
///
/// ## Returns
/// The stacks, ordered by name, each with its children sorted by index and any leading merged
/// placeholders inserted.
pub fn group_stacks<I, S>(branches: I, merged: &HashSet<String>) -> Vec<Stack>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut stacks = BTreeMap::<String, Stack>::new();

    for branch in branches {
        let branch = branch.as_ref();
        match parse_child_branch(branch) {
            Some((name, index)) => {
                let stack = stacks
                    .entry(name.to_string())
                    .or_insert_with(|| Stack::new(name));
                stack.add_child(Child::new(name, index, merged.contains(branch)));
            }
            None => {
                stacks
                    .entry(branch.to_string())
                    .or_insert_with(|| Stack::new(branch))
                    .has_tip = true;
            }
        }
    }

    stacks
        .into_values()
        .map(|mut stack| {
            stack.fill_merged_placeholders();
            stack
        })
        .collect()
}

/// A named, ordered decomposition of one logical change into reviewable branches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stack {
    /// The name of the stack, which is also the name of its tip branch.
    pub name: String,
    /// Whether the tip branch exists locally.
    pub has_tip: bool,
    /// The children of the stack, strictly ascending by index.
    children: Vec<Child>,
}

impl Stack {
    /// Creates an empty [Stack] whose tip does not exist yet.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            has_tip: false,
            children: Vec::new(),
        }
    }

    /// Returns all children, placeholders included.
    pub fn children(&self) -> &[Child] {
        &self.children
    }

    /// Returns all children mutably.
    pub fn children_mut(&mut self) -> &mut [Child] {
        &mut self.children
    }

    /// Returns the child with the given branch name.
    pub fn child(&self, branch: &str) -> Option<&Child> {
        self.children.iter().find(|c| c.branch() == branch)
    }

    /// Inserts a child, keeping children sorted by index. A child with the same identity replaces
    /// the existing one.
    pub fn add_child(&mut self, child: Child) {
        self.children.retain(|c| c != &child);
        self.children.push(child);
        self.children.sort_by_key(|c| c.index);
    }

    /// Inserts merged, locally absent placeholders for every index below the lowest observed one,
    /// so that numbering stays 1-based after early children were merged and deleted.
    fn fill_merged_placeholders(&mut self) {
        let Some(lowest) = self.children.first().map(|c| c.index) else {
            return;
        };

        for index in 1..lowest {
            let mut placeholder = Child::new(self.name.as_str(), index, true);
            placeholder.local_exists = false;
            self.children.push(placeholder);
        }
        self.children.sort_by_key(|c| c.index);
    }

    /// Returns the children that are not merged yet.
    ///
    /// ## Takes
    /// - `before` - If given, the result is truncated after the child with this index.
    pub fn unmerged_children(&self, before: Option<u32>) -> Vec<&Child> {
        self.children
            .iter()
            .filter(|c| !c.is_merged)
            .take_while(|c| before.map_or(true, |b| c.index <= b))
            .collect()
    }

    /// Returns the positions a user can navigate between: every unmerged child, then the tip.
    pub fn unmerged_branches(&self) -> Vec<String> {
        self.unmerged_children(None)
            .into_iter()
            .map(Child::branch)
            .chain(self.has_tip.then(|| self.name.clone()))
            .collect()
    }

    /// Builds the child that follows the current last child.
    pub fn create_next_child(&self) -> Child {
        let index = self.children.last().map_or(1, |c| c.index + 1);
        Child::new(self.name.as_str(), index, false)
    }

    /// Returns the last child, if any.
    pub fn last_child(&self) -> Option<&Child> {
        self.children.last()
    }

    /// Returns the number of children, which is also the `total` in pull request titles.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Returns `true` if the stack has no children.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

/// One link of a [Stack]: a branch holding a contiguous slice of the stack's commits.
#[derive(Debug, Clone)]
pub struct Child {
    /// The name of the stack this child belongs to.
    pub stack_name: String,
    /// The 1-based position of the child within the stack.
    pub index: u32,
    /// Whether the branch is merged into upstream.
    pub is_merged: bool,
    /// Whether the branch exists locally. `false` for placeholders of deleted merged children.
    pub local_exists: bool,
    /// The review request for the branch, once loaded.
    pub pull_request: Option<PullRequest>,
}

impl Child {
    /// Creates a locally present [Child] without a pull request.
    pub fn new(stack_name: impl Into<String>, index: u32, is_merged: bool) -> Self {
        Self {
            stack_name: stack_name.into(),
            index,
            is_merged,
            local_exists: true,
            pull_request: None,
        }
    }

    /// Returns the branch name of the child, `<stack>-<index>`.
    pub fn branch(&self) -> String {
        format!("{}-{}", self.stack_name, self.index)
    }
}

impl PartialEq for Child {
    fn eq(&self, other: &Self) -> bool {
        self.stack_name == other.stack_name && self.index == other.index
    }
}

impl Eq for Child {}

/// Moves `count` positions from `current` along `branches`, clamping at both ends.
///
/// ## Returns
/// - `Some(branch)` - The branch to check out.
/// - `None` - `current` is not one of `branches`.
pub fn navigate<'a>(branches: &'a [String], current: &str, count: i64) -> Option<&'a str> {
    let position = branches.iter().position(|b| b == current)?;
    let last = branches.len().saturating_sub(1) as i64;
    let target = (position as i64).saturating_add(count).clamp(0, last);
    branches.get(target as usize).map(String::as_str)
}

#[cfg(test)]
mod test {
    use super::*;

    fn merged(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_last_numeric_suffix() {
        assert_eq!(parse_child_branch("feat-2"), Some(("feat", 2)));
        assert_eq!(parse_child_branch("my-cool-feat-12"), Some(("my-cool-feat", 12)));
        assert_eq!(parse_child_branch("feat-1-3"), Some(("feat-1", 3)));
        assert_eq!(parse_child_branch("feat"), None);
        assert_eq!(parse_child_branch("feat-"), None);
        assert_eq!(parse_child_branch("feat-0"), None);
        assert_eq!(parse_child_branch("feat-01"), None);
        assert_eq!(parse_child_branch("-3"), None);
    }

    #[test]
    fn resolves_stack_name() {
        assert_eq!(stack_name_of("feat-3"), "feat");
        assert_eq!(stack_name_of("feat"), "feat");
        assert!(is_current_sentinel("."));
        assert!(is_current_sentinel("@"));
        assert!(!is_current_sentinel("feat"));
    }

    #[test]
    fn groups_children_in_ascending_order() {
        let stacks = group_stacks(
            ["feat-10", "main", "feat-2", "feat", "feat-1", "other-1"],
            &merged(&["main"]),
        );
        let names = stacks.iter().map(|s| s.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, ["feat", "main", "other"]);

        let feat = &stacks[0];
        assert!(feat.has_tip);
        let indices = feat.children().iter().map(|c| c.index).collect::<Vec<_>>();
        assert_eq!(indices, [1, 2, 10]);

        let other = &stacks[2];
        assert!(!other.has_tip);
        assert!(stacks[1].is_empty());
    }

    #[test]
    fn inserts_placeholders_below_lowest_child() {
        let stacks = group_stacks(["feat", "feat-4", "feat-5"], &merged(&[]));
        let feat = &stacks[0];

        assert_eq!(feat.len(), 5);
        let placeholders = feat
            .children()
            .iter()
            .filter(|c| !c.local_exists)
            .collect::<Vec<_>>();
        assert_eq!(placeholders.len(), 3);
        assert!(placeholders.iter().all(|c| c.is_merged));
        assert_eq!(
            placeholders.iter().map(|c| c.index).collect::<Vec<_>>(),
            [1, 2, 3]
        );
        assert!(feat.child("feat-4").unwrap().local_exists);
    }

    #[test]
    fn unmerged_children_truncates_inclusively() {
        let stacks = group_stacks(
            ["feat", "feat-1", "feat-2", "feat-3", "feat-4"],
            &merged(&["feat-1"]),
        );
        let feat = &stacks[0];

        let all = feat.unmerged_children(None);
        assert_eq!(
            all.iter().map(|c| c.branch()).collect::<Vec<_>>(),
            ["feat-2", "feat-3", "feat-4"]
        );

        let prefix = feat.unmerged_children(Some(3));
        assert_eq!(
            prefix.iter().map(|c| c.branch()).collect::<Vec<_>>(),
            ["feat-2", "feat-3"]
        );

        assert_eq!(
            feat.unmerged_branches(),
            ["feat-2", "feat-3", "feat-4", "feat"]
        );
    }

    #[test]
    fn next_child_follows_max_index() {
        let mut stack = Stack::new("feat");
        assert_eq!(stack.create_next_child().branch(), "feat-1");

        stack.add_child(Child::new("feat", 3, false));
        stack.add_child(Child::new("feat", 1, true));
        assert_eq!(stack.create_next_child().branch(), "feat-4");

        stack.add_child(Child::new("feat", 3, true));
        assert_eq!(stack.len(), 2);
        assert!(stack.child("feat-3").unwrap().is_merged);
    }

    #[test]
    fn children_compare_by_identity() {
        let mut merged = Child::new("feat", 2, true);
        merged.local_exists = false;
        assert_eq!(merged, Child::new("feat", 2, false));
        assert_ne!(Child::new("feat", 2, false), Child::new("feat", 3, false));
    }

    #[test]
    fn navigation_clamps_at_both_ends() {
        let branches = ["feat-2", "feat-3", "feat"].map(String::from).to_vec();

        assert_eq!(navigate(&branches, "feat-2", 1), Some("feat-3"));
        assert_eq!(navigate(&branches, "feat-3", -1), Some("feat-2"));
        assert_eq!(navigate(&branches, "feat-3", 10), Some("feat"));
        assert_eq!(navigate(&branches, "feat", -10), Some("feat-2"));
        assert_eq!(navigate(&branches, "feat", i64::MAX), Some("feat"));
        assert_eq!(navigate(&branches, "feat-2", i64::MIN), Some("feat-2"));
        assert_eq!(navigate(&branches, "main", 1), None);
    }
}
