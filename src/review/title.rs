//! Pull request title codec: `[<index>/<total>] [WIP: ]<title>`.

use crate::constants::WIP_MARKER;
use once_cell::sync::Lazy;
use regex::Regex;

static TITLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\[(\d+)/(\d+)\])?\s*(.*)$").expect("valid regex")
});

/// A pull request title split into its stack position, draft marker and user-written title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackTitle {
    /// The `(index, total)` prefix, if present.
    pub position: Option<(u32, u32)>,
    /// Whether the title carries the `WIP:` marker.
    pub draft: bool,
    /// The title as written by the user.
    pub title: String,
}

impl StackTitle {
    /// Encodes the title as `[<index>/<total>] [WIP: ]<title>`.
    pub fn encode(index: u32, total: u32, draft: bool, title: &str) -> String {
        let marker = if draft {
            format!("{WIP_MARKER} ")
        } else {
            String::new()
        };
        format!("[{index}/{total}] {marker}{title}")
    }

    /// Decodes a raw title, stripping an optional `[i/total]` prefix and, for drafts, the
    /// `WIP:` marker.
    ///
    /// A ready pull request keeps a leading `WIP:` as part of its title, so
    /// `decode(&encode(i, t, draft, title), draft)` always yields `title`.
    ///
    /// Returns [None] only if the title spans multiple lines.
    pub fn decode(raw: &str, is_draft: bool) -> Option<Self> {
        let captures = TITLE_RE.captures(raw)?;
        let position = match (captures.get(1), captures.get(2)) {
            (Some(index), Some(total)) => {
                Some((index.as_str().parse().ok()?, total.as_str().parse().ok()?))
            }
            _ => None,
        };

        let rest = captures.get(3)?.as_str();
        let (draft, title) = match rest.strip_prefix(WIP_MARKER) {
            Some(title) if is_draft => (true, title.trim_start()),
            _ => (false, rest),
        };

        Some(Self {
            position,
            draft,
            title: title.trim_end().to_string(),
        })
    }
}
