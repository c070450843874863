//! Constants for the `stk` application.

use nu_ansi_term::Color;

/// Name of the user configuration file, relative to the home directory.
pub(crate) const STK_CFG_FILE_NAME: &str = ".stk.toml";

/// Repository-local pull request template, relative to the work tree.
pub(crate) const PR_TEMPLATE_PATH: &str = ".github/pull_request_template.md";

/// Key of the commit trailer that marks the first commit of a child branch.
pub(crate) const BRANCH_TRAILER_KEY: &str = "branch";

/// Marker prepended to the titles of draft pull requests.
pub(crate) const WIP_MARKER: &str = "WIP:";

/// Branch used when the remote does not advertise a default branch.
pub(crate) const FALLBACK_UPSTREAM: &str = "master";

/// Fields requested from `gh` for every pull request.
pub(crate) const GH_PR_FIELDS: &str = "number,title,body,url,headRefName,isDraft";

/// Column headers of the navigation table embedded in pull request bodies.
pub(crate) const TABLE_COLUMNS: [&str; 3] = ["", "PR", "Title"];

pub(crate) const COLORS: [Color; 6] = [
    Color::Blue,
    Color::Cyan,
    Color::Green,
    Color::Red,
    Color::Yellow,
    Color::Purple,
];

pub(crate) const FILLED_CIRCLE: char = '●';
pub(crate) const EMPTY_CIRCLE: char = '○';
pub(crate) const BOTTOM_LEFT_BOX: char = '└';
pub(crate) const LEFT_FORK_BOX: char = '├';
pub(crate) const HORIZONTAL_BOX: char = '─';
