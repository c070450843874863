//! The markdown navigation table embedded at the top of every pull request body.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

/// Matches a navigation row, capturing the child position and the pull request number.
static PR_ROW_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\|\s*(\d+)\s*\|\s*[#>](\d+)").expect("valid regex"));

/// A parsed markdown table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownTable {
    /// The header cells.
    pub columns: Vec<String>,
    /// The data rows, without the header and separator.
    pub rows: Vec<Vec<String>>,
}

/// Renders `rows` as a markdown table with a centered header and left-aligned cells.
///
/// Cells must not contain `|` or newlines.
pub fn make_table<S: AsRef<str>>(columns: &[S], rows: &[Vec<String>]) -> String {
    let mut widths = columns
        .iter()
        .map(|c| c.as_ref().chars().count())
        .collect::<Vec<_>>();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let render = |cells: Vec<String>| format!("| {} |", cells.join(" | "));

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(render(
        columns
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:^w$}", c.as_ref()))
            .collect(),
    ));
    lines.push(render(widths.iter().map(|w| "-".repeat(*w)).collect()));
    for row in rows {
        lines.push(render(
            widths
                .iter()
                .enumerate()
                .map(|(i, w)| format!("{:<w$}", row.get(i).map_or("", String::as_str)))
                .collect(),
        ));
    }

    lines.join("\n")
}

/// Parses a table rendered by [make_table].
///
/// The first line is the header and the second the separator; every following line is a row.
pub fn parse_table(table: &str) -> MarkdownTable {
    let split = |line: &str| -> Vec<String> {
        let inner = line.trim_end().trim_start_matches('|');
        let inner = inner.strip_suffix('|').unwrap_or(inner);
        inner
            .split('|')
            .map(|cell| {
                let cell = cell.strip_prefix(' ').unwrap_or(cell);
                cell.trim_end().to_string()
            })
            .collect()
    };

    let mut lines = table.lines().filter(|l| l.starts_with('|'));
    let columns = lines
        .next()
        .map(|header| split(header).iter().map(|c| c.trim().to_string()).collect())
        .unwrap_or_default();
    let rows = lines.skip(1).map(split).collect();

    MarkdownTable { columns, rows }
}

/// Splits a pull request body into its leading table and the verbatim remainder.
///
/// The table is the maximal run of leading lines that start with `|`. It is returned with `\n`
/// line endings and no trailing newline; the remainder is returned byte-for-byte.
pub fn split_body(body: &str) -> (String, &str) {
    let mut table = Vec::new();
    let mut offset = 0;

    for line in body.split_inclusive('\n') {
        if !line.starts_with('|') {
            break;
        }
        table.push(line.trim_end_matches(['\r', '\n']));
        offset += line.len();
    }

    (table.join("\n"), &body[offset..])
}

/// Joins a table and the free-form remainder of a body, separating them with one blank line.
pub fn compose_body(table: &str, rest: &str) -> String {
    if table.is_empty() {
        return rest.to_string();
    }
    if rest.is_empty() {
        return table.to_string();
    }

    if rest.starts_with('\n') || rest.starts_with("\r\n") {
        format!("{table}\n{rest}")
    } else {
        format!("{table}\n\n{rest}")
    }
}

/// Maps each child position in a navigation table to its pull request number.
pub fn parse_pr_table(table: &str) -> BTreeMap<u32, u64> {
    table
        .lines()
        .filter_map(|line| {
            let captures = PR_ROW_RE.captures(line)?;
            Some((captures[1].parse().ok()?, captures[2].parse().ok()?))
        })
        .collect()
}
