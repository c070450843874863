//! Formatting for the [Stack] type.

use super::Stack;
use crate::constants::{
    BOTTOM_LEFT_BOX, COLORS, EMPTY_CIRCLE, FILLED_CIRCLE, HORIZONTAL_BOX, LEFT_FORK_BOX,
};
use nu_ansi_term::Color;
use std::fmt::{self, Display, Write};

impl Stack {
    /// Writes a pretty-printed representation of the [Stack] to the passed [Write]r, tip first and
    /// children below it in descending order.
    ///
    /// ## Takes
    /// - `w` - The writer to write the stack to.
    /// - `checked_out` - The name of the branch that is currently checked out.
    /// - `status` - Flags to annotate the tip with.
    pub fn write_tree<W: Write>(
        &self,
        w: &mut W,
        checked_out: Option<&str>,
        status: StackStatus,
    ) -> fmt::Result {
        let checked_out = checked_out.unwrap_or_default();
        let icon = |branch: &str| {
            if branch == checked_out {
                FILLED_CIRCLE
            } else {
                EMPTY_CIRCLE
            }
        };

        let mut tip_line = COLORS[0]
            .paint(format!("{} {}", icon(&self.name), self.name))
            .to_string();
        if !self.has_tip {
            tip_line.push_str(&Color::DarkGray.paint(" (no local tip)").to_string());
        }
        if status.needs_restack {
            tip_line.push_str(&Color::Red.paint(" (needs restack)").to_string());
        }
        if status.is_incomplete {
            tip_line.push_str(&Color::Yellow.paint(" (unsplit commits)").to_string());
        }
        writeln!(w, "{}", tip_line)?;

        let mut children = self.children.iter().rev().peekable();
        while let Some(child) = children.next() {
            let connection = if children.peek().is_none() {
                BOTTOM_LEFT_BOX
            } else {
                LEFT_FORK_BOX
            };
            let branch = child.branch();
            let color = COLORS[child.index as usize % COLORS.len()];

            let mut line = color
                .paint(format!("{connection}{HORIZONTAL_BOX}{} {branch}", icon(&branch)))
                .to_string();
            if let Some(pr) = child.pull_request.as_ref() {
                line.push_str(&format!(" {}", Color::Cyan.paint(format!("#{}", pr.number))));
                if pr.is_draft {
                    line.push_str(&Color::DarkGray.paint(" [draft]").to_string());
                }
            }
            if child.is_merged {
                line.push_str(&Color::Green.italic().paint(" (merged)").to_string());
            }
            writeln!(w, "{}", line)?;
        }

        Ok(())
    }
}

/// Flags rendered next to a stack's tip.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StackStatus {
    /// The children do not form a linear chain.
    pub needs_restack: bool,
    /// The tip holds commits that no child contains.
    pub is_incomplete: bool,
}

/// A one-line summary of a stack for `stk stack list`.
#[derive(Debug)]
pub(crate) struct StackLine {
    /// The name of the stack.
    pub(crate) name: String,
    /// The number of children, if it should be displayed.
    pub(crate) children: Option<usize>,
    /// Whether the stack of the checked out branch.
    pub(crate) is_current: bool,
}

impl Display for StackLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let icon = if self.is_current {
            FILLED_CIRCLE
        } else {
            EMPTY_CIRCLE
        };
        write!(f, "{} {}", icon, Color::Blue.paint(&self.name))?;
        match self.children {
            Some(n) if n > 0 => write!(f, " ({n})"),
            _ => Ok(()),
        }
    }
}
