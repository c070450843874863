//! `clean` subcommand.

use crate::ctx::StkContext;
use anyhow::Result;
use clap::Args;
use nu_ansi_term::Color::Blue;

/// CLI arguments for the `clean` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct CleanCmd {
    /// The stack to clean. Defaults to the current stack.
    pub name: Option<String>,
}

impl CleanCmd {
    /// Run the `clean` subcommand.
    pub fn run(self, ctx: StkContext<'_>) -> Result<()> {
        let stack = ctx.get_stack_or_current(self.name.as_deref())?;
        for branch in ctx.clean_merged(&stack)? {
            println!("Deleted merged branch `{}`.", Blue.paint(branch));
        }
        Ok(())
    }
}
