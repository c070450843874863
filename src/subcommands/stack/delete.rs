//! `delete` subcommand.

use crate::ctx::StkContext;
use anyhow::Result;
use clap::Args;
use nu_ansi_term::Color::Blue;

/// CLI arguments for the `delete` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct DeleteCmd {
    /// Delete without asking for confirmation.
    #[arg(short, long)]
    pub force: bool,
    /// The stack to delete. Defaults to the current stack.
    pub name: Option<String>,
}

impl DeleteCmd {
    /// Run the `delete` subcommand.
    pub fn run(self, ctx: StkContext<'_>) -> Result<()> {
        let stack = ctx.get_stack_or_current(self.name.as_deref())?;
        for branch in ctx.delete_stack(&stack, self.force)? {
            println!("Deleted branch `{}`.", Blue.paint(branch));
        }
        Ok(())
    }
}
