//! `rebase` and `reset_remote` subcommands.

use crate::ctx::StkContext;
use anyhow::Result;
use clap::Args;
use nu_ansi_term::Color::Blue;

/// CLI arguments for the `rebase` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct RebaseCmd {
    /// The ref to move the current stack onto.
    pub target: String,
}

impl RebaseCmd {
    /// Run the `rebase` subcommand.
    pub fn run(self, mut ctx: StkContext<'_>) -> Result<()> {
        let stack = ctx.get_stack("@")?;
        ctx.restack(&stack, Some(&self.target))?;
        println!(
            "Rebased `{}` onto `{}`.",
            Blue.paint(&stack.name),
            Blue.paint(&self.target)
        );
        Ok(())
    }
}

/// CLI arguments for the `reset_remote` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct ResetRemoteCmd;

impl ResetRemoteCmd {
    /// Run the `reset_remote` subcommand.
    pub fn run(self, ctx: StkContext<'_>) -> Result<()> {
        let stack = ctx.get_stack("@")?;
        for branch in ctx.reset_remote(&stack)? {
            println!("Reset `{}` to its remote branch.", Blue.paint(branch));
        }
        Ok(())
    }
}
