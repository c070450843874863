//! `push` subcommand.

use crate::ctx::StkContext;
use anyhow::Result;
use clap::Args;
use nu_ansi_term::Color::Blue;

/// CLI arguments for the `push` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct PushCmd {
    /// Push every unmerged child, not just the current and prior ones.
    #[arg(short, long)]
    pub all: bool,
    /// Push with `--force-with-lease`.
    #[arg(short, long)]
    pub force: bool,
    /// The stack to push. Defaults to the current stack.
    pub name: Option<String>,
}

impl PushCmd {
    /// Run the `push` subcommand.
    pub fn run(self, ctx: StkContext<'_>) -> Result<()> {
        let stack = ctx.get_stack_or_current(self.name.as_deref())?;
        ctx.check_cleanliness(&stack)?;

        let before = if self.all {
            None
        } else {
            ctx.current_child_index(&stack)?
        };
        for branch in ctx.push_stack(&stack, before, self.force)? {
            println!("Pushed `{}`.", Blue.paint(branch));
        }
        Ok(())
    }
}
