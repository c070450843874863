//! `restack` subcommand.

use crate::ctx::StkContext;
use anyhow::Result;
use clap::Args;
use nu_ansi_term::Color::Blue;

/// CLI arguments for the `restack` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct RestackCmd {
    /// The stack to restack. Restacks every stack if omitted.
    pub name: Option<String>,
}

impl RestackCmd {
    /// Run the `restack` subcommand.
    pub fn run(self, mut ctx: StkContext<'_>) -> Result<()> {
        let stacks = match self.name {
            Some(name) => vec![ctx.get_stack(&name)?],
            None => ctx.list_stacks()?,
        };

        for stack in stacks.iter() {
            if stack.unmerged_children(None).is_empty() {
                continue;
            }
            let needed = ctx.needs_restack(stack)?;
            ctx.restack(stack, None)?;
            if needed {
                println!("Restacked `{}`.", Blue.paint(&stack.name));
            }
        }
        Ok(())
    }
}
