//! `list` subcommand.

use crate::{
    ctx::StkContext,
    git::RepositoryExt,
    stack::{stack_name_of, StackLine},
};
use anyhow::Result;
use clap::Args;

/// CLI arguments for the `list` subcommand.
#[derive(Debug, Default, Clone, Eq, PartialEq, Args)]
pub struct ListCmd {
    /// Show the number of children of each stack.
    #[arg(short)]
    pub c: bool,
}

impl ListCmd {
    /// Run the `list` subcommand.
    pub fn run(self, ctx: StkContext<'_>) -> Result<()> {
        let current = ctx.repository.current_branch_name().ok();
        let current_stack = current.as_deref().map(stack_name_of);

        for stack in ctx.list_stacks()? {
            let line = StackLine {
                is_current: current_stack == Some(stack.name.as_str()),
                children: self.c.then(|| stack.len()),
                name: stack.name,
            };
            println!("{line}");
        }
        Ok(())
    }
}
