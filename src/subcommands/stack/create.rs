//! `create` subcommand.

use crate::{ctx::StkContext, git::RepositoryExt, stack::StackStatus};
use anyhow::Result;
use clap::Args;
use nu_ansi_term::Color::Blue;

/// CLI arguments for the `create` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct CreateCmd {
    /// The stack to split. Defaults to the current stack.
    pub name: Option<String>,
}

impl CreateCmd {
    /// Run the `create` subcommand.
    pub fn run(self, mut ctx: StkContext<'_>) -> Result<()> {
        let mut stack = ctx.get_stack_or_current(self.name.as_deref())?;
        let created = ctx.create_children(&mut stack)?;

        if created.is_empty() {
            println!("Stack `{}` has no unsplit commits.", Blue.paint(&stack.name));
            return Ok(());
        }
        for branch in created.iter() {
            println!("Created branch `{}`.", Blue.paint(branch));
        }

        let checked_out = ctx.repository.current_branch_name().ok();
        let mut buf = String::new();
        stack.write_tree(&mut buf, checked_out.as_deref(), StackStatus::default())?;
        print!("{buf}");
        Ok(())
    }
}
