//! `prev`, `next`, `tip` and `first` subcommands.

use crate::ctx::StkContext;
use anyhow::Result;
use clap::Args;
use nu_ansi_term::Color::Blue;

/// CLI arguments for the `prev` and `next` subcommands.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct NavigateCmd {
    /// The number of branches to move by.
    #[arg(default_value_t = 1)]
    pub count: i64,
}

/// Moves `count` branches along the current stack and prints its graph.
pub(crate) fn navigate(ctx: &StkContext<'_>, count: i64) -> Result<()> {
    let branch = ctx.navigate_stack(count)?;
    println!("On `{}`.", Blue.paint(&branch));

    let stack = ctx.get_stack(".")?;
    println!("{}", ctx.stack_graph(&stack)?);
    Ok(())
}
