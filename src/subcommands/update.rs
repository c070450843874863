//! `update` subcommand.

use crate::{ctx::StkContext, git::RepositoryExt};
use anyhow::Result;
use clap::Args;
use nu_ansi_term::Color::Blue;

/// CLI arguments for the `update` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct UpdateCmd {
    /// Only rebase local stacks; do not fetch.
    #[arg(short, long)]
    pub local: bool,
    /// Rebase every stack onto the target after fetching.
    #[arg(short, long)]
    pub rebase: bool,
    /// The ref to rebase stacks onto. Defaults to the upstream branch.
    pub target: Option<String>,
}

impl UpdateCmd {
    /// Run the `update` subcommand.
    pub fn run(self, mut ctx: StkContext<'_>) -> Result<()> {
        let original = ctx.repository.current_branch_name()?;

        if !self.local {
            for branch in ctx.sync_upstream()? {
                println!("Updated `{}`.", Blue.paint(branch));
            }
        }

        if self.local || self.rebase {
            let target = self.target.unwrap_or_else(|| ctx.upstream.branch.clone());
            for stack in ctx.list_stacks()? {
                if stack.name.starts_with(&ctx.upstream.branch) || stack.name == target {
                    continue;
                }
                ctx.restack(&stack, Some(&target))?;
                println!(
                    "Rebased `{}` onto `{}`.",
                    Blue.paint(&stack.name),
                    Blue.paint(&target)
                );
            }
        }

        if ctx.repository.current_branch_name()? != original {
            ctx.repository.checkout_branch(&original)?;
        }
        Ok(())
    }
}
