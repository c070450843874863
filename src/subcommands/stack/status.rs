//! `status` subcommand.

use crate::{
    ctx::StkContext,
    git::RepositoryExt,
    review::ReviewService,
    stack::StackStatus,
};
use anyhow::Result;
use clap::Args;
use tracing::warn;

/// CLI arguments for the `status` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct StatusCmd {
    /// The stack to show. Defaults to the current stack.
    pub name: Option<String>,
}

impl StatusCmd {
    /// Run the `status` subcommand.
    pub async fn run(self, ctx: StkContext<'_>, service: &dyn ReviewService) -> Result<()> {
        let mut stack = ctx.get_stack_or_current(self.name.as_deref())?;

        match ctx.load_prs(&mut stack, service).await {
            Ok(()) => {}
            Err(e) if e.is_remote() => {
                warn!(error = %e, "Could not load pull requests; showing no pull request data");
                stack
                    .children_mut()
                    .iter_mut()
                    .for_each(|c| c.pull_request = None);
            }
            Err(e) => return Err(e.into()),
        }

        let status = StackStatus {
            needs_restack: ctx.needs_restack(&stack)?,
            is_incomplete: ctx.is_incomplete(&stack)?,
        };
        let checked_out = ctx.repository.current_branch_name().ok();

        let mut buf = String::new();
        stack.write_tree(&mut buf, checked_out.as_deref(), status)?;
        print!("{buf}");
        Ok(())
    }
}
