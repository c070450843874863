//! `pr` and `publish` subcommands.

use crate::{ctx::StkContext, review::ReviewService, stack::Stack};
use anyhow::Result;
use clap::Args;
use nu_ansi_term::Color::{Blue, Green};

/// CLI arguments for the `pr` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct PrCmd {
    /// Open pull requests for every unmerged child, not just the current and prior ones.
    #[arg(short, long)]
    pub all: bool,
    /// The stack to open pull requests for. Defaults to the current stack.
    pub name: Option<String>,
}

impl PrCmd {
    /// Run the `pr` subcommand.
    pub async fn run(self, ctx: StkContext<'_>, service: &dyn ReviewService) -> Result<()> {
        service.auth_status().await?;
        let mut stack = ctx.get_stack_or_current(self.name.as_deref())?;
        ctx.check_cleanliness(&stack)?;
        ctx.load_prs(&mut stack, service).await?;

        let before = if self.all {
            None
        } else {
            ctx.current_child_index(&stack)?
        };
        let created = ctx.create_prs(&mut stack, service, before).await?;
        let updated = ctx.update_prs(&mut stack, service).await?;

        for branch in created.iter() {
            print_pull_request(&stack, branch, "Opened");
        }
        for branch in updated.iter().filter(|b| !created.contains(b)) {
            print_pull_request(&stack, branch, "Updated");
        }
        Ok(())
    }
}

/// CLI arguments for the `publish` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct PublishCmd {
    /// Publish every unmerged child, not just the current and prior ones.
    #[arg(short, long)]
    pub all: bool,
    /// Mark the pull requests as drafts again.
    #[arg(short, long)]
    pub undo: bool,
    /// The stack to publish. Defaults to the current stack.
    pub name: Option<String>,
}

impl PublishCmd {
    /// Run the `publish` subcommand.
    pub async fn run(self, ctx: StkContext<'_>, service: &dyn ReviewService) -> Result<()> {
        service.auth_status().await?;
        let mut stack = ctx.get_stack_or_current(self.name.as_deref())?;
        ctx.load_prs(&mut stack, service).await?;

        let before = if self.all {
            None
        } else {
            ctx.current_child_index(&stack)?
        };
        for branch in ctx.publish(&mut stack, service, before, self.undo).await? {
            print_pull_request(&stack, branch.as_str(), "Updated");
        }
        Ok(())
    }
}

fn print_pull_request(stack: &Stack, branch: &str, verb: &str) {
    let Some(pr) = stack.child(branch).and_then(|c| c.pull_request.as_ref()) else {
        return;
    };
    println!(
        "{verb} pull request #{} for `{}` @ {}",
        pr.number,
        Blue.paint(branch),
        Green.paint(&pr.url)
    );
}
