//! Subcommands pertaining to stack management.

use crate::{ctx::StkContext, review::ReviewService};
use anyhow::Result;
use clap::{Args, Subcommand};

mod clean;
pub use clean::CleanCmd;

mod create;
pub use create::CreateCmd;

mod delete;
pub use delete::DeleteCmd;

mod list;
pub use list::ListCmd;

mod navigate;
pub use navigate::NavigateCmd;

mod pr;
pub use pr::{PrCmd, PublishCmd};

mod push;
pub use push::PushCmd;

mod rebase;
pub use rebase::{RebaseCmd, ResetRemoteCmd};

mod restack;
pub use restack::RestackCmd;

mod status;
pub use status::StatusCmd;

/// CLI arguments for the `stack` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct StackCmd {
    /// The stack operation to run. Lists stacks if omitted.
    #[clap(subcommand)]
    pub command: Option<StackSubcommands>,
}

#[derive(Debug, Clone, Eq, PartialEq, Subcommand)]
pub enum StackSubcommands {
    /// List all stacks.
    #[clap(aliases = ["l", "ls"])]
    List(ListCmd),
    /// Split the unsplit commits of the current stack into child branches, one per commit.
    #[clap(alias = "c")]
    Create(CreateCmd),
    /// Re-link the children of a stack into a linear chain. Restacks every stack if no name is
    /// given.
    #[clap(alias = "tidy")]
    Restack(RestackCmd),
    /// Delete the local children of a stack that were merged upstream.
    Clean(CleanCmd),
    /// Push the children of the current stack.
    Push(PushCmd),
    /// Open pull requests for the children of a stack and refresh their titles and tables.
    Pr(PrCmd),
    /// Mark the pull requests of a stack as ready for review.
    Publish(PublishCmd),
    /// Check out an earlier branch of the current stack.
    Prev(NavigateCmd),
    /// Check out a later branch of the current stack.
    Next(NavigateCmd),
    /// Check out the tip of the current stack.
    Tip,
    /// Check out the first unmerged child of the current stack.
    First,
    /// Delete the children of a stack.
    Delete(DeleteCmd),
    /// Move the current stack onto a new target and restack it.
    Rebase(RebaseCmd),
    /// Hard-reset the children of the current stack to their remote branches.
    #[clap(name = "reset_remote", alias = "reset-remote")]
    ResetRemote(ResetRemoteCmd),
    /// Show the children of a stack and their pull requests.
    #[clap(alias = "st")]
    Status(StatusCmd),
}

impl StackCmd {
    /// Run the `stack` subcommand.
    pub async fn run(self, ctx: StkContext<'_>, service: &dyn ReviewService) -> Result<()> {
        match self.command.unwrap_or(StackSubcommands::List(ListCmd::default())) {
            StackSubcommands::List(args) => args.run(ctx),
            StackSubcommands::Create(args) => args.run(ctx),
            StackSubcommands::Restack(args) => args.run(ctx),
            StackSubcommands::Clean(args) => args.run(ctx),
            StackSubcommands::Push(args) => args.run(ctx),
            StackSubcommands::Pr(args) => args.run(ctx, service).await,
            StackSubcommands::Publish(args) => args.run(ctx, service).await,
            StackSubcommands::Prev(args) => navigate::navigate(&ctx, args.count.saturating_neg()),
            StackSubcommands::Next(args) => navigate::navigate(&ctx, args.count),
            StackSubcommands::Tip => navigate::navigate(&ctx, i64::MAX),
            StackSubcommands::First => navigate::navigate(&ctx, i64::MIN),
            StackSubcommands::Delete(args) => args.run(ctx),
            StackSubcommands::Rebase(args) => args.run(ctx),
            StackSubcommands::ResetRemote(args) => args.run(ctx),
            StackSubcommands::Status(args) => args.run(ctx, service).await,
        }
    }
}
