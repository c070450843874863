//! The subcommands for the `stk` application.

use crate::{ctx::StkContext, review::ReviewService};
use clap::Subcommand;

mod sandbox;
pub use sandbox::SandboxCmd;

mod stack;
pub use stack::StackCmd;

mod update;
pub use update::UpdateCmd;

#[derive(Debug, Clone, Eq, PartialEq, Subcommand)]
pub enum Subcommands {
    /// Split, restack, navigate and review stacks of branches.
    #[clap(alias = "s")]
    Stack(StackCmd),
    /// Fetch upstream and rebase local branches onto it.
    #[clap(alias = "u")]
    Update(UpdateCmd),
    /// Build scratch stacks for trying out the workflow.
    Sandbox(SandboxCmd),
}

impl Subcommands {
    /// Run the subcommand with the given context.
    pub async fn run(
        self,
        ctx: StkContext<'_>,
        service: &dyn ReviewService,
    ) -> anyhow::Result<()> {
        match self {
            Self::Stack(args) => args.run(ctx, service).await,
            Self::Update(args) => args.run(ctx),
            Self::Sandbox(args) => args.run(ctx),
        }
    }
}
