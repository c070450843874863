//! `sandbox` subcommand.

use crate::{ctx::StkContext, errors::StkResult, git::RepositoryExt};
use anyhow::Result;
use clap::{Args, ValueEnum};
use nu_ansi_term::Color::Blue;
use std::env;
use tracing::info;

/// The scratch stacks that `stk sandbox` can build.
#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
pub enum Scenario {
    /// Delete every scratch branch.
    Clean,
    /// A split stack whose second child gained a commit, so it needs a restack.
    TidyStack,
    /// A split stack whose first child was rebased onto upstream by hand.
    TidyRebase,
    /// A split stack based one commit behind upstream.
    OldStack,
    /// A split stack whose tip has two unsplit commits.
    IncompleteStack,
}

/// CLI arguments for the `sandbox` subcommand.
#[derive(Debug, Clone, Eq, PartialEq, Args)]
pub struct SandboxCmd {
    /// The scenario to build.
    #[arg(value_enum, default_value_t = Scenario::TidyStack)]
    pub scenario: Scenario,
}

impl SandboxCmd {
    /// Run the `sandbox` subcommand.
    pub fn run(self, mut ctx: StkContext<'_>) -> Result<()> {
        ctx.repository.ensure_ready_for_mutation()?;
        let user = env::var("USER").unwrap_or_else(|_| "stk".to_string());
        let name = format!("{user}-TEST");
        let upstream = ctx.upstream.branch.clone();
        let behind = format!("{upstream}^");
        let repo = ctx.repository;

        match self.scenario {
            Scenario::Clean => {
                repo.checkout_branch(&upstream)?;
                for branch in repo.local_branch_names()? {
                    if branch.starts_with(&name) {
                        repo.git(&["branch", "--quiet", "-D", &branch])?;
                        println!("Deleted `{}`.", Blue.paint(branch));
                    }
                }
                return Ok(());
            }
            Scenario::TidyStack => {
                split_scratch(&mut ctx, &name, &upstream, 3)?;
                repo.checkout_branch(&format!("{name}-2"))?;
                commit(&ctx, "Fix up a PR")?;
                repo.checkout_branch(&name)?;
            }
            Scenario::TidyRebase => {
                split_scratch(&mut ctx, &name, &behind, 3)?;
                repo.checkout_branch(&format!("{name}-1"))?;
                repo.git(&["rebase", "--quiet", &upstream])?;
                repo.checkout_branch(&name)?;
            }
            Scenario::OldStack => {
                split_scratch(&mut ctx, &name, &behind, 3)?;
            }
            Scenario::IncompleteStack => {
                split_scratch(&mut ctx, &name, &behind, 2)?;
                commit(&ctx, "Test commit 3")?;
                commit(&ctx, "Test commit 4")?;
            }
        }

        println!("Built sandbox stack `{}`.", Blue.paint(&name));
        Ok(())
    }
}

/// Creates `name` at `start` with `commits` empty commits and splits it into children.
fn split_scratch(ctx: &mut StkContext<'_>, name: &str, start: &str, commits: usize) -> StkResult<()> {
    ctx.repository
        .git(&["checkout", "--quiet", "-b", name, start])?;
    for i in 1..=commits {
        commit(ctx, &format!("Test commit {i}"))?;
    }

    let mut stack = ctx.get_stack(name)?;
    let created = ctx.create_children(&mut stack)?;
    info!(stack = name, created = ?created, "Split sandbox stack");
    Ok(())
}

fn commit(ctx: &StkContext<'_>, message: &str) -> StkResult<()> {
    ctx.repository
        .git(&["commit", "--quiet", "--allow-empty", "-m", message])
        .map(|_| ())
}
