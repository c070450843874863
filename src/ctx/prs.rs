//! Keeping one pull request per child in sync with the shape of the stack.

use super::{local_ref, StkContext};
use crate::{
    constants::{TABLE_COLUMNS, WIP_MARKER},
    errors::StkResult,
    git::RepositoryExt,
    review::{
        table::{make_table, parse_pr_table},
        title::StackTitle,
        NewPullRequest, ReviewService,
    },
    stack::{Child, Stack},
};
use std::collections::BTreeMap;
use tracing::{debug, info};

impl StkContext<'_> {
    /// Attaches the pull request of every child, placeholders included.
    ///
    /// Children whose pull request is not found by branch (e.g. because the branch was deleted
    /// after merging) are backfilled from the navigation table of any pull request that was.
    pub async fn load_prs<S: ReviewService + ?Sized>(
        &self,
        stack: &mut Stack,
        service: &S,
    ) -> StkResult<()> {
        for child in stack.children_mut() {
            child.pull_request = service.find_by_branch(&child.branch()).await?;
        }

        loop {
            let known = stack
                .children()
                .iter()
                .filter_map(|c| c.pull_request.as_ref())
                .flat_map(|pr| parse_pr_table(&pr.table))
                .collect::<BTreeMap<_, _>>();

            let mut backfilled = false;
            for child in stack
                .children_mut()
                .iter_mut()
                .filter(|c| c.pull_request.is_none())
            {
                if let Some(number) = known.get(&child.index) {
                    debug!(branch = %child.branch(), number, "Backfilling pull request from table");
                    child.pull_request = Some(service.view(*number).await?);
                    backfilled = true;
                }
            }

            if !backfilled {
                return Ok(());
            }
        }
    }

    /// Opens a pull request for every unmerged child up to and including `before` that has none.
    ///
    /// Each pull request targets the previous unmerged child, or the upstream branch for the
    /// first one. Branches without a remote counterpart are pushed first.
    ///
    /// ## Returns
    /// The branches that got a new pull request.
    pub async fn create_prs<S: ReviewService + ?Sized>(
        &self,
        stack: &mut Stack,
        service: &S,
        before: Option<u32>,
    ) -> StkResult<Vec<String>> {
        let repo = self.repository;
        let total = stack.len() as u32;
        let body = self.config.pr_body_template(repo.workdir());
        let draft = self.config.draft;

        let mut base = self.upstream.branch.clone();
        let mut created = Vec::new();
        for child in stack
            .children_mut()
            .iter_mut()
            .filter(|c| !c.is_merged)
            .take_while(|c| before.map_or(true, |b| c.index <= b))
        {
            let branch = child.branch();
            if child.pull_request.is_none() {
                if !repo.remote_branch_exists(&self.config.remote, &branch) {
                    self.push_branch(&branch, false)?;
                }

                let summary = repo.commit_summary(&local_ref(&branch))?;
                let pr = service
                    .create(&NewPullRequest {
                        head: branch.clone(),
                        base: base.clone(),
                        title: StackTitle::encode(child.index, total, draft, &summary),
                        body: body.clone(),
                        draft,
                    })
                    .await?;

                info!(number = pr.number, url = %pr.url, branch, base, "Opened pull request");
                child.pull_request = Some(pr);
                created.push(branch.clone());
            }
            base = branch;
        }

        Ok(created)
    }

    /// Rewrites every pull request's title position and navigation table.
    ///
    /// Only differing titles and tables are written, so a second call without intervening
    /// changes performs no remote writes.
    ///
    /// ## Returns
    /// The branches whose pull request changed.
    pub async fn update_prs<S: ReviewService + ?Sized>(
        &self,
        stack: &mut Stack,
        service: &S,
    ) -> StkResult<Vec<String>> {
        let total = stack.len() as u32;
        let mut changed = Vec::new();

        for child in stack.children_mut() {
            let index = child.index;
            let branch = child.branch();
            if let Some(pr) = child.pull_request.as_mut() {
                if pr.set_title(service, index, total).await?.is_changed() {
                    changed.push(branch);
                }
            }
        }

        let tables = stack
            .children()
            .iter()
            .map(|c| {
                c.pull_request
                    .as_ref()
                    .map(|pr| make_stack_table(stack.children(), pr.number))
            })
            .collect::<Vec<_>>();
        for (child, table) in stack.children_mut().iter_mut().zip(tables) {
            let branch = child.branch();
            let (Some(pr), Some(table)) = (child.pull_request.as_mut(), table) else {
                continue;
            };
            if pr.set_table(service, &table).await?.is_changed() && !changed.contains(&branch) {
                changed.push(branch);
            }
        }

        Ok(changed)
    }

    /// Marks the pull requests of the unmerged children up to and including `before` as draft or
    /// ready for review, then refreshes titles and tables.
    ///
    /// ## Returns
    /// The branches whose pull request changed.
    pub async fn publish<S: ReviewService + ?Sized>(
        &self,
        stack: &mut Stack,
        service: &S,
        before: Option<u32>,
        is_draft: bool,
    ) -> StkResult<Vec<String>> {
        let mut changed = Vec::new();
        for child in stack
            .children_mut()
            .iter_mut()
            .filter(|c| !c.is_merged)
            .take_while(|c| before.map_or(true, |b| c.index <= b))
        {
            let branch = child.branch();
            if let Some(pr) = child.pull_request.as_mut() {
                if pr.set_draft(service, is_draft).await?.is_changed() {
                    changed.push(branch);
                }
            }
        }

        for branch in self.update_prs(stack, service).await? {
            if !changed.contains(&branch) {
                changed.push(branch);
            }
        }
        Ok(changed)
    }
}

/// Renders the navigation table embedded in the pull request `current`.
///
/// There is one row per child with a pull request: its position, `#N` (or `>N` for `current`
/// itself) and its title, prefixed with the draft marker.
pub(crate) fn make_stack_table(children: &[Child], current: u64) -> String {
    let rows = children
        .iter()
        .filter_map(|c| {
            let pr = c.pull_request.as_ref()?;
            let marker = if pr.number == current { '>' } else { '#' };
            let title = if pr.is_draft {
                format!("{WIP_MARKER} {}", pr.title)
            } else {
                pr.title.clone()
            };
            Some(vec![c.index.to_string(), format!("{marker}{}", pr.number), title])
        })
        .collect::<Vec<_>>();

    make_table(&TABLE_COLUMNS, &rows)
}
