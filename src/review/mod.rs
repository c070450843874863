//! Review requests (pull requests) and the service that hosts them.

use crate::errors::{StkError, StkResult};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

mod gh;
pub use gh::GhCli;

pub mod table;
pub mod title;
use table::{compose_body, split_body};
use title::StackTitle;

#[cfg(test)]
pub(crate) mod mock;

/// The outcome of a command that may or may not have to write to the review service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    /// The remote state was updated.
    Changed,
    /// The remote state already matched; nothing was written.
    Unchanged,
}

impl Change {
    /// Returns `true` for [Change::Changed].
    pub fn is_changed(self) -> bool {
        matches!(self, Self::Changed)
    }
}

/// A pull request as returned by the review service, before validation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPullRequest {
    pub number: u64,
    pub title: String,
    pub body: String,
    pub url: String,
    pub head_ref_name: String,
    pub is_draft: bool,
}

/// A validated pull request for one child of a stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    /// The pull request number.
    pub number: u64,
    /// The title exactly as stored remotely.
    pub raw_title: String,
    /// The user-written title, without position prefix or draft marker.
    pub title: String,
    /// The body exactly as stored remotely.
    pub raw_body: String,
    /// The leading navigation table of the body.
    pub table: String,
    /// The remainder of the body after the table.
    pub body: String,
    /// The web URL of the pull request.
    pub url: String,
    /// The branch the pull request merges from.
    pub head_ref_name: String,
    /// Whether the pull request is a draft.
    pub is_draft: bool,
}

impl TryFrom<RawPullRequest> for PullRequest {
    type Error = StkError;

    fn try_from(raw: RawPullRequest) -> StkResult<Self> {
        if raw.number == 0 {
            return Err(StkError::MalformedPullRequest(format!(
                "pull request for `{}` has number 0",
                raw.head_ref_name
            )));
        }
        let decoded = StackTitle::decode(&raw.title, raw.is_draft).ok_or_else(|| {
            StkError::MalformedPullRequest(format!(
                "title of #{} does not decode: {:?}",
                raw.number, raw.title
            ))
        })?;
        let (table, body) = split_body(&raw.body);
        let body = body.to_string();

        Ok(Self {
            number: raw.number,
            raw_title: raw.title,
            title: decoded.title,
            raw_body: raw.body,
            table,
            body,
            url: raw.url,
            head_ref_name: raw.head_ref_name,
            is_draft: raw.is_draft,
        })
    }
}

impl PullRequest {
    /// Decodes a pull request from the JSON the review service returns.
    pub fn from_json(json: &str) -> StkResult<Self> {
        serde_json::from_str::<RawPullRequest>(json)
            .map_err(|e| StkError::MalformedPullRequest(e.to_string()))?
            .try_into()
    }

    /// Sets the title to `[index/total] [WIP: ]<title>`, writing only if it differs.
    pub async fn set_title<S: ReviewService + ?Sized>(
        &mut self,
        service: &S,
        index: u32,
        total: u32,
    ) -> StkResult<Change> {
        let new_title = StackTitle::encode(index, total, self.is_draft, &self.title);
        if new_title == self.raw_title {
            return Ok(Change::Unchanged);
        }

        info!(number = self.number, title = %new_title, "Updating pull request title");
        service.edit_title(self.number, &new_title).await?;
        self.raw_title = new_title;
        Ok(Change::Changed)
    }

    /// Replaces the navigation table at the top of the body, writing only if it differs.
    pub async fn set_table<S: ReviewService + ?Sized>(
        &mut self,
        service: &S,
        table: &str,
    ) -> StkResult<Change> {
        if table == self.table {
            return Ok(Change::Unchanged);
        }

        let new_body = compose_body(table, &self.body);
        info!(number = self.number, "Updating pull request navigation table");
        service.edit_body(self.number, &new_body).await?;
        self.raw_body = new_body;
        self.table = table.to_string();
        Ok(Change::Changed)
    }

    /// Marks the pull request as draft or ready for review, writing only if the state differs.
    pub async fn set_draft<S: ReviewService + ?Sized>(
        &mut self,
        service: &S,
        is_draft: bool,
    ) -> StkResult<Change> {
        if is_draft == self.is_draft {
            return Ok(Change::Unchanged);
        }

        info!(number = self.number, is_draft, "Changing pull request draft state");
        service.set_draft(self.number, is_draft).await?;
        self.is_draft = is_draft;
        Ok(Change::Changed)
    }
}

/// Parameters for opening a new pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPullRequest {
    /// The branch to merge from.
    pub head: String,
    /// The branch to merge into.
    pub base: String,
    /// The encoded title.
    pub title: String,
    /// The initial body.
    pub body: String,
    /// Whether to open the pull request as a draft.
    pub draft: bool,
}

/// The command surface of a code review service.
///
/// Every call is a blocking round trip from the caller's point of view and is never retried; a
/// failure aborts the current command.
#[async_trait]
pub trait ReviewService: Send + Sync {
    /// Fails with [StkError::RemoteService] if the user is not authenticated.
    async fn auth_status(&self) -> StkResult<()>;

    /// Finds the most recent pull request whose head is `branch`, in any state.
    async fn find_by_branch(&self, branch: &str) -> StkResult<Option<PullRequest>>;

    /// Fetches a pull request by number.
    async fn view(&self, number: u64) -> StkResult<PullRequest>;

    /// Opens a pull request and returns it.
    async fn create(&self, pr: &NewPullRequest) -> StkResult<PullRequest>;

    /// Replaces the title of a pull request.
    async fn edit_title(&self, number: u64, title: &str) -> StkResult<()>;

    /// Replaces the body of a pull request.
    async fn edit_body(&self, number: u64, body: &str) -> StkResult<()>;

    /// Marks a pull request as draft or ready for review.
    async fn set_draft(&self, number: u64, is_draft: bool) -> StkResult<()>;
}

#[cfg(test)]
mod test {
    use super::{mock::MockReviewService, Change, PullRequest};

    const JSON: &str = r#"{
        "number": 102,
        "title": "[2/3] WIP: Fix bug",
        "body": "| | PR |\r\n| - | -- |\r\n\r\nDetails here",
        "url": "https://github.com/o/r/pull/102",
        "headRefName": "feat-2",
        "isDraft": true
    }"#;

    #[test]
    fn decodes_service_json() {
        let pr = PullRequest::from_json(JSON).unwrap();
        assert_eq!(pr.number, 102);
        assert_eq!(pr.title, "Fix bug");
        assert_eq!(pr.table, "| | PR |\n| - | -- |");
        assert_eq!(pr.body, "\r\nDetails here");
        assert_eq!(pr.head_ref_name, "feat-2");
        assert!(pr.is_draft);
    }

    #[test]
    fn rejects_missing_fields() {
        let err = PullRequest::from_json(r#"{"number": 1, "title": "x"}"#).unwrap_err();
        assert!(err.is_remote());
    }

    #[test]
    fn rejects_zero_number() {
        let json = JSON.replace("102,", "0,");
        assert!(PullRequest::from_json(&json).is_err());
    }

    #[tokio::test]
    async fn setters_only_write_on_change() {
        let service = MockReviewService::default();
        service.insert(
            102,
            "feat-2",
            "[2/3] WIP: Fix bug",
            "| | PR |\r\n| - | -- |\r\n\r\nDetails here",
            true,
        );
        let mut pr = PullRequest::from_json(JSON).unwrap();

        assert_eq!(pr.set_title(&service, 2, 3).await.unwrap(), Change::Unchanged);
        assert_eq!(pr.set_draft(&service, true).await.unwrap(), Change::Unchanged);
        assert_eq!(service.write_count(), 0);

        assert_eq!(pr.set_title(&service, 2, 4).await.unwrap(), Change::Changed);
        assert_eq!(pr.raw_title, "[2/4] WIP: Fix bug");
        assert_eq!(pr.set_draft(&service, false).await.unwrap(), Change::Changed);
        assert!(!pr.is_draft);
        assert_eq!(service.write_count(), 2);

        assert_eq!(pr.set_table(&service, "| new |").await.unwrap(), Change::Changed);
        assert_eq!(pr.raw_body, "| new |\n\r\nDetails here");
        assert_eq!(pr.set_table(&service, "| new |").await.unwrap(), Change::Unchanged);
        assert_eq!(service.write_count(), 3);
    }
}
