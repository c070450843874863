//! In-memory [ReviewService] that records every remote write.

use super::{NewPullRequest, PullRequest, RawPullRequest, ReviewService};
use crate::errors::{StkError, StkResult};
use async_trait::async_trait;
use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Mutex,
    },
};

/// A remote write observed by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Write {
    Create { head: String, base: String, title: String, draft: bool },
    EditTitle { number: u64, title: String },
    EditBody { number: u64, body: String },
    SetDraft { number: u64, is_draft: bool },
}

/// A review service backed by a map of pull requests.
#[derive(Debug)]
pub(crate) struct MockReviewService {
    next_number: AtomicU64,
    prs: Mutex<BTreeMap<u64, RawPullRequest>>,
    writes: Mutex<Vec<Write>>,
    offline: AtomicBool,
}

impl Default for MockReviewService {
    fn default() -> Self {
        Self {
            next_number: AtomicU64::new(101),
            prs: Mutex::new(BTreeMap::new()),
            writes: Mutex::new(Vec::new()),
            offline: AtomicBool::new(false),
        }
    }
}

impl MockReviewService {
    /// Makes every subsequent call fail as if the network were down.
    pub(crate) fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    /// Seeds an existing pull request without recording a write.
    pub(crate) fn insert(&self, number: u64, head: &str, title: &str, body: &str, is_draft: bool) {
        self.prs.lock().unwrap().insert(
            number,
            RawPullRequest {
                number,
                title: title.to_string(),
                body: body.to_string(),
                url: format!("https://example.com/pull/{number}"),
                head_ref_name: head.to_string(),
                is_draft,
            },
        );
    }

    /// Returns the stored pull request with the given number.
    pub(crate) fn get(&self, number: u64) -> Option<PullRequest> {
        let raw = self.prs.lock().unwrap().get(&number).cloned()?;
        raw.try_into().ok()
    }

    /// Returns every recorded write.
    pub(crate) fn writes(&self) -> Vec<Write> {
        self.writes.lock().unwrap().clone()
    }

    /// Returns the number of recorded writes.
    pub(crate) fn write_count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }

    fn check_online(&self) -> StkResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StkError::RemoteService("network unreachable".to_string()));
        }
        Ok(())
    }

    fn update(&self, number: u64, f: impl FnOnce(&mut RawPullRequest)) -> StkResult<()> {
        let mut prs = self.prs.lock().unwrap();
        let pr = prs
            .get_mut(&number)
            .ok_or_else(|| StkError::RemoteService(format!("no pull request #{number}")))?;
        f(pr);
        Ok(())
    }
}

#[async_trait]
impl ReviewService for MockReviewService {
    async fn auth_status(&self) -> StkResult<()> {
        self.check_online()
    }

    async fn find_by_branch(&self, branch: &str) -> StkResult<Option<PullRequest>> {
        self.check_online()?;
        let raw = self
            .prs
            .lock()
            .unwrap()
            .values()
            .rev()
            .find(|pr| pr.head_ref_name == branch)
            .cloned();
        raw.map(PullRequest::try_from).transpose()
    }

    async fn view(&self, number: u64) -> StkResult<PullRequest> {
        self.check_online()?;
        let raw = self.prs.lock().unwrap().get(&number).cloned();
        raw.ok_or_else(|| StkError::RemoteService(format!("no pull request #{number}")))?
            .try_into()
    }

    async fn create(&self, pr: &NewPullRequest) -> StkResult<PullRequest> {
        self.check_online()?;
        let number = self.next_number.fetch_add(1, Ordering::SeqCst);
        self.insert(number, &pr.head, &pr.title, &pr.body, pr.draft);
        self.writes.lock().unwrap().push(Write::Create {
            head: pr.head.clone(),
            base: pr.base.clone(),
            title: pr.title.clone(),
            draft: pr.draft,
        });
        self.view(number).await
    }

    async fn edit_title(&self, number: u64, title: &str) -> StkResult<()> {
        self.check_online()?;
        self.update(number, |pr| pr.title = title.to_string())?;
        self.writes.lock().unwrap().push(Write::EditTitle {
            number,
            title: title.to_string(),
        });
        Ok(())
    }

    async fn edit_body(&self, number: u64, body: &str) -> StkResult<()> {
        self.check_online()?;
        self.update(number, |pr| pr.body = body.to_string())?;
        self.writes.lock().unwrap().push(Write::EditBody {
            number,
            body: body.to_string(),
        });
        Ok(())
    }

    async fn set_draft(&self, number: u64, is_draft: bool) -> StkResult<()> {
        self.check_online()?;
        self.update(number, |pr| pr.is_draft = is_draft)?;
        self.writes
            .lock()
            .unwrap()
            .push(Write::SetDraft { number, is_draft });
        Ok(())
    }
}
