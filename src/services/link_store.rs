//! Link store: keyed upsert and filtered removal over extension fields.
//!
//! Every operation is a read-modify-write of a whole list field on a record
//! or on the account. With optimistic writes enabled the write is
//! conditional on the version read, and a conflicting concurrent write
//! causes the read/transform to be retried. With optimistic writes disabled
//! the last writer wins and a concurrent update to the same field can be
//! lost.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    account_pr_id, AccountPrEntry, BranchLink, LinkStoreSettings, LinkablePullRequest,
    ListEntry, PrLink, RecordRef,
};
use crate::domain::ports::{ExtensionFieldStore, FieldOwner, WriteCondition};

/// Field holding linked pull requests (records) or PR entries (account).
pub const PULL_REQUESTS_FIELD: &str = "pullRequests";
/// Field holding linked branches on records.
pub const BRANCHES_FIELD: &str = "branches";

/// Replace the entry with the same id in place, or append it.
pub fn upsert<T: ListEntry>(mut list: Vec<T>, entry: T) -> Vec<T> {
    match list
        .iter()
        .position(|item| item.entry_id() == entry.entry_id())
    {
        Some(index) => list[index] = entry,
        None => list.push(entry),
    }
    list
}

/// Link persistence over an [`ExtensionFieldStore`].
pub struct LinkStore {
    store: Arc<dyn ExtensionFieldStore>,
    namespace: String,
    settings: LinkStoreSettings,
}

impl LinkStore {
    pub fn new(store: Arc<dyn ExtensionFieldStore>, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
            settings: LinkStoreSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: LinkStoreSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn read<T: DeserializeOwned>(
        &self,
        owner: &FieldOwner,
        field: &str,
    ) -> DomainResult<(Option<T>, u64)> {
        match self.store.get_field(owner, &self.namespace, field).await? {
            None => Ok((None, 0)),
            Some(stored) if stored.value.is_null() => Ok((None, stored.version)),
            Some(stored) => Ok((Some(serde_json::from_value(stored.value)?), stored.version)),
        }
    }

    async fn read_list<T: ListEntry>(&self, owner: &FieldOwner, field: &str) -> DomainResult<Vec<T>> {
        let (list, _) = self.read::<Vec<T>>(owner, field).await?;
        Ok(list.unwrap_or_default())
    }

    /// Read a field, apply an asynchronous transform, and write the result.
    ///
    /// The transform may run more than once when optimistic writes retry
    /// after a conflict. Returns the value that was written.
    pub async fn replace_field_with<T, F, Fut>(
        &self,
        owner: &FieldOwner,
        field: &str,
        mut transform: F,
    ) -> DomainResult<T>
    where
        T: Serialize + DeserializeOwned + Send,
        F: FnMut(Option<T>) -> Fut + Send,
        Fut: Future<Output = DomainResult<T>> + Send,
    {
        let max_attempts = if self.settings.optimistic_writes {
            self.settings.max_write_attempts.max(1)
        } else {
            1
        };

        let mut attempt = 1;
        loop {
            let (current, version) = self.read::<T>(owner, field).await?;
            let next = transform(current).await?;
            let value = serde_json::to_value(&next)?;
            let condition = if self.settings.optimistic_writes {
                WriteCondition::IfVersion(version)
            } else {
                WriteCondition::Always
            };

            match self
                .store
                .set_field(owner, &self.namespace, field, value, condition)
                .await
            {
                Ok(_) => return Ok(next),
                Err(DomainError::ConcurrencyConflict { .. }) if attempt < max_attempts => {
                    debug!(owner = %owner, field, attempt, "Field changed during update, retrying");
                    attempt += 1;
                }
                Err(e) => {
                    if matches!(e, DomainError::ConcurrencyConflict { .. }) {
                        warn!(owner = %owner, field, attempts = attempt, "Giving up on contended field");
                    }
                    return Err(e);
                }
            }
        }
    }

    /// Synchronous-transform form of [`replace_field_with`](Self::replace_field_with).
    pub async fn replace_field<T, F>(&self, owner: &FieldOwner, field: &str, mut transform: F) -> DomainResult<T>
    where
        T: Serialize + DeserializeOwned + Send,
        F: FnMut(Option<T>) -> T + Send,
    {
        self.replace_field_with(owner, field, |current| {
            std::future::ready(Ok(transform(current)))
        })
        .await
    }

    /// Upsert `new_value` into the list stored in `field`, keyed by entry id.
    pub async fn append_field<T: ListEntry>(
        &self,
        owner: &FieldOwner,
        field: &str,
        new_value: T,
    ) -> DomainResult<()> {
        info!(owner = %owner, field, "Linking entry");

        self.replace_field(owner, field, |current: Option<Vec<T>>| {
            upsert(current.unwrap_or_default(), new_value.clone())
        })
        .await?;
        Ok(())
    }

    /// Empty a list field. Returns the entries held by the version that was
    /// overwritten.
    async fn clear_field<T: ListEntry>(&self, owner: &FieldOwner, field: &str) -> DomainResult<Vec<T>> {
        let mut cleared = Vec::new();
        self.replace_field(owner, field, |current: Option<Vec<T>>| {
            cleared = current.unwrap_or_default();
            Vec::new()
        })
        .await?;
        Ok(cleared)
    }

    /// Link a pull request to a record, mirror it into the account list,
    /// and link the PR's head branch when known.
    pub async fn link_pull_request_to_record(
        &self,
        pr: &LinkablePullRequest,
        record: &RecordRef,
    ) -> DomainResult<()> {
        let owner = FieldOwner::from(record);

        self.append_field(&owner, PULL_REQUESTS_FIELD, pr.to_pr_link())
            .await?;
        self.append_field(
            &FieldOwner::Account,
            PULL_REQUESTS_FIELD,
            AccountPrEntry::new(pr.number, record),
        )
        .await?;

        match pr.head_branch_link() {
            Some(branch) => self.append_field(&owner, BRANCHES_FIELD, branch).await?,
            None => {
                if let Some(branch) = &pr.head_branch {
                    debug!(pr = pr.number, branch = %branch, "No repository URL, skipping branch link");
                }
            }
        }

        Ok(())
    }

    /// Link a branch to a record.
    pub async fn link_branch_to_record(
        &self,
        branch_name: &str,
        repo_url: &str,
        record: &RecordRef,
    ) -> DomainResult<()> {
        self.append_field(
            &FieldOwner::from(record),
            BRANCHES_FIELD,
            BranchLink::new(branch_name, repo_url),
        )
        .await
    }

    /// Remove one pull request from a record and its account entry.
    pub async fn unlink_pull_request(&self, record: &RecordRef, number: u64) -> DomainResult<()> {
        self.replace_field(
            &FieldOwner::from(record),
            PULL_REQUESTS_FIELD,
            |prs: Option<Vec<PrLink>>| {
                prs.unwrap_or_default()
                    .into_iter()
                    .filter(|pr| pr.id != number)
                    .collect::<Vec<_>>()
            },
        )
        .await?;

        let account_id = account_pr_id(number, &record.reference_num);
        self.replace_field(
            &FieldOwner::Account,
            PULL_REQUESTS_FIELD,
            |entries: Option<Vec<AccountPrEntry>>| {
                entries
                    .unwrap_or_default()
                    .into_iter()
                    .filter(|entry| entry.id != account_id)
                    .collect::<Vec<_>>()
            },
        )
        .await?;

        info!(record = %record, pr = number, "Unlinked pull request");
        Ok(())
    }

    /// Remove every pull request from a record, along with the matching
    /// account entries.
    ///
    /// The account entries removed are derived from the PR list the clear
    /// actually overwrote, so a PR linked while the clear retries is not left
    /// behind on the account.
    pub async fn unlink_pull_requests(&self, record: &RecordRef) -> DomainResult<()> {
        let prs: Vec<PrLink> = self
            .clear_field(&FieldOwner::from(record), PULL_REQUESTS_FIELD)
            .await?;
        let ids: HashSet<String> = prs
            .iter()
            .map(|pr| account_pr_id(pr.id, &record.reference_num))
            .collect();

        self.replace_field(
            &FieldOwner::Account,
            PULL_REQUESTS_FIELD,
            |entries: Option<Vec<AccountPrEntry>>| {
                entries
                    .unwrap_or_default()
                    .into_iter()
                    .filter(|entry| !ids.contains(&entry.id))
                    .collect::<Vec<_>>()
            },
        )
        .await?;

        info!(record = %record, count = prs.len(), "Unlinked all pull requests");
        Ok(())
    }

    /// Remove every branch from a record.
    pub async fn unlink_branches(&self, record: &RecordRef) -> DomainResult<()> {
        self.clear_field::<BranchLink>(&FieldOwner::from(record), BRANCHES_FIELD)
            .await?;
        Ok(())
    }

    /// Pull requests linked to a record.
    pub async fn pull_requests(&self, record: &RecordRef) -> DomainResult<Vec<PrLink>> {
        self.read_list(&FieldOwner::from(record), PULL_REQUESTS_FIELD)
            .await
    }

    /// Branches linked to a record.
    pub async fn branches(&self, record: &RecordRef) -> DomainResult<Vec<BranchLink>> {
        self.read_list(&FieldOwner::from(record), BRANCHES_FIELD)
            .await
    }

    /// All account-level pull request entries.
    pub async fn all_prs(&self) -> DomainResult<Vec<AccountPrEntry>> {
        self.read_list(&FieldOwner::Account, PULL_REQUESTS_FIELD)
            .await
    }
}
