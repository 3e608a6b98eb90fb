//! Moving the anonymous wishlist into the account at sign-in.

use std::str::FromStr;

use futures::future::join_all;
use nectar_core::ProductId;
use tracing::{info, instrument, warn};

use crate::remote::RemoteWishlist;

/// What to do with ids whose add failed during a merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MergePolicy {
    /// Write failed ids back to the local slot; the next sign-in retries them.
    #[default]
    RetainFailed,
    /// Clear the local slot regardless of failures.
    DiscardFailed,
}

impl FromStr for MergePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "retain" | "retain-failed" => Ok(Self::RetainFailed),
            "discard" | "discard-failed" => Ok(Self::DiscardFailed),
            other => Err(format!("unknown merge policy {other:?} (expected retain or discard)")),
        }
    }
}

/// Outcome of one merge batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Ids the server accepted (including ones it already had).
    pub succeeded: Vec<ProductId>,
    /// Ids whose add failed.
    pub failed: Vec<ProductId>,
}

impl MergeReport {
    /// Whether every id reached the server.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

/// Add every id in `snapshot` to the account, concurrently.
///
/// All adds run to completion; a failure does not cancel the others. Adds
/// are idempotent on the server, so ids the account already holds count as
/// succeeded.
#[instrument(skip_all, fields(count = snapshot.len()))]
pub async fn merge_into<R: RemoteWishlist>(remote: &R, snapshot: &[ProductId]) -> MergeReport {
    let results = join_all(
        snapshot
            .iter()
            .map(|id| async move { (id, remote.add(id).await) }),
    )
    .await;

    let mut report = MergeReport::default();
    for (id, result) in results {
        match result {
            Ok(()) => report.succeeded.push(id.clone()),
            Err(e) => {
                warn!(product_id = %id, error = %e, "Failed to merge wishlist item");
                report.failed.push(id.clone());
            }
        }
    }

    info!(
        succeeded = report.succeeded.len(),
        failed = report.failed.len(),
        "Wishlist merge finished"
    );
    report
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::{MemoryRemote, pid};

    #[tokio::test]
    async fn test_merge_is_a_union() {
        let remote = MemoryRemote::with_ids(["A", "B"]);

        let report = merge_into(&remote, &[pid("B"), pid("C")]).await;

        assert!(report.is_complete());
        assert_eq!(report.total(), 2);
        let mut ids = remote.ids();
        ids.sort();
        assert_eq!(ids, vec![pid("A"), pid("B"), pid("C")]);
    }

    #[tokio::test]
    async fn test_adds_run_concurrently() {
        let remote = MemoryRemote::with_ids(["p2", "p3"]);

        merge_into(&remote, &[pid("p1"), pid("p2")]).await;

        assert_eq!(remote.add_calls(), vec![pid("p1"), pid("p2")]);
        assert_eq!(remote.max_concurrent_adds(), 2);
    }

    #[tokio::test]
    async fn test_one_failure_does_not_abort_the_rest() {
        let remote = MemoryRemote::default();
        remote.fail_add(&pid("p2"), "Product unavailable");

        let report = merge_into(&remote, &[pid("p1"), pid("p2"), pid("p3")]).await;

        assert_eq!(report.succeeded, vec![pid("p1"), pid("p3")]);
        assert_eq!(report.failed, vec![pid("p2")]);
        assert_eq!(remote.ids(), vec![pid("p1"), pid("p3")]);
    }

    #[tokio::test]
    async fn test_empty_snapshot_sends_nothing() {
        let remote = MemoryRemote::default();
        let report = merge_into(&remote, &[]).await;
        assert_eq!(report.total(), 0);
        assert!(remote.add_calls().is_empty());
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("retain".parse::<MergePolicy>().unwrap(), MergePolicy::RetainFailed);
        assert_eq!(
            "Discard-Failed".parse::<MergePolicy>().unwrap(),
            MergePolicy::DiscardFailed
        );
        assert!("keep".parse::<MergePolicy>().is_err());
    }
}
