//! Concurrent repository fetching
//!
//! A content view can reference hundreds of repositories; fetching them one
//! by one dominates the runtime of a publish decision. This module fans the
//! GETs out over a bounded pool of workers and joins them all before the
//! decision engine runs. Completion order does not matter, but a single
//! failed fetch fails the whole batch; the decision engine never sees a
//! partial repository set.

use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::core::error::SatelliteError;
use crate::katello::client::KatelloApi;
use crate::katello::entities::Repository;

/// Fetch every repository in `repository_ids`, at most `workers` in flight
pub async fn fetch_repositories<A: KatelloApi + 'static>(
    api: Arc<A>,
    repository_ids: &[u64],
    workers: usize,
) -> Result<Vec<Repository>, SatelliteError> {
    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let mut handles = Vec::with_capacity(repository_ids.len());

    for &id in repository_ids {
        let semaphore = Arc::clone(&semaphore);
        let api = Arc::clone(&api);

        handles.push(tokio::spawn(async move {
            let _permit = semaphore.acquire().await.unwrap();
            debug!("fetching repository {}", id);
            api.repository(id).await
        }));
    }

    let mut repositories = Vec::with_capacity(handles.len());
    for handle in handles {
        // A join error means the fetch task panicked; propagate it.
        repositories.push(handle.await.expect("repository fetch task panicked")?);
    }

    Ok(repositories)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::katello::entities::{
        ContentView, ContentViewVersion, Product, PromoteRequest, PublishRequest,
        PublishResponse,
    };

    fn repository(id: u64) -> Repository {
        Repository {
            id,
            name: format!("repo-{}", id),
            product: Product { sync_plan: None },
            last_sync: None,
        }
    }

    struct MockApi {
        repositories: HashMap<u64, Repository>,
        failing_id: Option<u64>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl MockApi {
        fn new(ids: &[u64]) -> Self {
            Self {
                repositories: ids.iter().map(|&id| (id, repository(id))).collect(),
                failing_id: None,
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl KatelloApi for MockApi {
        async fn repository(&self, id: u64) -> Result<Repository, SatelliteError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.failing_id == Some(id) {
                return Err(SatelliteError::Remote {
                    status: 500,
                    message: "Internal Server Error".to_string(),
                });
            }
            Ok(self.repositories.get(&id).unwrap().clone())
        }

        async fn content_view(&self, _id: u64) -> Result<ContentView, SatelliteError> {
            unimplemented!()
        }

        async fn content_view_version(
            &self,
            _id: u64,
        ) -> Result<ContentViewVersion, SatelliteError> {
            unimplemented!()
        }

        async fn publish_content_view(
            &self,
            _content_view_id: u64,
            _request: &PublishRequest,
        ) -> Result<PublishResponse, SatelliteError> {
            unimplemented!()
        }

        async fn promote_version(
            &self,
            _version_id: u64,
            _request: &PromoteRequest,
        ) -> Result<(), SatelliteError> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn test_fetches_all_repositories() {
        let ids: Vec<u64> = (1..=25).collect();
        let api = Arc::new(MockApi::new(&ids));

        let mut repos = fetch_repositories(api, &ids, 10).await.unwrap();
        repos.sort_by_key(|r| r.id);

        assert_eq!(repos.len(), 25);
        assert_eq!(repos[0].id, 1);
        assert_eq!(repos[24].id, 25);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let ids: Vec<u64> = (1..=20).collect();
        let api = Arc::new(MockApi::new(&ids));

        fetch_repositories(Arc::clone(&api), &ids, 4).await.unwrap();

        assert!(api.max_in_flight.load(Ordering::SeqCst) <= 4);
    }

    #[tokio::test]
    async fn test_single_failure_fails_the_batch() {
        let ids: Vec<u64> = (1..=5).collect();
        let mut api = MockApi::new(&ids);
        api.failing_id = Some(3);

        let result = fetch_repositories(Arc::new(api), &ids, 10).await;

        match result {
            Err(SatelliteError::Remote { status, .. }) => assert_eq!(status, 500),
            other => panic!("expected remote error, got {:?}", other.map(|r| r.len())),
        }
    }

    #[tokio::test]
    async fn test_empty_id_set() {
        let api = Arc::new(MockApi::new(&[]));
        let repos = fetch_repositories(api, &[], 10).await.unwrap();
        assert!(repos.is_empty());
    }
}
