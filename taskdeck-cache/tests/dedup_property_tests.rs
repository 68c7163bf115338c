use async_trait::async_trait;
use proptest::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use taskdeck_cache::{derive_task_list_key, QueryCache, QueryFetcher, TaskListKey};
use taskdeck_core::{FilterState, PaginatedResult, Priority, RemoteError, SortBy, StatusFilter};
use tokio::sync::Semaphore;

/// Counts calls per key and holds every response until released.
struct HeldFetcher {
    calls: Mutex<HashMap<TaskListKey, usize>>,
    gate: Semaphore,
}

impl HeldFetcher {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(HashMap::new()),
            gate: Semaphore::new(0),
        })
    }

    fn calls_for(&self, key: &TaskListKey) -> usize {
        self.calls.lock().unwrap().get(key).copied().unwrap_or(0)
    }

    fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl QueryFetcher<TaskListKey, PaginatedResult> for HeldFetcher {
    async fn fetch(&self, key: &TaskListKey) -> Result<PaginatedResult, RemoteError> {
        *self.calls.lock().unwrap().entry(key.clone()).or_default() += 1;
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| RemoteError::transport("closed"))?;
        permit.forget();
        Ok(PaginatedResult::from_page(Vec::new(), 0, key.page(), key.page_size()))
    }
}

#[derive(Debug, Clone)]
struct ViewRequest {
    search: String,
    padding: usize,
    status: StatusFilter,
    priority: Option<Priority>,
    sort_by: SortBy,
    page: u32,
}

impl ViewRequest {
    /// Build the key through a fresh filter state, padding the search text
    /// so equal queries arrive as distinct objects with different raw input.
    fn key(&self) -> TaskListKey {
        let mut state = FilterState::new();
        state.set_sort_by(self.sort_by);
        state.set_status_filter(self.status);
        state.set_priority_filter(self.priority);
        let pad = " ".repeat(self.padding);
        state.set_search_query(format!("{pad}{}{pad}", self.search));
        state.set_current_page(self.page);
        derive_task_list_key(&state.api_filter(), state.current_page(), 20)
    }
}

fn arb_request() -> impl Strategy<Value = ViewRequest> {
    (
        prop_oneof![Just(String::new()), Just("milk".to_string()), Just("report".to_string())],
        0usize..3,
        prop_oneof![Just(StatusFilter::All), Just(StatusFilter::Active)],
        prop::option::of(Just(Priority::High)),
        prop_oneof![Just(SortBy::DueDateAsc), Just(SortBy::AlphaAsc)],
        1u32..3,
    )
        .prop_map(|(search, padding, status, priority, sort_by, page)| ViewRequest {
            search,
            padding,
            status,
            priority,
            sort_by,
            page,
        })
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn structurally_equal_reads_share_one_fetch(requests in prop::collection::vec(arb_request(), 1..25)) {
        let rt = runtime();
        rt.block_on(async {
            let fetcher = HeldFetcher::new();
            let cache: QueryCache<TaskListKey, PaginatedResult> = QueryCache::with_defaults(
                "tasks",
                Arc::clone(&fetcher) as Arc<dyn QueryFetcher<TaskListKey, PaginatedResult>>,
            );

            let mut distinct = HashSet::new();
            for request in &requests {
                let key = request.key();
                cache.read(&key);
                distinct.insert(key);
                tokio::task::yield_now().await;
            }

            for key in &distinct {
                prop_assert!(fetcher.calls_for(key) <= 1);
            }

            fetcher.gate.add_permits(distinct.len());
            for key in &distinct {
                prop_assert!(cache.fetch(key).await.is_ok());
            }
            prop_assert_eq!(fetcher.total_calls(), distinct.len());
            Ok(())
        })?;
    }
}

#[tokio::test]
async fn concurrent_fetches_receive_the_same_result() {
    let fetcher = HeldFetcher::new();
    let cache: QueryCache<TaskListKey, PaginatedResult> = QueryCache::with_defaults(
        "tasks",
        Arc::clone(&fetcher) as Arc<dyn QueryFetcher<TaskListKey, PaginatedResult>>,
    );
    let key = derive_task_list_key(&FilterState::new().api_filter(), 1, 20);

    let handles: Vec<_> = (0..5)
        .map(|_| {
            let cache = cache.clone();
            let key = key.clone();
            tokio::spawn(async move { cache.fetch(&key).await })
        })
        .collect();
    tokio::task::yield_now().await;
    fetcher.gate.add_permits(1);

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap().unwrap());
    }
    assert_eq!(fetcher.total_calls(), 1);
    assert!(results.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    assert_eq!(cache.stats().joined, 4);
}
