//! Reconciliation engine
//!
//! Runs one fetch-merge-persist cycle at a time against a [`RemoteSource`].
//!
//! ```text
//! Idle -> Fetching -> Reconciling -> Idle     (success)
//! Idle -> Fetching -> Failed -> Idle          (failure, store untouched)
//! ```
//!
//! The store lock is only held for the merge itself, so inserts and
//! queries can proceed while a fetch is outstanding.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, info, warn};

use super::error::SyncError;
use super::remote::RemoteSource;
use crate::store::Store;

/// Events buffered for a consumer before new ones are dropped
const EVENT_BUFFER: usize = 64;

/// Where the engine is in its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SyncState {
    Idle,
    Fetching,
    Reconciling,
    Failed,
}

/// Counts produced by one merge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    /// Local records overwritten by a differing remote record
    pub conflicts_resolved: usize,
    /// Remote records with ids the store had not seen
    pub new_records: usize,
    /// Remote records identical to the local copy
    pub unchanged: usize,
}

impl SyncSummary {
    /// No local record had to be overwritten
    pub fn is_clean(&self) -> bool {
        self.conflicts_resolved == 0
    }

    /// One-line message suitable for a user notification
    pub fn notification(&self) -> String {
        if self.is_clean() {
            format!("Sync complete: no conflicts, {} new quote(s)", self.new_records)
        } else {
            format!(
                "Sync complete: {} conflict(s) resolved with server data, {} new quote(s)",
                self.conflicts_resolved, self.new_records
            )
        }
    }
}

/// Result of asking for a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The cycle ran and merged remote data
    Completed(SyncSummary),
    /// Another cycle was already in flight, nothing was done
    Skipped,
}

/// Events emitted by the engine
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// The engine moved to a new state
    StateChanged(SyncState),
    /// A cycle merged successfully
    Completed(SyncSummary),
    /// A cycle was aborted
    Failed(String),
}

/// Runs reconciliation cycles, at most one at a time
pub struct Reconciler {
    /// Where remote quotes come from
    source: Arc<dyn RemoteSource>,
    /// Set while a cycle is running
    in_flight: AtomicBool,
    /// Current state
    state: watch::Sender<SyncState>,
    /// State receiver for external monitoring
    state_rx: watch::Receiver<SyncState>,
    /// Event channel
    event_tx: mpsc::Sender<SyncEvent>,
    /// Event receiver, until someone takes it
    event_rx: std::sync::Mutex<Option<mpsc::Receiver<SyncEvent>>>,
}

impl Reconciler {
    pub fn new(source: Arc<dyn RemoteSource>) -> Self {
        let (state_tx, state_rx) = watch::channel(SyncState::Idle);
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);

        Self {
            source,
            in_flight: AtomicBool::new(false),
            state: state_tx,
            state_rx,
            event_tx,
            event_rx: std::sync::Mutex::new(Some(event_rx)),
        }
    }

    pub fn state(&self) -> SyncState {
        *self.state_rx.borrow()
    }

    /// Subscribe to state changes
    pub fn subscribe_state(&self) -> watch::Receiver<SyncState> {
        self.state_rx.clone()
    }

    /// Take the event receiver (can only be called once)
    ///
    /// Events emitted while the buffer is full are dropped.
    pub fn take_events(&self) -> Option<mpsc::Receiver<SyncEvent>> {
        self.event_rx
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Run one reconciliation cycle against `store`
    ///
    /// Returns `SyncOutcome::Skipped` without doing anything if a cycle is
    /// already running. A failed fetch or a malformed payload aborts the
    /// cycle before the store is touched. There is no retry; callers
    /// decide when to try again.
    pub async fn run_cycle(&self, store: &Mutex<Store>) -> Result<SyncOutcome, SyncError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("sync cycle already in flight, ignoring trigger");
            return Ok(SyncOutcome::Skipped);
        }
        let _in_flight = InFlightGuard(&self.in_flight);

        info!("starting sync from {}", self.source.describe());
        self.set_state(SyncState::Fetching);

        let remote = match self.source.fetch_quotes().await {
            Ok(remote) => remote,
            Err(e) => return Err(self.fail(e)),
        };

        self.set_state(SyncState::Reconciling);
        let merged = {
            let mut store = store.lock().await;
            store.merge(remote)
        };

        match merged {
            Ok(summary) => {
                info!(
                    conflicts = summary.conflicts_resolved,
                    new = summary.new_records,
                    "sync complete"
                );
                self.set_state(SyncState::Idle);
                self.emit(SyncEvent::Completed(summary));
                Ok(SyncOutcome::Completed(summary))
            }
            Err(e) => Err(self.fail(e.into())),
        }
    }

    fn fail(&self, error: SyncError) -> SyncError {
        warn!("sync failed: {}", error);
        self.set_state(SyncState::Failed);
        self.emit(SyncEvent::Failed(error.to_string()));
        self.set_state(SyncState::Idle);
        error
    }

    fn set_state(&self, state: SyncState) {
        let _ = self.state.send(state);
        self.emit(SyncEvent::StateChanged(state));
    }

    fn emit(&self, event: SyncEvent) {
        if let Err(mpsc::error::TrySendError::Full(event)) = self.event_tx.try_send(event) {
            debug!(?event, "sync event dropped, buffer full");
        }
    }
}

/// Clears the in-flight flag when a cycle ends, however it ends
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Quote, QuoteId};
    use crate::storage::{keys, KeyValueStore, MemoryKeyValueStore};
    use crate::sync::remote::{decode_payload, StaticRemoteSource};
    use async_trait::async_trait;
    use tokio::sync::Notify;

    fn quote(id: i64, text: &str, category: &str) -> Quote {
        Quote::new(QuoteId(id), text, category).unwrap()
    }

    fn shared_store(quotes: &[Quote]) -> Arc<Mutex<Store>> {
        let mut durable = MemoryKeyValueStore::new();
        durable
            .set(keys::QUOTES, &serde_json::to_string(quotes).unwrap())
            .unwrap();
        Arc::new(Mutex::new(Store::open_with_backends(
            Box::new(durable),
            Box::new(MemoryKeyValueStore::new()),
        )))
    }

    /// Holds every fetch until released
    struct GatedSource {
        gate: Notify,
        quotes: Vec<Quote>,
    }

    #[async_trait]
    impl RemoteSource for GatedSource {
        fn describe(&self) -> String {
            "gated".to_string()
        }

        async fn fetch_quotes(&self) -> Result<Vec<Quote>, SyncError> {
            self.gate.notified().await;
            Ok(self.quotes.clone())
        }
    }

    /// Answers every fetch with the same raw response body
    struct RawBodySource(&'static str);

    #[async_trait]
    impl RemoteSource for RawBodySource {
        fn describe(&self) -> String {
            "raw body".to_string()
        }

        async fn fetch_quotes(&self) -> Result<Vec<Quote>, SyncError> {
            decode_payload(self.0)
        }
    }

    fn drain_states(events: &mut mpsc::Receiver<SyncEvent>) -> Vec<SyncState> {
        let mut states = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let SyncEvent::StateChanged(state) = event {
                states.push(state);
            }
        }
        states
    }

    async fn wait_for_state(reconciler: &Reconciler, wanted: SyncState) {
        let mut rx = reconciler.subscribe_state();
        while *rx.borrow_and_update() != wanted {
            rx.changed().await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_cycle_merges_and_reports() {
        let store = shared_store(&[quote(1, "A", "X")]);
        let source = Arc::new(StaticRemoteSource::new(vec![
            quote(1, "A2", "X"),
            quote(2, "B", "Y"),
        ]));
        let reconciler = Reconciler::new(source);

        let outcome = reconciler.run_cycle(&store).await.unwrap();

        let SyncOutcome::Completed(summary) = outcome else {
            panic!("expected a completed cycle, got {outcome:?}");
        };
        assert_eq!(summary.conflicts_resolved, 1);
        assert_eq!(summary.new_records, 1);
        assert_eq!(reconciler.state(), SyncState::Idle);
        assert!(!reconciler.is_in_flight());

        let store = store.lock().await;
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(QuoteId(1)).unwrap().text, "A2");
    }

    #[tokio::test]
    async fn test_second_cycle_is_clean() {
        let store = shared_store(&[quote(1, "A", "X")]);
        let source = Arc::new(StaticRemoteSource::new(vec![quote(1, "A2", "X")]));
        let reconciler = Reconciler::new(source);

        reconciler.run_cycle(&store).await.unwrap();
        let outcome = reconciler.run_cycle(&store).await.unwrap();

        match outcome {
            SyncOutcome::Completed(summary) => assert!(summary.is_clean()),
            SyncOutcome::Skipped => panic!("cycle should not be skipped"),
        }
    }

    #[tokio::test]
    async fn test_state_transitions_on_success() {
        let store = shared_store(&[]);
        let reconciler = Reconciler::new(Arc::new(StaticRemoteSource::new(vec![])));
        let mut events = reconciler.take_events().unwrap();
        assert!(reconciler.take_events().is_none());

        reconciler.run_cycle(&store).await.unwrap();

        let mut states = Vec::new();
        while let Ok(event) = events.try_recv() {
            if let SyncEvent::StateChanged(state) = event {
                states.push(state);
            }
        }
        assert_eq!(
            states,
            vec![SyncState::Fetching, SyncState::Reconciling, SyncState::Idle]
        );
    }

    #[tokio::test]
    async fn test_transport_failure_leaves_store_untouched() {
        let store = shared_store(&[quote(1, "A", "X")]);
        let reconciler = Reconciler::new(Arc::new(StaticRemoteSource::failing("offline")));
        let mut events = reconciler.take_events().unwrap();

        let err = reconciler.run_cycle(&store).await.unwrap_err();
        assert!(err.is_transport());
        assert_eq!(reconciler.state(), SyncState::Idle);
        assert!(!reconciler.is_in_flight());

        let mut states = Vec::new();
        let mut failed = false;
        while let Ok(event) = events.try_recv() {
            match event {
                SyncEvent::StateChanged(state) => states.push(state),
                SyncEvent::Failed(_) => failed = true,
                SyncEvent::Completed(_) => panic!("failed cycle reported completion"),
            }
        }
        assert!(failed);
        assert_eq!(
            states,
            vec![SyncState::Fetching, SyncState::Failed, SyncState::Idle]
        );

        let store = store.lock().await;
        assert_eq!(store.all(), &[quote(1, "A", "X")]);
    }

    #[tokio::test]
    async fn test_invalid_remote_record_aborts_cycle() {
        let store = shared_store(&[quote(1, "A", "X")]);
        let bad = Quote {
            id: QuoteId(2),
            text: "B".to_string(),
            category: "   ".to_string(),
        };
        let reconciler = Reconciler::new(Arc::new(StaticRemoteSource::new(vec![
            quote(1, "A2", "X"),
            bad,
        ])));

        let err = reconciler.run_cycle(&store).await.unwrap_err();
        assert!(matches!(err, SyncError::Store(_)));
        assert_eq!(store.lock().await.get(QuoteId(1)).unwrap().text, "A");
    }

    #[tokio::test]
    async fn test_malformed_response_aborts_cycle() {
        for body in [
            "<html>502 Bad Gateway</html>",
            r#"{"quotes": []}"#,
            r#"[{"id": 1, "text": "A2", "category": "X"}, {"id": 1, "text": "B", "category": "Y"}]"#,
        ] {
            let store = shared_store(&[quote(1, "A", "X")]);
            let reconciler = Reconciler::new(Arc::new(RawBodySource(body)));
            let mut events = reconciler.take_events().unwrap();

            let err = reconciler.run_cycle(&store).await.unwrap_err();

            assert!(matches!(err, SyncError::MalformedPayload(_)), "body {body:?}");
            assert!(!err.is_transport());
            assert_eq!(
                drain_states(&mut events),
                vec![SyncState::Fetching, SyncState::Failed, SyncState::Idle]
            );
            assert!(!reconciler.is_in_flight());
            assert_eq!(store.lock().await.all(), &[quote(1, "A", "X")]);
        }
    }

    #[tokio::test]
    async fn test_unconsumed_events_stay_bounded() {
        let store = shared_store(&[]);
        let reconciler = Reconciler::new(Arc::new(StaticRemoteSource::new(vec![])));

        for _ in 0..200 {
            reconciler.run_cycle(&store).await.unwrap();
        }

        let mut events = reconciler.take_events().unwrap();
        let mut queued = 0;
        while events.try_recv().is_ok() {
            queued += 1;
        }
        assert_eq!(queued, EVENT_BUFFER);

        // Still delivers once someone is listening
        reconciler.run_cycle(&store).await.unwrap();
        assert!(events.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_overlapping_trigger_is_skipped() {
        let store = shared_store(&[quote(1, "A", "X")]);
        let source = Arc::new(GatedSource {
            gate: Notify::new(),
            quotes: vec![quote(2, "B", "Y")],
        });
        let reconciler = Arc::new(Reconciler::new(source.clone()));

        let first = {
            let reconciler = reconciler.clone();
            let store = store.clone();
            tokio::spawn(async move { reconciler.run_cycle(&store).await })
        };

        wait_for_state(&reconciler, SyncState::Fetching).await;
        assert!(reconciler.is_in_flight());

        let second = reconciler.run_cycle(&store).await.unwrap();
        assert_eq!(second, SyncOutcome::Skipped);

        source.gate.notify_one();
        let first = first.await.unwrap().unwrap();
        assert!(matches!(first, SyncOutcome::Completed(_)));
        assert!(!reconciler.is_in_flight());
    }

    #[tokio::test]
    async fn test_insert_during_fetch_survives_merge() {
        let store = shared_store(&[quote(1, "A", "X")]);
        let source = Arc::new(GatedSource {
            gate: Notify::new(),
            quotes: vec![quote(1, "A2", "X")],
        });
        let reconciler = Arc::new(Reconciler::new(source.clone()));

        let cycle = {
            let reconciler = reconciler.clone();
            let store = store.clone();
            tokio::spawn(async move { reconciler.run_cycle(&store).await })
        };

        wait_for_state(&reconciler, SyncState::Fetching).await;
        let local = store.lock().await.insert("Written mid-sync", "Local").unwrap();

        source.gate.notify_one();
        cycle.await.unwrap().unwrap();

        let store = store.lock().await;
        assert_eq!(store.get(local.id), Some(&local));
        assert_eq!(store.get(QuoteId(1)).unwrap().text, "A2");
    }

    #[test]
    fn test_summary_notification() {
        let clean = SyncSummary {
            conflicts_resolved: 0,
            new_records: 3,
            unchanged: 1,
        };
        assert!(clean.notification().contains("no conflicts"));

        let conflicted = SyncSummary {
            conflicts_resolved: 2,
            ..clean
        };
        assert!(conflicted.notification().contains("2 conflict(s)"));
    }
}
