//! Scheduled sync
//!
//! Runs reconciliation cycles on a fixed interval in a background task.
//! The host owns the returned handle and is responsible for shutting the
//! task down; the engine itself knows nothing about timers.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use super::engine::{Reconciler, SyncOutcome};
use super::error::SyncError;
use crate::store::Store;

/// Commands sent to the schedule task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleCommand {
    /// Run a cycle now, without waiting for the next tick
    SyncNow,
    /// Stop the task
    Shutdown,
}

/// The result of one scheduled cycle
#[derive(Debug)]
pub struct CycleReport {
    /// When the cycle finished
    pub finished_at: DateTime<Utc>,
    pub result: Result<SyncOutcome, SyncError>,
}

/// Handle to control the schedule task
pub struct SyncScheduleHandle {
    command_tx: mpsc::Sender<ScheduleCommand>,
    report_rx: mpsc::Receiver<CycleReport>,
    task: JoinHandle<()>,
}

impl SyncScheduleHandle {
    /// Ask for an immediate cycle
    pub async fn sync_now(&self) {
        let _ = self.command_tx.send(ScheduleCommand::SyncNow).await;
    }

    /// Wait for the next cycle report. Returns `None` once the task has stopped.
    pub async fn next_report(&mut self) -> Option<CycleReport> {
        self.report_rx.recv().await
    }

    /// Stop the task and wait for it to finish
    ///
    /// A cycle that is already running completes first.
    pub async fn shutdown(self) {
        let _ = self.command_tx.send(ScheduleCommand::Shutdown).await;
        let _ = self.task.await;
    }
}

/// Spawn a task that runs a cycle immediately and then every `interval`
pub fn spawn_sync_schedule(
    reconciler: Arc<Reconciler>,
    store: Arc<Mutex<Store>>,
    interval: Duration,
) -> SyncScheduleHandle {
    let (command_tx, command_rx) = mpsc::channel(16);
    let (report_tx, report_rx) = mpsc::channel(64);

    let task = tokio::spawn(schedule_loop(
        reconciler, store, interval, command_rx, report_tx,
    ));

    SyncScheduleHandle {
        command_tx,
        report_rx,
        task,
    }
}

async fn schedule_loop(
    reconciler: Arc<Reconciler>,
    store: Arc<Mutex<Store>>,
    interval: Duration,
    mut command_rx: mpsc::Receiver<ScheduleCommand>,
    report_tx: mpsc::Sender<CycleReport>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            command = command_rx.recv() => match command {
                Some(ScheduleCommand::SyncNow) => {}
                Some(ScheduleCommand::Shutdown) | None => break,
            },
        }

        let result = reconciler.run_cycle(&store).await;
        let report = CycleReport {
            finished_at: Utc::now(),
            result,
        };

        // Reports are dropped if the host isn't keeping up
        if report_tx.try_send(report).is_err() {
            debug!("sync report dropped, receiver full or gone");
        }
    }

    debug!("sync schedule stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Quote, QuoteId};
    use crate::sync::remote::StaticRemoteSource;

    fn quote(id: i64, text: &str, category: &str) -> Quote {
        Quote::new(QuoteId(id), text, category).unwrap()
    }

    async fn next(handle: &mut SyncScheduleHandle) -> CycleReport {
        tokio::time::timeout(Duration::from_secs(5), handle.next_report())
            .await
            .expect("timed out waiting for a sync report")
            .expect("schedule stopped unexpectedly")
    }

    #[tokio::test]
    async fn test_runs_immediately_then_on_interval() {
        let source = Arc::new(StaticRemoteSource::new(vec![quote(1, "A", "X")]));
        let reconciler = Arc::new(Reconciler::new(source.clone()));
        let store = Arc::new(Mutex::new(Store::in_memory()));

        let mut handle = spawn_sync_schedule(reconciler, store.clone(), Duration::from_millis(20));

        let first = next(&mut handle).await;
        assert!(matches!(first.result, Ok(SyncOutcome::Completed(_))));

        source.set_quotes(vec![quote(1, "A", "X"), quote(900, "Later", "Y")]);
        let mut saw_new = false;
        for _ in 0..10 {
            let report = next(&mut handle).await;
            if let Ok(SyncOutcome::Completed(summary)) = report.result {
                if summary.new_records == 1 {
                    saw_new = true;
                    break;
                }
            }
        }
        assert!(saw_new);
        assert!(store.lock().await.get(QuoteId(900)).is_some());

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_sync_now_and_failures_are_reported() {
        let source = Arc::new(StaticRemoteSource::failing("offline"));
        let reconciler = Arc::new(Reconciler::new(source));
        let store = Arc::new(Mutex::new(Store::in_memory()));

        let mut handle = spawn_sync_schedule(reconciler, store.clone(), Duration::from_secs(3600));

        // Immediate first tick
        let first = next(&mut handle).await;
        assert!(first.result.unwrap_err().is_transport());

        handle.sync_now().await;
        let second = next(&mut handle).await;
        assert!(second.result.is_err());

        assert_eq!(store.lock().await.len(), 4);
        handle.shutdown().await;
    }
}
