//! Sync command handlers

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::sync::Mutex;
use tracing::warn;

use quotebook_core::sync::{spawn_sync_schedule, HttpRemoteSource, Reconciler, SyncOutcome};
use quotebook_core::{Config, Store};

use crate::output::{sync_failure_line, Output};

/// Build the remote source, explaining what's missing if sync isn't set up
fn remote_source(config: &Config) -> Result<HttpRemoteSource> {
    if !config.sync_enabled {
        bail!(
            "Sync is not enabled. Enable it with:\n  \
             quotebook config set sync_enabled true\n  \
             quotebook config set sync_url https://example.com/quotes.json"
        );
    }

    match HttpRemoteSource::from_config(config) {
        Some(source) => source.context("Failed to create HTTP client"),
        None => bail!(
            "Sync URL not configured. Set it with:\n  \
             quotebook config set sync_url https://example.com/quotes.json"
        ),
    }
}

/// Run a single reconciliation cycle
pub async fn sync(store: Store, config: &Config, output: &Output) -> Result<()> {
    let source = remote_source(config)?;
    output.message(&format!("Fetching quotes from {}...", source.url()));

    let reconciler = Reconciler::new(Arc::new(source));
    let store = Mutex::new(store);

    match reconciler.run_cycle(&store).await {
        Ok(SyncOutcome::Completed(summary)) => {
            output.print_sync_summary(&summary);
            let store = store.lock().await;
            output.message(&format!(
                "  Quotes: {}, Categories: {}",
                store.len(),
                store.category_counts().len()
            ));
        }
        Ok(SyncOutcome::Skipped) => output.message("A sync is already in progress"),
        Err(e) => {
            output.message(&sync_failure_line(&e));
            return Err(e.into());
        }
    }

    Ok(())
}

/// Reconcile on an interval until Ctrl-C
pub async fn watch(
    store: Store,
    config: &Config,
    interval: Option<u64>,
    output: &Output,
) -> Result<()> {
    let source = remote_source(config)?;
    let interval = interval
        .map(|secs| Duration::from_secs(secs.max(1)))
        .unwrap_or_else(|| config.sync_interval());

    output.message(&format!(
        "Syncing with {} every {}s (Ctrl-C to stop)",
        source.url(),
        interval.as_secs()
    ));

    let reconciler = Arc::new(Reconciler::new(Arc::new(source)));
    let store = Arc::new(Mutex::new(store));
    let mut handle = spawn_sync_schedule(reconciler, store, interval);

    loop {
        tokio::select! {
            report = handle.next_report() => match report {
                Some(report) => output.print_cycle_report(&report),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    handle.shutdown().await;
    output.message("Stopped");
    Ok(())
}

/// Sync before a read command, if sync is set up
///
/// Failures are reported and otherwise ignored so reads keep working offline.
pub async fn auto_sync(store: Store, config: &Config, output: &Output) -> Store {
    let source = match HttpRemoteSource::from_config(config) {
        Some(Ok(source)) => source,
        Some(Err(e)) => {
            warn!(error = %e, "auto-sync unavailable");
            return store;
        }
        None => return store,
    };

    let reconciler = Reconciler::new(Arc::new(source));
    let shared = Mutex::new(store);

    if let Err(e) = reconciler.run_cycle(&shared).await {
        warn!(error = %e, "auto-sync failed");
        if !output.is_quiet() && !output.is_json() {
            eprintln!("{}", sync_failure_line(&e));
        }
    }

    shared.into_inner()
}
