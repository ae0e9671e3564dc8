//! Reconciliation with a remote quote source
//!
//! Pulls the remote quote set and merges it into the store with a
//! remote-wins policy. Local quotes the remote doesn't know about are kept.
//!
//! ## Flow
//!
//! 1. Fetch the remote set through a [`RemoteSource`]
//! 2. Validate it (a bad payload aborts the cycle, nothing is changed)
//! 3. Merge: new ids are appended, differing records are overwritten
//! 4. Persist once and report a [`SyncSummary`]
//!
//! ## Usage
//!
//! ```ignore
//! let source = Arc::new(HttpRemoteSource::new(url, Duration::from_secs(10))?);
//! let reconciler = Reconciler::new(source);
//! match reconciler.run_cycle(&store).await? {
//!     SyncOutcome::Completed(summary) => println!("{}", summary.notification()),
//!     SyncOutcome::Skipped => {}
//! }
//! ```

mod engine;
mod error;
mod remote;
mod schedule;

pub use engine::{Reconciler, SyncEvent, SyncOutcome, SyncState, SyncSummary};
pub use error::SyncError;
pub use remote::{decode_payload, HttpRemoteSource, RemoteSource, StaticRemoteSource};
pub use schedule::{spawn_sync_schedule, CycleReport, ScheduleCommand, SyncScheduleHandle};
