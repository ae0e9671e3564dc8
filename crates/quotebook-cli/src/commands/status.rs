//! Status command handler

use anyhow::Result;

use quotebook_core::storage::keys;
use quotebook_core::{Config, FileKeyValueStore, Store};

use crate::output::{Output, OutputFormat};

/// Show status information
pub fn show(store: &Store, config: &Config, output: &Output) -> Result<()> {
    let snapshot_size = FileKeyValueStore::new(&config.data_dir)
        .size_of(keys::QUOTES)
        .unwrap_or(None);
    let categories = store.category_counts().len();
    let filter = store.current_filter();
    let sync_url = config.active_sync_url();

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "sync_enabled": config.sync_enabled,
                    "sync_url": config.sync_url,
                    "sync_active": sync_url.is_some(),
                    "sync_interval_secs": config.sync_interval().as_secs(),
                    "storage": {
                        "data_dir": config.data_dir,
                        "snapshot_path": config.snapshot_path(),
                        "filter_path": config.filter_path(),
                        "snapshot_exists": snapshot_size.is_some(),
                        "snapshot_size": snapshot_size,
                    },
                    "counts": {
                        "quotes": store.len(),
                        "categories": categories,
                    },
                    "filter": filter.to_string(),
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", store.len());
        }
        OutputFormat::Human => {
            println!("Quotebook Status");
            println!("================");
            println!();
            println!("Sync:");
            println!(
                "  Status:   {}",
                if config.sync_enabled {
                    "enabled"
                } else {
                    "disabled"
                }
            );
            if let Some(ref url) = config.sync_url {
                println!("  Source:   {}", url);
            }
            if sync_url.is_some() {
                println!("  Interval: {}s", config.sync_interval().as_secs());
            }
            println!();
            println!("Storage:");
            println!("  Location: {}", config.data_dir.display());
            match snapshot_size {
                Some(bytes) => println!(
                    "  Snapshot: {} ({})",
                    config.snapshot_path().display(),
                    human_size(bytes)
                ),
                None => println!("  Snapshot: (not written yet)"),
            }
            println!();
            println!("Contents:");
            println!("  Quotes:     {}", store.len());
            println!("  Categories: {}", categories);
            println!("  Filter:     {}", filter);
        }
    }

    Ok(())
}

fn human_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
