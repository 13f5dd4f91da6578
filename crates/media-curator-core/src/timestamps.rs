//! Restore file times from the post date carried in each file name.

use chrono::{Local, NaiveDate, TimeZone, Utc};
use log::info;
use std::path::Path;

use crate::config::{Config, TimeZonePolicy};
use crate::discovery::CorpusSnapshot;
use crate::error::{Error, Result};
use crate::filename;
use crate::store::FileStore;
use crate::types::{Mutation, Operation, OperationReport};

/// Unix timestamp of midnight at the start of `date` in the given zone
pub fn midnight_timestamp(date: NaiveDate, zone: TimeZonePolicy) -> Option<i64> {
    let midnight = date.and_hms_opt(0, 0, 0)?;
    match zone {
        TimeZonePolicy::Utc => Some(Utc.from_utc_datetime(&midnight).timestamp()),
        // A zone transition can skip midnight entirely
        TimeZonePolicy::Local => midnight
            .and_local_timezone(Local)
            .earliest()
            .map(|t| t.timestamp()),
    }
}

fn restore_file(store: &dyn FileStore, path: &Path, zone: TimeZonePolicy) -> Result<i64> {
    let fields = filename::decode(path)?;
    let timestamp = midnight_timestamp(fields.post_date, zone).ok_or_else(|| Error::Time {
        path: path.to_path_buf(),
        reason: format!("midnight of {} does not exist locally", fields.post_date),
    })?;
    store.set_times(path, timestamp)?;
    Ok(timestamp)
}

/// Set access and modification time of every decodable file to its post date's midnight
pub fn restore_timestamps(
    store: &dyn FileStore,
    snapshot: &CorpusSnapshot,
    config: &Config,
) -> Result<OperationReport> {
    let mut report = OperationReport::new(Operation::Timestamps);

    for path in &snapshot.items {
        match restore_file(store, path, config.time_zone) {
            Ok(timestamp) => {
                report.processed += 1;
                report.applied.push(Mutation::SetTimes {
                    path: path.clone(),
                    timestamp,
                });
            }
            Err(e) => report.skip(path, &e),
        }
    }

    info!(
        "Restored times of {} files in {}",
        report.applied.len(),
        snapshot.root.display()
    );
    Ok(report)
}
