//! Ensures `spot_masters` holds exactly one row per configured region.

use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use tracing::{debug, error};

use crate::config::Region;
use crate::store::Store;

/// Inserts missing regions and refreshes the update time of existing ones.
///
/// # Errors
///
/// Fails when a region code already has more than one master row.
pub fn bootstrap_regions(store: &Store, regions: &[Region], at: DateTime<Utc>) -> Result<()> {
    for region in regions {
        match store.count_regions(&region.code)? {
            0 => store.insert_region(&region.code, &region.name, at)?,
            1 => store.touch_region(&region.code, at)?,
            n => {
                error!(code = %region.code, rows = n, "Duplicate master grids in spot_masters");
                bail!(
                    "duplicate master grid '{}' ({n} rows) in spot_masters, verify config",
                    region.code
                );
            }
        }
        debug!(code = %region.code, name = %region.name, "Master grid ready");
    }
    Ok(())
}
