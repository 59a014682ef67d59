//! createdAt normalization applied once when records are loaded
//!
//! Records written by older versions carry UTC timestamps (`...Z`).
//! Newer records carry the local offset. Legacy values are converted to
//! the local offset so "most recent" ordering and exports are uniform.

use chrono::{FixedOffset, Local, Offset, Utc};

use crate::types::{CreatedAt, ExpenseRecord};

/// Offset of the local timezone right now
pub fn local_offset() -> FixedOffset {
    Local::now().offset().fix()
}

/// Creation stamp for a new record
pub fn local_now() -> CreatedAt {
    CreatedAt::LocalOffset(Utc::now().with_timezone(&local_offset()))
}

/// Convert a legacy UTC stamp to `offset`; local stamps pass through
pub fn normalize_created_at(value: CreatedAt, offset: FixedOffset) -> CreatedAt {
    match value {
        CreatedAt::LegacyUtc(utc) => CreatedAt::LocalOffset(utc.with_timezone(&offset)),
        local @ CreatedAt::LocalOffset(_) => local,
    }
}

/// Normalize every record in place. Returns how many were converted.
pub fn migrate_records(records: &mut [ExpenseRecord], offset: FixedOffset) -> usize {
    let mut converted = 0;
    for record in records.iter_mut() {
        if record.created_at.is_legacy() {
            record.created_at = normalize_created_at(record.created_at, offset);
            converted += 1;
        }
    }
    if converted > 0 {
        tracing::info!(converted, "migrated legacy UTC createdAt values");
    }
    converted
}
