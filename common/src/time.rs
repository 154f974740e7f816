//! Time utilities for zkBank records.

use chrono::{DateTime, Utc};

/// A timestamp with timezone (always UTC for zkBank).
pub type Timestamp = DateTime<Utc>;

/// Get the current timestamp.
pub fn now() -> Timestamp {
    Utc::now()
}
