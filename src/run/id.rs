//! Run identifiers

use std::fmt;

use chrono::{Local, NaiveDateTime};

/// Unique, time-sortable run identifier: `YYYYmmdd_HHMMSS_<8 hex>`.
///
/// The timestamp is local time; the suffix is random so runs started in the
/// same second do not collide.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunId(String);

impl RunId {
    /// Generate an identifier for a run starting now.
    #[must_use]
    pub fn generate() -> Self {
        Self::from_parts(Local::now().naive_local(), rand::random::<u32>())
    }

    /// Build an identifier from an explicit timestamp and suffix.
    #[must_use]
    pub fn from_parts(timestamp: NaiveDateTime, suffix: u32) -> Self {
        Self(format!("{}_{suffix:08x}", timestamp.format("%Y%m%d_%H%M%S")))
    }

    /// Identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RunId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
