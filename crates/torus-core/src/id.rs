//! Strongly-typed identifiers.

use std::fmt;

/// Identifies one submitted run.
///
/// Assigned by the broker from a monotonic counter, so a later session
/// always compares greater than an earlier one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for SessionId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}
