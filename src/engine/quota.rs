//! Byte quotas for the browser-like areas.
//!
//! Usage is counted as the UTF-8 length of every key plus its value.

use super::area::AreaError;

/// Default quota for local and session areas (5 MiB).
pub const DEFAULT_QUOTA_BYTES: usize = 5 * 1024 * 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Quota {
    Unlimited,
    Bytes(usize),
}

impl Default for Quota {
    fn default() -> Self {
        Quota::Bytes(DEFAULT_QUOTA_BYTES)
    }
}

impl Quota {
    /// Bytes an entry counts against the quota.
    pub fn entry_size(key: &str, value: &str) -> usize {
        key.len() + value.len()
    }

    /// Checks whether replacing `replaced` bytes with `added` bytes keeps `usage` within the limit.
    pub fn check(&self, usage: usize, replaced: usize, added: usize) -> Result<(), AreaError> {
        let Quota::Bytes(limit) = *self else {
            return Ok(());
        };

        let requested = usage.saturating_sub(replaced) + added;
        if requested > limit {
            return Err(AreaError::QuotaExceeded { requested, limit });
        }
        Ok(())
    }
}
