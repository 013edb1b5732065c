//! Capability probing.
//!
//! Volatile areas are tested by writing a random throwaway key and removing it again. Any error
//! along the way (quota, disabled storage, privacy mode) marks the area as unsupported.

use super::area::StorageArea;
use uuid::Uuid;

const PROBE_KEY_PREFIX: &str = "___";

/// Returns a fresh, collision-resistant probe key.
pub fn probe_key() -> String {
    format!("{PROBE_KEY_PREFIX}{}", Uuid::new_v4().simple())
}

/// Writes and removes a probe key, returning whether both operations succeeded.
pub fn probe_area<A: StorageArea + ?Sized>(area: &A) -> bool {
    let key = probe_key();
    match area.set_item(&key, "").and_then(|_| area.remove_item(&key)) {
        Ok(()) => true,
        Err(e) => {
            log::debug!("Storage probe failed: {e:#}");
            // The write may have landed before the failure
            let _ = area.remove_item(&key);
            false
        }
    }
}
