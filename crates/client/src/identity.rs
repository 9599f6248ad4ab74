//! Identifier generation and host discovery
//!
//! Batch and context identifiers come from a cryptographically seeded
//! generator. Per-record device and session identifiers are never
//! generated here: for server-side records their absence is meaningful,
//! so only the explicit override path sets them.

use rand::Rng;

/// Generate a batch identifier (uniformly random u64)
pub(crate) fn new_batch_id() -> u64 {
    rand::rng().random()
}

/// Generate a log context identifier
///
/// Used only when the caller passed 0; zero marks "unset" on the wire,
/// so the generator never returns it.
pub(crate) fn new_context_id() -> u64 {
    let mut rng = rand::rng();
    loop {
        let id: u64 = rng.random();
        if id != 0 {
            return id;
        }
    }
}

/// Discover the process hostname once at startup
///
/// Falls back to `"unknown"` when discovery fails; the result is
/// captured by value and used as the default log `source`.
pub(crate) fn discover_hostname() -> String {
    match hostname::get() {
        Ok(name) => {
            let name = name.to_string_lossy().into_owned();
            if name.is_empty() {
                "unknown".to_string()
            } else {
                name
            }
        }
        Err(_) => "unknown".to_string(),
    }
}
