//! Execution zones (spec.md §4.4, Glossary: "an opaque execution scope
//! across which certain per-class objects (prototype, class object) are
//! replicated; treated as an external factory by this spec").
//!
//! This core never constructs a zone itself — a host VM hands one in per
//! execution context and `Class` materialises its per-zone prototype and
//! class object against it, once, lazily.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of a zone, used as the cache key for per-zone materialisation.
/// Any host-provided scheme that yields stable, distinct ids per tenant
/// works; this core only ever compares ids for equality.
pub type ZoneId = u64;

pub trait Zone: fmt::Debug + Send + Sync {
    fn id(&self) -> ZoneId;
}

/// A minimal `Zone` for hosts and tests that don't need anything richer
/// than "a fresh distinct scope per call to `new()`".
#[derive(Debug)]
pub struct SimpleZone(ZoneId);

static NEXT_ZONE_ID: AtomicU64 = AtomicU64::new(1);

impl SimpleZone {
    pub fn new() -> SimpleZone {
        SimpleZone(NEXT_ZONE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SimpleZone {
    fn default() -> Self {
        SimpleZone::new()
    }
}

impl Zone for SimpleZone {
    fn id(&self) -> ZoneId {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_zones_have_distinct_ids() {
        let a = SimpleZone::new();
        let b = SimpleZone::new();
        assert_ne!(a.id(), b.id());
    }
}
