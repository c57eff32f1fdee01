//! Namespace kinds (spec.md §4.1).
//!
//! Namespaces are cheap, immutable, `Clone`-able values; equality and
//! hashing are structural except for `Private`, which is identity-keyed by
//! a process-wide generated id (spec.md §4.1 "Private namespaces are
//! pairwise distinct even when their URIs collide").

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::CoreError;

/// 28-bit id space for private namespaces; spec.md §7 requires
/// `PrivateNamespaceLimitExceeded` once this is exhausted.
const PRIVATE_ID_LIMIT: u32 = 1 << 28;

static NEXT_PRIVATE_ID: AtomicU32 = AtomicU32::new(0);

fn next_private_id() -> Result<u32, CoreError> {
    // `fetch_update` so concurrent callers never observe the same id and
    // never race past the limit (spec.md §5 acquire/release discipline).
    NEXT_PRIVATE_ID
        .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
            if current >= PRIVATE_ID_LIMIT {
                None
            } else {
                Some(current + 1)
            }
        })
        .map_err(|_| CoreError::PrivateNamespaceLimitExceeded)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Matches any namespace during lookup; never a name's own namespace.
    Any,
    /// The "public" namespace when `uri` is empty, otherwise a named
    /// package namespace.
    Namespace(String),
    PackageInternal(String),
    Protected(String),
    Explicit(String),
    StaticProtected(String),
    /// Pairwise distinct by generated id regardless of `uri` collisions.
    Private { uri: String, id: u32 },
}

impl Namespace {
    pub fn public() -> Namespace {
        Namespace::Namespace(String::new())
    }

    pub fn package(uri: impl Into<String>) -> Namespace {
        Namespace::Namespace(uri.into())
    }

    pub fn package_internal(uri: impl Into<String>) -> Namespace {
        Namespace::PackageInternal(uri.into())
    }

    pub fn protected(uri: impl Into<String>) -> Namespace {
        Namespace::Protected(uri.into())
    }

    pub fn explicit(uri: impl Into<String>) -> Namespace {
        Namespace::Explicit(uri.into())
    }

    pub fn static_protected(uri: impl Into<String>) -> Namespace {
        Namespace::StaticProtected(uri.into())
    }

    pub fn private(uri: impl Into<String>) -> Result<Namespace, CoreError> {
        Ok(Namespace::Private {
            uri: uri.into(),
            id: next_private_id()?,
        })
    }

    /// Creates a private namespace with a caller-supplied id, validated
    /// against the same limit as `private()` but independent of the
    /// shared monotonic generator (spec.md §4.1). Used when a private
    /// namespace's id is already known rather than freshly minted, e.g.
    /// to exercise the id-space boundary without driving the generator
    /// through hundreds of millions of calls.
    pub fn private_with_id(uri: impl Into<String>, id: u32) -> Result<Namespace, CoreError> {
        if id >= PRIVATE_ID_LIMIT {
            return Err(CoreError::PrivateNamespaceLimitExceeded);
        }
        Ok(Namespace::Private { uri: uri.into(), id })
    }

    pub fn is_public(&self) -> bool {
        matches!(self, Namespace::Namespace(uri) if uri.is_empty())
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Namespace::Any)
    }

    pub fn uri(&self) -> Option<&str> {
        match self {
            Namespace::Any => None,
            Namespace::Namespace(uri)
            | Namespace::PackageInternal(uri)
            | Namespace::Protected(uri)
            | Namespace::Explicit(uri)
            | Namespace::StaticProtected(uri)
            | Namespace::Private { uri, .. } => Some(uri),
        }
    }

    /// The 0..7 discriminant used by `NamespaceSet`'s bitflags summary
    /// (spec.md §4.1's ordered namespace-kind list).
    pub(crate) fn kind_bit(&self) -> u8 {
        match self {
            Namespace::Any => 0,
            Namespace::Namespace(uri) if uri.is_empty() => 1, // public
            Namespace::Namespace(_) => 2,
            Namespace::PackageInternal(_) => 3,
            Namespace::Protected(_) => 4,
            Namespace::Explicit(_) => 5,
            Namespace::StaticProtected(_) => 6,
            Namespace::Private { .. } => 7,
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Namespace::Any => write!(f, "*"),
            Namespace::Namespace(uri) if uri.is_empty() => write!(f, "public"),
            Namespace::Namespace(uri) => write!(f, "{uri}"),
            Namespace::PackageInternal(uri) => write!(f, "internal:{uri}"),
            Namespace::Protected(uri) => write!(f, "protected:{uri}"),
            Namespace::Explicit(uri) => write!(f, "namespace:{uri}"),
            Namespace::StaticProtected(uri) => write!(f, "static_protected:{uri}"),
            Namespace::Private { uri, id } => write!(f, "private:{uri}#{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_namespace_has_empty_uri() {
        assert!(Namespace::public().is_public());
        assert!(!Namespace::package("flash.display").is_public());
    }

    #[test]
    fn private_namespaces_with_same_uri_are_distinct() {
        let a = Namespace::private("P").unwrap();
        let b = Namespace::private("P").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn any_is_not_public() {
        assert!(!Namespace::Any.is_public());
        assert!(Namespace::Any.is_any());
    }

    #[test]
    fn kind_bit_distinguishes_public_from_package() {
        assert_ne!(
            Namespace::public().kind_bit(),
            Namespace::package("x").kind_bit()
        );
    }

    /// spec.md §8 boundary property: ids 0 and 2^28-1 both succeed; 2^28
    /// fails, independent of the shared generator's own state.
    #[test]
    fn private_with_id_enforces_the_id_space_boundary() {
        assert!(Namespace::private_with_id("p", 0).is_ok());
        assert!(Namespace::private_with_id("p", PRIVATE_ID_LIMIT - 1).is_ok());
        assert!(matches!(
            Namespace::private_with_id("p", PRIVATE_ID_LIMIT).unwrap_err(),
            CoreError::PrivateNamespaceLimitExceeded
        ));
    }
}
