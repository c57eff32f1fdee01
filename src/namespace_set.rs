//! Immutable, deduplicated namespace sets with O(1) membership tests
//! (spec.md §4.1, §4.3.3).

use bitflags::bitflags;
use smallvec::SmallVec;

use crate::namespace::Namespace;

/// Most namespace sets bytecode builds are tiny (a multiname's namespace
/// set is rarely more than the current package plus a couple of `use
/// namespace` imports), so this stays on the stack until a set grows past
/// four members.
type NamespaceVec = SmallVec<[Namespace; 4]>;

bitflags! {
    /// One bit per `Namespace` kind plus an extra bit for "contains
    /// public" (the public namespace is a `Namespace` kind with an empty
    /// URI, but §3 calls out `containsPublic` as its own O(1) predicate).
    struct KindSummary: u16 {
        const ANY              = 1 << 0;
        const PUBLIC           = 1 << 1;
        const NAMESPACE        = 1 << 2;
        const PACKAGE_INTERNAL = 1 << 3;
        const PROTECTED        = 1 << 4;
        const EXPLICIT         = 1 << 5;
        const STATIC_PROTECTED = 1 << 6;
        const PRIVATE          = 1 << 7;
    }
}

fn kind_flag(ns: &Namespace) -> KindSummary {
    match ns.kind_bit() {
        0 => KindSummary::ANY,
        1 => KindSummary::PUBLIC,
        2 => KindSummary::NAMESPACE,
        3 => KindSummary::PACKAGE_INTERNAL,
        4 => KindSummary::PROTECTED,
        5 => KindSummary::EXPLICIT,
        6 => KindSummary::STATIC_PROTECTED,
        7 => KindSummary::PRIVATE,
        _ => unreachable!("Namespace::kind_bit is 0..=7"),
    }
}

/// An immutable, order-preserving, deduplicated set of namespaces.
#[derive(Debug, Clone)]
pub struct NamespaceSet {
    namespaces: NamespaceVec,
    summary: KindSummary,
}

impl NamespaceSet {
    /// Builds a set, deduplicating while preserving first-seen order.
    pub fn new<I: IntoIterator<Item = Namespace>>(namespaces: I) -> NamespaceSet {
        let mut deduped = NamespaceVec::new();
        let mut summary = KindSummary::empty();
        for ns in namespaces {
            if deduped.contains(&ns) {
                continue;
            }
            summary |= kind_flag(&ns);
            deduped.push(ns);
        }
        NamespaceSet {
            namespaces: deduped,
            summary,
        }
    }

    pub fn empty() -> NamespaceSet {
        NamespaceSet {
            namespaces: NamespaceVec::new(),
            summary: KindSummary::empty(),
        }
    }

    pub fn len(&self) -> usize {
        self.namespaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Namespace> {
        self.namespaces.iter()
    }

    /// O(1) via the summary bitfield: does any member have the public
    /// namespace kind (`Namespace` kind with empty URI)?
    pub fn contains_public(&self) -> bool {
        self.summary.contains(KindSummary::PUBLIC)
    }

    /// O(1) via the summary bitfield: does any member have this namespace
    /// *kind* (not necessarily this exact namespace)?
    pub fn contains_kind(&self, ns: &Namespace) -> bool {
        self.summary.contains(kind_flag(ns))
    }

    /// Exact membership (falls back to a linear scan; `Private` equality
    /// needs the id compare that the summary bitfield can't encode).
    pub fn contains(&self, ns: &Namespace) -> bool {
        if !self.contains_kind(ns) {
            return false;
        }
        self.namespaces.contains(ns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_preserves_first_seen_order() {
        let a = Namespace::package("a");
        let b = Namespace::package("b");
        let set = NamespaceSet::new([a.clone(), b.clone(), a.clone()]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![&a, &b]);
    }

    #[test]
    fn contains_public_is_true_for_public_member() {
        let set = NamespaceSet::new([Namespace::package("x"), Namespace::public()]);
        assert!(set.contains_public());
    }

    #[test]
    fn contains_public_is_false_without_public_member() {
        let set = NamespaceSet::new([Namespace::package("x"), Namespace::package("y")]);
        assert!(!set.contains_public());
    }

    #[test]
    fn contains_kind_true_for_matching_kind_even_different_uri() {
        let set = NamespaceSet::new([Namespace::package("x")]);
        assert!(set.contains_kind(&Namespace::package("y")));
    }

    #[test]
    fn contains_exact_distinguishes_uri() {
        let set = NamespaceSet::new([Namespace::package("x")]);
        assert!(set.contains(&Namespace::package("x")));
        assert!(!set.contains(&Namespace::package("y")));
    }

    #[test]
    fn empty_set_contains_nothing() {
        let set = NamespaceSet::empty();
        assert!(!set.contains_public());
        assert!(!set.contains(&Namespace::public()));
    }
}
