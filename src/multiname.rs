//! The lookup key used against a `TraitTable`: either a fully qualified
//! name or a local name paired with a namespace set (spec.md §4.3.3, §6).

use crate::namespace::Namespace;
use crate::namespace_set::NamespaceSet;
use crate::qname::QName;

/// What bytecode actually hands a lookup: a single qualified name, or a
/// local name resolved against a set of namespaces (a "multiname" in the
/// AVM2 sense).
#[derive(Debug, Clone)]
pub enum Multiname {
    Qualified(QName),
    Unqualified {
        local: String,
        namespaces: NamespaceSet,
    },
}

impl Multiname {
    pub fn qualified(ns: Namespace, local: impl Into<String>) -> Multiname {
        Multiname::Qualified(QName::new(ns, local))
    }

    pub fn unqualified(local: impl Into<String>, namespaces: NamespaceSet) -> Multiname {
        Multiname::Unqualified {
            local: local.into(),
            namespaces,
        }
    }

    /// The local-name component shared by both variants; `None` only for
    /// the "any name" qualified form.
    pub fn local(&self) -> Option<&str> {
        match self {
            Multiname::Qualified(qname) => qname.local_str(),
            Multiname::Unqualified { local, .. } => Some(local),
        }
    }

    /// True when this multiname's namespace component is the `Any`
    /// namespace (a qualified name with `ns = Any`, the wildcard form).
    pub fn is_any_namespace(&self) -> bool {
        matches!(self, Multiname::Qualified(qname) if qname.ns.is_any())
    }

    pub fn is_public(&self) -> bool {
        match self {
            Multiname::Qualified(qname) => qname.ns.is_public(),
            Multiname::Unqualified { namespaces, .. } => {
                namespaces.len() == 1 && namespaces.contains_public()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualified_any_namespace_is_detected() {
        let m = Multiname::Qualified(QName::any());
        assert!(m.is_any_namespace());
    }

    #[test]
    fn unqualified_carries_local_name() {
        let m = Multiname::unqualified("f", NamespaceSet::new([Namespace::public()]));
        assert_eq!(m.local(), Some("f"));
    }
}
