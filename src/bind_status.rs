//! Resolution/invocation result codes (spec.md §4.2).
//!
//! A `BindStatus` is the non-raising counterpart to [`crate::error::CoreError`]:
//! lookups and binds return one of these so a caller can distinguish "not
//! found" from "found but ambiguous" from "found and usable" without paying
//! for an error allocation on the common path. Convenience operations that
//! must produce a value (or raise) convert a failing status via
//! [`BindStatus::into_error`].

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindStatus {
    /// No trait matched the name in any namespace of the set.
    NotFound,
    /// Exactly one trait matched and it is directly usable.
    Success,
    /// Value is conventionally undefined; in a scope-stack search this is
    /// treated as failure even though a candidate was found.
    SoftSuccess,
    /// More than one trait matched and none took precedence; see
    /// spec.md §4.3.5 for when this is reliable versus provisional.
    Ambiguous,
    /// `tryConstruct` invoked against a plain method trait.
    FailedMethodConstruct,
    /// `tryInvoke` against a trait that is not callable.
    FailedNotFunction,
    /// `tryConstruct` against a trait that is not a constructor.
    FailedNotConstructor,
    /// Dynamic property creation attempted in a non-public namespace.
    FailedCreateDynamicNonPublic,
    /// Read attempted against a write-only accessor.
    FailedReadOnly,
    /// Write attempted against a read-only accessor.
    FailedWriteOnly,
    /// Write attempted against a method trait.
    FailedAssignMethod,
    /// Write attempted against a class trait.
    FailedAssignClass,
    /// A descendant (`..`) operation was attempted where unsupported.
    FailedDescendantOp,
}

impl BindStatus {
    pub fn is_success(self) -> bool {
        matches!(self, BindStatus::Success | BindStatus::SoftSuccess)
    }

    pub fn is_failure(self) -> bool {
        !self.is_success()
    }

    /// Convert a failing status into the `CoreError` a raising API would
    /// throw, given the name being resolved. Returns `None` for a
    /// successful status — callers should not call this on success.
    pub fn into_error(self, name: &str) -> Option<CoreError> {
        match self {
            BindStatus::Success | BindStatus::SoftSuccess => None,
            BindStatus::NotFound => Some(CoreError::PropertyNotFound(name.to_string())),
            BindStatus::Ambiguous => Some(CoreError::AmbiguousName(name.to_string())),
            BindStatus::FailedMethodConstruct => {
                Some(CoreError::CannotCallMethodAsCtor(name.to_string()))
            }
            BindStatus::FailedNotFunction => {
                Some(CoreError::InstantiateNonConstructor(name.to_string()))
            }
            BindStatus::FailedNotConstructor => {
                Some(CoreError::InstantiateNonConstructor(name.to_string()))
            }
            BindStatus::FailedCreateDynamicNonPublic => {
                Some(CoreError::CannotCreatePropertyNonPublic(name.to_string()))
            }
            BindStatus::FailedReadOnly => Some(CoreError::IllegalReadOnly(name.to_string())),
            BindStatus::FailedWriteOnly => Some(CoreError::IllegalWriteOnly(name.to_string())),
            BindStatus::FailedAssignMethod => {
                Some(CoreError::CannotAssignToMethod(name.to_string()))
            }
            BindStatus::FailedAssignClass => {
                Some(CoreError::CannotAssignToClass(name.to_string()))
            }
            BindStatus::FailedDescendantOp => {
                Some(CoreError::InstantiateNonConstructor(name.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_variants_have_no_error() {
        assert!(BindStatus::Success.into_error("x").is_none());
        assert!(BindStatus::SoftSuccess.into_error("x").is_none());
    }

    #[test]
    fn not_found_maps_to_property_not_found() {
        assert!(matches!(
            BindStatus::NotFound.into_error("foo"),
            Some(CoreError::PropertyNotFound(_))
        ));
    }

    #[test]
    fn ambiguous_maps_to_ambiguous_name() {
        assert!(matches!(
            BindStatus::Ambiguous.into_error("foo"),
            Some(CoreError::AmbiguousName(_))
        ));
    }

    #[test]
    fn is_success_matches_is_failure_negation() {
        for status in [
            BindStatus::NotFound,
            BindStatus::Success,
            BindStatus::SoftSuccess,
            BindStatus::Ambiguous,
            BindStatus::FailedMethodConstruct,
            BindStatus::FailedNotFunction,
            BindStatus::FailedNotConstructor,
            BindStatus::FailedCreateDynamicNonPublic,
            BindStatus::FailedReadOnly,
            BindStatus::FailedWriteOnly,
            BindStatus::FailedAssignMethod,
            BindStatus::FailedAssignClass,
            BindStatus::FailedDescendantOp,
        ] {
            assert_eq!(status.is_success(), !status.is_failure());
        }
    }

    #[test]
    fn accessor_role_mismatch_statuses_map_distinctly() {
        assert!(matches!(
            BindStatus::FailedReadOnly.into_error("p"),
            Some(CoreError::IllegalReadOnly(_))
        ));
        assert!(matches!(
            BindStatus::FailedWriteOnly.into_error("p"),
            Some(CoreError::IllegalWriteOnly(_))
        ));
    }
}
