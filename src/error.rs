//! The error taxonomy raised by the core (spec.md §7).
//!
//! These are distinct from [`crate::bind_status::BindStatus`]: bind statuses
//! are returned from resolution attempts and only become a `CoreError` when
//! a caller uses a convenience operation that must produce a value rather
//! than tolerate failure (spec.md §7 "Propagation").

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NativeClassLoadError {
    #[error("native class `{0}` has no registered allocator")]
    UnknownType(String),
    #[error("native class `{0}` failed signature validation against its ABC declaration")]
    SignatureMismatch(String),
    #[error("native module `{0}` is already registered to a different domain")]
    AlreadyRegistered(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("ArgumentError: argument `{0}` must not be null")]
    ArgumentNull(&'static str),

    #[error("RangeError: argument `{argument}` is out of range ({detail})")]
    ArgumentOutOfRange {
        argument: &'static str,
        detail: String,
    },

    #[error("ReferenceError: Error #1034: ambiguous reference to {0}")]
    AmbiguousName(String),

    #[error("ReferenceError: Error #1065: Variable {0} is not defined")]
    PropertyNotFound(String),

    #[error("ReferenceError: Error #1037: Cannot assign to method {0}")]
    CannotAssignToMethod(String),

    #[error("ReferenceError: Error #1038: Cannot assign to class {0}")]
    CannotAssignToClass(String),

    #[error("Error: Error #1074: Illegal get of write-only property {0}")]
    IllegalWriteOnly(String),

    #[error("Error: Error #1074: Illegal set of read-only property {0}")]
    IllegalReadOnly(String),

    #[error("ReferenceError: Error #1078: Cannot create property {0} on non-public namespace")]
    CannotCreatePropertyNonPublic(String),

    #[error("TypeError: Error #1007: Cannot call a method as a constructor: {0}")]
    CannotCallMethodAsCtor(String),

    #[error("TypeError: Error #1180: Cannot construct a non-constructor: {0}")]
    InstantiateNonConstructor(String),

    #[error("ArgumentError: Error #1115: Class {0} cannot be instantiated")]
    ClassCannotBeInstantiated(String),

    #[error("ArgumentError: Error #1116: coercion of {received} argument(s) to {class} requires exactly 1")]
    ClassCoerceArgCountMismatch { class: String, received: usize },

    #[error("ArgumentError: Error #1063: Argument count mismatch on {method} ({expected} expected, {received} supplied)")]
    ArgCountMismatch {
        method: String,
        expected: usize,
        received: usize,
    },

    #[error("TypeError: Error #1034: Type Coercion failed: cannot convert value to {0}")]
    TypeCoercionFailed(String),

    #[error("VerifyError: Error #1053: {trait_name} in class {class_name} cannot coexist with the trait inherited from {parent_name}")]
    NameConflictInClass {
        trait_name: String,
        class_name: String,
        parent_name: String,
    },

    #[error("VerifyError: Error #1061: incompatible override of {0} across interfaces")]
    InterfaceTraitSignatureMismatch(String),

    #[error("VerifyError: trait table for {0} is corrupted by a previous merge failure")]
    TraitTableCorrupted(String),

    #[error("Error: Error #1086: the private namespace id space is exhausted")]
    PrivateNamespaceLimitExceeded,

    #[error("the system domain's core-classes loader has already been installed")]
    CoreClassesLoaderAlreadyInstalled,

    #[error("SecurityError: Error #3012: cannot load an ABC file into the system domain")]
    LoadAbcIntoSystemDomain,

    #[error(transparent)]
    NativeClassLoad(#[from] NativeClassLoadError),

    #[error("TypeError: Error #1009: Cannot access a property or method of a null object reference")]
    NullReferenceError,

    #[error("TypeError: Error #1010: a term is undefined and has no properties")]
    UndefinedReferenceError,
}
