//! Core type system and name-resolution runtime for an AVM2-style virtual
//! machine: namespaces, qualified names, the multi-index trait table,
//! class closure/assignability, and application domains.
//!
//! This crate has no wire protocol or file format of its own (spec.md
//! §6); it is a programmatic API consumed by a compiler, a JIT, and host
//! code that supplies the actual object representation, bytecode loader,
//! and dispatch-stub generator as external collaborators.

pub mod bind_status;
pub mod class;
pub mod domain;
pub mod error;
pub mod loader;
pub mod multiname;
pub mod namespace;
pub mod namespace_set;
pub mod qname;
pub mod trait_table;
pub mod traits;
pub mod value;
pub mod zone;

pub use bind_status::BindStatus;
pub use class::{Class, ClassAttributes, ClassBuilder, ClassSpecials, ClassTag, ZoneObject, ZoneObjectFactory};
pub use domain::{get_current_domain, ApplicationDomain, GlobalMemoryBuffer, ModuleHandle};
pub use error::{CoreError, NativeClassLoadError};
pub use loader::{
    create_script_loader, load_native_class, load_native_classes_from_assembly, load_native_module,
    AssemblyHandle, NativeClassSource, NativeTypeHandle, ScriptLoader, ScriptLoaderOptions,
};
pub use multiname::Multiname;
pub use namespace::Namespace;
pub use namespace_set::NamespaceSet;
pub use qname::QName;
pub use trait_table::{Scope, TraitTable};
pub use traits::{
    ConstantTrait, ConstantValue, DispatchStubBuilder, FieldTrait, MethodSignature, MethodTrait, NativeDispatch,
    Param, PropertyTrait, Trait, TraitKind, TraitVariant,
};
pub use value::{Instance, Value};
pub use zone::{SimpleZone, Zone, ZoneId};
