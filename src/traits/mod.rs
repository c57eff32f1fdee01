//! `Trait` and its concrete variants (spec.md §3, §4.3.4, §4.3.6).
//!
//! A `Trait` is a polymorphic abstraction over `{tryGetValue, trySetValue,
//! tryInvoke, tryConstruct, kind, name, declaringClass}` encoded here as a
//! tagged sum, per spec.md §9 "Polymorphism" recommendation.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use once_cell::sync::OnceCell;

use crate::bind_status::BindStatus;
use crate::class::Class;
use crate::domain::ApplicationDomain;
use crate::error::CoreError;
use crate::qname::QName;
use crate::value::{Instance, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraitKind {
    Class,
    Field,
    Property,
    Method,
    Constant,
}

/// A single formal parameter of a method signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub type_name: Option<QName>,
    pub optional: bool,
    pub has_default: bool,
}

/// A native dispatch target: `receiver` is `None` for scope-receiver-less
/// (static/global) calls.
pub type NativeDispatch = dyn Fn(Option<&Value>, &[Value]) -> Result<Value, CoreError> + Send + Sync;

/// Builds the lazily-materialised dispatch stub for a method trait. This
/// is an external collaborator boundary (spec.md §1 "JIT dispatch-stub
/// generator" is out of scope); this core only calls through it.
pub trait DispatchStubBuilder: fmt::Debug + Send + Sync {
    fn build(&self, method: &MethodTrait) -> Arc<NativeDispatch>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature {
    pub params: Vec<Param>,
    pub return_type: Option<QName>,
    /// True if the method declares a return type at all (distinguishes
    /// `void`/untyped returns from "no return annotation").
    pub has_return: bool,
    pub has_rest: bool,
    pub needs_scope_receiver: bool,
}

impl MethodSignature {
    /// Structural shape comparison used by override checking and interface
    /// merge signature compatibility (spec.md §4.3.6).
    pub fn shape_compatible(&self, other: &MethodSignature) -> bool {
        self.has_return == other.has_return
            && self.return_type == other.return_type
            && self.has_rest == other.has_rest
            && self.params.len() == other.params.len()
            && self
                .params
                .iter()
                .zip(other.params.iter())
                .all(|(a, b)| {
                    a.type_name == b.type_name
                        && a.optional == b.optional
                        && a.has_default == b.has_default
                })
    }
}

pub struct MethodTrait {
    pub signature: MethodSignature,
    pub is_override: bool,
    stub_builder: Arc<dyn DispatchStubBuilder>,
    dispatch: OnceCell<Arc<NativeDispatch>>,
}

impl fmt::Debug for MethodTrait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodTrait")
            .field("signature", &self.signature)
            .field("is_override", &self.is_override)
            .field("linked", &self.dispatch.get().is_some())
            .finish()
    }
}

impl MethodTrait {
    pub fn new(signature: MethodSignature, is_override: bool, stub_builder: Arc<dyn DispatchStubBuilder>) -> MethodTrait {
        MethodTrait {
            signature,
            is_override,
            stub_builder,
            dispatch: OnceCell::new(),
        }
    }

    fn dispatch(&self) -> &Arc<NativeDispatch> {
        self.dispatch.get_or_init(|| self.stub_builder.build(self))
    }

    fn invoke(&self, receiver: Option<&Value>, args: &[Value]) -> Result<(BindStatus, Value), CoreError> {
        if receiver.is_none() && self.signature.needs_scope_receiver {
            return Ok((BindStatus::FailedNotFunction, Value::Undefined));
        }
        match (self.dispatch())(receiver, args) {
            Ok(value) => Ok((BindStatus::Success, value)),
            Err(err) => Err(err),
        }
    }
}

#[derive(Debug)]
pub struct FieldTrait {
    pub type_name: Option<QName>,
    pub slot_id: u32,
    pub read_only: bool,
}

/// A property's getter and/or setter; each, if present, is a `Method`-kind
/// sub-trait. `Property` traits merge per spec.md §4.3.4/§4.3.6.
#[derive(Debug, Clone)]
pub struct PropertyTrait {
    pub getter: Option<Arc<Trait>>,
    pub setter: Option<Arc<Trait>>,
}

impl PropertyTrait {
    /// Two properties merge when their accessor roles don't conflict: at
    /// most one side supplies each of getter/setter (spec.md §4.3.4).
    pub fn mergeable_with(&self, other: &PropertyTrait) -> bool {
        !(self.getter.is_some() && other.getter.is_some())
            && !(self.setter.is_some() && other.setter.is_some())
    }

    /// Merge, taking each non-null accessor from whichever side has it.
    pub fn merge(&self, other: &PropertyTrait) -> PropertyTrait {
        PropertyTrait {
            getter: self.getter.clone().or_else(|| other.getter.clone()),
            setter: self.setter.clone().or_else(|| other.setter.clone()),
        }
    }

    /// Recursive signature-compatibility check for interface merge
    /// (spec.md §4.3.6): both sides' present accessors must be
    /// shape-compatible methods.
    pub fn signature_compatible(&self, other: &PropertyTrait) -> bool {
        fn method_of(t: &Option<Arc<Trait>>) -> Option<&MethodTrait> {
            t.as_ref().and_then(|t| match &t.variant {
                TraitVariant::Method(m) => Some(m),
                _ => None,
            })
        }
        match (method_of(&self.getter), method_of(&other.getter)) {
            (Some(a), Some(b)) if !a.signature.shape_compatible(&b.signature) => return false,
            _ => {}
        }
        match (method_of(&self.setter), method_of(&other.setter)) {
            (Some(a), Some(b)) if !a.signature.shape_compatible(&b.signature) => return false,
            _ => {}
        }
        true
    }
}

#[derive(Debug, Clone)]
pub struct ConstantTrait {
    pub value: ConstantValue,
}

/// Constants are resolved before any `Instance` exists, so they cannot
/// hold an arbitrary `Value::Object` without a circular bootstrap
/// dependency; this covers everything the ABC constant pool can express.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue {
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(Arc<str>),
}

impl From<&ConstantValue> for Value {
    fn from(c: &ConstantValue) -> Value {
        match c {
            ConstantValue::Undefined => Value::Undefined,
            ConstantValue::Null => Value::Null,
            ConstantValue::Boolean(b) => Value::Boolean(*b),
            ConstantValue::Number(n) => Value::Number(*n),
            ConstantValue::String(s) => Value::String(s.clone()),
        }
    }
}

#[derive(Debug)]
pub enum TraitVariant {
    Field(FieldTrait),
    Method(MethodTrait),
    Property(PropertyTrait),
    Constant(ConstantTrait),
    Class(Class),
}

impl TraitVariant {
    pub fn kind(&self) -> TraitKind {
        match self {
            TraitVariant::Field(_) => TraitKind::Field,
            TraitVariant::Method(_) => TraitKind::Method,
            TraitVariant::Property(_) => TraitKind::Property,
            TraitVariant::Constant(_) => TraitKind::Constant,
            TraitVariant::Class(_) => TraitKind::Class,
        }
    }
}

/// A single declaration: name, declaring class (`None` for globals and
/// standalone methods), owning domain, static flag, metadata, and a
/// variant payload (spec.md §3). Metadata preserves declaration order
/// (an ABC metadata tag's keys are meaningful in the order the compiler
/// emitted them, e.g. repeated `[Event]` tags), which is why it's an
/// `IndexMap` rather than a `HashMap`.
#[derive(Debug)]
pub struct Trait {
    pub name: QName,
    pub declaring_class: Option<Class>,
    pub domain: ApplicationDomain,
    pub is_static: bool,
    pub metadata: IndexMap<String, String>,
    pub variant: TraitVariant,
}

impl Trait {
    pub fn kind(&self) -> TraitKind {
        self.variant.kind()
    }

    pub fn metadata_get(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(|v| v.as_str())
    }

    pub fn try_get_value(&self, receiver: Option<&Value>) -> Result<(BindStatus, Value), CoreError> {
        match &self.variant {
            TraitVariant::Field(field) => {
                let Some(instance) = receiver.and_then(Value::as_instance) else {
                    return Ok((BindStatus::NotFound, Value::Undefined));
                };
                Ok((BindStatus::Success, instance.get_slot(field.slot_id)))
            }
            TraitVariant::Method(_) => Ok((BindStatus::SoftSuccess, Value::Undefined)),
            TraitVariant::Property(prop) => match &prop.getter {
                Some(getter) => getter.try_invoke(receiver, &[]),
                None => Ok((BindStatus::FailedWriteOnly, Value::Undefined)),
            },
            TraitVariant::Constant(constant) => {
                Ok((BindStatus::Success, Value::from(&constant.value)))
            }
            TraitVariant::Class(_) => Ok((BindStatus::SoftSuccess, Value::Undefined)),
        }
    }

    pub fn try_set_value(&self, receiver: Option<&Value>, value: Value) -> Result<BindStatus, CoreError> {
        match &self.variant {
            TraitVariant::Field(field) => {
                if field.read_only {
                    return Ok(BindStatus::FailedReadOnly);
                }
                let Some(instance) = receiver.and_then(Value::as_instance) else {
                    return Ok(BindStatus::NotFound);
                };
                instance.set_slot(field.slot_id, value);
                Ok(BindStatus::Success)
            }
            TraitVariant::Method(_) => Ok(BindStatus::FailedAssignMethod),
            TraitVariant::Property(prop) => match &prop.setter {
                Some(setter) => setter.try_invoke(receiver, std::slice::from_ref(&value)).map(|(s, _)| s),
                None => Ok(BindStatus::FailedReadOnly),
            },
            TraitVariant::Constant(_) => Ok(BindStatus::FailedReadOnly),
            TraitVariant::Class(_) => Ok(BindStatus::FailedAssignClass),
        }
    }

    pub fn try_invoke(&self, receiver: Option<&Value>, args: &[Value]) -> Result<(BindStatus, Value), CoreError> {
        match &self.variant {
            TraitVariant::Method(method) => method.invoke(receiver, args),
            TraitVariant::Class(class) => class.try_invoke(args),
            _ => Ok((BindStatus::FailedNotFunction, Value::Undefined)),
        }
    }

    pub fn try_construct(&self, args: &[Value]) -> Result<(BindStatus, Value), CoreError> {
        match &self.variant {
            TraitVariant::Class(class) => class.try_construct(args),
            TraitVariant::Method(_) => Ok((BindStatus::FailedMethodConstruct, Value::Undefined)),
            _ => Ok((BindStatus::FailedNotConstructor, Value::Undefined)),
        }
    }
}
