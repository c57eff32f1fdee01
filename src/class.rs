//! `Class` / `ClassImpl` (spec.md §3, §4.4).
//!
//! Grounded in the teacher's `Class`/`ClassAttributes` (`class.rs`) and
//! `VTable::init_vtable`'s clone-parent-then-overlay-own algorithm
//! (`vtable.rs`), adapted here into a seal-time topological rank (see
//! `TraitTable::seal_with_rank`) rather than an insertion-order trick, so
//! physical merge order can follow spec.md §4.4's literal step order
//! (own-declare, then merge) while canonical base-first ordering is still
//! guaranteed regardless. The reentrant one-time closure guard replaces
//! the teacher's `GcCell`-under-arena-owner model with an explicit
//! `Mutex<ClosureState> + Condvar` pair, since spec.md §5 requires the
//! guard to work across genuine OS threads.

use std::fmt;
use std::sync::{Arc, Condvar, Mutex, RwLock};
use std::thread::{self, ThreadId};

use bitflags::bitflags;
use downcast_rs::{impl_downcast, DowncastSync};
use indexmap::IndexMap;
use log::trace;
use once_cell::sync::OnceCell;

use crate::bind_status::BindStatus;
use crate::domain::ApplicationDomain;
use crate::error::CoreError;
use crate::multiname::Multiname;
use crate::namespace::Namespace;
use crate::qname::QName;
use crate::trait_table::{Scope, TraitTable};
use crate::traits::Trait;
use crate::value::{Instance, Value};
use crate::zone::{Zone, ZoneId};

bitflags! {
    pub struct ClassAttributes: u8 {
        const FINAL     = 1 << 0;
        const INTERFACE = 1 << 1;
        const DYNAMIC   = 1 << 2;
        const GENERIC   = 1 << 3;
    }
}

/// The closed enumeration distinguishing primitives and selected built-ins
/// from generic objects (spec.md §3 "Class / ClassImpl"). The built-in
/// class library itself is out of scope; this tag only exists so
/// assignability (§4.4) can special-case the handful of primitive kinds
/// bytecode coerces between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassTag {
    Object,
    Boolean,
    Int,
    Uint,
    Number,
    String,
    Void,
}

impl ClassTag {
    /// `true` when a value tagged `self` can be coerced to `other`
    /// without user-class-hierarchy involvement (e.g. `Int` to `Number`).
    fn primitive_assignable_to(self, other: ClassTag) -> bool {
        use ClassTag::*;
        match (self, other) {
            (a, b) if a == b => true,
            (Int | Uint, Number) => true,
            (Int, Uint) | (Uint, Int) => false,
            _ => false,
        }
    }
}

/// Per-zone object produced by a host VM for a class's prototype or class
/// object. Downcast-able so a host can recover its own concrete type.
pub trait ZoneObject: DowncastSync + fmt::Debug {}
impl_downcast!(sync ZoneObject);

/// Builds the per-zone prototype and class object on first access
/// (spec.md §4.4 "treated as an external factory"). A host VM supplies
/// one per class.
pub trait ZoneObjectFactory: fmt::Debug + Send + Sync {
    fn make_prototype(&self, class: &Class) -> Arc<dyn ZoneObject>;
    fn make_class_object(&self, class: &Class, prototype: &Arc<dyn ZoneObject>) -> Arc<dyn ZoneObject>;
}

/// Non-standard invoke/construct and numeric-index property overrides
/// (spec.md §3, §4.4). `merge` combines a child's specials with its
/// parent's, taking the child's handler for any slot it supplies and
/// falling back to the parent's otherwise.
#[derive(Clone)]
pub struct ClassSpecials {
    pub invoke: Option<Arc<dyn Fn(&[Value]) -> Result<Value, CoreError> + Send + Sync>>,
    pub construct: Option<Arc<dyn Fn(&[Value]) -> Result<Value, CoreError> + Send + Sync>>,
    pub numeric_get: Option<Arc<dyn Fn(&dyn Instance, i64) -> Option<Value> + Send + Sync>>,
    pub numeric_set: Option<Arc<dyn Fn(&dyn Instance, i64, Value) -> Result<(), CoreError> + Send + Sync>>,
    pub vector_of_this_factory: Option<Arc<dyn Fn(&Class) -> Class + Send + Sync>>,
}

impl Default for ClassSpecials {
    fn default() -> Self {
        ClassSpecials {
            invoke: None,
            construct: None,
            numeric_get: None,
            numeric_set: None,
            vector_of_this_factory: None,
        }
    }
}

impl fmt::Debug for ClassSpecials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassSpecials")
            .field("invoke", &self.invoke.is_some())
            .field("construct", &self.construct.is_some())
            .field("numeric_get", &self.numeric_get.is_some())
            .field("numeric_set", &self.numeric_set.is_some())
            .field("vector_of_this_factory", &self.vector_of_this_factory.is_some())
            .finish()
    }
}

impl ClassSpecials {
    pub fn merge_with_parent(&self, parent: &ClassSpecials) -> ClassSpecials {
        ClassSpecials {
            invoke: self.invoke.clone().or_else(|| parent.invoke.clone()),
            construct: self.construct.clone().or_else(|| parent.construct.clone()),
            numeric_get: self.numeric_get.clone().or_else(|| parent.numeric_get.clone()),
            numeric_set: self.numeric_set.clone().or_else(|| parent.numeric_set.clone()),
            vector_of_this_factory: self
                .vector_of_this_factory
                .clone()
                .or_else(|| parent.vector_of_this_factory.clone()),
        }
    }
}

/// Three-state lifecycle of a class record (spec.md §3).
enum ClosureState {
    Constructed,
    /// Another thread — or this same thread, re-entrantly — is running
    /// the closure algorithm.
    InProgress(ThreadId),
    Closed,
    Corrupted(CoreError),
}

struct ClassImpl {
    name: QName,
    domain: ApplicationDomain,
    tag: ClassTag,
    parent: Option<Class>,
    attributes: ClassAttributes,
    protected_namespace: Namespace,
    /// Transitively-flattened list of every interface this class
    /// implements, directly or through a super-interface (spec.md §4.3.6
    /// note on `mergeWithParentInterface`).
    interfaces: Vec<Class>,
    traits: TraitTable,
    constructor: OnceCell<Option<Arc<Trait>>>,
    closure: Mutex<ClosureState>,
    closure_cv: Condvar,
    specials: RwLock<Arc<ClassSpecials>>,
    own_specials: ClassSpecials,
    allow_hiding: bool,
    zone_factory: Arc<dyn ZoneObjectFactory>,
    zone_objects: Mutex<std::collections::HashMap<ZoneId, (Arc<dyn ZoneObject>, Arc<dyn ZoneObject>)>>,
    vector_of_this: OnceCell<Class>,
    declare: Box<dyn Fn(&Class) -> Result<(), CoreError> + Send + Sync>,
}

impl fmt::Debug for ClassImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassImpl").field("name", &self.name).finish()
    }
}

/// A handle to a class record (spec.md §3, §4.4). Cheap to clone; all
/// instances referring to the same class share one `ClassImpl` via `Arc`.
#[derive(Clone, Debug)]
pub struct Class(Arc<ClassImpl>);

/// What a class's own declaration step contributes: the traits this class
/// itself declares (spec.md §4.4 step 3), and whether hiding is allowed
/// during parent merge (spec.md §4.3.6).
pub struct ClassBuilder {
    name: QName,
    domain: ApplicationDomain,
    tag: ClassTag,
    parent: Option<Class>,
    attributes: ClassAttributes,
    protected_namespace: Namespace,
    interfaces: Vec<Class>,
    zone_factory: Arc<dyn ZoneObjectFactory>,
    own_specials: ClassSpecials,
    allow_hiding: bool,
    declare: Box<dyn Fn(&Class) -> Result<(), CoreError> + Send + Sync>,
}

impl ClassBuilder {
    pub fn new(
        name: QName,
        domain: ApplicationDomain,
        zone_factory: Arc<dyn ZoneObjectFactory>,
        declare: impl Fn(&Class) -> Result<(), CoreError> + Send + Sync + 'static,
    ) -> ClassBuilder {
        ClassBuilder {
            name,
            domain,
            tag: ClassTag::Object,
            parent: None,
            attributes: ClassAttributes::empty(),
            protected_namespace: Namespace::public(),
            interfaces: Vec::new(),
            zone_factory,
            own_specials: ClassSpecials::default(),
            allow_hiding: false,
            declare: Box::new(declare),
        }
    }

    pub fn tag(mut self, tag: ClassTag) -> Self {
        self.tag = tag;
        self
    }

    pub fn parent(mut self, parent: Class) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn attributes(mut self, attributes: ClassAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn protected_namespace(mut self, ns: Namespace) -> Self {
        self.protected_namespace = ns;
        self
    }

    pub fn interfaces(mut self, interfaces: Vec<Class>) -> Self {
        self.interfaces = interfaces;
        self
    }

    pub fn specials(mut self, specials: ClassSpecials) -> Self {
        self.own_specials = specials;
        self
    }

    pub fn allow_hiding(mut self, allow_hiding: bool) -> Self {
        self.allow_hiding = allow_hiding;
        self
    }

    pub fn build(self) -> Class {
        let is_interface = self.attributes.contains(ClassAttributes::INTERFACE);
        let parent_for_closure = self.parent.clone();
        let interfaces_for_closure = self.interfaces.clone();
        let declare = self.declare;
        Class(Arc::new(ClassImpl {
            name: self.name,
            domain: self.domain,
            tag: self.tag,
            parent: self.parent,
            attributes: self.attributes,
            protected_namespace: self.protected_namespace,
            interfaces: self.interfaces,
            traits: TraitTable::new(is_interface),
            constructor: OnceCell::new(),
            closure: Mutex::new(ClosureState::Constructed),
            closure_cv: Condvar::new(),
            specials: RwLock::new(Arc::new(ClassSpecials::default())),
            own_specials: self.own_specials,
            allow_hiding: self.allow_hiding,
            zone_factory: self.zone_factory,
            zone_objects: Mutex::new(std::collections::HashMap::new()),
            vector_of_this: OnceCell::new(),
            declare: {
                let parent = parent_for_closure;
                let interfaces = interfaces_for_closure;
                // Step 1-3 of spec.md §4.4: ensure ancestors are closed,
                // then run this class's own declaration step. Steps 4-6
                // (merge, seal, merge specials) happen in `run_closure`,
                // which ranks every trait by its declaring class's
                // position in the hierarchy at seal time — so it doesn't
                // matter that the merge step runs after this one.
                Box::new(move |class: &Class| {
                    for iface in &interfaces {
                        iface.ensure_closed()?;
                    }
                    if let Some(parent) = &parent {
                        parent.ensure_closed()?;
                    }
                    declare(class)
                })
            },
        }))
    }
}

impl Class {
    pub fn name(&self) -> &QName {
        &self.0.name
    }

    pub fn domain(&self) -> &ApplicationDomain {
        &self.0.domain
    }

    pub fn tag(&self) -> ClassTag {
        self.0.tag
    }

    pub fn parent(&self) -> Option<&Class> {
        self.0.parent.as_ref()
    }

    pub fn is_interface(&self) -> bool {
        self.0.attributes.contains(ClassAttributes::INTERFACE)
    }

    pub fn is_final(&self) -> bool {
        self.0.attributes.contains(ClassAttributes::FINAL)
    }

    pub fn is_dynamic(&self) -> bool {
        self.0.attributes.contains(ClassAttributes::DYNAMIC)
    }

    pub fn ptr_eq(&self, other: &Class) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Transitive interface set: this class's flattened `interfaces` plus,
    /// for a subclass, its parent's transitive interfaces.
    pub fn transitive_interfaces(&self) -> Vec<Class> {
        let mut out = self.0.interfaces.clone();
        if let Some(parent) = &self.0.parent {
            for iface in parent.transitive_interfaces() {
                if !out.iter().any(|c| c.ptr_eq(&iface)) {
                    out.push(iface);
                }
            }
        }
        out
    }

    fn extends(&self, other: &Class) -> bool {
        let mut cur = self.0.parent.clone();
        while let Some(c) = cur {
            if c.ptr_eq(other) {
                return true;
            }
            cur = c.0.parent.clone();
        }
        false
    }

    /// Assignability (spec.md §4.4): `A` assignable to `B` iff `A == B`,
    /// `B` is the "any" destination (handled by caller passing `None`),
    /// `B`'s underlying type accepts `A`'s, `B` is an interface in `A`'s
    /// transitive interface set, `A` is an interface and `B` is the root
    /// object class, or `A` transitively extends `B`.
    pub fn is_assignable_to(&self, other: &Class) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        if self.0.tag.primitive_assignable_to(other.0.tag) {
            return true;
        }
        if other.is_interface() && self.transitive_interfaces().iter().any(|c| c.ptr_eq(other)) {
            return true;
        }
        if self.is_interface() && other.parent().is_none() && !other.is_interface() {
            return true;
        }
        self.extends(other)
    }

    /// Ensures the class has completed closure, blocking the caller if
    /// another thread is currently closing it. Recursive re-entry by the
    /// closing thread itself returns immediately (spec.md §9 "Lazy
    /// initialisation").
    pub fn ensure_closed(&self) -> Result<(), CoreError> {
        let this_thread = thread::current().id();
        let mut guard = self.0.closure.lock().unwrap();
        loop {
            match &*guard {
                ClosureState::Closed => return Ok(()),
                ClosureState::Corrupted(err) => return Err(err.clone()),
                ClosureState::InProgress(owner) if *owner == this_thread => {
                    // Reentrant: the thread performing closure asked for
                    // one of its own members again. The table is
                    // partially visible (declared traits so far); report
                    // success so the caller sees the in-progress state
                    // rather than deadlocking.
                    return Ok(());
                }
                ClosureState::InProgress(_) => {
                    guard = self.0.closure_cv.wait(guard).unwrap();
                    continue;
                }
                ClosureState::Constructed => {
                    *guard = ClosureState::InProgress(this_thread);
                    break;
                }
            }
        }
        drop(guard);
        let result = self.run_closure();
        let mut guard = self.0.closure.lock().unwrap();
        *guard = match &result {
            Ok(()) => ClosureState::Closed,
            Err(err) => ClosureState::Corrupted(err.clone()),
        };
        self.0.closure_cv.notify_all();
        drop(guard);
        result
    }

    /// Depth in the non-interface parent chain (0 for a root class). Used
    /// only to rank instance traits base-first at seal time.
    fn depth(&self) -> usize {
        let mut d = 0;
        let mut cur = self.0.parent.clone();
        while let Some(c) = cur {
            d += 1;
            cur = c.0.parent.clone();
        }
        d
    }

    fn run_closure(&self) -> Result<(), CoreError> {
        trace!("closing class {}", self.0.name);
        (self.0.declare)(self)?;
        let allow_hiding = self.0.allow_hiding;
        if self.is_interface() {
            for iface in &self.0.interfaces {
                self.0
                    .traits
                    .merge_with_parent_interface(&iface.0.traits.declared_instance_traits())?;
            }
        } else if let Some(parent) = &self.0.parent {
            self.0
                .traits
                .merge_with_parent_class(&parent.0.traits.all_instance_traits(), allow_hiding)?;
        }

        // Rank every instance trait by its declaring class's position in
        // the hierarchy (interface DAG position for an interface, parent
        // chain depth otherwise) so seal() can establish base-first
        // canonical order regardless of the order traits were merged in.
        let is_interface = self.is_interface();
        let interfaces = self.0.interfaces.clone();
        let self_for_rank = self.clone();
        let own_rank = if is_interface { interfaces.len() } else { self.depth() };
        self.0.traits.seal_with_rank(
            move |t: &Trait| match &t.declaring_class {
                Some(c) if c.ptr_eq(&self_for_rank) => own_rank,
                Some(c) if is_interface => interfaces
                    .iter()
                    .position(|i| i.ptr_eq(c))
                    .unwrap_or(own_rank),
                Some(c) => c.depth(),
                None => 0,
            },
            own_rank,
        );

        let own = Arc::new(self.0.own_specials.clone());
        let merged = match &self.0.parent {
            Some(parent) => Arc::new(own.merge_with_parent(&parent.specials())),
            None => own,
        };
        *self.0.specials.write().unwrap() = merged;
        Ok(())
    }

    pub fn specials(&self) -> Arc<ClassSpecials> {
        self.0.specials.read().unwrap().clone()
    }

    pub fn traits(&self) -> &TraitTable {
        &self.0.traits
    }

    /// Looks up a method by name among instance traits, closing the class
    /// first if needed. Used by override-discipline tests (spec.md §8
    /// invariant 3).
    pub fn get_method(&self, name: &QName) -> Result<Option<Arc<Trait>>, CoreError> {
        self.ensure_closed()?;
        let (status, found) = self.0.traits.lookup_by_qname(Scope::Instance, name);
        Ok(if status.is_success() { found } else { None })
    }

    pub fn get_property(&self, name: &QName) -> Result<(BindStatus, Option<Arc<Trait>>), CoreError> {
        self.ensure_closed()?;
        Ok(self.0.traits.lookup_by_qname(Scope::Instance, name))
    }

    /// Multiname-dispatching lookup (spec.md §4.3.3/§6): a qualified name
    /// resolves exactly via `lookup_by_qname`; an unqualified name
    /// resolves its local name against a namespace set via
    /// `TraitTable::lookup_by_local_nsset`, surfacing `Ambiguous` when the
    /// set admits more than one same-local-name trait this class declares.
    pub fn get_trait_by_multiname(&self, name: &Multiname) -> Result<(BindStatus, Option<Arc<Trait>>), CoreError> {
        self.ensure_closed()?;
        Ok(match name {
            Multiname::Qualified(qname) => self.0.traits.lookup_by_qname(Scope::Instance, qname),
            Multiname::Unqualified { local, namespaces } => {
                self.0.traits.lookup_by_local_nsset(Scope::Instance, local, namespaces)
            }
        })
    }

    /// Materialises (once per zone) and returns this class's prototype and
    /// class object. The prototype's `constructor` slot is set to the
    /// class object before returning, per spec.md §4.4.
    pub fn zone_objects(&self, zone: &dyn Zone) -> (Arc<dyn ZoneObject>, Arc<dyn ZoneObject>) {
        let mut objects = self.0.zone_objects.lock().unwrap();
        if let Some(existing) = objects.get(&zone.id()) {
            return existing.clone();
        }
        let prototype = self.0.zone_factory.make_prototype(self);
        let class_object = self.0.zone_factory.make_class_object(self, &prototype);
        let entry = (prototype, class_object);
        objects.insert(zone.id(), entry.clone());
        entry
    }

    /// The lazily-materialised `Vector.<ThisClass>` companion class
    /// (spec.md §3), built via the host-supplied factory in
    /// `ClassSpecials::vector_of_this_factory`.
    pub fn vector_of_this(&self) -> Option<Class> {
        let factory = self.specials().vector_of_this_factory.clone()?;
        Some(self.0.vector_of_this.get_or_init(|| factory(self)).clone())
    }

    /// `tryInvoke` when a class is used as a callable (spec.md §4.4):
    /// delegates to a special-invoke handler, else coerces a single
    /// argument.
    pub fn try_invoke(&self, args: &[Value]) -> Result<(BindStatus, Value), CoreError> {
        if let Some(invoke) = self.specials().invoke.clone() {
            return Ok((BindStatus::Success, invoke(args)?));
        }
        if args.len() == 1 {
            let arg = &args[0];
            let assignable = match arg {
                Value::Undefined | Value::Null => true,
                Value::Object(instance) => instance.class().is_assignable_to(self),
                _ => false,
            };
            if assignable {
                return Ok((BindStatus::Success, arg.clone()));
            }
            return Err(CoreError::TypeCoercionFailed(self.0.name.to_string()));
        }
        Err(CoreError::ArgCountMismatch {
            method: self.0.name.to_string(),
            expected: 1,
            received: args.len(),
        })
    }

    /// `tryConstruct` (spec.md §4.4): special-construct handler, else the
    /// declared constructor, else "not instantiable".
    pub fn try_construct(&self, args: &[Value]) -> Result<(BindStatus, Value), CoreError> {
        if let Some(construct) = self.specials().construct.clone() {
            return Ok((BindStatus::Success, construct(args)?));
        }
        self.ensure_closed()?;
        if let Some(ctor) = self.0.constructor.get().cloned().flatten() {
            return ctor.try_invoke(None, args);
        }
        Err(CoreError::ClassCannotBeInstantiated(self.0.name.to_string()))
    }

    pub fn set_constructor(&self, ctor: Option<Arc<Trait>>) {
        let _ = self.0.constructor.set(ctor);
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ApplicationDomain;
    use crate::multiname::Multiname;
    use crate::namespace_set::NamespaceSet;
    use crate::trait_table::AddOutcome;
    use crate::traits::{DispatchStubBuilder, MethodSignature, MethodTrait, NativeDispatch, Param, PropertyTrait, TraitVariant};

    #[derive(Debug)]
    struct NoopZoneObject;
    impl ZoneObject for NoopZoneObject {}

    #[derive(Debug)]
    struct NoopZoneFactory;
    impl ZoneObjectFactory for NoopZoneFactory {
        fn make_prototype(&self, _class: &Class) -> Arc<dyn ZoneObject> {
            Arc::new(NoopZoneObject)
        }
        fn make_class_object(&self, _class: &Class, _prototype: &Arc<dyn ZoneObject>) -> Arc<dyn ZoneObject> {
            Arc::new(NoopZoneObject)
        }
    }

    fn root_class(domain: &ApplicationDomain, name: &str) -> Class {
        ClassBuilder::new(
            QName::new(Namespace::public(), name),
            domain.clone(),
            Arc::new(NoopZoneFactory),
            |_class| Ok(()),
        )
        .build()
    }

    #[test]
    fn a_class_is_assignable_to_itself() {
        let domain = ApplicationDomain::system();
        let c = root_class(&domain, "C");
        assert!(c.is_assignable_to(&c));
    }

    #[test]
    fn subclass_is_assignable_to_parent() {
        let domain = ApplicationDomain::system();
        let parent = root_class(&domain, "Parent");
        let child = ClassBuilder::new(
            QName::new(Namespace::public(), "Child"),
            domain.clone(),
            Arc::new(NoopZoneFactory),
            |_class| Ok(()),
        )
        .parent(parent.clone())
        .build();
        assert!(child.is_assignable_to(&parent));
        assert!(!parent.is_assignable_to(&child));
    }

    #[test]
    fn closing_an_unrelated_class_twice_is_idempotent() {
        let domain = ApplicationDomain::system();
        let c = root_class(&domain, "Idempotent");
        c.ensure_closed().unwrap();
        c.ensure_closed().unwrap();
        assert!(c.traits().is_sealed());
    }

    #[derive(Debug)]
    struct NoopStubBuilder;
    impl DispatchStubBuilder for NoopStubBuilder {
        fn build(&self, _method: &MethodTrait) -> Arc<NativeDispatch> {
            Arc::new(|_receiver, _args| Ok(Value::Undefined))
        }
    }

    fn method_sig(params: Vec<Param>) -> MethodSignature {
        MethodSignature {
            params,
            return_type: None,
            has_return: false,
            has_rest: false,
            needs_scope_receiver: false,
        }
    }

    fn int_param() -> Param {
        Param {
            type_name: Some(QName::new(Namespace::public(), "int")),
            optional: false,
            has_default: false,
        }
    }

    fn string_param() -> Param {
        Param {
            type_name: Some(QName::new(Namespace::public(), "String")),
            optional: false,
            has_default: false,
        }
    }

    fn add_method(class: &Class, local: &str, ns: Namespace, params: Vec<Param>, is_override: bool) -> Result<(), CoreError> {
        let t = Arc::new(Trait {
            name: QName::new(ns, local),
            declaring_class: Some(class.clone()),
            domain: class.domain().clone(),
            is_static: false,
            metadata: IndexMap::new(),
            variant: TraitVariant::Method(MethodTrait::new(method_sig(params), is_override, Arc::new(NoopStubBuilder))),
        });
        match class.traits().try_add_trait(t, false).unwrap() {
            AddOutcome::Added | AddOutcome::Merged => Ok(()),
            AddOutcome::Conflict(existing) => Err(CoreError::NameConflictInClass {
                trait_name: local.to_string(),
                class_name: class.name().to_string(),
                parent_name: existing.declaring_class.as_ref().map(|c| c.name().to_string()).unwrap_or_default(),
            }),
        }
    }

    fn accessor_method(class: &Class, local: &str) -> Arc<Trait> {
        Arc::new(Trait {
            name: QName::new(Namespace::public(), local),
            declaring_class: Some(class.clone()),
            domain: class.domain().clone(),
            is_static: false,
            metadata: IndexMap::new(),
            variant: TraitVariant::Method(MethodTrait::new(method_sig(Vec::new()), false, Arc::new(NoopStubBuilder))),
        })
    }

    fn add_property(
        class: &Class,
        local: &str,
        getter: Option<Arc<Trait>>,
        setter: Option<Arc<Trait>>,
    ) -> Result<(), CoreError> {
        let t = Arc::new(Trait {
            name: QName::new(Namespace::public(), local),
            declaring_class: Some(class.clone()),
            domain: class.domain().clone(),
            is_static: false,
            metadata: IndexMap::new(),
            variant: TraitVariant::Property(PropertyTrait { getter, setter }),
        });
        match class.traits().try_add_trait(t, true).unwrap() {
            AddOutcome::Added | AddOutcome::Merged => Ok(()),
            AddOutcome::Conflict(_) => Err(CoreError::TraitTableCorrupted(local.to_string())),
        }
    }

    /// spec.md §8 scenario 3 ("Override discipline"): a non-`override`
    /// method with the same name as an inherited one corrupts the class;
    /// marking it `override` lets closure succeed.
    #[test]
    fn override_discipline_requires_the_override_flag() {
        let domain = ApplicationDomain::new_child(None);
        let parent = ClassBuilder::new(
            QName::new(Namespace::public(), "P"),
            domain.clone(),
            Arc::new(NoopZoneFactory),
            |class| add_method(class, "m", Namespace::public(), Vec::new(), false),
        )
        .build();

        let bad_child = ClassBuilder::new(
            QName::new(Namespace::public(), "BadChild"),
            domain.clone(),
            Arc::new(NoopZoneFactory),
            |class| add_method(class, "m", Namespace::public(), Vec::new(), false),
        )
        .parent(parent.clone())
        .build();
        assert!(matches!(
            bad_child.ensure_closed().unwrap_err(),
            CoreError::NameConflictInClass { .. }
        ));

        let good_child = ClassBuilder::new(
            QName::new(Namespace::public(), "GoodChild"),
            domain.clone(),
            Arc::new(NoopZoneFactory),
            |class| add_method(class, "m", Namespace::public(), Vec::new(), true),
        )
        .parent(parent.clone())
        .build();
        good_child.ensure_closed().unwrap();
        let m = good_child.get_method(&QName::new(Namespace::public(), "m")).unwrap().unwrap();
        assert!(m.declaring_class.as_ref().unwrap().ptr_eq(&good_child));
    }

    /// spec.md §8 scenario 4 ("Interface merge"): two interfaces declaring
    /// the same method name with incompatible signatures corrupt the
    /// combining interface; matching signatures merge to one trait.
    #[test]
    fn interface_merge_requires_signature_compatible_methods() {
        let domain = ApplicationDomain::new_child(None);
        let i1 = ClassBuilder::new(
            QName::new(Namespace::public(), "I1"),
            domain.clone(),
            Arc::new(NoopZoneFactory),
            |class| add_method(class, "m", Namespace::public(), vec![int_param()], false),
        )
        .attributes(ClassAttributes::INTERFACE)
        .build();
        let i2_mismatched = ClassBuilder::new(
            QName::new(Namespace::public(), "I2"),
            domain.clone(),
            Arc::new(NoopZoneFactory),
            |class| add_method(class, "m", Namespace::public(), vec![string_param()], false),
        )
        .attributes(ClassAttributes::INTERFACE)
        .build();
        let j = ClassBuilder::new(
            QName::new(Namespace::public(), "J"),
            domain.clone(),
            Arc::new(NoopZoneFactory),
            |_class| Ok(()),
        )
        .attributes(ClassAttributes::INTERFACE)
        .interfaces(vec![i1.clone(), i2_mismatched])
        .build();
        assert!(matches!(
            j.ensure_closed().unwrap_err(),
            CoreError::InterfaceTraitSignatureMismatch(_)
        ));

        let i2_compatible = ClassBuilder::new(
            QName::new(Namespace::public(), "I2b"),
            domain.clone(),
            Arc::new(NoopZoneFactory),
            |class| add_method(class, "m", Namespace::public(), vec![int_param()], false),
        )
        .attributes(ClassAttributes::INTERFACE)
        .build();
        let j2 = ClassBuilder::new(
            QName::new(Namespace::public(), "J2"),
            domain.clone(),
            Arc::new(NoopZoneFactory),
            |_class| Ok(()),
        )
        .attributes(ClassAttributes::INTERFACE)
        .interfaces(vec![i1, i2_compatible])
        .build();
        j2.ensure_closed().unwrap();
        assert!(j2.get_method(&QName::new(Namespace::public(), "m")).unwrap().is_some());
    }

    /// spec.md §8 scenario 5 ("Property accessor hiding"): a child
    /// property declaring only a setter combines with the parent's
    /// getter-only property instead of conflicting.
    #[test]
    fn property_accessor_hiding_merges_parent_getter_with_child_setter() {
        let domain = ApplicationDomain::new_child(None);
        let parent = ClassBuilder::new(
            QName::new(Namespace::public(), "PParent"),
            domain.clone(),
            Arc::new(NoopZoneFactory),
            |class| {
                let getter = accessor_method(class, "get_p");
                add_property(class, "p", Some(getter), None)
            },
        )
        .build();

        let child = ClassBuilder::new(
            QName::new(Namespace::public(), "PChild"),
            domain.clone(),
            Arc::new(NoopZoneFactory),
            |class| {
                let setter = accessor_method(class, "set_p");
                add_property(class, "p", None, Some(setter))
            },
        )
        .parent(parent.clone())
        .allow_hiding(true)
        .build();
        child.ensure_closed().unwrap();

        let (status, found) = child.get_property(&QName::new(Namespace::public(), "p")).unwrap();
        assert_eq!(status, BindStatus::Success);
        match &found.unwrap().variant {
            TraitVariant::Property(p) => {
                assert!(p.getter.is_some());
                assert!(p.setter.is_some());
            }
            other => panic!("expected a property trait, got {other:?}"),
        }
    }

    /// spec.md §8 scenario 2 ("Any-namespace ambiguity"): two traits with
    /// the same local name in different namespaces, both declared by the
    /// same class, are ambiguous under a namespace-`Any` lookup.
    #[test]
    fn any_namespace_lookup_is_ambiguous_for_same_local_name_on_one_class() {
        let domain = ApplicationDomain::new_child(None);
        let c = ClassBuilder::new(
            QName::new(Namespace::public(), "Dual"),
            domain.clone(),
            Arc::new(NoopZoneFactory),
            |class| {
                add_method(class, "f", Namespace::public(), Vec::new(), false)?;
                add_method(class, "f", Namespace::package("pkg"), Vec::new(), false)
            },
        )
        .build();
        c.ensure_closed().unwrap();

        let any_f = QName {
            ns: Namespace::Any,
            local: Some("f".to_string()),
        };
        let (status, _) = c.traits().lookup_by_qname(Scope::Instance, &any_f);
        assert_eq!(status, BindStatus::Ambiguous);
    }

    /// spec.md §8 scenario 6: a class declaring `ns1::x` and `public::x`
    /// looked up through a multiname whose namespace set admits both is
    /// `Ambiguous`.
    #[test]
    fn multiname_lookup_with_namespace_set_is_ambiguous_across_namespaces() {
        let domain = ApplicationDomain::new_child(None);
        let c = ClassBuilder::new(
            QName::new(Namespace::public(), "NsAmbig"),
            domain.clone(),
            Arc::new(NoopZoneFactory),
            |class| {
                add_method(class, "x", Namespace::package("ns1"), Vec::new(), false)?;
                add_method(class, "x", Namespace::public(), Vec::new(), false)
            },
        )
        .build();
        c.ensure_closed().unwrap();

        let multiname = Multiname::unqualified(
            "x",
            NamespaceSet::new([
                Namespace::package("ns1"),
                Namespace::package("ns2"),
                Namespace::public(),
            ]),
        );
        let (status, _) = c.get_trait_by_multiname(&multiname).unwrap();
        assert_eq!(status, BindStatus::Ambiguous);
    }
}
