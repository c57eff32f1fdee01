//! `ApplicationDomain` (spec.md §3, §4.5): a tree rooted at the system
//! domain, each node owning a global trait table, an optional global
//! object, a module registry, and a bounded "global memory" byte buffer.
//!
//! Grounded in the teacher's `Script`/`TranslationUnit` domain plumbing
//! (`script.rs`) and, since the teacher's retained slice didn't carry a
//! standalone `domain.rs`, in the `Domain` struct from the sibling Ruffle
//! forks' `avm2::domain` modules present in the examples pack.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use once_cell::sync::OnceCell;
use weak_table::WeakValueHashMap;

use crate::bind_status::BindStatus;
use crate::error::CoreError;
use crate::multiname::Multiname;
use crate::qname::QName;
use crate::trait_table::{Scope, TraitTable};
use crate::traits::Trait;
use crate::value::Instance;

/// A snapshot of a domain's global-memory buffer: the backing bytes plus
/// the logical size readers should treat as the buffer's extent (spec.md
/// §4.5). Returned as an `Arc` so a view stays internally consistent even
/// if the domain's memory is replaced immediately after; per spec.md §5
/// "Memory span safety", callers should still not treat a held span as
/// current once a subsequent `set_global_memory` has happened.
pub struct GlobalMemoryBuffer {
    pub bytes: Vec<u8>,
    pub size: usize,
}

impl GlobalMemoryBuffer {
    pub fn view(&self) -> &[u8] {
        &self.bytes[..self.size]
    }
}

pub type ModuleHandle = u64;

static NEXT_MODULE_HANDLE: AtomicU64 = AtomicU64::new(1);
static MODULE_REGISTRY: OnceCell<Mutex<WeakValueHashMap<ModuleHandle, std::sync::Weak<DomainImpl>>>> = OnceCell::new();

fn module_registry() -> &'static Mutex<WeakValueHashMap<ModuleHandle, std::sync::Weak<DomainImpl>>> {
    MODULE_REGISTRY.get_or_init(|| Mutex::new(WeakValueHashMap::new()))
}

struct DomainImpl {
    parent: Option<ApplicationDomain>,
    global_traits: TraitTable,
    global_object: Option<Arc<dyn Instance>>,
    global_memory: RwLock<Arc<GlobalMemoryBuffer>>,
    core_classes_loaded: OnceCell<()>,
    /// Installed, at most once, on the system domain only (spec.md §4.5):
    /// see `ApplicationDomain::install_core_classes_loader`.
    core_classes_loader: OnceCell<Arc<dyn Fn(&ApplicationDomain) + Send + Sync>>,
    is_system: bool,
}

impl std::fmt::Debug for DomainImpl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomainImpl").field("is_system", &self.is_system).finish()
    }
}

/// A node in the application-domain tree (spec.md §3, §4.5). Cheap to
/// clone; all handles to the same domain share one `DomainImpl` via `Arc`.
#[derive(Clone, Debug)]
pub struct ApplicationDomain(Arc<DomainImpl>);

static SYSTEM_DOMAIN: OnceCell<ApplicationDomain> = OnceCell::new();

impl ApplicationDomain {
    /// The unique system domain, created on first access.
    pub fn system() -> ApplicationDomain {
        SYSTEM_DOMAIN
            .get_or_init(|| {
                ApplicationDomain(Arc::new(DomainImpl {
                    parent: None,
                    global_traits: TraitTable::new(false),
                    global_object: None,
                    global_memory: RwLock::new(Arc::new(GlobalMemoryBuffer { bytes: Vec::new(), size: 0 })),
                    core_classes_loaded: OnceCell::new(),
                    core_classes_loader: OnceCell::new(),
                    is_system: true,
                }))
            })
            .clone()
    }

    /// Creates a child domain. A `None` parent adopts the system domain
    /// (spec.md §3 "attempts to create a child with a null parent adopt
    /// the system domain as parent").
    pub fn new_child(parent: Option<ApplicationDomain>) -> ApplicationDomain {
        let parent = Some(parent.unwrap_or_else(ApplicationDomain::system));
        ApplicationDomain(Arc::new(DomainImpl {
            parent,
            global_traits: TraitTable::new(false),
            global_object: None,
            global_memory: RwLock::new(Arc::new(GlobalMemoryBuffer { bytes: Vec::new(), size: 0 })),
            core_classes_loaded: OnceCell::new(),
            core_classes_loader: OnceCell::new(),
            is_system: false,
        }))
    }

    /// Installs the one-time core-class loader run just before the system
    /// domain is searched during `lookup_global_trait` (spec.md §4.5).
    /// Meant to be called once at host bootstrap, before any lookup
    /// reaches the system domain; a second call fails rather than
    /// silently discarding the first loader.
    pub fn install_core_classes_loader(
        loader: Arc<dyn Fn(&ApplicationDomain) + Send + Sync>,
    ) -> Result<(), CoreError> {
        ApplicationDomain::system()
            .0
            .core_classes_loader
            .set(loader)
            .map_err(|_| CoreError::CoreClassesLoaderAlreadyInstalled)
    }

    pub fn ptr_eq(&self, other: &ApplicationDomain) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn is_system(&self) -> bool {
        self.0.is_system
    }

    pub fn parent(&self) -> Option<&ApplicationDomain> {
        self.0.parent.as_ref()
    }

    pub fn global_object(&self) -> Option<&Arc<dyn Instance>> {
        self.0.global_object.as_ref()
    }

    pub fn global_traits(&self) -> &TraitTable {
        &self.0.global_traits
    }

    fn ensure_core_classes_loaded(&self) {
        self.0.core_classes_loaded.get_or_init(|| {
            if let Some(loader) = self.0.core_classes_loader.get() {
                loader(self);
            }
        });
    }

    /// Shared walk from `self` up the parent chain, used by both
    /// `lookup_global_trait` and its multiname-dispatching counterpart.
    /// Force-loads the system domain's core classes before searching it.
    /// Stops at the first non-`NotFound` status, or when `no_inherited`
    /// is set.
    fn walk_global<F>(&self, no_inherited: bool, lookup: F) -> (BindStatus, Option<(QName, Arc<Trait>)>)
    where
        F: Fn(&TraitTable) -> (BindStatus, Option<Arc<Trait>>),
    {
        let mut current = Some(self.clone());
        while let Some(domain) = current {
            if domain.is_system() {
                domain.ensure_core_classes_loaded();
            }
            let (status, found) = lookup(&domain.0.global_traits);
            match status {
                BindStatus::NotFound => {
                    if no_inherited {
                        return (BindStatus::NotFound, None);
                    }
                    current = domain.0.parent.clone();
                }
                BindStatus::Ambiguous => return (BindStatus::Ambiguous, None),
                _ => {
                    return (status, found.map(|t| (t.name.clone(), t)));
                }
            }
        }
        (BindStatus::NotFound, None)
    }

    /// `lookupGlobalTrait` (spec.md §4.5).
    pub fn lookup_global_trait(&self, name: &QName, no_inherited: bool) -> (BindStatus, Option<(QName, Arc<Trait>)>) {
        self.walk_global(no_inherited, |table| table.lookup_by_qname(Scope::Instance, name))
    }

    /// Multiname-dispatching counterpart to `lookup_global_trait` (spec.md
    /// §4.3.3/§6): a qualified name defers to `lookup_global_trait`; an
    /// unqualified name walks the domain chain resolving its local name
    /// against a namespace set at each node.
    pub fn lookup_global_trait_by_multiname(
        &self,
        name: &Multiname,
        no_inherited: bool,
    ) -> (BindStatus, Option<(QName, Arc<Trait>)>) {
        match name {
            Multiname::Qualified(qname) => self.lookup_global_trait(qname, no_inherited),
            Multiname::Unqualified { local, namespaces } => {
                self.walk_global(no_inherited, |table| table.lookup_by_local_nsset(Scope::Instance, local, namespaces))
            }
        }
    }

    /// `tryDefineGlobalTrait` (spec.md §4.5): refuses to add if an
    /// ancestor already has a trait of the same name (unless
    /// `can_hide_from_parent`), or on a local name collision within this
    /// domain's own table.
    pub fn try_define_global_trait(&self, t: Arc<Trait>, can_hide_from_parent: bool) -> Result<(), CoreError> {
        if !can_hide_from_parent {
            if let Some(parent) = &self.0.parent {
                let (status, _) = parent.lookup_global_trait(&t.name, false);
                if status.is_success() {
                    return Err(CoreError::NameConflictInClass {
                        trait_name: t.name.to_string(),
                        class_name: String::new(),
                        parent_name: "ancestor domain".to_string(),
                    });
                }
            }
        }
        use crate::trait_table::AddOutcome;
        match self.0.global_traits.try_add_trait(t.clone(), false)? {
            AddOutcome::Added | AddOutcome::Merged => Ok(()),
            AddOutcome::Conflict(_existing) => Err(CoreError::NameConflictInClass {
                trait_name: t.name.to_string(),
                class_name: String::new(),
                parent_name: String::new(),
            }),
        }
    }

    /// `setGlobalMemory` (spec.md §4.5): validates `0 <= size <= len(buf)`.
    pub fn set_global_memory(&self, bytes: Vec<u8>, size: usize) -> Result<(), CoreError> {
        if size > bytes.len() {
            return Err(CoreError::ArgumentOutOfRange {
                argument: "size",
                detail: format!("{size} exceeds buffer length {}", bytes.len()),
            });
        }
        *self.0.global_memory.write().unwrap() = Arc::new(GlobalMemoryBuffer { bytes, size });
        Ok(())
    }

    /// `getGlobalMemorySpan` (spec.md §4.5).
    pub fn global_memory_span(&self) -> Arc<GlobalMemoryBuffer> {
        self.0.global_memory.read().unwrap().clone()
    }

    /// Registers an opaque module handle against this domain, holding
    /// only a weak reference so the module never keeps the domain alive
    /// (spec.md §3 "Ownership summary").
    pub fn register_module(&self) -> ModuleHandle {
        let handle = NEXT_MODULE_HANDLE.fetch_add(1, Ordering::Relaxed);
        module_registry().lock().unwrap().insert(handle, self.0.clone());
        handle
    }

    pub fn domain_for_module(handle: ModuleHandle) -> Option<ApplicationDomain> {
        module_registry().lock().unwrap().get(&handle).map(ApplicationDomain)
    }
}

/// `getCurrentDomain` (spec.md §4.5), implemented against an explicit
/// caller-supplied domain chain (innermost-first) rather than an implicit
/// stack walk — see `DESIGN.md`'s Open Question decision. Returns the
/// closest non-system domain if `non_system_only`, else the closest
/// domain, else `None`.
pub fn get_current_domain(chain: &[ApplicationDomain], non_system_only: bool) -> Option<ApplicationDomain> {
    if non_system_only {
        return chain.iter().find(|d| !d.is_system()).cloned();
    }
    chain.first().cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    /// spec.md §4.5 "force-load core classes before searching the system
    /// domain": an installed loader must actually run the first time a
    /// lookup reaches the system domain. This is the only test in the
    /// crate that calls `install_core_classes_loader` or triggers
    /// `ensure_core_classes_loaded`, since both the loader slot and the
    /// "has it run yet" latch live on the process-wide system domain
    /// singleton.
    #[test]
    fn installed_core_classes_loader_runs_before_system_domain_lookup() {
        let ran = Arc::new(AtomicBool::new(false));
        let ran_handle = ran.clone();
        ApplicationDomain::install_core_classes_loader(Arc::new(move |_domain| {
            ran_handle.store(true, Ordering::SeqCst);
        }))
        .unwrap();

        assert!(!ran.load(Ordering::SeqCst));
        let (status, _) =
            ApplicationDomain::system().lookup_global_trait(&QName::new(crate::namespace::Namespace::public(), "DoesNotExist"), false);
        assert_eq!(status, BindStatus::NotFound);
        assert!(ran.load(Ordering::SeqCst));

        // A second install attempt is rejected rather than silently
        // replacing the first loader.
        assert!(matches!(
            ApplicationDomain::install_core_classes_loader(Arc::new(|_| {})),
            Err(CoreError::CoreClassesLoaderAlreadyInstalled)
        ));
    }

    #[test]
    fn system_domain_is_a_singleton() {
        assert!(ApplicationDomain::system().ptr_eq(&ApplicationDomain::system()));
    }

    #[test]
    fn child_with_no_parent_adopts_system_domain() {
        let child = ApplicationDomain::new_child(None);
        assert!(child.parent().unwrap().ptr_eq(&ApplicationDomain::system()));
    }

    #[test]
    fn set_global_memory_rejects_oversized_size() {
        let domain = ApplicationDomain::new_child(None);
        assert!(domain.set_global_memory(vec![0; 4], 4).is_ok());
        assert!(domain.set_global_memory(vec![0; 4], 5).is_err());
        assert!(domain.set_global_memory(vec![0; 4], 0).is_ok());
    }

    #[test]
    fn get_current_domain_prefers_non_system_when_requested() {
        let system = ApplicationDomain::system();
        let child = ApplicationDomain::new_child(None);
        let chain = vec![system.clone(), child.clone()];
        let found = get_current_domain(&chain, true).unwrap();
        assert!(found.ptr_eq(&child));
    }

    #[test]
    fn get_current_domain_returns_innermost_without_filter() {
        let system = ApplicationDomain::system();
        let child = ApplicationDomain::new_child(None);
        let chain = vec![child.clone(), system.clone()];
        let found = get_current_domain(&chain, false).unwrap();
        assert!(found.ptr_eq(&child));
    }
}
