//! The Loader API (spec.md §6): "exposed, implementation external." This
//! core only owns the error taxonomy these operations must surface (§7) and
//! the invariant that bytecode loading is forbidden on the system domain —
//! the actual reflection/assembly-scanning/ABC-parsing machinery lives in
//! the host VM.
//!
//! Grounded in the teacher's `Avm2::load_player_globals`/script-loading
//! boundary (`script.rs`), which similarly treats "where do classes
//! actually come from" as an external concern the core only gates and
//! reports errors for.

use std::sync::Arc;

use crate::class::Class;
use crate::domain::ApplicationDomain;
use crate::error::{CoreError, NativeClassLoadError};

/// An opaque handle to whatever a host uses to identify a loadable native
/// type: a Rust `TypeId`, a registry key, a reflection token. This core
/// never inspects it.
pub type NativeTypeHandle = u64;

/// An opaque handle to a host-defined "assembly" (a statically linked
/// bundle of native classes/modules) scanned in one call.
pub type AssemblyHandle = u64;

/// Host-supplied options for a bytecode (ABC) script loader instance
/// (spec.md §6 `createScriptLoader(options)`).
#[derive(Debug, Clone)]
pub struct ScriptLoaderOptions {
    pub domain: ApplicationDomain,
    /// Matches `tryDefineGlobalTrait`'s `canHideFromParent` (spec.md §4.5):
    /// whether script-declared globals may shadow an ancestor domain's.
    pub allow_hiding: bool,
}

/// A loader bound to one domain, produced by `createScriptLoader`. Actual
/// bytecode parsing is external; this type only enforces the system-domain
/// restriction and forwards to a host-supplied callback.
pub struct ScriptLoader {
    options: ScriptLoaderOptions,
    load_bytes: Arc<dyn Fn(&ApplicationDomain, &[u8], bool) -> Result<(), CoreError> + Send + Sync>,
}

impl ScriptLoader {
    pub fn new(
        options: ScriptLoaderOptions,
        load_bytes: impl Fn(&ApplicationDomain, &[u8], bool) -> Result<(), CoreError> + Send + Sync + 'static,
    ) -> ScriptLoader {
        ScriptLoader {
            options,
            load_bytes: Arc::new(load_bytes),
        }
    }

    /// `loadAbc`-style entry point. Refuses outright against the system
    /// domain (spec.md §6, §7 `LoadAbcIntoSystemDomain`); otherwise
    /// forwards to the host's bytecode loader.
    pub fn load_abc(&self, bytes: &[u8]) -> Result<(), CoreError> {
        if self.options.domain.is_system() {
            return Err(CoreError::LoadAbcIntoSystemDomain);
        }
        (self.load_bytes)(&self.options.domain, bytes, self.options.allow_hiding)
    }
}

/// `createScriptLoader(options)` (spec.md §6).
pub fn create_script_loader(
    options: ScriptLoaderOptions,
    load_bytes: impl Fn(&ApplicationDomain, &[u8], bool) -> Result<(), CoreError> + Send + Sync + 'static,
) -> ScriptLoader {
    ScriptLoader::new(options, load_bytes)
}

/// Host-implemented reflection boundary backing `loadNativeClass` /
/// `loadNativeModule` / `loadNativeClassesFromAssembly` (spec.md §6). This
/// core calls through it and maps failures onto `NativeClassLoadError`;
/// it never constructs native classes itself.
pub trait NativeClassSource: std::fmt::Debug + Send + Sync {
    fn load_native_class(&self, ty: NativeTypeHandle, domain: &ApplicationDomain) -> Result<Class, NativeClassLoadError>;

    fn load_native_module(&self, ty: NativeTypeHandle, domain: &ApplicationDomain) -> Result<(), NativeClassLoadError>;

    fn load_native_classes_from_assembly(
        &self,
        assembly: AssemblyHandle,
        domain: &ApplicationDomain,
    ) -> Result<Vec<Class>, NativeClassLoadError>;
}

/// `loadNativeClass(type)` (spec.md §6).
pub fn load_native_class(
    source: &dyn NativeClassSource,
    ty: NativeTypeHandle,
    domain: &ApplicationDomain,
) -> Result<Class, CoreError> {
    source.load_native_class(ty, domain).map_err(CoreError::from)
}

/// `loadNativeModule(type)` (spec.md §6).
pub fn load_native_module(
    source: &dyn NativeClassSource,
    ty: NativeTypeHandle,
    domain: &ApplicationDomain,
) -> Result<(), CoreError> {
    source.load_native_module(ty, domain).map_err(CoreError::from)
}

/// `loadNativeClassesFromAssembly(handle)` (spec.md §6).
pub fn load_native_classes_from_assembly(
    source: &dyn NativeClassSource,
    assembly: AssemblyHandle,
    domain: &ApplicationDomain,
) -> Result<Vec<Class>, CoreError> {
    source
        .load_native_classes_from_assembly(assembly, domain)
        .map_err(CoreError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn load_abc_is_refused_on_the_system_domain() {
        let loader = create_script_loader(
            ScriptLoaderOptions {
                domain: ApplicationDomain::system(),
                allow_hiding: false,
            },
            |_domain, _bytes, _allow_hiding| Ok(()),
        );
        assert!(matches!(
            loader.load_abc(&[]),
            Err(CoreError::LoadAbcIntoSystemDomain)
        ));
    }

    #[test]
    fn load_abc_forwards_to_host_callback_on_a_child_domain() {
        let called = Arc::new(AtomicBool::new(false));
        let called_in_closure = called.clone();
        let loader = create_script_loader(
            ScriptLoaderOptions {
                domain: ApplicationDomain::new_child(None),
                allow_hiding: false,
            },
            move |_domain, _bytes, _allow_hiding| {
                called_in_closure.store(true, Ordering::SeqCst);
                Ok(())
            },
        );
        assert!(loader.load_abc(&[1, 2, 3]).is_ok());
        assert!(called.load(Ordering::SeqCst));
    }

    #[derive(Debug)]
    struct RejectingSource;
    impl NativeClassSource for RejectingSource {
        fn load_native_class(&self, _ty: NativeTypeHandle, _domain: &ApplicationDomain) -> Result<Class, NativeClassLoadError> {
            Err(NativeClassLoadError::UnknownType("Mystery".to_string()))
        }
        fn load_native_module(&self, _ty: NativeTypeHandle, _domain: &ApplicationDomain) -> Result<(), NativeClassLoadError> {
            Err(NativeClassLoadError::UnknownType("MysteryModule".to_string()))
        }
        fn load_native_classes_from_assembly(
            &self,
            _assembly: AssemblyHandle,
            _domain: &ApplicationDomain,
        ) -> Result<Vec<Class>, NativeClassLoadError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn native_class_load_error_wraps_into_core_error() {
        let source = RejectingSource;
        let domain = ApplicationDomain::new_child(None);
        let err = load_native_class(&source, 1, &domain).unwrap_err();
        assert!(matches!(err, CoreError::NativeClassLoad(NativeClassLoadError::UnknownType(_))));
    }

    #[test]
    fn load_native_classes_from_assembly_can_return_empty() {
        let source = RejectingSource;
        let domain = ApplicationDomain::new_child(None);
        let classes = load_native_classes_from_assembly(&source, 7, &domain).unwrap();
        assert!(classes.is_empty());
    }
}
