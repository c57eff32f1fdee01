//! The multi-index trait table (spec.md §4.3): a single append-only slot
//! array plus four parallel link-array "views" — one per
//! `(scope × qualification)` — forming chained hash buckets into the slot
//! array.
//!
//! Grounded in the teacher's `VTable`/`VTableData::resolved_traits`
//! (`vtable.rs`), generalised from its `PropertyMap`-backed single index
//! into the explicit multi-view link-array design spec.md §4.3.2 describes,
//! since the real concurrency model here (§5) needs a structure that can be
//! rebuilt wholesale at `seal()` under a lock rather than mutated through a
//! GC arena.

use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use fnv::FnvHasher;
use log::{debug, trace};

use crate::bind_status::BindStatus;
use crate::class::Class;
use crate::error::CoreError;
use crate::namespace::Namespace;
use crate::namespace_set::NamespaceSet;
use crate::qname::QName;
use crate::traits::{Trait, TraitKind, TraitVariant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Instance,
    Static,
}

const NIL: i64 = -1;

fn hash_of<T: Hash>(value: T) -> u64 {
    let mut hasher = FnvHasher::default();
    value.hash(&mut hasher);
    hasher.finish()
}

fn hash_unqualified(local: &str) -> u64 {
    hash_of(local)
}

fn hash_qualified(local: &str, ns: &Namespace) -> u64 {
    hash_of((local, ns))
}

/// A next-prime-or-self search, used for the ≥ `2·count` resize target
/// (spec.md §4.3.2). Table sizes stay small (dozens to low thousands of
/// traits per class), so trial division is plenty fast.
fn next_prime(mut n: usize) -> usize {
    if n < 2 {
        return 2;
    }
    if n % 2 == 0 {
        n += 1;
    }
    loop {
        if is_prime(n) {
            return n;
        }
        n += 2;
    }
}

fn is_prime(n: usize) -> bool {
    if n < 2 {
        return false;
    }
    let mut d = 2;
    while d * d <= n {
        if n % d == 0 {
            return false;
        }
        d += 1;
    }
    true
}

/// One `(scope × qualification)` chained hash index into the shared slot
/// array. `buckets[h % buckets.len()]` holds the link id of the bucket
/// head; `next[link]`/`hash[link]`/`slot[link]` describe that link.
#[derive(Default)]
struct LinkIndex {
    buckets: Vec<i64>,
    next: Vec<i64>,
    hash: Vec<u64>,
    slot: Vec<usize>,
}

impl LinkIndex {
    fn clear(&mut self) {
        self.buckets.clear();
        self.next.clear();
        self.hash.clear();
        self.slot.clear();
    }

    fn ensure_capacity_for(&mut self, count: usize) {
        let needed = next_prime(2 * count.max(1));
        if self.buckets.len() < needed {
            let old_buckets = std::mem::take(&mut self.buckets);
            self.buckets = vec![NIL; needed];
            // Rebuild chain heads against the new bucket count; links
            // themselves (hash/slot/next-within-chain) are untouched,
            // only which bucket each chain hangs off of changes.
            let _ = old_buckets;
            for link_id in 0..self.next.len() {
                let b = (self.hash[link_id] as usize) % self.buckets.len();
                self.next[link_id] = self.buckets[b];
                self.buckets[b] = link_id as i64;
            }
        }
    }

    /// Prepend a new link for `slot` at `hash`. Insertion order matters:
    /// callers that insert in base-first (least-to-most-derived) order end
    /// up with most-derived-first bucket traversal, since each prepend
    /// pushes the most-recently-inserted entry to the chain head.
    fn insert(&mut self, hash: u64, slot: usize) {
        self.ensure_capacity_for(self.next.len() + 1);
        let b = (hash as usize) % self.buckets.len();
        let link_id = self.next.len() as i64;
        self.next.push(self.buckets[b]);
        self.hash.push(hash);
        self.slot.push(slot);
        self.buckets[b] = link_id;
    }

    /// Slot indices in a bucket whose stored hash matches, head-first.
    fn candidates(&self, hash: u64) -> Vec<usize> {
        if self.buckets.is_empty() {
            return Vec::new();
        }
        let mut out = Vec::new();
        let mut link = self.buckets[(hash as usize) % self.buckets.len()];
        while link != NIL {
            let idx = link as usize;
            if self.hash[idx] == hash {
                out.push(self.slot[idx]);
            }
            link = self.next[idx];
        }
        out
    }
}

struct TraitTableInner {
    slots: Vec<Arc<Trait>>,
    instance_qualified: LinkIndex,
    instance_unqualified: LinkIndex,
    static_qualified: LinkIndex,
    static_unqualified: LinkIndex,
    corrupted: bool,
    sealed: bool,
    fence_start_declared: usize,
    fence_start_static: usize,
    fence_end: usize,
}

impl TraitTableInner {
    fn new() -> TraitTableInner {
        TraitTableInner {
            slots: Vec::new(),
            instance_qualified: LinkIndex::default(),
            instance_unqualified: LinkIndex::default(),
            static_qualified: LinkIndex::default(),
            static_unqualified: LinkIndex::default(),
            corrupted: false,
            sealed: false,
            fence_start_declared: 0,
            fence_start_static: 0,
            fence_end: 0,
        }
    }

    fn index_for(&mut self, scope: Scope, qualified: bool) -> &mut LinkIndex {
        match (scope, qualified) {
            (Scope::Instance, true) => &mut self.instance_qualified,
            (Scope::Instance, false) => &mut self.instance_unqualified,
            (Scope::Static, true) => &mut self.static_qualified,
            (Scope::Static, false) => &mut self.static_unqualified,
        }
    }

    fn scan(&self, scope: Scope, qualified: bool, hash: u64) -> Vec<usize> {
        match (scope, qualified) {
            (Scope::Instance, true) => self.instance_qualified.candidates(hash),
            (Scope::Instance, false) => self.instance_unqualified.candidates(hash),
            (Scope::Static, true) => self.static_qualified.candidates(hash),
            (Scope::Static, false) => self.static_unqualified.candidates(hash),
        }
    }

    fn find_exact(&self, scope: Scope, qname: &QName) -> Option<usize> {
        let Some(local) = qname.local_str() else {
            return None;
        };
        let hash = hash_qualified(local, &qname.ns);
        self.scan(scope, true, hash)
            .into_iter()
            .find(|&slot| &self.slots[slot].name == qname)
    }

    fn insert_new(&mut self, scope: Scope, t: Arc<Trait>) -> usize {
        let slot = self.slots.len();
        let local = t.name.local_str().map(|s| s.to_string());
        let ns = t.name.ns.clone();
        self.slots.push(t);
        if let Some(local) = local {
            let qh = hash_qualified(&local, &ns);
            let uh = hash_unqualified(&local);
            self.index_for(scope, true).insert(qh, slot);
            self.index_for(scope, false).insert(uh, slot);
        }
        slot
    }
}

fn rebuild_links(inner: &mut TraitTableInner) {
    inner.instance_qualified.clear();
    inner.instance_unqualified.clear();
    inner.static_qualified.clear();
    inner.static_unqualified.clear();
    for (slot, t) in inner.slots.clone().into_iter().enumerate() {
        let Some(local) = t.name.local_str() else {
            continue;
        };
        let scope = if t.is_static {
            Scope::Static
        } else {
            Scope::Instance
        };
        let qh = hash_qualified(local, &t.name.ns);
        let uh = hash_unqualified(local);
        inner.index_for(scope, true).insert(qh, slot);
        inner.index_for(scope, false).insert(uh, slot);
    }
}

/// Outcome of a low-level insertion attempt.
#[derive(Debug)]
pub enum AddOutcome {
    Added,
    /// Two mergeable properties were combined; the table now holds the
    /// merged trait in place of the existing one.
    Merged,
    /// A trait already occupies this qualified name and cannot merge with
    /// the incoming one.
    Conflict(Arc<Trait>),
}

enum DeriveOrder {
    AMoreDerived,
    BMoreDerived,
    Unrelated,
}

fn same_declarer(a: &Trait, b: &Trait) -> bool {
    match (&a.declaring_class, &b.declaring_class) {
        (Some(ca), Some(cb)) => ca.ptr_eq(cb),
        (None, None) => a.domain.ptr_eq(&b.domain),
        _ => false,
    }
}

fn derive_order(a: &Trait, b: &Trait) -> DeriveOrder {
    match (&a.declaring_class, &b.declaring_class) {
        (Some(ca), Some(cb)) => {
            if ca.is_assignable_to(cb) {
                DeriveOrder::AMoreDerived
            } else if cb.is_assignable_to(ca) {
                DeriveOrder::BMoreDerived
            } else {
                DeriveOrder::Unrelated
            }
        }
        _ => DeriveOrder::Unrelated,
    }
}

/// Resolve a set of same-key candidates per spec.md §4.3.5. See
/// `DESIGN.md` for the documented limitation of this fold for >2
/// candidates in the unsealed case, which mirrors the spec's own
/// "unreliable before sealing" caveat (§9).
fn resolve_candidates(candidates: &[Arc<Trait>], sealed: bool, is_interface: bool) -> (BindStatus, Option<Arc<Trait>>) {
    if candidates.is_empty() {
        return (BindStatus::NotFound, None);
    }
    let mut best = candidates[0].clone();
    let mut ambiguous = false;
    for cand in &candidates[1..] {
        if same_declarer(&best, cand) {
            return (BindStatus::Ambiguous, None);
        }
        if sealed && !is_interface {
            // Slots are most-derived-first post-seal; the head of the
            // chain already won.
            break;
        }
        match derive_order(&best, cand) {
            DeriveOrder::AMoreDerived => {}
            DeriveOrder::BMoreDerived => best = cand.clone(),
            DeriveOrder::Unrelated => {
                if sealed {
                    return (BindStatus::Ambiguous, None);
                }
                ambiguous = true;
            }
        }
    }
    if ambiguous {
        (BindStatus::Ambiguous, Some(best))
    } else {
        (BindStatus::Success, Some(best))
    }
}

/// The multi-index trait table owned by a class or domain (spec.md §4.3).
pub struct TraitTable {
    inner: RwLock<TraitTableInner>,
    sealed_fast: AtomicBool,
    is_interface: bool,
}

impl TraitTable {
    pub fn new(is_interface: bool) -> TraitTable {
        TraitTable {
            inner: RwLock::new(TraitTableInner::new()),
            sealed_fast: AtomicBool::new(false),
            is_interface,
        }
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed_fast.load(Ordering::Acquire)
    }

    pub fn is_corrupted(&self) -> bool {
        self.inner.read().unwrap().corrupted
    }

    fn mark_corrupted(&self) {
        self.inner.write().unwrap().corrupted = true;
    }


    /// `tryAddTrait` (spec.md §4.3.4). Fails (returns `Conflict`) when a
    /// trait with the same qualified name already exists and either
    /// `allow_merge_properties` is false, the two traits aren't both
    /// properties, or the properties don't merge.
    pub fn try_add_trait(&self, new_trait: Arc<Trait>, allow_merge_properties: bool) -> Result<AddOutcome, CoreError> {
        let mut inner = self.inner.write().unwrap();
        if inner.corrupted {
            return Err(CoreError::TraitTableCorrupted(new_trait.name.to_string()));
        }
        if inner.sealed {
            return Ok(AddOutcome::Conflict(new_trait));
        }
        let scope = if new_trait.is_static {
            Scope::Static
        } else {
            Scope::Instance
        };
        if let Some(existing_slot) = inner.find_exact(scope, &new_trait.name) {
            let existing = inner.slots[existing_slot].clone();
            if allow_merge_properties {
                if let (TraitVariant::Property(a), TraitVariant::Property(b)) =
                    (&existing.variant, &new_trait.variant)
                {
                    if a.mergeable_with(b) {
                        let merged = Arc::new(Trait {
                            name: existing.name.clone(),
                            declaring_class: new_trait.declaring_class.clone(),
                            domain: existing.domain.clone(),
                            is_static: existing.is_static,
                            metadata: new_trait.metadata.clone(),
                            variant: TraitVariant::Property(a.merge(b)),
                        });
                        inner.slots[existing_slot] = merged;
                        trace!("merged property trait {}", existing.name);
                        return Ok(AddOutcome::Merged);
                    }
                }
            }
            return Ok(AddOutcome::Conflict(existing));
        }
        inner.insert_new(scope, new_trait);
        Ok(AddOutcome::Added)
    }

    /// `mergeWithParentClass` (spec.md §4.3.6). `parent_instance_traits`
    /// is the parent's full, already-closed effective instance trait set
    /// (not merely the traits it personally declared) — the child's table
    /// clones that entire resolved state before overlaying its own
    /// declarations, matching how the teacher's `init_vtable` clones
    /// `superclass_vtable` wholesale before applying overrides.
    pub fn merge_with_parent_class(&self, parent_instance_traits: &[Arc<Trait>], allow_hiding: bool) -> Result<(), CoreError> {
        for parent_trait in parent_instance_traits {
            match self.try_add_trait(parent_trait.clone(), true)? {
                AddOutcome::Added | AddOutcome::Merged => {}
                AddOutcome::Conflict(existing) => {
                    self.resolve_class_conflict(parent_trait, &existing, allow_hiding)?;
                }
            }
        }
        Ok(())
    }

    fn resolve_class_conflict(&self, parent_trait: &Arc<Trait>, child_trait: &Arc<Trait>, allow_hiding: bool) -> Result<(), CoreError> {
        if let (TraitVariant::Property(parent_prop), TraitVariant::Property(child_prop)) =
            (&parent_trait.variant, &child_trait.variant)
        {
            if allow_hiding && !parent_prop.mergeable_with(child_prop) {
                let synthesized = child_prop.merge(parent_prop);
                let mut inner = self.inner.write().unwrap();
                if let Some(slot) = inner.find_exact(
                    if child_trait.is_static { Scope::Static } else { Scope::Instance },
                    &child_trait.name,
                ) {
                    inner.slots[slot] = Arc::new(Trait {
                        name: child_trait.name.clone(),
                        declaring_class: child_trait.declaring_class.clone(),
                        domain: child_trait.domain.clone(),
                        is_static: child_trait.is_static,
                        metadata: child_trait.metadata.clone(),
                        variant: TraitVariant::Property(synthesized),
                    });
                }
                return Ok(());
            }
        }
        if is_legal_override(parent_trait, child_trait) {
            return Ok(());
        }
        self.mark_corrupted();
        debug!(
            "name conflict closing class: {} collides with inherited {}",
            child_trait.name, parent_trait.name
        );
        Err(CoreError::NameConflictInClass {
            trait_name: child_trait.name.to_string(),
            class_name: child_trait
                .declaring_class
                .as_ref()
                .map(|c| c.name().to_string())
                .unwrap_or_default(),
            parent_name: parent_trait
                .declaring_class
                .as_ref()
                .map(|c| c.name().to_string())
                .unwrap_or_default(),
        })
    }

    /// `mergeWithParentInterface` (spec.md §4.3.6). Only the interface's
    /// *own* declared instance traits are merged — a class's interface
    /// list is expected to already be the transitive, flattened set, so
    /// each interface in the DAG contributes exactly its own slice and
    /// conflicts between independently-reached interfaces are caught here
    /// via the signature-compatibility check.
    pub fn merge_with_parent_interface(&self, interface_declared_traits: &[Arc<Trait>]) -> Result<(), CoreError> {
        for iface_trait in interface_declared_traits {
            match self.try_add_trait(iface_trait.clone(), true)? {
                AddOutcome::Added | AddOutcome::Merged => {}
                AddOutcome::Conflict(existing) => {
                    if signature_compatible(iface_trait, &existing) {
                        continue;
                    }
                    self.mark_corrupted();
                    return Err(CoreError::InterfaceTraitSignatureMismatch(
                        iface_trait.name.to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// `seal()` (spec.md §4.3.7). Idempotent. Partitions slots
    /// instance-before-static (stable, preserving the base-first order
    /// already established during merge/declare), records the three
    /// fences, and rebuilds the link arrays so bucket traversal visits
    /// most-derived-first.
    /// Seals using insertion order as the canonical order (every trait
    /// ranked equally — a stable sort then just preserves insertion
    /// order). Correct for tables with no class ancestry to order by,
    /// such as an `ApplicationDomain`'s global table.
    pub fn seal(&self) {
        self.seal_with_rank(|_t| 0, 0);
    }

    /// `seal()` (spec.md §4.3.7), generalised with an explicit rank
    /// function so the caller (normally `Class::run_closure`) can order
    /// instance traits by their declaring class's position in the
    /// inheritance chain / interface DAG rather than relying on the
    /// order traits happened to be inserted in. `own_rank` is the rank
    /// assigned to traits declared by the class that owns this table —
    /// by construction it must be the maximum rank any trait receives, so
    /// the first slot carrying it becomes `fence_start_declared`.
    ///
    /// Idempotent. Partitions slots instance-before-static (stable),
    /// stable-sorts the instance partition by `rank`, records the three
    /// fences, and rebuilds the link arrays so bucket traversal visits
    /// most-derived-first.
    pub fn seal_with_rank<F: Fn(&Trait) -> usize>(&self, rank: F, own_rank: usize) {
        let mut inner = self.inner.write().unwrap();
        if inner.sealed {
            return;
        }

        let mut instance = Vec::new();
        let mut statics = Vec::new();
        for t in inner.slots.drain(..) {
            if t.is_static {
                statics.push(t);
            } else {
                instance.push(t);
            }
        }
        instance.sort_by_key(|t| rank(t));
        let fence_start_declared = instance
            .iter()
            .position(|t| rank(t) >= own_rank)
            .unwrap_or(instance.len());
        let fence_start_static = instance.len();
        instance.extend(statics);
        let fence_end = instance.len();
        inner.slots = instance;
        inner.fence_start_declared = fence_start_declared;
        inner.fence_start_static = fence_start_static;
        inner.fence_end = fence_end;

        rebuild_links(&mut inner);
        inner.sealed = true;
        drop(inner);
        self.sealed_fast.store(true, Ordering::Release);
        debug!("trait table sealed: {} instance, {} static traits", fence_start_static, fence_end - fence_start_static);
    }

    pub fn lookup_by_qname(&self, scope: Scope, qname: &QName) -> (BindStatus, Option<Arc<Trait>>) {
        let inner = self.inner.read().unwrap();
        // A QName with no local name (the "any name" sentinel) never
        // matches a concrete trait.
        let Some(local) = qname.local_str() else {
            return (BindStatus::NotFound, None);
        };
        if qname.ns.is_any() {
            return self.lookup_any_locked(&inner, scope, local);
        }
        if qname.ns.is_public() {
            let hash = hash_unqualified(local);
            let candidates: Vec<_> = inner
                .scan(scope, false, hash)
                .into_iter()
                .filter(|&slot| inner.slots[slot].name.ns.is_public() && inner.slots[slot].name.local_str() == Some(local))
                .map(|slot| inner.slots[slot].clone())
                .collect();
            return resolve_candidates(&candidates, inner.sealed, self.is_interface);
        }
        match inner.find_exact(scope, qname) {
            Some(slot) => (BindStatus::Success, Some(inner.slots[slot].clone())),
            None => (BindStatus::NotFound, None),
        }
    }

    fn lookup_any_locked(&self, inner: &TraitTableInner, scope: Scope, local: &str) -> (BindStatus, Option<Arc<Trait>>) {
        let hash = hash_unqualified(local);
        let candidates: Vec<_> = inner
            .scan(scope, false, hash)
            .into_iter()
            .filter(|&slot| inner.slots[slot].name.local_str() == Some(local))
            .map(|slot| inner.slots[slot].clone())
            .collect();
        resolve_candidates(&candidates, inner.sealed, self.is_interface)
    }

    pub fn lookup_by_local_nsset(&self, scope: Scope, local: &str, nsset: &NamespaceSet) -> (BindStatus, Option<Arc<Trait>>) {
        let inner = self.inner.read().unwrap();
        let hash = hash_unqualified(local);
        let candidates: Vec<_> = inner
            .scan(scope, false, hash)
            .into_iter()
            .filter(|&slot| {
                inner.slots[slot].name.local_str() == Some(local) && nsset.contains(&inner.slots[slot].name.ns)
            })
            .map(|slot| inner.slots[slot].clone())
            .collect();
        resolve_candidates(&candidates, inner.sealed, self.is_interface)
    }

    /// All instance traits (inherited + own declared), in canonical
    /// base-first order. Used as the "parent's full effective state" input
    /// to a subclass's `merge_with_parent_class`.
    pub fn all_instance_traits(&self) -> Vec<Arc<Trait>> {
        let inner = self.inner.read().unwrap();
        if inner.sealed {
            inner.slots[..inner.fence_start_static].to_vec()
        } else {
            inner.slots.iter().filter(|t| !t.is_static).cloned().collect()
        }
    }

    /// Only the traits this class/interface itself declared (excludes
    /// inherited/merged-in instance traits). Used as the input to
    /// `merge_with_parent_interface` for each directly-listed interface.
    ///
    /// Callers only invoke this against an already-`ensure_closed` (hence
    /// sealed) parent/interface table; the pre-seal fallback below is
    /// defensive only and can't distinguish declared from inherited.
    pub fn declared_instance_traits(&self) -> Vec<Arc<Trait>> {
        let inner = self.inner.read().unwrap();
        if inner.sealed {
            inner.slots[inner.fence_start_declared..inner.fence_start_static].to_vec()
        } else {
            inner.slots.iter().filter(|t| !t.is_static).cloned().collect()
        }
    }

    /// `getTraits(kinds, scopes)` (spec.md §4.3.7). Uses fences for a
    /// contiguous view when possible; falls back to a full scan for a
    /// non-contiguous scope mix (static + instance-inherited without
    /// instance-declared).
    pub fn get_traits(&self, kinds: &[TraitKind], include_instance: bool, include_static: bool) -> Vec<Arc<Trait>> {
        let inner = self.inner.read().unwrap();
        let matches_kind = |t: &Trait| kinds.is_empty() || kinds.contains(&t.kind());
        if !inner.sealed {
            return inner
                .slots
                .iter()
                .filter(|t| (include_instance && !t.is_static) || (include_static && t.is_static))
                .filter(|t| matches_kind(t))
                .cloned()
                .collect();
        }
        match (include_instance, include_static) {
            (true, true) => inner.slots[..inner.fence_end]
                .iter()
                .filter(|t| matches_kind(t))
                .cloned()
                .collect(),
            (true, false) => inner.slots[..inner.fence_start_static]
                .iter()
                .filter(|t| matches_kind(t))
                .cloned()
                .collect(),
            (false, true) => inner.slots[inner.fence_start_static..inner.fence_end]
                .iter()
                .filter(|t| matches_kind(t))
                .cloned()
                .collect(),
            (false, false) => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A method marked `override` with the same shape as the parent's method,
/// or a property whose every non-null parent accessor is overridden by the
/// child's correspondingly non-null, `override`-marked accessor.
fn is_legal_override(parent_trait: &Trait, child_trait: &Trait) -> bool {
    match (&parent_trait.variant, &child_trait.variant) {
        (TraitVariant::Method(parent_m), TraitVariant::Method(child_m)) => {
            child_m.is_override && parent_m.signature.shape_compatible(&child_m.signature)
        }
        (TraitVariant::Property(parent_p), TraitVariant::Property(child_p)) => {
            let getter_ok = match (&parent_p.getter, &child_p.getter) {
                (Some(pg), Some(cg)) => accessor_overrides(pg, cg),
                (Some(_), None) => false,
                (None, _) => true,
            };
            let setter_ok = match (&parent_p.setter, &child_p.setter) {
                (Some(ps), Some(cs)) => accessor_overrides(ps, cs),
                (Some(_), None) => false,
                (None, _) => true,
            };
            getter_ok && setter_ok
        }
        _ => false,
    }
}

fn accessor_overrides(parent: &Arc<Trait>, child: &Arc<Trait>) -> bool {
    match (&parent.variant, &child.variant) {
        (TraitVariant::Method(pm), TraitVariant::Method(cm)) => {
            cm.is_override && pm.signature.shape_compatible(&cm.signature)
        }
        _ => false,
    }
}

fn signature_compatible(a: &Trait, b: &Trait) -> bool {
    match (&a.variant, &b.variant) {
        (TraitVariant::Method(ma), TraitVariant::Method(mb)) => ma.signature.shape_compatible(&mb.signature),
        (TraitVariant::Property(pa), TraitVariant::Property(pb)) => pa.signature_compatible(pb),
        _ => false,
    }
}
