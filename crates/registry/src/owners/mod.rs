//! Owner tracking and the per-unit owner cache.
//!
//! Owners register with a [`Tracker`] when they are created and are held
//! weakly, so the tracker is the universe a full scan walks. The
//! [`OwnerCache`] remembers the last answer per unit and decides, based on how
//! expensive the last scan was, whether that answer can be reused.

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use rustc_hash::FxHashMap;

use crate::config::RegistryConfig;
use crate::conformable::Conformable;
use crate::function::Function;
use crate::unit::{CodeUnit, UnitId};


/// Identity of an owner: the address of its shared allocation.
///
/// Stable for as long as any strong or weak handle to the owner exists, which
/// the tracker and the cache guarantee for every id they store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OwnerId(usize);

impl OwnerId {
	fn of<T: ?Sized>(arc: &Arc<T>) -> Self {
		Self(Arc::as_ptr(arc).cast::<()>() as usize)
	}
}

/// A live object currently referencing a code unit.
#[derive(Clone)]
pub enum Owner {
	Function(Arc<Function>),
	Conformable(Arc<dyn Conformable>),
}

impl Owner {
	pub fn id(&self) -> OwnerId {
		match self {
			Self::Function(f) => OwnerId::of(f),
			Self::Conformable(c) => OwnerId::of(c),
		}
	}

	pub fn qualname(&self) -> Option<&str> {
		match self {
			Self::Function(f) => Some(f.qualname()),
			Self::Conformable(c) => c.qualname(),
		}
	}

	/// Units this owner references right now.
	pub fn units(&self) -> Vec<Arc<CodeUnit>> {
		match self {
			Self::Function(f) => vec![f.code()],
			Self::Conformable(c) => c.code_units(),
		}
	}

	pub fn references(&self, unit: &CodeUnit) -> bool {
		match self {
			Self::Function(f) => f.code().id() == unit.id(),
			Self::Conformable(c) => c.code_units().iter().any(|u| u.id() == unit.id()),
		}
	}

	pub fn as_function(&self) -> Option<&Arc<Function>> {
		match self {
			Self::Function(f) => Some(f),
			Self::Conformable(_) => None,
		}
	}

	pub(crate) fn downgrade(&self) -> WeakOwner {
		match self {
			Self::Function(f) => WeakOwner::Function(Arc::downgrade(f)),
			Self::Conformable(c) => WeakOwner::Conformable(Arc::downgrade(c)),
		}
	}
}

impl PartialEq for Owner {
	fn eq(&self, other: &Self) -> bool {
		self.id() == other.id()
	}
}

impl Eq for Owner {}

impl fmt::Debug for Owner {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Function(func) => f.debug_tuple("Function").field(&func.qualname()).finish(),
			Self::Conformable(c) => f
				.debug_tuple("Conformable")
				.field(&c.qualname().unwrap_or("<anonymous>"))
				.finish(),
		}
	}
}

impl From<Arc<Function>> for Owner {
	fn from(f: Arc<Function>) -> Self {
		Self::Function(f)
	}
}

/// Weak handle stored by the tracker and the cache.
#[derive(Clone)]
pub(crate) enum WeakOwner {
	Function(Weak<Function>),
	Conformable(Weak<dyn Conformable>),
}

impl WeakOwner {
	pub(crate) fn upgrade(&self) -> Option<Owner> {
		match self {
			Self::Function(f) => f.upgrade().map(Owner::Function),
			Self::Conformable(c) => c.upgrade().map(Owner::Conformable),
		}
	}
}

/// How [`crate::Registry::get_owners`] may answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OwnerLookup {
	/// Always scan.
	Fresh,
	/// Reuse a non-empty cached answer, scan otherwise.
	Cached,
	/// Reuse the cache only when configured to, or when the last scan was
	/// slower than the configured threshold.
	#[default]
	Auto,
}

/// Every owner the registry was told about, held weakly.
#[derive(Default)]
pub struct Tracker {
	owners: FxHashMap<OwnerId, WeakOwner>,
}

impl Tracker {
	pub fn track(&mut self, owner: &Owner) {
		self.owners.insert(owner.id(), owner.downgrade());
	}

	/// Upgrades every tracked owner, pruning the ones that were dropped.
	pub fn live(&mut self) -> Vec<Owner> {
		let mut live = Vec::with_capacity(self.owners.len());
		let mut dead = 0usize;
		self.owners.retain(|_, weak| match weak.upgrade() {
			Some(owner) => {
				live.push(owner);
				true
			}
			None => {
				dead += 1;
				false
			}
		});
		if dead > 0 {
			tracing::trace!(dead, "pruned dropped owners");
		}
		live
	}

	pub fn len(&self) -> usize {
		self.owners.len()
	}

	pub fn is_empty(&self) -> bool {
		self.owners.is_empty()
	}
}

/// Last known owners per code unit.
pub struct OwnerCache {
	entries: FxHashMap<UnitId, FxHashMap<OwnerId, WeakOwner>>,
	last_cost: Duration,
	threshold: Duration,
	always_use_cache: bool,
}

impl OwnerCache {
	pub fn new(config: &RegistryConfig) -> Self {
		Self {
			entries: FxHashMap::default(),
			last_cost: Duration::ZERO,
			threshold: config.scan_cost_threshold(),
			always_use_cache: config.always_use_cache,
		}
	}

	/// Whether `lookup` allows answering from the cache.
	pub fn allows_cache(&self, lookup: OwnerLookup) -> bool {
		match lookup {
			OwnerLookup::Fresh => false,
			OwnerLookup::Cached => true,
			OwnerLookup::Auto => self.always_use_cache || self.last_cost > self.threshold,
		}
	}

	/// Cached owners of `unit` that are still alive.
	pub fn cached(&self, unit: &CodeUnit) -> Vec<Owner> {
		self.entries
			.get(&unit.id())
			.map(|set| set.values().filter_map(WeakOwner::upgrade).collect())
			.unwrap_or_default()
	}

	/// Replaces the entry for `unit` with the result of a scan.
	pub fn store_scan(&mut self, unit: &CodeUnit, owners: &[Owner], cost: Duration) {
		let set = owners.iter().map(|o| (o.id(), o.downgrade())).collect();
		self.entries.insert(unit.id(), set);
		self.last_cost = cost;
	}

	pub fn record_owner(&mut self, owner: &Owner, unit: &CodeUnit) {
		self.entries
			.entry(unit.id())
			.or_default()
			.insert(owner.id(), owner.downgrade());
	}

	/// Moves `owner` from `old`'s entry to `new`'s entry.
	pub fn record_swap(&mut self, owner: &Owner, old: &CodeUnit, new: &CodeUnit) {
		if let Some(set) = self.entries.get_mut(&old.id()) {
			set.remove(&owner.id());
			if set.is_empty() {
				self.entries.remove(&old.id());
			}
		}
		self.record_owner(owner, new);
	}

	pub fn last_cost(&self) -> Duration {
		self.last_cost
	}

	pub fn set_always_use_cache(&mut self, always: bool) {
		self.always_use_cache = always;
	}

	pub fn clear(&mut self) {
		self.entries.clear();
		self.last_cost = Duration::ZERO;
	}

	#[cfg(test)]
	pub(crate) fn set_last_cost(&mut self, cost: Duration) {
		self.last_cost = cost;
	}
}
