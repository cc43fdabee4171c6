//! The registry service handle.
//!
//! # Lifecycle
//!
//! 1. [`Registry::new`] creates an empty registry.
//! 2. Owners are tracked as they are created ([`Registry::track_function`],
//!    [`crate::FunctionBuilder::register`], [`Registry::track_conformable`]).
//! 3. [`Registry::setup`] runs a full collection and returns the
//!    [`DefinitionHook`] for the host to call on every new unit.
//! 4. [`Registry::reset`] forgets paths and cached owners but keeps tracked
//!    owners, so a later [`Registry::collect_all`] rebuilds the index.
//!
//! # Concurrency
//!
//! Every public operation is synchronous. The index, the owner cache and the
//! tracker sit behind separate mutexes; a swap holds the cache and index locks
//! together so lookups never observe half of it. No lock is held while
//! calling into a [`Conformable`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::trace;

use crate::collect::DefinitionHook;
use crate::config::RegistryConfig;
use crate::conformable::Conformable;
use crate::error::LookupError;
use crate::function::Function;
use crate::index::{CodePath, PathIndex, View};
use crate::owners::{Owner, OwnerCache, OwnerLookup, Tracker};
use crate::unit::CodeUnit;

pub(crate) struct Inner {
	pub(crate) index: Mutex<PathIndex>,
	pub(crate) cache: Mutex<OwnerCache>,
	pub(crate) tracker: Mutex<Tracker>,
	modules: Mutex<FxHashMap<Box<str>, Arc<str>>>,
	config: RegistryConfig,
}

/// Where [`Registry::find_code`] should look for the declaring file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
	File(Arc<str>),
	/// A module name registered with [`Registry::register_module`].
	Module(String),
}

impl Location {
	pub fn file(file: &str) -> Self {
		Self::File(Arc::from(file))
	}

	pub fn module(name: &str) -> Self {
		Self::Module(name.to_string())
	}
}

/// Cheaply clonable handle to one code registry.
#[derive(Clone)]
pub struct Registry {
	pub(crate) inner: Arc<Inner>,
}

impl Default for Registry {
	fn default() -> Self {
		Self::new(RegistryConfig::default())
	}
}

impl Registry {
	pub fn new(config: RegistryConfig) -> Self {
		Self {
			inner: Arc::new(Inner {
				index: Mutex::new(PathIndex::new()),
				cache: Mutex::new(OwnerCache::new(&config)),
				tracker: Mutex::new(Tracker::default()),
				modules: Mutex::new(FxHashMap::default()),
				config,
			}),
		}
	}

	pub(crate) fn from_inner(inner: Arc<Inner>) -> Self {
		Self { inner }
	}

	pub fn config(&self) -> &RegistryConfig {
		&self.inner.config
	}

	/// Collects every tracked owner and returns the hook for incremental
	/// definitions.
	pub fn setup(&self) -> DefinitionHook {
		self.collect_all();
		DefinitionHook::new(&self.inner)
	}

	/// Forgets all paths, cached owners and the recorded scan cost.
	pub fn reset(&self) {
		self.inner.index.lock().clear();
		self.inner.cache.lock().clear();
	}

	pub fn track_function(&self, function: &Arc<Function>) {
		self.inner.tracker.lock().track(&Owner::Function(function.clone()));
	}

	pub fn track_conformable(&self, object: &Arc<dyn Conformable>) {
		self.inner.tracker.lock().track(&Owner::Conformable(object.clone()));
	}

	/// Number of live-or-unpruned tracked owners.
	pub fn tracked_len(&self) -> usize {
		self.inner.tracker.lock().len()
	}

	/// Maps a module name to its declaring file for [`Location::Module`].
	pub fn register_module(&self, name: &str, file: impl Into<Arc<str>>) {
		self.inner.modules.lock().insert(name.into(), file.into());
	}

	/// Resolves `path` (wildcard through the latest view, line-qualified
	/// through the first view).
	pub fn lookup(&self, path: &CodePath) -> Result<Arc<CodeUnit>, LookupError> {
		self.inner.index.lock().lookup(path)
	}

	pub fn lookup_in(&self, view: View, path: &CodePath) -> Result<Arc<CodeUnit>, LookupError> {
		self.inner.index.lock().lookup_in(view, path)
	}

	/// Finds the unit declared at `segments` inside `location`. Without a
	/// line, returns whatever currently holds that name.
	pub fn find_code(
		&self,
		segments: &[&str],
		location: Location,
		line: Option<u32>,
	) -> Result<Arc<CodeUnit>, LookupError> {
		let file = match location {
			Location::File(file) => file,
			Location::Module(module) => self
				.inner
				.modules
				.lock()
				.get(module.as_str())
				.cloned()
				.ok_or(LookupError::UnknownModule { module })?,
		};
		self.lookup(&CodePath::new(file, segments.iter().copied(), line))
	}

	pub fn paths_for(&self, unit: &CodeUnit) -> Vec<CodePath> {
		self.inner.index.lock().paths_for(unit)
	}

	/// Number of distinct wildcard and line-qualified paths.
	pub fn index_len(&self) -> usize {
		self.inner.index.lock().len()
	}

	/// Live owners of `unit`, answered from the cache when `lookup` allows.
	pub fn get_owners(&self, unit: &CodeUnit, lookup: OwnerLookup) -> Vec<Owner> {
		{
			let cache = self.inner.cache.lock();
			if cache.allows_cache(lookup) {
				let cached = cache.cached(unit);
				if !cached.is_empty() {
					return cached;
				}
			}
		}
		self.scan_owners(unit)
	}

	/// Walks every tracked owner for `unit` and overwrites its cache entry.
	pub fn scan_owners(&self, unit: &CodeUnit) -> Vec<Owner> {
		let started = Instant::now();
		let live = self.inner.tracker.lock().live();
		let owners: Vec<Owner> = live.into_iter().filter(|o| o.references(unit)).collect();
		let cost = started.elapsed();
		trace!(unit = %unit.id(), owners = owners.len(), ?cost, "scanned owners");
		self.inner.cache.lock().store_scan(unit, &owners, cost);
		owners
	}

	/// Records in the cache that `owner` moved from `old` to `new`.
	pub fn record_swap(&self, owner: &Owner, old: &CodeUnit, new: &CodeUnit) {
		self.inner.cache.lock().record_swap(owner, old, new);
	}

	pub fn set_always_use_cache(&self, always: bool) {
		self.inner.cache.lock().set_always_use_cache(always);
	}

	/// Wall-clock cost of the most recent owner scan.
	pub fn last_scan_cost(&self) -> Duration {
		self.inner.cache.lock().last_cost()
	}

	#[cfg(test)]
	pub(crate) fn set_last_scan_cost(&self, cost: Duration) {
		self.inner.cache.lock().set_last_cost(cost);
	}
}
