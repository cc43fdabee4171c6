//! Bidirectional map between symbolic paths and code units.
//!
//! # Purpose
//!
//! Find a [`CodeUnit`] without holding a reference to it, and answer which
//! paths currently resolve to a given unit.
//!
//! # Mental model
//!
//! Two key stores share one key space:
//!
//! | View | Policy | Used for |
//! |------|--------|----------|
//! | [`View::First`] | first registration wins | line-qualified lookups, stable across swaps |
//! | [`View::Latest`] | last registration wins | wildcard lookups, follows swaps |
//!
//! A reverse map from unit to paths mirrors [`View::Latest`].
//!
//! # Invariants
//!
//! - An entry in [`View::First`] is never overwritten.
//!   - Enforced in: [`PathIndex::register`].
//!   - Tested by: `invariants::inv_first_write_is_sticky`.
//! - The reverse map is exactly the inverse of [`View::Latest`].
//!   - Enforced in: [`PathIndex::register`] (drops the path from the unit it
//!     previously resolved to) and [`PathIndex::repoint`].
//!   - Tested by: `invariants::inv_reverse_map_is_inverse`, `tests::prop_reverse_map_inverse`.
//!   - Failure symptom: a swap repoints paths that no longer belong to the old unit.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::LookupError;
use crate::unit::{CodeUnit, UnitId};

mod path;

pub use path::CodePath;

#[cfg(test)]
mod invariants;

/// Which of the two key stores to consult.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
	/// Keep the first unit seen for a path.
	First,
	/// Overwrite with the last unit seen for a path.
	Latest,
}

/// Outcome of registering one path in [`View::Latest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertAction {
	/// Path was new.
	InsertedNew,
	/// Path already resolved to the same unit.
	KeptExisting,
	/// Path resolved to a different unit and now points at the new one.
	ReplacedExisting,
}

/// Path-keyed index of code units.
#[derive(Debug, Default)]
pub struct PathIndex {
	first: FxHashMap<CodePath, Arc<CodeUnit>>,
	latest: FxHashMap<CodePath, Arc<CodeUnit>>,
	back: FxHashMap<UnitId, FxHashSet<CodePath>>,
}

impl PathIndex {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `unit` under every path in `paths`.
	pub fn register<I>(&mut self, paths: I, unit: &Arc<CodeUnit>) -> Vec<InsertAction>
	where
		I: IntoIterator<Item = CodePath>,
	{
		let mut actions = Vec::new();
		for path in paths {
			self.first.entry(path.clone()).or_insert_with(|| unit.clone());

			let action = match self.latest.insert(path.clone(), unit.clone()) {
				None => InsertAction::InsertedNew,
				Some(prev) if prev.id() == unit.id() => InsertAction::KeptExisting,
				Some(prev) => {
					self.forget(prev.id(), &path);
					InsertAction::ReplacedExisting
				}
			};
			self.back.entry(unit.id()).or_default().insert(path);
			actions.push(action);
		}
		actions
	}

	/// Moves every path resolving to `old` onto `new`. Returns how many
	/// paths moved.
	pub fn repoint(&mut self, old: &CodeUnit, new: &Arc<CodeUnit>) -> usize {
		if old.id() == new.id() {
			return 0;
		}
		let Some(paths) = self.back.remove(&old.id()) else {
			return 0;
		};
		let moved = paths.len();
		self.register(paths, new);
		moved
	}

	/// Resolves `path`: wildcard paths through [`View::Latest`],
	/// line-qualified paths through [`View::First`].
	pub fn lookup(&self, path: &CodePath) -> Result<Arc<CodeUnit>, LookupError> {
		let view = if path.is_wildcard() { View::Latest } else { View::First };
		self.lookup_in(view, path)
	}

	pub fn lookup_in(&self, view: View, path: &CodePath) -> Result<Arc<CodeUnit>, LookupError> {
		let store = match view {
			View::First => &self.first,
			View::Latest => &self.latest,
		};
		store.get(path).cloned().ok_or_else(|| LookupError::NotFound { path: path.clone() })
	}

	/// Paths currently resolving to `unit` in [`View::Latest`], sorted.
	pub fn paths_for(&self, unit: &CodeUnit) -> Vec<CodePath> {
		let mut paths: Vec<CodePath> = self
			.back
			.get(&unit.id())
			.map(|set| set.iter().cloned().collect())
			.unwrap_or_default();
		paths.sort();
		paths
	}

	/// Number of distinct paths in [`View::Latest`].
	pub fn len(&self) -> usize {
		self.latest.len()
	}

	pub fn is_empty(&self) -> bool {
		self.latest.is_empty()
	}

	pub fn clear(&mut self) {
		self.first.clear();
		self.latest.clear();
		self.back.clear();
	}

	fn forget(&mut self, unit: UnitId, path: &CodePath) {
		if let Some(set) = self.back.get_mut(&unit) {
			set.remove(path);
			if set.is_empty() {
				self.back.remove(&unit);
			}
		}
	}

	#[cfg(test)]
	pub(crate) fn latest_entries(&self) -> impl Iterator<Item = (&CodePath, &Arc<CodeUnit>)> {
		self.latest.iter()
	}

	#[cfg(test)]
	pub(crate) fn reverse_entries(&self) -> impl Iterator<Item = (&UnitId, &FxHashSet<CodePath>)> {
		self.back.iter()
	}
}
