use std::sync::Arc;

use super::{CodePath, PathIndex, View};
use crate::unit::CodeUnit;

fn unit(name: &str, line: u32) -> Arc<CodeUnit> {
	CodeUnit::builder(name, "alaska.py", line).build()
}

fn both(name: &str, line: u32) -> [CodePath; 2] {
	[
		CodePath::new("alaska.py", [name], Some(line)),
		CodePath::new("alaska.py", [name], None),
	]
}

/// Asserts that the reverse map mirrors the latest-write view exactly.
pub(crate) fn assert_inverse(index: &PathIndex) {
	for (path, unit) in index.latest_entries() {
		let reverse = index.paths_for(unit);
		assert!(
			reverse.contains(path),
			"{path} resolves to {} but is missing from its reverse set",
			unit.id()
		);
	}
	for (id, paths) in index.reverse_entries() {
		assert!(!paths.is_empty(), "empty reverse set kept for {id}");
		for path in paths {
			let current = index
				.lookup_in(View::Latest, path)
				.unwrap_or_else(|_| panic!("reverse entry {path} has no latest-write entry"));
			assert_eq!(current.id(), *id, "reverse entry {path} is stale");
		}
	}
}

/// Invariant: a first-write entry is never replaced.
///
/// Line-qualified lookups resolve through the first-write view, so a later
/// registration under the same path must not displace the original unit.
#[test]
fn inv_first_write_is_sticky() {
	let mut index = PathIndex::new();
	let original = unit("snow", 61);
	let later = unit("snow", 61);
	index.register(both("snow", 61), &original);
	index.register(both("snow", 61), &later);

	let [qualified, wildcard] = both("snow", 61);
	assert_eq!(index.lookup_in(View::First, &qualified).unwrap().id(), original.id());
	assert_eq!(index.lookup_in(View::First, &wildcard).unwrap().id(), original.id());
	assert_eq!(index.lookup_in(View::Latest, &wildcard).unwrap().id(), later.id());
	assert_inverse(&index);
}

/// Invariant: re-registering a path under a new unit drops it from the old
/// unit's reverse set.
#[test]
fn inv_reverse_map_is_inverse() {
	let mut index = PathIndex::new();
	let a = unit("ice", 1);
	let b = unit("ice", 1);
	index.register(both("ice", 1), &a);
	assert_eq!(index.paths_for(&a).len(), 2);

	let [_, wildcard] = both("ice", 1);
	index.register([wildcard.clone()], &b);
	assert_eq!(index.paths_for(&a), vec![CodePath::new("alaska.py", ["ice"], Some(1))]);
	assert_eq!(index.paths_for(&b), vec![wildcard]);
	assert_inverse(&index);
}

/// Invariant: repointing moves the whole reverse set and leaves none behind.
#[test]
fn inv_repoint_moves_reverse_set() {
	let mut index = PathIndex::new();
	let old = unit("snow", 61);
	let new = unit("snow2", 65);
	index.register(both("snow", 61), &old);
	index.register(both("snow2", 65), &new);

	assert_eq!(index.repoint(&old, &new), 2);
	assert!(index.paths_for(&old).is_empty());
	assert_eq!(index.paths_for(&new).len(), 4);
	assert_inverse(&index);

	assert_eq!(index.repoint(&old, &new), 0, "second repoint has nothing to move");
}
