//! Discovery of owners and assimilation of code units into the path index.
//!
//! Owners announce themselves through [`Registry::track_function`] and
//! [`Registry::track_conformable`]; [`Registry::collect_all`] walks that set.
//! Units defined later arrive one at a time through a [`DefinitionHook`].

use std::sync::{Arc, Weak};

use tracing::{debug, trace};

use crate::index::CodePath;
use crate::registry::{Inner, Registry};
use crate::unit::{CodeUnit, UnitName};

/// Qualified-name segment marking a function-local scope.
const LOCALS_MARKER: &str = "<locals>";

/// Handle the host runtime calls whenever it defines a new code unit.
///
/// Holds the registry weakly; once the registry is gone the hook does nothing.
#[derive(Clone)]
pub struct DefinitionHook {
	registry: Weak<Inner>,
}

impl DefinitionHook {
	pub(crate) fn new(registry: &Arc<Inner>) -> Self {
		Self {
			registry: Arc::downgrade(registry),
		}
	}

	/// Assimilates `unit` and everything nested inside it. Idempotent.
	pub fn unit_defined(&self, unit: &Arc<CodeUnit>) {
		if let Some(inner) = self.registry.upgrade() {
			Registry::from_inner(inner).assimilate(unit, &[]);
		}
	}
}

impl Registry {
	/// Scans every live tracked owner, records it as an owner of each unit it
	/// references, and assimilates those units under the owner's lexical
	/// scope. Returns the number of (owner, unit) pairs seen.
	///
	/// Strictly additive: entries for units that no longer have owners are
	/// kept.
	pub fn collect_all(&self) -> usize {
		let owners = self.inner.tracker.lock().live();
		let mut pairs = 0usize;
		for owner in &owners {
			for unit in owner.units() {
				if let Some(qualname) = owner.qualname() {
					let scope = qualified_scope(&unit, qualname);
					self.assimilate(&unit, &scope);
				}
				self.inner.cache.lock().record_owner(owner, &unit);
				pairs += 1;
			}
		}
		debug!(owners = owners.len(), pairs, "collected code units");
		pairs
	}

	/// Registers `unit` and its nested units under `scope`.
	///
	/// `scope` starts with the declaring file followed by enclosing names.
	/// An empty scope means the unit is top-level in its own file.
	pub fn assimilate(&self, unit: &Arc<CodeUnit>, scope: &[Arc<str>]) {
		let mut planned = Vec::new();
		plan(unit, scope.to_vec(), &mut planned);
		if planned.is_empty() {
			return;
		}
		let mut index = self.inner.index.lock();
		for (paths, unit) in planned {
			index.register(paths, &unit);
		}
	}
}

/// `(file, enclosing names...)` for an owner with qualified name `qualname`.
fn qualified_scope(unit: &CodeUnit, qualname: &str) -> Vec<Arc<str>> {
	let mut parts: Vec<&str> = qualname.split('.').collect();
	parts.pop();
	std::iter::once(unit.file().clone())
		.chain(parts.into_iter().filter(|p| *p != LOCALS_MARKER).map(Arc::from))
		.collect()
}

fn plan(unit: &Arc<CodeUnit>, mut scope: Vec<Arc<str>>, out: &mut Vec<(Vec<CodePath>, Arc<CodeUnit>)>) {
	let segment: Option<Arc<str>> = match unit.name() {
		UnitName::Module => {
			if scope.last().is_some_and(|last| **last == **unit.file()) {
				None
			} else {
				Some(unit.file().clone())
			}
		}
		UnitName::Synthetic(marker) => {
			trace!(unit = %unit.id(), %marker, "skipping scaffolding");
			None
		}
		UnitName::Named(name) => {
			if scope.is_empty() {
				scope.push(unit.file().clone());
			}
			Some(Arc::from(&**name))
		}
	};

	if let Some(segment) = segment {
		scope.push(segment);
		let paths = [Some(unit.first_line()), None]
			.into_iter()
			.filter_map(|line| CodePath::from_scope(&scope, line))
			.collect::<Vec<_>>();
		trace!(unit = %unit.id(), path = %paths[0], "assimilated");
		out.push((paths, unit.clone()));
	}

	for child in unit.nested() {
		plan(child, scope.clone(), out);
	}
}

#[cfg(test)]
mod tests {
	use rstest::rstest;

	use super::*;
	use crate::config::RegistryConfig;
	use crate::conform::Replacement;
	use crate::conformable::Conformable;
	use crate::error::ConformError;

	fn path(file: &str, segments: &[&str], line: Option<u32>) -> CodePath {
		CodePath::new(file, segments.iter().copied(), line)
	}

	#[test]
	fn test_qualified_scope_drops_locals() {
		let unit = CodeUnit::builder("f", "alaska.py", 17).build();
		let scope = qualified_scope(&unit, "adderz.<locals>.f");
		let scope: Vec<&str> = scope.iter().map(|s| &**s).collect();
		assert_eq!(scope, vec!["alaska.py", "adderz"]);
	}

	#[test]
	fn test_module_unit_named_after_file() {
		let registry = Registry::new(RegistryConfig::default());
		let inner = CodeUnit::builder("nice", "alaska.py", 5).build();
		let module = CodeUnit::builder("<module>", "alaska.py", 1).nested(inner.clone()).build();
		registry.assimilate(&module, &[]);

		assert_eq!(registry.lookup(&path("alaska.py", &[], None)).unwrap().id(), module.id());
		assert_eq!(registry.lookup(&path("alaska.py", &["nice"], Some(5))).unwrap().id(), inner.id());
		assert_eq!(registry.lookup(&path("alaska.py", &["nice"], None)).unwrap().id(), inner.id());
	}

	#[test]
	fn test_module_unit_not_duplicated_under_file_scope() {
		let registry = Registry::new(RegistryConfig::default());
		let inner = CodeUnit::builder("nice", "alaska.py", 5).build();
		let module = CodeUnit::builder("<module>", "alaska.py", 1).nested(inner.clone()).build();
		registry.assimilate(&module, &[Arc::from("alaska.py")]);

		assert!(registry.lookup(&path("alaska.py", &["alaska.py"], None)).is_err());
		assert_eq!(registry.lookup(&path("alaska.py", &["nice"], None)).unwrap().id(), inner.id());
	}

	#[rstest]
	#[case("<lambda>")]
	#[case("<listcomp>")]
	#[case("<generic parameters of Box>")]
	fn test_scaffolding_is_transparent(#[case] marker: &str) {
		let registry = Registry::new(RegistryConfig::default());
		let method = CodeUnit::builder("teeth", "alaska.py", 48).build();
		let scaffold = CodeUnit::builder(marker, "alaska.py", 46).nested(method.clone()).build();
		let class = CodeUnit::builder("Bear", "alaska.py", 45).nested(scaffold).build();
		registry.assimilate(&class, &[Arc::from("alaska.py")]);

		assert!(registry.lookup(&path("alaska.py", &["Bear", marker], None)).is_err());
		assert_eq!(
			registry.lookup(&path("alaska.py", &["Bear", "teeth"], Some(48))).unwrap().id(),
			method.id()
		);
		assert_eq!(registry.paths_for(&method).len(), 2);
	}

	#[test]
	fn test_hook_is_idempotent_and_weak() {
		let registry = Registry::new(RegistryConfig::default());
		let hook = registry.setup();
		let unit = CodeUnit::builder("ice", "alaska.py", 1).build();

		hook.unit_defined(&unit);
		hook.unit_defined(&unit);
		assert_eq!(registry.index_len(), 2);
		assert_eq!(registry.paths_for(&unit).len(), 2);

		drop(registry);
		hook.unit_defined(&CodeUnit::builder("nice", "alaska.py", 5).build());
	}

	/// Defines a unit of its own every time the collector asks for its units.
	struct Loader {
		unit: Arc<CodeUnit>,
		side: Arc<CodeUnit>,
		define: Box<dyn Fn(&Arc<CodeUnit>) + Send + Sync>,
	}

	impl Conformable for Loader {
		fn conform(&self, _: &Replacement) -> Result<(), ConformError> {
			Ok(())
		}

		fn code_units(&self) -> Vec<Arc<CodeUnit>> {
			(self.define)(&self.side);
			vec![self.unit.clone()]
		}

		fn qualname(&self) -> Option<&str> {
			Some("loader")
		}
	}

	#[rstest]
	#[case::hook(true)]
	#[case::assimilate(false)]
	fn test_definition_during_collect(#[case] through_hook: bool) {
		let registry = Registry::new(RegistryConfig::default());
		let define: Box<dyn Fn(&Arc<CodeUnit>) + Send + Sync> = if through_hook {
			let hook = registry.setup();
			Box::new(move |unit| hook.unit_defined(unit))
		} else {
			let registry = registry.clone();
			Box::new(move |unit| registry.assimilate(unit, &[]))
		};
		let unit = CodeUnit::builder("load", "alaska.py", 70).build();
		let side = CodeUnit::builder("side", "alaska.py", 80).build();
		let loader: Arc<dyn Conformable> = Arc::new(Loader {
			unit: unit.clone(),
			side: side.clone(),
			define,
		});
		registry.track_conformable(&loader);

		assert_eq!(registry.collect_all(), 1);

		assert_eq!(registry.lookup(&path("alaska.py", &["load"], None)).unwrap().id(), unit.id());
		assert_eq!(registry.lookup(&path("alaska.py", &["side"], Some(80))).unwrap().id(), side.id());
		assert_eq!(registry.index_len(), 4);
	}
}
