//! Hot-swapping code units.
//!
//! # Dispatch
//!
//! Checked in order; the first matching row wins.
//!
//! | Target | Replacement | Action |
//! |---|---|---|
//! | [`Target::Conformable`] | any | delegate to [`Conformable::conform`] |
//! | [`Target::Unit`] | any | conform every owner of the unit |
//! | [`Target::Function`] | [`Replacement::Function`] | conform with its unit, then copy its defaults |
//! | [`Target::Function`] | [`Replacement::Unit`] | check free variables, then substitute |
//! | [`Target::Function`] | [`Replacement::Noop`] | nothing |
//! | [`Target::Function`] | [`Replacement::Conformable`] | [`ConformError::Unsupported`] |
//!
//! # Failure modes
//!
//! * Free-variable sets differ: [`ConformError::FreeVariables`], nothing mutated.
//! * Fanning out over a unit checks every function owner before touching any,
//!   then swaps the function owners before delegating to [`Conformable`]
//!   owners. A conformable failing afterwards leaves the function owners
//!   already swapped; there is no rollback across owners.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::conformable::Conformable;
use crate::error::ConformError;
use crate::function::Function;
use crate::owners::{Owner, OwnerLookup};
use crate::registry::Registry;
use crate::unit::CodeUnit;


/// The object being replaced.
#[derive(Clone)]
pub enum Target {
	Conformable(Arc<dyn Conformable>),
	Unit(Arc<CodeUnit>),
	Function(Arc<Function>),
}

impl Target {
	pub fn kind(&self) -> &'static str {
		match self {
			Self::Conformable(_) => "conformable",
			Self::Unit(_) => "code unit",
			Self::Function(_) => "function",
		}
	}
}

impl From<Owner> for Target {
	fn from(owner: Owner) -> Self {
		match owner {
			Owner::Function(f) => Self::Function(f),
			Owner::Conformable(c) => Self::Conformable(c),
		}
	}
}

impl From<Arc<Function>> for Target {
	fn from(f: Arc<Function>) -> Self {
		Self::Function(f)
	}
}

impl From<&Arc<Function>> for Target {
	fn from(f: &Arc<Function>) -> Self {
		Self::Function(f.clone())
	}
}

impl From<Arc<CodeUnit>> for Target {
	fn from(unit: Arc<CodeUnit>) -> Self {
		Self::Unit(unit)
	}
}

impl From<&Arc<CodeUnit>> for Target {
	fn from(unit: &Arc<CodeUnit>) -> Self {
		Self::Unit(unit.clone())
	}
}

impl From<Arc<dyn Conformable>> for Target {
	fn from(object: Arc<dyn Conformable>) -> Self {
		Self::Conformable(object)
	}
}

/// The new version to install.
#[derive(Clone, Default)]
pub enum Replacement {
	Function(Arc<Function>),
	Unit(Arc<CodeUnit>),
	Conformable(Arc<dyn Conformable>),
	/// Leave the target as it is.
	#[default]
	Noop,
}

impl Replacement {
	pub fn kind(&self) -> &'static str {
		match self {
			Self::Function(_) => "function",
			Self::Unit(_) => "code unit",
			Self::Conformable(_) => "conformable",
			Self::Noop => "nothing",
		}
	}

	/// The unit a function owner would end up executing.
	pub fn terminal_unit(&self) -> Option<Arc<CodeUnit>> {
		match self {
			Self::Function(f) => Some(f.code()),
			Self::Unit(unit) => Some(unit.clone()),
			Self::Conformable(_) | Self::Noop => None,
		}
	}
}

impl From<Arc<Function>> for Replacement {
	fn from(f: Arc<Function>) -> Self {
		Self::Function(f)
	}
}

impl From<&Arc<Function>> for Replacement {
	fn from(f: &Arc<Function>) -> Self {
		Self::Function(f.clone())
	}
}

impl From<Arc<CodeUnit>> for Replacement {
	fn from(unit: Arc<CodeUnit>) -> Self {
		Self::Unit(unit)
	}
}

impl From<&Arc<CodeUnit>> for Replacement {
	fn from(unit: &Arc<CodeUnit>) -> Self {
		Self::Unit(unit.clone())
	}
}

impl From<Arc<dyn Conformable>> for Replacement {
	fn from(object: Arc<dyn Conformable>) -> Self {
		Self::Conformable(object)
	}
}

impl Registry {
	/// Replaces `target` with `replacement` everywhere it is referenced.
	pub fn conform(
		&self,
		target: impl Into<Target>,
		replacement: impl Into<Replacement>,
	) -> Result<(), ConformError> {
		self.conform_with(target, replacement, OwnerLookup::Auto)
	}

	/// Like [`Self::conform`], choosing how owners of a unit target are found.
	pub fn conform_with(
		&self,
		target: impl Into<Target>,
		replacement: impl Into<Replacement>,
		lookup: OwnerLookup,
	) -> Result<(), ConformError> {
		self.conform_target(&target.into(), &replacement.into(), lookup)
	}

	fn conform_target(
		&self,
		target: &Target,
		replacement: &Replacement,
		lookup: OwnerLookup,
	) -> Result<(), ConformError> {
		match target {
			Target::Conformable(object) => object.conform(replacement).inspect_err(|err| {
				warn!(error = %err, "conformable refused replacement");
			}),
			Target::Unit(unit) => self.fan_out(unit, replacement, lookup),
			Target::Function(function) => self.conform_function(function, replacement),
		}
	}

	fn fan_out(
		&self,
		unit: &Arc<CodeUnit>,
		replacement: &Replacement,
		lookup: OwnerLookup,
	) -> Result<(), ConformError> {
		let (functions, objects): (Vec<Owner>, Vec<Owner>) = self
			.get_owners(unit, lookup)
			.into_iter()
			.partition(|owner| owner.as_function().is_some());
		if let Some(terminal) = replacement.terminal_unit() {
			for function in functions.iter().filter_map(Owner::as_function) {
				check_compatible(function, &function.code(), &terminal)?;
			}
		}
		debug!(
			unit = %unit.id(),
			functions = functions.len(),
			conformables = objects.len(),
			replacement = replacement.kind(),
			"conforming owners"
		);
		for owner in functions.into_iter().chain(objects) {
			self.conform_target(&owner.into(), replacement, lookup)?;
		}
		Ok(())
	}

	fn conform_function(
		&self,
		function: &Arc<Function>,
		replacement: &Replacement,
	) -> Result<(), ConformError> {
		match replacement {
			Replacement::Function(new) => {
				self.substitute(function, &new.code())?;
				function.set_defaults(new.defaults());
				Ok(())
			}
			Replacement::Unit(unit) => self.substitute(function, unit),
			Replacement::Noop => Ok(()),
			Replacement::Conformable(_) => Err(ConformError::Unsupported {
				target: "function",
				replacement: replacement.kind(),
			}),
		}
	}

	/// Installs `unit` as `function`'s code after checking captures match.
	///
	/// The current unit is read under the cache and index locks, so concurrent
	/// swaps of one function serialize and each repoints what the previous
	/// one installed.
	fn substitute(&self, function: &Arc<Function>, unit: &Arc<CodeUnit>) -> Result<(), ConformError> {
		let mut cache = self.inner.cache.lock();
		let mut index = self.inner.index.lock();
		let old = function.code();
		check_compatible(function, &old, unit)?;
		if old.id() == unit.id() {
			return Ok(());
		}

		let owner = Owner::Function(function.clone());
		cache.record_swap(&owner, &old, unit);
		let moved = index.repoint(&old, unit);
		function.set_code(unit.clone());
		debug!(
			function = function.qualname(),
			from = %old.id(),
			to = %unit.id(),
			moved,
			"swapped code unit"
		);
		Ok(())
	}
}

fn check_compatible(function: &Function, current: &CodeUnit, replacement: &CodeUnit) -> Result<(), ConformError> {
	if current.same_free_vars(replacement) {
		return Ok(());
	}
	let err = ConformError::FreeVariables {
		target: function.name().to_string(),
		before: current.free_vars().map(str::to_string).collect(),
		after: replacement.free_vars().map(str::to_string).collect(),
		super_capture: current.captures_super() != replacement.captures_super(),
	};
	warn!(function = function.qualname(), error = %err, "rejected swap");
	Err(err)
}
