//! Code units: identity-keyed, immutable executable bodies.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::CallError;
use crate::function::Frame;
use crate::value::Value;

/// Free variable introduced by a zero-argument `super` call inside a method.
pub const SUPER_CAPTURE: &str = "__class__";

/// Name of the synthetic unit holding a file's top-level body.
pub const MODULE_MARKER: &str = "<module>";

static NEXT_UNIT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a [`CodeUnit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnitId(u64);

impl UnitId {
	fn next() -> Self {
		Self(NEXT_UNIT_ID.fetch_add(1, Ordering::Relaxed))
	}

	pub fn as_u64(self) -> u64 {
		self.0
	}
}

impl fmt::Display for UnitId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "unit#{}", self.0)
	}
}

/// Declared name of a code unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UnitName {
	/// An ordinary addressable name.
	Named(Box<str>),
	/// The top-level body of a source file.
	Module,
	/// Bracketed scaffolding such as `<lambda>`, `<listcomp>` or
	/// `<generic parameters of T>`.
	Synthetic(Box<str>),
}

impl UnitName {
	/// Classifies a raw declared name.
	pub fn parse(raw: &str) -> Self {
		if raw == MODULE_MARKER {
			Self::Module
		} else if raw.starts_with('<') {
			Self::Synthetic(raw.into())
		} else {
			Self::Named(raw.into())
		}
	}

	pub fn as_str(&self) -> &str {
		match self {
			Self::Named(name) | Self::Synthetic(name) => name,
			Self::Module => MODULE_MARKER,
		}
	}
}

impl fmt::Display for UnitName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Executable body of a code unit.
pub type Body = Arc<dyn Fn(&Frame<'_>) -> Result<Value, CallError> + Send + Sync>;

/// An immutable executable body.
///
/// Equality and hashing use [`UnitId`] only: two units built from identical
/// parts are still distinct.
pub struct CodeUnit {
	id: UnitId,
	name: UnitName,
	file: Arc<str>,
	first_line: u32,
	params: Vec<Box<str>>,
	free_vars: Vec<Box<str>>,
	nested: Vec<Arc<CodeUnit>>,
	body: Body,
}

impl CodeUnit {
	/// Starts building a unit declared as `name` in `file` at `first_line`.
	pub fn builder(name: &str, file: impl Into<Arc<str>>, first_line: u32) -> CodeUnitBuilder {
		CodeUnitBuilder {
			name: UnitName::parse(name),
			file: file.into(),
			first_line,
			params: Vec::new(),
			free_vars: Vec::new(),
			nested: Vec::new(),
			body: None,
		}
	}

	pub fn id(&self) -> UnitId {
		self.id
	}

	pub fn name(&self) -> &UnitName {
		&self.name
	}

	pub fn file(&self) -> &Arc<str> {
		&self.file
	}

	pub fn first_line(&self) -> u32 {
		self.first_line
	}

	pub fn params(&self) -> impl ExactSizeIterator<Item = &str> + '_ {
		self.params.iter().map(AsRef::as_ref)
	}

	pub fn param_count(&self) -> usize {
		self.params.len()
	}

	/// Free-variable names in declaration order.
	pub fn free_vars(&self) -> impl ExactSizeIterator<Item = &str> + '_ {
		self.free_vars.iter().map(AsRef::as_ref)
	}

	/// Units declared lexically inside this one.
	pub fn nested(&self) -> &[Arc<CodeUnit>] {
		&self.nested
	}

	/// Returns true when both units capture the same set of names, in any order.
	pub fn same_free_vars(&self, other: &CodeUnit) -> bool {
		let mut a: Vec<&str> = self.free_vars().collect();
		let mut b: Vec<&str> = other.free_vars().collect();
		a.sort_unstable();
		a.dedup();
		b.sort_unstable();
		b.dedup();
		a == b
	}

	pub(crate) fn captures_super(&self) -> bool {
		self.free_vars().any(|v| v == SUPER_CAPTURE)
	}

	pub(crate) fn run(&self, frame: &Frame<'_>) -> Result<Value, CallError> {
		(self.body)(frame)
	}
}

impl PartialEq for CodeUnit {
	fn eq(&self, other: &Self) -> bool {
		self.id == other.id
	}
}

impl Eq for CodeUnit {}

impl Hash for CodeUnit {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.id.hash(state);
	}
}

impl fmt::Debug for CodeUnit {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("CodeUnit")
			.field("id", &self.id)
			.field("name", &self.name.as_str())
			.field("file", &self.file)
			.field("first_line", &self.first_line)
			.field("free_vars", &self.free_vars)
			.field("nested", &self.nested.len())
			.finish_non_exhaustive()
	}
}

fn nil_body(_: &Frame<'_>) -> Result<Value, CallError> {
	Ok(Value::Nil)
}

/// Builder for [`CodeUnit`].
pub struct CodeUnitBuilder {
	name: UnitName,
	file: Arc<str>,
	first_line: u32,
	params: Vec<Box<str>>,
	free_vars: Vec<Box<str>>,
	nested: Vec<Arc<CodeUnit>>,
	body: Option<Body>,
}

impl CodeUnitBuilder {
	pub fn params<I, S>(mut self, params: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		self.params = params.into_iter().map(|p| p.as_ref().into()).collect();
		self
	}

	pub fn free_vars<I, S>(mut self, vars: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		self.free_vars = vars.into_iter().map(|v| v.as_ref().into()).collect();
		self
	}

	pub fn nested(mut self, unit: Arc<CodeUnit>) -> Self {
		self.nested.push(unit);
		self
	}

	pub fn body<F>(mut self, body: F) -> Self
	where
		F: Fn(&Frame<'_>) -> Result<Value, CallError> + Send + Sync + 'static,
	{
		self.body = Some(Arc::new(body));
		self
	}

	/// Finalizes the unit and allocates its identity. A unit without a body
	/// evaluates to [`Value::Nil`].
	pub fn build(self) -> Arc<CodeUnit> {
		Arc::new(CodeUnit {
			id: UnitId::next(),
			name: self.name,
			file: self.file,
			first_line: self.first_line,
			params: self.params,
			free_vars: self.free_vars,
			nested: self.nested,
			body: self.body.unwrap_or_else(|| Arc::new(nil_body)),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_identity_not_value() {
		let a = CodeUnit::builder("f", "m.py", 3).build();
		let b = CodeUnit::builder("f", "m.py", 3).build();
		assert_ne!(*a, *b);
		assert_eq!(*a, *a.clone());
	}

	#[test]
	fn test_name_classification() {
		assert_eq!(UnitName::parse("<module>"), UnitName::Module);
		assert_eq!(UnitName::parse("<lambda>"), UnitName::Synthetic("<lambda>".into()));
		assert_eq!(UnitName::parse("snow"), UnitName::Named("snow".into()));
	}

	#[test]
	fn test_free_vars_compare_as_sets() {
		let a = CodeUnit::builder("f", "m.py", 1).free_vars(["x", "y"]).build();
		let b = CodeUnit::builder("g", "m.py", 5).free_vars(["y", "x"]).build();
		let c = CodeUnit::builder("h", "m.py", 9).free_vars(["x"]).build();
		assert!(a.same_free_vars(&b));
		assert!(!a.same_free_vars(&c));
	}
}
