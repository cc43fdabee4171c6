//! Callables whose code unit can be replaced in place.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use rustc_hash::FxHashMap;

use crate::error::CallError;
use crate::registry::Registry;
use crate::unit::CodeUnit;
use crate::value::Value;

/// Default-argument state carried by a [`Function`].
///
/// Positional defaults bind to the trailing parameters, keyword defaults bind
/// by parameter name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Defaults {
	pub positional: Vec<Value>,
	pub keyword: FxHashMap<Box<str>, Value>,
}

impl Defaults {
	pub fn positional<I: IntoIterator<Item = Value>>(values: I) -> Self {
		Self {
			positional: values.into_iter().collect(),
			keyword: FxHashMap::default(),
		}
	}

	pub fn with_keyword(mut self, name: &str, value: Value) -> Self {
		self.keyword.insert(name.into(), value);
		self
	}
}

/// A function-like runtime object executing a [`CodeUnit`].
///
/// The unit is held behind an [`ArcSwap`], so every clone of the
/// `Arc<Function>` observes a swap at once.
pub struct Function {
	qualname: Box<str>,
	code: ArcSwap<CodeUnit>,
	defaults: ArcSwap<Defaults>,
	captures: FxHashMap<Box<str>, Value>,
}

impl Function {
	pub fn builder(code: Arc<CodeUnit>, qualname: &str) -> FunctionBuilder {
		FunctionBuilder {
			code,
			qualname: qualname.into(),
			defaults: Defaults::default(),
			captures: FxHashMap::default(),
		}
	}

	/// Dotted qualified name, e.g. `adder.<locals>.f`.
	pub fn qualname(&self) -> &str {
		&self.qualname
	}

	/// Last segment of the qualified name.
	pub fn name(&self) -> &str {
		self.qualname.rsplit('.').next().unwrap_or(&self.qualname)
	}

	/// The unit this function currently executes.
	pub fn code(&self) -> Arc<CodeUnit> {
		self.code.load_full()
	}

	pub fn defaults(&self) -> Arc<Defaults> {
		self.defaults.load_full()
	}

	pub(crate) fn set_code(&self, code: Arc<CodeUnit>) {
		self.code.store(code);
	}

	pub(crate) fn set_defaults(&self, defaults: Arc<Defaults>) {
		self.defaults.store(defaults);
	}

	/// Invokes the current code unit with positional `args`.
	pub fn call(&self, args: &[Value]) -> Result<Value, CallError> {
		let code = self.code.load_full();
		let defaults = self.defaults.load();
		let expected = code.param_count();
		if args.len() > expected {
			return Err(CallError::Arity {
				function: self.qualname.to_string(),
				expected,
				given: args.len(),
			});
		}

		let mut bound = Vec::with_capacity(expected);
		bound.extend_from_slice(args);
		let first_defaulted = expected.saturating_sub(defaults.positional.len());
		let surplus = defaults.positional.len().saturating_sub(expected);
		for (idx, param) in code.params().enumerate().skip(args.len()) {
			let value = if idx >= first_defaulted {
				defaults.positional[idx - first_defaulted + surplus].clone()
			} else if let Some(value) = defaults.keyword.get(param) {
				value.clone()
			} else {
				return Err(CallError::MissingArgument { name: param.to_string() });
			};
			bound.push(value);
		}

		let frame = Frame {
			function: self,
			code: &code,
			args: bound,
		};
		code.run(&frame)
	}
}

impl fmt::Debug for Function {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Function")
			.field("qualname", &self.qualname)
			.field("code", &self.code.load().id())
			.finish_non_exhaustive()
	}
}

/// Execution context handed to a unit body.
pub struct Frame<'a> {
	function: &'a Function,
	code: &'a CodeUnit,
	args: Vec<Value>,
}

impl Frame<'_> {
	pub fn function(&self) -> &Function {
		self.function
	}

	/// Positional argument `idx`, after defaults were applied.
	pub fn arg(&self, idx: usize) -> Result<&Value, CallError> {
		self.args.get(idx).ok_or_else(|| CallError::MissingArgument {
			name: self
				.code
				.params()
				.nth(idx)
				.map_or_else(|| format!("#{idx}"), str::to_string),
		})
	}

	/// Argument bound to parameter `name`.
	pub fn arg_named(&self, name: &str) -> Result<&Value, CallError> {
		let idx = self
			.code
			.params()
			.position(|p| p == name)
			.ok_or_else(|| CallError::MissingArgument { name: name.to_string() })?;
		self.arg(idx)
	}

	/// Captured variable `name`. The executing unit must declare it free.
	pub fn free(&self, name: &str) -> Result<&Value, CallError> {
		if !self.code.free_vars().any(|v| v == name) {
			return Err(CallError::UnboundFree { name: name.to_string() });
		}
		self.function
			.captures
			.get(name)
			.ok_or_else(|| CallError::UnboundFree { name: name.to_string() })
	}
}

/// Builder for [`Function`].
pub struct FunctionBuilder {
	code: Arc<CodeUnit>,
	qualname: Box<str>,
	defaults: Defaults,
	captures: FxHashMap<Box<str>, Value>,
}

impl FunctionBuilder {
	/// Binds a captured variable.
	pub fn capture(mut self, name: &str, value: impl Into<Value>) -> Self {
		self.captures.insert(name.into(), value.into());
		self
	}

	pub fn defaults(mut self, defaults: Defaults) -> Self {
		self.defaults = defaults;
		self
	}

	/// Builds an untracked function. Use [`Self::register`] to make it
	/// discoverable by the registry.
	pub fn build(self) -> Arc<Function> {
		Arc::new(Function {
			qualname: self.qualname,
			code: ArcSwap::new(self.code),
			defaults: ArcSwap::from_pointee(self.defaults),
			captures: self.captures,
		})
	}

	/// Builds the function and tracks it in `registry`.
	pub fn register(self, registry: &Registry) -> Arc<Function> {
		let function = self.build();
		registry.track_function(&function);
		function
	}
}
