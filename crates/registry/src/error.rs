//! Error types surfaced by the registry.

use crate::index::CodePath;

/// Path or module resolution failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
	/// No code unit is registered under the requested path.
	#[error("no code unit registered at {path}")]
	NotFound { path: CodePath },
	/// `Location::Module` named a module the registry was never told about.
	#[error("unknown module {module:?}")]
	UnknownModule { module: String },
}

/// A requested substitution is unsafe or meaningless.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConformError {
	/// The replacement captures a different set of free variables.
	#[error(
		"cannot replace closure `{target}` because the free variables changed. Before: {before:?}; after: {after:?}.{}",
		super_note(.super_capture)
	)]
	FreeVariables {
		target: String,
		before: Vec<String>,
		after: Vec<String>,
		/// Exactly one side captures the enclosing-class variable.
		super_capture: bool,
	},
	/// The operand kinds cannot be reconciled.
	#[error("cannot conform {target} with {replacement}")]
	Unsupported {
		target: &'static str,
		replacement: &'static str,
	},
	/// A [`crate::Conformable`] rejected its replacement.
	#[error("`{target}` refused replacement: {message}")]
	Delegated { target: String, message: String },
}

fn super_note(super_capture: &bool) -> &'static str {
	if *super_capture {
		" Note: the use of `super` entails the `__class__` free variable."
	} else {
		""
	}
}

/// Failures raised while invoking a [`crate::Function`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CallError {
	#[error("`{function}` takes {expected} arguments but {given} were given")]
	Arity {
		function: String,
		expected: usize,
		given: usize,
	},
	#[error("missing argument `{name}`")]
	MissingArgument { name: String },
	#[error("free variable `{name}` is not bound in this closure")]
	UnboundFree { name: String },
	#[error("expected {expected}, found {found}")]
	TypeMismatch {
		expected: &'static str,
		found: &'static str,
	},
	#[error("{0}")]
	Raised(String),
}

/// Configuration could not be parsed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("invalid registry config: {0}")]
	Toml(#[from] toml::de::Error),
}
