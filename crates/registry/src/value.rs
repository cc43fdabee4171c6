//! Runtime values produced and consumed by code bodies.

use std::fmt;
use std::sync::Arc;

use crate::error::CallError;

/// A value flowing through a [`crate::Function`] call.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
	#[default]
	Nil,
	Bool(bool),
	Int(i64),
	Float(f64),
	Str(Arc<str>),
}

impl Value {
	/// Short kind label used in error messages.
	pub fn kind(&self) -> &'static str {
		match self {
			Self::Nil => "nil",
			Self::Bool(_) => "bool",
			Self::Int(_) => "int",
			Self::Float(_) => "float",
			Self::Str(_) => "str",
		}
	}

	pub fn as_int(&self) -> Result<i64, CallError> {
		match self {
			Self::Int(i) => Ok(*i),
			other => Err(CallError::TypeMismatch {
				expected: "int",
				found: other.kind(),
			}),
		}
	}

	pub fn as_float(&self) -> Result<f64, CallError> {
		match self {
			Self::Float(f) => Ok(*f),
			Self::Int(i) => Ok(*i as f64),
			other => Err(CallError::TypeMismatch {
				expected: "float",
				found: other.kind(),
			}),
		}
	}

	pub fn as_str(&self) -> Result<&str, CallError> {
		match self {
			Self::Str(s) => Ok(s),
			other => Err(CallError::TypeMismatch {
				expected: "str",
				found: other.kind(),
			}),
		}
	}
}

impl fmt::Display for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Nil => write!(f, "nil"),
			Self::Bool(b) => write!(f, "{b}"),
			Self::Int(i) => write!(f, "{i}"),
			Self::Float(x) => write!(f, "{x}"),
			Self::Str(s) => write!(f, "{s:?}"),
		}
	}
}

impl From<i64> for Value {
	fn from(v: i64) -> Self {
		Self::Int(v)
	}
}

impl From<i32> for Value {
	fn from(v: i32) -> Self {
		Self::Int(v.into())
	}
}

impl From<f64> for Value {
	fn from(v: f64) -> Self {
		Self::Float(v)
	}
}

impl From<bool> for Value {
	fn from(v: bool) -> Self {
		Self::Bool(v)
	}
}

impl From<&str> for Value {
	fn from(v: &str) -> Self {
		Self::Str(Arc::from(v))
	}
}
