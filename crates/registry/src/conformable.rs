//! Opt-in capability for objects that handle their own replacement.

use std::sync::Arc;

use crate::conform::Replacement;
use crate::error::ConformError;
use crate::unit::CodeUnit;

/// An object that accepts a replacement of itself.
///
/// The registry never inspects what an implementation does with the
/// replacement; it only delegates. The reporting hooks let the collector and
/// the owner cache see which units the object holds on to.
pub trait Conformable: Send + Sync {
	/// Takes `replacement` in place of the current behavior.
	fn conform(&self, replacement: &Replacement) -> Result<(), ConformError>;

	/// Code units this object currently references.
	fn code_units(&self) -> Vec<Arc<CodeUnit>> {
		Vec::new()
	}

	/// Dotted qualified name used to derive index paths.
	fn qualname(&self) -> Option<&str> {
		None
	}
}
