//! Live code registry and hot-swap engine.
//!
//! The host runtime describes its executable bodies as [`CodeUnit`]s and the
//! objects running them as [`Function`]s or [`Conformable`] implementors. The
//! [`Registry`] indexes units by symbolic [`CodePath`], remembers which owners
//! reference which unit, and swaps one unit for another in every owner at once.
//!
//! # Components
//!
//! - Collector ([`Registry::collect_all`], [`DefinitionHook`]) - discovers
//!   owners and assimilates their units into the path index
//! - Path index ([`PathIndex`]) - path to unit, and unit back to paths
//! - Owner cache ([`Registry::get_owners`]) - which live owners reference a unit
//! - Conform engine ([`Registry::conform`]) - validated in-place substitution
//!
//! # Example
//!
//! ```
//! use livecode_registry::{CodeUnit, Function, Registry, Value};
//!
//! let registry = Registry::default();
//! let one = CodeUnit::builder("answer", "m.py", 3).body(|_| Ok(Value::Int(1))).build();
//! let answer = Function::builder(one, "answer").register(&registry);
//! let _hook = registry.setup();
//!
//! let two = CodeUnit::builder("answer", "m.py", 3).body(|_| Ok(Value::Int(2))).build();
//! registry.conform(&answer, &two)?;
//! assert_eq!(answer.call(&[])?, Value::Int(2));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod collect;
mod config;
mod conform;
mod conformable;
mod error;
mod function;
mod index;
mod owners;
mod registry;
mod unit;
mod value;

pub use collect::DefinitionHook;
pub use config::{DEFAULT_SCAN_COST_THRESHOLD_MS, RegistryConfig};
pub use conform::{Replacement, Target};
pub use conformable::Conformable;
pub use error::{CallError, ConfigError, ConformError, LookupError};
pub use function::{Defaults, Frame, Function, FunctionBuilder};
pub use index::{CodePath, InsertAction, PathIndex, View};
pub use owners::{Owner, OwnerCache, OwnerId, OwnerLookup, Tracker};
pub use registry::{Location, Registry};
pub use unit::{Body, CodeUnit, CodeUnitBuilder, MODULE_MARKER, SUPER_CAPTURE, UnitId, UnitName};
pub use value::Value;
