use std::fmt;
use std::sync::Arc;

/// Symbolic address of a code unit.
///
/// `(file, segments..., line)`. Segments hold the lexical nesting followed
/// by the unit name. A path with `line == None` is the wildcard variant, which
/// tracks the current unit for that name across swaps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CodePath {
	file: Arc<str>,
	segments: Vec<Box<str>>,
	line: Option<u32>,
}

impl CodePath {
	pub fn new<I, S>(file: impl Into<Arc<str>>, segments: I, line: Option<u32>) -> Self
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		Self {
			file: file.into(),
			segments: segments.into_iter().map(|s| s.as_ref().into()).collect(),
			line,
		}
	}

	/// Builds a path from a scope whose first element is the file.
	pub(crate) fn from_scope(scope: &[Arc<str>], line: Option<u32>) -> Option<Self> {
		let (file, segments) = scope.split_first()?;
		Some(Self {
			file: file.clone(),
			segments: segments.iter().map(|s| Box::from(&**s)).collect(),
			line,
		})
	}

	pub fn file(&self) -> &str {
		&self.file
	}

	pub fn segments(&self) -> impl ExactSizeIterator<Item = &str> + '_ {
		self.segments.iter().map(AsRef::as_ref)
	}

	pub fn line(&self) -> Option<u32> {
		self.line
	}

	pub fn is_wildcard(&self) -> bool {
		self.line.is_none()
	}

	/// The same path with the line dropped.
	pub fn wildcard(&self) -> Self {
		Self {
			line: None,
			..self.clone()
		}
	}
}

impl fmt::Display for CodePath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.file)?;
		for seg in &self.segments {
			write!(f, "::{seg}")?;
		}
		match self.line {
			Some(line) => write!(f, "@{line}"),
			None => f.write_str("@*"),
		}
	}
}
