//! Key-path shapes of nested values
//!
//! Provides [`Shape`], the set of key paths present in a [`serde_json::Value`].

use crate::diff::ShapeDiff;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};

/// Separator between segments of a key path
pub const PATH_SEPARATOR: char = '.';

/// Escape one key for use as a path segment
///
/// `~` becomes `~0` and `.` becomes `~1`, so a key containing the
/// separator never collides with a nested path: `{"a.b": 1}` has the path
/// `a~1b`, `{"a": {"b": 1}}` has `a` and `a.b`.
#[must_use]
pub fn escape_segment(key: &str) -> String {
    if key.contains(['~', PATH_SEPARATOR]) {
        key.replace('~', "~0").replace(PATH_SEPARATOR, "~1")
    } else {
        key.to_string()
    }
}

/// Set of key paths present in a structured value
///
/// - Objects contribute each key (escaped with [`escape_segment`] and
///   prefixed by its parent path) and the shape of the value under that key.
/// - Arrays contribute the union of their elements' shapes under the
///   array's own path; no index segment is recorded, so element count and
///   order never matter.
/// - Primitives and `null` contribute nothing.
///
/// # Examples
/// - `{"State": {"Name": "running"}}` → `State`, `State.Name`
/// - `{"Tags": [{"Key": "a"}, {"Value": "b"}]}` → `Tags`, `Tags.Key`, `Tags.Value`
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Shape(BTreeSet<String>);

impl Shape {
    /// Compute the shape of a value
    #[must_use]
    pub fn of(value: &Value) -> Self {
        let mut paths = BTreeSet::new();
        collect(value, None, &mut paths);
        Self(paths)
    }

    /// Shape with no paths (the shape of any primitive)
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a shape from explicit paths
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(paths.into_iter().map(Into::into).collect())
    }

    /// Iterate paths in sorted order
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Number of distinct paths
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if no paths are present
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check if a path is present
    #[inline]
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.0.contains(path)
    }

    /// Structural equivalence: same path set, nothing else considered
    #[inline]
    #[must_use]
    pub fn matches(&self, other: &Shape) -> bool {
        self.0 == other.0
    }

    /// Paths missing from / unexpected in `actual`, treating `self` as expected
    #[must_use]
    pub fn diff(&self, actual: &Shape) -> ShapeDiff {
        ShapeDiff {
            missing: self.0.difference(&actual.0).cloned().collect(),
            unexpected: actual.0.difference(&self.0).cloned().collect(),
        }
    }
}

impl Display for Shape {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for path in &self.0 {
            writeln!(f, "{path}")?;
        }
        Ok(())
    }
}

impl FromIterator<String> for Shape {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Compute the shape of a value
#[inline]
#[must_use]
pub fn shape_of(value: &Value) -> Shape {
    Shape::of(value)
}

/// Check two shapes for structural equivalence
#[inline]
#[must_use]
pub fn shapes_equal(a: &Shape, b: &Shape) -> bool {
    a.matches(b)
}

fn collect(value: &Value, prefix: Option<&str>, out: &mut BTreeSet<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let segment = escape_segment(key);
                let path = match prefix {
                    Some(parent) => format!("{parent}{PATH_SEPARATOR}{segment}"),
                    None => segment,
                };
                collect(child, Some(&path), out);
                out.insert(path);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect(item, prefix, out);
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {}
    }
}
