//! Shape differences
//!
//! Provides [`ShapeDiff`] for diff-friendly reporting of shape mismatches.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Difference between an expected and an actual [`Shape`](crate::Shape)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeDiff {
    /// Paths in the expected shape only
    pub missing: Vec<String>,
    /// Paths in the actual shape only
    pub unexpected: Vec<String>,
}

impl ShapeDiff {
    /// Check if both shapes were equivalent
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.unexpected.is_empty()
    }
}

impl Display for ShapeDiff {
    /// Unified-diff style: `-` for missing paths, `+` for unexpected ones
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return writeln!(f, "  (shapes are equivalent)");
        }
        for path in &self.missing {
            writeln!(f, "- {path}")?;
        }
        for path in &self.unexpected {
            writeln!(f, "+ {path}")?;
        }
        Ok(())
    }
}
