//! Reserved-name denylist
//!
//! Names defined natively anywhere on a host type's inheritance chain must not
//! be shadowed by generated accessors. [`reserved_names`] walks the whole
//! chain and collects every own name of every level.

use std::collections::HashSet;

/// One level of a host type's inheritance chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeLevel {
    /// Type name, for diagnostics
    pub name: String,
    /// Names defined directly on this level
    pub own_names: Vec<String>,
}

impl TypeLevel {
    /// Create a level with its own names
    pub fn new<I, S>(name: impl Into<String>, own_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            own_names: own_names.into_iter().map(Into::into).collect(),
        }
    }
}

/// Inheritance chain, most-derived level first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeChain {
    levels: Vec<TypeLevel>,
}

impl TypeChain {
    /// Create an empty chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the next base level
    pub fn extends(mut self, level: TypeLevel) -> Self {
        self.levels.push(level);
        self
    }

    /// Levels from most-derived to root
    pub fn levels(&self) -> &[TypeLevel] {
        &self.levels
    }
}

/// Set of names accessors must not shadow
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReservedNames {
    names: HashSet<String>,
}

impl ReservedNames {
    /// An empty denylist
    pub fn none() -> Self {
        Self::default()
    }

    /// Check whether `name` is reserved
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Number of reserved names
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check if nothing is reserved
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterate reserved names in no particular order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for ReservedNames {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Collect every own name of every level of `chain`
pub fn reserved_names(chain: &TypeChain) -> ReservedNames {
    chain
        .levels()
        .iter()
        .flat_map(|level| level.own_names.iter().cloned())
        .collect()
}
