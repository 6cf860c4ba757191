//! Versioned store naming: `{prefix}-{role}-v{version}`.

use std::fmt;

/// Logical role of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreRole {
    /// Populated at install time from the precache manifest.
    Static,
    /// Filled lazily by successful network fetches.
    Dynamic,
}

impl fmt::Display for StoreRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreRole::Static => f.write_str("static"),
            StoreRole::Dynamic => f.write_str("dynamic"),
        }
    }
}

/// The store names a worker version expects to own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheNames {
    prefix: String,
    version: u32,
}

impl CacheNames {
    pub fn new(prefix: impl Into<String>, version: u32) -> Self {
        Self { prefix: prefix.into(), version }
    }

    pub fn name(&self, role: StoreRole) -> String {
        format!("{}-{}-v{}", self.prefix, role, self.version)
    }

    pub fn static_name(&self) -> String {
        self.name(StoreRole::Static)
    }

    pub fn dynamic_name(&self) -> String {
        self.name(StoreRole::Dynamic)
    }

    /// Whether `name` belongs to this application at all, any version.
    pub fn in_namespace(&self, name: &str) -> bool {
        name.strip_prefix(&self.prefix)
            .is_some_and(|rest| rest.starts_with('-'))
    }

    /// In the namespace but not one of the two current names.
    pub fn is_stale(&self, name: &str) -> bool {
        self.in_namespace(name) && name != self.static_name() && name != self.dynamic_name()
    }
}
