//! Where a module's routes are mounted.

use crate::registry::RegistryError;

/// Stored base path meaning "mount at the application root".
pub const ROOT_SENTINEL: &str = "/";

/// Mount point derived from a module's persisted base path.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Mount {
    /// No custom base path: mount under the module identifier.
    #[default]
    Identifier,
    /// Mount under a custom single-segment prefix.
    Prefix(String),
    /// Mount at the application root.
    Root,
}

impl Mount {
    /// Validate an administrator-supplied base path.
    ///
    /// Surrounding slashes are trimmed; the result must be one URL segment.
    /// An empty string resets to the identifier, `/` selects the root.
    pub fn parse(raw: &str) -> Result<Self, RegistryError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(Mount::Identifier);
        }
        if raw == ROOT_SENTINEL {
            return Ok(Mount::Root);
        }
        let segment = raw.trim_matches('/');
        let invalid = |reason: &'static str| RegistryError::InvalidBasePath {
            path: raw.to_string(),
            reason,
        };
        if segment.is_empty() {
            return Err(invalid("only slashes"));
        }
        if segment.contains('/') {
            return Err(invalid("must be a single path segment"));
        }
        if segment
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '?' | '#' | '%' | '{' | '}' | '*'))
        {
            return Err(invalid("contains characters not allowed in a path segment"));
        }
        Ok(Mount::Prefix(segment.to_string()))
    }

    /// Interpret a persisted base path. Never fails; unexpected values are
    /// trimmed the same way [`Mount::parse`] would.
    pub fn from_stored(raw: &str) -> Self {
        match raw.trim() {
            "" => Mount::Identifier,
            ROOT_SENTINEL => Mount::Root,
            other => match other.trim_matches('/') {
                "" => Mount::Identifier,
                segment => Mount::Prefix(segment.to_string()),
            },
        }
    }

    /// The persisted form of this mount.
    pub fn to_stored(&self) -> String {
        match self {
            Mount::Identifier => String::new(),
            Mount::Prefix(p) => p.clone(),
            Mount::Root => ROOT_SENTINEL.to_string(),
        }
    }

    /// URL prefix segment for `module_id`, `None` when mounted at the root.
    pub fn prefix<'a>(&'a self, module_id: &'a str) -> Option<&'a str> {
        match self {
            Mount::Identifier => Some(module_id),
            Mount::Prefix(p) => Some(p),
            Mount::Root => None,
        }
    }
}
