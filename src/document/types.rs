//! Document identifiers

use std::fmt;

use super::error::{DocumentError, Result};

/// A sanitized file name under the documents root.
///
/// Never empty, never contains a path separator or NUL, never starts with
/// a dot, so joining it onto the root cannot escape it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Err(DocumentError::InvalidRequest(
                "document name is empty".to_string(),
            ));
        }
        if raw.starts_with('.') {
            return Err(DocumentError::InvalidRequest(format!(
                "document name {raw:?} must not start with a dot"
            )));
        }
        if raw.contains(['/', '\\', '\0']) {
            return Err(DocumentError::InvalidRequest(format!(
                "document name {raw:?} contains a path separator"
            )));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
