//! Local handles for remote resources.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of a [`MfVirtualFile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(u64);

impl FileId {
    fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A local handle standing for one remote resource.
///
/// Handles are created by attribute services and compared by identity:
/// two handles for the same remote resource are never created.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MfVirtualFile {
    id: FileId,
    name: String,
    path: String,
    is_directory: bool,
}

impl MfVirtualFile {
    /// Create a handle with a fresh id.
    #[must_use]
    pub fn new(name: impl Into<String>, path: impl Into<String>, is_directory: bool) -> Self {
        Self {
            id: FileId::next(),
            name: name.into(),
            path: path.into(),
            is_directory,
        }
    }

    /// Identifier.
    #[must_use]
    pub const fn id(&self) -> FileId {
        self.id
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path, unique among live handles.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether the handle has children rather than content.
    #[must_use]
    pub const fn is_directory(&self) -> bool {
        self.is_directory
    }
}

impl fmt::Display for MfVirtualFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}
