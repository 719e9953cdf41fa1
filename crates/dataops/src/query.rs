//! Fetch request paired with the connection it runs against.

use crate::file::MfVirtualFile;
use formainframe_core::ConnectionConfig;
use std::fmt;

/// What to fetch and from which connection.
///
/// Equality and hashing cover both halves, so a query is used directly as
/// a cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteQuery<R> {
    /// Request descriptor.
    pub request: R,
    /// Connection the request is sent through.
    pub connection: ConnectionConfig,
}

impl<R> RemoteQuery<R> {
    /// Pair a request with a connection.
    #[must_use]
    pub const fn new(request: R, connection: ConnectionConfig) -> Self {
        Self {
            request,
            connection,
        }
    }
}

impl<R: fmt::Display> fmt::Display for RemoteQuery<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.request, self.connection.name)
    }
}

/// Members of a partitioned dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LibraryQuery {
    /// Handle of the dataset.
    pub library: MfVirtualFile,
}

impl LibraryQuery {
    /// Query the members of `library`.
    #[must_use]
    pub const fn new(library: MfVirtualFile) -> Self {
        Self { library }
    }
}

impl fmt::Display for LibraryQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "members of {}", self.library)
    }
}

/// Spool files of a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobQuery {
    /// Handle of the job.
    pub job: MfVirtualFile,
}

impl JobQuery {
    /// Query the spool files of `job`.
    #[must_use]
    pub const fn new(job: MfVirtualFile) -> Self {
        Self { job }
    }
}

impl fmt::Display for JobQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "spool of {}", self.job)
    }
}

/// Listing of a USS directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UssQuery {
    /// Absolute directory path.
    pub path: String,
}

impl UssQuery {
    /// Query the directory at `path`.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl fmt::Display for UssQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formainframe_core::DsMask;
    use std::collections::HashSet;

    #[test]
    fn test_query_identity_is_value_based() {
        let conn = ConnectionConfig::new("dev", "https://h");
        let other = ConnectionConfig::new("dev", "https://h");
        let a = RemoteQuery::new(DsMask::new("ibmuser.*"), conn.clone());
        let b = RemoteQuery::new(DsMask::new("IBMUSER.*"), conn);
        let c = RemoteQuery::new(DsMask::new("IBMUSER.*"), other);

        let keys: HashSet<_> = [a.clone(), b, c].into_iter().collect();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&a));
    }
}
