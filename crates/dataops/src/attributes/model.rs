use super::uss;
use crate::api::model::{DatasetInfo, JobInfo, MemberInfo, SpoolFileInfo};
use crate::file::MfVirtualFile;
use formainframe_core::{ConnectionConfig, DsMask, JobsFilter};
use std::fmt;

/// Kind of remote resource a [`FileAttributes`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttributesKind {
    /// Sequential or partitioned dataset.
    Dataset,
    /// Member of a partitioned dataset.
    Member,
    /// USS file or directory.
    Uss,
    /// JES job.
    Job,
    /// Spool file of a job.
    SpoolFile,
}

impl AttributesKind {
    /// Every kind.
    pub const ALL: [Self; 5] = [
        Self::Dataset,
        Self::Member,
        Self::Uss,
        Self::Job,
        Self::SpoolFile,
    ];

    /// Kind of the parent for dependent kinds.
    #[must_use]
    pub const fn parent_kind(self) -> Option<Self> {
        match self {
            Self::Member => Some(Self::Dataset),
            Self::SpoolFile => Some(Self::Job),
            Self::Dataset | Self::Uss | Self::Job => None,
        }
    }
}

impl fmt::Display for AttributesKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Dataset => "data set",
            Self::Member => "member",
            Self::Uss => "USS file",
            Self::Job => "job",
            Self::SpoolFile => "spool file",
        })
    }
}

/// A connection known to have reached a resource, and how.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Requester {
    /// Found by a dataset mask.
    Masked {
        /// Connection used.
        connection: ConnectionConfig,
        /// Mask that listed the dataset.
        mask: DsMask,
    },
    /// Found by listing a USS directory.
    Uss {
        /// Connection used.
        connection: ConnectionConfig,
    },
    /// Found by a job filter.
    Jobs {
        /// Connection used.
        connection: ConnectionConfig,
        /// Filter that listed the job.
        filter: JobsFilter,
    },
}

impl Requester {
    /// Connection of the requester.
    #[must_use]
    pub const fn connection(&self) -> &ConnectionConfig {
        match self {
            Self::Masked { connection, .. }
            | Self::Uss { connection }
            | Self::Jobs { connection, .. } => connection,
        }
    }
}

impl fmt::Display for Requester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Masked { connection, mask } => write!(f, "{} [{mask}]", connection.name),
            Self::Uss { connection } => f.write_str(&connection.name),
            Self::Jobs { connection, filter } => write!(f, "{} [{filter}]", connection.name),
        }
    }
}

/// Dataset attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetAttributes {
    /// Dataset as listed by z/OSMF.
    pub info: DatasetInfo,
    /// Base URL of the system holding it.
    pub url: String,
    /// Connections that listed the dataset.
    pub requesters: Vec<Requester>,
}

/// Member attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberAttributes {
    /// Member as listed by z/OSMF.
    pub info: MemberInfo,
    /// Handle of the library.
    pub parent_file: MfVirtualFile,
    /// Base URL of the system holding it.
    pub url: String,
}

/// USS file or directory attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UssAttributes {
    /// Absolute path.
    pub path: String,
    /// Whether the entry is a directory.
    pub is_directory: bool,
    /// Size in bytes.
    pub length: u64,
    /// Base URL of the system holding it.
    pub url: String,
    /// Connections that listed the entry.
    pub requesters: Vec<Requester>,
    /// Code set from the file tag; `None` means binary.
    pub charset: Option<String>,
}

impl UssAttributes {
    /// Last path segment.
    #[must_use]
    pub fn name(&self) -> &str {
        uss::name(&self.path)
    }

    /// Path of the directory holding the entry, `None` for the root.
    #[must_use]
    pub fn parent_dir_path(&self) -> Option<&str> {
        uss::parent_dir_path(&self.path)
    }

    /// Whether content is transferred without conversion.
    #[must_use]
    pub const fn is_binary(&self) -> bool {
        self.charset.is_none()
    }
}

/// Job attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobAttributes {
    /// Job as listed by z/OSMF.
    pub info: JobInfo,
    /// Base URL of the system holding it.
    pub url: String,
    /// Connections that listed the job.
    pub requesters: Vec<Requester>,
}

/// Spool file attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpoolFileAttributes {
    /// Spool file as listed by z/OSMF.
    pub info: SpoolFileInfo,
    /// Handle of the job.
    pub parent_file: MfVirtualFile,
    /// Base URL of the system holding it.
    pub url: String,
}

/// Metadata of one remote resource behind a [`MfVirtualFile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileAttributes {
    /// Dataset.
    Dataset(DatasetAttributes),
    /// PDS member, depends on its dataset.
    Member(MemberAttributes),
    /// USS file or directory.
    Uss(UssAttributes),
    /// JES job.
    Job(JobAttributes),
    /// Spool file, depends on its job.
    SpoolFile(SpoolFileAttributes),
}

impl FileAttributes {
    /// Kind tag.
    #[must_use]
    pub const fn kind(&self) -> AttributesKind {
        match self {
            Self::Dataset(_) => AttributesKind::Dataset,
            Self::Member(_) => AttributesKind::Member,
            Self::Uss(_) => AttributesKind::Uss,
            Self::Job(_) => AttributesKind::Job,
            Self::SpoolFile(_) => AttributesKind::SpoolFile,
        }
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Dataset(a) => a.info.dsname.clone(),
            Self::Member(a) => a.info.name.clone(),
            Self::Uss(a) => a.name().to_string(),
            Self::Job(a) => format!("{} ({})", a.info.job_name, a.info.job_id),
            Self::SpoolFile(a) => a.info.dd_name.clone(),
        }
    }

    /// Base URL of the system holding the resource.
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Dataset(a) => &a.url,
            Self::Member(a) => &a.url,
            Self::Uss(a) => &a.url,
            Self::Job(a) => &a.url,
            Self::SpoolFile(a) => &a.url,
        }
    }

    /// Connections that reached the resource.
    ///
    /// Dependent resources have none of their own; calls go through the
    /// requesters of their parent.
    #[must_use]
    pub fn requesters(&self) -> &[Requester] {
        match self {
            Self::Dataset(a) => &a.requesters,
            Self::Uss(a) => &a.requesters,
            Self::Job(a) => &a.requesters,
            Self::Member(_) | Self::SpoolFile(_) => &[],
        }
    }

    fn requesters_mut(&mut self) -> Option<&mut Vec<Requester>> {
        match self {
            Self::Dataset(a) => Some(&mut a.requesters),
            Self::Uss(a) => Some(&mut a.requesters),
            Self::Job(a) => Some(&mut a.requesters),
            Self::Member(_) | Self::SpoolFile(_) => None,
        }
    }

    /// Drop every requester reaching the resource through `connection`.
    pub fn forget_connection(&mut self, connection: &ConnectionConfig) {
        if let Some(requesters) = self.requesters_mut() {
            requesters.retain(|r| r.connection() != connection);
        }
    }

    /// Content size in bytes, when known.
    #[must_use]
    pub const fn length(&self) -> u64 {
        match self {
            Self::Uss(a) => a.length,
            Self::SpoolFile(a) => a.info.byte_count,
            Self::Dataset(_) | Self::Member(_) | Self::Job(_) => 0,
        }
    }

    /// Handle of the parent for dependent resources.
    #[must_use]
    pub const fn parent_file(&self) -> Option<&MfVirtualFile> {
        match self {
            Self::Member(a) => Some(&a.parent_file),
            Self::SpoolFile(a) => Some(&a.parent_file),
            Self::Dataset(_) | Self::Uss(_) | Self::Job(_) => None,
        }
    }

    /// Whether the resource has children rather than content.
    #[must_use]
    pub fn is_directory(&self) -> bool {
        match self {
            Self::Dataset(a) => a.info.is_library(),
            Self::Uss(a) => a.is_directory,
            Self::Job(_) => true,
            Self::Member(_) | Self::SpoolFile(_) => false,
        }
    }

    /// Key identifying the remote resource regardless of how it was found.
    #[must_use]
    pub fn identity(&self) -> String {
        match self {
            Self::Dataset(a) => format!("{}|{}", a.url, a.info.dsname),
            Self::Member(a) => format!("{}|{}", a.parent_file.id(), a.info.name),
            Self::Uss(a) => format!("{}|{}", a.url, a.path),
            Self::Job(a) => format!("{}|{}", a.url, a.info.job_id),
            Self::SpoolFile(a) => format!("{}|{}", a.parent_file.id(), a.info.id),
        }
    }

    /// Path of the local handle.
    #[must_use]
    pub fn file_path(&self) -> String {
        match self {
            Self::Dataset(a) => format!("{}/{}", a.url, a.info.dsname),
            Self::Member(a) => format!("{}/{}", a.parent_file.path(), a.info.name),
            Self::Uss(a) => format!("{}{}", a.url, a.path),
            Self::Job(a) => format!("{}/{}.{}", a.url, a.info.job_name, a.info.job_id),
            Self::SpoolFile(a) => format!("{}/{}", a.parent_file.path(), a.info.id),
        }
    }

    /// Add the requesters of `previous` not already known.
    ///
    /// Known requesters keep their position ahead of new ones.
    pub fn merge_requesters(&mut self, previous: &Self) {
        let Some(requesters) = self.requesters_mut() else {
            return;
        };
        let mut merged = previous.requesters().to_vec();
        for requester in requesters.drain(..) {
            if !merged.contains(&requester) {
                merged.push(requester);
            }
        }
        *requesters = merged;
    }

    /// Dataset variant.
    #[must_use]
    pub const fn as_dataset(&self) -> Option<&DatasetAttributes> {
        match self {
            Self::Dataset(a) => Some(a),
            _ => None,
        }
    }

    /// Member variant.
    #[must_use]
    pub const fn as_member(&self) -> Option<&MemberAttributes> {
        match self {
            Self::Member(a) => Some(a),
            _ => None,
        }
    }

    /// USS variant.
    #[must_use]
    pub const fn as_uss(&self) -> Option<&UssAttributes> {
        match self {
            Self::Uss(a) => Some(a),
            _ => None,
        }
    }

    /// Job variant.
    #[must_use]
    pub const fn as_job(&self) -> Option<&JobAttributes> {
        match self {
            Self::Job(a) => Some(a),
            _ => None,
        }
    }

    /// Spool file variant.
    #[must_use]
    pub const fn as_spool_file(&self) -> Option<&SpoolFileAttributes> {
        match self {
            Self::SpoolFile(a) => Some(a),
            _ => None,
        }
    }
}

impl fmt::Display for FileAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(requesters: Vec<Requester>) -> FileAttributes {
        FileAttributes::Dataset(DatasetAttributes {
            info: DatasetInfo::named("IBMUSER.JCL"),
            url: "https://h".into(),
            requesters,
        })
    }

    fn masked(name: &str) -> Requester {
        Requester::Masked {
            connection: ConnectionConfig::new(name, "https://h"),
            mask: DsMask::new("IBMUSER.*"),
        }
    }

    #[test]
    fn test_merge_requesters_keeps_known_first() {
        let a = masked("a");
        let b = masked("b");
        let previous = dataset(vec![a.clone()]);
        let mut next = dataset(vec![b.clone(), a.clone()]);
        next.merge_requesters(&previous);
        assert_eq!(next.requesters(), &[a, b]);
    }

    #[test]
    fn test_dependent_kinds() {
        let job = MfVirtualFile::new("BUILD (JOB1)", "https://h/BUILD.JOB1", true);
        let spool = FileAttributes::SpoolFile(SpoolFileAttributes {
            info: SpoolFileInfo {
                id: 2,
                dd_name: "JESMSGLG".into(),
                ..SpoolFileInfo::default()
            },
            parent_file: job.clone(),
            url: "https://h".into(),
        });
        assert_eq!(spool.kind().parent_kind(), Some(AttributesKind::Job));
        assert_eq!(spool.parent_file(), Some(&job));
        assert!(spool.requesters().is_empty());
        assert_eq!(spool.file_path(), "https://h/BUILD.JOB1/2");
    }
}
