//! z/OSMF REST payloads.

use serde::{Deserialize, Serialize};

/// Dataset organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatasetOrganization {
    /// Partitioned (PDS).
    Po,
    /// Partitioned extended (PDS/E).
    PoE,
    /// Physical sequential.
    Ps,
    /// VSAM.
    Vs,
    /// Direct access.
    Da,
}

impl DatasetOrganization {
    /// Parse the z/OSMF `dsorg` value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "PO" => Some(Self::Po),
            "PO-E" => Some(Self::PoE),
            "PS" => Some(Self::Ps),
            "VS" => Some(Self::Vs),
            "DA" => Some(Self::Da),
            _ => None,
        }
    }
}

/// One dataset in a dataset list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetInfo {
    /// Dataset name.
    pub dsname: String,
    /// Organization, absent for migrated or aliased datasets.
    pub dsorg: Option<String>,
    /// Record format, e.g. `FB`.
    pub recfm: Option<String>,
    /// Logical record length as reported.
    pub lrecl: Option<String>,
    /// Volume serial.
    pub vol: Option<String>,
    /// Migrated flag, `YES` or `NO`.
    pub migr: Option<String>,
}

impl DatasetInfo {
    /// Dataset with just a name.
    #[must_use]
    pub fn named(dsname: impl Into<String>) -> Self {
        Self {
            dsname: dsname.into(),
            ..Self::default()
        }
    }

    /// Parsed organization.
    #[must_use]
    pub fn organization(&self) -> Option<DatasetOrganization> {
        self.dsorg.as_deref().and_then(DatasetOrganization::parse)
    }

    /// Whether the dataset holds members.
    #[must_use]
    pub fn is_library(&self) -> bool {
        matches!(
            self.organization(),
            Some(DatasetOrganization::Po | DatasetOrganization::PoE)
        )
    }

    /// Whether records have a fixed length.
    #[must_use]
    pub fn is_fixed_record(&self) -> bool {
        self.recfm
            .as_deref()
            .is_some_and(|recfm| recfm.trim_start().starts_with('F'))
    }

    /// Logical record length.
    #[must_use]
    pub fn record_length(&self) -> Option<usize> {
        self.lrecl.as_deref().and_then(|l| l.trim().parse().ok())
    }
}

/// Page of a dataset list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatasetsList {
    /// Returned datasets.
    pub items: Vec<DatasetInfo>,
    /// Rows in this page.
    pub returned_rows: usize,
    /// Rows matching the mask, when the server reports it.
    pub total_rows: Option<usize>,
}

/// One member of a partitioned dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MemberInfo {
    /// Member name.
    #[serde(rename = "member")]
    pub name: String,
    /// Last change date, when statistics exist.
    #[serde(rename = "c4date", skip_serializing_if = "Option::is_none")]
    pub changed: Option<String>,
}

impl MemberInfo {
    /// Member with just a name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            changed: None,
        }
    }
}

/// Member list of a partitioned dataset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MembersList {
    /// Returned members.
    pub items: Vec<MemberInfo>,
    /// Rows in this page.
    pub returned_rows: usize,
}

/// One entry of a USS directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UssFileInfo {
    /// Entry name, `.` and `..` included.
    pub name: String,
    /// Mode string such as `drwxr-xr-x`.
    pub mode: String,
    /// Size in bytes.
    pub size: u64,
    /// Owning user.
    pub user: Option<String>,
    /// Modification time as reported.
    pub mtime: Option<String>,
}

impl UssFileInfo {
    /// Whether the entry is a directory.
    #[must_use]
    pub fn is_directory(&self) -> bool {
        self.mode.starts_with('d')
    }
}

/// USS directory listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UssFilesList {
    /// Entries.
    pub items: Vec<UssFileInfo>,
    /// Rows returned.
    pub returned_rows: usize,
}

/// JES job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JobInfo {
    /// Job id, e.g. `JOB01234`.
    #[serde(rename = "jobid")]
    pub job_id: String,
    /// Job name.
    #[serde(rename = "jobname")]
    pub job_name: String,
    /// Submitting user.
    pub owner: String,
    /// `INPUT`, `ACTIVE` or `OUTPUT`.
    pub status: Option<String>,
    /// Return code once finished.
    pub retcode: Option<String>,
}

/// Spool file of a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpoolFileInfo {
    /// Spool file id within the job.
    pub id: u32,
    /// DD name.
    #[serde(rename = "ddname")]
    pub dd_name: String,
    /// Step name.
    #[serde(rename = "stepname")]
    pub step_name: Option<String>,
    /// Owning job id.
    #[serde(rename = "jobid")]
    pub job_id: String,
    /// Owning job name.
    #[serde(rename = "jobname")]
    pub job_name: String,
    /// Size in bytes.
    #[serde(rename = "byte-count")]
    pub byte_count: u64,
}

/// System known to z/OSMF.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SystemInfo {
    /// Nickname of the system.
    pub system_nick_name: String,
    /// Sysplex name.
    pub sysplex_name: Option<String>,
    /// z/OS release, e.g. `04.27.00`.
    pub system_release: Option<String>,
}

/// Systems known to z/OSMF, returned by the connection test.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SystemsResponse {
    /// Number of systems.
    pub num_rows: usize,
    /// Systems.
    pub items: Vec<SystemInfo>,
}

/// Action of a `chtag` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagAction {
    /// Report the current tag.
    List,
    /// Tag the file with a code set.
    Set,
    /// Remove the tag.
    Remove,
}

/// Body of `PUT /zosmf/restfiles/fs/{path}` for file tagging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileTagRequest {
    /// Always `chtag`.
    pub request: &'static str,
    /// Tag action.
    pub action: TagAction,
    /// Tag type, `text` when a code set is given.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub tag_type: Option<&'static str>,
    /// Code set for [`TagAction::Set`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codeset: Option<String>,
}

impl FileTagRequest {
    /// Request for `action`, with `codeset` used only when setting.
    #[must_use]
    pub fn new(action: TagAction, codeset: Option<String>) -> Self {
        let (tag_type, codeset) = match action {
            TagAction::Set => (Some("text"), codeset),
            TagAction::List | TagAction::Remove => (None, None),
        };
        Self {
            request: "chtag",
            action,
            tag_type,
            codeset,
        }
    }
}

/// Output of a `chtag` list request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileTagList {
    /// Lines printed by `chtag -p`.
    pub stdout: Vec<String>,
}

impl FileTagList {
    /// Code set of a text-tagged file.
    ///
    /// The first output line looks like `t IBM-1047    T=on  /u/a.txt`;
    /// untagged and binary files yield `None`.
    #[must_use]
    pub fn tag_charset(&self) -> Option<&str> {
        let line = self.stdout.first()?;
        let rest = line.strip_prefix("t ")?;
        rest.split_whitespace().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_info_from_zosmf() {
        let info: DatasetInfo = serde_json::from_str(
            r#"{"dsname":"IBMUSER.JCL","dsorg":"PO-E","recfm":"FB","lrecl":"80","vol":"VOL001"}"#,
        )
        .unwrap();
        assert!(info.is_library());
        assert!(info.is_fixed_record());
        assert_eq!(info.record_length(), Some(80));
        assert!(!DatasetInfo::named("X").is_library());
    }

    #[test]
    fn test_spool_file_from_zosmf() {
        let files: Vec<SpoolFileInfo> = serde_json::from_str(
            r#"[{"id":2,"ddname":"JESMSGLG","stepname":"JES2","jobid":"JOB1","jobname":"BUILD","byte-count":120}]"#,
        )
        .unwrap();
        assert_eq!(files[0].dd_name, "JESMSGLG");
        assert_eq!(files[0].byte_count, 120);
    }

    #[test]
    fn test_tag_request_body() {
        let set = serde_json::to_value(FileTagRequest::new(
            TagAction::Set,
            Some("IBM-1047".into()),
        ))
        .unwrap();
        assert_eq!(
            set,
            serde_json::json!({"request":"chtag","action":"set","type":"text","codeset":"IBM-1047"})
        );
        let list = serde_json::to_value(FileTagRequest::new(TagAction::List, Some("x".into())))
            .unwrap();
        assert_eq!(list, serde_json::json!({"request":"chtag","action":"list"}));
    }

    #[test]
    fn test_tag_charset() {
        let tagged = FileTagList {
            stdout: vec!["t IBM-1047    T=on  /u/a.txt".into()],
        };
        assert_eq!(tagged.tag_charset(), Some("IBM-1047"));
        let untagged = FileTagList {
            stdout: vec!["- untagged    T=off /u/a.bin".into()],
        };
        assert_eq!(untagged.tag_charset(), None);
        assert_eq!(FileTagList::default().tag_charset(), None);
    }
}
