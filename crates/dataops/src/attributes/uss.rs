//! USS path arithmetic.

/// Last segment of `path`, or `path` itself for the root.
#[must_use]
pub fn name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return path;
    }
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// Directory holding `path`, `None` for the root.
#[must_use]
pub fn parent_dir_path(path: &str) -> Option<&str> {
    let trimmed = path.trim_end_matches('/');
    let index = trimmed.rfind('/')?;
    if index == 0 {
        Some("/")
    } else {
        Some(&trimmed[..index])
    }
}

/// Path of entry `name` listed in directory `root`.
///
/// `.` and an empty name denote the directory itself.
#[must_use]
pub fn child_path(root: &str, name: &str) -> String {
    if name.is_empty() || name == "." {
        root.to_string()
    } else if root == "/" {
        format!("/{name}")
    } else {
        format!("{root}/{name}")
    }
}
