//! Lexical path cleaning for untrusted (archive-supplied) paths.
//!
//! Nothing here touches the filesystem: paths are normalized purely by their
//! components so the result can be checked before anything is created.

use std::path::{Component, Path, PathBuf};

/// Lexically clean a path, resolving `.` and `..` components.
///
/// Unlike a naive normalization, a `..` that cannot be cancelled by a
/// preceding normal component is kept, so `../../etc/passwd` stays
/// `../../etc/passwd` and callers can reject it. Root and prefix components
/// are preserved, and `..` directly under the root is dropped (you cannot go
/// above `/`).
///
/// # Examples
///
/// ```rust
/// use assistd::utils::fs::clean_path;
/// use std::path::{Path, PathBuf};
///
/// assert_eq!(clean_path(Path::new("a/./b/../c")), PathBuf::from("a/c"));
/// assert_eq!(clean_path(Path::new("a/../../x")), PathBuf::from("../x"));
/// assert_eq!(clean_path(Path::new("/../etc")), PathBuf::from("/etc"));
/// ```
#[must_use]
pub fn clean_path(path: &Path) -> PathBuf {
    let mut components: Vec<Component<'_>> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match components.last() {
                Some(Component::Normal(_)) => {
                    components.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                Some(Component::ParentDir | Component::CurDir) | None => {
                    components.push(component);
                }
            },
            c => components.push(c),
        }
    }

    components.iter().collect()
}

/// Returns `true` if a cleaned relative path would climb out of its base,
/// or if the path is absolute (including Windows drive/UNC prefixes).
#[must_use]
pub fn escapes_base(cleaned: &Path) -> bool {
    if cleaned.is_absolute() || cleaned.has_root() {
        return true;
    }
    matches!(
        cleaned.components().next(),
        Some(Component::ParentDir | Component::Prefix(_) | Component::RootDir)
    )
}
