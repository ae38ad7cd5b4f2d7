//! core::paths
//!
//! Path normalization shared by the registry, the builders and the service.
//!
//! Git prints paths with forward slashes and without trailing separators.
//! Every path that becomes a cache key or a registry key goes through
//! [`normalize_path`] first so that `C:\repo\`, `C:/repo` and `c:/repo` all
//! address the same entry.
//!
//! # Example
//!
//! ```
//! use gitscope::core::paths::{normalize_path, split_path};
//!
//! assert_eq!(normalize_path("/work/repo/"), "/work/repo");
//! assert_eq!(
//!     split_path("/work/repo/src/lib.rs", Some("/work/repo")),
//!     ("src/lib.rs".to_string(), "/work/repo".to_string())
//! );
//! ```

use std::path::{Path, PathBuf};

/// Namespace prefix for paths that belong to a shared (guest) session.
pub const GUEST_PREFIX: &str = "/~0";

/// Normalize separators, drop trailing slashes and lowercase a drive letter.
pub fn normalize_path(path: impl AsRef<str>) -> String {
    let mut normalized = path.as_ref().replace('\\', "/");

    while normalized.len() > 1 && normalized.ends_with('/') {
        normalized.pop();
    }

    let bytes = normalized.as_bytes();
    if bytes.len() >= 2 && bytes[1] == b':' && bytes[0].is_ascii_uppercase() {
        let drive = normalized[0..1].to_ascii_lowercase();
        normalized.replace_range(0..1, &drive);
    }

    normalized
}

/// Normalize a filesystem path into the string form used for keys.
pub fn normalize(path: &Path) -> String {
    normalize_path(path.to_string_lossy())
}

/// Join a repo-relative path onto a root.
pub fn join(root: &str, relative: &str) -> String {
    if relative.is_empty() {
        return normalize_path(root);
    }
    if Path::new(relative).is_absolute() {
        return normalize_path(relative);
    }
    normalize_path(format!("{}/{}", normalize_path(root), relative.trim_start_matches('/')))
}

/// Split `file_name` into `(relative path, root)`.
///
/// With a known `repo_path` the root is that path and the relative part is
/// whatever follows it. Without one, the root is the file's parent directory.
pub fn split_path(file_name: &str, repo_path: Option<&str>) -> (String, String) {
    let file_name = normalize_path(file_name);

    match repo_path {
        Some(root) => {
            let root = normalize_path(root);
            let relative = file_name
                .strip_prefix(&root)
                .map(|rest| rest.trim_start_matches('/').to_string())
                .unwrap_or_else(|| file_name.clone());
            (relative, root)
        }
        None => match file_name.rfind('/') {
            Some(idx) if idx > 0 => (file_name[idx + 1..].to_string(), file_name[..idx].to_string()),
            Some(_) => (file_name[1..].to_string(), "/".to_string()),
            None => (file_name, String::new()),
        },
    }
}

/// A folder pathspec (`dir/*`) asks for a history of everything beneath it.
pub fn is_folder_glob(path: &str) -> bool {
    Path::new(path)
        .file_name()
        .map(|name| name == "*")
        .unwrap_or(false)
}

/// Map a guest-session path onto the primary namespace.
pub fn guest_path(path: &str) -> Option<String> {
    path.strip_prefix(GUEST_PREFIX)
        .map(|rest| if rest.is_empty() { "/".to_string() } else { rest.to_string() })
}

/// Map a primary path into the guest namespace.
pub fn to_guest_path(path: &str) -> String {
    format!("{}{}", GUEST_PREFIX, normalize_path(path))
}

/// Nearest existing ancestor of `path`, including `path` itself.
pub fn nearest_existing(path: &Path) -> Option<PathBuf> {
    path.ancestors().find(|p| p.exists()).map(Path::to_path_buf)
}

/// Keep the caller's spelling of a symlinked directory in a resolved toplevel.
///
/// `git rev-parse --show-toplevel` reports physical paths. When the caller
/// reached the repository through a symlink, `real_dir` (the canonical form
/// of `original_dir`) appears in `toplevel`; swapping that prefix back
/// keeps registry keys aligned with the paths callers use.
pub fn preserve_symlink(toplevel: &str, original_dir: &str, real_dir: &str) -> String {
    let toplevel = normalize_path(toplevel);
    let original = normalize_path(original_dir);
    let real = normalize_path(real_dir);

    if original == real {
        return toplevel;
    }

    if let Some(rest) = toplevel.strip_prefix(&real) {
        if rest.is_empty() || rest.starts_with('/') {
            return format!("{}{}", original, rest);
        }
    }

    if let Some(rest) = real.strip_prefix(&toplevel) {
        // original_dir lives below the toplevel; drop the same suffix from it
        if let Some(root) = original.strip_suffix(rest) {
            if !root.is_empty() {
                return root.to_string();
            }
        }
    }

    toplevel
}
