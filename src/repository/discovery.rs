//! repository::discovery
//!
//! Finding repositories inside a workspace folder.
//!
//! The folder's own toplevel is found first. With a positive depth, the
//! folder is then walked looking for `.git` entries, directories or the
//! files of worktrees and submodules; each directory holding one is
//! resolved to its toplevel. Directory names listed as
//! excluded are not descended into (`**/name` and `name` are the same
//! exclusion).

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::core::paths::normalize;
use crate::git::{Git, GitError};

/// Directory names never worth descending into.
pub fn normalize_excludes(excludes: &[String]) -> Vec<String> {
    excludes
        .iter()
        .map(|e| e.strip_prefix("**/").unwrap_or(e).trim_end_matches('/'))
        .filter(|e| !e.is_empty())
        .map(str::to_string)
        .collect()
}

/// Directories below `root` containing a `.git` directory or file, at most
/// `depth` levels down. Unreadable subdirectories are skipped.
pub async fn find_git_dirs(
    root: &Path,
    depth: usize,
    excludes: &[String],
) -> std::io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut pending: Vec<(PathBuf, usize)> = vec![(root.to_path_buf(), depth)];
    let mut first = true;

    while let Some((dir, remaining)) = pending.pop() {
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) if first => return Err(err),
            Err(err) => {
                debug!("skipping {}: {}", dir.display(), err);
                continue;
            }
        };
        first = false;

        let mut children = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            let Ok(file_type) = entry.file_type().await else {
                continue;
            };
            let name = entry.file_name().to_string_lossy().into_owned();
            // linked worktrees and submodules have a `.git` file
            if name == ".git" && (file_type.is_dir() || file_type.is_file()) {
                found.push(dir.clone());
            } else if file_type.is_dir() && remaining > 0 && !excludes.iter().any(|e| *e == name) {
                children.push((entry.path(), remaining - 1));
            }
        }
        // keep directory order stable across platforms
        children.sort();
        pending.extend(children.into_iter().rev());
    }

    Ok(found)
}

/// Roots of every repository found from `folder`: its own toplevel first,
/// then nested repositories up to `depth` directories down.
pub async fn repository_search(
    git: &Git,
    folder: &str,
    depth: usize,
    excludes: &[String],
) -> Result<Vec<String>, GitError> {
    let mut roots = Vec::new();

    let root = git.show_toplevel(folder).await?;
    if let Some(root) = &root {
        debug!("found root repository in '{}'", root);
        roots.push(root.clone());
    }

    if depth == 0 {
        return Ok(roots);
    }

    let excludes = normalize_excludes(excludes);
    let dirs = match find_git_dirs(Path::new(folder), depth, &excludes).await {
        Ok(dirs) => dirs,
        Err(err) => {
            warn!("repository search in '{}' failed: {}", folder, err);
            return Ok(roots);
        }
    };

    for dir in dirs {
        let dir = normalize(&dir);
        if root.as_deref() == Some(dir.as_str()) {
            continue;
        }

        debug!("searching in '{}'...", dir);
        if let Some(found) = git.show_toplevel(&dir).await? {
            if !roots.contains(&found) {
                debug!("found repository in '{}'", found);
                roots.push(found);
            }
        }
    }

    Ok(roots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::version::GitVersion;
    use crate::git::mock::MockRunner;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn layout() -> TempDir {
        let dir = TempDir::new().unwrap();
        for path in ["app/.git", "libs/core/.git", "node_modules/pkg/.git", "deep/a/b/.git"] {
            std::fs::create_dir_all(dir.path().join(path)).unwrap();
        }
        std::fs::write(dir.path().join("README"), "x").unwrap();
        dir
    }

    fn names(root: &Path, dirs: &[PathBuf]) -> Vec<String> {
        let mut names: Vec<String> = dirs
            .iter()
            .map(|d| normalize(d.strip_prefix(root).unwrap()))
            .collect();
        names.sort();
        names
    }

    #[test]
    fn excludes_strip_glob_prefix() {
        let excludes = normalize_excludes(&["**/node_modules".into(), "target/".into(), "".into()]);
        assert_eq!(excludes, ["node_modules", "target"]);
    }

    #[tokio::test]
    async fn walks_to_depth_and_honours_excludes() {
        let dir = layout();
        let root = dir.path();

        assert!(find_git_dirs(root, 0, &[]).await.unwrap().is_empty());

        let one = find_git_dirs(root, 1, &[]).await.unwrap();
        assert_eq!(names(root, &one), ["app"]);

        let two = find_git_dirs(root, 2, &["node_modules".into()]).await.unwrap();
        assert_eq!(names(root, &two), ["app", "libs/core"]);

        let two_all = find_git_dirs(root, 2, &[]).await.unwrap();
        assert_eq!(names(root, &two_all), ["app", "libs/core", "node_modules/pkg"]);

        let three = find_git_dirs(root, 3, &["node_modules".into()]).await.unwrap();
        assert_eq!(names(root, &three), ["app", "deep/a/b", "libs/core"]);
    }

    #[tokio::test]
    async fn git_files_mark_worktrees_and_submodules() {
        let dir = layout();
        let root = dir.path();
        std::fs::create_dir_all(root.join("wt")).unwrap();
        std::fs::write(root.join("wt/.git"), "gitdir: /elsewhere/.git/worktrees/wt\n").unwrap();
        std::fs::create_dir_all(root.join("app/vendor/sub")).unwrap();
        std::fs::write(root.join("app/vendor/sub/.git"), "gitdir: ../../.git/modules/sub\n").unwrap();

        let one = find_git_dirs(root, 1, &[]).await.unwrap();
        assert_eq!(names(root, &one), ["app", "wt"]);

        let three = find_git_dirs(root, 3, &["node_modules".into(), "deep".into()]).await.unwrap();
        assert_eq!(names(root, &three), ["app", "app/vendor/sub", "libs/core", "wt"]);
    }

    #[tokio::test]
    async fn missing_root_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(find_git_dirs(&dir.path().join("nope"), 2, &[]).await.is_err());
    }

    #[tokio::test]
    async fn search_resolves_each_candidate() {
        let dir = layout();
        let root = normalize(dir.path());
        let mock = MockRunner::new();
        mock.respond(&["--show-toplevel"], "");
        let git = Git::new(Arc::new(mock.clone()), "git", GitVersion::new(2, 40, 0));

        let roots = repository_search(&git, &root, 0, &[]).await.unwrap();
        assert!(roots.is_empty());
        assert_eq!(mock.count(&["--show-toplevel"]), 1);

        mock.clear_invocations();
        repository_search(&git, &root, 3, &["**/node_modules".into()])
            .await
            .unwrap();
        // the folder itself, then app, deep/a/b and libs/core
        assert_eq!(mock.count(&["--show-toplevel"]), 4);
    }
}
