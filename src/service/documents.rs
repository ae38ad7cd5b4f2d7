//! service::documents
//!
//! Blame, diff and status of single files, cached per tracked document.

use std::sync::Arc;

use tracing::{debug, warn};

use super::GitService;
use crate::cache::{keys, Cached};
use crate::core::types::{rev, ContentHash};
use crate::git::builders::{self, BlameArgs, DiffArgs};
use crate::git::{Encoding, GitError};
use crate::models::{
    BlameAuthor, CommitFile, DiffHunkLine, GitBlame, GitBlameLine, GitDiff, RepoStatus, StatusFile,
    TreeEntry,
};
use crate::parsers::{parse_blame, parse_diff, parse_name_status, parse_status, parse_tree};

impl GitService {
    // ========================================================================
    // Blame
    // ========================================================================

    /// Blame of a file at `reference`, or of the working tree.
    pub async fn blame_for_file(&self, path: &str, reference: Option<&str>) -> Cached<GitBlame> {
        let (repo, file) = self.locate(path).await?;
        let doc = self.documents.get_or_add(path, Some(&repo));
        let key = keys::blame(reference);

        let this = self.clone();
        let weak = Arc::downgrade(&doc);
        let reference = reference.map(str::to_string);
        self.cached(&doc.blame, &key, move || async move {
            let result = this.blame_core(&repo, &file, reference.as_deref(), None).await;
            if let (Err(err), Some(doc)) = (&result, weak.upgrade()) {
                doc.set_blame_failure(&err.to_string());
            }
            result
        })
        .await
    }

    /// Blame of unsaved `contents` of a file.
    pub async fn blame_for_contents(&self, path: &str, contents: &str) -> Cached<GitBlame> {
        let (repo, file) = self.locate(path).await?;
        let doc = self.documents.get_or_add(path, Some(&repo));
        let key = keys::blame_contents(&ContentHash::of(contents));

        let this = self.clone();
        let weak = Arc::downgrade(&doc);
        let contents = contents.to_string();
        let correlation = key.clone();
        self.cached(&doc.blame, &key, move || async move {
            let result = this
                .blame_contents_core(&repo, &file, &contents, &correlation, None)
                .await;
            if let (Err(err), Some(doc)) = (&result, weak.upgrade()) {
                doc.set_blame_failure(&err.to_string());
            }
            result
        })
        .await
    }

    /// Blame of 1-based `line`.
    ///
    /// With caching on, the line is read from the whole-file blame so that
    /// moving through a file costs one process. Otherwise only that line is
    /// blamed.
    pub async fn blame_for_line(
        &self,
        path: &str,
        reference: Option<&str>,
        line: u32,
        contents: Option<&str>,
    ) -> Option<GitBlameLine> {
        if self.settings().caching_enabled {
            let blame = match contents {
                Some(contents) => self.blame_for_contents(path, contents).await,
                None => self.blame_for_file(path, reference).await,
            }?;
            return blame_line(&blame, line);
        }

        let (repo, file) = self.locate(path).await?;
        let lines = Some((line, line));
        let result = match contents {
            Some(contents) => {
                let key = keys::blame_contents(&ContentHash::of(contents));
                self.blame_contents_core(&repo, &file, contents, &key, lines)
                    .await
            }
            None => self.blame_core(&repo, &file, reference, lines).await,
        };
        match result {
            Ok(blame) => blame_line(&blame?, line),
            Err(err) => {
                warn!("blame of {}:{} failed: {}", path, line, err);
                None
            }
        }
    }

    /// Blame restricted to 1-based inclusive `start..=end`.
    pub async fn blame_for_range(
        &self,
        path: &str,
        reference: Option<&str>,
        start: u32,
        end: u32,
    ) -> Option<GitBlame> {
        let blame = self.blame_for_file(path, reference).await?;
        let range = blame.range(start, end);
        (!range.lines.is_empty()).then_some(range)
    }

    async fn blame_core(
        &self,
        repo: &str,
        file: &str,
        reference: Option<&str>,
        lines: Option<(u32, u32)>,
    ) -> Result<Option<GitBlame>, GitError> {
        if !self.is_tracked_in(repo, file, reference).await {
            debug!("skipping blame; '{}' is not tracked", file);
            return Ok(None);
        }

        let settings = self.settings();
        let data = self
            .git
            .blame(BlameArgs {
                repo_path: Some(repo),
                file,
                reference,
                ignore_whitespace: settings.blame_ignore_whitespace,
                lines,
                custom_args: &settings.blame_custom_arguments,
                ..Default::default()
            })
            .await?;

        let user = self.current_user(repo).await;
        Ok(parse_blame(
            &data,
            repo,
            user.as_ref().and_then(|u| u.name.as_deref()),
        ))
    }

    async fn blame_contents_core(
        &self,
        repo: &str,
        file: &str,
        contents: &str,
        correlation_key: &str,
        lines: Option<(u32, u32)>,
    ) -> Result<Option<GitBlame>, GitError> {
        if !self.is_tracked_in(repo, file, None).await {
            debug!("skipping blame; '{}' is not tracked", file);
            return Ok(None);
        }

        let settings = self.settings();
        let data = self
            .git
            .blame_contents(
                BlameArgs {
                    repo_path: Some(repo),
                    file,
                    ignore_whitespace: settings.blame_ignore_whitespace,
                    lines,
                    custom_args: &settings.blame_custom_arguments,
                    ..Default::default()
                },
                contents,
                correlation_key,
            )
            .await?;

        let user = self.current_user(repo).await;
        Ok(parse_blame(
            &data,
            repo,
            user.as_ref().and_then(|u| u.name.as_deref()),
        ))
    }

    // ========================================================================
    // Diff
    // ========================================================================

    /// Modified hunks of a file between two revisions, without context.
    ///
    /// `ref1` defaults to the index and `ref2` to the working tree.
    pub async fn diff_for_file(
        &self,
        path: &str,
        ref1: Option<&str>,
        ref2: Option<&str>,
    ) -> Cached<GitDiff> {
        let (repo, file) = self.locate(path).await?;
        let doc = self.documents.get_or_add(path, Some(&repo));
        let key = keys::diff(ref1, ref2);

        let git = self.git.clone();
        let similarity = self.settings().similarity_threshold;
        let ref1 = ref1.map(str::to_string);
        let ref2 = ref2.map(str::to_string);
        self.cached(&doc.diff, &key, move || async move {
            let data = git
                .diff(DiffArgs {
                    repo_path: &repo,
                    file: &file,
                    ref1: ref1.as_deref(),
                    ref2: ref2.as_deref(),
                    context_lines: Some(0),
                    renames: true,
                    similarity,
                    filters: "M",
                    encoding: Encoding::Utf8,
                })
                .await?;
            Ok(parse_diff(
                &data,
                ref1.as_deref().unwrap_or(rev::UNCOMMITTED_STAGED),
                ref2.as_deref(),
            ))
        })
        .await
    }

    /// Diff of the committed file at `reference` against unsaved `contents`.
    pub async fn diff_for_contents(
        &self,
        path: &str,
        reference: &str,
        contents: &str,
    ) -> Cached<GitDiff> {
        let (repo, file) = self.locate(path).await?;
        let doc = self.documents.get_or_add(path, Some(&repo));
        let key = keys::diff_contents(reference, &ContentHash::of(contents));

        let git = self.git.clone();
        let similarity = self.settings().similarity_threshold;
        let reference = reference.to_string();
        let contents = contents.to_string();
        self.cached(&doc.diff, &key, move || async move {
            let data = git.diff_contents(&repo, &file, &contents, similarity).await?;
            Ok(parse_diff(&data, &reference, None))
        })
        .await
    }

    /// The hunk covering 1-based `line` and what the line replaced.
    pub async fn diff_for_line(
        &self,
        path: &str,
        line: u32,
        ref1: Option<&str>,
        ref2: Option<&str>,
    ) -> Option<DiffHunkLine> {
        let diff = self.diff_for_file(path, ref1, ref2).await?;
        let hunk = diff.hunk_for_line(line)?;
        Some(hunk.line_change(line))
    }

    /// Files changed between two revisions, or in the working tree.
    pub async fn changed_files(
        &self,
        repo_path: &str,
        ref1: Option<&str>,
        ref2: Option<&str>,
        filters: &str,
    ) -> Vec<CommitFile> {
        let similarity = self.settings().similarity_threshold;
        match self
            .git
            .exec(builders::diff_name_status(
                repo_path, ref1, ref2, similarity, filters,
            ))
            .await
        {
            Ok(data) => parse_name_status(&data),
            Err(err) => {
                warn!("changed files in {} failed: {}", repo_path, err);
                Vec::new()
            }
        }
    }

    // ========================================================================
    // Contents and trees
    // ========================================================================

    /// Bytes of a file at `reference`; the index for the staged revision.
    ///
    /// `None` when the file does not exist there.
    pub async fn file_contents(&self, path: &str, reference: &str) -> Option<Vec<u8>> {
        let (repo, file) = self.locate(path).await?;
        match self.git.show(Some(&repo), &file, reference, Encoding::Buffer).await {
            Ok(output) => output.map(|o| o.into_bytes()),
            Err(err) => {
                warn!("show {}:{} failed: {}", reference, path, err);
                None
            }
        }
    }

    /// The tree entry of `path` at `reference`.
    pub async fn tree_entry(&self, path: &str, reference: &str) -> Option<TreeEntry> {
        let (repo, file) = self.locate(path).await?;
        let reference = if rev::is_uncommitted(reference) { "HEAD" } else { reference };
        let data = self
            .git
            .exec(builders::ls_tree(&repo, reference, Some(&file)))
            .await
            .ok()?;
        parse_tree(&data).into_iter().next()
    }

    /// Every file in the tree at `reference`.
    pub async fn tree(&self, repo_path: &str, reference: &str) -> Vec<TreeEntry> {
        match self
            .git
            .exec(builders::ls_tree(repo_path, reference, None))
            .await
        {
            Ok(data) => parse_tree(&data),
            Err(err) => {
                warn!("tree of {} at {} failed: {}", repo_path, reference, err);
                Vec::new()
            }
        }
    }

    // ========================================================================
    // Status
    // ========================================================================

    pub async fn status_for_file(&self, path: &str) -> Option<StatusFile> {
        let (repo, _) = self.locate(path).await?;
        let similarity = self.settings().similarity_threshold;
        let data = self
            .git
            .exec(builders::status_file(
                Some(&repo),
                path,
                self.git.version(),
                similarity,
            ))
            .await
            .map_err(|err| warn!("status of {} failed: {}", path, err))
            .ok()?;
        parse_status(&data, &repo)?.files.into_iter().next()
    }

    pub async fn status(&self, repo_path: &str) -> Option<RepoStatus> {
        let similarity = self.settings().similarity_threshold;
        let data = self
            .git
            .exec(builders::status(repo_path, self.git.version(), similarity))
            .await
            .map_err(|err| warn!("status of {} failed: {}", repo_path, err))
            .ok()?;
        parse_status(&data, repo_path)
    }
}

/// The blame of `line`, tolerating the line just past the end (an editor's
/// trailing empty line).
fn blame_line(blame: &GitBlame, line: u32) -> Option<GitBlameLine> {
    let found = blame.line(line).or_else(|| {
        (line as usize == blame.lines.len() + 1)
            .then(|| blame.lines.last())
            .flatten()
    })?;
    let commit = blame.commit(&found.sha)?.clone();
    let author = blame
        .authors
        .iter()
        .find(|a| a.name == commit.author)
        .cloned()
        .unwrap_or_else(|| BlameAuthor {
            name: commit.author.clone(),
            line_count: commit.lines.len() as u32,
        });

    Some(GitBlameLine {
        author,
        commit,
        line: found.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::cache::{RepositoryChange, RepositoryChangeEvent};
    use crate::git::mock::MockRunner;
    use crate::service::ServiceSettings;
    use std::time::Duration;

    const FILE: &str = "/work/repo/src/lib.rs";
    const SHA: &str = "1111111111111111111111111111111111111111";

    fn blame_output() -> String {
        format!(
            "{sha} 1 1 2\n\
             author Ada\n\
             author-mail <ada@example.com>\n\
             author-time 1700000000\n\
             author-tz +0000\n\
             committer Ada\n\
             committer-mail <ada@example.com>\n\
             committer-time 1700000000\n\
             committer-tz +0000\n\
             summary First\n\
             filename src/lib.rs\n",
            sha = SHA
        )
    }

    fn tracked(mock: &MockRunner) {
        mock.respond(&["ls-files"], "src/lib.rs\n");
    }

    mod blame {
        use super::*;

        #[tokio::test]
        async fn concurrent_requests_share_one_process() {
            let mock = MockRunner::new();
            tracked(&mock);
            mock.respond(&["blame"], &blame_output());
            mock.set_delay(Duration::from_millis(20));
            let service = service(&mock);

            let (a, b) = tokio::join!(
                service.blame_for_file(FILE, None),
                service.blame_for_file(FILE, None)
            );
            let (a, b) = (a.unwrap(), b.unwrap());
            assert!(Arc::ptr_eq(&a, &b));
            assert_eq!(a.lines.len(), 2);
            assert_eq!(mock.count(&["blame"]), 1);
        }

        #[tokio::test]
        async fn failure_leaves_sentinel_until_reset() {
            let mock = MockRunner::new();
            tracked(&mock);
            mock.fail(&["blame"], "fatal: something unexpected\n");
            let service = service(&mock);

            assert!(service.blame_for_file(FILE, None).await.is_none());
            assert!(service.blame_for_file(FILE, None).await.is_none());
            assert_eq!(mock.count(&["blame"]), 1);

            let doc = service.documents().get(FILE).unwrap();
            assert!(doc.blame_failure().is_some());

            service.on_repository_changed(&RepositoryChangeEvent::new(
                REPO,
                [RepositoryChange::Heads],
            ));
            assert!(service.blame_for_file(FILE, None).await.is_none());
            assert_eq!(mock.count(&["blame"]), 2);
        }

        #[tokio::test]
        async fn untracked_file_is_not_blamed() {
            let mock = MockRunner::new();
            let service = service(&mock);
            assert!(service.blame_for_file(FILE, None).await.is_none());
            assert_eq!(mock.count(&["blame"]), 0);
        }

        #[tokio::test]
        async fn revisions_and_contents_use_separate_entries() {
            let mock = MockRunner::new();
            tracked(&mock);
            mock.respond(&["blame"], &blame_output());
            let service = service(&mock);

            service.blame_for_file(FILE, None).await;
            service.blame_for_file(FILE, Some(SHA)).await;
            service.blame_for_contents(FILE, "a\nb\n").await;
            service.blame_for_contents(FILE, "a\nb\n").await;
            assert_eq!(mock.count(&["blame"]), 3);
            assert_eq!(service.documents().get(FILE).unwrap().blame.len(), 3);
        }

        #[tokio::test]
        async fn line_comes_from_cached_file_blame() {
            let mock = MockRunner::new();
            tracked(&mock);
            mock.respond(&["blame"], &blame_output());
            let service = service(&mock);

            let first = service.blame_for_line(FILE, None, 1, None).await.unwrap();
            let past_end = service.blame_for_line(FILE, None, 3, None).await.unwrap();
            assert_eq!(first.commit.sha, SHA);
            assert_eq!(first.author.name, "Ada");
            assert_eq!(past_end.line.line, 2);
            assert!(service.blame_for_line(FILE, None, 9, None).await.is_none());
            assert_eq!(mock.count(&["blame"]), 1);
        }

        #[tokio::test]
        async fn line_without_caching_blames_one_line() {
            let mock = MockRunner::new();
            tracked(&mock);
            mock.respond(&["blame", "1,1"], &blame_output());
            let service = service_with(
                &mock,
                ServiceSettings {
                    caching_enabled: false,
                    ..Default::default()
                },
            );

            assert!(service.blame_for_line(FILE, None, 1, None).await.is_some());
            assert!(service.blame_for_line(FILE, None, 1, None).await.is_some());
            assert_eq!(mock.count(&["blame", "1,1"]), 2);
        }

        #[tokio::test]
        async fn range_keeps_only_covered_lines() {
            let mock = MockRunner::new();
            tracked(&mock);
            mock.respond(&["blame"], &blame_output());
            let service = service(&mock);

            let range = service.blame_for_range(FILE, None, 2, 5).await.unwrap();
            assert_eq!(range.lines.len(), 1);
            assert!(service.blame_for_range(FILE, None, 7, 9).await.is_none());
        }
    }

    mod diff {
        use super::*;

        const DIFF: &str = "\
diff --git a/src/lib.rs b/src/lib.rs
index 1111111..2222222 100644
--- a/src/lib.rs
+++ b/src/lib.rs
@@ -3 +3,2 @@ fn main() {
-old
+new
+newer
";

        #[tokio::test]
        async fn file_diff_is_cached_per_revision_pair() {
            let mock = MockRunner::new();
            mock.respond(&["diff"], DIFF);
            let service = service(&mock);

            let diff = service.diff_for_file(FILE, Some("HEAD"), None).await.unwrap();
            assert_eq!(diff.hunks.len(), 1);
            service.diff_for_file(FILE, Some("HEAD"), None).await;
            service.diff_for_file(FILE, None, None).await;
            assert_eq!(mock.count(&["diff"]), 2);
        }

        #[tokio::test]
        async fn line_reports_replaced_text() {
            let mock = MockRunner::new();
            mock.respond(&["diff"], DIFF);
            let service = service(&mock);

            let change = service.diff_for_line(FILE, 3, None, None).await.unwrap();
            assert_eq!(change.current.as_deref(), Some("new"));
            assert_eq!(change.previous.as_deref(), Some("old"));
            assert!(service.diff_for_line(FILE, 10, None, None).await.is_none());
        }

        #[tokio::test]
        async fn contents_diff_reads_failed_stdout() {
            let mock = MockRunner::new();
            mock.fail_with(&["--no-index"], 1, "", DIFF);
            let service = service(&mock);

            let diff = service
                .diff_for_contents(FILE, "HEAD", "new\nnewer\n")
                .await
                .unwrap();
            assert_eq!(diff.base_sha, "HEAD");
            assert_eq!(diff.hunks[0].current.count, 2);
        }

        #[tokio::test]
        async fn changed_files_parse_name_status() {
            let mock = MockRunner::new();
            mock.respond(&["--name-status"], "M\tsrc/lib.rs\nA\tREADME.md\n");
            let service = service(&mock);

            let files = service.changed_files(REPO, Some("HEAD~1"), None, "").await;
            assert_eq!(files.len(), 2);
            assert_eq!(files[0].path, "src/lib.rs");
        }
    }

    mod contents {
        use super::*;

        #[tokio::test]
        async fn file_at_revision() {
            let mock = MockRunner::new();
            mock.respond(&["HEAD~1:./src/lib.rs"], "fn old() {}\n");
            let service = service(&mock);

            let bytes = service.file_contents(FILE, "HEAD~1").await.unwrap();
            assert_eq!(bytes, b"fn old() {}\n");
        }

        #[tokio::test]
        async fn missing_file_has_no_contents() {
            let mock = MockRunner::new();
            mock.fail(&["show"], "fatal: path 'src/lib.rs' does not exist in 'HEAD'");
            let service = service(&mock);

            assert!(service.file_contents(FILE, "HEAD").await.is_none());
        }

        #[tokio::test]
        async fn tree_entry_of_working_file_reads_head() {
            let mock = MockRunner::new();
            mock.respond(
                &["ls-tree", "HEAD"],
                "100644 blob 2222222222222222222222222222222222222222     120\tsrc/lib.rs\n",
            );
            let service = service(&mock);

            let entry = service.tree_entry(FILE, rev::UNCOMMITTED).await.unwrap();
            assert_eq!(entry.path, "src/lib.rs");
            assert_eq!(entry.size, Some(120));
        }

        #[tokio::test]
        async fn whole_tree() {
            let mock = MockRunner::new();
            mock.respond(
                &["-lrt"],
                "040000 tree 3333333333333333333333333333333333333333       -\tsrc\n\
                 100644 blob 2222222222222222222222222222222222222222     120\tsrc/lib.rs\n",
            );
            let service = service(&mock);

            let tree = service.tree(REPO, "main").await;
            assert_eq!(tree.len(), 2);
            assert_eq!(tree[0].size, None);
        }
    }
}
