//! Service integration tests
//!
//! These run the real `git` executable against throwaway repositories.

mod support;

use gitscope::cache::{RepositoryChange, RepositoryChangeEvent};
use gitscope::service::{FileLogOptions, GitService, LogOptions, SearchPattern, ServiceSettings};
use support::TestRepo;

async fn start() -> GitService {
    GitService::init(ServiceSettings::default())
        .await
        .expect("git is installed")
}

mod repositories {
    use super::*;

    #[tokio::test]
    async fn resolves_root_from_subdirectory() {
        let repo = TestRepo::new();
        repo.commit_file("src/lib/mod.rs", "pub fn a() {}\n", "Add module");
        let service = start().await;

        let root = service
            .get_repo_path(&repo.file("src/lib"), true)
            .await
            .unwrap();
        assert_eq!(root.as_deref(), Some(repo.root()));

        // second lookup is answered by the registry
        let again = service
            .get_repo_path(&repo.file("src/lib/mod.rs"), false)
            .await
            .unwrap();
        assert_eq!(again.as_deref(), Some(repo.root()));
        assert!(service.find_repository(&repo.file("src")).is_some());
    }

    #[tokio::test]
    async fn outside_a_repository_is_none() {
        let dir = tempfile::TempDir::new().unwrap();
        let service = start().await;

        let root = service
            .get_repo_path(&dir.path().to_string_lossy(), true)
            .await
            .unwrap();
        assert!(root.is_none());
    }

    #[tokio::test]
    async fn discover_finds_nested_repositories() {
        let workspace = tempfile::TempDir::new().unwrap();
        for name in ["one", "two"] {
            let dir = workspace.path().join(name);
            std::fs::create_dir_all(&dir).unwrap();
            support::run_git(&dir, &["init", "-q"]);
        }
        let service = start().await;

        let found = service
            .discover(&workspace.path().canonicalize().unwrap().to_string_lossy())
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
    }

    #[tokio::test]
    async fn shutdown_forgets_repositories() {
        let repo = TestRepo::new();
        let service = start().await;
        service.get_repo_path(repo.root(), true).await.unwrap();
        assert!(service.is_running());

        service.shutdown();
        assert!(!service.is_running());
        assert!(service.find_repository(repo.root()).is_none());
    }
}

mod documents {
    use super::*;

    #[tokio::test]
    async fn blame_attributes_lines_to_commits() {
        let repo = TestRepo::new();
        let first = repo.commit_file("notes.txt", "alpha\nbeta\n", "Add notes");
        let second = repo.commit_as(
            "Ann Other <ann@example.com>",
            "notes.txt",
            "alpha\nbeta\ngamma\n",
            "Extend notes",
        );
        let service = start().await;

        let blame = service
            .blame_for_file(&repo.file("notes.txt"), None)
            .await
            .expect("blame");
        assert_eq!(blame.lines.len(), 3);
        assert_eq!(blame.lines[0].sha, first);
        assert_eq!(blame.lines[2].sha, second);
        assert_eq!(blame.commit(&second).unwrap().author, "Ann Other");
        assert_eq!(blame.authors.len(), 2);
    }

    #[tokio::test]
    async fn blame_is_cached_until_heads_change() {
        let repo = TestRepo::new();
        repo.commit_file("a.txt", "one\n", "Add a");
        let service = start().await;
        let path = repo.file("a.txt");

        let before = service.blame_for_file(&path, None).await.unwrap();
        let cached = service.blame_for_file(&path, None).await.unwrap();
        assert!(std::sync::Arc::ptr_eq(&before, &cached));

        let sha = repo.commit_file("a.txt", "one\ntwo\n", "Extend a");
        service.on_repository_changed(&RepositoryChangeEvent::new(
            repo.root(),
            [RepositoryChange::Heads],
        ));
        let after = service.blame_for_file(&path, None).await.unwrap();
        assert_eq!(after.lines.len(), 2);
        assert_eq!(after.lines[1].sha, sha);
    }

    #[tokio::test]
    async fn blame_range_and_line() {
        let repo = TestRepo::new();
        let sha = repo.commit_file("r.txt", "1\n2\n3\n4\n", "Add r");
        let service = start().await;
        let path = repo.file("r.txt");

        let range = service
            .blame_for_range(&path, None, 2, 3)
            .await
            .expect("range");
        assert_eq!(range.lines.len(), 2);
        assert!(range.lines.iter().all(|l| l.sha == sha));

        let line = service
            .blame_for_line(&path, None, 4, None)
            .await
            .expect("line");
        assert_eq!(line.commit.sha, sha);
        assert_eq!(line.commit.summary, "Add r");
    }

    #[tokio::test]
    async fn blame_for_contents_marks_new_lines_uncommitted() {
        let repo = TestRepo::new();
        repo.commit_file("c.txt", "kept\n", "Add c");
        let service = start().await;

        let blame = service
            .blame_for_contents(&repo.file("c.txt"), "kept\nadded\n")
            .await
            .expect("blame");
        assert_eq!(blame.lines.len(), 2);
        let added = blame.commit(&blame.lines[1].sha).unwrap();
        assert!(added.is_uncommitted());
        assert!(!blame.commit(&blame.lines[0].sha).unwrap().is_uncommitted());
    }

    #[tokio::test]
    async fn diff_of_working_change() {
        let repo = TestRepo::new();
        repo.commit_file("d.txt", "a\nb\nc\n", "Add d");
        repo.write("d.txt", "a\nB\nc\n");
        let service = start().await;

        let diff = service
            .diff_for_file(&repo.file("d.txt"), None, None)
            .await
            .expect("diff");
        assert_eq!(diff.hunks.len(), 1);

        let change = service
            .diff_for_line(&repo.file("d.txt"), 2, None, None)
            .await
            .expect("line change");
        assert_eq!(change.current.as_deref(), Some("B"));
        assert_eq!(change.previous.as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn status_reports_changes() {
        let repo = TestRepo::new();
        repo.commit_file("s.txt", "s\n", "Add s");
        repo.write("s.txt", "changed\n");
        repo.write("new.txt", "new\n");
        let service = start().await;

        let status = service.status(repo.root()).await.expect("status");
        assert_eq!(status.branch.as_deref(), Some("main"));
        assert!(status.file("s.txt").is_some());
        assert!(status.file("new.txt").is_some());

        let file = service
            .status_for_file(&repo.file("s.txt"))
            .await
            .expect("file status");
        assert!(!file.staged());
    }

    #[tokio::test]
    async fn changed_files_between_commits() {
        let repo = TestRepo::new();
        let base = repo.head();
        repo.commit_file("x.txt", "x\n", "Add x");
        let head = repo.commit_file("README.md", "# Changed\n", "Edit readme");
        let service = start().await;

        let files = service
            .changed_files(repo.root(), Some(&base), Some(&head), "")
            .await;
        let mut paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
        paths.sort();
        assert_eq!(paths, ["README.md", "x.txt"]);
    }
}

mod history {
    use super::*;

    fn repo_with_commits(count: usize) -> TestRepo {
        let repo = TestRepo::new();
        for i in 0..count {
            repo.commit_file("log.txt", &format!("{}\n", i), &format!("Change {}", i));
        }
        repo
    }

    #[tokio::test]
    async fn repository_log_pages_with_more() {
        let repo = repo_with_commits(4);
        let service = start().await;

        let page = service
            .log(
                repo.root(),
                LogOptions {
                    limit: Some(2),
                    ..Default::default()
                },
            )
            .await
            .expect("log");
        assert_eq!(page.commits.len(), 2);
        assert!(page.has_more);
        assert_eq!(page.commits[0].summary, "Change 3");

        let more = service.more(&page, Some(2)).await;
        assert_eq!(more.commits.len(), 4);
        assert_eq!(more.commits[3].summary, "Change 0");

        // five commits in total
        let rest = service.more(&more, Some(10)).await;
        assert_eq!(rest.commits.len(), 5);
        assert!(!rest.has_more);
    }

    #[tokio::test]
    async fn file_log_follows_only_that_file() {
        let repo = TestRepo::new();
        repo.commit_file("a.txt", "1\n", "Touch a");
        repo.commit_file("b.txt", "1\n", "Touch b");
        repo.commit_file("a.txt", "2\n", "Touch a again");
        let service = start().await;

        let log = service
            .log_for_file(&repo.file("a.txt"), FileLogOptions::default())
            .await
            .expect("file log");
        let summaries: Vec<&str> = log.commits.iter().map(|c| c.summary.as_str()).collect();
        assert_eq!(summaries, ["Touch a again", "Touch a"]);
    }

    #[tokio::test]
    async fn search_by_message() {
        let repo = TestRepo::new();
        repo.commit_file("a.txt", "1\n", "Fix parser crash");
        repo.commit_file("a.txt", "2\n", "Unrelated");
        let service = start().await;

        let found = service
            .log_for_search(repo.root(), &SearchPattern::new("message:parser"), None, 0)
            .await
            .expect("matches");
        assert_eq!(found.commits.len(), 1);
        assert_eq!(found.commits[0].summary, "Fix parser crash");
    }

    #[tokio::test]
    async fn log_by_author() {
        let repo = TestRepo::new();
        repo.commit_as("Ann Other <ann@example.com>", "a.txt", "1\n", "By Ann");
        let service = start().await;

        let log = service
            .log(
                repo.root(),
                LogOptions {
                    authors: vec!["ann@example.com".to_string()],
                    ..Default::default()
                },
            )
            .await
            .expect("log");
        assert_eq!(log.commits.len(), 1);
        assert_eq!(log.commits[0].author, "Ann Other");
    }
}

mod refs {
    use super::*;

    #[tokio::test]
    async fn branches_and_current_branch() {
        let repo = TestRepo::new();
        repo.git(&["branch", "feature"]);
        let service = start().await;

        let branches = service.branches(repo.root()).await;
        let names: Vec<&str> = branches.iter().map(|b| b.name.as_str()).collect();
        assert!(names.contains(&"main"));
        assert!(names.contains(&"feature"));

        let current = service.branch(repo.root()).await.expect("current");
        assert_eq!(current.name, "main");
        assert!(current.current);
    }

    #[tokio::test]
    async fn annotated_and_lightweight_tags() {
        let repo = TestRepo::new();
        let sha = repo.head();
        repo.git(&["tag", "-a", "v1.0", "-m", "First release"]);
        repo.git(&["tag", "light"]);
        let service = start().await;

        let tags = service.tags(repo.root()).await;
        let mut names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
        names.sort();
        assert_eq!(names, ["light", "v1.0"]);
        let annotated = tags.iter().find(|t| t.name == "v1.0").unwrap();
        assert_eq!(annotated.target(), sha);
    }

    #[tokio::test]
    async fn stash_lists_entries() {
        let repo = TestRepo::new();
        repo.write("README.md", "stashed\n");
        repo.git(&["stash", "push", "-q", "-m", "work in progress"]);
        let service = start().await;

        let stash = service.stash(repo.root()).await.expect("stash");
        assert_eq!(stash.entries.len(), 1);
        assert_eq!(stash.entries[0].stash_name, "stash@{0}");
        assert!(stash.entries[0].message.contains("work in progress"));
    }

    #[tokio::test]
    async fn contributors_and_current_user() {
        let repo = TestRepo::new();
        repo.commit_file("a.txt", "1\n", "Mine");
        repo.commit_as("Ann Other <ann@example.com>", "a.txt", "2\n", "Ann's");
        let service = start().await;

        let user = service.current_user(repo.root()).await.expect("user");
        assert_eq!(user.name.as_deref(), Some("Test User"));
        assert_eq!(user.email.as_deref(), Some("test@example.com"));

        let contributors = service.contributors(repo.root(), false).await;
        assert_eq!(contributors.len(), 2);
        assert_eq!(contributors[0].name, "Test User");
        assert_eq!(contributors[0].commits, 2);
        assert!(contributors[0].current);
        assert!(!contributors[1].current);
    }

    #[tokio::test]
    async fn default_branch_from_head() {
        let repo = TestRepo::new();
        let service = start().await;

        let name = service.default_branch_name(repo.root(), None).await;
        assert_eq!(name.as_deref(), Some("main"));
    }

    #[tokio::test]
    async fn merge_status_during_conflict() {
        let repo = TestRepo::new();
        repo.git(&["checkout", "-q", "-b", "feature"]);
        repo.commit_file("README.md", "feature\n", "Feature edit");
        repo.git(&["checkout", "-q", "main"]);
        let head = repo.commit_file("README.md", "main\n", "Main edit");
        assert!(!repo.try_git(&["merge", "feature"]));
        let service = start().await;

        let merge = service.merge_status(repo.root()).await.expect("merging");
        assert_eq!(merge.head.sha, head);
        assert!(merge.merge_base.is_some());

        let status = service.status(repo.root()).await.unwrap();
        assert!(status.has_conflicts());
    }

    #[tokio::test]
    async fn no_merge_in_progress() {
        let repo = TestRepo::new();
        let service = start().await;
        assert!(service.merge_status(repo.root()).await.is_none());
        assert!(service.rebase_status(repo.root()).await.is_none());
    }
}

mod references {
    use super::*;

    #[tokio::test]
    async fn tracked_files() {
        let repo = TestRepo::new();
        repo.write("loose.txt", "untracked\n");
        let service = start().await;

        assert!(service.is_tracked(&repo.file("README.md"), None).await);
        assert!(!service.is_tracked(&repo.file("loose.txt"), None).await);
    }

    #[tokio::test]
    async fn resolve_and_validate() {
        let repo = TestRepo::new();
        let first = repo.head();
        repo.commit_file("other.txt", "o\n", "Other file");
        let service = start().await;

        let resolved = service.resolve_reference(repo.root(), "HEAD~1", None, None).await;
        assert_eq!(resolved.as_deref(), Some(first.as_str()));

        // README.md was last written by the first commit
        let by_file = service
            .resolve_reference(repo.root(), "HEAD", Some(&repo.file("README.md")), None)
            .await;
        assert_eq!(by_file.as_deref(), Some(first.as_str()));

        assert!(service.validate_reference(repo.root(), "main").await);
        assert!(!service.validate_reference(repo.root(), "no-such-branch").await);
    }

    #[tokio::test]
    async fn ignored_paths_are_excluded() {
        let repo = TestRepo::new();
        repo.commit_file(".gitignore", "*.log\n", "Ignore logs");
        let service = start().await;

        let kept = service
            .exclude_ignored(
                repo.root(),
                vec![repo.file("build.log"), repo.file("main.rs")],
            )
            .await;
        assert_eq!(kept, vec![repo.file("main.rs")]);
    }
}
