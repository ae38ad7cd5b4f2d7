//! Property-based tests for paths, the path tree and the parsers.
//!
//! These tests use proptest to verify invariants hold across
//! randomly generated inputs.

use proptest::prelude::*;

use gitscope::core::paths::normalize_path;
use gitscope::core::types::rev;
use gitscope::core::version::GitVersion;
use gitscope::parsers::{
    parse_blame, parse_branches, parse_diff, parse_log, parse_name_status, parse_reflog,
    parse_stash, parse_status, LogContext,
};
use gitscope::repository::PathTree;

/// Strategy for a single path segment.
fn segment() -> impl Strategy<Value = String> {
    "[a-z0-9_.-]{1,8}".prop_filter("not a dot segment", |s| s != "." && s != "..")
}

/// Strategy for absolute, normalized paths.
fn abs_path() -> impl Strategy<Value = String> {
    prop::collection::vec(segment(), 1..6).prop_map(|segs| format!("/{}", segs.join("/")))
}

fn is_ancestor(ancestor: &str, path: &str) -> bool {
    path == ancestor || path.starts_with(&format!("{}/", ancestor))
}

proptest! {
    #[test]
    fn normalize_is_idempotent(path in "[a-zA-Z0-9:/\\\\._ -]{0,40}") {
        let once = normalize_path(&path);
        prop_assert_eq!(normalize_path(&once), once.clone());
        prop_assert!(!once.contains('\\'));
    }

    #[test]
    fn normalize_strips_trailing_slashes(path in abs_path(), slashes in 1usize..4) {
        let padded = format!("{}{}", path, "/".repeat(slashes));
        prop_assert_eq!(normalize_path(padded), path);
    }

    /// The deepest registered ancestor always wins.
    #[test]
    fn path_tree_finds_deepest_ancestor(
        roots in prop::collection::vec(abs_path(), 1..8),
        query in abs_path(),
    ) {
        let mut tree = PathTree::new();
        for root in &roots {
            tree.insert(root, root.clone());
        }

        let expected = roots
            .iter()
            .filter(|root| is_ancestor(root, &query))
            .max_by_key(|root| root.len());
        prop_assert_eq!(tree.find_substr(&query), expected);
    }

    #[test]
    fn path_tree_nested_lookup(base in abs_path(), child in segment()) {
        let nested = format!("{}/{}", base, child);
        let mut tree = PathTree::new();
        tree.insert(&base, 1);
        tree.insert(&nested, 2);

        prop_assert_eq!(tree.find_substr(&format!("{}/file.rs", nested)), Some(&2));
        prop_assert_eq!(tree.find_substr(&format!("{}/other.rs", base)), Some(&1));
        prop_assert_eq!(tree.remove(&nested), Some(2));
        prop_assert_eq!(tree.find_substr(&format!("{}/file.rs", nested)), Some(&1));
    }

    #[test]
    fn shorten_never_grows(sha in "[0-9a-f]{40}") {
        prop_assume!(!rev::is_uncommitted(&sha));
        let short = rev::shorten(&sha);
        prop_assert!(short.len() < sha.len());
        prop_assert!(sha.starts_with(&short));
    }

    #[test]
    fn versions_order_like_numbers(
        a in (0u32..5, 0u32..50, 0u32..10),
        b in (0u32..5, 0u32..50, 0u32..10),
    ) {
        let va = GitVersion::parse(&format!("git version {}.{}.{}", a.0, a.1, a.2)).unwrap();
        let vb = GitVersion::parse(&format!("git version {}.{}.{}", b.0, b.1, b.2)).unwrap();
        prop_assert_eq!(va.at_least_version(vb), a >= b);
    }
}

// Parsers take whatever git printed; arbitrary text must never panic.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn blame_parser_total(data in ".{0,400}") {
        let _ = parse_blame(&data, "/repo", Some("Me"));
    }

    #[test]
    fn branch_parser_total(data in "(<[hnutrd]>[ -~]{0,20}){0,12}\n?") {
        let _ = parse_branches(&data, "/repo");
    }

    #[test]
    fn log_parser_total(data in "(<[a-z/]{1,2}>[ -~\n]{0,20}){0,16}", limit in prop::option::of(0usize..5)) {
        let _ = parse_log(&data, &LogContext { repo_path: "/repo", limit });
    }

    #[test]
    fn diff_parser_total(data in "((@@ [-+0-9, ]{0,16} @@|[-+ ][a-z]{0,5}|diff --git a/x b/x)\n){0,12}") {
        let _ = parse_diff(&data, "HEAD", None);
    }

    #[test]
    fn status_parser_total(data in "([12u?!#] [ -~]{0,40}\n){0,8}") {
        let _ = parse_status(&data, "/repo");
    }

    #[test]
    fn misc_parsers_total(data in ".{0,200}") {
        let _ = parse_name_status(&data);
        let _ = parse_reflog(&data);
        let _ = parse_stash(&data, "/repo");
    }
}
