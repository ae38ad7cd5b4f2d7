//! parsers::tree
//!
//! `git ls-tree -l` and `git ls-files` listings.

use crate::models::{TreeEntry, TreeEntryKind};

/// `<mode> <kind> <sha> <size>\t<path>`. Size is `-` for trees.
pub fn parse_tree(data: &str) -> Vec<TreeEntry> {
    data.lines()
        .filter_map(|line| {
            let (meta, path) = line.trim_end_matches('\r').split_once('\t')?;
            let mut fields = meta.split_whitespace();
            let mode = fields.next()?;
            let kind = TreeEntryKind::parse(fields.next()?)?;
            let sha = fields.next()?;
            let size = fields.next().and_then(|s| s.parse::<u64>().ok());
            Some(TreeEntry {
                path: path.to_string(),
                mode: mode.to_string(),
                kind,
                sha: sha.to_string(),
                size,
            })
        })
        .collect()
}

/// One path per line.
pub fn parse_files(data: &str) -> Vec<String> {
    data.lines()
        .map(|l| l.trim_end_matches('\r'))
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}
