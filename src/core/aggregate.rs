//! Merging flag reads into the final report.

use indexmap::IndexMap;

use glob::Pattern;

use crate::core::flag_read::{FlagRead, FlagSource};

/// All reads of a run grouped by flag id.
///
/// Flag ids are sorted; the reads of a flag are ordered by file path, row
/// and column.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FlagReport {
    pub flags: IndexMap<String, Vec<FlagRead>>,
}

impl FlagReport {
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    pub fn read_count(&self) -> usize {
        self.flags.values().map(Vec::len).sum()
    }

    /// Every read, ordered by flag id then position.
    pub fn reads(&self) -> impl Iterator<Item = &FlagRead> {
        self.flags.values().flatten()
    }

    /// The reads accepted by `filter`. Flags left without reads are dropped.
    pub fn filtered(&self, filter: &ReadFilter) -> FlagReport {
        let flags = self
            .flags
            .iter()
            .filter_map(|(flag, reads)| {
                let reads: Vec<FlagRead> = reads
                    .iter()
                    .filter(|read| filter.matches(read))
                    .cloned()
                    .collect();
                (!reads.is_empty()).then(|| (flag.clone(), reads))
            })
            .collect();
        FlagReport { flags }
    }
}

fn position_key(read: &FlagRead) -> impl Ord + '_ {
    (
        &read.file_path,
        read.row,
        read.col_start,
        read.col_end,
        read.source,
    )
}

/// Group `reads` by flag id.
///
/// A template shared by several components yields the same read more than
/// once; duplicates are merged.
pub fn aggregate(mut reads: Vec<FlagRead>) -> FlagReport {
    reads.sort_by(|a, b| {
        a.flag_id
            .cmp(&b.flag_id)
            .then_with(|| position_key(a).cmp(&position_key(b)))
    });
    reads.dedup();

    let mut flags: IndexMap<String, Vec<FlagRead>> = IndexMap::new();
    for read in reads {
        flags.entry(read.flag_id.clone()).or_default().push(read);
    }
    FlagReport { flags }
}

/// Selection of reads for output.
#[derive(Debug, Default, Clone)]
pub struct ReadFilter {
    /// Keep only these flag ids. Empty keeps all.
    pub flags: Vec<String>,
    pub source: Option<FlagSource>,
    /// Glob matched against the read's file path.
    pub path: Option<Pattern>,
}

impl ReadFilter {
    pub fn matches(&self, read: &FlagRead) -> bool {
        (self.flags.is_empty() || self.flags.iter().any(|f| *f == read.flag_id))
            && self.source.is_none_or(|source| source == read.source)
            && self
                .path
                .as_ref()
                .is_none_or(|pattern| pattern.matches_path(&read.file_path))
    }
}
