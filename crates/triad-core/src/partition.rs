//! Partition scheme: every file is split into exactly three contiguous
//! byte ranges, and part names are derived from the file name.
//!
//! The scheme is a pure function of the file length, so the coordinator
//! never has to record it: the same arithmetic reproduces the ranges at
//! retrieval time.

/// Number of parts every file is split into. Fixed; there is no
/// replication and no rebalancing, so losing one node loses the file.
pub const PART_COUNT: usize = 3;

/// One contiguous byte range of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    /// Zero-based part index. Part `i` always lives on storage node `i`.
    pub index: usize,
    /// Byte offset of this range within the whole file.
    pub offset: u64,
    /// Length of this range. May be zero for files shorter than 3 bytes.
    pub len: u64,
}

/// Split a file of `total` bytes into [`PART_COUNT`] ranges.
///
/// Parts 0 and 1 get `total / 3` bytes each; part 2 absorbs the
/// remainder. Concatenating the ranges in index order reproduces the
/// original byte stream exactly.
pub fn split(total: u64) -> [Partition; PART_COUNT] {
    let part = total / PART_COUNT as u64;
    let remainder = total % PART_COUNT as u64;
    [
        Partition {
            index: 0,
            offset: 0,
            len: part,
        },
        Partition {
            index: 1,
            offset: part,
            len: part,
        },
        Partition {
            index: 2,
            offset: 2 * part,
            len: part + remainder,
        },
    ]
}

/// Name of part `index` (zero-based) of `file`. The on-disk suffix is
/// 1-indexed: `report.pdf` becomes `report.pdf_part1` through
/// `report.pdf_part3`.
pub fn part_name(file: &str, index: usize) -> String {
    format!("{}_part{}", file, index + 1)
}
