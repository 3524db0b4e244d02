//! Work partitioning for the worker pool.
//!
//! Counting and encoding split the raw content into equal byte ranges, with the
//! last worker absorbing the remainder. Every byte is an independent symbol, so
//! any split is safe as long as partition order is kept.
//!
//! Decoding is different. A codeword may span several bits, and a worker handed
//! a range that starts mid-codeword has no way to resynchronise. Decode ranges
//! are therefore computed by one sequential walk of the tree over the whole
//! bitstream: each target offset `k * len / n` is moved forward to the first
//! codeword boundary at or after it. This scan is the serial part of decoding.

use crate::codec::tree::{HuffmanNode, HuffmanTree};
use bitvec::prelude::*;
use log::warn;
use std::ops::Range;

/// Ordered list of half-open ranges, one per worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionPlan {
    ranges: Vec<Range<usize>>,
    unreachable_targets: usize,
}

impl PartitionPlan {
    /// Splits `len` items into `workers` ranges of `len / workers` items each;
    /// the final range also takes the remainder.
    pub fn byte_ranges(len: usize, workers: usize) -> Self {
        Self::even(len, workers, 1)
    }

    /// Splits a bitstream of `bit_len` bits into ranges whose starts fall on byte
    /// boundaries, for converting bits to bytes in parallel.
    pub fn byte_aligned_bits(bit_len: usize, workers: usize) -> Self {
        Self::even(bit_len, workers, 8)
    }

    fn even(len: usize, workers: usize, unit: usize) -> Self {
        let workers = workers.max(1);
        let part = (len / unit / workers) * unit;
        let ranges = (0..workers)
            .map(|i| {
                let start = i * part;
                let end = if i + 1 == workers { len } else { start + part };
                start..end
            })
            .collect();

        PartitionPlan {
            ranges,
            unreachable_targets: 0,
        }
    }

    /// Splits an encoded bitstream into ranges that each start on a codeword.
    ///
    /// Targets that no codeword boundary reaches (the stream ends mid-codeword)
    /// collapse to empty ranges at the end of the stream.
    pub fn codeword_aligned(bits: &BitSlice<u8, Msb0>, tree: &HuffmanTree, workers: usize) -> Self {
        let workers = workers.max(1);
        let len = bits.len();
        let targets: Vec<usize> = (1..workers).map(|k| k * len / workers).collect();

        let mut starts = Vec::with_capacity(workers + 1);
        starts.push(0);

        let mut next = 0;
        // Position 0 is the start of the first codeword.
        while next < targets.len() && targets[next] == 0 {
            starts.push(0);
            next += 1;
        }

        let root = tree.root();
        let single_leaf = tree.is_single_leaf();
        let mut current = root;
        for (pos, bit) in bits.iter().by_vals().enumerate() {
            if next == targets.len() {
                break;
            }

            if !single_leaf {
                if let HuffmanNode::Internal { left, right, .. } = *tree.node(current) {
                    current = if bit { right } else { left };
                }
                if !tree.node(current).is_leaf() {
                    continue;
                }
                current = root;
            }

            let boundary = pos + 1;
            while next < targets.len() && targets[next] <= boundary {
                starts.push(boundary);
                next += 1;
            }
        }

        let unreachable_targets = targets.len() - next;
        if unreachable_targets > 0 {
            warn!(
                "{} of {} decode boundaries unreachable in {} bits, trailing partitions left empty",
                unreachable_targets,
                targets.len(),
                len
            );
            starts.resize(workers, len);
        }
        starts.push(len);

        let ranges = starts.windows(2).map(|w| w[0]..w[1]).collect();
        PartitionPlan {
            ranges,
            unreachable_targets,
        }
    }

    pub fn ranges(&self) -> &[Range<usize>] {
        &self.ranges
    }

    /// Number of partitions
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// How many interior targets had no codeword boundary at or after them.
    pub fn unreachable_targets(&self) -> usize {
        self.unreachable_targets
    }

    pub fn iter(&self) -> impl Iterator<Item = &Range<usize>> + '_ {
        self.ranges.iter()
    }
}
