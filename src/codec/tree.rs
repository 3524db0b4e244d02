//! Deterministic Huffman tree construction.
//!
//! The decoder never receives the code table; it rebuilds the tree from the
//! persisted frequency map. Both sides must therefore produce the *same* tree,
//! which rules out any tie-break that depends on hashing or addresses.
//!
//! Nodes live in an arena and refer to their children by index. Leaves are
//! pushed first, in ascending symbol order, and every merged node is appended
//! after them, so a node's index doubles as its insertion sequence number. The
//! priority queue orders nodes by `(weight, index)`: equal weights are broken
//! first-inserted-first-extracted, and the first node extracted in each merge
//! becomes the left child.

use crate::codec::frequency::{FrequencyMap, Symbol};
use crate::codec::Result;
use crate::error::Error;
use bitvec::prelude::*;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Index of a node in a [`HuffmanTree`] arena
pub type NodeId = usize;

/// A node in the Huffman tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HuffmanNode {
    /// A leaf holds one symbol and its count.
    Leaf { symbol: Symbol, weight: u64 },
    /// An internal node owns its two children, `weight = left + right`.
    Internal {
        weight: u64,
        left: NodeId,
        right: NodeId,
    },
}

impl HuffmanNode {
    /// Returns the weight of the node.
    pub fn weight(&self) -> u64 {
        match self {
            HuffmanNode::Leaf { weight, .. } => *weight,
            HuffmanNode::Internal { weight, .. } => *weight,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, HuffmanNode::Leaf { .. })
    }
}

/// Heap entry; the smallest `(weight, id)` has the highest priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct QueueEntry {
    weight: u64,
    id: NodeId,
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so that BinaryHeap pops the minimum.
        other
            .weight
            .cmp(&self.weight)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Arena-backed Huffman tree with a single root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffmanTree {
    nodes: Vec<HuffmanNode>,
    root: NodeId,
}

impl HuffmanTree {
    /// Builds the tree for a frequency map.
    ///
    /// # Returns
    ///
    /// `Error::EmptyAlphabet` if the map has no symbols, and
    /// `Error::InvalidInput` if its counts sum past `u64::MAX`. A single-symbol
    /// map yields a tree whose root is that symbol's leaf.
    pub fn build(frequencies: &FrequencyMap) -> Result<Self> {
        if frequencies.is_empty() {
            return Err(Error::EmptyAlphabet);
        }
        if frequencies.checked_total().is_none() {
            return Err(Error::InvalidInput(
                "symbol counts overflow a 64-bit total".to_string(),
            ));
        }

        let leaves = frequencies.len();
        let mut nodes = Vec::with_capacity(2 * leaves - 1);
        let mut queue = BinaryHeap::with_capacity(leaves);

        for (symbol, weight) in frequencies.iter() {
            let id = nodes.len();
            nodes.push(HuffmanNode::Leaf { symbol, weight });
            queue.push(QueueEntry { weight, id });
        }

        while let (Some(left), Some(right)) = (queue.pop(), queue.pop()) {
            let id = nodes.len();
            // Every internal weight is bounded by the checked total.
            let weight = left.weight + right.weight;
            nodes.push(HuffmanNode::Internal {
                weight,
                left: left.id,
                right: right.id,
            });
            queue.push(QueueEntry { weight, id });
        }

        // The last node pushed is the only one never extracted.
        let root = nodes.len() - 1;
        Ok(Self { nodes, root })
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Returns the node stored at `id`.
    pub fn node(&self, id: NodeId) -> &HuffmanNode {
        &self.nodes[id]
    }

    /// Total weight, i.e. the number of symbols the tree encodes
    pub fn weight(&self) -> u64 {
        self.nodes[self.root].weight()
    }

    /// Number of nodes in the arena
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of distinct symbols (leaves).
    pub fn leaf_count(&self) -> usize {
        (self.nodes.len() + 1) / 2
    }

    /// True when the whole alphabet is one symbol and the root is a leaf.
    pub fn is_single_leaf(&self) -> bool {
        self.nodes[self.root].is_leaf()
    }

    /// Reads one codeword starting at bit `from`.
    ///
    /// # Returns
    ///
    /// The decoded symbol and the position just past its codeword, or `None` if
    /// the bits run out before a leaf is reached. In a single-leaf tree every
    /// bit is one codeword.
    pub fn decode_one(&self, bits: &BitSlice<u8, Msb0>, from: usize) -> Option<(Symbol, usize)> {
        let mut current = self.root;
        let mut pos = from;
        loop {
            match self.nodes[current] {
                HuffmanNode::Leaf { symbol, .. } => {
                    if current == self.root {
                        // Degenerate alphabet: the lone symbol has a 1-bit code.
                        return (pos < bits.len()).then_some((symbol, pos + 1));
                    }
                    return Some((symbol, pos));
                }
                HuffmanNode::Internal { left, right, .. } => {
                    let bit = *bits.get(pos)?;
                    current = if bit { right } else { left };
                    pos += 1;
                }
            }
        }
    }

    /// Decodes every codeword in `bits`.
    ///
    /// # Returns
    ///
    /// The symbols, or `Error::CorruptArtifact` if the bits end mid-codeword.
    pub fn decode(&self, bits: &BitSlice<u8, Msb0>) -> Result<Vec<Symbol>> {
        let mut symbols = Vec::new();
        let mut pos = 0;
        while pos < bits.len() {
            let (symbol, next) = self.decode_one(bits, pos).ok_or_else(|| {
                Error::corrupt(format!(
                    "bitstream ends inside a codeword starting at bit {}",
                    pos
                ))
            })?;
            symbols.push(symbol);
            pos = next;
        }
        Ok(symbols)
    }
}
