//! Parallel Huffman codec.
//!
//! The codec splits its work across a fixed pool of workers driven by a single
//! [`Coordinator`]:
//! - Frequency counting over equal byte ranges, merged by the coordinator
//! - Deterministic tree construction and code table generation
//! - Encoding of byte ranges, reassembled in partition order
//! - Bit packing with a sentinel bit and zero padding
//! - Decoding over *codeword-aligned* bit ranges found by a sequential scan
//!
//! # Examples
//!
//! ```rust
//! use parhuff::{CodecConfig, Coordinator};
//!
//! let coordinator = Coordinator::new(CodecConfig::new(4).unwrap()).unwrap();
//! let artifact = coordinator.compress(b"abracadabra").unwrap();
//! let restored = coordinator.decompress(&artifact).unwrap();
//! assert_eq!(restored, b"abracadabra");
//! ```

pub use crate::error::Result;

/// Trait for compression algorithms
pub trait Compression {
    /// Compress the input data
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>>;

    /// Decompress the compressed data
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>>;
}

pub mod artifact;
pub mod bits;
pub mod code_table;
pub mod coordinator;
pub mod frequency;
pub mod partition;
pub mod pool;
pub mod tree;
pub mod worker;


pub use artifact::PackedArtifact;
pub use bits::{pack, unpack, Bits};
pub use code_table::{CodeTable, Codeword};
pub use coordinator::{CompressState, CompressionStats, Coordinator, DecompressState};
pub use frequency::{FrequencyMap, Symbol};
pub use partition::PartitionPlan;
pub use pool::WorkerPool;
pub use tree::{HuffmanNode, HuffmanTree, NodeId};
pub use worker::{Request, Response, Worker};
