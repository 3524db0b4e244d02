//! Orchestration of compress and decompress runs.
//!
//! The coordinator owns the raw content, the output buffer and every broadcast
//! artifact (frequency map, tree, code table). Each phase hands one range to
//! each worker, then waits at a barrier until all partial results are back and
//! reassembles them in partition order. No phase starts before the previous
//! barrier is satisfied, and nothing is written until the whole run succeeds.
//!
//! # Compress
//!
//! `Idle → Partitioning → CountingAwait → TreeBuild → TableDistribute →
//! EncodingAwait → Pack → Persisted`
//!
//! # Decompress
//!
//! `Idle → Load → TreeRebuild → Unpack → BoundaryScan → DecodeDispatch →
//! DecodingAwait → Assemble → Written`

use crate::codec::artifact::PackedArtifact;
use crate::codec::bits::{self, Bits};
use crate::codec::code_table::CodeTable;
use crate::codec::frequency::FrequencyMap;
use crate::codec::partition::PartitionPlan;
use crate::codec::pool::WorkerPool;
use crate::codec::tree::HuffmanTree;
use crate::codec::worker::{Request, Worker};
use crate::codec::{Compression, Result};
use crate::config::CodecConfig;
use crate::error::Error;
use log::{debug, info};
use std::fs;
use std::path::Path;

/// States of a compression run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressState {
    Idle,
    Partitioning,
    CountingAwait,
    TreeBuild,
    TableDistribute,
    EncodingAwait,
    Pack,
    Persisted,
}

impl CompressState {
    /// The state that follows this one, `None` once persisted.
    pub fn next(self) -> Option<Self> {
        use CompressState::*;
        match self {
            Idle => Some(Partitioning),
            Partitioning => Some(CountingAwait),
            CountingAwait => Some(TreeBuild),
            TreeBuild => Some(TableDistribute),
            TableDistribute => Some(EncodingAwait),
            EncodingAwait => Some(Pack),
            Pack => Some(Persisted),
            Persisted => None,
        }
    }
}

/// States of a decompression run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecompressState {
    Idle,
    Load,
    TreeRebuild,
    Unpack,
    BoundaryScan,
    DecodeDispatch,
    DecodingAwait,
    Assemble,
    Written,
}

impl DecompressState {
    /// The state that follows this one, `None` once written.
    pub fn next(self) -> Option<Self> {
        use DecompressState::*;
        match self {
            Idle => Some(Load),
            Load => Some(TreeRebuild),
            TreeRebuild => Some(Unpack),
            Unpack => Some(BoundaryScan),
            BoundaryScan => Some(DecodeDispatch),
            DecodeDispatch => Some(DecodingAwait),
            DecodingAwait => Some(Assemble),
            Assemble => Some(Written),
            Written => None,
        }
    }
}

/// Tracks one run through its state machine.
#[derive(Debug)]
struct Run<S> {
    state: S,
    history: Vec<S>,
}

impl<S: Copy + std::fmt::Debug> Run<S> {
    fn start(initial: S) -> Self {
        Run {
            state: initial,
            history: vec![initial],
        }
    }

    fn enter(&mut self, next: S) {
        debug!("{:?} -> {:?}", self.state, next);
        self.state = next;
        self.history.push(next);
    }
}

/// Sizes of one compression run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionStats {
    /// Bytes of raw input
    pub input_bytes: usize,
    /// Bytes of packed payload
    pub payload_bytes: usize,
    /// Encoded bits before sentinel and padding
    pub encoded_bits: usize,
}

impl CompressionStats {
    /// Payload size relative to input size, 0 for empty input.
    pub fn ratio(&self) -> f64 {
        if self.input_bytes == 0 {
            0.0
        } else {
            self.payload_bytes as f64 / self.input_bytes as f64
        }
    }
}

/// Drives the worker pool through compress and decompress runs.
#[derive(Debug)]
pub struct Coordinator {
    config: CodecConfig,
    pool: WorkerPool,
    decode_pool: Option<WorkerPool>,
}

impl Coordinator {
    /// Creates a coordinator and starts its worker pool(s).
    pub fn new(config: CodecConfig) -> Result<Self> {
        let pool = WorkerPool::new(config.workers)?;
        let decode_pool = if config.decode_workers() != config.workers {
            Some(WorkerPool::new(config.decode_workers())?)
        } else {
            None
        };
        Ok(Coordinator {
            config,
            pool,
            decode_pool,
        })
    }

    /// Shorthand for a coordinator with `workers` workers on both sides.
    pub fn with_workers(workers: usize) -> Result<Self> {
        Self::new(CodecConfig::new(workers)?)
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    fn decode_pool(&self) -> &WorkerPool {
        self.decode_pool.as_ref().unwrap_or(&self.pool)
    }

    /// Compresses `content` into an artifact.
    pub fn compress(&self, content: &[u8]) -> Result<PackedArtifact> {
        self.compress_traced(content).map(|(artifact, _)| artifact)
    }

    /// Compresses `content` and reports the resulting sizes.
    pub fn compress_with_stats(&self, content: &[u8]) -> Result<(PackedArtifact, CompressionStats)> {
        let artifact = self.compress(content)?;
        let stats = CompressionStats {
            input_bytes: content.len(),
            payload_bytes: artifact.payload().len(),
            encoded_bits: artifact.encoded_bits(),
        };
        Ok((artifact, stats))
    }

    /// Compresses `content`, also returning the states the run went through.
    pub fn compress_traced(&self, content: &[u8]) -> Result<(PackedArtifact, Vec<CompressState>)> {
        let mut run = Run::start(CompressState::Idle);

        if content.is_empty() {
            debug!("empty input, skipping tree construction");
            run.enter(CompressState::Persisted);
            return Ok((PackedArtifact::empty(), run.history));
        }

        let workers = self.pool.size();

        run.enter(CompressState::Partitioning);
        let plan = PartitionPlan::byte_ranges(content.len(), workers);
        let chunks: Vec<&[u8]> = plan.iter().map(|range| &content[range.clone()]).collect();

        run.enter(CompressState::CountingAwait);
        let partials = self.pool.gather(chunks.clone(), |rank, chunk| {
            Worker::new(rank)
                .handle(Request::Count(chunk))?
                .into_frequencies()
        })?;
        let frequencies = FrequencyMap::merged(&partials);

        run.enter(CompressState::TreeBuild);
        let tree = HuffmanTree::build(&frequencies)?;

        run.enter(CompressState::TableDistribute);
        let table = CodeTable::from_tree(&tree);
        debug!(
            "code table has {} symbols for {} bytes",
            table.len(),
            content.len()
        );

        run.enter(CompressState::EncodingAwait);
        let fragments = self.pool.gather(chunks, |rank, chunk| {
            Worker::new(rank)
                .handle(Request::Encode {
                    content: chunk,
                    table: &table,
                })?
                .into_bits()
        })?;
        let mut encoded = Bits::with_capacity(fragments.iter().map(|f| f.len()).sum::<usize>() + 8);
        for fragment in &fragments {
            encoded.extend_from_bitslice(fragment);
        }
        let encoded_bits = encoded.len();

        run.enter(CompressState::Pack);
        let padding = bits::seal(&mut encoded);
        let pack_plan = PartitionPlan::byte_aligned_bits(encoded.len(), workers);
        let slices: Vec<_> = pack_plan.iter().map(|range| &encoded[range.clone()]).collect();
        let byte_parts = self.pool.gather(slices, |rank, slice| {
            Worker::new(rank).handle(Request::Pack(slice))?.into_bytes()
        })?;
        let payload = byte_parts.concat();

        let artifact = PackedArtifact::new(frequencies, padding, payload)?;
        run.enter(CompressState::Persisted);
        info!(
            "compressed {} bytes to {} payload bytes ({} bits, padding {}) with {} workers",
            content.len(),
            artifact.payload().len(),
            encoded_bits,
            padding,
            workers
        );
        Ok((artifact, run.history))
    }

    /// Restores the original bytes from an artifact.
    pub fn decompress(&self, artifact: &PackedArtifact) -> Result<Vec<u8>> {
        self.decompress_traced(artifact).map(|(content, _)| content)
    }

    /// Decompresses, also returning the states the run went through.
    pub fn decompress_traced(&self, artifact: &PackedArtifact) -> Result<(Vec<u8>, Vec<DecompressState>)> {
        let mut run = Run::start(DecompressState::Idle);
        let pool = self.decode_pool();
        let workers = pool.size();

        run.enter(DecompressState::Load);
        let frequencies = artifact.frequencies();
        let expected = usize::try_from(artifact.original_len())
            .map_err(|_| Error::corrupt("original length overflows"))?;

        if frequencies.is_empty() {
            if bits::unpack(artifact.payload(), artifact.padding())?.any() {
                return Err(Error::corrupt("payload bits present for an empty alphabet"));
            }
            run.enter(DecompressState::Written);
            return Ok((Vec::new(), run.history));
        }

        run.enter(DecompressState::TreeRebuild);
        let tree = HuffmanTree::build(frequencies)?;

        run.enter(DecompressState::Unpack);
        let byte_plan = PartitionPlan::byte_ranges(artifact.payload().len(), workers);
        let byte_chunks: Vec<_> = byte_plan
            .iter()
            .map(|range| &artifact.payload()[range.clone()])
            .collect();
        let bit_parts = pool.gather(byte_chunks, |rank, chunk| {
            Worker::new(rank).handle(Request::Unpack(chunk))?.into_bits()
        })?;
        let mut expanded = Bits::with_capacity(artifact.payload().len() * 8);
        for part in &bit_parts {
            expanded.extend_from_bitslice(part);
        }
        let encoded = bits::strip(expanded, artifact.padding())?;

        run.enter(DecompressState::BoundaryScan);
        let plan = PartitionPlan::codeword_aligned(&encoded, &tree, workers);
        debug!(
            "decode ranges {:?} ({} unreachable targets)",
            plan.ranges(),
            plan.unreachable_targets()
        );

        run.enter(DecompressState::DecodeDispatch);
        let slices: Vec<_> = plan.iter().map(|range| &encoded[range.clone()]).collect();

        run.enter(DecompressState::DecodingAwait);
        let decoded = pool.gather(slices, |rank, slice| {
            Worker::new(rank)
                .handle(Request::Decode {
                    bits: slice,
                    tree: &tree,
                })?
                .into_symbols()
        })?;

        run.enter(DecompressState::Assemble);
        let mut output = Vec::with_capacity(decoded.iter().map(Vec::len).sum());
        for part in decoded {
            output.extend_from_slice(&part);
        }
        if output.len() != expected {
            return Err(Error::corrupt(format!(
                "decoded {} symbols but the frequency map counts {}",
                output.len(),
                expected
            )));
        }

        run.enter(DecompressState::Written);
        info!(
            "decompressed {} payload bytes to {} bytes with {} workers",
            artifact.payload().len(),
            output.len(),
            workers
        );
        Ok((output, run.history))
    }

    /// Reads `input`, compresses it and writes the container to `output`.
    ///
    /// `output` is only written once the whole run has succeeded.
    pub fn compress_file<P: AsRef<Path>, Q: AsRef<Path>>(&self, input: P, output: Q) -> Result<CompressionStats> {
        let content = fs::read(input)?;
        let (artifact, stats) = self.compress_with_stats(&content)?;
        fs::write(output, artifact.to_bytes())?;
        Ok(stats)
    }

    /// Reads a container from `input`, decompresses it and writes the bytes to
    /// `output`.
    pub fn decompress_file<P: AsRef<Path>, Q: AsRef<Path>>(&self, input: P, output: Q) -> Result<usize> {
        let data = fs::read(input)?;
        let artifact = PackedArtifact::from_bytes(&data)?;
        let content = self.decompress(&artifact)?;
        fs::write(output, &content)?;
        Ok(content.len())
    }
}

impl Compression for Coordinator {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(Coordinator::compress(self, data)?.to_bytes())
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let artifact = PackedArtifact::from_bytes(data)?;
        Coordinator::decompress(self, &artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compress_states_in_order() {
        let coordinator = Coordinator::with_workers(3).unwrap();
        let (_, states) = coordinator.compress_traced(b"mississippi").unwrap();

        let mut expected = vec![CompressState::Idle];
        while let Some(next) = expected.last().and_then(|s| s.next()) {
            expected.push(next);
        }
        assert_eq!(states, expected);
    }

    #[test]
    fn test_decompress_states_in_order() {
        let coordinator = Coordinator::with_workers(2).unwrap();
        let artifact = coordinator.compress(b"mississippi").unwrap();
        let (content, states) = coordinator.decompress_traced(&artifact).unwrap();
        assert_eq!(content, b"mississippi");

        let mut expected = vec![DecompressState::Idle];
        while let Some(next) = expected.last().and_then(|s| s.next()) {
            expected.push(next);
        }
        assert_eq!(states, expected);
    }

    #[test]
    fn test_empty_input_short_circuits() {
        let coordinator = Coordinator::with_workers(4).unwrap();
        let (artifact, states) = coordinator.compress_traced(b"").unwrap();
        assert_eq!(states, vec![CompressState::Idle, CompressState::Persisted]);
        assert!(artifact.frequencies().is_empty());
        assert_eq!(coordinator.decompress(&artifact).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_degenerate_alphabet() {
        let coordinator = Coordinator::with_workers(2).unwrap();
        let artifact = coordinator.compress(b"AAAA").unwrap();
        assert_eq!(artifact.encoded_bits(), 4);
        assert_eq!(coordinator.decompress(&artifact).unwrap(), b"AAAA");
    }

    #[test]
    fn test_compression_trait_round_trip() {
        let coordinator = Coordinator::with_workers(3).unwrap();
        let data = b"she sells sea shells by the sea shore";
        let packed = Compression::compress(&coordinator, data).unwrap();
        assert_eq!(&packed[..4], b"PHUF");
        assert_eq!(Compression::decompress(&coordinator, &packed).unwrap(), data);
    }

    #[test]
    fn test_symbol_count_mismatch_is_corrupt() {
        let coordinator = Coordinator::with_workers(2).unwrap();
        let artifact = coordinator.compress(b"aabbbc").unwrap();
        let mut frequencies = artifact.frequencies().clone();
        frequencies.add(b'a', 1);
        // Both maps give b = 0, c = 10, a = 11; the payload holds one `a` too few.
        let tampered =
            PackedArtifact::new(frequencies, artifact.padding(), artifact.payload().to_vec())
                .unwrap();
        assert!(matches!(
            coordinator.decompress(&tampered),
            Err(Error::CorruptArtifact { .. })
        ));
    }

    #[test]
    fn test_stats() {
        let coordinator = Coordinator::with_workers(2).unwrap();
        let content = vec![b'x'; 64];
        let (artifact, stats) = coordinator.compress_with_stats(&content).unwrap();
        assert_eq!(stats.input_bytes, 64);
        assert_eq!(stats.encoded_bits, 64);
        assert_eq!(stats.payload_bytes, artifact.payload().len());
        assert_eq!(stats.payload_bytes, 9);
        assert!(stats.ratio() < 0.2);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = std::env::temp_dir().join(format!("parhuff-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let input = dir.join("input.txt");
        let packed = dir.join("input.phuf");
        let restored = dir.join("restored.txt");

        let content = b"It was the best of times, it was the worst of times.".repeat(20);
        fs::write(&input, &content).unwrap();

        let coordinator = Coordinator::new(
            CodecConfig::new(3)
                .unwrap()
                .with_decode_workers(5)
                .unwrap(),
        )
        .unwrap();
        let stats = coordinator.compress_file(&input, &packed).unwrap();
        assert_eq!(stats.input_bytes, content.len());
        let written = coordinator.decompress_file(&packed, &restored).unwrap();
        assert_eq!(written, content.len());
        assert_eq!(fs::read(&restored).unwrap(), content);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_corrupt_file_writes_nothing() {
        let dir = std::env::temp_dir().join(format!("parhuff-corrupt-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let packed = dir.join("bad.phuf");
        let restored = dir.join("restored.txt");
        fs::write(&packed, b"PHUF\x01garbage").unwrap();

        let coordinator = Coordinator::with_workers(2).unwrap();
        assert!(coordinator.decompress_file(&packed, &restored).is_err());
        assert!(!restored.exists());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_inflated_counts_are_corrupt() {
        // {a: 2^62} claimed against a single encoded bit: 0 + sentinel + 6 zeros.
        let mut bytes = b"PHUF\x01\x01\x00a".to_vec();
        bytes.extend_from_slice(&(1u64 << 62).to_le_bytes());
        bytes.push(6);
        bytes.extend_from_slice(&1u64.to_le_bytes());
        bytes.push(0x40);

        let coordinator = Coordinator::with_workers(2).unwrap();
        assert!(matches!(
            Compression::decompress(&coordinator, &bytes),
            Err(Error::CorruptArtifact { .. })
        ));
    }
}
