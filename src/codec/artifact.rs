//! The persisted compression artifact and its container format.
//!
//! An artifact carries three fields: the frequency map, the padding length and
//! the packed payload. The container lays them out little-endian:
//!
//! ```text
//! magic    "PHUF"
//! version  u8                 (1)
//! symbols  u16                distinct symbols, 0..=256
//! entries  (u8, u64) * n      symbol and count, ascending by symbol
//! padding  u8                 1..=8
//! length   u64                payload length in bytes
//! payload  [u8; length]
//! ```

use crate::codec::bits;
use crate::codec::frequency::FrequencyMap;
use crate::codec::Result;
use crate::error::Error;

const MAGIC: &[u8; 4] = b"PHUF";
const VERSION: u8 = 1;

/// Output of a compression run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedArtifact {
    frequencies: FrequencyMap,
    padding: u8,
    payload: Vec<u8>,
}

impl PackedArtifact {
    /// Assembles an artifact, checking its fields are structurally valid.
    pub fn new(frequencies: FrequencyMap, padding: u8, payload: Vec<u8>) -> Result<Self> {
        if !(1..=8).contains(&padding) {
            return Err(Error::corrupt(format!(
                "padding length {} outside 1..=8",
                padding
            )));
        }
        if payload.len() * 8 < padding as usize + 1 {
            return Err(Error::corrupt(format!(
                "payload of {} bytes cannot hold a sentinel and {} padding bits",
                payload.len(),
                padding
            )));
        }
        let total = frequencies
            .checked_total()
            .ok_or_else(|| Error::corrupt("symbol counts overflow a 64-bit total"))?;
        let encoded_bits = payload.len() * 8 - padding as usize - 1;
        // Every codeword is at least one bit long.
        if total > encoded_bits as u64 {
            return Err(Error::corrupt(format!(
                "{} symbols cannot fit in {} encoded bits",
                total, encoded_bits
            )));
        }
        Ok(PackedArtifact {
            frequencies,
            padding,
            payload,
        })
    }

    /// Artifact for zero bytes of input: no symbols and a payload that is only
    /// the sentinel and padding.
    pub fn empty() -> Self {
        let (payload, padding) = bits::pack(bitvec::slice::BitSlice::empty());
        PackedArtifact {
            frequencies: FrequencyMap::new(),
            padding,
            payload,
        }
    }

    pub fn frequencies(&self) -> &FrequencyMap {
        &self.frequencies
    }

    pub fn padding(&self) -> u8 {
        self.padding
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Number of bytes the artifact decompresses to.
    pub fn original_len(&self) -> u64 {
        self.frequencies.total()
    }

    /// Length of the encoded bitstream, without sentinel and padding.
    pub fn encoded_bits(&self) -> usize {
        self.payload.len() * 8 - self.padding as usize - 1
    }

    /// Serializes the artifact into the container format.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            MAGIC.len() + 1 + 2 + self.frequencies.len() * 9 + 1 + 8 + self.payload.len(),
        );
        out.extend_from_slice(MAGIC);
        out.push(VERSION);
        out.extend_from_slice(&(self.frequencies.len() as u16).to_le_bytes());
        for (symbol, count) in self.frequencies.iter() {
            out.push(symbol);
            out.extend_from_slice(&count.to_le_bytes());
        }
        out.push(self.padding);
        out.extend_from_slice(&(self.payload.len() as u64).to_le_bytes());
        out.extend_from_slice(&self.payload);
        out
    }

    /// Parses an artifact from the container format.
    ///
    /// # Returns
    ///
    /// `Error::CorruptArtifact` on truncation, trailing bytes, a bad header,
    /// repeated or zero-count symbols, invalid padding, or counts that sum
    /// past the number of encoded bits.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(data);

        if reader.take(MAGIC.len())? != MAGIC {
            return Err(Error::corrupt("bad magic"));
        }
        let version = reader.u8()?;
        if version != VERSION {
            return Err(Error::corrupt(format!("unsupported version {}", version)));
        }

        let symbols = reader.u16()? as usize;
        if symbols > 256 {
            return Err(Error::corrupt(format!("{} symbols in a byte alphabet", symbols)));
        }

        let mut frequencies = FrequencyMap::new();
        let mut previous: Option<u8> = None;
        for _ in 0..symbols {
            let symbol = reader.u8()?;
            let count = reader.u64()?;
            if previous.is_some_and(|p| p >= symbol) {
                return Err(Error::corrupt(format!(
                    "symbol 0x{:02x} out of order or repeated",
                    symbol
                )));
            }
            if count == 0 {
                return Err(Error::corrupt(format!("symbol 0x{:02x} has zero count", symbol)));
            }
            frequencies.add(symbol, count);
            previous = Some(symbol);
        }

        let padding = reader.u8()?;
        let length = usize::try_from(reader.u64()?)
            .map_err(|_| Error::corrupt("payload length overflows"))?;
        let payload = reader.take(length)?.to_vec();

        if !reader.is_empty() {
            return Err(Error::corrupt(format!(
                "{} trailing bytes after payload",
                reader.remaining()
            )));
        }

        Self::new(frequencies, padding, payload)
    }
}

/// Bounds-checked little-endian cursor.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Reader { data, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(Error::corrupt(format!(
                "truncated: needed {} bytes at offset {}, {} left",
                n,
                self.pos,
                self.remaining()
            )));
        }
        let data: &'a [u8] = self.data;
        let slice = &data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        let mut buf = [0u8; 2];
        buf.copy_from_slice(self.take(2)?);
        Ok(u16::from_le_bytes(buf))
    }

    fn u64(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(buf))
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn is_empty(&self) -> bool {
        self.remaining() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PackedArtifact {
        let frequencies = FrequencyMap::from_counts([(b'a', 5), (b'b', 2), (0xFF, 1)]);
        PackedArtifact::new(frequencies, 3, vec![0xDE, 0xAD, 0xB0]).unwrap()
    }

    #[test]
    fn test_container_round_trip() {
        let artifact = sample();
        let bytes = artifact.to_bytes();
        assert_eq!(&bytes[..4], b"PHUF");
        assert_eq!(PackedArtifact::from_bytes(&bytes).unwrap(), artifact);
        assert_eq!(artifact.original_len(), 8);
        assert_eq!(artifact.encoded_bits(), 24 - 4);
    }

    #[test]
    fn test_empty_artifact() {
        let artifact = PackedArtifact::empty();
        assert!(artifact.frequencies().is_empty());
        assert_eq!(artifact.padding(), 7);
        assert_eq!(artifact.payload(), &[0x80]);
        assert_eq!(artifact.encoded_bits(), 0);
        let bytes = artifact.to_bytes();
        assert_eq!(PackedArtifact::from_bytes(&bytes).unwrap(), artifact);
    }

    #[test]
    fn test_invalid_padding_rejected() {
        assert!(matches!(
            PackedArtifact::new(FrequencyMap::new(), 0, vec![0x80]),
            Err(Error::CorruptArtifact { .. })
        ));
        assert!(PackedArtifact::new(FrequencyMap::new(), 9, vec![0x80, 0]).is_err());
        assert!(PackedArtifact::new(FrequencyMap::new(), 1, vec![]).is_err());

        let mut bytes = sample().to_bytes();
        // padding byte sits just before the 8-byte length and 3-byte payload
        let padding_at = bytes.len() - 3 - 8 - 1;
        bytes[padding_at] = 12;
        assert!(PackedArtifact::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_truncated_and_trailing() {
        let bytes = sample().to_bytes();
        for cut in 0..bytes.len() {
            assert!(
                PackedArtifact::from_bytes(&bytes[..cut]).is_err(),
                "prefix of {} bytes parsed",
                cut
            );
        }

        let mut extended = bytes.clone();
        extended.push(0);
        assert!(PackedArtifact::from_bytes(&extended).is_err());
    }

    #[test]
    fn test_bad_header_and_entries() {
        let mut bytes = sample().to_bytes();
        bytes[0] = b'X';
        assert!(PackedArtifact::from_bytes(&bytes).is_err());

        let mut bytes = sample().to_bytes();
        bytes[4] = 2;
        assert!(PackedArtifact::from_bytes(&bytes).is_err());

        // Swap the first two symbols so they are out of order.
        let mut bytes = sample().to_bytes();
        bytes.swap(7, 16);
        assert!(PackedArtifact::from_bytes(&bytes).is_err());

        // Zero out the first count.
        let mut bytes = sample().to_bytes();
        bytes[8..16].fill(0);
        assert!(PackedArtifact::from_bytes(&bytes).is_err());
    }

    /// Writes a container by hand, bypassing `PackedArtifact::new`.
    fn container(entries: &[(u8, u64)], padding: u8, payload: &[u8]) -> Vec<u8> {
        let mut out = b"PHUF".to_vec();
        out.push(1);
        out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
        for &(symbol, count) in entries {
            out.push(symbol);
            out.extend_from_slice(&count.to_le_bytes());
        }
        out.push(padding);
        out.extend_from_slice(&(payload.len() as u64).to_le_bytes());
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn test_overflowing_counts_rejected() {
        let freq = FrequencyMap::from_counts([(b'a', u64::MAX), (b'b', 1)]);
        assert!(matches!(
            PackedArtifact::new(freq, 6, vec![0x40]),
            Err(Error::CorruptArtifact { .. })
        ));

        let bytes = container(&[(b'a', u64::MAX), (b'b', 1)], 6, &[0x40]);
        assert!(matches!(
            PackedArtifact::from_bytes(&bytes),
            Err(Error::CorruptArtifact { .. })
        ));
    }

    #[test]
    fn test_counts_exceeding_encoded_bits_rejected() {
        // One encoded bit cannot hold 2^62 symbols.
        let bytes = container(&[(b'a', 1 << 62)], 6, &[0x40]);
        assert!(matches!(
            PackedArtifact::from_bytes(&bytes),
            Err(Error::CorruptArtifact { .. })
        ));

        // One symbol per encoded bit is the most a payload can hold.
        let bytes = container(&[(b'a', 1)], 6, &[0x40]);
        assert_eq!(PackedArtifact::from_bytes(&bytes).unwrap().original_len(), 1);
        let bytes = container(&[(b'a', 2)], 6, &[0x40]);
        assert!(PackedArtifact::from_bytes(&bytes).is_err());
    }
}
