//! Stateless worker executing one request for one phase.
//!
//! A worker holds nothing between calls: every input it needs (its byte or bit
//! range, the code table, the tree) arrives with the request, and its partial
//! result goes back to the coordinator.

use crate::codec::bits::{self, Bits};
use crate::codec::code_table::CodeTable;
use crate::codec::frequency::{FrequencyMap, Symbol};
use crate::codec::tree::HuffmanTree;
use crate::codec::Result;
use crate::error::Error;
use bitvec::prelude::*;
use log::trace;

/// Work delivered to a worker for one phase.
#[derive(Debug, Clone, Copy)]
pub enum Request<'a> {
    /// Count symbols in a byte range
    Count(&'a [u8]),
    /// Encode a byte range with the broadcast code table
    Encode {
        content: &'a [u8],
        table: &'a CodeTable,
    },
    /// Convert a byte-aligned slice of the sealed bitstream to bytes
    Pack(&'a BitSlice<u8, Msb0>),
    /// Expand a slice of the payload into bits
    Unpack(&'a [u8]),
    /// Decode a codeword-aligned slice of the bitstream
    Decode {
        bits: &'a BitSlice<u8, Msb0>,
        tree: &'a HuffmanTree,
    },
}

impl Request<'_> {
    /// Short name of the phase, for logging.
    pub fn phase(&self) -> &'static str {
        match self {
            Request::Count(_) => "count",
            Request::Encode { .. } => "encode",
            Request::Pack(_) => "pack",
            Request::Unpack(_) => "unpack",
            Request::Decode { .. } => "decode",
        }
    }
}

/// Partial result returned to the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Frequencies(FrequencyMap),
    Bits(Bits),
    Bytes(Vec<u8>),
    Symbols(Vec<Symbol>),
}

impl Response {
    pub fn into_frequencies(self) -> Result<FrequencyMap> {
        match self {
            Response::Frequencies(map) => Ok(map),
            other => Err(unexpected("frequencies", &other)),
        }
    }

    pub fn into_bits(self) -> Result<Bits> {
        match self {
            Response::Bits(bits) => Ok(bits),
            other => Err(unexpected("bits", &other)),
        }
    }

    pub fn into_bytes(self) -> Result<Vec<u8>> {
        match self {
            Response::Bytes(bytes) => Ok(bytes),
            other => Err(unexpected("bytes", &other)),
        }
    }

    pub fn into_symbols(self) -> Result<Vec<Symbol>> {
        match self {
            Response::Symbols(symbols) => Ok(symbols),
            other => Err(unexpected("symbols", &other)),
        }
    }
}

fn unexpected(expected: &str, got: &Response) -> Error {
    let got = match got {
        Response::Frequencies(_) => "frequencies",
        Response::Bits(_) => "bits",
        Response::Bytes(_) => "bytes",
        Response::Symbols(_) => "symbols",
    };
    Error::InvalidInput(format!("Expected {} from worker, got {}", expected, got))
}

/// Executor for a single request.
#[derive(Debug, Clone, Copy)]
pub struct Worker {
    rank: usize,
}

impl Worker {
    pub fn new(rank: usize) -> Self {
        Worker { rank }
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Runs one request to completion.
    pub fn handle(&self, request: Request<'_>) -> Result<Response> {
        trace!("worker {} running {} request", self.rank, request.phase());
        let response = match request {
            Request::Count(content) => Response::Frequencies(FrequencyMap::count(content)),
            Request::Encode { content, table } => Response::Bits(table.encode(content)?),
            Request::Pack(bits) => {
                if bits.len() % 8 != 0 {
                    return Err(Error::InvalidInput(format!(
                        "Pack range of {} bits is not byte aligned",
                        bits.len()
                    )));
                }
                Response::Bytes(bits::to_bytes(bits))
            }
            Request::Unpack(bytes) => Response::Bits(bits::expand(bytes)),
            Request::Decode { bits, tree } => Response::Symbols(tree.decode(bits)?),
        };
        Ok(response)
    }
}
