//! Prefix code table derived from a Huffman tree.

use crate::codec::bits::Bits;
use crate::codec::frequency::Symbol;
use crate::codec::tree::{HuffmanNode, HuffmanTree, NodeId};
use crate::codec::Result;
use crate::error::Error;
use bitvec::prelude::*;
use std::fmt;

/// The bit-string assigned to one symbol.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Codeword(Bits);

impl Codeword {
    /// Code length in bits
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn bits(&self) -> &BitSlice<u8, Msb0> {
        &self.0
    }

    /// True if this code is a proper or equal prefix of `other`.
    pub fn is_prefix_of(&self, other: &Codeword) -> bool {
        other.0.starts_with(&self.0)
    }
}

impl fmt::Display for Codeword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in self.0.iter().by_vals() {
            f.write_str(if bit { "1" } else { "0" })?;
        }
        Ok(())
    }
}

/// Mapping from symbol to codeword.
///
/// Built from exactly one traversal of one tree, so the codes are prefix-free
/// by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeTable {
    codes: Vec<Option<Codeword>>,
    symbols: usize,
}

impl CodeTable {
    /// Walks the tree depth-first, appending `0` for left edges and `1` for
    /// right edges, and records the path at every leaf.
    ///
    /// A tree whose root is a leaf assigns its symbol the 1-bit code `0`.
    pub fn from_tree(tree: &HuffmanTree) -> Self {
        let mut codes: Vec<Option<Codeword>> = vec![None; 256];
        let mut symbols = 0;

        let mut stack: Vec<(NodeId, Bits)> = vec![(tree.root(), Bits::new())];
        while let Some((id, prefix)) = stack.pop() {
            match *tree.node(id) {
                HuffmanNode::Leaf { symbol, .. } => {
                    let code = if prefix.is_empty() {
                        bitvec![u8, Msb0; 0]
                    } else {
                        prefix
                    };
                    codes[symbol as usize] = Some(Codeword(code));
                    symbols += 1;
                }
                HuffmanNode::Internal { left, right, .. } => {
                    let mut right_prefix = prefix.clone();
                    right_prefix.push(true);
                    stack.push((right, right_prefix));

                    let mut left_prefix = prefix;
                    left_prefix.push(false);
                    stack.push((left, left_prefix));
                }
            }
        }

        Self { codes, symbols }
    }

    /// Returns the code for `symbol`, if the symbol was in the alphabet.
    pub fn get(&self, symbol: Symbol) -> Option<&Codeword> {
        self.codes[symbol as usize].as_ref()
    }

    /// Number of symbols with a code
    pub fn len(&self) -> usize {
        self.symbols
    }

    pub fn is_empty(&self) -> bool {
        self.symbols == 0
    }

    /// Iterates `(symbol, code)` in ascending symbol order.
    pub fn iter(&self) -> impl Iterator<Item = (Symbol, &Codeword)> + '_ {
        self.codes
            .iter()
            .enumerate()
            .filter_map(|(symbol, code)| code.as_ref().map(|code| (symbol as Symbol, code)))
    }

    /// Checks that no code is a prefix of another.
    pub fn is_prefix_free(&self) -> bool {
        let codes: Vec<&Codeword> = self.iter().map(|(_, code)| code).collect();
        codes.iter().enumerate().all(|(i, a)| {
            codes
                .iter()
                .enumerate()
                .all(|(j, b)| i == j || !a.is_prefix_of(b))
        })
    }

    /// Appends the codes for every symbol in `content` to `out`.
    ///
    /// # Returns
    ///
    /// An error if `content` holds a symbol the table has no code for
    pub fn encode_into(&self, content: &[u8], out: &mut Bits) -> Result<()> {
        for &symbol in content {
            let code = self.get(symbol).ok_or_else(|| {
                Error::InvalidInput(format!("No code for symbol 0x{:02x}", symbol))
            })?;
            out.extend_from_bitslice(code.bits());
        }
        Ok(())
    }

    /// Encodes `content` into a fresh bit sequence.
    pub fn encode(&self, content: &[u8]) -> Result<Bits> {
        let mut out = Bits::new();
        self.encode_into(content, &mut out)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::frequency::FrequencyMap;

    fn table_for(content: &[u8]) -> CodeTable {
        let tree = HuffmanTree::build(&FrequencyMap::count(content)).unwrap();
        CodeTable::from_tree(&tree)
    }

    #[test]
    fn test_one_code_per_symbol() {
        let input = b"this is an example for huffman encoding";
        let table = table_for(input);
        for &symbol in input.iter() {
            assert!(table.get(symbol).is_some(), "Missing code for '{}'", symbol as char);
        }
        assert_eq!(table.len(), FrequencyMap::count(input).len());
        assert!(table.is_prefix_free());
    }

    #[test]
    fn test_tie_break_codes() {
        let freq = FrequencyMap::from_counts([(b'A', 2), (b'B', 2), (b'C', 3)]);
        let first = CodeTable::from_tree(&HuffmanTree::build(&freq).unwrap());
        let second = CodeTable::from_tree(&HuffmanTree::build(&freq).unwrap());
        assert_eq!(first, second);
        assert_eq!(first.get(b'C').unwrap().to_string(), "0");
        assert_eq!(first.get(b'A').unwrap().to_string(), "10");
        assert_eq!(first.get(b'B').unwrap().to_string(), "11");
    }

    #[test]
    fn test_single_symbol_gets_one_bit() {
        let table = table_for(b"AAAA");
        let code = table.get(b'A').unwrap();
        assert_eq!(code.len(), 1);
        assert_eq!(code.to_string(), "0");
        assert_eq!(table.encode(b"AAAA").unwrap().len(), 4);
    }

    #[test]
    fn test_encode_unknown_symbol() {
        let table = table_for(b"abc");
        assert!(matches!(
            table.encode(b"abd"),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_encode_then_tree_decode() {
        let input = b"huffman coding in rust is fun!";
        let tree = HuffmanTree::build(&FrequencyMap::count(input)).unwrap();
        let table = CodeTable::from_tree(&tree);
        let encoded = table.encode(input).unwrap();
        assert_eq!(tree.decode(&encoded).unwrap(), input.to_vec());
    }
}
