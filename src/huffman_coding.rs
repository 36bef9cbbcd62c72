#![forbid(unsafe_code)]

use std::io::Read;

use crate::bit_reader::BitReader;
use crate::error::{GzipError, Result};

////////////////////////////////////////////////////////////////////////////////

pub const MAX_CODE_LENGTH: usize = 15;
pub const MAX_LL_SYMBOLS: usize = 288;
pub const NUM_DIST_SYMBOLS: usize = 30;

const MAX_CODEBOOK_SYMBOLS: usize = MAX_LL_SYMBOLS + 1;
const PRIMARY_BITS: u32 = 9;

////////////////////////////////////////////////////////////////////////////////

/// Canonical Huffman codes, one `(bitcode, length)` pair per symbol.
/// Symbols with length 0 keep bitcode 0 and are never decodable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CanonicalCode {
    codes: Vec<(u32, u32)>,
    max_length: u32,
}

impl CanonicalCode {
    /// See RFC 1951, section 3.2.2.
    pub fn from_lengths(lengths: &[u8]) -> Result<Self> {
        if lengths.len() > MAX_CODEBOOK_SYMBOLS {
            return Err(GzipError::InvalidCodeLengths);
        }

        /* 1. Count codes of each length. */
        let mut bl_count = [0_u32; MAX_CODE_LENGTH + 1];
        let mut max_length = 0_u32;

        for &len in lengths {
            if len as usize > MAX_CODE_LENGTH {
                return Err(GzipError::InvalidCodeLengths);
            }
            bl_count[len as usize] += 1;
            max_length = max_length.max(len.into());
        }

        if max_length == 0 {
            return Err(GzipError::InvalidCodeLengths);
        }

        /* 2. Smallest code of each length. */
        bl_count[0] = 0;
        let mut left = 1_i64;
        for &count in &bl_count[1..] {
            left = (left << 1) - i64::from(count);
            if left < 0 {
                return Err(GzipError::InvalidCodeLengths);
            }
        }

        let mut next_code = [0_u32; MAX_CODE_LENGTH + 1];
        let mut code = 0_u32;
        for bits in 1..=max_length as usize {
            code = (code + bl_count[bits - 1]) << 1;
            next_code[bits] = code;
        }

        /* 3. Hand codes out to symbols in ascending order. */
        let codes = lengths
            .iter()
            .map(|&len| {
                let len = len as usize;
                if len == 0 {
                    return (0, 0);
                }
                let code = next_code[len];
                next_code[len] += 1;
                (code, len as u32)
            })
            .collect();

        Ok(Self { codes, max_length })
    }

    pub fn fixed_litlen() -> Result<Self> {
        // See RFC 1951, section 3.2.6.
        let mut lengths = [0_u8; MAX_LL_SYMBOLS];
        lengths[..144].fill(8);
        lengths[144..256].fill(9);
        lengths[256..280].fill(7);
        lengths[280..].fill(8);
        Self::from_lengths(&lengths)
    }

    pub fn fixed_distance() -> Result<Self> {
        Self::from_lengths(&[5; NUM_DIST_SYMBOLS])
    }

    pub fn max_length(&self) -> u32 {
        self.max_length
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn get(&self, symbol: usize) -> Option<(u32, u32)> {
        self.codes.get(symbol).copied()
    }
}

////////////////////////////////////////////////////////////////////////////////

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Entry {
    // Symbol, or the secondary region offset when `length > primary_bits`.
    value: u32,
    length: u32,
}

/// Two-level lookup decoder. The primary table is indexed by the next
/// `primary_bits` input bits; codes longer than that point into secondary
/// regions appended after it.
#[derive(Clone, Debug)]
pub struct HuffmanTable {
    lookup: Vec<Entry>,
    primary_bits: u32,
    primary_mask: u32,
    secondary_mask: u32,
}

impl HuffmanTable {
    pub fn new(code: &CanonicalCode) -> Self {
        let max_length = code.max_length();
        let primary_bits = max_length.min(PRIMARY_BITS);
        let secondary_bits = max_length - primary_bits;
        let primary_mask = (1 << primary_bits) - 1;
        let secondary_mask = (1 << secondary_bits) - 1;

        let mut lookup = vec![Entry::default(); 1 << primary_bits];

        for (symbol, &(bitcode, length)) in code.codes.iter().enumerate() {
            if length == 0 {
                continue;
            }

            // Codes are MSB-first, input arrives LSB-first.
            let reversed = bitcode.reverse_bits() >> (32 - length);
            let entry = Entry {
                value: symbol as u32,
                length,
            };

            if length <= primary_bits {
                for high in 0..(1_u32 << (primary_bits - length)) {
                    lookup[(reversed | (high << length)) as usize] = entry;
                }
                continue;
            }

            let slot = (reversed & primary_mask) as usize;
            let offset = if lookup[slot].length > primary_bits {
                lookup[slot].value as usize
            } else {
                let offset = lookup.len();
                lookup[slot] = Entry {
                    value: offset as u32,
                    length,
                };
                lookup.resize(offset + (1 << secondary_bits), Entry::default());
                offset
            };

            let tail_len = length - primary_bits;
            let base = offset + ((reversed >> primary_bits) & secondary_mask) as usize;
            for high in 0..(1_usize << (max_length - length)) {
                lookup[base + (high << tail_len)] = entry;
            }
        }

        Self {
            lookup,
            primary_bits,
            primary_mask,
            secondary_mask,
        }
    }

    pub fn from_lengths(lengths: &[u8]) -> Result<Self> {
        Ok(Self::new(&CanonicalCode::from_lengths(lengths)?))
    }

    /// A table without any code; every lookup fails. Stands in for a
    /// distance alphabet whose lengths are all zero.
    pub fn empty() -> Self {
        Self {
            lookup: vec![Entry::default()],
            primary_bits: 0,
            primary_mask: 0,
            secondary_mask: 0,
        }
    }

    /// Resolves `(symbol, code length)` from a window of upcoming bits.
    pub fn decode(&self, bits: u32) -> Result<(u32, u32)> {
        let entry = self.lookup[(bits & self.primary_mask) as usize];
        if entry.length == 0 {
            return Err(GzipError::HuffmanDecoderCodeNotFound);
        }
        if entry.length <= self.primary_bits {
            return Ok((entry.value, entry.length));
        }

        let idx = entry.value + ((bits >> self.primary_bits) & self.secondary_mask);
        match self.lookup[idx as usize] {
            Entry { length: 0, .. } => Err(GzipError::HuffmanDecoderCodeNotFound),
            Entry { value, length } => Ok((value, length)),
        }
    }

    pub fn read_symbol<T: Read>(&self, reader: &mut BitReader<T>) -> Result<u32> {
        let (symbol, length) = self.decode(reader.peek_bits()?)?;
        reader.consume(length);
        Ok(symbol)
    }
}

////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    fn reversed(code: &CanonicalCode, symbol: usize) -> (u32, u32) {
        let (bitcode, length) = code.get(symbol).unwrap();
        (bitcode.reverse_bits() >> (32 - length), length)
    }

    fn assert_roundtrip(lengths: &[u8]) -> Result<()> {
        let code = CanonicalCode::from_lengths(lengths)?;
        let table = HuffmanTable::new(&code);

        for (symbol, &len) in lengths.iter().enumerate() {
            if len == 0 {
                continue;
            }
            let (bits, length) = reversed(&code, symbol);
            for garbage in [0_u32, 0xFFFF_FFFF, 0xA5A5_A5A5] {
                let window = bits | (garbage << length);
                assert_eq!(table.decode(window)?, (symbol as u32, length));
            }
        }
        Ok(())
    }

    #[test]
    fn from_lengths() -> Result<()> {
        let code = CanonicalCode::from_lengths(&[2, 3, 4, 3, 3, 4, 2])?;

        assert_eq!(code.get(0), Some((0b00, 2)));
        assert_eq!(code.get(1), Some((0b100, 3)));
        assert_eq!(code.get(2), Some((0b1110, 4)));
        assert_eq!(code.get(3), Some((0b101, 3)));
        assert_eq!(code.get(4), Some((0b110, 3)));
        assert_eq!(code.get(5), Some((0b1111, 4)));
        assert_eq!(code.get(6), Some((0b01, 2)));
        assert_eq!(code.max_length(), 4);

        Ok(())
    }

    #[test]
    fn from_lengths_with_zeros() -> Result<()> {
        let code = CanonicalCode::from_lengths(&[3, 4, 5, 5, 0, 0, 6, 6, 4, 0, 6, 0, 7])?;

        assert_eq!(code.get(0), Some((0b000, 3)));
        assert_eq!(code.get(1), Some((0b0010, 4)));
        assert_eq!(code.get(4), Some((0, 0)));
        assert_eq!(code.get(8), Some((0b0011, 4)));
        assert_eq!(code.get(12), Some((0b0101110, 7)));

        Ok(())
    }

    #[test]
    fn rejects_bad_lengths() {
        assert!(matches!(
            CanonicalCode::from_lengths(&[]),
            Err(GzipError::InvalidCodeLengths)
        ));
        assert!(matches!(
            CanonicalCode::from_lengths(&[0, 0, 0]),
            Err(GzipError::InvalidCodeLengths)
        ));
        assert!(matches!(
            CanonicalCode::from_lengths(&[1, 16]),
            Err(GzipError::InvalidCodeLengths)
        ));
        assert!(matches!(
            CanonicalCode::from_lengths(&[9; 290]),
            Err(GzipError::InvalidCodeLengths)
        ));
    }

    #[test]
    fn rejects_oversubscribed_lengths() -> Result<()> {
        assert!(matches!(
            CanonicalCode::from_lengths(&[1, 1, 1]),
            Err(GzipError::InvalidCodeLengths)
        ));
        assert!(matches!(
            CanonicalCode::from_lengths(&[2, 3, 4, 3, 3, 4, 2, 4]),
            Err(GzipError::InvalidCodeLengths)
        ));

        let mut lengths = vec![15_u8; 1 << 8];
        lengths[0] = 1;
        lengths[1] = 1;
        assert!(matches!(
            CanonicalCode::from_lengths(&lengths),
            Err(GzipError::InvalidCodeLengths)
        ));

        // Complete and incomplete sets are fine.
        CanonicalCode::from_lengths(&[1, 1])?;
        CanonicalCode::from_lengths(&[1, 0, 2])?;
        Ok(())
    }

    #[test]
    fn read_symbol() -> Result<()> {
        let table = HuffmanTable::from_lengths(&[2, 3, 4, 3, 3, 4, 2])?;
        let data: &[u8] = &[0b10111001, 0b11001010, 0b11101101, 0, 0, 0];
        let mut reader = BitReader::new(data);

        assert_eq!(table.read_symbol(&mut reader)?, 1);
        assert_eq!(table.read_symbol(&mut reader)?, 2);
        assert_eq!(table.read_symbol(&mut reader)?, 3);
        assert_eq!(table.read_symbol(&mut reader)?, 6);
        assert_eq!(table.read_symbol(&mut reader)?, 0);
        assert_eq!(table.read_symbol(&mut reader)?, 2);
        assert_eq!(table.read_symbol(&mut reader)?, 4);

        Ok(())
    }

    #[test]
    fn single_level_roundtrip() -> Result<()> {
        assert_roundtrip(&[2, 3, 4, 3, 3, 4, 2])?;
        assert_roundtrip(&[3, 4, 5, 5, 0, 0, 6, 6, 4, 0, 6, 0, 7])?;

        let table = HuffmanTable::new(&CanonicalCode::fixed_litlen()?);
        let code = CanonicalCode::fixed_litlen()?;
        for symbol in [0, 143, 144, 255, 256, 279, 280, 287] {
            let (bits, length) = reversed(&code, symbol);
            assert_eq!(table.decode(bits)?, (symbol as u32, length));
        }
        Ok(())
    }

    #[test]
    fn two_level_roundtrip() -> Result<()> {
        let mut lengths: Vec<u8> = (1..=15).collect();
        lengths.push(15);
        assert_roundtrip(&lengths)?;

        let mut lengths = vec![0_u8; 40];
        lengths[..8].fill(4);
        lengths[8..12].fill(10);
        lengths[12..20].fill(12);
        lengths[20..24].fill(13);
        lengths[33] = 11;
        lengths[39] = 11;
        assert_roundtrip(&lengths)
    }

    #[test]
    fn unused_slot() -> Result<()> {
        let table = HuffmanTable::from_lengths(&[1, 0, 2])?;
        assert_eq!(table.decode(0b0)?, (0, 1));
        assert_eq!(table.decode(0b01)?, (2, 2));
        assert!(matches!(
            table.decode(0b11),
            Err(GzipError::HuffmanDecoderCodeNotFound)
        ));

        let mut lengths = vec![1_u8, 0, 0];
        lengths.push(12);
        let table = HuffmanTable::from_lengths(&lengths)?;
        assert!(matches!(
            table.decode(0xFFF),
            Err(GzipError::HuffmanDecoderCodeNotFound)
        ));

        assert!(matches!(
            HuffmanTable::empty().decode(0),
            Err(GzipError::HuffmanDecoderCodeNotFound)
        ));
        Ok(())
    }
}
