#![forbid(unsafe_code)]

use std::io::Read;

use crate::bit_reader::BitReader;
use crate::error::{GzipError, Result};
use crate::huffman_coding::HuffmanTable;
use crate::sliding_window::MAX_MATCH;

////////////////////////////////////////////////////////////////////////////////

pub const END_OF_BLOCK: u32 = 256;

// (extra bits, base length) for symbols 257..=285. See RFC 1951, section 3.2.5.
#[rustfmt::skip]
const LENGTH_CODES: [(u32, usize); 29] = [
    (0, 3), (0, 4), (0, 5), (0, 6), (0, 7), (0, 8), (0, 9), (0, 10),
    (1, 11), (1, 13), (1, 15), (1, 17),
    (2, 19), (2, 23), (2, 27), (2, 31),
    (3, 35), (3, 43), (3, 51), (3, 59),
    (4, 67), (4, 83), (4, 99), (4, 115),
    (5, 131), (5, 163), (5, 195), (5, 227),
    (0, 258),
];

// (extra bits, base distance) for symbols 0..=29.
#[rustfmt::skip]
const DISTANCE_CODES: [(u32, usize); 30] = [
    (0, 1), (0, 2), (0, 3), (0, 4),
    (1, 5), (1, 7),
    (2, 9), (2, 13),
    (3, 17), (3, 25),
    (4, 33), (4, 49),
    (5, 65), (5, 97),
    (6, 129), (6, 193),
    (7, 257), (7, 385),
    (8, 513), (8, 769),
    (9, 1025), (9, 1537),
    (10, 2049), (10, 3073),
    (11, 4097), (11, 6145),
    (12, 8193), (12, 12289),
    (13, 16385), (13, 24577),
];

////////////////////////////////////////////////////////////////////////////////

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockHeader {
    pub is_final: bool,
    pub compression_type: CompressionType,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompressionType {
    Uncompressed = 0,
    FixedTree = 1,
    DynamicTree = 2,
    Reserved = 3,
}

impl BlockHeader {
    pub fn read<T: Read>(reader: &mut BitReader<T>) -> Result<Self> {
        let bits = reader.read_bits(3)?;
        let compression_type = match bits >> 1 {
            0 => CompressionType::Uncompressed,
            1 => CompressionType::FixedTree,
            2 => CompressionType::DynamicTree,
            _ => CompressionType::Reserved,
        };

        Ok(Self {
            is_final: bits & 1 != 0,
            compression_type,
        })
    }
}

////////////////////////////////////////////////////////////////////////////////

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Code {
    Literal(u8),
    EndOfBlock,
    Dictionary { distance: usize, length: usize },
}

/// Anything that yields LZ77 codes for one block.
pub trait CodeSource {
    /// `None` means the source ran dry.
    fn next_code(&mut self) -> Result<Option<Code>>;
}

/// Reads codes straight off the bit stream with a pair of block tables.
pub struct CodeReader<'a, T> {
    reader: &'a mut BitReader<T>,
    litlen: &'a HuffmanTable,
    dist: &'a HuffmanTable,
}

impl<'a, T: Read> CodeReader<'a, T> {
    pub fn new(
        reader: &'a mut BitReader<T>,
        litlen: &'a HuffmanTable,
        dist: &'a HuffmanTable,
    ) -> Self {
        Self {
            reader,
            litlen,
            dist,
        }
    }
}

impl<T: Read> CodeSource for CodeReader<'_, T> {
    fn next_code(&mut self) -> Result<Option<Code>> {
        let symbol = self.litlen.read_symbol(self.reader)?;

        let code = match symbol {
            0..=255 => Code::Literal(symbol as u8),
            END_OF_BLOCK => Code::EndOfBlock,
            _ => {
                let &(extra_bits, base) = LENGTH_CODES
                    .get((symbol - END_OF_BLOCK - 1) as usize)
                    .ok_or(GzipError::HuffmanDecoderCodeNotFound)?;
                let length = base + self.reader.read_bits(extra_bits)? as usize;

                let symbol = self.dist.read_symbol(self.reader)?;
                let &(extra_bits, base) = DISTANCE_CODES
                    .get(symbol as usize)
                    .ok_or(GzipError::HuffmanDecoderCodeNotFound)?;
                let distance = base + self.reader.read_bits(extra_bits)? as usize;

                Code::Dictionary { distance, length }
            }
        };

        Ok(Some(code))
    }
}

////////////////////////////////////////////////////////////////////////////////

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecodeResult {
    pub produced: usize,
    pub done: bool,
}

impl DecodeResult {
    fn done(produced: usize) -> Self {
        Self {
            produced,
            done: true,
        }
    }

    fn window_full(produced: usize) -> Self {
        Self {
            produced,
            done: false,
        }
    }
}

/// Decodes codes into `window` from `boundary` on, until the block ends or
/// fewer than `MAX_MATCH + 1` bytes of room remain.
pub fn decode<S: CodeSource>(
    window: &mut [u8],
    boundary: usize,
    source: &mut S,
) -> Result<DecodeResult> {
    let mut idx = boundary;
    if idx + MAX_MATCH >= window.len() {
        return Ok(DecodeResult::window_full(0));
    }

    while let Some(code) = source.next_code()? {
        match code {
            Code::Literal(byte) => {
                window[idx] = byte;
                idx += 1;
            }
            Code::EndOfBlock => return Ok(DecodeResult::done(idx - boundary)),
            Code::Dictionary { distance, length } => {
                if distance > idx {
                    return Err(GzipError::DistanceTooMuch);
                }

                // Each pass doubles the span, tiling short periods forward.
                let begin = idx - distance;
                let mut span = distance;
                let mut remaining = length;
                while remaining > 0 {
                    let n = span.min(remaining);
                    window.copy_within(begin..begin + n, idx);
                    idx += n;
                    span += n;
                    remaining -= n;
                }
            }
        }

        if idx + MAX_MATCH >= window.len() {
            return Ok(DecodeResult::window_full(idx - boundary));
        }
    }

    Err(GzipError::EndOfBlockNotFound)
}

////////////////////////////////////////////////////////////////////////////////
