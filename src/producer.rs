#![forbid(unsafe_code)]

use std::io::Read;
use std::mem;
use std::sync::Arc;

use byteorder::{ByteOrder, LittleEndian};
use tracing::debug;

use crate::bit_reader::BitReader;
use crate::config::DecompressOptions;
use crate::deflate::{decode, BlockHeader, CodeReader, CompressionType};
use crate::error::{GzipError, Result};
use crate::gzip::{read_footer, read_header, MemberFooter, MemberHeader};
use crate::huffman_coding::{CanonicalCode, HuffmanTable};
use crate::sliding_window::SlidingWindow;

////////////////////////////////////////////////////////////////////////////////

// See RFC 1951, section 3.2.7.
const CODE_LENGTH_ORDER: [usize; 19] = [
    16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15,
];

type Tables = (Arc<HuffmanTable>, Arc<HuffmanTable>);

/// One step of output from the member state machine.
#[derive(Debug)]
pub enum Produce {
    Header(MemberHeader),
    Footer(MemberFooter),
    Data(Vec<u8>),
}

enum State {
    Header,
    BlockHeader,
    Inflate {
        is_final: bool,
        litlen: Arc<HuffmanTable>,
        dist: Arc<HuffmanTable>,
    },
    Footer,
    Done,
}

impl State {
    fn after_block(is_final: bool) -> Self {
        if is_final {
            State::Footer
        } else {
            State::BlockHeader
        }
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Drives gzip members header → blocks → footer, one event per call, looping
/// over concatenated members. A failure ends the sequence.
pub struct Producer<T> {
    reader: BitReader<T>,
    window: SlidingWindow,
    state: State,
    members: usize,
    fixed: Option<Tables>,
    max_header_field: usize,
}

impl<T: Read> Producer<T> {
    pub fn new(stream: T, options: &DecompressOptions) -> Self {
        Self {
            reader: BitReader::with_capacity(stream, options.input_buffer_size),
            window: SlidingWindow::with_capacity(options.window_capacity),
            state: State::Header,
            members: 0,
            fixed: None,
            max_header_field: options.max_header_field,
        }
    }

    pub fn members(&self) -> usize {
        self.members
    }

    pub fn next_produce(&mut self) -> Result<Option<Produce>> {
        match mem::replace(&mut self.state, State::Done) {
            State::Header => {
                if !self.reader.has_data_left()? {
                    if self.members == 0 {
                        return Err(GzipError::EmptyInput);
                    }
                    debug!(members = self.members, "end of input");
                    return Ok(None);
                }

                let header = read_header(&mut self.reader, self.max_header_field)?;
                self.members += 1;
                self.window.reset();
                debug!(
                    member = self.members,
                    name = ?header.name_lossy(),
                    mtime = header.modification_time,
                    "member header"
                );

                self.state = State::BlockHeader;
                Ok(Some(Produce::Header(header)))
            }
            State::BlockHeader => self.read_block().map(Some),
            State::Inflate {
                is_final,
                litlen,
                dist,
            } => self.inflate(is_final, litlen, dist).map(Some),
            State::Footer => {
                let footer = read_footer(&mut self.reader)?;
                debug!(
                    crc32 = footer.data_crc32,
                    size = footer.data_size,
                    "member footer"
                );

                self.state = State::Header;
                Ok(Some(Produce::Footer(footer)))
            }
            State::Done => Ok(None),
        }
    }

    fn read_block(&mut self) -> Result<Produce> {
        let header = BlockHeader::read(&mut self.reader)?;
        debug!(is_final = header.is_final, kind = ?header.compression_type, "block");

        match header.compression_type {
            CompressionType::Uncompressed => {
                let data = self.read_stored()?;
                self.state = State::after_block(header.is_final);
                Ok(Produce::Data(data))
            }
            CompressionType::FixedTree => {
                let (litlen, dist) = self.fixed_tables()?;
                self.inflate(header.is_final, litlen, dist)
            }
            CompressionType::DynamicTree => {
                let (litlen, dist) = self.read_dynamic_codebook()?;
                self.inflate(header.is_final, Arc::new(litlen), Arc::new(dist))
            }
            CompressionType::Reserved => Err(GzipError::InvalidBlockType),
        }
    }

    fn read_stored(&mut self) -> Result<Vec<u8>> {
        let mut lens = [0_u8; 4];
        self.reader.read_exact(&mut lens)?;
        let len = LittleEndian::read_u16(&lens[..2]);
        let nlen = LittleEndian::read_u16(&lens[2..]);
        if len ^ nlen != 0xffff {
            return Err(GzipError::BlockType0LenMismatch);
        }

        let mut data = Vec::with_capacity(len.into());
        let mut remaining = usize::from(len);
        while remaining > 0 {
            let n = remaining.min(self.window.write_buffer().len());
            self.reader.read_exact(&mut self.window.write_buffer()[..n])?;
            data.extend_from_slice(self.window.pending(n));
            self.window.slide(n);
            remaining -= n;
        }

        Ok(data)
    }

    fn inflate(
        &mut self,
        is_final: bool,
        litlen: Arc<HuffmanTable>,
        dist: Arc<HuffmanTable>,
    ) -> Result<Produce> {
        let boundary = self.window.boundary();
        let mut codes = CodeReader::new(&mut self.reader, &litlen, &dist);
        let result = decode(self.window.buffer(), boundary, &mut codes)?;

        let data = self.window.pending(result.produced).to_vec();
        self.window.slide(result.produced);

        self.state = if result.done {
            State::after_block(is_final)
        } else {
            State::Inflate {
                is_final,
                litlen,
                dist,
            }
        };
        Ok(Produce::Data(data))
    }

    fn fixed_tables(&mut self) -> Result<Tables> {
        if let Some(tables) = &self.fixed {
            return Ok(tables.clone());
        }

        let tables = (
            Arc::new(HuffmanTable::new(&CanonicalCode::fixed_litlen()?)),
            Arc::new(HuffmanTable::new(&CanonicalCode::fixed_distance()?)),
        );
        self.fixed = Some(tables.clone());
        Ok(tables)
    }

    fn read_dynamic_codebook(&mut self) -> Result<(HuffmanTable, HuffmanTable)> {
        let hlit = self.reader.read_bits(5)? as usize + 257;
        let hdist = self.reader.read_bits(5)? as usize + 1;
        let hclen = self.reader.read_bits(4)? as usize + 4;

        let mut cl_lengths = [0_u8; 19];
        for &idx in CODE_LENGTH_ORDER.iter().take(hclen) {
            cl_lengths[idx] = self.reader.read_bits(3)? as u8;
        }
        let cl_table =
            HuffmanTable::from_lengths(&cl_lengths).map_err(|_| GzipError::ReadDynamicCodebook)?;

        let num_codes = hlit + hdist;
        let mut lengths: Vec<u8> = Vec::with_capacity(num_codes);
        while lengths.len() < num_codes {
            let symbol = match cl_table.read_symbol(&mut self.reader) {
                Ok(symbol) => symbol,
                Err(GzipError::HuffmanDecoderCodeNotFound) => {
                    return Err(GzipError::ReadDynamicCodebook)
                }
                Err(err) => return Err(err),
            };

            match symbol {
                0..=15 => lengths.push(symbol as u8),
                16 => {
                    let prev = *lengths.last().ok_or(GzipError::ReadDynamicCodebook)?;
                    let repeat = 3 + self.reader.read_bits(2)? as usize;
                    lengths.resize(lengths.len() + repeat, prev);
                }
                17 => {
                    let repeat = 3 + self.reader.read_bits(3)? as usize;
                    lengths.resize(lengths.len() + repeat, 0);
                }
                18 => {
                    let repeat = 11 + self.reader.read_bits(7)? as usize;
                    lengths.resize(lengths.len() + repeat, 0);
                }
                _ => return Err(GzipError::ReadDynamicCodebook),
            }
        }

        if lengths.len() != num_codes {
            return Err(GzipError::ReadDynamicCodebook);
        }

        let (litlen_lengths, dist_lengths) = lengths.split_at(hlit);
        let litlen = HuffmanTable::from_lengths(litlen_lengths)?;
        let dist = if dist_lengths.iter().all(|&len| len == 0) {
            HuffmanTable::empty()
        } else {
            HuffmanTable::from_lengths(dist_lengths)?
        };

        Ok((litlen, dist))
    }
}

impl<T: Read> Iterator for Producer<T> {
    type Item = Result<Produce>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_produce().transpose()
    }
}

////////////////////////////////////////////////////////////////////////////////
