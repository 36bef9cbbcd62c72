#![forbid(unsafe_code)]

use std::io::{self, Read};

use byteorder::{ByteOrder, LittleEndian};

use crate::config::MIN_INPUT_BUFFER_SIZE;
use crate::error::{GzipError, Result};

////////////////////////////////////////////////////////////////////////////////

/// Buffered LSB-first bit view over a byte source.
///
/// The cursor is `(begin, nbits)`: the byte offset into the internal buffer
/// plus the number of bits (0..8) already consumed from that byte.
pub struct BitReader<T> {
    stream: T,
    buf: Vec<u8>,
    begin: usize,
    cap: usize,
    nbits: u32,
}

impl<T: Read> BitReader<T> {
    pub fn new(stream: T) -> Self {
        Self::with_capacity(stream, MIN_INPUT_BUFFER_SIZE)
    }

    pub fn with_capacity(stream: T, capacity: usize) -> Self {
        Self {
            stream,
            buf: vec![0; capacity.max(MIN_INPUT_BUFFER_SIZE)],
            begin: 0,
            cap: 0,
            nbits: 0,
        }
    }

    /// Returns the next 32 bits (at least 25 of them meaningful), next bit
    /// to consume in the lowest position. Needs four whole bytes ahead of
    /// the cursor.
    pub fn peek_bits(&mut self) -> Result<u32> {
        while self.cap - self.begin < 4 {
            if self.fill_buf()? == 0 {
                return Err(GzipError::UnexpectedEof);
            }
        }

        let word = LittleEndian::read_u32(&self.buf[self.begin..self.begin + 4]);
        Ok(word >> self.nbits)
    }

    pub fn consume(&mut self, n: u32) {
        debug_assert!(n as usize <= self.bit_len());

        self.nbits += n;
        self.begin += (self.nbits / 8) as usize;
        self.nbits %= 8;
    }

    pub fn byte_align(&mut self) {
        if self.nbits > 0 {
            self.nbits = 0;
            self.begin += 1;
        }
    }

    pub fn read_bits(&mut self, n: u32) -> Result<u32> {
        debug_assert!(n <= 24);
        if n == 0 {
            return Ok(0);
        }

        let bits = self.peek_bits()?;
        self.consume(n);
        Ok(bits & ((1 << n) - 1))
    }

    pub fn has_data_left(&mut self) -> Result<bool> {
        Ok(self.cap > self.begin || self.fill_buf()? != 0)
    }

    /// Byte-aligns, then fills `out` from the buffer and the source. Short
    /// only at end of stream.
    pub fn read(&mut self, out: &mut [u8]) -> Result<usize> {
        self.byte_align();

        let len = out.len().min(self.cap - self.begin);
        out[..len].copy_from_slice(&self.buf[self.begin..self.begin + len]);
        self.begin += len;

        let mut total = len;
        while total < out.len() {
            match self.stream.read(&mut out[total..]) {
                Ok(0) => break,
                Ok(n) => total += n,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Ok(total)
    }

    pub fn read_exact(&mut self, out: &mut [u8]) -> Result<()> {
        if self.read(out)? != out.len() {
            return Err(GzipError::UnexpectedEof);
        }
        Ok(())
    }

    /// Byte-aligns, then moves bytes into `acc` up to and including
    /// `delimiter` (or up to end of stream). Returns the number of bytes moved.
    /// Fails with `SizeTooLarge` once more than `limit` bytes would be moved;
    /// the source is not read past the buffer holding the offending byte.
    pub fn read_until(
        &mut self,
        delimiter: u8,
        acc: &mut Vec<u8>,
        limit: usize,
    ) -> Result<usize> {
        self.byte_align();

        let mut total = 0;
        loop {
            let pending = &self.buf[self.begin..self.cap];
            match pending.iter().position(|&b| b == delimiter) {
                Some(pos) => {
                    if total + pos + 1 > limit {
                        return Err(GzipError::SizeTooLarge);
                    }
                    acc.extend_from_slice(&pending[..=pos]);
                    self.begin += pos + 1;
                    return Ok(total + pos + 1);
                }
                None => {
                    if total + pending.len() > limit {
                        return Err(GzipError::SizeTooLarge);
                    }
                    acc.extend_from_slice(pending);
                    total += pending.len();
                    self.begin = self.cap;
                    if self.fill_buf()? == 0 {
                        return Ok(total);
                    }
                }
            }
        }
    }

    fn bit_len(&self) -> usize {
        (self.cap - self.begin) * 8 - self.nbits as usize
    }

    fn fill_buf(&mut self) -> Result<usize> {
        self.buf.copy_within(self.begin..self.cap, 0);
        self.cap -= self.begin;
        self.begin = 0;

        loop {
            match self.stream.read(&mut self.buf[self.cap..]) {
                Ok(n) => {
                    self.cap += n;
                    return Ok(n);
                }
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
