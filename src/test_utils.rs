//! Bit-level stream builders shared by the unit tests.

use crate::gzip::CRC_CODER;

#[derive(Default)]
pub struct BitWriter {
    bytes: Vec<u8>,
    nbits: u32,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `n` bits of `value`, least significant first.
    pub fn put(&mut self, value: u32, n: u32) {
        for i in 0..n {
            self.push_bit((value >> i) & 1);
        }
    }

    /// Appends a Huffman code, most significant bit first.
    pub fn put_code(&mut self, code: u32, n: u32) {
        for i in (0..n).rev() {
            self.push_bit((code >> i) & 1);
        }
    }

    /// Appends a literal/length symbol with the fixed code.
    pub fn put_fixed(&mut self, symbol: u32) {
        match symbol {
            0..=143 => self.put_code(0x30 + symbol, 8),
            144..=255 => self.put_code(0x190 + symbol - 144, 9),
            256..=279 => self.put_code(symbol - 256, 7),
            _ => self.put_code(0xc0 + symbol - 280, 8),
        }
    }

    pub fn align(&mut self) {
        self.nbits = 0;
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.align();
        self.bytes.extend_from_slice(bytes);
    }

    pub fn finish(self) -> Vec<u8> {
        self.bytes
    }

    fn push_bit(&mut self, bit: u32) {
        if self.nbits == 0 {
            self.bytes.push(0);
        }
        if let Some(last) = self.bytes.last_mut() {
            *last |= (bit as u8) << self.nbits;
        }
        self.nbits = (self.nbits + 1) % 8;
    }
}

/// Wraps a raw deflate stream into a gzip member with a correct footer.
pub fn gzip_member(deflate: &[u8], payload: &[u8]) -> Vec<u8> {
    let mut member = vec![0x1f, 0x8b, 8, 0, 0, 0, 0, 0, 0, 255];
    member.extend_from_slice(deflate);
    member.extend_from_slice(&CRC_CODER.checksum(payload).to_le_bytes());
    member.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    member
}

/// A final fixed-code block: literal 'A' then `<length 5, distance 1>`.
pub fn six_a_block() -> Vec<u8> {
    let mut writer = BitWriter::new();
    writer.put(1, 1);
    writer.put(1, 2);
    writer.put_fixed(u32::from(b'A'));
    writer.put_fixed(259);
    writer.put_code(0, 5);
    writer.put_fixed(256);
    writer.finish()
}

/// A final fixed-code block producing `1 + 258 * matches` bytes of 'A'.
pub fn long_run_block(matches: usize) -> Vec<u8> {
    let mut writer = BitWriter::new();
    writer.put(1, 1);
    writer.put(1, 2);
    writer.put_fixed(u32::from(b'A'));
    for _ in 0..matches {
        writer.put_fixed(285);
        writer.put_code(0, 5);
    }
    writer.put_fixed(256);
    writer.finish()
}
