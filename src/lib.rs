#![forbid(unsafe_code)]

//! A gzip (RFC 1952) / DEFLATE (RFC 1951) decompressor with an optional
//! two-thread pipeline.

use std::io::{Read, Write};

mod bit_reader;
mod config;
mod decompressor;
mod deflate;
mod error;
mod gzip;
mod huffman_coding;
mod pipeline;
mod producer;
mod sliding_window;

#[cfg(test)]
mod test_utils;

pub use bit_reader::BitReader;
pub use config::{DecompressOptions, Mode};
pub use decompressor::Decompressor;
pub use deflate::{decode, BlockHeader, Code, CodeReader, CodeSource, CompressionType, DecodeResult};
pub use error::{GzipError, Result};
pub use gzip::{read_footer, read_header, MemberFlags, MemberFooter, MemberHeader};
pub use huffman_coding::{CanonicalCode, HuffmanTable};
pub use pipeline::{Pipeline, ProducerThread};
pub use producer::{Produce, Producer};
pub use sliding_window::{SlidingWindow, MAX_DISTANCE, MAX_MATCH, MIN_WINDOW_CAPACITY};

const COPY_BUFFER_SIZE: usize = 64 << 10;

/// Decodes the whole of `input` into `output`, returning the number of
/// bytes written.
pub fn decompress<R, W>(input: R, mut output: W, options: DecompressOptions) -> Result<u64>
where
    R: Read + Send + 'static,
    W: Write,
{
    let mut decompressor = Decompressor::new(input, options)?;
    let mut buf = vec![0_u8; COPY_BUFFER_SIZE];
    let mut total = 0_u64;

    loop {
        let n = decompressor.read(&mut buf)?;
        if n == 0 {
            break;
        }
        output.write_all(&buf[..n])?;
        total += n as u64;
    }
    output.flush()?;

    Ok(total)
}
