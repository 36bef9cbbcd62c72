#![forbid(unsafe_code)]

use std::io::{self, Read};

use crc::Digest;
use tracing::debug;

use crate::config::{DecompressOptions, Mode};
use crate::error::{GzipError, Result};
use crate::gzip::{MemberFooter, MemberHeader, CRC_CODER};
use crate::pipeline::Pipeline;
use crate::producer::{Produce, Producer};

////////////////////////////////////////////////////////////////////////////////

/// Byte-oriented reader over a gzip stream. Members are concatenated
/// transparently; each footer is checked against the bytes handed out
/// since the previous one. The first error is final: every later `read`
/// returns it again.
pub struct Decompressor<T> {
    pipeline: Pipeline<T>,
    buf: Vec<u8>,
    begin: usize,
    crc_digest: Digest<'static, u32>,
    size: u32,
    headers: Vec<MemberHeader>,
    failed: Option<GzipError>,
}

impl<T: Read + Send + 'static> Decompressor<T> {
    pub fn new(stream: T, options: DecompressOptions) -> Result<Self> {
        let producer = Producer::new(stream, &options);
        let pipeline = match options.mode {
            Mode::SingleThread => Pipeline::inline(producer),
            Mode::Pipelined => Pipeline::spawn(producer, options.channel_capacity)?,
        };
        Ok(Self::with_pipeline(pipeline))
    }
}

impl<T: Read> Decompressor<T> {
    /// Single-thread decompressor without the `Send + 'static` bounds.
    pub fn single_thread(stream: T, options: &DecompressOptions) -> Self {
        Self::with_pipeline(Pipeline::inline(Producer::new(stream, options)))
    }

    fn with_pipeline(pipeline: Pipeline<T>) -> Self {
        Self {
            pipeline,
            buf: Vec::new(),
            begin: 0,
            crc_digest: CRC_CODER.digest(),
            size: 0,
            headers: Vec::new(),
            failed: None,
        }
    }

    /// Headers of the members started so far.
    pub fn headers(&self) -> &[MemberHeader] {
        &self.headers
    }

    /// Fills `out` with decoded bytes. Returns 0 only once the stream is
    /// exhausted.
    pub fn read(&mut self, out: &mut [u8]) -> Result<usize> {
        if let Some(err) = &self.failed {
            return Err(err.clone());
        }

        let mut nbytes = 0;
        loop {
            let n = (out.len() - nbytes).min(self.buf.len() - self.begin);
            out[nbytes..nbytes + n].copy_from_slice(&self.buf[self.begin..self.begin + n]);
            nbytes += n;
            self.begin += n;

            if nbytes == out.len() {
                break;
            }
            match self.fill_buf() {
                Ok(0) => break,
                Ok(_) => {}
                Err(err) => {
                    debug!(%err, "decompression failed");
                    self.failed = Some(err.clone());
                    return Err(err);
                }
            }
        }
        Ok(nbytes)
    }

    fn fill_buf(&mut self) -> Result<usize> {
        loop {
            let Some(produce) = self.pipeline.next_produce()? else {
                return Ok(0);
            };

            match produce {
                Produce::Header(header) => self.headers.push(header),
                Produce::Footer(footer) => self.check_footer(footer)?,
                Produce::Data(data) => {
                    if data.is_empty() {
                        continue;
                    }
                    self.crc_digest.update(&data);
                    self.size = self.size.wrapping_add(data.len() as u32);
                    self.buf = data;
                    self.begin = 0;
                    return Ok(self.buf.len());
                }
            }
        }
    }

    fn check_footer(&mut self, footer: MemberFooter) -> Result<()> {
        let crc32 = std::mem::replace(&mut self.crc_digest, CRC_CODER.digest()).finalize();
        let size = std::mem::take(&mut self.size);

        if crc32 != footer.data_crc32 {
            return Err(GzipError::ChecksumMismatch {
                expected: footer.data_crc32,
                actual: crc32,
            });
        }
        if size != footer.data_size {
            return Err(GzipError::SizeMismatch {
                expected: footer.data_size,
                actual: size,
            });
        }

        debug!(member = self.headers.len(), crc32, size, "member verified");
        Ok(())
    }
}

impl<T: Read> Read for Decompressor<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Decompressor::read(self, buf).map_err(io::Error::from)
    }
}

////////////////////////////////////////////////////////////////////////////////
