#![forbid(unsafe_code)]

use std::io;

use thiserror::Error;

////////////////////////////////////////////////////////////////////////////////

#[derive(Error, Debug)]
pub enum GzipError {
    #[error("I/O error: {0}")]
    Io(#[source] io::Error),

    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("requested size is too large")]
    SizeTooLarge,

    #[error("input contains no gzip member")]
    EmptyInput,

    #[error("invalid gzip header")]
    InvalidGzHeader,

    #[error("header crc16 mismatch: expected {expected:#06x}, got {actual:#06x}")]
    HeaderChecksumMismatch { expected: u16, actual: u16 },

    #[error("invalid block type")]
    InvalidBlockType,

    #[error("stored block LEN does not match NLEN")]
    BlockType0LenMismatch,

    #[error("invalid huffman code lengths")]
    InvalidCodeLengths,

    #[error("huffman code not found")]
    HuffmanDecoderCodeNotFound,

    #[error("back-reference distance exceeds decoded history")]
    DistanceTooMuch,

    #[error("end of block not found")]
    EndOfBlockNotFound,

    #[error("malformed dynamic huffman codebook")]
    ReadDynamicCodebook,

    #[error("crc32 mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: u32, actual: u32 },
}

impl From<io::Error> for GzipError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => GzipError::UnexpectedEof,
            _ => GzipError::Io(err),
        }
    }
}

// `io::Error` is not `Clone`; the copy keeps its kind and message.
impl Clone for GzipError {
    fn clone(&self) -> Self {
        match self {
            GzipError::Io(err) => GzipError::Io(io::Error::new(err.kind(), err.to_string())),
            GzipError::UnexpectedEof => GzipError::UnexpectedEof,
            GzipError::SizeTooLarge => GzipError::SizeTooLarge,
            GzipError::EmptyInput => GzipError::EmptyInput,
            GzipError::InvalidGzHeader => GzipError::InvalidGzHeader,
            &GzipError::HeaderChecksumMismatch { expected, actual } => {
                GzipError::HeaderChecksumMismatch { expected, actual }
            }
            GzipError::InvalidBlockType => GzipError::InvalidBlockType,
            GzipError::BlockType0LenMismatch => GzipError::BlockType0LenMismatch,
            GzipError::InvalidCodeLengths => GzipError::InvalidCodeLengths,
            GzipError::HuffmanDecoderCodeNotFound => GzipError::HuffmanDecoderCodeNotFound,
            GzipError::DistanceTooMuch => GzipError::DistanceTooMuch,
            GzipError::EndOfBlockNotFound => GzipError::EndOfBlockNotFound,
            GzipError::ReadDynamicCodebook => GzipError::ReadDynamicCodebook,
            &GzipError::ChecksumMismatch { expected, actual } => {
                GzipError::ChecksumMismatch { expected, actual }
            }
            &GzipError::SizeMismatch { expected, actual } => {
                GzipError::SizeMismatch { expected, actual }
            }
        }
    }
}

impl From<GzipError> for io::Error {
    fn from(err: GzipError) -> Self {
        match err {
            GzipError::Io(inner) => inner,
            GzipError::UnexpectedEof => io::Error::new(io::ErrorKind::UnexpectedEof, err),
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}

pub type Result<T, E = GzipError> = std::result::Result<T, E>;

////////////////////////////////////////////////////////////////////////////////
