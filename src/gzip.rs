#![forbid(unsafe_code)]

use std::borrow::Cow;
use std::io::Read;

use byteorder::{ByteOrder, LittleEndian};
use crc::Crc;

use crate::bit_reader::BitReader;
use crate::error::{GzipError, Result};

////////////////////////////////////////////////////////////////////////////////

pub static CRC_CODER: Crc<u32> = Crc::<u32>::new(&crc::CRC_32_ISO_HDLC);

const ID1: u8 = 0x1f;
const ID2: u8 = 0x8b;

const CM_DEFLATE: u8 = 8;

const FTEXT_OFFSET: u8 = 0;
const FHCRC_OFFSET: u8 = 1;
const FEXTRA_OFFSET: u8 = 2;
const FNAME_OFFSET: u8 = 3;
const FCOMMENT_OFFSET: u8 = 4;

const FIXED_HEADER_LEN: usize = 10;

////////////////////////////////////////////////////////////////////////////////

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemberFlags(u8);

impl MemberFlags {
    fn bit(&self, n: u8) -> bool {
        (self.0 >> n) & 1 != 0
    }

    pub fn is_text(&self) -> bool {
        self.bit(FTEXT_OFFSET)
    }

    pub fn has_crc(&self) -> bool {
        self.bit(FHCRC_OFFSET)
    }

    pub fn has_extra(&self) -> bool {
        self.bit(FEXTRA_OFFSET)
    }

    pub fn has_name(&self) -> bool {
        self.bit(FNAME_OFFSET)
    }

    pub fn has_comment(&self) -> bool {
        self.bit(FCOMMENT_OFFSET)
    }
}

////////////////////////////////////////////////////////////////////////////////

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemberHeader {
    pub flags: MemberFlags,
    pub modification_time: u32,
    pub extra_flags: u8,
    pub os: u8,
    pub extra: Option<Vec<u8>>,
    /// Without the terminating NUL.
    pub name: Option<Vec<u8>>,
    pub comment: Option<Vec<u8>>,
    pub crc16: Option<u16>,
    /// Bytes the header occupied on the wire.
    pub size: usize,
}

impl MemberHeader {
    pub fn is_text(&self) -> bool {
        self.flags.is_text()
    }

    pub fn name_lossy(&self) -> Option<Cow<'_, str>> {
        self.name.as_deref().map(String::from_utf8_lossy)
    }

    pub fn comment_lossy(&self) -> Option<Cow<'_, str>> {
        self.comment.as_deref().map(String::from_utf8_lossy)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemberFooter {
    pub data_crc32: u32,
    pub data_size: u32,
}

////////////////////////////////////////////////////////////////////////////////

/// Parses one member header (RFC 1952, section 2.3). `max_field` bounds the
/// NUL-terminated name and comment.
pub fn read_header<T: Read>(reader: &mut BitReader<T>, max_field: usize) -> Result<MemberHeader> {
    let mut head = [0_u8; FIXED_HEADER_LEN];
    reader.read_exact(&mut head)?;

    if head[0] != ID1 || head[1] != ID2 || head[2] != CM_DEFLATE {
        return Err(GzipError::InvalidGzHeader);
    }

    let mut digest = CRC_CODER.digest();
    digest.update(&head);

    let flags = MemberFlags(head[3]);
    let mut header = MemberHeader {
        flags,
        modification_time: LittleEndian::read_u32(&head[4..8]),
        extra_flags: head[8],
        os: head[9],
        size: FIXED_HEADER_LEN,
        ..Default::default()
    };

    if flags.has_extra() {
        let mut xlen = [0_u8; 2];
        reader.read_exact(&mut xlen)?;
        digest.update(&xlen);

        let mut extra = vec![0_u8; LittleEndian::read_u16(&xlen).into()];
        reader.read_exact(&mut extra)?;
        digest.update(&extra);

        header.size += xlen.len() + extra.len();
        header.extra = Some(extra);
    }

    if flags.has_name() {
        let name = read_zero_terminated(reader, max_field)?;
        digest.update(&name);
        header.size += name.len();
        header.name = Some(strip_nul(name));
    }

    if flags.has_comment() {
        let comment = read_zero_terminated(reader, max_field)?;
        digest.update(&comment);
        header.size += comment.len();
        header.comment = Some(strip_nul(comment));
    }

    if flags.has_crc() {
        let mut crc = [0_u8; 2];
        reader.read_exact(&mut crc)?;
        header.size += crc.len();

        let expected = LittleEndian::read_u16(&crc);
        let actual = (digest.finalize() & 0xffff) as u16;
        if expected != actual {
            return Err(GzipError::HeaderChecksumMismatch { expected, actual });
        }
        header.crc16 = Some(expected);
    }

    Ok(header)
}

pub fn read_footer<T: Read>(reader: &mut BitReader<T>) -> Result<MemberFooter> {
    let mut buf = [0_u8; 8];
    reader.read_exact(&mut buf)?;

    Ok(MemberFooter {
        data_crc32: LittleEndian::read_u32(&buf[..4]),
        data_size: LittleEndian::read_u32(&buf[4..]),
    })
}

fn read_zero_terminated<T: Read>(reader: &mut BitReader<T>, max_field: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader.read_until(0, &mut buf, max_field.saturating_add(1))?;

    if buf.last() != Some(&0) {
        return Err(GzipError::UnexpectedEof);
    }
    Ok(buf)
}

fn strip_nul(mut field: Vec<u8>) -> Vec<u8> {
    field.pop();
    field
}

////////////////////////////////////////////////////////////////////////////////
