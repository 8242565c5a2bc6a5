//! Element header encoding for Implicit VR Little Endian.

use crate::encode::{Encode, Result, WriteHeaderSnafu, WriteItemHeaderSnafu};
use byteordered::byteorder::{ByteOrder, LittleEndian};
use dcmio_core::header::DataElementHeader;
use dcmio_core::Tag;
use snafu::ResultExt;
use std::io::Write;

/// A data element header encoder for Implicit VR Little Endian.
/// The VR carried by the header is not encoded.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImplicitVRLittleEndianEncoder;

fn write_tag_and_u32<W>(to: &mut W, tag: Tag, value: u32) -> std::io::Result<()>
where
    W: ?Sized + Write,
{
    let mut buf = [0u8; 8];
    LittleEndian::write_u16(&mut buf[0..2], tag.group());
    LittleEndian::write_u16(&mut buf[2..4], tag.element());
    LittleEndian::write_u32(&mut buf[4..8], value);
    to.write_all(&buf)
}

impl Encode for ImplicitVRLittleEndianEncoder {
    fn encode_element_header<W>(&self, to: &mut W, header: DataElementHeader) -> Result<usize>
    where
        W: ?Sized + Write,
    {
        write_tag_and_u32(to, header.tag, header.length.0)
            .context(WriteHeaderSnafu { tag: header.tag })?;
        Ok(8)
    }

    fn encode_item_header<W>(&self, to: &mut W, len: u32) -> Result<()>
    where
        W: ?Sized + Write,
    {
        write_tag_and_u32(to, Tag(0xFFFE, 0xE000), len).context(WriteItemHeaderSnafu)
    }

    fn encode_item_delimiter<W>(&self, to: &mut W) -> Result<()>
    where
        W: ?Sized + Write,
    {
        write_tag_and_u32(to, Tag(0xFFFE, 0xE00D), 0).context(WriteItemHeaderSnafu)
    }

    fn encode_sequence_delimiter<W>(&self, to: &mut W) -> Result<()>
    where
        W: ?Sized + Write,
    {
        write_tag_and_u32(to, Tag(0xFFFE, 0xE0DD), 0).context(WriteItemHeaderSnafu)
    }
}
