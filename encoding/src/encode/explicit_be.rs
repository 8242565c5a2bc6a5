//! Element header encoding for the retired Explicit VR Big Endian
//! transfer syntax.

use crate::encode::{
    Encode, LengthTooLargeSnafu, Result, WriteHeaderSnafu, WriteItemHeaderSnafu,
};
use byteordered::byteorder::{BigEndian, ByteOrder};
use dcmio_core::header::DataElementHeader;
use dcmio_core::vr::HeaderKind;
use snafu::{ensure, ResultExt};
use std::io::Write;

/// A data element header encoder for Explicit VR Big Endian.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExplicitVRBigEndianEncoder;

impl Encode for ExplicitVRBigEndianEncoder {
    fn encode_element_header<W>(&self, to: &mut W, header: DataElementHeader) -> Result<usize>
    where
        W: ?Sized + Write,
    {
        let tag = header.tag;
        let mut buf = [0u8; 12];
        BigEndian::write_u16(&mut buf[0..2], tag.group());
        BigEndian::write_u16(&mut buf[2..4], tag.element());
        let vr_bytes = header.vr.to_bytes();
        buf[4] = vr_bytes[0];
        buf[5] = vr_bytes[1];

        match header.vr.header_kind() {
            HeaderKind::Long => {
                BigEndian::write_u32(&mut buf[8..12], header.length.0);
                to.write_all(&buf).context(WriteHeaderSnafu { tag })?;
                Ok(12)
            }
            HeaderKind::Short => {
                ensure!(
                    header.length.0 <= u32::from(u16::MAX),
                    LengthTooLargeSnafu {
                        tag,
                        length: header.length.0,
                    }
                );
                BigEndian::write_u16(&mut buf[6..8], header.length.0 as u16);
                to.write_all(&buf[0..8]).context(WriteHeaderSnafu { tag })?;
                Ok(8)
            }
        }
    }

    fn encode_item_header<W>(&self, to: &mut W, len: u32) -> Result<()>
    where
        W: ?Sized + Write,
    {
        let mut buf = [0u8; 8];
        BigEndian::write_u16(&mut buf[0..2], 0xFFFE);
        BigEndian::write_u16(&mut buf[2..4], 0xE000);
        BigEndian::write_u32(&mut buf[4..8], len);
        to.write_all(&buf).context(WriteItemHeaderSnafu)
    }

    fn encode_item_delimiter<W>(&self, to: &mut W) -> Result<()>
    where
        W: ?Sized + Write,
    {
        let mut buf = [0u8; 8];
        BigEndian::write_u16(&mut buf[0..2], 0xFFFE);
        BigEndian::write_u16(&mut buf[2..4], 0xE00D);
        to.write_all(&buf).context(WriteItemHeaderSnafu)
    }

    fn encode_sequence_delimiter<W>(&self, to: &mut W) -> Result<()>
    where
        W: ?Sized + Write,
    {
        let mut buf = [0u8; 8];
        BigEndian::write_u16(&mut buf[0..2], 0xFFFE);
        BigEndian::write_u16(&mut buf[2..4], 0xE0DD);
        to.write_all(&buf).context(WriteItemHeaderSnafu)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcmio_core::header::Length;
    use dcmio_core::{Tag, VR};

    #[test]
    fn encode_big_endian_header() {
        let enc = ExplicitVRBigEndianEncoder;
        let mut out = Vec::new();
        let header = DataElementHeader::new(Tag(0x0028, 0x0010), VR::US, Length(2));
        assert_eq!(enc.encode_element_header(&mut out, header).unwrap(), 8);
        assert_eq!(out, vec![0x00, 0x28, 0x00, 0x10, b'U', b'S', 0x00, 0x02]);
    }
}
