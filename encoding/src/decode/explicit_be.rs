//! Element header decoding for the retired Explicit VR Big Endian
//! transfer syntax.

use crate::decode::{
    BadItemHeaderSnafu, Decode, DecodeFrom, ReadItemHeaderSnafu, ReadLengthSnafu, ReadTagSnafu,
    ReadVrSnafu, Result,
};
use byteordered::byteorder::{BigEndian, ByteOrder};
use dcmio_core::header::{DataElementHeader, Length, SequenceItemHeader};
use dcmio_core::vr::HeaderKind;
use dcmio_core::{Tag, VR};
use snafu::ResultExt;
use std::io::Read;

/// A data element header decoder for Explicit VR Big Endian.
/// Integers of the header are big endian; the VR code reads the same.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExplicitVRBigEndianDecoder;

impl Decode for ExplicitVRBigEndianDecoder {
    fn decode_header<S>(&self, source: &mut S) -> Result<(DataElementHeader, usize)>
    where
        S: ?Sized + Read,
    {
        let tag = Decode::decode_tag(self, source)?;

        let mut buf = [0u8; 4];
        if tag.group() == 0xFFFE {
            source.read_exact(&mut buf).context(ReadLengthSnafu { tag })?;
            let len = BigEndian::read_u32(&buf);
            return Ok((DataElementHeader::new(tag, VR::UN, Length(len)), 8));
        }

        source
            .read_exact(&mut buf[0..2])
            .context(ReadVrSnafu { tag })?;
        let vr = VR::from_binary([buf[0], buf[1]]).unwrap_or(VR::UN);

        let (len, bytes_read) = match vr.header_kind() {
            HeaderKind::Long => {
                source
                    .read_exact(&mut buf[0..2])
                    .context(ReadLengthSnafu { tag })?;
                source.read_exact(&mut buf).context(ReadLengthSnafu { tag })?;
                (BigEndian::read_u32(&buf), 12)
            }
            HeaderKind::Short => {
                source
                    .read_exact(&mut buf[0..2])
                    .context(ReadLengthSnafu { tag })?;
                (u32::from(BigEndian::read_u16(&buf[0..2])), 8)
            }
        };

        Ok((DataElementHeader::new(tag, vr, Length(len)), bytes_read))
    }

    fn decode_item_header<S>(&self, source: &mut S) -> Result<SequenceItemHeader>
    where
        S: ?Sized + Read,
    {
        let mut buf = [0u8; 8];
        source.read_exact(&mut buf).context(ReadItemHeaderSnafu)?;
        let group = BigEndian::read_u16(&buf[0..2]);
        let element = BigEndian::read_u16(&buf[2..4]);
        let len = BigEndian::read_u32(&buf[4..8]);
        SequenceItemHeader::new((group, element), Length(len)).context(BadItemHeaderSnafu)
    }

    fn decode_tag<S>(&self, source: &mut S) -> Result<Tag>
    where
        S: ?Sized + Read,
    {
        let mut buf = [0u8; 4];
        source.read_exact(&mut buf).context(ReadTagSnafu)?;
        Ok(Tag(
            BigEndian::read_u16(&buf[0..2]),
            BigEndian::read_u16(&buf[2..4]),
        ))
    }
}

impl<S: ?Sized> DecodeFrom<S> for ExplicitVRBigEndianDecoder
where
    S: Read,
{
    #[inline]
    fn decode_header(&self, source: &mut S) -> Result<(DataElementHeader, usize)> {
        Decode::decode_header(self, source)
    }

    #[inline]
    fn decode_item_header(&self, source: &mut S) -> Result<SequenceItemHeader> {
        Decode::decode_item_header(self, source)
    }

    #[inline]
    fn decode_tag(&self, source: &mut S) -> Result<Tag> {
        Decode::decode_tag(self, source)
    }
}

#[cfg(test)]
mod tests {
    use super::ExplicitVRBigEndianDecoder;
    use crate::decode::Decode;
    use dcmio_core::header::{Header, Length};
    use dcmio_core::{Tag, VR};
    use std::io::Cursor;

    // (0028,0010) US, length 2, value 512 (big endian)
    const RAW: &[u8] = &[0x00, 0x28, 0x00, 0x10, b'U', b'S', 0x00, 0x02, 0x02, 0x00];

    #[test]
    fn decode_big_endian_header() {
        let dec = ExplicitVRBigEndianDecoder;
        let mut cursor = Cursor::new(RAW);
        let (elem, bytes_read) = dec.decode_header(&mut cursor).unwrap();
        assert_eq!(elem.tag(), Tag(0x0028, 0x0010));
        assert_eq!(elem.vr(), VR::US);
        assert_eq!(elem.length(), Length(2));
        assert_eq!(bytes_read, 8);
    }

    // (7FE0,0010) OW, reserved, 32-bit length 8 (big endian)
    const RAW_LONG: &[u8] = &[
        0x7F, 0xE0, 0x00, 0x10, b'O', b'W', 0x00, 0x00, 0x00, 0x00, 0x00, 0x08,
    ];

    #[test]
    fn decode_long_header_swaps_length() {
        let dec = ExplicitVRBigEndianDecoder;
        let (elem, bytes_read) = dec.decode_header(&mut Cursor::new(RAW_LONG)).unwrap();
        assert_eq!(elem.tag(), Tag(0x7FE0, 0x0010));
        assert_eq!(elem.vr(), VR::OW);
        assert_eq!(elem.length(), Length(8));
        assert_eq!(bytes_read, 12);
    }
}
