//! Element header decoding for Explicit VR Little Endian.

use crate::decode::{
    BadItemHeaderSnafu, Decode, DecodeFrom, ReadItemHeaderSnafu, ReadLengthSnafu, ReadTagSnafu,
    ReadVrSnafu, Result,
};
use byteordered::byteorder::{ByteOrder, LittleEndian};
use dcmio_core::header::{DataElementHeader, Length, SequenceItemHeader};
use dcmio_core::vr::HeaderKind;
use dcmio_core::{Tag, VR};
use snafu::ResultExt;
use std::io::Read;

/// A data element header decoder for the Explicit VR Little Endian
/// transfer syntax.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExplicitVRLittleEndianDecoder;

impl Decode for ExplicitVRLittleEndianDecoder {
    fn decode_header<S>(&self, source: &mut S) -> Result<(DataElementHeader, usize)>
    where
        S: ?Sized + Read,
    {
        let tag = Decode::decode_tag(self, source)?;

        let mut buf = [0u8; 4];
        if tag.group() == 0xFFFE {
            // item delimitation tags carry no VR nor reserved bytes
            source.read_exact(&mut buf).context(ReadLengthSnafu { tag })?;
            let len = LittleEndian::read_u32(&buf);
            return Ok((DataElementHeader::new(tag, VR::UN, Length(len)), 8));
        }

        source
            .read_exact(&mut buf[0..2])
            .context(ReadVrSnafu { tag })?;
        let vr = VR::from_binary([buf[0], buf[1]]).unwrap_or(VR::UN);

        let (len, bytes_read) = match vr.header_kind() {
            HeaderKind::Long => {
                // 2 reserved bytes, then a 4-byte length
                source
                    .read_exact(&mut buf[0..2])
                    .context(ReadLengthSnafu { tag })?;
                source.read_exact(&mut buf).context(ReadLengthSnafu { tag })?;
                (LittleEndian::read_u32(&buf), 12)
            }
            HeaderKind::Short => {
                source
                    .read_exact(&mut buf[0..2])
                    .context(ReadLengthSnafu { tag })?;
                (u32::from(LittleEndian::read_u16(&buf[0..2])), 8)
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
        let group = LittleEndian::read_u16(&buf[0..2]);
        let element = LittleEndian::read_u16(&buf[2..4]);
        let len = LittleEndian::read_u32(&buf[4..8]);
        SequenceItemHeader::new((group, element), Length(len)).context(BadItemHeaderSnafu)
    }

    fn decode_tag<S>(&self, source: &mut S) -> Result<Tag>
    where
        S: ?Sized + Read,
    {
        let mut buf = [0u8; 4];
        source.read_exact(&mut buf).context(ReadTagSnafu)?;
        Ok(Tag(
            LittleEndian::read_u16(&buf[0..2]),
            LittleEndian::read_u16(&buf[2..4]),
        ))
    }
}

impl<S: ?Sized> DecodeFrom<S> for ExplicitVRLittleEndianDecoder
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
    use super::ExplicitVRLittleEndianDecoder;
    use crate::decode::Decode;
    use dcmio_core::header::{Header, Length};
    use dcmio_core::{Tag, VR};
    use std::io::{Cursor, Read, Seek, SeekFrom};

    // two UI elements:
    //  (0002,0002) UI, length 26, "1.2.840.10008.5.1.4.1.1.1\0"
    //  (0002,0010) UI, length 20, "1.2.840.10008.1.2.1\0"
    const RAW: &[u8; 62] = &[
        0x02, 0x00, 0x02, 0x00, 0x55, 0x49, 0x1a, 0x00, 0x31, 0x2e, 0x32, 0x2e, 0x38, 0x34, 0x30,
        0x2e, 0x31, 0x30, 0x30, 0x30, 0x38, 0x2e, 0x35, 0x2e, 0x31, 0x2e, 0x34, 0x2e, 0x31, 0x2e,
        0x31, 0x2e, 0x31, 0x00, 0x02, 0x00, 0x10, 0x00, 0x55, 0x49, 0x14, 0x00, 0x31, 0x2e, 0x32,
        0x2e, 0x38, 0x34, 0x30, 0x2e, 0x31, 0x30, 0x30, 0x30, 0x38, 0x2e, 0x31, 0x2e, 0x32, 0x2e,
        0x31, 0x00,
    ];

    #[test]
    fn decode_two_elements() {
        let dec = ExplicitVRLittleEndianDecoder;
        let mut cursor = Cursor::new(RAW.as_ref());
        let (elem, bytes_read) = dec.decode_header(&mut cursor).unwrap();
        assert_eq!(elem.tag(), Tag(0x0002, 0x0002));
        assert_eq!(elem.vr(), VR::UI);
        assert_eq!(elem.length(), Length(26));
        assert_eq!(bytes_read, 8);

        let mut value = [0u8; 26];
        cursor.read_exact(&mut value).unwrap();

        let (elem, _) = dec.decode_header(&mut cursor).unwrap();
        assert_eq!(elem.tag(), Tag(0x0002, 0x0010));
        assert_eq!(elem.length(), Length(20));
    }

    // (0008,103F) SQ, reserved, undefined length; then item, item
    // delimiter and sequence delimiter
    const RAW_SEQUENCE_ITEMS: &[u8] = &[
        0x08, 0x00, 0x3F, 0x10, b'S', b'Q', 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE, 0xFF, 0x00,
        0xE0, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE, 0xFF, 0x0D, 0xE0, 0x00, 0x00, 0x00, 0x00, 0xFE, 0xFF,
        0xDD, 0xE0, 0x00, 0x00, 0x00, 0x00,
    ];

    #[test]
    fn decode_sequence_markers() {
        let dec = ExplicitVRLittleEndianDecoder;
        let mut cursor = Cursor::new(RAW_SEQUENCE_ITEMS);
        let (elem, bytes_read) = dec.decode_header(&mut cursor).unwrap();
        assert_eq!(elem.tag(), Tag(0x0008, 0x103F));
        assert_eq!(elem.vr(), VR::SQ);
        assert!(elem.length().is_undefined());
        assert_eq!(bytes_read, 12);

        let item = dec.decode_item_header(&mut cursor).unwrap();
        assert!(item.is_item());
        assert!(item.length().is_undefined());
        assert_eq!(cursor.seek(SeekFrom::Current(0)).unwrap(), 20);

        let delim = dec.decode_item_header(&mut cursor).unwrap();
        assert!(delim.is_item_delimiter());

        let end = dec.decode_item_header(&mut cursor).unwrap();
        assert!(end.is_sequence_delimiter());
    }
}
