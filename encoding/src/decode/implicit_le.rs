//! Element header decoding for Implicit VR Little Endian,
//! which resolves value representations through the data dictionary.

use crate::decode::{
    BadItemHeaderSnafu, Decode, DecodeFrom, ReadItemHeaderSnafu, ReadLengthSnafu, ReadTagSnafu,
    Result,
};
use byteordered::byteorder::{ByteOrder, LittleEndian};
use dcmio_core::dictionary::{DataDictionary, StandardDictionary};
use dcmio_core::header::{DataElementHeader, Length, SequenceItemHeader};
use dcmio_core::{Tag, VR};
use snafu::ResultExt;
use std::io::Read;

/// A data element header decoder for the Implicit VR Little Endian
/// transfer syntax, parameterized over the dictionary used to resolve
/// value representations. Tags absent from the dictionary decode as UN,
/// except pixel data, which decodes as OW.
#[derive(Debug, Default, Clone)]
pub struct ImplicitVRLittleEndianDecoder<D = StandardDictionary> {
    dict: D,
}

impl<D> ImplicitVRLittleEndianDecoder<D>
where
    D: DataDictionary,
{
    /// Create a decoder with the given dictionary.
    pub fn with_dictionary(dict: D) -> Self {
        ImplicitVRLittleEndianDecoder { dict }
    }

    fn resolve_vr(&self, tag: Tag, length: Length) -> VR {
        if tag == Tag(0x7FE0, 0x0010) {
            return VR::OW;
        }
        match self.dict.vr_of(tag) {
            // an undefined length forces a sequence interpretation,
            // whatever the dictionary believes
            Some(VR::UN) | None if length.is_undefined() => VR::SQ,
            Some(vr) => vr,
            None => VR::UN,
        }
    }
}

impl<D> Decode for ImplicitVRLittleEndianDecoder<D>
where
    D: DataDictionary,
{
    fn decode_header<S>(&self, source: &mut S) -> Result<(DataElementHeader, usize)>
    where
        S: ?Sized + Read,
    {
        let tag = Decode::decode_tag(self, source)?;
        let mut buf = [0u8; 4];
        source.read_exact(&mut buf).context(ReadLengthSnafu { tag })?;
        let length = Length(LittleEndian::read_u32(&buf));

        let vr = if tag.group() == 0xFFFE {
            VR::UN
        } else {
            self.resolve_vr(tag, length)
        };
        Ok((DataElementHeader::new(tag, vr, length), 8))
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

impl<S: ?Sized, D> DecodeFrom<S> for ImplicitVRLittleEndianDecoder<D>
where
    S: Read,
    D: DataDictionary,
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
    use super::ImplicitVRLittleEndianDecoder;
    use crate::decode::Decode;
    use dcmio_core::header::{Header, Length};
    use dcmio_core::{Tag, VR};
    use std::io::Cursor;

    // (0010,0010) length 8, "Doe^John"; (0028,0010) length 2
    const RAW: &[u8] = &[
        0x10, 0x00, 0x10, 0x00, 0x08, 0x00, 0x00, 0x00, b'D', b'o', b'e', b'^', b'J', b'o', b'h',
        b'n', 0x28, 0x00, 0x10, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00, 0x02,
    ];

    #[test]
    fn resolves_vr_from_dictionary() {
        let dec = ImplicitVRLittleEndianDecoder::<dcmio_core::dictionary::StandardDictionary>::default();
        let mut cursor = Cursor::new(RAW);

        let (elem, bytes_read) = dec.decode_header(&mut cursor).unwrap();
        assert_eq!(elem.tag(), Tag(0x0010, 0x0010));
        assert_eq!(elem.vr(), VR::PN);
        assert_eq!(elem.length(), Length(8));
        assert_eq!(bytes_read, 8);

        let mut value = [0u8; 8];
        std::io::Read::read_exact(&mut cursor, &mut value).unwrap();

        let (elem, _) = dec.decode_header(&mut cursor).unwrap();
        assert_eq!(elem.tag(), Tag(0x0028, 0x0010));
        assert_eq!(elem.vr(), VR::US);
    }

    #[test]
    fn unknown_tag_decodes_as_un() {
        // (0029,1001), private, length 2
        let raw = [0x29u8, 0x00, 0x01, 0x10, 0x02, 0x00, 0x00, 0x00, 0xAA, 0xBB];
        let dec = ImplicitVRLittleEndianDecoder::<dcmio_core::dictionary::StandardDictionary>::default();
        let (elem, _) = dec.decode_header(&mut Cursor::new(&raw[..])).unwrap();
        assert_eq!(elem.vr(), VR::UN);
    }

    #[test]
    fn pixel_data_decodes_as_ow() {
        let raw = [0xE0u8, 0x7F, 0x10, 0x00, 0x04, 0x00, 0x00, 0x00, 1, 2, 3, 4];
        let dec = ImplicitVRLittleEndianDecoder::<dcmio_core::dictionary::StandardDictionary>::default();
        let (elem, _) = dec.decode_header(&mut Cursor::new(&raw[..])).unwrap();
        assert_eq!(elem.tag(), Tag(0x7FE0, 0x0010));
        assert_eq!(elem.vr(), VR::OW);
    }
}
