//! Transfer syntax descriptors and the built-in registry.
//!
//! A [`TransferSyntax`] names a byte-level encoding of a data set:
//! its endianness, whether value representations are explicit, and how
//! pixel data is packaged. The descriptor constructs the matching
//! element-level decoder and encoder on demand.

use crate::decode::{
    DecodeFrom, ExplicitVRBigEndianDecoder, ExplicitVRLittleEndianDecoder,
    ImplicitVRLittleEndianDecoder,
};
use crate::encode::{
    EncodeTo, ExplicitVRBigEndianEncoder, ExplicitVRLittleEndianEncoder,
    ImplicitVRLittleEndianEncoder,
};
use byteordered::Endianness;
use dcmio_core::uids;
use std::io::{Read, Write};

/// A decoder with its type erased.
pub type DynDecoder<S> = Box<dyn DecodeFrom<S>>;

/// An encoder with its type erased.
pub type DynEncoder<W> = Box<dyn EncodeTo<W>>;

/// How pixel data is packaged under a transfer syntax.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Codec {
    /// Native pixel data; the value is a single uncompressed block.
    None,
    /// Encapsulated pixel data: fragments behind a basic offset table,
    /// compressed in a format identified by the transfer syntax UID.
    Encapsulated,
    /// The whole data set is post-processed in a way this toolkit
    /// cannot decode (e.g. deflated); element decoding is unavailable.
    Unsupported,
}

/// A DICOM transfer syntax specifier.
#[derive(Debug, Copy, Clone)]
pub struct TransferSyntax {
    /// the unique identifier of the transfer syntax
    uid: &'static str,
    /// the descriptive name of the transfer syntax
    name: &'static str,
    /// the byte order of the encoded data
    endianness: Endianness,
    /// whether value representations are encoded explicitly
    explicit_vr: bool,
    /// how pixel data is packaged
    codec: Codec,
}

impl TransferSyntax {
    /// Create a new descriptor from its properties.
    pub const fn new(
        uid: &'static str,
        name: &'static str,
        endianness: Endianness,
        explicit_vr: bool,
        codec: Codec,
    ) -> Self {
        TransferSyntax {
            uid,
            name,
            endianness,
            explicit_vr,
            codec,
        }
    }

    /// The transfer syntax UID.
    pub fn uid(&self) -> &'static str {
        self.uid
    }

    /// The descriptive name of the transfer syntax.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The byte order of encoded data.
    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// Whether value representations are encoded explicitly.
    pub fn explicit_vr(&self) -> bool {
        self.explicit_vr
    }

    /// How pixel data is packaged.
    pub fn codec(&self) -> Codec {
        self.codec
    }

    /// Whether pixel data under this syntax is encapsulated.
    pub fn is_encapsulated(&self) -> bool {
        self.codec == Codec::Encapsulated
    }

    /// Whether data sets in this syntax can be decoded element by
    /// element.
    pub fn can_decode_dataset(&self) -> bool {
        self.codec != Codec::Unsupported
    }

    /// Construct an element header decoder for this transfer syntax,
    /// or `None` if data sets in it cannot be decoded.
    pub fn decoder<S>(&self) -> Option<DynDecoder<S>>
    where
        S: Read + 'static,
    {
        if !self.can_decode_dataset() {
            return None;
        }
        match (self.explicit_vr, self.endianness) {
            (false, Endianness::Little) => {
                Some(Box::new(
                    ImplicitVRLittleEndianDecoder::<dcmio_core::dictionary::StandardDictionary>::default(),
                ))
            }
            (true, Endianness::Little) => Some(Box::new(ExplicitVRLittleEndianDecoder)),
            (true, Endianness::Big) => Some(Box::new(ExplicitVRBigEndianDecoder)),
            // implicit VR big endian was never registered by the standard
            (false, Endianness::Big) => None,
        }
    }

    /// Construct an element header encoder for this transfer syntax,
    /// or `None` if data sets in it cannot be encoded.
    pub fn encoder<W>(&self) -> Option<DynEncoder<W>>
    where
        W: Write + 'static,
    {
        if !self.can_decode_dataset() {
            return None;
        }
        match (self.explicit_vr, self.endianness) {
            (false, Endianness::Little) => Some(Box::new(ImplicitVRLittleEndianEncoder)),
            (true, Endianness::Little) => Some(Box::new(ExplicitVRLittleEndianEncoder)),
            (true, Endianness::Big) => Some(Box::new(ExplicitVRBigEndianEncoder)),
            (false, Endianness::Big) => None,
        }
    }
}

const REGISTRY: &[TransferSyntax] = &[
    TransferSyntax::new(
        uids::IMPLICIT_VR_LITTLE_ENDIAN,
        "Implicit VR Little Endian",
        Endianness::Little,
        false,
        Codec::None,
    ),
    TransferSyntax::new(
        uids::EXPLICIT_VR_LITTLE_ENDIAN,
        "Explicit VR Little Endian",
        Endianness::Little,
        true,
        Codec::None,
    ),
    TransferSyntax::new(
        uids::DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN,
        "Deflated Explicit VR Little Endian",
        Endianness::Little,
        true,
        Codec::Unsupported,
    ),
    TransferSyntax::new(
        uids::EXPLICIT_VR_BIG_ENDIAN,
        "Explicit VR Big Endian",
        Endianness::Big,
        true,
        Codec::None,
    ),
    TransferSyntax::new(
        uids::RLE_LOSSLESS,
        "RLE Lossless",
        Endianness::Little,
        true,
        Codec::Encapsulated,
    ),
    TransferSyntax::new(
        uids::JPEG_BASELINE,
        "JPEG Baseline (Process 1)",
        Endianness::Little,
        true,
        Codec::Encapsulated,
    ),
    TransferSyntax::new(
        uids::JPEG_EXTENDED,
        "JPEG Extended (Process 2 & 4)",
        Endianness::Little,
        true,
        Codec::Encapsulated,
    ),
    TransferSyntax::new(
        uids::JPEG_LOSSLESS,
        "JPEG Lossless (Process 14)",
        Endianness::Little,
        true,
        Codec::Encapsulated,
    ),
    TransferSyntax::new(
        uids::JPEG_LOSSLESS_SV1,
        "JPEG Lossless (Process 14 SV1)",
        Endianness::Little,
        true,
        Codec::Encapsulated,
    ),
    TransferSyntax::new(
        uids::JPEG_LS_LOSSLESS,
        "JPEG-LS Lossless",
        Endianness::Little,
        true,
        Codec::Encapsulated,
    ),
    TransferSyntax::new(
        uids::JPEG_LS_LOSSY,
        "JPEG-LS Lossy",
        Endianness::Little,
        true,
        Codec::Encapsulated,
    ),
    TransferSyntax::new(
        uids::JPEG_2000_LOSSLESS,
        "JPEG 2000 (Lossless Only)",
        Endianness::Little,
        true,
        Codec::Encapsulated,
    ),
    TransferSyntax::new(
        uids::JPEG_2000,
        "JPEG 2000",
        Endianness::Little,
        true,
        Codec::Encapsulated,
    ),
];

/// The built-in registry of supported transfer syntaxes.
#[derive(Debug, Default, Copy, Clone)]
pub struct TransferSyntaxRegistry;

impl TransferSyntaxRegistry {
    /// Obtain a transfer syntax descriptor by its UID.
    /// Trailing NUL padding in `uid` is tolerated.
    pub fn get(uid: &str) -> Option<&'static TransferSyntax> {
        let uid = uid.trim_end_matches('\0').trim();
        REGISTRY.iter().find(|ts| ts.uid == uid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_lookup() {
        let ts = TransferSyntaxRegistry::get("1.2.840.10008.1.2.1\0").unwrap();
        assert_eq!(ts.name(), "Explicit VR Little Endian");
        assert!(ts.explicit_vr());
        assert_eq!(ts.endianness(), Endianness::Little);
        assert!(!ts.is_encapsulated());

        assert!(TransferSyntaxRegistry::get("1.2.3.4").is_none());
    }

    #[test]
    fn encapsulated_syntaxes() {
        for uid in [
            "1.2.840.10008.1.2.5",
            "1.2.840.10008.1.2.4.50",
            "1.2.840.10008.1.2.4.90",
        ] {
            let ts = TransferSyntaxRegistry::get(uid).unwrap();
            assert!(ts.is_encapsulated(), "{}", uid);
        }
    }

    #[test]
    fn decoders_exist_for_uncompressed_syntaxes() {
        let ts = TransferSyntaxRegistry::get("1.2.840.10008.1.2").unwrap();
        assert!(ts.decoder::<std::io::Cursor<Vec<u8>>>().is_some());
        let ts = TransferSyntaxRegistry::get("1.2.840.10008.1.2.1.99").unwrap();
        assert!(ts.decoder::<std::io::Cursor<Vec<u8>>>().is_none());
    }
}
