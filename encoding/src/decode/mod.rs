//! Decoders for DICOM element headers under the three uncompressed
//! byte-level encodings.

pub mod basic;
pub mod explicit_be;
pub mod explicit_le;
pub mod implicit_le;

use dcmio_core::header::{DataElementHeader, InvalidItemHeader, SequenceItemHeader};
use dcmio_core::Tag;
use snafu::{Backtrace, Snafu};
use std::io::Read;

pub use self::explicit_be::ExplicitVRBigEndianDecoder;
pub use self::explicit_le::ExplicitVRLittleEndianDecoder;
pub use self::implicit_le::ImplicitVRLittleEndianDecoder;

/// An error decoding an element or item header from a source.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// The tag of an element header could not be read.
    #[snafu(display("could not read element tag"))]
    ReadTag {
        /// the I/O failure
        source: std::io::Error,
        /// the generated backtrace
        backtrace: Backtrace,
    },
    /// The explicit VR code could not be read.
    #[snafu(display("could not read VR of element {tag}"))]
    ReadVr {
        /// the element being decoded
        tag: Tag,
        /// the I/O failure
        source: std::io::Error,
        /// the generated backtrace
        backtrace: Backtrace,
    },
    /// The value length field could not be read.
    #[snafu(display("could not read length of element {tag}"))]
    ReadLength {
        /// the element being decoded
        tag: Tag,
        /// the I/O failure
        source: std::io::Error,
        /// the generated backtrace
        backtrace: Backtrace,
    },
    /// A sequence item header could not be read.
    #[snafu(display("could not read item header"))]
    ReadItemHeader {
        /// the I/O failure
        source: std::io::Error,
        /// the generated backtrace
        backtrace: Backtrace,
    },
    /// The bytes read do not form a valid sequence item header.
    #[snafu(display("invalid sequence item header"))]
    BadItemHeader {
        /// the interpretation failure
        source: InvalidItemHeader,
        /// the generated backtrace
        backtrace: Backtrace,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A decoder of element headers under one byte-level encoding.
///
/// Besides the header itself, `decode_header` yields the number of
/// bytes consumed, which callers use to maintain their source position.
pub trait Decode {
    /// Decode a data element header from the source.
    /// The value data is not read and is up next in the source.
    fn decode_header<S>(&self, source: &mut S) -> Result<(DataElementHeader, usize)>
    where
        S: ?Sized + Read;

    /// Decode a sequence item, item delimiter or sequence delimiter
    /// header from the source.
    fn decode_item_header<S>(&self, source: &mut S) -> Result<SequenceItemHeader>
    where
        S: ?Sized + Read;

    /// Decode just an attribute tag from the source.
    fn decode_tag<S>(&self, source: &mut S) -> Result<Tag>
    where
        S: ?Sized + Read;
}

/// Type-erased form of [`Decode`], bound to one source type.
pub trait DecodeFrom<S: ?Sized + Read> {
    /// Same as [`Decode::decode_header`].
    fn decode_header(&self, source: &mut S) -> Result<(DataElementHeader, usize)>;

    /// Same as [`Decode::decode_item_header`].
    fn decode_item_header(&self, source: &mut S) -> Result<SequenceItemHeader>;

    /// Same as [`Decode::decode_tag`].
    fn decode_tag(&self, source: &mut S) -> Result<Tag>;
}

impl<S: ?Sized + Read> DecodeFrom<S> for Box<dyn DecodeFrom<S>> {
    fn decode_header(&self, source: &mut S) -> Result<(DataElementHeader, usize)> {
        (**self).decode_header(source)
    }

    fn decode_item_header(&self, source: &mut S) -> Result<SequenceItemHeader> {
        (**self).decode_item_header(source)
    }

    fn decode_tag(&self, source: &mut S) -> Result<Tag> {
        (**self).decode_tag(source)
    }
}
