//! Encoders for DICOM element headers under the three uncompressed
//! byte-level encodings.

pub mod explicit_be;
pub mod explicit_le;
pub mod implicit_le;

use dcmio_core::header::DataElementHeader;
use dcmio_core::Tag;
use snafu::{Backtrace, Snafu};
use std::io::Write;

pub use self::explicit_be::ExplicitVRBigEndianEncoder;
pub use self::explicit_le::ExplicitVRLittleEndianEncoder;
pub use self::implicit_le::ImplicitVRLittleEndianEncoder;

/// An error encoding an element or item header.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// An element header could not be written out.
    #[snafu(display("could not write header of element {tag}"))]
    WriteHeader {
        /// the element being encoded
        tag: Tag,
        /// the I/O failure
        source: std::io::Error,
        /// the generated backtrace
        backtrace: Backtrace,
    },
    /// An item or delimiter header could not be written out.
    #[snafu(display("could not write item header"))]
    WriteItemHeader {
        /// the I/O failure
        source: std::io::Error,
        /// the generated backtrace
        backtrace: Backtrace,
    },
    /// The element's value is too long for a short-form length field.
    #[snafu(display("value length {length} of element {tag} exceeds the 16-bit length field"))]
    LengthTooLarge {
        /// the element being encoded
        tag: Tag,
        /// the offending length
        length: u32,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// An encoder of element headers under one byte-level encoding.
pub trait Encode {
    /// Encode a data element header, returning the bytes written.
    /// The value data is to be written immediately afterwards.
    fn encode_element_header<W>(&self, to: &mut W, header: DataElementHeader) -> Result<usize>
    where
        W: ?Sized + Write;

    /// Encode an item start header with the given length
    /// (`0xFFFF_FFFF` for a delimited item).
    fn encode_item_header<W>(&self, to: &mut W, len: u32) -> Result<()>
    where
        W: ?Sized + Write;

    /// Encode an item delimiter (FFFE,E00D).
    fn encode_item_delimiter<W>(&self, to: &mut W) -> Result<()>
    where
        W: ?Sized + Write;

    /// Encode a sequence delimiter (FFFE,E0DD).
    fn encode_sequence_delimiter<W>(&self, to: &mut W) -> Result<()>
    where
        W: ?Sized + Write;
}

/// Type-erased form of [`Encode`], bound to one destination type.
pub trait EncodeTo<W: ?Sized + Write> {
    /// Same as [`Encode::encode_element_header`].
    fn encode_element_header(&self, to: &mut W, header: DataElementHeader) -> Result<usize>;

    /// Same as [`Encode::encode_item_header`].
    fn encode_item_header(&self, to: &mut W, len: u32) -> Result<()>;

    /// Same as [`Encode::encode_item_delimiter`].
    fn encode_item_delimiter(&self, to: &mut W) -> Result<()>;

    /// Same as [`Encode::encode_sequence_delimiter`].
    fn encode_sequence_delimiter(&self, to: &mut W) -> Result<()>;
}

impl<W: ?Sized + Write, T> EncodeTo<W> for T
where
    T: Encode,
{
    fn encode_element_header(&self, to: &mut W, header: DataElementHeader) -> Result<usize> {
        Encode::encode_element_header(self, to, header)
    }

    fn encode_item_header(&self, to: &mut W, len: u32) -> Result<()> {
        Encode::encode_item_header(self, to, len)
    }

    fn encode_item_delimiter(&self, to: &mut W) -> Result<()> {
        Encode::encode_item_delimiter(self, to)
    }

    fn encode_sequence_delimiter(&self, to: &mut W) -> Result<()> {
        Encode::encode_sequence_delimiter(self, to)
    }
}
