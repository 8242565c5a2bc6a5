//! DICOM encoding and decoding primitives.
//!
//! This crate implements the byte-level element codecs of PS3.5:
//! implicit VR little endian, explicit VR little endian and explicit VR
//! big endian, in both directions, along with the transfer syntax
//! descriptors that select between them and the specific character set
//! machinery for text values.
pub mod decode;
pub mod encode;
pub mod text;
pub mod transfer_syntax;

pub use byteordered::Endianness;

pub use crate::decode::Decode;
pub use crate::encode::Encode;
pub use crate::text::{SpecificCharacterSet, TextCodec};
pub use crate::transfer_syntax::{Codec, TransferSyntax, TransferSyntaxRegistry};
