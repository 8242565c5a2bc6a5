//! Basic decoding of primitive integer and floating point values
//! under a fixed byte order.

use byteordered::byteorder::{BigEndian, ByteOrder, LittleEndian};
use byteordered::Endianness;
use std::io::{Read, Result as IoResult};

/// A decoder of primitive multi-byte numbers under one byte order.
pub trait BasicDecode {
    /// The byte order this decoder reads in.
    fn endianness(&self) -> Endianness;

    /// Read an unsigned 16-bit number.
    fn decode_us<S>(&self, source: S) -> IoResult<u16>
    where
        S: Read;

    /// Read an unsigned 32-bit number.
    fn decode_ul<S>(&self, source: S) -> IoResult<u32>
    where
        S: Read;
}

/// Basic decoder in little endian byte order.
#[derive(Debug, Default, Clone, Copy)]
pub struct LittleEndianBasicDecoder;

impl BasicDecode for LittleEndianBasicDecoder {
    fn endianness(&self) -> Endianness {
        Endianness::Little
    }

    fn decode_us<S>(&self, mut source: S) -> IoResult<u16>
    where
        S: Read,
    {
        let mut buf = [0u8; 2];
        source.read_exact(&mut buf)?;
        Ok(LittleEndian::read_u16(&buf))
    }

    fn decode_ul<S>(&self, mut source: S) -> IoResult<u32>
    where
        S: Read,
    {
        let mut buf = [0u8; 4];
        source.read_exact(&mut buf)?;
        Ok(LittleEndian::read_u32(&buf))
    }
}

/// Basic decoder in big endian byte order.
#[derive(Debug, Default, Clone, Copy)]
pub struct BigEndianBasicDecoder;

impl BasicDecode for BigEndianBasicDecoder {
    fn endianness(&self) -> Endianness {
        Endianness::Big
    }

    fn decode_us<S>(&self, mut source: S) -> IoResult<u16>
    where
        S: Read,
    {
        let mut buf = [0u8; 2];
        source.read_exact(&mut buf)?;
        Ok(BigEndian::read_u16(&buf))
    }

    fn decode_ul<S>(&self, mut source: S) -> IoResult<u32>
    where
        S: Read,
    {
        let mut buf = [0u8; 4];
        source.read_exact(&mut buf)?;
        Ok(BigEndian::read_u32(&buf))
    }
}

/// A basic decoder with the byte order chosen at run time.
#[derive(Debug, Clone, Copy)]
pub enum BasicDecoder {
    /// little endian byte order
    Little(LittleEndianBasicDecoder),
    /// big endian byte order
    Big(BigEndianBasicDecoder),
}

impl From<Endianness> for BasicDecoder {
    fn from(endianness: Endianness) -> Self {
        match endianness {
            Endianness::Little => BasicDecoder::Little(LittleEndianBasicDecoder),
            Endianness::Big => BasicDecoder::Big(BigEndianBasicDecoder),
        }
    }
}

impl BasicDecode for BasicDecoder {
    fn endianness(&self) -> Endianness {
        match self {
            BasicDecoder::Little(d) => d.endianness(),
            BasicDecoder::Big(d) => d.endianness(),
        }
    }

    fn decode_us<S>(&self, source: S) -> IoResult<u16>
    where
        S: Read,
    {
        match self {
            BasicDecoder::Little(d) => d.decode_us(source),
            BasicDecoder::Big(d) => d.decode_us(source),
        }
    }

    fn decode_ul<S>(&self, source: S) -> IoResult<u32>
    where
        S: Read,
    {
        match self {
            BasicDecoder::Little(d) => d.decode_ul(source),
            BasicDecoder::Big(d) => d.decode_ul(source),
        }
    }
}
