//! Data element headers: the length type with its undefined-length
//! semantics, the element header, and sequence item headers.

use crate::tag::Tag;
use crate::vr::VR;
use snafu::{ensure, Snafu};
use std::cmp::Ordering;
use std::fmt;

/// A trait for types which carry a DICOM element header.
#[allow(clippy::len_without_is_empty)]
pub trait Header {
    /// The element's attribute tag.
    fn tag(&self) -> Tag;

    /// The value length as declared by the element, in bytes.
    /// May be undefined for sequences and encapsulated pixel data.
    fn length(&self) -> Length;

    /// Whether this is the header of a sequence item.
    fn is_item(&self) -> bool {
        self.tag() == Tag(0xFFFE, 0xE000)
    }

    /// Whether this is the header of an item delimiter.
    fn is_item_delimiter(&self) -> bool {
        self.tag() == Tag(0xFFFE, 0xE00D)
    }

    /// Whether this is the header of a sequence delimiter.
    fn is_sequence_delimiter(&self) -> bool {
        self.tag() == Tag(0xFFFE, 0xE0DD)
    }
}

/// A data element value length in bytes.
///
/// The internal value `0xFFFF_FFFF` stands for an undefined length,
/// to be resolved by traversing the element's content.
/// Comparisons involving an undefined length are always `false`,
/// and arithmetic with one yields an undefined length.
#[derive(Clone, Copy)]
pub struct Length(pub u32);

const UNDEFINED_LEN: u32 = 0xFFFF_FFFF;

impl Length {
    /// A length that is undefined.
    pub const UNDEFINED: Self = Length(UNDEFINED_LEN);

    /// Create a length with a concrete number of bytes.
    ///
    /// # Panics
    ///
    /// Panics if `len` is the undefined length marker.
    pub fn defined(len: u32) -> Self {
        assert_ne!(len, UNDEFINED_LEN);
        Length(len)
    }

    /// Whether this length is undefined.
    #[inline]
    pub fn is_undefined(self) -> bool {
        self.0 == UNDEFINED_LEN
    }

    /// Whether this length holds a concrete byte count.
    #[inline]
    pub fn is_defined(self) -> bool {
        !self.is_undefined()
    }

    /// The concrete length value, or `None` if undefined.
    #[inline]
    pub fn get(self) -> Option<u32> {
        match self.0 {
            UNDEFINED_LEN => None,
            v => Some(v),
        }
    }
}

impl From<u32> for Length {
    fn from(o: u32) -> Self {
        Length(o)
    }
}

impl PartialEq<Length> for Length {
    fn eq(&self, rhs: &Length) -> bool {
        match (self.0, rhs.0) {
            (UNDEFINED_LEN, _) | (_, UNDEFINED_LEN) => false,
            (l1, l2) => l1 == l2,
        }
    }
}

impl PartialOrd<Length> for Length {
    fn partial_cmp(&self, rhs: &Length) -> Option<Ordering> {
        match (self.0, rhs.0) {
            (UNDEFINED_LEN, _) | (_, UNDEFINED_LEN) => None,
            (l1, l2) => Some(l1.cmp(&l2)),
        }
    }
}

impl std::ops::Add<Length> for Length {
    type Output = Self;

    fn add(self, rhs: Length) -> Self::Output {
        match (self.0, rhs.0) {
            (UNDEFINED_LEN, _) | (_, UNDEFINED_LEN) => Length::UNDEFINED,
            (l1, l2) => {
                let o = l1 + l2;
                debug_assert!(
                    o != UNDEFINED_LEN,
                    "integer overflow (0xFFFF_FFFF reserved for undefined length)"
                );
                Length(o)
            }
        }
    }
}

impl std::ops::Add<u32> for Length {
    type Output = Self;

    fn add(self, rhs: u32) -> Self::Output {
        self + Length(rhs)
    }
}

impl fmt::Debug for Length {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.0 {
            UNDEFINED_LEN => f.write_str("Length(Undefined)"),
            l => f.debug_tuple("Length").field(&l).finish(),
        }
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.0 {
            UNDEFINED_LEN => f.write_str("U/L"),
            l => write!(f, "{}", &l),
        }
    }
}

/// The header of a single data element:
/// tag, value representation and declared value length.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct DataElementHeader {
    /// DICOM tag
    pub tag: Tag,
    /// Value representation
    pub vr: VR,
    /// Declared value length
    pub length: Length,
}

impl DataElementHeader {
    /// Create a new data element header from its parts.
    pub fn new<T: Into<Tag>>(tag: T, vr: VR, length: Length) -> DataElementHeader {
        DataElementHeader {
            tag: tag.into(),
            vr,
            length,
        }
    }

    /// The header's value representation.
    pub fn vr(&self) -> VR {
        self.vr
    }
}

impl Header for DataElementHeader {
    fn tag(&self) -> Tag {
        self.tag
    }

    fn length(&self) -> Length {
        self.length
    }
}

/// An error produced when interpreting an element header
/// as a sequence item header.
#[derive(Debug, Snafu, PartialEq)]
pub enum InvalidItemHeader {
    /// The tag is not one of the three item delimitation tags.
    #[snafu(display("tag {tag} is not a sequence item tag"))]
    NotAnItemTag {
        /// the offending tag
        tag: Tag,
    },
    /// An item or sequence delimiter declared a nonzero length.
    #[snafu(display("delimiter {tag} declares a length of {length}"))]
    DelimiterWithLength {
        /// the offending tag
        tag: Tag,
        /// the declared length
        length: Length,
    },
}

/// The header of a sequence item, item delimiter or sequence delimiter.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum SequenceItemHeader {
    /// The start of a new item, with its declared length
    /// (`0xFFFF_FFFF` when the item's extent is delimited).
    Item {
        /// the length of the item in bytes
        len: Length,
    },
    /// An item delimiter; the current item ends here.
    ItemDelimiter,
    /// A sequence delimiter; the enclosing sequence ends here.
    SequenceDelimiter,
}

impl SequenceItemHeader {
    /// Interpret a raw tag and length pair as a sequence item header.
    pub fn new<T: Into<Tag>>(tag: T, len: Length) -> Result<SequenceItemHeader, InvalidItemHeader> {
        match tag.into() {
            Tag(0xFFFE, 0xE000) => Ok(SequenceItemHeader::Item { len }),
            tag @ Tag(0xFFFE, 0xE00D) => {
                ensure!(
                    len.get() == Some(0),
                    DelimiterWithLengthSnafu { tag, length: len }
                );
                Ok(SequenceItemHeader::ItemDelimiter)
            }
            Tag(0xFFFE, 0xE0DD) => Ok(SequenceItemHeader::SequenceDelimiter),
            tag => NotAnItemTagSnafu { tag }.fail(),
        }
    }
}

impl Header for SequenceItemHeader {
    fn tag(&self) -> Tag {
        match *self {
            SequenceItemHeader::Item { .. } => Tag(0xFFFE, 0xE000),
            SequenceItemHeader::ItemDelimiter => Tag(0xFFFE, 0xE00D),
            SequenceItemHeader::SequenceDelimiter => Tag(0xFFFE, 0xE0DD),
        }
    }

    fn length(&self) -> Length {
        match *self {
            SequenceItemHeader::Item { len } => len,
            SequenceItemHeader::ItemDelimiter | SequenceItemHeader::SequenceDelimiter => Length(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_semantics() {
        assert_ne!(Length::UNDEFINED, Length::UNDEFINED);
        assert_eq!(Length(8), Length(8));
        assert!(Length(8) < Length(10));
        assert!(!(Length::UNDEFINED < Length(10)));
        assert!((Length(8) + Length::UNDEFINED).is_undefined());
        assert_eq!(Length(8) + 4, Length(12));
    }

    #[test]
    fn item_headers() {
        let item = SequenceItemHeader::new(Tag(0xFFFE, 0xE000), Length(24)).unwrap();
        assert!(item.is_item());
        assert_eq!(item.length(), Length(24));

        let delim = SequenceItemHeader::new(Tag(0xFFFE, 0xE00D), Length(0)).unwrap();
        assert!(delim.is_item_delimiter());

        assert!(SequenceItemHeader::new(Tag(0xFFFE, 0xE00D), Length(2)).is_err());
        assert!(SequenceItemHeader::new(Tag(0x0008, 0x0018), Length(0)).is_err());
    }
}
