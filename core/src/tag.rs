//! The DICOM attribute tag type and its predicates.

use snafu::{ensure, OptionExt, Snafu};
use std::fmt;
use std::str::FromStr;

/// Idiomatic alias for a tag's group number.
pub type GroupNumber = u16;
/// Idiomatic alias for a tag's element number.
pub type ElementNumber = u16;

/// The identifier of a DICOM data element: a (group, element) pair
/// of 16-bit numbers, totally ordered by group first, element second.
///
/// A tag can be packed into a single 32-bit key (`group` in the high
/// half-word) and recovered from it.
///
/// ```
/// # use dcmio_core::Tag;
/// let tag = Tag(0x0010, 0x0020);
/// assert_eq!(tag.key(), 0x0010_0020);
/// assert_eq!(Tag::from_key(0x0010_0020), tag);
/// assert!(Tag(0x0008, 0x0018) < tag);
/// ```
#[derive(PartialEq, Eq, Hash, PartialOrd, Ord, Clone, Copy)]
pub struct Tag(pub GroupNumber, pub ElementNumber);

impl Tag {
    /// Getter for the tag's group number.
    #[inline]
    pub fn group(self) -> GroupNumber {
        self.0
    }

    /// Getter for the tag's element number.
    #[inline]
    pub fn element(self) -> ElementNumber {
        self.1
    }

    /// Pack the tag into its 32-bit key form,
    /// with the group number in the most significant half-word.
    #[inline]
    pub fn key(self) -> u32 {
        (u32::from(self.0) << 16) | u32::from(self.1)
    }

    /// Recover a tag from its 32-bit key form.
    #[inline]
    pub fn from_key(key: u32) -> Self {
        Tag((key >> 16) as u16, key as u16)
    }

    /// Whether the tag lives in a private group
    /// (odd group number other than zero).
    #[inline]
    pub fn is_private(self) -> bool {
        self.0 & 1 == 1
    }

    /// Whether the tag reserves a private block:
    /// a private group with an element number between 0x0010 and 0x00FF.
    #[inline]
    pub fn is_private_creator(self) -> bool {
        self.is_private() && (0x0010..=0x00FF).contains(&self.1)
    }

    /// Whether the tag is a private data element,
    /// belonging to a block reserved by some private creator.
    #[inline]
    pub fn is_private_data(self) -> bool {
        self.is_private() && self.1 >= 0x1000
    }

    /// The private block number of a private data element tag,
    /// or `None` if this is not a private data element.
    #[inline]
    pub fn block_number(self) -> Option<u8> {
        if self.is_private_data() {
            Some((self.1 >> 8) as u8)
        } else {
            None
        }
    }

    /// Whether the tag belongs to the file meta information group (0002).
    #[inline]
    pub fn is_file_meta(self) -> bool {
        self.0 == 0x0002
    }

    /// Whether the tag is a group length element (element number 0000).
    #[inline]
    pub fn is_group_length(self) -> bool {
        self.1 == 0x0000
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Tag({:#06X?}, {:#06X?})", self.0, self.1)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({:04X},{:04X})", self.0, self.1)
    }
}

impl From<(u16, u16)> for Tag {
    #[inline]
    fn from(value: (u16, u16)) -> Tag {
        Tag(value.0, value.1)
    }
}

impl From<[u16; 2]> for Tag {
    #[inline]
    fn from(value: [u16; 2]) -> Tag {
        Tag(value[0], value[1])
    }
}

impl PartialEq<(u16, u16)> for Tag {
    fn eq(&self, other: &(u16, u16)) -> bool {
        self.0 == other.0 && self.1 == other.1
    }
}

/// An error parsing a textual tag form.
#[derive(Debug, Snafu, PartialEq)]
#[snafu(display("invalid tag text `{text}`"))]
pub struct InvalidTagText {
    /// the text which failed to parse
    pub text: String,
}

impl FromStr for Tag {
    type Err = InvalidTagText;

    /// Parse a tag from the forms `GGGG,EEEE` or `(GGGG,EEEE)`,
    /// with the numbers in hexadecimal.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let inner = s
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
            .unwrap_or(s);
        let (group, element) = inner.split_once(',').context(InvalidTagTextSnafu { text: s })?;
        ensure!(
            group.len() == 4 && element.len() == 4,
            InvalidTagTextSnafu { text: s }
        );
        let group = u16::from_str_radix(group, 16).ok();
        let element = u16::from_str_radix(element.trim(), 16).ok();
        match (group, element) {
            (Some(g), Some(e)) => Ok(Tag(g, e)),
            _ => InvalidTagTextSnafu { text: s }.fail(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Tag;

    #[test]
    fn tag_ordering_and_key() {
        let t = Tag(0x0028, 0x0010);
        assert_eq!(t.key(), 0x0028_0010);
        assert_eq!(Tag::from_key(0x0028_0010), t);
        assert!(Tag(0x0008, 0xFFFF) < Tag(0x0028, 0x0000));
        assert!(Tag(0x0028, 0x0010) < Tag(0x0028, 0x0011));
    }

    #[test]
    fn private_predicates() {
        let creator = Tag(0x0029, 0x0010);
        assert!(creator.is_private());
        assert!(creator.is_private_creator());
        assert!(!creator.is_private_data());
        assert_eq!(creator.block_number(), None);

        let data = Tag(0x0029, 0x1020);
        assert!(data.is_private());
        assert!(!data.is_private_creator());
        assert!(data.is_private_data());
        assert_eq!(data.block_number(), Some(0x10));

        assert!(!Tag(0x0028, 0x0010).is_private());
    }

    #[test]
    fn meta_and_group_length_predicates() {
        assert!(Tag(0x0002, 0x0010).is_file_meta());
        assert!(!Tag(0x0008, 0x0018).is_file_meta());
        assert!(Tag(0x0008, 0x0000).is_group_length());
    }

    #[test]
    fn tag_from_text() {
        assert_eq!("0010,0020".parse(), Ok(Tag(0x0010, 0x0020)));
        assert_eq!("(7FE0,0010)".parse(), Ok(Tag(0x7FE0, 0x0010)));
        assert!("(10,20)".parse::<Tag>().is_err());
        assert!("bogus".parse::<Tag>().is_err());
    }
}
