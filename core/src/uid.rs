//! The strict DICOM unique identifier (UID) type.
//!
//! A UID is a dot-separated sequence of numeric components
//! following the ISO/IEC 8824 rules adopted by PS3.5 §9:
//! at most 64 characters in total, every component non-empty,
//! digits only, and no leading zero in a multi-digit component.

use snafu::{ensure, Snafu};
use std::fmt;
use std::str::FromStr;

/// The root of all UIDs minted by the DICOM standard itself.
pub const DICOM_STANDARD_ROOT: &str = "1.2.840.10008";

/// An error from validating a UID string.
#[derive(Debug, Snafu, PartialEq)]
#[non_exhaustive]
pub enum InvalidUid {
    /// The UID has no components at all.
    #[snafu(display("UID is empty"))]
    Empty,
    /// The UID exceeds the 64-character limit.
    #[snafu(display("UID has {len} characters, exceeding the limit of 64"))]
    TooLong {
        /// total character count
        len: usize,
    },
    /// A component between dots is empty
    /// (leading dot, trailing dot, or two consecutive dots).
    #[snafu(display("UID component {index} is empty"))]
    EmptyComponent {
        /// zero-based component index
        index: usize,
    },
    /// A component contains a character other than an ASCII digit.
    #[snafu(display("UID component {index} contains a non-digit character"))]
    NonDigit {
        /// zero-based component index
        index: usize,
    },
    /// A multi-digit component starts with a zero.
    #[snafu(display("UID component {index} has a leading zero"))]
    LeadingZero {
        /// zero-based component index
        index: usize,
    },
}

/// A validated DICOM unique identifier.
///
/// Construction goes through [`Uid::parse`] (or [`FromStr`]),
/// which enforces all PS3.5 §9 syntax rules;
/// a `Uid` in hand is always well formed.
/// Trailing NUL padding bytes, as found in encoded UI values,
/// are trimmed before validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Uid(String);

impl Uid {
    /// Validate the given string as a UID.
    ///
    /// Trailing NUL characters and surrounding whitespace are trimmed,
    /// accommodating the even-length padding of encoded UI values.
    pub fn parse(value: &str) -> Result<Self, InvalidUid> {
        let value = value.trim().trim_end_matches('\0').trim();
        ensure!(!value.is_empty(), EmptySnafu);
        ensure!(value.len() <= 64, TooLongSnafu { len: value.len() });

        for (index, component) in value.split('.').enumerate() {
            ensure!(!component.is_empty(), EmptyComponentSnafu { index });
            ensure!(
                component.bytes().all(|b| b.is_ascii_digit()),
                NonDigitSnafu { index }
            );
            ensure!(
                component.len() == 1 || !component.starts_with('0'),
                LeadingZeroSnafu { index }
            );
        }
        Ok(Uid(value.to_string()))
    }

    /// The UID as a plain string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The parent arc of this UID: all components except the last.
    /// A single-component UID is its own root.
    pub fn root(&self) -> &str {
        match self.0.rfind('.') {
            Some(pos) => &self.0[..pos],
            None => &self.0,
        }
    }

    /// An iterator over the numeric components of this UID.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    /// Whether this UID was minted by the DICOM standard
    /// (under the root 1.2.840.10008).
    pub fn is_dicom_standard(&self) -> bool {
        self.0 == DICOM_STANDARD_ROOT
            || self
                .0
                .strip_prefix(DICOM_STANDARD_ROOT)
                .is_some_and(|rest| rest.starts_with('.'))
    }

    /// Whether this UID identifies a standard transfer syntax
    /// (under the arc 1.2.840.10008.1.2).
    pub fn is_transfer_syntax(&self) -> bool {
        const TS_ARC: &str = "1.2.840.10008.1.2";
        self.0 == TS_ARC
            || self
                .0
                .strip_prefix(TS_ARC)
                .is_some_and(|rest| rest.starts_with('.'))
    }

    /// Whether this UID identifies a standard storage SOP class
    /// (under the arc 1.2.840.10008.5.1.4.1.1).
    pub fn is_sop_class(&self) -> bool {
        const SOP_ARC: &str = "1.2.840.10008.5.1.4.1.1";
        self.0
            .strip_prefix(SOP_ARC)
            .is_some_and(|rest| rest.starts_with('.'))
    }
}

impl FromStr for Uid {
    type Err = InvalidUid;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uid::parse(s)
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Uid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Uid {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Uid {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_uids() {
        let uid = Uid::parse("1.2.840.10008.1.2.1").unwrap();
        assert_eq!(uid.as_str(), "1.2.840.10008.1.2.1");
        assert_eq!(uid.root(), "1.2.840.10008.1.2");
        assert!(uid.is_dicom_standard());
        assert!(uid.is_transfer_syntax());
        assert!(!uid.is_sop_class());

        assert!(Uid::parse("0").is_ok());
        assert!(Uid::parse("1.0.3").is_ok());
    }

    #[test]
    fn trims_padding() {
        let uid = Uid::parse("1.2.840.10008.1.2\0").unwrap();
        assert_eq!(uid, "1.2.840.10008.1.2");
    }

    #[test]
    fn rejects_malformed_uids() {
        assert_eq!(Uid::parse(""), Err(InvalidUid::Empty));
        assert_eq!(
            Uid::parse("1.2.007"),
            Err(InvalidUid::LeadingZero { index: 2 })
        );
        assert_eq!(
            Uid::parse("1..2"),
            Err(InvalidUid::EmptyComponent { index: 1 })
        );
        assert_eq!(
            Uid::parse("1.2."),
            Err(InvalidUid::EmptyComponent { index: 2 })
        );
        assert_eq!(
            Uid::parse(".1.2"),
            Err(InvalidUid::EmptyComponent { index: 0 })
        );
        assert_eq!(Uid::parse("1.2a.3"), Err(InvalidUid::NonDigit { index: 1 }));
        let long = "1.".repeat(40) + "1";
        assert!(matches!(Uid::parse(&long), Err(InvalidUid::TooLong { .. })));
    }

    #[test]
    fn reparse_is_a_fixpoint() {
        let uid = Uid::parse(" 1.2.840.113619.2.5\0").unwrap();
        let again = Uid::parse(uid.as_str()).unwrap();
        assert_eq!(uid, again);
        assert!(!again.is_dicom_standard());
    }

    #[test]
    fn sop_class_detection() {
        let ct = Uid::parse("1.2.840.10008.5.1.4.1.1.2").unwrap();
        assert!(ct.is_sop_class());
        assert!(!ct.is_transfer_syntax());
    }
}
