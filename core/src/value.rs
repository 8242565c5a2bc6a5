//! Data elements and their values.
//!
//! A [`DataElement`] couples a header with exactly one of three value forms:
//! inline primitive bytes, a list of nested items (sequences and
//! encapsulated pixel data), or a lazy-load descriptor pointing back into
//! the data source the element was parsed from.
//!
//! Values keep their raw bytes; decoding into strings and numbers happens
//! on request through the typed accessors, which dispatch on the element's
//! value representation and fail with a [`ConvertValue`] error when the
//! representation does not support the requested form. Multi-byte binary
//! values are kept in little endian order regardless of the transfer
//! syntax they were read from.

use crate::dataset::DataSet;
use crate::header::{DataElementHeader, Header, Length};
use crate::tag::Tag;
use crate::uid::{InvalidUid, Uid};
use crate::vr::VR;
use chrono::{NaiveDate, NaiveTime};
use smallvec::SmallVec;
use snafu::{ensure, OptionExt, ResultExt, Snafu};
use std::borrow::Cow;

/// An error from converting an element value into a requested form.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum ConvertValue {
    /// The element holds items, not a primitive value.
    #[snafu(display("element {tag} is not primitive"))]
    NotPrimitive {
        /// the element's tag
        tag: Tag,
    },
    /// The element's VR does not support the requested form.
    #[snafu(display("requested {requested} from element {tag} with VR {vr}"))]
    WrongVr {
        /// the requested target form
        requested: &'static str,
        /// the element's actual VR
        vr: VR,
        /// the element's tag
        tag: Tag,
    },
    /// The element's value was skipped at parse time
    /// and has not been loaded yet.
    #[snafu(display("value of element {tag} is not loaded"))]
    NotLoaded {
        /// the element's tag
        tag: Tag,
    },
    /// The value bytes are not valid character data.
    #[snafu(display("element {tag} does not hold valid text"))]
    InvalidText {
        /// the element's tag
        tag: Tag,
    },
    /// A textual integer value failed to parse.
    #[snafu(display("invalid integer string in element {tag}"))]
    InvalidInteger {
        /// the element's tag
        tag: Tag,
        /// the parse failure
        source: std::num::ParseIntError,
    },
    /// A textual decimal value failed to parse.
    #[snafu(display("invalid decimal string in element {tag}"))]
    InvalidDecimal {
        /// the element's tag
        tag: Tag,
        /// the parse failure
        source: std::num::ParseFloatError,
    },
    /// A UI value is not a well-formed unique identifier.
    #[snafu(display("invalid unique identifier in element {tag}"))]
    InvalidUidValue {
        /// the element's tag
        tag: Tag,
        /// the validation failure
        source: InvalidUid,
    },
    /// A DA or TM value is not a well-formed date or time.
    #[snafu(display("invalid date/time value `{text}` in element {tag}"))]
    InvalidDateTime {
        /// the element's tag
        tag: Tag,
        /// the offending text
        text: String,
    },
    /// A single value was requested from an element with no values.
    #[snafu(display("element {tag} holds no values"))]
    EmptyValue {
        /// the element's tag
        tag: Tag,
    },
}

type Result<T, E = ConvertValue> = std::result::Result<T, E>;

/// A descriptor for a value which was skipped at parse time.
///
/// The descriptor records where the value bytes live in the original data
/// source. It does not own the source; the handle returned by the parser
/// (and held by `dcmio-object`'s file type) must be kept alive to load the
/// bytes later.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LazyValue {
    /// byte offset of the value data in the data source
    pub offset: u64,
    /// value length in bytes
    pub length: u32,
}

/// The value of a data element: exactly one of
/// inline bytes, nested items, pixel-data fragments,
/// or a lazy-load descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum DataValue {
    /// Inline value bytes.
    /// Multi-byte binary values are in little endian order.
    Primitive(Vec<u8>),
    /// The items of a sequence (VR SQ).
    Sequence(Vec<DataSet>),
    /// Encapsulated pixel data:
    /// the basic offset table and the fragment byte strings.
    PixelSequence {
        /// the basic offset table entries (may be empty)
        offset_table: Vec<u32>,
        /// the pixel data fragments
        fragments: Vec<Vec<u8>>,
    },
    /// A value deferred to a later read from the data source.
    Lazy(LazyValue),
}

impl DataValue {
    /// The number of bytes of an inline primitive value,
    /// or `None` for the other forms.
    pub fn primitive_len(&self) -> Option<usize> {
        match self {
            DataValue::Primitive(bytes) => Some(bytes.len()),
            _ => None,
        }
    }
}

/// A single DICOM data element: a header plus its value.
#[derive(Debug, Clone, PartialEq)]
pub struct DataElement {
    header: DataElementHeader,
    value: DataValue,
}

impl Header for DataElement {
    #[inline]
    fn tag(&self) -> Tag {
        self.header.tag
    }

    #[inline]
    fn length(&self) -> Length {
        self.header.length
    }
}

impl DataElement {
    /// Create an element with an inline primitive value.
    /// The header length is set to the byte count of the value.
    pub fn new<T, B>(tag: T, vr: VR, value: B) -> Self
    where
        T: Into<Tag>,
        B: Into<Vec<u8>>,
    {
        let bytes = value.into();
        DataElement {
            header: DataElementHeader::new(tag, vr, Length(bytes.len() as u32)),
            value: DataValue::Primitive(bytes),
        }
    }

    /// Create an element with a text value, encoded as the default
    /// character repertoire. The value is not padded; even-length padding
    /// happens at write time.
    pub fn new_str<T: Into<Tag>>(tag: T, vr: VR, value: &str) -> Self {
        DataElement::new(tag, vr, value.as_bytes().to_vec())
    }

    /// Create an empty element.
    pub fn empty<T: Into<Tag>>(tag: T, vr: VR) -> Self {
        DataElement::new(tag, vr, Vec::new())
    }

    /// Create a sequence element (VR SQ) from its items.
    pub fn new_sequence<T: Into<Tag>>(tag: T, items: Vec<DataSet>) -> Self {
        DataElement {
            header: DataElementHeader::new(tag, VR::SQ, Length::UNDEFINED),
            value: DataValue::Sequence(items),
        }
    }

    /// Create an encapsulated pixel data element (VR OB, undefined length)
    /// from a basic offset table and fragments.
    pub fn new_pixel_sequence<T: Into<Tag>>(
        tag: T,
        offset_table: Vec<u32>,
        fragments: Vec<Vec<u8>>,
    ) -> Self {
        DataElement {
            header: DataElementHeader::new(tag, VR::OB, Length::UNDEFINED),
            value: DataValue::PixelSequence {
                offset_table,
                fragments,
            },
        }
    }

    /// Create an element whose value is deferred to a later source read.
    pub fn new_lazy<T: Into<Tag>>(tag: T, vr: VR, length: Length, offset: u64) -> Self {
        DataElement {
            header: DataElementHeader::new(tag, vr, length),
            value: DataValue::Lazy(LazyValue {
                offset,
                length: length.0,
            }),
        }
    }

    /// Build an element from an already assembled header and value.
    pub fn from_parts(header: DataElementHeader, value: DataValue) -> Self {
        DataElement { header, value }
    }

    /// The element header.
    #[inline]
    pub fn header(&self) -> &DataElementHeader {
        &self.header
    }

    /// The element's value representation.
    #[inline]
    pub fn vr(&self) -> VR {
        self.header.vr
    }

    /// The element's value.
    #[inline]
    pub fn value(&self) -> &DataValue {
        &self.value
    }

    /// Whether the value was deferred and is still unloaded.
    pub fn is_lazy(&self) -> bool {
        matches!(self.value, DataValue::Lazy(_))
    }

    /// Replace a lazy descriptor with the loaded value bytes.
    /// Has no effect on elements which already hold their value.
    pub fn materialize(&mut self, bytes: Vec<u8>) {
        if self.is_lazy() {
            self.header.length = Length(bytes.len() as u32);
            self.value = DataValue::Primitive(bytes);
        }
    }

    /// The inline value bytes.
    pub fn bytes(&self) -> Result<&[u8]> {
        match &self.value {
            DataValue::Primitive(bytes) => Ok(bytes),
            DataValue::Lazy(_) => NotLoadedSnafu { tag: self.tag() }.fail(),
            _ => NotPrimitiveSnafu { tag: self.tag() }.fail(),
        }
    }

    /// The nested items of a sequence element.
    pub fn items(&self) -> Result<&[DataSet]> {
        match &self.value {
            DataValue::Sequence(items) => Ok(items),
            _ => NotPrimitiveSnafu { tag: self.tag() }.fail(),
        }
    }

    /// The fragments of an encapsulated pixel data element.
    pub fn fragments(&self) -> Result<&[Vec<u8>]> {
        match &self.value {
            DataValue::PixelSequence { fragments, .. } => Ok(fragments),
            _ => NotPrimitiveSnafu { tag: self.tag() }.fail(),
        }
    }

    /// The basic offset table of an encapsulated pixel data element.
    pub fn offset_table(&self) -> Result<&[u32]> {
        match &self.value {
            DataValue::PixelSequence { offset_table, .. } => Ok(offset_table),
            _ => NotPrimitiveSnafu { tag: self.tag() }.fail(),
        }
    }

    /// Decode the value as a single string in the default repertoire,
    /// with trailing padding removed.
    ///
    /// Values under a specific character set other than the default
    /// are decoded through `dcmio-encoding`'s text extension instead.
    pub fn to_str(&self) -> Result<Cow<str>> {
        ensure!(
            self.vr().is_text(),
            WrongVrSnafu {
                requested: "str",
                vr: self.vr(),
                tag: self.tag(),
            }
        );
        let bytes = self.bytes()?;
        let text = std::str::from_utf8(bytes)
            .ok()
            .context(InvalidTextSnafu { tag: self.tag() })?;
        Ok(Cow::Borrowed(
            text.trim_end_matches(['\0', ' ']),
        ))
    }

    /// Decode the value as a list of strings,
    /// splitting on the `\` value delimiter.
    pub fn to_strs(&self) -> Result<Vec<String>> {
        let joined = self.to_str()?;
        Ok(joined.split('\\').map(|s| s.trim().to_string()).collect())
    }

    /// Decode a UI value as a validated unique identifier.
    pub fn to_uid(&self) -> Result<Uid> {
        ensure!(
            self.vr() == VR::UI,
            WrongVrSnafu {
                requested: "Uid",
                vr: self.vr(),
                tag: self.tag(),
            }
        );
        let text = self.to_str()?.into_owned();
        Uid::parse(&text).context(InvalidUidValueSnafu { tag: self.tag() })
    }

    /// Read the value as unsigned 16-bit integers (VR US or OW).
    pub fn to_u16s(&self) -> Result<SmallVec<[u16; 2]>> {
        ensure!(
            matches!(self.vr(), VR::US | VR::OW),
            WrongVrSnafu {
                requested: "u16",
                vr: self.vr(),
                tag: self.tag(),
            }
        );
        Ok(self
            .bytes()?
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect())
    }

    /// Read the value as signed 16-bit integers (VR SS).
    pub fn to_i16s(&self) -> Result<SmallVec<[i16; 2]>> {
        ensure!(
            self.vr() == VR::SS,
            WrongVrSnafu {
                requested: "i16",
                vr: self.vr(),
                tag: self.tag(),
            }
        );
        Ok(self
            .bytes()?
            .chunks_exact(2)
            .map(|c| i16::from_le_bytes([c[0], c[1]]))
            .collect())
    }

    /// Read the value as unsigned 32-bit integers (VR UL or OL).
    pub fn to_u32s(&self) -> Result<SmallVec<[u32; 2]>> {
        ensure!(
            matches!(self.vr(), VR::UL | VR::OL),
            WrongVrSnafu {
                requested: "u32",
                vr: self.vr(),
                tag: self.tag(),
            }
        );
        Ok(self
            .bytes()?
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }

    /// Read the value as signed 32-bit integers (VR SL).
    pub fn to_i32s(&self) -> Result<SmallVec<[i32; 2]>> {
        ensure!(
            self.vr() == VR::SL,
            WrongVrSnafu {
                requested: "i32",
                vr: self.vr(),
                tag: self.tag(),
            }
        );
        Ok(self
            .bytes()?
            .chunks_exact(4)
            .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }

    /// Read the value as attribute tags (VR AT).
    pub fn to_tags(&self) -> Result<SmallVec<[Tag; 2]>> {
        ensure!(
            self.vr() == VR::AT,
            WrongVrSnafu {
                requested: "Tag",
                vr: self.vr(),
                tag: self.tag(),
            }
        );
        Ok(self
            .bytes()?
            .chunks_exact(4)
            .map(|c| {
                Tag(
                    u16::from_le_bytes([c[0], c[1]]),
                    u16::from_le_bytes([c[2], c[3]]),
                )
            })
            .collect())
    }

    /// Read the value as 64-bit floating point numbers.
    ///
    /// Accepts the textual number VRs (DS, IS)
    /// as well as the binary numeric VRs,
    /// converting every element of the multi-valued value.
    pub fn to_f64s(&self) -> Result<SmallVec<[f64; 2]>> {
        let tag = self.tag();
        match self.vr() {
            VR::DS => self
                .to_str()?
                .split('\\')
                .map(|s| {
                    s.trim()
                        .parse::<f64>()
                        .context(InvalidDecimalSnafu { tag })
                })
                .collect(),
            VR::IS => self
                .to_str()?
                .split('\\')
                .map(|s| {
                    s.trim()
                        .parse::<i64>()
                        .map(|v| v as f64)
                        .context(InvalidIntegerSnafu { tag })
                })
                .collect(),
            VR::FL | VR::OF => Ok(self
                .bytes()?
                .chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]) as f64)
                .collect()),
            VR::FD | VR::OD => Ok(self
                .bytes()?
                .chunks_exact(8)
                .map(|c| {
                    f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]])
                })
                .collect()),
            VR::US => Ok(self.to_u16s()?.into_iter().map(f64::from).collect()),
            VR::SS => Ok(self.to_i16s()?.into_iter().map(f64::from).collect()),
            VR::UL => Ok(self.to_u32s()?.into_iter().map(f64::from).collect()),
            VR::SL => Ok(self.to_i32s()?.into_iter().map(f64::from).collect()),
            vr => WrongVrSnafu {
                requested: "f64",
                vr,
                tag,
            }
            .fail(),
        }
    }

    /// The first numeric value, as `f64`.
    pub fn to_f64(&self) -> Result<f64> {
        let values = self.to_f64s()?;
        values
            .first()
            .copied()
            .context(EmptyValueSnafu { tag: self.tag() })
    }

    /// The first integer value, from a textual IS
    /// or binary integer element.
    pub fn to_int(&self) -> Result<i64> {
        let tag = self.tag();
        match self.vr() {
            VR::IS => self
                .to_str()?
                .split('\\')
                .next()
                .unwrap_or_default()
                .trim()
                .parse::<i64>()
                .context(InvalidIntegerSnafu { tag }),
            _ => self.to_f64().map(|v| v as i64),
        }
    }

    /// Decode a DA value as a calendar date.
    pub fn to_date(&self) -> Result<NaiveDate> {
        ensure!(
            self.vr() == VR::DA,
            WrongVrSnafu {
                requested: "NaiveDate",
                vr: self.vr(),
                tag: self.tag(),
            }
        );
        let text = self.to_str()?;
        NaiveDate::parse_from_str(text.as_ref(), "%Y%m%d").map_err(|_| {
            ConvertValue::InvalidDateTime {
                tag: self.tag(),
                text: text.into_owned(),
            }
        })
    }

    /// Decode a TM value as a time of day.
    /// Fractional seconds beyond what is given are taken as zero.
    pub fn to_time(&self) -> Result<NaiveTime> {
        ensure!(
            self.vr() == VR::TM,
            WrongVrSnafu {
                requested: "NaiveTime",
                vr: self.vr(),
                tag: self.tag(),
            }
        );
        let text = self.to_str()?;
        let text = text.as_ref();
        parse_tm(text).ok_or_else(|| ConvertValue::InvalidDateTime {
            tag: self.tag(),
            text: text.to_string(),
        })
    }
}

/// Parse a TM value: HH, HHMM or HHMMSS with optional fraction.
/// Components omitted by the value are taken as zero.
fn parse_tm(text: &str) -> Option<NaiveTime> {
    let (whole, fraction) = match text.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (text, ""),
    };
    if !whole.bytes().all(|b| b.is_ascii_digit()) || whole.len() < 2 {
        return None;
    }
    let component = |range: std::ops::Range<usize>| -> Option<u32> {
        match whole.get(range) {
            Some(digits) if !digits.is_empty() => digits.parse().ok(),
            _ => Some(0),
        }
    };
    let hour = component(0..2)?;
    let minute = component(2..4)?;
    let second = component(4..6)?;
    let micro = if fraction.is_empty() {
        0
    } else {
        let padded = format!("{fraction:0<6}");
        padded.get(0..6)?.parse().ok()?
    };
    NaiveTime::from_hms_micro_opt(hour, minute, second, micro)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_access() {
        let e = DataElement::new_str(Tag(0x0010, 0x0010), VR::PN, "Doe^John ");
        assert_eq!(e.to_str().unwrap(), "Doe^John");

        let e = DataElement::new_str(Tag(0x0008, 0x0060), VR::CS, "CT\\PT");
        assert_eq!(e.to_strs().unwrap(), vec!["CT", "PT"]);
    }

    #[test]
    fn wrong_vr_is_an_error() {
        let e = DataElement::new(Tag(0x0028, 0x0010), VR::US, vec![0x00, 0x02]);
        assert!(matches!(e.to_str(), Err(ConvertValue::WrongVr { .. })));
        assert!(matches!(e.to_date(), Err(ConvertValue::WrongVr { .. })));
    }

    #[test]
    fn numeric_access() {
        let e = DataElement::new(Tag(0x0028, 0x0010), VR::US, vec![0x00, 0x02]);
        assert_eq!(e.to_u16s().unwrap().as_slice(), &[512]);
        assert_eq!(e.to_f64s().unwrap().as_slice(), &[512.0]);

        let e = DataElement::new_str(Tag(0x0028, 0x1053), VR::DS, "1.5\\-3");
        assert_eq!(e.to_f64s().unwrap().as_slice(), &[1.5, -3.0]);

        let e = DataElement::new_str(Tag(0x0028, 0x0008), VR::IS, "12");
        assert_eq!(e.to_int().unwrap(), 12);
    }

    #[test]
    fn uid_access() {
        let e = DataElement::new_str(Tag(0x0002, 0x0010), VR::UI, "1.2.840.10008.1.2\0");
        assert_eq!(e.to_uid().unwrap(), "1.2.840.10008.1.2");

        let e = DataElement::new_str(Tag(0x0002, 0x0010), VR::UI, "1..2");
        assert!(matches!(
            e.to_uid(),
            Err(ConvertValue::InvalidUidValue { .. })
        ));
    }

    #[test]
    fn date_and_time_access() {
        let e = DataElement::new_str(Tag(0x0008, 0x0020), VR::DA, "20240131");
        assert_eq!(
            e.to_date().unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()
        );

        let e = DataElement::new_str(Tag(0x0008, 0x0030), VR::TM, "143015");
        assert_eq!(
            e.to_time().unwrap(),
            NaiveTime::from_hms_opt(14, 30, 15).unwrap()
        );
    }

    #[test]
    fn lazy_values() {
        let mut e = DataElement::new_lazy(Tag(0x7FE0, 0x0010), VR::OW, Length(4), 0x200);
        assert!(e.is_lazy());
        assert!(matches!(e.bytes(), Err(ConvertValue::NotLoaded { .. })));
        e.materialize(vec![1, 2, 3, 4]);
        assert!(!e.is_lazy());
        assert_eq!(e.bytes().unwrap(), &[1, 2, 3, 4]);
    }

    #[test]
    fn attribute_tag_access() {
        let e = DataElement::new(
            Tag(0x0028, 0x0009),
            VR::AT,
            vec![0x18, 0x00, 0x65, 0x10],
        );
        assert_eq!(e.to_tags().unwrap().as_slice(), &[Tag(0x0018, 0x1065)]);
    }
}
