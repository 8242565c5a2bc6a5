//! The ordered DICOM data set collection.

use crate::header::Header;
use crate::tag::Tag;
use crate::uid::Uid;
use crate::value::{ConvertValue, DataElement};
use smallvec::SmallVec;
use snafu::{OptionExt, ResultExt, Snafu};
use std::borrow::Cow;
use std::collections::btree_map;
use std::collections::BTreeMap;

/// An error from accessing an element of a data set.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum AccessError {
    /// The requested tag is not in the data set.
    #[snafu(display("no such element {tag}"))]
    NoSuchTag {
        /// the requested tag
        tag: Tag,
    },
    /// The element exists but could not be converted.
    #[snafu(display("could not convert value of element {tag}"))]
    Convert {
        /// the requested tag
        tag: Tag,
        /// the conversion failure
        source: ConvertValue,
    },
}

type Result<T, E = AccessError> = std::result::Result<T, E>;

/// An ordered collection of data elements, keyed by tag.
///
/// Elements are kept in ascending tag order, as DICOM requires
/// of an encoded data set. The collection also tracks the transfer
/// syntax it was read in and the active specific character set,
/// which nested sequence items inherit unless they carry their own
/// (0008,0005) element.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataSet {
    elements: BTreeMap<Tag, DataElement>,
    transfer_syntax: Option<String>,
    character_set: Option<String>,
}

impl DataSet {
    /// Create an empty data set with no transfer syntax attached.
    pub fn new() -> Self {
        DataSet::default()
    }

    /// Create an empty data set under the given transfer syntax.
    pub fn with_transfer_syntax(transfer_syntax: impl Into<String>) -> Self {
        DataSet {
            transfer_syntax: Some(transfer_syntax.into()),
            ..DataSet::default()
        }
    }

    /// The UID of the transfer syntax this data set was read in,
    /// if known.
    pub fn transfer_syntax(&self) -> Option<&str> {
        self.transfer_syntax.as_deref()
    }

    /// Attach a transfer syntax UID.
    pub fn set_transfer_syntax(&mut self, uid: impl Into<String>) {
        self.transfer_syntax = Some(uid.into());
    }

    /// The active specific character set code, if one was declared.
    pub fn character_set(&self) -> Option<&str> {
        self.character_set.as_deref()
    }

    /// Declare the active specific character set code.
    pub fn set_character_set(&mut self, code: impl Into<String>) {
        self.character_set = Some(code.into());
    }

    /// Insert an element, replacing any element with the same tag.
    /// Returns the replaced element, if any.
    pub fn put(&mut self, element: DataElement) -> Option<DataElement> {
        self.elements.insert(element.tag(), element)
    }

    /// Look up an element by tag.
    pub fn get(&self, tag: Tag) -> Option<&DataElement> {
        self.elements.get(&tag)
    }

    /// Look up an element by tag, mutably.
    pub fn get_mut(&mut self, tag: Tag) -> Option<&mut DataElement> {
        self.elements.get_mut(&tag)
    }

    /// Look up an element by tag, failing if it is absent.
    pub fn element(&self, tag: Tag) -> Result<&DataElement> {
        self.elements.get(&tag).context(NoSuchTagSnafu { tag })
    }

    /// Remove an element by tag.
    pub fn remove(&mut self, tag: Tag) -> Option<DataElement> {
        self.elements.remove(&tag)
    }

    /// Whether an element with the given tag is present.
    pub fn contains(&self, tag: Tag) -> bool {
        self.elements.contains_key(&tag)
    }

    /// The number of elements in this data set
    /// (sequences count as one).
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the data set holds no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Iterate over the elements in ascending tag order.
    pub fn iter(&self) -> btree_map::Values<'_, Tag, DataElement> {
        self.elements.values()
    }

    /// Iterate over the elements in ascending tag order, mutably.
    pub fn iter_mut(&mut self) -> btree_map::ValuesMut<'_, Tag, DataElement> {
        self.elements.values_mut()
    }

    /// Iterate over the tags present, in ascending order.
    pub fn tags(&self) -> impl Iterator<Item = Tag> + '_ {
        self.elements.keys().copied()
    }

    /// The decoded string value of the given element.
    pub fn string(&self, tag: Tag) -> Result<Cow<str>> {
        self.element(tag)?.to_str().context(ConvertSnafu { tag })
    }

    /// The decoded multi-valued strings of the given element.
    pub fn strings(&self, tag: Tag) -> Result<Vec<String>> {
        self.element(tag)?.to_strs().context(ConvertSnafu { tag })
    }

    /// The validated UID value of the given element.
    pub fn uid(&self, tag: Tag) -> Result<Uid> {
        self.element(tag)?.to_uid().context(ConvertSnafu { tag })
    }

    /// The first numeric value of the given element, as `f64`.
    pub fn f64(&self, tag: Tag) -> Result<f64> {
        self.element(tag)?.to_f64().context(ConvertSnafu { tag })
    }

    /// All numeric values of the given element, as `f64`.
    pub fn f64s(&self, tag: Tag) -> Result<SmallVec<[f64; 2]>> {
        self.element(tag)?.to_f64s().context(ConvertSnafu { tag })
    }

    /// The first unsigned 16-bit value of the given element.
    pub fn u16(&self, tag: Tag) -> Result<u16> {
        let values = self
            .element(tag)?
            .to_u16s()
            .context(ConvertSnafu { tag })?;
        values.first().copied().ok_or(AccessError::Convert {
            tag,
            source: ConvertValue::EmptyValue { tag },
        })
    }

    /// The first integer value of the given element.
    pub fn int(&self, tag: Tag) -> Result<i64> {
        self.element(tag)?.to_int().context(ConvertSnafu { tag })
    }
}

impl FromIterator<DataElement> for DataSet {
    fn from_iter<I: IntoIterator<Item = DataElement>>(iter: I) -> Self {
        let mut ds = DataSet::new();
        for element in iter {
            ds.put(element);
        }
        ds
    }
}

impl IntoIterator for DataSet {
    type Item = DataElement;
    type IntoIter = btree_map::IntoValues<Tag, DataElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.into_values()
    }
}

impl<'a> IntoIterator for &'a DataSet {
    type Item = &'a DataElement;
    type IntoIter = btree_map::Values<'a, Tag, DataElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.values()
    }
}
