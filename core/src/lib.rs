//! This crate contains the DICOM core data model:
//! the attribute tag and value representation primitives,
//! the strict unique identifier (UID) parser,
//! the data element and data set types,
//! and the standard data element dictionary.
//!
//! All types here are pure values with no I/O attached.
//! Encoding and decoding of these types to DICOM streams
//! is the responsibility of the `dcmio-encoding` and `dcmio-parser` crates.
pub mod dataset;
pub mod dictionary;
pub mod header;
pub mod tag;
pub mod uid;
pub mod uids;
pub mod value;
pub mod vr;

pub use crate::dataset::DataSet;
pub use crate::dictionary::{DataDictionary, DictionaryEntry, StandardDictionary};
pub use crate::header::{DataElementHeader, Header, Length, SequenceItemHeader};
pub use crate::tag::Tag;
pub use crate::uid::Uid;
pub use crate::value::{DataElement, DataValue, LazyValue};
pub use crate::vr::VR;
