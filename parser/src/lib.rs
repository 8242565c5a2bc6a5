//! Reading and writing of DICOM data sets.
//!
//! The [`source`] module provides the random-access byte source the
//! parser consumes, with in-memory and file-backed implementations.
//! The [`read`] module decodes part 10 files and bare data sets into
//! [`DataSet`](dcmio_core::DataSet) trees, with support for
//! metadata-only and lazy pixel data parsing. The [`write`] module is
//! its inverse, encoding a data set under a chosen transfer syntax.
pub mod read;
pub mod source;
pub mod write;

pub use crate::read::{
    read_file, ParseMode, ParseOptions, ParseOutcome, ParseWarning,
};
pub use crate::source::{DataSource, FileSource, MemorySource, SourceReader};
pub use crate::write::{write_dataset, write_file, write_file_to_vec};
