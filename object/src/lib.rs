//! High-level API for reading, manipulating and writing DICOM objects.
//!
//! A [`DicomFile`] pairs the file meta information table with the main
//! data set and keeps hold of the data source it was parsed from, so
//! that values deferred by a lazy parse can be loaded on demand.
//!
//! ```no_run
//! use dcmio_object::DicomFile;
//!
//! let file = DicomFile::open("image.dcm")?;
//! let name = file.dataset().string(dcmio_core::Tag(0x0010, 0x0010))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
pub mod meta;
pub mod private;

use byteordered::Endianness;
use dcmio_core::header::Header;
use dcmio_core::value::DataValue;
use dcmio_core::{DataSet, Tag};
use dcmio_encoding::transfer_syntax::TransferSyntaxRegistry;
use dcmio_parser::read::{self, ParseWarning};
use dcmio_parser::source::{DataSource, FileSource, MemorySource, SourceError};
use dcmio_parser::write;
use snafu::{OptionExt, ResultExt, Snafu};
use std::path::Path;
use std::sync::Arc;

pub use crate::meta::{FileMetaTable, FileMetaTableBuilder};
pub use crate::private::{BlockError, PrivateCreator, PrivateTagAllocator};
pub use dcmio_parser::read::{ParseMode, ParseOptions};

/// An error from reading a DICOM file.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum ReadError {
    /// The file could not be opened.
    #[snafu(display("could not open file {}", path.display()))]
    OpenFile {
        /// the file path
        path: std::path::PathBuf,
        /// the I/O failure
        source: std::io::Error,
    },
    /// The content could not be parsed.
    #[snafu(display("could not parse DICOM content"))]
    Parse {
        /// the parse failure
        #[snafu(backtrace)]
        source: read::Error,
    },
    /// A lazy value cannot be loaded
    /// because no data source is attached.
    #[snafu(display("no data source attached to load the value of {tag}"))]
    NoSourceForLazyValue {
        /// the element with the deferred value
        tag: Tag,
    },
    /// A lazy value could not be read back from the source.
    #[snafu(display("could not load the deferred value of {tag}"))]
    LoadLazyValue {
        /// the element with the deferred value
        tag: Tag,
        /// the source failure
        source: SourceError,
    },
}

/// An error from writing a DICOM file.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum WriteError {
    /// The data set could not be encoded.
    #[snafu(display("could not encode DICOM content"))]
    Encode {
        /// the encoding failure
        #[snafu(backtrace)]
        source: write::Error,
    },
    /// The destination file could not be created or written.
    #[snafu(display("could not write file {}", path.display()))]
    CreateFile {
        /// the file path
        path: std::path::PathBuf,
        /// the I/O failure
        source: std::io::Error,
    },
}

/// A DICOM part 10 file: meta table, main data set,
/// and the source handle backing any lazy values.
#[derive(Debug)]
pub struct DicomFile {
    meta: FileMetaTable,
    dataset: DataSet,
    source: Option<Arc<dyn DataSource>>,
    warnings: Vec<ParseWarning>,
}

impl DicomFile {
    /// Open and fully parse the file at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ReadError> {
        Self::open_with(path, &ParseOptions::default())
    }

    /// Open the file at `path` and parse it with the given options.
    pub fn open_with<P: AsRef<Path>>(path: P, options: &ParseOptions) -> Result<Self, ReadError> {
        let path = path.as_ref();
        let source = FileSource::open(path).context(OpenFileSnafu { path })?;
        Self::from_source(Arc::new(source), options)
    }

    /// Parse a file from an in-memory buffer.
    pub fn from_bytes(bytes: Vec<u8>, options: &ParseOptions) -> Result<Self, ReadError> {
        Self::from_source(Arc::new(MemorySource::new(bytes)), options)
    }

    /// Parse a file from an arbitrary data source.
    pub fn from_source(
        source: Arc<dyn DataSource>,
        options: &ParseOptions,
    ) -> Result<Self, ReadError> {
        let outcome = read::read_file(Arc::clone(&source), options).context(ParseSnafu)?;
        tracing::debug!(
            elements = outcome.dataset.len(),
            warnings = outcome.warnings.len(),
            "parsed DICOM object"
        );
        Ok(DicomFile {
            meta: FileMetaTable::from_dataset(outcome.meta),
            dataset: outcome.dataset,
            source: Some(source),
            warnings: outcome.warnings,
        })
    }

    /// Assemble a file from its parts, with no backing source.
    pub fn new(meta: FileMetaTable, dataset: DataSet) -> Self {
        DicomFile {
            meta,
            dataset,
            source: None,
            warnings: Vec::new(),
        }
    }

    /// The file meta information table.
    pub fn meta(&self) -> &FileMetaTable {
        &self.meta
    }

    /// The main data set.
    pub fn dataset(&self) -> &DataSet {
        &self.dataset
    }

    /// The main data set, mutably.
    pub fn dataset_mut(&mut self) -> &mut DataSet {
        &mut self.dataset
    }

    /// The oddities noticed while parsing.
    pub fn warnings(&self) -> &[ParseWarning] {
        &self.warnings
    }

    /// Discard the wrapper, keeping the main data set.
    pub fn into_dataset(self) -> DataSet {
        self.dataset
    }

    /// Load every deferred value back from the attached data source.
    ///
    /// Values read from a big endian source are normalized to little
    /// endian, like eagerly parsed values.
    pub fn load_lazy_values(&mut self) -> Result<(), ReadError> {
        let lazy_tags: Vec<Tag> = self
            .dataset
            .iter()
            .filter(|e| e.is_lazy())
            .map(|e| e.tag())
            .collect();
        if lazy_tags.is_empty() {
            return Ok(());
        }

        let big_endian = self
            .dataset
            .transfer_syntax()
            .and_then(TransferSyntaxRegistry::get)
            .map(|ts| ts.endianness() == Endianness::Big)
            .unwrap_or(false);

        for tag in lazy_tags {
            let source = self
                .source
                .as_ref()
                .context(NoSourceForLazyValueSnafu { tag })?;
            let element = self.dataset.get_mut(tag).expect("tag listed above");
            let lazy = match element.value() {
                DataValue::Lazy(lazy) => *lazy,
                _ => continue,
            };
            let mut bytes = vec![0u8; lazy.length as usize];
            source
                .read_at(lazy.offset, &mut bytes)
                .context(LoadLazyValueSnafu { tag })?;
            if big_endian {
                if let Some(size) = element.vr().element_size().filter(|&s| s > 1) {
                    for chunk in bytes.chunks_exact_mut(size) {
                        chunk.reverse();
                    }
                }
            }
            element.materialize(bytes);
        }
        Ok(())
    }

    /// Encode the file under the given transfer syntax.
    ///
    /// The meta group's transfer syntax element is updated to match.
    pub fn write(&self, ts_uid: &str) -> Result<Vec<u8>, WriteError> {
        write::write_file_to_vec(self.meta.as_dataset(), &self.dataset, ts_uid)
            .context(EncodeSnafu)
    }

    /// Encode the file to `path` under the given transfer syntax.
    pub fn write_to_path<P: AsRef<Path>>(&self, path: P, ts_uid: &str) -> Result<(), WriteError> {
        let path = path.as_ref();
        let bytes = self.write(ts_uid)?;
        std::fs::write(path, bytes).context(CreateFileSnafu { path })
    }
}
