//! Decoding of DICOM part 10 files and bare data sets.
//!
//! Parsing is driven by a [`SourceReader`] cursor over a shared
//! [`DataSource`](crate::source::DataSource). The file meta group is
//! always decoded in Explicit VR Little Endian; the transfer syntax it
//! names selects the element decoder for everything after it.
//!
//! Structural problems fail the parse with a typed error carrying the
//! offending tag or byte offset. Recoverable oddities, such as odd
//! value lengths or a missing group length, are logged and collected
//! as [`ParseWarning`]s without aborting.

use crate::source::{DataSource, SourceReader};
use byteordered::Endianness;
use dcmio_core::header::{DataElementHeader, Header, SequenceItemHeader};
use dcmio_core::uid::{InvalidUid, Uid};
use dcmio_core::value::{DataElement, DataValue};
use dcmio_core::{uids, DataSet, Tag, VR};
use dcmio_encoding::decode::{self, DecodeFrom, ExplicitVRLittleEndianDecoder};
use dcmio_encoding::transfer_syntax::{DynDecoder, TransferSyntax, TransferSyntaxRegistry};
use snafu::{ensure, OptionExt, ResultExt, Snafu};
use std::sync::Arc;
use tracing::warn;

/// Nesting levels of sequence recursion tolerated before giving up.
const MAX_SEQUENCE_DEPTH: u32 = 32;

const TAG_PIXEL_DATA: Tag = Tag(0x7FE0, 0x0010);
const TAG_SPECIFIC_CHARACTER_SET: Tag = Tag(0x0008, 0x0005);
const TAG_TRANSFER_SYNTAX_UID: Tag = Tag(0x0002, 0x0010);

/// An error from parsing DICOM content.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// The source has no DICM magic code and parsing was not forced.
    #[snafu(display("not a DICOM file (missing DICM magic code)"))]
    NotADicomFile,
    /// An element header could not be decoded.
    #[snafu(display("could not decode element header at offset {offset}"))]
    DecodeHeader {
        /// the byte offset of the header
        offset: u64,
        /// the decoding failure
        #[snafu(backtrace)]
        source: decode::Error,
    },
    /// An element declared more value bytes than the source holds.
    #[snafu(display(
        "element {tag} at offset {offset} declares {needed} value bytes but only {available} remain"
    ))]
    TruncatedElement {
        /// the offending element
        tag: Tag,
        /// the byte offset of the element header
        offset: u64,
        /// bytes declared by the element
        needed: u32,
        /// bytes remaining in the source
        available: u64,
    },
    /// Value bytes could not be read from the source.
    #[snafu(display("could not read value of element {tag} at offset {offset}"))]
    ReadValue {
        /// the offending element
        tag: Tag,
        /// the byte offset of the value
        offset: u64,
        /// the source failure
        source: crate::source::SourceError,
    },
    /// An element which requires a defined length declared none.
    #[snafu(display("element {tag} at offset {offset} has an undefined length"))]
    UndefinedLength {
        /// the offending element
        tag: Tag,
        /// the byte offset of the element header
        offset: u64,
    },
    /// The file meta group names no transfer syntax.
    #[snafu(display("file meta group has no transfer syntax UID"))]
    MissingTransferSyntax,
    /// The named transfer syntax is not in the registry.
    #[snafu(display("unknown transfer syntax `{uid}`"))]
    UnknownTransferSyntax {
        /// the transfer syntax UID
        uid: String,
    },
    /// The named transfer syntax is known but its data sets
    /// cannot be decoded.
    #[snafu(display("transfer syntax `{uid}` is not supported for decoding"))]
    UnsupportedTransferSyntax {
        /// the transfer syntax UID
        uid: String,
    },
    /// A mandatory UID-valued meta element is malformed.
    #[snafu(display("invalid unique identifier in element {tag}"))]
    InvalidUidValue {
        /// the offending element
        tag: Tag,
        /// the validation failure
        source: InvalidUid,
    },
    /// Sequence nesting exceeded the recursion cap.
    #[snafu(display("sequence nesting at element {tag} exceeds the depth limit of {limit}"))]
    SequenceDepthExceeded {
        /// the sequence element at the limit
        tag: Tag,
        /// the nesting limit
        limit: u32,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// How much of the data set a parse should load.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub enum ParseMode {
    /// Load every element's value bytes.
    #[default]
    Full,
    /// Stop at the pixel data element, leaving it out entirely.
    MetadataOnly,
    /// Record the pixel data's position instead of its bytes;
    /// the value can be loaded later through the source handle.
    LazyPixelData,
}

/// Options controlling a parse.
#[derive(Debug, Default, Clone)]
pub struct ParseOptions {
    /// how much of the data set to load
    pub mode: ParseMode,
    /// stop once a top-level tag greater than this one is reached
    pub stop_after_tag: Option<Tag>,
    /// cap on the number of top-level elements
    pub max_elements: Option<usize>,
    /// parse sources without a DICM preamble
    /// as Implicit VR Little Endian from offset 0
    pub force: bool,
}

/// A recoverable oddity noticed while parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseWarning {
    /// the element involved, when known
    pub tag: Option<Tag>,
    /// the byte offset where the oddity was noticed
    pub offset: u64,
    /// a human-readable description
    pub message: String,
}

impl std::fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self.tag {
            Some(tag) => write!(f, "{} at offset {}: {}", tag, self.offset, self.message),
            None => write!(f, "offset {}: {}", self.offset, self.message),
        }
    }
}

/// The product of a successful parse.
#[derive(Debug)]
pub struct ParseOutcome {
    /// the file meta group (empty when parsing was forced)
    pub meta: DataSet,
    /// the main data set
    pub dataset: DataSet,
    /// oddities noticed along the way
    pub warnings: Vec<ParseWarning>,
}

/// Parse a DICOM part 10 file from the given source.
///
/// The source is taken shared so that lazily parsed pixel data can be
/// loaded later through the same handle.
pub fn read_file(source: Arc<dyn DataSource>, options: &ParseOptions) -> Result<ParseOutcome> {
    let mut reader = SourceReader::new(source);
    let mut warnings = Vec::new();

    let has_magic = reader.source().len() >= 132 && {
        let mut magic = [0u8; 4];
        reader
            .source()
            .read_at(128, &mut magic)
            .map(|_| &magic == b"DICM")
            .unwrap_or(false)
    };

    let (meta, ts_uid) = if has_magic {
        reader.seek_to(132);
        let meta = read_file_meta(&mut reader, &mut warnings)?;
        let ts = meta
            .get(TAG_TRANSFER_SYNTAX_UID)
            .and_then(|e| e.to_str().ok().map(|s| s.into_owned()))
            .context(MissingTransferSyntaxSnafu)?;
        (meta, ts)
    } else if options.force {
        warn!("missing DICM magic code, forcing Implicit VR Little Endian at offset 0");
        warnings.push(ParseWarning {
            tag: None,
            offset: 0,
            message: "missing DICM magic code, forced Implicit VR Little Endian".into(),
        });
        reader.seek_to(0);
        (DataSet::new(), uids::IMPLICIT_VR_LITTLE_ENDIAN.to_string())
    } else {
        return NotADicomFileSnafu.fail();
    };

    let ts = TransferSyntaxRegistry::get(&ts_uid).context(UnknownTransferSyntaxSnafu {
        uid: ts_uid.clone(),
    })?;
    let decoder = ts
        .decoder::<SourceReader>()
        .context(UnsupportedTransferSyntaxSnafu { uid: ts_uid })?;

    let mut parser = DataSetParser {
        reader,
        decoder,
        ts,
        options,
        warnings,
        top_level_count: 0,
    };
    let dataset = parser.read_elements(Boundary::Eof, 0, None)?;

    Ok(ParseOutcome {
        meta,
        dataset,
        warnings: parser.warnings,
    })
}

/// Parse the file meta group (0002,xxxx) in Explicit VR Little Endian,
/// leaving the reader at the first byte after the group.
fn read_file_meta(
    reader: &mut SourceReader,
    warnings: &mut Vec<ParseWarning>,
) -> Result<DataSet> {
    let decoder = ExplicitVRLittleEndianDecoder;
    let mut meta = DataSet::with_transfer_syntax(uids::EXPLICIT_VR_LITTLE_ENDIAN);

    // the group length element, when present, bounds the group
    let mut group_end = None;
    let start = reader.position();
    let (header, _) = decoder
        .decode_header(reader)
        .context(DecodeHeaderSnafu { offset: start })?;
    if header.tag == Tag(0x0002, 0x0000) {
        let value_offset = reader.position();
        let bytes = reader.read_vec(4).context(ReadValueSnafu {
            tag: header.tag,
            offset: value_offset,
        })?;
        let group_len = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        group_end = Some(reader.position() + u64::from(group_len));
        meta.put(DataElement::new(header.tag, header.vr, bytes));
    } else {
        warn!("file meta group length (0002,0000) is missing");
        warnings.push(ParseWarning {
            tag: Some(Tag(0x0002, 0x0000)),
            offset: start,
            message: "file meta group length is missing".into(),
        });
        reader.seek_to(start);
    }

    loop {
        if let Some(end) = group_end {
            if reader.position() >= end {
                break;
            }
        }
        if reader.remaining() == 0 {
            break;
        }
        let header_offset = reader.position();
        let (header, _) = decoder.decode_header(reader).context(DecodeHeaderSnafu {
            offset: header_offset,
        })?;
        if header.tag.group() != 0x0002 {
            // the main data set begins here
            reader.seek_to(header_offset);
            break;
        }
        let len = header.length.get().context(UndefinedLengthSnafu {
            tag: header.tag,
            offset: header_offset,
        })?;
        ensure!(
            u64::from(len) <= reader.remaining(),
            TruncatedElementSnafu {
                tag: header.tag,
                offset: header_offset,
                needed: len,
                available: reader.remaining(),
            }
        );
        let value_offset = reader.position();
        let bytes = reader.read_vec(len as usize).context(ReadValueSnafu {
            tag: header.tag,
            offset: value_offset,
        })?;

        let element = DataElement::new(header.tag, header.vr, bytes);
        if matches!(
            header.tag,
            Tag(0x0002, 0x0002) | Tag(0x0002, 0x0003) | Tag(0x0002, 0x0010) | Tag(0x0002, 0x0012)
        ) {
            let text = element.to_str().map(|s| s.into_owned()).unwrap_or_default();
            Uid::parse(&text).context(InvalidUidValueSnafu { tag: header.tag })?;
        }
        meta.put(element);
    }

    Ok(meta)
}

/// Where a run of elements ends.
#[derive(Debug, Copy, Clone)]
enum Boundary {
    /// at the end of the source
    Eof,
    /// at the given byte offset
    Until(u64),
    /// at an item delimiter (FFFE,E00D)
    Delimited,
}

struct DataSetParser<'a> {
    reader: SourceReader,
    decoder: DynDecoder<SourceReader>,
    ts: &'static TransferSyntax,
    options: &'a ParseOptions,
    warnings: Vec<ParseWarning>,
    top_level_count: usize,
}

impl DataSetParser<'_> {
    fn push_warning(&mut self, tag: Option<Tag>, offset: u64, message: impl Into<String>) {
        let message = message.into();
        warn!(?tag, offset, "{}", message);
        self.warnings.push(ParseWarning {
            tag,
            offset,
            message,
        });
    }

    fn decode_header(&mut self) -> Result<DataElementHeader> {
        let offset = self.reader.position();
        let (header, _) = self
            .decoder
            .decode_header(&mut self.reader)
            .context(DecodeHeaderSnafu { offset })?;
        Ok(header)
    }

    fn decode_item_header(&mut self) -> Result<SequenceItemHeader> {
        let offset = self.reader.position();
        self.decoder
            .decode_item_header(&mut self.reader)
            .context(DecodeHeaderSnafu { offset })
    }

    /// Read a run of elements up to the given boundary
    /// into a data set inheriting the given character set.
    fn read_elements(
        &mut self,
        boundary: Boundary,
        depth: u32,
        inherited_charset: Option<&str>,
    ) -> Result<DataSet> {
        let mut ds = DataSet::with_transfer_syntax(self.ts.uid());
        if let Some(charset) = inherited_charset {
            ds.set_character_set(charset);
        }

        loop {
            match boundary {
                Boundary::Eof if self.reader.remaining() == 0 => break,
                Boundary::Until(end) if self.reader.position() >= end => break,
                _ => {}
            }

            let header_offset = self.reader.position();
            let header = self.decode_header()?;

            if header.is_item_delimiter() {
                if matches!(boundary, Boundary::Delimited) {
                    break;
                }
                self.push_warning(
                    Some(header.tag),
                    header_offset,
                    "unexpected item delimiter outside of a delimited item",
                );
                continue;
            }
            if header.is_sequence_delimiter() {
                self.push_warning(
                    Some(header.tag),
                    header_offset,
                    "unexpected sequence delimiter",
                );
                continue;
            }

            if depth == 0 {
                if let Some(max) = self.options.max_elements {
                    if self.top_level_count >= max {
                        self.reader.seek_to(header_offset);
                        break;
                    }
                }
                if let Some(stop) = self.options.stop_after_tag {
                    if header.tag > stop {
                        self.reader.seek_to(header_offset);
                        break;
                    }
                }

                if header.tag == TAG_PIXEL_DATA {
                    match self.options.mode {
                        ParseMode::MetadataOnly => {
                            // skip the value entirely and end the parse
                            break;
                        }
                        ParseMode::LazyPixelData if header.length.is_defined() => {
                            let len = header.length.0;
                            ensure!(
                                u64::from(len) <= self.reader.remaining(),
                                TruncatedElementSnafu {
                                    tag: header.tag,
                                    offset: header_offset,
                                    needed: len,
                                    available: self.reader.remaining(),
                                }
                            );
                            let value_offset = self.reader.position();
                            self.reader.skip(u64::from(len));
                            ds.put(DataElement::new_lazy(
                                header.tag,
                                header.vr,
                                header.length,
                                value_offset,
                            ));
                            self.top_level_count += 1;
                            continue;
                        }
                        _ => {}
                    }
                }
            }

            let charset = ds.character_set().map(str::to_string);
            let element = self.read_element_body(header, header_offset, depth, charset.as_deref())?;

            if header.tag == TAG_SPECIFIC_CHARACTER_SET {
                if let Ok(code) = element.to_str() {
                    ds.set_character_set(code.into_owned());
                }
            }
            if depth == 0 {
                self.top_level_count += 1;
            }
            ds.put(element);
        }

        Ok(ds)
    }

    fn read_element_body(
        &mut self,
        header: DataElementHeader,
        header_offset: u64,
        depth: u32,
        charset: Option<&str>,
    ) -> Result<DataElement> {
        if header.tag == TAG_PIXEL_DATA && header.length.is_undefined() {
            if !self.ts.is_encapsulated() {
                self.push_warning(
                    Some(header.tag),
                    header_offset,
                    "undefined-length pixel data under a native transfer syntax",
                );
            }
            let (offset_table, fragments) = self.read_pixel_items(header_offset)?;
            return Ok(DataElement::new_pixel_sequence(
                header.tag,
                offset_table,
                fragments,
            ));
        }

        if header.vr == VR::SQ || header.length.is_undefined() {
            ensure!(
                depth < MAX_SEQUENCE_DEPTH,
                SequenceDepthExceededSnafu {
                    tag: header.tag,
                    limit: MAX_SEQUENCE_DEPTH,
                }
            );
            let items = self.read_items(header, depth + 1, charset)?;
            return Ok(DataElement::new_sequence(header.tag, items));
        }

        let len = header.length.0;
        if len % 2 == 1 {
            self.push_warning(
                Some(header.tag),
                header_offset,
                format!("odd value length {len}"),
            );
        }
        ensure!(
            u64::from(len) <= self.reader.remaining(),
            TruncatedElementSnafu {
                tag: header.tag,
                offset: header_offset,
                needed: len,
                available: self.reader.remaining(),
            }
        );
        let value_offset = self.reader.position();
        let mut bytes = self.reader.read_vec(len as usize).context(ReadValueSnafu {
            tag: header.tag,
            offset: value_offset,
        })?;
        if self.ts.endianness() == Endianness::Big && header.vr.needs_swap() {
            swap_in_place(&mut bytes, header.vr.element_size().unwrap_or(1));
        }
        Ok(DataElement::from_parts(header, DataValue::Primitive(bytes)))
    }

    fn read_items(
        &mut self,
        header: DataElementHeader,
        depth: u32,
        charset: Option<&str>,
    ) -> Result<Vec<DataSet>> {
        let mut items = Vec::new();
        let sequence_end = header
            .length
            .get()
            .map(|len| self.reader.position() + u64::from(len));

        loop {
            if let Some(end) = sequence_end {
                if self.reader.position() >= end {
                    break;
                }
            }
            let item_offset = self.reader.position();
            match self.decode_item_header()? {
                SequenceItemHeader::Item { len } => {
                    let item = match len.get() {
                        Some(len) => {
                            let end = self.reader.position() + u64::from(len);
                            self.read_elements(Boundary::Until(end), depth, charset)?
                        }
                        None => self.read_elements(Boundary::Delimited, depth, charset)?,
                    };
                    items.push(item);
                }
                SequenceItemHeader::SequenceDelimiter => break,
                SequenceItemHeader::ItemDelimiter => {
                    self.push_warning(
                        Some(header.tag),
                        item_offset,
                        "unexpected item delimiter between sequence items",
                    );
                }
            }
        }
        Ok(items)
    }

    /// Read the items of an undefined-length pixel data element:
    /// the basic offset table first, then one fragment per item.
    fn read_pixel_items(&mut self, element_offset: u64) -> Result<(Vec<u32>, Vec<Vec<u8>>)> {
        let mut offset_table = Vec::new();
        let mut fragments = Vec::new();
        let mut first = true;

        loop {
            let item_offset = self.reader.position();
            match self.decode_item_header()? {
                SequenceItemHeader::Item { len } => {
                    let len = len.get().context(UndefinedLengthSnafu {
                        tag: TAG_PIXEL_DATA,
                        offset: item_offset,
                    })?;
                    ensure!(
                        u64::from(len) <= self.reader.remaining(),
                        TruncatedElementSnafu {
                            tag: TAG_PIXEL_DATA,
                            offset: item_offset,
                            needed: len,
                            available: self.reader.remaining(),
                        }
                    );
                    let bytes = self.reader.read_vec(len as usize).context(ReadValueSnafu {
                        tag: TAG_PIXEL_DATA,
                        offset: item_offset,
                    })?;
                    if first {
                        offset_table = bytes
                            .chunks_exact(4)
                            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                            .collect();
                        first = false;
                    } else {
                        fragments.push(bytes);
                    }
                }
                SequenceItemHeader::SequenceDelimiter => break,
                SequenceItemHeader::ItemDelimiter => {
                    self.push_warning(
                        Some(TAG_PIXEL_DATA),
                        element_offset,
                        "unexpected item delimiter in pixel data sequence",
                    );
                }
            }
        }
        Ok((offset_table, fragments))
    }
}

fn swap_in_place(bytes: &mut [u8], element_size: usize) {
    if element_size > 1 {
        for chunk in bytes.chunks_exact_mut(element_size) {
            chunk.reverse();
        }
    }
}
