//! Encoding of data sets into DICOM part 10 bytes.
//!
//! The writer emits the 128-byte preamble, the DICM magic code, the
//! file meta group in Explicit VR Little Endian with a recomputed
//! group length, and the main data set under the requested transfer
//! syntax. Value bytes are padded to even lengths with the pad byte of
//! their VR. Group length elements of the main data set are recomputed
//! when the source data set carried them; sequences are written in
//! delimited (undefined length) form.

use byteordered::Endianness;
use dcmio_core::header::{DataElementHeader, Header, Length};
use dcmio_core::value::{DataElement, DataValue};
use dcmio_core::{DataSet, Tag, VR};
use dcmio_encoding::encode::{self, EncodeTo, ExplicitVRLittleEndianEncoder};
use dcmio_encoding::transfer_syntax::{DynEncoder, TransferSyntax, TransferSyntaxRegistry};
use snafu::{ensure, OptionExt, ResultExt, Snafu};
use std::io::Write;

/// An error from writing DICOM content.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// The requested transfer syntax is not in the registry.
    #[snafu(display("unknown transfer syntax `{uid}`"))]
    UnknownTransferSyntax {
        /// the transfer syntax UID
        uid: String,
    },
    /// The requested transfer syntax cannot encode data sets.
    #[snafu(display("transfer syntax `{uid}` is not supported for encoding"))]
    UnsupportedTransferSyntax {
        /// the transfer syntax UID
        uid: String,
    },
    /// An element header could not be encoded.
    #[snafu(display("could not encode element"))]
    EncodeHeader {
        /// the encoding failure
        #[snafu(backtrace)]
        source: encode::Error,
    },
    /// An element value is still a lazy descriptor;
    /// it must be loaded before writing.
    #[snafu(display("value of element {tag} is not loaded"))]
    ValueNotLoaded {
        /// the offending element
        tag: Tag,
    },
    /// The destination writer failed.
    #[snafu(display("could not write to destination"))]
    WriteDestination {
        /// the I/O failure
        source: std::io::Error,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Encode a part 10 file into a byte vector.
///
/// The transfer syntax UID element (0002,0010) of the written meta
/// group is set to `ts_uid`, whatever the given meta set declares.
pub fn write_file_to_vec(meta: &DataSet, dataset: &DataSet, ts_uid: &str) -> Result<Vec<u8>> {
    let ts = TransferSyntaxRegistry::get(ts_uid).context(UnknownTransferSyntaxSnafu {
        uid: ts_uid.to_string(),
    })?;
    ensure!(
        ts.can_decode_dataset(),
        UnsupportedTransferSyntaxSnafu {
            uid: ts_uid.to_string(),
        }
    );

    let mut out = vec![0u8; 128];
    out.extend_from_slice(b"DICM");
    write_meta_group(&mut out, meta, ts.uid())?;
    write_dataset(&mut out, dataset, ts)?;
    Ok(out)
}

/// Encode a part 10 file into the given writer.
pub fn write_file<W: Write>(
    to: &mut W,
    meta: &DataSet,
    dataset: &DataSet,
    ts_uid: &str,
) -> Result<()> {
    let bytes = write_file_to_vec(meta, dataset, ts_uid)?;
    to.write_all(&bytes).context(WriteDestinationSnafu)
}

/// Encode the file meta group in Explicit VR Little Endian,
/// recomputing its group length element.
fn write_meta_group(out: &mut Vec<u8>, meta: &DataSet, ts_uid: &str) -> Result<()> {
    let encoder = ExplicitVRLittleEndianEncoder;

    let mut effective = meta.clone();
    let mut ts_value = ts_uid.as_bytes().to_vec();
    if ts_value.len() % 2 == 1 {
        ts_value.push(0);
    }
    effective.put(DataElement::new(Tag(0x0002, 0x0010), VR::UI, ts_value));

    let mut body = Vec::new();
    for element in effective.iter() {
        if !element.tag().is_file_meta() || element.tag().is_group_length() {
            continue;
        }
        let bytes = match element.value() {
            DataValue::Primitive(bytes) => bytes,
            _ => continue,
        };
        let data = padded(bytes, element.vr().padding());
        let header =
            DataElementHeader::new(element.tag(), element.vr(), Length(data.len() as u32));
        encoder
            .encode_element_header(&mut body, header)
            .context(EncodeHeaderSnafu)?;
        body.extend_from_slice(&data);
    }

    let group_length_header =
        DataElementHeader::new(Tag(0x0002, 0x0000), VR::UL, Length(4));
    encoder
        .encode_element_header(out, group_length_header)
        .context(EncodeHeaderSnafu)?;
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    out.extend_from_slice(&body);
    Ok(())
}

/// Encode a bare data set under the given transfer syntax.
///
/// Group length elements present in the data set are recomputed;
/// groups without one stay without one.
pub fn write_dataset(
    out: &mut Vec<u8>,
    dataset: &DataSet,
    ts: &TransferSyntax,
) -> Result<()> {
    let encoder = ts
        .encoder::<Vec<u8>>()
        .context(UnsupportedTransferSyntaxSnafu {
            uid: ts.uid().to_string(),
        })?;

    let mut current_group: Option<u16> = None;
    let mut group_body = Vec::new();
    let mut emit_group_length = false;

    for element in dataset.iter() {
        let group = element.tag().group();
        if current_group != Some(group) {
            flush_group(
                out,
                &encoder,
                ts,
                current_group,
                &mut group_body,
                emit_group_length,
            )?;
            current_group = Some(group);
            emit_group_length = false;
        }
        if element.tag().is_group_length() {
            emit_group_length = true;
            continue;
        }
        write_element(&mut group_body, &encoder, element, ts)?;
    }
    flush_group(
        out,
        &encoder,
        ts,
        current_group,
        &mut group_body,
        emit_group_length,
    )
}

fn flush_group(
    out: &mut Vec<u8>,
    encoder: &DynEncoder<Vec<u8>>,
    ts: &TransferSyntax,
    group: Option<u16>,
    body: &mut Vec<u8>,
    emit_group_length: bool,
) -> Result<()> {
    let Some(group) = group else {
        return Ok(());
    };
    if emit_group_length {
        let header = DataElementHeader::new(Tag(group, 0x0000), VR::UL, Length(4));
        encoder
            .encode_element_header(out, header)
            .context(EncodeHeaderSnafu)?;
        let len_bytes = match ts.endianness() {
            Endianness::Little => (body.len() as u32).to_le_bytes(),
            Endianness::Big => (body.len() as u32).to_be_bytes(),
        };
        out.extend_from_slice(&len_bytes);
    }
    out.extend_from_slice(body);
    body.clear();
    Ok(())
}

fn write_element(
    out: &mut Vec<u8>,
    encoder: &DynEncoder<Vec<u8>>,
    element: &DataElement,
    ts: &TransferSyntax,
) -> Result<()> {
    match element.value() {
        DataValue::Primitive(bytes) => {
            let mut data = padded(bytes, element.vr().padding());
            if ts.endianness() == Endianness::Big && element.vr().needs_swap() {
                swap_in_place(&mut data, element.vr().element_size().unwrap_or(1));
            }
            let header = DataElementHeader::new(
                element.tag(),
                element.vr(),
                Length(data.len() as u32),
            );
            encoder
                .encode_element_header(out, header)
                .context(EncodeHeaderSnafu)?;
            out.extend_from_slice(&data);
        }
        DataValue::Sequence(items) => {
            let header =
                DataElementHeader::new(element.tag(), VR::SQ, Length::UNDEFINED);
            encoder
                .encode_element_header(out, header)
                .context(EncodeHeaderSnafu)?;
            for item in items {
                encoder
                    .encode_item_header(out, 0xFFFF_FFFF)
                    .context(EncodeHeaderSnafu)?;
                for nested in item.iter() {
                    if nested.tag().is_group_length() {
                        continue;
                    }
                    write_element(out, encoder, nested, ts)?;
                }
                encoder
                    .encode_item_delimiter(out)
                    .context(EncodeHeaderSnafu)?;
            }
            encoder
                .encode_sequence_delimiter(out)
                .context(EncodeHeaderSnafu)?;
        }
        DataValue::PixelSequence {
            offset_table,
            fragments,
        } => {
            let header =
                DataElementHeader::new(element.tag(), VR::OB, Length::UNDEFINED);
            encoder
                .encode_element_header(out, header)
                .context(EncodeHeaderSnafu)?;
            encoder
                .encode_item_header(out, (offset_table.len() * 4) as u32)
                .context(EncodeHeaderSnafu)?;
            for offset in offset_table {
                out.extend_from_slice(&offset.to_le_bytes());
            }
            for fragment in fragments {
                let data = padded(fragment, 0x00);
                encoder
                    .encode_item_header(out, data.len() as u32)
                    .context(EncodeHeaderSnafu)?;
                out.extend_from_slice(&data);
            }
            encoder
                .encode_sequence_delimiter(out)
                .context(EncodeHeaderSnafu)?;
        }
        DataValue::Lazy(_) => {
            return ValueNotLoadedSnafu {
                tag: element.tag(),
            }
            .fail();
        }
    }
    Ok(())
}

fn padded(bytes: &[u8], pad: u8) -> Vec<u8> {
    let mut data = bytes.to_vec();
    if data.len() % 2 == 1 {
        data.push(pad);
    }
    data
}

fn swap_in_place(bytes: &mut [u8], element_size: usize) {
    if element_size > 1 {
        for chunk in bytes.chunks_exact_mut(element_size) {
            chunk.reverse();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::read::{read_file, ParseOptions};
    use crate::source::MemorySource;
    use dcmio_core::uids;
    use std::sync::Arc;

    fn sample_meta() -> DataSet {
        let mut meta = DataSet::new();
        meta.put(DataElement::new_str(
            Tag(0x0002, 0x0002),
            VR::UI,
            uids::SECONDARY_CAPTURE_IMAGE_STORAGE,
        ));
        meta.put(DataElement::new_str(Tag(0x0002, 0x0003), VR::UI, "1.2.3.4"));
        meta.put(DataElement::new_str(
            Tag(0x0002, 0x0010),
            VR::UI,
            uids::EXPLICIT_VR_LITTLE_ENDIAN,
        ));
        meta
    }

    fn sample_dataset() -> DataSet {
        let mut ds = DataSet::new();
        ds.put(DataElement::new_str(Tag(0x0008, 0x0060), VR::CS, "OT"));
        ds.put(DataElement::new_str(Tag(0x0010, 0x0010), VR::PN, "Doe^Jane"));
        ds.put(DataElement::new(
            Tag(0x0028, 0x0010),
            VR::US,
            vec![0x00, 0x02],
        ));
        ds
    }

    #[test]
    fn file_layout_starts_with_preamble_and_magic() {
        let bytes =
            write_file_to_vec(&sample_meta(), &sample_dataset(), uids::EXPLICIT_VR_LITTLE_ENDIAN)
                .unwrap();
        assert!(bytes.len() > 132);
        assert!(bytes[..128].iter().all(|&b| b == 0));
        assert_eq!(&bytes[128..132], b"DICM");
        // the group length element comes first in the meta group
        assert_eq!(&bytes[132..136], &[0x02, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn round_trip_explicit_le() {
        let bytes =
            write_file_to_vec(&sample_meta(), &sample_dataset(), uids::EXPLICIT_VR_LITTLE_ENDIAN)
                .unwrap();
        let outcome = read_file(
            Arc::new(MemorySource::new(bytes)),
            &ParseOptions::default(),
        )
        .unwrap();
        assert_eq!(outcome.dataset, {
            let mut expected = sample_dataset();
            expected.set_transfer_syntax(uids::EXPLICIT_VR_LITTLE_ENDIAN);
            expected
        });
    }

    #[test]
    fn round_trip_through_implicit_and_back() {
        let original = sample_dataset();
        let bytes = write_file_to_vec(
            &sample_meta(),
            &original,
            uids::IMPLICIT_VR_LITTLE_ENDIAN,
        )
        .unwrap();
        let outcome = read_file(
            Arc::new(MemorySource::new(bytes)),
            &ParseOptions::default(),
        )
        .unwrap();
        let rewritten = write_file_to_vec(
            &outcome.meta,
            &outcome.dataset,
            uids::EXPLICIT_VR_LITTLE_ENDIAN,
        )
        .unwrap();
        let reparsed = read_file(
            Arc::new(MemorySource::new(rewritten)),
            &ParseOptions::default(),
        )
        .unwrap();
        assert_eq!(
            reparsed.dataset.string(Tag(0x0010, 0x0010)).unwrap(),
            "Doe^Jane"
        );
        assert_eq!(reparsed.dataset.u16(Tag(0x0028, 0x0010)).unwrap(), 512);
    }

    #[test]
    fn big_endian_swaps_binary_values() {
        let bytes = write_file_to_vec(
            &sample_meta(),
            &sample_dataset(),
            uids::EXPLICIT_VR_BIG_ENDIAN,
        )
        .unwrap();
        let outcome = read_file(
            Arc::new(MemorySource::new(bytes)),
            &ParseOptions::default(),
        )
        .unwrap();
        // values normalize back to native on read
        assert_eq!(outcome.dataset.u16(Tag(0x0028, 0x0010)).unwrap(), 512);
    }

    #[test]
    fn sequences_round_trip_in_delimited_form() {
        let mut item = DataSet::new();
        item.put(DataElement::new_str(
            Tag(0x0008, 0x1150),
            VR::UI,
            "1.2.840.10008.1.1",
        ));
        let mut ds = sample_dataset();
        ds.put(DataElement::new_sequence(Tag(0x0008, 0x1140), vec![item]));

        let bytes =
            write_file_to_vec(&sample_meta(), &ds, uids::EXPLICIT_VR_LITTLE_ENDIAN).unwrap();
        let outcome = read_file(
            Arc::new(MemorySource::new(bytes)),
            &ParseOptions::default(),
        )
        .unwrap();
        let items = outcome
            .dataset
            .element(Tag(0x0008, 0x1140))
            .unwrap()
            .items()
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(
            items[0].string(Tag(0x0008, 0x1150)).unwrap(),
            "1.2.840.10008.1.1"
        );
    }

    #[test]
    fn group_lengths_are_recomputed_when_present() {
        let mut ds = sample_dataset();
        // stale group length for group 0008
        ds.put(DataElement::new(
            Tag(0x0008, 0x0000),
            VR::UL,
            vec![0xFF, 0xFF, 0xFF, 0x00],
        ));
        let bytes =
            write_file_to_vec(&sample_meta(), &ds, uids::EXPLICIT_VR_LITTLE_ENDIAN).unwrap();
        let outcome = read_file(
            Arc::new(MemorySource::new(bytes)),
            &ParseOptions::default(),
        )
        .unwrap();
        let group_length = outcome.dataset.element(Tag(0x0008, 0x0000)).unwrap();
        let recomputed =
            u32::from_le_bytes(group_length.bytes().unwrap().try_into().unwrap());
        // (0008,0060) CS "OT" takes 8 header bytes + 2 value bytes
        assert_eq!(recomputed, 10);
    }

    #[test]
    fn lazy_values_refuse_to_write() {
        let mut ds = sample_dataset();
        ds.put(DataElement::new_lazy(
            Tag(0x7FE0, 0x0010),
            VR::OW,
            Length(8),
            0x200,
        ));
        let err = write_file_to_vec(&sample_meta(), &ds, uids::EXPLICIT_VR_LITTLE_ENDIAN)
            .unwrap_err();
        assert!(matches!(err, Error::ValueNotLoaded { .. }));
    }

    #[test]
    fn encapsulated_pixel_data_round_trips() {
        let mut ds = sample_dataset();
        ds.put(DataElement::new_pixel_sequence(
            Tag(0x7FE0, 0x0010),
            vec![0],
            vec![vec![1, 2, 3, 4]],
        ));
        let bytes = write_file_to_vec(&sample_meta(), &ds, uids::RLE_LOSSLESS).unwrap();
        let outcome = read_file(
            Arc::new(MemorySource::new(bytes)),
            &ParseOptions::default(),
        )
        .unwrap();
        let element = outcome.dataset.element(Tag(0x7FE0, 0x0010)).unwrap();
        assert_eq!(element.offset_table().unwrap(), &[0]);
        assert_eq!(element.fragments().unwrap(), &[vec![1, 2, 3, 4]]);
    }
}
