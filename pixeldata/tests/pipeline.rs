//! End-to-end scenarios: parse, decode, window, rewrite.

use dcmio_core::{uids, DataElement, DataSet, Tag, VR};
use dcmio_object::{DicomFile, FileMetaTableBuilder, ParseMode, ParseOptions};
use dcmio_pixeldata::lut::{DisplayPipeline, WindowLevel};
use dcmio_pixeldata::{CodecRegistry, Error, ImageInfo, PixelCodec, PixelDecoder};
use std::sync::Arc;

const TAG_PIXEL_DATA: Tag = Tag(0x7FE0, 0x0010);

fn ct_dataset(rows: u16, columns: u16, pixels: &[u16]) -> DataSet {
    let mut ds = DataSet::new();
    ds.put(DataElement::new_str(Tag(0x0008, 0x0016), VR::UI, uids::CT_IMAGE_STORAGE));
    ds.put(DataElement::new_str(Tag(0x0008, 0x0018), VR::UI, "1.2.3.4.5.6"));
    ds.put(DataElement::new_str(Tag(0x0008, 0x0060), VR::CS, "CT"));
    ds.put(DataElement::new_str(Tag(0x0010, 0x0010), VR::PN, "Doe^Jane"));
    ds.put(DataElement::new_str(
        Tag(0x0020, 0x000D),
        VR::UI,
        "1.2.3.4.5",
    ));
    ds.put(DataElement::new(
        Tag(0x0028, 0x0002),
        VR::US,
        vec![1, 0],
    ));
    ds.put(DataElement::new_str(
        Tag(0x0028, 0x0004),
        VR::CS,
        "MONOCHROME2",
    ));
    ds.put(DataElement::new(
        Tag(0x0028, 0x0010),
        VR::US,
        rows.to_le_bytes().to_vec(),
    ));
    ds.put(DataElement::new(
        Tag(0x0028, 0x0011),
        VR::US,
        columns.to_le_bytes().to_vec(),
    ));
    ds.put(DataElement::new(Tag(0x0028, 0x0100), VR::US, vec![16, 0]));
    ds.put(DataElement::new(Tag(0x0028, 0x0101), VR::US, vec![16, 0]));
    ds.put(DataElement::new(Tag(0x0028, 0x0102), VR::US, vec![15, 0]));
    ds.put(DataElement::new(Tag(0x0028, 0x0103), VR::US, vec![0, 0]));
    ds.put(DataElement::new_str(Tag(0x0028, 0x1050), VR::DS, "40"));
    ds.put(DataElement::new_str(Tag(0x0028, 0x1051), VR::DS, "400"));
    ds.put(DataElement::new_str(Tag(0x0028, 0x1052), VR::DS, "-1024"));
    ds.put(DataElement::new_str(Tag(0x0028, 0x1053), VR::DS, "1"));

    let mut bytes = Vec::with_capacity(pixels.len() * 2);
    for value in pixels {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    ds.put(DataElement::new(TAG_PIXEL_DATA, VR::OW, bytes));
    ds
}

fn file_with(ds: DataSet, ts: &str) -> Vec<u8> {
    let meta = FileMetaTableBuilder::new()
        .media_storage_sop_class_uid(uids::CT_IMAGE_STORAGE)
        .media_storage_sop_instance_uid("1.2.3.4.5.6")
        .transfer_syntax(ts)
        .build()
        .unwrap();
    DicomFile::new(meta, ds).write(ts).unwrap()
}

/// A CT slice parses, decodes and windows: the stored value 1064
/// (40 HU at the window center) lands on mid-gray.
#[test]
fn ct_window_maps_center_to_mid_gray() {
    let pixels: Vec<u16> = (0..16)
        .map(|i| if i == 5 { 1064 } else { 24 })
        .collect();
    let bytes = file_with(ct_dataset(4, 4, &pixels), uids::EXPLICIT_VR_LITTLE_ENDIAN);

    let file = DicomFile::from_bytes(bytes, &ParseOptions::default()).unwrap();
    let decoded = file.decode_pixel_data().unwrap();
    assert_eq!(decoded.info().rows, 4);
    assert_eq!(decoded.number_of_frames(), 1);

    let pipeline = DisplayPipeline::from_dataset(
        file.dataset(),
        Some(WindowLevel {
            center: 40.0,
            width: 400.0,
        }),
    )
    .unwrap();
    let out: Vec<u8> = pipeline.apply(&decoded.frame_samples(0).unwrap());
    assert!((127..=129).contains(&out[5]), "center pixel: {}", out[5]);
    // stored 24 rescales to -1000 HU, far below the window
    assert_eq!(out[0], 0);
}

/// MONOCHROME1 output is the inversion of MONOCHROME2
/// for identical stored values.
#[test]
fn monochrome1_inverts_against_monochrome2() {
    let pixels: Vec<u16> = vec![24, 600, 1064, 1500];
    let mono2 = ct_dataset(2, 2, &pixels);
    let mut mono1 = ct_dataset(2, 2, &pixels);
    mono1.put(DataElement::new_str(
        Tag(0x0028, 0x0004),
        VR::CS,
        "MONOCHROME1",
    ));

    let render = |ds: &DataSet| -> Vec<u8> {
        let decoded = ds.decode_pixel_data().unwrap();
        let pipeline = DisplayPipeline::from_dataset(ds, None).unwrap();
        pipeline.apply(&decoded.frame_samples(0).unwrap())
    };
    let out2 = render(&mono2);
    let out1 = render(&mono1);
    for (a, b) in out1.iter().zip(&out2) {
        assert_eq!(u16::from(*a) + u16::from(*b), 255);
    }
}

/// Implicit VR LE → Explicit VR LE round trip preserves every
/// user-facing attribute bit for bit.
#[test]
fn round_trip_across_transfer_syntaxes() {
    let pixels: Vec<u16> = (0..16).collect();
    let original = ct_dataset(4, 4, &pixels);
    let bytes = file_with(original.clone(), uids::IMPLICIT_VR_LITTLE_ENDIAN);

    let first = DicomFile::from_bytes(bytes, &ParseOptions::default()).unwrap();
    let rewritten = first.write(uids::EXPLICIT_VR_LITTLE_ENDIAN).unwrap();
    let second = DicomFile::from_bytes(rewritten, &ParseOptions::default()).unwrap();

    for tag in [
        Tag(0x0010, 0x0010),
        Tag(0x0020, 0x000D),
        Tag(0x0008, 0x0060),
    ] {
        assert_eq!(
            original.string(tag).unwrap(),
            second.dataset().string(tag).unwrap(),
            "{tag}"
        );
    }
    assert_eq!(
        original.u16(Tag(0x0028, 0x0010)).unwrap(),
        second.dataset().u16(Tag(0x0028, 0x0010)).unwrap()
    );
    assert_eq!(
        original.element(TAG_PIXEL_DATA).unwrap().bytes().unwrap(),
        second
            .dataset()
            .element(TAG_PIXEL_DATA)
            .unwrap()
            .bytes()
            .unwrap()
    );
}

struct IdentityCodec;

impl PixelCodec for IdentityCodec {
    fn name(&self) -> &str {
        "identity"
    }

    fn decode_frame(
        &self,
        bitstream: &[u8],
        _info: &ImageInfo,
    ) -> dcmio_pixeldata::Result<Vec<u8>> {
        Ok(bitstream.to_vec())
    }
}

/// Multi-frame encapsulated pixel data: the basic offset table points
/// straight at each frame, and without it fragments are walked one
/// per frame.
#[test]
fn encapsulated_frames_by_offset_table_and_walking() {
    let mut ds = ct_dataset(2, 2, &[0; 4]);
    ds.put(DataElement::new_str(Tag(0x0028, 0x0008), VR::IS, "3 "));
    ds.put(DataElement::new(Tag(0x0028, 0x0100), VR::US, vec![8, 0]));
    ds.put(DataElement::new(Tag(0x0028, 0x0101), VR::US, vec![8, 0]));
    ds.put(DataElement::new(Tag(0x0028, 0x0102), VR::US, vec![7, 0]));
    let fragments = vec![vec![1u8; 4], vec![2u8; 4], vec![3u8; 4]];
    // fragment positions: 0, 12, 24
    ds.put(DataElement::new_pixel_sequence(
        TAG_PIXEL_DATA,
        vec![0, 12, 24],
        fragments,
    ));
    ds.set_transfer_syntax(uids::JPEG_BASELINE);

    let bytes = file_with(ds, uids::JPEG_BASELINE);
    let file = DicomFile::from_bytes(bytes, &ParseOptions::default()).unwrap();

    let mut registry = CodecRegistry::new();
    registry.register(uids::JPEG_BASELINE, Arc::new(IdentityCodec));

    let frame1 = file.decode_pixel_data_frame(1, &registry).unwrap();
    assert_eq!(frame1.frame(0).unwrap(), &[2u8; 4]);

    let all = file.decode_pixel_data_with(&registry).unwrap();
    assert_eq!(all.number_of_frames(), 3);
    assert_eq!(all.frame(2).unwrap(), &[3u8; 4]);
}

/// A metadata-only parse skips pixel data entirely;
/// decoding afterwards reports that a full parse is required.
#[test]
fn metadata_only_parse_blocks_decoding() {
    let pixels: Vec<u16> = (0..16).collect();
    let bytes = file_with(ct_dataset(4, 4, &pixels), uids::EXPLICIT_VR_LITTLE_ENDIAN);

    let options = ParseOptions {
        mode: ParseMode::MetadataOnly,
        ..ParseOptions::default()
    };
    let file = DicomFile::from_bytes(bytes, &options).unwrap();
    assert!(file.dataset().get(TAG_PIXEL_DATA).is_none());
    assert_eq!(file.dataset().string(Tag(0x0010, 0x0010)).unwrap(), "Doe^Jane");
    assert!(matches!(
        file.decode_pixel_data(),
        Err(Error::OperationRequiresFullParse)
    ));
}

/// A lazy parse defers the pixel data and loads it on demand
/// through the retained source handle.
#[test]
fn lazy_parse_loads_on_demand() {
    let pixels: Vec<u16> = (100..116).collect();
    let bytes = file_with(ct_dataset(4, 4, &pixels), uids::EXPLICIT_VR_LITTLE_ENDIAN);

    let options = ParseOptions {
        mode: ParseMode::LazyPixelData,
        ..ParseOptions::default()
    };
    let mut file = DicomFile::from_bytes(bytes, &options).unwrap();
    assert!(matches!(
        file.decode_pixel_data(),
        Err(Error::OperationRequiresFullParse)
    ));

    file.load_lazy_values().unwrap();
    let decoded = file.decode_pixel_data().unwrap();
    assert_eq!(decoded.frame_samples(0).unwrap()[0], 100);
}
