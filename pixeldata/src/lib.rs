//! Pixel data decoding and the grayscale display pipeline.
//!
//! [`PixelDecoder`] detaches the pixel data element from a data set
//! and turns it into per-frame sample buffers, dispatching on the
//! transfer syntax: native data is sliced into frames, RLE Lossless is
//! decoded in this crate, and the JPEG family is delegated to codecs
//! registered in a [`CodecRegistry`]. The [`lut`] module then maps
//! stored values to display values through the modality, VOI and
//! presentation stages of PS3.3.
//!
//! ```no_run
//! use dcmio_object::DicomFile;
//! use dcmio_pixeldata::{lut::DisplayPipeline, PixelDecoder};
//!
//! let file = DicomFile::open("ct.dcm")?;
//! let decoded = file.dataset().decode_pixel_data()?;
//! let pipeline = DisplayPipeline::from_dataset(file.dataset(), None)?;
//! let image: Vec<u8> = pipeline.apply(&decoded.frame_samples(0)?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
pub mod attribute;
pub mod bench;
pub mod cache;
pub mod codec;
pub mod encapsulation;
pub mod lut;
pub mod rle;

use dcmio_core::dataset::AccessError;
use dcmio_core::value::DataValue;
use dcmio_core::{uids, DataSet, Tag};
use dcmio_encoding::transfer_syntax::{Codec, TransferSyntaxRegistry};
use dcmio_object::DicomFile;
use snafu::{ensure, OptionExt, Snafu};
use tracing::debug;

pub use crate::attribute::{
    ImageInfo, PhotometricInterpretation, PixelRepresentation, PlanarConfiguration,
};
pub use crate::codec::{CodecRegistry, PixelCodec};

const TAG_PIXEL_DATA: Tag = Tag(0x7FE0, 0x0010);

/// An error from pixel data decoding.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// The pixel data element is absent or was skipped at parse time;
    /// a full parse is required before decoding.
    #[snafu(display("pixel data is not loaded; parse the file in full mode first"))]
    OperationRequiresFullParse,
    /// A required image attribute is absent.
    #[snafu(display("missing image attribute {name}"))]
    MissingAttribute {
        /// the PS3.6 attribute keyword
        name: &'static str,
    },
    /// A required image attribute could not be read.
    #[snafu(display("missing or invalid image attribute {name}"))]
    InvalidAttribute {
        /// the PS3.6 attribute keyword
        name: &'static str,
        /// the access failure
        source: AccessError,
    },
    /// An image attribute has a value this decoder cannot handle.
    #[snafu(display("unsupported value `{value}` for image attribute {name}"))]
    UnsupportedAttribute {
        /// the PS3.6 attribute keyword
        name: &'static str,
        /// the offending value
        value: String,
    },
    /// Pixel data in this transfer syntax cannot be decoded.
    #[snafu(display("unsupported transfer syntax `{uid}` for pixel data"))]
    UnsupportedTransferSyntax {
        /// the transfer syntax UID
        uid: String,
    },
    /// The requested frame does not exist.
    #[snafu(display("frame {frame} is out of range for {frames} frames"))]
    FrameIndexOutOfRange {
        /// the requested frame index
        frame: u32,
        /// the number of frames available
        frames: u32,
    },
    /// A pixel data fragment is shorter than required.
    #[snafu(display("fragment of frame {frame} holds {available} bytes, {needed} required"))]
    TruncatedFragment {
        /// the affected frame
        frame: u32,
        /// bytes required
        needed: usize,
        /// bytes available
        available: usize,
    },
    /// Native pixel data holds fewer bytes than the image declares.
    #[snafu(display("pixel data holds {available} bytes, {needed} required"))]
    TruncatedPixelData {
        /// bytes required
        needed: usize,
        /// bytes available
        available: usize,
    },
    /// Fragments cannot be matched to frames.
    #[snafu(display("cannot demarcate frames: {detail}"))]
    FragmentMismatch {
        /// what went wrong
        detail: String,
    },
    /// A pixel data codec failed or is unavailable.
    #[snafu(display("codec failure: {detail}"))]
    CodecFailure {
        /// what went wrong
        detail: String,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Decoded pixel data: one sample buffer per frame,
/// in interleaved little endian order, plus the image attributes.
#[derive(Debug, Clone)]
pub struct DecodedPixelData {
    info: ImageInfo,
    frames: Vec<Vec<u8>>,
}

impl DecodedPixelData {
    /// The image attributes the frames were decoded under.
    pub fn info(&self) -> &ImageInfo {
        &self.info
    }

    /// The number of decoded frames.
    pub fn number_of_frames(&self) -> u32 {
        self.frames.len() as u32
    }

    /// The raw bytes of one frame.
    pub fn frame(&self, frame: u32) -> Result<&[u8]> {
        self.frames
            .get(frame as usize)
            .map(Vec::as_slice)
            .context(FrameIndexOutOfRangeSnafu {
                frame,
                frames: self.frames.len() as u32,
            })
    }

    /// The stored sample values of one frame, unpacked and
    /// sign-extended per the image attributes.
    ///
    /// Samples are masked to the stored bit range below the high bit.
    /// Single-bit frames unpack most significant bit first.
    pub fn frame_samples(&self, frame: u32) -> Result<Vec<i32>> {
        let bytes = self.frame(frame)?;
        let info = &self.info;
        let samples = match info.bits_allocated {
            1 => {
                let count = info.samples_per_frame();
                let mut out = Vec::with_capacity(count);
                for i in 0..count {
                    let byte = bytes[i / 8];
                    let bit = 7 - (i % 8);
                    out.push(i32::from((byte >> bit) & 1));
                }
                out
            }
            8 => bytes
                .iter()
                .map(|&b| unpack_sample(u32::from(b), info))
                .collect(),
            16 => bytes
                .chunks_exact(2)
                .map(|c| unpack_sample(u32::from(u16::from_le_bytes([c[0], c[1]])), info))
                .collect(),
            32 => bytes
                .chunks_exact(4)
                .map(|c| unpack_sample(u32::from_le_bytes([c[0], c[1], c[2], c[3]]), info))
                .collect(),
            other => {
                return UnsupportedAttributeSnafu {
                    name: "BitsAllocated",
                    value: other.to_string(),
                }
                .fail()
            }
        };
        Ok(samples)
    }
}

/// Mask a raw sample to its stored bits and sign-extend it.
fn unpack_sample(raw: u32, info: &ImageInfo) -> i32 {
    let bits_stored = u32::from(info.bits_stored.clamp(1, 32));
    let shift = (u32::from(info.high_bit) + 1).saturating_sub(bits_stored);
    let mask = if bits_stored == 32 {
        u32::MAX
    } else {
        (1u32 << bits_stored) - 1
    };
    let value = (raw >> shift) & mask;
    match info.pixel_representation {
        PixelRepresentation::Signed
            if bits_stored < 32 && value & (1 << (bits_stored - 1)) != 0 =>
        {
            (i64::from(value) - (1i64 << bits_stored)) as i32
        }
        _ => value as i32,
    }
}

/// Types which can hand out decoded pixel data.
pub trait PixelDecoder {
    /// Decode every frame of the pixel data element.
    fn decode_pixel_data(&self) -> Result<DecodedPixelData> {
        self.decode_pixel_data_with(&CodecRegistry::new())
    }

    /// Decode every frame, dispatching compressed formats
    /// to the codecs in the given registry.
    fn decode_pixel_data_with(&self, registry: &CodecRegistry) -> Result<DecodedPixelData>;

    /// Decode a single frame.
    fn decode_pixel_data_frame(
        &self,
        frame: u32,
        registry: &CodecRegistry,
    ) -> Result<DecodedPixelData>;
}

impl PixelDecoder for DataSet {
    fn decode_pixel_data_with(&self, registry: &CodecRegistry) -> Result<DecodedPixelData> {
        decode(self, registry, None)
    }

    fn decode_pixel_data_frame(
        &self,
        frame: u32,
        registry: &CodecRegistry,
    ) -> Result<DecodedPixelData> {
        decode(self, registry, Some(frame))
    }
}

impl PixelDecoder for DicomFile {
    fn decode_pixel_data_with(&self, registry: &CodecRegistry) -> Result<DecodedPixelData> {
        self.dataset().decode_pixel_data_with(registry)
    }

    fn decode_pixel_data_frame(
        &self,
        frame: u32,
        registry: &CodecRegistry,
    ) -> Result<DecodedPixelData> {
        self.dataset().decode_pixel_data_frame(frame, registry)
    }
}

fn decode(
    dataset: &DataSet,
    registry: &CodecRegistry,
    only_frame: Option<u32>,
) -> Result<DecodedPixelData> {
    let element = dataset
        .get(TAG_PIXEL_DATA)
        .context(OperationRequiresFullParseSnafu)?;
    ensure!(!element.is_lazy(), OperationRequiresFullParseSnafu);

    let info = ImageInfo::from_dataset(dataset)?;
    let ts_uid = dataset
        .transfer_syntax()
        .unwrap_or(uids::EXPLICIT_VR_LITTLE_ENDIAN)
        .to_string();

    match element.value() {
        DataValue::Primitive(bytes) => decode_native(bytes, info, only_frame),
        DataValue::PixelSequence {
            offset_table,
            fragments,
        } => decode_encapsulated(
            offset_table,
            fragments,
            info,
            &ts_uid,
            registry,
            only_frame,
        ),
        _ => OperationRequiresFullParseSnafu.fail(),
    }
}

/// Slice a native monolithic pixel data value into frames.
///
/// Values of big endian sources were already normalized to little
/// endian by the parser, so every native value slices the same way.
fn decode_native(
    bytes: &[u8],
    info: ImageInfo,
    only_frame: Option<u32>,
) -> Result<DecodedPixelData> {
    let frame_bytes = info.frame_bytes();
    let frames_wanted: Vec<u32> = match only_frame {
        Some(frame) => {
            ensure!(
                frame < info.number_of_frames,
                FrameIndexOutOfRangeSnafu {
                    frame,
                    frames: info.number_of_frames,
                }
            );
            vec![frame]
        }
        None => (0..info.number_of_frames).collect(),
    };

    let needed = frame_bytes * info.number_of_frames as usize;
    ensure!(
        bytes.len() >= needed,
        TruncatedPixelDataSnafu {
            needed,
            available: bytes.len(),
        }
    );

    let frames = frames_wanted
        .iter()
        .map(|&f| bytes[f as usize * frame_bytes..(f as usize + 1) * frame_bytes].to_vec())
        .collect();
    Ok(DecodedPixelData { info, frames })
}

fn decode_encapsulated(
    offset_table: &[u32],
    fragments: &[Vec<u8>],
    info: ImageInfo,
    ts_uid: &str,
    registry: &CodecRegistry,
    only_frame: Option<u32>,
) -> Result<DecodedPixelData> {
    let ts = TransferSyntaxRegistry::get(ts_uid).context(UnsupportedTransferSyntaxSnafu {
        uid: ts_uid.to_string(),
    })?;
    ensure!(
        ts.codec() == Codec::Encapsulated,
        UnsupportedTransferSyntaxSnafu {
            uid: ts_uid.to_string(),
        }
    );

    let frames_wanted: Vec<u32> = match only_frame {
        Some(frame) => vec![frame],
        None => (0..info.number_of_frames).collect(),
    };

    let decode_one = |frame: &u32| -> Result<Vec<u8>> {
        let parts =
            encapsulation::frame_fragments(offset_table, fragments, info.number_of_frames, *frame)?;
        let bitstream: Vec<u8> = parts.concat();
        if ts_uid == uids::RLE_LOSSLESS {
            debug!(frame, "decoding RLE frame");
            rle::decode_frame(&bitstream, &info)
        } else {
            let codec = registry.get(ts_uid).context(CodecFailureSnafu {
                detail: format!("no codec registered for transfer syntax {ts_uid}"),
            })?;
            debug!(frame, codec = codec.name(), "dispatching frame to codec");
            codec.decode_frame(&bitstream, &info)
        }
    };

    #[cfg(feature = "rayon")]
    let frames: Result<Vec<Vec<u8>>> = {
        use rayon::prelude::*;
        frames_wanted.par_iter().map(decode_one).collect()
    };
    #[cfg(not(feature = "rayon"))]
    let frames: Result<Vec<Vec<u8>>> = frames_wanted.iter().map(decode_one).collect();

    Ok(DecodedPixelData {
        info,
        frames: frames?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcmio_core::{DataElement, VR};

    fn base_dataset(bits: u16, frames: u32) -> DataSet {
        let mut ds = DataSet::with_transfer_syntax(uids::EXPLICIT_VR_LITTLE_ENDIAN);
        ds.put(DataElement::new(Tag(0x0028, 0x0010), VR::US, vec![2, 0]));
        ds.put(DataElement::new(Tag(0x0028, 0x0011), VR::US, vec![2, 0]));
        ds.put(DataElement::new(
            Tag(0x0028, 0x0100),
            VR::US,
            vec![bits as u8, 0],
        ));
        ds.put(DataElement::new(
            Tag(0x0028, 0x0101),
            VR::US,
            vec![bits as u8, 0],
        ));
        ds.put(DataElement::new(
            Tag(0x0028, 0x0102),
            VR::US,
            vec![(bits - 1) as u8, 0],
        ));
        ds.put(DataElement::new(Tag(0x0028, 0x0103), VR::US, vec![0, 0]));
        ds.put(DataElement::new(Tag(0x0028, 0x0002), VR::US, vec![1, 0]));
        ds.put(DataElement::new_str(
            Tag(0x0028, 0x0004),
            VR::CS,
            "MONOCHROME2",
        ));
        if frames > 1 {
            ds.put(DataElement::new_str(
                Tag(0x0028, 0x0008),
                VR::IS,
                &frames.to_string(),
            ));
        }
        ds
    }

    #[test]
    fn native_multi_frame_slicing() {
        let mut ds = base_dataset(8, 2);
        ds.put(DataElement::new(
            TAG_PIXEL_DATA,
            VR::OB,
            vec![1, 2, 3, 4, 5, 6, 7, 8],
        ));
        let decoded = ds.decode_pixel_data().unwrap();
        assert_eq!(decoded.number_of_frames(), 2);
        assert_eq!(decoded.frame(0).unwrap(), &[1, 2, 3, 4]);
        assert_eq!(decoded.frame(1).unwrap(), &[5, 6, 7, 8]);
        assert!(matches!(
            decoded.frame(2),
            Err(Error::FrameIndexOutOfRange { .. })
        ));
    }

    #[test]
    fn native_truncation_is_detected() {
        let mut ds = base_dataset(16, 1);
        ds.put(DataElement::new(TAG_PIXEL_DATA, VR::OW, vec![0u8; 6]));
        assert!(matches!(
            ds.decode_pixel_data(),
            Err(Error::TruncatedPixelData { .. })
        ));
    }

    #[test]
    fn missing_pixel_data_requires_full_parse() {
        let ds = base_dataset(8, 1);
        assert!(matches!(
            ds.decode_pixel_data(),
            Err(Error::OperationRequiresFullParse)
        ));
    }

    #[test]
    fn sample_unpacking_with_sign_extension() {
        let mut ds = base_dataset(16, 1);
        ds.put(DataElement::new(Tag(0x0028, 0x0101), VR::US, vec![12, 0]));
        ds.put(DataElement::new(Tag(0x0028, 0x0102), VR::US, vec![11, 0]));
        ds.put(DataElement::new(Tag(0x0028, 0x0103), VR::US, vec![1, 0]));
        // stored values: 0x0FFF (-1 in 12-bit), 0x0001, 0x0800 (-2048), 0x07FF
        let mut bytes = Vec::new();
        for v in [0x0FFFu16, 0x0001, 0x0800, 0x07FF] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        ds.put(DataElement::new(TAG_PIXEL_DATA, VR::OW, bytes));
        let decoded = ds.decode_pixel_data().unwrap();
        assert_eq!(
            decoded.frame_samples(0).unwrap(),
            vec![-1, 1, -2048, 2047]
        );
    }

    #[test]
    fn single_bit_frames_unpack_msb_first() {
        let mut ds = base_dataset(8, 1);
        ds.put(DataElement::new(Tag(0x0028, 0x0100), VR::US, vec![1, 0]));
        ds.put(DataElement::new(Tag(0x0028, 0x0101), VR::US, vec![1, 0]));
        ds.put(DataElement::new(Tag(0x0028, 0x0102), VR::US, vec![0, 0]));
        // 2x2 = 4 samples in one byte: 1011 ....
        ds.put(DataElement::new(TAG_PIXEL_DATA, VR::OB, vec![0b1011_0000]));
        let decoded = ds.decode_pixel_data().unwrap();
        assert_eq!(decoded.frame_samples(0).unwrap(), vec![1, 0, 1, 1]);
    }

    #[test]
    fn encapsulated_without_codec_is_a_codec_failure() {
        let mut ds = base_dataset(8, 1);
        ds.set_transfer_syntax(uids::JPEG_BASELINE);
        ds.put(DataElement::new_pixel_sequence(
            TAG_PIXEL_DATA,
            vec![],
            vec![vec![0xFF, 0xD8, 0xFF, 0xE0]],
        ));
        assert!(matches!(
            ds.decode_pixel_data(),
            Err(Error::CodecFailure { .. })
        ));
    }

    #[test]
    fn encapsulated_rle_frame_decodes() {
        let mut ds = base_dataset(8, 1);
        ds.set_transfer_syntax(uids::RLE_LOSSLESS);
        // RLE fragment: header with 1 segment at offset 64,
        // literal run of 4 bytes
        let mut fragment = vec![0u8; 64];
        fragment[0] = 1;
        fragment[4..8].copy_from_slice(&64u32.to_le_bytes());
        fragment.extend_from_slice(&[0x03, 9, 8, 7, 6]);
        ds.put(DataElement::new_pixel_sequence(
            TAG_PIXEL_DATA,
            vec![],
            vec![fragment],
        ));
        let decoded = ds.decode_pixel_data().unwrap();
        assert_eq!(decoded.frame(0).unwrap(), &[9, 8, 7, 6]);
    }
}
