//! RLE Lossless frame decoding, per PS3.5 Annex G.
//!
//! An RLE frame is one pixel data fragment: a 64-byte header of up to
//! 15 segment offsets, followed by PackBits-compressed segments. Each
//! segment holds one byte plane of one sample, most significant byte
//! first; decoding reassembles them into interleaved little endian
//! samples.

use byteorder::{ByteOrder, LittleEndian};
use snafu::ensure;

use crate::attribute::ImageInfo;
use crate::{CodecFailureSnafu, Result, TruncatedFragmentSnafu};

/// Decode one RLE frame into interleaved little endian samples.
pub fn decode_frame(fragment: &[u8], info: &ImageInfo) -> Result<Vec<u8>> {
    ensure!(
        fragment.len() >= 64,
        TruncatedFragmentSnafu {
            frame: 0u32,
            needed: 64usize,
            available: fragment.len(),
        }
    );
    ensure!(
        info.bits_allocated == 8 || info.bits_allocated == 16,
        CodecFailureSnafu {
            detail: format!(
                "RLE frames with {} bits allocated are not supported",
                info.bits_allocated
            ),
        }
    );

    let bytes_per_sample = usize::from(info.bits_allocated / 8);
    let samples = usize::from(info.samples_per_pixel);
    let segment_count = LittleEndian::read_u32(&fragment[0..4]) as usize;
    ensure!(
        segment_count == bytes_per_sample * samples && segment_count <= 15,
        CodecFailureSnafu {
            detail: format!(
                "RLE header declares {} segments, expected {}",
                segment_count,
                bytes_per_sample * samples
            ),
        }
    );

    let mut offsets: Vec<usize> = (0..segment_count)
        .map(|i| LittleEndian::read_u32(&fragment[4 + 4 * i..8 + 4 * i]) as usize)
        .collect();
    offsets.push(fragment.len());

    let pixels = usize::from(info.rows) * usize::from(info.columns);
    let mut out = vec![0u8; pixels * samples * bytes_per_sample];

    for sample in 0..samples {
        for byte in 0..bytes_per_sample {
            let segment_index = sample * bytes_per_sample + byte;
            let start = offsets[segment_index];
            let end = offsets[segment_index + 1];
            ensure!(
                start <= end && end <= fragment.len(),
                CodecFailureSnafu {
                    detail: format!("RLE segment {segment_index} has invalid bounds"),
                }
            );
            let plane = unpack_bits(&fragment[start..end], pixels)?;

            // segments carry the MSB plane first; samples interleave LE
            let out_offset = sample * bytes_per_sample + (bytes_per_sample - 1 - byte);
            for (pixel, value) in plane.iter().enumerate() {
                out[pixel * samples * bytes_per_sample + out_offset] = *value;
            }
        }
    }
    Ok(out)
}

/// Expand a PackBits-compressed segment into exactly `expected` bytes.
fn unpack_bits(segment: &[u8], expected: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(expected);
    let mut pos = 0;
    while out.len() < expected && pos < segment.len() {
        let control = segment[pos] as i8;
        pos += 1;
        match control {
            0..=127 => {
                let count = control as usize + 1;
                ensure!(
                    pos + count <= segment.len(),
                    CodecFailureSnafu {
                        detail: "PackBits literal run past segment end".to_string(),
                    }
                );
                out.extend_from_slice(&segment[pos..pos + count]);
                pos += count;
            }
            -127..=-1 => {
                let count = (1 - isize::from(control)) as usize;
                ensure!(
                    pos < segment.len(),
                    CodecFailureSnafu {
                        detail: "PackBits replicate run past segment end".to_string(),
                    }
                );
                out.extend(std::iter::repeat(segment[pos]).take(count));
                pos += 1;
            }
            -128 => {} // no-op control byte
        }
    }
    ensure!(
        out.len() >= expected,
        CodecFailureSnafu {
            detail: format!(
                "PackBits segment expanded to {} bytes, expected {}",
                out.len(),
                expected
            ),
        }
    );
    out.truncate(expected);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::{
        PhotometricInterpretation, PixelRepresentation, PlanarConfiguration,
    };

    fn info(rows: u16, columns: u16, bits: u16, samples: u16) -> ImageInfo {
        ImageInfo {
            rows,
            columns,
            bits_allocated: bits,
            bits_stored: bits,
            high_bit: bits - 1,
            samples_per_pixel: samples,
            photometric_interpretation: if samples == 3 {
                PhotometricInterpretation::Rgb
            } else {
                PhotometricInterpretation::Monochrome2
            },
            pixel_representation: PixelRepresentation::Unsigned,
            planar_configuration: PlanarConfiguration::Interleaved,
            number_of_frames: 1,
        }
    }

    fn rle_fragment(segments: &[Vec<u8>]) -> Vec<u8> {
        let mut header = vec![0u8; 64];
        LittleEndian::write_u32(&mut header[0..4], segments.len() as u32);
        let mut offset = 64u32;
        for (i, segment) in segments.iter().enumerate() {
            LittleEndian::write_u32(&mut header[4 + 4 * i..8 + 4 * i], offset);
            offset += segment.len() as u32;
        }
        let mut out = header;
        for segment in segments {
            out.extend_from_slice(segment);
        }
        out
    }

    #[test]
    fn unpack_bits_runs() {
        // literal run of 3, then replicate 0xAB four times
        let segment = [0x02, 1, 2, 3, 0xFD, 0xAB];
        let out = unpack_bits(&segment, 7).unwrap();
        assert_eq!(out, vec![1, 2, 3, 0xAB, 0xAB, 0xAB, 0xAB]);
    }

    #[test]
    fn decode_8_bit_grayscale() {
        // 2x2, one segment: replicate 5 twice, literal 7 8
        let fragment = rle_fragment(&[vec![0xFF, 5, 0x01, 7, 8]]);
        let out = decode_frame(&fragment, &info(2, 2, 8, 1)).unwrap();
        assert_eq!(out, vec![5, 5, 7, 8]);
    }

    #[test]
    fn decode_16_bit_interleaves_planes() {
        // 1x2, 16-bit: MSB plane [0x01, 0x02], LSB plane [0x10, 0x20]
        let fragment = rle_fragment(&[vec![0x01, 0x01, 0x02], vec![0x01, 0x10, 0x20]]);
        let out = decode_frame(&fragment, &info(1, 2, 16, 1)).unwrap();
        // little endian samples 0x0110, 0x0220
        assert_eq!(out, vec![0x10, 0x01, 0x20, 0x02]);
    }

    #[test]
    fn segment_count_mismatch_is_a_codec_failure() {
        let fragment = rle_fragment(&[vec![0x00, 1]]);
        let err = decode_frame(&fragment, &info(1, 1, 16, 1)).unwrap_err();
        assert!(matches!(err, crate::Error::CodecFailure { .. }));
    }
}
