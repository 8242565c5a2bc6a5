//! Extraction of the image pixel module attributes from a data set.

use dcmio_core::{DataSet, Tag};
use snafu::{ensure, ResultExt};

use crate::{InvalidAttributeSnafu, Result, UnsupportedAttributeSnafu};

const TAG_SAMPLES_PER_PIXEL: Tag = Tag(0x0028, 0x0002);
const TAG_PHOTOMETRIC_INTERPRETATION: Tag = Tag(0x0028, 0x0004);
const TAG_PLANAR_CONFIGURATION: Tag = Tag(0x0028, 0x0006);
const TAG_NUMBER_OF_FRAMES: Tag = Tag(0x0028, 0x0008);
const TAG_ROWS: Tag = Tag(0x0028, 0x0010);
const TAG_COLUMNS: Tag = Tag(0x0028, 0x0011);
const TAG_BITS_ALLOCATED: Tag = Tag(0x0028, 0x0100);
const TAG_BITS_STORED: Tag = Tag(0x0028, 0x0101);
const TAG_HIGH_BIT: Tag = Tag(0x0028, 0x0102);
const TAG_PIXEL_REPRESENTATION: Tag = Tag(0x0028, 0x0103);

/// How the samples of a stored pixel are to be interpreted for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotometricInterpretation {
    /// Single sample, minimum value displays as white.
    Monochrome1,
    /// Single sample, minimum value displays as black.
    Monochrome2,
    /// Indexed color through the palette color lookup tables.
    PaletteColor,
    /// Red, green and blue samples.
    Rgb,
    /// Luminance and chrominance samples, full range.
    YbrFull,
    /// Luminance and chrominance, chrominance subsampled 2:1.
    YbrFull422,
    /// Any other declared interpretation.
    Other(String),
}

impl PhotometricInterpretation {
    /// Interpret the (0028,0004) code string.
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "MONOCHROME1" => PhotometricInterpretation::Monochrome1,
            "MONOCHROME2" => PhotometricInterpretation::Monochrome2,
            "PALETTE COLOR" => PhotometricInterpretation::PaletteColor,
            "RGB" => PhotometricInterpretation::Rgb,
            "YBR_FULL" => PhotometricInterpretation::YbrFull,
            "YBR_FULL_422" => PhotometricInterpretation::YbrFull422,
            other => PhotometricInterpretation::Other(other.to_string()),
        }
    }

    /// Whether this is one of the two monochrome interpretations.
    pub fn is_monochrome(&self) -> bool {
        matches!(
            self,
            PhotometricInterpretation::Monochrome1 | PhotometricInterpretation::Monochrome2
        )
    }
}

impl std::fmt::Display for PhotometricInterpretation {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let code = match self {
            PhotometricInterpretation::Monochrome1 => "MONOCHROME1",
            PhotometricInterpretation::Monochrome2 => "MONOCHROME2",
            PhotometricInterpretation::PaletteColor => "PALETTE COLOR",
            PhotometricInterpretation::Rgb => "RGB",
            PhotometricInterpretation::YbrFull => "YBR_FULL",
            PhotometricInterpretation::YbrFull422 => "YBR_FULL_422",
            PhotometricInterpretation::Other(code) => code,
        };
        f.write_str(code)
    }
}

/// Whether stored values are plain binary or two's complement.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PixelRepresentation {
    /// Unsigned binary values.
    Unsigned,
    /// Signed two's complement values.
    Signed,
}

/// How the samples of multi-sample pixels are laid out.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PlanarConfiguration {
    /// Samples of one pixel stay together (R1 G1 B1 R2 G2 B2 ...).
    Interleaved,
    /// Each sample plane is stored whole (R1 R2 ... G1 G2 ... B1 B2 ...).
    Planar,
}

/// The image pixel module attributes needed to decode pixel data.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageInfo {
    /// number of rows (0028,0010)
    pub rows: u16,
    /// number of columns (0028,0011)
    pub columns: u16,
    /// bits allocated per sample (0028,0100), one of 1, 8, 16 or 32
    pub bits_allocated: u16,
    /// bits actually stored per sample (0028,0101)
    pub bits_stored: u16,
    /// position of the most significant stored bit (0028,0102)
    pub high_bit: u16,
    /// samples per pixel (0028,0002), 1 or 3
    pub samples_per_pixel: u16,
    /// interpretation of the samples (0028,0004)
    pub photometric_interpretation: PhotometricInterpretation,
    /// signedness of stored values (0028,0103)
    pub pixel_representation: PixelRepresentation,
    /// layout of multi-sample pixels (0028,0006)
    pub planar_configuration: PlanarConfiguration,
    /// number of frames (0028,0008), 1 when absent
    pub number_of_frames: u32,
}

impl ImageInfo {
    /// Gather the image pixel module from a data set,
    /// applying the defaulting rules of PS3.3 C.7.6.3.
    pub fn from_dataset(dataset: &DataSet) -> Result<Self> {
        let rows = dataset.u16(TAG_ROWS).context(InvalidAttributeSnafu {
            name: "Rows",
        })?;
        let columns = dataset.u16(TAG_COLUMNS).context(InvalidAttributeSnafu {
            name: "Columns",
        })?;
        let bits_allocated = dataset
            .u16(TAG_BITS_ALLOCATED)
            .context(InvalidAttributeSnafu {
                name: "BitsAllocated",
            })?;
        ensure!(
            matches!(bits_allocated, 1 | 8 | 16 | 32),
            UnsupportedAttributeSnafu {
                name: "BitsAllocated",
                value: bits_allocated.to_string(),
            }
        );
        let bits_stored = match dataset.get(TAG_BITS_STORED) {
            Some(e) => e
                .to_u16s()
                .ok()
                .and_then(|v| v.first().copied())
                .unwrap_or(bits_allocated),
            None => bits_allocated,
        };
        let high_bit = match dataset.get(TAG_HIGH_BIT) {
            Some(e) => e
                .to_u16s()
                .ok()
                .and_then(|v| v.first().copied())
                .unwrap_or(bits_stored.saturating_sub(1)),
            None => bits_stored.saturating_sub(1),
        };
        let samples_per_pixel = match dataset.get(TAG_SAMPLES_PER_PIXEL) {
            Some(_) => dataset
                .u16(TAG_SAMPLES_PER_PIXEL)
                .context(InvalidAttributeSnafu {
                    name: "SamplesPerPixel",
                })?,
            None => 1,
        };
        ensure!(
            samples_per_pixel == 1 || samples_per_pixel == 3,
            UnsupportedAttributeSnafu {
                name: "SamplesPerPixel",
                value: samples_per_pixel.to_string(),
            }
        );

        let photometric_interpretation = dataset
            .string(TAG_PHOTOMETRIC_INTERPRETATION)
            .map(|code| PhotometricInterpretation::from_code(&code))
            .unwrap_or(PhotometricInterpretation::Monochrome2);

        let pixel_representation = match dataset.get(TAG_PIXEL_REPRESENTATION) {
            Some(e) if e.to_u16s().ok().and_then(|v| v.first().copied()) == Some(1) => {
                PixelRepresentation::Signed
            }
            _ => PixelRepresentation::Unsigned,
        };
        let planar_configuration = match dataset.get(TAG_PLANAR_CONFIGURATION) {
            Some(e) if e.to_u16s().ok().and_then(|v| v.first().copied()) == Some(1) => {
                PlanarConfiguration::Planar
            }
            _ => PlanarConfiguration::Interleaved,
        };
        let number_of_frames = match dataset.get(TAG_NUMBER_OF_FRAMES) {
            Some(e) => e
                .to_int()
                .ok()
                .filter(|&n| n > 0)
                .map(|n| n as u32)
                .unwrap_or(1),
            None => 1,
        };

        Ok(ImageInfo {
            rows,
            columns,
            bits_allocated,
            bits_stored,
            high_bit,
            samples_per_pixel,
            photometric_interpretation,
            pixel_representation,
            planar_configuration,
            number_of_frames,
        })
    }

    /// The number of samples in one frame.
    pub fn samples_per_frame(&self) -> usize {
        usize::from(self.rows) * usize::from(self.columns) * usize::from(self.samples_per_pixel)
    }

    /// The byte size of one natively encoded frame.
    /// Single-bit frames round up to whole bytes.
    pub fn frame_bytes(&self) -> usize {
        match self.bits_allocated {
            1 => self.samples_per_frame().div_ceil(8),
            bits => self.samples_per_frame() * usize::from(bits / 8),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcmio_core::{DataElement, VR};

    fn base_dataset() -> DataSet {
        let mut ds = DataSet::new();
        ds.put(DataElement::new(TAG_ROWS, VR::US, vec![0x00, 0x02]));
        ds.put(DataElement::new(TAG_COLUMNS, VR::US, vec![0x00, 0x02]));
        ds.put(DataElement::new(TAG_BITS_ALLOCATED, VR::US, vec![16, 0]));
        ds.put(DataElement::new(TAG_BITS_STORED, VR::US, vec![12, 0]));
        ds.put(DataElement::new(TAG_HIGH_BIT, VR::US, vec![11, 0]));
        ds.put(DataElement::new(
            TAG_PIXEL_REPRESENTATION,
            VR::US,
            vec![0, 0],
        ));
        ds.put(DataElement::new_str(
            TAG_PHOTOMETRIC_INTERPRETATION,
            VR::CS,
            "MONOCHROME2",
        ));
        ds
    }

    #[test]
    fn gathers_attributes_with_defaults() {
        let info = ImageInfo::from_dataset(&base_dataset()).unwrap();
        assert_eq!(info.rows, 512);
        assert_eq!(info.columns, 512);
        assert_eq!(info.bits_allocated, 16);
        assert_eq!(info.bits_stored, 12);
        assert_eq!(info.high_bit, 11);
        assert_eq!(info.samples_per_pixel, 1);
        assert_eq!(info.number_of_frames, 1);
        assert_eq!(info.pixel_representation, PixelRepresentation::Unsigned);
        assert_eq!(info.planar_configuration, PlanarConfiguration::Interleaved);
        assert_eq!(info.frame_bytes(), 512 * 512 * 2);
    }

    #[test]
    fn single_bit_frames_round_up() {
        let mut ds = base_dataset();
        ds.put(DataElement::new(TAG_ROWS, VR::US, vec![3, 0]));
        ds.put(DataElement::new(TAG_COLUMNS, VR::US, vec![3, 0]));
        ds.put(DataElement::new(TAG_BITS_ALLOCATED, VR::US, vec![1, 0]));
        ds.put(DataElement::new(TAG_BITS_STORED, VR::US, vec![1, 0]));
        ds.put(DataElement::new(TAG_HIGH_BIT, VR::US, vec![0, 0]));
        let info = ImageInfo::from_dataset(&ds).unwrap();
        assert_eq!(info.frame_bytes(), 2);
    }

    #[test]
    fn missing_rows_is_an_error() {
        let mut ds = base_dataset();
        ds.remove(TAG_ROWS);
        assert!(ImageInfo::from_dataset(&ds).is_err());
    }

    #[test]
    fn photometric_codes() {
        assert_eq!(
            PhotometricInterpretation::from_code("PALETTE COLOR"),
            PhotometricInterpretation::PaletteColor
        );
        assert!(PhotometricInterpretation::from_code("MONOCHROME1").is_monochrome());
        assert_eq!(
            PhotometricInterpretation::from_code("HSV"),
            PhotometricInterpretation::Other("HSV".into())
        );
    }
}
