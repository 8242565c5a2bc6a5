//! The grayscale display pipeline of PS3.3 C.11:
//! modality LUT, VOI LUT, presentation LUT and photometric handling.
//!
//! Stored sample values pass through the stages in order:
//!
//! 1. the modality LUT (rescale slope/intercept or an explicit table)
//!    maps stored values into modality units,
//! 2. the VOI LUT (window center/width or an explicit table) selects
//!    the value range of interest,
//! 3. the presentation LUT shape optionally inverts the output range,
//! 4. MONOCHROME1 inverts once more, palette color and YBR data are
//!    mapped to RGB.
//!
//! Intermediate math is `f64`; final values round half-to-even and
//! saturate into the caller's integer type.

use dcmio_core::{DataSet, Tag};
use num_traits::{Bounded, NumCast};
use snafu::{ensure, OptionExt, Snafu};

use crate::attribute::{PhotometricInterpretation, PlanarConfiguration};
use crate::DecodedPixelData;

const TAG_WINDOW_CENTER: Tag = Tag(0x0028, 0x1050);
const TAG_WINDOW_WIDTH: Tag = Tag(0x0028, 0x1051);
const TAG_WINDOW_EXPLANATION: Tag = Tag(0x0028, 0x1055);
const TAG_RESCALE_INTERCEPT: Tag = Tag(0x0028, 0x1052);
const TAG_RESCALE_SLOPE: Tag = Tag(0x0028, 0x1053);
const TAG_VOI_LUT_FUNCTION: Tag = Tag(0x0028, 0x1056);
const TAG_MODALITY_LUT_SEQUENCE: Tag = Tag(0x0028, 0x3000);
const TAG_VOI_LUT_SEQUENCE: Tag = Tag(0x0028, 0x3010);
const TAG_LUT_DESCRIPTOR: Tag = Tag(0x0028, 0x3002);
const TAG_LUT_DATA: Tag = Tag(0x0028, 0x3006);
const TAG_PRESENTATION_LUT_SHAPE: Tag = Tag(0x2050, 0x0020);
const TAG_RED_PALETTE_DESCRIPTOR: Tag = Tag(0x0028, 0x1101);
const TAG_RED_PALETTE_DATA: Tag = Tag(0x0028, 0x1201);

/// An error from assembling or applying the display pipeline.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum PipelineError {
    /// The window width must be positive.
    #[snafu(display("invalid window width {width}"))]
    InvalidWindow {
        /// the offending width
        width: f64,
    },
    /// The requested window index is not among the declared values.
    #[snafu(display("window index {index} is out of range for {count} windows"))]
    WindowIndexOutOfRange {
        /// the requested index
        index: usize,
        /// number of windows declared
        count: usize,
    },
    /// No declared window carries the requested explanation label.
    #[snafu(display("no window labelled `{label}`"))]
    NoSuchWindowLabel {
        /// the requested (0028,1055) label
        label: String,
    },
    /// A LUT sequence is present but malformed.
    #[snafu(display("malformed lookup table: {detail}"))]
    MalformedLut {
        /// what went wrong
        detail: String,
    },
}

type Result<T, E = PipelineError> = std::result::Result<T, E>;

/// A modality rescale function: `M = slope × S + intercept`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Rescale {
    /// the rescale slope (0028,1053)
    pub slope: f64,
    /// the rescale intercept (0028,1052)
    pub intercept: f64,
}

impl Rescale {
    /// Create a new rescale function.
    #[inline]
    pub fn new(slope: f64, intercept: f64) -> Self {
        Rescale { slope, intercept }
    }

    /// Apply the rescale function to a stored value.
    #[inline]
    pub fn apply(&self, value: f64) -> f64 {
        self.slope * value + self.intercept
    }
}

/// An explicit lookup table, from a Modality or VOI LUT sequence item.
#[derive(Debug, Clone, PartialEq)]
pub struct LutTable {
    first_mapped: i32,
    bits: u16,
    entries: Vec<u16>,
}

impl LutTable {
    /// Build a table from a LUT sequence item, reading the
    /// LUT Descriptor (0028,3002) and LUT Data (0028,3006).
    pub fn from_item(item: &DataSet) -> Result<Self> {
        let descriptor = item
            .element(TAG_LUT_DESCRIPTOR)
            .ok()
            .and_then(|e| e.to_u16s().ok())
            .context(MalformedLutSnafu {
                detail: "missing LUT descriptor".to_string(),
            })?;
        ensure!(
            descriptor.len() == 3,
            MalformedLutSnafu {
                detail: format!("LUT descriptor has {} values, expected 3", descriptor.len()),
            }
        );
        // an entry count of 0 means 2^16 entries
        let declared = if descriptor[0] == 0 {
            0x1_0000usize
        } else {
            <usize as From<_>>::from(descriptor[0])
        };
        let first_mapped = <i32 as From<_>>::from(descriptor[1] as i16);
        let bits = descriptor[2];

        let entries = item
            .element(TAG_LUT_DATA)
            .ok()
            .and_then(|e| e.to_u16s().ok())
            .context(MalformedLutSnafu {
                detail: "missing LUT data".to_string(),
            })?;
        ensure!(
            entries.len() >= declared,
            MalformedLutSnafu {
                detail: format!(
                    "LUT data has {} entries, descriptor declares {}",
                    entries.len(),
                    declared
                ),
            }
        );
        Ok(LutTable {
            first_mapped,
            bits,
            entries: entries.into_vec(),
        })
    }

    /// The number of entries in the table.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a value; inputs outside the mapped range clamp to the
    /// first and last entries, as the standard prescribes.
    pub fn apply(&self, value: f64) -> f64 {
        let index = (value as i64 - <i64 as From<_>>::from(self.first_mapped))
            .clamp(0, self.entries.len() as i64 - 1) as usize;
        <f64 as From<_>>::from(self.entries[index])
    }

    /// The largest value this table can output.
    pub fn output_max(&self) -> f64 {
        if self.bits == 0 || self.bits >= 16 {
            <f64 as From<_>>::from(u16::MAX)
        } else {
            <f64 as From<_>>::from((1u32 << self.bits) - 1)
        }
    }
}

/// The first stage: stored values into modality units.
#[derive(Debug, Clone, PartialEq)]
pub enum ModalityLut {
    /// No transformation.
    Identity,
    /// Linear rescale.
    Rescale(Rescale),
    /// Explicit table.
    Table(LutTable),
}

impl ModalityLut {
    /// Read the modality LUT of the data set: an explicit Modality LUT
    /// Sequence wins over rescale slope/intercept.
    pub fn from_dataset(dataset: &DataSet) -> Result<Self> {
        if let Some(sequence) = dataset.get(TAG_MODALITY_LUT_SEQUENCE) {
            if let Ok(items) = sequence.items() {
                if let Some(item) = items.first() {
                    return Ok(ModalityLut::Table(LutTable::from_item(item)?));
                }
            }
        }
        let intercept = dataset.f64(TAG_RESCALE_INTERCEPT).ok();
        let slope = dataset.f64(TAG_RESCALE_SLOPE).ok();
        match (slope, intercept) {
            (None, None) => Ok(ModalityLut::Identity),
            (slope, intercept) => Ok(ModalityLut::Rescale(Rescale::new(
                slope.unwrap_or(1.0),
                intercept.unwrap_or(0.0),
            ))),
        }
    }

    /// Apply this stage.
    pub fn apply(&self, value: f64) -> f64 {
        match self {
            ModalityLut::Identity => value,
            ModalityLut::Rescale(rescale) => rescale.apply(value),
            ModalityLut::Table(table) => table.apply(value),
        }
    }
}

/// A known VOI LUT function descriptor (0028,1056).
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash)]
pub enum VoiLutFunction {
    /// LINEAR, the default
    #[default]
    Linear,
    /// LINEAR_EXACT
    LinearExact,
    /// SIGMOID
    Sigmoid,
}

impl VoiLutFunction {
    /// Interpret the (0028,1056) code string;
    /// unknown codes fall back to LINEAR.
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "LINEAR_EXACT" => VoiLutFunction::LinearExact,
            "SIGMOID" => VoiLutFunction::Sigmoid,
            _ => VoiLutFunction::Linear,
        }
    }
}

/// The parameters of a single window: center and width.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct WindowLevel {
    /// the window center (0028,1050)
    pub center: f64,
    /// the window width (0028,1051), must be positive
    pub width: f64,
}

/// A validated window transformation with its VOI LUT function.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct WindowLevelTransform {
    function: VoiLutFunction,
    window: WindowLevel,
}

impl WindowLevelTransform {
    /// Create a window transformation.
    /// Fails with [`PipelineError::InvalidWindow`] when the width is
    /// zero or negative.
    pub fn new(function: VoiLutFunction, window: WindowLevel) -> Result<Self> {
        ensure!(
            window.width > 0.0,
            InvalidWindowSnafu {
                width: window.width,
            }
        );
        Ok(WindowLevelTransform { function, window })
    }

    /// Create a LINEAR window transformation.
    pub fn linear(window: WindowLevel) -> Result<Self> {
        Self::new(VoiLutFunction::Linear, window)
    }

    /// Map a modality value into `[0, y_max]`.
    pub fn apply(&self, value: f64, y_max: f64) -> f64 {
        let WindowLevel { center, width } = self.window;
        match self.function {
            VoiLutFunction::Linear => {
                // C.11.2.1.2: w == 1 degenerates into a step at c - 0.5
                if width <= 1.0 {
                    if value <= center - 0.5 {
                        0.0
                    } else {
                        y_max
                    }
                } else {
                    let min = center - 0.5 - (width - 1.0) / 2.0;
                    let max = center - 0.5 + (width - 1.0) / 2.0;
                    if value <= min {
                        0.0
                    } else if value > max {
                        y_max
                    } else {
                        ((value - (center - 0.5)) / (width - 1.0) + 0.5) * y_max
                    }
                }
            }
            VoiLutFunction::LinearExact => {
                // C.11.2.1.3.2
                let min = center - width / 2.0;
                let max = center + width / 2.0;
                if value <= min {
                    0.0
                } else if value > max {
                    y_max
                } else {
                    ((value - center) / width + 0.5) * y_max
                }
            }
            VoiLutFunction::Sigmoid => {
                // C.11.2.1.3.1
                y_max / (1.0 + f64::exp(-4.0 * (value - center) / width))
            }
        }
    }
}

/// The second stage: modality values into the range of interest.
#[derive(Debug, Clone, PartialEq)]
pub enum VoiLut {
    /// No value-of-interest selection.
    Identity,
    /// Window center/width.
    Window(WindowLevelTransform),
    /// Explicit table.
    Table(LutTable),
}

impl VoiLut {
    /// Apply this stage, producing a value in `[0, y_max]`.
    pub fn apply(&self, value: f64, y_max: f64) -> f64 {
        match self {
            VoiLut::Identity => value.clamp(0.0, y_max),
            VoiLut::Window(window) => window.apply(value, y_max),
            VoiLut::Table(table) => table.apply(value) / table.output_max() * y_max,
        }
    }
}

/// The third stage: the presentation LUT shape (2050,0020).
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub enum PresentationShape {
    /// IDENTITY, a no-op
    #[default]
    Identity,
    /// INVERSE flips the output range
    Inverse,
}

/// The assembled grayscale display pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayPipeline {
    modality: ModalityLut,
    voi: VoiLut,
    presentation: PresentationShape,
    invert_monochrome: bool,
}

impl DisplayPipeline {
    /// Assemble the pipeline from a data set's LUT attributes,
    /// selecting the first declared window unless overridden.
    pub fn from_dataset(dataset: &DataSet, window: Option<WindowLevel>) -> Result<Self> {
        Self::from_dataset_with_window_index(dataset, window, 0)
    }

    /// Assemble the pipeline, selecting the declared window whose
    /// Window Center & Width Explanation (0028,1055) matches `label`.
    pub fn from_dataset_with_window_label(dataset: &DataSet, label: &str) -> Result<Self> {
        let index = dataset
            .strings(TAG_WINDOW_EXPLANATION)
            .ok()
            .and_then(|labels| labels.iter().position(|l| l == label))
            .context(NoSuchWindowLabelSnafu { label })?;
        Self::from_dataset_with_window_index(dataset, None, index)
    }

    /// Assemble the pipeline, selecting the multi-valued window
    /// at `window_index` when no override is given.
    pub fn from_dataset_with_window_index(
        dataset: &DataSet,
        window_override: Option<WindowLevel>,
        window_index: usize,
    ) -> Result<Self> {
        let modality = ModalityLut::from_dataset(dataset)?;

        let function = dataset
            .string(TAG_VOI_LUT_FUNCTION)
            .map(|code| VoiLutFunction::from_code(&code))
            .unwrap_or_default();

        let voi = if let Some(window) = window_override {
            VoiLut::Window(WindowLevelTransform::new(function, window)?)
        } else if let Some(sequence) = dataset.get(TAG_VOI_LUT_SEQUENCE) {
            match sequence.items().ok().and_then(|items| items.first()) {
                Some(item) => VoiLut::Table(LutTable::from_item(item)?),
                None => VoiLut::Identity,
            }
        } else {
            let centers = dataset.f64s(TAG_WINDOW_CENTER).ok();
            let widths = dataset.f64s(TAG_WINDOW_WIDTH).ok();
            match (centers, widths) {
                (Some(centers), Some(widths)) => {
                    let count = centers.len().min(widths.len());
                    ensure!(
                        window_index < count,
                        WindowIndexOutOfRangeSnafu {
                            index: window_index,
                            count,
                        }
                    );
                    VoiLut::Window(WindowLevelTransform::new(
                        function,
                        WindowLevel {
                            center: centers[window_index],
                            width: widths[window_index],
                        },
                    )?)
                }
                _ => VoiLut::Identity,
            }
        };

        let presentation = match dataset.string(TAG_PRESENTATION_LUT_SHAPE) {
            Ok(code) if code.trim() == "INVERSE" => PresentationShape::Inverse,
            _ => PresentationShape::Identity,
        };

        let invert_monochrome = dataset
            .string(Tag(0x0028, 0x0004))
            .map(|code| PhotometricInterpretation::from_code(&code))
            .map(|pi| pi == PhotometricInterpretation::Monochrome1)
            .unwrap_or(false);

        Ok(DisplayPipeline {
            modality,
            voi,
            presentation,
            invert_monochrome,
        })
    }

    /// Run one stored value through every stage,
    /// into the continuous range `[0, y_max]`.
    pub fn apply_value(&self, stored: f64, y_max: f64) -> f64 {
        let modality = self.modality.apply(stored);
        let mut value = self.voi.apply(modality, y_max);
        if self.presentation == PresentationShape::Inverse {
            value = y_max - value;
        }
        if self.invert_monochrome {
            value = y_max - value;
        }
        value
    }

    /// Run a frame of stored samples through the pipeline into the
    /// caller's integer type, rounding half-to-even and saturating.
    pub fn apply<T>(&self, samples: &[i32]) -> Vec<T>
    where
        T: Bounded + NumCast + Copy,
    {
        let y_max = T::max_value()
            .to_f64()
            .expect("output maximum must be representable");
        samples
            .iter()
            .map(|&s| {
                let value = self.apply_value(<f64 as From<_>>::from(s), y_max).clamp(0.0, y_max);
                T::from(value.round_ties_even()).unwrap_or_else(T::max_value)
            })
            .collect()
    }
}

/// The palette color lookup tables of a PALETTE COLOR image.
#[derive(Debug, Clone, PartialEq)]
pub struct PaletteLut {
    red: LutTable,
    green: LutTable,
    blue: LutTable,
}

impl PaletteLut {
    /// Read the three palette color LUTs from the data set.
    pub fn from_dataset(dataset: &DataSet) -> Result<Self> {
        let channel = |descriptor_tag: Tag, data_tag: Tag, name: &str| -> Result<LutTable> {
            let descriptor = dataset
                .element(descriptor_tag)
                .ok()
                .and_then(|e| e.to_u16s().ok())
                .context(MalformedLutSnafu {
                    detail: format!("missing {name} palette descriptor"),
                })?;
            ensure!(
                descriptor.len() == 3,
                MalformedLutSnafu {
                    detail: format!("{name} palette descriptor is malformed"),
                }
            );
            let entries = dataset
                .element(data_tag)
                .ok()
                .and_then(|e| e.to_u16s().ok())
                .context(MalformedLutSnafu {
                    detail: format!("missing {name} palette data"),
                })?;
            let declared = if descriptor[0] == 0 {
                0x1_0000usize
            } else {
                <usize as From<_>>::from(descriptor[0])
            };
            ensure!(
                entries.len() >= declared,
                MalformedLutSnafu {
                    detail: format!("{name} palette data is shorter than declared"),
                }
            );
            Ok(LutTable {
                first_mapped: <i32 as From<_>>::from(descriptor[1] as i16),
                bits: descriptor[2],
                entries: entries.into_vec(),
            })
        };

        Ok(PaletteLut {
            red: channel(TAG_RED_PALETTE_DESCRIPTOR, TAG_RED_PALETTE_DATA, "red")?,
            green: channel(Tag(0x0028, 0x1102), Tag(0x0028, 0x1202), "green")?,
            blue: channel(Tag(0x0028, 0x1103), Tag(0x0028, 0x1203), "blue")?,
        })
    }

    /// Map an indexed stored value to 8-bit RGB.
    pub fn apply(&self, stored: f64) -> [u8; 3] {
        let to8 = |table: &LutTable| -> u8 {
            let value = table.apply(stored);
            if table.bits > 8 {
                (value / 257.0).round_ties_even().clamp(0.0, 255.0) as u8
            } else {
                value.clamp(0.0, 255.0) as u8
            }
        };
        [to8(&self.red), to8(&self.green), to8(&self.blue)]
    }
}

/// Convert one full-range YCbCr pixel to RGB, per PS3.3 C.7.6.3.1.2.
pub fn ybr_to_rgb(y: u8, cb: u8, cr: u8) -> [u8; 3] {
    let y = <f64 as From<_>>::from(y);
    let cb = <f64 as From<_>>::from(cb) - 128.0;
    let cr = <f64 as From<_>>::from(cr) - 128.0;
    let clamp = |v: f64| v.round_ties_even().clamp(0.0, 255.0) as u8;
    [
        clamp(y + 1.402 * cr),
        clamp(y - 0.344136 * cb - 0.714136 * cr),
        clamp(y + 1.772 * cb),
    ]
}

/// Render one frame to interleaved 8-bit RGB, dispatching on the
/// photometric interpretation.
pub fn render_rgb8(
    decoded: &DecodedPixelData,
    frame: u32,
    dataset: &DataSet,
    window: Option<WindowLevel>,
) -> Result<Vec<u8>, crate::Error> {
    use PhotometricInterpretation::*;

    let info = decoded.info().clone();
    match &info.photometric_interpretation {
        Monochrome1 | Monochrome2 => {
            let pipeline = DisplayPipeline::from_dataset(dataset, window)
                .map_err(pipeline_to_decode_error)?;
            let samples = decoded.frame_samples(frame)?;
            let gray: Vec<u8> = pipeline.apply(&samples);
            Ok(gray.iter().flat_map(|&g| [g, g, g]).collect())
        }
        PaletteColor => {
            let palette =
                PaletteLut::from_dataset(dataset).map_err(pipeline_to_decode_error)?;
            let samples = decoded.frame_samples(frame)?;
            Ok(samples
                .iter()
                .flat_map(|&s| palette.apply(<f64 as From<_>>::from(s)))
                .collect())
        }
        Rgb => {
            let bytes = decoded.frame(frame)?;
            match info.planar_configuration {
                PlanarConfiguration::Interleaved => Ok(bytes.to_vec()),
                PlanarConfiguration::Planar => {
                    let pixels = bytes.len() / 3;
                    let mut out = Vec::with_capacity(bytes.len());
                    for i in 0..pixels {
                        out.push(bytes[i]);
                        out.push(bytes[pixels + i]);
                        out.push(bytes[2 * pixels + i]);
                    }
                    Ok(out)
                }
            }
        }
        YbrFull => {
            let bytes = decoded.frame(frame)?;
            Ok(bytes
                .chunks_exact(3)
                .flat_map(|p| ybr_to_rgb(p[0], p[1], p[2]))
                .collect())
        }
        YbrFull422 => {
            // two luminance samples share one chrominance pair
            let bytes = decoded.frame(frame)?;
            let mut out = Vec::with_capacity(bytes.len() / 4 * 6);
            for quad in bytes.chunks_exact(4) {
                out.extend(ybr_to_rgb(quad[0], quad[2], quad[3]));
                out.extend(ybr_to_rgb(quad[1], quad[2], quad[3]));
            }
            Ok(out)
        }
        Other(code) => Err(crate::Error::UnsupportedAttribute {
            name: "PhotometricInterpretation",
            value: code.clone(),
        }),
    }
}

fn pipeline_to_decode_error(error: PipelineError) -> crate::Error {
    crate::Error::CodecFailure {
        detail: error.to_string(),
    }
}
