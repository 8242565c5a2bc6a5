//! The external pixel data codec interface.
//!
//! Compressed bitstream formats of the JPEG family are not decoded by
//! this crate. Instead, a [`PixelCodec`] implementation is registered
//! for the transfer syntaxes it handles, and the decoder dispatches
//! frame fragments to it. A registry with no codecs still decodes
//! native and RLE pixel data.

use std::collections::HashMap;
use std::sync::Arc;

use crate::attribute::ImageInfo;
use crate::Result;

/// A decoder for one or more compressed pixel data formats.
///
/// Implementations receive the concatenated fragments of a single
/// frame and return its samples as interleaved little endian bytes
/// matching the image attributes.
pub trait PixelCodec: Send + Sync {
    /// A short name for diagnostics, e.g. `"jpeg"`.
    fn name(&self) -> &str;

    /// Decode one frame from its compressed bitstream.
    fn decode_frame(&self, bitstream: &[u8], info: &ImageInfo) -> Result<Vec<u8>>;

    /// Split a multi-frame bitstream into frames, when the format can
    /// demarcate them itself. The fallback of one fragment per frame
    /// is used when this returns `None`.
    fn demarcate_frames(&self, _bitstream: &[u8], _info: &ImageInfo) -> Option<Vec<usize>> {
        None
    }
}

/// A registry binding transfer syntax UIDs to pixel codecs.
#[derive(Default, Clone)]
pub struct CodecRegistry {
    codecs: HashMap<String, Arc<dyn PixelCodec>>,
}

impl CodecRegistry {
    /// Create a registry with no codecs.
    pub fn new() -> Self {
        CodecRegistry::default()
    }

    /// Register a codec for the given transfer syntax UID,
    /// replacing any previous registration.
    pub fn register(&mut self, ts_uid: &str, codec: Arc<dyn PixelCodec>) {
        self.codecs.insert(ts_uid.to_string(), codec);
    }

    /// Look up the codec registered for a transfer syntax UID.
    pub fn get(&self, ts_uid: &str) -> Option<&Arc<dyn PixelCodec>> {
        self.codecs.get(ts_uid.trim_end_matches('\0').trim())
    }
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mut names: Vec<_> = self
            .codecs
            .iter()
            .map(|(uid, codec)| format!("{uid} -> {}", codec.name()))
            .collect();
        names.sort();
        f.debug_struct("CodecRegistry").field("codecs", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::{
        PhotometricInterpretation, PixelRepresentation, PlanarConfiguration,
    };
    use dcmio_core::uids;

    struct FakeCodec;

    impl PixelCodec for FakeCodec {
        fn name(&self) -> &str {
            "fake"
        }

        fn decode_frame(&self, bitstream: &[u8], _info: &ImageInfo) -> Result<Vec<u8>> {
            Ok(bitstream.to_vec())
        }
    }

    #[test]
    fn register_and_dispatch() {
        let mut registry = CodecRegistry::new();
        registry.register(uids::JPEG_BASELINE, Arc::new(FakeCodec));
        assert!(registry.get(uids::JPEG_BASELINE).is_some());
        assert!(registry.get("1.2.840.10008.1.2.4.50\0").is_some());
        assert!(registry.get(uids::JPEG_2000).is_none());

        let info = ImageInfo {
            rows: 1,
            columns: 1,
            bits_allocated: 8,
            bits_stored: 8,
            high_bit: 7,
            samples_per_pixel: 1,
            photometric_interpretation: PhotometricInterpretation::Monochrome2,
            pixel_representation: PixelRepresentation::Unsigned,
            planar_configuration: PlanarConfiguration::Interleaved,
            number_of_frames: 1,
        };
        let codec = registry.get(uids::JPEG_BASELINE).unwrap();
        assert_eq!(codec.decode_frame(&[7], &info).unwrap(), vec![7]);
    }
}
