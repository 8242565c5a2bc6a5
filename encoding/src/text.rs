//! Text decoding and encoding under DICOM specific character sets.
//!
//! Raw value bytes stay untouched in the data set; these codecs turn them
//! into strings on request. Supported repertoires:
//!
//! | Character set | decoding | encoding |
//! |---------------|----------|----------|
//! | ISO-IR 6 (default) | ✓ | ✓ |
//! | ISO-IR 100 (ISO-8859-1) | ✓ | ✓ |
//! | ISO-IR 144 (ISO-8859-5) | ✓ | ✓ |
//! | ISO-IR 192 (UTF-8) | ✓ | ✓ |
//! | ISO 2022 escape sequences over the single-byte sets above | ✓ | x |

use dcmio_core::{DataSet, Tag};
use encoding::all::{ISO_8859_1, ISO_8859_5, UTF_8};
use encoding::{DecoderTrap, EncoderTrap, Encoding};
use snafu::{OptionExt, Snafu};

/// An error from decoding text under a specific character set.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum DecodeTextError {
    /// The bytes are not valid in the active repertoire.
    #[snafu(display("malformed text under {charset}"))]
    MalformedText {
        /// the active character set name
        charset: &'static str,
    },
    /// An ISO 2022 escape sequence designates an unsupported set.
    #[snafu(display("unsupported ISO 2022 escape sequence {bytes:02X?}"))]
    UnsupportedEscape {
        /// the escape sequence bytes after ESC
        bytes: Vec<u8>,
    },
    /// The character set code itself is not supported.
    #[snafu(display("unsupported character set code `{code}`"))]
    UnsupportedCharacterSet {
        /// the (0008,0005) code value
        code: String,
    },
}

/// An error from encoding text under a specific character set.
#[derive(Debug, Snafu)]
#[snafu(display("text cannot be encoded in {charset}"))]
pub struct EncodeTextError {
    /// the active character set name
    pub charset: &'static str,
}

type DecodeResult<T> = Result<T, DecodeTextError>;
type EncodeResult<T> = Result<T, EncodeTextError>;

/// A codec for text in DICOM content under one character repertoire.
pub trait TextCodec {
    /// The defined term naming this codec,
    /// as used in Specific Character Set (0008,0005).
    fn name(&self) -> &'static str;

    /// Decode the byte buffer as a single string.
    /// Value delimiters (`\`) are preserved for later splitting.
    fn decode(&self, text: &[u8]) -> DecodeResult<String>;

    /// Encode a string into bytes of this repertoire.
    fn encode(&self, text: &str) -> EncodeResult<Vec<u8>>;
}

#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
enum CharsetImpl {
    /// ISO-IR 6, the default repertoire.
    #[default]
    Default,
    /// ISO-IR 100 (ISO-8859-1).
    IsoIr100,
    /// ISO-IR 144 (ISO-8859-5).
    IsoIr144,
    /// ISO-IR 192 (UTF-8).
    IsoIr192,
}

impl CharsetImpl {
    fn from_code(code: &str) -> Option<Self> {
        use self::CharsetImpl::*;
        match code.trim_end_matches('\0').trim() {
            "" | "Default" | "ISO_IR_6" | "ISO_IR 6" | "ISO 2022 IR 6" => Some(Default),
            "ISO_IR_100" | "ISO_IR 100" | "ISO 2022 IR 100" => Some(IsoIr100),
            "ISO_IR_144" | "ISO_IR 144" | "ISO 2022 IR 144" => Some(IsoIr144),
            "ISO_IR_192" | "ISO_IR 192" => Some(IsoIr192),
            _ => None,
        }
    }

    fn decode_plain(self, text: &[u8]) -> DecodeResult<String> {
        let (encoding, name): (&dyn Encoding, _) = match self {
            CharsetImpl::Default => (UTF_8, "ISO_IR 6"),
            CharsetImpl::IsoIr100 => (ISO_8859_1, "ISO_IR 100"),
            CharsetImpl::IsoIr144 => (ISO_8859_5, "ISO_IR 144"),
            CharsetImpl::IsoIr192 => (UTF_8, "ISO_IR 192"),
        };
        encoding
            .decode(text, DecoderTrap::Strict)
            .ok()
            .context(MalformedTextSnafu { charset: name })
    }
}

impl TextCodec for CharsetImpl {
    fn name(&self) -> &'static str {
        match self {
            CharsetImpl::Default => "ISO_IR 6",
            CharsetImpl::IsoIr100 => "ISO_IR 100",
            CharsetImpl::IsoIr144 => "ISO_IR 144",
            CharsetImpl::IsoIr192 => "ISO_IR 192",
        }
    }

    fn decode(&self, text: &[u8]) -> DecodeResult<String> {
        if text.contains(&ESC) {
            decode_with_escapes(*self, text)
        } else {
            self.decode_plain(text)
        }
    }

    fn encode(&self, text: &str) -> EncodeResult<Vec<u8>> {
        let (encoding, name): (&dyn Encoding, _) = match self {
            CharsetImpl::Default => (UTF_8, "ISO_IR 6"),
            CharsetImpl::IsoIr100 => (ISO_8859_1, "ISO_IR 100"),
            CharsetImpl::IsoIr144 => (ISO_8859_5, "ISO_IR 144"),
            CharsetImpl::IsoIr192 => (UTF_8, "ISO_IR 192"),
        };
        if *self == CharsetImpl::Default && !text.is_ascii() {
            return Err(EncodeTextError { charset: name });
        }
        encoding
            .encode(text, EncoderTrap::Strict)
            .map_err(|_| EncodeTextError { charset: name })
    }
}

const ESC: u8 = 0x1B;

/// Decode text containing ISO 2022 escape sequences by switching the
/// active single-byte repertoire at each designation. Only the escape
/// sequences of the supported sets are recognized.
fn decode_with_escapes(initial: CharsetImpl, text: &[u8]) -> DecodeResult<String> {
    let mut output = String::with_capacity(text.len());
    let mut active = initial;
    let mut rest = text;

    while !rest.is_empty() {
        if rest[0] == ESC {
            let (switched, consumed) = match rest.get(1..3) {
                // ESC ( B : ISO-IR 6 in G0
                Some([0x28, 0x42]) => (CharsetImpl::Default, 3),
                // ESC - A : ISO-IR 100 in G1
                Some([0x2D, 0x41]) => (CharsetImpl::IsoIr100, 3),
                // ESC - L : ISO-IR 144 in G1
                Some([0x2D, 0x4C]) => (CharsetImpl::IsoIr144, 3),
                _ => {
                    return UnsupportedEscapeSnafu {
                        bytes: rest[1..rest.len().min(3)].to_vec(),
                    }
                    .fail()
                }
            };
            active = switched;
            rest = &rest[consumed..];
            continue;
        }
        let segment_len = rest
            .iter()
            .position(|&b| b == ESC)
            .unwrap_or(rest.len());
        output.push_str(&active.decode_plain(&rest[..segment_len])?);
        rest = &rest[segment_len..];
    }
    Ok(output)
}

/// A descriptor for a specific character set, as selected by
/// the Specific Character Set (0008,0005) element.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SpecificCharacterSet(CharsetImpl);

impl SpecificCharacterSet {
    /// ISO-IR 6, the default character repertoire.
    pub const ISO_IR_6: SpecificCharacterSet = SpecificCharacterSet(CharsetImpl::Default);
    /// ISO-IR 100: ISO-8859-1, the Western Europe character set.
    pub const ISO_IR_100: SpecificCharacterSet = SpecificCharacterSet(CharsetImpl::IsoIr100);
    /// ISO-IR 144: ISO-8859-5, the Latin/Cyrillic character set.
    pub const ISO_IR_144: SpecificCharacterSet = SpecificCharacterSet(CharsetImpl::IsoIr144);
    /// ISO-IR 192: UTF-8.
    pub const ISO_IR_192: SpecificCharacterSet = SpecificCharacterSet(CharsetImpl::IsoIr192);

    /// Obtain the character set named by the given (0008,0005) code,
    /// or `None` if the code is unsupported.
    pub fn from_code(code: &str) -> Option<Self> {
        CharsetImpl::from_code(code).map(SpecificCharacterSet)
    }
}

impl TextCodec for SpecificCharacterSet {
    fn name(&self) -> &'static str {
        self.0.name()
    }

    fn decode(&self, text: &[u8]) -> DecodeResult<String> {
        self.0.decode(text)
    }

    fn encode(&self, text: &str) -> EncodeResult<Vec<u8>> {
        self.0.encode(text)
    }
}

/// Charset-aware text access for data sets.
///
/// `dcmio-core`'s own accessors decode in the default repertoire only;
/// this extension honors the data set's active
/// Specific Character Set for the VRs it governs.
pub trait DecodeTextExt {
    /// Decode the string value of the element at `tag` under the
    /// data set's active character set, with padding trimmed.
    fn decoded_string(&self, tag: Tag) -> Result<String, DecodeTextError>;
}

impl DecodeTextExt for DataSet {
    fn decoded_string(&self, tag: Tag) -> Result<String, DecodeTextError> {
        let charset = match self.character_set() {
            Some(code) => {
                SpecificCharacterSet::from_code(code).context(UnsupportedCharacterSetSnafu {
                    code: code.to_string(),
                })?
            }
            None => SpecificCharacterSet::default(),
        };
        let element = self
            .get(tag)
            .and_then(|e| e.bytes().ok())
            .unwrap_or_default();
        let decoded = charset.decode(element)?;
        Ok(decoded.trim_end_matches(['\0', ' ']).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcmio_core::{DataElement, VR};

    #[test]
    fn code_resolution() {
        assert_eq!(
            SpecificCharacterSet::from_code("ISO_IR 100"),
            Some(SpecificCharacterSet::ISO_IR_100)
        );
        assert_eq!(
            SpecificCharacterSet::from_code("ISO 2022 IR 6"),
            Some(SpecificCharacterSet::ISO_IR_6)
        );
        assert_eq!(
            SpecificCharacterSet::from_code("ISO_IR 192\0"),
            Some(SpecificCharacterSet::ISO_IR_192)
        );
        assert_eq!(SpecificCharacterSet::from_code("ISO_IR 13"), None);
    }

    #[test]
    fn latin1_decoding() {
        let codec = SpecificCharacterSet::ISO_IR_100;
        let decoded = codec.decode(b"M\xFCller^Erika").unwrap();
        assert_eq!(decoded, "Müller^Erika");
    }

    #[test]
    fn cyrillic_decoding() {
        let codec = SpecificCharacterSet::ISO_IR_144;
        // "Иван" in ISO-8859-5
        let decoded = codec.decode(&[0xB8, 0xD2, 0xD0, 0xDD]).unwrap();
        assert_eq!(decoded, "Иван");
    }

    #[test]
    fn iso2022_escape_switching() {
        let codec = SpecificCharacterSet::ISO_IR_6;
        // ASCII, then ESC - A into Latin-1, then ESC ( B back
        let mut bytes = b"Doe^".to_vec();
        bytes.extend_from_slice(&[0x1B, 0x2D, 0x41]);
        bytes.extend_from_slice(b"J\xF6rg");
        bytes.extend_from_slice(&[0x1B, 0x28, 0x42]);
        bytes.extend_from_slice(b"=X");
        assert_eq!(codec.decode(&bytes).unwrap(), "Doe^Jörg=X");
    }

    #[test]
    fn unknown_escape_is_an_error() {
        let codec = SpecificCharacterSet::ISO_IR_6;
        let bytes = [0x1B, 0x24, 0x42, b'a'];
        assert!(matches!(
            codec.decode(&bytes),
            Err(DecodeTextError::UnsupportedEscape { .. })
        ));
    }

    #[test]
    fn dataset_charset_extension() {
        let mut ds = DataSet::new();
        ds.set_character_set("ISO_IR 100");
        ds.put(DataElement::new(
            Tag(0x0010, 0x0010),
            VR::PN,
            b"M\xFCller ".to_vec(),
        ));
        assert_eq!(
            ds.decoded_string(Tag(0x0010, 0x0010)).unwrap(),
            "Müller"
        );
    }
}
