//! The DICOM value representation enumeration and its encoding properties.

use std::fmt;
use std::str::{from_utf8, FromStr};

/// The closed set of DICOM value representations, as defined in PS3.5 §6.2.
#[derive(Debug, Eq, PartialEq, Hash, Copy, Clone, Ord, PartialOrd)]
pub enum VR {
    /// Application Entity
    AE,
    /// Age String
    AS,
    /// Attribute Tag
    AT,
    /// Code String
    CS,
    /// Date
    DA,
    /// Decimal String
    DS,
    /// Date Time
    DT,
    /// Floating Point Single
    FL,
    /// Floating Point Double
    FD,
    /// Integer String
    IS,
    /// Long String
    LO,
    /// Long Text
    LT,
    /// Other Byte
    OB,
    /// Other Double
    OD,
    /// Other Float
    OF,
    /// Other Long
    OL,
    /// Other Very Long
    OV,
    /// Other Word
    OW,
    /// Person Name
    PN,
    /// Short String
    SH,
    /// Signed Long
    SL,
    /// Sequence of Items
    SQ,
    /// Signed Short
    SS,
    /// Short Text
    ST,
    /// Signed Very Long
    SV,
    /// Time
    TM,
    /// Unlimited Characters
    UC,
    /// Unique Identifier (UID)
    UI,
    /// Unsigned Long
    UL,
    /// Unknown
    UN,
    /// Universal Resource Identifier or Locator (URI/URL)
    UR,
    /// Unsigned Short
    US,
    /// Unlimited Text
    UT,
    /// Unsigned Very Long
    UV,
}

/// How a VR's length field is laid out in the explicit VR encodings.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum HeaderKind {
    /// 2-byte length immediately after the VR code.
    Short,
    /// 2 reserved bytes followed by a 4-byte length.
    Long,
}

impl VR {
    /// Obtain the value representation corresponding to the given two bytes,
    /// each an upper case alphabetic ASCII character.
    pub fn from_binary(chars: [u8; 2]) -> Option<Self> {
        from_utf8(chars.as_ref())
            .ok()
            .and_then(|s| VR::from_str(s).ok())
    }

    /// Retrieve this VR's two-letter symbol.
    pub fn name(self) -> &'static str {
        use VR::*;
        match self {
            AE => "AE",
            AS => "AS",
            AT => "AT",
            CS => "CS",
            DA => "DA",
            DS => "DS",
            DT => "DT",
            FL => "FL",
            FD => "FD",
            IS => "IS",
            LO => "LO",
            LT => "LT",
            OB => "OB",
            OD => "OD",
            OF => "OF",
            OL => "OL",
            OV => "OV",
            OW => "OW",
            PN => "PN",
            SH => "SH",
            SL => "SL",
            SQ => "SQ",
            SS => "SS",
            ST => "ST",
            SV => "SV",
            TM => "TM",
            UC => "UC",
            UI => "UI",
            UL => "UL",
            UN => "UN",
            UR => "UR",
            US => "US",
            UT => "UT",
            UV => "UV",
        }
    }

    /// Retrieve a copy of this VR's two-byte symbol.
    pub fn to_bytes(self) -> [u8; 2] {
        let bytes = self.name().as_bytes();
        [bytes[0], bytes[1]]
    }

    /// The layout of this VR's length field under explicit VR encodings:
    /// the eleven VRs OB, OD, OF, OL, OV, OW, SQ, UC, UN, UR and UT
    /// take a 4-byte length after two reserved bytes,
    /// all others take a 2-byte length.
    pub fn header_kind(self) -> HeaderKind {
        use VR::*;
        match self {
            OB | OD | OF | OL | OV | OW | SQ | UC | UN | UR | UT => HeaderKind::Long,
            _ => HeaderKind::Short,
        }
    }

    /// The size in bytes of a single element of a binary VR,
    /// or `None` for text VRs and sequences.
    pub fn element_size(self) -> Option<usize> {
        use VR::*;
        match self {
            OB | UN => Some(1),
            AT | OW | SS | US => Some(2),
            FL | OF | OL | SL | UL => Some(4),
            FD | OD | OV | SV | UV => Some(8),
            _ => None,
        }
    }

    /// Whether values of this VR must be byte-swapped
    /// when moving between little and big endian encodings.
    pub fn needs_swap(self) -> bool {
        matches!(self.element_size(), Some(size) if size > 1)
    }

    /// The byte used to pad values of this VR to an even length:
    /// NUL for UI and the binary VRs, space for text.
    pub fn padding(self) -> u8 {
        use VR::*;
        match self {
            UI | OB | OD | OF | OL | OV | OW | UN | AT | FL | FD | SL | SS | SV | UL | US | UV
            | SQ => 0x00,
            _ => b' ',
        }
    }

    /// Whether values of this VR are text
    /// affected by the specific character set (0008,0005).
    pub fn is_specific_charset_text(self) -> bool {
        use VR::*;
        matches!(self, LO | LT | PN | SH | ST | UC | UT)
    }

    /// Whether values of this VR are character data
    /// (of any character repertoire).
    pub fn is_text(self) -> bool {
        use VR::*;
        matches!(
            self,
            AE | AS | CS | DA | DS | DT | IS | LO | LT | PN | SH | ST | TM | UC | UI | UR | UT
        )
    }
}

impl FromStr for VR {
    type Err = &'static str;

    fn from_str(string: &str) -> std::result::Result<Self, Self::Err> {
        use VR::*;
        match string {
            "AE" => Ok(AE),
            "AS" => Ok(AS),
            "AT" => Ok(AT),
            "CS" => Ok(CS),
            "DA" => Ok(DA),
            "DS" => Ok(DS),
            "DT" => Ok(DT),
            "FL" => Ok(FL),
            "FD" => Ok(FD),
            "IS" => Ok(IS),
            "LO" => Ok(LO),
            "LT" => Ok(LT),
            "OB" => Ok(OB),
            "OD" => Ok(OD),
            "OF" => Ok(OF),
            "OL" => Ok(OL),
            "OV" => Ok(OV),
            "OW" => Ok(OW),
            "PN" => Ok(PN),
            "SH" => Ok(SH),
            "SL" => Ok(SL),
            "SQ" => Ok(SQ),
            "SS" => Ok(SS),
            "ST" => Ok(ST),
            "SV" => Ok(SV),
            "TM" => Ok(TM),
            "UC" => Ok(UC),
            "UI" => Ok(UI),
            "UL" => Ok(UL),
            "UN" => Ok(UN),
            "UR" => Ok(UR),
            "US" => Ok(US),
            "UT" => Ok(UT),
            "UV" => Ok(UV),
            _ => Err("no such value representation"),
        }
    }
}

impl fmt::Display for VR {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::{HeaderKind, VR};

    #[test]
    fn vr_from_binary() {
        assert_eq!(VR::from_binary(*b"PN"), Some(VR::PN));
        assert_eq!(VR::from_binary(*b"OB"), Some(VR::OB));
        assert_eq!(VR::from_binary(*b"ZZ"), None);
        assert_eq!(VR::from_binary([0x00, 0x20]), None);
    }

    #[test]
    fn header_kinds() {
        assert_eq!(VR::US.header_kind(), HeaderKind::Short);
        assert_eq!(VR::UI.header_kind(), HeaderKind::Short);
        for vr in [
            VR::OB,
            VR::OD,
            VR::OF,
            VR::OL,
            VR::OV,
            VR::OW,
            VR::SQ,
            VR::UC,
            VR::UN,
            VR::UR,
            VR::UT,
        ] {
            assert_eq!(vr.header_kind(), HeaderKind::Long, "{}", vr);
        }
    }

    #[test]
    fn element_sizes_and_swapping() {
        assert_eq!(VR::OW.element_size(), Some(2));
        assert_eq!(VR::FD.element_size(), Some(8));
        assert_eq!(VR::PN.element_size(), None);
        assert!(VR::US.needs_swap());
        assert!(!VR::OB.needs_swap());
        assert!(!VR::LO.needs_swap());
    }

    #[test]
    fn padding_bytes() {
        assert_eq!(VR::UI.padding(), 0x00);
        assert_eq!(VR::OB.padding(), 0x00);
        assert_eq!(VR::PN.padding(), b' ');
        assert_eq!(VR::CS.padding(), b' ');
    }
}
