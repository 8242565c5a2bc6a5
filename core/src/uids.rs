//! Well-known DICOM unique identifiers.
//!
//! This module hosts the transfer syntax UIDs understood by the toolkit
//! and a handful of common SOP class UIDs, with a reverse lookup
//! from UID to descriptive name.

/// Implicit VR Little Endian: Default Transfer Syntax for DICOM
pub const IMPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2";
/// Explicit VR Little Endian
pub const EXPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2.1";
/// Deflated Explicit VR Little Endian
pub const DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2.1.99";
/// Explicit VR Big Endian (retired)
pub const EXPLICIT_VR_BIG_ENDIAN: &str = "1.2.840.10008.1.2.2";
/// RLE Lossless
pub const RLE_LOSSLESS: &str = "1.2.840.10008.1.2.5";
/// JPEG Baseline (Process 1)
pub const JPEG_BASELINE: &str = "1.2.840.10008.1.2.4.50";
/// JPEG Extended (Process 2 & 4)
pub const JPEG_EXTENDED: &str = "1.2.840.10008.1.2.4.51";
/// JPEG Lossless, Non-Hierarchical (Process 14)
pub const JPEG_LOSSLESS: &str = "1.2.840.10008.1.2.4.57";
/// JPEG Lossless, Non-Hierarchical, First-Order Prediction (Process 14 SV1)
pub const JPEG_LOSSLESS_SV1: &str = "1.2.840.10008.1.2.4.70";
/// JPEG-LS Lossless
pub const JPEG_LS_LOSSLESS: &str = "1.2.840.10008.1.2.4.80";
/// JPEG-LS Lossy (Near-Lossless)
pub const JPEG_LS_LOSSY: &str = "1.2.840.10008.1.2.4.81";
/// JPEG 2000 (Lossless Only)
pub const JPEG_2000_LOSSLESS: &str = "1.2.840.10008.1.2.4.90";
/// JPEG 2000
pub const JPEG_2000: &str = "1.2.840.10008.1.2.4.91";

/// Verification SOP Class
pub const VERIFICATION: &str = "1.2.840.10008.1.1";
/// Secondary Capture Image Storage
pub const SECONDARY_CAPTURE_IMAGE_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.7";
/// CT Image Storage
pub const CT_IMAGE_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.2";
/// MR Image Storage
pub const MR_IMAGE_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.4";
/// Computed Radiography Image Storage
pub const COMPUTED_RADIOGRAPHY_IMAGE_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.1";
/// Digital X-Ray Image Storage - For Presentation
pub const DIGITAL_X_RAY_IMAGE_STORAGE_FOR_PRESENTATION: &str = "1.2.840.10008.5.1.4.1.1.1.1";
/// Ultrasound Image Storage
pub const ULTRASOUND_IMAGE_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.6.1";
/// Segmentation Storage
pub const SEGMENTATION_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.66.4";
/// Grayscale Softcopy Presentation State Storage
pub const GRAYSCALE_SOFTCOPY_PRESENTATION_STATE_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.11.1";

/// The category of a registered UID.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum UidKind {
    /// A transfer syntax.
    TransferSyntax,
    /// A storage or service SOP class.
    SopClass,
}

/// A registry row for a well-known UID.
#[derive(Debug, Copy, Clone)]
pub struct UidEntry {
    /// the UID value
    pub uid: &'static str,
    /// the descriptive name from PS3.6
    pub name: &'static str,
    /// what the UID identifies
    pub kind: UidKind,
}

const ENTRIES: &[UidEntry] = &[
    UidEntry {
        uid: IMPLICIT_VR_LITTLE_ENDIAN,
        name: "Implicit VR Little Endian",
        kind: UidKind::TransferSyntax,
    },
    UidEntry {
        uid: EXPLICIT_VR_LITTLE_ENDIAN,
        name: "Explicit VR Little Endian",
        kind: UidKind::TransferSyntax,
    },
    UidEntry {
        uid: DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN,
        name: "Deflated Explicit VR Little Endian",
        kind: UidKind::TransferSyntax,
    },
    UidEntry {
        uid: EXPLICIT_VR_BIG_ENDIAN,
        name: "Explicit VR Big Endian",
        kind: UidKind::TransferSyntax,
    },
    UidEntry {
        uid: RLE_LOSSLESS,
        name: "RLE Lossless",
        kind: UidKind::TransferSyntax,
    },
    UidEntry {
        uid: JPEG_BASELINE,
        name: "JPEG Baseline (Process 1)",
        kind: UidKind::TransferSyntax,
    },
    UidEntry {
        uid: JPEG_EXTENDED,
        name: "JPEG Extended (Process 2 & 4)",
        kind: UidKind::TransferSyntax,
    },
    UidEntry {
        uid: JPEG_LOSSLESS,
        name: "JPEG Lossless (Process 14)",
        kind: UidKind::TransferSyntax,
    },
    UidEntry {
        uid: JPEG_LOSSLESS_SV1,
        name: "JPEG Lossless (Process 14 SV1)",
        kind: UidKind::TransferSyntax,
    },
    UidEntry {
        uid: JPEG_LS_LOSSLESS,
        name: "JPEG-LS Lossless",
        kind: UidKind::TransferSyntax,
    },
    UidEntry {
        uid: JPEG_LS_LOSSY,
        name: "JPEG-LS Lossy",
        kind: UidKind::TransferSyntax,
    },
    UidEntry {
        uid: JPEG_2000_LOSSLESS,
        name: "JPEG 2000 (Lossless Only)",
        kind: UidKind::TransferSyntax,
    },
    UidEntry {
        uid: JPEG_2000,
        name: "JPEG 2000",
        kind: UidKind::TransferSyntax,
    },
    UidEntry {
        uid: VERIFICATION,
        name: "Verification SOP Class",
        kind: UidKind::SopClass,
    },
    UidEntry {
        uid: COMPUTED_RADIOGRAPHY_IMAGE_STORAGE,
        name: "Computed Radiography Image Storage",
        kind: UidKind::SopClass,
    },
    UidEntry {
        uid: DIGITAL_X_RAY_IMAGE_STORAGE_FOR_PRESENTATION,
        name: "Digital X-Ray Image Storage - For Presentation",
        kind: UidKind::SopClass,
    },
    UidEntry {
        uid: CT_IMAGE_STORAGE,
        name: "CT Image Storage",
        kind: UidKind::SopClass,
    },
    UidEntry {
        uid: MR_IMAGE_STORAGE,
        name: "MR Image Storage",
        kind: UidKind::SopClass,
    },
    UidEntry {
        uid: ULTRASOUND_IMAGE_STORAGE,
        name: "Ultrasound Image Storage",
        kind: UidKind::SopClass,
    },
    UidEntry {
        uid: SECONDARY_CAPTURE_IMAGE_STORAGE,
        name: "Secondary Capture Image Storage",
        kind: UidKind::SopClass,
    },
    UidEntry {
        uid: GRAYSCALE_SOFTCOPY_PRESENTATION_STATE_STORAGE,
        name: "Grayscale Softcopy Presentation State Storage",
        kind: UidKind::SopClass,
    },
    UidEntry {
        uid: SEGMENTATION_STORAGE,
        name: "Segmentation Storage",
        kind: UidKind::SopClass,
    },
];

/// Look up a well-known UID, tolerating trailing NUL padding.
pub fn lookup(uid: &str) -> Option<&'static UidEntry> {
    let uid = uid.trim_end_matches('\0').trim();
    ENTRIES.iter().find(|e| e.uid == uid)
}
