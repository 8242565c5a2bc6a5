//! The DICOM file meta information table.
//!
//! The file meta group (0002,xxxx) travels in Explicit VR Little
//! Endian ahead of the main data set and names the transfer syntax of
//! everything after it. [`FileMetaTable`] is a typed view over that
//! group; [`FileMetaTableBuilder`] assembles one from scratch for
//! newly created files.

use dcmio_core::{uids, DataElement, DataSet, Tag, VR};
use snafu::{OptionExt, Snafu};

/// UID of this implementation, written into (0002,0012)
/// of files this toolkit creates.
pub const IMPLEMENTATION_CLASS_UID: &str = "1.2.826.0.1.3680043.10.873.1";

/// Version name of this implementation, written into (0002,0013).
pub const IMPLEMENTATION_VERSION_NAME: &str = "DCMIO_0_1";

const TAG_MEDIA_STORAGE_SOP_CLASS_UID: Tag = Tag(0x0002, 0x0002);
const TAG_MEDIA_STORAGE_SOP_INSTANCE_UID: Tag = Tag(0x0002, 0x0003);
const TAG_TRANSFER_SYNTAX_UID: Tag = Tag(0x0002, 0x0010);
const TAG_IMPLEMENTATION_CLASS_UID: Tag = Tag(0x0002, 0x0012);
const TAG_IMPLEMENTATION_VERSION_NAME: Tag = Tag(0x0002, 0x0013);

/// An error building a file meta table.
#[derive(Debug, Snafu, PartialEq)]
#[non_exhaustive]
pub enum BuildMetaError {
    /// A mandatory attribute was never supplied.
    #[snafu(display("missing mandatory file meta attribute {name}"))]
    MissingField {
        /// the PS3.10 attribute keyword
        name: &'static str,
    },
}

/// A typed view over the file meta information group.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FileMetaTable {
    dataset: DataSet,
}

impl FileMetaTable {
    /// Wrap an already parsed meta group data set.
    pub fn from_dataset(dataset: DataSet) -> Self {
        FileMetaTable { dataset }
    }

    /// The meta group as a plain data set.
    pub fn as_dataset(&self) -> &DataSet {
        &self.dataset
    }

    /// Take the meta group data set out of the table.
    pub fn into_dataset(self) -> DataSet {
        self.dataset
    }

    fn string_value(&self, tag: Tag) -> Option<String> {
        self.dataset
            .get(tag)
            .and_then(|e| e.to_str().ok())
            .map(|s| s.into_owned())
    }

    /// The media storage SOP class UID (0002,0002).
    pub fn media_storage_sop_class_uid(&self) -> Option<String> {
        self.string_value(TAG_MEDIA_STORAGE_SOP_CLASS_UID)
    }

    /// The media storage SOP instance UID (0002,0003).
    pub fn media_storage_sop_instance_uid(&self) -> Option<String> {
        self.string_value(TAG_MEDIA_STORAGE_SOP_INSTANCE_UID)
    }

    /// The transfer syntax UID (0002,0010) of the main data set.
    pub fn transfer_syntax(&self) -> Option<String> {
        self.string_value(TAG_TRANSFER_SYNTAX_UID)
    }

    /// The implementation class UID (0002,0012).
    pub fn implementation_class_uid(&self) -> Option<String> {
        self.string_value(TAG_IMPLEMENTATION_CLASS_UID)
    }

    /// The implementation version name (0002,0013).
    pub fn implementation_version_name(&self) -> Option<String> {
        self.string_value(TAG_IMPLEMENTATION_VERSION_NAME)
    }

    /// Point the transfer syntax UID element at the given UID.
    pub fn set_transfer_syntax(&mut self, uid: &str) {
        self.dataset
            .put(DataElement::new_str(TAG_TRANSFER_SYNTAX_UID, VR::UI, uid));
    }
}

/// A builder for the file meta group of a new file.
///
/// The media storage SOP class and instance UIDs and the transfer
/// syntax are mandatory; the implementation identifiers default to
/// this toolkit's own.
#[derive(Debug, Clone, Default)]
pub struct FileMetaTableBuilder {
    media_storage_sop_class_uid: Option<String>,
    media_storage_sop_instance_uid: Option<String>,
    transfer_syntax: Option<String>,
    implementation_class_uid: Option<String>,
    implementation_version_name: Option<String>,
}

impl FileMetaTableBuilder {
    /// Create a builder with no attributes set.
    pub fn new() -> Self {
        FileMetaTableBuilder::default()
    }

    /// Define the media storage SOP class UID.
    pub fn media_storage_sop_class_uid(mut self, uid: impl Into<String>) -> Self {
        self.media_storage_sop_class_uid = Some(uid.into());
        self
    }

    /// Define the media storage SOP instance UID.
    pub fn media_storage_sop_instance_uid(mut self, uid: impl Into<String>) -> Self {
        self.media_storage_sop_instance_uid = Some(uid.into());
        self
    }

    /// Define the transfer syntax of the main data set.
    pub fn transfer_syntax(mut self, uid: impl Into<String>) -> Self {
        self.transfer_syntax = Some(uid.into());
        self
    }

    /// Override the implementation class UID.
    pub fn implementation_class_uid(mut self, uid: impl Into<String>) -> Self {
        self.implementation_class_uid = Some(uid.into());
        self
    }

    /// Override the implementation version name.
    pub fn implementation_version_name(mut self, name: impl Into<String>) -> Self {
        self.implementation_version_name = Some(name.into());
        self
    }

    /// Build the meta table, failing on missing mandatory attributes.
    pub fn build(self) -> Result<FileMetaTable, BuildMetaError> {
        let sop_class = self
            .media_storage_sop_class_uid
            .context(MissingFieldSnafu {
                name: "MediaStorageSOPClassUID",
            })?;
        let sop_instance = self
            .media_storage_sop_instance_uid
            .context(MissingFieldSnafu {
                name: "MediaStorageSOPInstanceUID",
            })?;
        let transfer_syntax = self.transfer_syntax.context(MissingFieldSnafu {
            name: "TransferSyntaxUID",
        })?;

        let mut dataset = DataSet::with_transfer_syntax(uids::EXPLICIT_VR_LITTLE_ENDIAN);
        // file meta information version, always 00\01
        dataset.put(DataElement::new(
            Tag(0x0002, 0x0001),
            VR::OB,
            vec![0x00, 0x01],
        ));
        dataset.put(DataElement::new_str(
            TAG_MEDIA_STORAGE_SOP_CLASS_UID,
            VR::UI,
            &sop_class,
        ));
        dataset.put(DataElement::new_str(
            TAG_MEDIA_STORAGE_SOP_INSTANCE_UID,
            VR::UI,
            &sop_instance,
        ));
        dataset.put(DataElement::new_str(
            TAG_TRANSFER_SYNTAX_UID,
            VR::UI,
            &transfer_syntax,
        ));
        dataset.put(DataElement::new_str(
            TAG_IMPLEMENTATION_CLASS_UID,
            VR::UI,
            self.implementation_class_uid
                .as_deref()
                .unwrap_or(IMPLEMENTATION_CLASS_UID),
        ));
        dataset.put(DataElement::new_str(
            TAG_IMPLEMENTATION_VERSION_NAME,
            VR::SH,
            self.implementation_version_name
                .as_deref()
                .unwrap_or(IMPLEMENTATION_VERSION_NAME),
        ));
        Ok(FileMetaTable { dataset })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_requires_mandatory_fields() {
        let err = FileMetaTableBuilder::new()
            .transfer_syntax(uids::EXPLICIT_VR_LITTLE_ENDIAN)
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            BuildMetaError::MissingField {
                name: "MediaStorageSOPClassUID"
            }
        );
    }

    #[test]
    fn builder_fills_implementation_defaults() {
        let meta = FileMetaTableBuilder::new()
            .media_storage_sop_class_uid(uids::SECONDARY_CAPTURE_IMAGE_STORAGE)
            .media_storage_sop_instance_uid("1.2.3.4")
            .transfer_syntax(uids::EXPLICIT_VR_LITTLE_ENDIAN)
            .build()
            .unwrap();
        assert_eq!(
            meta.implementation_class_uid().as_deref(),
            Some(IMPLEMENTATION_CLASS_UID)
        );
        assert_eq!(
            meta.transfer_syntax().as_deref(),
            Some(uids::EXPLICIT_VR_LITTLE_ENDIAN)
        );
    }

    #[test]
    fn set_transfer_syntax_replaces_element() {
        let mut meta = FileMetaTableBuilder::new()
            .media_storage_sop_class_uid(uids::CT_IMAGE_STORAGE)
            .media_storage_sop_instance_uid("1.2.3.4")
            .transfer_syntax(uids::IMPLICIT_VR_LITTLE_ENDIAN)
            .build()
            .unwrap();
        meta.set_transfer_syntax(uids::EXPLICIT_VR_LITTLE_ENDIAN);
        assert_eq!(
            meta.transfer_syntax().as_deref(),
            Some(uids::EXPLICIT_VR_LITTLE_ENDIAN)
        );
    }
}
