use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("key already present at index {index}")]
    DuplicateKey { index: usize },

    #[error("index {index} is out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("collection was modified; enumeration operation may not execute")]
    CollectionModified,

    #[error("invalid polygon: {message}")]
    InvalidPolygon { message: String },

    #[error("unknown bone: {name}")]
    UnknownBone { name: String },

    #[error("unknown slot: {name}")]
    UnknownSlot { name: String },

    #[error("unknown skin: {name}")]
    UnknownSkin { name: String },

    #[error("unknown attachment '{attachment}' for slot '{slot}'")]
    UnknownAttachment { slot: String, attachment: String },

    #[error("invalid value: {message}")]
    InvalidValue { message: String },

    #[cfg(feature = "json")]
    #[error("failed to parse Spine JSON: {message}")]
    JsonParse { message: String },

    #[cfg(feature = "json")]
    #[error("unsupported or invalid Spine version string: {value}")]
    JsonSpineVersion { value: String },

    #[cfg(feature = "json")]
    #[error("invalid color for {context}: {value}")]
    JsonInvalidColor { context: String, value: String },

    #[cfg(feature = "json")]
    #[error("unknown parent bone '{parent}' for bone '{bone}'")]
    JsonUnknownBoneParent { bone: String, parent: String },

    #[cfg(feature = "json")]
    #[error("unknown bone '{bone}' referenced by slot '{slot}'")]
    JsonUnknownSlotBone { slot: String, bone: String },

    #[cfg(feature = "json")]
    #[error("unknown slot '{slot}' referenced by skin '{skin}'")]
    JsonUnknownSkinSlot { skin: String, slot: String },

    #[cfg(feature = "json")]
    #[error("unknown end slot '{slot}' referenced by clipping attachment '{attachment}'")]
    JsonUnknownClippingEndSlot { attachment: String, slot: String },

    #[cfg(feature = "json")]
    #[error(
        "unsupported attachment type '{attachment_type}' for skin '{skin}', slot '{slot}', attachment '{attachment}'"
    )]
    JsonUnsupportedAttachmentType {
        skin: String,
        slot: String,
        attachment: String,
        attachment_type: String,
    },

    #[cfg(feature = "json")]
    #[error(
        "invalid mesh data for skin '{skin}', slot '{slot}', attachment '{attachment}': {message}"
    )]
    JsonInvalidMeshData {
        skin: String,
        slot: String,
        attachment: String,
        message: String,
    },
}
