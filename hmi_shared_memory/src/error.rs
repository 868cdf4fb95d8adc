//! Error types for tag store operations

use hmi_common::schema::LayoutOverflow;
use hmi_common::value::{TagType, ValueError};
use thiserror::Error;

/// Errors that can occur during tag store operations
#[derive(Error, Debug)]
pub enum ShmError {
    /// Region does not exist
    #[error("Shared region not found: {name}")]
    RegionNotFound {
        /// Region name
        name: String,
    },

    /// Existing region size differs from the computed layout
    #[error("Shared region {name} is {actual} bytes, layout requires {expected}")]
    RegionSizeMismatch {
        /// Region name
        name: String,
        /// Size required by the schema layout
        expected: usize,
        /// Size of the existing mapping
        actual: usize,
    },

    /// Permission denied
    #[error("Permission denied accessing region: {name}")]
    PermissionDenied {
        /// Region name
        name: String,
    },

    /// Region name is not a valid POSIX shared memory name
    #[error("Invalid region name: {name}")]
    InvalidRegionName {
        /// Region name
        name: String,
    },

    /// Schema has no tags
    #[error("Schema for region {name} has no tags")]
    EmptySchema {
        /// Region name
        name: String,
    },

    /// Declared slot sizes do not fit the address space
    #[error("Invalid layout: {source}")]
    Layout {
        /// Overflow details
        #[from]
        source: LayoutOverflow,
    },

    /// Key not present in the schema
    #[error("Unknown tag: {key}")]
    UnknownTag {
        /// Requested key
        key: String,
    },

    /// Value cannot be encoded into the slot type
    #[error("Cannot encode value for {key} as {tag_type}: {source}")]
    EncodingError {
        /// Tag key
        key: String,
        /// Slot type
        tag_type: TagType,
        /// Conversion failure
        source: ValueError,
    },

    /// Store has been closed
    #[error("Tag store is closed")]
    StoreClosed,

    /// Lock could not be acquired under the configured policy
    #[error("Lock at offset {offset} not acquired after {spins} attempts")]
    LockTimeout {
        /// Offset of the lock word
        offset: usize,
        /// Failed acquisition attempts
        spins: u64,
    },

    /// Access outside the mapped region
    #[error("Access out of bounds: offset {offset} + {len} exceeds region size {size}")]
    OutOfBounds {
        /// Start offset
        offset: usize,
        /// Access length
        len: usize,
        /// Region size
        size: usize,
    },

    /// IO error
    #[error("IO error: {source}")]
    Io {
        /// Source IO error
        #[from]
        source: std::io::Error,
    },

    /// Nix system call error
    #[error("System call error: {source}")]
    Nix {
        /// Source nix error
        #[from]
        source: nix::Error,
    },

    /// JSON serialization/deserialization error
    #[error("JSON error: {source}")]
    Json {
        /// Source JSON error
        #[from]
        source: serde_json::Error,
    },
}

/// Result type for tag store operations
pub type ShmResult<T> = Result<T, ShmError>;
