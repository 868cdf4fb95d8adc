//! Error types for action documents, providers and node execution

use hmi_common::value::ValueError;
use hmi_shared_memory::ShmError;
use thiserror::Error;

/// Errors raised while loading an action document.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// Document is not valid JSON or does not match the node schema
    #[error("Invalid action document: {source}")]
    Json {
        /// Source JSON error
        #[from]
        source: serde_json::Error,
    },

    /// Document file could not be read
    #[error("Cannot read action document: {source}")]
    Io {
        /// Source IO error
        #[from]
        source: std::io::Error,
    },

    /// Two nodes share an id
    #[error("Duplicate node id: {id}")]
    DuplicateId {
        /// Repeated id
        id: String,
    },

    /// Root id does not name a node
    #[error("Root node not found: {id}")]
    MissingRoot {
        /// Root id
        id: String,
    },

    /// A node references an id that does not exist
    #[error("Node {from} references unknown node {to}")]
    DanglingReference {
        /// Referencing node
        from: String,
        /// Missing node
        to: String,
    },

    /// A node can reach itself
    #[error("Cycle detected at node {id}")]
    Cycle {
        /// Node on the cycle
        id: String,
    },
}

/// Errors returned by a tag value provider.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Tag not known to the provider
    #[error("Unknown tag: {tag}")]
    UnknownTag {
        /// Tag reference
        tag: String,
    },

    /// Write refused by the backing system
    #[error("Write to {tag} rejected: {reason}")]
    Rejected {
        /// Tag reference
        tag: String,
        /// Reason reported by the backend
        reason: String,
    },

    /// Tag store failure
    #[error("Tag store error: {source}")]
    Store {
        /// Source store error
        #[from]
        source: ShmError,
    },

    /// Blocking write task did not complete
    #[error("Write task failed: {0}")]
    Task(String),
}

/// Failure of a single action node. Contained by the engine.
#[derive(Error, Debug)]
pub enum ActionError {
    /// Provider write failed
    #[error("Write to {tag} failed: {source}")]
    Write {
        /// Tag reference
        tag: String,
        /// Provider error
        source: ProviderError,
    },

    /// Tag used as a value source has no value
    #[error("Source tag {tag} has no value")]
    SourceUnavailable {
        /// Tag reference
        tag: String,
    },

    /// Value could not be converted to the requested data type
    #[error("Value conversion failed: {source}")]
    Value {
        /// Source conversion error
        #[from]
        source: ValueError,
    },

    /// Referenced node missing from the tree
    #[error("Node not found: {id}")]
    MissingNode {
        /// Node id
        id: String,
    },
}

/// Result type for document loading
pub type DocumentResult<T> = Result<T, DocumentError>;
