//! Error types for reconciliation.

/// Result type alias for reconciliation.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while mapping between declared and wire shapes.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A root folder is not of type `folder`.
    #[error(
        "unexpected folder type in dataset folders response: {kind}. Root level folders are expected to be of type 'folder'."
    )]
    RootNotFolder {
        /// Folder name.
        name: String,
        /// Folder type found.
        kind: String,
    },

    /// A folder child is itself a folder.
    #[error(
        "unexpected folder type in dataset folders response: {kind}. Nested folders are not supported."
    )]
    NestedFolder {
        /// Child name.
        name: String,
        /// Child type found.
        kind: String,
    },

    /// A folder child came back without an identifier.
    #[error("missing uuid for child {name:?} in folders response")]
    MissingUuid {
        /// Child name.
        name: String,
    },

    /// A declared uuid does not parse.
    #[error("invalid uuid {value:?} for folder node {name:?}: {source}")]
    InvalidUuid {
        /// Node name.
        name: String,
        /// Declared value.
        value: String,
        /// Parse error.
        #[source]
        source: uuid::Error,
    },

    /// Certification could not be encoded into `extra`.
    #[error("failed to marshal extra data for {kind} '{name}': {source}")]
    PackExtra {
        /// "column" or "metric".
        kind: &'static str,
        /// Column or metric name.
        name: String,
        /// Encoding error.
        #[source]
        source: serde_json::Error,
    },

    /// `extra` returned by the server is not valid JSON.
    #[error("failed to parse extra field for {kind} '{name}': {source}")]
    UnpackExtra {
        /// "column" or "metric".
        kind: &'static str,
        /// Column or metric name.
        name: String,
        /// Decoding error.
        #[source]
        source: serde_json::Error,
    },
}
