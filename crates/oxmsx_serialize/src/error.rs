//! Error types for saving and loading archives.

/// Errors that can occur while writing or reading a save-state archive.
///
/// Every load error aborts the load of the whole state; there is no partial
/// restore.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// The data does not start with the archive magic and is not a JSON document.
    #[error("not an oxmsx state archive (bad magic)")]
    InvalidMagic,

    /// The data ends before the header or payload is complete.
    #[error("truncated archive")]
    Truncated,

    /// The container layout is newer than this build understands.
    #[error("unsupported archive format version {found} (this installation supports up to {supported})")]
    UnsupportedFormat {
        /// Format version stored in the archive.
        found: u32,
        /// Highest format version this build reads.
        supported: u32,
    },

    /// The stored checksum does not match the payload.
    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Checksum recorded in the header.
        expected: String,
        /// Checksum computed from the payload.
        actual: String,
    },

    /// A value could not be encoded.
    #[error("failed to encode '{type_name}': {reason}")]
    Encode {
        /// Type being saved.
        type_name: String,
        /// Encoder message.
        reason: String,
    },

    /// Bytes could not be decoded into the expected shape.
    #[error("failed to decode {context}: {reason}")]
    Decode {
        /// What was being decoded.
        context: String,
        /// Decoder message.
        reason: String,
    },

    /// A record was written by a newer version of its type than this build knows.
    #[error(
        "your installation is too old (state contains type '{type_name}' with version {version}, while this installation only supports up to version {latest})"
    )]
    VersionTooNew {
        /// Persisted type name.
        type_name: String,
        /// Version stored in the archive.
        version: u32,
        /// Highest version this build reads.
        latest: u32,
    },

    /// A reference points at an id that is not in the archive.
    #[error("couldn't find object in archive with id {0}")]
    UnresolvedId(u32),

    /// The record at an id has a different type than the reference expects.
    #[error("object {id} has type '{found}', expected '{expected}'")]
    TypeMismatch {
        /// Raw id of the record.
        id: u32,
        /// Type the caller asked for.
        expected: String,
        /// Type stored in the archive.
        found: String,
    },

    /// Two records share one id.
    #[error("duplicate object id {0} in archive")]
    DuplicateId(u32),
}
