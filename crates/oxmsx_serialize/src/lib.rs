//! Versioned object archive for oxmsx save-states.
//!
//! A save-state is a flat table of records. Each record holds one persisted
//! object, tagged with its type name and the version of that type's layout.
//! Objects refer to each other by [`ObjectId`]; one record is marked as the
//! root. Two encodings share the same model:
//!
//! - [`ArchiveFormat::Binary`]: magic bytes, a bincode header with a checksum,
//!   and a bincode record table. Compact; used for snapshots and replay.
//! - [`ArchiveFormat::Json`]: a pretty-printed document for inspection and
//!   hand editing. A record without a `version` field is read as version 1.
//!
//! Loading a record whose version is newer than the running code supports, or
//! following an id that is not in the archive, is a hard error: the caller
//! must abandon the whole load.

#![warn(missing_docs)]

pub mod archive;
pub mod checksum;
pub mod error;
pub mod id;

pub use archive::{
    ArchiveFormat, InputArchive, Loaded, OutputArchive, RecordInfo, RecordRef, Versioned,
    ARCHIVE_FORMAT_VERSION, ARCHIVE_MAGIC,
};
pub use checksum::Checksum;
pub use error::ArchiveError;
pub use id::ObjectId;
