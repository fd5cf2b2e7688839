//! Writing and reading record tables in the binary and JSON encodings.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::checksum::Checksum;
use crate::error::ArchiveError;
use crate::id::ObjectId;

/// Magic bytes at the start of a binary archive.
pub const ARCHIVE_MAGIC: [u8; 4] = *b"OXMS";

/// Current container layout version. Increment on breaking changes to the
/// header or record table; per-type layout changes use [`Versioned::VERSION`].
pub const ARCHIVE_FORMAT_VERSION: u32 = 1;

const PRODUCER: &str = concat!("oxmsx ", env!("CARGO_PKG_VERSION"));

/// A type that can be stored as a record.
///
/// `VERSION` is bumped whenever the persisted layout of the type changes; a
/// loader must accept every version up to and including it.
pub trait Versioned {
    /// Name stored with every record of this type.
    const TYPE_NAME: &'static str;

    /// Latest layout version of this type.
    const VERSION: u32 = 1;
}

/// Archive encoding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveFormat {
    /// Compact bincode encoding with a checksummed header.
    #[default]
    Binary,
    /// Human-readable JSON document.
    Json,
}

#[derive(Debug, Serialize, Deserialize)]
struct BinaryHeader {
    format_version: u32,
    producer: String,
    root: ObjectId,
    checksum: Checksum,
}

#[derive(Debug, Serialize, Deserialize)]
struct BinaryRecord {
    id: ObjectId,
    type_name: String,
    version: u32,
    payload: Vec<u8>,
}

#[derive(Debug, Serialize, Deserialize)]
struct JsonDocument {
    magic: String,
    format_version: u32,
    producer: String,
    root: ObjectId,
    records: Vec<JsonRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct JsonRecord {
    id: ObjectId,
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default = "first_version")]
    version: u32,
    payload: serde_json::Value,
}

fn first_version() -> u32 {
    1
}

fn magic_str() -> String {
    String::from_utf8_lossy(&ARCHIVE_MAGIC).into_owned()
}

enum Records {
    Binary(Vec<BinaryRecord>),
    Json(Vec<JsonRecord>),
}

/// Collects records for one save-state.
///
/// Each call to [`save`](Self::save) appends a record and returns its id;
/// [`finish`](Self::finish) marks the root and encodes the table.
pub struct OutputArchive {
    records: Records,
    next_id: u32,
}

impl OutputArchive {
    /// Creates an empty archive in the given encoding.
    pub fn new(format: ArchiveFormat) -> Self {
        let records = match format {
            ArchiveFormat::Binary => Records::Binary(Vec::new()),
            ArchiveFormat::Json => Records::Json(Vec::new()),
        };
        Self {
            records,
            next_id: 1,
        }
    }

    /// The encoding this archive writes.
    pub fn format(&self) -> ArchiveFormat {
        match self.records {
            Records::Binary(_) => ArchiveFormat::Binary,
            Records::Json(_) => ArchiveFormat::Json,
        }
    }

    /// Number of records saved so far.
    pub fn len(&self) -> usize {
        match &self.records {
            Records::Binary(r) => r.len(),
            Records::Json(r) => r.len(),
        }
    }

    /// Returns `true` if nothing has been saved yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends `value` as a new record tagged with `T`'s name and version.
    pub fn save<T: Serialize + Versioned>(&mut self, value: &T) -> Result<ObjectId, ArchiveError> {
        let encode_err = |reason: String| ArchiveError::Encode {
            type_name: T::TYPE_NAME.to_string(),
            reason,
        };
        let id = ObjectId::from_raw(self.next_id);

        match &mut self.records {
            Records::Binary(records) => {
                let payload = bincode::serde::encode_to_vec(value, bincode::config::standard())
                    .map_err(|e| encode_err(e.to_string()))?;
                records.push(BinaryRecord {
                    id,
                    type_name: T::TYPE_NAME.to_string(),
                    version: T::VERSION,
                    payload,
                });
            }
            Records::Json(records) => {
                let payload =
                    serde_json::to_value(value).map_err(|e| encode_err(e.to_string()))?;
                records.push(JsonRecord {
                    id,
                    type_name: T::TYPE_NAME.to_string(),
                    version: T::VERSION,
                    payload,
                });
            }
        }

        self.next_id += 1;
        debug!(id = id.as_raw(), type_name = T::TYPE_NAME, version = T::VERSION, "saved record");
        Ok(id)
    }

    /// Encodes the archive with `root` as its entry point.
    ///
    /// Fails with [`ArchiveError::UnresolvedId`] if `root` was not saved into
    /// this archive.
    pub fn finish(self, root: ObjectId) -> Result<Vec<u8>, ArchiveError> {
        let has_root = match &self.records {
            Records::Binary(r) => r.iter().any(|rec| rec.id == root),
            Records::Json(r) => r.iter().any(|rec| rec.id == root),
        };
        if !has_root {
            return Err(ArchiveError::UnresolvedId(root.as_raw()));
        }

        match self.records {
            Records::Binary(records) => {
                let encode_err = |e: bincode::error::EncodeError| ArchiveError::Encode {
                    type_name: "archive".to_string(),
                    reason: e.to_string(),
                };
                let payload = bincode::serde::encode_to_vec(&records, bincode::config::standard())
                    .map_err(encode_err)?;
                let header = BinaryHeader {
                    format_version: ARCHIVE_FORMAT_VERSION,
                    producer: PRODUCER.to_string(),
                    root,
                    checksum: Checksum::from_bytes(&payload),
                };
                let header_bytes =
                    bincode::serde::encode_to_vec(&header, bincode::config::standard())
                        .map_err(encode_err)?;

                // magic + 4-byte header length (little-endian) + header + payload
                let header_len = header_bytes.len() as u32;
                let mut output =
                    Vec::with_capacity(8 + header_bytes.len() + payload.len());
                output.extend_from_slice(&ARCHIVE_MAGIC);
                output.extend_from_slice(&header_len.to_le_bytes());
                output.extend_from_slice(&header_bytes);
                output.extend_from_slice(&payload);
                Ok(output)
            }
            Records::Json(records) => {
                let doc = JsonDocument {
                    magic: magic_str(),
                    format_version: ARCHIVE_FORMAT_VERSION,
                    producer: PRODUCER.to_string(),
                    root,
                    records,
                };
                serde_json::to_vec_pretty(&doc).map_err(|e| ArchiveError::Encode {
                    type_name: "archive".to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }
}

#[derive(Debug)]
enum StoredPayload {
    Binary(Vec<u8>),
    Json(serde_json::Value),
}

#[derive(Debug)]
struct StoredRecord {
    type_name: String,
    version: u32,
    payload: StoredPayload,
}

/// Summary of one record, for listing an archive's contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordInfo {
    /// Record id.
    pub id: ObjectId,
    /// Persisted type name.
    pub type_name: String,
    /// Layout version of the stored data.
    pub version: u32,
}

/// A value decoded from an archive, with the layout version it was stored in.
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded<T> {
    /// The decoded value.
    pub value: T,
    /// The version the record was written with.
    pub version: u32,
}

/// A resolved, type-checked record whose payload has not been decoded yet.
///
/// Types with more than one layout version inspect [`version`](Self::version)
/// and decode into the matching legacy shape.
pub struct RecordRef<'a> {
    id: ObjectId,
    record: &'a StoredRecord,
}

impl RecordRef<'_> {
    /// Record id.
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Layout version the record was written with.
    pub fn version(&self) -> u32 {
        self.record.version
    }

    /// Decodes the payload into `S`.
    pub fn decode<S: DeserializeOwned>(&self) -> Result<S, ArchiveError> {
        let decode_err = |reason: String| ArchiveError::Decode {
            context: format!(
                "'{}' v{} (object {})",
                self.record.type_name,
                self.record.version,
                self.id.as_raw()
            ),
            reason,
        };
        match &self.record.payload {
            StoredPayload::Binary(bytes) => {
                bincode::serde::decode_from_slice(bytes, bincode::config::standard())
                    .map(|(value, _)| value)
                    .map_err(|e| decode_err(e.to_string()))
            }
            StoredPayload::Json(value) => S::deserialize(value).map_err(|e| decode_err(e.to_string())),
        }
    }
}

/// A decoded save-state, indexed by record id.
#[derive(Debug)]
pub struct InputArchive {
    format: ArchiveFormat,
    producer: String,
    root: ObjectId,
    records: HashMap<ObjectId, StoredRecord>,
    order: Vec<ObjectId>,
}

impl InputArchive {
    /// Decodes an archive, detecting the encoding from its first bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ArchiveError> {
        if let Some(rest) = bytes.strip_prefix(&ARCHIVE_MAGIC) {
            return Self::from_binary(rest);
        }
        match bytes.iter().find(|b| !b.is_ascii_whitespace()) {
            Some(b'{') => Self::from_json(bytes),
            _ => Err(ArchiveError::InvalidMagic),
        }
    }

    fn from_binary(raw: &[u8]) -> Result<Self, ArchiveError> {
        if raw.len() < 4 {
            return Err(ArchiveError::Truncated);
        }
        let header_len = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize;
        let header_end = 4usize
            .checked_add(header_len)
            .ok_or(ArchiveError::Truncated)?;
        if raw.len() < header_end {
            return Err(ArchiveError::Truncated);
        }

        let header: BinaryHeader =
            bincode::serde::decode_from_slice(&raw[4..header_end], bincode::config::standard())
                .map_err(|e| ArchiveError::Decode {
                    context: "archive header".to_string(),
                    reason: e.to_string(),
                })?
                .0;

        if header.format_version > ARCHIVE_FORMAT_VERSION {
            return Err(ArchiveError::UnsupportedFormat {
                found: header.format_version,
                supported: ARCHIVE_FORMAT_VERSION,
            });
        }

        let payload = &raw[header_end..];
        let actual = Checksum::from_bytes(payload);
        if actual != header.checksum {
            return Err(ArchiveError::ChecksumMismatch {
                expected: header.checksum.to_string(),
                actual: actual.to_string(),
            });
        }

        let records: Vec<BinaryRecord> =
            bincode::serde::decode_from_slice(payload, bincode::config::standard())
                .map_err(|e| ArchiveError::Decode {
                    context: "record table".to_string(),
                    reason: e.to_string(),
                })?
                .0;

        let mut archive = Self::empty(ArchiveFormat::Binary, header.producer, header.root);
        for rec in records {
            archive.insert(
                rec.id,
                StoredRecord {
                    type_name: rec.type_name,
                    version: rec.version,
                    payload: StoredPayload::Binary(rec.payload),
                },
            )?;
        }
        Ok(archive)
    }

    fn from_json(bytes: &[u8]) -> Result<Self, ArchiveError> {
        let doc: JsonDocument = serde_json::from_slice(bytes).map_err(|e| ArchiveError::Decode {
            context: "JSON archive".to_string(),
            reason: e.to_string(),
        })?;
        if doc.magic != magic_str() {
            return Err(ArchiveError::InvalidMagic);
        }
        if doc.format_version > ARCHIVE_FORMAT_VERSION {
            return Err(ArchiveError::UnsupportedFormat {
                found: doc.format_version,
                supported: ARCHIVE_FORMAT_VERSION,
            });
        }

        let mut archive = Self::empty(ArchiveFormat::Json, doc.producer, doc.root);
        for rec in doc.records {
            archive.insert(
                rec.id,
                StoredRecord {
                    type_name: rec.type_name,
                    version: rec.version,
                    payload: StoredPayload::Json(rec.payload),
                },
            )?;
        }
        Ok(archive)
    }

    fn empty(format: ArchiveFormat, producer: String, root: ObjectId) -> Self {
        Self {
            format,
            producer,
            root,
            records: HashMap::new(),
            order: Vec::new(),
        }
    }

    fn insert(&mut self, id: ObjectId, record: StoredRecord) -> Result<(), ArchiveError> {
        if self.records.insert(id, record).is_some() {
            return Err(ArchiveError::DuplicateId(id.as_raw()));
        }
        self.order.push(id);
        Ok(())
    }

    /// Encoding the archive was read from.
    pub fn format(&self) -> ArchiveFormat {
        self.format
    }

    /// Name and version of the program that wrote the archive.
    pub fn producer(&self) -> &str {
        &self.producer
    }

    /// Entry-point record.
    pub fn root(&self) -> ObjectId {
        self.root
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if the archive holds no records.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Lists records in stored order.
    pub fn records(&self) -> impl Iterator<Item = RecordInfo> + '_ {
        self.order.iter().filter_map(move |id| {
            self.records.get(id).map(|rec| RecordInfo {
                id: *id,
                type_name: rec.type_name.clone(),
                version: rec.version,
            })
        })
    }

    /// Resolves `id`, checks that it holds a `type_name` record, and that its
    /// version is at most `latest`.
    pub fn record(
        &self,
        id: ObjectId,
        type_name: &str,
        latest: u32,
    ) -> Result<RecordRef<'_>, ArchiveError> {
        let record = self
            .records
            .get(&id)
            .ok_or(ArchiveError::UnresolvedId(id.as_raw()))?;
        if record.type_name != type_name {
            return Err(ArchiveError::TypeMismatch {
                id: id.as_raw(),
                expected: type_name.to_string(),
                found: record.type_name.clone(),
            });
        }
        if record.version > latest {
            return Err(ArchiveError::VersionTooNew {
                type_name: record.type_name.clone(),
                version: record.version,
                latest,
            });
        }
        Ok(RecordRef { id, record })
    }

    /// Resolves and decodes a record of type `T` stored in `T`'s latest layout.
    ///
    /// Types with legacy layouts should use [`record`](Self::record) instead.
    pub fn load<T: DeserializeOwned + Versioned>(
        &self,
        id: ObjectId,
    ) -> Result<Loaded<T>, ArchiveError> {
        let rec = self.record(id, T::TYPE_NAME, T::VERSION)?;
        let value = rec.decode()?;
        debug!(id = id.as_raw(), type_name = T::TYPE_NAME, version = rec.version(), "loaded record");
        Ok(Loaded {
            value,
            version: rec.version(),
        })
    }
}
