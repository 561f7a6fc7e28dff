//! JSON encoding of archives.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use super::{Archive, ArchivedPart};
use crate::schema::{PartDescriptor, PartType, PoseSample, Quat, Vec3};

/// Format tag written in the archive envelope.
pub const ARCHIVE_FORMAT: &str = "sim-replay";

/// Current archive version.
pub const ARCHIVE_VERSION: u64 = 1;

/// Archive encoding and decoding errors.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("Corrupt archive: {0}")]
    CorruptArchive(String),
    #[error("Part {part} has unsupported type {tag:?}")]
    UnsupportedPartType { part: String, tag: String },
    #[error("Unsupported archive version: {0}")]
    UnsupportedVersion(u64),
    #[error("Part {part} has a non-finite value at frame {frame}")]
    NonFiniteValue { part: String, frame: u64 },
    #[error("Part {part} has a non-finite mesh scale")]
    NonFiniteScale { part: String },
    #[error("Archive is LZ4 compressed but the lz4 feature is disabled")]
    CompressionUnavailable,
    #[error("Encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn corrupt(msg: impl Into<String>) -> ArchiveError {
    ArchiveError::CorruptArchive(msg.into())
}

/// A part left out of a leniently decoded archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedPart {
    pub name: String,
    /// The unrecognized type tag.
    pub tag: String,
}

/// Result of [`deserialize_lenient`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LenientArchive {
    pub archive: Archive,
    /// Parts whose type this version does not understand.
    pub skipped: Vec<SkippedPart>,
    /// Version the archive was written with (0 for the bare legacy layout).
    pub version: u64,
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    format: &'static str,
    version: u64,
    parts: BTreeMap<&'a str, PartRecordRef<'a>>,
}

#[derive(Serialize)]
struct PartRecordRef<'a> {
    #[serde(rename = "type")]
    kind: PartType,
    mesh_path: &'a str,
    mesh_scale: Option<Vec3>,
    frames: FramesRef<'a>,
}

struct FramesRef<'a>(&'a [PoseSample]);

impl Serialize for FramesRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter().map(|s| FrameRecord {
            position: s.position,
            orientation: s.orientation,
        }))
    }
}

#[derive(Serialize, Deserialize)]
struct FrameRecord {
    position: Vec3,
    orientation: Quat,
}

#[derive(Deserialize)]
struct MeshPartRecord {
    mesh_path: String,
    #[serde(default)]
    mesh_scale: Option<Vec3>,
    frames: Vec<FrameRecord>,
}

/// Encode an archive as pretty-printed JSON.
///
/// Fails if any value is NaN or infinite, since JSON cannot carry those
/// losslessly.
pub fn serialize(archive: &Archive) -> Result<Vec<u8>, ArchiveError> {
    let mut parts = BTreeMap::new();
    for (name, part) in archive.parts() {
        check_finite(name, part)?;
        parts.insert(
            name,
            PartRecordRef {
                kind: part.descriptor.kind,
                mesh_path: &part.descriptor.mesh_path,
                mesh_scale: part.descriptor.mesh_scale,
                frames: FramesRef(&part.samples),
            },
        );
    }

    let envelope = EnvelopeRef {
        format: ARCHIVE_FORMAT,
        version: ARCHIVE_VERSION,
        parts,
    };
    Ok(serde_json::to_vec_pretty(&envelope)?)
}

/// Decode an archive, failing on any part type this version does not know.
pub fn deserialize(bytes: &[u8]) -> Result<Archive, ArchiveError> {
    let decoded = deserialize_lenient(bytes)?;
    if let Some(skipped) = decoded.skipped.into_iter().next() {
        return Err(ArchiveError::UnsupportedPartType {
            part: skipped.name,
            tag: skipped.tag,
        });
    }
    Ok(decoded.archive)
}

/// Decode an archive, setting aside parts with unknown type tags.
///
/// Structural problems still fail with [`ArchiveError::CorruptArchive`].
pub fn deserialize_lenient(bytes: &[u8]) -> Result<LenientArchive, ArchiveError> {
    let root: Value = serde_json::from_slice(bytes).map_err(|e| corrupt(e.to_string()))?;
    let Value::Object(mut root) = root else {
        return Err(corrupt("top level is not an object"));
    };

    let (version, parts) = if root.get("version").is_some_and(Value::is_number) {
        let version = root
            .get("version")
            .and_then(Value::as_u64)
            .ok_or_else(|| corrupt("version is not a non-negative integer"))?;
        if let Some(format) = root.get("format")
            && format.as_str() != Some(ARCHIVE_FORMAT)
        {
            return Err(corrupt(format!("unexpected format tag {}", format)));
        }
        if version != ARCHIVE_VERSION {
            return Err(ArchiveError::UnsupportedVersion(version));
        }
        match root.remove("parts") {
            Some(Value::Object(parts)) => (version, parts),
            Some(_) => return Err(corrupt("parts is not an object")),
            None => return Err(corrupt("missing parts")),
        }
    } else {
        (0, root)
    };

    let mut decoded = LenientArchive {
        version,
        ..Default::default()
    };
    for (name, value) in parts {
        match decode_part(&name, value)? {
            Decoded::Part(part) => {
                decoded.archive.insert(name, part);
            }
            Decoded::Unknown(tag) => decoded.skipped.push(SkippedPart { name, tag }),
        }
    }
    Ok(decoded)
}

enum Decoded {
    Part(ArchivedPart),
    Unknown(String),
}

fn decode_part(name: &str, value: Value) -> Result<Decoded, ArchiveError> {
    let Value::Object(fields) = value else {
        return Err(corrupt(format!("part {} is not an object", name)));
    };
    let tag = fields
        .get("type")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| corrupt(format!("part {} has no type tag", name)))?;

    match PartType::from_tag(&tag) {
        Some(PartType::Mesh) => decode_mesh(name, fields).map(Decoded::Part),
        None => Ok(Decoded::Unknown(tag)),
    }
}

fn decode_mesh(name: &str, fields: Map<String, Value>) -> Result<ArchivedPart, ArchiveError> {
    let record: MeshPartRecord = serde_json::from_value(Value::Object(fields))
        .map_err(|e| corrupt(format!("part {}: {}", name, e)))?;
    if record.mesh_path.is_empty() {
        return Err(corrupt(format!("part {} has an empty mesh_path", name)));
    }

    let samples = record
        .frames
        .into_iter()
        .enumerate()
        .map(|(i, frame)| PoseSample {
            frame_index: i as u64,
            position: frame.position,
            orientation: frame.orientation,
        })
        .collect();

    Ok(ArchivedPart::new(
        PartDescriptor::mesh(record.mesh_path, record.mesh_scale),
        samples,
    ))
}

fn check_finite(name: &str, part: &ArchivedPart) -> Result<(), ArchiveError> {
    let scale_ok = part
        .descriptor
        .mesh_scale
        .is_none_or(|s| s.iter().all(|v| v.is_finite()));
    if !scale_ok {
        return Err(ArchiveError::NonFiniteScale {
            part: name.to_string(),
        });
    }
    for sample in &part.samples {
        if !sample.pose().is_finite() {
            return Err(ArchiveError::NonFiniteValue {
                part: name.to_string(),
                frame: sample.frame_index,
            });
        }
    }
    Ok(())
}
