//! Reading and writing archive files.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::debug;

use super::Archive;
use super::format::{ArchiveError, LenientArchive, deserialize, deserialize_lenient, serialize};

/// Conventional archive file extension.
pub const ARCHIVE_EXTENSION: &str = "simrec";

/// Magic bytes identifying an LZ4-compressed archive.
pub const LZ4_MAGIC: &[u8; 4] = b"SRLZ";

/// Compression applied to an archive file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Compression {
    /// Plain JSON.
    #[default]
    None = 0,
    /// LZ4 block behind [`LZ4_MAGIC`].
    Lz4 = 1,
}

/// Write `archive` to `path`. Returns the number of bytes written.
pub fn save<P: AsRef<Path>>(
    archive: &Archive,
    path: P,
    compression: Compression,
) -> Result<u64, ArchiveError> {
    let json = serialize(archive)?;
    let payload = match compression {
        Compression::None => json,
        Compression::Lz4 => {
            let mut compressed = LZ4_MAGIC.to_vec();
            compressed.extend_from_slice(&compress_lz4(&json)?);
            debug!(
                "Compressed archive {} -> {} bytes",
                json.len(),
                compressed.len()
            );
            compressed
        }
    };

    let mut writer = BufWriter::new(fs::File::create(path.as_ref())?);
    writer.write_all(&payload)?;
    writer.flush()?;
    Ok(payload.len() as u64)
}

/// Read an archive file and return its JSON bytes, decompressing if needed.
pub fn read_bytes<P: AsRef<Path>>(path: P) -> Result<Vec<u8>, ArchiveError> {
    let bytes = fs::read(path)?;
    match bytes.strip_prefix(LZ4_MAGIC.as_slice()) {
        Some(block) => decompress_lz4(block),
        None => Ok(bytes),
    }
}

/// Load an archive, failing on unknown part types.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Archive, ArchiveError> {
    deserialize(&read_bytes(path)?)
}

/// Load an archive, setting aside parts with unknown types.
pub fn load_lenient<P: AsRef<Path>>(path: P) -> Result<LenientArchive, ArchiveError> {
    deserialize_lenient(&read_bytes(path)?)
}

#[cfg(feature = "lz4")]
fn compress_lz4(data: &[u8]) -> Result<Vec<u8>, ArchiveError> {
    Ok(lz4_flex::compress_prepend_size(data))
}

#[cfg(feature = "lz4")]
fn decompress_lz4(data: &[u8]) -> Result<Vec<u8>, ArchiveError> {
    lz4_flex::decompress_size_prepended(data)
        .map_err(|e| ArchiveError::CorruptArchive(format!("LZ4 block: {}", e)))
}

#[cfg(not(feature = "lz4"))]
fn compress_lz4(_data: &[u8]) -> Result<Vec<u8>, ArchiveError> {
    Err(ArchiveError::CompressionUnavailable)
}

#[cfg(not(feature = "lz4"))]
fn decompress_lz4(_data: &[u8]) -> Result<Vec<u8>, ArchiveError> {
    Err(ArchiveError::CompressionUnavailable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchivedPart;
    use crate::schema::{PartDescriptor, Pose, PoseSample};
    use tempfile::tempdir;

    fn test_archive() -> Archive {
        let mut archive = Archive::new();
        let samples = (0..50)
            .map(|i| PoseSample::new(i, Pose::new([0.0, 0.0, i as f64 * 0.01], [0.0, 0.0, 0.0, 1.0])))
            .collect();
        archive.insert(
            "base".to_string(),
            ArchivedPart::new(PartDescriptor::mesh("base.obj", None), samples),
        );
        archive
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(format!("run.{}", ARCHIVE_EXTENSION));

        let archive = test_archive();
        let written = save(&archive, &path, Compression::None).unwrap();
        assert_eq!(written, fs::metadata(&path).unwrap().len());

        let loaded = load(&path).unwrap();
        assert_eq!(loaded, archive);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            load(dir.path().join("absent.simrec")),
            Err(ArchiveError::Io(_))
        ));
    }

    #[cfg(feature = "lz4")]
    #[test]
    fn test_lz4_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.simrec");

        let archive = test_archive();
        save(&archive, &path, Compression::Lz4).unwrap();

        let raw = fs::read(&path).unwrap();
        assert_eq!(&raw[..4], LZ4_MAGIC);

        let loaded = load(&path).unwrap();
        assert_eq!(loaded, archive);
    }

    #[cfg(not(feature = "lz4"))]
    #[test]
    fn test_lz4_unavailable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.simrec");
        assert!(matches!(
            save(&test_archive(), &path, Compression::Lz4),
            Err(ArchiveError::CompressionUnavailable)
        ));

        fs::write(&path, b"SRLZ\x00\x00").unwrap();
        assert!(matches!(
            load(&path),
            Err(ArchiveError::CompressionUnavailable)
        ));
    }
}
