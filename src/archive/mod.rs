//! Portable archive of recorded part descriptors and pose histories.
//!
//! # File Format
//!
//! Archives are JSON documents wrapped in a small versioned envelope:
//!
//! ```text
//! {
//!   "format": "sim-replay",
//!   "version": 1,
//!   "parts": {
//!     "<part name>": {
//!       "type": "mesh",
//!       "mesh_path": "meshes/base.obj",
//!       "mesh_scale": [1.0, 1.0, 1.0] | null,
//!       "frames": [
//!         { "position": [x, y, z], "orientation": [x, y, z, w] },
//!         ...
//!       ]
//!     }
//!   }
//! }
//! ```
//!
//! A frame's position in `frames` is its frame index. Bare part mappings
//! without the envelope are read as version 0.
//!
//! With the `lz4` feature, files may instead hold the magic `SRLZ` followed
//! by an LZ4 block of the same JSON.

mod file;
mod format;

use std::collections::BTreeMap;

use crate::schema::{PartDescriptor, PoseSample};

pub use file::{ARCHIVE_EXTENSION, Compression, LZ4_MAGIC, load, load_lenient, read_bytes, save};
pub use format::{
    ARCHIVE_FORMAT, ARCHIVE_VERSION, ArchiveError, LenientArchive, SkippedPart, deserialize,
    deserialize_lenient, serialize,
};

/// Descriptor and pose history of one part.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchivedPart {
    pub descriptor: PartDescriptor,
    pub samples: Vec<PoseSample>,
}

impl ArchivedPart {
    pub fn new(descriptor: PartDescriptor, samples: Vec<PoseSample>) -> Self {
        Self {
            descriptor,
            samples,
        }
    }
}

/// All recorded parts, keyed by part name.
///
/// Iteration is in part-name order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Archive {
    parts: BTreeMap<String, ArchivedPart>,
}

impl Archive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a part, returning the previous entry with the same name.
    pub fn insert(&mut self, name: String, part: ArchivedPart) -> Option<ArchivedPart> {
        self.parts.insert(name, part)
    }

    pub fn get(&self, name: &str) -> Option<&ArchivedPart> {
        self.parts.get(name)
    }

    /// Parts in name order.
    pub fn parts(&self) -> impl Iterator<Item = (&str, &ArchivedPart)> {
        self.parts.iter().map(|(name, part)| (name.as_str(), part))
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Longest pose history among all parts.
    pub fn frame_count(&self) -> usize {
        self.parts.values().map(|p| p.samples.len()).max().unwrap_or(0)
    }

    /// Total number of samples across all parts.
    pub fn sample_count(&self) -> usize {
        self.parts.values().map(|p| p.samples.len()).sum()
    }
}
