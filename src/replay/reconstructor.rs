//! Rebuilds animated scene objects from a recorded archive.

use std::fmt;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use super::host::{HostError, KeyChannels, ObjectKind, SceneHost};
use crate::archive::{self, Archive, ArchiveError, ArchivedPart, SkippedPart};
use crate::schema::{ConfigError, MeshFormat, ReplayConfig};

/// Reconstruction errors. Any of these aborts the whole run.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("Invalid replay configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),
    #[error("Host error: {0}")]
    Host(#[from] HostError),
}

/// Lifecycle of one part during reconstruction.
///
/// `Pending → MeshLoaded → Merged → Animating → Done`, or `Skipped` from
/// `Pending` (or from `MeshLoaded` when the import produced no geometry).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartState {
    Pending,
    MeshLoaded,
    Merged,
    Animating,
    Done,
    Skipped,
}

impl PartState {
    pub fn can_advance_to(self, next: PartState) -> bool {
        use PartState::*;
        matches!(
            (self, next),
            (Pending, MeshLoaded)
                | (Pending, Skipped)
                | (MeshLoaded, Merged)
                | (MeshLoaded, Skipped)
                | (Merged, Animating)
                | (Animating, Done)
        )
    }

    fn advance(self, next: PartState) -> PartState {
        debug_assert!(
            self.can_advance_to(next),
            "illegal part transition {:?} -> {:?}",
            self,
            next
        );
        next
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, PartState::Done | PartState::Skipped)
    }
}

/// Why a part was not reconstructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Mesh extension is not one of the known formats.
    UnsupportedMeshFormat(String),
    /// Part type tag unknown to this version.
    UnsupportedPartType(String),
    /// The import produced no mesh object.
    NoGeometry,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UnsupportedMeshFormat(ext) => write!(f, "unsupported mesh format .{}", ext),
            SkipReason::UnsupportedPartType(tag) => write!(f, "unsupported part type {:?}", tag),
            SkipReason::NoGeometry => f.write_str("import produced no mesh"),
        }
    }
}

/// Result for one part.
#[derive(Debug, Clone, PartialEq)]
pub struct PartOutcome {
    pub name: String,
    /// Terminal state: `Done` or `Skipped`.
    pub state: PartState,
    pub skip_reason: Option<SkipReason>,
    /// Keyframes committed to the host.
    pub keyframes: usize,
    /// Highest host frame keyed.
    pub last_host_frame: Option<u64>,
    /// True if `max_frames` cut the walk short.
    pub truncated: bool,
}

impl PartOutcome {
    fn skipped(name: &str, reason: SkipReason) -> Self {
        Self {
            name: name.to_string(),
            state: PartState::Skipped,
            skip_reason: Some(reason),
            keyframes: 0,
            last_host_frame: None,
            truncated: false,
        }
    }
}

/// Outcome of reconstructing one archive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconstructionReport {
    /// Collection the objects were placed in, if any.
    pub collection: Option<String>,
    /// One entry per archive part, in part-name order.
    pub parts: Vec<PartOutcome>,
}

impl ReconstructionReport {
    pub fn part(&self, name: &str) -> Option<&PartOutcome> {
        self.parts.iter().find(|p| p.name == name)
    }

    pub fn done(&self) -> impl Iterator<Item = &PartOutcome> {
        self.parts.iter().filter(|p| p.state == PartState::Done)
    }

    pub fn skipped(&self) -> impl Iterator<Item = &PartOutcome> {
        self.parts.iter().filter(|p| p.state == PartState::Skipped)
    }

    pub fn total_keyframes(&self) -> usize {
        self.parts.iter().map(|p| p.keyframes).sum()
    }

    /// True when no part was skipped.
    pub fn is_complete(&self) -> bool {
        self.skipped().next().is_none()
    }
}

impl fmt::Display for ReconstructionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} parts reconstructed, {} skipped, {} keyframes",
            self.done().count(),
            self.skipped().count(),
            self.total_keyframes()
        )
    }
}

/// Progress through one part's samples.
#[derive(Debug, Clone, Copy)]
pub struct ReplayProgress<'a> {
    pub part: &'a str,
    /// Index of the sample being keyed.
    pub consumed: usize,
    /// Samples recorded for the part.
    pub total: usize,
}

impl ReplayProgress<'_> {
    /// Fraction of the part's samples consumed, in `[0, 1)`.
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            self.consumed as f32 / self.total as f32
        }
    }
}

/// Replays archives into a [`SceneHost`], one animated object per part.
///
/// Usage:
/// ```ignore
/// let reconstructor = Reconstructor::new(ReplayConfig::default())?;
/// let report = reconstructor.reconstruct_file("drill.simrec", &mut host)?;
/// println!("{}", report);
/// ```
#[derive(Debug, Clone)]
pub struct Reconstructor {
    config: ReplayConfig,
}

impl Reconstructor {
    /// Create a reconstructor, validating the configuration.
    pub fn new(config: ReplayConfig) -> Result<Self, ReplayError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    /// Reconstruct every part of `archive` into `host`.
    pub fn reconstruct<H: SceneHost>(
        &self,
        archive: &Archive,
        host: &mut H,
    ) -> Result<ReconstructionReport, ReplayError> {
        self.reconstruct_with_progress(archive, host, |_| {})
    }

    /// Like [`Self::reconstruct`], reporting progress for every keyed sample.
    pub fn reconstruct_with_progress<H, F>(
        &self,
        archive: &Archive,
        host: &mut H,
        progress: F,
    ) -> Result<ReconstructionReport, ReplayError>
    where
        H: SceneHost,
        F: FnMut(&ReplayProgress<'_>),
    {
        self.replay(archive, &[], None, host, progress)
    }

    /// Decode and reconstruct an encoded archive.
    ///
    /// Decoding happens before any host call, so a corrupt archive leaves
    /// the host untouched. Parts of unknown type are skipped.
    pub fn reconstruct_bytes<H: SceneHost>(
        &self,
        bytes: &[u8],
        host: &mut H,
    ) -> Result<ReconstructionReport, ReplayError> {
        let decoded = archive::deserialize_lenient(bytes)?;
        self.replay(&decoded.archive, &decoded.skipped, None, host, |_| {})
    }

    /// Load an archive file and reconstruct it into a new collection named
    /// after the file.
    pub fn reconstruct_file<H, P>(
        &self,
        path: P,
        host: &mut H,
    ) -> Result<ReconstructionReport, ReplayError>
    where
        H: SceneHost,
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        info!("Processing {}", path.display());

        let decoded = archive::load_lenient(path)?;
        let collection = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "simulation".to_string());
        self.replay(
            &decoded.archive,
            &decoded.skipped,
            Some(collection),
            host,
            |_| {},
        )
    }

    /// Reconstruct several archive files in order, stopping at the first error.
    pub fn reconstruct_files<H, P>(
        &self,
        paths: &[P],
        host: &mut H,
    ) -> Result<Vec<(PathBuf, ReconstructionReport)>, ReplayError>
    where
        H: SceneHost,
        P: AsRef<Path>,
    {
        let mut reports = Vec::with_capacity(paths.len());
        for path in paths {
            let report = self.reconstruct_file(path, host)?;
            reports.push((path.as_ref().to_path_buf(), report));
        }
        Ok(reports)
    }

    fn replay<H, F>(
        &self,
        archive: &Archive,
        unknown: &[SkippedPart],
        collection: Option<String>,
        host: &mut H,
        mut progress: F,
    ) -> Result<ReconstructionReport, ReplayError>
    where
        H: SceneHost,
        F: FnMut(&ReplayProgress<'_>),
    {
        if let Some(name) = &collection {
            host.create_collection(name)?;
        }

        let mut report = ReconstructionReport {
            collection,
            parts: Vec::with_capacity(archive.len() + unknown.len()),
        };

        for skipped in unknown {
            warn!("Skipping part {}: unsupported part type {:?}", skipped.name, skipped.tag);
            report.parts.push(PartOutcome::skipped(
                &skipped.name,
                SkipReason::UnsupportedPartType(skipped.tag.clone()),
            ));
        }

        for (name, part) in archive.parts() {
            let outcome = self.replay_part(name, part, host, &mut progress)?;
            report.parts.push(outcome);
        }

        report.parts.sort_by(|a, b| a.name.cmp(&b.name));
        info!("{}", report);
        Ok(report)
    }

    fn replay_part<H, F>(
        &self,
        name: &str,
        part: &ArchivedPart,
        host: &mut H,
        progress: &mut F,
    ) -> Result<PartOutcome, ReplayError>
    where
        H: SceneHost,
        F: FnMut(&ReplayProgress<'_>),
    {
        let state = PartState::Pending;

        let format = part.descriptor.mesh_format();
        if let MeshFormat::Unknown(ext) = format {
            warn!("Skipping part {}: unsupported file format .{}", name, ext);
            state.advance(PartState::Skipped);
            return Ok(PartOutcome::skipped(
                name,
                SkipReason::UnsupportedMeshFormat(ext),
            ));
        }

        let imported = format.import(host, Path::new(&part.descriptor.mesh_path))?;
        let state = state.advance(PartState::MeshLoaded);

        let mut meshes = Vec::new();
        for object in imported {
            if object.kind.is_import_noise() {
                debug!("Deleting imported {:?} {}", object.kind, object.name);
                host.delete_object(object.handle)?;
                continue;
            }
            if let Some(scale) = part.descriptor.mesh_scale {
                host.set_object_scale(&object.handle, scale)?;
            }
            if object.kind == ObjectKind::Mesh {
                meshes.push(object.handle);
            }
        }

        let object = match meshes.len() {
            0 => {
                warn!("Skipping part {}: import produced no mesh", name);
                state.advance(PartState::Skipped);
                return Ok(PartOutcome::skipped(name, SkipReason::NoGeometry));
            }
            1 => meshes.remove(0),
            _ => host.merge_objects(meshes)?,
        };
        host.rename_object(&object, name)?;
        let state = state.advance(PartState::Merged);

        let state = state.advance(PartState::Animating);
        let limit = self.config.frame_limit();
        let total = part.samples.len();
        let mut keyframes = 0;
        let mut last_host_frame = None;
        let mut truncated = false;

        for (i, sample) in part.samples.iter().enumerate() {
            let index = i as u64;
            if !self.config.keeps(index) {
                continue;
            }
            if let Some(limit) = limit
                && index > limit
            {
                debug!("Part {}: exceeded max frame count {}", name, limit);
                truncated = true;
                break;
            }

            let step = ReplayProgress {
                part: name,
                consumed: i,
                total,
            };
            debug!("[{:.1}% | {}]", step.fraction() * 100.0, name);
            progress(&step);

            let host_frame = self.config.host_frame(index);
            host.set_timeline_frame(host_frame)?;
            host.set_object_transform(&object, sample.position, sample.orientation)?;
            host.insert_keyframe(&object, host_frame, KeyChannels::LOCATION_ROTATION)?;
            keyframes += 1;
            last_host_frame = Some(host_frame);
        }

        let state = state.advance(PartState::Done);
        Ok(PartOutcome {
            name: name.to_string(),
            state,
            skip_reason: None,
            keyframes,
            last_host_frame,
            truncated,
        })
    }
}
