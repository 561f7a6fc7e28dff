//! Recorder for capturing link poses from a running simulation.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::path::{Path, PathBuf};

use log::{debug, info};

use super::BodyTrack;
use crate::archive::{self, Archive, ArchiveError, ArchivedPart, Compression};
use crate::schema::{Pose, Vec3};

/// Pose queries the recorder needs from a physics engine.
///
/// Body and link handles are opaque: the recorder stores them and hands them
/// back, nothing more.
pub trait PhysicsEngine {
    /// Handle of a simulated body. Its `Display` form appears in part names.
    type Body: Copy + Eq + Hash + fmt::Display + fmt::Debug;
    /// Handle of one link within a body.
    type Link: Copy + fmt::Debug;

    /// List the visual parts of `body` as described by `source`.
    fn enumerate_parts(
        &self,
        body: Self::Body,
        source: &BodySource,
    ) -> Result<Vec<PartSource<Self::Link>>, EngineError>;

    /// Current world-space pose of one link.
    fn world_pose(&self, body: Self::Body, link: Self::Link) -> Result<Pose, EngineError>;
}

/// How to enumerate a body's parts, usually a structured model file.
#[derive(Debug, Clone, PartialEq)]
pub struct BodySource {
    pub model_path: PathBuf,
    /// Uniform scale the body was loaded with.
    pub global_scaling: f64,
}

impl BodySource {
    pub fn new<P: AsRef<Path>>(model_path: P) -> Self {
        Self {
            model_path: model_path.as_ref().to_path_buf(),
            global_scaling: 1.0,
        }
    }

    pub fn with_global_scaling(mut self, scaling: f64) -> Self {
        self.global_scaling = scaling;
        self
    }

    /// Model file name without its extension.
    pub fn model_stem(&self) -> String {
        self.model_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "body".to_string())
    }
}

/// One visual part reported by [`PhysicsEngine::enumerate_parts`].
#[derive(Debug, Clone)]
pub struct PartSource<L> {
    pub link: L,
    pub link_name: String,
    pub mesh_path: String,
    pub mesh_scale: Option<Vec3>,
    /// Pose of the visual mesh relative to its link frame.
    pub visual_origin: Pose,
}

/// Failures reported by a physics engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Body {0} is not valid in the simulation")]
    InvalidBody(String),
    #[error("Link {link} is not valid on body {body}")]
    InvalidLink { body: String, link: String },
    #[error("Cannot enumerate parts of {path}: {reason}")]
    Enumerate { path: PathBuf, reason: String },
}

/// Recording errors.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("Body {0} is already registered")]
    DuplicateRegistration(String),
    #[error("Body {0} has no visual parts to record")]
    NoParts(String),
    #[error("Non-finite pose for part {part} at frame {frame}")]
    NonFinitePose { part: String, frame: u64 },
    #[error("Non-finite mesh scale for part {part}")]
    NonFiniteScale { part: String },
    #[error("Non-finite visual origin for part {part}")]
    NonFiniteVisualOrigin { part: String },
    #[error("Physics engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),
}

/// Registry of tracked bodies and their pose histories.
///
/// Usage:
/// ```ignore
/// let mut recorder = Recorder::new();
/// recorder.register(&engine, body, BodySource::new("assets/drill.urdf"))?;
/// for _ in 0..500 {
///     engine.step();
///     recorder.capture(&engine)?;
/// }
/// recorder.save("drill.simrec", Compression::None)?;
/// ```
///
/// Capture reads mutable simulation state: call it between simulation
/// steps, never concurrently with one.
pub struct Recorder<E: PhysicsEngine> {
    tracks: Vec<BodyTrack<E::Body, E::Link>>,
    index: HashMap<E::Body, usize>,
}

impl<E: PhysicsEngine> Default for Recorder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: PhysicsEngine> Recorder<E> {
    pub fn new() -> Self {
        Self {
            tracks: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Start tracking `body`, creating one empty track per visual part.
    pub fn register(
        &mut self,
        engine: &E,
        body: E::Body,
        source: BodySource,
    ) -> Result<(), RecordError> {
        if self.index.contains_key(&body) {
            return Err(RecordError::DuplicateRegistration(body.to_string()));
        }

        let part_sources = engine.enumerate_parts(body, &source)?;
        if part_sources.is_empty() {
            return Err(RecordError::NoParts(body.to_string()));
        }

        let track = BodyTrack::new(body, source, part_sources);
        track.check_finite()?;
        debug_assert!(
            track.parts().iter().all(|p| !self.has_part(&p.name)),
            "part names must be unique across bodies"
        );
        info!(
            "Registered body {} ({} parts from {})",
            body,
            track.parts().len(),
            track.source().model_path.display()
        );

        self.index.insert(body, self.tracks.len());
        self.tracks.push(track);
        Ok(())
    }

    /// Record the current pose of every registered part.
    ///
    /// Every query runs before anything is appended, so on error no track
    /// changes.
    pub fn capture(&mut self, engine: &E) -> Result<(), RecordError> {
        let mut pending = Vec::with_capacity(self.tracks.len());
        for track in &self.tracks {
            pending.push(track.query(engine)?);
        }

        for (track, poses) in self.tracks.iter_mut().zip(pending) {
            track.append(poses);
        }
        Ok(())
    }

    /// Flatten every track into an archive. Recorder state is untouched.
    pub fn export(&self) -> Archive {
        let mut archive = Archive::new();
        for track in &self.tracks {
            for part in track.parts() {
                archive.insert(
                    part.name.clone(),
                    ArchivedPart::new(part.descriptor.clone(), part.samples().to_vec()),
                );
            }
        }
        archive
    }

    /// Export and write the archive to `path`.
    pub fn save<P: AsRef<Path>>(
        &self,
        path: P,
        compression: Compression,
    ) -> Result<u64, RecordError> {
        let path = path.as_ref();
        let bytes = archive::save(&self.export(), path, compression)?;
        info!(
            "Saved {} parts to {} ({} bytes)",
            self.part_count(),
            path.display(),
            bytes
        );
        Ok(bytes)
    }

    /// Drop all recorded samples. Registrations are kept.
    pub fn reset(&mut self) {
        debug!("Resetting {} tracks", self.tracks.len());
        for track in &mut self.tracks {
            track.clear();
        }
    }

    /// Number of registered bodies.
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Number of parts across all bodies.
    pub fn part_count(&self) -> usize {
        self.tracks.iter().map(|t| t.parts().len()).sum()
    }

    pub fn track(&self, body: E::Body) -> Option<&BodyTrack<E::Body, E::Link>> {
        self.index.get(&body).map(|&i| &self.tracks[i])
    }

    pub fn tracks(&self) -> &[BodyTrack<E::Body, E::Link>] {
        &self.tracks
    }

    /// Captures taken for `body` since it was registered (or last reset).
    pub fn frames_captured(&self, body: E::Body) -> Option<u64> {
        self.track(body).map(|t| t.frame_count())
    }

    fn has_part(&self, name: &str) -> bool {
        self.tracks.iter().any(|t| t.part(name).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::QUAT_IDENTITY;
    use std::cell::Cell;

    /// Bodies whose links move along z by `link * step` per step.
    struct StepEngine {
        step: Cell<u32>,
        links_per_body: u32,
        fail_link: Option<u32>,
    }

    impl StepEngine {
        fn new(links_per_body: u32) -> Self {
            Self {
                step: Cell::new(0),
                links_per_body,
                fail_link: None,
            }
        }

        fn advance(&self) {
            self.step.set(self.step.get() + 1);
        }
    }

    impl PhysicsEngine for StepEngine {
        type Body = u32;
        type Link = u32;

        fn enumerate_parts(
            &self,
            _body: u32,
            _source: &BodySource,
        ) -> Result<Vec<PartSource<u32>>, EngineError> {
            Ok((0..self.links_per_body)
                .map(|link| PartSource {
                    link,
                    link_name: format!("link{}", link),
                    mesh_path: format!("meshes/link{}.stl", link),
                    mesh_scale: None,
                    visual_origin: Pose::IDENTITY,
                })
                .collect())
        }

        fn world_pose(&self, body: u32, link: u32) -> Result<Pose, EngineError> {
            if self.fail_link == Some(link) {
                return Err(EngineError::InvalidLink {
                    body: body.to_string(),
                    link: link.to_string(),
                });
            }
            let z = (self.step.get() * link) as f64;
            Ok(Pose::new([body as f64, 0.0, z], QUAT_IDENTITY))
        }
    }

    #[test]
    fn test_duplicate_registration() {
        let engine = StepEngine::new(2);
        let mut recorder = Recorder::new();
        recorder.register(&engine, 1, BodySource::new("a.urdf")).unwrap();

        let err = recorder
            .register(&engine, 1, BodySource::new("a.urdf"))
            .unwrap_err();
        assert!(matches!(err, RecordError::DuplicateRegistration(ref b) if b == "1"));
        assert_eq!(recorder.len(), 1);
    }

    #[test]
    fn test_no_parts() {
        let engine = StepEngine::new(0);
        let mut recorder = Recorder::new();
        let err = recorder
            .register(&engine, 1, BodySource::new("a.urdf"))
            .unwrap_err();
        assert!(matches!(err, RecordError::NoParts(_)));
        assert!(recorder.is_empty());
    }

    #[test]
    fn test_capture_is_append_only() {
        let engine = StepEngine::new(3);
        let mut recorder = Recorder::new();
        recorder.register(&engine, 1, BodySource::new("a.urdf")).unwrap();
        recorder.register(&engine, 2, BodySource::new("a.urdf")).unwrap();

        for k in 1..=5u64 {
            engine.advance();
            recorder.capture(&engine).unwrap();

            for track in recorder.tracks() {
                for part in track.parts() {
                    assert_eq!(part.samples().len() as u64, k);
                    for (i, s) in part.samples().iter().enumerate() {
                        assert_eq!(s.frame_index, i as u64);
                    }
                }
            }
        }

        let track = recorder.track(2).unwrap();
        let link2 = track.part("a_2_link2").unwrap();
        assert_eq!(link2.samples()[4].position, [2.0, 0.0, 10.0]);
    }

    #[test]
    fn test_failed_capture_changes_nothing() {
        let mut engine = StepEngine::new(3);
        let mut recorder = Recorder::new();
        recorder.register(&engine, 1, BodySource::new("a.urdf")).unwrap();
        recorder.capture(&engine).unwrap();

        engine.fail_link = Some(2);
        assert!(matches!(
            recorder.capture(&engine),
            Err(RecordError::Engine(EngineError::InvalidLink { .. }))
        ));

        let track = recorder.track(1).unwrap();
        assert_eq!(track.frame_count(), 1);
        assert!(track.parts().iter().all(|p| p.samples().len() == 1));
    }

    #[test]
    fn test_export_is_read_only() {
        let engine = StepEngine::new(2);
        let mut recorder = Recorder::new();
        recorder.register(&engine, 4, BodySource::new("arm.urdf")).unwrap();
        recorder.capture(&engine).unwrap();

        let first = recorder.export();
        assert_eq!(first.len(), 2);
        assert_eq!(first.get("arm_4_link0").unwrap().samples.len(), 1);

        recorder.capture(&engine).unwrap();
        assert_eq!(first.get("arm_4_link0").unwrap().samples.len(), 1);
        assert_eq!(recorder.export().get("arm_4_link0").unwrap().samples.len(), 2);
    }

    #[test]
    fn test_reset_keeps_registrations() {
        let engine = StepEngine::new(1);
        let mut recorder = Recorder::new();
        recorder.register(&engine, 1, BodySource::new("a.urdf")).unwrap();
        recorder.capture(&engine).unwrap();
        recorder.capture(&engine).unwrap();

        recorder.reset();
        assert_eq!(recorder.frames_captured(1), Some(0));
        recorder.capture(&engine).unwrap();
        assert_eq!(recorder.frames_captured(1), Some(1));
        assert_eq!(recorder.export().get("a_1_link0").unwrap().samples[0].frame_index, 0);
    }

    #[test]
    fn test_visual_origin_is_applied() {
        struct OffsetEngine;

        impl PhysicsEngine for OffsetEngine {
            type Body = u8;
            type Link = u8;

            fn enumerate_parts(
                &self,
                _body: u8,
                _source: &BodySource,
            ) -> Result<Vec<PartSource<u8>>, EngineError> {
                Ok(vec![PartSource {
                    link: 0,
                    link_name: "tip".to_string(),
                    mesh_path: "tip.obj".to_string(),
                    mesh_scale: None,
                    visual_origin: Pose::new([0.0, 0.0, 0.5], QUAT_IDENTITY),
                }])
            }

            fn world_pose(&self, _body: u8, _link: u8) -> Result<Pose, EngineError> {
                Ok(Pose::new([1.0, 2.0, 3.0], QUAT_IDENTITY))
            }
        }

        let mut recorder = Recorder::new();
        recorder
            .register(&OffsetEngine, 0, BodySource::new("pen.urdf").with_global_scaling(2.0))
            .unwrap();
        recorder.capture(&OffsetEngine).unwrap();

        let archive = recorder.export();
        let sample = archive.get("pen_0_tip").unwrap().samples[0];
        assert_eq!(sample.position, [1.0, 2.0, 4.0]);
        assert_eq!(sample.orientation, QUAT_IDENTITY);
    }

    #[test]
    fn test_non_finite_pose_rejected() {
        struct NanEngine;

        impl PhysicsEngine for NanEngine {
            type Body = u8;
            type Link = u8;

            fn enumerate_parts(
                &self,
                _body: u8,
                _source: &BodySource,
            ) -> Result<Vec<PartSource<u8>>, EngineError> {
                Ok(vec![PartSource {
                    link: 0,
                    link_name: "l".to_string(),
                    mesh_path: "l.obj".to_string(),
                    mesh_scale: None,
                    visual_origin: Pose::IDENTITY,
                }])
            }

            fn world_pose(&self, _body: u8, _link: u8) -> Result<Pose, EngineError> {
                Ok(Pose::new([f64::NAN, 0.0, 0.0], QUAT_IDENTITY))
            }
        }

        let mut recorder = Recorder::new();
        recorder.register(&NanEngine, 0, BodySource::new("x.urdf")).unwrap();
        assert!(matches!(
            recorder.capture(&NanEngine),
            Err(RecordError::NonFinitePose { frame: 0, .. })
        ));
        assert_eq!(recorder.frames_captured(0), Some(0));
    }

    /// One part with a configurable mesh scale and visual origin.
    struct ScaledEngine {
        mesh_scale: Option<Vec3>,
        visual_origin: Pose,
    }

    impl ScaledEngine {
        fn new(mesh_scale: Option<Vec3>) -> Self {
            Self {
                mesh_scale,
                visual_origin: Pose::IDENTITY,
            }
        }
    }

    impl PhysicsEngine for ScaledEngine {
        type Body = u8;
        type Link = u8;

        fn enumerate_parts(
            &self,
            _body: u8,
            _source: &BodySource,
        ) -> Result<Vec<PartSource<u8>>, EngineError> {
            Ok(vec![PartSource {
                link: 0,
                link_name: "l".to_string(),
                mesh_path: "l.obj".to_string(),
                mesh_scale: self.mesh_scale,
                visual_origin: self.visual_origin,
            }])
        }

        fn world_pose(&self, _body: u8, _link: u8) -> Result<Pose, EngineError> {
            Ok(Pose::IDENTITY)
        }
    }

    #[test]
    fn test_non_finite_scale_rejected_at_register() {
        let engine = ScaledEngine::new(Some([f64::NAN, 1.0, 1.0]));
        let mut recorder = Recorder::new();

        let err = recorder
            .register(&engine, 0, BodySource::new("x.urdf"))
            .unwrap_err();
        assert!(matches!(err, RecordError::NonFiniteScale { ref part } if part == "x_0_l"));
        assert!(recorder.is_empty());
        assert_eq!(recorder.frames_captured(0), None);
    }

    #[test]
    fn test_non_finite_global_scaling_rejected() {
        let engine = ScaledEngine::new(None);
        let mut recorder = Recorder::new();

        for scaling in [f64::NAN, f64::INFINITY] {
            let err = recorder
                .register(&engine, 0, BodySource::new("x.urdf").with_global_scaling(scaling))
                .unwrap_err();
            assert!(matches!(err, RecordError::NonFiniteScale { .. }));
        }
        assert!(recorder.is_empty());

        // The handle is still free for a valid registration.
        recorder
            .register(&engine, 0, BodySource::new("x.urdf").with_global_scaling(0.5))
            .unwrap();
        assert_eq!(recorder.len(), 1);
    }

    #[test]
    fn test_non_finite_visual_origin_rejected() {
        let mut engine = ScaledEngine::new(None);
        engine.visual_origin = Pose::new([0.0, f64::INFINITY, 0.0], QUAT_IDENTITY);
        let mut recorder = Recorder::new();

        assert!(matches!(
            recorder.register(&engine, 0, BodySource::new("x.urdf")),
            Err(RecordError::NonFiniteVisualOrigin { .. })
        ));
        assert!(recorder.is_empty());
    }

    #[test]
    fn test_registered_scale_saves() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.simrec");
        let engine = ScaledEngine::new(Some([2.0, 2.0, 2.0]));
        let mut recorder = Recorder::new();
        recorder
            .register(&engine, 0, BodySource::new("x.urdf").with_global_scaling(1.5))
            .unwrap();

        for _ in 0..100 {
            recorder.capture(&engine).unwrap();
        }
        assert_eq!(recorder.frames_captured(0), Some(100));
        assert!(recorder.save(&path, Compression::None).unwrap() > 0);

        let loaded = archive::load(&path).unwrap();
        assert_eq!(loaded.get("x_0_l").unwrap().descriptor.mesh_scale, Some([3.0; 3]));
    }
}
