//! Per-body pose history.

use super::{BodySource, PartSource, PhysicsEngine, RecordError};
use crate::schema::{PartDescriptor, Pose, PoseSample, Vec3};

/// One recorded part of a tracked body.
#[derive(Debug, Clone)]
pub struct TrackedPart<L> {
    /// Archive-wide part name.
    pub name: String,
    /// Engine link handle, passed back verbatim on every pose query.
    pub link: L,
    pub descriptor: PartDescriptor,
    /// Link-local pose of the visual mesh.
    pub visual_origin: Pose,
    samples: Vec<PoseSample>,
}

impl<L> TrackedPart<L> {
    /// Recorded samples, oldest first.
    pub fn samples(&self) -> &[PoseSample] {
        &self.samples
    }
}

/// Pose history of every part of one body.
///
/// All parts always hold the same number of samples: a capture either
/// appends to every part or to none.
#[derive(Debug, Clone)]
pub struct BodyTrack<B, L> {
    body: B,
    source: BodySource,
    parts: Vec<TrackedPart<L>>,
    frames: u64,
}

impl<B, L> BodyTrack<B, L>
where
    B: Copy + std::fmt::Display,
    L: Copy,
{
    /// Build a track from the parts the engine enumerated for `body`.
    ///
    /// Part names are `{model stem}_{body}_{link name}`. The body's global
    /// scaling is folded into mesh scales and visual-origin translations.
    pub fn new(body: B, source: BodySource, part_sources: Vec<PartSource<L>>) -> Self {
        let prefix = format!("{}_{}", source.model_stem(), body);
        let scaling = source.global_scaling;

        let parts = part_sources
            .into_iter()
            .map(|part| {
                let mut visual_origin = part.visual_origin;
                if scaling != 1.0 {
                    for v in &mut visual_origin.position {
                        *v *= scaling;
                    }
                }
                TrackedPart {
                    name: format!("{}_{}", prefix, part.link_name),
                    link: part.link,
                    descriptor: PartDescriptor::mesh(
                        part.mesh_path,
                        scaled(part.mesh_scale, scaling),
                    ),
                    visual_origin,
                    samples: Vec::new(),
                }
            })
            .collect();

        Self {
            body,
            source,
            parts,
            frames: 0,
        }
    }

    pub fn body(&self) -> B {
        self.body
    }

    pub fn source(&self) -> &BodySource {
        &self.source
    }

    pub fn parts(&self) -> &[TrackedPart<L>] {
        &self.parts
    }

    /// Look up a part by its archive name.
    pub fn part(&self, name: &str) -> Option<&TrackedPart<L>> {
        self.parts.iter().find(|p| p.name == name)
    }

    /// Number of captures taken.
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// Frame indices recorded so far, in order.
    pub fn frame_indices(&self) -> std::ops::Range<u64> {
        0..self.frames
    }

    /// Query the current world pose of every part without recording it.
    pub(crate) fn query<E>(&self, engine: &E) -> Result<Vec<Pose>, RecordError>
    where
        E: PhysicsEngine<Body = B, Link = L>,
    {
        let mut poses = Vec::with_capacity(self.parts.len());
        for part in &self.parts {
            let link_pose = engine.world_pose(self.body, part.link)?;
            let pose = link_pose.compose(&part.visual_origin);
            if !pose.is_finite() {
                return Err(RecordError::NonFinitePose {
                    part: part.name.clone(),
                    frame: self.frames,
                });
            }
            poses.push(pose);
        }
        Ok(poses)
    }

    /// Append one sample per part. `poses` must come from [`Self::query`].
    pub(crate) fn append(&mut self, poses: Vec<Pose>) {
        debug_assert_eq!(poses.len(), self.parts.len());
        let frame = self.frames;
        for (part, pose) in self.parts.iter_mut().zip(poses) {
            part.samples.push(PoseSample::new(frame, pose));
        }
        self.frames += 1;
    }

    /// Reject scales and visual origins the archive could never carry.
    ///
    /// A non-finite global scaling shows up here too, folded into every
    /// part's mesh scale.
    pub(crate) fn check_finite(&self) -> Result<(), RecordError> {
        for part in &self.parts {
            let scale_ok = part
                .descriptor
                .mesh_scale
                .is_none_or(|s| s.iter().all(|v| v.is_finite()));
            if !scale_ok {
                return Err(RecordError::NonFiniteScale {
                    part: part.name.clone(),
                });
            }
            if !part.visual_origin.is_finite() {
                return Err(RecordError::NonFiniteVisualOrigin {
                    part: part.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Drop every sample, keeping the registered parts.
    pub(crate) fn clear(&mut self) {
        for part in &mut self.parts {
            part.samples.clear();
        }
        self.frames = 0;
    }
}

fn scaled(scale: Option<Vec3>, factor: f64) -> Option<Vec3> {
    if factor == 1.0 {
        return scale;
    }
    Some(scale.unwrap_or([1.0; 3]).map(|v| v * factor))
}
