//! Reconstruction of recorded archives inside an animation host.
//!
//! The host is reached only through [`SceneHost`]. Each archive part becomes
//! one imported, merged and keyframed object; parts whose mesh format or
//! part type is unknown are skipped without affecting the others.

mod host;
mod reconstructor;
mod scene_log;

pub use host::{Axis, HostError, ImportedObject, KeyChannels, ObjAxes, ObjectKind, SceneHost};
pub use reconstructor::{
    PartOutcome, PartState, ReconstructionReport, Reconstructor, ReplayError, ReplayProgress,
    SkipReason,
};
pub use scene_log::{ImportRecord, Keyframe, LoggedObject, ObjectId, SceneLog};
