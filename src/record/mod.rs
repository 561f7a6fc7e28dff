//! Pose capture from a physics simulation.
//!
//! A [`Recorder`] tracks any number of bodies. Each registered body gets a
//! [`BodyTrack`] holding one pose sequence per visual part; every call to
//! [`Recorder::capture`] appends exactly one sample to every part of every
//! body, so frame `i` of each part always refers to the same simulation step.

mod recorder;
mod track;

pub use recorder::{BodySource, EngineError, PartSource, PhysicsEngine, RecordError, Recorder};
pub use track::{BodyTrack, TrackedPart};
