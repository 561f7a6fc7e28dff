//! sim-replay - Record rigid-body simulations and replay them as animation.
//!
//! This crate captures the world pose of every visual part of articulated
//! bodies in a physics simulation, stores the capture as a portable archive,
//! and later rebuilds one keyframed object per part in an animation host.
//!
//! # Architecture
//!
//! - `schema`: Pose and part value types, replay configuration
//! - `record`: Recorder over a [`record::PhysicsEngine`]
//! - `archive`: Versioned JSON archive and file container
//! - `replay`: Reconstructor over a [`replay::SceneHost`]
//!
//! # Example
//!
//! ```rust,ignore
//! use sim_replay::{
//!     archive::Compression,
//!     record::{BodySource, Recorder},
//!     replay::{Reconstructor, SceneLog},
//!     schema::ReplayConfig,
//! };
//!
//! // Record
//! let mut recorder = Recorder::new();
//! recorder.register(&engine, body, BodySource::new("assets/power_drill.urdf"))?;
//! for _ in 0..500 {
//!     engine.step();
//!     recorder.capture(&engine)?;
//! }
//! recorder.save("demo.simrec", Compression::None)?;
//!
//! // Replay
//! let reconstructor = Reconstructor::new(ReplayConfig::default())?;
//! let mut host = SceneLog::new();
//! let report = reconstructor.reconstruct_file("demo.simrec", &mut host)?;
//! println!("{}", report);
//! ```

pub mod archive;
pub mod record;
pub mod replay;
pub mod schema;

// Re-export commonly used types
pub use archive::{Archive, ArchiveError, ArchivedPart};
pub use record::{BodySource, PhysicsEngine, RecordError, Recorder};
pub use replay::{ReconstructionReport, Reconstructor, ReplayError, SceneHost};
pub use schema::{PartDescriptor, Pose, PoseSample, ReplayConfig};
