//! Capabilities the reconstructor needs from an animation host.

use std::fmt;
use std::path::Path;

use crate::schema::{MeshFormat, Quat, Vec3};

/// Coordinate axis used by importer axis conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
    NegX,
    NegY,
    NegZ,
}

/// Axis convention passed to the OBJ importer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjAxes {
    pub forward: Axis,
    pub up: Axis,
}

impl ObjAxes {
    /// Y forward, Z up: the physics engine's world frame.
    pub const Y_FORWARD_Z_UP: ObjAxes = ObjAxes {
        forward: Axis::Y,
        up: Axis::Z,
    };
}

/// What an imported scene object is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Mesh,
    Camera,
    Light,
    /// Empties, armatures and the like.
    Other,
}

impl ObjectKind {
    /// Cameras and lights some importers create alongside the geometry.
    pub fn is_import_noise(self) -> bool {
        matches!(self, ObjectKind::Camera | ObjectKind::Light)
    }
}

/// One object created by a mesh import.
#[derive(Debug, Clone)]
pub struct ImportedObject<H> {
    pub handle: H,
    pub name: String,
    pub kind: ObjectKind,
}

/// Transform channels written by a keyframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyChannels {
    pub location: bool,
    pub rotation: bool,
}

impl KeyChannels {
    pub const LOCATION_ROTATION: KeyChannels = KeyChannels {
        location: true,
        rotation: true,
    };
}

/// Host failures. The reconstructor never recovers from these.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("Host cannot import {0} meshes")]
    UnsupportedFormat(String),
    #[error("Unknown host object {0}")]
    UnknownObject(String),
    #[error("Host operation `{operation}` failed: {message}")]
    Operation {
        operation: &'static str,
        message: String,
    },
}

/// Scene mutation primitives of an animation host.
///
/// Every method mutates shared host state; calls are strictly sequential.
pub trait SceneHost {
    /// Handle to a scene object.
    type Object: Clone + fmt::Debug;

    /// Create a collection and make it the target of later imports.
    fn create_collection(&mut self, name: &str) -> Result<(), HostError>;

    fn import_obj(
        &mut self,
        path: &Path,
        axes: ObjAxes,
    ) -> Result<Vec<ImportedObject<Self::Object>>, HostError>;

    fn import_collada(&mut self, path: &Path)
    -> Result<Vec<ImportedObject<Self::Object>>, HostError>;

    fn import_stl(&mut self, path: &Path) -> Result<Vec<ImportedObject<Self::Object>>, HostError>;

    fn delete_object(&mut self, object: Self::Object) -> Result<(), HostError>;

    /// Set the static scale of an object.
    fn set_object_scale(&mut self, object: &Self::Object, scale: Vec3) -> Result<(), HostError>;

    /// Join several objects into one. The returned handle replaces the inputs.
    fn merge_objects(&mut self, objects: Vec<Self::Object>) -> Result<Self::Object, HostError>;

    fn rename_object(&mut self, object: &Self::Object, name: &str) -> Result<(), HostError>;

    fn set_timeline_frame(&mut self, frame: u64) -> Result<(), HostError>;

    /// Set location and quaternion rotation (`x, y, z, w`).
    fn set_object_transform(
        &mut self,
        object: &Self::Object,
        position: Vec3,
        orientation: Quat,
    ) -> Result<(), HostError>;

    /// Key the object's current transform at `frame`.
    fn insert_keyframe(
        &mut self,
        object: &Self::Object,
        frame: u64,
        channels: KeyChannels,
    ) -> Result<(), HostError>;
}

impl MeshFormat {
    /// Import `path` with the host primitive for this format.
    pub fn import<H: SceneHost>(
        &self,
        host: &mut H,
        path: &Path,
    ) -> Result<Vec<ImportedObject<H::Object>>, HostError> {
        match self {
            MeshFormat::Obj => host.import_obj(path, ObjAxes::Y_FORWARD_Z_UP),
            MeshFormat::Dae => host.import_collada(path),
            MeshFormat::Stl => host.import_stl(path),
            MeshFormat::Unknown(ext) => Err(HostError::UnsupportedFormat(ext.clone())),
        }
    }
}
