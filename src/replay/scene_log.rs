//! In-memory [`SceneHost`] that records what a reconstruction does.
//!
//! Used for dry runs from the command line and as the host in tests.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use super::host::{HostError, ImportedObject, KeyChannels, ObjAxes, ObjectKind, SceneHost};
use crate::schema::{MeshFormat, QUAT_IDENTITY, Quat, Vec3};

/// Handle of an object in a [`SceneLog`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(usize);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A keyed transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe {
    pub frame: u64,
    pub position: Vec3,
    pub orientation: Quat,
    pub channels: KeyChannels,
}

/// An object as the log last saw it.
#[derive(Debug, Clone)]
pub struct LoggedObject {
    pub name: String,
    pub kind: ObjectKind,
    pub collection: Option<String>,
    pub scale: Option<Vec3>,
    pub position: Vec3,
    pub orientation: Quat,
    /// Keyframes sorted by frame.
    pub keyframes: Vec<Keyframe>,
    /// False once deleted or merged into another object.
    pub alive: bool,
}

/// A recorded mesh import.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportRecord {
    pub path: PathBuf,
    pub format: MeshFormat,
    pub axes: Option<ObjAxes>,
}

/// Recording scene host.
#[derive(Debug, Default)]
pub struct SceneLog {
    objects: Vec<LoggedObject>,
    collections: Vec<String>,
    timeline_frame: u64,
    imports: Vec<ImportRecord>,
    /// Objects produced by importing a given path; one mesh when absent.
    layouts: HashMap<PathBuf, Vec<ObjectKind>>,
    check_files: bool,
}

impl SceneLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make imports of `path` produce objects of the given kinds.
    pub fn with_layout<P: AsRef<Path>>(mut self, path: P, kinds: Vec<ObjectKind>) -> Self {
        self.layouts.insert(path.as_ref().to_path_buf(), kinds);
        self
    }

    /// Fail imports of mesh files that do not exist on disk.
    pub fn with_file_check(mut self) -> Self {
        self.check_files = true;
        self
    }

    /// Live object with the given name.
    pub fn object(&self, name: &str) -> Option<&LoggedObject> {
        self.objects.iter().find(|o| o.alive && o.name == name)
    }

    /// Live objects in creation order.
    pub fn objects(&self) -> impl Iterator<Item = &LoggedObject> {
        self.objects.iter().filter(|o| o.alive)
    }

    pub fn collections(&self) -> &[String] {
        &self.collections
    }

    pub fn imports(&self) -> &[ImportRecord] {
        &self.imports
    }

    pub fn timeline_frame(&self) -> u64 {
        self.timeline_frame
    }

    fn live_mut(&mut self, id: ObjectId) -> Result<&mut LoggedObject, HostError> {
        self.objects
            .get_mut(id.0)
            .filter(|o| o.alive)
            .ok_or_else(|| HostError::UnknownObject(id.to_string()))
    }

    fn import(
        &mut self,
        path: &Path,
        format: MeshFormat,
        axes: Option<ObjAxes>,
    ) -> Result<Vec<ImportedObject<ObjectId>>, HostError> {
        if self.check_files && !path.exists() {
            return Err(HostError::Operation {
                operation: "import",
                message: format!("{} does not exist", path.display()),
            });
        }

        self.imports.push(ImportRecord {
            path: path.to_path_buf(),
            format,
            axes,
        });

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "mesh".to_string());
        let kinds = self
            .layouts
            .get(path)
            .cloned()
            .unwrap_or_else(|| vec![ObjectKind::Mesh]);

        let mut created = Vec::with_capacity(kinds.len());
        for (i, kind) in kinds.into_iter().enumerate() {
            let name = match kind {
                ObjectKind::Camera => "Camera".to_string(),
                ObjectKind::Light => "Light".to_string(),
                _ if i == 0 => stem.clone(),
                _ => format!("{}.{:03}", stem, i),
            };
            let id = ObjectId(self.objects.len());
            self.objects.push(LoggedObject {
                name: name.clone(),
                kind,
                collection: self.collections.last().cloned(),
                scale: None,
                position: [0.0; 3],
                orientation: QUAT_IDENTITY,
                keyframes: Vec::new(),
                alive: true,
            });
            created.push(ImportedObject {
                handle: id,
                name,
                kind,
            });
        }
        Ok(created)
    }
}

impl SceneHost for SceneLog {
    type Object = ObjectId;

    fn create_collection(&mut self, name: &str) -> Result<(), HostError> {
        self.collections.push(name.to_string());
        Ok(())
    }

    fn import_obj(
        &mut self,
        path: &Path,
        axes: ObjAxes,
    ) -> Result<Vec<ImportedObject<ObjectId>>, HostError> {
        self.import(path, MeshFormat::Obj, Some(axes))
    }

    fn import_collada(&mut self, path: &Path) -> Result<Vec<ImportedObject<ObjectId>>, HostError> {
        self.import(path, MeshFormat::Dae, None)
    }

    fn import_stl(&mut self, path: &Path) -> Result<Vec<ImportedObject<ObjectId>>, HostError> {
        self.import(path, MeshFormat::Stl, None)
    }

    fn delete_object(&mut self, object: ObjectId) -> Result<(), HostError> {
        self.live_mut(object)?.alive = false;
        Ok(())
    }

    fn set_object_scale(&mut self, object: &ObjectId, scale: Vec3) -> Result<(), HostError> {
        self.live_mut(*object)?.scale = Some(scale);
        Ok(())
    }

    fn merge_objects(&mut self, objects: Vec<ObjectId>) -> Result<ObjectId, HostError> {
        let Some((&target, rest)) = objects.split_first() else {
            return Err(HostError::Operation {
                operation: "merge",
                message: "nothing to merge".to_string(),
            });
        };
        self.live_mut(target)?;
        for &id in rest {
            self.live_mut(id)?.alive = false;
        }
        Ok(target)
    }

    fn rename_object(&mut self, object: &ObjectId, name: &str) -> Result<(), HostError> {
        self.live_mut(*object)?.name = name.to_string();
        Ok(())
    }

    fn set_timeline_frame(&mut self, frame: u64) -> Result<(), HostError> {
        self.timeline_frame = frame;
        Ok(())
    }

    fn set_object_transform(
        &mut self,
        object: &ObjectId,
        position: Vec3,
        orientation: Quat,
    ) -> Result<(), HostError> {
        let obj = self.live_mut(*object)?;
        obj.position = position;
        obj.orientation = orientation;
        Ok(())
    }

    fn insert_keyframe(
        &mut self,
        object: &ObjectId,
        frame: u64,
        channels: KeyChannels,
    ) -> Result<(), HostError> {
        let obj = self.live_mut(*object)?;
        let key = Keyframe {
            frame,
            position: obj.position,
            orientation: obj.orientation,
            channels,
        };
        match obj.keyframes.binary_search_by_key(&frame, |k| k.frame) {
            Ok(i) => obj.keyframes[i] = key,
            Err(i) => obj.keyframes.insert(i, key),
        }
        Ok(())
    }
}
