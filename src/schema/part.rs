//! Static per-part metadata and mesh format resolution.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Vec3;

/// Kind of a recorded part.
///
/// Only meshes exist today; the tag is written to every archive entry so
/// that readers can tell future non-visual parts apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartType {
    #[default]
    Mesh,
}

impl PartType {
    /// Archive tag for this part type.
    pub fn tag(self) -> &'static str {
        match self {
            PartType::Mesh => "mesh",
        }
    }

    /// Parse an archive tag. Returns `None` for tags this version does not know.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "mesh" => Some(PartType::Mesh),
            _ => None,
        }
    }
}

impl fmt::Display for PartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Static description of one renderable part.
///
/// `mesh_scale` is applied once to the reconstructed object; it is never
/// keyframed.
#[derive(Debug, Clone, PartialEq)]
pub struct PartDescriptor {
    pub kind: PartType,
    /// Mesh file, resolved by the reconstructing host.
    pub mesh_path: String,
    /// Optional non-uniform scale.
    pub mesh_scale: Option<Vec3>,
}

impl PartDescriptor {
    pub fn mesh(mesh_path: impl Into<String>, mesh_scale: Option<Vec3>) -> Self {
        Self {
            kind: PartType::Mesh,
            mesh_path: mesh_path.into(),
            mesh_scale,
        }
    }

    /// Mesh format inferred from `mesh_path`.
    pub fn mesh_format(&self) -> MeshFormat {
        MeshFormat::from_path(&self.mesh_path)
    }
}

/// Mesh formats the reconstructor knows how to import.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MeshFormat {
    /// Wavefront OBJ.
    Obj,
    /// COLLADA.
    Dae,
    /// Stereolithography.
    Stl,
    /// Anything else; carries the lowercased extension for diagnostics.
    Unknown(String),
}

impl MeshFormat {
    /// Infer the format from a mesh path.
    ///
    /// Takes everything after the last `.` (the whole path when there is no
    /// dot), lowercases it, and checks in order whether it contains `obj`,
    /// `dae` or `stl`. This is the only place format inference happens.
    pub fn from_path(path: &str) -> Self {
        let extension = path.rsplit('.').next().unwrap_or(path).to_lowercase();

        if extension.contains("obj") {
            MeshFormat::Obj
        } else if extension.contains("dae") {
            MeshFormat::Dae
        } else if extension.contains("stl") {
            MeshFormat::Stl
        } else {
            MeshFormat::Unknown(extension)
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, MeshFormat::Unknown(_))
    }
}

impl fmt::Display for MeshFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeshFormat::Obj => f.write_str("obj"),
            MeshFormat::Dae => f.write_str("dae"),
            MeshFormat::Stl => f.write_str("stl"),
            MeshFormat::Unknown(ext) => write!(f, "unknown (.{})", ext),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(MeshFormat::from_path("meshes/base.obj"), MeshFormat::Obj);
        assert_eq!(MeshFormat::from_path("arm.STL"), MeshFormat::Stl);
        assert_eq!(MeshFormat::from_path("a/b.c/link.Dae"), MeshFormat::Dae);
    }

    #[test]
    fn test_format_sniffing_is_substring_based() {
        // Containment, not equality
        assert_eq!(MeshFormat::from_path("model.objx"), MeshFormat::Obj);
        // No dot: the whole path is treated as the extension
        assert_eq!(MeshFormat::from_path("meshes/stl_drill"), MeshFormat::Stl);
    }

    #[test]
    fn test_unknown_format() {
        let format = MeshFormat::from_path("drill.PLY");
        assert_eq!(format, MeshFormat::Unknown("ply".to_string()));
        assert!(!format.is_supported());
    }

    #[test]
    fn test_part_type_tags() {
        assert_eq!(PartType::from_tag("mesh"), Some(PartType::Mesh));
        assert_eq!(PartType::from_tag("light"), None);
        assert_eq!(PartType::Mesh.to_string(), "mesh");
    }
}
