use cgmath::{ElementWise, Rotation};
use serde::{Deserialize, Serialize};
use splinekit_base::{One, Zero};
use std::sync::{Arc, OnceLock};
use tracing::debug;

pub use splinekit_base::{Error, Quaternion, Result, Vector3};

/// Read-only surface geometry supplied by the host. `normals` runs parallel to
/// `positions`; each triangle lists three vertex indices.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SurfaceMesh {
    pub positions: Vec<Vector3>,
    pub normals: Vec<Vector3>,
    pub triangles: Vec<[usize; 3]>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeshVertex {
    pub position: Vector3,
    pub normal: Vector3,
}

#[derive(Clone, Debug)]
struct DerivedMesh {
    vertices: Vec<MeshVertex>,
    triangles: Vec<[usize; 3]>,
    min_extent: f64,
    span: f64,
}

/// A surface mesh together with a translation, rotation and scale.
///
/// Transform methods return a new value sharing the same mesh. Transformed
/// vertices, triangles and extents are computed on first access and kept for
/// the lifetime of the value. Extents are measured along local X.
#[derive(Clone, Debug)]
pub struct SourceMesh {
    mesh: Arc<SurfaceMesh>,
    translation: Vector3,
    rotation: Quaternion,
    scale: Vector3,
    derived: OnceLock<Result<DerivedMesh>>,
}

impl SourceMesh {
    pub fn build(mesh: Arc<SurfaceMesh>) -> Self {
        Self {
            mesh,
            translation: Vector3::zero(),
            rotation: Quaternion::one(),
            scale: Vector3::new(1.0, 1.0, 1.0),
            derived: OnceLock::new(),
        }
    }

    pub fn translate(&self, translation: Vector3) -> Self {
        Self {
            translation,
            ..self.untouched()
        }
    }

    pub fn rotate(&self, rotation: Quaternion) -> Self {
        Self {
            rotation,
            ..self.untouched()
        }
    }

    pub fn scale(&self, scale: Vector3) -> Self {
        Self {
            scale,
            ..self.untouched()
        }
    }

    fn untouched(&self) -> Self {
        Self {
            mesh: Arc::clone(&self.mesh),
            translation: self.translation,
            rotation: self.rotation,
            scale: self.scale,
            derived: OnceLock::new(),
        }
    }

    pub fn mesh(&self) -> &Arc<SurfaceMesh> {
        &self.mesh
    }

    pub fn translation(&self) -> Vector3 {
        self.translation
    }

    pub fn rotation(&self) -> Quaternion {
        self.rotation
    }

    pub fn scale_factors(&self) -> Vector3 {
        self.scale
    }

    /// True when an odd number of scale axes are negative, which mirrors the
    /// mesh and requires reversed triangle winding.
    pub fn is_mirrored(&self) -> bool {
        let negative = [self.scale.x, self.scale.y, self.scale.z]
            .iter()
            .filter(|c| **c < 0.0)
            .count();
        negative % 2 == 1
    }

    pub fn vertices(&self) -> Result<&[MeshVertex]> {
        Ok(&self.derived()?.vertices)
    }

    pub fn triangles(&self) -> Result<&[[usize; 3]]> {
        Ok(&self.derived()?.triangles)
    }

    pub fn min_extent_along_axis(&self) -> Result<f64> {
        Ok(self.derived()?.min_extent)
    }

    pub fn span_along_axis(&self) -> Result<f64> {
        Ok(self.derived()?.span)
    }

    fn derived(&self) -> Result<&DerivedMesh> {
        self.derived
            .get_or_init(|| self.compute())
            .as_ref()
            .map_err(Clone::clone)
    }

    fn compute(&self) -> Result<DerivedMesh> {
        let mesh = self.mesh.as_ref();
        let mut vertices = Vec::with_capacity(mesh.positions.len());
        for (index, &position) in mesh.positions.iter().enumerate() {
            let normal = *mesh.normals.get(index).ok_or_else(|| {
                Error::MalformedGeometry(format!(
                    "vertex {index} has no normal ({} positions, {} normals)",
                    mesh.positions.len(),
                    mesh.normals.len()
                ))
            })?;
            vertices.push(MeshVertex { position, normal });
        }

        let mirrored = self.is_mirrored();
        let triangles: Vec<[usize; 3]> = if mirrored {
            mesh.triangles.iter().map(|&[a, b, c]| [c, b, a]).collect()
        } else {
            mesh.triangles.clone()
        };

        let rotate = self.rotation != Quaternion::one();
        let scale = self.scale != Vector3::new(1.0, 1.0, 1.0);
        let translate = self.translation != Vector3::zero();
        for vertex in &mut vertices {
            if rotate {
                vertex.position = self.rotation.rotate_vector(vertex.position);
                vertex.normal = self.rotation.rotate_vector(vertex.normal);
            }
            if scale {
                vertex.position = vertex.position.mul_element_wise(self.scale);
                vertex.normal = vertex.normal.mul_element_wise(self.scale);
            }
            if translate {
                vertex.position += self.translation;
            }
        }

        let (min_extent, span) = extent_along_x(&vertices);
        debug!(
            vertices = vertices.len(),
            triangles = triangles.len(),
            mirrored,
            "built transformed source mesh"
        );

        Ok(DerivedMesh {
            vertices,
            triangles,
            min_extent,
            span,
        })
    }
}

fn extent_along_x(vertices: &[MeshVertex]) -> (f64, f64) {
    if vertices.is_empty() {
        return (0.0, 0.0);
    }
    let (min, max) = vertices
        .iter()
        .map(|v| v.position.x)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), x| {
            (min.min(x), max.max(x))
        });
    (min, (max - min).abs())
}
