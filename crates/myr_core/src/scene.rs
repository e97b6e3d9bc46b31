//! Scene data shared read-only by every render thread.
//!
//! A [`Scene`] is assembled once from mesh arrays, a material table and a
//! camera. Construction validates every index, derives one [`Triangle`] per
//! face and collects the emissive faces used for light sampling. Nothing in
//! it changes afterwards.

use myr_math::{Triangle, Vec3};
use thiserror::Error;

use crate::camera::Camera;
use crate::material::Material;
use crate::mesh::Mesh;

/// Errors that can occur while assembling a scene.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    #[error("scene has no emissive faces")]
    NoEmissiveFaces,

    #[error("face {face} references vertex {index}, out of range")]
    VertexIndexOutOfRange { face: usize, index: u32 },

    #[error("face {face} references normal {index}, out of range")]
    NormalIndexOutOfRange { face: usize, index: u32 },

    #[error("face {face} references uv {index}, out of range")]
    UvIndexOutOfRange { face: usize, index: u32 },

    #[error("face {face} references material {material}, out of range")]
    MaterialOutOfRange { face: usize, material: u32 },
}

/// Result type for scene assembly.
pub type SceneResult<T> = Result<T, SceneError>;

/// Immutable scene: geometry, materials, emitters and camera.
#[derive(Clone, Debug)]
pub struct Scene {
    mesh: Mesh,
    materials: Vec<Material>,
    triangles: Vec<Triangle>,
    emissive_faces: Vec<u32>,
    camera: Camera,
}

impl Scene {
    /// Validate the arrays and derive per-face triangles.
    ///
    /// Fails if any index is out of range or no face is emissive.
    pub fn new(mesh: Mesh, materials: Vec<Material>, camera: Camera) -> SceneResult<Self> {
        validate(&mesh, &materials)?;

        let triangles: Vec<Triangle> = (0..mesh.face_count()).map(|f| mesh.triangle(f)).collect();

        let degenerate = triangles.iter().filter(|t| t.area <= 0.0).count();
        if degenerate > 0 {
            log::warn!("Scene contains {} zero-area faces; they will never be hit", degenerate);
        }

        let emissive_faces: Vec<u32> = mesh
            .faces
            .iter()
            .enumerate()
            .filter(|(i, f)| materials[f.material as usize].is_emissive() && triangles[*i].area > 0.0)
            .map(|(i, _)| i as u32)
            .collect();

        if emissive_faces.is_empty() {
            return Err(SceneError::NoEmissiveFaces);
        }

        log::info!(
            "Scene: {} faces, {} vertices, {} materials, {} emissive faces",
            mesh.face_count(),
            mesh.vertex_count(),
            materials.len(),
            emissive_faces.len()
        );

        Ok(Self {
            mesh,
            materials,
            triangles,
            emissive_faces,
            camera,
        })
    }

    /// One triangle per face, in face order.
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    #[inline]
    pub fn triangle(&self, face: u32) -> &Triangle {
        &self.triangles[face as usize]
    }

    /// Indices of faces whose material emits light.
    pub fn emissive_faces(&self) -> &[u32] {
        &self.emissive_faces
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    #[inline]
    pub fn face_material(&self, face: u32) -> &Material {
        &self.materials[self.mesh.faces[face as usize].material as usize]
    }

    /// Surface normal at point `p` on `face`.
    ///
    /// Interpolates the face's vertex normals when it has them, otherwise
    /// returns the geometric normal. Not flipped towards any viewer.
    pub fn shading_normal(&self, face: u32, p: Vec3) -> Vec3 {
        let tri = self.triangle(face);
        match self.mesh.faces[face as usize].normals {
            Some(ids) => {
                let w = tri.barycentric(p);
                let [n0, n1, n2] = ids.map(|i| self.mesh.normals[i as usize]);
                (n0 * w.x + n1 * w.y + n2 * w.z)
                    .try_normalize()
                    .unwrap_or_else(|| tri.normal())
            }
            None => tri.normal(),
        }
    }
}

fn validate(mesh: &Mesh, materials: &[Material]) -> SceneResult<()> {
    let positions = mesh.positions.len() as u32;
    let normals = mesh.normals.len() as u32;
    let uvs = mesh.uvs.len() as u32;

    for (face, f) in mesh.faces.iter().enumerate() {
        if let Some(&index) = f.vertices.iter().find(|&&i| i >= positions) {
            return Err(SceneError::VertexIndexOutOfRange { face, index });
        }
        if let Some(&index) = f.normals.iter().flatten().find(|&&i| i >= normals) {
            return Err(SceneError::NormalIndexOutOfRange { face, index });
        }
        if let Some(&index) = f.uvs.iter().flatten().find(|&&i| i >= uvs) {
            return Err(SceneError::UvIndexOutOfRange { face, index });
        }
        if f.material as usize >= materials.len() {
            return Err(SceneError::MaterialOutOfRange {
                face,
                material: f.material,
            });
        }
    }
    Ok(())
}
