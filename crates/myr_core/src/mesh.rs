//! Triangle mesh arrays.
//!
//! A [`Mesh`] holds shared vertex attribute arrays plus one [`Face`] per
//! triangle. Faces index into the position, normal and uv arrays separately,
//! the way OBJ files do, so an attribute can be shared by some faces and not
//! others.

use myr_math::{Mat4, Triangle, Vec2, Vec3};

/// One triangle of a mesh: index triples into the attribute arrays plus a
/// material id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Face {
    pub vertices: [u32; 3],
    pub normals: Option<[u32; 3]>,
    pub uvs: Option<[u32; 3]>,
    pub material: u32,
}

impl Face {
    /// Face with positions only (flat shaded, no texture coordinates).
    pub fn new(vertices: [u32; 3], material: u32) -> Self {
        Self {
            vertices,
            normals: None,
            uvs: None,
            material,
        }
    }
}

/// Vertex positions, normals and texture coordinates plus the faces that
/// reference them.
#[derive(Clone, Debug, Default)]
pub struct Mesh {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub faces: Vec<Face>,
}

impl Mesh {
    /// Append a triangle given by its corners. Returns the face index.
    pub fn add_triangle(&mut self, corners: [Vec3; 3], material: u32) -> usize {
        let base = self.positions.len() as u32;
        self.positions.extend_from_slice(&corners);
        self.faces.push(Face::new([base, base + 1, base + 2], material));
        self.faces.len() - 1
    }

    /// Append a planar quad `a b c d` (counter-clockwise seen from the side
    /// its normal points to) as two triangles sharing the `a c` diagonal.
    pub fn add_quad(&mut self, corners: [Vec3; 4], material: u32) {
        let base = self.positions.len() as u32;
        self.positions.extend_from_slice(&corners);
        self.faces.push(Face::new([base, base + 1, base + 2], material));
        self.faces.push(Face::new([base, base + 2, base + 3], material));
    }

    /// Append another mesh, re-basing its indices.
    pub fn append(&mut self, other: &Mesh) {
        let p = self.positions.len() as u32;
        let n = self.normals.len() as u32;
        let t = self.uvs.len() as u32;

        self.positions.extend_from_slice(&other.positions);
        self.normals.extend_from_slice(&other.normals);
        self.uvs.extend_from_slice(&other.uvs);
        self.faces.extend(other.faces.iter().map(|f| Face {
            vertices: f.vertices.map(|i| i + p),
            normals: f.normals.map(|ids| ids.map(|i| i + n)),
            uvs: f.uvs.map(|ids| ids.map(|i| i + t)),
            material: f.material,
        }));
    }

    /// Apply an affine transform to positions and normals.
    pub fn transform(&mut self, matrix: &Mat4) {
        let normal_matrix = matrix.inverse().transpose();
        for p in &mut self.positions {
            *p = matrix.transform_point3(*p);
        }
        for n in &mut self.normals {
            *n = normal_matrix.transform_vector3(*n).normalize_or_zero();
        }
    }

    /// Get the number of triangles in the mesh.
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Get the number of vertices in the mesh.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Derive the triangle for one face.
    ///
    /// Panics if the face's vertex indices are out of range; `Scene::new`
    /// validates them before any triangle is derived.
    pub fn triangle(&self, face: usize) -> Triangle {
        let [a, b, c] = self.faces[face].vertices.map(|i| self.positions[i as usize]);
        Triangle::new(a, b, c)
    }
}
