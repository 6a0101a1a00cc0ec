//! Shared-vertex triangle mesh in the flat `{v, f}` wire layout.

use glam::DVec3;
use rustc_hash::FxHashMap;
use serde::Serialize;

/// Vertices are stored flat (`[x, y, z, x, y, z, ...]`, or `[x, y, ...]`
/// for a flat mesh) and faces as flat index triples.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct IndexedTriangleMesh {
    #[serde(rename = "v")]
    vertices: Vec<f64>,
    #[serde(rename = "f")]
    faces: Vec<u32>,
    #[serde(skip)]
    flat: bool,
}

impl IndexedTriangleMesh {
    /// Merge identical vertices. When `flat`, vertices are keyed and stored
    /// by XY only.
    pub fn from_triangles(triangles: &[[DVec3; 3]], flat: bool) -> Self {
        let mut lookup: FxHashMap<[u64; 3], u32> = FxHashMap::default();
        let mut mesh = Self {
            vertices: Vec::with_capacity(triangles.len() * 3),
            faces: Vec::with_capacity(triangles.len() * 3),
            flat,
        };
        for tri in triangles {
            for p in tri {
                // + 0.0 folds -0.0 into 0.0
                let z = if flat { 0.0 } else { p.z + 0.0 };
                let key = [(p.x + 0.0).to_bits(), (p.y + 0.0).to_bits(), z.to_bits()];
                let next = lookup.len() as u32;
                let index = *lookup.entry(key).or_insert_with(|| {
                    mesh.vertices.push(p.x);
                    mesh.vertices.push(p.y);
                    if !flat {
                        mesh.vertices.push(p.z);
                    }
                    next
                });
                mesh.faces.push(index);
            }
        }
        mesh
    }

    fn dims(&self) -> usize {
        if self.flat { 2 } else { 3 }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / self.dims()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    pub fn vertex(&self, i: usize) -> DVec3 {
        let d = self.dims();
        let v = &self.vertices[i * d..(i + 1) * d];
        DVec3::new(v[0], v[1], if self.flat { 0.0 } else { v[2] })
    }

    pub fn face(&self, i: usize) -> [u32; 3] {
        [self.faces[i * 3], self.faces[i * 3 + 1], self.faces[i * 3 + 2]]
    }

    pub fn raw_vertices(&self) -> &[f64] {
        &self.vertices
    }

    pub fn raw_faces(&self) -> &[u32] {
        &self.faces
    }
}
