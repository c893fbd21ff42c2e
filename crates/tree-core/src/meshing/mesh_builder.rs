use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::GeometryError;

/// One triangle. Each attribute stream is indexed on its own, so positions,
/// texcoords, normals and colors can be welded independently.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Face {
    pub vertices: [u32; 3],
    pub texcoords: [u32; 3],
    pub normals: [u32; 3],
    pub colors: [u32; 3],
}

/// Number of elements of each stream a primitive needs.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct StreamCounts {
    pub vertices: usize,
    pub faces: usize,
    pub texcoords: usize,
    pub normals: usize,
    pub colors: usize,
}

impl StreamCounts {
    /// Every per-vertex stream has `vertices` entries.
    pub fn per_vertex(vertices: usize, faces: usize) -> Self {
        Self {
            vertices,
            faces,
            texcoords: vertices,
            normals: vertices,
            colors: vertices,
        }
    }
}

/// First index of the range reserved in each stream.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Reservation {
    pub vertices: u32,
    pub texcoords: u32,
    pub normals: u32,
    pub colors: u32,
    counts: StreamCounts,
}

impl Reservation {
    pub fn counts(&self) -> StreamCounts {
        self.counts
    }

    /// Offsets local indices into the reserved ranges.
    pub fn face(&self, vertices: [u32; 3], texcoords: [u32; 3], normals: [u32; 3], colors: [u32; 3]) -> Face {
        let shift = |idx: [u32; 3], base: u32| idx.map(|i| i + base);
        Face {
            vertices: shift(vertices, self.vertices),
            texcoords: shift(texcoords, self.texcoords),
            normals: shift(normals, self.normals),
            colors: shift(colors, self.colors),
        }
    }

    pub fn uniform_face(&self, indices: [u32; 3]) -> Face {
        self.face(indices, indices, indices, indices)
    }
}

/// Attributes of one primitive, written before being copied into the buffer.
#[derive(Clone, Debug, Default)]
pub struct Scratch {
    pub vertices: Vec<Vec3>,
    pub faces: Vec<Face>,
    pub texcoords: Vec<Vec2>,
    pub normals: Vec<Vec3>,
    pub colors: Vec<[f32; 4]>,
}

impl Scratch {
    pub fn with_counts(counts: StreamCounts) -> Self {
        Self {
            vertices: Vec::with_capacity(counts.vertices),
            faces: Vec::with_capacity(counts.faces),
            texcoords: Vec::with_capacity(counts.texcoords),
            normals: Vec::with_capacity(counts.normals),
            colors: Vec::with_capacity(counts.colors),
        }
    }

    fn counts(&self) -> StreamCounts {
        StreamCounts {
            vertices: self.vertices.len(),
            faces: self.faces.len(),
            texcoords: self.texcoords.len(),
            normals: self.normals.len(),
            colors: self.colors.len(),
        }
    }
}

/// Append-only triangle canvas with five independently sized streams.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GeometryBuffer {
    pub(crate) vertices: Vec<Vec3>,
    pub(crate) faces: Vec<Face>,
    pub(crate) texcoords: Vec<Vec2>,
    pub(crate) normals: Vec<Vec3>,
    pub(crate) colors: Vec<[f32; 4]>,
}

/// Grow `stream` so that `additional` more elements fit, by exactly the
/// shortfall. Repeated small reservations therefore reallocate often.
fn grow<T>(stream: &mut Vec<T>, additional: usize, name: &'static str) -> Result<(), GeometryError> {
    if stream.capacity() - stream.len() >= additional {
        return Ok(());
    }
    stream
        .try_reserve_exact(additional)
        .map_err(|source| GeometryError::Allocation {
            stream: name,
            additional,
            source,
        })
}

impl GeometryBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// `hint` vertices, with matching room in the other streams.
    pub fn with_capacity(hint: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(hint),
            faces: Vec::with_capacity(hint),
            texcoords: Vec::with_capacity(hint),
            normals: Vec::with_capacity(hint),
            colors: Vec::with_capacity(hint),
        }
    }

    /// Make room for `counts` more elements and return where they will land.
    /// Nothing is written; on failure the buffer keeps its contents.
    pub fn reserve(&mut self, counts: StreamCounts) -> Result<Reservation, GeometryError> {
        grow(&mut self.vertices, counts.vertices, "vertex")?;
        grow(&mut self.faces, counts.faces, "face")?;
        grow(&mut self.texcoords, counts.texcoords, "texcoord")?;
        grow(&mut self.normals, counts.normals, "normal")?;
        grow(&mut self.colors, counts.colors, "color")?;
        Ok(Reservation {
            vertices: self.vertices.len() as u32,
            texcoords: self.texcoords.len() as u32,
            normals: self.normals.len() as u32,
            colors: self.colors.len() as u32,
            counts,
        })
    }

    /// Copy a scratch primitive into the ranges handed out by `reserve`.
    pub fn commit(&mut self, reservation: Reservation, scratch: Scratch) {
        debug_assert_eq!(scratch.counts(), reservation.counts);
        debug_assert_eq!(self.vertices.len() as u32, reservation.vertices);
        self.vertices.extend_from_slice(&scratch.vertices);
        self.faces.extend_from_slice(&scratch.faces);
        self.texcoords.extend_from_slice(&scratch.texcoords);
        self.normals.extend_from_slice(&scratch.normals);
        self.colors.extend_from_slice(&scratch.colors);
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }
    pub fn texcoord_count(&self) -> usize {
        self.texcoords.len()
    }
    pub fn normal_count(&self) -> usize {
        self.normals.len()
    }
    pub fn color_count(&self) -> usize {
        self.colors.len()
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }
    pub fn faces(&self) -> &[Face] {
        &self.faces
    }
    pub fn texcoords(&self) -> &[Vec2] {
        &self.texcoords
    }
    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }
    pub fn colors(&self) -> &[[f32; 4]] {
        &self.colors
    }

    pub fn vertex(&self, i: u32) -> Vec3 {
        self.vertices[i as usize]
    }

    /// Flattened position indices, three per face, for index-buffer uploads.
    pub fn triangle_indices(&self) -> Vec<u32> {
        self.faces.iter().flat_map(|f| f.vertices).collect()
    }

    /// Every face index is in bounds of its stream.
    pub fn is_consistent(&self) -> bool {
        let within = |idx: [u32; 3], len: usize| idx.iter().all(|&i| (i as usize) < len);
        self.faces.iter().all(|f| {
            within(f.vertices, self.vertices.len())
                && within(f.texcoords, self.texcoords.len())
                && within(f.normals, self.normals.len())
                && within(f.colors, self.colors.len())
        })
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.faces.clear();
        self.texcoords.clear();
        self.normals.clear();
        self.colors.clear();
    }
}
