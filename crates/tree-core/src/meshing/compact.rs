use std::collections::HashMap;
use std::hash::Hash;

use glam::Vec2;
use tracing::debug;

use super::mesh_builder::{Face, GeometryBuffer};
use crate::utils::{float_key, vec3_key};

/// Stream sizes before and after [`GeometryBuffer::compact`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CompactionStats {
    pub vertices: (usize, usize),
    pub texcoords: (usize, usize),
    pub normals: (usize, usize),
    pub colors: (usize, usize),
}

impl CompactionStats {
    pub fn removed(&self) -> usize {
        [self.vertices, self.texcoords, self.normals, self.colors]
            .iter()
            .map(|(before, after)| before - after)
            .sum()
    }
}

/// Unique values of one stream in first-occurrence order.
struct Welder<K, T> {
    index: HashMap<K, u32>,
    unique: Vec<T>,
}

impl<K: Hash + Eq, T: Copy> Welder<K, T> {
    fn weld(values: &[T], key: impl Fn(T) -> K) -> Self {
        let mut welder = Self {
            index: HashMap::with_capacity(values.len()),
            unique: Vec::new(),
        };
        for &v in values {
            let next = welder.index.len() as u32;
            welder.index.entry(key(v)).or_insert_with(|| {
                welder.unique.push(v);
                next
            });
        }
        welder.unique.shrink_to_fit();
        welder
    }

    /// New index of `values[i]`. Dangling indices are kept as they are.
    fn remap(&self, values: &[T], i: u32, key: impl Fn(T) -> K) -> u32 {
        values
            .get(i as usize)
            .map_or(i, |&v| self.index[&key(v)])
    }
}

fn vec2_key(v: Vec2) -> [u32; 2] {
    [float_key(v.x), float_key(v.y)]
}

fn color_key(c: [f32; 4]) -> [u32; 4] {
    c.map(float_key)
}

impl GeometryBuffer {
    /// Weld equal values of each attribute stream and rewrite the faces.
    ///
    /// Values are merged only when bitwise equal (up to the sign of zero), so
    /// vertices that differ by rounding stay apart and can leave visible seams.
    pub fn compact(&mut self) -> CompactionStats {
        let vertices = Welder::weld(&self.vertices, vec3_key);
        let texcoords = Welder::weld(&self.texcoords, vec2_key);
        let normals = Welder::weld(&self.normals, vec3_key);
        let colors = Welder::weld(&self.colors, color_key);

        let faces = self
            .faces
            .iter()
            .map(|face| Face {
                vertices: face.vertices.map(|i| vertices.remap(&self.vertices, i, vec3_key)),
                texcoords: face.texcoords.map(|i| texcoords.remap(&self.texcoords, i, vec2_key)),
                normals: face.normals.map(|i| normals.remap(&self.normals, i, vec3_key)),
                colors: face.colors.map(|i| colors.remap(&self.colors, i, color_key)),
            })
            .collect();

        let stats = CompactionStats {
            vertices: (self.vertices.len(), vertices.unique.len()),
            texcoords: (self.texcoords.len(), texcoords.unique.len()),
            normals: (self.normals.len(), normals.unique.len()),
            colors: (self.colors.len(), colors.unique.len()),
        };
        debug!(?stats, removed = stats.removed(), "compacted geometry");

        self.faces = faces;
        self.vertices = vertices.unique;
        self.texcoords = texcoords.unique;
        self.normals = normals.unique;
        self.colors = colors.unique;
        stats
    }
}
