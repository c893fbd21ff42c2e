//! Primitive generators writing into a [`GeometryBuffer`].
//!
//! Every generator works the same way: count what it needs in each stream,
//! reserve it, build the primitive in a [`Scratch`] with indices already
//! offset into the reserved ranges, then commit. A failed reservation
//! returns before anything is written.
//!
//! Primitives are modelled around local +Y and rotated onto their axis with
//! [`orient`], so rings lie in the local XZ plane.

use glam::{Quat, Vec2, Vec3};

use super::mesh_builder::{GeometryBuffer, Scratch, StreamCounts};
use crate::error::GeometryError;
use crate::utils::orient;

pub const BASE_NUM_VERTICES: usize = 8;

const WHITE: [f32; 4] = [1., 1., 1., 1.];

/// Ring resolution for a level of detail. Every level currently gets the
/// same resolution.
pub fn lod_vertex_count(_lod: u32) -> usize {
    BASE_NUM_VERTICES
}

/// Unit circle in the XZ plane, starting at +X and turning toward +Z.
fn unit_ring(n: usize) -> impl Iterator<Item = Vec3> {
    (0..n).map(move |i| {
        let angle = std::f32::consts::TAU * i as f32 / n as f32;
        Vec3::new(angle.cos(), 0., angle.sin())
    })
}

#[derive(Copy, Clone, Debug)]
pub struct Cone {
    pub position: Vec3,
    pub axis: Vec3,
    pub base_radius: f32,
    pub height: f32,
    /// add a cap over the base
    pub close: bool,
    pub color: [f32; 4],
}

impl Cone {
    pub fn new(base_radius: f32, height: f32) -> Self {
        Self {
            position: Vec3::ZERO,
            axis: Vec3::Y,
            base_radius,
            height,
            close: false,
            color: WHITE,
        }
    }
}

/// Apex first, then the base ring, then the base center when closed.
pub fn add_cone(buffer: &mut GeometryBuffer, cone: &Cone, lod: u32) -> Result<(), GeometryError> {
    let n = lod_vertex_count(lod);
    let (extra_vertices, extra_faces) = if cone.close { (1, n) } else { (0, 0) };
    let counts = StreamCounts::per_vertex(n + 1 + extra_vertices, n + extra_faces);
    let reservation = buffer.reserve(counts)?;
    let mut scratch = Scratch::with_counts(counts);

    let rotation = orient(cone.axis);
    let axis = rotation * Vec3::Y;
    let place = |local: Vec3| cone.position + rotation * local;

    scratch.vertices.push(place(cone.height * Vec3::Y));
    scratch.normals.push(axis);
    scratch.texcoords.push(Vec2::new(0.5, 1.));
    for (i, dir) in unit_ring(n).enumerate() {
        scratch.vertices.push(place(cone.base_radius * dir));
        let slant = (cone.height * dir + cone.base_radius * Vec3::Y)
            .try_normalize()
            .unwrap_or(dir);
        scratch.normals.push(rotation * slant);
        scratch.texcoords.push(Vec2::new(i as f32 / n as f32, 0.));
    }
    for i in 0..n as u32 {
        let j = (i + 1) % n as u32;
        scratch.faces.push(reservation.uniform_face([0, 1 + j, 1 + i]));
    }

    if cone.close {
        let center = n as u32 + 1;
        scratch.vertices.push(cone.position);
        scratch.normals.push(-axis);
        scratch.texcoords.push(Vec2::splat(0.5));
        for i in 0..n as u32 {
            let j = (i + 1) % n as u32;
            scratch.faces.push(reservation.uniform_face([center, 1 + i, 1 + j]));
        }
    }
    scratch.colors.resize(counts.colors, cone.color);

    buffer.commit(reservation, scratch);
    Ok(())
}

/// One end of a lofted tube.
#[derive(Copy, Clone, Debug)]
pub struct Ring {
    pub position: Vec3,
    pub axis: Vec3,
    pub radius: f32,
    /// texture coordinate along the tube
    pub v: f32,
    pub color: [f32; 4],
}

/// Loft two rings into a tube side: one quad per ring segment.
///
/// Positions and normals are per ring vertex. Texcoords repeat the first
/// column at `u = 1` so the texture does not wrap backwards across the seam.
/// Colors are per ring.
pub fn add_tube(buffer: &mut GeometryBuffer, base: &Ring, tip: &Ring, lod: u32) -> Result<(), GeometryError> {
    let n = lod_vertex_count(lod);
    let counts = StreamCounts {
        vertices: 2 * n,
        faces: 2 * n,
        texcoords: 2 * (n + 1),
        normals: 2 * n,
        colors: 2,
    };
    let reservation = buffer.reserve(counts)?;
    let mut scratch = Scratch::with_counts(counts);

    for ring in [base, tip] {
        let rotation = orient(ring.axis);
        for dir in unit_ring(n) {
            let dir = rotation * dir;
            scratch.vertices.push(ring.position + ring.radius * dir);
            scratch.normals.push(dir);
        }
        scratch
            .texcoords
            .extend((0..=n).map(|i| Vec2::new(i as f32 / n as f32, ring.v)));
        scratch.colors.push(ring.color);
    }

    let n = n as u32;
    for i in 0..n {
        let j = (i + 1) % n;
        let (b_i, b_j, t_i, t_j) = (i, j, n + i, n + j);
        let (uv_b_i, uv_b_j, uv_t_i, uv_t_j) = (i, i + 1, n + 1 + i, n + 2 + i);
        scratch.faces.push(reservation.face(
            [b_i, t_i, b_j],
            [uv_b_i, uv_t_i, uv_b_j],
            [b_i, t_i, b_j],
            [0, 1, 0],
        ));
        scratch.faces.push(reservation.face(
            [b_j, t_i, t_j],
            [uv_b_j, uv_t_i, uv_t_j],
            [b_j, t_i, t_j],
            [0, 1, 1],
        ));
    }

    buffer.commit(reservation, scratch);
    Ok(())
}

/// Flat elliptic disc facing `facing`. `width` and `height` are the
/// diameters along the local X and Z axes.
#[derive(Copy, Clone, Debug)]
pub struct Oval {
    pub position: Vec3,
    pub facing: Vec3,
    pub width: f32,
    pub height: f32,
    pub color: [f32; 4],
}

/// Center first, then the rim. A single normal and color for the whole disc.
pub fn add_oval(buffer: &mut GeometryBuffer, oval: &Oval, lod: u32) -> Result<(), GeometryError> {
    let n = lod_vertex_count(lod);
    let counts = StreamCounts {
        vertices: n + 1,
        faces: n,
        texcoords: n + 1,
        normals: 1,
        colors: 1,
    };
    let reservation = buffer.reserve(counts)?;
    let mut scratch = Scratch::with_counts(counts);

    let rotation = orient(oval.facing);
    let half = Vec3::new(0.5 * oval.width, 0., 0.5 * oval.height);
    scratch.vertices.push(oval.position);
    scratch.texcoords.push(Vec2::splat(0.5));
    for dir in unit_ring(n) {
        scratch.vertices.push(oval.position + rotation * (half * dir));
        scratch
            .texcoords
            .push(Vec2::new(0.5 + 0.5 * dir.x, 0.5 + 0.5 * dir.z));
    }
    scratch.normals.push(rotation * Vec3::Y);
    scratch.colors.push(oval.color);

    for i in 0..n as u32 {
        let j = (i + 1) % n as u32;
        let v = [0, 1 + j, 1 + i];
        scratch.faces.push(reservation.face(v, v, [0; 3], [0; 3]));
    }

    buffer.commit(reservation, scratch);
    Ok(())
}

/// Three quads sharing the line from `position` along `axis`, 60° apart.
#[derive(Copy, Clone, Debug)]
pub struct Billboard {
    pub position: Vec3,
    pub axis: Vec3,
    pub length: f32,
    pub width: f32,
    pub color: [f32; 4],
}

const BILLBOARD_PLANES: u32 = 3;

/// Four texcoords shared by the three quads, one normal per quad, one color.
pub fn add_billboard(buffer: &mut GeometryBuffer, billboard: &Billboard) -> Result<(), GeometryError> {
    let planes = BILLBOARD_PLANES as usize;
    let counts = StreamCounts {
        vertices: 4 * planes,
        faces: 2 * planes,
        texcoords: 4,
        normals: planes,
        colors: 1,
    };
    let reservation = buffer.reserve(counts)?;
    let mut scratch = Scratch::with_counts(counts);

    let rotation = orient(billboard.axis);
    let axis = rotation * Vec3::Y;
    let side = rotation * Vec3::X;
    let up = billboard.length * axis;

    scratch.texcoords.extend([
        Vec2::new(0., 0.),
        Vec2::new(1., 0.),
        Vec2::new(1., 1.),
        Vec2::new(0., 1.),
    ]);
    scratch.colors.push(billboard.color);

    for k in 0..BILLBOARD_PLANES {
        let turn = Quat::from_axis_angle(axis, k as f32 * std::f32::consts::FRAC_PI_3);
        let half = 0.5 * billboard.width * (turn * side);
        let p = billboard.position;
        scratch.vertices.extend([p - half, p + half, p + half + up, p - half + up]);
        scratch.normals.push((turn * side).cross(axis));

        let base = 4 * k;
        for corners in [[0, 1, 2], [0, 2, 3]] {
            scratch.faces.push(reservation.face(
                corners.map(|c| base + c),
                corners,
                [k; 3],
                [0; 3],
            ));
        }
    }

    buffer.commit(reservation, scratch);
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    fn face_normal(buffer: &GeometryBuffer, vertices: [u32; 3]) -> Vec3 {
        let [a, b, c] = vertices.map(|i| buffer.vertex(i));
        (b - a).cross(c - a)
    }

    fn centroid(buffer: &GeometryBuffer, vertices: [u32; 3]) -> Vec3 {
        vertices.iter().map(|&i| buffer.vertex(i)).sum::<Vec3>() / 3.
    }

    #[test]
    fn open_cone() {
        let mut buffer = GeometryBuffer::new();
        add_cone(&mut buffer, &Cone::new(1., 2.), 0).unwrap();
        assert_eq!(buffer.vertex_count(), BASE_NUM_VERTICES + 1);
        assert_eq!(buffer.face_count(), BASE_NUM_VERTICES);
        assert_eq!(buffer.vertices()[0], Vec3::new(0., 2., 0.));
        assert!(buffer.is_consistent());
    }

    #[test]
    fn closed_cone_faces_outward() {
        let mut buffer = GeometryBuffer::new();
        let cone = Cone {
            position: Vec3::new(1., 2., 3.),
            axis: Vec3::new(1., 1., 0.),
            close: true,
            ..Cone::new(0.5, 3.)
        };
        add_cone(&mut buffer, &cone, 0).unwrap();
        assert_eq!(buffer.vertex_count(), BASE_NUM_VERTICES + 2);
        assert_eq!(buffer.face_count(), 2 * BASE_NUM_VERTICES);
        assert!(buffer.is_consistent());

        // centroid of the solid lies inside, every face points away from it
        let inside = cone.position + 0.25 * cone.height * cone.axis.normalize();
        for face in buffer.faces() {
            let n = face_normal(&buffer, face.vertices);
            assert!(n.dot(centroid(&buffer, face.vertices) - inside) > 0.);
        }
    }

    #[test]
    fn tube_between_rings() {
        let mut buffer = GeometryBuffer::new();
        let base = Ring {
            position: Vec3::ZERO,
            axis: Vec3::Y,
            radius: 1.,
            v: 0.,
            color: [0., 0., 0., 1.],
        };
        let tip = Ring {
            position: Vec3::new(0., 2., 0.5),
            axis: Vec3::new(0., 1., 0.3),
            radius: 0.5,
            v: 1.,
            color: [1., 1., 0., 1.],
        };
        add_tube(&mut buffer, &base, &tip, 0).unwrap();
        let n = BASE_NUM_VERTICES;
        let column = 1. / n as f32;
        assert_eq!(buffer.vertex_count(), 2 * n);
        assert_eq!(buffer.face_count(), 2 * n);
        assert_eq!(buffer.texcoord_count(), 2 * (n + 1));
        assert_eq!(buffer.normal_count(), 2 * n);
        assert_eq!(buffer.color_count(), 2);
        assert!(buffer.is_consistent());

        for face in buffer.faces() {
            let normal = face_normal(&buffer, face.vertices);
            let radial: Vec3 = face.normals.iter().map(|&i| buffer.normals()[i as usize]).sum();
            assert!(normal.dot(radial) > 0.);
            // texcoords never span more than one column
            let [a, b, c] = face.texcoords.map(|i| buffer.texcoords()[i as usize].x);
            assert!(a.max(b).max(c) - a.min(b).min(c) <= column + 1e-6);
        }
    }

    #[test]
    fn oval_lies_in_its_plane() {
        let mut buffer = GeometryBuffer::new();
        let oval = Oval {
            position: Vec3::new(0., 1., 0.),
            facing: Vec3::Z,
            width: 2.,
            height: 1.,
            color: WHITE,
        };
        add_oval(&mut buffer, &oval, 0).unwrap();
        assert_eq!(buffer.vertex_count(), BASE_NUM_VERTICES + 1);
        assert_eq!(buffer.face_count(), BASE_NUM_VERTICES);
        assert_eq!(buffer.normal_count(), 1);
        assert!(buffer.is_consistent());
        for v in buffer.vertices() {
            assert!((*v - oval.position).dot(Vec3::Z).abs() < 1e-5);
            assert!((*v - oval.position).length() <= 1. + 1e-5);
        }
        for face in buffer.faces() {
            assert!(face_normal(&buffer, face.vertices).dot(Vec3::Z) > 0.);
        }
    }

    #[test]
    fn billboard_cluster() {
        let mut buffer = GeometryBuffer::new();
        let billboard = Billboard {
            position: Vec3::new(1., 1., 1.),
            axis: Vec3::X,
            length: 0.4,
            width: 0.2,
            color: WHITE,
        };
        add_billboard(&mut buffer, &billboard).unwrap();
        assert_eq!(buffer.vertex_count(), 12);
        assert_eq!(buffer.face_count(), 6);
        assert_eq!(buffer.texcoord_count(), 4);
        assert_eq!(buffer.normal_count(), 3);
        assert_eq!(buffer.color_count(), 1);
        assert!(buffer.is_consistent());
        for v in buffer.vertices() {
            let along = (*v - billboard.position).dot(Vec3::X);
            assert!((-1e-5..=0.4 + 1e-5).contains(&along));
        }
    }

    #[test]
    fn generators_append() {
        let mut buffer = GeometryBuffer::new();
        add_cone(&mut buffer, &Cone::new(1., 1.), 0).unwrap();
        add_cone(&mut buffer, &Cone::new(1., 1.), 0).unwrap();
        let second = buffer.faces()[BASE_NUM_VERTICES];
        assert!(second.vertices.iter().all(|&i| i as usize > BASE_NUM_VERTICES));
        assert!(buffer.is_consistent());
    }
}
