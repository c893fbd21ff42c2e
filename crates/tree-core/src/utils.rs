use glam::{Quat, Vec3};

/// Local "up" of every generated primitive. Rings live in the XZ plane.
pub const REFERENCE_UP: Vec3 = Vec3::Y;

/// Rotation taking `REFERENCE_UP` onto `axis`.
///
/// Built as an axis-angle around `REFERENCE_UP × axis`, so the roll around
/// `axis` is whatever falls out of that choice: two rings oriented along
/// slightly different axes are not twisted consistently.
pub fn orient(axis: Vec3) -> Quat {
    let Some(axis) = axis.try_normalize() else {
        return Quat::IDENTITY;
    };
    let cross = REFERENCE_UP.cross(axis);
    if cross.length_squared() < 1e-12 {
        if REFERENCE_UP.dot(axis) > 0. {
            Quat::IDENTITY
        } else {
            Quat::from_axis_angle(Vec3::X, std::f32::consts::PI)
        }
    } else {
        Quat::from_axis_angle(cross.normalize(), REFERENCE_UP.angle_between(axis))
    }
}

/// Rotate `v` by `angle` radians around `axis`.
pub fn rotate_around(v: Vec3, axis: Vec3, angle: f32) -> Vec3 {
    match axis.try_normalize() {
        Some(axis) => Quat::from_axis_angle(axis, angle) * v,
        None => v,
    }
}

/// Component of `v` orthogonal to the unit vector `n`, normalized.
pub fn orthogonal_part(v: Vec3, n: Vec3) -> Option<Vec3> {
    (v - v.dot(n) * n).try_normalize()
}

/// Hash key of a float under `==`: the bit pattern, with -0.0 folded onto 0.0.
pub fn float_key(x: f32) -> u32 {
    if x == 0. {
        0
    } else {
        x.to_bits()
    }
}

pub fn vec3_key(v: Vec3) -> [u32; 3] {
    [float_key(v.x), float_key(v.y), float_key(v.z)]
}
