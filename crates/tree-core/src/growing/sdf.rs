//! Foliage envelopes as signed distance fields.
//!
//! Negative inside, positive outside. Only used as a raymarch target to
//! drop leaves on the envelope surface.

use glam::Vec3;
use rand::{prelude::Distribution, Rng};
use serde::{Deserialize, Serialize};

pub const MAX_STEPS: usize = 100;
pub const MAX_DISTANCE: f32 = 100.;
pub const HIT_EPSILON: f32 = 1e-3;

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
}

impl Sphere {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    pub fn distance(&self, p: Vec3) -> f32 {
        (p - self.center).length() - self.radius
    }
}

/// Polynomial smooth minimum with blend width `k`.
pub fn smooth_min(a: f32, b: f32, k: f32) -> f32 {
    if k <= 0. {
        return a.min(b);
    }
    let h = (0.5 + 0.5 * (b - a) / k).clamp(0., 1.);
    b + (a - b) * h - k * h * (1. - h)
}

pub fn smooth_max(a: f32, b: f32, k: f32) -> f32 {
    -smooth_min(-a, -b, k)
}

/// Three weighted spheres around the tip of a branch: the union of `main`
/// and `additive`, minus `subtractive`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BranchSdf {
    pub main: Sphere,
    pub additive: Sphere,
    pub subtractive: Sphere,
    pub smoothing: f32,
}

impl BranchSdf {
    pub fn distance(&self, p: Vec3) -> f32 {
        let blob = smooth_min(
            self.main.distance(p),
            self.additive.distance(p),
            self.smoothing,
        );
        smooth_max(blob, -self.subtractive.distance(p), self.smoothing)
    }

    /// Central-difference gradient, normalized. Falls back to the direction
    /// away from the main center where the field is flat.
    pub fn normal(&self, p: Vec3) -> Vec3 {
        let h = 1e-3 * self.main.radius.max(1e-3);
        let d = |v: Vec3| self.distance(p + v) - self.distance(p - v);
        Vec3::new(d(h * Vec3::X), d(h * Vec3::Y), d(h * Vec3::Z))
            .try_normalize()
            .or_else(|| (p - self.main.center).try_normalize())
            .unwrap_or(Vec3::Y)
    }

    /// Radius of a sphere around the main center enclosing the whole envelope.
    pub fn bounding_radius(&self) -> f32 {
        let bulge = (self.additive.center - self.main.center).length() + self.additive.radius;
        self.main.radius.max(bulge) + self.smoothing
    }

    /// Sphere-trace from `origin` toward the main center.
    pub fn raymarch(&self, origin: Vec3) -> Option<Vec3> {
        let direction = (self.main.center - origin).try_normalize()?;
        let mut travelled = 0f32;
        for _ in 0..MAX_STEPS {
            let p = origin + travelled * direction;
            let d = self.distance(p);
            if d < HIT_EPSILON {
                return Some(p);
            }
            travelled += d;
            if travelled > MAX_DISTANCE {
                break;
            }
        }
        None
    }
}

/// Uniform point on the surface of a sphere.
pub struct UniformSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl Distribution<Vec3> for UniformSphere {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec3 {
        let z: f32 = rng.gen_range(-1f32..=1f32);
        let angle = rng.gen_range(0f32..std::f32::consts::TAU);
        let r = (1. - z * z).max(0.).sqrt();
        self.center + self.radius * Vec3::new(r * angle.cos(), r * angle.sin(), z)
    }
}
