use super::{export_common, in_range, HitInfo, Primitive};
use crate::error::ConfigError;
use crate::material::SharedMaterial;
use crate::math::*;
use crate::setting::{self, Params, Setting};

/// A solid box, axis-aligned in its own frame, centered on `center` with
/// half-extents `half_size`.
#[derive(Debug, Clone)]
pub struct Cuboid {
    pub center: Point3,
    pub half_size: Vec3,
    pub material: SharedMaterial,
    pub rotation: Rotation,
}

impl Cuboid {
    pub const TYPE_NAME: &'static str = "box";

    /// `size` is the full width, height and depth.
    pub fn new(center: Point3, size: Vec3, material: SharedMaterial) -> Self {
        Self {
            center,
            half_size: size / 2.0,
            material,
            rotation: Rotation::default(),
        }
    }

    pub fn from_params(params: &Params, material: SharedMaterial) -> Result<Self, ConfigError> {
        let center = setting::require_vec(params, Self::TYPE_NAME, ["x", "y", "z"])?;
        let size = setting::require_vec(params, Self::TYPE_NAME, ["width", "height", "depth"])?;
        Ok(Self::new(center, size, material))
    }

    /// Entry and exit distances through the three slabs, if the ray meets
    /// the box at all.
    fn slabs(&self, ray: &Ray) -> Option<(f64, f64)> {
        let lo = self.center - self.half_size;
        let hi = self.center + self.half_size;
        let mut near = f64::NEG_INFINITY;
        let mut far = f64::INFINITY;
        for (o, d, lo, hi) in [
            (ray.origin.x, ray.direction.x, lo.x, hi.x),
            (ray.origin.y, ray.direction.y, lo.y, hi.y),
            (ray.origin.z, ray.direction.z, lo.z, hi.z),
        ] {
            if d == 0.0 {
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }
            let (t0, t1) = ((lo - o) / d, (hi - o) / d);
            near = near.max(t0.min(t1));
            far = far.min(t0.max(t1));
        }
        (near <= far).then_some((near, far))
    }

    /// Outward face normal and face coordinates for a point on the surface.
    /// The face is the axis along which the point sits furthest out,
    /// relative to that axis's half-extent.
    fn face(&self, point: Point3) -> (Vec3, Uv) {
        let rel = point - self.center;
        let h = self.half_size;
        let (ax, ay, az) = ((rel.x / h.x).abs(), (rel.y / h.y).abs(), (rel.z / h.z).abs());
        let unit = |v: f64, half: f64| (v + half) / (2.0 * half);
        if ax >= ay && ax >= az {
            let uv = Uv::new(unit(rel.z, h.z), unit(rel.y, h.y));
            (Vec3::new(rel.x.signum(), 0.0, 0.0), uv)
        } else if ay >= az {
            let uv = Uv::new(unit(rel.x, h.x), unit(rel.z, h.z));
            (Vec3::new(0.0, rel.y.signum(), 0.0), uv)
        } else {
            let uv = Uv::new(unit(rel.x, h.x), unit(rel.y, h.y));
            (Vec3::new(0.0, 0.0, rel.z.signum()), uv)
        }
    }
}

impl Primitive for Cuboid {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn hit(&self, ray: &Ray, t_min: f64, t_max: f64) -> Option<HitInfo<'_>> {
        let local = self.rotation.to_local(ray);
        let (near, far) = self.slabs(&local)?;
        // From inside the box the exit face is the first surface met.
        let t = [near, far].into_iter().find(|&t| in_range(t, t_min, t_max))?;
        let (normal, uv) = self.face(local.at(t));
        Some(HitInfo {
            distance: t,
            hit_point: ray.at(t),
            normal: self.rotation.to_world(normal),
            uv,
            primitive: self,
        })
    }

    fn translate(&mut self, offset: Vec3) {
        self.center += offset;
    }

    fn rotation(&self) -> Rotation {
        self.rotation
    }

    fn rotation_mut(&mut self) -> &mut Rotation {
        &mut self.rotation
    }

    fn material(&self) -> &SharedMaterial {
        &self.material
    }

    fn clone_primitive(&self) -> Box<dyn Primitive> {
        Box::new(self.clone())
    }

    fn export_params(&self, setting: &mut Setting) {
        setting::put_flat_vec(setting, ["x", "y", "z"], self.center);
        setting::put_flat_vec(setting, ["width", "height", "depth"], self.half_size * 2.0);
        export_common(setting, &self.material, self.rotation);
    }
}
