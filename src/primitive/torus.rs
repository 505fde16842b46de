use super::{cylindrical_uv, export_common, in_range, solve_quadratic, HitInfo, Primitive};
use crate::error::ConfigError;
use crate::material::SharedMaterial;
use crate::math::*;
use crate::setting::{self, Params, Setting};
use std::f64::consts::PI;

/// Samples taken along the part of a ray inside the bounding sphere when
/// looking for the first sign change of the quartic.
const ROOT_SAMPLES: usize = 256;
const BISECTION_STEPS: usize = 64;

/// A ring of tube radius `minor_radius` swept at `major_radius` around
/// `axis` through `center`.
#[derive(Debug, Clone)]
pub struct Torus {
    pub center: Point3,
    pub axis: Vec3,
    pub major_radius: f64,
    pub minor_radius: f64,
    pub material: SharedMaterial,
    pub rotation: Rotation,
}

impl Torus {
    pub const TYPE_NAME: &'static str = "torus";

    pub fn new(
        center: Point3,
        axis: Vec3,
        major_radius: f64,
        minor_radius: f64,
        material: SharedMaterial,
    ) -> Self {
        Self {
            center,
            axis: axis.normalized(),
            major_radius,
            minor_radius,
            material,
            rotation: Rotation::default(),
        }
    }

    pub fn from_params(params: &Params, material: SharedMaterial) -> Result<Self, ConfigError> {
        let center = setting::require_vec(params, Self::TYPE_NAME, ["x", "y", "z"])?;
        let axis = setting::require_vec(params, Self::TYPE_NAME, ["ax", "ay", "az"])?;
        let major = setting::require(params, Self::TYPE_NAME, "majorRadius")?;
        let minor = setting::require(params, Self::TYPE_NAME, "minorRadius")?;
        Ok(Self::new(center, axis, major, minor, material))
    }

    /// Implicit surface value at `p` relative to the center: negative inside
    /// the tube, positive outside.
    fn implicit(&self, p: Vec3) -> f64 {
        let r2 = self.major_radius * self.major_radius;
        let k = p.length_squared() + r2 - self.minor_radius * self.minor_radius;
        let along = p.dot(self.axis);
        k * k - 4.0 * r2 * (p.length_squared() - along * along)
    }

    fn gradient(&self, p: Vec3) -> Vec3 {
        let r2 = self.major_radius * self.major_radius;
        let k = p.length_squared() + r2 - self.minor_radius * self.minor_radius;
        let radial = p - self.axis * p.dot(self.axis);
        p * (4.0 * k) - radial * (8.0 * r2)
    }

    /// First root of the quartic along `local` in `[t_min, t_max)`.
    ///
    /// The search runs only where the ray is inside a slightly padded
    /// bounding sphere, so it always starts outside the tube unless the
    /// ray origin itself is inside. Grazing hits that touch the surface
    /// without crossing it are not reported.
    fn first_root(&self, local: &Ray, t_min: f64, t_max: f64) -> Option<f64> {
        let o = local.origin - self.center;
        let d = local.direction;
        let bound = (self.major_radius + self.minor_radius) * 1.001 + 1e-9;
        let [enter, exit] = solve_quadratic(d.dot(d), 2.0 * o.dot(d), o.dot(o) - bound * bound)?;
        let start = enter.max(t_min);
        let end = exit.min(t_max);
        if start >= end {
            return None;
        }

        let f = |t: f64| self.implicit(o + d * t);
        let step = (end - start) / ROOT_SAMPLES as f64;
        let mut lo = start;
        let mut f_lo = f(lo);
        for i in 1..=ROOT_SAMPLES {
            let hi = if i == ROOT_SAMPLES { end } else { start + step * i as f64 };
            let f_hi = f(hi);
            if f_lo == 0.0 {
                return in_range(lo, t_min, t_max).then_some(lo);
            }
            if f_lo.signum() != f_hi.signum() {
                let (mut a, mut b) = (lo, hi);
                for _ in 0..BISECTION_STEPS {
                    let mid = 0.5 * (a + b);
                    if f(mid).signum() == f_lo.signum() {
                        a = mid;
                    } else {
                        b = mid;
                    }
                }
                let t = 0.5 * (a + b);
                return in_range(t, t_min, t_max).then_some(t);
            }
            lo = hi;
            f_lo = f_hi;
        }
        None
    }
}

impl Primitive for Torus {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn hit(&self, ray: &Ray, t_min: f64, t_max: f64) -> Option<HitInfo<'_>> {
        let local = self.rotation.to_local(ray);
        let t = self.first_root(&local, t_min, t_max)?;

        let p = local.at(t) - self.center;
        let mut normal = self.gradient(p).normalized();
        if normal.dot(local.direction) > 0.0 {
            normal = -normal;
        }

        // u runs around the ring, v around the tube.
        let ring = cylindrical_uv(p, self.axis);
        let radial = p - self.axis * p.dot(self.axis);
        let tube = p - radial.normalized() * self.major_radius;
        let tube_angle = tube.dot(self.axis).atan2(tube.dot(radial.normalized()));
        Some(HitInfo {
            distance: t,
            hit_point: ray.at(t),
            normal: self.rotation.to_world(normal),
            uv: Uv::new(ring.u, (tube_angle / (2.0 * PI)).rem_euclid(1.0)),
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
        setting::put_flat_vec(setting, ["ax", "ay", "az"], self.axis);
        setting::put_f64(setting, "majorRadius", self.major_radius);
        setting::put_f64(setting, "minorRadius", self.minor_radius);
        export_common(setting, &self.material, self.rotation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Material;
    use rstest::rstest;

    /// Ring of radius 2 around Y with a tube of radius 0.5.
    fn ring() -> Torus {
        Torus::new(Point3::zero(), Vec3::unit_y(), 2.0, 0.5, Material::default().shared())
    }

    #[rstest]
    #[case::outer_equator(Point3::new(-5.0, 0.0, 0.0), Vec3::unit_x(), 2.5, -Vec3::unit_x())]
    #[case::tube_top(Point3::new(-2.0, 5.0, 0.0), -Vec3::unit_y(), 4.5, Vec3::unit_y())]
    #[case::inner_wall(Point3::new(0.0, 0.0, 0.0), Vec3::unit_z(), 1.5, -Vec3::unit_z())]
    fn torus_hits(
        #[case] origin: Point3,
        #[case] direction: Vec3,
        #[case] distance: f64,
        #[case] normal: Vec3,
    ) {
        let torus = ring();
        let hit = torus.hit(&Ray::new(origin, direction), 0.001, f64::INFINITY).unwrap();
        assert!((hit.distance - distance).abs() < 1e-6, "{}", hit.distance);
        assert!(hit.normal.approx_eq(normal, 1e-6), "{}", hit.normal);
    }

    #[rstest]
    #[case::through_the_hole(Point3::new(0.0, 5.0, 0.0), -Vec3::unit_y())]
    #[case::above(Point3::new(-5.0, 1.0, 0.0), Vec3::unit_x())]
    #[case::outside(Point3::new(-5.0, 0.0, 3.0), Vec3::unit_x())]
    fn torus_misses(#[case] origin: Point3, #[case] direction: Vec3) {
        assert!(ring().hit(&Ray::new(origin, direction), 0.001, f64::INFINITY).is_none());
    }

    #[test]
    fn raising_t_min_finds_the_next_wall() {
        let torus = ring();
        let ray = Ray::new(Point3::new(-5.0, 0.0, 0.0), Vec3::unit_x());
        // Walls at x = -2.5, -1.5, 1.5, 2.5.
        let second = torus.hit(&ray, 3.0, f64::INFINITY).unwrap();
        assert!((second.distance - 3.5).abs() < 1e-6);
        let third = torus.hit(&ray, 4.0, f64::INFINITY).unwrap();
        assert!((third.distance - 6.5).abs() < 1e-6);
        assert!(torus.hit(&ray, 0.001, 2.5).is_none());
    }

    #[test]
    fn tilted_axis_is_respected() {
        let torus = Torus::new(Point3::zero(), Vec3::unit_z(), 2.0, 0.5, Material::default().shared());
        // With the ring in the XY plane, a ray down Y now crosses the tube.
        let down = Ray::new(Point3::new(0.0, 5.0, 0.0), -Vec3::unit_y());
        let hit = torus.hit(&down, 0.001, f64::INFINITY).unwrap();
        assert!((hit.distance - 2.5).abs() < 1e-6);
    }
}
