//! Unbounded quadrics: the cylinder and double cone without a height limit.

use super::{cylindrical_uv, export_common, in_range, solve_quadratic, HitInfo, Primitive};
use crate::error::ConfigError;
use crate::material::SharedMaterial;
use crate::math::*;
use crate::setting::{self, Params, Setting};

// ─── Infinite Cylinder ──────────────────────────────────────────────────────

/// Every point at distance `radius` from the line through `center` along `axis`.
#[derive(Debug, Clone)]
pub struct InfiniteCylinder {
    pub center: Point3,
    pub axis: Vec3,
    pub radius: f64,
    pub material: SharedMaterial,
    pub rotation: Rotation,
}

impl InfiniteCylinder {
    pub const TYPE_NAME: &'static str = "infinitecylinder";

    pub fn new(center: Point3, axis: Vec3, radius: f64, material: SharedMaterial) -> Self {
        Self {
            center,
            axis: axis.normalized(),
            radius,
            material,
            rotation: Rotation::default(),
        }
    }

    pub fn from_params(params: &Params, material: SharedMaterial) -> Result<Self, ConfigError> {
        let center = setting::require_vec(params, Self::TYPE_NAME, ["x", "y", "z"])?;
        let axis = setting::require_vec(params, Self::TYPE_NAME, ["ax", "ay", "az"])?;
        let radius = setting::require(params, Self::TYPE_NAME, "radius")?;
        Ok(Self::new(center, axis, radius, material))
    }
}

impl Primitive for InfiniteCylinder {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn hit(&self, ray: &Ray, t_min: f64, t_max: f64) -> Option<HitInfo<'_>> {
        let local = self.rotation.to_local(ray);
        let d = local.direction;
        let oc = local.origin - self.center;
        let d_axis = d.dot(self.axis);
        let oc_axis = oc.dot(self.axis);

        let a = d.dot(d) - d_axis * d_axis;
        if a.abs() <= 1e-12 * d.length_squared() {
            return None;
        }
        let b = 2.0 * (oc.dot(d) - oc_axis * d_axis);
        let c = oc.dot(oc) - oc_axis * oc_axis - self.radius * self.radius;

        let t = solve_quadratic(a, b, c)?
            .into_iter()
            .find(|&t| in_range(t, t_min, t_max))?;

        let offset = local.at(t) - self.center;
        let mut normal = (offset - self.axis * offset.dot(self.axis)).normalized();
        if normal.dot(d) > 0.0 {
            normal = -normal;
        }
        Some(HitInfo {
            distance: t,
            hit_point: ray.at(t),
            normal: self.rotation.to_world(normal),
            uv: cylindrical_uv(offset, self.axis),
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
        setting::put_f64(setting, "radius", self.radius);
        export_common(setting, &self.material, self.rotation);
    }
}

// ─── Infinite Cone ──────────────────────────────────────────────────────────

/// Both nappes of the cone with its tip at `apex` and half-angle `angle`
/// (degrees) around `axis`.
#[derive(Debug, Clone)]
pub struct InfiniteCone {
    pub apex: Point3,
    pub axis: Vec3,
    pub angle: f64,
    pub material: SharedMaterial,
    pub rotation: Rotation,
}

impl InfiniteCone {
    pub const TYPE_NAME: &'static str = "infinitecone";

    pub fn new(apex: Point3, axis: Vec3, angle: f64, material: SharedMaterial) -> Self {
        Self {
            apex,
            axis: axis.normalized(),
            angle,
            material,
            rotation: Rotation::default(),
        }
    }

    pub fn from_params(params: &Params, material: SharedMaterial) -> Result<Self, ConfigError> {
        let apex = setting::require_vec(params, Self::TYPE_NAME, ["x", "y", "z"])?;
        let axis = setting::require_vec(params, Self::TYPE_NAME, ["ax", "ay", "az"])?;
        let angle = setting::require(params, Self::TYPE_NAME, "angle")?;
        Ok(Self::new(apex, axis, angle, material))
    }
}

impl Primitive for InfiniteCone {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn hit(&self, ray: &Ray, t_min: f64, t_max: f64) -> Option<HitInfo<'_>> {
        let local = self.rotation.to_local(ray);
        let d = local.direction;
        let co = local.origin - self.apex;
        let cos2 = self.angle.to_radians().cos().powi(2);
        let d_axis = d.dot(self.axis);
        let co_axis = co.dot(self.axis);

        let a = d_axis * d_axis - cos2 * d.dot(d);
        let b = 2.0 * (d_axis * co_axis - cos2 * co.dot(d));
        let c = co_axis * co_axis - cos2 * co.dot(co);

        let t = if a.abs() <= 1e-12 * d.length_squared() {
            if b.abs() <= 1e-12 {
                return None;
            }
            Some(-c / b).filter(|&t| in_range(t, t_min, t_max))?
        } else {
            solve_quadratic(a, b, c)?
                .into_iter()
                .find(|&t| in_range(t, t_min, t_max))?
        };

        let offset = local.at(t) - self.apex;
        // Gradient of the implicit surface, negated to point away from the axis.
        let mut normal = (offset * cos2 - self.axis * offset.dot(self.axis)).normalized();
        if normal.dot(d) > 0.0 {
            normal = -normal;
        }
        Some(HitInfo {
            distance: t,
            hit_point: ray.at(t),
            normal: self.rotation.to_world(normal),
            uv: cylindrical_uv(offset, self.axis),
            primitive: self,
        })
    }

    fn translate(&mut self, offset: Vec3) {
        self.apex += offset;
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
        setting::put_flat_vec(setting, ["x", "y", "z"], self.apex);
        setting::put_flat_vec(setting, ["ax", "ay", "az"], self.axis);
        setting::put_f64(setting, "angle", self.angle);
        export_common(setting, &self.material, self.rotation);
    }
}
