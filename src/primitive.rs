use crate::error::ConfigError;
use crate::material::SharedMaterial;
use crate::math::*;
use crate::setting::{self, Params, Setting};
use serde_json::Value;
use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::fmt;

mod composite;
mod cuboid;
mod infinite;
mod torus;
mod triangle;

pub use composite::{Composite, MaterialDecorator};
pub use cuboid::Cuboid;
pub use infinite::{InfiniteCone, InfiniteCylinder};
pub use torus::Torus;
pub use triangle::Triangle;

// ─── Hit Info ───────────────────────────────────────────────────────────────

/// Result of a successful ray/surface intersection.
///
/// `primitive` is a plain borrow of the surface that was hit, so a `HitInfo`
/// can never outlive the scene it came from.
#[derive(Debug, Clone, Copy)]
pub struct HitInfo<'a> {
    pub distance: f64,
    pub hit_point: Point3,
    pub normal: Vec3,
    /// Surface coordinates for texture lookup.
    pub uv: Uv,
    pub primitive: &'a dyn Primitive,
}

// ─── Primitive Trait ────────────────────────────────────────────────────────

/// A renderable surface.
///
/// `hit` must return the nearest root `t` with `t_min <= t < t_max`. The upper
/// bound is exclusive so that, while the scene narrows `t_max` to the closest
/// hit found so far, a later surface at exactly the same distance cannot
/// displace an earlier one.
pub trait Primitive: Send + Sync + fmt::Debug {
    /// Registry name, also used to group primitives on export.
    fn type_name(&self) -> &'static str;

    fn hit(&self, ray: &Ray, t_min: f64, t_max: f64) -> Option<HitInfo<'_>>;

    fn translate(&mut self, offset: Vec3);

    fn rotation(&self) -> Rotation;

    fn rotation_mut(&mut self) -> &mut Rotation;

    /// Rotations accumulate: two calls of 45° equal one call of 90°.
    fn rotate_x(&mut self, degrees: f64) {
        self.rotation_mut().x += degrees;
    }

    fn rotate_y(&mut self, degrees: f64) {
        self.rotation_mut().y += degrees;
    }

    fn rotate_z(&mut self, degrees: f64) {
        self.rotation_mut().z += degrees;
    }

    fn material(&self) -> &SharedMaterial;

    /// Copies the geometry; the clone shares this primitive's material.
    fn clone_primitive(&self) -> Box<dyn Primitive>;

    fn export_params(&self, setting: &mut Setting);

    /// Child list of a container primitive, so loaders can fill one that
    /// came out of the registry empty.
    fn children_mut(&mut self) -> Option<&mut Vec<Box<dyn Primitive>>> {
        None
    }
}

#[inline(always)]
fn in_range(t: f64, t_min: f64, t_max: f64) -> bool {
    t >= t_min && t < t_max
}

/// Real roots of `a·t² + b·t + c`, smaller first.
fn solve_quadratic(a: f64, b: f64, c: f64) -> Option<[f64; 2]> {
    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return None;
    }
    let sqrtd = discriminant.sqrt();
    let t1 = (-b - sqrtd) / (2.0 * a);
    let t2 = (-b + sqrtd) / (2.0 * a);
    Some(if t1 <= t2 { [t1, t2] } else { [t2, t1] })
}

/// Picks the first root that is in range and whose projection onto `axis`
/// (measured from `base`) lies in `[0, height]`. Returns the root and the
/// local hit point.
fn first_root_within_height(
    local: &Ray,
    roots: [f64; 2],
    t_min: f64,
    t_max: f64,
    base: Point3,
    axis: Vec3,
    height: f64,
) -> Option<(f64, Point3)> {
    roots.into_iter().find_map(|t| {
        if !in_range(t, t_min, t_max) {
            return None;
        }
        let point = local.at(t);
        let h = (point - base).dot(axis);
        (0.0..=height).contains(&h).then_some((t, point))
    })
}

/// Angle around `axis` (wrapped into `[0, 1)`) and height along it for a
/// point at `offset` from the axis origin.
fn cylindrical_uv(offset: Vec3, axis: Vec3) -> Uv {
    let (tangent, bitangent) = axis.tangent_frame();
    let angle = offset.dot(bitangent).atan2(offset.dot(tangent));
    Uv::new((angle / (2.0 * PI)).rem_euclid(1.0), offset.dot(axis))
}

fn export_common(setting: &mut Setting, material: &SharedMaterial, rotation: Rotation) {
    if !rotation.is_identity() {
        setting::put_xyz(setting, "rotation", Vec3::new(rotation.x, rotation.y, rotation.z));
    }
    material.export_params(setting);
}

/// Applies the `rotation` group written by [`export_common`], if any.
pub fn apply_rotation_setting(primitive: &mut dyn Primitive, entry: &Setting) {
    if let Some(r) = setting::get_xyz(entry, "rotation") {
        primitive.rotate_x(r.x);
        primitive.rotate_y(r.y);
        primitive.rotate_z(r.z);
    }
}

// ─── Sphere ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Sphere {
    pub center: Point3,
    pub radius: f64,
    pub material: SharedMaterial,
    pub rotation: Rotation,
}

impl Sphere {
    pub const TYPE_NAME: &'static str = "sphere";

    pub fn new(center: Point3, radius: f64, material: SharedMaterial) -> Self {
        Self {
            center,
            radius,
            material,
            rotation: Rotation::default(),
        }
    }

    pub fn from_params(params: &Params, material: SharedMaterial) -> Result<Self, ConfigError> {
        let center = setting::require_vec(params, Self::TYPE_NAME, ["x", "y", "z"])?;
        let radius = setting::require(params, Self::TYPE_NAME, "radius")?;
        Ok(Self::new(center, radius, material))
    }
}

impl Primitive for Sphere {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn hit(&self, ray: &Ray, t_min: f64, t_max: f64) -> Option<HitInfo<'_>> {
        let local = self.rotation.to_local(ray);
        let oc = local.origin - self.center;
        let a = local.direction.dot(local.direction);
        let b = 2.0 * oc.dot(local.direction);
        let c = oc.dot(oc) - self.radius * self.radius;

        let t = solve_quadratic(a, b, c)?
            .into_iter()
            .find(|&t| in_range(t, t_min, t_max))?;

        let outward_normal = (local.at(t) - self.center) / self.radius;
        let u = 0.5 + outward_normal.z.atan2(outward_normal.x) / (2.0 * PI);
        let v = 0.5 - outward_normal.y.clamp(-1.0, 1.0).asin() / PI;
        Some(HitInfo {
            distance: t,
            hit_point: ray.at(t),
            normal: self.rotation.to_world(outward_normal),
            uv: Uv::new(u, v),
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
        setting::put_f64(setting, "radius", self.radius);
        export_common(setting, &self.material, self.rotation);
    }
}

// ─── Infinite Plane ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Plane {
    pub point: Point3,
    pub normal: Vec3,
    pub material: SharedMaterial,
    pub rotation: Rotation,
}

impl Plane {
    pub const TYPE_NAME: &'static str = "plane";

    pub fn new(point: Point3, normal: Vec3, material: SharedMaterial) -> Self {
        Self {
            point,
            normal: normal.normalized(),
            material,
            rotation: Rotation::default(),
        }
    }

    pub fn from_params(params: &Params, material: SharedMaterial) -> Result<Self, ConfigError> {
        let point = setting::require_vec(params, Self::TYPE_NAME, ["x", "y", "z"])?;
        let normal = setting::require_vec(params, Self::TYPE_NAME, ["nx", "ny", "nz"])?;
        Ok(Self::new(point, normal, material))
    }
}

impl Primitive for Plane {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn hit(&self, ray: &Ray, t_min: f64, t_max: f64) -> Option<HitInfo<'_>> {
        let local = self.rotation.to_local(ray);
        let denom = self.normal.dot(local.direction);
        if denom.abs() < 1e-8 {
            return None;
        }
        let t = (self.point - local.origin).dot(self.normal) / denom;
        if !in_range(t, t_min, t_max) {
            return None;
        }
        let facing = if denom < 0.0 { self.normal } else { -self.normal };
        let (tangent, bitangent) = self.normal.tangent_frame();
        let offset = local.at(t) - self.point;
        Some(HitInfo {
            distance: t,
            hit_point: ray.at(t),
            normal: self.rotation.to_world(facing),
            uv: Uv::new(offset.dot(tangent), offset.dot(bitangent)),
            primitive: self,
        })
    }

    fn translate(&mut self, offset: Vec3) {
        self.point += offset;
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
        setting::put_flat_vec(setting, ["x", "y", "z"], self.point);
        setting::put_flat_vec(setting, ["nx", "ny", "nz"], self.normal);
        export_common(setting, &self.material, self.rotation);
    }
}

// ─── Finite Cylinder ────────────────────────────────────────────────────────

/// An open cylinder: the lateral surface from `center` to `center + axis·height`.
/// No cap disks are rendered.
#[derive(Debug, Clone)]
pub struct Cylinder {
    pub center: Point3,
    pub axis: Vec3,
    pub radius: f64,
    pub height: f64,
    pub material: SharedMaterial,
    pub rotation: Rotation,
}

impl Cylinder {
    pub const TYPE_NAME: &'static str = "cylinder";

    pub fn new(
        center: Point3,
        axis: Vec3,
        radius: f64,
        height: f64,
        material: SharedMaterial,
    ) -> Self {
        Self {
            center,
            axis: axis.normalized(),
            radius,
            height,
            material,
            rotation: Rotation::default(),
        }
    }

    pub fn from_params(params: &Params, material: SharedMaterial) -> Result<Self, ConfigError> {
        let center = setting::require_vec(params, Self::TYPE_NAME, ["x", "y", "z"])?;
        let axis = setting::require_vec(params, Self::TYPE_NAME, ["ax", "ay", "az"])?;
        let radius = setting::require(params, Self::TYPE_NAME, "radius")?;
        let height = setting::require(params, Self::TYPE_NAME, "height")?;
        Ok(Self::new(center, axis, radius, height, material))
    }
}

impl Primitive for Cylinder {
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
        // A ray parallel to the axis runs along the lateral surface or misses it
        // entirely; with no caps there is nothing to hit.
        if a.abs() <= 1e-12 * d.length_squared() {
            return None;
        }
        let b = 2.0 * (oc.dot(d) - oc_axis * d_axis);
        let c = oc.dot(oc) - oc_axis * oc_axis - self.radius * self.radius;

        let roots = solve_quadratic(a, b, c)?;
        let (t, point) = first_root_within_height(
            &local,
            roots,
            t_min,
            t_max,
            self.center,
            self.axis,
            self.height,
        )?;

        let axis_point = self.center + self.axis * (point - self.center).dot(self.axis);
        let mut normal = (point - axis_point).normalized();
        if normal.dot(d) > 0.0 {
            normal = -normal;
        }
        let uv = cylindrical_uv(point - self.center, self.axis);
        Some(HitInfo {
            distance: t,
            hit_point: ray.at(t),
            normal: self.rotation.to_world(normal),
            uv: Uv::new(uv.u, uv.v / self.height),
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
        setting::put_f64(setting, "height", self.height);
        export_common(setting, &self.material, self.rotation);
    }
}

// ─── Finite Cone ────────────────────────────────────────────────────────────

/// A single-nappe cone with its tip at `apex`, opening along `axis` until it
/// reaches `radius` at distance `height`. Open at the base.
#[derive(Debug, Clone)]
pub struct Cone {
    pub apex: Point3,
    pub axis: Vec3,
    pub radius: f64,
    pub height: f64,
    pub material: SharedMaterial,
    pub rotation: Rotation,
}

impl Cone {
    pub const TYPE_NAME: &'static str = "cone";

    pub fn new(apex: Point3, axis: Vec3, radius: f64, height: f64, material: SharedMaterial) -> Self {
        Self {
            apex,
            axis: axis.normalized(),
            radius,
            height,
            material,
            rotation: Rotation::default(),
        }
    }

    pub fn from_params(params: &Params, material: SharedMaterial) -> Result<Self, ConfigError> {
        let apex = setting::require_vec(params, Self::TYPE_NAME, ["x", "y", "z"])?;
        let axis = setting::require_vec(params, Self::TYPE_NAME, ["ax", "ay", "az"])?;
        let radius = setting::require(params, Self::TYPE_NAME, "radius")?;
        let height = setting::require(params, Self::TYPE_NAME, "height")?;
        Ok(Self::new(apex, axis, radius, height, material))
    }

    /// (cos θ, sin θ) of the half-angle at the apex.
    fn half_angle(&self) -> (f64, f64) {
        let slant = self.height.hypot(self.radius);
        (self.height / slant, self.radius / slant)
    }
}

impl Primitive for Cone {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn hit(&self, ray: &Ray, t_min: f64, t_max: f64) -> Option<HitInfo<'_>> {
        let local = self.rotation.to_local(ray);
        let d = local.direction;
        let co = local.origin - self.apex;
        let (cos, sin) = self.half_angle();
        let cos2 = cos * cos;
        let d_axis = d.dot(self.axis);
        let co_axis = co.dot(self.axis);

        let a = d_axis * d_axis - cos2 * d.dot(d);
        let b = 2.0 * (d_axis * co_axis - cos2 * co.dot(d));
        let c = co_axis * co_axis - cos2 * co.dot(co);

        // A ray parallel to the slant of the cone crosses it at most once.
        let roots = if a.abs() <= 1e-12 * d.length_squared() {
            if b.abs() <= 1e-12 {
                return None;
            }
            let t = -c / b;
            [t, t]
        } else {
            solve_quadratic(a, b, c)?
        };
        let (t, point) = first_root_within_height(
            &local,
            roots,
            t_min,
            t_max,
            self.apex,
            self.axis,
            self.height,
        )?;

        let axis_point = self.apex + self.axis * (point - self.apex).dot(self.axis);
        let radial = (point - axis_point).normalized();
        let mut normal = (radial * cos - self.axis * sin).normalized();
        if normal.dot(d) > 0.0 {
            normal = -normal;
        }
        let uv = cylindrical_uv(point - self.apex, self.axis);
        Some(HitInfo {
            distance: t,
            hit_point: ray.at(t),
            normal: self.rotation.to_world(normal),
            uv: Uv::new(uv.u, uv.v / self.height),
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
        setting::put_f64(setting, "radius", self.radius);
        setting::put_f64(setting, "height", self.height);
        export_common(setting, &self.material, self.rotation);
    }
}

/// Exports `primitive` as a standalone group, as stored in a scene file list.
pub fn export_to_value(primitive: &dyn Primitive) -> Value {
    let mut setting = Setting::new();
    primitive.export_params(&mut setting);
    Value::Object(setting)
}

/// Key of the list that holds primitives of `type_name` in a scene file,
/// e.g. `spheres` or `boxes`.
pub fn group_key(type_name: &str) -> String {
    if type_name.ends_with('s') || type_name.ends_with('x') {
        format!("{type_name}es")
    } else {
        format!("{type_name}s")
    }
}

/// Type names a group key may stand for, most specific first: the key
/// itself, then the key with its plural ending removed.
pub fn group_candidates(key: &str) -> Vec<&str> {
    let mut candidates = vec![key];
    if let Some(stem) = key.strip_suffix("es") {
        candidates.push(stem);
    }
    if let Some(stem) = key.strip_suffix('s') {
        candidates.push(stem);
    }
    candidates
}

/// Writes `primitives` as a group of per-type lists, the layout of a scene
/// file's `primitives` section.
pub fn export_group(primitives: &[Box<dyn Primitive>]) -> Value {
    let mut by_type: BTreeMap<String, Vec<Value>> = BTreeMap::new();
    for p in primitives {
        by_type
            .entry(group_key(p.type_name()))
            .or_default()
            .push(export_to_value(p.as_ref()));
    }
    Value::Object(
        by_type
            .into_iter()
            .map(|(key, list)| (key, Value::Array(list)))
            .collect(),
    )
}
