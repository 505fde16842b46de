//! Primitives made of other primitives.

use super::{export_group, HitInfo, Primitive};
use crate::error::ConfigError;
use crate::material::{Material, SharedMaterial};
use crate::math::*;
use crate::setting::{Params, Setting};
use std::fmt;

// ─── Composite ──────────────────────────────────────────────────────────────

/// A group of primitives that moves and rotates as one.
///
/// Hits report the child that was hit, so each child keeps its own
/// material. Transforms are pushed down into the children right away; the
/// composite only remembers the total rotation applied to it.
pub struct Composite {
    pub children: Vec<Box<dyn Primitive>>,
    pub material: SharedMaterial,
    pub rotation: Rotation,
}

impl fmt::Debug for Composite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Composite")
            .field("children", &self.children.len())
            .field("rotation", &self.rotation)
            .finish()
    }
}

impl Composite {
    pub const TYPE_NAME: &'static str = "composite";

    pub fn new(material: SharedMaterial) -> Self {
        Self {
            children: Vec::new(),
            material,
            rotation: Rotation::default(),
        }
    }

    /// Takes no flat parameters; children are added afterwards.
    pub fn from_params(_params: &Params, material: SharedMaterial) -> Result<Self, ConfigError> {
        Ok(Self::new(material))
    }

    pub fn add(&mut self, child: Box<dyn Primitive>) {
        self.children.push(child);
    }
}

impl Default for Composite {
    fn default() -> Self {
        Self::new(Material::default().shared())
    }
}

impl Primitive for Composite {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    /// Nearest child hit; an exact tie keeps the earlier child.
    fn hit(&self, ray: &Ray, t_min: f64, t_max: f64) -> Option<HitInfo<'_>> {
        let mut closest = t_max;
        let mut nearest = None;
        for child in &self.children {
            if let Some(hit) = child.hit(ray, t_min, closest) {
                closest = hit.distance;
                nearest = Some(hit);
            }
        }
        nearest
    }

    fn translate(&mut self, offset: Vec3) {
        for child in &mut self.children {
            child.translate(offset);
        }
    }

    fn rotation(&self) -> Rotation {
        self.rotation
    }

    fn rotation_mut(&mut self) -> &mut Rotation {
        &mut self.rotation
    }

    fn rotate_x(&mut self, degrees: f64) {
        self.rotation.x += degrees;
        for child in &mut self.children {
            child.rotate_x(degrees);
        }
    }

    fn rotate_y(&mut self, degrees: f64) {
        self.rotation.y += degrees;
        for child in &mut self.children {
            child.rotate_y(degrees);
        }
    }

    fn rotate_z(&mut self, degrees: f64) {
        self.rotation.z += degrees;
        for child in &mut self.children {
            child.rotate_z(degrees);
        }
    }

    fn material(&self) -> &SharedMaterial {
        &self.material
    }

    fn clone_primitive(&self) -> Box<dyn Primitive> {
        Box::new(Self {
            children: self.children.iter().map(|c| c.clone_primitive()).collect(),
            material: SharedMaterial::clone(&self.material),
            rotation: self.rotation,
        })
    }

    /// Writes the children as a nested `primitives` group. Rotation is
    /// already part of each child's own entry.
    fn export_params(&self, setting: &mut Setting) {
        setting.insert("primitives".to_owned(), export_group(&self.children));
    }

    fn children_mut(&mut self) -> Option<&mut Vec<Box<dyn Primitive>>> {
        Some(&mut self.children)
    }
}

// ─── Material Decorator ─────────────────────────────────────────────────────

/// Wraps a primitive and replaces its material. Geometry, transforms and
/// the exported type name all come from the wrapped primitive.
#[derive(Debug)]
pub struct MaterialDecorator {
    inner: Box<dyn Primitive>,
    material: SharedMaterial,
}

impl MaterialDecorator {
    pub fn new(inner: Box<dyn Primitive>, material: SharedMaterial) -> Self {
        Self { inner, material }
    }
}

impl Primitive for MaterialDecorator {
    fn type_name(&self) -> &'static str {
        self.inner.type_name()
    }

    /// The hit is re-attributed to the decorator so shading picks up the
    /// replacement material.
    fn hit(&self, ray: &Ray, t_min: f64, t_max: f64) -> Option<HitInfo<'_>> {
        let hit = self.inner.hit(ray, t_min, t_max)?;
        Some(HitInfo {
            primitive: self,
            ..hit
        })
    }

    fn translate(&mut self, offset: Vec3) {
        self.inner.translate(offset);
    }

    fn rotation(&self) -> Rotation {
        self.inner.rotation()
    }

    fn rotation_mut(&mut self) -> &mut Rotation {
        self.inner.rotation_mut()
    }

    fn rotate_x(&mut self, degrees: f64) {
        self.inner.rotate_x(degrees);
    }

    fn rotate_y(&mut self, degrees: f64) {
        self.inner.rotate_y(degrees);
    }

    fn rotate_z(&mut self, degrees: f64) {
        self.inner.rotate_z(degrees);
    }

    fn material(&self) -> &SharedMaterial {
        &self.material
    }

    fn clone_primitive(&self) -> Box<dyn Primitive> {
        Box::new(Self::new(self.inner.clone_primitive(), SharedMaterial::clone(&self.material)))
    }

    fn export_params(&self, setting: &mut Setting) {
        self.inner.export_params(setting);
        self.material.export_params(setting);
    }

    fn children_mut(&mut self) -> Option<&mut Vec<Box<dyn Primitive>>> {
        self.inner.children_mut()
    }
}
