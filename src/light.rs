use crate::error::ConfigError;
use crate::math::*;
use crate::setting::{self, Params, Setting};
use std::fmt;

// ─── Light Trait ────────────────────────────────────────────────────────────

/// A light source that contributes a diffuse term at each shaded point.
pub trait Light: Send + Sync + fmt::Debug {
    /// Registry name, also used to group lights on export.
    fn type_name(&self) -> &'static str;

    /// Unit vector from `point` towards the light.
    fn direction_to(&self, point: Point3) -> Vec3;

    /// Light reaching `point`, after any attenuation.
    fn color_at(&self, point: Point3) -> Color;

    /// How far a shadow ray from `point` must travel to reach the light.
    /// Lights at infinity report `f64::INFINITY`.
    fn distance_to(&self, _point: Point3) -> f64 {
        f64::INFINITY
    }

    fn clone_light(&self) -> Box<dyn Light>;

    fn export_params(&self, setting: &mut Setting);
}

// ─── Ambient ────────────────────────────────────────────────────────────────

/// Scene-wide constant illumination. Not a [`Light`]: it has no direction and
/// is never shadowed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientLight {
    pub color: Color,
}

impl Default for AmbientLight {
    fn default() -> Self {
        Self::new(Color::splat(0.1))
    }
}

impl AmbientLight {
    pub const fn new(color: Color) -> Self {
        Self { color }
    }

    pub fn export_params(&self, setting: &mut Setting) {
        setting::put_rgb(setting, "ambient", self.color, 1.0);
    }
}

// ─── Directional ────────────────────────────────────────────────────────────

/// A light at infinity shining along `direction`.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionalLight {
    pub direction: Vec3,
    pub color: Color,
}

impl DirectionalLight {
    pub const TYPE_NAME: &'static str = "directional";

    pub fn new(direction: Vec3, color: Color) -> Self {
        Self {
            direction: direction.normalized(),
            color,
        }
    }

    /// Colors in `params` are 0–255.
    pub fn from_params(params: &Params) -> Result<Self, ConfigError> {
        let direction = setting::require_vec(params, Self::TYPE_NAME, ["dx", "dy", "dz"])?;
        let color = setting::require_vec(params, Self::TYPE_NAME, ["r", "g", "b"])? / 255.0;
        Ok(Self::new(direction, color))
    }
}

impl Light for DirectionalLight {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn direction_to(&self, _point: Point3) -> Vec3 {
        -self.direction
    }

    fn color_at(&self, _point: Point3) -> Color {
        self.color
    }

    fn clone_light(&self) -> Box<dyn Light> {
        Box::new(self.clone())
    }

    fn export_params(&self, setting: &mut Setting) {
        setting::put_flat_vec(setting, ["dx", "dy", "dz"], self.direction);
        setting::put_flat_vec(setting, ["r", "g", "b"], self.color * 255.0);
    }
}

// ─── Point ──────────────────────────────────────────────────────────────────

/// An omnidirectional light whose intensity falls off as
/// `1 / (constant + linear·d + quadratic·d²)`.
#[derive(Debug, Clone, PartialEq)]
pub struct PointLight {
    pub position: Point3,
    pub color: Color,
    pub constant: f64,
    pub linear: f64,
    pub quadratic: f64,
}

impl PointLight {
    pub const TYPE_NAME: &'static str = "point";

    pub const DEFAULT_CONSTANT: f64 = 1.0;
    pub const DEFAULT_LINEAR: f64 = 0.09;
    pub const DEFAULT_QUADRATIC: f64 = 0.032;

    pub fn new(position: Point3, color: Color, constant: f64, linear: f64, quadratic: f64) -> Self {
        Self {
            position,
            color,
            constant,
            linear,
            quadratic,
        }
    }

    /// Colors in `params` are 0–255. Attenuation terms are optional.
    pub fn from_params(params: &Params) -> Result<Self, ConfigError> {
        let position = setting::require_vec(params, Self::TYPE_NAME, ["x", "y", "z"])?;
        let color = setting::require_vec(params, Self::TYPE_NAME, ["r", "g", "b"])? / 255.0;
        Ok(Self::new(
            position,
            color,
            setting::optional(params, "constant", Self::DEFAULT_CONSTANT),
            setting::optional(params, "linear", Self::DEFAULT_LINEAR),
            setting::optional(params, "quadratic", Self::DEFAULT_QUADRATIC),
        ))
    }

    pub fn attenuation(&self, distance: f64) -> f64 {
        1.0 / (self.constant + self.linear * distance + self.quadratic * distance * distance)
    }
}

impl Light for PointLight {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn direction_to(&self, point: Point3) -> Vec3 {
        (self.position - point).normalized()
    }

    fn color_at(&self, point: Point3) -> Color {
        self.color * self.attenuation((self.position - point).length())
    }

    fn distance_to(&self, point: Point3) -> f64 {
        (self.position - point).length()
    }

    fn clone_light(&self) -> Box<dyn Light> {
        Box::new(self.clone())
    }

    fn export_params(&self, setting: &mut Setting) {
        setting::put_flat_vec(setting, ["x", "y", "z"], self.position);
        setting::put_flat_vec(setting, ["r", "g", "b"], self.color * 255.0);
        setting::put_f64(setting, "constant", self.constant);
        setting::put_f64(setting, "linear", self.linear);
        setting::put_f64(setting, "quadratic", self.quadratic);
    }
}

// ─── Color Filter Decorator ─────────────────────────────────────────────────

/// Tints any light by multiplying its color channel-wise with `filter`.
/// Direction and distance queries pass through untouched, so decorators can
/// be stacked to any depth.
#[derive(Debug)]
pub struct ColorLightDecorator {
    inner: Box<dyn Light>,
    pub filter: Color,
}

impl ColorLightDecorator {
    pub fn new(inner: Box<dyn Light>, filter: Color) -> Self {
        Self { inner, filter }
    }
}

impl Light for ColorLightDecorator {
    fn type_name(&self) -> &'static str {
        self.inner.type_name()
    }

    fn direction_to(&self, point: Point3) -> Vec3 {
        self.inner.direction_to(point)
    }

    fn color_at(&self, point: Point3) -> Color {
        self.inner.color_at(point).hadamard(self.filter)
    }

    fn distance_to(&self, point: Point3) -> f64 {
        self.inner.distance_to(point)
    }

    fn clone_light(&self) -> Box<dyn Light> {
        Box::new(Self::new(self.inner.clone_light(), self.filter))
    }

    /// Writes the inner light's parameters plus a `filter` group. Nested
    /// filters collapse into their channel-wise product, which is equivalent.
    fn export_params(&self, setting: &mut Setting) {
        self.inner.export_params(setting);
        let filter = setting::get_rgb(setting, "filter", 1.0, 1.0)
            .map_or(self.filter, |inner| inner.hadamard(self.filter));
        setting::put_rgb(setting, "filter", filter, 1.0);
    }
}
