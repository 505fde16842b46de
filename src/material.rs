use crate::error::ConfigError;
use crate::math::{Color, Uv};
use crate::setting::{self, Setting};
use crate::texture::Texture;
use serde_json::Value;
use std::sync::Arc;

/// Surface appearance attached to primitives.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub color: Color,
    pub reflectivity: f64,
    pub transparency: f64,
    /// Replaces `color` wherever the surface is shaded.
    pub texture: Option<Texture>,
}

/// Materials are shared, not copied: a primitive and every clone made from it
/// point at the same allocation.
pub type SharedMaterial = Arc<Material>;

impl Default for Material {
    fn default() -> Self {
        Self::new(Color::ones())
    }
}

impl Material {
    pub const fn new(color: Color) -> Self {
        Self {
            color,
            reflectivity: 0.0,
            transparency: 0.0,
            texture: None,
        }
    }

    pub fn with_texture(mut self, texture: Texture) -> Self {
        self.texture = Some(texture);
        self
    }

    pub fn shared(self) -> SharedMaterial {
        Arc::new(self)
    }

    /// Surface color at `uv`: the texture if there is one, else the flat color.
    pub fn color_at(&self, uv: Uv) -> Color {
        match &self.texture {
            Some(texture) => texture.color_at(uv),
            None => self.color,
        }
    }

    /// Writes a `material` group; the color is stored in 0–255 units.
    pub fn export_params(&self, setting: &mut Setting) {
        let mut group = Setting::new();
        setting::put_rgb(&mut group, "color", self.color, 255.0);
        setting::put_f64(&mut group, "reflectivity", self.reflectivity);
        setting::put_f64(&mut group, "transparency", self.transparency);
        if let Some(texture) = &self.texture {
            texture.export_params(&mut group);
        }
        setting.insert("material".to_owned(), Value::Object(group));
    }

    /// Reads the group written by [`Material::export_params`]. Absent fields
    /// fall back to a white, opaque, non-reflective surface; only a bad
    /// `texture` group is an error.
    pub fn from_setting(group: &Setting) -> Result<Self, ConfigError> {
        Ok(Self {
            color: setting::get_rgb(group, "color", 255.0, 255.0).unwrap_or(Color::ones()),
            reflectivity: setting::get_f64(group, "reflectivity").unwrap_or(0.0),
            transparency: setting::get_f64(group, "transparency").unwrap_or(0.0),
            texture: setting::get_group(group, "texture")
                .map(Texture::from_setting)
                .transpose()?,
        })
    }
}
