//! Name-keyed constructors for every scene entity family.
//!
//! A [`Registry`] is built once at startup and handed to whatever needs to
//! create entities by name, usually the scene loader. Extra types can be
//! registered next to the built-ins without touching anything else.

use crate::error::{ConfigError, Family};
use crate::light::{DirectionalLight, Light, PointLight};
use crate::material::SharedMaterial;
use crate::postprocess::*;
use crate::primitive::{
    Composite, Cone, Cuboid, Cylinder, InfiniteCone, InfiniteCylinder, Plane, Primitive, Sphere, Torus,
    Triangle,
};
use crate::setting::Params;
use crate::shader::*;
use std::collections::HashMap;
use std::fmt;

pub type PrimitiveCtor =
    Box<dyn Fn(&Params, SharedMaterial) -> Result<Box<dyn Primitive>, ConfigError> + Send + Sync>;
pub type LightCtor = Box<dyn Fn(&Params) -> Result<Box<dyn Light>, ConfigError> + Send + Sync>;
/// Shader constructors also receive the shader they should wrap, if any.
pub type ShaderCtor = Box<
    dyn Fn(&Params, Option<Box<dyn Shader>>) -> Result<Box<dyn Shader>, ConfigError> + Send + Sync,
>;
pub type PostProcessCtor =
    Box<dyn Fn(&Params) -> Result<Box<dyn PostProcess>, ConfigError> + Send + Sync>;

#[derive(Default)]
pub struct Registry {
    primitives: HashMap<String, PrimitiveCtor>,
    lights: HashMap<String, LightCtor>,
    shaders: HashMap<String, ShaderCtor>,
    post_processes: HashMap<String, PostProcessCtor>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("primitives", &self.primitive_names())
            .field("lights", &self.light_names())
            .field("shaders", &self.shader_names())
            .field("post_processes", &self.post_process_names())
            .finish()
    }
}

fn sorted_keys<V>(map: &HashMap<String, V>) -> Vec<String> {
    let mut names: Vec<String> = map.keys().cloned().collect();
    names.sort();
    names
}

fn unknown(family: Family, name: &str) -> ConfigError {
    ConfigError::UnknownType {
        family,
        name: name.to_owned(),
    }
}

impl Registry {
    /// An empty registry. Most callers want [`Registry::with_builtins`].
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with every entity type this crate ships.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();

        registry.register_primitive(Sphere::TYPE_NAME, |p, m| Ok(Box::new(Sphere::from_params(p, m)?)));
        registry.register_primitive(Plane::TYPE_NAME, |p, m| Ok(Box::new(Plane::from_params(p, m)?)));
        registry.register_primitive(Cylinder::TYPE_NAME, |p, m| {
            Ok(Box::new(Cylinder::from_params(p, m)?))
        });
        registry.register_primitive(Cone::TYPE_NAME, |p, m| Ok(Box::new(Cone::from_params(p, m)?)));
        registry.register_primitive(Cuboid::TYPE_NAME, |p, m| Ok(Box::new(Cuboid::from_params(p, m)?)));
        registry.register_primitive(Triangle::TYPE_NAME, |p, m| {
            Ok(Box::new(Triangle::from_params(p, m)?))
        });
        registry.register_primitive(Torus::TYPE_NAME, |p, m| Ok(Box::new(Torus::from_params(p, m)?)));
        registry.register_primitive(InfiniteCylinder::TYPE_NAME, |p, m| {
            Ok(Box::new(InfiniteCylinder::from_params(p, m)?))
        });
        registry.register_primitive(InfiniteCone::TYPE_NAME, |p, m| {
            Ok(Box::new(InfiniteCone::from_params(p, m)?))
        });
        registry.register_primitive(Composite::TYPE_NAME, |p, m| {
            Ok(Box::new(Composite::from_params(p, m)?))
        });

        registry.register_light(PointLight::TYPE_NAME, |p| Ok(Box::new(PointLight::from_params(p)?)));
        registry.register_light(DirectionalLight::TYPE_NAME, |p| {
            Ok(Box::new(DirectionalLight::from_params(p)?))
        });

        registry.register_shader(BasicShader::TYPE_NAME, |_, _| Ok(Box::new(BasicShader)));
        registry.register_shader(PhongShader::TYPE_NAME, |p, _| Ok(Box::new(PhongShader::from_params(p))));
        registry.register_shader(ToonShader::TYPE_NAME, |p, _| Ok(Box::new(ToonShader::from_params(p))));
        registry.register_shader(FresnelShader::TYPE_NAME, |p, _| {
            Ok(Box::new(FresnelShader::from_params(p)))
        });
        registry.register_shader(ShaderDecorator::TYPE_NAME, |_, base| {
            Ok(Box::new(ShaderDecorator::new(
                base.unwrap_or_else(|| Box::new(BasicShader)),
            )))
        });
        registry.register_shader(FresnelDecorator::TYPE_NAME, |p, base| {
            Ok(Box::new(FresnelDecorator::from_params(p, base)))
        });

        registry.register_post_process(Blur::TYPE_NAME, |p| Ok(Box::new(Blur::from_params(p)?)));
        registry.register_post_process(Grayscale::TYPE_NAME, |p| Ok(Box::new(Grayscale::from_params(p)?)));
        registry.register_post_process(Negative::TYPE_NAME, |p| Ok(Box::new(Negative::from_params(p)?)));
        registry.register_post_process(ChromaticAberration::TYPE_NAME, |p| {
            Ok(Box::new(ChromaticAberration::from_params(p)?))
        });
        registry.register_post_process(Supersampling::TYPE_NAME, |p| {
            Ok(Box::new(Supersampling::from_params(p)?))
        });

        registry
    }

    // ── Registration ──

    /// Registers (or replaces) a primitive constructor.
    pub fn register_primitive<F>(&mut self, name: &str, ctor: F)
    where
        F: Fn(&Params, SharedMaterial) -> Result<Box<dyn Primitive>, ConfigError> + Send + Sync + 'static,
    {
        if self.primitives.insert(name.to_owned(), Box::new(ctor)).is_some() {
            log::debug!("primitive type '{name}' re-registered");
        }
    }

    pub fn register_light<F>(&mut self, name: &str, ctor: F)
    where
        F: Fn(&Params) -> Result<Box<dyn Light>, ConfigError> + Send + Sync + 'static,
    {
        if self.lights.insert(name.to_owned(), Box::new(ctor)).is_some() {
            log::debug!("light type '{name}' re-registered");
        }
    }

    pub fn register_shader<F>(&mut self, name: &str, ctor: F)
    where
        F: Fn(&Params, Option<Box<dyn Shader>>) -> Result<Box<dyn Shader>, ConfigError>
            + Send
            + Sync
            + 'static,
    {
        if self.shaders.insert(name.to_owned(), Box::new(ctor)).is_some() {
            log::debug!("shader type '{name}' re-registered");
        }
    }

    pub fn register_post_process<F>(&mut self, name: &str, ctor: F)
    where
        F: Fn(&Params) -> Result<Box<dyn PostProcess>, ConfigError> + Send + Sync + 'static,
    {
        if self.post_processes.insert(name.to_owned(), Box::new(ctor)).is_some() {
            log::debug!("post-process type '{name}' re-registered");
        }
    }

    // ── Construction ──

    pub fn create_primitive(
        &self,
        name: &str,
        params: &Params,
        material: SharedMaterial,
    ) -> Result<Box<dyn Primitive>, ConfigError> {
        let ctor = self
            .primitives
            .get(name)
            .ok_or_else(|| unknown(Family::Primitive, name))?;
        ctor(params, material)
    }

    pub fn create_light(&self, name: &str, params: &Params) -> Result<Box<dyn Light>, ConfigError> {
        let ctor = self.lights.get(name).ok_or_else(|| unknown(Family::Light, name))?;
        ctor(params)
    }

    pub fn create_shader(
        &self,
        name: &str,
        params: &Params,
        base: Option<Box<dyn Shader>>,
    ) -> Result<Box<dyn Shader>, ConfigError> {
        let ctor = self.shaders.get(name).ok_or_else(|| unknown(Family::Shader, name))?;
        ctor(params, base)
    }

    pub fn create_post_process(
        &self,
        name: &str,
        params: &Params,
    ) -> Result<Box<dyn PostProcess>, ConfigError> {
        let ctor = self
            .post_processes
            .get(name)
            .ok_or_else(|| unknown(Family::PostProcess, name))?;
        ctor(params)
    }

    // ── Introspection ──

    pub fn has_primitive(&self, name: &str) -> bool {
        self.primitives.contains_key(name)
    }

    pub fn primitive_names(&self) -> Vec<String> {
        sorted_keys(&self.primitives)
    }

    pub fn light_names(&self) -> Vec<String> {
        sorted_keys(&self.lights)
    }

    pub fn shader_names(&self) -> Vec<String> {
        sorted_keys(&self.shaders)
    }

    pub fn post_process_names(&self) -> Vec<String> {
        sorted_keys(&self.post_processes)
    }
}
