use crate::math::*;
use crate::primitive::HitInfo;
use crate::setting::{self, Params, Setting};
use serde_json::Value;
use std::fmt;

// ─── Shader Trait ───────────────────────────────────────────────────────────

/// A post-intersection color transform.
///
/// Shaders see only the locally lit color plus the hit geometry and the
/// incoming ray; they never query the scene. A scene runs its shaders as a
/// chain, each one receiving the previous one's output.
pub trait Shader: Send + Sync + fmt::Debug {
    fn apply(&self, color: Color, hit: &HitInfo<'_>, ray: &Ray) -> Color;

    /// Registry name. Decorators report the chain they wrap, e.g.
    /// `fresnel-decorator(phong)`.
    fn type_name(&self) -> String;

    fn clone_shader(&self) -> Box<dyn Shader>;

    /// Writes `type` and this shader's parameters.
    fn export_params(&self, setting: &mut Setting);
}

/// Unit vector from the hit point back to the ray origin.
fn view_dir(hit: &HitInfo<'_>, ray: &Ray) -> Vec3 {
    (ray.origin - hit.hit_point).normalized()
}

/// `(1 - |n·v|)^power`: 0 when facing the viewer, 1 at grazing angles.
fn fresnel_factor(hit: &HitInfo<'_>, ray: &Ray, power: f64) -> f64 {
    (1.0 - hit.normal.dot(view_dir(hit, ray)).abs()).powf(power)
}

fn rim_color_from(params: &Params) -> Color {
    Color::new(
        setting::optional(params, "r", 1.0),
        setting::optional(params, "g", 1.0),
        setting::optional(params, "b", 1.0),
    )
}

// ─── Basic ──────────────────────────────────────────────────────────────────

/// Identity shader.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicShader;

impl BasicShader {
    pub const TYPE_NAME: &'static str = "basic";
}

impl Shader for BasicShader {
    fn apply(&self, color: Color, _hit: &HitInfo<'_>, _ray: &Ray) -> Color {
        color
    }

    fn type_name(&self) -> String {
        Self::TYPE_NAME.to_owned()
    }

    fn clone_shader(&self) -> Box<dyn Shader> {
        Box::new(*self)
    }

    fn export_params(&self, setting: &mut Setting) {
        setting::put_str(setting, "type", Self::TYPE_NAME);
    }
}

// ─── Phong ──────────────────────────────────────────────────────────────────

/// Adds a white specular highlight around the mirror direction of the view ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhongShader {
    pub specular_strength: f64,
    pub shininess: f64,
}

impl Default for PhongShader {
    fn default() -> Self {
        Self {
            specular_strength: 0.5,
            shininess: 32.0,
        }
    }
}

impl PhongShader {
    pub const TYPE_NAME: &'static str = "phong";

    pub fn from_params(params: &Params) -> Self {
        let default = Self::default();
        Self {
            specular_strength: setting::optional(params, "specularStrength", default.specular_strength),
            shininess: setting::optional(params, "shininess", default.shininess),
        }
    }
}

impl Shader for PhongShader {
    fn apply(&self, color: Color, hit: &HitInfo<'_>, ray: &Ray) -> Color {
        let view = view_dir(hit, ray);
        let reflected = (-view).reflect(hit.normal);
        let specular = reflected.dot(view).max(0.0).powf(self.shininess);
        (color + Color::ones() * self.specular_strength * specular).saturate()
    }

    fn type_name(&self) -> String {
        Self::TYPE_NAME.to_owned()
    }

    fn clone_shader(&self) -> Box<dyn Shader> {
        Box::new(*self)
    }

    fn export_params(&self, setting: &mut Setting) {
        setting::put_str(setting, "type", Self::TYPE_NAME);
        setting::put_f64(setting, "specularStrength", self.specular_strength);
        setting::put_f64(setting, "shininess", self.shininess);
    }
}

// ─── Toon ───────────────────────────────────────────────────────────────────

/// Quantizes each channel into `levels` flat bands and paints silhouettes
/// (surfaces seen nearly edge-on) black.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToonShader {
    pub levels: u32,
    pub edge_threshold: f64,
}

impl Default for ToonShader {
    fn default() -> Self {
        Self {
            levels: 4,
            edge_threshold: 0.2,
        }
    }
}

impl ToonShader {
    pub const TYPE_NAME: &'static str = "toon";

    pub fn new(levels: u32, edge_threshold: f64) -> Self {
        Self {
            levels: levels.max(1),
            edge_threshold,
        }
    }

    pub fn from_params(params: &Params) -> Self {
        let default = Self::default();
        let levels = setting::optional(params, "levels", f64::from(default.levels));
        Self::new(
            levels.max(1.0) as u32,
            setting::optional(params, "edgeThreshold", default.edge_threshold),
        )
    }
}

impl Shader for ToonShader {
    fn apply(&self, color: Color, hit: &HitInfo<'_>, ray: &Ray) -> Color {
        let edge = hit.normal.dot(view_dir(hit, ray)).abs();
        if edge < self.edge_threshold {
            return Color::zero();
        }
        let step = 1.0 / f64::from(self.levels);
        let band = |c: f64| (c / step).floor() * step;
        Color::new(band(color.x), band(color.y), band(color.z))
    }

    fn type_name(&self) -> String {
        Self::TYPE_NAME.to_owned()
    }

    fn clone_shader(&self) -> Box<dyn Shader> {
        Box::new(*self)
    }

    fn export_params(&self, setting: &mut Setting) {
        setting::put_str(setting, "type", Self::TYPE_NAME);
        setting::put_f64(setting, "levels", f64::from(self.levels));
        setting::put_f64(setting, "edgeThreshold", self.edge_threshold);
    }
}

// ─── Fresnel ────────────────────────────────────────────────────────────────

/// Blends towards `rim_color` as the surface turns away from the viewer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FresnelShader {
    pub power: f64,
    pub rim_color: Color,
}

impl Default for FresnelShader {
    fn default() -> Self {
        Self {
            power: 2.0,
            rim_color: Color::ones(),
        }
    }
}

impl FresnelShader {
    pub const TYPE_NAME: &'static str = "fresnel";

    /// Rim color channels `r g b` are in 0–1.
    pub fn from_params(params: &Params) -> Self {
        Self {
            power: setting::optional(params, "fresnelPower", Self::default().power),
            rim_color: rim_color_from(params),
        }
    }

    fn blend(&self, color: Color, hit: &HitInfo<'_>, ray: &Ray) -> Color {
        let f = fresnel_factor(hit, ray, self.power);
        color.lerp(self.rim_color, f).saturate()
    }

    fn export_fields(&self, setting: &mut Setting) {
        setting::put_f64(setting, "fresnelPower", self.power);
        setting::put_flat_vec(setting, ["r", "g", "b"], self.rim_color);
    }
}

impl Shader for FresnelShader {
    fn apply(&self, color: Color, hit: &HitInfo<'_>, ray: &Ray) -> Color {
        self.blend(color, hit, ray)
    }

    fn type_name(&self) -> String {
        Self::TYPE_NAME.to_owned()
    }

    fn clone_shader(&self) -> Box<dyn Shader> {
        Box::new(*self)
    }

    fn export_params(&self, setting: &mut Setting) {
        setting::put_str(setting, "type", Self::TYPE_NAME);
        self.export_fields(setting);
    }
}

// ─── Decorators ─────────────────────────────────────────────────────────────

fn export_base(setting: &mut Setting, base: &dyn Shader) {
    let mut group = Setting::new();
    base.export_params(&mut group);
    setting.insert("baseShader".to_owned(), Value::Object(group));
}

/// Plain wrapper: runs the wrapped shader and nothing else. Useful as the
/// neutral element when building decorator chains programmatically.
#[derive(Debug)]
pub struct ShaderDecorator {
    inner: Box<dyn Shader>,
}

impl ShaderDecorator {
    pub const TYPE_NAME: &'static str = "decorator";

    pub fn new(inner: Box<dyn Shader>) -> Self {
        Self { inner }
    }
}

impl Shader for ShaderDecorator {
    fn apply(&self, color: Color, hit: &HitInfo<'_>, ray: &Ray) -> Color {
        self.inner.apply(color, hit, ray)
    }

    fn type_name(&self) -> String {
        format!("{}({})", Self::TYPE_NAME, self.inner.type_name())
    }

    fn clone_shader(&self) -> Box<dyn Shader> {
        Box::new(Self::new(self.inner.clone_shader()))
    }

    fn export_params(&self, setting: &mut Setting) {
        setting::put_str(setting, "type", Self::TYPE_NAME);
        export_base(setting, self.inner.as_ref());
    }
}

/// Runs the wrapped shader, then applies the fresnel rim blend to its output.
#[derive(Debug)]
pub struct FresnelDecorator {
    inner: Box<dyn Shader>,
    fresnel: FresnelShader,
}

impl FresnelDecorator {
    pub const TYPE_NAME: &'static str = "fresnel-decorator";

    pub fn new(inner: Box<dyn Shader>, power: f64, rim_color: Color) -> Self {
        Self {
            inner,
            fresnel: FresnelShader { power, rim_color },
        }
    }

    /// A missing base shader means [`BasicShader`].
    pub fn from_params(params: &Params, base: Option<Box<dyn Shader>>) -> Self {
        let fresnel = FresnelShader::from_params(params);
        Self::new(
            base.unwrap_or_else(|| Box::new(BasicShader)),
            fresnel.power,
            fresnel.rim_color,
        )
    }
}

impl Shader for FresnelDecorator {
    fn apply(&self, color: Color, hit: &HitInfo<'_>, ray: &Ray) -> Color {
        let shaded = self.inner.apply(color, hit, ray);
        self.fresnel.blend(shaded, hit, ray)
    }

    fn type_name(&self) -> String {
        format!("{}({})", Self::TYPE_NAME, self.inner.type_name())
    }

    fn clone_shader(&self) -> Box<dyn Shader> {
        Box::new(Self {
            inner: self.inner.clone_shader(),
            fresnel: self.fresnel,
        })
    }

    fn export_params(&self, setting: &mut Setting) {
        setting::put_str(setting, "type", Self::TYPE_NAME);
        self.fresnel.export_fields(setting);
        export_base(setting, self.inner.as_ref());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Material;
    use crate::primitive::Sphere;
    use pretty_assertions::assert_eq;

    fn sphere() -> Sphere {
        Sphere::new(Point3::zero(), 1.0, Material::default().shared())
    }

    /// A hit seen head-on: normal and view direction are parallel.
    fn head_on(sphere: &Sphere) -> (HitInfo<'_>, Ray) {
        let ray = Ray::new(Point3::new(0.0, 0.0, 5.0), -Vec3::unit_z());
        let hit = HitInfo {
            distance: 4.0,
            hit_point: Point3::new(0.0, 0.0, 1.0),
            normal: Vec3::unit_z(),
            uv: Uv::default(),
            primitive: sphere,
        };
        (hit, ray)
    }

    /// A hit seen edge-on: normal perpendicular to the view direction.
    fn grazing(sphere: &Sphere) -> (HitInfo<'_>, Ray) {
        let ray = Ray::new(Point3::new(-5.0, 1.0, 0.0), Vec3::unit_x());
        let hit = HitInfo {
            distance: 5.0,
            hit_point: Point3::new(0.0, 1.0, 0.0),
            normal: Vec3::unit_y(),
            uv: Uv::default(),
            primitive: sphere,
        };
        (hit, ray)
    }

    #[test]
    fn basic_is_identity() {
        let s = sphere();
        let (hit, ray) = head_on(&s);
        let c = Color::new(0.3, 0.6, 0.9);
        assert_eq!(BasicShader.apply(c, &hit, &ray), c);
    }

    #[test]
    fn phong_adds_full_highlight_head_on() {
        let s = sphere();
        let (hit, ray) = head_on(&s);
        let c = PhongShader::default().apply(Color::splat(0.2), &hit, &ray);
        assert!(c.approx_eq(Color::splat(0.7), 1e-12));
    }

    #[test]
    fn phong_clamps_to_one() {
        let s = sphere();
        let (hit, ray) = head_on(&s);
        let c = PhongShader::default().apply(Color::splat(0.9), &hit, &ray);
        assert_eq!(c, Color::ones());
    }

    #[test]
    fn toon_bands_and_outlines() {
        let s = sphere();
        let toon = ToonShader::default();
        let (hit, ray) = head_on(&s);
        let banded = toon.apply(Color::new(0.3, 0.55, 0.99), &hit, &ray);
        assert!(banded.approx_eq(Color::new(0.25, 0.5, 0.75), 1e-12));
        let (edge, edge_ray) = grazing(&s);
        assert_eq!(toon.apply(Color::ones(), &edge, &edge_ray), Color::zero());
    }

    #[test]
    fn toon_levels_never_zero() {
        assert_eq!(ToonShader::new(0, 0.2).levels, 1);
        let params = Params::from([("levels".to_owned(), 0.0)]);
        assert_eq!(ToonShader::from_params(&params).levels, 1);
    }

    #[test]
    fn fresnel_blends_towards_rim_at_grazing_angles() {
        let s = sphere();
        let shader = FresnelShader {
            power: 2.0,
            rim_color: Color::new(1.0, 0.0, 0.0),
        };
        let base = Color::new(0.0, 0.0, 1.0);
        let (hit, ray) = head_on(&s);
        assert!(shader.apply(base, &hit, &ray).approx_eq(base, 1e-12));
        let (edge, edge_ray) = grazing(&s);
        assert!(shader
            .apply(base, &edge, &edge_ray)
            .approx_eq(Color::new(1.0, 0.0, 0.0), 1e-12));
    }

    #[test]
    fn fresnel_decorator_runs_inner_first() {
        let s = sphere();
        let (hit, ray) = head_on(&s);
        let decorated = FresnelDecorator::new(Box::new(PhongShader::default()), 2.0, Color::ones());
        let plain = PhongShader::default();
        let c = Color::splat(0.2);
        // Head-on the fresnel factor is zero, so only the inner shader shows.
        assert_eq!(decorated.apply(c, &hit, &ray), plain.apply(c, &hit, &ray));
        assert_eq!(decorated.type_name(), "fresnel-decorator(phong)");
    }

    #[test]
    fn decorator_chain_type_names_nest() {
        let chain = ShaderDecorator::new(Box::new(FresnelDecorator::new(
            Box::new(ToonShader::default()),
            1.0,
            Color::ones(),
        )));
        assert_eq!(chain.type_name(), "decorator(fresnel-decorator(toon))");
        assert_eq!(chain.clone_shader().type_name(), chain.type_name());
    }

    #[test]
    fn fresnel_decorator_exports_its_base() {
        let decorated = FresnelDecorator::new(Box::new(ToonShader::new(3, 0.1)), 1.5, Color::ones());
        let mut setting = Setting::new();
        decorated.export_params(&mut setting);
        assert_eq!(
            Value::Object(setting),
            serde_json::json!({
                "type": "fresnel-decorator",
                "fresnelPower": 1.5,
                "r": 1.0, "g": 1.0, "b": 1.0,
                "baseShader": {"type": "toon", "levels": 3.0, "edgeThreshold": 0.1},
            })
        );
    }
}
