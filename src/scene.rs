use crate::camera::CameraConfig;
use crate::light::{AmbientLight, Light};
use crate::math::*;
use crate::postprocess::{self, PostProcess};
use crate::primitive::{self, HitInfo, Primitive};
use crate::setting::{self, Setting};
use crate::shader::Shader;
use serde_json::Value;
use std::collections::BTreeMap;

/// Offset applied to shadow-ray origins, and the lower bound for every
/// intersection query, so a surface never occludes itself.
pub const SHADOW_BIAS: f64 = 0.001;

/// Fraction of a light's diffuse contribution that survives when the light
/// is blocked. Shadows darken; they do not black out.
pub const SHADOW_FACTOR: f64 = 0.4;

// ─── Scene ──────────────────────────────────────────────────────────────────

/// Everything needed to shade a frame. A scene is never mutated while it is
/// being rendered; reloading builds a new one and swaps it in whole.
#[derive(Debug, Default)]
pub struct Scene {
    pub camera: CameraConfig,
    pub ambient: AmbientLight,
    pub primitives: Vec<Box<dyn Primitive>>,
    pub lights: Vec<Box<dyn Light>>,
    pub shaders: Vec<Box<dyn Shader>>,
    pub post_processes: Vec<Box<dyn PostProcess>>,
}

impl Clone for Scene {
    fn clone(&self) -> Self {
        Self {
            camera: self.camera.clone(),
            ambient: self.ambient,
            primitives: self.primitives.iter().map(|p| p.clone_primitive()).collect(),
            lights: self.lights.iter().map(|l| l.clone_light()).collect(),
            shaders: self.shaders.iter().map(|s| s.clone_shader()).collect(),
            post_processes: self
                .post_processes
                .iter()
                .map(|p| p.clone_post_process())
                .collect(),
        }
    }
}

impl Scene {
    /// Nearest hit along `ray` over all primitives, or `None`.
    ///
    /// The search bound shrinks to each hit found, so a later primitive only
    /// wins by being strictly closer; on an exact tie the earlier one stays.
    pub fn trace(&self, ray: &Ray) -> Option<HitInfo<'_>> {
        let mut closest = f64::INFINITY;
        let mut nearest = None;
        for primitive in &self.primitives {
            if let Some(hit) = primitive.hit(ray, SHADOW_BIAS, closest) {
                closest = hit.distance;
                nearest = Some(hit);
            }
        }
        nearest
    }

    /// Whether anything sits between `hit_point` and `light` along
    /// `light_dir`. Directional lights are tested out to infinity.
    pub fn is_in_shadow(&self, hit_point: Point3, light_dir: Vec3, light: &dyn Light) -> bool {
        let shadow_ray = Ray::new(hit_point + light_dir * SHADOW_BIAS, light_dir);
        let max_distance = light.distance_to(hit_point);
        self.primitives
            .iter()
            .any(|p| p.hit(&shadow_ray, SHADOW_BIAS, max_distance).is_some())
    }

    /// Color seen along `ray`: ambient plus diffuse from every light, capped
    /// at 1 per channel, then passed through the shader chain.
    pub fn compute_color(&self, ray: &Ray) -> Color {
        let Some(hit) = self.trace(ray) else {
            return Color::zero();
        };
        let surface = hit.primitive.material().color_at(hit.uv);
        let mut color = surface.hadamard(self.ambient.color);

        for light in &self.lights {
            let light_dir = light.direction_to(hit.hit_point);
            let mut diffuse = hit.normal.dot(light_dir).max(0.0);
            if diffuse > 0.0 && self.is_in_shadow(hit.hit_point, light_dir, light.as_ref()) {
                diffuse *= SHADOW_FACTOR;
            }
            color += surface.hadamard(light.color_at(hit.hit_point)) * diffuse;
        }

        self.shaders
            .iter()
            .fold(color.min_one(), |c, shader| shader.apply(c, &hit, ray))
    }

    /// Runs the post-process chain over a finished frame.
    pub fn apply_post_processing(&self, buffer: Vec<Color>, width: usize, height: usize) -> Vec<Color> {
        postprocess::apply_chain(&self.post_processes, buffer, width, height)
    }

    /// Rays per pixel requested by the post-process chain. The last effect
    /// that asks wins.
    pub fn samples_per_pixel(&self) -> Option<u32> {
        self.post_processes
            .iter()
            .rev()
            .find_map(|p| p.samples_per_pixel())
    }

    /// The scene in its structured on-disk form.
    pub fn export(&self) -> Value {
        let mut root = Setting::new();
        self.camera.export_params(&mut root);
        root.insert("primitives".to_owned(), primitive::export_group(&self.primitives));

        let mut lights: BTreeMap<String, Vec<Value>> = BTreeMap::new();
        for light in &self.lights {
            let mut entry = Setting::new();
            light.export_params(&mut entry);
            lights
                .entry(light.type_name().to_owned())
                .or_default()
                .push(Value::Object(entry));
        }
        let mut lights = match into_groups(lights) {
            Value::Object(map) => map,
            _ => Setting::new(),
        };
        self.ambient.export_params(&mut lights);
        root.insert("lights".to_owned(), Value::Object(lights));

        root.insert("shaders".to_owned(), export_list(&self.shaders, |s, out| s.export_params(out)));
        root.insert(
            "postProcess".to_owned(),
            export_list(&self.post_processes, |p, out| p.export_params(out)),
        );
        Value::Object(root)
    }
}

fn into_groups(groups: BTreeMap<String, Vec<Value>>) -> Value {
    Value::Object(
        groups
            .into_iter()
            .map(|(key, list)| (key, Value::Array(list)))
            .collect(),
    )
}

fn export_list<T: ?Sized>(items: &[Box<T>], export: impl Fn(&T, &mut Setting)) -> Value {
    Value::Array(
        items
            .iter()
            .map(|item| {
                let mut entry = Setting::new();
                export(item.as_ref(), &mut entry);
                Value::Object(entry)
            })
            .collect(),
    )
}

// ─── Builder ────────────────────────────────────────────────────────────────

/// Assembles a [`Scene`] piece by piece.
#[derive(Debug, Default)]
pub struct SceneBuilder {
    scene: Scene,
}

impl SceneBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn camera(mut self, camera: CameraConfig) -> Self {
        self.scene.camera = camera;
        self
    }

    pub fn ambient_light(mut self, color: Color) -> Self {
        self.scene.ambient = AmbientLight::new(color);
        self
    }

    pub fn add_primitive(mut self, primitive: Box<dyn Primitive>) -> Self {
        self.scene.primitives.push(primitive);
        self
    }

    pub fn add_light(mut self, light: Box<dyn Light>) -> Self {
        self.scene.lights.push(light);
        self
    }

    pub fn add_shader(mut self, shader: Box<dyn Shader>) -> Self {
        self.scene.shaders.push(shader);
        self
    }

    pub fn add_post_process(mut self, effect: Box<dyn PostProcess>) -> Self {
        self.scene.post_processes.push(effect);
        self
    }

    pub fn build(self) -> Scene {
        let scene = self.scene;
        log::debug!(
            "scene built: {} primitives, {} lights, {} shaders, {} post-processes",
            scene.primitives.len(),
            scene.lights.len(),
            scene.shaders.len(),
            scene.post_processes.len(),
        );
        scene
    }
}

/// Reads an `ambient` entry, which is either a single intensity or an
/// `{r, g, b}` group in 0–1.
pub(crate) fn ambient_from_setting(lights: &Setting) -> Option<Color> {
    match lights.get("ambient")? {
        Value::Number(n) => n.as_f64().map(Color::splat),
        Value::Object(_) => setting::get_rgb(lights, "ambient", 1.0, 0.0),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::light::{DirectionalLight, PointLight};
    use crate::material::Material;
    use crate::postprocess::{Negative, Supersampling};
    use crate::primitive::{Cuboid, Plane, Sphere, Torus};
    use crate::shader::ToonShader;
    use crate::texture::{Chessboard, Texture};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn floor() -> Box<dyn Primitive> {
        Box::new(Plane::new(Point3::zero(), Vec3::unit_y(), Material::default().shared()))
    }

    fn lamp() -> Box<dyn Light> {
        // No falloff, so the diffuse term reads directly off the color.
        Box::new(PointLight::new(Point3::new(0.0, 4.0, 0.0), Color::splat(0.5), 1.0, 0.0, 0.0))
    }

    /// Ray from the side towards the origin, passing under anything hung above.
    fn floor_ray() -> Ray {
        let from = Point3::new(3.0, 1.0, 0.0);
        Ray::new(from, (Point3::zero() - from).normalized())
    }

    fn dark() -> SceneBuilder {
        SceneBuilder::new().ambient_light(Color::zero())
    }

    #[test]
    fn miss_is_black() {
        let scene = dark().add_light(lamp()).build();
        assert_eq!(scene.compute_color(&floor_ray()), Color::zero());
    }

    #[test]
    fn trace_returns_the_nearest_hit_regardless_of_order() {
        let near = Sphere::new(Point3::new(0.0, 0.0, 0.0), 1.0, Material::default().shared());
        let far = Sphere::new(Point3::new(5.0, 0.0, 0.0), 1.0, Material::default().shared());
        let ray = Ray::new(Point3::new(-5.0, 0.0, 0.0), Vec3::unit_x());
        let scene = dark().add_primitive(Box::new(far)).add_primitive(Box::new(near)).build();
        let hit = scene.trace(&ray).unwrap();
        assert!((hit.distance - 4.0).abs() < 1e-12);
    }

    #[test]
    fn exact_ties_keep_the_first_primitive() {
        let first = Material::new(Color::new(1.0, 0.0, 0.0)).shared();
        let second = Material::new(Color::new(0.0, 1.0, 0.0)).shared();
        let scene = dark()
            .add_primitive(Box::new(Sphere::new(Point3::zero(), 1.0, Arc::clone(&first))))
            .add_primitive(Box::new(Sphere::new(Point3::zero(), 1.0, second)))
            .build();
        let hit = scene.trace(&Ray::new(Point3::new(-5.0, 0.0, 0.0), Vec3::unit_x())).unwrap();
        assert!(Arc::ptr_eq(hit.primitive.material(), &first));
    }

    #[test]
    fn lit_floor_without_occluder() {
        let scene = dark().add_primitive(floor()).add_light(lamp()).build();
        let hit = scene.trace(&floor_ray()).unwrap();
        assert!(!scene.is_in_shadow(hit.hit_point, Vec3::unit_y(), scene.lights[0].as_ref()));
        let color = scene.compute_color(&floor_ray());
        assert!(color.approx_eq(Color::splat(0.5), 1e-9));
    }

    #[test]
    fn occluder_scales_diffuse_by_shadow_factor() {
        let blocker = Sphere::new(Point3::new(0.0, 2.0, 0.0), 0.5, Material::default().shared());
        let open = dark().add_primitive(floor()).add_light(lamp()).build();
        let shadowed = dark()
            .add_primitive(floor())
            .add_primitive(Box::new(blocker))
            .add_light(lamp())
            .build();

        let hit = shadowed.trace(&floor_ray()).unwrap();
        assert!(shadowed.is_in_shadow(hit.hit_point, Vec3::unit_y(), shadowed.lights[0].as_ref()));

        let lit = open.compute_color(&floor_ray());
        let dimmed = shadowed.compute_color(&floor_ray());
        assert!(dimmed.approx_eq(lit * SHADOW_FACTOR, 1e-9));
        assert!(dimmed.x > 0.0);
    }

    #[test]
    fn occluder_behind_point_light_casts_no_shadow() {
        let above = Sphere::new(Point3::new(0.0, 6.0, 0.0), 0.5, Material::default().shared());
        let scene = dark()
            .add_primitive(floor())
            .add_primitive(Box::new(above))
            .add_light(lamp())
            .build();
        assert!(!scene.is_in_shadow(Point3::zero(), Vec3::unit_y(), scene.lights[0].as_ref()));
    }

    #[test]
    fn directional_light_is_blocked_at_any_distance() {
        let far_above = Sphere::new(Point3::new(0.0, 100.0, 0.0), 1.0, Material::default().shared());
        let sun: Box<dyn Light> = Box::new(DirectionalLight::new(-Vec3::unit_y(), Color::ones()));
        let scene = dark()
            .add_primitive(floor())
            .add_primitive(Box::new(far_above))
            .add_light(sun)
            .build();
        assert!(scene.is_in_shadow(Point3::zero(), Vec3::unit_y(), scene.lights[0].as_ref()));
    }

    #[test]
    fn ambient_tints_the_surface() {
        let red = Material::new(Color::new(1.0, 0.5, 0.0)).shared();
        let scene = SceneBuilder::new()
            .ambient_light(Color::splat(0.5))
            .add_primitive(Box::new(Plane::new(Point3::zero(), Vec3::unit_y(), red)))
            .build();
        let color = scene.compute_color(&floor_ray());
        assert!(color.approx_eq(Color::new(0.5, 0.25, 0.0), 1e-12));
    }

    #[test]
    fn bright_lights_are_capped_before_shading() {
        let blaze: Box<dyn Light> =
            Box::new(PointLight::new(Point3::new(0.0, 4.0, 0.0), Color::splat(5.0), 1.0, 0.0, 0.0));
        let scene = dark().add_primitive(floor()).add_light(blaze).build();
        assert_eq!(scene.compute_color(&floor_ray()), Color::ones());
    }

    #[test]
    fn shader_chain_sees_the_lit_color() {
        let light: Box<dyn Light> =
            Box::new(PointLight::new(Point3::new(0.0, 4.0, 0.0), Color::splat(0.6), 1.0, 0.0, 0.0));
        let scene = dark()
            .add_primitive(floor())
            .add_light(light)
            .add_shader(Box::new(ToonShader::new(4, 0.0)))
            .build();
        // 0.6 falls into the 0.5 band.
        let color = scene.compute_color(&floor_ray());
        assert!(color.approx_eq(Color::splat(0.5), 1e-9));
    }

    #[test]
    fn post_processing_and_samples_come_from_the_chain() {
        let scene = dark()
            .add_post_process(Box::new(Supersampling::new(4)))
            .add_post_process(Box::new(Negative::new(1.0)))
            .build();
        assert_eq!(scene.samples_per_pixel(), Some(4));
        let out = scene.apply_post_processing(vec![Color::splat(0.25)], 1, 1);
        assert_eq!(out, vec![Color::splat(0.75)]);
    }

    #[test]
    fn clone_is_deep_but_shares_materials() {
        let scene = dark().add_primitive(floor()).add_light(lamp()).build();
        let copy = scene.clone();
        assert_eq!(copy.primitives.len(), 1);
        assert!(Arc::ptr_eq(copy.primitives[0].material(), scene.primitives[0].material()));
        assert_eq!(copy.compute_color(&floor_ray()), scene.compute_color(&floor_ray()));
    }

    #[test]
    fn export_groups_entities_by_type() {
        let scene = dark()
            .add_primitive(floor())
            .add_primitive(Box::new(Sphere::new(Point3::zero(), 1.0, Material::default().shared())))
            .add_light(lamp())
            .add_post_process(Box::new(Negative::new(0.5)))
            .build();
        let value = scene.export();
        assert_eq!(value["primitives"]["planes"].as_array().map(Vec::len), Some(1));
        assert_eq!(value["primitives"]["spheres"].as_array().map(Vec::len), Some(1));
        assert_eq!(value["lights"]["point"].as_array().map(Vec::len), Some(1));
        assert_eq!(value["lights"]["ambient"], serde_json::json!({"r": 0.0, "g": 0.0, "b": 0.0}));
        assert_eq!(value["postProcess"][0]["type"], "negative");
        assert_eq!(value["shaders"], serde_json::json!([]));
    }

    #[test]
    fn textured_floor_shades_per_square() {
        let board = Texture::Chessboard(Chessboard {
            primary: Color::ones(),
            secondary: Color::zero(),
            scale: 1.0,
        });
        let material = Material::default().with_texture(board).shared();
        let scene = SceneBuilder::new()
            .ambient_light(Color::ones())
            .add_primitive(Box::new(Plane::new(Point3::zero(), Vec3::unit_y(), material)))
            .build();
        let colors: Vec<Color> = [0.5, 1.5]
            .into_iter()
            .map(|x| {
                let ray = Ray::new(Point3::new(x, 1.0, 0.5), -Vec3::unit_y());
                scene.compute_color(&ray)
            })
            .collect();
        assert_ne!(colors[0], colors[1]);
        assert!(colors.iter().all(|&c| c == Color::ones() || c == Color::zero()));
    }

    #[test]
    fn box_and_torus_export_under_plural_keys() {
        let scene = dark()
            .add_primitive(Box::new(Cuboid::new(Point3::zero(), Vec3::ones(), Material::default().shared())))
            .add_primitive(Box::new(Torus::new(
                Point3::zero(),
                Vec3::unit_y(),
                2.0,
                0.5,
                Material::default().shared(),
            )))
            .build();
        let value = scene.export();
        assert_eq!(value["primitives"]["boxes"].as_array().map(Vec::len), Some(1));
        assert_eq!(value["primitives"]["toruses"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn ambient_accepts_scalar_or_group() {
        let scalar = serde_json::json!({"ambient": 0.4});
        assert_eq!(ambient_from_setting(scalar.as_object().unwrap()), Some(Color::splat(0.4)));
        let group = serde_json::json!({"ambient": {"r": 0.1, "g": 0.2, "b": 0.3}});
        assert_eq!(
            ambient_from_setting(group.as_object().unwrap()),
            Some(Color::new(0.1, 0.2, 0.3))
        );
    }
}
