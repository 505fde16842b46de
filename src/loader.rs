//! Scene files on disk.
//!
//! A scene file is a JSON document with up to five sections:
//!
//! ```json
//! {
//!   "camera": {"resolution": {"width": 400, "height": 300},
//!              "position": {"x": 0, "y": 0, "z": 5},
//!              "lookAt": {"x": 0, "y": 0, "z": 0}, "fieldOfView": 60},
//!   "primitives": {"spheres": [{"x": 0, "y": 0, "z": 0, "radius": 1,
//!                               "material": {"color": {"r": 255, "g": 64, "b": 64}}}],
//!                  "composites": [{"primitives": {"boxes": [...]}}]},
//!   "lights": {"ambient": 0.2,
//!              "point": [{"x": 0, "y": 4, "z": 2, "r": 255, "g": 255, "b": 255}]},
//!   "shaders": [{"type": "phong"}],
//!   "postProcess": [{"type": "supersampling", "samplesPerPixel": 4}]
//! }
//! ```
//!
//! A file that cannot be read or parsed, or whose sections have the wrong
//! shape, fails the whole load. A single entity that cannot be built is
//! logged and skipped.

use crate::camera::CameraConfig;
use crate::error::{ConfigError, SceneLoadError, SceneLoadErrorKind};
use crate::light::{ColorLightDecorator, Light};
use crate::material::{Material, SharedMaterial};
use crate::postprocess::PostProcess;
use crate::primitive::{self, MaterialDecorator, Primitive};
use crate::registry::Registry;
use crate::scene::{self, Scene, SceneBuilder};
use crate::setting::{self, Setting};
use crate::shader::Shader;
use serde_json::Value;
use std::fs;
use std::path::Path;

pub fn load_scene(path: impl AsRef<Path>, registry: &Registry) -> Result<Scene, SceneLoadError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| SceneLoadError::new(path, e))?;
    let value: Value = serde_json::from_str(&text).map_err(|e| SceneLoadError::new(path, e))?;
    let scene = scene_from_value(&value, registry).map_err(|kind| SceneLoadError::new(path, kind))?;
    log::info!(
        "loaded scene '{}': {} primitives, {} lights",
        path.display(),
        scene.primitives.len(),
        scene.lights.len()
    );
    Ok(scene)
}

/// Writes `scene` in the same layout [`load_scene`] reads.
pub fn save_scene(scene: &Scene, path: impl AsRef<Path>) -> Result<(), SceneLoadError> {
    let path = path.as_ref();
    let text = serde_json::to_string_pretty(&scene.export()).map_err(|e| SceneLoadError::new(path, e))?;
    fs::write(path, text).map_err(|e| SceneLoadError::new(path, e))?;
    log::info!("exported scene to '{}'", path.display());
    Ok(())
}

fn section<'a>(root: &'a Setting, key: &str) -> Result<Option<&'a Setting>, SceneLoadErrorKind> {
    match root.get(key) {
        None => Ok(None),
        Some(Value::Object(group)) => Ok(Some(group)),
        Some(_) => Err(SceneLoadErrorKind::Invalid(format!("'{key}' must be a group"))),
    }
}

fn list<'a>(value: &'a Value, context: &str) -> Result<&'a [Value], SceneLoadErrorKind> {
    value
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| SceneLoadErrorKind::Invalid(format!("'{context}' must be a list")))
}

fn entry<'a>(value: &'a Value, context: &str) -> Result<&'a Setting, ConfigError> {
    value.as_object().ok_or_else(|| ConfigError::Invalid {
        context: context.to_owned(),
        reason: "entry must be a group".to_owned(),
    })
}

fn type_of<'a>(group: &'a Setting, context: &str) -> Result<&'a str, ConfigError> {
    group
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| ConfigError::Invalid {
            context: context.to_owned(),
            reason: "missing 'type'".to_owned(),
        })
}

/// Logs and drops entities that failed to build.
fn keep<T>(result: Result<T, ConfigError>, what: &str) -> Option<T> {
    match result {
        Ok(value) => {
            log::debug!("built {what}");
            Some(value)
        }
        Err(err) => {
            log::warn!("skipping {what}: {err}");
            None
        }
    }
}

/// Builds a scene from an already parsed document.
pub fn scene_from_value(value: &Value, registry: &Registry) -> Result<Scene, SceneLoadErrorKind> {
    let root = value
        .as_object()
        .ok_or_else(|| SceneLoadErrorKind::Invalid("scene root must be a group".to_owned()))?;

    let mut builder = SceneBuilder::new();

    if let Some(camera) = section(root, "camera")? {
        builder = builder.camera(CameraConfig::from_setting(camera));
    }

    if let Some(primitives) = section(root, "primitives")? {
        for p in build_primitives(registry, primitives)? {
            builder = builder.add_primitive(p);
        }
    }

    if let Some(lights) = section(root, "lights")? {
        if let Some(ambient) = scene::ambient_from_setting(lights) {
            builder = builder.ambient_light(ambient);
        }
        for (type_name, items) in lights.iter().filter(|(k, _)| k.as_str() != "ambient") {
            for item in list(items, type_name)? {
                let what = format!("{type_name} light");
                if let Some(l) = keep(build_light(registry, type_name, item), &what) {
                    builder = builder.add_light(l);
                }
            }
        }
    }

    if let Some(shaders) = root.get("shaders") {
        for item in list(shaders, "shaders")? {
            if let Some(s) = keep(build_shader(registry, item), "shader") {
                builder = builder.add_shader(s);
            }
        }
    }

    if let Some(effects) = root.get("postProcess") {
        for item in list(effects, "postProcess")? {
            if let Some(p) = keep(build_post_process(registry, item), "post-process") {
                builder = builder.add_post_process(p);
            }
        }
    }

    Ok(builder.build())
}

/// Builds every entry of a `primitives` group, in file order. Group keys
/// are plural type names (`spheres`, `boxes`).
fn build_primitives(
    registry: &Registry,
    groups: &Setting,
) -> Result<Vec<Box<dyn Primitive>>, SceneLoadErrorKind> {
    let mut built = Vec::new();
    for (group, items) in groups {
        let candidates = primitive::group_candidates(group);
        let type_name = candidates
            .iter()
            .copied()
            .find(|name| registry.has_primitive(name))
            .unwrap_or_else(|| candidates.last().copied().unwrap_or(group.as_str()));
        for item in list(items, group)? {
            let what = format!("{type_name} primitive");
            if let Some(p) = keep(build_primitive(registry, type_name, item), &what) {
                built.push(p);
            }
        }
    }
    Ok(built)
}

fn build_primitive(
    registry: &Registry,
    type_name: &str,
    value: &Value,
) -> Result<Box<dyn Primitive>, ConfigError> {
    let group = entry(value, type_name)?;
    let material = setting::get_group(group, "material")
        .map(Material::from_setting)
        .transpose()?
        .map(Material::shared);
    let base = material.clone().unwrap_or_else(|| Material::default().shared());
    let mut primitive = registry.create_primitive(type_name, &setting::flat_params(group), base)?;

    if let Some(children) = primitive.children_mut() {
        let nested = setting::get_group(group, "primitives").ok_or_else(|| ConfigError::Invalid {
            context: type_name.to_owned(),
            reason: "missing 'primitives' group".to_owned(),
        })?;
        let built = build_primitives(registry, nested).map_err(|kind| ConfigError::Invalid {
            context: type_name.to_owned(),
            reason: kind.to_string(),
        })?;
        // A material on the container overrides every child's own.
        for child in built {
            let child: Box<dyn Primitive> = match &material {
                Some(m) => Box::new(MaterialDecorator::new(child, SharedMaterial::clone(m))),
                None => child,
            };
            children.push(child);
        }
    }

    primitive::apply_rotation_setting(primitive.as_mut(), group);
    Ok(primitive)
}

fn build_light(registry: &Registry, type_name: &str, value: &Value) -> Result<Box<dyn Light>, ConfigError> {
    let group = entry(value, type_name)?;
    let light = registry.create_light(type_name, &setting::flat_params(group))?;
    let light: Box<dyn Light> = match setting::get_rgb(group, "filter", 1.0, 1.0) {
        Some(filter) => Box::new(ColorLightDecorator::new(light, filter)),
        None => light,
    };
    Ok(light)
}

/// Builds the `baseShader` chain innermost first.
fn build_shader(registry: &Registry, value: &Value) -> Result<Box<dyn Shader>, ConfigError> {
    let group = entry(value, "shader")?;
    let type_name = type_of(group, "shader")?;
    let base = group
        .get("baseShader")
        .map(|inner| build_shader(registry, inner))
        .transpose()?;
    registry.create_shader(type_name, &setting::flat_params(group), base)
}

fn build_post_process(
    registry: &Registry,
    value: &Value,
) -> Result<Box<dyn PostProcess>, ConfigError> {
    let group = entry(value, "post-process")?;
    let type_name = type_of(group, "post-process")?;
    registry.create_post_process(type_name, &setting::flat_params(group))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;
    use std::io::Write;

    fn sample() -> Value {
        json!({
            "camera": {
                "resolution": {"width": 64, "height": 48},
                "position": {"x": 0, "y": 1, "z": 6},
                "lookAt": {"x": 0, "y": 0, "z": 0},
                "fieldOfView": 50
            },
            "primitives": {
                "spheres": [
                    {"x": 0, "y": 0, "z": 0, "radius": 1.5,
                     "material": {"color": {"r": 255, "g": 0, "b": 0}}}
                ],
                "planes": [
                    {"x": 0, "y": -1.5, "z": 0, "nx": 0, "ny": 1, "nz": 0}
                ],
                "cylinders": [
                    {"x": 3, "y": -1.5, "z": 0, "ax": 0, "ay": 1, "az": 0,
                     "radius": 0.5, "height": 2, "rotation": {"x": 0, "y": 0, "z": 30}}
                ]
            },
            "lights": {
                "ambient": 0.2,
                "point": [
                    {"x": 0, "y": 4, "z": 2, "r": 255, "g": 255, "b": 255,
                     "filter": {"r": 1, "g": 0.5, "b": 0.5}}
                ],
                "directional": [
                    {"dx": 0, "dy": -1, "dz": 0, "r": 255, "g": 255, "b": 255}
                ]
            },
            "shaders": [
                {"type": "fresnel-decorator", "fresnelPower": 3,
                 "baseShader": {"type": "phong", "shininess": 16}}
            ],
            "postProcess": [
                {"type": "supersampling", "samplesPerPixel": 4},
                {"type": "grayscale", "intensity": 0.25}
            ]
        })
    }

    #[test]
    fn builds_every_section() {
        let scene = scene_from_value(&sample(), &Registry::with_builtins()).unwrap();
        assert_eq!(scene.camera.width, 64);
        assert_eq!(scene.camera.look_from, Point3::new(0.0, 1.0, 6.0));
        assert_eq!(scene.ambient.color, Color::splat(0.2));
        assert_eq!(scene.primitives.len(), 3);
        assert_eq!(scene.lights.len(), 2);
        assert_eq!(scene.shaders[0].type_name(), "fresnel-decorator(phong)");
        assert_eq!(scene.samples_per_pixel(), Some(4));
        assert_eq!(scene.post_processes[1].type_name(), "grayscale");

        let cylinder = scene.primitives.iter().find(|p| p.type_name() == "cylinder").unwrap();
        assert_eq!(cylinder.rotation().z, 30.0);

        let point = scene.lights.iter().find(|l| l.type_name() == "point").unwrap();
        let c = point.color_at(Point3::new(0.0, 4.0, 2.0));
        assert!(c.approx_eq(Color::new(1.0, 0.5, 0.5), 1e-12));
    }

    #[test]
    fn bad_entities_are_skipped() {
        let value = json!({
            "primitives": {
                "spheres": [{"x": 0, "y": 0, "z": 0}, {"x": 0, "y": 0, "z": 0, "radius": 1}],
                "tori": [{"x": 0}]
            },
            "lights": {"laser": [{"x": 1}]},
            "shaders": [{"shininess": 3}, {"type": "toon"}],
            "postProcess": [{"type": "blur"}]
        });
        let scene = scene_from_value(&value, &Registry::with_builtins()).unwrap();
        assert_eq!(scene.primitives.len(), 1);
        assert!(scene.lights.is_empty());
        assert_eq!(scene.shaders.len(), 1);
        assert!(scene.post_processes.is_empty());
    }

    #[test]
    fn wrong_section_shape_is_fatal() {
        let value = json!({"primitives": [1, 2, 3]});
        let err = scene_from_value(&value, &Registry::with_builtins()).unwrap_err();
        assert_eq!(err.to_string(), "'primitives' must be a group");
    }

    #[test]
    fn missing_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let err = load_scene(&path, &Registry::with_builtins()).unwrap_err();
        assert_eq!(err.path, path);
        assert!(matches!(err.kind, SceneLoadErrorKind::Read(_)));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let err = load_scene(file.path(), &Registry::with_builtins()).unwrap_err();
        assert!(matches!(err.kind, SceneLoadErrorKind::Parse(_)));
    }

    #[test]
    fn exported_scene_loads_back_equivalent() {
        let registry = Registry::with_builtins();
        let original = scene_from_value(&sample(), &registry).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.json");
        save_scene(&original, &path).unwrap();
        let reloaded = load_scene(&path, &registry).unwrap();

        assert_eq!(reloaded.export(), original.export());

        let camera = crate::camera::Camera::new(&original.camera, 64.0 / 48.0);
        for (s, t) in [(0.5, 0.5), (0.2, 0.7), (0.9, 0.1)] {
            let ray = camera.get_ray(s, t);
            assert!(reloaded.compute_color(&ray).approx_eq(original.compute_color(&ray), 1e-9));
        }
    }

    #[test]
    fn sphere_round_trip_keeps_geometry_and_color() {
        let registry = Registry::with_builtins();
        let value = json!({"primitives": {"spheres": [
            {"x": 1, "y": 2, "z": 3, "radius": 0.75, "material": {"color": {"r": 51, "g": 102, "b": 204}}}
        ]}});
        let scene = scene_from_value(&value, &registry).unwrap();
        let back = scene_from_value(&scene.export(), &registry).unwrap();
        let sphere = &back.primitives[0];
        assert!(sphere
            .material()
            .color
            .approx_eq(Color::new(0.2, 0.4, 0.8), 1e-12));
        let hit = sphere
            .hit(&Ray::new(Point3::new(-5.0, 2.0, 3.0), Vec3::unit_x()), 0.0, f64::INFINITY)
            .unwrap();
        assert!((hit.distance - 5.25).abs() < 1e-12);
    }

    #[test]
    fn primitive_groups_load_in_file_order() {
        let text = r#"{"primitives": {
            "spheres": [{"x": 0, "y": 0, "z": 0, "radius": 1}],
            "planes": [{"x": 0, "y": -1, "z": 0, "nx": 0, "ny": 1, "nz": 0}],
            "boxes": [{"x": 0, "y": 0, "z": 0, "width": 1, "height": 1, "depth": 1}]
        }}"#;
        let value: Value = serde_json::from_str(text).unwrap();
        let scene = scene_from_value(&value, &Registry::with_builtins()).unwrap();
        let names: Vec<&str> = scene.primitives.iter().map(|p| p.type_name()).collect();
        assert_eq!(names, ["sphere", "plane", "box"]);
    }

    #[rstest]
    #[case::boxes("boxes", json!({"x": 0, "y": 0, "z": 0, "width": 2, "height": 2, "depth": 2}), "box")]
    #[case::toruses(
        "toruses",
        json!({"x": 0, "y": 0, "z": 0, "ax": 0, "ay": 1, "az": 0, "majorRadius": 2, "minorRadius": 0.5}),
        "torus"
    )]
    #[case::triangles(
        "triangles",
        json!({"v1x": 0, "v1y": 0, "v1z": 0, "v2x": 1, "v2y": 0, "v2z": 0, "v3x": 0, "v3y": 1, "v3z": 0}),
        "triangle"
    )]
    #[case::infinite_cylinders(
        "infinitecylinders",
        json!({"x": 0, "y": 0, "z": 0, "ax": 0, "ay": 1, "az": 0, "radius": 1}),
        "infinitecylinder"
    )]
    #[case::infinite_cones(
        "infinitecones",
        json!({"x": 0, "y": 0, "z": 0, "ax": 0, "ay": 1, "az": 0, "angle": 30}),
        "infinitecone"
    )]
    fn plural_group_keys_resolve(#[case] key: &str, #[case] entry: Value, #[case] type_name: &str) {
        let value = json!({"primitives": {key: [entry]}});
        let registry = Registry::with_builtins();
        let scene = scene_from_value(&value, &registry).unwrap();
        assert_eq!(scene.primitives.len(), 1);
        assert_eq!(scene.primitives[0].type_name(), type_name);

        let back = scene_from_value(&scene.export(), &registry).unwrap();
        assert_eq!(back.primitives[0].type_name(), type_name);
    }

    fn pair_of_spheres(material: Option<Value>) -> Value {
        let mut composite = json!({"primitives": {"spheres": [
            {"x": 0, "y": 0, "z": 0, "radius": 1, "material": {"color": {"r": 255, "g": 0, "b": 0}}},
            {"x": 0, "y": 0, "z": -4, "radius": 1}
        ]}});
        if let Some(m) = material {
            composite["material"] = m;
        }
        json!({"primitives": {"composites": [composite]}})
    }

    #[test]
    fn composite_children_come_from_the_nested_group() {
        let registry = Registry::with_builtins();
        let scene = scene_from_value(&pair_of_spheres(None), &registry).unwrap();
        assert_eq!(scene.primitives.len(), 1);
        assert_eq!(scene.primitives[0].type_name(), "composite");

        let ray = Ray::new(Point3::new(0.0, 0.0, 10.0), -Vec3::unit_z());
        let hit = scene.trace(&ray).unwrap();
        assert!((hit.distance - 9.0).abs() < 1e-12);
        assert!(hit.primitive.material().color.approx_eq(Color::new(1.0, 0.0, 0.0), 1e-12));

        let back = scene_from_value(&scene.export(), &registry).unwrap();
        assert_eq!(back.export(), scene.export());
    }

    #[test]
    fn composite_material_overrides_its_children() {
        let registry = Registry::with_builtins();
        let green = json!({"color": {"r": 0, "g": 255, "b": 0}});
        let scene = scene_from_value(&pair_of_spheres(Some(green)), &registry).unwrap();
        let ray = Ray::new(Point3::new(0.0, 0.0, 10.0), -Vec3::unit_z());
        let hit = scene.trace(&ray).unwrap();
        assert!(hit.primitive.material().color.approx_eq(Color::new(0.0, 1.0, 0.0), 1e-12));
    }

    #[test]
    fn composite_rotation_reaches_the_children() {
        let mut value = pair_of_spheres(None);
        value["primitives"]["composites"][0]["rotation"] = json!({"x": 0, "y": 90, "z": 0});
        let scene = scene_from_value(&value, &Registry::with_builtins()).unwrap();
        // The sphere at z = -4 swings onto the X axis.
        let along_x = Ray::new(Point3::new(-10.0, 0.0, 0.0), Vec3::unit_x());
        let hit = scene.trace(&along_x).unwrap();
        assert!((hit.distance - 5.0).abs() < 1e-9, "{}", hit.distance);
    }

    #[test]
    fn composite_without_children_is_skipped() {
        let value = json!({"primitives": {"composites": [{"x": 0}]}});
        let scene = scene_from_value(&value, &Registry::with_builtins()).unwrap();
        assert!(scene.primitives.is_empty());
    }

    #[test]
    fn bad_material_texture_skips_the_primitive() {
        let value = json!({"primitives": {"spheres": [
            {"x": 0, "y": 0, "z": 0, "radius": 1, "material": {"texture": {"type": "marble"}}}
        ]}});
        let scene = scene_from_value(&value, &Registry::with_builtins()).unwrap();
        assert!(scene.primitives.is_empty());
    }

    #[test]
    fn bundled_demo_scene_loads_completely() {
        let value: Value = serde_json::from_str(include_str!("../scenes/demo.json")).unwrap();
        let scene = scene_from_value(&value, &Registry::with_builtins()).unwrap();
        assert_eq!(scene.primitives.len(), 7);
        assert_eq!(scene.lights.len(), 2);
        assert_eq!(scene.shaders.len(), 1);
        assert_eq!(scene.samples_per_pixel(), Some(4));
        assert_eq!((scene.camera.width, scene.camera.height), (320, 200));
    }
}
