//! Helpers over the structured configuration tree.
//!
//! Scene import and export both go through [`serde_json::Value`]: groups are
//! objects, lists are arrays, and leaves are numbers, strings or booleans.
//! Every exportable entity writes itself into a [`Setting`] group with the
//! helpers below, and the loader reads the same shapes back.

use crate::error::ConfigError;
use crate::math::{Color, Vec3};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A single group of named settings.
pub type Setting = Map<String, Value>;

/// Flat named parameters handed to registry constructors.
pub type Params = BTreeMap<String, f64>;

pub fn put_f64(setting: &mut Setting, key: &str, value: f64) {
    setting.insert(key.to_owned(), Value::from(value));
}

pub fn put_str(setting: &mut Setting, key: &str, value: &str) {
    setting.insert(key.to_owned(), Value::from(value));
}

/// Writes `v` as flat keys, e.g. `("ax", "ay", "az")`.
pub fn put_flat_vec(setting: &mut Setting, keys: [&str; 3], v: Vec3) {
    put_f64(setting, keys[0], v.x);
    put_f64(setting, keys[1], v.y);
    put_f64(setting, keys[2], v.z);
}

/// Writes `v` as a `{x, y, z}` group.
pub fn put_xyz(setting: &mut Setting, key: &str, v: Vec3) {
    let mut group = Setting::new();
    put_flat_vec(&mut group, ["x", "y", "z"], v);
    setting.insert(key.to_owned(), Value::Object(group));
}

/// Writes a [0,1] color as an `{r, g, b}` group scaled by `scale`.
pub fn put_rgb(setting: &mut Setting, key: &str, color: Color, scale: f64) {
    let mut group = Setting::new();
    put_flat_vec(&mut group, ["r", "g", "b"], color * scale);
    setting.insert(key.to_owned(), Value::Object(group));
}

pub fn get_f64(setting: &Setting, key: &str) -> Option<f64> {
    setting.get(key).and_then(Value::as_f64)
}

pub fn get_group<'a>(setting: &'a Setting, key: &str) -> Option<&'a Setting> {
    setting.get(key).and_then(Value::as_object)
}

/// Reads an `{x, y, z}` group; missing components default to zero.
pub fn get_xyz(setting: &Setting, key: &str) -> Option<Vec3> {
    get_group(setting, key).map(|g| {
        Vec3::new(
            get_f64(g, "x").unwrap_or(0.0),
            get_f64(g, "y").unwrap_or(0.0),
            get_f64(g, "z").unwrap_or(0.0),
        )
    })
}

/// Reads an `{r, g, b}` group divided by `scale`; missing channels take `default`.
pub fn get_rgb(setting: &Setting, key: &str, scale: f64, default: f64) -> Option<Color> {
    get_group(setting, key).map(|g| {
        Color::new(
            get_f64(g, "r").unwrap_or(default) / scale,
            get_f64(g, "g").unwrap_or(default) / scale,
            get_f64(g, "b").unwrap_or(default) / scale,
        )
    })
}

/// Collects every top-level numeric entry of `setting` into flat parameters.
/// Nested groups, lists and strings are left for the caller.
pub fn flat_params(setting: &Setting) -> Params {
    setting
        .iter()
        .filter_map(|(key, value)| value.as_f64().map(|v| (key.clone(), v)))
        .collect()
}

/// Looks up a required parameter for constructing `type_name`.
pub fn require(params: &Params, type_name: &str, key: &str) -> Result<f64, ConfigError> {
    params
        .get(key)
        .copied()
        .ok_or_else(|| ConfigError::MissingParameter {
            type_name: type_name.to_owned(),
            param: key.to_owned(),
        })
}

/// Looks up three required parameters as a vector.
pub fn require_vec(params: &Params, type_name: &str, keys: [&str; 3]) -> Result<Vec3, ConfigError> {
    Ok(Vec3::new(
        require(params, type_name, keys[0])?,
        require(params, type_name, keys[1])?,
        require(params, type_name, keys[2])?,
    ))
}

pub fn optional(params: &Params, key: &str, default: f64) -> f64 {
    params.get(key).copied().unwrap_or(default)
}
