use crate::math::*;
use crate::setting::{self, Setting};
use serde_json::Value;

/// A pinhole look-at camera. An orthonormal basis (u, v, w) is built from
/// the look-at parameters, and primary rays run from the eye through points
/// on a virtual film plane one unit in front of it.
#[derive(Debug, Clone)]
pub struct Camera {
    origin: Point3,
    lower_left: Point3,
    horizontal: Vec3,
    vertical: Vec3,
}

/// Camera placement as stored in a scene. The resolution is the scene's
/// preferred output size; the renderer may override it.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraConfig {
    pub look_from: Point3,
    pub look_at: Point3,
    pub vup: Vec3,
    pub vfov_degrees: f64,
    pub width: u32,
    pub height: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            look_from: Point3::new(0.0, 0.0, 5.0),
            look_at: Point3::zero(),
            vup: Vec3::unit_y(),
            vfov_degrees: 60.0,
            width: 400,
            height: 300,
        }
    }
}

impl CameraConfig {
    /// Writes a `camera` group:
    /// `{resolution: {width, height}, position, lookAt, fieldOfView}`.
    pub fn export_params(&self, setting: &mut Setting) {
        let mut group = Setting::new();
        let mut resolution = Setting::new();
        setting::put_f64(&mut resolution, "width", f64::from(self.width));
        setting::put_f64(&mut resolution, "height", f64::from(self.height));
        group.insert("resolution".to_owned(), Value::Object(resolution));
        setting::put_xyz(&mut group, "position", self.look_from);
        setting::put_xyz(&mut group, "lookAt", self.look_at);
        setting::put_f64(&mut group, "fieldOfView", self.vfov_degrees);
        setting.insert("camera".to_owned(), Value::Object(group));
    }

    /// Reads the group written by [`CameraConfig::export_params`]. Missing
    /// entries keep their defaults.
    pub fn from_setting(group: &Setting) -> Self {
        let mut config = Self::default();
        if let Some(resolution) = setting::get_group(group, "resolution") {
            if let Some(w) = setting::get_f64(resolution, "width") {
                config.width = w.max(1.0) as u32;
            }
            if let Some(h) = setting::get_f64(resolution, "height") {
                config.height = h.max(1.0) as u32;
            }
        }
        if let Some(position) = setting::get_xyz(group, "position") {
            config.look_from = position;
        }
        if let Some(look_at) = setting::get_xyz(group, "lookAt") {
            config.look_at = look_at;
        }
        if let Some(fov) = setting::get_f64(group, "fieldOfView") {
            config.vfov_degrees = fov;
        }
        config
    }
}

impl Camera {
    /// Builds the camera for an image of the given aspect ratio:
    ///   w = normalize(look_from - look_at)   (points backward)
    ///   u = normalize(vup × w)               (points right)
    ///   v = w × u                            (points up)
    pub fn new(config: &CameraConfig, aspect_ratio: f64) -> Self {
        let theta = config.vfov_degrees.to_radians();
        let viewport_height = 2.0 * (theta / 2.0).tan();
        let viewport_width = aspect_ratio * viewport_height;

        let w = (config.look_from - config.look_at).normalized();
        let u = config.vup.cross(w).normalized();
        let v = w.cross(u);

        let horizontal = u * viewport_width;
        let vertical = v * viewport_height;
        let lower_left = config.look_from - horizontal / 2.0 - vertical / 2.0 - w;

        Camera {
            origin: config.look_from,
            lower_left,
            horizontal,
            vertical,
        }
    }

    /// Primary ray through film coordinates `(s, t)` in [0,1]², with `t = 0`
    /// at the bottom edge. The direction is unit length.
    pub fn get_ray(&self, s: f64, t: f64) -> Ray {
        let target = self.lower_left + self.horizontal * s + self.vertical * t;
        Ray::new(self.origin, (target - self.origin).normalized())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn center_ray_points_at_target() {
        let camera = Camera::new(&CameraConfig::default(), 4.0 / 3.0);
        let ray = camera.get_ray(0.5, 0.5);
        assert_eq!(ray.origin, Point3::new(0.0, 0.0, 5.0));
        assert!(ray.direction.approx_eq(-Vec3::unit_z(), 1e-12));
    }

    #[test]
    fn corners_follow_field_of_view() {
        let config = CameraConfig {
            vfov_degrees: 90.0,
            ..CameraConfig::default()
        };
        let camera = Camera::new(&config, 1.0);
        // 90° vertical fov on a unit-distance film: the top edge is 45° up.
        let top = camera.get_ray(0.5, 1.0);
        let expected = Vec3::new(0.0, 1.0, -1.0).normalized();
        assert!(top.direction.approx_eq(expected, 1e-12));
        let right = camera.get_ray(1.0, 0.5);
        assert!(right.direction.x > 0.0);
    }

    #[test]
    fn export_then_read_back() {
        let config = CameraConfig {
            look_from: Point3::new(1.0, 2.0, 3.0),
            look_at: Point3::new(0.0, 1.0, 0.0),
            vfov_degrees: 45.0,
            width: 320,
            height: 200,
            ..CameraConfig::default()
        };
        let mut setting = Setting::new();
        config.export_params(&mut setting);
        let back = CameraConfig::from_setting(setting::get_group(&setting, "camera").unwrap());
        assert_eq!(back, config);
    }
}
