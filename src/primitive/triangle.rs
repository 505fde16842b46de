use super::{export_common, in_range, HitInfo, Primitive};
use crate::error::ConfigError;
use crate::material::SharedMaterial;
use crate::math::*;
use crate::setting::{self, Params, Setting};

const VERTEX_KEYS: [[&str; 3]; 3] = [["v1x", "v1y", "v1z"], ["v2x", "v2y", "v2z"], ["v3x", "v3y", "v3z"]];

/// A single flat triangle, visible from both sides.
#[derive(Debug, Clone)]
pub struct Triangle {
    pub vertices: [Point3; 3],
    pub material: SharedMaterial,
    pub rotation: Rotation,
}

impl Triangle {
    pub const TYPE_NAME: &'static str = "triangle";

    pub fn new(v1: Point3, v2: Point3, v3: Point3, material: SharedMaterial) -> Self {
        Self {
            vertices: [v1, v2, v3],
            material,
            rotation: Rotation::default(),
        }
    }

    pub fn from_params(params: &Params, material: SharedMaterial) -> Result<Self, ConfigError> {
        let [a, b, c] = VERTEX_KEYS;
        Ok(Self::new(
            setting::require_vec(params, Self::TYPE_NAME, a)?,
            setting::require_vec(params, Self::TYPE_NAME, b)?,
            setting::require_vec(params, Self::TYPE_NAME, c)?,
            material,
        ))
    }
}

impl Primitive for Triangle {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    /// Möller–Trumbore. The barycentric weights of the second and third
    /// vertices double as texture coordinates.
    fn hit(&self, ray: &Ray, t_min: f64, t_max: f64) -> Option<HitInfo<'_>> {
        let local = self.rotation.to_local(ray);
        let [v1, v2, v3] = self.vertices;
        let edge1 = v2 - v1;
        let edge2 = v3 - v1;

        let h = local.direction.cross(edge2);
        let det = edge1.dot(h);
        if det.abs() < 1e-12 {
            return None;
        }
        let inv_det = 1.0 / det;
        let s = local.origin - v1;
        let u = inv_det * s.dot(h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }
        let q = s.cross(edge1);
        let v = inv_det * local.direction.dot(q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }
        let t = inv_det * edge2.dot(q);
        if !in_range(t, t_min, t_max) {
            return None;
        }

        let mut normal = edge1.cross(edge2).normalized();
        if normal.dot(local.direction) > 0.0 {
            normal = -normal;
        }
        Some(HitInfo {
            distance: t,
            hit_point: ray.at(t),
            normal: self.rotation.to_world(normal),
            uv: Uv::new(u, v),
            primitive: self,
        })
    }

    fn translate(&mut self, offset: Vec3) {
        for vertex in &mut self.vertices {
            *vertex += offset;
        }
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
        for (keys, vertex) in VERTEX_KEYS.into_iter().zip(self.vertices) {
            setting::put_flat_vec(setting, keys, vertex);
        }
        export_common(setting, &self.material, self.rotation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Material;
    use rstest::rstest;

    /// Right triangle in the z = 0 plane with legs along X and Y.
    fn corner() -> Triangle {
        Triangle::new(
            Point3::zero(),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
            Material::default().shared(),
        )
    }

    fn down_z(x: f64, y: f64) -> Ray {
        Ray::new(Point3::new(x, y, 5.0), -Vec3::unit_z())
    }

    #[rstest]
    #[case::inside(0.5, 0.5, true)]
    #[case::near_hypotenuse(0.99, 0.99, true)]
    #[case::past_hypotenuse(1.01, 1.01, false)]
    #[case::left_of_leg(-0.1, 0.5, false)]
    fn triangle_bounds(#[case] x: f64, #[case] y: f64, #[case] expect_hit: bool) {
        let triangle = corner();
        assert_eq!(triangle.hit(&down_z(x, y), 0.001, f64::INFINITY).is_some(), expect_hit);
    }

    #[test]
    fn normal_faces_the_ray_and_uv_is_barycentric() {
        let triangle = corner();
        let hit = triangle.hit(&down_z(0.5, 1.0), 0.001, f64::INFINITY).unwrap();
        assert!((hit.distance - 5.0).abs() < 1e-12);
        assert!(hit.normal.approx_eq(Vec3::unit_z(), 1e-12));
        assert!((hit.uv.u - 0.25).abs() < 1e-12);
        assert!((hit.uv.v - 0.5).abs() < 1e-12);

        let up = Ray::new(Point3::new(0.5, 0.5, -3.0), Vec3::unit_z());
        let from_below = triangle.hit(&up, 0.001, f64::INFINITY).unwrap();
        assert!(from_below.normal.approx_eq(-Vec3::unit_z(), 1e-12));
    }

    #[test]
    fn edge_on_ray_misses() {
        let ray = Ray::new(Point3::new(-1.0, 0.5, 0.0), Vec3::unit_x());
        assert!(corner().hit(&ray, 0.001, f64::INFINITY).is_none());
    }

    #[test]
    fn translate_moves_every_vertex() {
        let mut triangle = corner();
        triangle.translate(Vec3::new(10.0, 0.0, 0.0));
        assert!(triangle.hit(&down_z(0.5, 0.5), 0.001, f64::INFINITY).is_none());
        assert!(triangle.hit(&down_z(10.5, 0.5), 0.001, f64::INFINITY).is_some());
    }

    #[test]
    fn export_round_trip() {
        let triangle = corner();
        let mut setting = Setting::new();
        triangle.export_params(&mut setting);
        let rebuilt =
            Triangle::from_params(&setting::flat_params(&setting), Material::default().shared()).unwrap();
        assert_eq!(rebuilt.vertices, triangle.vertices);
    }
}
