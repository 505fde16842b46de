use std::fmt;
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub};

/// A 3-component vector used for positions, directions, and colors in the ray tracer.
///
/// Points and colors share the representation (see [`Point3`] and [`Color`]); the
/// arithmetic is the same and the aliases only document intent at call sites.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

pub type Point3 = Vec3;
pub type Color = Vec3;

impl Vec3 {
    #[inline(always)]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[inline(always)]
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    #[inline(always)]
    pub const fn ones() -> Self {
        Self::new(1.0, 1.0, 1.0)
    }

    #[inline(always)]
    pub const fn splat(v: f64) -> Self {
        Self::new(v, v, v)
    }

    #[inline(always)]
    pub const fn unit_x() -> Self {
        Self::new(1.0, 0.0, 0.0)
    }

    #[inline(always)]
    pub const fn unit_y() -> Self {
        Self::new(0.0, 1.0, 0.0)
    }

    #[inline(always)]
    pub const fn unit_z() -> Self {
        Self::new(0.0, 0.0, 1.0)
    }

    #[inline(always)]
    pub fn length_squared(self) -> f64 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    #[inline(always)]
    pub fn length(self) -> f64 {
        self.length_squared().sqrt()
    }

    /// Returns the unit vector, or the zero vector unchanged when the length is zero.
    #[inline(always)]
    pub fn normalized(self) -> Self {
        let len = self.length();
        if len > 0.0 {
            self / len
        } else {
            self
        }
    }

    #[inline(always)]
    pub fn dot(self, rhs: Self) -> f64 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    #[inline(always)]
    pub fn cross(self, rhs: Self) -> Self {
        Self::new(
            self.y * rhs.z - self.z * rhs.y,
            self.z * rhs.x - self.x * rhs.z,
            self.x * rhs.y - self.y * rhs.x,
        )
    }

    /// Specular reflection of `self` about the surface normal `n`.
    /// Implements the GLSL `reflect` formula: I - 2·dot(I, N)·N
    #[inline(always)]
    pub fn reflect(self, normal: Self) -> Self {
        self - normal * 2.0 * self.dot(normal)
    }

    /// Component-wise (Hadamard) product. Lights and filters tint a surface
    /// color this way.
    #[inline(always)]
    pub fn hadamard(self, rhs: Self) -> Self {
        Self::new(self.x * rhs.x, self.y * rhs.y, self.z * rhs.z)
    }

    /// Component-wise linear interpolation: self·(1-t) + other·t
    #[inline(always)]
    pub fn lerp(self, other: Self, t: f64) -> Self {
        self * (1.0 - t) + other * t
    }

    /// Clamps each component to [0, 1].
    #[inline(always)]
    pub fn saturate(self) -> Self {
        Self::new(
            self.x.clamp(0.0, 1.0),
            self.y.clamp(0.0, 1.0),
            self.z.clamp(0.0, 1.0),
        )
    }

    /// Clamps each component from above only.
    #[inline(always)]
    pub fn min_one(self) -> Self {
        Self::new(self.x.min(1.0), self.y.min(1.0), self.z.min(1.0))
    }

    /// Applies the sRGB gamma curve (γ = 2.2 approximated as sqrt). Negative
    /// channels are floored at zero first so the sqrt stays finite.
    #[inline(always)]
    pub fn gamma_correct(self) -> Self {
        Self::new(
            self.x.max(0.0).sqrt(),
            self.y.max(0.0).sqrt(),
            self.z.max(0.0).sqrt(),
        )
    }

    /// Converts a [0,1] color to an 8-bit RGB triple.
    pub fn to_rgb8(self) -> (u8, u8, u8) {
        let c = self.saturate();
        (
            (c.x * 255.999) as u8,
            (c.y * 255.999) as u8,
            (c.z * 255.999) as u8,
        )
    }

    /// Two unit vectors that together with `self` (assumed unit length) form a
    /// right-handed orthonormal frame.
    pub fn tangent_frame(self) -> (Self, Self) {
        let helper = if self.x.abs() > 0.9 {
            Self::unit_y()
        } else {
            Self::unit_x()
        };
        let tangent = helper.cross(self).normalized();
        (tangent, self.cross(tangent))
    }

    /// True when every component is within `eps` of `other`.
    pub fn approx_eq(self, other: Self, eps: f64) -> bool {
        (self.x - other.x).abs() <= eps
            && (self.y - other.y).abs() <= eps
            && (self.z - other.z).abs() <= eps
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3}, {:.3})", self.x, self.y, self.z)
    }
}

impl Neg for Vec3 {
    type Output = Self;
    #[inline(always)]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl Add for Vec3 {
    type Output = Self;
    #[inline(always)]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vec3 {
    #[inline(always)]
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
        self.z += rhs.z;
    }
}

impl Sub for Vec3 {
    type Output = Self;
    #[inline(always)]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Self;
    #[inline(always)]
    fn mul(self, t: f64) -> Self {
        Self::new(self.x * t, self.y * t, self.z * t)
    }
}

impl Mul<Vec3> for f64 {
    type Output = Vec3;
    #[inline(always)]
    fn mul(self, v: Vec3) -> Vec3 {
        v * self
    }
}

impl MulAssign<f64> for Vec3 {
    #[inline(always)]
    fn mul_assign(&mut self, t: f64) {
        self.x *= t;
        self.y *= t;
        self.z *= t;
    }
}

impl Div<f64> for Vec3 {
    type Output = Self;
    #[inline(always)]
    fn div(self, t: f64) -> Self {
        let inv = 1.0 / t;
        Self::new(self.x * inv, self.y * inv, self.z * inv)
    }
}

impl DivAssign<f64> for Vec3 {
    #[inline(always)]
    fn div_assign(&mut self, t: f64) {
        let inv = 1.0 / t;
        self.x *= inv;
        self.y *= inv;
        self.z *= inv;
    }
}

// ─── Surface Coordinates ────────────────────────────────────────────────────

/// Texture coordinates of a surface point. Closed surfaces wrap into
/// `[0, 1)`; planes and infinite primitives report unbounded values.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Uv {
    pub u: f64,
    pub v: f64,
}

impl Uv {
    #[inline(always)]
    pub const fn new(u: f64, v: f64) -> Self {
        Self { u, v }
    }
}

// ─── Axis Rotations ─────────────────────────────────────────────────────────

/// Right-handed rotation of `v` about the X axis by `degrees`.
pub fn rotate_x(v: Vec3, degrees: f64) -> Vec3 {
    let (s, c) = degrees.to_radians().sin_cos();
    Vec3::new(v.x, v.y * c - v.z * s, v.y * s + v.z * c)
}

/// Right-handed rotation of `v` about the Y axis by `degrees`.
pub fn rotate_y(v: Vec3, degrees: f64) -> Vec3 {
    let (s, c) = degrees.to_radians().sin_cos();
    Vec3::new(v.x * c + v.z * s, v.y, -v.x * s + v.z * c)
}

/// Right-handed rotation of `v` about the Z axis by `degrees`.
pub fn rotate_z(v: Vec3, degrees: f64) -> Vec3 {
    let (s, c) = degrees.to_radians().sin_cos();
    Vec3::new(v.x * c - v.y * s, v.x * s + v.y * c, v.z)
}

/// Cumulative per-axis rotation of a primitive, in degrees.
///
/// Rotations are never baked into geometry. Instead, `hit` moves the incoming
/// ray into the primitive's unrotated frame with [`Rotation::to_local`] (Z, then
/// Y, then X, each negated) and brings the normal back with
/// [`Rotation::to_world`] (X, then Y, then Z).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rotation {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Rotation {
    #[inline(always)]
    pub fn is_identity(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }

    pub fn to_local(&self, ray: &Ray) -> Ray {
        if self.is_identity() {
            return *ray;
        }
        let mut origin = ray.origin;
        let mut direction = ray.direction;
        if self.z != 0.0 {
            origin = rotate_z(origin, -self.z);
            direction = rotate_z(direction, -self.z);
        }
        if self.y != 0.0 {
            origin = rotate_y(origin, -self.y);
            direction = rotate_y(direction, -self.y);
        }
        if self.x != 0.0 {
            origin = rotate_x(origin, -self.x);
            direction = rotate_x(direction, -self.x);
        }
        Ray::new(origin, direction)
    }

    pub fn to_world(&self, mut v: Vec3) -> Vec3 {
        if self.x != 0.0 {
            v = rotate_x(v, self.x);
        }
        if self.y != 0.0 {
            v = rotate_y(v, self.y);
        }
        if self.z != 0.0 {
            v = rotate_z(v, self.z);
        }
        v
    }
}

// ─── Ray ────────────────────────────────────────────────────────────────────

/// A parametric ray R(t) = origin + t · direction.
///
/// The direction is usually, but not necessarily, unit length; intersection
/// code divides by `direction · direction` rather than assuming it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Point3,
    pub direction: Vec3,
}

impl Ray {
    #[inline(always)]
    pub const fn new(origin: Point3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    #[inline(always)]
    pub fn at(self, t: f64) -> Point3 {
        self.origin + self.direction * t
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn normalizing_zero_vector_yields_zero() {
        assert_eq!(Vec3::zero().normalized(), Vec3::zero());
    }

    #[test]
    fn normalized_has_unit_length() {
        let v = Vec3::new(3.0, -4.0, 12.0).normalized();
        assert!((v.length() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn cross_follows_right_hand_rule() {
        assert_eq!(Vec3::unit_x().cross(Vec3::unit_y()), Vec3::unit_z());
    }

    #[rstest]
    #[case::x(rotate_x(Vec3::unit_y(), 90.0), Vec3::unit_z())]
    #[case::y(rotate_y(Vec3::unit_z(), 90.0), Vec3::unit_x())]
    #[case::z(rotate_z(Vec3::unit_x(), 90.0), Vec3::unit_y())]
    fn quarter_turns(#[case] rotated: Vec3, #[case] expected: Vec3) {
        assert!(rotated.approx_eq(expected, 1e-3), "{rotated} != {expected}");
    }

    #[test]
    fn rotation_round_trips_a_ray() {
        let rotation = Rotation { x: 30.0, y: -45.0, z: 10.0 };
        let ray = Ray::new(Point3::new(1.0, 2.0, 3.0), Vec3::new(0.0, 0.0, -1.0));
        let local = rotation.to_local(&ray);
        assert!(rotation.to_world(local.direction).approx_eq(ray.direction, 1e-9));
        assert!(rotation.to_world(local.origin).approx_eq(ray.origin, 1e-9));
    }

    #[test]
    fn identity_rotation_leaves_ray_alone() {
        let ray = Ray::new(Point3::new(1.0, 2.0, 3.0), Vec3::unit_x());
        assert_eq!(Rotation::default().to_local(&ray), ray);
    }

    #[rstest]
    #[case(Vec3::unit_x())]
    #[case(Vec3::unit_y())]
    #[case(Vec3::new(1.0, -2.0, 0.5).normalized())]
    fn tangent_frame_is_orthonormal(#[case] axis: Vec3) {
        let (t, b) = axis.tangent_frame();
        assert!((t.length() - 1.0).abs() < 1e-12);
        assert!((b.length() - 1.0).abs() < 1e-12);
        assert!(t.dot(axis).abs() < 1e-12 && b.dot(axis).abs() < 1e-12 && t.dot(b).abs() < 1e-12);
        assert!(t.cross(b).approx_eq(axis, 1e-12));
    }

    #[test]
    fn min_one_only_clamps_above() {
        assert_eq!(
            Vec3::new(1.5, 0.25, -0.5).min_one(),
            Vec3::new(1.0, 0.25, -0.5)
        );
    }
}
