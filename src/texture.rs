//! Procedural textures a [`Material`](crate::material::Material) can carry
//! instead of a flat color.
//!
//! Both kinds blend between a primary and a secondary color at the hit's
//! [`Uv`] coordinates. A material group selects one with a nested group:
//!
//! ```json
//! "material": {"texture": {"type": "chessboard", "scale": 4,
//!                          "color1": {"r": 255, "g": 255, "b": 255},
//!                          "color2": {"r": 0, "g": 0, "b": 0}}}
//! ```

use crate::error::{ConfigError, Family};
use crate::math::{Color, Uv};
use crate::setting::{self, Setting};
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Texture {
    Chessboard(Chessboard),
    Perlin(PerlinNoise),
}

impl Texture {
    pub fn color_at(&self, uv: Uv) -> Color {
        match self {
            Texture::Chessboard(t) => t.color_at(uv),
            Texture::Perlin(t) => t.color_at(uv),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Texture::Chessboard(_) => Chessboard::TYPE_NAME,
            Texture::Perlin(_) => PerlinNoise::TYPE_NAME,
        }
    }

    /// Reads a `texture` group. Colors are in 0–255 units.
    pub fn from_setting(group: &Setting) -> Result<Self, ConfigError> {
        let type_name = group.get("type").and_then(Value::as_str).unwrap_or(Chessboard::TYPE_NAME);
        let primary = setting::get_rgb(group, "color1", 255.0, 255.0).unwrap_or(Color::ones());
        let secondary = setting::get_rgb(group, "color2", 255.0, 0.0).unwrap_or(Color::zero());
        let scale = setting::get_f64(group, "scale").unwrap_or(1.0);
        match type_name {
            Chessboard::TYPE_NAME => Ok(Texture::Chessboard(Chessboard {
                primary,
                secondary,
                scale,
            })),
            PerlinNoise::TYPE_NAME => {
                let persistence = setting::get_f64(group, "persistence").unwrap_or(0.5);
                let octaves = setting::get_f64(group, "octaves").unwrap_or(6.0).max(1.0) as u32;
                let seed = setting::get_f64(group, "seed").unwrap_or(42.0).max(0.0) as u64;
                Ok(Texture::Perlin(
                    PerlinNoise::new(primary, secondary, scale, seed)
                        .persistence(persistence)
                        .octaves(octaves),
                ))
            }
            other => Err(ConfigError::UnknownType {
                family: Family::Texture,
                name: other.to_owned(),
            }),
        }
    }

    /// Writes a `texture` group into `setting`.
    pub fn export_params(&self, setting: &mut Setting) {
        let mut group = Setting::new();
        setting::put_str(&mut group, "type", self.type_name());
        let (primary, secondary, scale) = match self {
            Texture::Chessboard(t) => (t.primary, t.secondary, t.scale),
            Texture::Perlin(t) => (t.primary, t.secondary, t.scale),
        };
        setting::put_rgb(&mut group, "color1", primary, 255.0);
        setting::put_rgb(&mut group, "color2", secondary, 255.0);
        setting::put_f64(&mut group, "scale", scale);
        if let Texture::Perlin(t) = self {
            setting::put_f64(&mut group, "persistence", t.persistence);
            setting::put_f64(&mut group, "octaves", f64::from(t.octaves));
            setting::put_f64(&mut group, "seed", t.seed as f64);
        }
        setting.insert("texture".to_owned(), Value::Object(group));
    }
}

// ─── Chessboard ─────────────────────────────────────────────────────────────

/// Alternating squares of side `1 / scale` in UV space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Chessboard {
    pub primary: Color,
    pub secondary: Color,
    pub scale: f64,
}

impl Chessboard {
    pub const TYPE_NAME: &'static str = "chessboard";

    pub fn color_at(&self, uv: Uv) -> Color {
        if self.scale <= 0.0 {
            return self.primary;
        }
        let x = (uv.u * self.scale).floor() as i64;
        let y = (uv.v * self.scale).floor() as i64;
        if (x + y).rem_euclid(2) == 0 {
            self.primary
        } else {
            self.secondary
        }
    }
}

// ─── Perlin Noise ───────────────────────────────────────────────────────────

const PERM_SIZE: usize = 256;

/// Turbulence built from summed octaves of gradient noise.
#[derive(Debug, Clone, PartialEq)]
pub struct PerlinNoise {
    pub primary: Color,
    pub secondary: Color,
    pub scale: f64,
    pub persistence: f64,
    pub octaves: u32,
    seed: u64,
    /// The shuffled table, repeated once so lookups never wrap.
    perm: Vec<usize>,
}

impl PerlinNoise {
    pub const TYPE_NAME: &'static str = "perlin";

    /// Six octaves at persistence 0.5; the permutation is fixed by `seed`.
    pub fn new(primary: Color, secondary: Color, scale: f64, seed: u64) -> Self {
        let mut table: Vec<usize> = (0..PERM_SIZE).collect();
        table.shuffle(&mut SmallRng::seed_from_u64(seed));
        let perm = table.iter().chain(table.iter()).copied().collect();
        Self {
            primary,
            secondary,
            scale,
            persistence: 0.5,
            octaves: 6,
            seed,
            perm,
        }
    }

    pub fn persistence(mut self, persistence: f64) -> Self {
        self.persistence = persistence;
        self
    }

    pub fn octaves(mut self, octaves: u32) -> Self {
        self.octaves = octaves.max(1);
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn color_at(&self, uv: Uv) -> Color {
        let n = self.turbulence(uv.u * self.scale, uv.v * self.scale, 0.0);
        self.primary.lerp(self.secondary, n)
    }

    /// Mean absolute noise over the octaves, in `[0, 1]`.
    pub fn turbulence(&self, x: f64, y: f64, z: f64) -> f64 {
        let mut total = 0.0;
        let mut max_value = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = 1.0;
        for _ in 0..self.octaves.max(1) {
            total += self.noise(x * frequency, y * frequency, z * frequency).abs() * amplitude;
            max_value += amplitude;
            amplitude *= self.persistence;
            frequency *= 2.0;
        }
        if max_value > 0.0 {
            (total / max_value).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Improved gradient noise in roughly `[-1, 1]`; zero at lattice points.
    pub fn noise(&self, x: f64, y: f64, z: f64) -> f64 {
        let cell = |v: f64| (v.floor() as i64).rem_euclid(PERM_SIZE as i64) as usize;
        let (xi, yi, zi) = (cell(x), cell(y), cell(z));
        let (x, y, z) = (x - x.floor(), y - y.floor(), z - z.floor());
        let (u, v, w) = (fade(x), fade(y), fade(z));

        let p = &self.perm;
        let a = p[xi] + yi;
        let aa = p[a] + zi;
        let ab = p[a + 1] + zi;
        let b = p[xi + 1] + yi;
        let ba = p[b] + zi;
        let bb = p[b + 1] + zi;

        lerp(
            w,
            lerp(
                v,
                lerp(u, grad(p[aa], x, y, z), grad(p[ba], x - 1.0, y, z)),
                lerp(u, grad(p[ab], x, y - 1.0, z), grad(p[bb], x - 1.0, y - 1.0, z)),
            ),
            lerp(
                v,
                lerp(u, grad(p[aa + 1], x, y, z - 1.0), grad(p[ba + 1], x - 1.0, y, z - 1.0)),
                lerp(
                    u,
                    grad(p[ab + 1], x, y - 1.0, z - 1.0),
                    grad(p[bb + 1], x - 1.0, y - 1.0, z - 1.0),
                ),
            ),
        )
    }
}

#[inline(always)]
fn fade(t: f64) -> f64 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

#[inline(always)]
fn lerp(t: f64, a: f64, b: f64) -> f64 {
    a + t * (b - a)
}

fn grad(hash: usize, x: f64, y: f64, z: f64) -> f64 {
    let h = hash & 15;
    let u = if h < 8 { x } else { y };
    let v = if h < 4 {
        y
    } else if h == 12 || h == 14 {
        x
    } else {
        z
    };
    (if h & 1 == 0 { u } else { -u }) + (if h & 2 == 0 { v } else { -v })
}
