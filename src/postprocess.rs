//! Full-frame color transforms applied after every pixel has been traced.
//!
//! Each effect maps a `width × height` buffer to a new buffer of the same
//! size and keeps no state between calls. A scene applies its effects in
//! order, so every stage sees the complete output of the one before it.
//! Inside a stage, rows are computed in parallel.

use crate::error::ConfigError;
use crate::math::*;
use crate::setting::{self, Params, Setting};
use rayon::prelude::*;
use std::fmt;

pub trait PostProcess: Send + Sync + fmt::Debug {
    /// `buffer` is row-major, `width * height` long.
    fn process(&self, buffer: &[Color], width: usize, height: usize) -> Vec<Color>;

    fn type_name(&self) -> &'static str;

    fn clone_post_process(&self) -> Box<dyn PostProcess>;

    /// Writes `type` and this effect's parameters.
    fn export_params(&self, setting: &mut Setting);

    /// Rays per pixel requested from the renderer, if this effect cares.
    fn samples_per_pixel(&self) -> Option<u32> {
        None
    }
}

/// Builds a new buffer by evaluating `pixel(x, y)` for every pixel, one
/// rayon task per row.
fn per_pixel<F>(width: usize, height: usize, pixel: F) -> Vec<Color>
where
    F: Fn(usize, usize) -> Color + Sync,
{
    let mut out = vec![Color::zero(); width * height];
    out.par_chunks_mut(width.max(1))
        .enumerate()
        .for_each(|(y, row)| {
            for (x, slot) in row.iter_mut().enumerate() {
                *slot = pixel(x, y);
            }
        });
    out
}

// ─── Blur ───────────────────────────────────────────────────────────────────

/// Gaussian blur with `σ = radius / 3`. Samples falling outside the frame
/// are dropped and the remaining weights renormalized, so edges do not
/// darken.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Blur {
    pub radius: f64,
}

impl Blur {
    pub const TYPE_NAME: &'static str = "blur";

    pub fn new(radius: f64) -> Self {
        Self { radius }
    }

    pub fn from_params(params: &Params) -> Result<Self, ConfigError> {
        Ok(Self::new(setting::require(params, Self::TYPE_NAME, "radius")?))
    }

    /// Row-major `(2·half+1)²` weights.
    fn kernel(&self) -> (isize, Vec<f64>) {
        let size = (2.0 * self.radius + 1.0).ceil() as isize;
        let half = size / 2;
        let sigma = self.radius / 3.0;
        let two_sigma_sq = 2.0 * sigma * sigma;
        let weights = (-half..=half)
            .flat_map(|ky| (-half..=half).map(move |kx| (kx, ky)))
            .map(|(kx, ky)| (-((kx * kx + ky * ky) as f64) / two_sigma_sq).exp())
            .collect();
        (half, weights)
    }
}

impl PostProcess for Blur {
    fn process(&self, buffer: &[Color], width: usize, height: usize) -> Vec<Color> {
        if self.radius <= 0.0 {
            return buffer.to_vec();
        }
        let (half, weights) = self.kernel();
        let side = (2 * half + 1) as usize;
        let (w, h) = (width as isize, height as isize);
        per_pixel(width, height, |x, y| {
            let mut sum = Color::zero();
            let mut total = 0.0;
            for ky in -half..=half {
                let sy = y as isize + ky;
                if sy < 0 || sy >= h {
                    continue;
                }
                for kx in -half..=half {
                    let sx = x as isize + kx;
                    if sx < 0 || sx >= w {
                        continue;
                    }
                    let weight = weights[(ky + half) as usize * side + (kx + half) as usize];
                    sum += buffer[sy as usize * width + sx as usize] * weight;
                    total += weight;
                }
            }
            if total > 0.0 {
                sum / total
            } else {
                buffer[y * width + x]
            }
        })
    }

    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn clone_post_process(&self) -> Box<dyn PostProcess> {
        Box::new(*self)
    }

    fn export_params(&self, setting: &mut Setting) {
        setting::put_str(setting, "type", Self::TYPE_NAME);
        setting::put_f64(setting, "radius", self.radius);
    }
}

// ─── Grayscale / Negative ───────────────────────────────────────────────────

/// Blends each pixel towards its Rec. 601 luma by `intensity`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grayscale {
    pub intensity: f64,
}

impl Grayscale {
    pub const TYPE_NAME: &'static str = "grayscale";

    pub fn new(intensity: f64) -> Self {
        Self { intensity }
    }

    pub fn from_params(params: &Params) -> Result<Self, ConfigError> {
        Ok(Self::new(setting::require(params, Self::TYPE_NAME, "intensity")?))
    }
}

pub fn luma(c: Color) -> f64 {
    0.299 * c.x + 0.587 * c.y + 0.114 * c.z
}

impl PostProcess for Grayscale {
    fn process(&self, buffer: &[Color], width: usize, height: usize) -> Vec<Color> {
        per_pixel(width, height, |x, y| {
            let c = buffer[y * width + x];
            c.lerp(Color::splat(luma(c)), self.intensity)
        })
    }

    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn clone_post_process(&self) -> Box<dyn PostProcess> {
        Box::new(*self)
    }

    fn export_params(&self, setting: &mut Setting) {
        setting::put_str(setting, "type", Self::TYPE_NAME);
        setting::put_f64(setting, "intensity", self.intensity);
    }
}

/// Blends each pixel towards its inverse `1 - c` by `intensity`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Negative {
    pub intensity: f64,
}

impl Negative {
    pub const TYPE_NAME: &'static str = "negative";

    pub fn new(intensity: f64) -> Self {
        Self { intensity }
    }

    pub fn from_params(params: &Params) -> Result<Self, ConfigError> {
        Ok(Self::new(setting::require(params, Self::TYPE_NAME, "intensity")?))
    }
}

impl PostProcess for Negative {
    fn process(&self, buffer: &[Color], width: usize, height: usize) -> Vec<Color> {
        per_pixel(width, height, |x, y| {
            let c = buffer[y * width + x];
            c.lerp(Color::ones() - c, self.intensity)
        })
    }

    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn clone_post_process(&self) -> Box<dyn PostProcess> {
        Box::new(*self)
    }

    fn export_params(&self, setting: &mut Setting) {
        setting::put_str(setting, "type", Self::TYPE_NAME);
        setting::put_f64(setting, "intensity", self.intensity);
    }
}

// ─── Chromatic aberration ───────────────────────────────────────────────────

/// Splits the red and blue channels apart radially. Red samples outward from
/// the frame center, blue inward, by `|d|·strength·d` pixels where `d` is the
/// pixel's position normalized to [-1, 1]. Green stays put.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChromaticAberration {
    pub strength: f64,
}

impl ChromaticAberration {
    pub const TYPE_NAME: &'static str = "chromatic_aberration";

    pub fn new(strength: f64) -> Self {
        Self { strength }
    }

    pub fn from_params(params: &Params) -> Result<Self, ConfigError> {
        Ok(Self::new(setting::require(params, Self::TYPE_NAME, "strength")?))
    }
}

impl PostProcess for ChromaticAberration {
    fn process(&self, buffer: &[Color], width: usize, height: usize) -> Vec<Color> {
        let cx = width as f64 / 2.0;
        let cy = height as f64 / 2.0;
        let (max_x, max_y) = (width as isize - 1, height as isize - 1);
        let sample = |x: isize, y: isize| {
            buffer[y.clamp(0, max_y) as usize * width + x.clamp(0, max_x) as usize]
        };
        per_pixel(width, height, |x, y| {
            let dir_x = (x as f64 - cx) / cx;
            let dir_y = (y as f64 - cy) / cy;
            let offset = dir_x.hypot(dir_y) * self.strength;
            // `as` truncates toward zero.
            let dx = (offset * dir_x) as isize;
            let dy = (offset * dir_y) as isize;
            let (x, y) = (x as isize, y as isize);
            Color::new(
                sample(x + dx, y + dy).x,
                sample(x, y).y,
                sample(x - dx, y - dy).z,
            )
        })
    }

    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn clone_post_process(&self) -> Box<dyn PostProcess> {
        Box::new(*self)
    }

    fn export_params(&self, setting: &mut Setting) {
        setting::put_str(setting, "type", Self::TYPE_NAME);
        setting::put_f64(setting, "strength", self.strength);
    }
}

// ─── Supersampling ──────────────────────────────────────────────────────────

/// Leaves the frame alone; its only job is to tell the renderer how many
/// rays to average per pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Supersampling {
    samples: u32,
}

impl Supersampling {
    pub const TYPE_NAME: &'static str = "supersampling";

    /// Rounds `samples` down to a perfect square, with a floor of 1.
    pub fn new(samples: u32) -> Self {
        let side = (f64::from(samples).sqrt().floor() as u32).max(1);
        Self {
            samples: side * side,
        }
    }

    pub fn from_params(params: &Params) -> Result<Self, ConfigError> {
        let samples = setting::require(params, Self::TYPE_NAME, "samplesPerPixel")?;
        Ok(Self::new(samples.max(0.0) as u32))
    }
}

impl PostProcess for Supersampling {
    fn process(&self, buffer: &[Color], _width: usize, _height: usize) -> Vec<Color> {
        buffer.to_vec()
    }

    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn clone_post_process(&self) -> Box<dyn PostProcess> {
        Box::new(*self)
    }

    fn export_params(&self, setting: &mut Setting) {
        setting::put_str(setting, "type", Self::TYPE_NAME);
        setting::put_f64(setting, "samplesPerPixel", f64::from(self.samples));
    }

    fn samples_per_pixel(&self) -> Option<u32> {
        Some(self.samples)
    }
}

/// Runs `effects` in order over `buffer`.
pub fn apply_chain(
    effects: &[Box<dyn PostProcess>],
    buffer: Vec<Color>,
    width: usize,
    height: usize,
) -> Vec<Color> {
    effects.iter().fold(buffer, |frame, effect| {
        log::debug!("post-process: {}", effect.type_name());
        effect.process(&frame, width, height)
    })
}
