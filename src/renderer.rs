use crate::camera::Camera;
use crate::math::*;
use crate::scene::Scene;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

// ─── Render Configuration ───────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Output size; `None` uses the scene camera's resolution.
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Rays per pixel; `None` asks the scene's post-process chain, then 1.
    pub samples_per_pixel: Option<u32>,
    pub gamma: bool,
    pub progress: bool,
    /// Base seed for sub-pixel jitter. Each row derives its own generator
    /// from it, so a render is reproducible whatever the thread count.
    pub seed: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: None,
            height: None,
            samples_per_pixel: None,
            gamma: true,
            progress: false,
            seed: 0x5eed,
        }
    }
}

// ─── Framebuffer ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Framebuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Color>,
}

impl Framebuffer {
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> Color {
        self.pixels[(y * self.width + x) as usize]
    }

    /// Writes a binary PPM (P6): RGB triplets, one byte per channel.
    pub fn write_ppm(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let mut file = io::BufWriter::new(std::fs::File::create(path)?);
        write!(file, "P6\n{} {}\n255\n", self.width, self.height)?;
        for pixel in &self.pixels {
            let (r, g, b) = pixel.to_rgb8();
            file.write_all(&[r, g, b])?;
        }
        file.flush()
    }
}

// ─── Render Statistics ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct RenderStats {
    pub total_rays: u64,
    pub elapsed_secs: f64,
    pub width: u32,
    pub height: u32,
    pub spp: u32,
}

impl RenderStats {
    pub fn mrays_per_sec(&self) -> f64 {
        self.total_rays as f64 / self.elapsed_secs.max(f64::EPSILON) / 1e6
    }

    pub fn print_summary(&self) {
        let fill = "━".repeat(30);
        eprintln!("  {fill}");
        eprintln!("  Time:     {:.2}s", self.elapsed_secs);
        eprintln!("  Rays:     {:.2}M primary", self.total_rays as f64 / 1e6);
        eprintln!("  Speed:    {:.2} Mrays/s", self.mrays_per_sec());
        eprintln!("  Image:    {}×{} @ {} spp", self.width, self.height, self.spp);
        eprintln!("  {fill}");
    }
}

// ─── Progress Reporter ──────────────────────────────────────────────────────

/// Row counter shared by the render workers. Whichever worker moves the
/// percentage redraws the bar on stderr.
struct ProgressBar {
    total: u32,
    done: AtomicU32,
    last_pct: AtomicU32,
    start: Instant,
}

impl ProgressBar {
    fn new(total: u32) -> Self {
        Self {
            total: total.max(1),
            done: AtomicU32::new(0),
            last_pct: AtomicU32::new(0),
            start: Instant::now(),
        }
    }

    fn tick(&self) {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        let pct = done * 100 / self.total;
        let last = self.last_pct.load(Ordering::Relaxed);
        if pct > last
            && self
                .last_pct
                .compare_exchange(last, pct, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
        {
            let elapsed = self.start.elapsed().as_secs_f64();
            let remaining = elapsed / f64::from(done) * f64::from(self.total - done);
            let filled = pct as usize * 24 / 100;
            let bar = format!("{}{}", "█".repeat(filled), "░".repeat(24 - filled));
            eprint!("\r  Rendering: │{bar}│ {pct:3}%  ETA {remaining:.0}s   ");
        }
    }

    fn finish(&self) {
        let elapsed = self.start.elapsed().as_secs_f64();
        eprintln!("\r  Rendering: │{}│ 100%  {elapsed:.2}s       ", "█".repeat(24));
    }
}

// ─── Renderer ───────────────────────────────────────────────────────────────

/// Film coordinate of pixel column (or row) `i` plus a sub-pixel `offset`
/// in [-0.5, 0.5]. Pixel centers land on `i / (n - 1)`, so the first and
/// last pixels sit exactly on the film edges.
fn film_coord(i: u32, offset: f64, n: u32) -> f64 {
    if n <= 1 {
        return 0.5;
    }
    (f64::from(i) + offset) / f64::from(n - 1)
}

pub struct Renderer {
    pub config: RenderConfig,
}

impl Renderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Rays per pixel actually used for `scene`, a perfect square ≥ 1.
    pub fn samples_for(&self, scene: &Scene) -> u32 {
        let requested = self
            .config
            .samples_per_pixel
            .or_else(|| scene.samples_per_pixel())
            .unwrap_or(1);
        let side = (f64::from(requested).sqrt().floor() as u32).max(1);
        side * side
    }

    /// Traces every pixel, runs the scene's post-process chain over the
    /// finished frame, then applies gamma.
    pub fn render(&self, scene: &Scene) -> (Framebuffer, RenderStats) {
        let w = self.config.width.unwrap_or(scene.camera.width).max(1);
        let h = self.config.height.unwrap_or(scene.camera.height).max(1);
        let spp = self.samples_for(scene);
        let side = (f64::from(spp).sqrt().round() as u32).max(1);
        let camera = Camera::new(&scene.camera, f64::from(w) / f64::from(h));

        log::info!("rendering {w}×{h} @ {spp} spp on {} threads", rayon::current_num_threads());
        let progress = self.config.progress.then(|| ProgressBar::new(h));
        let t0 = Instant::now();

        let mut pixels = vec![Color::zero(); (w * h) as usize];
        pixels
            .par_chunks_mut(w as usize)
            .enumerate()
            .for_each(|(y, row)| {
                let y = y as u32;
                let mut rng = SmallRng::seed_from_u64(self.config.seed ^ u64::from(y).wrapping_mul(0x9e37_79b9_7f4a_7c15));
                for (x, slot) in row.iter_mut().enumerate() {
                    *slot = self.shade_pixel(scene, &camera, x as u32, y, (w, h), side, &mut rng);
                }
                if let Some(bar) = &progress {
                    bar.tick();
                }
            });
        if let Some(bar) = &progress {
            bar.finish();
        }

        let mut pixels = scene.apply_post_processing(pixels, w as usize, h as usize);
        if self.config.gamma {
            pixels.par_iter_mut().for_each(|c| *c = c.gamma_correct());
        }

        let stats = RenderStats {
            total_rays: u64::from(w) * u64::from(h) * u64::from(spp),
            elapsed_secs: t0.elapsed().as_secs_f64(),
            width: w,
            height: h,
            spp,
        };
        log::info!("render finished in {:.2}s", stats.elapsed_secs);
        (
            Framebuffer {
                width: w,
                height: h,
                pixels,
            },
            stats,
        )
    }

    /// Averages `side²` stratified, jittered rays over one pixel. A single
    /// sample goes through the pixel center with no jitter.
    #[allow(clippy::too_many_arguments)]
    fn shade_pixel(
        &self,
        scene: &Scene,
        camera: &Camera,
        x: u32,
        y: u32,
        (w, h): (u32, u32),
        side: u32,
        rng: &mut SmallRng,
    ) -> Color {
        // Row 0 is the top of the image, film t = 0 is the bottom.
        let flipped = h - 1 - y;
        if side == 1 {
            let ray = camera.get_ray(film_coord(x, 0.0, w), film_coord(flipped, 0.0, h));
            return scene.compute_color(&ray);
        }
        let cell = 1.0 / f64::from(side);
        let mut sum = Color::zero();
        for sy in 0..side {
            for sx in 0..side {
                let ox = (f64::from(sx) + rng.gen::<f64>()) * cell - 0.5;
                let oy = (f64::from(sy) + rng.gen::<f64>()) * cell - 0.5;
                let ray = camera.get_ray(film_coord(x, ox, w), film_coord(flipped, oy, h));
                sum += scene.compute_color(&ray);
            }
        }
        sum / f64::from(side * side)
    }
}
