//! Terminal preview of a rendered frame.

use crate::math::Color;
use crate::postprocess::luma;
use crate::renderer::Framebuffer;
use crossterm::style::{self, Stylize};
use crossterm::terminal;
use std::io::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// One full block per pixel in 24-bit color.
    TrueColor,
    /// Two vertical pixels per cell via the upper half block.
    HalfBlock,
    /// Luma mapped onto a density ramp, no color.
    Ascii,
}

/// Nearest-neighbour downscale so the frame fits in `max_cols` columns.
/// Frames that already fit are returned unchanged.
pub fn fit_width(fb: &Framebuffer, max_cols: u32) -> Framebuffer {
    if fb.width <= max_cols || max_cols == 0 {
        return fb.clone();
    }
    let scale = f64::from(fb.width) / f64::from(max_cols);
    let width = max_cols;
    let height = ((f64::from(fb.height) / scale).round() as u32).max(1);
    let pixels = (0..height)
        .flat_map(|y| (0..width).map(move |x| (x, y)))
        .map(|(x, y)| {
            let sx = ((f64::from(x) * scale) as u32).min(fb.width - 1);
            let sy = ((f64::from(y) * scale) as u32).min(fb.height - 1);
            fb.get(sx, sy)
        })
        .collect();
    Framebuffer {
        width,
        height,
        pixels,
    }
}

/// Prints `fb` to stdout in `mode`, shrunk to the terminal width when the
/// width is known.
pub fn display_framebuffer(fb: &Framebuffer, mode: OutputMode) -> io::Result<()> {
    let fitted = match terminal::size() {
        Ok((cols, _)) => fit_width(fb, u32::from(cols)),
        Err(_) => fb.clone(),
    };
    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    match mode {
        OutputMode::TrueColor => write_truecolor(&mut out, &fitted)?,
        OutputMode::HalfBlock => write_halfblock(&mut out, &fitted)?,
        OutputMode::Ascii => write_ascii(&mut out, &fitted)?,
    }
    out.flush()
}

fn rgb(c: Color) -> style::Color {
    let (r, g, b) = c.to_rgb8();
    style::Color::Rgb { r, g, b }
}

fn write_truecolor(out: &mut impl Write, fb: &Framebuffer) -> io::Result<()> {
    for y in 0..fb.height {
        for x in 0..fb.width {
            write!(out, "{}", "█".with(rgb(fb.get(x, y))))?;
        }
        writeln!(out)?;
    }
    Ok(())
}

fn write_halfblock(out: &mut impl Write, fb: &Framebuffer) -> io::Result<()> {
    for row in (0..fb.height).step_by(2) {
        for x in 0..fb.width {
            let top = fb.get(x, row);
            // An odd last row pairs with black.
            let bottom = if row + 1 < fb.height {
                fb.get(x, row + 1)
            } else {
                Color::zero()
            };
            write!(out, "{}", "▀".with(rgb(top)).on(rgb(bottom)))?;
        }
        writeln!(out)?;
    }
    Ok(())
}

const RAMP: &[u8] = b" .:-=+*#%@";

fn ascii_char(c: Color) -> char {
    let idx = (luma(c).clamp(0.0, 0.999) * RAMP.len() as f64) as usize;
    RAMP[idx] as char
}

fn write_ascii(out: &mut impl Write, fb: &Framebuffer) -> io::Result<()> {
    for y in 0..fb.height {
        let line: String = (0..fb.width).map(|x| ascii_char(fb.get(x, y))).collect();
        writeln!(out, "{line}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn checker(width: u32, height: u32) -> Framebuffer {
        let pixels = (0..width * height)
            .map(|i| {
                if (i % width + i / width) % 2 == 0 {
                    Color::ones()
                } else {
                    Color::zero()
                }
            })
            .collect();
        Framebuffer {
            width,
            height,
            pixels,
        }
    }

    #[test]
    fn small_frames_are_not_resized() {
        let fb = checker(4, 3);
        assert_eq!(fit_width(&fb, 80), fb);
    }

    #[test]
    fn wide_frames_shrink_proportionally() {
        let fitted = fit_width(&checker(100, 50), 20);
        assert_eq!((fitted.width, fitted.height), (20, 10));
        assert_eq!(fitted.pixels.len(), 200);
    }

    #[test]
    fn ascii_ramp_ends() {
        let mut out = Vec::new();
        write_ascii(&mut out, &checker(2, 1)).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "@ \n");
    }

    #[test]
    fn halfblock_handles_odd_heights() {
        let mut out = Vec::new();
        write_halfblock(&mut out, &checker(3, 3)).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 2);
    }
}
