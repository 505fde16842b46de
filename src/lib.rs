//! # prism-tracer
//!
//! An offline ray tracer built around composable pieces.
//!
//! ## Architecture
//!
//! - **Primitives**: sphere, plane, finite cylinder, finite cone, box,
//!   triangle, torus, infinite cylinder and cone, and composites of other
//!   primitives, each with accumulated rotation applied by moving the ray
//!   into local space
//! - **Materials**: a flat color or a procedural texture (chessboard or
//!   Perlin noise) looked up by the surface coordinates of the hit
//! - **Lights**: ambient, point (with distance falloff), directional, and a
//!   color-filter decorator that wraps any of them
//! - **Shaders**: basic, Phong, toon, Fresnel, plus decorators that wrap a
//!   base shader and layer their effect on top
//! - **Post-process**: blur, grayscale, negative, chromatic aberration and
//!   supersampling, run in order over the finished frame
//! - **Registry**: name → constructor maps so scene files, and callers who
//!   register their own types, create entities by name
//! - **Scene files**: JSON import and export, with hot reload
//!
//! ## Shading
//!
//! Only direct light is computed. For the nearest hit along a primary ray:
//!
//! ```text
//!   c = m ⊙ ambient + Σ_lights m ⊙ L(p) · max(0, n·l) · (0.4 if shadowed else 1)
//! ```
//!
//! `c` is capped at 1 per channel and then handed through the shader chain.

pub mod camera;
pub mod display;
pub mod error;
pub mod light;
pub mod loader;
pub mod material;
pub mod math;
pub mod postprocess;
pub mod primitive;
pub mod registry;
pub mod reload;
pub mod renderer;
pub mod scene;
pub mod setting;
pub mod shader;
pub mod texture;

pub use error::{ConfigError, SceneLoadError};
pub use registry::Registry;
pub use scene::{Scene, SceneBuilder};
