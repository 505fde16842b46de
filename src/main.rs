use clap::Parser;
use prism_tracer::display::{display_framebuffer, OutputMode};
use prism_tracer::loader;
use prism_tracer::registry::Registry;
use prism_tracer::reload::{SceneHandle, SceneWatcher, POLL_INTERVAL};
use prism_tracer::renderer::{RenderConfig, Renderer};
use prism_tracer::scene::Scene;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

/// prism-tracer: render JSON scene files
#[derive(Parser, Debug)]
#[command(
    name = "prism-tracer",
    version,
    about = "An offline ray tracer with composable shaders and post-processing",
    long_about = "Renders a JSON scene description with direct lighting, hard \
                  (partial) shadows, a shader chain and a post-process chain. \
                  Shows the result in the terminal and optionally writes a PPM image.",
    after_help = "EXAMPLES:\n  \
                  prism-tracer scenes/demo.json --mode halfblock\n  \
                  prism-tracer scenes/demo.json -W 800 -H 600 --spp 16 -o render.ppm --quiet\n  \
                  prism-tracer scenes/demo.json --watch\n  \
                  prism-tracer --list-types"
)]
struct Cli {
    /// Scene file to render
    #[arg(required_unless_present = "list_types")]
    scene: Option<PathBuf>,

    /// Image width in pixels (defaults to the scene camera's resolution)
    #[arg(short = 'W', long)]
    width: Option<u32>,

    /// Image height in pixels (defaults to the scene camera's resolution)
    #[arg(short = 'H', long)]
    height: Option<u32>,

    /// Rays per pixel, rounded down to a perfect square. Overrides any
    /// supersampling effect in the scene.
    #[arg(long)]
    spp: Option<u32>,

    /// Terminal preview encoding
    #[arg(short, long, value_enum, default_value_t = CliOutputMode::Halfblock)]
    mode: CliOutputMode,

    /// Disable gamma correction (output linear values directly)
    #[arg(long)]
    no_gamma: bool,

    /// Save the rendered image to a PPM file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Suppress terminal preview and progress
    #[arg(long)]
    quiet: bool,

    /// Re-render whenever the scene file changes
    #[arg(long)]
    watch: bool,

    /// Write the loaded scene back out as JSON
    #[arg(long, value_name = "PATH")]
    export: Option<PathBuf>,

    /// List every registered entity type and exit
    #[arg(long)]
    list_types: bool,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliOutputMode {
    /// Full-block characters with 24-bit true color
    Truecolor,
    /// Half-block characters (▀), 2 vertical pixels per cell
    Halfblock,
    /// ASCII grayscale density ramp
    Ascii,
}

impl From<CliOutputMode> for OutputMode {
    fn from(m: CliOutputMode) -> Self {
        match m {
            CliOutputMode::Truecolor => OutputMode::TrueColor,
            CliOutputMode::Halfblock => OutputMode::HalfBlock,
            CliOutputMode::Ascii => OutputMode::Ascii,
        }
    }
}

fn print_header(path: &Path, scene: &Scene, renderer: &Renderer) {
    let width = renderer.config.width.unwrap_or(scene.camera.width);
    let height = renderer.config.height.unwrap_or(scene.camera.height);
    eprintln!();
    eprintln!("  ╔═══════════════════════════════════════════════╗");
    eprintln!("  ║  prism-tracer  Offline Ray Tracer             ║");
    eprintln!("  ╚═══════════════════════════════════════════════╝");
    eprintln!();
    eprintln!("  Scene:      {}", path.display());
    eprintln!("  Resolution: {width}×{height}");
    eprintln!("  Samples:    {} spp", renderer.samples_for(scene));
    eprintln!(
        "  Contents:   {} primitives, {} lights, {} shaders, {} post-processes",
        scene.primitives.len(),
        scene.lights.len(),
        scene.shaders.len(),
        scene.post_processes.len()
    );
    eprintln!();
}

fn print_types(registry: &Registry) {
    println!("primitives:    {}", registry.primitive_names().join(", "));
    println!("lights:        {}", registry.light_names().join(", "));
    println!("shaders:       {}", registry.shader_names().join(", "));
    println!("post-process:  {}", registry.post_process_names().join(", "));
}

fn render_once(cli: &Cli, path: &Path, scene: &Scene, renderer: &Renderer) {
    if !cli.quiet {
        print_header(path, scene, renderer);
    }
    let (framebuffer, stats) = renderer.render(scene);
    if !cli.quiet {
        stats.print_summary();
        eprintln!();
        if let Err(e) = display_framebuffer(&framebuffer, cli.mode.into()) {
            log::warn!("terminal preview failed: {e}");
        }
    }
    if let Some(out) = &cli.output {
        match framebuffer.write_ppm(out) {
            Ok(()) => log::info!("saved {}", out.display()),
            Err(e) => log::error!("could not save {}: {e}", out.display()),
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let registry = Arc::new(Registry::with_builtins());

    if cli.list_types {
        print_types(&registry);
        return ExitCode::SUCCESS;
    }
    let Some(path) = cli.scene.clone() else {
        return ExitCode::FAILURE;
    };

    let scene = match loader::load_scene(&path, &registry) {
        Ok(scene) => scene,
        Err(err) => {
            log::error!("{err}: {}", err.kind);
            return ExitCode::FAILURE;
        }
    };

    if let Some(export) = &cli.export {
        if let Err(err) = loader::save_scene(&scene, export) {
            log::error!("{err}: {}", err.kind);
            return ExitCode::FAILURE;
        }
    }

    let renderer = Renderer::new(RenderConfig {
        width: cli.width,
        height: cli.height,
        samples_per_pixel: cli.spp,
        gamma: !cli.no_gamma,
        progress: !cli.quiet,
        ..RenderConfig::default()
    });

    if !cli.watch {
        render_once(&cli, &path, &scene, &renderer);
        return ExitCode::SUCCESS;
    }

    let handle = Arc::new(SceneHandle::new(scene));
    let _watcher = match SceneWatcher::spawn(&path, Arc::clone(&registry), Arc::clone(&handle), POLL_INTERVAL) {
        Ok(watcher) => watcher,
        Err(e) => {
            log::error!("could not start scene watcher: {e}");
            return ExitCode::FAILURE;
        }
    };
    log::info!("watching {} for changes (Ctrl-C to quit)", path.display());
    let mut seen = u64::MAX;
    loop {
        let generation = handle.generation();
        if generation != seen {
            seen = generation;
            render_once(&cli, &path, &handle.snapshot(), &renderer);
        }
        std::thread::sleep(Duration::from_millis(100));
    }
}
