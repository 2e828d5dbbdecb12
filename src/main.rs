//! Softraster CLI: render a RON scene description to PNG
//!
//! Usage: softraster <scene.ron> [output.png]
//!
//! Set RUST_LOG=debug for per-frame triangle statistics.

use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info};

use softraster::output::{frame_path, save_png};
use softraster::rasterizer::Rasterizer;
use softraster::scene::load_scene;

/// Version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    let Some(scene_path) = args.get(1) else {
        eprintln!("softraster v{}\nusage: softraster <scene.ron> [output.png]", VERSION);
        return ExitCode::FAILURE;
    };

    match run(Path::new(scene_path), args.get(2).map(PathBuf::from)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(scene_path: &Path, output: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let desc = load_scene(scene_path)?;
    let base_dir = scene_path.parent().unwrap_or_else(|| Path::new("."));
    let scene = desc.build(base_dir)?;
    let output = output.unwrap_or_else(|| PathBuf::from(&desc.render.output));

    let cfg = &desc.render;
    let mut raster = Rasterizer::new(cfg.width, cfg.height, cfg.msaa)?;
    info!("Rendering {}x{} (msaa {}x) from {}", cfg.width, cfg.height, cfg.msaa, scene_path.display());

    if cfg.frames <= 1 {
        let frame = raster.render(&scene)?;
        save_png(&output, &frame, cfg.width, cfg.height)?;
        info!("Wrote {}", output.display());
        return Ok(());
    }

    let progress = ProgressBar::new(cfg.frames as u64);
    progress.set_style(ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} frames {msg}")?);

    let base_camera = scene.camera;
    let step = cfg.turntable_degrees.to_radians() / cfg.frames as f32;
    let mut scene = scene;
    for i in 0..cfg.frames {
        scene.camera = base_camera.orbit(step * i as f32);
        let frame = raster.render(&scene)?;
        let path = frame_path(&output, i);
        save_png(&path, &frame, cfg.width, cfg.height)?;
        progress.set_message(path.display().to_string());
        progress.inc(1);
    }
    progress.finish_with_message("done");

    info!("Wrote {} frames next to {}", cfg.frames, output.display());
    Ok(())
}
