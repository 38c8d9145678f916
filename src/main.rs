//! Voxcast demo binary - renders voxel scenes to PNG frames.
//!
//! Usage: cargo run --release -- [OPTIONS]
//!
//! Options:
//!   --scene <FILE>    Scene manifest JSON (default: built-in test scene)
//!   --output <PATH>   Output PNG path or prefix (default: "frame")
//!   --frames <N>      Number of frames to render (default: 1)
//!   --orbit <DEG>     Yaw step between frames in degrees (default: 0)

use std::path::{Path, PathBuf};

use glam::DVec3;

use voxcast::config::{RendererKind, SceneConfig};
use voxcast::core::camera::Camera;
use voxcast::core::types::Result;
use voxcast::octree::{self, io, loader, Octree};
use voxcast::render::{CubemapRenderer, Framebuffer, ScreenRenderer};

fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .init();

    let args: Vec<String> = std::env::args().collect();
    let scene = parse_str_arg(&args, "--scene");
    let output = parse_str_arg(&args, "--output").unwrap_or_else(|| "frame".to_string());
    let frames = parse_u32_arg(&args, "--frames").unwrap_or(1);
    let orbit = parse_f64_arg(&args, "--orbit").unwrap_or(0.0);

    if let Err(e) = run(scene.as_deref(), &output, frames, orbit) {
        log::error!("{e}");
        std::process::exit(1);
    }
}

fn run(scene: Option<&str>, output: &str, frames: u32, orbit: f64) -> Result<()> {
    let config = match scene {
        Some(path) => SceneConfig::from_file(Path::new(path))?,
        None => SceneConfig::default(),
    };
    config.validate()?;

    let tree = obtain_octree(&config)?;
    log::info!(
        "scene ready: depth {}, {} nodes ({} MiB)",
        tree.depth(),
        tree.node_count(),
        tree.memory_usage() >> 20
    );

    let mut fb = Framebuffer::new(config.width, config.height);
    let mut camera = Camera::from_yaw_pitch(
        DVec3::from_array(config.camera_position),
        config.camera_yaw.to_radians(),
        config.camera_pitch.to_radians(),
    );

    match config.renderer {
        RendererKind::Cubemap => {
            let mut renderer = CubemapRenderer::new(config.width, config.height)?;
            if let Some(paths) = &config.background {
                renderer.load_background(paths)?;
            }
            for frame in 0..frames {
                renderer.render_frame(&tree, &camera, &mut fb);
                fb.save_png(&frame_path(output, frame, frames))?;
                camera = orbit_step(&camera, &config, orbit, frame);
            }
        }
        RendererKind::Screen => {
            let mut renderer = ScreenRenderer::new(config.width, config.height)?;
            for frame in 0..frames {
                renderer.render_frame(&tree, &camera, &mut fb);
                fb.save_png(&frame_path(output, frame, frames))?;
                camera = orbit_step(&camera, &config, orbit, frame);
            }
        }
    }
    Ok(())
}

/// Load from snapshot when available, else ingest the voxel dump (writing
/// the snapshot for next time), else build the test scene.
fn obtain_octree(config: &SceneConfig) -> Result<Octree> {
    if let Some(snapshot) = &config.snapshot {
        if snapshot.exists() {
            log::info!("loading snapshot {}", snapshot.display());
            return io::load_octree(snapshot);
        }
    }
    let tree = match &config.voxels {
        Some(path) => {
            log::info!("ingesting {}", path.display());
            loader::load_file(path, &config.load)?
        }
        None => {
            log::info!("no voxel dump configured, building test scene");
            octree::sphere_octree(config.load.depth)
        }
    };
    if let Some(snapshot) = &config.snapshot {
        io::save_octree(snapshot, &tree)?;
        log::info!("snapshot written to {}", snapshot.display());
    }
    Ok(tree)
}

fn frame_path(output: &str, frame: u32, frames: u32) -> PathBuf {
    if frames == 1 && output.ends_with(".png") {
        PathBuf::from(output)
    } else if frames == 1 {
        PathBuf::from(format!("{output}.png"))
    } else {
        PathBuf::from(format!("{output}_{frame:04}.png"))
    }
}

/// Rotate the camera one orbit step around the scene center
fn orbit_step(camera: &Camera, config: &SceneConfig, orbit: f64, frame: u32) -> Camera {
    if orbit == 0.0 {
        return *camera;
    }
    let center = DVec3::splat((1u64 << config.load.depth) as f64 / 2.0);
    let start = DVec3::from_array(config.camera_position);
    let angle = orbit.to_radians() * (frame + 1) as f64;
    let offset = start - center;
    let (sin, cos) = angle.sin_cos();
    let rotated = DVec3::new(
        offset.x * cos + offset.z * sin,
        offset.y,
        -offset.x * sin + offset.z * cos,
    );
    Camera::looking(center + rotated, -rotated, DVec3::Y)
}

fn parse_str_arg(args: &[String], name: &str) -> Option<String> {
    args.iter().position(|a| a == name).and_then(|i| args.get(i + 1).cloned())
}

fn parse_u32_arg(args: &[String], name: &str) -> Option<u32> {
    parse_str_arg(args, name).and_then(|v| v.parse().ok())
}

fn parse_f64_arg(args: &[String], name: &str) -> Option<f64> {
    parse_str_arg(args, name).and_then(|v| v.parse().ok())
}
