//! Cubemap renderer
//!
//! Projects the scene onto six per-face coverage quadtrees and reads the
//! screen back through the cube projection. Preparing a frame marks every
//! quadtree leaf some screen pixel lands on; the face traversal then paints
//! those leaves front-to-back; readback samples the face colors per pixel.
//! Because the faces cover all directions, a rotation-only camera move
//! could reuse the painted cube as-is.

use crate::core::camera::Camera;
use crate::core::error::Error;
use crate::core::time::Timer;
use crate::core::types::{DVec3, Result};
use crate::mask::Quadtree;
use crate::octree::Octree;
use crate::render::{ceil_log2, face, PixelSink, RenderStats};

/// Cube face order: +Y, +Z, +X, -Z, -X, -Y
const FACE_COUNT: usize = 6;

/// Six-face cubemap renderer
pub struct CubemapRenderer {
    faces: [Quadtree; FACE_COUNT],
    width: u32,
    height: u32,
    /// Per-face backdrop colors in leaf order, shown wherever no geometry
    /// painted a leaf
    background: Option<Box<[Vec<u32>; FACE_COUNT]>>,
    pub stats: RenderStats,
}

impl CubemapRenderer {
    /// Create a renderer for a screen size; the face masks are sized to the
    /// next power of two covering the larger screen dimension.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::Config("screen dimensions must be nonzero".into()));
        }
        let k = ceil_log2(width.max(height)).max(2);
        if k > 13 {
            return Err(Error::Config(format!(
                "screen {width}x{height} exceeds coverage mask capacity"
            )));
        }
        Ok(Self {
            faces: std::array::from_fn(|_| Quadtree::new(k)),
            width,
            height,
            background: None,
            stats: RenderStats::default(),
        })
    }

    /// Mask side length
    pub fn face_size(&self) -> i32 {
        self.faces[0].size()
    }

    /// Install six background images (+Y, +Z, +X, -Z, -X, -Y). Images are
    /// resampled to the mask size up front so per-frame refills are plain
    /// copies.
    pub fn set_background(&mut self, images: &[image::RgbaImage; FACE_COUNT]) {
        let size = self.face_size();
        let mut converted: Box<[Vec<u32>; FACE_COUNT]> =
            Box::new(std::array::from_fn(|_| vec![0u32; (size * size) as usize]));
        for (colors, img) in converted.iter_mut().zip(images.iter()) {
            let (iw, ih) = img.dimensions();
            for fy in 0..size {
                for fx in 0..size {
                    let px = (fx as u32 * iw) / size as u32;
                    let py = (fy as u32 * ih) / size as u32;
                    let p = img.get_pixel(px, py).0;
                    let color = ((p[3] as u32) << 24)
                        | ((p[0] as u32) << 16)
                        | ((p[1] as u32) << 8)
                        | p[2] as u32;
                    colors[Quadtree::leaf_order(fx, fy)] = color;
                }
            }
        }
        self.background = Some(converted);
    }

    /// Load the six background images from files
    pub fn load_background(&mut self, paths: &[std::path::PathBuf; FACE_COUNT]) -> Result<()> {
        let open = |i: usize| -> Result<image::RgbaImage> {
            Ok(image::open(&paths[i])?.to_rgba8())
        };
        let images = [open(0)?, open(1)?, open(2)?, open(3)?, open(4)?, open(5)?];
        self.set_background(&images);
        Ok(())
    }

    /// Render one frame through the cube projection
    pub fn render_frame(
        &mut self,
        octree: &Octree,
        camera: &Camera,
        sink: &mut impl PixelSink,
    ) {
        let frame = Timer::start();
        self.stats = RenderStats::default();

        let t = Timer::start();
        for i in 0..FACE_COUNT {
            self.faces[i].clear();
            if let Some(bg) = &self.background {
                self.faces[i].fill_face(&bg[i]);
            }
        }
        self.prepare(camera);
        for quad in &mut self.faces {
            for quadrant in 0..4 {
                quad.build(quadrant);
            }
        }
        self.stats.prepare_ms = t.elapsed_ms();

        let t = Timer::start();
        let x = camera.position.x as i32;
        let y = camera.position.y as i32;
        let z = camera.position.z as i32;
        let w = octree.scene_size() as i32;
        for (i, quad) in self.faces.iter_mut().enumerate() {
            face::render_face(octree, quad, i, x, y, z, w, &mut self.stats);
        }
        self.stats.query_ms = t.elapsed_ms();

        let t = Timer::start();
        self.readback(camera, sink);
        self.stats.transfer_ms = t.elapsed_ms();

        self.stats.total_ms = frame.elapsed_ms();
        self.stats.log();
    }

    /// Mark every quadtree leaf some screen pixel projects onto
    fn prepare(&mut self, camera: &Camera) {
        let inverse = camera.orientation.transpose();
        let fov = 1.0 / self.height as f64;
        let size = self.face_size() as f64;
        let (hw, hh) = (self.width as f64 / 2.0, self.height as f64 / 2.0);
        for y in 0..self.height {
            for x in 0..self.width {
                let ray = inverse * DVec3::new((x as f64 - hw) * fov, (hh - y as f64) * fov, 1.0);
                let (f, fx, fy) = classify(ray, size);
                self.faces[f].set(fx, fy);
            }
        }
    }

    /// Deliver the painted cube to the pixel sink, nearest sample
    fn readback(&self, camera: &Camera, sink: &mut impl PixelSink) {
        let inverse = camera.orientation.transpose();
        let fov = 1.0 / self.height as f64;
        let size = self.face_size() as f64;
        let (hw, hh) = (self.width as f64 / 2.0, self.height as f64 / 2.0);
        for y in 0..self.height {
            for x in 0..self.width {
                let ray = inverse * DVec3::new((x as f64 - hw) * fov, (hh - y as f64) * fov, 1.0);
                let (f, fx, fy) = classify(ray, size);
                sink.put_pixel(x, y, self.faces[f].get_face(fx, fy));
            }
        }
    }
}

/// Dominant-axis cube face classification: face index and face coordinates
/// in `[0, size)` for a view ray
fn classify(p: DVec3, size: f64) -> (usize, i32, i32) {
    let ax = p.x.abs();
    let ay = p.y.abs();
    let az = p.z.abs();
    if ax >= ay && ax >= az {
        if p.x > 0.0 {
            (2, (size * (-p.z / ax / 2.0 + 0.5)) as i32, (size * (-p.y / ax / 2.0 + 0.5)) as i32)
        } else {
            (4, (size * (p.z / ax / 2.0 + 0.5)) as i32, (size * (-p.y / ax / 2.0 + 0.5)) as i32)
        }
    } else if ay >= ax && ay >= az {
        if p.y > 0.0 {
            (0, (size * (p.x / ay / 2.0 + 0.5)) as i32, (size * (p.z / ay / 2.0 + 0.5)) as i32)
        } else {
            (5, (size * (p.x / ay / 2.0 + 0.5)) as i32, (size * (-p.z / ay / 2.0 + 0.5)) as i32)
        }
    } else if p.z > 0.0 {
        (1, (size * (p.x / az / 2.0 + 0.5)) as i32, (size * (p.y / az / 2.0 + 0.5)) as i32)
    } else {
        (3, (size * (-p.x / az / 2.0 + 0.5)) as i32, (size * (p.y / az / 2.0 + 0.5)) as i32)
    }
}
