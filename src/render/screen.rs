//! Direct-to-screen integer frustum renderer
//!
//! A single recursion walks the octree and the screen tile mask together.
//! The projected bounding box of the current octree node is carried as a
//! 4-wide integer vector `(x1, x2, y1, y2)` of signed distances to the four
//! image-plane half planes, together with per-axis deltas describing how
//! the box moves between sibling octants. Octree descents double the
//! vector and add deltas; mask descents interpolate it onto a 4x4 subgrid.
//! All arithmetic after frame setup is integer.

use glam::IVec4;

use crate::core::camera::Camera;
use crate::core::error::Error;
use crate::core::time::Timer;
use crate::core::types::{DVec3, Result};
use crate::mask::TileMask;
use crate::octree::{NodeId, Octree, EMPTY, ROOT};
use crate::render::{ceil_log2, PixelSink, RenderStats};

/// Octant bit of the x axis
const DX: usize = 4;
/// Octant bit of the y axis
const DY: usize = 2;
/// Octant bit of the z axis
const DZ: usize = 1;

/// Offset direction of each child octant center, indexed by octant bits
const DELTA: [IVec4; 8] = [
    IVec4::new(-1, -1, -1, 0),
    IVec4::new(-1, -1, 1, 0),
    IVec4::new(-1, 1, -1, 0),
    IVec4::new(-1, 1, 1, 0),
    IVec4::new(1, -1, -1, 0),
    IVec4::new(1, -1, 1, 0),
    IVec4::new(1, 1, -1, 0),
    IVec4::new(1, 1, 1, 0),
];

#[inline]
fn shl(v: IVec4, s: u32) -> IVec4 {
    IVec4::new(v.x << s, v.y << s, v.z << s, v.w << s)
}

#[inline]
fn shr2(v: IVec4) -> IVec4 {
    IVec4::new(v.x >> 2, v.y >> 2, v.z >> 2, v.w >> 2)
}

/// Swap the lanes within each bound pair: `(x1, x2, y1, y2)` to
/// `(x2, x1, y2, y1)`
#[inline]
fn swap_pairs(v: IVec4) -> IVec4 {
    IVec4::new(v.y, v.x, v.w, v.z)
}

/// Worst-case projection offsets across a node's extent for the
/// conservative frustum test. `lo` collects magnitudes of negative deltas
/// (nonnegative), `hi` of positive deltas (nonpositive).
#[inline]
fn frustum_slack(dx: IVec4, dy: IVec4, dz: IVec4) -> (IVec4, IVec4) {
    let zero = IVec4::ZERO;
    let lo = -(dx.min(zero) + dy.min(zero) + dz.min(zero));
    let hi = -(dx.max(zero) + dy.max(zero) + dz.max(zero));
    (lo, hi)
}

/// True if the box can still reach inside all four image half planes
#[inline]
fn visible(bound: IVec4, lo: IVec4, hi: IVec4) -> bool {
    let reach_lo = bound - lo;
    let reach_hi = bound - hi;
    reach_lo.x < 0 && reach_hi.y > 0 && reach_lo.z < 0 && reach_hi.w > 0
}

/// Direct screen renderer
pub struct ScreenRenderer {
    mask: TileMask,
    width: u32,
    height: u32,
    pub stats: RenderStats,
}

impl ScreenRenderer {
    /// Create a renderer for a screen size
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::Config("screen dimensions must be nonzero".into()));
        }
        let k = ceil_log2(width.max(height));
        if k > 12 {
            return Err(Error::Config(format!(
                "screen {width}x{height} exceeds coverage mask capacity"
            )));
        }
        Ok(Self {
            mask: TileMask::new(k),
            width,
            height,
            stats: RenderStats::default(),
        })
    }

    /// Screen coverage mask (tests and tooling)
    pub fn mask(&self) -> &TileMask {
        &self.mask
    }

    /// Render one frame straight onto the screen mask and blit it out
    pub fn render_frame(
        &mut self,
        octree: &Octree,
        camera: &Camera,
        sink: &mut impl PixelSink,
    ) {
        let frame = Timer::start();
        self.stats = RenderStats::default();

        let t = Timer::start();
        self.mask.build(self.width, self.height);
        self.stats.prepare_ms = t.elapsed_ms();

        let t = Timer::start();
        self.query(octree, camera);
        self.stats.query_ms = t.elapsed_ms();

        let t = Timer::start();
        for y in 0..self.height {
            for x in 0..self.width {
                sink.put_pixel(x, y, self.mask.get_face(x as i32, y as i32));
            }
        }
        self.stats.transfer_ms = t.elapsed_ms();

        self.stats.total_ms = frame.elapsed_ms();
        self.stats.log();
    }

    /// Project the scene corners and run the paired recursion.
    ///
    /// World coordinates are taken in half-voxel units so child center
    /// offsets stay integral down to single-voxel nodes.
    fn query(&mut self, octree: &Octree, camera: &Camera) {
        let depth = octree.depth();
        // Frustum edges over the mask grid, in units of the focal plane.
        let (w, h) = (self.width as f64, self.height as f64);
        let size = self.mask.size() as f64;
        let bounds_scale = [
            -w / (2.0 * h),
            -w / (2.0 * h) + size / h,
            0.5 - size / h,
            0.5,
        ];

        let center = (1i64 << depth) as f64;
        let eye = camera.position * 2.0;
        let mut bounds = [IVec4::ZERO; 8];
        let mut corner = 0usize;
        let mut max_z = f64::NEG_INFINITY;
        for (i, delta) in DELTA.iter().enumerate() {
            let vertex = DVec3::new(
                center + delta.x as f64 * center - eye.x,
                center + delta.y as f64 * center - eye.y,
                center + delta.z as f64 * center - eye.z,
            );
            let coord = camera.orientation * vertex;
            bounds[i] = IVec4::new(
                (coord.z * bounds_scale[0] - coord.x) as i32,
                (coord.z * bounds_scale[1] - coord.x) as i32,
                (coord.z * bounds_scale[2] - coord.y) as i32,
                (coord.z * bounds_scale[3] - coord.y) as i32,
            );
            if coord.z > max_z {
                max_z = coord.z;
                corner = i;
            }
        }
        let dx = bounds[corner ^ DX] - bounds[corner];
        let dy = bounds[corner ^ DY] - bounds[corner];
        let dz = bounds[corner ^ DZ] - bounds[corner];
        let (lo, hi) = frustum_slack(dx, dy, dz);
        let pos = IVec4::new(
            (center - eye.x) as i32,
            (center - eye.y) as i32,
            (center - eye.z) as i32,
            0,
        );

        let mut walk = Walk {
            octree,
            mask: &mut self.mask,
            stats: &mut self.stats,
            corner,
            split_limit: 4 << depth,
        };
        let root_color = octree.node(ROOT).color;
        walk.traverse(
            0,
            Some(ROOT),
            root_color,
            bounds[corner],
            dx,
            dy,
            dz,
            lo,
            hi,
            pos,
            depth as i32 - 1,
        );
    }
}

/// Recursion state shared across one frame's traversal
struct Walk<'a> {
    octree: &'a Octree,
    mask: &'a mut TileMask,
    stats: &'a mut RenderStats,
    /// Octant index of the scene corner farthest from the camera
    corner: usize,
    /// Bound extent above which the mask is subdivided instead of the octree
    split_limit: i32,
}

impl Walk<'_> {
    /// Returns true once the subtree of `quadnode` is fully painted, which
    /// prunes every remaining octree visit sharing that mask cell.
    ///
    /// `octnode` is `None` inside a solid leaf region; `octcolor` then
    /// carries the frozen region color.
    #[allow(clippy::too_many_arguments)]
    fn traverse(
        &mut self,
        quadnode: usize,
        octnode: Option<NodeId>,
        octcolor: u32,
        bound: IVec4,
        dx: IVec4,
        dy: IVec4,
        dz: IVec4,
        lo: IVec4,
        hi: IVec4,
        pos: IVec4,
        depth: i32,
    ) -> bool {
        self.stats.visits += 1;
        if depth >= 0 && bound.y - bound.x <= self.split_limit {
            // The node projects no larger than the current mask cell:
            // descend the octree, nearest octant first.
            let nearest = (((pos.x < 0) as usize) << 2)
                | (((pos.y < 0) as usize) << 1)
                | ((pos.z < 0) as usize);
            for k in 0..8usize {
                let i = nearest ^ k;
                let mut child = None;
                let mut color = octcolor;
                if let Some(id) = octnode {
                    let node = self.octree.node(id);
                    if node.is_leaf() {
                        color = node.color;
                    } else {
                        let c = node.children[i];
                        if c == EMPTY {
                            continue;
                        }
                        child = Some(c);
                        color = self.octree.node(c).color;
                    }
                }
                let mut nb = shl(bound, 1);
                let flips = self.corner ^ i;
                if flips & DX != 0 {
                    nb += dx;
                }
                if flips & DY != 0 {
                    nb += dy;
                }
                if flips & DZ != 0 {
                    nb += dz;
                }
                if !visible(nb, lo, hi) {
                    continue;
                }
                self.stats.oct_visits += 1;
                let np = pos + shl(DELTA[i], depth as u32);
                if self.traverse(quadnode, child, color, nb, dx, dy, dz, lo, hi, np, depth - 1) {
                    return true;
                }
            }
            false
        } else {
            // The node spans the cell: refine the mask over the 4x4 grid of
            // cells that still need paint, lowest bit first.
            let mut val = self.mask.bits(quadnode);
            while val > 0 {
                let i = val.trailing_zeros() as usize;
                val &= val - 1;
                let x = (i & 3) as i32;
                let y = (i >> 2) as i32;
                let a = IVec4::new(4 - x, x + 1, y + 1, 4 - y);
                let b = IVec4::new(x, 3 - x, 3 - y, y);
                let nb = shr2(a * bound + b * swap_pairs(bound));
                let ndx = shr2(a * dx + b * swap_pairs(dx));
                let ndy = shr2(a * dy + b * swap_pairs(dy));
                let ndz = shr2(a * dz + b * swap_pairs(dz));
                let (nlo, nhi) = frustum_slack(ndx, ndy, ndz);
                if !visible(nb, nlo, nhi) {
                    continue;
                }
                if quadnode < self.mask.leaf_limit() {
                    self.stats.quad_visits += 1;
                    self.traverse(
                        16 * quadnode + i + 1,
                        octnode,
                        octcolor,
                        nb,
                        ndx,
                        ndy,
                        ndz,
                        nlo,
                        nhi,
                        pos,
                        depth,
                    );
                } else {
                    self.mask.set_face(quadnode, i, octcolor);
                }
            }
            self.mask.compute(quadnode);
            self.mask.bits(quadnode) == 0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::color::rgb;
    use crate::render::Framebuffer;

    #[test]
    fn test_frustum_slack_signs() {
        let dx = IVec4::new(-3, 4, 0, -1);
        let dy = IVec4::new(2, -2, 5, 0);
        let dz = IVec4::ZERO;
        let (lo, hi) = frustum_slack(dx, dy, dz);
        assert_eq!(lo, IVec4::new(3, 2, 0, 1));
        assert_eq!(hi, IVec4::new(-2, -4, -5, 0));
    }

    #[test]
    fn test_scene_behind_camera_is_culled() {
        let mut tree = Octree::new(3);
        tree.set(0, 0, 0, 0, rgb(200, 200, 200));
        tree.average(false);

        // Scene cube sits behind-left-below; every child must fail the
        // frustum test without a single octree descent.
        let camera = Camera::looking(DVec3::new(20.0, 20.0, 20.0), DVec3::Z, DVec3::Y);
        let mut fb = Framebuffer::new(64, 64);
        let mut renderer = ScreenRenderer::new(64, 64).unwrap();
        renderer.render_frame(&tree, &camera, &mut fb);

        assert_eq!(renderer.stats.oct_visits, 0);
        assert!(fb.pixels().iter().all(|&c| c == 0));
    }

    #[test]
    fn test_solid_cube_paints_and_completes_projection() {
        let color = rgb(90, 140, 60);
        let mut tree = Octree::new(3);
        tree.set(0, 0, 0, 0, color);
        tree.average(false);

        let camera = Camera::looking(DVec3::new(4.0, 4.0, -20.0), DVec3::Z, DVec3::Y);
        let mut fb = Framebuffer::new(64, 64);
        let mut renderer = ScreenRenderer::new(64, 64).unwrap();
        renderer.render_frame(&tree, &camera, &mut fb);

        // The cube covers the screen center; those cells are painted and
        // retired, while off-projection corners keep their coverage marks.
        assert_eq!(fb.pixel(32, 32), color);
        assert_eq!(fb.pixel(0, 0), 0);
        assert!(!renderer.mask().needs_paint(32, 32));
        assert!(renderer.mask().needs_paint(0, 0));
    }

    #[test]
    fn test_camera_inside_solid_scene_fills_screen() {
        let color = rgb(10, 20, 30);
        let mut tree = Octree::new(4);
        tree.set(0, 0, 0, 0, color);
        tree.average(false);

        let camera = Camera::looking(DVec3::new(8.0, 8.0, 8.0), DVec3::Z, DVec3::Y);
        let mut fb = Framebuffer::new(32, 32);
        let mut renderer = ScreenRenderer::new(32, 32).unwrap();
        renderer.render_frame(&tree, &camera, &mut fb);

        assert!(fb.pixels().iter().all(|&c| c == color));
        for y in 0..32 {
            for x in 0..32 {
                assert!(!renderer.mask().needs_paint(x, y));
            }
        }
    }

    #[test]
    fn test_near_voxel_wins_the_shared_cell() {
        let red = rgb(255, 0, 0);
        let blue = rgb(0, 0, 255);
        let mut tree = Octree::new(3);
        tree.set(0, 0, 0, 3, red);
        tree.set(0, 0, 1, 3, blue);
        tree.average(false);

        let camera = Camera::looking(DVec3::new(0.5, 0.5, -30.0), DVec3::Z, DVec3::Y);
        let mut fb = Framebuffer::new(100, 100);
        let mut renderer = ScreenRenderer::new(100, 100).unwrap();
        renderer.render_frame(&tree, &camera, &mut fb);

        let colors: Vec<u32> = fb.pixels().iter().copied().filter(|&c| c != 0).collect();
        assert!(colors.contains(&red), "near voxel visible");
        assert!(!colors.contains(&blue), "far voxel occluded");
    }
}
