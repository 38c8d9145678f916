//! Axis-decomposed per-face traversal
//!
//! Each cube face rendering splits into four quadrants by the signs of the
//! face-plane axes. A quadrant walk descends the octree and the face
//! quadtree in lockstep: the integer bounds `(x1, x2, y1, y2)` track the
//! current mask cell expressed in the current octree node's projected
//! frame, with `(x1p, x2p, y1p, y2p)` carrying how those bounds move when
//! the walk steps one level down the octree. Octree descents double the
//! bounds, mask descents split them at the midpoint, so the arithmetic
//! stays affine and no per-pixel transforms happen anywhere.

use crate::mask::Quadtree;
use crate::octree::{NodeId, Octree, EMPTY, ROOT};
use crate::render::RenderStats;

/// Axis permutation and far-corner choice for one cube face
struct FaceParams {
    /// Child octant farthest from the camera before quadrant adjustment
    corner: usize,
    /// Octant bit mapped to face x
    ax: usize,
    /// Octant bit mapped to face y
    ay: usize,
    /// Octant bit mapped to face depth
    az: usize,
}

/// Face order: +Y, +Z, +X, -Z, -X, -Y
const FACES: [FaceParams; 6] = [
    FaceParams { corner: 0, ax: 4, ay: 1, az: 2 },
    FaceParams { corner: 0, ax: 4, ay: 2, az: 1 },
    FaceParams { corner: 3, ax: 1, ay: 2, az: 4 },
    FaceParams { corner: 5, ax: 4, ay: 2, az: 1 },
    FaceParams { corner: 6, ax: 1, ay: 2, az: 4 },
    FaceParams { corner: 3, ax: 4, ay: 1, az: 2 },
];

/// Render one cube face into its coverage quadtree.
///
/// `(x, y, z)` is the camera position in voxel units, `w` the scene size.
pub(crate) fn render_face(
    octree: &Octree,
    quad: &mut Quadtree,
    face: usize,
    x: i32,
    y: i32,
    z: i32,
    w: i32,
    stats: &mut RenderStats,
) {
    // Face-plane coordinates of the camera and its distance to the far
    // scene edge along the face axis.
    let (u, v, q) = match face {
        0 => (x, z, w - y),
        1 => (x, y, w - z),
        2 => (-z, -y, w - x),
        3 => (-x, y, w + z),
        4 => (z, -y, w + x),
        5 => (x, -z, w + y),
        _ => unreachable!("cube has six faces"),
    };
    let p = &FACES[face];
    // The axis permutation must cover x, y and depth exactly once.
    debug_assert_eq!(p.ax + p.ay + p.az, 7);
    debug_assert!(p.corner < 8);
    let one = w;
    let quadrants = [
        (-1i32, -1i32, p.corner ^ p.ax ^ p.ay),
        (1, -1, p.corner ^ p.ay),
        (-1, 1, p.corner ^ p.ax),
        (1, 1, p.corner),
    ];
    for (r, &(dx, dy, corner)) in quadrants.iter().enumerate() {
        if !quad.is_marked(r) {
            continue;
        }
        let mut walk = Walk {
            octree,
            quad: &mut *quad,
            stats: &mut *stats,
            one,
            depth_cap: octree.depth(),
            dx,
            dy,
            corner,
            ax: p.ax,
            ay: p.ay,
            az: p.az,
        };
        let (x1, x2, x1p, x2p) = if dx < 0 { (u - q, u, -one, 0) } else { (u, u + q, 0, one) };
        let (y1, y2, y1p, y2p) = if dy < 0 { (v - q, v, -one, 0) } else { (v, v + q, 0, one) };
        walk.traverse(r, ROOT, x1, x2, x1p, x2p, y1, y2, y1p, y2p, 0);
    }
}

/// One quadrant's traversal state
struct Walk<'a> {
    octree: &'a Octree,
    quad: &'a mut Quadtree,
    stats: &'a mut RenderStats,
    one: i32,
    depth_cap: u32,
    dx: i32,
    dy: i32,
    corner: usize,
    ax: usize,
    ay: usize,
    az: usize,
}

impl Walk<'_> {
    #[allow(clippy::too_many_arguments)]
    fn traverse(
        &mut self,
        r: usize,
        s: NodeId,
        x1: i32,
        x2: i32,
        x1p: i32,
        x2p: i32,
        y1: i32,
        y2: i32,
        y1p: i32,
        y2p: i32,
        d: u32,
    ) {
        self.stats.visits += 1;
        let one = self.one;
        // Cell entirely outside the node's projected frame.
        if x2 - (1 - self.dx) * x2p <= -one || one <= x1 - (1 + self.dx) * x1p {
            return;
        }
        if y2 - (1 - self.dy) * y2p <= -one || one <= y1 - (1 + self.dy) * y1p {
            return;
        }

        if x2 - x1 <= 2 * one && y2 - y1 <= 2 * one && d < self.depth_cap {
            // The node still projects larger than the cell: descend the
            // octree, nearest four octants first.
            let node = self.octree.node(s);
            let children = node.children;
            let leaf = node.is_leaf();
            // A solid leaf stands in for each of its children.
            let pick = |i: usize| -> Option<NodeId> {
                if leaf {
                    Some(s)
                } else {
                    let c = children[i];
                    if c == EMPTY {
                        None
                    } else {
                        Some(c)
                    }
                }
            };
            let (dx, dy) = (self.dx, self.dy);
            let (c, ax, ay, az) = (self.corner, self.ax, self.ay, self.az);
            let x3 = x1 - x1p;
            let x4 = x2 - x2p;
            let y3 = y1 - y1p;
            let y4 = y2 - y2p;
            if x3 < x4 && y3 < y4 {
                if let Some(t) = pick(c) {
                    self.stats.oct_visits += 1;
                    self.traverse(r, t, 2*x3 + dx*one, 2*x4 + dx*one, x1p, x2p, 2*y3 + dy*one, 2*y4 + dy*one, y1p, y2p, d + 1);
                }
                if let Some(t) = pick(c ^ ax) {
                    self.stats.oct_visits += 1;
                    self.traverse(r, t, 2*x3 - dx*one, 2*x4 - dx*one, x1p, x2p, 2*y3 + dy*one, 2*y4 + dy*one, y1p, y2p, d + 1);
                }
                if let Some(t) = pick(c ^ ay) {
                    self.stats.oct_visits += 1;
                    self.traverse(r, t, 2*x3 + dx*one, 2*x4 + dx*one, x1p, x2p, 2*y3 - dy*one, 2*y4 - dy*one, y1p, y2p, d + 1);
                }
                if let Some(t) = pick(c ^ ax ^ ay) {
                    self.stats.oct_visits += 1;
                    self.traverse(r, t, 2*x3 - dx*one, 2*x4 - dx*one, x1p, x2p, 2*y3 - dy*one, 2*y4 - dy*one, y1p, y2p, d + 1);
                }
            }
            if let Some(t) = pick(c ^ az) {
                self.stats.oct_visits += 1;
                self.traverse(r, t, 2*x1 + dx*one, 2*x2 + dx*one, x1p, x2p, 2*y1 + dy*one, 2*y2 + dy*one, y1p, y2p, d + 1);
            }
            if let Some(t) = pick(c ^ ax ^ az) {
                self.stats.oct_visits += 1;
                self.traverse(r, t, 2*x1 - dx*one, 2*x2 - dx*one, x1p, x2p, 2*y1 + dy*one, 2*y2 + dy*one, y1p, y2p, d + 1);
            }
            if let Some(t) = pick(c ^ ay ^ az) {
                self.stats.oct_visits += 1;
                self.traverse(r, t, 2*x1 + dx*one, 2*x2 + dx*one, x1p, x2p, 2*y1 - dy*one, 2*y2 - dy*one, y1p, y2p, d + 1);
            }
            if let Some(t) = pick(c ^ ax ^ ay ^ az) {
                self.stats.oct_visits += 1;
                self.traverse(r, t, 2*x1 - dx*one, 2*x2 - dx*one, x1p, x2p, 2*y1 - dy*one, 2*y2 - dy*one, y1p, y2p, d + 1);
            }
        } else {
            // The cell is the larger of the two: descend the mask, painting
            // once its children are leaves.
            let xm = (x1 + x2) / 2;
            let xmp = (x1p + x2p) / 2;
            let ym = (y1 + y2) / 2;
            let ymp = (y1p + y2p) / 2;
            if r < self.quad.branch_limit() {
                if self.quad.is_marked(4 * r + 4) {
                    self.stats.quad_visits += 1;
                    self.traverse(4 * r + 4, s, x1, xm, x1p, xmp, y1, ym, y1p, ymp, d);
                }
                if self.quad.is_marked(4 * r + 5) {
                    self.stats.quad_visits += 1;
                    self.traverse(4 * r + 5, s, xm, x2, xmp, x2p, y1, ym, y1p, ymp, d);
                }
                if self.quad.is_marked(4 * r + 6) {
                    self.stats.quad_visits += 1;
                    self.traverse(4 * r + 6, s, x1, xm, x1p, xmp, ym, y2, ymp, y2p, d);
                }
                if self.quad.is_marked(4 * r + 7) {
                    self.stats.quad_visits += 1;
                    self.traverse(4 * r + 7, s, xm, x2, xmp, x2p, ym, y2, ymp, y2p, d);
                }
            } else {
                if self.quad.is_marked(4 * r + 4) {
                    self.paint(4 * r + 4, s, x1, xm, x1p, xmp, y1, ym, y1p, ymp);
                }
                if self.quad.is_marked(4 * r + 5) {
                    self.paint(4 * r + 5, s, xm, x2, xmp, x2p, y1, ym, y1p, ymp);
                }
                if self.quad.is_marked(4 * r + 6) {
                    self.paint(4 * r + 6, s, x1, xm, x1p, xmp, ym, y2, ymp, y2p);
                }
                if self.quad.is_marked(4 * r + 7) {
                    self.paint(4 * r + 7, s, xm, x2, xmp, x2p, ym, y2, ymp, y2p);
                }
            }
            self.quad.compute(r);
        }
    }

    /// Paint a mask leaf with the node's averaged color, first write wins.
    #[allow(clippy::too_many_arguments)]
    fn paint(
        &mut self,
        r: usize,
        s: NodeId,
        x1: i32,
        x2: i32,
        x1p: i32,
        x2p: i32,
        y1: i32,
        y2: i32,
        y1p: i32,
        y2p: i32,
    ) {
        let one = self.one;
        if x2 - (1 - self.dx) * x2p <= -one || one <= x1 - (1 + self.dx) * x1p {
            return;
        }
        if y2 - (1 - self.dy) * y2p <= -one || one <= y1 - (1 + self.dy) * y1p {
            return;
        }
        self.quad.paint(r, self.octree.node(s).color);
    }
}
