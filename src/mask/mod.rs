//! Hierarchical screen-coverage masks
//!
//! Both renderers track which parts of the screen still need paint in a
//! pyramidal bitmap, so traversal can skip whole subtrees of the screen the
//! moment nearer geometry has filled them. The cubemap path keeps one
//! 4-ary pyramid per cube face; the direct screen path uses a single
//! 16-ary pyramid whose nodes own a 4x4 grid of descendants two levels
//! down.

pub mod quadtree;
pub mod tiles;

pub use quadtree::Quadtree;
pub use tiles::TileMask;
