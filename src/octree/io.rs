//! Octree disk snapshots
//!
//! A compiled octree can be written out and mapped back in so large scenes
//! are ingested once and reopened fast. The archive is an rkyv byte image
//! of the node arena with an LZ4 frame around it.

use std::path::Path;

use rkyv::{Archive, Deserialize, Serialize};

use super::{Node, Octree, EMPTY, MAX_DEPTH};
use crate::core::error::Error;
use crate::core::types::Result;

#[derive(Archive, Deserialize, Serialize)]
struct OctreeData {
    depth: u32,
    nodes: Vec<Node>,
}

/// Serialize a compiled octree to bytes (uncompressed)
pub fn serialize_octree(tree: &Octree) -> Result<Vec<u8>> {
    let data = OctreeData {
        depth: tree.depth(),
        nodes: tree.nodes_slice().to_vec(),
    };
    let bytes = rkyv::to_bytes::<rkyv::rancor::Error>(&data)
        .map_err(|e| Error::Snapshot(e.to_string()))?;
    Ok(bytes.to_vec())
}

/// Deserialize an octree from snapshot bytes, validating the arena
pub fn deserialize_octree(bytes: &[u8]) -> Result<Octree> {
    let archived = rkyv::access::<ArchivedOctreeData, rkyv::rancor::Error>(bytes)
        .map_err(|e| Error::Snapshot(e.to_string()))?;
    let data: OctreeData = rkyv::deserialize::<OctreeData, rkyv::rancor::Error>(archived)
        .map_err(|e| Error::Snapshot(e.to_string()))?;

    if data.depth == 0 || data.depth > MAX_DEPTH {
        return Err(Error::Snapshot(format!("depth {} outside 1..={MAX_DEPTH}", data.depth)));
    }
    if data.nodes.is_empty() {
        return Err(Error::Snapshot("snapshot has no root node".into()));
    }
    let len = data.nodes.len() as u64;
    for (i, node) in data.nodes.iter().enumerate() {
        for &child in &node.children {
            if child != EMPTY && child as u64 >= len {
                return Err(Error::Snapshot(format!(
                    "node {i} references child {child} outside arena of {len}"
                )));
            }
        }
    }
    Ok(Octree::from_parts(data.depth, data.nodes))
}

/// Serialize and LZ4-compress a compiled octree
pub fn compress_octree(tree: &Octree) -> Result<Vec<u8>> {
    let serialized = serialize_octree(tree)?;
    Ok(lz4_flex::compress_prepend_size(&serialized))
}

/// Decompress and deserialize an octree snapshot
pub fn decompress_octree(data: &[u8]) -> Result<Octree> {
    let bytes = lz4_flex::decompress_size_prepended(data)
        .map_err(|e| Error::Snapshot(format!("LZ4 decompression failed: {e}")))?;
    deserialize_octree(&bytes)
}

/// Save a compiled octree to disk (compressed)
pub fn save_octree(path: &Path, tree: &Octree) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, compress_octree(tree)?)?;
    Ok(())
}

/// Load a compiled octree from disk
pub fn load_octree(path: &Path) -> Result<Octree> {
    let data = std::fs::read(path)?;
    decompress_octree(&data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::octree::ROOT;

    fn sample_tree() -> Octree {
        let mut tree = Octree::new(4);
        tree.set(0, 0, 0, 4, 0xffff0000);
        tree.set(9, 3, 14, 4, 0xff00ff00);
        tree.set(15, 15, 15, 4, 0xff0000ff);
        tree.average(false);
        tree
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let tree = sample_tree();
        let restored = decompress_octree(&compress_octree(&tree).unwrap()).unwrap();
        assert_eq!(restored.depth(), tree.depth());
        assert_eq!(restored.node_count(), tree.node_count());
        assert_eq!(restored.sample(9, 3, 14), Some(0xff00ff00));
        assert_eq!(restored.node(ROOT).color, tree.node(ROOT).color);
    }

    #[test]
    fn test_garbage_bytes_rejected() {
        assert!(decompress_octree(&[1, 2, 3, 4]).is_err());
    }

    #[test]
    fn test_dangling_child_rejected() {
        let mut node = Node::empty();
        node.children[3] = 42;
        let broken = Octree::from_parts(4, vec![node]);
        let bytes = serialize_octree(&broken).unwrap();
        assert!(matches!(deserialize_octree(&bytes), Err(Error::Snapshot(_))));
    }
}
