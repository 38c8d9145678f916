//! ASCII voxel stream ingestion
//!
//! Voxel dumps are whitespace-separated `x y z hexcolor` records, decimal
//! coordinates and a hex color word. Records may span line breaks. The
//! loader stops at the first record that is short or fails to parse,
//! keeping everything ingested before it.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{Octree, MAX_DEPTH};
use crate::core::color;
use crate::core::error::Error;
use crate::core::types::Result;

/// Per-load configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    /// Octree depth; the scene is a `2^depth` sided cube
    pub depth: u32,
    /// Axis mask for replication; bit 2 = keep x, 1 = keep y, 0 = keep z.
    /// 7 keeps everything (no tiling).
    pub replicate_mask: u8,
    /// Number of top levels to replicate across
    pub replicate_depth: u32,
    /// Right-shift applied to input coordinates to coarsen the model
    pub downsample_shift: u32,
    /// Collapse interiors whose only child is a leaf
    pub prune: bool,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            depth: 20,
            replicate_mask: 7,
            replicate_depth: 0,
            downsample_shift: 0,
            prune: false,
        }
    }
}

impl LoadConfig {
    /// Boot-time validation; fatal on nonsense before any work happens.
    pub fn validate(&self) -> Result<()> {
        if self.depth == 0 || self.depth > MAX_DEPTH {
            return Err(Error::Config(format!(
                "octree depth {} outside 1..={MAX_DEPTH}",
                self.depth
            )));
        }
        if self.replicate_mask > 7 {
            return Err(Error::Config(format!(
                "replicate mask {:#x} outside 0..=7",
                self.replicate_mask
            )));
        }
        if self.downsample_shift >= self.depth {
            return Err(Error::Config(format!(
                "downsample shift {} must stay below depth {}",
                self.downsample_shift, self.depth
            )));
        }
        Ok(())
    }
}

/// Load a voxel dump from a file. A missing file is fatal.
pub fn load_file(path: &Path, config: &LoadConfig) -> Result<Octree> {
    let file = File::open(path)?;
    load_ascii(BufReader::new(file), config)
}

/// Ingest an ASCII voxel stream into a fresh octree, then average and
/// replicate per the config. Returns the compiled tree.
pub fn load_ascii<R: BufRead>(reader: R, config: &LoadConfig) -> Result<Octree> {
    config.validate()?;
    let mut tree = Octree::new(config.depth);
    let ds = config.downsample_shift;
    let insert_depth = config.depth - ds;
    let mut record = [0u32; 4];
    let mut have = 0;
    let mut count: u64 = 0;

    'ingest: for line in reader.lines() {
        let line = line?;
        for token in line.split_whitespace() {
            let parsed = if have == 3 {
                u32::from_str_radix(token, 16)
            } else {
                token.parse::<u32>()
            };
            match parsed {
                Ok(v) => {
                    record[have] = v;
                    have += 1;
                }
                Err(_) => break 'ingest,
            }
            if have == 4 {
                have = 0;
                let c = color::from_voxel_word(record[3]);
                tree.set(record[0] >> ds, record[1] >> ds, record[2] >> ds, insert_depth, c);
                count += 1;
                if count % (1 << 20) == 0 {
                    log::info!("loaded {} Mi points", count >> 20);
                }
            }
        }
    }

    log::info!(
        "loaded {} points, {} nodes ({} MiB)",
        count,
        tree.node_count(),
        tree.memory_usage() >> 20
    );
    tree.average(config.prune);
    tree.replicate(config.replicate_mask, config.replicate_depth);
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn config(depth: u32) -> LoadConfig {
        LoadConfig { depth, ..LoadConfig::default() }
    }

    #[test]
    fn test_load_simple_records() {
        let input = "0 0 0 ff0000\n1 0 0 0000ff\n";
        let tree = load_ascii(Cursor::new(input), &config(3)).unwrap();
        // Color words are endian-swapped with opaque alpha forced in.
        assert_eq!(tree.sample(0, 0, 0), Some(0xff0000ff));
        assert_eq!(tree.sample(1, 0, 0), Some(0xffff0000));
    }

    #[test]
    fn test_records_may_span_lines() {
        let input = "3 2\n1 aabbcc";
        let tree = load_ascii(Cursor::new(input), &config(2)).unwrap();
        assert_eq!(tree.sample(3, 2, 1), Some(0xffccbbaa));
    }

    #[test]
    fn test_stops_at_malformed_record_keeping_prior() {
        let input = "0 0 0 123456\n1 oops 0 654321\n2 0 0 abcdef\n";
        let tree = load_ascii(Cursor::new(input), &config(2)).unwrap();
        assert!(tree.sample(0, 0, 0).is_some());
        assert_eq!(tree.sample(2, 0, 0), None);
    }

    #[test]
    fn test_short_final_record_is_dropped() {
        let input = "0 0 0 ffffff\n1 1";
        let tree = load_ascii(Cursor::new(input), &config(2)).unwrap();
        assert!(tree.sample(0, 0, 0).is_some());
        assert_eq!(tree.sample(1, 1, 0), None);
    }

    #[test]
    fn test_downsample_shift() {
        let mut cfg = config(3);
        cfg.downsample_shift = 1;
        let input = "4 6 2 808080\n";
        let tree = load_ascii(Cursor::new(input), &cfg).unwrap();
        // Inserted two levels deep at halved coordinates; the cell spans
        // the whole 2x2x2 block.
        assert_eq!(tree.sample(4, 6, 2), Some(0xff808080));
        assert_eq!(tree.sample(5, 7, 3), Some(0xff808080));
        assert_eq!(tree.sample(0, 0, 0), None);
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(config(0).validate().is_err());
        assert!(config(27).validate().is_err());
        let mut cfg = config(8);
        cfg.replicate_mask = 9;
        assert!(cfg.validate().is_err());
        let mut cfg = config(4);
        cfg.downsample_shift = 4;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let err = load_file(Path::new("/nonexistent/points.vxl"), &config(8));
        assert!(matches!(err, Err(Error::Io(_))));
    }
}
