//! Core type aliases and re-exports

pub use glam::{DMat3, DQuat, DVec3, IVec4};

/// Standard Result type for the engine
pub type Result<T> = std::result::Result<T, crate::core::error::Error>;
