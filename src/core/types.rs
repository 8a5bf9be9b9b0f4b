//! Core type aliases and re-exports

pub use glam::{Mat4, Vec3, Vec4};
pub use uuid::Uuid;

/// Standard Result type for the streaming engine
pub type Result<T> = std::result::Result<T, crate::core::error::Error>;
