//! Render-side collaborators: effect parameters and the hierarchy texture

pub mod effect;
pub mod hierarchy;

pub use effect::{EffectParam, EffectParams, PointSizeMode, ShaderEffect};
pub use hierarchy::{HierarchyTexture, OCTREE_TEX_PARAM};
