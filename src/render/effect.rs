//! Shader effect parameter binding
//!
//! Shader compilation and draw submission live in the graphics backend; the
//! streaming engine only needs to push uniform values into the effects that
//! render the point cloud.

use std::collections::HashMap;
use std::sync::Arc;

use image::RgbImage;
use serde::{Deserialize, Serialize};

/// How point sizes are computed by the point shaders
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointSizeMode {
    /// Every point covers the same number of pixels
    #[default]
    FixedPixelSize,
    /// Every point has the same world-space size
    FixedWorldSize,
    /// Point size follows the local octree level (needs the hierarchy texture)
    AdaptiveSize,
}

/// A value bound to a named shader parameter
#[derive(Clone, Debug)]
pub enum EffectParam {
    Float(f32),
    Int(i32),
    Texture(Arc<RgbImage>),
}

/// Receiver of effect parameters (depth pre-pass, color pass, ...)
pub trait ShaderEffect {
    fn set_effect_param(&mut self, name: &str, value: EffectParam);
}

/// Plain parameter table, for backends that upload uniforms lazily
#[derive(Clone, Debug, Default)]
pub struct EffectParams {
    pub label: String,
    params: HashMap<String, EffectParam>,
}

impl EffectParams {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            params: HashMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&EffectParam> {
        self.params.get(name)
    }

    /// Bound texture for `name`, if the parameter holds one
    pub fn texture(&self, name: &str) -> Option<&Arc<RgbImage>> {
        match self.params.get(name) {
            Some(EffectParam::Texture(tex)) => Some(tex),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl ShaderEffect for EffectParams {
    fn set_effect_param(&mut self, name: &str, value: EffectParam) {
        self.params.insert(name.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_replace_param() {
        let mut effect = EffectParams::new("color_pass");
        effect.set_effect_param("PointSize", EffectParam::Float(2.0));
        effect.set_effect_param("PointSize", EffectParam::Float(3.0));

        assert_eq!(effect.len(), 1);
        assert!(matches!(effect.get("PointSize"), Some(EffectParam::Float(v)) if *v == 3.0));
        assert!(effect.texture("PointSize").is_none());
    }

    #[test]
    fn test_texture_param() {
        let mut effect = EffectParams::new("depth_pass");
        let tex = Arc::new(RgbImage::new(4, 1));
        effect.set_effect_param("OctreeTex", EffectParam::Texture(tex.clone()));
        assert!(Arc::ptr_eq(effect.texture("OctreeTex").unwrap(), &tex));
    }

    #[test]
    fn test_point_size_mode_default() {
        assert_eq!(PointSizeMode::default(), PointSizeMode::FixedPixelSize);
    }
}
