//! Point record decoding
//!
//! Every octant file stores fixed-length point records. A [`PointAccessor`]
//! turns one raw record into a typed point; it performs no I/O.

use std::marker::PhantomData;

use bytemuck::{Pod, Zeroable};

use crate::core::types::Vec3;

/// Decodes fixed-layout point records.
pub trait PointAccessor: Send + Sync + 'static {
    type Point: Send + 'static;

    /// Record length this accessor expects, if it has a fixed one.
    fn record_len(&self) -> Option<usize>;

    /// Decode one raw record.
    fn decode_record(&self, raw: &[u8]) -> Self::Point;
}

/// Points that carry a world-space position.
pub trait HasPosition {
    fn position(&self) -> Vec3;
}

/// Position-only point record (12 bytes)
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct PositionPoint {
    pub position: [f32; 3],
}

impl HasPosition for PositionPoint {
    fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }
}

/// Position + RGBA color point record (16 bytes)
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct PositionColorPoint {
    pub position: [f32; 3],
    pub color: [u8; 4],
}

impl HasPosition for PositionColorPoint {
    fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }
}

/// Accessor for any plain-old-data point layout.
///
/// Records are read unaligned, so the file layout only has to match `P`'s
/// `#[repr(C)]` layout byte for byte.
pub struct PodAccessor<P> {
    _marker: PhantomData<fn() -> P>,
}

impl<P> PodAccessor<P> {
    pub fn new() -> Self {
        Self { _marker: PhantomData }
    }
}

impl<P> Default for PodAccessor<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Pod + Send + 'static> PointAccessor for PodAccessor<P> {
    type Point = P;

    fn record_len(&self) -> Option<usize> {
        Some(std::mem::size_of::<P>())
    }

    fn decode_record(&self, raw: &[u8]) -> P {
        bytemuck::pod_read_unaligned(&raw[..std::mem::size_of::<P>()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_sizes() {
        assert_eq!(PodAccessor::<PositionPoint>::new().record_len(), Some(12));
        assert_eq!(PodAccessor::<PositionColorPoint>::new().record_len(), Some(16));
    }

    #[test]
    fn test_decode_position_color() {
        let point = PositionColorPoint {
            position: [1.0, -2.5, 3.25],
            color: [255, 128, 0, 255],
        };
        // Shift by one byte to exercise unaligned reads
        let mut raw = vec![0u8];
        raw.extend_from_slice(bytemuck::bytes_of(&point));

        let decoded = PodAccessor::<PositionColorPoint>::new().decode_record(&raw[1..]);
        assert_eq!(decoded, point);
        assert_eq!(decoded.position(), Vec3::new(1.0, -2.5, 3.25));
    }
}
