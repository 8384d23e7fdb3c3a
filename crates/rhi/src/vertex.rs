//! Vertex data structures and input descriptions.

use ash::vk;
use bytemuck::{Pod, Zeroable};

/// Vertex format with position and color.
///
/// # Memory Layout
///
/// `#[repr(C)]` keeps the layout predictable:
/// - Offset 0: position (12 bytes)
/// - Offset 12: color (12 bytes)
/// - Total size: 24 bytes
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// Position in clip space.
    pub position: [f32; 3],
    /// RGB color.
    pub color: [f32; 3],
}

impl Vertex {
    /// Creates a new vertex.
    #[inline]
    pub const fn new(position: [f32; 3], color: [f32; 3]) -> Self {
        Self { position, color }
    }

    /// Get the vertex input binding description.
    ///
    /// Binding 0, per-vertex input rate.
    pub fn binding_description() -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription {
            binding: 0,
            stride: std::mem::size_of::<Self>() as u32,
            input_rate: vk::VertexInputRate::VERTEX,
        }
    }

    /// Get the vertex attribute descriptions.
    pub fn attribute_descriptions() -> [vk::VertexInputAttributeDescription; 2] {
        [
            // Position at location 0
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 0,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: 0,
            },
            // Color at location 1
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 1,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: 12,
            },
        ]
    }
}

/// Clip-space triangle with one red, one green, and one blue corner.
pub const TRIANGLE: [Vertex; 3] = [
    Vertex::new([0.0, -0.5, 0.0], [1.0, 0.0, 0.0]),
    Vertex::new([0.5, 0.5, 0.0], [0.0, 1.0, 0.0]),
    Vertex::new([-0.5, 0.5, 0.0], [0.0, 0.0, 1.0]),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_size() {
        // 2 x [f32; 3] = 2 x 12 = 24 bytes
        assert_eq!(std::mem::size_of::<Vertex>(), 24);
    }

    #[test]
    fn test_vertex_binding_description() {
        let binding = Vertex::binding_description();
        assert_eq!(binding.binding, 0);
        assert_eq!(binding.stride, 24);
        assert_eq!(binding.input_rate, vk::VertexInputRate::VERTEX);
    }

    #[test]
    fn test_vertex_attribute_descriptions() {
        let attrs = Vertex::attribute_descriptions();
        assert_eq!(attrs.len(), 2);

        // Position attribute
        assert_eq!(attrs[0].binding, 0);
        assert_eq!(attrs[0].location, 0);
        assert_eq!(attrs[0].format, vk::Format::R32G32B32_SFLOAT);
        assert_eq!(attrs[0].offset, 0);

        // Color attribute
        assert_eq!(attrs[1].binding, 0);
        assert_eq!(attrs[1].location, 1);
        assert_eq!(attrs[1].format, vk::Format::R32G32B32_SFLOAT);
        assert_eq!(attrs[1].offset, 12);
    }

    #[test]
    fn test_vertex_offsets() {
        use std::mem::offset_of;

        assert_eq!(offset_of!(Vertex, position), 0);
        assert_eq!(offset_of!(Vertex, color), 12);
    }

    #[test]
    fn test_vertex_pod_cast() {
        let bytes: &[u8] = bytemuck::cast_slice(&TRIANGLE);
        assert_eq!(bytes.len(), 3 * 24);

        let back: &[Vertex] = bytemuck::cast_slice(bytes);
        assert_eq!(back, &TRIANGLE);
    }
}
