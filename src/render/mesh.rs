use crate::core::vertex::Vertex;

pub const VERTICES_PER_FACE: usize = 4;
pub const INDICES_PER_FACE: usize = 6;

/// Writes one quad into preallocated slots: 4 vertices, 2 triangles (0,1,2) and (0,2,3).
pub fn write_quad(
    vertices: &mut [Vertex],
    indices: &mut [u32],
    base_idx: u32,
    corners: [[f32; 3]; 4],
    normal: [f32; 3],
    color: [f32; 3],
) {
    for (slot, position) in vertices.iter_mut().zip(corners) {
        *slot = Vertex {
            position,
            normal,
            color,
        };
    }
    indices.copy_from_slice(&[
        base_idx,
        base_idx + 1,
        base_idx + 2,
        base_idx,
        base_idx + 2,
        base_idx + 3,
    ]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytemuck::Zeroable;

    #[test]
    fn quad_layout() {
        let mut vertices = [Vertex::zeroed(); 8];
        let mut indices = [0u32; 12];
        let corners = [[0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0], [1.0, 0.0, 0.0]];
        write_quad(
            &mut vertices[4..8],
            &mut indices[6..12],
            4,
            corners,
            [0.0, 0.0, -1.0],
            [0.5, 0.5, 0.5],
        );
        assert_eq!(&indices[6..12], &[4, 5, 6, 4, 6, 7]);
        assert_eq!(vertices[5].position, [0.0, 1.0, 0.0]);
        assert_eq!(vertices[7].normal, [0.0, 0.0, -1.0]);
        assert_eq!(vertices[0], Vertex::zeroed());
    }
}
