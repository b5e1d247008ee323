//! Mesh generators for common shapes.
//!
//! Used to build fixture scenes (a mug body is an open cylinder with a
//! wrap-around UV seam) and to feed the software unwrap preview.

use std::f32::consts::PI;

use super::data::CpuMesh;
use super::layout::VertexLayout;

/// Internal vertex type for cylinder generation (position + normal + uv).
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct PnuVertex {
    position: [f32; 3],
    normal: [f32; 3],
    uv: [f32; 2],
}

/// Internal vertex type for cylinder generation without UVs.
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct PnVertex {
    position: [f32; 3],
    normal: [f32; 3],
}

/// Internal vertex type for quad generation (position + uv).
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct PuVertex {
    position: [f32; 3],
    uv: [f32; 2],
}

fn cylinder_indices(segments: u32) -> Vec<u32> {
    let mut indices = Vec::with_capacity(segments as usize * 6);
    for segment in 0..segments {
        let bottom = segment * 2;
        let top = bottom + 1;
        let next_bottom = bottom + 2;
        let next_top = bottom + 3;

        indices.extend_from_slice(&[bottom, next_bottom, top]);
        indices.extend_from_slice(&[top, next_bottom, next_top]);
    }
    indices
}

/// Generate an open cylinder (no caps) around the Y axis.
///
/// `u` runs once around the circumference and `v` runs from the top rim
/// (0) to the bottom rim (1). The seam is duplicated so `u` reaches
/// exactly 1.0. The mesh uses the `position_normal_uv` layout (32 bytes
/// per vertex) with u32 indices.
///
/// # Arguments
///
/// * `radius` - Cylinder radius
/// * `height` - Total height, centered on the origin
/// * `segments` - Number of segments around the circumference
pub fn generate_cylinder(radius: f32, height: f32, segments: u32) -> CpuMesh {
    let segments = segments.max(3);
    let half = height * 0.5;
    let mut vertices = Vec::with_capacity((segments as usize + 1) * 2);

    for segment in 0..=segments {
        let u = segment as f32 / segments as f32;
        let phi = u * 2.0 * PI;
        let (sin_phi, cos_phi) = phi.sin_cos();
        let normal = [cos_phi, 0.0, sin_phi];

        vertices.push(PnuVertex {
            position: [cos_phi * radius, -half, sin_phi * radius],
            normal,
            uv: [u, 1.0],
        });
        vertices.push(PnuVertex {
            position: [cos_phi * radius, half, sin_phi * radius],
            normal,
            uv: [u, 0.0],
        });
    }

    let vertex_bytes = bytemuck::cast_slice(&vertices).to_vec();

    CpuMesh::new(VertexLayout::position_normal_uv())
        .with_vertex_data(0, vertex_bytes)
        .with_indices_u32(&cylinder_indices(segments))
        .with_label("cylinder")
}

/// Same shape as [`generate_cylinder`] but without texture coordinates.
///
/// Uses the `position_normal` layout (24 bytes per vertex).
pub fn generate_cylinder_untextured(radius: f32, height: f32, segments: u32) -> CpuMesh {
    let segments = segments.max(3);
    let half = height * 0.5;
    let mut vertices = Vec::with_capacity((segments as usize + 1) * 2);

    for segment in 0..=segments {
        let phi = segment as f32 / segments as f32 * 2.0 * PI;
        let (sin_phi, cos_phi) = phi.sin_cos();
        let normal = [cos_phi, 0.0, sin_phi];

        vertices.push(PnVertex {
            position: [cos_phi * radius, -half, sin_phi * radius],
            normal,
        });
        vertices.push(PnVertex {
            position: [cos_phi * radius, half, sin_phi * radius],
            normal,
        });
    }

    let vertex_bytes = bytemuck::cast_slice(&vertices).to_vec();

    CpuMesh::new(VertexLayout::position_normal())
        .with_vertex_data(0, vertex_bytes)
        .with_indices_u32(&cylinder_indices(segments))
        .with_label("cylinder_untextured")
}

/// Generate a quad mesh on the XY plane.
///
/// Creates a quad centered at the origin with the given half-width and
/// half-height. The mesh uses a position + texcoord layout (20 bytes per
/// vertex) with u32 indices.
///
/// UV coordinates go from (0,0) at top-left to (1,1) at bottom-right.
pub fn generate_quad(half_width: f32, half_height: f32) -> CpuMesh {
    let vertices = [
        PuVertex {
            position: [-half_width, -half_height, 0.0],
            uv: [0.0, 1.0],
        },
        PuVertex {
            position: [half_width, -half_height, 0.0],
            uv: [1.0, 1.0],
        },
        PuVertex {
            position: [half_width, half_height, 0.0],
            uv: [1.0, 0.0],
        },
        PuVertex {
            position: [-half_width, half_height, 0.0],
            uv: [0.0, 0.0],
        },
    ];

    let indices: [u32; 6] = [0, 1, 2, 2, 3, 0];
    let vertex_bytes = bytemuck::cast_slice(&vertices).to_vec();

    CpuMesh::new(VertexLayout::position_uv())
        .with_vertex_data(0, vertex_bytes)
        .with_indices_u32(&indices)
        .with_label("quad")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_cylinder() {
        let mesh = generate_cylinder(1.0, 2.0, 8);
        // (segments+1) * 2 = 18 vertices
        assert_eq!(mesh.vertex_count(), 18);
        // segments * 6 = 48 indices
        assert_eq!(mesh.index_count(), 48);
        assert!(mesh.has_uvs());
        assert_eq!(mesh.vertex_buffer_data(0).unwrap().len(), 18 * 32);
    }

    #[test]
    fn test_cylinder_uvs_span_unit_square() {
        let uvs = generate_cylinder(1.0, 1.0, 16).read_uvs().unwrap();
        let max_u = uvs.iter().map(|uv| uv[0]).fold(f32::MIN, f32::max);
        let min_u = uvs.iter().map(|uv| uv[0]).fold(f32::MAX, f32::min);
        assert_eq!(min_u, 0.0);
        assert_eq!(max_u, 1.0);
        assert!(uvs.iter().all(|uv| uv[1] == 0.0 || uv[1] == 1.0));
    }

    #[test]
    fn test_untextured_cylinder_has_no_uvs() {
        let mesh = generate_cylinder_untextured(1.0, 1.0, 3);
        assert!(!mesh.has_uvs());
        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(mesh.vertex_buffer_data(0).unwrap().len(), 8 * 24);
    }

    #[test]
    fn test_generate_quad() {
        let mesh = generate_quad(0.5, 0.5);
        assert_eq!(mesh.vertex_count(), 4);
        assert!(mesh.is_indexed());
        assert_eq!(mesh.index_count(), 6);
        assert_eq!(mesh.vertex_buffer_data(0).unwrap().len(), 4 * 20);
    }
}
