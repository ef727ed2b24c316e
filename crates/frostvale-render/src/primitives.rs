//! Mesh primitives (ground plane, wall quad) and tangent generation

use bytemuck::{Pod, Zeroable};
use frostvale_core::Primitive;
use glam::{Vec2, Vec3};

/// A vertex with position, normal, UV, and tangent (w = bitangent sign)
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub tangent: [f32; 4],
}

impl Vertex {
    const ATTRIBS: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x3,
        2 => Float32x2,
        3 => Float32x4,
    ];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }

    fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
            tangent: [1.0, 0.0, 0.0, 1.0],
        }
    }
}

/// A mesh with vertices and indices
#[derive(Debug, Clone)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }
}

/// Build the mesh for a built-in primitive.
pub fn create_primitive_mesh(primitive: Primitive) -> Mesh {
    match primitive {
        Primitive::Plane => create_plane_mesh(),
        Primitive::Wall => create_wall_mesh(),
    }
}

/// Unit ground plane spanning [-1, 1] on X and Z, facing +Y.
pub fn create_plane_mesh() -> Mesh {
    let n = [0.0, 1.0, 0.0];
    let vertices = vec![
        Vertex::new([-1.0, 0.0, 1.0], n, [0.0, 0.0]),
        Vertex::new([1.0, 0.0, 1.0], n, [1.0, 0.0]),
        Vertex::new([1.0, 0.0, -1.0], n, [1.0, 1.0]),
        Vertex::new([-1.0, 0.0, -1.0], n, [0.0, 1.0]),
    ];
    let mut mesh = Mesh {
        vertices,
        indices: vec![0, 1, 2, 0, 2, 3],
    };
    compute_tangents(&mut mesh);
    mesh
}

/// Unit wall quad spanning [-1, 1] on X and Y, facing +Z.
pub fn create_wall_mesh() -> Mesh {
    let n = [0.0, 0.0, 1.0];
    let vertices = vec![
        Vertex::new([-1.0, 1.0, 0.0], n, [0.0, 0.0]),
        Vertex::new([-1.0, -1.0, 0.0], n, [0.0, 1.0]),
        Vertex::new([1.0, -1.0, 0.0], n, [1.0, 1.0]),
        Vertex::new([1.0, 1.0, 0.0], n, [1.0, 0.0]),
    ];
    let mut mesh = Mesh {
        vertices,
        indices: vec![0, 1, 2, 0, 2, 3],
    };
    compute_tangents(&mut mesh);
    mesh
}

/// Per-vertex tangents from triangle UV gradients, orthogonalized against the normal.
///
/// Degenerate UVs fall back to an arbitrary tangent perpendicular to the normal.
pub fn compute_tangents(mesh: &mut Mesh) {
    let count = mesh.vertices.len();
    let mut tan = vec![Vec3::ZERO; count];
    let mut bitan = vec![Vec3::ZERO; count];

    for tri in mesh.indices.chunks_exact(3) {
        let [i0, i1, i2] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        if i0 >= count || i1 >= count || i2 >= count {
            continue;
        }
        let p0 = Vec3::from(mesh.vertices[i0].position);
        let p1 = Vec3::from(mesh.vertices[i1].position);
        let p2 = Vec3::from(mesh.vertices[i2].position);
        let uv0 = Vec2::from(mesh.vertices[i0].uv);
        let uv1 = Vec2::from(mesh.vertices[i1].uv);
        let uv2 = Vec2::from(mesh.vertices[i2].uv);

        let e1 = p1 - p0;
        let e2 = p2 - p0;
        let d1 = uv1 - uv0;
        let d2 = uv2 - uv0;
        let det = d1.x * d2.y - d2.x * d1.y;
        if det.abs() < 1e-8 {
            continue;
        }
        let r = 1.0 / det;
        let t = (e1 * d2.y - e2 * d1.y) * r;
        let b = (e2 * d1.x - e1 * d2.x) * r;
        for i in [i0, i1, i2] {
            tan[i] += t;
            bitan[i] += b;
        }
    }

    for (i, v) in mesh.vertices.iter_mut().enumerate() {
        let n = Vec3::from(v.normal).normalize_or_zero();
        let t = tan[i] - n * n.dot(tan[i]);
        let t = t.try_normalize().unwrap_or_else(|| n.any_orthonormal_vector());
        let w = if n.cross(t).dot(bitan[i]) < 0.0 { -1.0 } else { 1.0 };
        v.tangent = [t.x, t.y, t.z, w];
    }
}
