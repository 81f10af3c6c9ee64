use std::collections::HashSet;
use std::f32::consts::TAU;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::GeometryError;

/// Vertex positions (xyz triplets) with an optional triangle index list.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BufferGeometry {
    pub positions: Vec<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indices: Option<Vec<u32>>,
}

/// Axis aligned bounds of a geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }
}

impl BufferGeometry {
    /// Builds a non-indexed triangle soup. The buffer must hold whole
    /// triangles: three vertices of three floats each.
    pub fn from_triangles(positions: Vec<f32>) -> Result<Self, GeometryError> {
        if positions.is_empty() {
            return Err(GeometryError::Empty);
        }
        if positions.len() % 9 != 0 {
            return Err(GeometryError::NotTriangles {
                len: positions.len(),
            });
        }
        Ok(Self {
            positions,
            indices: None,
        })
    }

    /// Builds an indexed geometry, checking every index against the vertices.
    pub fn indexed(positions: Vec<f32>, indices: Vec<u32>) -> Result<Self, GeometryError> {
        if positions.is_empty() {
            return Err(GeometryError::Empty);
        }
        if positions.len() % 3 != 0 || indices.len() % 3 != 0 {
            return Err(GeometryError::NotTriangles {
                len: positions.len(),
            });
        }
        let vertices = positions.len() / 3;
        if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertices) {
            return Err(GeometryError::IndexOutOfRange { index, vertices });
        }
        Ok(Self {
            positions,
            indices: Some(indices),
        })
    }

    /// `count` triangles with every coordinate drawn from `[-2, 2)`.
    pub fn random_triangles(count: usize, rng: &mut fastrand::Rng) -> Self {
        let positions = (0..count * 9)
            .map(|_| (rng.f32() - 0.5) * 4.0)
            .collect();
        Self {
            positions,
            indices: None,
        }
    }

    /// Box centred on the origin with each face subdivided into a grid.
    pub fn cuboid(width: f32, height: f32, depth: f32, segments: [u32; 3]) -> Self {
        let [ws, hs, ds] = segments.map(|s| s.max(1));
        let mut builder = IndexedBuilder::default();
        // (u axis, v axis, normal axis, u sign, v sign, normal sign, u size, v size, normal size, u segs, v segs)
        builder.plane(2, 1, 0, -1.0, -1.0, 1.0, depth, height, width, ds, hs); // +x
        builder.plane(2, 1, 0, 1.0, -1.0, -1.0, depth, height, width, ds, hs); // -x
        builder.plane(0, 2, 1, 1.0, 1.0, 1.0, width, depth, height, ws, ds); // +y
        builder.plane(0, 2, 1, 1.0, -1.0, -1.0, width, depth, height, ws, ds); // -y
        builder.plane(0, 1, 2, 1.0, -1.0, 1.0, width, height, depth, ws, hs); // +z
        builder.plane(0, 1, 2, -1.0, -1.0, -1.0, width, height, depth, ws, hs); // -z
        builder.finish()
    }

    /// Ring of radius `radius` swept by a tube of radius `tube`.
    pub fn torus(radius: f32, tube: f32, radial_segments: u32, tubular_segments: u32) -> Self {
        let radial = radial_segments.max(3);
        let tubular = tubular_segments.max(3);
        let mut positions = Vec::with_capacity(((radial + 1) * (tubular + 1) * 3) as usize);
        for j in 0..=radial {
            let v = j as f32 / radial as f32 * TAU;
            for i in 0..=tubular {
                let u = i as f32 / tubular as f32 * TAU;
                let ring = radius + tube * v.cos();
                positions.extend_from_slice(&[ring * u.cos(), ring * u.sin(), tube * v.sin()]);
            }
        }
        let mut indices = Vec::with_capacity((radial * tubular * 6) as usize);
        for j in 1..=radial {
            for i in 1..=tubular {
                let a = (tubular + 1) * j + i - 1;
                let b = (tubular + 1) * (j - 1) + i - 1;
                let c = (tubular + 1) * (j - 1) + i;
                let d = (tubular + 1) * j + i;
                indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }
        Self {
            positions,
            indices: Some(indices),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        match &self.indices {
            Some(indices) => indices.len() / 3,
            None => self.vertex_count() / 3,
        }
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let mut points = self.positions.chunks_exact(3).map(Vec3::from_slice);
        let first = points.next()?;
        let (min, max) = points.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Some(BoundingBox { min, max })
    }

    pub fn translate(&mut self, offset: Vec3) {
        for chunk in self.positions.chunks_exact_mut(3) {
            chunk[0] += offset.x;
            chunk[1] += offset.y;
            chunk[2] += offset.z;
        }
    }

    /// Moves the geometry so its bounding box is centred on the origin.
    pub fn center(&mut self) {
        if let Some(bounds) = self.bounding_box() {
            self.translate(-bounds.center());
        }
    }

    /// Triangle indices, generating a trivial list for non-indexed data.
    pub fn triangle_indices(&self) -> Vec<u32> {
        match &self.indices {
            Some(indices) => indices.clone(),
            None => (0..self.vertex_count() as u32).collect(),
        }
    }

    /// Unique triangle edges as a line list, for wireframe rendering.
    pub fn wireframe_indices(&self) -> Vec<u32> {
        let triangles = self.triangle_indices();
        let mut seen = HashSet::new();
        let mut lines = Vec::new();
        for tri in triangles.chunks_exact(3) {
            for (a, b) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
                if seen.insert((a.min(b), a.max(b))) {
                    lines.extend_from_slice(&[a, b]);
                }
            }
        }
        lines
    }
}

#[derive(Default)]
struct IndexedBuilder {
    positions: Vec<f32>,
    indices: Vec<u32>,
}

impl IndexedBuilder {
    #[allow(clippy::too_many_arguments)]
    fn plane(
        &mut self,
        u: usize,
        v: usize,
        w: usize,
        u_dir: f32,
        v_dir: f32,
        w_dir: f32,
        width: f32,
        height: f32,
        depth: f32,
        grid_x: u32,
        grid_y: u32,
    ) {
        let base = (self.positions.len() / 3) as u32;
        let segment_width = width / grid_x as f32;
        let segment_height = height / grid_y as f32;
        for iy in 0..=grid_y {
            let y = iy as f32 * segment_height - height / 2.0;
            for ix in 0..=grid_x {
                let x = ix as f32 * segment_width - width / 2.0;
                let mut vertex = [0.0f32; 3];
                vertex[u] = x * u_dir;
                vertex[v] = y * v_dir;
                vertex[w] = depth / 2.0 * w_dir;
                self.positions.extend_from_slice(&vertex);
            }
        }
        let row = grid_x + 1;
        for iy in 0..grid_y {
            for ix in 0..grid_x {
                let a = base + ix + row * iy;
                let b = base + ix + row * (iy + 1);
                let c = base + ix + 1 + row * (iy + 1);
                let d = base + ix + 1 + row * iy;
                self.indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }
    }

    fn finish(self) -> BufferGeometry {
        BufferGeometry {
            positions: self.positions,
            indices: Some(self.indices),
        }
    }
}
