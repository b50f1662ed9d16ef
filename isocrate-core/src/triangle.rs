//! Triangles and the sinks that receive them

use crate::{Error, MaterialState, Point3f, Result, Vector3f, Vector4f};
use serde::{Deserialize, Serialize};

/// A generated surface vertex
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub position: Point3f,
    pub color: Vector4f,
    /// Smooth normal, from the field gradient when available
    pub normal: Vector3f,
    /// Flat normal of the owning triangle
    pub triangle_normal: Vector3f,
    pub shininess: f32,
    pub texture0: f32,
    pub texture1: f32,
}

impl Vertex {
    /// Create a vertex carrying the given material
    pub fn new(position: Point3f, normal: Vector3f, material: &MaterialState) -> Self {
        Self {
            position,
            color: material.color,
            normal,
            triangle_normal: normal,
            shininess: material.shininess,
            texture0: material.texture0,
            texture1: material.texture1,
        }
    }
}

impl Default for Vertex {
    fn default() -> Self {
        Self::new(Point3f::origin(), Vector3f::new(0.0, 0.0, 1.0), &MaterialState::default())
    }
}

/// Exactly three vertices
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Triangle {
    pub a: Vertex,
    pub b: Vertex,
    pub c: Vertex,
}

impl Triangle {
    pub fn new(a: Vertex, b: Vertex, c: Vertex) -> Self {
        Self { a, b, c }
    }

    pub fn vertices(&self) -> [&Vertex; 3] {
        [&self.a, &self.b, &self.c]
    }

    /// Counter-clockwise face normal, zero for degenerate triangles
    pub fn face_normal(&self) -> Vector3f {
        let edge1 = self.b.position - self.a.position;
        let edge2 = self.c.position - self.a.position;
        edge1.cross(&edge2).try_normalize(1e-12).unwrap_or_else(Vector3f::zeros)
    }
}

/// Append-only destination for generated triangles
///
/// One consumer is owned per worker; it is reused across marches and reset
/// by `start` at the beginning of every batch.
pub trait TriangleConsumer {
    /// Reset for a new batch
    fn start(&mut self);

    /// Append a triangle to the current batch
    fn add_triangle(&mut self, triangle: &Triangle);

    /// Seal the current batch
    fn finish(&mut self);

    /// Number of triangles in the current batch
    fn triangle_count(&self) -> usize;
}

/// Unindexed vertex list sink
#[derive(Debug, Clone, Default)]
pub struct TriangleBuffer {
    vertices: Vec<Vertex>,
    sealed: bool,
    batch_id: usize,
}

impl TriangleBuffer {
    /// Create a new empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Flat vertex list, three per triangle
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Iterate the stored triangles
    pub fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        self.vertices
            .chunks_exact(3)
            .map(|v| Triangle::new(v[0], v[1], v[2]))
    }

    /// Check if the buffer holds no triangles
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Whether the last batch has been sealed by `finish`
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Number of batches sealed so far
    pub fn batch_id(&self) -> usize {
        self.batch_id
    }

    /// Replace a vertex of the sealed batch in place
    ///
    /// Fails if no batch has been sealed yet or `index` is out of range.
    pub fn update_vertex(&mut self, index: usize, vertex: Vertex) -> Result<()> {
        if !self.sealed {
            return Err(Error::InvalidState(
                "cannot update vertices before a batch has been finished".to_string(),
            ));
        }
        let count = self.vertices.len();
        let slot = self.vertices.get_mut(index).ok_or_else(|| {
            Error::InvalidState(format!(
                "vertex index {} out of range for {} vertices",
                index, count
            ))
        })?;
        *slot = vertex;
        Ok(())
    }
}

impl TriangleConsumer for TriangleBuffer {
    fn start(&mut self) {
        self.vertices.clear();
        self.sealed = false;
    }

    fn add_triangle(&mut self, triangle: &Triangle) {
        self.vertices.reserve(3);
        self.vertices.push(triangle.a);
        self.vertices.push(triangle.b);
        self.vertices.push(triangle.c);
    }

    fn finish(&mut self) {
        self.sealed = true;
        self.batch_id += 1;
    }

    fn triangle_count(&self) -> usize {
        self.vertices.len() / 3
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn vertex_at(x: f32, y: f32, z: f32) -> Vertex {
        Vertex {
            position: Point3f::new(x, y, z),
            ..Default::default()
        }
    }

    fn unit_triangle() -> Triangle {
        Triangle::new(
            vertex_at(0.0, 0.0, 0.0),
            vertex_at(1.0, 0.0, 0.0),
            vertex_at(0.0, 1.0, 0.0),
        )
    }

    #[test]
    fn test_face_normal() {
        assert_relative_eq!(unit_triangle().face_normal(), Vector3f::new(0.0, 0.0, 1.0));

        let degenerate = Triangle::new(vertex_at(0.0, 0.0, 0.0), vertex_at(0.0, 0.0, 0.0), vertex_at(1.0, 0.0, 0.0));
        assert_eq!(degenerate.face_normal(), Vector3f::zeros());
    }

    #[test]
    fn test_buffer_lifecycle() {
        let mut buffer = TriangleBuffer::new();
        buffer.start();
        buffer.add_triangle(&unit_triangle());
        buffer.add_triangle(&unit_triangle());
        assert_eq!(buffer.triangle_count(), 2);
        assert_eq!(buffer.vertices().len(), 6);
        assert!(!buffer.is_sealed());

        buffer.finish();
        assert!(buffer.is_sealed());
        assert_eq!(buffer.batch_id(), 1);
        assert_eq!(buffer.triangles().count(), 2);

        buffer.start();
        assert!(buffer.is_empty());
        assert_eq!(buffer.triangle_count(), 0);
    }

    #[test]
    fn test_update_vertex_requires_sealed_batch() {
        let mut buffer = TriangleBuffer::new();
        buffer.start();
        buffer.add_triangle(&unit_triangle());
        assert!(matches!(
            buffer.update_vertex(0, vertex_at(5.0, 5.0, 5.0)),
            Err(Error::InvalidState(_))
        ));

        buffer.finish();
        assert!(buffer.update_vertex(0, vertex_at(5.0, 5.0, 5.0)).is_ok());
        assert_eq!(buffer.vertices()[0].position, Point3f::new(5.0, 5.0, 5.0));
        assert!(buffer.update_vertex(3, vertex_at(0.0, 0.0, 0.0)).is_err());
    }
}
