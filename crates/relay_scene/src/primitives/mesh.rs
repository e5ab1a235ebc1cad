use glam::{Vec2, Vec3};
use relay_core::error::{RelayError, Result};
use relay_core::hash::ContentHasher;

/// How the mesh surface is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MeshInterpolation {
    /// Polygons are rendered as authored.
    #[default]
    Linear,
    /// The mesh is a Catmull-Clark subdivision cage.
    CatmullClark,
}

/// A polygon mesh: per-face vertex counts, vertex indices and positions.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshPrimitive {
    pub verts_per_face: Vec<u32>,
    pub vertex_ids: Vec<u32>,
    pub points: Vec<Vec3>,
    pub interpolation: MeshInterpolation,
}

impl MeshPrimitive {
    #[must_use]
    pub fn new(verts_per_face: Vec<u32>, vertex_ids: Vec<u32>, points: Vec<Vec3>) -> Self {
        Self {
            verts_per_face,
            vertex_ids,
            points,
            interpolation: MeshInterpolation::Linear,
        }
    }

    #[must_use]
    pub fn with_interpolation(mut self, interpolation: MeshInterpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    /// A single quad spanning `min..max` in the XY plane.
    #[must_use]
    pub fn create_plane(min: Vec2, max: Vec2) -> Self {
        Self::new(
            vec![4],
            vec![0, 1, 2, 3],
            vec![
                Vec3::new(min.x, min.y, 0.0),
                Vec3::new(max.x, min.y, 0.0),
                Vec3::new(max.x, max.y, 0.0),
                Vec3::new(min.x, max.y, 0.0),
            ],
        )
    }

    #[must_use]
    pub fn num_faces(&self) -> usize {
        self.verts_per_face.len()
    }

    /// Checks the topology is self-consistent.
    pub fn validate(&self, name: &str) -> Result<()> {
        let unsupported = |reason: String| RelayError::UnsupportedPrimitive {
            name: name.to_string(),
            reason,
        };
        if let Some(n) = self.verts_per_face.iter().find(|n| **n < 3) {
            return Err(unsupported(format!("face with {n} vertices")));
        }
        let expected: u64 = self.verts_per_face.iter().map(|n| u64::from(*n)).sum();
        if expected != self.vertex_ids.len() as u64 {
            return Err(unsupported(format!(
                "faces reference {expected} vertices but {} ids were given",
                self.vertex_ids.len()
            )));
        }
        if let Some(id) = self
            .vertex_ids
            .iter()
            .find(|id| **id as usize >= self.points.len())
        {
            return Err(unsupported(format!(
                "vertex id {id} out of range for {} points",
                self.points.len()
            )));
        }
        Ok(())
    }

    pub(crate) fn hash_into(&self, hasher: &mut ContentHasher) {
        hasher
            .add("mesh")
            .add(&self.interpolation)
            .add_pod(&self.verts_per_face)
            .add_pod(&self.vertex_ids)
            .add_pod(&self.points);
    }

    /// Same topology as `other`, so the two can be motion samples of one shape.
    #[must_use]
    pub fn same_topology(&self, other: &Self) -> bool {
        self.verts_per_face == other.verts_per_face
            && self.vertex_ids == other.vertex_ids
            && self.points.len() == other.points.len()
            && self.interpolation == other.interpolation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plane_is_valid_quad() {
        let plane = MeshPrimitive::create_plane(Vec2::splat(-1.0), Vec2::splat(1.0));
        assert_eq!(plane.num_faces(), 1);
        assert_eq!(plane.points.len(), 4);
        assert!(plane.validate("plane").is_ok());
    }

    #[test]
    fn test_invalid_topology() {
        let mut mesh = MeshPrimitive::create_plane(Vec2::ZERO, Vec2::ONE);
        mesh.vertex_ids[2] = 9;
        assert!(matches!(
            mesh.validate("m"),
            Err(RelayError::UnsupportedPrimitive { .. })
        ));

        let degenerate = MeshPrimitive::new(vec![2], vec![0, 1], vec![Vec3::ZERO, Vec3::X]);
        assert!(degenerate.validate("d").is_err());
    }
}
