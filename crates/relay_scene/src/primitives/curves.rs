use glam::Vec3;
use relay_core::error::{RelayError, Result};
use relay_core::hash::ContentHasher;

/// Interpolation basis of a curves primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CurveBasis {
    #[default]
    Linear,
    BSpline,
    CatmullRom,
    Bezier,
}

impl CurveBasis {
    /// Native `basis` string.
    #[must_use]
    pub fn native_name(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::BSpline => "b-spline",
            Self::CatmullRom => "catmull-rom",
            Self::Bezier => "bezier",
        }
    }

    fn min_vertices(self) -> u32 {
        match self {
            Self::Linear => 2,
            _ => 4,
        }
    }
}

/// Curve width: one value for every vertex, or one per vertex.
#[derive(Debug, Clone, PartialEq)]
pub enum CurveWidth {
    Constant(f32),
    Varying(Vec<f32>),
}

/// A batch of curves sharing one basis.
#[derive(Debug, Clone, PartialEq)]
pub struct CurvesPrimitive {
    pub verts_per_curve: Vec<u32>,
    pub basis: CurveBasis,
    pub points: Vec<Vec3>,
    pub width: CurveWidth,
}

impl CurvesPrimitive {
    #[must_use]
    pub fn new(verts_per_curve: Vec<u32>, basis: CurveBasis, points: Vec<Vec3>) -> Self {
        Self {
            verts_per_curve,
            basis,
            points,
            width: CurveWidth::Constant(1.0),
        }
    }

    #[must_use]
    pub fn with_width(mut self, width: CurveWidth) -> Self {
        self.width = width;
        self
    }

    /// The twelve edges of the box `min..max` as linear curves.
    #[must_use]
    pub fn create_box(min: Vec3, max: Vec3) -> Self {
        let corner = |i: usize| {
            Vec3::new(
                if i & 1 == 0 { min.x } else { max.x },
                if i & 2 == 0 { min.y } else { max.y },
                if i & 4 == 0 { min.z } else { max.z },
            )
        };
        // Pairs of corner indices differing in exactly one axis bit.
        let mut points = Vec::with_capacity(24);
        for a in 0..8usize {
            for bit in [1usize, 2, 4] {
                if a & bit == 0 {
                    points.push(corner(a));
                    points.push(corner(a | bit));
                }
            }
        }
        Self::new(vec![2; 12], CurveBasis::Linear, points)
    }

    #[must_use]
    pub fn num_curves(&self) -> usize {
        self.verts_per_curve.len()
    }

    pub fn validate(&self, name: &str) -> Result<()> {
        let unsupported = |reason: String| RelayError::UnsupportedPrimitive {
            name: name.to_string(),
            reason,
        };
        let min = self.basis.min_vertices();
        if let Some(n) = self.verts_per_curve.iter().find(|n| **n < min) {
            return Err(unsupported(format!(
                "curve with {n} vertices (basis needs at least {min})"
            )));
        }
        let expected: u64 = self.verts_per_curve.iter().map(|n| u64::from(*n)).sum();
        if expected != self.points.len() as u64 {
            return Err(unsupported(format!(
                "curves need {expected} points but {} were given",
                self.points.len()
            )));
        }
        if let CurveWidth::Varying(w) = &self.width
            && w.len() != self.points.len()
        {
            return Err(unsupported(format!(
                "{} widths for {} points",
                w.len(),
                self.points.len()
            )));
        }
        Ok(())
    }

    /// Native `radius` values (half the width).
    #[must_use]
    pub fn radius(&self) -> Vec<f32> {
        match &self.width {
            CurveWidth::Constant(w) => vec![w * 0.5],
            CurveWidth::Varying(w) => w.iter().map(|w| w * 0.5).collect(),
        }
    }

    pub(crate) fn hash_into(&self, hasher: &mut ContentHasher) {
        hasher
            .add("curves")
            .add(&self.basis)
            .add_pod(&self.verts_per_curve)
            .add_pod(&self.points);
        match &self.width {
            CurveWidth::Constant(w) => hasher.add(&0u8).add(&w.to_bits()),
            CurveWidth::Varying(w) => hasher.add(&1u8).add_pod(w),
        };
    }

    #[must_use]
    pub fn same_topology(&self, other: &Self) -> bool {
        self.verts_per_curve == other.verts_per_curve && self.basis == other.basis
    }
}
