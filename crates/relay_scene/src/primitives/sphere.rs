use relay_core::error::{RelayError, Result};
use relay_core::hash::ContentHasher;

/// An implicit sphere. Only full spheres have a native counterpart.
#[derive(Debug, Clone, PartialEq)]
pub struct SpherePrimitive {
    pub radius: f32,
    pub z_min: f32,
    pub z_max: f32,
    /// Sweep in degrees.
    pub theta_max: f32,
}

impl Default for SpherePrimitive {
    fn default() -> Self {
        Self {
            radius: 1.0,
            z_min: -1.0,
            z_max: 1.0,
            theta_max: 360.0,
        }
    }
}

impl SpherePrimitive {
    #[must_use]
    pub fn new(radius: f32) -> Self {
        Self {
            radius,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.z_min <= -1.0 && self.z_max >= 1.0 && self.theta_max >= 360.0
    }

    pub fn validate(&self, name: &str) -> Result<()> {
        if !self.is_full() {
            return Err(RelayError::UnsupportedPrimitive {
                name: name.to_string(),
                reason: "partial spheres are not supported".to_string(),
            });
        }
        Ok(())
    }

    pub(crate) fn hash_into(&self, hasher: &mut ContentHasher) {
        hasher.add("sphere").add(&self.radius.to_bits());
    }
}
