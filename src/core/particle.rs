use crate::error::{Error, Result};

/// Fixed spatial dimension (3D).
pub const DIM: usize = 3;

/// Production vertices arrive in millimetres; everything downstream works in metres.
pub const MM_TO_M: f64 = 1e-3;

/// Maps a velocity (in units of c) to the spatial advance of one trajectory sample, in metres.
pub const STEP_SCALE: f64 = 1e-9;

/// A selected final-state, charged particle ready for propagation.
///
/// Fields:
/// - `id`: index of the particle in its source event (kept so hits trace back to it)
/// - `vertex`: production vertex [x, y, z] in metres
/// - `p`: momentum [px, py, pz] in generator units (GeV/c)
/// - `e`: energy in generator units (GeV)
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleRecord {
    /// Index of the particle in the originating event.
    pub id: u32,
    /// Production vertex (x, y, z) in metres.
    pub vertex: [f64; DIM],
    /// Momentum (px, py, pz).
    pub p: [f64; DIM],
    /// Energy.
    pub e: f64,
}

impl ParticleRecord {
    /// Create a new record after validating that every field is finite.
    ///
    /// Errors:
    /// - `Error::InvalidParam` naming the particle index if the vertex, momentum or energy
    ///   contains NaN/inf.
    pub fn new(id: u32, vertex: [f64; DIM], p: [f64; DIM], e: f64) -> Result<Self> {
        if !vertex.iter().all(|x| x.is_finite()) {
            return Err(Error::InvalidParam(format!(
                "particle {id}: production vertex must be finite"
            )));
        }
        if !p.iter().all(|x| x.is_finite()) {
            return Err(Error::InvalidParam(format!(
                "particle {id}: momentum must be finite"
            )));
        }
        if !e.is_finite() {
            return Err(Error::InvalidParam(format!(
                "particle {id}: energy must be finite"
            )));
        }
        Ok(Self { id, vertex, p, e })
    }

    /// Transverse momentum |(px, py)|.
    #[inline]
    pub fn pt(&self) -> f64 {
        self.p[0].hypot(self.p[1])
    }

    /// Momentum magnitude |p|.
    #[inline]
    pub fn p_abs(&self) -> f64 {
        self.p.iter().map(|&c| c * c).sum::<f64>().sqrt()
    }

    /// Invariant mass sqrt(E^2 - |p|^2), clamped at zero for slightly off-shell inputs.
    #[inline]
    pub fn mass(&self) -> f64 {
        let psq: f64 = self.p.iter().map(|&c| c * c).sum();
        (self.e * self.e - psq).max(0.0).sqrt()
    }

    /// Velocity p/E in units of c.
    ///
    /// A non-positive energy has no meaningful velocity and yields zero, which makes the
    /// particle stationary instead of producing NaN coordinates.
    #[inline]
    pub fn velocity(&self) -> [f64; DIM] {
        if self.e <= 0.0 {
            return [0.0; DIM];
        }
        [self.p[0] / self.e, self.p[1] / self.e, self.p[2] / self.e]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_ok() -> Result<()> {
        let p = ParticleRecord::new(3, [0.0, 1.0, 2.0], [2.0, -3.0, 0.5], 5.0)?;
        assert_eq!(p.id, 3);
        assert_eq!(p.vertex, [0.0, 1.0, 2.0]);
        assert_eq!(p.p, [2.0, -3.0, 0.5]);
        assert_eq!(p.e, 5.0);
        Ok(())
    }

    #[test]
    fn non_finite_fields_rejected() {
        let err = ParticleRecord::new(9, [f64::NAN, 0.0, 0.0], [0.0; 3], 1.0).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("vertex"));
        assert!(msg.contains("particle 9"));

        let err = ParticleRecord::new(1, [0.0; 3], [0.0, f64::INFINITY, 0.0], 1.0).unwrap_err();
        assert!(err.to_string().contains("momentum"));

        let err = ParticleRecord::new(1, [0.0; 3], [0.0; 3], f64::NAN).unwrap_err();
        assert!(err.to_string().contains("energy"));
    }

    #[test]
    fn kinematics_computed() -> Result<()> {
        // p = (3, 4, 12), |p| = 13, E = 13.5
        let p = ParticleRecord::new(0, [0.0; 3], [3.0, 4.0, 12.0], 13.5)?;
        assert!((p.pt() - 5.0).abs() < 1e-12);
        assert!((p.p_abs() - 13.0).abs() < 1e-12);
        let m2 = 13.5 * 13.5 - 169.0;
        assert!((p.mass() - f64::sqrt(m2)).abs() < 1e-12);
        let v = p.velocity();
        assert!((v[2] - 12.0 / 13.5).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn off_shell_and_zero_energy_are_well_defined() -> Result<()> {
        let p = ParticleRecord::new(0, [0.0; 3], [1.0, 0.0, 0.0], 0.5)?;
        assert_eq!(p.mass(), 0.0);
        let q = ParticleRecord::new(1, [0.0; 3], [1.0, 0.0, 0.0], 0.0)?;
        assert_eq!(q.velocity(), [0.0; 3]);
        Ok(())
    }
}
