//! Particle Feed Adapter: turns an event generator's particle list into [`ParticleRecord`]s.
//!
//! The generator itself is external. Anything exposing the [`ParticleEntry`] accessors can
//! be fed in; [`GeneratorParticle`] is the plain in-memory form and [`ParticleGun`] a seeded
//! synthetic source for tests and demos.

use crate::core::particle::{ParticleRecord, DIM, MM_TO_M};
use crate::error::{Error, Result};
use rand::{rng, rngs::StdRng, Rng, SeedableRng};

/// Number of columns in a flat particle row:
/// `[is_final, is_charged, x_mm, y_mm, z_mm, px, py, pz, e]`.
pub const ROW_LEN: usize = 9;

/// Read access to one particle entry of an external event record.
///
/// Vertex coordinates are in millimetres, momentum and energy in generator units.
pub trait ParticleEntry {
    fn is_final(&self) -> bool;
    fn is_charged(&self) -> bool;
    /// Production vertex (x, y, z) in millimetres.
    fn prod_mm(&self) -> [f64; DIM];
    /// Momentum (px, py, pz).
    fn momentum(&self) -> [f64; DIM];
    fn energy(&self) -> f64;
}

/// One particle as emitted by the generator.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorParticle {
    pub is_final: bool,
    pub is_charged: bool,
    pub prod_mm: [f64; DIM],
    pub p: [f64; DIM],
    pub e: f64,
}

impl GeneratorParticle {
    /// Parse a flat row (see [`ROW_LEN`]). Flags are true when nonzero.
    ///
    /// Errors: `Error::InvalidParam` when the row does not carry every field.
    pub fn from_row(index: usize, row: &[f64]) -> Result<Self> {
        if row.len() != ROW_LEN {
            return Err(Error::InvalidParam(format!(
                "particle {index}: expected {ROW_LEN} fields, got {}",
                row.len()
            )));
        }
        Ok(Self {
            is_final: row[0] != 0.0,
            is_charged: row[1] != 0.0,
            prod_mm: [row[2], row[3], row[4]],
            p: [row[5], row[6], row[7]],
            e: row[8],
        })
    }

    /// Flatten back into the row layout accepted by [`GeneratorParticle::from_row`].
    pub fn to_row(&self) -> [f64; ROW_LEN] {
        let flag = |b: bool| if b { 1.0 } else { 0.0 };
        [
            flag(self.is_final),
            flag(self.is_charged),
            self.prod_mm[0],
            self.prod_mm[1],
            self.prod_mm[2],
            self.p[0],
            self.p[1],
            self.p[2],
            self.e,
        ]
    }
}

impl ParticleEntry for GeneratorParticle {
    fn is_final(&self) -> bool {
        self.is_final
    }
    fn is_charged(&self) -> bool {
        self.is_charged
    }
    fn prod_mm(&self) -> [f64; DIM] {
        self.prod_mm
    }
    fn momentum(&self) -> [f64; DIM] {
        self.p
    }
    fn energy(&self) -> f64 {
        self.e
    }
}

/// A single collision event: an ordered, sized list of particle entries.
#[derive(Debug, Clone, Default)]
pub struct Event {
    pub particles: Vec<GeneratorParticle>,
}

impl Event {
    pub fn new(particles: Vec<GeneratorParticle>) -> Self {
        Self { particles }
    }

    /// Build an event from flat rows, failing on the first malformed one.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self> {
        let particles = rows
            .iter()
            .enumerate()
            .map(|(i, r)| GeneratorParticle::from_row(i, r.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { particles })
    }

    /// Total number of particles in the event (selected or not).
    pub fn size(&self) -> usize {
        self.particles.len()
    }
}

/// Select final-state, charged entries and convert them to [`ParticleRecord`]s.
///
/// Output order follows the event and each record keeps its event index as `id`.
pub fn select_final_charged<P: ParticleEntry>(entries: &[P]) -> Result<Vec<ParticleRecord>> {
    let mut out = Vec::new();
    for (i, entry) in entries.iter().enumerate() {
        if !(entry.is_final() && entry.is_charged()) {
            continue;
        }
        let id = u32::try_from(i)
            .map_err(|_| Error::InvalidParam(format!("particle index {i} exceeds u32")))?;
        let mm = entry.prod_mm();
        let vertex = [mm[0] * MM_TO_M, mm[1] * MM_TO_M, mm[2] * MM_TO_M];
        out.push(ParticleRecord::new(
            id,
            vertex,
            entry.momentum(),
            entry.energy(),
        )?);
    }
    Ok(out)
}

/// Charged pion mass in GeV, used for every synthetic particle.
const PION_MASS: f64 = 0.139_570;

/// Seeded synthetic event source.
///
/// Particles get a transverse momentum in `pt_range`, uniform azimuth, pseudorapidity in
/// `[-eta_max, eta_max]`, and a vertex smeared around the origin. A configurable share of
/// entries are marked non-final or neutral so the feed filter has work to do, and
/// `stationary_fraction` of the selected ones are emitted at rest.
#[derive(Debug)]
pub struct ParticleGun {
    pub pt_range: (f64, f64),
    pub eta_max: f64,
    /// Transverse vertex smear half-width, millimetres.
    pub vertex_xy_mm: f64,
    /// Longitudinal vertex smear half-width, millimetres.
    pub vertex_z_mm: f64,
    pub final_fraction: f64,
    pub charged_fraction: f64,
    pub stationary_fraction: f64,
    rng: StdRng,
}

impl ParticleGun {
    /// Create a gun with default kinematic ranges; `None` seeds from the thread RNG.
    pub fn new(seed: Option<u64>) -> Self {
        let rng: StdRng = match seed {
            Some(s) => SeedableRng::seed_from_u64(s),
            None => SeedableRng::seed_from_u64(rng().random()),
        };
        Self {
            pt_range: (0.2, 20.0),
            eta_max: 2.5,
            vertex_xy_mm: 0.05,
            vertex_z_mm: 50.0,
            final_fraction: 0.8,
            charged_fraction: 0.6,
            stationary_fraction: 0.0,
            rng,
        }
    }

    /// Generate one event of `num_particles` entries.
    pub fn generate(&mut self, num_particles: usize) -> Result<Event> {
        let (pt_lo, pt_hi) = self.pt_range;
        if !(pt_lo.is_finite() && pt_hi.is_finite() && 0.0 <= pt_lo && pt_lo <= pt_hi) {
            return Err(Error::InvalidParam(
                "pt_range must be finite with 0 <= lo <= hi".into(),
            ));
        }
        for (name, f) in [
            ("final_fraction", self.final_fraction),
            ("charged_fraction", self.charged_fraction),
            ("stationary_fraction", self.stationary_fraction),
        ] {
            if !(0.0..=1.0).contains(&f) {
                return Err(Error::InvalidParam(format!("{name} must lie in [0, 1]")));
            }
        }
        if !(self.eta_max.is_finite()
            && self.eta_max >= 0.0
            && self.vertex_xy_mm.is_finite()
            && self.vertex_xy_mm >= 0.0
            && self.vertex_z_mm.is_finite()
            && self.vertex_z_mm >= 0.0)
        {
            return Err(Error::InvalidParam(
                "eta_max and vertex smears must be finite and >= 0".into(),
            ));
        }

        let mut particles = Vec::with_capacity(num_particles);
        for _ in 0..num_particles {
            let is_final = self.rng.random_bool(self.final_fraction);
            let is_charged = self.rng.random_bool(self.charged_fraction);

            let prod_mm = [
                self.rng.random_range(-self.vertex_xy_mm..=self.vertex_xy_mm),
                self.rng.random_range(-self.vertex_xy_mm..=self.vertex_xy_mm),
                self.rng.random_range(-self.vertex_z_mm..=self.vertex_z_mm),
            ];

            let p = if self.rng.random_bool(self.stationary_fraction) {
                [0.0; DIM]
            } else {
                let pt = self.rng.random_range(pt_lo..=pt_hi);
                let phi = self.rng.random_range(-std::f64::consts::PI..std::f64::consts::PI);
                let eta = self.rng.random_range(-self.eta_max..=self.eta_max);
                [pt * phi.cos(), pt * phi.sin(), pt * eta.sinh()]
            };
            let psq: f64 = p.iter().map(|&c| c * c).sum();
            let e = (psq + PION_MASS * PION_MASS).sqrt();

            particles.push(GeneratorParticle {
                is_final,
                is_charged,
                prod_mm,
                p,
                e,
            });
        }
        Ok(Event::new(particles))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(is_final: bool, is_charged: bool, px: f64) -> GeneratorParticle {
        GeneratorParticle {
            is_final,
            is_charged,
            prod_mm: [1.0, -2.0, 30.0],
            p: [px, 0.0, 0.0],
            e: px.abs().max(1.0),
        }
    }

    #[test]
    fn selects_only_final_charged_and_keeps_index() -> Result<()> {
        let event = Event::new(vec![
            entry(true, false, 1.0),
            entry(true, true, 2.0),
            entry(false, true, 3.0),
            entry(true, true, 4.0),
        ]);
        let sel = select_final_charged(&event.particles)?;
        assert_eq!(sel.len(), 2);
        assert_eq!(sel[0].id, 1);
        assert_eq!(sel[1].id, 3);
        assert_eq!(sel[1].p, [4.0, 0.0, 0.0]);
        Ok(())
    }

    #[test]
    fn vertex_converted_to_metres() -> Result<()> {
        let sel = select_final_charged(&[entry(true, true, 1.0)])?;
        assert!((sel[0].vertex[0] - 1e-3).abs() < 1e-15);
        assert!((sel[0].vertex[1] + 2e-3).abs() < 1e-15);
        assert!((sel[0].vertex[2] - 0.03).abs() < 1e-15);
        Ok(())
    }

    #[test]
    fn malformed_row_reports_index() {
        let rows: Vec<Vec<f64>> = vec![vec![1.0; ROW_LEN], vec![1.0; 4]];
        let err = Event::from_rows(&rows).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("particle 1"), "{msg}");
    }

    #[test]
    fn row_layout_round_trips() -> Result<()> {
        let p = entry(true, false, 2.5);
        assert_eq!(GeneratorParticle::from_row(0, &p.to_row())?, p);
        Ok(())
    }

    #[test]
    fn gun_is_deterministic_for_a_seed() -> Result<()> {
        let a = ParticleGun::new(Some(42)).generate(50)?;
        let b = ParticleGun::new(Some(42)).generate(50)?;
        assert_eq!(a.size(), 50);
        assert_eq!(a.particles, b.particles);
        for p in &a.particles {
            assert!(p.e > 0.0);
            assert!(p.prod_mm[0].abs() <= 0.05);
        }
        Ok(())
    }

    #[test]
    fn gun_rejects_bad_fractions() {
        let mut gun = ParticleGun::new(Some(1));
        gun.charged_fraction = 1.5;
        assert!(gun.generate(3).is_err());
    }
}
