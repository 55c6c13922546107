use crate::core::particle::{ParticleRecord, DIM, STEP_SCALE};
use crate::error::{Error, Result};
use std::collections::BTreeMap;

/// Straight-line sampled path of one particle.
///
/// `points[0]` is the production vertex; every later point advances by the same
/// displacement, so the path is a polyline of `points.len()` equally spaced samples.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    /// Event index of the particle this path belongs to.
    pub particle_id: u32,
    points: Vec<[f64; DIM]>,
}

impl Trajectory {
    /// Wrap externally produced samples. Used for replaying stored paths and in tests.
    ///
    /// Errors: `Error::InvalidParam` if `points` is empty or holds non-finite values.
    pub fn from_points(particle_id: u32, points: Vec<[f64; DIM]>) -> Result<Self> {
        if points.is_empty() {
            return Err(Error::InvalidParam(format!(
                "particle {particle_id}: trajectory needs at least one point"
            )));
        }
        if !points.iter().flatten().all(|c| c.is_finite()) {
            return Err(Error::InvalidParam(format!(
                "particle {particle_id}: trajectory points must be finite"
            )));
        }
        Ok(Self {
            particle_id,
            points,
        })
    }

    /// Sampled points in order.
    pub fn points(&self) -> &[[f64; DIM]] {
        &self.points
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// First sample (the production vertex).
    pub fn first(&self) -> [f64; DIM] {
        self.points[0]
    }

    /// Last sample.
    pub fn last(&self) -> [f64; DIM] {
        self.points[self.points.len() - 1]
    }

    /// True when no coordinate of any sample moves more than `tol` away from the vertex.
    pub fn is_stationary(&self, tol: f64) -> bool {
        let origin = self.points[0];
        self.points.iter().all(|pt| {
            pt.iter()
                .zip(origin.iter())
                .all(|(&c, &c0)| (c - c0).abs() <= tol)
        })
    }
}

/// Per-sample displacement of a free-streaming particle.
///
/// The velocity p/E is taken apart into its transverse magnitude `vt`, azimuth `phi` and
/// polar angle `theta`; the step is `(vt cos phi, vt sin phi sin theta, vt cos theta)`
/// scaled by [`STEP_SCALE`]. Zero momentum or zero energy gives a zero step.
pub fn step_vector(record: &ParticleRecord) -> [f64; DIM] {
    let v = record.velocity();
    let vt = v[0].hypot(v[1]);
    let phi = v[1].atan2(v[0]);
    let theta = vt.atan2(v[2]);
    [
        vt * phi.cos() * STEP_SCALE,
        vt * phi.sin() * theta.sin() * STEP_SCALE,
        vt * theta.cos() * STEP_SCALE,
    ]
}

/// Propagate a particle into a trajectory of exactly `n_steps` points.
///
/// Each point is the previous one plus the constant step, so coordinates match a
/// step-by-step accumulation exactly.
///
/// Errors: `Error::InvalidParam` if `n_steps` is zero.
pub fn propagate(record: &ParticleRecord, n_steps: usize) -> Result<Trajectory> {
    if n_steps == 0 {
        return Err(Error::InvalidParam("n_steps must be >= 1".into()));
    }
    let step = step_vector(record);
    let mut points = Vec::with_capacity(n_steps);
    let mut cur = record.vertex;
    points.push(cur);
    for _ in 1..n_steps {
        for (c, d) in cur.iter_mut().zip(step.iter()) {
            *c += d;
        }
        points.push(cur);
    }
    Ok(Trajectory {
        particle_id: record.id,
        points,
    })
}

/// Moving trajectories keyed by particle id, in event order.
///
/// Particles that were never selected or turned out stationary are simply absent, so a
/// missing key can't be mistaken for a zero-momentum particle.
#[derive(Debug, Clone, Default)]
pub struct TrajectorySet {
    pub by_id: BTreeMap<u32, Trajectory>,
    /// Number of propagated particles dropped by the stationary filter.
    pub stationary: usize,
}

impl TrajectorySet {
    /// Propagate every record and keep the ones that move by more than `stationary_tol`.
    pub fn build(records: &[ParticleRecord], n_steps: usize, stationary_tol: f64) -> Result<Self> {
        if !(stationary_tol.is_finite() && stationary_tol >= 0.0) {
            return Err(Error::InvalidParam(
                "stationary tolerance must be finite and >= 0".into(),
            ));
        }
        let mut set = Self::default();
        for record in records {
            let traj = propagate(record, n_steps)?;
            if traj.is_stationary(stationary_tol) {
                set.stationary += 1;
                continue;
            }
            set.by_id.insert(record.id, traj);
        }
        log::info!(
            "trajectory points per particle: {n_steps}; moving: {}, stationary: {}",
            set.by_id.len(),
            set.stationary
        );
        if let Some(bounds) = set.vertex_bounds() {
            log::debug!("vertex spread [min, max] per axis (m): {bounds:?}");
        }
        Ok(set)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn get(&self, id: u32) -> Option<&Trajectory> {
        self.by_id.get(&id)
    }

    /// Trajectories in ascending particle id.
    pub fn iter(&self) -> impl Iterator<Item = &Trajectory> {
        self.by_id.values()
    }

    /// `[min, max]` of the starting points along each axis; `None` when empty.
    pub fn vertex_bounds(&self) -> Option<[[f64; 2]; DIM]> {
        let mut it = self.iter();
        let first = it.next()?.first();
        let mut bounds = [[0.0; 2]; DIM];
        for (b, &c) in bounds.iter_mut().zip(first.iter()) {
            *b = [c, c];
        }
        for t in it {
            for (b, &c) in bounds.iter_mut().zip(t.first().iter()) {
                b[0] = b[0].min(c);
                b[1] = b[1].max(c);
            }
        }
        Some(bounds)
    }
}
