//! Analytic crossing of a straight trajectory with a beam-axis cylinder `x^2 + y^2 = r^2`.
//!
//! Only the first and last samples of a trajectory are used. The transverse projection is
//! fitted as `y = a x + b` (or `x = a y + b` when it is steeper than 45 degrees),
//! substituted into the circle equation, and the forward root of the resulting quadratic
//! is kept. Geometry that cannot be fitted is reported as
//! [`Crossing::Degenerate`] rather than producing NaN.

use crate::core::particle::DIM;
use crate::core::trajectory::Trajectory;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// An axis extent is treated as zero below this fraction of the largest extent.
pub const AXIS_EPS: f64 = 1e-12;

/// Relative discriminant magnitude under which the line is considered tangent.
pub const TANGENT_EPS: f64 = 1e-12;

/// How the z coordinate of a crossing is recovered once x and y are known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZRecovery {
    /// Walk the line parametrically: `z = z0 + t dz` with `t` from the dominant transverse axis.
    #[default]
    Parametric,
    /// Legacy fit `y = c z + d` with `c = dy/dz` but `d = y0 - a z0`, reusing the x-y slope `a`.
    /// Kept for reproducing historical outputs.
    SharedSlope,
}

impl std::str::FromStr for ZRecovery {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "parametric" => Ok(Self::Parametric),
            "shared_slope" => Ok(Self::SharedSlope),
            other => Err(Error::InvalidParam(format!(
                "unknown z recovery mode '{other}' (expected 'parametric' or 'shared_slope')"
            ))),
        }
    }
}

/// Why a trajectory could not be intersected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Degeneracy {
    /// First and last samples coincide.
    NoMotion,
    /// Purely axial motion exactly on the cylinder surface: every point is a crossing.
    OnSurface,
    /// No x extent, so the x-y slope needed by [`ZRecovery::SharedSlope`] is undefined.
    NoXExtent,
    /// No y extent, so the y-z slope is zero and z cannot be solved for.
    NoYExtent,
    /// No z extent, so the y-z slope is undefined.
    NoZExtent,
}

/// Outcome of intersecting one trajectory with one cylinder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Crossing {
    /// The forward crossing point (x, y, z) in metres.
    Hit([f64; DIM]),
    /// The line never reaches the radius in the direction of travel.
    NoIntersection,
    Degenerate(Degeneracy),
}

impl Crossing {
    pub fn point(&self) -> Option<[f64; DIM]> {
        match *self {
            Crossing::Hit(p) => Some(p),
            _ => None,
        }
    }
}

/// Intersect `trajectory` with the cylinder of `radius` around the z axis.
///
/// Errors: `Error::InvalidParam` if `radius` is not finite and > 0.
pub fn intersect(trajectory: &Trajectory, radius: f64, mode: ZRecovery) -> Result<Crossing> {
    if !radius.is_finite() || radius <= 0.0 {
        return Err(Error::InvalidParam(format!(
            "cylinder radius must be finite and > 0 (got {radius})"
        )));
    }
    Ok(crossing(trajectory.first(), trajectory.last(), radius, mode))
}

/// Solve for the crossing of the line through `first` and `last`. `radius` must be > 0.
pub(crate) fn crossing(
    first: [f64; DIM],
    last: [f64; DIM],
    radius: f64,
    mode: ZRecovery,
) -> Crossing {
    let [x0, y0, z0] = first;
    let (dx, dy, dz) = (last[0] - x0, last[1] - y0, last[2] - z0);
    let scale = dx.abs().max(dy.abs()).max(dz.abs());
    if scale == 0.0 {
        return Crossing::Degenerate(Degeneracy::NoMotion);
    }
    let is_zero = |d: f64| d.abs() <= AXIS_EPS * scale;
    let r2 = radius * radius;

    if is_zero(dx) && is_zero(dy) {
        // Purely axial: the radius never changes.
        let rho0 = x0.hypot(y0);
        if (rho0 - radius).abs() <= TANGENT_EPS * radius {
            return Crossing::Degenerate(Degeneracy::OnSurface);
        }
        return Crossing::NoIntersection;
    }

    // Fit along the dominant transverse axis so the slope stays within [-1, 1].
    let transverse = if dx.abs() >= dy.abs() {
        transverse_root(x0, dx, y0, dy, r2)
    } else {
        transverse_root(y0, dy, x0, dx, r2).map(|(y, x)| (x, y))
    };
    let Some((x, y)) = transverse else {
        return Crossing::NoIntersection;
    };

    let z = match mode {
        ZRecovery::Parametric => {
            if is_zero(dz) {
                z0
            } else if dx.abs() >= dy.abs() {
                z0 + (x - x0) / dx * dz
            } else {
                z0 + (y - y0) / dy * dz
            }
        }
        ZRecovery::SharedSlope => {
            if is_zero(dx) {
                return Crossing::Degenerate(Degeneracy::NoXExtent);
            }
            let a = dy / dx;
            if is_zero(dz) {
                return Crossing::Degenerate(Degeneracy::NoZExtent);
            }
            if is_zero(dy) {
                return Crossing::Degenerate(Degeneracy::NoYExtent);
            }
            let c = dy / dz;
            let d = y0 - a * z0;
            (y - d) / c
        }
    };

    Crossing::Hit([x, y, z])
}

/// Crossing of the line `v = a u + b` through `(u0, v0)` with direction `(du, dv)`.
///
/// Substitutes into `u^2 + v^2 = r^2`, giving `A u^2 + B u + C = 0` with `A = a^2 + 1`,
/// `B = 2ab`, `C = b^2 - r^2`, and keeps the root ahead of `u0`. Callers pass the dominant
/// axis as `u`, so `|a| <= 1`. Returns `(u, v)`.
fn transverse_root(u0: f64, du: f64, v0: f64, dv: f64, r2: f64) -> Option<(f64, f64)> {
    let a = dv / du;
    let b = v0 - a * u0;
    let qa = a * a + 1.0;
    let qb = 2.0 * a * b;
    let qc = b * b - r2;
    let disc = qb * qb - 4.0 * qa * qc;
    let tol = TANGENT_EPS * (qb * qb + (4.0 * qa * qc).abs());
    let u = if disc < -tol {
        return None;
    } else if disc.abs() <= tol {
        let tangent = -qb / (2.0 * qa);
        forward_root(u0, du, tangent, tangent)?
    } else {
        let sq = disc.sqrt();
        let plus = (-qb + sq) / (2.0 * qa);
        let minus = (-qb - sq) / (2.0 * qa);
        forward_root(u0, du, plus, minus)?
    };
    Some((u, a * u + b))
}

/// Pick the root reached by moving from `origin` along `delta`.
///
/// With both roots ahead (start outside the cylinder, heading in) the nearer one is the
/// first crossing; with neither ahead there is no crossing.
fn forward_root(origin: f64, delta: f64, r1: f64, r2: f64) -> Option<f64> {
    let ahead = |r: f64| (r - origin) * delta >= 0.0;
    match (ahead(r1), ahead(r2)) {
        (true, true) => {
            if (r1 - origin).abs() <= (r2 - origin).abs() {
                Some(r1)
            } else {
                Some(r2)
            }
        }
        (true, false) => Some(r1),
        (false, true) => Some(r2),
        (false, false) => None,
    }
}
