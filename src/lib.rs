//! Detection points of collision final-state particles on concentric cylindrical layers.
//!
//! Particles from an external event generator are filtered to final-state charged ones,
//! propagated along straight lines, and intersected with every configured layer:
//!
//! ```
//! use detsim::core::{Detector, DetectorConfig, GeneratorParticle};
//!
//! let event = vec![GeneratorParticle {
//!     is_final: true,
//!     is_charged: true,
//!     prod_mm: [0.0, 0.0, 0.0],
//!     p: [1.0, 0.0, 0.0],
//!     e: 1.0,
//! }];
//! let det = Detector::new(DetectorConfig::new(100, &[1.0], 10.0)?)?;
//! let report = det.run(&event)?;
//! assert!((report.layers[0].points[0].position[0] - 1.0).abs() < 1e-9);
//! # Ok::<(), detsim::error::Error>(())
//! ```
//!
//! With the `python` feature the crate also builds the `detsim` extension module.

pub mod core;
pub mod error;

#[cfg(feature = "python")]
mod python;
