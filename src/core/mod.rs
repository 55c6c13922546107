//! Propagation of final-state particles and their crossings with concentric detector layers.
//!
//! Data flows one way: [`feed`] selects particles, [`trajectory`] samples their straight
//! paths and drops stationary ones, [`intersect`] solves one path against one cylinder,
//! [`detector`] drives the solver over every layer, and [`encode`] serializes the result.

pub mod detector;
pub mod encode;
pub mod feed;
pub mod intersect;
pub mod particle;
pub mod trajectory;

pub use detector::{
    DetectionPoint, DetectionReport, Detector, DetectorConfig, DetectorLayer, LayerHits,
};
pub use feed::{Event, GeneratorParticle, ParticleEntry, ParticleGun};
pub use intersect::{Crossing, Degeneracy, ZRecovery};
pub use particle::ParticleRecord;
pub use trajectory::{Trajectory, TrajectorySet};
