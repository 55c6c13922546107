use crate::core::feed::{select_final_charged, ParticleEntry};
use crate::core::intersect::{crossing, Crossing, ZRecovery};
use crate::core::particle::DIM;
use crate::core::trajectory::{Trajectory, TrajectorySet};
use crate::error::{Error, Result};
use ordered_float::NotNan;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Default number of samples per trajectory.
pub const DEFAULT_STEPS: usize = 100;

/// Default number of concentric layers.
pub const DEFAULT_LAYERS: usize = 10;

/// Default nominal layer length along the beam axis, metres.
pub const DEFAULT_LAYER_LENGTH: f64 = 10.0;

/// Default absolute tolerance (metres) below which a trajectory counts as stationary.
pub const DEFAULT_STATIONARY_TOL: f64 = 1e-18;

/// A detection cylinder coaxial with the beam (z) axis.
///
/// `length` is carried for configuration purposes only: crossings are computed against an
/// unbounded cylinder and may lie at any z.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DetectorLayer {
    radius: NotNan<f64>,
    length: NotNan<f64>,
}

impl DetectorLayer {
    /// Errors: `Error::InvalidParam` if `radius` or `length` is not finite and > 0.
    pub fn new(radius: f64, length: f64) -> Result<Self> {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(Error::InvalidParam(format!(
                "layer radius must be finite and > 0 (got {radius})"
            )));
        }
        if !length.is_finite() || length <= 0.0 {
            return Err(Error::InvalidParam(format!(
                "layer length must be finite and > 0 (got {length}, radius {radius})"
            )));
        }
        let radius = NotNan::new(radius)
            .map_err(|_| Error::InvalidParam("layer radius cannot be NaN".into()))?;
        let length = NotNan::new(length)
            .map_err(|_| Error::InvalidParam("layer length cannot be NaN".into()))?;
        Ok(Self { radius, length })
    }

    #[inline]
    pub fn radius(&self) -> f64 {
        self.radius.into_inner()
    }

    #[inline]
    pub fn length(&self) -> f64 {
        self.length.into_inner()
    }
}

/// Run configuration: sampling, layer geometry and solver mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Samples per trajectory (>= 1).
    pub n_steps: usize,
    /// Layers in output order.
    pub layers: Vec<DetectorLayer>,
    pub z_recovery: ZRecovery,
    /// Stationary filter tolerance, metres (>= 0).
    pub stationary_tolerance: f64,
}

impl Default for DetectorConfig {
    /// 100 samples and ten layers at radii 0.5, 0.6, ..., 1.4 m, each 10 m long.
    fn default() -> Self {
        let layers = (0..DEFAULT_LAYERS)
            .filter_map(|i| DetectorLayer::new(i as f64 / 10.0 + 0.5, DEFAULT_LAYER_LENGTH).ok())
            .collect();
        Self {
            n_steps: DEFAULT_STEPS,
            layers,
            z_recovery: ZRecovery::default(),
            stationary_tolerance: DEFAULT_STATIONARY_TOL,
        }
    }
}

impl DetectorConfig {
    /// Build a configuration with one layer per radius, all of the same `layer_length`.
    pub fn new(n_steps: usize, radii: &[f64], layer_length: f64) -> Result<Self> {
        let layers = radii
            .iter()
            .map(|&r| DetectorLayer::new(r, layer_length))
            .collect::<Result<Vec<_>>>()?;
        let cfg = Self {
            n_steps,
            layers,
            ..Self::default()
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check invariants that deserialized or hand-edited configs may violate.
    pub fn validate(&self) -> Result<()> {
        if self.n_steps == 0 {
            return Err(Error::InvalidParam("n_steps must be >= 1".into()));
        }
        for layer in &self.layers {
            DetectorLayer::new(layer.radius(), layer.length())?;
        }
        if !self.stationary_tolerance.is_finite() || self.stationary_tolerance < 0.0 {
            return Err(Error::InvalidParam(
                "stationary_tolerance must be finite and >= 0".into(),
            ));
        }
        Ok(())
    }

    pub fn radii(&self) -> Vec<f64> {
        self.layers.iter().map(DetectorLayer::radius).collect()
    }
}

/// Where one particle's trajectory crosses one layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionPoint {
    pub particle_id: u32,
    pub layer_radius: f64,
    /// (x, y, z) in metres.
    pub position: [f64; DIM],
}

/// All detection points of one layer, in trajectory order.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerHits {
    pub layer_index: usize,
    pub radius: f64,
    pub points: Vec<DetectionPoint>,
    /// Trajectories that never reach this radius.
    pub missed: usize,
    /// Trajectories whose geometry could not be solved.
    pub degenerate: usize,
}

impl LayerHits {
    /// Positions only, in order.
    pub fn positions(&self) -> Vec<[f64; DIM]> {
        self.points.iter().map(|p| p.position).collect()
    }
}

/// Intersect every trajectory with one layer. Misses and degenerate pairs are counted
/// and skipped.
pub fn detect_layer<'a, I>(
    layer_index: usize,
    layer: &DetectorLayer,
    trajectories: I,
    mode: ZRecovery,
) -> LayerHits
where
    I: IntoIterator<Item = &'a Trajectory>,
{
    let radius = layer.radius();
    let mut hits = LayerHits {
        layer_index,
        radius,
        points: Vec::new(),
        missed: 0,
        degenerate: 0,
    };
    for t in trajectories {
        match crossing(t.first(), t.last(), radius, mode) {
            Crossing::Hit(position) => hits.points.push(DetectionPoint {
                particle_id: t.particle_id,
                layer_radius: radius,
                position,
            }),
            Crossing::NoIntersection => {
                log::trace!("particle {} misses layer r={radius}", t.particle_id);
                hits.missed += 1;
            }
            Crossing::Degenerate(kind) => {
                log::trace!(
                    "particle {} degenerate against layer r={radius}: {kind:?}",
                    t.particle_id
                );
                hits.degenerate += 1;
            }
        }
    }
    hits
}

/// Intersect every trajectory with every layer. Layers are independent and run in
/// parallel; the result keeps layer order.
pub fn detect_layers(
    trajectories: &TrajectorySet,
    layers: &[DetectorLayer],
    mode: ZRecovery,
) -> Vec<LayerHits> {
    layers
        .par_iter()
        .enumerate()
        .map(|(i, layer)| detect_layer(i, layer, trajectories.iter(), mode))
        .collect()
}

/// Everything produced by one run over an event.
#[derive(Debug, Clone)]
pub struct DetectionReport {
    /// Size of the source event.
    pub total_particles: usize,
    /// Final-state charged particles.
    pub selected: usize,
    /// Moving trajectories that were intersected.
    pub trajectories: TrajectorySet,
    pub layers: Vec<LayerHits>,
}

/// Feed -> propagate -> stationary filter -> per-layer intersection.
#[derive(Debug, Clone)]
pub struct Detector {
    config: DetectorConfig,
}

impl Detector {
    pub fn new(config: DetectorConfig) -> Result<Self> {
        config.validate()?;
        log::debug!(
            "detector layers (m): {:?}, samples: {}, z recovery: {:?}",
            config.radii(),
            config.n_steps,
            config.z_recovery
        );
        Ok(Self { config })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Propagate the final-state charged particles of `event`, dropping stationary ones.
    pub fn trajectories<P: ParticleEntry>(&self, event: &[P]) -> Result<TrajectorySet> {
        self.select_and_propagate(event).map(|(_, set)| set)
    }

    /// Returns the number of selected particles alongside the moving trajectories.
    fn select_and_propagate<P: ParticleEntry>(&self, event: &[P]) -> Result<(usize, TrajectorySet)> {
        let records = select_final_charged(event)?;
        let set = TrajectorySet::build(
            &records,
            self.config.n_steps,
            self.config.stationary_tolerance,
        )?;
        Ok((records.len(), set))
    }

    /// Run the full pipeline over one event.
    pub fn run<P: ParticleEntry>(&self, event: &[P]) -> Result<DetectionReport> {
        log::info!("total number of particles in the event: {}", event.len());
        let (selected, trajectories) = self.select_and_propagate(event)?;
        let layers = detect_layers(&trajectories, &self.config.layers, self.config.z_recovery);
        for hits in &layers {
            log::info!(
                "layer {} (r={} m): {} hits, {} missed, {} degenerate",
                hits.layer_index,
                hits.radius,
                hits.points.len(),
                hits.missed,
                hits.degenerate
            );
        }
        Ok(DetectionReport {
            total_particles: event.len(),
            selected,
            trajectories,
            layers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::feed::GeneratorParticle;

    fn particle(p: [f64; DIM], e: f64) -> GeneratorParticle {
        GeneratorParticle {
            is_final: true,
            is_charged: true,
            prod_mm: [0.0; DIM],
            p,
            e,
        }
    }

    #[test]
    fn default_config_matches_nominal_geometry() -> Result<()> {
        let cfg = DetectorConfig::default();
        cfg.validate()?;
        assert_eq!(cfg.n_steps, 100);
        let radii = cfg.radii();
        assert_eq!(radii.len(), 10);
        assert!((radii[0] - 0.5).abs() < 1e-12);
        assert!((radii[9] - 1.4).abs() < 1e-12);
        assert!(cfg.layers.iter().all(|l| l.length() == 10.0));
        assert_eq!(cfg.z_recovery, ZRecovery::Parametric);
        Ok(())
    }

    #[test]
    fn invalid_layers_rejected() {
        let err = DetectorLayer::new(0.0, 1.0).unwrap_err();
        assert!(err.to_string().contains("radius"));
        assert!(DetectorLayer::new(-1.0, 1.0).is_err());
        assert!(DetectorLayer::new(f64::NAN, 1.0).is_err());
        assert!(DetectorLayer::new(1.0, 0.0).is_err());
        let err = DetectorConfig::new(100, &[0.5, -2.0], 10.0).unwrap_err();
        assert!(err.to_string().contains("-2"));
        assert!(DetectorConfig::new(0, &[0.5], 10.0).is_err());
    }

    #[test]
    fn layers_order_by_radius() -> Result<()> {
        let mut layers = vec![DetectorLayer::new(1.0, 5.0)?, DetectorLayer::new(0.5, 5.0)?];
        layers.sort();
        assert_eq!(layers[0].radius(), 0.5);
        Ok(())
    }

    #[test]
    fn config_round_trips_through_json() -> Result<()> {
        let cfg = DetectorConfig::new(20, &[0.5, 1.0], 3.0)?;
        let json = serde_json::to_string(&cfg)?;
        let back: DetectorConfig = serde_json::from_str(&json)?;
        assert_eq!(back, cfg);
        Ok(())
    }

    #[test]
    fn run_counts_and_skips() -> Result<()> {
        let event = vec![
            particle([1.0, 0.0, 0.0], 1.0),
            particle([0.0, 0.0, 0.0], 0.14),
            GeneratorParticle {
                is_charged: false,
                ..particle([0.0, 1.0, 0.0], 1.0)
            },
            particle([0.0, -2.0, 1.0], 3.0),
        ];
        let det = Detector::new(DetectorConfig::new(100, &[0.5, 1.0], 10.0)?)?;
        let report = det.run(&event)?;
        assert_eq!(report.total_particles, 4);
        assert_eq!(report.selected, 3);
        assert_eq!(report.trajectories.len(), 2);
        assert_eq!(report.layers.len(), 2);
        for hits in &report.layers {
            let ids: Vec<u32> = hits.points.iter().map(|p| p.particle_id).collect();
            assert_eq!(ids, vec![0, 3]);
            for p in &hits.points {
                let rho = p.position[0].hypot(p.position[1]);
                assert!((rho - hits.radius).abs() < 1e-6 * hits.radius);
            }
        }
        Ok(())
    }

    #[test]
    fn trajectories_match_the_ones_run_intersects() -> Result<()> {
        let event = vec![
            particle([1.0, 0.0, 0.0], 1.0),
            particle([0.0, 0.0, 0.0], 0.14),
            particle([0.3, -0.4, 2.0], 3.0),
        ];
        let det = Detector::new(DetectorConfig::default())?;
        let report = det.run(&event)?;
        let set = det.trajectories(&event)?;
        assert_eq!(report.selected, 3);
        assert_eq!(set.stationary, report.trajectories.stationary);
        assert_eq!(set.by_id, report.trajectories.by_id);
        Ok(())
    }

    #[test]
    fn degenerate_pairs_are_counted_not_fatal() -> Result<()> {
        let mut set = TrajectorySet::default();
        set.by_id.insert(
            0,
            Trajectory::from_points(0, vec![[0.0; 3], [1.0, 1.0, 0.0]])?,
        );
        set.by_id.insert(
            1,
            Trajectory::from_points(1, vec![[0.0; 3], [1.0, 1.0, 1.0]])?,
        );
        let layers = [DetectorLayer::new(1.0, 1.0)?];
        let out = detect_layers(&set, &layers, ZRecovery::SharedSlope);
        assert_eq!(out[0].degenerate, 1);
        assert_eq!(out[0].points.len(), 1);
        assert_eq!(out[0].points[0].particle_id, 1);
        Ok(())
    }
}
