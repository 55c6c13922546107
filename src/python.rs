use numpy::ndarray::Array2;
use numpy::{IntoPyArray, PyArray2, PyReadonlyArray2};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyDict;

use crate::core::detector::{
    DetectorConfig, DEFAULT_LAYERS, DEFAULT_LAYER_LENGTH, DEFAULT_STEPS,
};
use crate::core::feed::{GeneratorParticle, ParticleGun, ROW_LEN};
use crate::core::particle::DIM;
use crate::core::{encode, Detector, ZRecovery};

fn py_err<E: ToString>(e: E) -> PyErr {
    PyValueError::new_err(e.to_string())
}

/// Read an (N, 9) particle array into generator entries.
fn read_particles(particles: &PyReadonlyArray2<'_, f64>) -> PyResult<Vec<GeneratorParticle>> {
    let arr = particles.as_array();
    if arr.shape()[1] != ROW_LEN {
        return Err(py_err(format!(
            "particles must have shape (N, {}), got {:?}",
            ROW_LEN,
            arr.shape()
        )));
    }
    arr.rows()
        .into_iter()
        .enumerate()
        .map(|(i, row)| GeneratorParticle::from_row(i, &row.to_vec()).map_err(py_err))
        .collect()
}

fn points_array(points: &[[f64; DIM]]) -> Array2<f64> {
    let mut arr = Array2::<f64>::zeros((points.len(), DIM));
    for (i, p) in points.iter().enumerate() {
        for k in 0..DIM {
            arr[[i, k]] = p[k];
        }
    }
    arr
}

/// Python-facing wrapper around the Rust detection pipeline.
///
/// Particle arrays have shape (N, 9) with columns
/// `[is_final, is_charged, x_mm, y_mm, z_mm, px, py, pz, e]`; flags are true when nonzero.
#[pyclass]
pub struct DetectorSim {
    det: Detector,
}

#[pymethods]
impl DetectorSim {
    /// Configure the detector.
    ///
    /// Parameters
    /// - n_steps: samples per trajectory (int, >= 1)
    /// - radii: layer radii in metres; None for ten layers at 0.5, 0.6, ..., 1.4
    /// - layer_length: nominal layer length along the beam axis (> 0, not used for crossings)
    /// - z_recovery: "parametric" (default) or "shared_slope"
    ///
    /// Errors: raises ValueError on invalid parameters.
    #[new]
    #[pyo3(signature = (n_steps=DEFAULT_STEPS, radii=None, layer_length=DEFAULT_LAYER_LENGTH, z_recovery="parametric"))]
    fn new(
        n_steps: usize,
        radii: Option<Vec<f64>>,
        layer_length: f64,
        z_recovery: &str,
    ) -> PyResult<Self> {
        let radii = radii.unwrap_or_else(|| {
            (0..DEFAULT_LAYERS)
                .map(|i| i as f64 / 10.0 + 0.5)
                .collect()
        });
        let mut cfg = DetectorConfig::new(n_steps, &radii, layer_length).map_err(py_err)?;
        cfg.z_recovery = z_recovery.parse::<ZRecovery>().map_err(py_err)?;
        let det = Detector::new(cfg).map_err(py_err)?;
        Ok(Self { det })
    }

    /// Layer radii in output order.
    fn radii(&self) -> Vec<f64> {
        self.det.config().radii()
    }

    /// Samples per trajectory.
    #[getter]
    fn n_steps(&self) -> usize {
        self.det.config().n_steps
    }

    /// Run the pipeline (releases the GIL during computation).
    ///
    /// Returns: dict {layer_index: {"detection_points": np.ndarray (M, 3),
    /// "cylinder_radius_meters": float}}
    fn detect<'py>(
        &self,
        py: Python<'py>,
        particles: PyReadonlyArray2<'py, f64>,
    ) -> PyResult<Py<PyDict>> {
        let event = read_particles(&particles)?;
        let report = py.detach(|| self.det.run(&event)).map_err(py_err)?;
        let out = PyDict::new(py);
        for hits in &report.layers {
            let inner = PyDict::new(py);
            inner.set_item("detection_points", points_array(&hits.positions()).into_pyarray(py))?;
            inner.set_item("cylinder_radius_meters", hits.radius)?;
            out.set_item(hits.layer_index, inner)?;
        }
        Ok(out.into())
    }

    /// Moving trajectories as dict {particle_index: np.ndarray (n_steps, 3)}.
    fn trajectories<'py>(
        &self,
        py: Python<'py>,
        particles: PyReadonlyArray2<'py, f64>,
    ) -> PyResult<Py<PyDict>> {
        let event = read_particles(&particles)?;
        let set = py.detach(|| self.det.trajectories(&event)).map_err(py_err)?;
        let out = PyDict::new(py);
        for t in set.iter() {
            out.set_item(t.particle_id, points_array(t.points()).into_pyarray(py))?;
        }
        Ok(out.into())
    }

    /// Run the pipeline and return the JSON mapping as a string.
    fn to_json<'py>(&self, py: Python<'py>, particles: PyReadonlyArray2<'py, f64>) -> PyResult<String> {
        let event = read_particles(&particles)?;
        py.detach(|| {
            let report = self.det.run(&event)?;
            encode::to_json(&report.layers)
        })
        .map_err(py_err)
    }

    /// Run the pipeline and write the JSON mapping to `path`.
    fn write_json<'py>(
        &self,
        py: Python<'py>,
        particles: PyReadonlyArray2<'py, f64>,
        path: std::path::PathBuf,
    ) -> PyResult<()> {
        let event = read_particles(&particles)?;
        py.detach(|| {
            let report = self.det.run(&event)?;
            encode::write_json(&path, &report.layers)
        })
        .map_err(py_err)
    }
}

/// Generate a synthetic (N, 9) particle array from a seeded particle gun.
#[pyfunction]
#[pyo3(signature = (num_particles, seed=None))]
fn particle_gun(py: Python<'_>, num_particles: usize, seed: Option<u64>) -> PyResult<Py<PyArray2<f64>>> {
    let event = ParticleGun::new(seed)
        .generate(num_particles)
        .map_err(py_err)?;
    let mut arr = Array2::<f64>::zeros((event.size(), ROW_LEN));
    for (i, p) in event.particles.iter().enumerate() {
        for (k, v) in p.to_row().into_iter().enumerate() {
            arr[[i, k]] = v;
        }
    }
    Ok(arr.into_pyarray(py).to_owned().into())
}

/// The detsim Python module entry point.
#[pymodule]
fn detsim(_py: Python<'_>, m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<DetectorSim>()?;
    m.add_function(wrap_pyfunction!(particle_gun, m)?)?;
    Ok(())
}
