//! JSON form of the per-layer detection points consumed by plotting tools:
//!
//! ```text
//! {"0": {"detection_points": [[x, y, z], ...], "cylinder_radius_meters": 0.5}, "1": ...}
//! ```

use crate::core::detector::LayerHits;
use crate::core::particle::DIM;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// One layer in the output mapping. Field names are part of the external contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedLayer {
    pub detection_points: Vec<[f64; DIM]>,
    pub cylinder_radius_meters: f64,
}

/// Layer index -> layer record.
pub type EncodedResult = BTreeMap<usize, EncodedLayer>;

pub fn encode(layers: &[LayerHits]) -> EncodedResult {
    layers
        .iter()
        .map(|h| {
            (
                h.layer_index,
                EncodedLayer {
                    detection_points: h.positions(),
                    cylinder_radius_meters: h.radius,
                },
            )
        })
        .collect()
}

pub fn to_json(layers: &[LayerHits]) -> Result<String> {
    Ok(serde_json::to_string(&encode(layers))?)
}

pub fn from_json(s: &str) -> Result<EncodedResult> {
    Ok(serde_json::from_str(s)?)
}

/// Write the mapping to `path`, creating missing parent directories.
pub fn write_json(path: impl AsRef<Path>, layers: &[LayerHits]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, to_json(layers)?)?;
    log::info!("wrote detection points for {} layers to {:?}", layers.len(), path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::detector::DetectionPoint;

    fn hits() -> Vec<LayerHits> {
        vec![
            LayerHits {
                layer_index: 0,
                radius: 0.5,
                points: vec![DetectionPoint {
                    particle_id: 3,
                    layer_radius: 0.5,
                    position: [0.5, 0.0, 0.25],
                }],
                missed: 0,
                degenerate: 0,
            },
            LayerHits {
                layer_index: 1,
                radius: 1.0,
                points: vec![],
                missed: 1,
                degenerate: 0,
            },
        ]
    }

    #[test]
    fn json_uses_contract_field_names() -> Result<()> {
        let json = to_json(&hits())?;
        let v: serde_json::Value = serde_json::from_str(&json)?;
        assert_eq!(v["0"]["cylinder_radius_meters"], 0.5);
        assert_eq!(v["0"]["detection_points"][0][2], 0.25);
        assert_eq!(v["1"]["detection_points"].as_array().map(Vec::len), Some(0));
        Ok(())
    }

    #[test]
    fn json_reads_back() -> Result<()> {
        let layers = hits();
        let back = from_json(&to_json(&layers)?)?;
        assert_eq!(back, encode(&layers));
        Ok(())
    }
}
