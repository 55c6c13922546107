use thiserror::Error;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the detection pipeline.
///
/// Only construction-time problems and output failures are errors. A trajectory that
/// misses a layer, or whose geometry cannot be fitted, is a physics outcome and is
/// reported through [`crate::core::intersect::Crossing`] instead.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid user or API parameter (bad radius, non-finite particle field, wrong shape).
    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    /// Propagated I/O errors when writing encoded results.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Encoding or decoding of the detection-point mapping failed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_is_informative() {
        let e = Error::InvalidParam("layer radius must be > 0 (got -1)".to_string());
        let msg = format!("{e}");
        assert!(msg.contains("invalid parameter"));
        assert!(msg.contains("radius"));
    }

    #[test]
    fn json_errors_convert() {
        let raw = serde_json::from_str::<serde_json::Value>("{not json");
        let err: Error = match raw {
            Ok(_) => panic!("malformed input must not parse"),
            Err(e) => e.into(),
        };
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn result_type_alias_compiles() -> Result<()> {
        Ok(())
    }
}
