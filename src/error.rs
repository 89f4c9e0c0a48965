use thiserror::Error;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, DragError>;

/// Failures surfaced by the simulation core.
///
/// Per-ray outcomes (escape, energy floor, bounce limit) are not errors; they are
/// reported through [`crate::sim::drag::Termination`].
#[derive(Debug, Error)]
pub enum DragError {
    /// Unusable configuration (empty species table, invalid fractions, zero flow vector...).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// No mesh to trace against, or the mesh is malformed.
    #[error("geometry unavailable: {0}")]
    GeometryUnavailable(String),

    /// A quantity needed as a divisor collapsed to zero.
    #[error("numerically degenerate: {0}")]
    NumericDegenerate(String),

    /// Malformed particle record block at a rank boundary.
    #[error("wire format error: {0}")]
    Wire(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_is_informative() {
        let e = DragError::Configuration("species table is empty".to_string());
        let msg = format!("{e}");
        assert!(msg.contains("configuration"));
        assert!(msg.contains("species"));
    }

    #[test]
    fn converts_into_anyhow() {
        let res: anyhow::Result<()> =
            Err(DragError::GeometryUnavailable("empty mesh".into()).into());
        assert!(res.unwrap_err().to_string().contains("empty mesh"));
    }
}
