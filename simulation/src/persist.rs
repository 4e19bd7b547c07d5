//! Save and load of whole networks
//!
//! Serializes the full registry (every node's queues, tables, and
//! counters) plus the lost sink, statistics, and event log as JSON.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::controller::Controller;

/// Failures at the persistence boundary
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("persistence I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("persistence encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Write the whole network to `path` as pretty-printed JSON
pub fn save(net: &Controller, path: impl AsRef<Path>) -> Result<(), PersistError> {
    let json = serde_json::to_string_pretty(net)?;
    fs::write(path, json)?;
    Ok(())
}

/// Load a network previously written by [`save`]
pub fn load(path: impl AsRef<Path>) -> Result<Controller, PersistError> {
    let json = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::NetworkBuilder;

    #[test]
    fn test_save_then_load_preserves_the_network() {
        let mut net = NetworkBuilder::new(3).line();
        net.tick(6);
        net.send_message(
            "0.0.0.1".parse().unwrap(),
            "0.0.0.3".parse().unwrap(),
            10,
            b"stored".to_vec(),
        );

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mesh.json");
        save(&net, &path).unwrap();
        let restored = load(&path).unwrap();

        assert_eq!(
            serde_json::to_string(&restored).unwrap(),
            serde_json::to_string(&net).unwrap()
        );
    }

    #[test]
    fn test_load_missing_file_reports_io_error() {
        let err = load("/nonexistent/batmesh.json").unwrap_err();
        assert!(matches!(err, PersistError::Io(_)));
    }

    #[test]
    fn test_load_garbage_reports_encoding_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.json");
        fs::write(&path, "not json at all").unwrap();
        assert!(matches!(load(&path).unwrap_err(), PersistError::Json(_)));
    }
}
