//! Persistence of the payoff matrix between epochs.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::payoff::PayoffMatrix;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read payoff matrix from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse payoff matrix from {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode payoff matrix: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to write payoff matrix to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Backing store for the matrix shared across epochs.
pub trait MatrixStore {
    /// Previously persisted matrix, or `None` when nothing was saved yet.
    fn load(&self) -> Result<Option<PayoffMatrix>, StoreError>;

    fn save(&mut self, matrix: &PayoffMatrix) -> Result<(), StoreError>;

    /// Persisted matrix, falling back to the builtin template.
    fn load_or_template(&self) -> Result<PayoffMatrix, StoreError> {
        match self.load()? {
            Some(matrix) => {
                tracing::debug!(
                    target: "squad_tactics::store",
                    visits = matrix.total_visits(),
                    "matrix.loaded=persisted"
                );
                Ok(matrix)
            }
            None => {
                tracing::info!(target: "squad_tactics::store", "matrix.loaded=template");
                Ok(PayoffMatrix::template())
            }
        }
    }
}

/// Matrix kept as pretty JSON in a single file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        PathBuf::from(staging)
    }
}

impl MatrixStore for JsonFileStore {
    fn load(&self) -> Result<Option<PayoffMatrix>, StoreError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|source| StoreError::Parse {
                path: self.path.clone(),
                source,
            })
    }

    /// Writes to a sibling staging file and renames it over the target, so a
    /// failed write leaves the previous matrix intact.
    fn save(&mut self, matrix: &PayoffMatrix) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(matrix).map_err(StoreError::Encode)?;
        let staging = self.staging_path();
        fs::write(&staging, json).map_err(|source| StoreError::Write {
            path: staging.clone(),
            source,
        })?;
        fs::rename(&staging, &self.path).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })?;
        tracing::debug!(
            target: "squad_tactics::store",
            path = %self.path.display(),
            visits = matrix.total_visits(),
            "matrix.saved"
        );
        Ok(())
    }
}

/// In-process store, mainly for tests and embedding hosts.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    matrix: Option<PayoffMatrix>,
    saves: usize,
}

impl MemoryStore {
    pub fn with_matrix(matrix: PayoffMatrix) -> Self {
        Self {
            matrix: Some(matrix),
            saves: 0,
        }
    }

    pub fn matrix(&self) -> Option<&PayoffMatrix> {
        self.matrix.as_ref()
    }

    /// Number of successful saves.
    pub fn saves(&self) -> usize {
        self.saves
    }
}

impl MatrixStore for MemoryStore {
    fn load(&self) -> Result<Option<PayoffMatrix>, StoreError> {
        Ok(self.matrix.clone())
    }

    fn save(&mut self, matrix: &PayoffMatrix) -> Result<(), StoreError> {
        self.matrix = Some(matrix.clone());
        self.saves += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payoff::Action;

    #[test]
    fn missing_file_loads_template() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("matrix.json"));
        assert!(store.load().unwrap().is_none());
        assert_eq!(store.load_or_template().unwrap(), PayoffMatrix::template());
    }

    #[test]
    fn saved_matrix_is_reloaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matrix.json");
        let mut store = JsonFileStore::new(&path);
        let mut matrix = PayoffMatrix::template();
        matrix.record(Action::Attack, Action::Attack, [6.0, 6.0]);
        store.save(&matrix).unwrap();

        assert!(path.exists());
        assert!(!store.staging_path().exists());
        assert_eq!(JsonFileStore::new(&path).load().unwrap(), Some(matrix));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matrix.json");
        fs::write(&path, "{ not json").unwrap();
        let err = JsonFileStore::new(&path).load().unwrap_err();
        assert!(matches!(err, StoreError::Parse { .. }));
    }
}
