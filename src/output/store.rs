use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::calling::call_data::CallData;
use crate::calling::config::CallerConfig;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to access call data file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode call data: {0}")]
    Encoding(#[from] bincode::Error),
}

/// Call data file version for compatibility checking
pub const STORE_VERSION: &str = "1.0.0";

/// Serializable call data file format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCalls {
    pub version: String,
    pub created_at: DateTime<Utc>,

    /// Thresholds the calls were made with
    pub config: CallerConfig,

    pub call_data: CallData,
}

impl StoredCalls {
    #[must_use]
    pub fn new(config: CallerConfig, call_data: CallData) -> Self {
        Self {
            version: STORE_VERSION.to_string(),
            created_at: Utc::now(),
            config,
            call_data,
        }
    }

    /// Write gzip compressed call data.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let file = File::create(path)?;
        let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
        bincode::serialize_into(&mut encoder, self)?;
        encoder.finish()?.flush()?;

        debug!(path = %path.display(), "Saved call data");
        Ok(())
    }

    /// Load call data written by [`save`](Self::save).
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the file cannot be read or decoded.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let file = File::open(path)?;
        let mut stored: Self = bincode::deserialize_from(GzDecoder::new(BufReader::new(file)))?;

        // Version check (warn but don't fail)
        if stored.version != STORE_VERSION {
            warn!(
                expected = STORE_VERSION,
                found = %stored.version,
                "Call data version mismatch"
            );
        }

        stored.call_data.rebuild_index();
        Ok(stored)
    }
}
