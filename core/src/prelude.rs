use crate::processing::scene::ScanTable;
use crate::processing::stages::Stage;
use std::path::PathBuf;

/// Along-track rows in one scene.
pub const FOOTPRINT_ROWS: usize = 45;
/// Cross-track columns in one scene.
pub const FOOTPRINT_COLUMNS: usize = 30;
/// Footprints in the fixed scene grid.
pub const FOOTPRINTS: usize = FOOTPRINT_ROWS * FOOTPRINT_COLUMNS;
/// Spectral channels recorded per footprint.
pub const CHANNELS: usize = 2378;
/// Scan windows per calendar day.
pub const GRANULES_PER_DAY: u32 = 240;

/// Common error type for the selection, filtering and aggregation core.
#[derive(thiserror::Error, Debug)]
pub enum CoreError {
    /// Malformed granule or window arithmetic. Always fatal.
    #[error("validation failed: {0}")]
    Validation(String),
    /// A scene or table could not be decoded.
    #[error("{source_name} unreadable: {reason}")]
    Parse { source_name: String, reason: String },
    /// Transient failure talking to a remote collaborator.
    #[error("network failure: {0}")]
    Network(String),
    /// The retry budget for a unit of work ran out.
    #[error("{unit} incomplete after {attempts} attempts: {last_error}")]
    Incomplete {
        unit: String,
        attempts: u32,
        last_error: String,
    },
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("csv error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("archive error in {path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
    #[error("worker failure: {0}")]
    Worker(String),
}

impl CoreError {
    pub fn parse(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parse {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the error describes a defect rather than a data condition.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CoreError::Validation(_) | CoreError::Worker(_))
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

/// A single eligibility predicate evaluated per footprint.
///
/// Stages are chained by the scan filter pipeline; each one only ever sees
/// footprints that survived every stage before it.
pub trait FootprintStage: Send + Sync {
    fn stage(&self) -> Stage;
    fn admits(&self, scene: &ScanTable, footprint: usize) -> bool;
}
