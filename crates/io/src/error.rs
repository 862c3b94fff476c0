use std::fmt;
use std::path::PathBuf;

use routeplan_recon::ReconError;

#[derive(Debug)]
pub enum IoError {
    /// A required input file does not exist.
    NotFound { what: &'static str, path: PathBuf },
    /// A structurally required sheet is absent.
    MissingSheet { path: PathBuf, sheet: String },
    /// A structurally required column is absent (e.g. the export's route column).
    MissingColumn { path: PathBuf, column: String },
    /// Workbook could not be opened, read or built.
    Workbook(String),
    /// CSV could not be parsed or written.
    Csv(String),
    /// Output file could not be written or moved into place.
    Write(String),
    /// A mapping file row carries an invalid value.
    Mapping { line: u64, source: ReconError },
    Io(std::io::Error),
    Recon(ReconError),
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { what, path } => write!(f, "{what} not found: {}", path.display()),
            Self::MissingSheet { path, sheet } => {
                write!(f, "{}: sheet '{sheet}' not found", path.display())
            }
            Self::MissingColumn { path, column } => {
                write!(f, "{}: column '{column}' not found", path.display())
            }
            Self::Workbook(msg) => write!(f, "workbook error: {msg}"),
            Self::Csv(msg) => write!(f, "CSV error: {msg}"),
            Self::Write(msg) => write!(f, "write error: {msg}"),
            Self::Mapping { line, source } => write!(f, "mapping line {line}: {source}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Recon(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Recon(e) | Self::Mapping { source: e, .. } => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for IoError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<ReconError> for IoError {
    fn from(e: ReconError) -> Self {
        Self::Recon(e)
    }
}

impl From<csv::Error> for IoError {
    fn from(e: csv::Error) -> Self {
        Self::Csv(e.to_string())
    }
}

impl From<calamine::Error> for IoError {
    fn from(e: calamine::Error) -> Self {
        Self::Workbook(e.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for IoError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        Self::Write(e.to_string())
    }
}
