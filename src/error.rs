use thiserror::Error;

/// Main error type for parts-counter ingestion
#[derive(Error, Debug)]
pub enum IngestError {
    /// Missing folders or an unusable connection string; stops the batch
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required column is blank or absent
    #[error("Validation error: {0}")]
    Validation(String),

    /// A datetime cell does not match `ddMMyyyy HH:mm:ss`
    #[error("Format error: {0}")]
    Format(String),

    /// The machine id could not be derived from the file name
    #[error("Machine id error: {0}")]
    Resolver(String),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Spreadsheet could not be opened or decoded
    #[error("Workbook error: {0}")]
    Workbook(#[from] calamine::Error),

    /// Workbook opened but contains no worksheet
    #[error("No worksheet found in file {0}")]
    NoWorksheet(String),
}

impl IngestError {
    /// Only configuration problems abort the whole batch; everything else
    /// is confined to the file being processed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, IngestError::Config(_))
    }
}

/// Convenient Result type using IngestError
pub type Result<T> = std::result::Result<T, IngestError>;
