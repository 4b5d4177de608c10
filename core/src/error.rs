use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnrichError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::XlsxError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Table '{table}' has no column '{column}'")]
    MissingColumn { table: String, column: String },

    #[error("Column '{column}' has {actual} rows, table has {expected}")]
    ColumnLength {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("Value {value} in column '{column}' cannot be used as a code")]
    UnmappableValue { column: String, value: String },

    #[error(
        "Pipeline already running (marker: {marker}); if no run is active, \
         run `etl-runner unlock` or delete the marker"
    )]
    Reentrancy { marker: String },

    #[error("Step '{step}' failed: {source}")]
    StepFailed {
        step: String,
        #[source]
        source: Box<EnrichError>,
    },

    #[error("No '{stage}' artifacts found in {path}")]
    ArtifactNotFound { stage: String, path: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type EnrichResult<T> = Result<T, EnrichError>;

impl EnrichError {
    pub fn missing_column(table: &str, column: &str) -> Self {
        Self::MissingColumn {
            table: table.to_string(),
            column: column.to_string(),
        }
    }
}
