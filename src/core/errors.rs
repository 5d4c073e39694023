use thiserror::Error;

/// Errors returned by the facade. The variant records which kind of operation
/// failed; the wrapped [`DriverError`] is whatever the collaborator reported.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("connection error: {0}")]
    Connection(#[source] DriverError),

    #[error("query error: {0}")]
    Query(#[source] DriverError),

    #[error("write error: {0}")]
    Write(#[source] DriverError),

    #[error("configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// The driver error behind this failure, if it came from the driver.
    pub fn driver_error(&self) -> Option<&DriverError> {
        match self {
            StoreError::Connection(e) | StoreError::Query(e) | StoreError::Write(e) => Some(e),
            StoreError::Config(_) => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("mongodb error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("invalid update: {0}")]
    InvalidUpdate(String),

    #[error("duplicate key error: _id {0}")]
    DuplicateKey(String),

    #[error("a bulk insert needs at least one document")]
    EmptyBatch,

    #[error("bulk write stopped at index {index} after {inserted} inserted: {source}")]
    BulkWrite {
        index: usize,
        inserted: usize,
        source: Box<DriverError>,
    },
}
