//! The seam between the facade and the database client that does the work.

use std::fmt;
use std::str::FromStr;

use bson::Bson;
use serde::Deserialize;

use crate::core::errors::DriverError;
use crate::Document;

mod mongo;

pub use mongo::MongoDriver;

/// Lazy, forward-only stream of documents produced by a driver.
pub type DriverCursor = Box<dyn Iterator<Item = Result<Document, DriverError>> + Send>;

/// `database.collection`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    pub database: String,
    pub collection: String,
}

impl Namespace {
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.collection)
    }
}

/// A find as the driver sees it: rendered documents, no typed builders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindRequest {
    pub filter: Document,
    pub projection: Option<Document>,
    pub sort: Option<Document>,
    pub skip: Option<u64>,
    pub limit: Option<i64>,
}

/// Result of an update. `modified` is `None` when the write concern does not
/// let the driver learn how many documents changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub matched: u64,
    pub modified: Option<u64>,
}

/// Acknowledgement level requested for writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteAcknowledgement {
    #[default]
    Acknowledged,
    Unacknowledged,
}

impl WriteAcknowledgement {
    pub fn is_acknowledged(self) -> bool {
        self == WriteAcknowledgement::Acknowledged
    }
}

impl FromStr for WriteAcknowledgement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "acknowledged" | "1" => Ok(WriteAcknowledgement::Acknowledged),
            "unacknowledged" | "0" => Ok(WriteAcknowledgement::Unacknowledged),
            other => Err(format!("unknown write concern '{other}'")),
        }
    }
}

/// Operations the facade delegates. Implementations own transport, encoding
/// and cursor batching; they report failures as [`DriverError`] and the facade
/// passes them on untouched.
pub trait Driver: Send + Sync + fmt::Debug {
    /// Round-trip to the server to prove it is reachable and accepts our
    /// credentials.
    fn ping(&self) -> Result<(), DriverError>;

    fn find(&self, ns: &Namespace, request: FindRequest) -> Result<DriverCursor, DriverError>;

    /// Insert one document and return its `_id`.
    fn insert_one(&self, ns: &Namespace, document: Document) -> Result<Bson, DriverError>;

    fn insert_many(&self, ns: &Namespace, documents: Vec<Document>) -> Result<(), DriverError>;

    fn update_one(
        &self,
        ns: &Namespace,
        filter: Document,
        update: Document,
    ) -> Result<UpdateOutcome, DriverError>;

    fn update_many(
        &self,
        ns: &Namespace,
        filter: Document,
        update: Document,
    ) -> Result<UpdateOutcome, DriverError>;

    fn count(&self, ns: &Namespace, filter: Document) -> Result<u64, DriverError>;
}
