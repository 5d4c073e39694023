mod api;
mod core;
mod driver;
mod engine;
mod query;

pub use crate::api::{Collection, ConnectionConfig, Connection, DocumentCursor, DocumentStore};
pub use crate::core::errors::{DriverError, StoreError};
pub use crate::driver::{
    Driver, DriverCursor, FindRequest, MongoDriver, Namespace, UpdateOutcome, WriteAcknowledgement,
};
pub use crate::engine::MemoryDriver;
pub use crate::query::{Direction, Filter, FindOptions, Projection, Sort, UpdateSpec};

pub use bson::{doc, Bson};

pub type Document = bson::Document;
