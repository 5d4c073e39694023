use bson::Bson;

use super::connection::{Connection, ConnectionConfig};
use super::cursor::DocumentCursor;
use crate::core::errors::StoreError;
use crate::driver::{MongoDriver, Namespace};
use crate::query::{Filter, FindOptions, Projection, Sort, UpdateSpec};
use crate::Document;

/// A connection bound to one logical database.
///
/// The database does not have to exist: the server creates it, and each
/// collection, on first write.
///
/// ```no_run
/// use docstore::{DocumentStore, Filter, UpdateSpec, doc};
///
/// let store = DocumentStore::connect("mongodb://127.0.0.1:27017", "shop")?;
/// let orders = store.collection("orders");
/// orders.insert(doc! {"_id": 1, "status": "new"})?;
/// let shipped = orders.update_many(Filter::eq("status", "new"), UpdateSpec::new().set("status", "shipped"))?;
/// assert!(shipped <= 1);
/// # Ok::<(), docstore::StoreError>(())
/// ```
#[derive(Debug, Clone)]
pub struct DocumentStore {
    connection: Connection,
    database: String,
}

impl DocumentStore {
    /// Connect to the cluster named by `connection_string` with default
    /// settings. The string is handed to the driver as is.
    pub fn connect(connection_string: &str, database: &str) -> Result<Self, StoreError> {
        Self::connect_with_config(&ConnectionConfig::new(connection_string, database))
    }

    pub fn connect_with_config(config: &ConnectionConfig) -> Result<Self, StoreError> {
        config.validate()?;
        let driver = MongoDriver::connect(&config.connection_string, config.write_concern)
            .map_err(StoreError::Connection)?;
        let connection = Connection::new(driver);
        if config.verify_on_connect {
            connection.ping()?;
        }
        tracing::info!(
            database = %config.database,
            write_concern = ?config.write_concern,
            verified = config.verify_on_connect,
            "connected to document store"
        );
        Ok(Self::open(connection, &config.database))
    }

    /// Bind an existing connection, for instance one wrapping a
    /// [`MemoryDriver`](crate::MemoryDriver).
    pub fn open(connection: Connection, database: &str) -> Self {
        Self {
            connection,
            database: database.to_string(),
        }
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn database_name(&self) -> &str {
        &self.database
    }

    pub fn collection(&self, name: &str) -> Collection<'_> {
        Collection {
            store: self,
            namespace: Namespace::new(self.database.as_str(), name),
        }
    }
}

/// Handle on one collection of a [`DocumentStore`]. Cheap to create; every
/// call goes straight to the driver.
#[derive(Debug, Clone)]
pub struct Collection<'a> {
    store: &'a DocumentStore,
    namespace: Namespace,
}

impl Collection<'_> {
    pub fn name(&self) -> &str {
        &self.namespace.collection
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn find(&self, filter: impl Into<Filter>) -> Result<DocumentCursor, StoreError> {
        self.find_with(filter, FindOptions::new())
    }

    pub fn find_with_projection(
        &self,
        filter: impl Into<Filter>,
        projection: Projection,
    ) -> Result<DocumentCursor, StoreError> {
        self.find_with(filter, FindOptions::new().projection(projection))
    }

    pub fn find_sorted(
        &self,
        filter: impl Into<Filter>,
        sort: Sort,
    ) -> Result<DocumentCursor, StoreError> {
        self.find_with(filter, FindOptions::new().sort(sort))
    }

    /// Results follow `sort` even when `projection` removes the sort keys.
    pub fn find_sorted_with_projection(
        &self,
        filter: impl Into<Filter>,
        sort: Sort,
        projection: Projection,
    ) -> Result<DocumentCursor, StoreError> {
        self.find_with(
            filter,
            FindOptions::new().sort(sort).projection(projection),
        )
    }

    pub fn find_with(
        &self,
        filter: impl Into<Filter>,
        options: FindOptions,
    ) -> Result<DocumentCursor, StoreError> {
        let request = options.into_request(filter.into().to_document());
        tracing::debug!(
            ns = %self.namespace,
            filter = %request.filter,
            skip = ?request.skip,
            limit = ?request.limit,
            "find"
        );
        let inner = self
            .driver()
            .find(&self.namespace, request)
            .map_err(StoreError::Query)?;
        Ok(DocumentCursor::new(self.namespace.clone(), inner))
    }

    /// First matching document in natural order, if any.
    pub fn find_one(&self, filter: impl Into<Filter>) -> Result<Option<Document>, StoreError> {
        let mut cursor = self.find_with(filter, FindOptions::new().limit(1))?;
        cursor.next().transpose()
    }

    /// Insert `document` and return its `_id`, which the driver assigns when
    /// the document has none.
    pub fn insert(&self, document: Document) -> Result<Bson, StoreError> {
        tracing::debug!(ns = %self.namespace, "insert");
        self.driver()
            .insert_one(&self.namespace, document)
            .map_err(StoreError::Write)
    }

    /// Ordered bulk insert. On failure the driver's report of which document
    /// failed and what was written is returned as the error source.
    pub fn insert_many(&self, documents: Vec<Document>) -> Result<(), StoreError> {
        tracing::debug!(ns = %self.namespace, count = documents.len(), "insert_many");
        self.driver()
            .insert_many(&self.namespace, documents)
            .map_err(StoreError::Write)
    }

    /// Apply `update` to the first matching document. No match is not an error.
    pub fn update(
        &self,
        filter: impl Into<Filter>,
        update: impl Into<UpdateSpec>,
    ) -> Result<(), StoreError> {
        let filter = filter.into().to_document();
        let update = update.into().to_document();
        tracing::debug!(ns = %self.namespace, %filter, %update, "update");
        let outcome = self
            .driver()
            .update_one(&self.namespace, filter, update)
            .map_err(StoreError::Write)?;
        tracing::debug!(ns = %self.namespace, matched = outcome.matched, "update done");
        Ok(())
    }

    /// Apply `update` to every matching document and return how many changed.
    ///
    /// Returns 0 when the driver cannot learn the count, as with unacknowledged
    /// writes, so 0 does not prove nothing changed.
    pub fn update_many(
        &self,
        filter: impl Into<Filter>,
        update: impl Into<UpdateSpec>,
    ) -> Result<u64, StoreError> {
        let filter = filter.into().to_document();
        let update = update.into().to_document();
        tracing::debug!(ns = %self.namespace, %filter, %update, "update_many");
        let outcome = self
            .driver()
            .update_many(&self.namespace, filter, update)
            .map_err(StoreError::Write)?;
        Ok(outcome.modified.unwrap_or(0))
    }

    /// Number of documents in the collection.
    pub fn count(&self) -> Result<u64, StoreError> {
        self.count_matching(Filter::all())
    }

    pub fn count_matching(&self, filter: impl Into<Filter>) -> Result<u64, StoreError> {
        let filter = filter.into().to_document();
        tracing::debug!(ns = %self.namespace, %filter, "count");
        self.driver()
            .count(&self.namespace, filter)
            .map_err(StoreError::Query)
    }

    fn driver(&self) -> &dyn crate::driver::Driver {
        self.store.connection.driver()
    }
}
