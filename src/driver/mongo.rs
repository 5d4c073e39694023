use bson::{doc, Bson};
use mongodb::options::{Acknowledgment, CollectionOptions, FindOptions, WriteConcern};
use mongodb::sync::{Client, Collection};

use super::{Driver, DriverCursor, FindRequest, Namespace, UpdateOutcome, WriteAcknowledgement};
use crate::core::errors::DriverError;
use crate::Document;

/// Driver backed by the official MongoDB client in blocking mode.
///
/// The client keeps a connection pool and is cheap to clone; every operation
/// resolves its collection handle from the client, so no handle outlives the
/// pool it came from.
#[derive(Debug, Clone)]
pub struct MongoDriver {
    client: Client,
    write: WriteAcknowledgement,
}

impl MongoDriver {
    /// Build a client for `uri`. The string is handed to the client as-is;
    /// no network traffic happens until the first operation or [`Driver::ping`].
    pub fn connect(uri: &str, write: WriteAcknowledgement) -> Result<Self, DriverError> {
        let client = Client::with_uri_str(uri)?;
        Ok(Self { client, write })
    }

    pub fn from_client(client: Client, write: WriteAcknowledgement) -> Self {
        Self { client, write }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    fn collection(&self, ns: &Namespace) -> Collection<Document> {
        let database = self.client.database(&ns.database);
        match self.write {
            WriteAcknowledgement::Acknowledged => database.collection(&ns.collection),
            WriteAcknowledgement::Unacknowledged => {
                let mut concern = WriteConcern::default();
                concern.w = Some(Acknowledgment::Nodes(0));
                let mut options = CollectionOptions::default();
                options.write_concern = Some(concern);
                database.collection_with_options(&ns.collection, options)
            }
        }
    }

    fn outcome(&self, matched: u64, modified: u64) -> UpdateOutcome {
        UpdateOutcome {
            matched,
            modified: self.write.is_acknowledged().then_some(modified),
        }
    }
}

impl Driver for MongoDriver {
    fn ping(&self) -> Result<(), DriverError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .run()?;
        Ok(())
    }

    fn find(&self, ns: &Namespace, request: FindRequest) -> Result<DriverCursor, DriverError> {
        let mut options = FindOptions::default();
        options.projection = request.projection;
        options.sort = request.sort;
        options.skip = request.skip;
        options.limit = request.limit;

        let cursor = self
            .collection(ns)
            .find(request.filter)
            .with_options(options)
            .run()?;
        Ok(Box::new(cursor.map(|doc| doc.map_err(DriverError::from))))
    }

    fn insert_one(&self, ns: &Namespace, document: Document) -> Result<Bson, DriverError> {
        let result = self.collection(ns).insert_one(document).run()?;
        Ok(result.inserted_id)
    }

    fn insert_many(&self, ns: &Namespace, documents: Vec<Document>) -> Result<(), DriverError> {
        self.collection(ns).insert_many(documents).run()?;
        Ok(())
    }

    fn update_one(
        &self,
        ns: &Namespace,
        filter: Document,
        update: Document,
    ) -> Result<UpdateOutcome, DriverError> {
        let result = self.collection(ns).update_one(filter, update).run()?;
        Ok(self.outcome(result.matched_count, result.modified_count))
    }

    fn update_many(
        &self,
        ns: &Namespace,
        filter: Document,
        update: Document,
    ) -> Result<UpdateOutcome, DriverError> {
        let result = self.collection(ns).update_many(filter, update).run()?;
        Ok(self.outcome(result.matched_count, result.modified_count))
    }

    fn count(&self, ns: &Namespace, filter: Document) -> Result<u64, DriverError> {
        Ok(self.collection(ns).count_documents(filter).run()?)
    }
}
