use std::collections::HashMap;
use std::sync::{Arc, OnceLock, Weak};

use bson::Bson;
use parking_lot::{Mutex, RwLock};

use super::collection::{check_batch, Collection};
use crate::core::errors::DriverError;
use crate::driver::{
    Driver, DriverCursor, FindRequest, Namespace, UpdateOutcome, WriteAcknowledgement,
};
use crate::Document;

type Collections = HashMap<Namespace, Collection>;

/// In-process driver that keeps collections in memory.
///
/// It evaluates the same query, projection, sort and update documents the
/// server does, for the operators the facade's builders produce. Collections
/// appear on first write, like on a real server.
///
/// Drivers created with [`MemoryDriver::shared`] under the same name see the
/// same data for as long as one of them is alive, the way clients built from
/// identical connection strings share a pool.
#[derive(Debug, Clone)]
pub struct MemoryDriver {
    collections: Arc<RwLock<Collections>>,
    write: WriteAcknowledgement,
}

fn registry() -> &'static Mutex<HashMap<String, Weak<RwLock<Collections>>>> {
    static REGISTRY: OnceLock<Mutex<HashMap<String, Weak<RwLock<Collections>>>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

impl MemoryDriver {
    /// A driver with its own private store.
    pub fn new() -> Self {
        Self {
            collections: Arc::new(RwLock::new(HashMap::new())),
            write: WriteAcknowledgement::Acknowledged,
        }
    }

    /// A driver attached to the store registered under `name`, creating it if
    /// no live driver holds it.
    pub fn shared(name: &str) -> Self {
        let mut registry = registry().lock();
        registry.retain(|_, store| store.strong_count() > 0);
        let collections = match registry.get(name).and_then(Weak::upgrade) {
            Some(existing) => existing,
            None => {
                let fresh = Arc::new(RwLock::new(HashMap::new()));
                registry.insert(name.to_string(), Arc::downgrade(&fresh));
                fresh
            }
        };
        Self {
            collections,
            write: WriteAcknowledgement::Acknowledged,
        }
    }

    /// With [`WriteAcknowledgement::Unacknowledged`] updates still apply but
    /// report no modified count.
    pub fn with_write_concern(mut self, write: WriteAcknowledgement) -> Self {
        self.write = write;
        self
    }

    /// Names of collections in `database` that have been written to, sorted.
    pub fn list_collections(&self, database: &str) -> Vec<String> {
        let collections = self.collections.read();
        let mut names: Vec<String> = collections
            .keys()
            .filter(|ns| ns.database == database)
            .map(|ns| ns.collection.clone())
            .collect();
        names.sort();
        names
    }

    fn write_outcome(&self, outcome: UpdateOutcome) -> UpdateOutcome {
        UpdateOutcome {
            matched: outcome.matched,
            modified: outcome.modified.filter(|_| self.write.is_acknowledged()),
        }
    }
}

impl Default for MemoryDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl Driver for MemoryDriver {
    fn ping(&self) -> Result<(), DriverError> {
        Ok(())
    }

    fn find(&self, ns: &Namespace, request: FindRequest) -> Result<DriverCursor, DriverError> {
        let collections = self.collections.read();
        let docs = match collections.get(ns) {
            Some(coll) => coll.find(&request)?,
            None => {
                // Still validate the request against an empty collection.
                Collection::new().find(&request)?
            }
        };
        Ok(Box::new(docs.into_iter().map(Ok)))
    }

    fn insert_one(&self, ns: &Namespace, document: Document) -> Result<Bson, DriverError> {
        let mut collections = self.collections.write();
        collections.entry(ns.clone()).or_default().insert_one(document)
    }

    fn insert_many(&self, ns: &Namespace, documents: Vec<Document>) -> Result<(), DriverError> {
        check_batch(&documents)?;
        let mut collections = self.collections.write();
        collections
            .entry(ns.clone())
            .or_default()
            .insert_many(documents)?;
        Ok(())
    }

    fn update_one(
        &self,
        ns: &Namespace,
        filter: Document,
        update: Document,
    ) -> Result<UpdateOutcome, DriverError> {
        let mut collections = self.collections.write();
        let outcome = match collections.get_mut(ns) {
            Some(coll) => coll.update_one(&filter, &update)?,
            None => Collection::new().update_one(&filter, &update)?,
        };
        Ok(self.write_outcome(outcome))
    }

    fn update_many(
        &self,
        ns: &Namespace,
        filter: Document,
        update: Document,
    ) -> Result<UpdateOutcome, DriverError> {
        let mut collections = self.collections.write();
        let outcome = match collections.get_mut(ns) {
            Some(coll) => coll.update_many(&filter, &update)?,
            None => Collection::new().update_many(&filter, &update)?,
        };
        Ok(self.write_outcome(outcome))
    }

    fn count(&self, ns: &Namespace, filter: Document) -> Result<u64, DriverError> {
        let collections = self.collections.read();
        match collections.get(ns) {
            Some(coll) => coll.count(&filter),
            None => Collection::new().count(&filter),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn ns(collection: &str) -> Namespace {
        Namespace::new("testdb", collection)
    }

    #[test]
    fn collections_appear_on_first_write() {
        let driver = MemoryDriver::new();
        assert_eq!(driver.count(&ns("people"), doc! {}).unwrap(), 0);
        assert!(driver.list_collections("testdb").is_empty());

        driver.insert_one(&ns("people"), doc! {"name": "a"}).unwrap();
        driver
            .update_one(&ns("ghost"), doc! {}, doc! {"$set": {"x": 1}})
            .unwrap();
        assert_eq!(driver.list_collections("testdb"), vec!["people".to_string()]);
    }

    #[test]
    fn empty_batch_does_not_create_a_collection() {
        let driver = MemoryDriver::new();
        assert!(matches!(
            driver.insert_many(&ns("people"), Vec::new()),
            Err(DriverError::EmptyBatch)
        ));
        assert!(driver.list_collections("testdb").is_empty());
    }

    #[test]
    fn reads_on_missing_collection_still_validate() {
        let driver = MemoryDriver::new();
        let request = FindRequest {
            filter: doc! {"$bogus": 1},
            ..Default::default()
        };
        assert!(matches!(
            driver.find(&ns("none"), request),
            Err(DriverError::InvalidQuery(_))
        ));
    }

    #[test]
    fn shared_stores_are_keyed_by_name() {
        let first = MemoryDriver::shared("db-keyed-by-name");
        let second = MemoryDriver::shared("db-keyed-by-name");
        let other = MemoryDriver::shared("db-keyed-by-name-other");

        first.insert_one(&ns("c"), doc! {"_id": 1}).unwrap();
        assert_eq!(second.count(&ns("c"), doc! {}).unwrap(), 1);
        assert_eq!(other.count(&ns("c"), doc! {}).unwrap(), 0);
    }

    #[test]
    fn shared_store_is_released_with_last_driver() {
        {
            let driver = MemoryDriver::shared("db-released");
            driver.insert_one(&ns("c"), doc! {"_id": 1}).unwrap();
        }
        let fresh = MemoryDriver::shared("db-released");
        assert_eq!(fresh.count(&ns("c"), doc! {}).unwrap(), 0);
    }

    #[test]
    fn unacknowledged_writes_hide_modified_count() {
        let driver = MemoryDriver::new().with_write_concern(WriteAcknowledgement::Unacknowledged);
        driver
            .insert_many(&ns("c"), vec![doc! {"n": 1}, doc! {"n": 1}])
            .unwrap();
        let outcome = driver
            .update_many(&ns("c"), doc! {"n": 1}, doc! {"$set": {"n": 2}})
            .unwrap();
        assert_eq!(outcome.matched, 2);
        assert_eq!(outcome.modified, None);
        assert_eq!(driver.count(&ns("c"), doc! {"n": 2}).unwrap(), 2);
    }
}
