use std::cmp::Ordering;

use bson::Bson;

use crate::core::document::{lookup_path, normalize_document, ID_FIELD};
use crate::core::errors::DriverError;
use crate::core::ordering::{bson_eq, compare_bson};
use crate::driver::{FindRequest, UpdateOutcome};
use crate::Document;

use super::matcher::{check_filter, matches};
use super::projection::ProjectionPlan;

mod update;

use self::update::{apply_update, check_update};

/// Documents of one collection, kept in insertion order.
#[derive(Debug, Default)]
pub(crate) struct Collection {
    docs: Vec<Document>,
}

impl Collection {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert_one(&mut self, doc: Document) -> Result<Bson, DriverError> {
        let doc = normalize_document(doc);
        let id = doc.get(ID_FIELD).cloned().unwrap_or(Bson::Null);
        if self.position_of_id(&id).is_some() {
            return Err(DriverError::DuplicateKey(id.to_string()));
        }
        self.docs.push(doc);
        Ok(id)
    }

    /// Ordered bulk insert: documents before the first failure stay written.
    pub(crate) fn insert_many(&mut self, docs: Vec<Document>) -> Result<usize, DriverError> {
        check_batch(&docs)?;
        let mut inserted = 0;
        for (index, doc) in docs.into_iter().enumerate() {
            if let Err(e) = self.insert_one(doc) {
                return Err(DriverError::BulkWrite {
                    index,
                    inserted,
                    source: Box::new(e),
                });
            }
            inserted += 1;
        }
        Ok(inserted)
    }

    pub(crate) fn find(&self, request: &FindRequest) -> Result<Vec<Document>, DriverError> {
        let projection = request
            .projection
            .as_ref()
            .map(ProjectionPlan::parse)
            .transpose()?;
        check_filter(&request.filter)?;
        let sort_keys = match &request.sort {
            Some(sort) => parse_sort(sort)?,
            None => Vec::new(),
        };

        let mut results = Vec::new();
        for doc in &self.docs {
            if matches(doc, &request.filter)? {
                results.push(doc);
            }
        }

        // Sort before projecting so keys the projection drops still order results.
        if !sort_keys.is_empty() {
            results.sort_by(|a, b| compare_by_keys(a, b, &sort_keys));
        }

        let skip = request.skip.unwrap_or(0) as usize;
        let limit = match request.limit {
            Some(0) | None => usize::MAX,
            Some(n) => n.unsigned_abs() as usize,
        };

        Ok(results
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|doc| match &projection {
                Some(plan) => plan.apply(doc),
                None => doc.clone(),
            })
            .collect())
    }

    pub(crate) fn count(&self, filter: &Document) -> Result<u64, DriverError> {
        check_filter(filter)?;
        let mut n = 0;
        for doc in &self.docs {
            if matches(doc, filter)? {
                n += 1;
            }
        }
        Ok(n)
    }

    pub(crate) fn update_one(
        &mut self,
        filter: &Document,
        update: &Document,
    ) -> Result<UpdateOutcome, DriverError> {
        self.update(filter, update, false)
    }

    pub(crate) fn update_many(
        &mut self,
        filter: &Document,
        update: &Document,
    ) -> Result<UpdateOutcome, DriverError> {
        self.update(filter, update, true)
    }

    /// Documents already rewritten stay rewritten if a later one fails.
    fn update(
        &mut self,
        filter: &Document,
        update: &Document,
        multi: bool,
    ) -> Result<UpdateOutcome, DriverError> {
        check_filter(filter)?;
        check_update(update)?;
        let mut matched = 0;
        let mut modified = 0;

        for doc in self.docs.iter_mut() {
            if !matches(doc, filter)? {
                continue;
            }
            matched += 1;
            let updated = apply_update(doc, update)?;
            if updated != *doc {
                *doc = updated;
                modified += 1;
            }
            if !multi {
                break;
            }
        }

        Ok(UpdateOutcome {
            matched,
            modified: Some(modified),
        })
    }

    fn position_of_id(&self, id: &Bson) -> Option<usize> {
        self.docs
            .iter()
            .position(|doc| doc.get(ID_FIELD).is_some_and(|existing| bson_eq(existing, id)))
    }
}

/// The server refuses an empty bulk insert.
pub(crate) fn check_batch(docs: &[Document]) -> Result<(), DriverError> {
    if docs.is_empty() {
        return Err(DriverError::EmptyBatch);
    }
    Ok(())
}

type SortKey = (String, bool);

fn parse_sort(sort: &Document) -> Result<Vec<SortKey>, DriverError> {
    sort.iter()
        .map(|(field, direction)| {
            let ascending = match direction {
                Bson::Int32(1) | Bson::Int64(1) => true,
                Bson::Int32(-1) | Bson::Int64(-1) => false,
                Bson::Double(d) if *d == 1.0 => true,
                Bson::Double(d) if *d == -1.0 => false,
                other => {
                    return Err(DriverError::InvalidQuery(format!(
                        "bad sort specification for '{field}': {other}"
                    )))
                }
            };
            Ok((field.clone(), ascending))
        })
        .collect()
}

fn compare_by_keys(a: &Document, b: &Document, keys: &[SortKey]) -> Ordering {
    for (field, ascending) in keys {
        let left = sort_value(a, field, *ascending);
        let right = sort_value(b, field, *ascending);
        let ord = compare_bson(&left, &right);
        let ord = if *ascending { ord } else { ord.reverse() };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Missing fields sort as null. An array sorts by its smallest element when
/// ascending and its largest when descending; an empty array sorts as null.
fn sort_value(doc: &Document, field: &str, ascending: bool) -> Bson {
    match lookup_path(doc, field) {
        None => Bson::Null,
        Some(Bson::Array(items)) => {
            let pick = if ascending {
                items.iter().min_by(|x, y| compare_bson(x, y))
            } else {
                items.iter().max_by(|x, y| compare_bson(x, y))
            };
            pick.cloned().unwrap_or(Bson::Null)
        }
        Some(value) => value.clone(),
    }
}
