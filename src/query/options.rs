use super::{Projection, Sort};
use crate::driver::FindRequest;
use crate::Document;

/// Optional settings for a find. Unset fields leave the driver default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub projection: Option<Projection>,
    pub sort: Option<Sort>,
    pub skip: Option<u64>,
    /// Maximum number of documents; a negative value is treated as its
    /// absolute value.
    pub limit: Option<i64>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn projection(mut self, projection: Projection) -> Self {
        self.projection = Some(projection);
        self
    }

    pub fn sort(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub(crate) fn into_request(self, filter: Document) -> FindRequest {
        FindRequest {
            filter,
            projection: self
                .projection
                .filter(|p| !p.is_empty())
                .map(|p| p.to_document()),
            sort: self.sort.filter(|s| !s.is_empty()).map(|s| s.to_document()),
            skip: self.skip,
            limit: self.limit,
        }
    }
}
