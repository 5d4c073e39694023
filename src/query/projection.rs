use bson::Bson;

use crate::Document;

/// Which fields to include in or exclude from returned documents.
///
/// Apart from `_id`, a projection is either all inclusions or all exclusions;
/// the driver rejects a mix when the query runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    fields: Vec<(String, bool)>,
}

impl Projection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn including<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        fields.into_iter().fold(Self::new(), |p, f| p.include(f))
    }

    pub fn excluding<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        fields.into_iter().fold(Self::new(), |p, f| p.exclude(f))
    }

    pub fn include(self, field: impl Into<String>) -> Self {
        self.with(field.into(), true)
    }

    pub fn exclude(self, field: impl Into<String>) -> Self {
        self.with(field.into(), false)
    }

    /// Setting the same field twice keeps the last choice in its first position.
    fn with(mut self, field: String, include: bool) -> Self {
        match self.fields.iter_mut().find(|(f, _)| *f == field) {
            Some(entry) => entry.1 = include,
            None => self.fields.push((field, include)),
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn to_document(&self) -> Document {
        let mut d = Document::new();
        for (field, include) in &self.fields {
            d.insert(field.as_str(), Bson::Int32(i32::from(*include)));
        }
        d
    }
}
