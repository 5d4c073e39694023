use bson::Bson;

use crate::Document;

/// Field mutations applied by an update.
///
/// ```
/// use docstore::{doc, UpdateSpec};
///
/// let spec = UpdateSpec::new().set("name", "b").inc("visits", 1);
/// assert_eq!(spec.to_document(), doc! {"$set": {"name": "b"}, "$inc": {"visits": 1}});
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateSpec {
    document: Document,
}

impl UpdateSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a hand-written update document.
    pub fn raw(document: Document) -> Self {
        Self { document }
    }

    pub fn set(self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.with("$set", field.into(), value.into())
    }

    pub fn unset(self, field: impl Into<String>) -> Self {
        self.with("$unset", field.into(), Bson::String(String::new()))
    }

    pub fn inc(self, field: impl Into<String>, by: impl Into<Bson>) -> Self {
        self.with("$inc", field.into(), by.into())
    }

    pub fn push(self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.with("$push", field.into(), value.into())
    }

    pub fn pull(self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.with("$pull", field.into(), value.into())
    }

    fn with(mut self, op: &str, field: String, value: Bson) -> Self {
        match self.document.get_mut(op) {
            Some(Bson::Document(fields)) => {
                fields.insert(field, value);
            }
            _ => {
                let mut fields = Document::new();
                fields.insert(field, value);
                self.document.insert(op, fields);
            }
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.document.is_empty()
    }

    pub fn to_document(&self) -> Document {
        self.document.clone()
    }
}

impl From<Document> for UpdateSpec {
    fn from(document: Document) -> Self {
        Self::raw(document)
    }
}
