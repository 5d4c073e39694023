use bson::Bson;

use crate::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    fn as_bson(self) -> Bson {
        match self {
            Direction::Ascending => Bson::Int32(1),
            Direction::Descending => Bson::Int32(-1),
        }
    }
}

/// Ordered sort keys; earlier keys take precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sort {
    keys: Vec<(String, Direction)>,
}

impl Sort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by(field: impl Into<String>, direction: Direction) -> Self {
        Self::new().then(field, direction)
    }

    pub fn ascending(self, field: impl Into<String>) -> Self {
        self.then(field, Direction::Ascending)
    }

    pub fn descending(self, field: impl Into<String>) -> Self {
        self.then(field, Direction::Descending)
    }

    pub fn then(mut self, field: impl Into<String>, direction: Direction) -> Self {
        let field = field.into();
        self.keys.retain(|(f, _)| *f != field);
        self.keys.push((field, direction));
        self
    }

    pub fn keys(&self) -> &[(String, Direction)] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn to_document(&self) -> Document {
        let mut d = Document::new();
        for (field, direction) in &self.keys {
            d.insert(field.as_str(), direction.as_bson());
        }
        d
    }
}
