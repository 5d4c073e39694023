use bson::{doc, Bson};

use crate::Document;

/// A predicate over document fields.
///
/// Filters are built from the constructors below and combined with
/// [`Filter::and`] / [`Filter::or`]. [`Filter::raw`] passes a hand-written query
/// document through untouched.
///
/// ```
/// use docstore::Filter;
///
/// let adults_named_bob = Filter::eq("name", "bob").and(Filter::gte("age", 18));
/// assert_eq!(
///     adults_named_bob.to_document(),
///     docstore::doc! {"$and": [{"name": "bob"}, {"age": {"$gte": 18}}]}
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Filter {
    /// Matches every document.
    #[default]
    All,
    Eq { field: String, value: Bson },
    Ne { field: String, value: Bson },
    Gt { field: String, value: Bson },
    Gte { field: String, value: Bson },
    Lt { field: String, value: Bson },
    Lte { field: String, value: Bson },
    In { field: String, values: Vec<Bson> },
    Exists { field: String, exists: bool },
    And(Vec<Filter>),
    /// An empty disjunction matches nothing.
    Or(Vec<Filter>),
    Raw(Document),
}

impl Filter {
    pub fn all() -> Self {
        Filter::All
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Filter::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Filter::Ne {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Filter::Gt {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Filter::Gte {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Filter::Lt {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Bson>) -> Self {
        Filter::Lte {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn is_in<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Bson>,
    {
        Filter::In {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn exists(field: impl Into<String>) -> Self {
        Filter::Exists {
            field: field.into(),
            exists: true,
        }
    }

    pub fn not_exists(field: impl Into<String>) -> Self {
        Filter::Exists {
            field: field.into(),
            exists: false,
        }
    }

    pub fn raw(document: Document) -> Self {
        Filter::Raw(document)
    }

    /// Conjunction of `self` and `other`, flattening nested conjunctions.
    pub fn and(self, other: Filter) -> Self {
        match (self, other) {
            (Filter::All, other) => other,
            (this, Filter::All) => this,
            (Filter::And(mut left), Filter::And(right)) => {
                left.extend(right);
                Filter::And(left)
            }
            (Filter::And(mut left), other) => {
                left.push(other);
                Filter::And(left)
            }
            (this, other) => Filter::And(vec![this, other]),
        }
    }

    /// Disjunction of `self` and `other`, flattening nested disjunctions.
    pub fn or(self, other: Filter) -> Self {
        match (self, other) {
            (Filter::Or(mut left), Filter::Or(right)) => {
                left.extend(right);
                Filter::Or(left)
            }
            (Filter::Or(mut left), other) => {
                left.push(other);
                Filter::Or(left)
            }
            (this, other) => Filter::Or(vec![this, other]),
        }
    }

    /// Render as a driver query document.
    pub fn to_document(&self) -> Document {
        match self {
            Filter::All => Document::new(),
            Filter::Eq { field, value } => match value {
                // A sub-document value could be read as an operator document.
                Bson::Document(_) => field_op(field, "$eq", value.clone()),
                _ => {
                    let mut d = Document::new();
                    d.insert(field.as_str(), value.clone());
                    d
                }
            },
            Filter::Ne { field, value } => field_op(field, "$ne", value.clone()),
            Filter::Gt { field, value } => field_op(field, "$gt", value.clone()),
            Filter::Gte { field, value } => field_op(field, "$gte", value.clone()),
            Filter::Lt { field, value } => field_op(field, "$lt", value.clone()),
            Filter::Lte { field, value } => field_op(field, "$lte", value.clone()),
            Filter::In { field, values } => field_op(field, "$in", Bson::Array(values.clone())),
            Filter::Exists { field, exists } => field_op(field, "$exists", Bson::Boolean(*exists)),
            Filter::And(filters) => {
                if filters.is_empty() {
                    return Document::new();
                }
                doc! { "$and": render_all(filters) }
            }
            Filter::Or(filters) => {
                if filters.is_empty() {
                    return doc! { "_id": { "$in": [] } };
                }
                doc! { "$or": render_all(filters) }
            }
            Filter::Raw(document) => document.clone(),
        }
    }
}

impl From<Document> for Filter {
    fn from(document: Document) -> Self {
        Filter::Raw(document)
    }
}

fn field_op(field: &str, op: &str, value: Bson) -> Document {
    let mut condition = Document::new();
    condition.insert(op, value);
    let mut d = Document::new();
    d.insert(field, condition);
    d
}

fn render_all(filters: &[Filter]) -> Vec<Bson> {
    filters
        .iter()
        .map(|f| Bson::Document(f.to_document()))
        .collect()
}
