use bson::Bson;

use crate::core::document::{is_truthy, ID_FIELD};
use crate::core::errors::DriverError;
use crate::Document;

/// Parsed projection document.
#[derive(Debug)]
pub(crate) enum ProjectionPlan {
    Include { paths: Vec<String>, with_id: bool },
    Exclude { paths: Vec<String> },
}

impl ProjectionPlan {
    pub(crate) fn parse(projection: &Document) -> Result<Self, DriverError> {
        let mut with_id = true;
        let mut includes = Vec::new();
        let mut excludes = Vec::new();

        for (field, flag) in projection {
            if !matches!(
                flag,
                Bson::Boolean(_) | Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_)
            ) {
                return Err(DriverError::InvalidQuery(format!(
                    "unsupported projection value for '{field}': {flag}"
                )));
            }
            let include = is_truthy(flag);
            if field == ID_FIELD {
                with_id = include;
            } else if include {
                includes.push(field.clone());
            } else {
                excludes.push(field.clone());
            }
        }

        let first_excluded = excludes.first().cloned();
        match (includes.is_empty(), first_excluded) {
            (false, Some(excluded)) => Err(DriverError::InvalidQuery(format!(
                "cannot do exclusion on field {excluded} in inclusion projection"
            ))),
            (false, None) => Ok(ProjectionPlan::Include {
                paths: includes,
                with_id,
            }),
            (true, _) => {
                if !with_id {
                    excludes.push(ID_FIELD.to_string());
                }
                // `{_id: 1}` alone keeps only the id.
                if excludes.is_empty() && projection.contains_key(ID_FIELD) {
                    return Ok(ProjectionPlan::Include {
                        paths: Vec::new(),
                        with_id: true,
                    });
                }
                Ok(ProjectionPlan::Exclude { paths: excludes })
            }
        }
    }

    pub(crate) fn apply(&self, doc: &Document) -> Document {
        match self {
            ProjectionPlan::Include { paths, with_id } => {
                let mut paths: Vec<&str> = paths.iter().map(String::as_str).collect();
                if *with_id {
                    paths.push(ID_FIELD);
                }
                include_paths(doc, &paths)
            }
            ProjectionPlan::Exclude { paths } => {
                let mut projected = doc.clone();
                for path in paths {
                    exclude_path(&mut projected, path);
                }
                projected
            }
        }
    }
}

/// Keep only the listed paths, in the order the fields appear in `doc`.
fn include_paths(doc: &Document, paths: &[&str]) -> Document {
    let mut projected = Document::new();
    for (key, value) in doc {
        if paths.iter().any(|p| *p == key.as_str()) {
            projected.insert(key.clone(), value.clone());
            continue;
        }

        let prefix = format!("{key}.");
        let nested: Vec<&str> = paths
            .iter()
            .filter_map(|p| p.strip_prefix(prefix.as_str()))
            .collect();
        if nested.is_empty() {
            continue;
        }

        match value {
            Bson::Document(sub) => {
                projected.insert(key.clone(), include_paths(sub, &nested));
            }
            Bson::Array(items) => {
                let kept: Vec<Bson> = items
                    .iter()
                    .filter_map(|item| match item {
                        Bson::Document(sub) => Some(Bson::Document(include_paths(sub, &nested))),
                        _ => None,
                    })
                    .collect();
                projected.insert(key.clone(), kept);
            }
            _ => {}
        }
    }
    projected
}

/// Drop a dotted path, descending into every sub-document of an array the
/// way inclusion does.
fn exclude_path(doc: &mut Document, path: &str) {
    let Some((head, tail)) = path.split_once('.') else {
        doc.remove(path);
        return;
    };
    match doc.get_mut(head) {
        Some(Bson::Document(sub)) => exclude_path(sub, tail),
        Some(Bson::Array(items)) => {
            for item in items.iter_mut() {
                if let Bson::Document(sub) = item {
                    exclude_path(sub, tail);
                }
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn project(doc: &Document, projection: Document) -> Document {
        ProjectionPlan::parse(&projection).unwrap().apply(doc)
    }

    #[test]
    fn inclusion_keeps_listed_fields_and_id() {
        let doc = doc! {"_id": 1, "name": "a", "age": 3, "city": "x"};
        assert_eq!(
            project(&doc, doc! {"city": 1, "name": 1}),
            doc! {"_id": 1, "name": "a", "city": "x"}
        );
    }

    #[test]
    fn inclusion_can_drop_id() {
        let doc = doc! {"_id": 1, "name": "a", "age": 3};
        assert_eq!(project(&doc, doc! {"name": true, "_id": 0}), doc! {"name": "a"});
    }

    #[test]
    fn exclusion_removes_fields() {
        let doc = doc! {"_id": 1, "name": "a", "secret": "s"};
        assert_eq!(project(&doc, doc! {"secret": 0}), doc! {"_id": 1, "name": "a"});
        assert_eq!(
            project(&doc, doc! {"_id": 0}),
            doc! {"name": "a", "secret": "s"}
        );
    }

    #[test]
    fn id_only_inclusion() {
        let doc = doc! {"_id": 1, "name": "a"};
        assert_eq!(project(&doc, doc! {"_id": 1}), doc! {"_id": 1});
    }

    #[test]
    fn nested_paths() {
        let doc = doc! {
            "_id": 1,
            "address": {"city": "Oslo", "zip": "0150"},
            "items": [{"sku": "a", "qty": 1}, {"sku": "b", "qty": 2}, 7],
        };
        assert_eq!(
            project(&doc, doc! {"address.city": 1, "items.sku": 1, "_id": 0}),
            doc! {"address": {"city": "Oslo"}, "items": [{"sku": "a"}, {"sku": "b"}]}
        );
        assert_eq!(
            project(&doc, doc! {"address.zip": 0, "items": 0}),
            doc! {"_id": 1, "address": {"city": "Oslo"}}
        );
    }

    #[test]
    fn exclusion_reaches_into_arrays() {
        let doc = doc! {
            "_id": 1,
            "items": [{"sku": "a", "qty": 1}, {"sku": "b", "qty": 2}, 7],
            "meta": {"tags": [{"k": "x", "v": 1}]},
        };
        assert_eq!(
            project(&doc, doc! {"items.qty": 0, "meta.tags.v": 0}),
            doc! {
                "_id": 1,
                "items": [{"sku": "a"}, {"sku": "b"}, 7],
                "meta": {"tags": [{"k": "x"}]},
            }
        );
    }

    #[test]
    fn mixing_modes_is_rejected() {
        let err = ProjectionPlan::parse(&doc! {"a": 1, "b": 0}).unwrap_err();
        assert!(matches!(err, DriverError::InvalidQuery(_)));
        assert!(ProjectionPlan::parse(&doc! {"a": {"$slice": 1}}).is_err());
    }
}
