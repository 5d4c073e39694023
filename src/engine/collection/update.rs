use bson::Bson;

use crate::core::document::{get_path_mut, lookup_path, remove_path, set_path, ID_FIELD};
use crate::core::errors::DriverError;
use crate::core::ordering::{as_f64, bson_eq, is_number};
use crate::Document;

const MODIFIERS: &[&str] = &["$set", "$unset", "$inc", "$push", "$pull"];

/// Reject update documents that could never apply, whether or not anything
/// matches.
pub(crate) fn check_update(update: &Document) -> Result<(), DriverError> {
    if update.is_empty() {
        return Err(invalid("update document must not be empty"));
    }
    for (op, fields) in update {
        if !op.starts_with('$') {
            return Err(invalid(format!(
                "update document requires atomic operators, found '{op}'"
            )));
        }
        if !MODIFIERS.contains(&op.as_str()) {
            return Err(invalid(format!("unknown modifier: {op}")));
        }
        if !matches!(fields, Bson::Document(_)) {
            return Err(invalid(format!(
                "modifier {op} needs a document of fields, found {fields}"
            )));
        }
    }
    Ok(())
}

/// Apply MongoDB-style update operators to a copy of `doc`.
pub(crate) fn apply_update(doc: &Document, update: &Document) -> Result<Document, DriverError> {
    check_update(update)?;

    let mut new_doc = doc.clone();

    for (op, fields) in update {
        let Bson::Document(fields) = fields else {
            return Err(invalid(format!(
                "modifier {op} needs a document of fields, found {fields}"
            )));
        };

        match op.as_str() {
            "$set" => {
                for (k, v) in fields {
                    set_path(&mut new_doc, k, v.clone()).map_err(invalid)?;
                }
            }
            "$unset" => {
                for k in fields.keys() {
                    remove_path(&mut new_doc, k);
                }
            }
            "$inc" => {
                for (k, v) in fields {
                    let sum = add_numbers(lookup_path(&new_doc, k), v).map_err(invalid)?;
                    set_path(&mut new_doc, k, sum).map_err(invalid)?;
                }
            }
            "$push" => {
                for (k, v) in fields {
                    match get_path_mut(&mut new_doc, k) {
                        Some(Bson::Array(items)) => items.push(v.clone()),
                        Some(other) => {
                            return Err(invalid(format!(
                                "the field '{k}' must be an array but is {other}"
                            )))
                        }
                        None => set_path(&mut new_doc, k, Bson::Array(vec![v.clone()]))
                            .map_err(invalid)?,
                    }
                }
            }
            "$pull" => {
                for (k, v) in fields {
                    if let Some(Bson::Array(items)) = get_path_mut(&mut new_doc, k) {
                        items.retain(|item| !bson_eq(item, v));
                    }
                }
            }
            other => return Err(invalid(format!("unknown modifier: {other}"))),
        }
    }

    let before = doc.get(ID_FIELD);
    let after = new_doc.get(ID_FIELD);
    let id_changed = match (before, after) {
        (Some(a), Some(b)) => !bson_eq(a, b),
        (None, None) => false,
        _ => true,
    };
    if id_changed {
        return Err(invalid(
            "performing an update on the path '_id' would modify the immutable field '_id'",
        ));
    }

    Ok(new_doc)
}

fn invalid(message: impl Into<String>) -> DriverError {
    DriverError::InvalidUpdate(message.into())
}

/// `$inc` arithmetic: int32 widens to int64 on overflow, int64 overflow is an
/// error, any double makes the result a double.
fn add_numbers(current: Option<&Bson>, delta: &Bson) -> Result<Bson, String> {
    if !is_number(delta) {
        return Err(format!("cannot increment with non-numeric argument {delta}"));
    }
    let current = match current {
        None => return Ok(delta.clone()),
        Some(value) if is_number(value) => value,
        Some(value) => {
            return Err(format!(
                "cannot apply $inc to a value of non-numeric type: {value}"
            ))
        }
    };

    match (current, delta) {
        (Bson::Int32(a), Bson::Int32(b)) => Ok(a
            .checked_add(*b)
            .map(Bson::Int32)
            .unwrap_or(Bson::Int64(i64::from(*a) + i64::from(*b)))),
        (Bson::Int32(_) | Bson::Int64(_), Bson::Int32(_) | Bson::Int64(_)) => {
            let a = as_i64(current);
            let b = as_i64(delta);
            a.checked_add(b)
                .map(Bson::Int64)
                .ok_or_else(|| format!("$inc overflowed: {a} + {b}"))
        }
        _ => Ok(Bson::Double(as_f64(current) + as_f64(delta))),
    }
}

fn as_i64(value: &Bson) -> i64 {
    match value {
        Bson::Int32(i) => i64::from(*i),
        Bson::Int64(i) => *i,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn test_apply_update_set() {
        let doc = doc! {"_id": 1, "name": "alice", "age": 30};
        let result = apply_update(&doc, &doc! {"$set": {"age": 31}}).unwrap();
        assert_eq!(result.get_i32("age").unwrap(), 31);
        assert_eq!(result.get_str("name").unwrap(), "alice");
    }

    #[test]
    fn test_apply_update_set_nested() {
        let doc = doc! {"_id": 1};
        let result = apply_update(&doc, &doc! {"$set": {"address.city": "Oslo"}}).unwrap();
        assert_eq!(result, doc! {"_id": 1, "address": {"city": "Oslo"}});
    }

    #[test]
    fn test_apply_update_unset() {
        let doc = doc! {"_id": 1, "name": "alice", "age": 30};
        let result = apply_update(&doc, &doc! {"$unset": {"age": ""}}).unwrap();
        assert!(!result.contains_key("age"));
        assert!(result.contains_key("name"));
    }

    #[test]
    fn test_apply_update_inc() {
        let doc = doc! {"_id": 1, "counter": 10};
        let result = apply_update(&doc, &doc! {"$inc": {"counter": 5, "fresh": 2}}).unwrap();
        assert_eq!(result.get_i32("counter").unwrap(), 15);
        assert_eq!(result.get_i32("fresh").unwrap(), 2);

        let result = apply_update(&doc, &doc! {"$inc": {"counter": 0.5}}).unwrap();
        assert_eq!(result.get_f64("counter").unwrap(), 10.5);
    }

    #[test]
    fn test_apply_update_inc_widens_int32() {
        let doc = doc! {"_id": 1, "counter": i32::MAX};
        let result = apply_update(&doc, &doc! {"$inc": {"counter": 1}}).unwrap();
        assert_eq!(result.get_i64("counter").unwrap(), i64::from(i32::MAX) + 1);
    }

    #[test]
    fn test_apply_update_inc_rejects_non_numeric() {
        let doc = doc! {"_id": 1, "name": "alice"};
        assert!(apply_update(&doc, &doc! {"$inc": {"name": 1}}).is_err());
        assert!(apply_update(&doc, &doc! {"$inc": {"n": "1"}}).is_err());
    }

    #[test]
    fn test_apply_update_push() {
        let doc = doc! {"_id": 1, "tags": ["a", "b"]};
        let result = apply_update(&doc, &doc! {"$push": {"tags": "c", "new": 1}}).unwrap();
        let tags = result.get_array("tags").unwrap();
        assert_eq!(tags.len(), 3);
        assert_eq!(tags[2].as_str().unwrap(), "c");
        assert_eq!(result.get_array("new").unwrap(), &vec![Bson::Int32(1)]);
    }

    #[test]
    fn test_apply_update_push_on_scalar_fails() {
        let doc = doc! {"_id": 1, "tags": "a"};
        assert!(apply_update(&doc, &doc! {"$push": {"tags": "c"}}).is_err());
    }

    #[test]
    fn test_apply_update_pull() {
        let doc = doc! {"_id": 1, "tags": ["a", "b", "c", "b"]};
        let result = apply_update(&doc, &doc! {"$pull": {"tags": "b"}}).unwrap();
        let tags = result.get_array("tags").unwrap();
        assert_eq!(tags.len(), 2);
        assert!(!tags.iter().any(|t| t.as_str() == Some("b")));
    }

    #[test]
    fn test_apply_update_rejects_replacement() {
        let doc = doc! {"_id": 1, "name": "alice", "age": 30};
        let err = apply_update(&doc, &doc! {"name": "bob"}).unwrap_err();
        assert!(matches!(err, DriverError::InvalidUpdate(_)));
        assert!(apply_update(&doc, &doc! {}).is_err());
        assert!(apply_update(&doc, &doc! {"$rename": {"a": "b"}}).is_err());
    }

    #[test]
    fn test_apply_update_keeps_id_immutable() {
        let doc = doc! {"_id": 1, "name": "alice"};
        assert!(apply_update(&doc, &doc! {"$set": {"_id": 2}}).is_err());
        assert!(apply_update(&doc, &doc! {"$unset": {"_id": ""}}).is_err());
        assert!(apply_update(&doc, &doc! {"$set": {"_id": 1}}).is_ok());
        assert!(apply_update(&doc, &doc! {"$set": {"_id": 1.0}}).is_ok());
        assert!(apply_update(&doc, &doc! {"$set": {"_id": 1.5}}).is_err());
    }

    #[test]
    fn test_check_update_rejects_shape_errors() {
        assert!(check_update(&doc! {"$set": {"a": 1}, "$inc": {"n": 2}}).is_ok());
        assert!(check_update(&doc! {"$rename": {"a": "b"}}).is_err());
        assert!(check_update(&doc! {"$set": 5}).is_err());
        assert!(check_update(&doc! {"$set": {"a": 1}, "b": 2}).is_err());
    }
}
