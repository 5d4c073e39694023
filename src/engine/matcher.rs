use std::cmp::Ordering;

use bson::Bson;

use crate::core::document::{is_truthy, values_at_path};
use crate::core::errors::DriverError;
use crate::core::ordering::{bson_eq, compare_bson, type_rank};
use crate::Document;

/// Evaluate a query document against `doc`.
pub(crate) fn matches(doc: &Document, filter: &Document) -> Result<bool, DriverError> {
    for (key, condition) in filter {
        let matched = match key.as_str() {
            "$and" => {
                let clauses = clauses(key, condition)?;
                let mut all = true;
                for clause in clauses {
                    if !matches(doc, clause)? {
                        all = false;
                        break;
                    }
                }
                all
            }
            "$or" => {
                let clauses = clauses(key, condition)?;
                let mut any = false;
                for clause in clauses {
                    if matches(doc, clause)? {
                        any = true;
                        break;
                    }
                }
                any
            }
            op if op.starts_with('$') => {
                return Err(DriverError::InvalidQuery(format!(
                    "unknown top level operator: {op}"
                )))
            }
            path => matches_field(doc, path, condition)?,
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

const FIELD_OPERATORS: &[&str] = &["$eq", "$ne", "$gt", "$gte", "$lt", "$lte", "$in", "$exists"];

/// Validate a query document without evaluating it, so malformed filters fail
/// even when the collection is empty.
pub(crate) fn check_filter(filter: &Document) -> Result<(), DriverError> {
    for (key, condition) in filter {
        match key.as_str() {
            "$and" | "$or" => {
                for clause in clauses(key, condition)? {
                    check_filter(clause)?;
                }
            }
            op if op.starts_with('$') => {
                return Err(DriverError::InvalidQuery(format!(
                    "unknown top level operator: {op}"
                )))
            }
            _ => {
                let Bson::Document(operators) = condition else {
                    continue;
                };
                if !operators.keys().next().is_some_and(|k| k.starts_with('$')) {
                    continue;
                }
                for (op, operand) in operators {
                    if !FIELD_OPERATORS.contains(&op.as_str()) {
                        return Err(DriverError::InvalidQuery(format!(
                            "unknown operator: {op}"
                        )));
                    }
                    if op == "$in" && !matches!(operand, Bson::Array(_)) {
                        return Err(DriverError::InvalidQuery("$in needs an array".into()));
                    }
                }
            }
        }
    }
    Ok(())
}

fn clauses<'a>(op: &str, condition: &'a Bson) -> Result<Vec<&'a Document>, DriverError> {
    let invalid = || DriverError::InvalidQuery(format!("{op} must be a nonempty array of documents"));
    let Bson::Array(items) = condition else {
        return Err(invalid());
    };
    if items.is_empty() {
        return Err(invalid());
    }
    items
        .iter()
        .map(|item| match item {
            Bson::Document(d) => Ok(d),
            _ => Err(invalid()),
        })
        .collect()
}

fn matches_field(doc: &Document, path: &str, condition: &Bson) -> Result<bool, DriverError> {
    let values = values_at_path(doc, path);

    let operators = match condition {
        Bson::Document(d) if d.keys().next().is_some_and(|k| k.starts_with('$')) => d,
        _ => return Ok(field_equals(&values, condition)),
    };

    for (op, operand) in operators {
        let matched = match op.as_str() {
            "$eq" => field_equals(&values, operand),
            "$ne" => !field_equals(&values, operand),
            "$gt" => field_compares(&values, operand, |o| o == Ordering::Greater),
            "$gte" => field_compares(&values, operand, |o| o != Ordering::Less),
            "$lt" => field_compares(&values, operand, |o| o == Ordering::Less),
            "$lte" => field_compares(&values, operand, |o| o != Ordering::Greater),
            "$in" => {
                let Bson::Array(candidates) = operand else {
                    return Err(DriverError::InvalidQuery("$in needs an array".into()));
                };
                candidates.iter().any(|c| field_equals(&values, c))
            }
            "$exists" => values.is_empty() != is_truthy(operand),
            other => {
                return Err(DriverError::InvalidQuery(format!(
                    "unknown operator: {other}"
                )))
            }
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

/// A missing field equals `null`; an array field equals a value if the array
/// itself or any of its elements does.
fn field_equals(values: &[&Bson], expected: &Bson) -> bool {
    if values.is_empty() {
        return matches!(expected, Bson::Null);
    }
    values.iter().any(|value| {
        if bson_eq(value, expected) {
            return true;
        }
        match value {
            Bson::Array(items) => items.iter().any(|item| bson_eq(item, expected)),
            _ => false,
        }
    })
}

/// Range operators only compare values of the same type class.
fn field_compares(values: &[&Bson], operand: &Bson, accept: impl Fn(Ordering) -> bool) -> bool {
    let check = |value: &Bson| {
        type_rank(value) == type_rank(operand) && accept(compare_bson(value, operand))
    };
    values.iter().any(|value| {
        if check(value) {
            return true;
        }
        match value {
            Bson::Array(items) => items.iter().any(|item| check(item)),
            _ => false,
        }
    })
}
