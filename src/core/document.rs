use bson::oid::ObjectId;
use bson::Bson;

use crate::Document;

pub(crate) const ID_FIELD: &str = "_id";

/// Give the document an `_id` if it lacks one. A generated id is placed first,
/// the way the server stores it.
pub(crate) fn normalize_document(doc: Document) -> Document {
    if doc.contains_key(ID_FIELD) {
        return doc;
    }

    let mut normalized = Document::new();
    normalized.insert(ID_FIELD, Bson::ObjectId(ObjectId::new()));
    for (key, value) in doc {
        normalized.insert(key, value);
    }
    normalized
}

/// Every value reachable at a dotted path. Arrays of sub-documents are walked
/// element by element, so `items.sku` yields one value per item, and a numeric
/// segment also selects that array position (`items.0.sku`).
pub(crate) fn values_at_path<'a>(doc: &'a Document, path: &str) -> Vec<&'a Bson> {
    let parts: Vec<&str> = path.split('.').collect();
    let mut out = Vec::new();
    if let Some(first) = doc.get(parts[0]) {
        collect_path(first, &parts[1..], &mut out);
    }
    out
}

fn collect_path<'a>(value: &'a Bson, rest: &[&str], out: &mut Vec<&'a Bson>) {
    let Some((head, tail)) = rest.split_first() else {
        out.push(value);
        return;
    };
    match value {
        Bson::Document(sub) => {
            if let Some(next) = sub.get(*head) {
                collect_path(next, tail, out);
            }
        }
        Bson::Array(items) => {
            if let Some(item) = head.parse::<usize>().ok().and_then(|i| items.get(i)) {
                collect_path(item, tail, out);
            }
            for item in items {
                if let Bson::Document(_) = item {
                    collect_path(item, rest, out);
                }
            }
        }
        _ => {}
    }
}

/// The single value at a dotted path. Arrays are only entered through a
/// numeric position.
pub(crate) fn lookup_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut parts = path.split('.');
    let mut current = doc.get(parts.next()?)?;
    for part in parts {
        current = match current {
            Bson::Document(sub) => sub.get(part)?,
            Bson::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Set `value` at a dotted path, creating intermediate documents. A numeric
/// segment under an array addresses that position; positions past the end are
/// padded with nulls.
pub(crate) fn set_path(doc: &mut Document, path: &str, value: Bson) -> Result<(), String> {
    match path.split_once('.') {
        None => {
            doc.insert(path, value);
            Ok(())
        }
        Some((head, tail)) => {
            if !doc.contains_key(head) {
                doc.insert(head, Document::new());
            }
            match doc.get_mut(head) {
                Some(target) => set_in(target, head, tail, value),
                None => Err(format!("cannot traverse '{head}'")),
            }
        }
    }
}

fn set_in(target: &mut Bson, parent: &str, path: &str, value: Bson) -> Result<(), String> {
    match target {
        Bson::Document(sub) => set_path(sub, path, value),
        Bson::Array(items) => {
            let (head, tail) = match path.split_once('.') {
                Some((head, tail)) => (head, Some(tail)),
                None => (path, None),
            };
            let index: usize = head
                .parse()
                .map_err(|_| format!("cannot create field '{head}' in array '{parent}'"))?;
            let grew = items.len() <= index;
            if grew {
                items.resize(index + 1, Bson::Null);
            }
            match tail {
                None => {
                    items[index] = value;
                    Ok(())
                }
                Some(rest) => {
                    if grew {
                        items[index] = Bson::Document(Document::new());
                    }
                    set_in(&mut items[index], head, rest, value)
                }
            }
        }
        other => Err(format!(
            "cannot create field '{path}' in element {{{parent}: {other}}}"
        )),
    }
}

/// Fields only; `$unset` does not address array positions.
pub(crate) fn remove_path(doc: &mut Document, path: &str) -> Option<Bson> {
    match path.split_once('.') {
        None => doc.remove(path),
        Some((head, tail)) => match doc.get_mut(head) {
            Some(Bson::Document(sub)) => remove_path(sub, tail),
            _ => None,
        },
    }
}

pub(crate) fn get_path_mut<'a>(doc: &'a mut Document, path: &str) -> Option<&'a mut Bson> {
    match path.split_once('.') {
        None => doc.get_mut(path),
        Some((head, tail)) => descend_mut(doc.get_mut(head)?, tail),
    }
}

fn descend_mut<'a>(value: &'a mut Bson, path: &str) -> Option<&'a mut Bson> {
    let (head, tail) = match path.split_once('.') {
        Some((head, tail)) => (head, Some(tail)),
        None => (path, None),
    };
    let next = match value {
        Bson::Document(sub) => sub.get_mut(head)?,
        Bson::Array(items) => items.get_mut(head.parse::<usize>().ok()?)?,
        _ => return None,
    };
    match tail {
        Some(rest) => descend_mut(next, rest),
        None => Some(next),
    }
}

/// Server-style truthiness used by `$exists` and projection flags.
pub(crate) fn is_truthy(value: &Bson) -> bool {
    match value {
        Bson::Boolean(b) => *b,
        Bson::Int32(i) => *i != 0,
        Bson::Int64(i) => *i != 0,
        Bson::Double(d) => *d != 0.0,
        Bson::Null | Bson::Undefined => false,
        _ => true,
    }
}
