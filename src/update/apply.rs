use std::cmp::Ordering;
use std::collections::BTreeMap;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::path::FieldPath;
use crate::core::types::{Document, DocumentId, ID_FIELD};
use crate::core::value::Value;
use crate::query::matcher::element_matches;
use crate::update::expression::{PopEnd, PullFilter, UpdateExpression, UpdateOperation};

/// Applies update expressions. Pure: the input document is never modified.
pub struct UpdateEngine;

impl UpdateEngine {
    pub fn apply(original: &Document, update: &UpdateExpression) -> Result<Document> {
        match update {
            UpdateExpression::Replace(replacement) => Self::replace(original, replacement),
            UpdateExpression::Operators(operations) => {
                let mut root = Value::Object(original.fields.clone());
                for operation in operations {
                    apply_operation(&mut root, operation)?;
                }
                match root {
                    Value::Object(fields) => Ok(Document::from(fields)),
                    _ => Err(Error::corrupt("update replaced the document root")),
                }
            }
        }
    }

    /// New content with the original `_id`; a different `_id` is rejected
    pub fn replace(original: &Document, replacement: &Document) -> Result<Document> {
        let mut doc = replacement.clone();
        if let Some(id) = original.id() {
            if let Some(given) = replacement.get_field(ID_FIELD) {
                let given = DocumentId::from_value(given).map_err(|e| Error::invalid_query(e.context))?;
                if given != id {
                    return Err(Error::invalid_query(format!(
                        "replacement changes {} from {} to {}",
                        ID_FIELD, id, given
                    )));
                }
            }
            doc.set_id(&id);
        }
        Ok(doc)
    }
}

impl UpdateExpression {
    pub fn apply(&self, doc: &Document) -> Result<Document> {
        UpdateEngine::apply(doc, self)
    }
}

fn apply_operation(root: &mut Value, operation: &UpdateOperation) -> Result<()> {
    match operation {
        UpdateOperation::Set(path, value) => assign(root, path.segments(), value.clone(), path),
        UpdateOperation::Unset(path) => {
            remove(root, path.segments());
            Ok(())
        }
        UpdateOperation::Inc(path, operand) => {
            let next = match lookup(root, path.segments()) {
                None => operand.clone(),
                Some(current) => arithmetic("$inc", current, operand, path, i64::checked_add, |a, b| a + b)?,
            };
            assign(root, path.segments(), next, path)
        }
        UpdateOperation::Mul(path, operand) => {
            let next = match lookup(root, path.segments()) {
                None if matches!(operand, Value::Int(_)) => Value::Int(0),
                None => Value::Float(0.0),
                Some(current) => arithmetic("$mul", current, operand, path, i64::checked_mul, |a, b| a * b)?,
            };
            assign(root, path.segments(), next, path)
        }
        UpdateOperation::Min(path, operand) => keep_extreme(root, path, operand, Ordering::Less),
        UpdateOperation::Max(path, operand) => keep_extreme(root, path, operand, Ordering::Greater),
        UpdateOperation::Rename(source, target) => {
            if let Some(value) = remove(root, source.segments()) {
                assign(root, target.segments(), value, target)?;
            }
            Ok(())
        }
        UpdateOperation::Push(path, items) => {
            let mut array = existing_array("$push", root, path)?.unwrap_or_default();
            array.extend(items.iter().cloned());
            assign(root, path.segments(), Value::Array(array), path)
        }
        UpdateOperation::AddToSet(path, items) => {
            let mut array = existing_array("$addToSet", root, path)?.unwrap_or_default();
            for item in items {
                if !array.iter().any(|existing| existing.loosely_equals(item)) {
                    array.push(item.clone());
                }
            }
            assign(root, path.segments(), Value::Array(array), path)
        }
        UpdateOperation::Pull(path, filter) => {
            let Some(mut array) = existing_array("$pull", root, path)? else {
                return Ok(());
            };
            array.retain(|item| match filter {
                PullFilter::Equals(target) => !item.loosely_equals(target),
                PullFilter::Matches(elem) => !element_matches(item, elem),
            });
            assign(root, path.segments(), Value::Array(array), path)
        }
        UpdateOperation::Pop(path, end) => {
            let Some(mut array) = existing_array("$pop", root, path)? else {
                return Ok(());
            };
            if array.is_empty() {
                return Ok(());
            }
            match end {
                PopEnd::First => {
                    array.remove(0);
                }
                PopEnd::Last => {
                    array.pop();
                }
            }
            assign(root, path.segments(), Value::Array(array), path)
        }
    }
}

fn arithmetic(
    op: &str,
    current: &Value,
    operand: &Value,
    path: &FieldPath,
    ints: fn(i64, i64) -> Option<i64>,
    floats: fn(f64, f64) -> f64,
) -> Result<Value> {
    match (current, operand) {
        (Value::Int(a), Value::Int(b)) => ints(*a, *b).map(Value::Int).ok_or_else(|| {
            Error::invalid_query(format!("{} overflows the integer at '{}'", op, path))
        }),
        (a, b) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => Ok(Value::Float(floats(a, b))),
            _ => Err(Error::invalid_query(format!(
                "{} cannot apply to {} value at '{}'",
                op,
                current.value_type().name(),
                path
            ))),
        },
    }
}

fn keep_extreme(root: &mut Value, path: &FieldPath, operand: &Value, wanted: Ordering) -> Result<()> {
    let replace = match lookup(root, path.segments()) {
        None => true,
        Some(current) => operand.canonical_cmp(current) == wanted,
    };
    if replace {
        assign(root, path.segments(), operand.clone(), path)?;
    }
    Ok(())
}

/// The array at `path`, `None` when absent; any other type is an error
fn existing_array(op: &str, root: &Value, path: &FieldPath) -> Result<Option<Vec<Value>>> {
    match lookup(root, path.segments()) {
        None => Ok(None),
        Some(Value::Array(items)) => Ok(Some(items.clone())),
        Some(other) => Err(Error::new(
            ErrorKind::InvalidQuery,
            format!("{} expects an array at '{}', found {}", op, path, other.value_type().name()),
        )),
    }
}

/// Exact path lookup without array broadcast
fn lookup<'a>(value: &'a Value, segments: &[String]) -> Option<&'a Value> {
    let Some((head, tail)) = segments.split_first() else {
        return Some(value);
    };
    let next = match value {
        Value::Object(map) => map.get(head)?,
        Value::Array(items) => items.get(head.parse::<usize>().ok()?)?,
        _ => return None,
    };
    lookup(next, tail)
}

/// Largest number of nulls a positional write may pad an array with
const MAX_ARRAY_PADDING: usize = 1500;

/// Writes `new` at the path, creating intermediate objects; numeric segments
/// index arrays, padding with nulls
fn assign(value: &mut Value, segments: &[String], new: Value, path: &FieldPath) -> Result<()> {
    let Some((head, tail)) = segments.split_first() else {
        *value = new;
        return Ok(());
    };
    match value {
        Value::Object(map) => {
            let slot = map
                .entry(head.clone())
                .or_insert_with(|| Value::Object(BTreeMap::new()));
            assign(slot, tail, new, path)
        }
        Value::Array(items) => {
            let position = head.parse::<usize>().map_err(|_| {
                Error::invalid_query(format!("cannot address array with '{}' in '{}'", head, path))
            })?;
            if position >= items.len() {
                if position - items.len() > MAX_ARRAY_PADDING {
                    return Err(Error::invalid_query(format!(
                        "position {} in '{}' is more than {} past the end of the array",
                        position, path, MAX_ARRAY_PADDING
                    )));
                }
                items.resize(position + 1, Value::Null);
                if !tail.is_empty() {
                    items[position] = Value::Object(BTreeMap::new());
                }
            }
            assign(&mut items[position], tail, new, path)
        }
        other => Err(Error::invalid_query(format!(
            "cannot create '{}' inside {} value at '{}'",
            head,
            other.value_type().name(),
            path
        ))),
    }
}

/// Removes the value at the path; an array position is nulled instead
fn remove(value: &mut Value, segments: &[String]) -> Option<Value> {
    let (head, tail) = segments.split_first()?;
    match value {
        Value::Object(map) if tail.is_empty() => map.remove(head),
        Value::Object(map) => remove(map.get_mut(head)?, tail),
        Value::Array(items) => {
            let slot = items.get_mut(head.parse::<usize>().ok()?)?;
            if tail.is_empty() {
                Some(std::mem::replace(slot, Value::Null))
            } else {
                remove(slot, tail)
            }
        }
        _ => None,
    }
}
