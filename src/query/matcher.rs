use std::cmp::Ordering;
use std::collections::BTreeMap;
use crate::core::types::Document;
use crate::core::value::Value;
use crate::query::ast::{Condition, ElemMatch, FieldQuery, Query};

/// Evaluates parsed queries against documents
pub struct DocumentMatcher;

impl DocumentMatcher {
    pub fn matches(doc: &Document, query: &Query) -> bool {
        Self::matches_fields(&doc.fields, query)
    }

    pub fn matches_fields(fields: &BTreeMap<String, Value>, query: &Query) -> bool {
        match query {
            Query::MatchAll => true,
            Query::And(clauses) => clauses.iter().all(|q| Self::matches_fields(fields, q)),
            Query::Or(clauses) => clauses.iter().any(|q| Self::matches_fields(fields, q)),
            Query::Nor(clauses) => !clauses.iter().any(|q| Self::matches_fields(fields, q)),
            Query::Field(field) => Self::matches_field(fields, field),
        }
    }

    fn matches_field(fields: &BTreeMap<String, Value>, field: &FieldQuery) -> bool {
        let resolved = field.path.resolve(fields);
        field.conditions.iter().all(|c| evaluate(c, &resolved))
    }
}

impl Query {
    pub fn matches(&self, doc: &Document) -> bool {
        DocumentMatcher::matches(doc, self)
    }
}

/// Values a scalar operator looks at: each resolved value, plus the elements
/// of resolved arrays
fn candidates<'a>(resolved: &[&'a Value]) -> Vec<&'a Value> {
    let mut out = Vec::with_capacity(resolved.len());
    for value in resolved {
        out.push(*value);
        if let Value::Array(items) = value {
            out.extend(items.iter());
        }
    }
    out
}

fn equals_any(resolved: &[&Value], target: &Value) -> bool {
    // null also matches a missing field
    if matches!(target, Value::Null) && resolved.is_empty() {
        return true;
    }
    candidates(resolved).iter().any(|v| v.loosely_equals(target))
}

fn compares(resolved: &[&Value], target: &Value, accept: fn(Ordering) -> bool) -> bool {
    candidates(resolved)
        .iter()
        .any(|v| v.partial_compare(target).is_some_and(accept))
}

fn evaluate(condition: &Condition, resolved: &[&Value]) -> bool {
    match condition {
        Condition::Eq(target) => equals_any(resolved, target),
        Condition::Ne(target) => !equals_any(resolved, target),
        Condition::Gt(target) => compares(resolved, target, |o| o == Ordering::Greater),
        Condition::Gte(target) => compares(resolved, target, |o| o != Ordering::Less),
        Condition::Lt(target) => compares(resolved, target, |o| o == Ordering::Less),
        Condition::Lte(target) => compares(resolved, target, |o| o != Ordering::Greater),
        Condition::In(targets) => targets.iter().any(|t| equals_any(resolved, t)),
        Condition::Nin(targets) => !targets.iter().any(|t| equals_any(resolved, t)),
        Condition::Exists(expected) => resolved.is_empty() != *expected,
        Condition::Type(names) => candidates(resolved)
            .iter()
            .any(|v| names.iter().any(|n| n.accepts(v))),
        Condition::All(targets) => {
            !targets.is_empty() && targets.iter().all(|t| equals_any(resolved, t))
        }
        Condition::Size(n) => resolved
            .iter()
            .any(|v| matches!(v, Value::Array(items) if items.len() == *n)),
        Condition::ElemMatch(elem) => resolved.iter().any(|v| match v {
            Value::Array(items) => items.iter().any(|item| element_matches(item, elem)),
            _ => false,
        }),
        Condition::Regex(re) => candidates(resolved)
            .iter()
            .any(|v| matches!(v, Value::String(s) if re.regex.is_match(s))),
        Condition::Not(inner) => !inner.iter().all(|c| evaluate(c, resolved)),
    }
}

pub(crate) fn element_matches(item: &Value, elem: &ElemMatch) -> bool {
    match elem {
        ElemMatch::Query(query) => match item {
            Value::Object(fields) => DocumentMatcher::matches_fields(fields, query),
            _ => false,
        },
        ElemMatch::Conditions(conditions) => conditions.iter().all(|c| evaluate(c, &[item])),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parser::QueryParser;
    use serde_json::json;

    fn check(doc: serde_json::Value, filter: serde_json::Value) -> bool {
        let doc = Document::try_from(doc).unwrap();
        QueryParser::parse_json(filter).unwrap().matches(&doc)
    }

    #[test]
    fn implicit_equality_reaches_array_elements() {
        let doc = json!({"tags": ["rust", "db"], "n": 3});
        assert!(check(doc.clone(), json!({"tags": "db"})));
        assert!(check(doc.clone(), json!({"tags": ["rust", "db"]})));
        assert!(!check(doc.clone(), json!({"tags": ["db", "rust"]})));
        assert!(check(doc, json!({"n": 3.0})));
    }

    #[test]
    fn comparisons_stay_within_type_class() {
        let doc = json!({"age": 30, "name": "ada"});
        assert!(check(doc.clone(), json!({"age": {"$gte": 18, "$lt": 65}})));
        assert!(!check(doc.clone(), json!({"age": {"$gt": "10"}})));
        assert!(!check(doc.clone(), json!({"name": {"$lt": 5}})));
        assert!(check(doc, json!({"name": {"$gt": "a"}})));
    }

    #[test]
    fn negations_include_missing_fields() {
        let doc = json!({"a": 1});
        assert!(check(doc.clone(), json!({"b": {"$ne": 5}})));
        assert!(check(doc.clone(), json!({"b": {"$nin": [1, 2]}})));
        assert!(check(doc.clone(), json!({"b": null})));
        assert!(!check(doc.clone(), json!({"a": {"$not": {"$gte": 1}}})));
        assert!(check(doc, json!({"$nor": [{"a": 2}, {"b": 1}]})));
    }

    #[test]
    fn exists_and_type() {
        let doc = json!({"a": null, "b": [1, "x"], "c": 2.5});
        assert!(check(doc.clone(), json!({"a": {"$exists": true}})));
        assert!(check(doc.clone(), json!({"z": {"$exists": false}})));
        assert!(check(doc.clone(), json!({"a": {"$type": "null"}})));
        assert!(check(doc.clone(), json!({"b": {"$type": "array"}})));
        assert!(check(doc.clone(), json!({"c": {"$type": "number"}})));
        assert!(!check(doc, json!({"c": {"$type": "int"}})));
    }

    #[test]
    fn array_operators() {
        let doc = json!({"tags": ["a", "b", "c"], "scores": [70, 82, 91],
                         "items": [{"sku": "x", "qty": 1}, {"sku": "y", "qty": 5}]});
        assert!(check(doc.clone(), json!({"tags": {"$all": ["c", "a"]}})));
        assert!(!check(doc.clone(), json!({"tags": {"$all": ["a", "z"]}})));
        assert!(check(doc.clone(), json!({"tags": {"$size": 3}})));
        assert!(check(doc.clone(), json!({"scores": {"$elemMatch": {"$gte": 80, "$lt": 85}}})));
        assert!(!check(doc.clone(), json!({"scores": {"$elemMatch": {"$gte": 92}}})));
        assert!(check(doc.clone(), json!({"items": {"$elemMatch": {"sku": "y", "qty": {"$gt": 2}}}})));
        assert!(!check(doc.clone(), json!({"items": {"$elemMatch": {"sku": "x", "qty": {"$gt": 2}}}})));
        assert!(check(doc, json!({"items.sku": "y"})));
    }

    #[test]
    fn logical_composition_and_regex() {
        let doc = json!({"name": "Grace Hopper", "rank": 4});
        assert!(check(doc.clone(), json!({"$or": [{"rank": 1}, {"name": {"$regex": "hop", "$options": "i"}}]})));
        assert!(!check(doc.clone(), json!({"$and": [{"rank": 4}, {"name": {"$regex": "^hop"}}]})));
        assert!(check(doc, json!({"name": {"$in": ["Ada", "Grace Hopper"]}})));
    }
}
