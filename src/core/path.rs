use std::collections::BTreeMap;
use std::fmt;
use serde::{Deserialize, Serialize};
use crate::core::error::{Error, Result};
use crate::core::value::Value;

/// Dot-notation field path (`"author.email"`, `"tags.0"`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    pub fn parse(path: &str) -> Result<Self> {
        if path.is_empty() {
            return Err(Error::invalid_query("empty field path"));
        }
        let segments: Vec<String> = path.split('.').map(String::from).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(Error::invalid_query(format!("malformed field path '{}'", path)));
        }
        Ok(FieldPath { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn first(&self) -> &str {
        &self.segments[0]
    }

    pub fn is_id(&self) -> bool {
        self.segments.len() == 1 && self.segments[0] == crate::core::types::ID_FIELD
    }

    /// Every value the path reaches. Segments broadcast over array elements;
    /// a numeric segment also addresses the array position.
    pub fn resolve<'a>(&self, fields: &'a BTreeMap<String, Value>) -> Vec<&'a Value> {
        let mut out = Vec::new();
        if let Some(root) = fields.get(&self.segments[0]) {
            collect(root, &self.segments[1..], &mut out);
        }
        out
    }

    pub fn exists_in(&self, fields: &BTreeMap<String, Value>) -> bool {
        !self.resolve(fields).is_empty()
    }
}

fn collect<'a>(current: &'a Value, rest: &[String], out: &mut Vec<&'a Value>) {
    let Some((segment, tail)) = rest.split_first() else {
        out.push(current);
        return;
    };

    match current {
        Value::Object(map) => {
            if let Some(next) = map.get(segment) {
                collect(next, tail, out);
            }
        }
        Value::Array(items) => {
            if let Ok(position) = segment.parse::<usize>() {
                if let Some(item) = items.get(position) {
                    collect(item, tail, out);
                }
            }
            for item in items {
                if let Value::Object(_) = item {
                    collect(item, rest, out);
                }
            }
        }
        _ => {}
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use crate::core::types::Document;

    fn doc(json: serde_json::Value) -> Document {
        Document::try_from(json).unwrap()
    }

    #[test]
    fn resolves_nested_objects() {
        let d = doc(json!({"author": {"email": "a@x.com"}}));
        let path = FieldPath::parse("author.email").unwrap();
        assert_eq!(path.resolve(&d.fields), vec![&Value::from("a@x.com")]);
    }

    #[test]
    fn broadcasts_over_arrays_of_objects() {
        let d = doc(json!({"items": [{"sku": "a"}, {"sku": "b"}, {"other": 1}]}));
        let path = FieldPath::parse("items.sku").unwrap();
        let found = path.resolve(&d.fields);
        assert_eq!(found, vec![&Value::from("a"), &Value::from("b")]);
    }

    #[test]
    fn numeric_segment_indexes_arrays() {
        let d = doc(json!({"tags": ["x", "y"]}));
        let path = FieldPath::parse("tags.1").unwrap();
        assert_eq!(path.resolve(&d.fields), vec![&Value::from("y")]);
    }

    #[test]
    fn missing_paths_resolve_to_nothing() {
        let d = doc(json!({"a": 5}));
        assert!(!FieldPath::parse("a.b").unwrap().exists_in(&d.fields));
        assert!(FieldPath::parse("a..b").is_err());
    }
}
