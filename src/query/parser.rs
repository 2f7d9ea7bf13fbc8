use std::collections::BTreeMap;
use regex::RegexBuilder;
use crate::core::error::{Error, Result};
use crate::core::path::FieldPath;
use crate::core::value::Value;
use crate::query::ast::{Condition, ElemMatch, FieldQuery, Query, RegexMatch, TypeName};

/// Parses the operator language (`{"age": {"$gte": 18}}`) into a `Query`
pub struct QueryParser;

impl QueryParser {
    pub fn parse(filter: &Value) -> Result<Query> {
        match filter {
            Value::Object(map) => Self::parse_document(map),
            other => Err(Error::invalid_query(format!(
                "filter must be an object, got {}",
                other.value_type().name()
            ))),
        }
    }

    pub fn parse_json(filter: serde_json::Value) -> Result<Query> {
        Self::parse(&Value::from(filter))
    }

    fn parse_document(map: &BTreeMap<String, Value>) -> Result<Query> {
        let mut clauses = Vec::with_capacity(map.len());
        for (key, value) in map {
            let clause = match key.as_str() {
                "$and" => Query::And(Self::parse_clause_list(key, value)?),
                "$or" => Query::Or(Self::parse_clause_list(key, value)?),
                "$nor" => Query::Nor(Self::parse_clause_list(key, value)?),
                op if op.starts_with('$') => {
                    return Err(Error::invalid_query(format!("unknown top-level operator {}", op)));
                }
                field => Query::Field(FieldQuery {
                    path: FieldPath::parse(field)?,
                    conditions: Self::parse_field_value(value)?,
                }),
            };
            clauses.push(clause);
        }

        Ok(match clauses.len() {
            0 => Query::MatchAll,
            1 => clauses.remove(0),
            _ => Query::And(clauses),
        })
    }

    fn parse_clause_list(op: &str, value: &Value) -> Result<Vec<Query>> {
        let items = value
            .as_array()
            .filter(|items| !items.is_empty())
            .ok_or_else(|| Error::invalid_query(format!("{} expects a non-empty array", op)))?;
        items.iter().map(Self::parse).collect()
    }

    /// Operator object or a literal for implicit equality
    fn parse_field_value(value: &Value) -> Result<Vec<Condition>> {
        match value {
            Value::Object(map) if is_operator_object(map)? => Self::parse_operators(map),
            literal => Ok(vec![Condition::Eq(literal.clone())]),
        }
    }

    fn parse_operators(map: &BTreeMap<String, Value>) -> Result<Vec<Condition>> {
        let mut conditions = Vec::with_capacity(map.len());
        for (op, operand) in map {
            let condition = match op.as_str() {
                "$eq" => Condition::Eq(operand.clone()),
                "$ne" => Condition::Ne(operand.clone()),
                "$gt" => Condition::Gt(operand.clone()),
                "$gte" => Condition::Gte(operand.clone()),
                "$lt" => Condition::Lt(operand.clone()),
                "$lte" => Condition::Lte(operand.clone()),
                "$in" => Condition::In(expect_array(op, operand)?.clone()),
                "$nin" => Condition::Nin(expect_array(op, operand)?.clone()),
                "$all" => Condition::All(expect_array(op, operand)?.clone()),
                "$exists" => Condition::Exists(expect_flag(op, operand)?),
                "$type" => Condition::Type(parse_type_names(operand)?),
                "$size" => Condition::Size(expect_count(op, operand)?),
                "$elemMatch" => Condition::ElemMatch(Self::parse_elem_match(operand)?),
                "$not" => match operand {
                    Value::Object(inner) if is_operator_object(inner)? && !inner.is_empty() => {
                        Condition::Not(Self::parse_operators(inner)?)
                    }
                    _ => return Err(Error::invalid_query("$not expects an operator expression")),
                },
                "$regex" => {
                    let options = match map.get("$options") {
                        Some(Value::String(o)) => o.as_str(),
                        Some(_) => return Err(Error::invalid_query("$options must be a string")),
                        None => "",
                    };
                    Condition::Regex(compile_regex(operand, options)?)
                }
                "$options" => {
                    if !map.contains_key("$regex") {
                        return Err(Error::invalid_query("$options without $regex"));
                    }
                    continue;
                }
                other => return Err(Error::invalid_query(format!("unknown operator {}", other))),
            };
            conditions.push(condition);
        }
        Ok(conditions)
    }

    /// Element filter as used by `$elemMatch` and `$pull`: operator-only
    /// objects apply to the element itself, anything else is a document query
    pub(crate) fn parse_elem_match(operand: &Value) -> Result<ElemMatch> {
        let Value::Object(map) = operand else {
            return Err(Error::invalid_query("$elemMatch expects an object"));
        };
        let operator_only = !map.is_empty()
            && map
                .keys()
                .all(|k| k.starts_with('$') && !matches!(k.as_str(), "$and" | "$or" | "$nor"));
        if operator_only {
            Ok(ElemMatch::Conditions(Self::parse_operators(map)?))
        } else {
            Ok(ElemMatch::Query(Box::new(Self::parse_document(map)?)))
        }
    }
}

/// `{"$gt": 1}` is an operator object, `{"a": 1}` a literal; mixing is an error
fn is_operator_object(map: &BTreeMap<String, Value>) -> Result<bool> {
    let operators = map.keys().filter(|k| k.starts_with('$')).count();
    if operators > 0 && operators < map.len() {
        return Err(Error::invalid_query("cannot mix operators and fields in one expression"));
    }
    Ok(operators > 0)
}

fn expect_array<'a>(op: &str, operand: &'a Value) -> Result<&'a Vec<Value>> {
    operand
        .as_array()
        .ok_or_else(|| Error::invalid_query(format!("{} expects an array", op)))
}

fn expect_flag(op: &str, operand: &Value) -> Result<bool> {
    match operand {
        Value::Bool(b) => Ok(*b),
        Value::Int(i) => Ok(*i != 0),
        Value::Float(f) => Ok(*f != 0.0),
        _ => Err(Error::invalid_query(format!("{} expects a boolean", op))),
    }
}

fn expect_count(op: &str, operand: &Value) -> Result<usize> {
    match operand {
        Value::Int(i) if *i >= 0 => Ok(*i as usize),
        Value::Float(f) if *f >= 0.0 && f.fract() == 0.0 => Ok(*f as usize),
        _ => Err(Error::invalid_query(format!("{} expects a non-negative integer", op))),
    }
}

fn parse_type_names(operand: &Value) -> Result<Vec<TypeName>> {
    let parse_one = |v: &Value| -> Result<TypeName> {
        let name = v
            .as_str()
            .ok_or_else(|| Error::invalid_query("$type expects a type name"))?;
        TypeName::parse(name).ok_or_else(|| Error::invalid_query(format!("unknown type name '{}'", name)))
    };
    match operand {
        Value::Array(names) if !names.is_empty() => names.iter().map(parse_one).collect(),
        Value::Array(_) => Err(Error::invalid_query("$type expects at least one type name")),
        single => Ok(vec![parse_one(single)?]),
    }
}

fn compile_regex(pattern: &Value, options: &str) -> Result<RegexMatch> {
    let source = pattern
        .as_str()
        .ok_or_else(|| Error::invalid_query("$regex expects a string pattern"))?;
    let mut builder = RegexBuilder::new(source);
    for flag in options.chars() {
        match flag {
            'i' => builder.case_insensitive(true),
            'm' => builder.multi_line(true),
            's' => builder.dot_matches_new_line(true),
            'x' => builder.ignore_whitespace(true),
            other => return Err(Error::invalid_query(format!("unsupported regex option '{}'", other))),
        };
    }
    let regex = builder
        .build()
        .map_err(|e| Error::invalid_query(format!("invalid regex /{}/: {}", source, e)))?;
    Ok(RegexMatch {
        pattern: source.to_string(),
        options: options.to_string(),
        regex,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use serde_json::json;

    fn parse(filter: serde_json::Value) -> Result<Query> {
        QueryParser::parse_json(filter)
    }

    #[test]
    fn empty_filter_matches_all() {
        assert!(matches!(parse(json!({})).unwrap(), Query::MatchAll));
    }

    #[test]
    fn multiple_fields_become_a_conjunction() {
        let query = parse(json!({"a": 1, "b": {"$gt": 2, "$lt": 9}})).unwrap();
        let Query::And(clauses) = &query else { panic!("expected $and") };
        assert_eq!(clauses.len(), 2);
        assert_eq!(query.conjuncts().len(), 2);
    }

    #[test]
    fn rejects_unknown_operators() {
        assert_eq!(parse(json!({"a": {"$near": 1}})).unwrap_err().kind, ErrorKind::InvalidQuery);
        assert_eq!(parse(json!({"$where": "x"})).unwrap_err().kind, ErrorKind::InvalidQuery);
        assert!(parse(json!({"a": {"$gt": 1, "b": 2}})).is_err());
        assert!(parse(json!({"$or": []})).is_err());
    }

    #[test]
    fn rejects_bad_operands() {
        assert!(parse(json!({"a": {"$in": 5}})).is_err());
        assert!(parse(json!({"a": {"$size": -1}})).is_err());
        assert!(parse(json!({"a": {"$type": "decimal"}})).is_err());
        assert!(parse(json!({"a": {"$regex": "("}})).is_err());
        assert!(parse(json!({"a": {"$regex": "x", "$options": "q"}})).is_err());
        assert!(parse(json!({"a": {"$not": 5}})).is_err());
    }

    #[test]
    fn regex_options_are_applied() {
        let query = parse(json!({"name": {"$regex": "^ada", "$options": "i"}})).unwrap();
        let Query::Field(field) = query else { panic!("expected field query") };
        let Condition::Regex(re) = &field.conditions[0] else { panic!("expected regex") };
        assert!(re.regex.is_match("ADA lovelace"));
        assert_eq!(field.conditions.len(), 1);
    }

    #[test]
    fn elem_match_distinguishes_operators_from_fields() {
        let query = parse(json!({"scores": {"$elemMatch": {"$gte": 80, "$lt": 85}}})).unwrap();
        let Query::Field(field) = query else { panic!() };
        assert!(matches!(field.conditions[0], Condition::ElemMatch(ElemMatch::Conditions(_))));

        let query = parse(json!({"items": {"$elemMatch": {"sku": "a", "qty": {"$gt": 1}}}})).unwrap();
        let Query::Field(field) = query else { panic!() };
        assert!(matches!(field.conditions[0], Condition::ElemMatch(ElemMatch::Query(_))));
    }
}
