use crate::core::error::{Error, Result};
use crate::core::path::FieldPath;
use crate::core::types::{Document, ID_FIELD};
use crate::core::value::Value;
use crate::query::ast::ElemMatch;
use crate::query::parser::QueryParser;

/// Which end `$pop` removes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopEnd {
    First,  // -1
    Last,   // 1
}

/// What `$pull` removes
#[derive(Debug, Clone)]
pub enum PullFilter {
    Equals(Value),
    Matches(ElemMatch),
}

/// A single operator clause on one path
#[derive(Debug, Clone)]
pub enum UpdateOperation {
    Set(FieldPath, Value),
    Unset(FieldPath),
    Inc(FieldPath, Value),
    Mul(FieldPath, Value),
    Min(FieldPath, Value),
    Max(FieldPath, Value),
    Rename(FieldPath, FieldPath),
    Push(FieldPath, Vec<Value>),
    AddToSet(FieldPath, Vec<Value>),
    Pull(FieldPath, PullFilter),
    Pop(FieldPath, PopEnd),
}

/// Parsed update document: either operator clauses in application order, or
/// a whole-document replacement
#[derive(Debug, Clone)]
pub enum UpdateExpression {
    Operators(Vec<UpdateOperation>),
    Replace(Document),
}

/// Application order of operators; clauses within one operator run in key order
const OPERATOR_ORDER: [&str; 11] = [
    "$set", "$unset", "$inc", "$mul", "$min", "$max", "$rename", "$push", "$addToSet", "$pull", "$pop",
];

impl UpdateExpression {
    pub fn parse(update: &Value) -> Result<Self> {
        let Value::Object(map) = update else {
            return Err(Error::invalid_query(format!(
                "update must be an object, got {}",
                update.value_type().name()
            )));
        };

        let operators = map.keys().filter(|k| k.starts_with('$')).count();
        if operators == 0 {
            return Ok(UpdateExpression::Replace(Document::from(map.clone())));
        }
        if operators < map.len() {
            return Err(Error::invalid_query("cannot mix update operators and plain fields"));
        }

        if let Some(unknown) = map.keys().find(|k| !OPERATOR_ORDER.contains(&k.as_str())) {
            return Err(Error::invalid_query(format!("unknown update operator {}", unknown)));
        }

        let mut operations = Vec::new();
        for op in OPERATOR_ORDER {
            let Some(clauses) = map.get(op) else { continue };
            let clauses = clauses
                .as_object()
                .ok_or_else(|| Error::invalid_query(format!("{} expects an object", op)))?;
            for (path, operand) in clauses {
                operations.push(parse_clause(op, target_path(op, path)?, operand)?);
            }
        }
        Ok(UpdateExpression::Operators(operations))
    }

    pub fn parse_json(update: serde_json::Value) -> Result<Self> {
        Self::parse(&Value::from(update))
    }

    pub fn is_replacement(&self) -> bool {
        matches!(self, UpdateExpression::Replace(_))
    }
}

fn target_path(op: &str, path: &str) -> Result<FieldPath> {
    let path = FieldPath::parse(path)?;
    if path.first() == ID_FIELD {
        return Err(Error::invalid_query(format!("{} cannot modify {}", op, ID_FIELD)));
    }
    Ok(path)
}

fn parse_clause(op: &str, path: FieldPath, operand: &Value) -> Result<UpdateOperation> {
    Ok(match op {
        "$set" => UpdateOperation::Set(path, operand.clone()),
        "$unset" => UpdateOperation::Unset(path),
        "$inc" => UpdateOperation::Inc(path, expect_number(op, operand)?),
        "$mul" => UpdateOperation::Mul(path, expect_number(op, operand)?),
        "$min" => UpdateOperation::Min(path, operand.clone()),
        "$max" => UpdateOperation::Max(path, operand.clone()),
        "$rename" => {
            let target = operand
                .as_str()
                .ok_or_else(|| Error::invalid_query("$rename target must be a string"))?;
            let target = target_path(op, target)?;
            if target == path {
                return Err(Error::invalid_query(format!("$rename source and target are both '{}'", path)));
            }
            UpdateOperation::Rename(path, target)
        }
        "$push" => UpdateOperation::Push(path, each_items(op, operand)?),
        "$addToSet" => UpdateOperation::AddToSet(path, each_items(op, operand)?),
        "$pull" => UpdateOperation::Pull(path, pull_filter(operand)?),
        "$pop" => {
            let end = match operand.as_i64() {
                Some(1) => PopEnd::Last,
                Some(-1) => PopEnd::First,
                _ => return Err(Error::invalid_query("$pop expects 1 or -1")),
            };
            UpdateOperation::Pop(path, end)
        }
        other => return Err(Error::invalid_query(format!("unknown update operator {}", other))),
    })
}

fn expect_number(op: &str, operand: &Value) -> Result<Value> {
    if operand.is_number() {
        Ok(operand.clone())
    } else {
        Err(Error::invalid_query(format!("{} expects a number", op)))
    }
}

/// `{"$each": [..]}` expands to its items; anything else is a single item
fn each_items(op: &str, operand: &Value) -> Result<Vec<Value>> {
    match operand {
        Value::Object(map) if map.contains_key("$each") => {
            if map.len() > 1 {
                return Err(Error::invalid_query(format!("{} supports only the $each modifier", op)));
            }
            match map.get("$each") {
                Some(Value::Array(items)) => Ok(items.clone()),
                _ => Err(Error::invalid_query("$each expects an array")),
            }
        }
        single => Ok(vec![single.clone()]),
    }
}

fn pull_filter(operand: &Value) -> Result<PullFilter> {
    match operand {
        Value::Object(map) if !map.is_empty() => Ok(PullFilter::Matches(QueryParser::parse_elem_match(operand)?)),
        literal => Ok(PullFilter::Equals(literal.clone())),
    }
}
