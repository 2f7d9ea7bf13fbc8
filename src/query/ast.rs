use regex::Regex;
use crate::core::path::FieldPath;
use crate::core::value::{Value, ValueType};

/// Parsed filter expression
#[derive(Debug, Clone)]
pub enum Query {
    MatchAll,
    And(Vec<Query>),
    Or(Vec<Query>),
    Nor(Vec<Query>),
    Field(FieldQuery),  // every condition must hold on the path
}

#[derive(Debug, Clone)]
pub struct FieldQuery {
    pub path: FieldPath,
    pub conditions: Vec<Condition>,
}

/// One operator applied to the values a path resolves to
#[derive(Debug, Clone)]
pub enum Condition {
    Eq(Value),
    Ne(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    In(Vec<Value>),
    Nin(Vec<Value>),
    Exists(bool),
    Type(Vec<TypeName>),
    All(Vec<Value>),
    ElemMatch(ElemMatch),
    Size(usize),
    Regex(RegexMatch),
    Not(Vec<Condition>),
}

/// `$elemMatch` body: a document query for object elements, or operator
/// conditions applied to each element directly
#[derive(Debug, Clone)]
pub enum ElemMatch {
    Query(Box<Query>),
    Conditions(Vec<Condition>),
}

/// Type names accepted by `$type`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeName {
    Exact(ValueType),
    Number,  // int or double
}

impl TypeName {
    pub fn parse(name: &str) -> Option<Self> {
        let exact = match name {
            "null" => ValueType::Null,
            "bool" => ValueType::Bool,
            "int" => ValueType::Int,
            "double" => ValueType::Double,
            "string" => ValueType::String,
            "timestamp" => ValueType::Timestamp,
            "array" => ValueType::Array,
            "object" => ValueType::Object,
            "number" => return Some(TypeName::Number),
            _ => return None,
        };
        Some(TypeName::Exact(exact))
    }

    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            TypeName::Exact(t) => value.value_type() == *t,
            TypeName::Number => value.is_number(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RegexMatch {
    pub pattern: String,
    pub options: String,
    pub regex: Regex,
}

impl Query {
    /// Flattens nested `$and` into its field clauses
    pub fn conjuncts(&self) -> Vec<&FieldQuery> {
        let mut out = Vec::new();
        self.collect_conjuncts(&mut out);
        out
    }

    fn collect_conjuncts<'a>(&'a self, out: &mut Vec<&'a FieldQuery>) {
        match self {
            Query::Field(field) => out.push(field),
            Query::And(clauses) => {
                for clause in clauses {
                    clause.collect_conjuncts(out);
                }
            }
            _ => {}
        }
    }
}
