use std::collections::BTreeMap;
use std::fmt;
use serde::{Serialize, Deserialize};
use uuid::Uuid;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::value::Value;

pub const ID_FIELD: &str = "_id";

/// Document identifier, caller supplied or generated
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DocumentId {
    Int(i64),
    Text(String),
}

impl DocumentId {
    /// Random 128-bit identifier rendered as 32 hex chars
    pub fn generate() -> Self {
        DocumentId::Text(Uuid::new_v4().simple().to_string())
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Int(i) => Ok(DocumentId::Int(*i)),
            Value::Float(f) if f.fract() == 0.0 && f.abs() < 9.0e18 => Ok(DocumentId::Int(*f as i64)),
            Value::String(s) => Ok(DocumentId::Text(s.clone())),
            other => Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("_id must be a string or an integer, got {}", other.value_type().name()),
            )),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            DocumentId::Int(i) => Value::Int(*i),
            DocumentId::Text(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DocumentId::Int(i) => write!(f, "{}", i),
            DocumentId::Text(s) => write!(f, "\"{}\"", s),
        }
    }
}

impl From<i64> for DocumentId {
    fn from(id: i64) -> Self {
        DocumentId::Int(id)
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        DocumentId::Text(id.to_string())
    }
}

impl From<String> for DocumentId {
    fn from(id: String) -> Self {
        DocumentId::Text(id)
    }
}

/// Identifier of a vector inside its vector collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VectorId(pub u64);

impl VectorId {
    pub fn new(id: u64) -> Self {
        VectorId(id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for VectorId {
    fn from(id: u64) -> Self {
        VectorId(id)
    }
}

impl fmt::Display for VectorId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Schema-free document: field name to value. Key order is irrelevant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub fields: BTreeMap<String, Value>,
}

impl Document {
    pub fn new() -> Self {
        Document {
            fields: BTreeMap::new(),
        }
    }

    pub fn with_id(id: DocumentId) -> Self {
        let mut doc = Document::new();
        doc.fields.insert(ID_FIELD.to_string(), id.to_value());
        doc
    }

    /// The identifier, if present and well-formed
    pub fn id(&self) -> Option<DocumentId> {
        self.fields.get(ID_FIELD).and_then(|v| DocumentId::from_value(v).ok())
    }

    pub fn set_id(&mut self, id: &DocumentId) {
        self.fields.insert(ID_FIELD.to_string(), id.to_value());
    }

    pub fn add_field(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get_field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn remove_field(&mut self, name: &str) -> Option<Value> {
        self.fields.remove(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Document { fields }),
            other => Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("document must be an object, got {}", other.value_type().name()),
            )),
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.fields.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
        )
    }
}

impl TryFrom<serde_json::Value> for Document {
    type Error = Error;

    fn try_from(json: serde_json::Value) -> Result<Self> {
        Document::from_value(Value::from(json))
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        doc.into_value()
    }
}

impl From<BTreeMap<String, Value>> for Document {
    fn from(fields: BTreeMap<String, Value>) -> Self {
        Document { fields }
    }
}
