use std::cmp::Ordering;
use crate::core::value::Value;

/// One component of an index key. `MinKey`/`MaxKey` are scan sentinels and
/// sort outside every real key regardless of direction.
#[derive(Debug, Clone)]
pub enum KeyValue {
    MinKey,
    Absent,
    Value(Value),
    MaxKey,
}

impl KeyValue {
    fn sentinel_rank(&self) -> u8 {
        match self {
            KeyValue::MinKey => 0,
            KeyValue::Absent | KeyValue::Value(_) => 1,
            KeyValue::MaxKey => 2,
        }
    }

    /// absent < null < numbers < ... (the document total order)
    fn data_cmp(&self, other: &KeyValue) -> Ordering {
        match (self, other) {
            (KeyValue::Absent, KeyValue::Absent) => Ordering::Equal,
            (KeyValue::Absent, _) => Ordering::Less,
            (_, KeyValue::Absent) => Ordering::Greater,
            (KeyValue::Value(a), KeyValue::Value(b)) => a.canonical_cmp(b),
            _ => Ordering::Equal,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            KeyValue::Value(v) => Some(v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct KeyPart {
    pub value: KeyValue,
    pub descending: bool,
}

impl KeyPart {
    pub fn new(value: KeyValue, descending: bool) -> Self {
        KeyPart { value, descending }
    }
}

impl Ord for KeyPart {
    fn cmp(&self, other: &Self) -> Ordering {
        let sentinel = self.value.sentinel_rank().cmp(&other.value.sentinel_rank());
        if sentinel != Ordering::Equal || self.value.sentinel_rank() != 1 {
            return sentinel;
        }
        let ord = self.value.data_cmp(&other.value);
        if self.descending { ord.reverse() } else { ord }
    }
}

impl PartialOrd for KeyPart {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for KeyPart {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for KeyPart {}

/// Ordered composite key of a (possibly compound) index
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct IndexKey(pub Vec<KeyPart>);

impl IndexKey {
    pub fn parts(&self) -> &[KeyPart] {
        &self.0
    }

    /// `prefix` followed by `fill` for the remaining `width - prefix.len()` parts
    pub fn padded(prefix: Vec<KeyPart>, directions: &[bool], fill: fn() -> KeyValue) -> IndexKey {
        let mut parts = prefix;
        for descending in directions.iter().skip(parts.len()) {
            parts.push(KeyPart::new(fill(), *descending));
        }
        IndexKey(parts)
    }
}
