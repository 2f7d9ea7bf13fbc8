use std::collections::BTreeSet;
use std::fmt;
use std::ops::Bound;
use crate::core::path::FieldPath;
use crate::core::types::DocumentId;
use crate::core::value::Value;
use crate::index::key::{IndexKey, KeyPart, KeyValue};
use crate::index::{IndexManager, SecondaryIndex};
use crate::query::ast::{Condition, FieldQuery, Query};

/// How candidates for a query are produced. Every plan yields a superset of
/// the matching documents; the full query is always re-applied.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionPlan {
    CollectionScan,
    IdLookup { ids: Vec<DocumentId> },
    IndexScan {
        index: String,
        equality: Vec<Value>,  // leading fields fixed by equality
        bound: Option<ScanBound>,  // constraint on the next field
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScanBound {
    In(Vec<Value>),
    Range { lower: Bound<Value>, upper: Bound<Value> },
}

impl ScanBound {
    /// Drops the upper end of a two-sided range. On a multikey field each
    /// bound may be met by a different element, so one key cannot carry both.
    fn one_sided(self) -> ScanBound {
        match self {
            ScanBound::Range { lower: Bound::Unbounded, upper } => ScanBound::Range { lower: Bound::Unbounded, upper },
            ScanBound::Range { lower, .. } => ScanBound::Range { lower, upper: Bound::Unbounded },
            other => other,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            ScanBound::In(_) => 2,
            ScanBound::Range { .. } => 1,
        }
    }
}

impl fmt::Display for ExecutionPlan {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ExecutionPlan::CollectionScan => write!(f, "COLLSCAN"),
            ExecutionPlan::IdLookup { ids } => write!(f, "IDLOOKUP ({} ids)", ids.len()),
            ExecutionPlan::IndexScan { index, equality, bound } => {
                write!(f, "IXSCAN {} eq={}", index, equality.len())?;
                match bound {
                    Some(ScanBound::In(values)) => write!(f, " in={}", values.len()),
                    Some(ScanBound::Range { .. }) => write!(f, " range"),
                    None => Ok(()),
                }
            }
        }
    }
}

/// Index-usable constraints on one path, collected from the top-level conjunction
#[derive(Default)]
struct PathConstraints {
    eq: Option<Value>,
    one_of: Option<Vec<Value>>,
    lower: Option<(Value, bool)>,
    upper: Option<(Value, bool)>,
}

impl PathConstraints {
    fn bound(&self) -> Option<ScanBound> {
        if let Some(values) = &self.one_of {
            return Some(ScanBound::In(values.clone()));
        }
        if self.lower.is_none() && self.upper.is_none() {
            return None;
        }
        let to_bound = |b: &Option<(Value, bool)>| match b {
            Some((v, true)) => Bound::Included(v.clone()),
            Some((v, false)) => Bound::Excluded(v.clone()),
            None => Bound::Unbounded,
        };
        Some(ScanBound::Range { lower: to_bound(&self.lower), upper: to_bound(&self.upper) })
    }
}

/// Chooses an access path and resolves it to candidate ids
pub struct QueryPlanner;

impl QueryPlanner {
    pub fn plan(query: &Query, indexes: &IndexManager) -> ExecutionPlan {
        let conjuncts = query.conjuncts();
        if conjuncts.is_empty() {
            return ExecutionPlan::CollectionScan;
        }
        let constraints: Vec<(&FieldPath, PathConstraints)> = collect_constraints(&conjuncts);

        if let Some((_, id)) = constraints.iter().find(|(path, _)| path.is_id()) {
            let values = match (&id.eq, &id.one_of) {
                (Some(value), _) => Some(vec![value.clone()]),
                (None, Some(values)) => Some(values.clone()),
                _ => None,
            };
            if let Some(values) = values {
                let mut ids: Vec<DocumentId> = values.iter().filter_map(|v| DocumentId::from_value(v).ok()).collect();
                ids.sort();
                ids.dedup();
                return ExecutionPlan::IdLookup { ids };
            }
        }

        let mut best: Option<((usize, bool, u8), ExecutionPlan)> = None;
        for index in indexes.indexes() {
            let lookup = |path: &FieldPath| constraints.iter().find(|(p, _)| *p == path).map(|(_, c)| c);
            let mut equality = Vec::new();
            for path in index.paths() {
                match lookup(path).and_then(|c| c.eq.clone()) {
                    Some(value) => equality.push(value),
                    None => break,
                }
            }
            let bound = index
                .paths()
                .get(equality.len())
                .and_then(|path| lookup(path))
                .and_then(PathConstraints::bound)
                .map(|bound| if index.is_multikey(equality.len()) { bound.one_sided() } else { bound });
            if equality.is_empty() && bound.is_none() {
                continue;
            }

            let score = (equality.len(), index.is_unique(), bound.as_ref().map_or(0, ScanBound::rank));
            if best.as_ref().is_none_or(|(current, _)| score > *current) {
                let plan = ExecutionPlan::IndexScan { index: index.name().to_string(), equality, bound };
                best = Some((score, plan));
            }
        }

        best.map_or(ExecutionPlan::CollectionScan, |(_, plan)| plan)
    }

    /// Ids produced by an index plan; `None` for plans that do not use an index
    pub fn index_candidates(plan: &ExecutionPlan, indexes: &IndexManager) -> Option<BTreeSet<DocumentId>> {
        let ExecutionPlan::IndexScan { index, equality, bound } = plan else {
            return None;
        };
        let index = indexes.get(index)?;
        let directions = index.directions();
        let prefix: Vec<KeyPart> = equality
            .iter()
            .zip(directions)
            .map(|(v, desc)| KeyPart::new(KeyValue::Value(v.clone()), *desc))
            .collect();
        let position = prefix.len();

        Some(match bound {
            None => scan_prefix(index, prefix),
            Some(ScanBound::In(values)) => {
                let mut ids = BTreeSet::new();
                for value in values {
                    let mut parts = prefix.clone();
                    parts.push(KeyPart::new(KeyValue::Value(value.clone()), directions[position]));
                    ids.extend(scan_prefix(index, parts));
                }
                ids
            }
            Some(ScanBound::Range { lower, upper }) => {
                let descending = directions[position];
                // in key order a descending part starts from the upper bound
                let (first, last) = if descending { (upper, lower) } else { (lower, upper) };
                let mut low = prefix.clone();
                low.push(KeyPart::new(edge(first, KeyValue::MinKey), descending));
                let mut high = prefix;
                high.push(KeyPart::new(edge(last, KeyValue::MaxKey), descending));
                let low = IndexKey::padded(low, directions, || KeyValue::MinKey);
                let high = IndexKey::padded(high, directions, || KeyValue::MaxKey);
                index.scan(&low, &high, |key| {
                    key.parts()[position]
                        .value
                        .as_value()
                        .is_some_and(|v| within(v, lower, upper))
                })
            }
        })
    }
}

fn scan_prefix(index: &SecondaryIndex, prefix: Vec<KeyPart>) -> BTreeSet<DocumentId> {
    let low = IndexKey::padded(prefix.clone(), index.directions(), || KeyValue::MinKey);
    let high = IndexKey::padded(prefix, index.directions(), || KeyValue::MaxKey);
    index.scan(&low, &high, |_| true)
}

fn edge(bound: &Bound<Value>, open: KeyValue) -> KeyValue {
    match bound {
        Bound::Included(v) | Bound::Excluded(v) => KeyValue::Value(v.clone()),
        Bound::Unbounded => open,
    }
}

/// Same type class as the bounds, and inside them
fn within(value: &Value, lower: &Bound<Value>, upper: &Bound<Value>) -> bool {
    let above = match lower {
        Bound::Included(l) => value.partial_compare(l).is_some_and(|o| o.is_ge()),
        Bound::Excluded(l) => value.partial_compare(l).is_some_and(|o| o.is_gt()),
        Bound::Unbounded => true,
    };
    let below = match upper {
        Bound::Included(u) => value.partial_compare(u).is_some_and(|o| o.is_le()),
        Bound::Excluded(u) => value.partial_compare(u).is_some_and(|o| o.is_lt()),
        Bound::Unbounded => true,
    };
    above && below
}

/// Null and containers never take part in index bounds: null also matches
/// missing fields, and array literals compare whole-array.
fn indexable(value: &Value) -> bool {
    !matches!(value, Value::Null | Value::Array(_) | Value::Object(_))
}

fn collect_constraints<'a>(conjuncts: &[&'a FieldQuery]) -> Vec<(&'a FieldPath, PathConstraints)> {
    let mut out: Vec<(&FieldPath, PathConstraints)> = Vec::new();
    for &field in conjuncts {
        let position = match out.iter().position(|(p, _)| *p == &field.path) {
            Some(i) => i,
            None => {
                out.push((&field.path, PathConstraints::default()));
                out.len() - 1
            }
        };
        let entry = &mut out[position].1;
        for condition in &field.conditions {
            match condition {
                Condition::Eq(v) if indexable(v) => {
                    entry.eq.get_or_insert_with(|| v.clone());
                }
                Condition::In(values) if !values.is_empty() && values.iter().all(indexable) => {
                    entry.one_of.get_or_insert_with(|| values.clone());
                }
                Condition::Gt(v) if indexable(v) => {
                    entry.lower.get_or_insert_with(|| (v.clone(), false));
                }
                Condition::Gte(v) if indexable(v) => {
                    entry.lower.get_or_insert_with(|| (v.clone(), true));
                }
                Condition::Lt(v) if indexable(v) => {
                    entry.upper.get_or_insert_with(|| (v.clone(), false));
                }
                Condition::Lte(v) if indexable(v) => {
                    entry.upper.get_or_insert_with(|| (v.clone(), true));
                }
                _ => {}
            }
        }
    }
    out
}
