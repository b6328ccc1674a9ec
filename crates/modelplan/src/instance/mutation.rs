//! Mutation record: which fields changed since the last clean checkpoint.

use indexmap::IndexMap;

use crate::value::Value;

/// A structural operation on an array field.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayOp {
    Push(Vec<Value>),
    Unshift(Vec<Value>),
    Pop,
    Shift,
    /// `start` and `delete_count` are clamped to the array bounds at the
    /// time of the call.
    Splice {
        start: usize,
        delete_count: usize,
        items: Vec<Value>,
    },
    IndexSet {
        index: usize,
        value: Value,
    },
}

impl ArrayOp {
    /// Operation name: push, unshift, pop, shift, splice or indexSet.
    pub fn op(&self) -> &'static str {
        match self {
            Self::Push(_) => "push",
            Self::Unshift(_) => "unshift",
            Self::Pop => "pop",
            Self::Shift => "shift",
            Self::Splice { .. } => "splice",
            Self::IndexSet { .. } => "indexSet",
        }
    }

    /// The call arguments, flattened in call order.
    pub fn args(&self) -> Vec<Value> {
        match self {
            Self::Push(items) | Self::Unshift(items) => items.clone(),
            Self::Pop | Self::Shift => Vec::new(),
            Self::Splice {
                start,
                delete_count,
                items,
            } => {
                let mut args = Vec::with_capacity(items.len() + 2);
                args.push(Value::Uint(*start as u64));
                args.push(Value::Uint(*delete_count as u64));
                args.extend(items.iter().cloned());
                args
            }
            Self::IndexSet { index, value } => vec![Value::Uint(*index as u64), value.clone()],
        }
    }
}

/// Mutation state of one field.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// The whole field was replaced.
    Replaced,
    /// Ordered structural operations on an array field.
    Ops(Vec<ArrayOp>),
}

impl Mutation {
    pub fn is_replaced(&self) -> bool {
        matches!(self, Self::Replaced)
    }

    pub fn ops(&self) -> Option<&[ArrayOp]> {
        match self {
            Self::Ops(ops) => Some(ops),
            Self::Replaced => None,
        }
    }
}

/// Per-instance side table of field mutations, in first-mutation order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MutationRecord {
    entries: IndexMap<String, Mutation>,
}

impl MutationRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `key` wholly dirty, discarding any recorded op log.
    pub fn mark_dirty(&mut self, key: &str) {
        match self.entries.get_mut(key) {
            Some(entry) => *entry = Mutation::Replaced,
            None => {
                self.entries.insert(key.to_string(), Mutation::Replaced);
            }
        }
    }

    /// Appends an array operation unless `key` is already wholly dirty.
    pub fn record_array_op(&mut self, key: &str, op: ArrayOp) {
        match self.entries.get_mut(key) {
            Some(Mutation::Replaced) => {}
            Some(Mutation::Ops(ops)) => ops.push(op),
            None => {
                self.entries.insert(key.to_string(), Mutation::Ops(vec![op]));
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Mutation> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Mutation)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes the entries for `fields`, or every entry when `None`.
    pub fn clear(&mut self, fields: Option<&[&str]>) {
        match fields {
            Some(fields) => {
                for key in fields {
                    self.entries.shift_remove(*key);
                }
            }
            None => self.entries.clear(),
        }
    }
}
