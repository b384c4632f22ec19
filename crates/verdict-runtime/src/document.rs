use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A JSON-like runtime value: inputs, register contents, and results.
///
/// Immutable once constructed. Equality is deep and exact: numbers never
/// compare approximately, and object key order is irrelevant. The total
/// order (null < bool < number < string < array < object < set) is
/// consistent with equality so documents can live in sorted sets.
#[derive(Debug, Clone)]
pub enum Document {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<Document>),
    Object(BTreeMap<String, Document>),
    /// Sorted unique members; serializes to a JSON array.
    Set(BTreeSet<Document>),
}

/// Numeric scalar. Integers and floats compare exactly across the two
/// representations (`1 == 1.0`), with `f64::total_cmp` breaking ties so
/// the order stays total.
#[derive(Debug, Clone, Copy)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(&self) -> f64 {
        match self {
            Number::Int(n) => *n as f64,
            Number::Float(f) => *f,
        }
    }

    /// Integral value, if the number is a whole number.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Number::Int(n) => Some(*n),
            Number::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
            Number::Float(_) => None,
        }
    }
}

impl Ord for Number {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a.cmp(b),
            _ => self.as_f64().total_cmp(&other.as_f64()),
        }
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Number {}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(n) => write!(f, "{}", n),
            Number::Float(x) => write!(f, "{}", x),
        }
    }
}

// ============================================================================
// Ordering and equality
// ============================================================================

impl Document {
    fn rank(&self) -> u8 {
        match self {
            Document::Null => 0,
            Document::Bool(_) => 1,
            Document::Number(_) => 2,
            Document::String(_) => 3,
            Document::Array(_) => 4,
            Document::Object(_) => 5,
            Document::Set(_) => 6,
        }
    }
}

impl Ord for Document {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Document::Null, Document::Null) => Ordering::Equal,
            (Document::Bool(a), Document::Bool(b)) => a.cmp(b),
            (Document::Number(a), Document::Number(b)) => a.cmp(b),
            (Document::String(a), Document::String(b)) => a.cmp(b),
            (Document::Array(a), Document::Array(b)) => a.cmp(b),
            (Document::Object(a), Document::Object(b)) => a.cmp(b),
            (Document::Set(a), Document::Set(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Document {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Document {}

// ============================================================================
// Construction and inspection
// ============================================================================

impl Document {
    pub fn int(n: i64) -> Document {
        Document::Number(Number::Int(n))
    }

    pub fn float(f: f64) -> Document {
        Document::Number(Number::Float(f))
    }

    pub fn string(s: impl Into<String>) -> Document {
        Document::String(s.into())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Document::Null => "null",
            Document::Bool(_) => "boolean",
            Document::Number(_) => "number",
            Document::String(_) => "string",
            Document::Array(_) => "array",
            Document::Object(_) => "object",
            Document::Set(_) => "set",
        }
    }

    /// Member count of a countable document; `None` for scalars.
    pub fn len(&self) -> Option<usize> {
        match self {
            Document::String(s) => Some(s.chars().count()),
            Document::Array(items) => Some(items.len()),
            Document::Object(map) => Some(map.len()),
            Document::Set(members) => Some(members.len()),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }

    /// Container member lookup: object by string key, array by integral
    /// index, set by membership. `None` is the undefined outcome, never
    /// an error.
    pub fn get(&self, key: &Document) -> Option<&Document> {
        match (self, key) {
            (Document::Object(map), Document::String(k)) => map.get(k),
            (Document::Array(items), Document::Number(n)) => {
                let idx = n.as_int()?;
                if idx < 0 {
                    return None;
                }
                items.get(idx as usize)
            }
            (Document::Set(members), _) => members.get(key),
            _ => None,
        }
    }
}

// ============================================================================
// JSON conversion
// ============================================================================

impl Document {
    pub fn from_json(value: &serde_json::Value) -> Document {
        match value {
            serde_json::Value::Null => Document::Null,
            serde_json::Value::Bool(b) => Document::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Document::int(i)
                } else {
                    Document::float(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => Document::String(s.clone()),
            serde_json::Value::Array(items) => {
                Document::Array(items.iter().map(Document::from_json).collect())
            }
            serde_json::Value::Object(map) => Document::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Document::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Sets become sorted arrays; everything else maps one-to-one.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Document::Null => serde_json::Value::Null,
            Document::Bool(b) => serde_json::Value::Bool(*b),
            Document::Number(Number::Int(n)) => serde_json::Value::Number((*n).into()),
            Document::Number(Number::Float(f)) => serde_json::json!(*f),
            Document::String(s) => serde_json::Value::String(s.clone()),
            Document::Array(items) => {
                serde_json::Value::Array(items.iter().map(|d| d.to_json()).collect())
            }
            Document::Object(map) => {
                let obj: serde_json::Map<String, serde_json::Value> =
                    map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect();
                serde_json::Value::Object(obj)
            }
            Document::Set(members) => {
                serde_json::Value::Array(members.iter().map(|d| d.to_json()).collect())
            }
        }
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Document::Null => write!(f, "null"),
            Document::Bool(b) => write!(f, "{}", b),
            Document::Number(n) => write!(f, "{}", n),
            Document::String(s) => write!(f, "\"{}\"", s),
            Document::Array(items) => {
                write!(f, "[")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            Document::Object(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "\"{}\": {}", k, v)?;
                }
                write!(f, "}}")
            }
            Document::Set(members) => {
                write!(f, "{{")?;
                for (i, v) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "}}")
            }
        }
    }
}
