use std::cmp::Ordering;
use std::fmt;

use ordered_float::OrderedFloat;
use serde::Serialize;

/// A single scalar cell.
///
/// Floats are never NaN: [`Value::float`] folds NaN into `Null`, the same way a
/// missing database value reaches the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn float(f: f64) -> Self {
        if f.is_nan() {
            Value::Null
        } else {
            Value::Float(f)
        }
    }

    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn is_null(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Float(f) => f.is_nan(),
            _ => false,
        }
    }

    /// Numeric view used by tolerance comparison. Booleans and text are not numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) if !f.is_nan() => Some(*f),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.as_f64().is_some()
    }

    /// Type-respecting equality: integers and floats compare numerically,
    /// every other pair must share a variant. Null never equals anything here;
    /// callers decide how two nulls relate.
    pub fn same_as(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => int_equals_float(*a, *b),
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            _ => false,
        }
    }

    /// Short type name for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
        }
    }
}

/// Exact above 2^53, where `i64 as f64` rounds.
fn int_equals_float(i: i64, f: f64) -> bool {
    f.fract() == 0.0 && f as i128 == i128::from(i)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            // Integral floats keep a trailing ".0" so they stay distinguishable from ints.
            Value::Float(x) if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e16 => {
                write!(f, "{x:.1}")
            }
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

// ---------------------------------------------------------------------------
// Join key components
// ---------------------------------------------------------------------------

/// Hashable, totally ordered form of a [`Value`] used as a join-key component.
///
/// Integral floats collapse onto `Int` so `1001` and `1001.0` land on the same key.
/// Nulls form their own key and join with each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyPart {
    Null,
    Bool(bool),
    Int(i64),
    Float(OrderedFloat<f64>),
    Text(String),
}

pub type KeyTuple = Vec<KeyPart>;

impl KeyPart {
    fn rank(&self) -> u8 {
        match self {
            KeyPart::Null => 0,
            KeyPart::Bool(_) => 1,
            KeyPart::Int(_) | KeyPart::Float(_) => 2,
            KeyPart::Text(_) => 3,
        }
    }

    fn numeric(&self) -> Option<f64> {
        match self {
            KeyPart::Int(i) => Some(*i as f64),
            KeyPart::Float(f) => Some(f.into_inner()),
            _ => None,
        }
    }
}

impl From<&Value> for KeyPart {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => KeyPart::Null,
            Value::Bool(b) => KeyPart::Bool(*b),
            Value::Int(i) => KeyPart::Int(*i),
            Value::Float(f) if f.is_nan() => KeyPart::Null,
            Value::Float(f)
                if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 =>
            {
                KeyPart::Int(*f as i64)
            }
            Value::Float(f) => KeyPart::Float(OrderedFloat(*f)),
            Value::Text(s) => KeyPart::Text(s.clone()),
        }
    }
}

impl Ord for KeyPart {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.rank().cmp(&other.rank()) {
            Ordering::Equal => {}
            unequal => return unequal,
        }
        match (self, other) {
            (KeyPart::Null, KeyPart::Null) => Ordering::Equal,
            (KeyPart::Bool(a), KeyPart::Bool(b)) => a.cmp(b),
            (KeyPart::Int(a), KeyPart::Int(b)) => a.cmp(b),
            (KeyPart::Float(a), KeyPart::Float(b)) => a.cmp(b),
            (KeyPart::Text(a), KeyPart::Text(b)) => a.cmp(b),
            // Mixed int/float: numeric order, ints first on a tie.
            (a, b) => {
                let (x, y) = (a.numeric().unwrap_or(0.0), b.numeric().unwrap_or(0.0));
                x.total_cmp(&y)
                    .then_with(|| matches!(b, KeyPart::Int(_)).cmp(&matches!(a, KeyPart::Int(_))))
            }
        }
    }
}

impl PartialOrd for KeyPart {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_is_null() {
        assert_eq!(Value::float(f64::NAN), Value::Null);
        assert!(Value::Float(f64::NAN).is_null());
        assert!(!Value::Int(0).is_null());
    }

    #[test]
    fn same_as_is_type_respecting() {
        assert!(Value::Int(10).same_as(&Value::Float(10.0)));
        assert!(!Value::Int(10).same_as(&Value::text("10")));
        assert!(!Value::Bool(true).same_as(&Value::Int(1)));
        assert!(!Value::Null.same_as(&Value::Null));
        assert!(Value::text("a").same_as(&Value::text("a")));
    }

    #[test]
    fn int_float_equality_is_exact_for_large_ints() {
        let two_53 = 9_007_199_254_740_992_i64;
        assert!(Value::Int(two_53).same_as(&Value::Float(two_53 as f64)));
        assert!(!Value::Int(two_53 + 1).same_as(&Value::Float(9_007_199_254_740_992.0)));
        assert!(!Value::Float(9_007_199_254_740_992.0).same_as(&Value::Int(two_53 + 1)));
        assert!(!Value::Int(i64::MAX).same_as(&Value::Float(9_223_372_036_854_775_808.0)));
        assert!(!Value::Int(3).same_as(&Value::Float(3.5)));
        assert!(!Value::Int(0).same_as(&Value::Float(f64::INFINITY)));
    }

    #[test]
    fn display_keeps_float_marker() {
        assert_eq!(Value::Float(1001.0).to_string(), "1001.0");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
        assert_eq!(Value::Int(7).to_string(), "7");
        assert_eq!(Value::Null.to_string(), "");
    }

    #[test]
    fn integral_float_key_joins_int_key() {
        assert_eq!(KeyPart::from(&Value::Float(1001.0)), KeyPart::from(&Value::Int(1001)));
        assert_ne!(KeyPart::from(&Value::text("1001")), KeyPart::from(&Value::Int(1001)));
    }

    #[test]
    fn key_order_is_numeric_across_int_and_float() {
        let mut keys = vec![
            KeyPart::from(&Value::Int(3)),
            KeyPart::from(&Value::Float(2.5)),
            KeyPart::from(&Value::text("a")),
            KeyPart::Null,
            KeyPart::from(&Value::Int(1)),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                KeyPart::Null,
                KeyPart::Int(1),
                KeyPart::Float(OrderedFloat(2.5)),
                KeyPart::Int(3),
                KeyPart::Text("a".into()),
            ]
        );
    }
}
