//! Tagged union for values read from either backend.

use std::fmt;

/// A value held by an external variable.
///
/// Both backends expose loosely typed variables. Everything that crosses the
/// boundary is normalised into one of these three shapes, and the typed
/// accessors below are the only place where conversions happen.
#[derive(Debug, Clone)]
pub enum VarValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl VarValue {
    /// Truthiness as the backends understand it.
    ///
    /// Numbers are true when non-zero, text when non-empty and not `"0"` or
    /// `"false"`.
    pub fn as_bool(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::Text(s) => {
                let s = s.trim();
                !s.is_empty() && s != "0" && !s.eq_ignore_ascii_case("false")
            }
        }
    }

    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Self::Number(n) if n.is_finite() => Some(*n),
            Self::Number(_) => None,
            Self::Text(s) => s.trim().parse().ok(),
        }
    }

    /// Integer view, rounded to the nearest whole number.
    pub fn as_i64(&self) -> Option<i64> {
        self.as_f64().map(|n| n.round() as i64)
    }

    /// Text view of the value.
    pub fn as_text(&self) -> String {
        self.to_string()
    }

    /// Convert a JSON scalar into a value. Arrays and objects are rejected.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Bool(b) => Some(Self::Bool(*b)),
            serde_json::Value::Number(n) => n.as_f64().map(Self::Number),
            serde_json::Value::String(s) => Some(Self::Text(s.clone())),
            _ => None,
        }
    }

    /// JSON representation used when writing to an HTTP backend.
    ///
    /// Booleans are sent as 0/1 since simulator variables are numeric.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Bool(b) => serde_json::json!(if *b { 1 } else { 0 }),
            Self::Number(n) => serde_json::json!(n),
            Self::Text(s) => serde_json::json!(s),
        }
    }
}

impl PartialEq for VarValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Self::Text(a), Self::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for VarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for VarValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for VarValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for VarValue {
    fn from(value: i32) -> Self {
        Self::Number(value as f64)
    }
}

impl From<u32> for VarValue {
    fn from(value: u32) -> Self {
        Self::Number(value as f64)
    }
}

impl From<&str> for VarValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for VarValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(VarValue::Bool(true).as_bool());
        assert!(VarValue::Number(5.0).as_bool());
        assert!(!VarValue::Number(0.0).as_bool());
        assert!(!VarValue::Number(f64::NAN).as_bool());
        assert!(VarValue::from("yes").as_bool());
        assert!(!VarValue::from(" 0 ").as_bool());
        assert!(!VarValue::from("FALSE").as_bool());
        assert!(!VarValue::from("").as_bool());
    }

    #[test]
    fn test_numeric_views() {
        assert_eq!(VarValue::Bool(true).as_f64(), Some(1.0));
        assert_eq!(VarValue::from(" 42.5 ").as_f64(), Some(42.5));
        assert_eq!(VarValue::from("abc").as_f64(), None);
        assert_eq!(VarValue::Number(4.6).as_i64(), Some(5));
        assert_eq!(VarValue::Number(f64::INFINITY).as_f64(), None);
    }

    #[test]
    fn test_equality_is_by_variant_and_value() {
        assert_eq!(VarValue::Number(1.0), VarValue::Number(1.0));
        assert_ne!(VarValue::Number(1.0), VarValue::Bool(true));
        assert_eq!(VarValue::Number(f64::NAN), VarValue::Number(f64::NAN));
        assert_ne!(VarValue::from("a"), VarValue::from("b"));
    }

    #[test]
    fn test_json_conversions() {
        let v = VarValue::from_json(&serde_json::json!(3.5)).unwrap();
        assert_eq!(v, VarValue::Number(3.5));
        assert!(VarValue::from_json(&serde_json::json!([1, 2])).is_none());
        assert_eq!(VarValue::Bool(true).to_json(), serde_json::json!(1));
        assert_eq!(VarValue::from("x").to_json(), serde_json::json!("x"));
    }
}
