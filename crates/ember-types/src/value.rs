//! Typed argument values and the semantic types they are coerced to.

use std::fmt;

/// Semantic type of a command parameter.
///
/// Every type a binding declares must have a conversion registered with the
/// shell's coercion registry. `Optional` and `Array` are derived from their
/// element type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueType {
    Text,
    Int,
    Float,
    Bool,
    Vec2,
    Vec3,
    Vec4,
    /// Nullable wrapper; an absent or empty argument becomes [`Value::Null`].
    Optional(Box<ValueType>),
    /// Homogeneous array written as a comma-separated literal.
    Array(Box<ValueType>),
    /// Host-defined type, only usable after `register_type`.
    Custom(String),
}

impl ValueType {
    pub fn optional(inner: ValueType) -> Self {
        ValueType::Optional(Box::new(inner))
    }

    pub fn array(element: ValueType) -> Self {
        ValueType::Array(Box::new(element))
    }

    /// Whether a missing argument of this type is tolerated.
    pub fn is_nullable(&self) -> bool {
        matches!(self, ValueType::Optional(_))
    }

    /// Component count and minimum accepted components for vector types.
    pub fn vector_bounds(&self) -> Option<(usize, usize)> {
        match self {
            ValueType::Vec2 => Some((2, 2)),
            ValueType::Vec3 => Some((3, 3)),
            ValueType::Vec4 => Some((4, 3)),
            _ => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Text => f.write_str("text"),
            ValueType::Int => f.write_str("int"),
            ValueType::Float => f.write_str("float"),
            ValueType::Bool => f.write_str("bool"),
            ValueType::Vec2 => f.write_str("vec2"),
            ValueType::Vec3 => f.write_str("vec3"),
            ValueType::Vec4 => f.write_str("vec4"),
            ValueType::Optional(inner) => write!(f, "{inner}?"),
            ValueType::Array(element) => write!(f, "{element}[]"),
            ValueType::Custom(name) => f.write_str(name),
        }
    }
}

/// A coerced argument or command result.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent optional argument.
    Null,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Array(Vec<Value>),
    /// Fixed-size numeric aggregate (2 to 4 components).
    Vector(Vec<f64>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Float view; integers widen.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(*x),
            Value::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Components of a vector value with exactly `N` components.
    pub fn as_vector<const N: usize>(&self) -> Option<[f64; N]> {
        match self {
            Value::Vector(c) if c.len() == N => {
                let mut out = [0.0; N];
                out.copy_from_slice(c);
                Some(out)
            },
            _ => None,
        }
    }

    /// Short name of the variant, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Text(_) => "text",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Array(_) => "array",
            Value::Vector(_) => "vector",
        }
    }
}

/// Characters that would split or re-scope a text element inside a literal.
const DELIMITERS: &[char] = &[' ', '\t', ',', ';', '(', ')', '{', '}', ':', '"'];

/// Write one array element so the printed array reads back as the same
/// elements. Text holding a `"` is the exception: there is no escape
/// syntax, so it is quoted as-is and will not read back.
fn write_element(f: &mut fmt::Formatter<'_>, item: &Value) -> fmt::Result {
    match item {
        Value::Array(_) | Value::Vector(_) => write!(f, "({item})"),
        Value::Text(s) if s.is_empty() || s.contains(DELIMITERS) => write!(f, "\"{s}\""),
        other => write!(f, "{other}"),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Text(s) => f.write_str(s),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write_element(f, item)?;
                }
                Ok(())
            },
            Value::Vector(components) => {
                for (i, c) in components.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{c}")?;
                }
                Ok(())
            },
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_display() {
        assert_eq!(ValueType::Int.to_string(), "int");
        assert_eq!(ValueType::optional(ValueType::Float).to_string(), "float?");
        assert_eq!(ValueType::array(ValueType::Vec3).to_string(), "vec3[]");
        assert_eq!(ValueType::Custom("color".into()).to_string(), "color");
    }

    #[test]
    fn only_optional_is_nullable() {
        assert!(ValueType::optional(ValueType::Int).is_nullable());
        assert!(!ValueType::Int.is_nullable());
        assert!(!ValueType::array(ValueType::Int).is_nullable());
    }

    #[test]
    fn vector_bounds() {
        assert_eq!(ValueType::Vec2.vector_bounds(), Some((2, 2)));
        assert_eq!(ValueType::Vec3.vector_bounds(), Some((3, 3)));
        assert_eq!(ValueType::Vec4.vector_bounds(), Some((4, 3)));
        assert_eq!(ValueType::Float.vector_bounds(), None);
    }

    #[test]
    fn float_display_is_shortest() {
        assert_eq!(Value::Float(5.0).to_string(), "5");
        assert_eq!(Value::Float(2.5).to_string(), "2.5");
    }

    #[test]
    fn array_display_is_a_literal() {
        let v = Value::Array(vec![
            Value::Int(1),
            Value::Text("two words".into()),
            Value::Array(vec![Value::Int(3), Value::Int(4)]),
        ]);
        assert_eq!(v.to_string(), "1, \"two words\", (3, 4)");
    }

    #[test]
    fn embedded_quote_is_not_escaped() {
        let v = Value::Array(vec![Value::Text("say \"hi\"".into())]);
        assert_eq!(v.to_string(), "\"say \"hi\"\"");
    }

    #[test]
    fn vector_display() {
        assert_eq!(Value::Vector(vec![1.0, 2.5, 0.0]).to_string(), "1, 2.5, 0");
    }

    #[test]
    fn as_vector_checks_length() {
        let v = Value::Vector(vec![1.0, 2.0, 3.0]);
        assert_eq!(v.as_vector::<3>(), Some([1.0, 2.0, 3.0]));
        assert_eq!(v.as_vector::<2>(), None);
    }

    #[test]
    fn int_widens_to_float() {
        assert_eq!(Value::Int(3).as_float(), Some(3.0));
        assert_eq!(Value::Text("3".into()).as_float(), None);
    }

    #[test]
    fn conversions() {
        assert_eq!(Value::from("hi"), Value::Text("hi".into()));
        assert_eq!(Value::from(7), Value::Int(7));
        assert_eq!(Value::from(true), Value::Bool(true));
        assert!(Value::Null.is_null());
    }
}
