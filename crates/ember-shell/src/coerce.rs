//! String-to-value coercion registry.
//!
//! Every argument stays text until dispatch binds it to a declared
//! parameter. The registry maps each [`ValueType`] to a parser; array and
//! optional parsers are derived on demand from their element parser.

use std::collections::HashMap;
use std::rc::Rc;

use ember_types::error::ShellError;
use ember_types::value::{Value, ValueType};

use crate::tokenizer::{TokenKind, next_token, split_array};

/// Evaluates the parenthesized sub-evaluations found inside array elements.
pub trait Resolve {
    /// Run `expr` and return the text of its result.
    fn resolve(&self, expr: &str) -> Result<String, ShellError>;
}

/// Resolver that hands sub-evaluation text back unevaluated.
pub struct Verbatim;

impl Resolve for Verbatim {
    fn resolve(&self, expr: &str) -> Result<String, ShellError> {
        Ok(expr.to_string())
    }
}

/// Why a text could not be converted.
#[derive(Debug, thiserror::Error)]
pub enum ParseFailure {
    #[error("'{text}' is not a valid {expected}")]
    Invalid { text: String, expected: &'static str },

    #[error("{found} components given, expected {min} to {max}")]
    Components { found: usize, min: usize, max: usize },

    #[error("element {index}: {source}")]
    Element {
        index: usize,
        source: Box<ParseFailure>,
    },

    #[error("'{0}' is not a single value")]
    NotSingle(String),

    /// The text came from a sub-evaluation rather than the input line.
    #[error(transparent)]
    Returned(Box<ParseFailure>),

    #[error("no conversion registered for {0}")]
    Unsupported(String),

    /// Resolving an element failed (for example a nested sub-evaluation).
    #[error(transparent)]
    Resolve(#[from] ShellError),
}

impl ParseFailure {
    /// Whether the offending text was produced by a sub-evaluation.
    pub fn is_returned(&self) -> bool {
        match self {
            Self::Returned(_) => true,
            Self::Element { source, .. } => source.is_returned(),
            _ => false,
        }
    }
}

/// A conversion from argument text to a typed value.
pub type Parser = Rc<dyn Fn(&str, &dyn Resolve) -> Result<Value, ParseFailure>>;

/// Registry of conversions keyed by semantic type.
pub struct CoercionRegistry {
    parsers: HashMap<ValueType, Parser>,
}

impl CoercionRegistry {
    /// Registry with the built-in scalar and vector conversions.
    pub fn new() -> Self {
        let mut reg = Self {
            parsers: HashMap::new(),
        };
        reg.register_type(ValueType::Text, |t, _| Ok(parse_text(t)));
        reg.register_type(ValueType::Int, |t, _| parse_int(t));
        reg.register_type(ValueType::Float, |t, _| parse_float(t));
        reg.register_type(ValueType::Bool, |t, _| parse_bool(t));
        for ty in [ValueType::Vec2, ValueType::Vec3, ValueType::Vec4] {
            if let Some((size, min)) = ty.vector_bounds() {
                reg.register_type(ty, move |t, r| parse_vector(t, r, size, min));
            }
        }
        reg
    }

    /// Register or replace the conversion for a type.
    pub fn register_type(
        &mut self,
        ty: ValueType,
        parser: impl Fn(&str, &dyn Resolve) -> Result<Value, ParseFailure> + 'static,
    ) {
        self.parsers.insert(ty, Rc::new(parser));
    }

    /// Whether values of `ty` can be produced.
    pub fn supports(&self, ty: &ValueType) -> bool {
        self.parser_for(ty).is_some()
    }

    /// The parser for `ty`, deriving optional and array parsers from their
    /// inner type when no explicit one is registered.
    pub fn parser_for(&self, ty: &ValueType) -> Option<Parser> {
        if let Some(p) = self.parsers.get(ty) {
            return Some(Rc::clone(p));
        }
        match ty {
            ValueType::Optional(inner) => {
                let inner = self.parser_for(inner)?;
                let parser: Parser = Rc::new(move |t: &str, r: &dyn Resolve| {
                    if is_null_text(t) {
                        Ok(Value::Null)
                    } else {
                        inner(t, r)
                    }
                });
                Some(parser)
            },
            ValueType::Array(element) => {
                let element = self.parser_for(element)?;
                let parser: Parser = Rc::new(move |t: &str, r: &dyn Resolve| {
                    parse_elements(t, r, &element).map(Value::Array)
                });
                Some(parser)
            },
            _ => None,
        }
    }

    /// Convert `text` to a value of type `ty`.
    pub fn coerce(
        &self,
        ty: &ValueType,
        text: &str,
        resolver: &dyn Resolve,
    ) -> Result<Value, ParseFailure> {
        let parser = self
            .parser_for(ty)
            .ok_or_else(|| ParseFailure::Unsupported(ty.to_string()))?;
        parser(text, resolver)
    }
}

impl Default for CoercionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn is_null_text(text: &str) -> bool {
    let t = text.trim();
    t.is_empty() || t.eq_ignore_ascii_case("null")
}

pub fn parse_text(text: &str) -> Value {
    Value::Text(text.to_string())
}

pub fn parse_float(text: &str) -> Result<Value, ParseFailure> {
    text.trim()
        .parse::<f64>()
        .map(Value::Float)
        .map_err(|_| ParseFailure::Invalid {
            text: text.to_string(),
            expected: "float",
        })
}

/// Integers go through the float parser and are truncated toward zero, so
/// `"2.9"` is accepted as `2`.
pub fn parse_int(text: &str) -> Result<Value, ParseFailure> {
    let invalid = || ParseFailure::Invalid {
        text: text.to_string(),
        expected: "int",
    };
    let x: f64 = text.trim().parse().map_err(|_| invalid())?;
    if !x.is_finite() {
        return Err(invalid());
    }
    Ok(Value::Int(x.trunc() as i64))
}

pub fn parse_bool(text: &str) -> Result<Value, ParseFailure> {
    let t = text.trim();
    if t == "0" || t.eq_ignore_ascii_case("false") {
        Ok(Value::Bool(false))
    } else if t == "1" || t.eq_ignore_ascii_case("true") {
        Ok(Value::Bool(true))
    } else {
        Err(ParseFailure::Invalid {
            text: text.to_string(),
            expected: "bool",
        })
    }
}

/// Split an array literal, resolve each element and convert it.
///
/// Each element must be exactly one token. A parenthesized element is
/// evaluated through `resolver`.
fn parse_elements(
    text: &str,
    resolver: &dyn Resolve,
    element: &Parser,
) -> Result<Vec<Value>, ParseFailure> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    let mut values = Vec::new();
    for (index, part) in split_array(text)?.into_iter().enumerate() {
        let part = part.trim();
        let wrap = |source: ParseFailure| ParseFailure::Element {
            index,
            source: Box::new(source),
        };
        let token = next_token(part)?;
        if token.end_of_statement || !token.remainder.trim().is_empty() {
            return Err(wrap(ParseFailure::NotSingle(part.to_string())));
        }
        let returned = token.kind == TokenKind::SubEval;
        let resolved = if returned {
            resolver.resolve(&token.text)?
        } else {
            token.text
        };
        match element(&resolved, resolver) {
            Ok(v) => values.push(v),
            Err(e @ ParseFailure::Resolve(_)) => return Err(e),
            Err(e) if returned => return Err(wrap(ParseFailure::Returned(Box::new(e)))),
            Err(e) => return Err(wrap(e)),
        }
    }
    Ok(values)
}

/// Fixed-size vector built on the float array parser. Missing trailing
/// components are zero-filled down to `min`.
fn parse_vector(
    text: &str,
    resolver: &dyn Resolve,
    size: usize,
    min: usize,
) -> Result<Value, ParseFailure> {
    let float: Parser = Rc::new(|t: &str, _: &dyn Resolve| parse_float(t));
    let values = parse_elements(text, resolver, &float)?;
    if values.len() > size || values.len() < min {
        return Err(ParseFailure::Components {
            found: values.len(),
            min,
            max: size,
        });
    }
    let mut components: Vec<f64> = values.iter().filter_map(Value::as_float).collect();
    components.resize(size, 0.0);
    Ok(Value::Vector(components))
}
