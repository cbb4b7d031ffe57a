//! Runtime values seen by templates.
//!
//! The [`Value`] enum is the dynamic value model of the engine: everything a
//! template can resolve, compare, iterate over or call is a `Value`. Host data
//! enters either through the `From` conversions or through
//! [`Value::from_serialize`] for any `serde::Serialize` type.
//!
//! Values display the way the template language writes them as literals, so
//! `{{ items }}` for a list renders `[1, 'two', None]`.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::Result;

/// Runtime value resolved from a context or parsed from a literal.
///
/// # Example
///
/// ```
/// use onebot_template::Value;
///
/// let value = Value::from(vec![1, 2, 3]);
/// assert!(value.is_truthy());
/// assert_eq!(value.to_string(), "[1, 2, 3]");
/// ```
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Absent value (`None` in templates, `null` in JSON).
    #[default]
    None,
    /// Boolean value.
    Bool(bool),
    /// Numeric value.
    Number(Number),
    /// String value.
    String(String),
    /// Ordered sequence; the target of index lookups.
    List(Vec<Value>),
    /// String-keyed mapping in insertion order; the target of key lookups.
    Map(IndexMap<String, Value>),
    /// Host object with named fields; the target of field lookups.
    Object(Arc<dyn Object>),
    /// Invocable value for `{% call %}` blocks.
    Function(Function),
}

impl Value {
    /// Converts any serializable value through its JSON representation.
    ///
    /// Structs become maps, sequences become lists, and `Option::None` becomes
    /// [`Value::None`].
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
        Ok(Value::from(serde_json::to_value(value)?))
    }

    /// Creates an object value from a host type.
    pub fn from_object<T: Object + 'static>(object: T) -> Value {
        Value::Object(Arc::new(object))
    }

    /// Returns `true` if this is a `None` value.
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// Returns `true` if this is a `Function` value.
    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_))
    }

    /// Returns the truthiness of the value.
    ///
    /// `None`, `false`, zero, and empty strings, lists and maps are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.to_f64() != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Map(map) => !map.is_empty(),
            Value::Object(_) | Value::Function(_) => true,
        }
    }

    /// Extracts the string value, if present.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Extracts a numeric view of the value.
    ///
    /// Booleans count as `0` and `1`, so `True == 1` holds in templates.
    pub fn as_number(&self) -> Option<Number> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Bool(b) => Some(Number::I64(*b as i64)),
            _ => None,
        }
    }

    /// Extracts the list items, if present.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Extracts the map, if present.
    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Returns the name of this value's kind, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Object(object) => object.type_name(),
            Value::Function(_) => "function",
        }
    }

    /// Compares two values for ordering.
    ///
    /// Numbers and booleans compare numerically across representations,
    /// strings lexicographically, and lists element by element. Any other
    /// pairing has no order and yields `None`.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::List(a), Value::List(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    if x != y {
                        return x.compare(y);
                    }
                }
                Some(a.len().cmp(&b.len()))
            }
            _ => match (self.as_number(), other.as_number()) {
                (Some(a), Some(b)) => a.compare(b),
                _ => None,
            },
        }
    }

    /// Looks up a key on a map value.
    pub fn get_key(&self, key: &str) -> Option<&Value> {
        self.as_map()?.get(key)
    }

    /// Looks up a list element by an all-digit index segment.
    pub fn get_index(&self, segment: &str) -> Option<&Value> {
        if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let index: usize = segment.parse().ok()?;
        self.as_list()?.get(index)
    }

    /// Looks up a named field on an object value.
    pub fn get_field(&self, name: &str) -> Option<Value> {
        match self {
            Value::Object(object) => object.field(name),
            _ => None,
        }
    }

    /// Writes the literal form of the value, as it would appear nested in a list.
    fn write_repr(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => {
                f.write_str("'")?;
                for ch in s.chars() {
                    match ch {
                        '\\' => f.write_str("\\\\")?,
                        '\'' => f.write_str("\\'")?,
                        '\n' => f.write_str("\\n")?,
                        '\t' => f.write_str("\\t")?,
                        '\r' => f.write_str("\\r")?,
                        other => write!(f, "{}", other)?,
                    }
                }
                f.write_str("'")
            }
            other => write!(f, "{}", other),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("None"),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => f.write_str(s),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    item.write_repr(f)?;
                }
                f.write_str("]")
            }
            Value::Map(map) => {
                f.write_str("{")?;
                for (i, (key, item)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    Value::String(key.clone()).write_repr(f)?;
                    f.write_str(": ")?;
                    item.write_repr(f)?;
                }
                f.write_str("}")
            }
            Value::Object(object) => object.render(f),
            Value::Function(function) => write!(f, "<function {}>", function.name()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => {
                std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
            }
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            _ => match (self.as_number(), other.as_number()) {
                (Some(a), Some(b)) => a.compare(b) == Some(Ordering::Equal),
                _ => false,
            },
        }
    }
}

/// A host object exposing named fields to templates.
///
/// Field lookup is the last strategy tried when resolving a path segment,
/// after map keys and list indices.
///
/// # Example
///
/// ```
/// use onebot_template::{Object, Value};
///
/// #[derive(Debug)]
/// struct Sender {
///     nickname: String,
/// }
///
/// impl Object for Sender {
///     fn field(&self, name: &str) -> Option<Value> {
///         match name {
///             "nickname" => Some(Value::from(self.nickname.as_str())),
///             _ => None,
///         }
///     }
/// }
/// ```
pub trait Object: fmt::Debug + Send + Sync {
    /// Returns the value of a named field, or `None` if there is no such field.
    fn field(&self, name: &str) -> Option<Value>;

    /// Returns the items produced when the object is iterated by `each`.
    ///
    /// Objects are not iterable unless they override this.
    fn iter(&self) -> Option<Vec<Value>> {
        None
    }

    /// Type name used in error messages.
    fn type_name(&self) -> &'static str {
        "object"
    }

    /// Writes the display form of the object.
    fn render(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Arguments passed to a [`Function`] by a `{% call %}` block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    /// Positional arguments, in tag order.
    pub args: Vec<Value>,
    /// Keyword arguments given as `name=value`, in tag order.
    pub kwargs: IndexMap<String, Value>,
}

impl CallArgs {
    /// Returns the positional argument at `index`.
    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }

    /// Returns the keyword argument `name`.
    pub fn kwarg(&self, name: &str) -> Option<&Value> {
        self.kwargs.get(name)
    }
}

type FunctionImpl = dyn Fn(&CallArgs) -> std::result::Result<Value, String> + Send + Sync;

/// An invocable template value.
///
/// Functions return `Err(message)` to abort the render.
///
/// # Example
///
/// ```
/// use onebot_template::{Function, Value};
///
/// let greet = Function::new("greet", |args| {
///     let name = args.arg(0).cloned().unwrap_or_default();
///     Ok(Value::from(format!("hello {}", name)))
/// });
/// assert_eq!(greet.name(), "greet");
/// ```
#[derive(Clone)]
pub struct Function {
    name: Arc<str>,
    inner: Arc<FunctionImpl>,
}

impl Function {
    /// Wraps a closure as a named function.
    pub fn new<F>(name: &str, f: F) -> Self
    where
        F: Fn(&CallArgs) -> std::result::Result<Value, String> + Send + Sync + 'static,
    {
        Function {
            name: Arc::from(name),
            inner: Arc::new(f),
        }
    }

    /// Returns the function's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invokes the function.
    pub fn call(&self, args: &CallArgs) -> std::result::Result<Value, String> {
        (self.inner)(args)
    }

    fn ptr_eq(&self, other: &Function) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.inner), Arc::as_ptr(&other.inner))
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function").field("name", &self.name).finish()
    }
}

/// Numeric value supporting all common numeric types.
///
/// Integers compare exactly across signedness; comparisons involving a
/// float convert to `f64`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    /// Signed 64-bit integer.
    I64(i64),
    /// Unsigned 64-bit integer.
    U64(u64),
    /// 64-bit floating point.
    F64(f64),
}

impl Number {
    /// Converts the number to f64 for comparison.
    pub fn to_f64(self) -> f64 {
        match self {
            Number::I64(n) => n as f64,
            Number::U64(n) => n as f64,
            Number::F64(n) => n,
        }
    }

    /// Converts the number to an integer, truncating floats.
    pub fn to_i64(self) -> Option<i64> {
        match self {
            Number::I64(n) => Some(n),
            Number::U64(n) => i64::try_from(n).ok(),
            Number::F64(n) if n.is_finite() => Some(n.trunc() as i64),
            Number::F64(_) => None,
        }
    }

    /// Compares two numbers, handling mixed types.
    pub fn compare(self, other: Number) -> Option<Ordering> {
        match (self, other) {
            (Number::I64(a), Number::I64(b)) => Some(a.cmp(&b)),
            (Number::U64(a), Number::U64(b)) => Some(a.cmp(&b)),
            (Number::F64(a), Number::F64(b)) => a.partial_cmp(&b),
            (Number::I64(a), Number::U64(b)) => Some(match u64::try_from(a) {
                Ok(a) => a.cmp(&b),
                Err(_) => Ordering::Less,
            }),
            (Number::U64(_), Number::I64(_)) => other.compare(self).map(Ordering::reverse),
            _ => self.to_f64().partial_cmp(&other.to_f64()),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::I64(n) => write!(f, "{}", n),
            Number::U64(n) => write!(f, "{}", n),
            Number::F64(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e16 => {
                write!(f, "{:.1}", n)
            }
            Number::F64(n) => write!(f, "{}", n),
        }
    }
}

macro_rules! number_from {
    ($variant:ident as $target:ty: $($source:ty),*) => {
        $(
            impl From<$source> for Number {
                fn from(n: $source) -> Self {
                    Number::$variant(n as $target)
                }
            }

            impl From<$source> for Value {
                fn from(n: $source) -> Self {
                    Value::Number(Number::from(n))
                }
            }
        )*
    };
}

number_from!(I64 as i64: i8, i16, i32, i64, isize);
number_from!(U64 as u64: u8, u16, u32, u64, usize);
number_from!(F64 as f64: f32, f64);

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Function> for Value {
    fn from(f: Function) -> Self {
        Value::Function(f)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::None)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<V: Into<Value>> From<BTreeMap<String, V>> for Value {
    fn from(map: BTreeMap<String, V>) -> Self {
        Value::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl<V: Into<Value>> From<IndexMap<String, V>> for Value {
    fn from(map: IndexMap<String, V>) -> Self {
        Value::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl<V: Into<Value>> From<HashMap<String, V>> for Value {
    fn from(map: HashMap<String, V>) -> Self {
        Value::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::None,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Number(Number::I64(i))
                } else if let Some(u) = n.as_u64() {
                    Value::Number(Number::U64(u))
                } else {
                    Value::Number(Number::F64(n.as_f64().unwrap_or(f64::NAN)))
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl FromIterator<Value> for Value {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Value::List(iter.into_iter().collect())
    }
}
