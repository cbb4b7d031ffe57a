//! Render contexts.
//!
//! A [`Context`] holds the caller's values for one render. While rendering,
//! the engine layers a [`Scope`] per loop iteration on top of it: each loop
//! scope binds only the loop item and links back to the enclosing scope, which
//! templates reach explicitly with a `..` prefix (`{{ ..title }}`).

use std::collections::{BTreeMap, HashMap};

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{Result, TemplateError};
use crate::value::Value;

/// The values passed into a render call.
///
/// # Example
///
/// ```
/// use onebot_template::{context, Context, Value};
///
/// let ctx = Context::new().with("name", "Izumi").with("count", 3);
/// assert_eq!(ctx.get("count"), Some(&Value::from(3)));
///
/// let same = context! { name => "Izumi", count => 3 };
/// assert_eq!(same.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Context {
    vars: IndexMap<String, Value>,
}

impl Context {
    /// Creates an empty context.
    pub fn new() -> Self {
        Context::default()
    }

    /// Builds a context from a serializable struct or map.
    ///
    /// The value must serialize to a map; its top-level keys become the
    /// context's names.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        match Value::from_serialize(value)? {
            Value::Map(vars) => Ok(Context { vars }),
            other => Err(TemplateError::Serialization(serde::ser::Error::custom(
                format!("context must be a map, got {}", other.kind_name()),
            ))),
        }
    }

    /// Binds `name` to `value`, replacing any previous binding.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.vars.insert(name.into(), value.into());
    }

    /// Builder-style [`insert`](Context::insert).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Returns the value bound to `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    /// Number of bound names.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Returns `true` if nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl From<IndexMap<String, Value>> for Context {
    fn from(vars: IndexMap<String, Value>) -> Self {
        Context { vars }
    }
}

impl From<BTreeMap<String, Value>> for Context {
    fn from(vars: BTreeMap<String, Value>) -> Self {
        Context {
            vars: vars.into_iter().collect(),
        }
    }
}

impl From<HashMap<String, Value>> for Context {
    fn from(vars: HashMap<String, Value>) -> Self {
        Context {
            vars: vars.into_iter().collect(),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Context {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Context {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Creates a [`Context`] from `name => value` pairs.
#[macro_export]
macro_rules! context {
    () => {
        $crate::Context::new()
    };
    ($($name:ident => $value:expr),+ $(,)?) => {{
        let mut ctx = $crate::Context::new();
        $(ctx.insert(stringify!($name), $value);)+
        ctx
    }};
}

/// One level of the name-resolution chain during a render.
///
/// The outermost scope wraps the caller's [`Context`]. Each loop iteration
/// creates a child scope binding just the loop item; names defined further
/// out are reachable only through the `..` link.
#[derive(Debug)]
pub struct Scope<'a> {
    bindings: Bindings<'a>,
    parent: Option<&'a Scope<'a>>,
}

#[derive(Debug)]
enum Bindings<'a> {
    Root(&'a Context),
    Item { name: &'a str, value: Value },
}

impl<'a> Scope<'a> {
    /// Creates the outermost scope for a render.
    pub fn root(context: &'a Context) -> Self {
        Scope {
            bindings: Bindings::Root(context),
            parent: None,
        }
    }

    /// Creates a loop scope binding `name` to `value`, linked to `self`.
    pub fn child<'b>(&'b self, name: &'b str, value: Value) -> Scope<'b> {
        Scope {
            bindings: Bindings::Item { name, value },
            parent: Some(self),
        }
    }

    /// Looks up a name bound directly in this scope.
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        match &self.bindings {
            Bindings::Root(context) => context.get(name),
            Bindings::Item { name: bound, value } => (*bound == name).then_some(value),
        }
    }

    /// The enclosing scope, reached with `..`.
    pub fn parent(&self) -> Option<&'a Scope<'a>> {
        self.parent
    }
}
