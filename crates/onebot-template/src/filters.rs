//! Filters and the built-in OneBot message filters.
//!
//! A [`Filter`] turns a resolved value into the text written to the output.
//! Filters are applied by name (`{{ url|image }}`) or, when a template has a
//! default filter, to every variable that names none.
//!
//! The built-ins target OneBot v11 CQ-code messages:
//!
//! | Name | Output |
//! |------|--------|
//! | `raw` | the value's display form, unchanged |
//! | `escape_message` | display form with `&`, `[`, `]` and `,` escaped |
//! | `image` | a `[CQ:image,file=...,cache=true,proxy=true]` segment for the value as a URL |

use std::fmt;
use std::sync::Arc;

use crate::template::TemplateBuilder;
use crate::value::Value;

type FilterImpl = dyn Fn(&Value) -> String + Send + Sync;

/// A named function from a value to its output text.
///
/// # Example
///
/// ```
/// use onebot_template::{Filter, Value};
///
/// let shout = Filter::new("shout", |v: &Value| format!("{}!", v));
/// assert_eq!(shout.name(), "shout");
/// assert_eq!(shout.apply(&Value::from("hi")), "hi!");
/// ```
#[derive(Clone)]
pub struct Filter {
    name: Arc<str>,
    inner: Arc<FilterImpl>,
}

impl Filter {
    /// Wraps a function under the name templates use to refer to it.
    pub fn new<F>(name: &str, f: F) -> Self
    where
        F: Fn(&Value) -> String + Send + Sync + 'static,
    {
        Filter {
            name: Arc::from(name),
            inner: Arc::new(f),
        }
    }

    /// The registered name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Applies the filter.
    pub fn apply(&self, value: &Value) -> String {
        (self.inner)(value)
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter").field("name", &self.name).finish()
    }
}

/// Escapes CQ-code control characters in message text.
///
/// `,` is escaped too when `escape_comma` is set, as required inside
/// segment parameters.
pub fn cq_escape(text: &str, escape_comma: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '[' => out.push_str("&#91;"),
            ']' => out.push_str("&#93;"),
            ',' if escape_comma => out.push_str("&#44;"),
            other => out.push(other),
        }
    }
    out
}

/// `raw`: the value's display form.
pub fn raw(value: &Value) -> String {
    value.to_string()
}

/// `escape_message`: the display form, CQ-escaped so it renders as text.
pub fn escape_message(value: &Value) -> String {
    cq_escape(&value.to_string(), true)
}

/// `image`: a CQ image segment showing the value as a file or URL.
pub fn image(value: &Value) -> String {
    format!(
        "[CQ:image,file={},cache=true,proxy=true]",
        cq_escape(&value.to_string(), true)
    )
}

/// All built-in filters.
pub fn builtin_filters() -> Vec<Filter> {
    vec![
        Filter::new("raw", raw),
        Filter::new("escape_message", escape_message),
        Filter::new("image", image),
    ]
}

/// A builder for message templates: the built-in filters registered, and
/// `escape_message` applied to every variable that names no filter.
///
/// ```
/// use onebot_template::{context, filters::onebot};
///
/// let template = onebot().build("{{ text }} {{ url|image }}")?;
/// let ctx = context! { text => "[hi]", url => "a.png" };
/// assert_eq!(
///     template.render(&ctx)?,
///     "&#91;hi&#93; [CQ:image,file=a.png,cache=true,proxy=true]"
/// );
/// # Ok::<(), onebot_template::TemplateError>(())
/// ```
pub fn onebot() -> TemplateBuilder {
    TemplateBuilder::new()
        .filters(builtin_filters())
        .default_filter("escape_message")
}
