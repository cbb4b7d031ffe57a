//! The template façade.
//!
//! A [`Template`] owns its compiled [`Program`] together with the filters it
//! renders with. Templates are compiled once and rendered any number of
//! times, from any thread.

use std::collections::HashMap;

use serde::Serialize;

use crate::compiler::Compiler;
use crate::context::Context;
use crate::error::Result;
use crate::filters::Filter;
use crate::node::Program;
use crate::render::{Renderer, RootContext};
use crate::value::Value;

/// A compiled template.
///
/// # Example
///
/// ```
/// use onebot_template::{Context, Template, Value};
///
/// let template = Template::builder()
///     .filter("shout", |v: &Value| v.to_string().to_uppercase())
///     .build("{% each n in names %}{{ n|shout }} {% end %}")?;
///
/// let ctx = Context::new().with("names", vec!["a", "b"]);
/// assert_eq!(template.render(&ctx)?, "A B ");
/// # Ok::<(), onebot_template::TemplateError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Template {
    source: String,
    program: Program,
    filters: HashMap<String, Filter>,
    default_filter: Option<String>,
}

impl Template {
    /// Compiles a template with no filters.
    pub fn new(source: &str) -> Result<Template> {
        TemplateBuilder::new().build(source)
    }

    /// Starts configuring a template.
    pub fn builder() -> TemplateBuilder {
        TemplateBuilder::new()
    }

    /// Renders the template against `context`.
    ///
    /// # Errors
    ///
    /// Any render-time failure aborts the render; no partial output is
    /// returned.
    pub fn render(&self, context: &Context) -> Result<String> {
        tracing::trace!(vars = context.len(), "rendering template");
        let root = RootContext {
            context,
            filters: &self.filters,
            default_filter: self.default_filter.as_deref(),
        };
        Renderer::new(&self.program, root).render()
    }

    /// Renders against any value that serializes to a map.
    pub fn render_serialize<T: Serialize + ?Sized>(&self, context: &T) -> Result<String> {
        self.render(&Context::from_serialize(context)?)
    }

    /// The source the template was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The compiled node tree.
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// The default filter, if any.
    pub fn default_filter(&self) -> Option<&str> {
        self.default_filter.as_deref()
    }

    /// Names of the registered filters, sorted.
    pub fn filter_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.filters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Builder for [`Template`].
///
/// Registering a filter under a name already in use replaces the earlier one.
/// The default filter is looked up by name at render time, so it may be set
/// before or after the filter itself is registered.
#[derive(Debug, Clone, Default)]
pub struct TemplateBuilder {
    filters: HashMap<String, Filter>,
    default_filter: Option<String>,
}

impl TemplateBuilder {
    /// Creates a builder with no filters.
    pub fn new() -> Self {
        TemplateBuilder::default()
    }

    /// Registers a closure as a filter.
    pub fn filter<F>(self, name: &str, f: F) -> Self
    where
        F: Fn(&Value) -> String + Send + Sync + 'static,
    {
        self.add_filter(Filter::new(name, f))
    }

    /// Registers a [`Filter`] under its own name.
    pub fn add_filter(mut self, filter: Filter) -> Self {
        self.filters.insert(filter.name().to_string(), filter);
        self
    }

    /// Registers several filters.
    pub fn filters(self, filters: impl IntoIterator<Item = Filter>) -> Self {
        filters.into_iter().fold(self, TemplateBuilder::add_filter)
    }

    /// Names the filter applied to variables that name none.
    pub fn default_filter(mut self, name: &str) -> Self {
        self.default_filter = Some(name.to_string());
        self
    }

    /// Compiles `source` into a [`Template`].
    ///
    /// # Errors
    ///
    /// A syntax error if the source does not compile.
    pub fn build(self, source: &str) -> Result<Template> {
        let program = Compiler::new(source).compile()?;
        Ok(Template {
            source: source.to_string(),
            program,
            filters: self.filters,
            default_filter: self.default_filter,
        })
    }
}

/// Compiles and renders `source` in one step, without filters.
///
/// ```
/// use onebot_template::{context, render_str};
///
/// let out = render_str("{% if n > 2 %}many{% else %}few{% end %}", &context! { n => 3 })?;
/// assert_eq!(out, "many");
/// # Ok::<(), onebot_template::TemplateError>(())
/// ```
pub fn render_str(source: &str, context: &Context) -> Result<String> {
    Template::new(source)?.render(context)
}
