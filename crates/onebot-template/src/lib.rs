//! onebot-template - Message templates for OneBot v11 chat bots.
//!
//! A small templating language for composing bot replies. Templates are
//! compiled once into a node tree and rendered against a [`Context`] of
//! dynamic [`Value`]s:
//!
//! - `{{ dotted.path }}` and `{{ dotted.path|filter }}` interpolate values
//! - `{% each item in expr %}` / `{% each item in expr max n %}` loop
//! - `{% if expr %}`, `{% if lhs op rhs %}` and `{% else %}` branch
//! - `{% call fn arg key=value %}` invokes a function from the context
//! - `{% end %}` (or any tag starting with `end`) closes `each` and `if`
//!
//! # Quick Start
//!
//! ```rust
//! use onebot_template::{filters, Context, Value};
//!
//! let template = filters::onebot().build(
//!     "Results for {{ query }}:\n\
//!      {% each r in results max 2 %}{{ r.title }} ({{ ..query }})\n{% end %}",
//! )?;
//!
//! let ctx = Context::new().with("query", "[frieren]").with(
//!     "results",
//!     Value::from(serde_json::json!([
//!         {"title": "Frieren"},
//!         {"title": "Frieren 2"},
//!         {"title": "Frieren 3"},
//!     ])),
//! );
//!
//! assert_eq!(
//!     template.render(&ctx)?,
//!     "Results for &#91;frieren&#93;:\nFrieren (&#91;frieren&#93;)\nFrieren 2 (&#91;frieren&#93;)\n"
//! );
//! # Ok::<(), onebot_template::TemplateError>(())
//! ```
//!
//! # Names and Scopes
//!
//! A name is a dotted path. The first segment is looked up in the current
//! scope; every later segment tries, in order:
//!
//! | Strategy | Applies to |
//! |----------|------------|
//! | key | maps |
//! | index | lists, all-digit segments only |
//! | field | [`Object`]s |
//!
//! Inside an `each` body the scope holds only the loop item. Names from the
//! enclosing scope are reached with a `..` prefix, one per level.
//!
//! Expression tokens in block tags (`each`, `if`, `call`) are tried as
//! literals first (`3`, `'text'`, `[1, 2]`, `True`, `None`) and resolved as
//! names otherwise. `{{ }}` interpolations always resolve names.

mod compiler;
mod context;
mod error;
mod expr;
pub mod filters;
pub mod fragment;
pub mod literal;
mod node;
mod op;
mod render;
mod template;
mod value;

// Re-export public API
pub use compiler::Compiler;
pub use context::{Context, Scope};
pub use error::{ErrorKind, Result, TemplateError};
pub use expr::{resolve, Expression};
pub use filters::{builtin_filters, onebot, Filter};
pub use node::{Call, Each, If, Node, NodeId, NodeKind, Program, Variable};
pub use op::CompareOp;
pub use template::{render_str, Template, TemplateBuilder};
pub use value::{CallArgs, Function, Number, Object, Value};
