//! Tree-walking renderer.
//!
//! Rendering is one downward walk over a [`Program`]. The tree is never
//! mutated; per-loop state lives in [`Scope`]s on the call stack, so a program
//! can be rendered from several threads at once.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::context::{Context, Scope};
use crate::error::{Result, TemplateError};
use crate::expr::resolve;
use crate::filters::Filter;
use crate::node::{Call, Each, If, NodeId, NodeKind, Program, Variable};
use crate::op::CompareOp;
use crate::value::{CallArgs, Value};

/// The outermost context of a render: the caller's values plus the filter
/// configuration every variable reaches back to through the root.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RootContext<'a> {
    pub(crate) context: &'a Context,
    pub(crate) filters: &'a HashMap<String, Filter>,
    pub(crate) default_filter: Option<&'a str>,
}

pub(crate) struct Renderer<'a> {
    program: &'a Program,
    root: RootContext<'a>,
}

impl<'a> Renderer<'a> {
    pub(crate) fn new(program: &'a Program, root: RootContext<'a>) -> Self {
        Renderer { program, root }
    }

    /// Renders the whole program.
    pub(crate) fn render(&self) -> Result<String> {
        let scope = Scope::root(self.root.context);
        let mut out = String::new();
        let root = self.program.root();
        self.render_children(self.program.node(root).children(), &scope, &mut out)?;
        Ok(out)
    }

    fn render_children(&self, children: &[NodeId], scope: &Scope<'_>, out: &mut String) -> Result<()> {
        for &child in children {
            self.render_node(child, scope, out)?;
        }
        Ok(())
    }

    fn render_node(&self, id: NodeId, scope: &Scope<'_>, out: &mut String) -> Result<()> {
        let node = self.program.node(id);
        match node.kind() {
            NodeKind::Root => self.render_children(node.children(), scope, out),
            NodeKind::Text(text) => {
                out.push_str(text);
                Ok(())
            }
            NodeKind::Variable(variable) => self.render_variable(id, variable, scope, out),
            NodeKind::Each(each) => self.render_each(node.children(), each, scope, out),
            NodeKind::If(block) => self.render_if(block, scope, out),
            NodeKind::Else => Ok(()),
            NodeKind::Call(call) => self.render_call(call, scope, out),
        }
    }

    fn render_variable(
        &self,
        id: NodeId,
        variable: &Variable,
        scope: &Scope<'_>,
        out: &mut String,
    ) -> Result<()> {
        self.program.root_of(id)?;
        let root = &self.root;

        let filter = variable.filter.as_deref().or(root.default_filter);
        let value = resolve(&variable.name, scope)?;
        out.push_str(&variable.leading);
        match filter {
            Some(name) => {
                let filter = root
                    .filters
                    .get(name)
                    .ok_or_else(|| TemplateError::UnknownFilter(name.to_string()))?;
                out.push_str(&filter.apply(&value));
            }
            None => out.push_str(&value.to_string()),
        }
        out.push_str(&variable.trailing);
        Ok(())
    }

    fn render_each(
        &self,
        children: &[NodeId],
        each: &Each,
        scope: &Scope<'_>,
        out: &mut String,
    ) -> Result<()> {
        let max = match &each.max {
            Some(expr) => Some(max_count(expr.evaluate(scope)?)?),
            None => None,
        };
        let items = iterate(each, each.iterator.evaluate(scope)?)?;

        let count = match max {
            None => items.len(),
            Some(max) if max >= 0 => items.len().min(max as usize),
            Some(max) => items
                .len()
                .saturating_sub(usize::try_from(max.unsigned_abs()).unwrap_or(usize::MAX)),
        };

        for item in items.into_iter().take(count) {
            let inner = scope.child(&each.item, item);
            self.render_children(children, &inner, out)?;
        }
        Ok(())
    }

    fn render_if(&self, block: &If, scope: &Scope<'_>, out: &mut String) -> Result<()> {
        let lhs = block.lhs.evaluate(scope)?;
        let holds = match &block.comparison {
            Some((op, rhs)) => {
                let op = CompareOp::parse(op)
                    .ok_or_else(|| TemplateError::UnknownOperator(op.clone()))?;
                let rhs = rhs.evaluate(scope)?;
                op.apply(&lhs, &rhs)?
            }
            None => lhs.is_truthy(),
        };

        let branch = if holds {
            &block.if_branch
        } else {
            &block.else_branch
        };
        self.render_children(branch, scope, out)
    }

    fn render_call(&self, call: &Call, scope: &Scope<'_>, out: &mut String) -> Result<()> {
        let args = call
            .args
            .iter()
            .map(|arg| arg.evaluate(scope))
            .collect::<Result<Vec<_>>>()?;
        let mut kwargs = IndexMap::new();
        for (name, value) in &call.kwargs {
            kwargs.insert(name.clone(), value.evaluate(scope)?);
        }

        let function = match resolve(&call.callable, scope)? {
            Value::Function(function) => function,
            _ => return Err(TemplateError::NotCallable(call.callable.clone())),
        };
        let result = function
            .call(&CallArgs { args, kwargs })
            .map_err(|message| TemplateError::Call {
                name: call.callable.clone(),
                message,
            })?;

        if result.is_truthy() {
            out.push_str(&result.to_string());
        }
        Ok(())
    }
}

/// Converts a resolved `max` value to an iteration bound.
fn max_count(value: Value) -> Result<i64> {
    let count = match &value {
        Value::Number(n) => n.to_i64(),
        Value::Bool(b) => Some(*b as i64),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    count.ok_or_else(|| TemplateError::InvalidMax(value.to_string()))
}

/// Produces the items an `each` block walks over.
fn iterate(each: &Each, value: Value) -> Result<Vec<Value>> {
    let not_iterable = |kind: &'static str| TemplateError::NotIterable {
        expr: each.iterator_source.clone(),
        kind,
    };
    match value {
        Value::List(items) => Ok(items),
        Value::Map(map) => Ok(map.into_keys().map(Value::String).collect()),
        Value::String(s) => Ok(s.chars().map(|ch| Value::String(ch.to_string())).collect()),
        Value::Object(object) => object.iter().ok_or_else(|| not_iterable(object.type_name())),
        other => Err(not_iterable(other.kind_name())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::Compiler;

    fn render_with(source: &str, context: &Context, default_filter: Option<&str>) -> Result<String> {
        let program = Compiler::new(source).compile()?;
        let filters = HashMap::from([(
            "upper".to_string(),
            Filter::new("upper", |v: &Value| v.to_string().to_uppercase()),
        )]);
        Renderer::new(
            &program,
            RootContext {
                context,
                filters: &filters,
                default_filter,
            },
        )
        .render()
    }

    fn render(source: &str, context: &Context) -> Result<String> {
        render_with(source, context, None)
    }

    #[test]
    fn max_count_conversions() {
        assert_eq!(max_count(Value::from(3)).unwrap(), 3);
        assert_eq!(max_count(Value::from(2.7)).unwrap(), 2);
        assert_eq!(max_count(Value::from(true)).unwrap(), 1);
        assert_eq!(max_count(Value::from(" 4 ")).unwrap(), 4);
        assert!(matches!(
            max_count(Value::from("many")),
            Err(TemplateError::InvalidMax(_))
        ));
        assert!(max_count(Value::None).is_err());
    }

    #[test]
    fn negative_max_drops_from_the_end() {
        let ctx = Context::new();
        assert_eq!(
            render("{% each n in [1, 2, 3, 4] max -1 %}{{n}}{% end %}", &ctx).unwrap(),
            "123"
        );
        assert_eq!(
            render("{% each n in [1, 2] max -5 %}{{n}}{% end %}", &ctx).unwrap(),
            ""
        );
    }

    #[test]
    fn iterates_maps_strings_and_lists() {
        let ctx = Context::new()
            .with("word", "abc")
            .with("map", Value::from(serde_json::json!({"b": 1, "a": 2})));
        assert_eq!(
            render("{% each c in word %}[{{c}}]{% end %}", &ctx).unwrap(),
            "[a][b][c]"
        );
        assert_eq!(
            render("{% each k in map %}{{k}};{% end %}", &ctx).unwrap(),
            "a;b;"
        );
    }

    #[test]
    fn non_iterables_fail() {
        let ctx = Context::new().with("n", 5);
        let err = render("{% each x in n %}{% end %}", &ctx).unwrap_err();
        assert_eq!(err.to_string(), "n resolved to number, which is not iterable");
    }

    #[test]
    fn default_filter_applies_without_explicit_filter() {
        let ctx = Context::new().with("name", "izumi");
        assert_eq!(
            render_with("{{ name }}", &ctx, Some("upper")).unwrap(),
            "IZUMI"
        );
        assert_eq!(
            render_with("{{ name|upper }}", &ctx, None).unwrap(),
            "IZUMI"
        );
        assert!(matches!(
            render_with("{{ name }}", &ctx, Some("nope")),
            Err(TemplateError::UnknownFilter(f)) if f == "nope"
        ));
    }

    #[test]
    fn unknown_operator_fails_at_render_time() {
        let program = Compiler::new("{% if 1 <> 2 %}x{% end %}").compile();
        assert!(program.is_ok());
        let err = render("{% if 1 <> 2 %}x{% end %}", &Context::new()).unwrap_err();
        assert!(matches!(err, TemplateError::UnknownOperator(op) if op == "<>"));
    }
}
